/// Worker dispatch.
///
/// Each parallel state of a frame (tiling, relations, render) is handed
/// to a [`WorkerPool`] as one job per scene thread. A dispatch is a
/// fan-out/fan-in barrier: it runs every job and returns only after all
/// of them completed. Jobs borrow the scene's per-frame data, so no job
/// may outlive the dispatch that received it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use crate::error::Result;
use crate::{engine_bail, engine_err, engine_warn};

/// One scene thread's share of a phase
pub type Job<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;

/// Parallel update phase of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatePhase {
    /// Per-surface hierarchy update and tile list rasterization
    Tiling,
    /// Per-surface relation lists and backend updates
    Relations,
}

/// Diagnostic state dump requested for one frame.
///
/// `DumpState` logs the scene's lists at INFO and forces the serial pool
/// so the dump is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticMode {
    #[default]
    Off,
    DumpState,
}

/// Injectable worker pool.
///
/// `init`/`terminate` bracket the scene's lifetime. Both dispatches must
/// run every job to completion before returning; the first error any job
/// reports is returned after the barrier.
pub trait WorkerPool: Send {
    /// Create platform workers for `thread_count` scene threads
    fn init(&mut self, thread_count: usize) -> Result<()>;

    /// Tear platform workers down
    fn terminate(&mut self);

    /// Run one update phase
    fn dispatch_update<'a>(&mut self, phase: UpdatePhase, jobs: Vec<Job<'a>>) -> Result<()>;

    /// Run the render phase
    fn dispatch_render<'a>(&mut self, jobs: Vec<Job<'a>>) -> Result<()>;
}

/// Run jobs in order, all of them, and keep the first error
fn run_all(jobs: Vec<Job<'_>>) -> Result<()> {
    let mut first = Ok(());
    for job in jobs {
        let result = job();
        if first.is_ok() {
            first = result;
        }
    }
    first
}

// ===== SERIAL POOL =====

/// Synchronous fallback: runs every job on the calling thread, in
/// thread-index order.
#[derive(Debug, Default)]
pub struct SerialPool;

impl SerialPool {
    pub fn new() -> Self {
        Self
    }
}

impl WorkerPool for SerialPool {
    fn init(&mut self, _thread_count: usize) -> Result<()> {
        Ok(())
    }

    fn terminate(&mut self) {}

    fn dispatch_update<'a>(&mut self, _phase: UpdatePhase, jobs: Vec<Job<'a>>) -> Result<()> {
        run_all(jobs)
    }

    fn dispatch_render<'a>(&mut self, jobs: Vec<Job<'a>>) -> Result<()> {
        run_all(jobs)
    }
}

// ===== SCOPED POOL =====

/// Fan-out over `std::thread::scope`: job 0 runs on the calling thread,
/// the others on scoped OS threads joined before returning.
#[derive(Debug, Default)]
pub struct ScopedPool {
    thread_count: usize,
}

impl ScopedPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene threads the pool was initialized for
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn fan_out(jobs: Vec<Job<'_>>) -> Result<()> {
        let mut jobs = jobs.into_iter();
        let Some(local) = jobs.next() else {
            return Ok(());
        };

        std::thread::scope(|scope| {
            let handles: Vec<_> = jobs.map(|job| scope.spawn(job)).collect();
            let mut first = local();
            for handle in handles {
                let result = match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                };
                if first.is_ok() {
                    first = result;
                }
            }
            first
        })
    }
}

impl WorkerPool for ScopedPool {
    fn init(&mut self, thread_count: usize) -> Result<()> {
        if thread_count == 0 {
            engine_bail!("raytile::ScopedPool", InitializationFailed,
                "cannot run zero scene threads");
        }
        self.thread_count = thread_count;
        Ok(())
    }

    fn terminate(&mut self) {
        self.thread_count = 0;
    }

    fn dispatch_update<'a>(&mut self, _phase: UpdatePhase, jobs: Vec<Job<'a>>) -> Result<()> {
        Self::fan_out(jobs)
    }

    fn dispatch_render<'a>(&mut self, jobs: Vec<Job<'a>>) -> Result<()> {
        Self::fan_out(jobs)
    }
}

// ===== THREAD POOL =====

/// A job with its borrows erased, valid only while a [`Pending`] waits for it
type ShippedJob = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// `(job index, outcome)` reported by a worker
type Outcome = (usize, thread::Result<Result<()>>);

struct Worker {
    jobs: Sender<(usize, ShippedJob)>,
    handle: JoinHandle<()>,
}

/// Persistent workers: `init` spawns `thread_count - 1` OS threads that
/// live until `terminate`. Job 0 of every dispatch runs on the calling
/// thread, job `k` on worker `k`.
pub struct ThreadPool {
    workers: Vec<Worker>,
    outcomes: Option<Receiver<Outcome>>,
}

impl ThreadPool {
    pub fn new() -> Self {
        Self { workers: Vec::new(), outcomes: None }
    }

    /// Scene threads the pool was initialized for, 0 before `init`
    pub fn thread_count(&self) -> usize {
        match self.outcomes {
            Some(_) => self.workers.len() + 1,
            None => 0,
        }
    }

    fn fan_out(&mut self, jobs: Vec<Job<'_>>) -> Result<()> {
        if jobs.len() > self.thread_count().max(1) {
            engine_bail!("raytile::ThreadPool", InvalidConfiguration,
                "{} jobs dispatched to {} scene threads", jobs.len(), self.thread_count());
        }
        let mut jobs = jobs.into_iter();
        let Some(local) = jobs.next() else {
            return Ok(());
        };
        let Some(outcomes) = self.outcomes.as_ref() else {
            return local();
        };

        let mut pending = Pending { outcomes, count: 0 };
        let mut first_error = None;
        for (index, (worker, job)) in self.workers.iter().zip(jobs).enumerate() {
            // SAFETY: `pending` blocks until every shipped job has reported
            // back, on return and on unwind, so the job's borrows outlive it.
            let job = unsafe { std::mem::transmute::<Job<'_>, ShippedJob>(job) };
            if worker.jobs.send((index + 1, job)).is_err() {
                first_error = Some(engine_err!("raytile::ThreadPool", InitializationFailed,
                    "worker {} is gone", index + 1));
                break;
            }
            pending.count += 1;
        }

        let mut results: Vec<thread::Result<Result<()>>> = Vec::with_capacity(pending.count + 1);
        results.push(panic::catch_unwind(AssertUnwindSafe(local)));
        results.resize_with(pending.count + 1, || Ok(Ok(())));
        while let Some((index, outcome)) = pending.next() {
            results[index] = outcome;
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let mut first = Ok(());
        for outcome in results {
            let result = match outcome {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            };
            if first.is_ok() {
                first = result;
            }
        }
        first
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("thread_count", &self.thread_count())
            .finish()
    }
}

impl WorkerPool for ThreadPool {
    fn init(&mut self, thread_count: usize) -> Result<()> {
        if thread_count == 0 {
            engine_bail!("raytile::ThreadPool", InitializationFailed,
                "cannot run zero scene threads");
        }
        self.terminate();

        let (report, outcomes) = mpsc::channel::<Outcome>();
        for index in 1..thread_count {
            let (jobs, queue) = mpsc::channel::<(usize, ShippedJob)>();
            let report = report.clone();
            let spawned = thread::Builder::new()
                .name(format!("raytile-worker-{}", index))
                .spawn(move || {
                    for (slot, job) in queue {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(job));
                        if report.send((slot, outcome)).is_err() {
                            break;
                        }
                    }
                });
            match spawned {
                Ok(handle) => self.workers.push(Worker { jobs, handle }),
                Err(err) => {
                    self.terminate();
                    engine_bail!("raytile::ThreadPool", InitializationFailed,
                        "cannot spawn worker {}: {}", index, err);
                }
            }
        }
        self.outcomes = Some(outcomes);
        Ok(())
    }

    fn terminate(&mut self) {
        for worker in self.workers.drain(..) {
            drop(worker.jobs);
            if worker.handle.join().is_err() {
                engine_warn!("raytile::ThreadPool", "worker thread panicked");
            }
        }
        self.outcomes = None;
    }

    fn dispatch_update<'a>(&mut self, _phase: UpdatePhase, jobs: Vec<Job<'a>>) -> Result<()> {
        self.fan_out(jobs)
    }

    fn dispatch_render<'a>(&mut self, jobs: Vec<Job<'a>>) -> Result<()> {
        self.fan_out(jobs)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Outcomes still owed by the workers for one dispatch
struct Pending<'p> {
    outcomes: &'p Receiver<Outcome>,
    count: usize,
}

impl Pending<'_> {
    fn next(&mut self) -> Option<Outcome> {
        if self.count == 0 {
            return None;
        }
        self.count -= 1;
        // Every worker gone means every shipped job was dropped
        self.outcomes.recv().ok()
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        while self.next().is_some() {}
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
