/// Scene: per-frame orchestration of tiling, relation lists and rendering.
///
/// Each call to [`Scene::render`] runs the same sequence of states:
///
/// 1. Arena-Reserve: recycle last frame's lists
/// 2. Hierarchy-Update: animate objects (single-threaded)
/// 3. Tiling (parallel): per-surface update and tile list
/// 4. Global-List-Rebuild: the camera's surface and light lists
/// 5. Relations (parallel): per-surface relation lists, backend update
/// 6. Tile-Merge: fold tile lists into the tile buffer
/// 7. Render (parallel): one backend call per worker
///
/// Parallel states hand each scene thread its own surfaces, arena and
/// framebuffer rows, so no locking is involved. The lists of the last
/// rendered frame stay readable until the next call to `render`.

use std::sync::Arc;
use glam::Vec3;
use slotmap::SecondaryMap;
use crate::backend::{Backend, RenderContext, SurfaceUpdate};
use crate::config::{Fsaa, SceneConfig, SceneOpts};
use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::list::{ElementArena, ElementId, GroupKind, ListView, Payload};
use crate::tiling::TileBuffer;
use crate::{engine_bail, engine_debug, engine_info, engine_trace};
use super::camera::FrameBasis;
use super::dispatch::{DiagnosticMode, Job, SerialPool, UpdatePhase, WorkerPool};
use super::graph::SceneDesc;
use super::hierarchy::Hierarchy;
use super::objects::{ObjectStore, Surface, SurfaceKey};
use super::scene_thread::{Relations, SceneThread, SurfaceLists};
use super::visibility::{Side, Viewer, Visibility};

/// Arena holding the camera's lists and the tile buffer chains
const SCENE_ARENA: usize = 0;

/// A renderable scene with its worker threads and per-frame lists.
pub struct Scene {
    /// Construction parameters; opts and FSAA change between frames
    config: SceneConfig,
    /// Arrays, surfaces, lights and cameras
    objects: ObjectStore,
    /// Tile and relation list heads of every surface
    lists: SecondaryMap<SurfaceKey, SurfaceLists>,
    /// One scratch slot per scene thread
    threads: Vec<SceneThread>,
    /// Arena 0 for the scene, arena `k + 1` for scene thread `k`
    arenas: Vec<ElementArena>,
    /// Per-tile surface lists
    tiles: TileBuffer,
    /// Camera's surface list
    global_surfaces: Option<ElementId>,
    /// Camera's light list
    global_lights: Option<ElementId>,
    framebuffer: Framebuffer,
    /// Tiling and ray bases of the current frame
    basis: FrameBasis,
    /// Ambient term of the current frame
    ambient: Vec3,
    hierarchy: Box<dyn Hierarchy>,
    visibility: Box<dyn Visibility>,
    backend: Arc<dyn Backend>,
    /// Injected pool used when threading is on
    pool: Box<dyn WorkerPool>,
    /// Fallback used when threading is off or a dump is active
    serial: SerialPool,
    /// One-shot dump armed by `print_state`
    print_pending: bool,
    /// Frames rendered so far
    frame_count: u64,
}

impl Scene {
    /// Create a scene from its description.
    ///
    /// Validates the configuration, the scene graph and the supplied
    /// framebuffer (allocating one when `framebuffer` is `None`), starts
    /// the worker pool and builds the camera's initial lists.
    pub fn new(
        desc: &SceneDesc,
        config: SceneConfig,
        framebuffer: Option<Framebuffer>,
        hierarchy: Box<dyn Hierarchy>,
        visibility: Box<dyn Visibility>,
        backend: Arc<dyn Backend>,
        mut pool: Box<dyn WorkerPool>,
    ) -> Result<Self> {
        config.validate()?;
        let objects = ObjectStore::from_desc(desc)?;

        let framebuffer = match framebuffer {
            Some(framebuffer) => {
                if (framebuffer.width(), framebuffer.height()) != (config.width, config.height) {
                    engine_bail!("raytile::Scene", InvalidFramebuffer,
                        "framebuffer is {}x{}, scene resolution is {}x{}",
                        framebuffer.width(), framebuffer.height(), config.width, config.height);
                }
                framebuffer
            }
            None => Framebuffer::new(config.width, config.height)?,
        };

        let tiles_in_row = config.width.div_ceil(config.tile_width);
        let tiles_in_col = config.height.div_ceil(config.tile_height);
        let thread_count = config.thread_count;

        let threads = (0..thread_count)
            .map(|index| SceneThread::new(index, tiles_in_row, tiles_in_col))
            .collect();
        let arenas = (0..=thread_count)
            .map(|id| ElementArena::new(id, config.arena_chunk))
            .collect();
        let mut lists = SecondaryMap::new();
        for key in objects.surfaces().keys() {
            lists.insert(key, SurfaceLists::default());
        }

        pool.init(thread_count)?;

        let basis = FrameBasis::new(
            objects.camera().frame(),
            config.width,
            config.height,
            config.tile_width,
            config.tile_height,
        );

        let mut scene = Self {
            config,
            objects,
            lists,
            threads,
            arenas,
            tiles: TileBuffer::new(tiles_in_row, tiles_in_col),
            global_surfaces: None,
            global_lights: None,
            framebuffer,
            basis,
            ambient: Vec3::ZERO,
            hierarchy,
            visibility,
            backend,
            pool,
            serial: SerialPool::new(),
            print_pending: false,
            frame_count: 0,
        };
        scene.rebuild_global_lists()?;

        engine_info!("raytile::Scene",
            "Scene '{}' created: {}x{} pixels, {}x{} tiles of {}x{}, {} threads, {} surfaces, {} lights",
            desc.root.name, scene.config.width, scene.config.height,
            tiles_in_row, tiles_in_col, scene.config.tile_width, scene.config.tile_height,
            thread_count, scene.objects.surface_count(), scene.objects.light_count());

        Ok(scene)
    }

    // ===== FRAME =====

    /// Update and render one frame for `time` (milliseconds).
    ///
    /// `DiagnosticMode::DumpState` (or a pending [`print_state`](Scene::print_state))
    /// logs the frame's lists and runs every phase on the calling thread.
    pub fn render(&mut self, time: u64, mode: DiagnosticMode) -> Result<()> {
        let requested = std::mem::take(&mut self.print_pending);
        let dump = requested || mode == DiagnosticMode::DumpState;
        let threaded = self.config.opts.contains(SceneOpts::THREADING) && !dump;

        // Arena-Reserve
        for arena in &mut self.arenas {
            arena.reserve();
        }
        self.forget_lists();
        engine_trace!("raytile::Scene", "frame {}: arenas reserved", self.frame_count);

        if dump {
            engine_info!("raytile::Scene", "---- state begin: frame {}, time {} ----",
                self.frame_count, time);
        }

        // Hierarchy-Update
        self.hierarchy.update(time, &mut self.objects)?;
        self.objects.validate_groups()?;
        self.basis = FrameBasis::new(
            self.objects.camera().frame(),
            self.config.width,
            self.config.height,
            self.config.tile_width,
            self.config.tile_height,
        );
        engine_trace!("raytile::Scene", "frame {}: hierarchy updated", self.frame_count);

        self.update_tiling(time, threaded)?;
        engine_trace!("raytile::Scene", "frame {}: tile lists built", self.frame_count);

        self.rebuild_global_lists()?;
        engine_trace!("raytile::Scene", "frame {}: global lists rebuilt", self.frame_count);

        self.update_relations(threaded)?;
        engine_trace!("raytile::Scene", "frame {}: relation lists built", self.frame_count);

        self.merge_tiles();
        engine_trace!("raytile::Scene", "frame {}: tiles merged", self.frame_count);

        if dump {
            self.dump_state();
        }

        self.ambient = self.objects.camera().ambient()
            + self.objects.lights().map(|(_, light)| light.ambient()).sum::<Vec3>();
        self.render_workers(threaded)?;
        engine_trace!("raytile::Scene", "frame {}: rendered", self.frame_count);

        if dump {
            engine_info!("raytile::Scene", "---- state end: frame {} ----", self.frame_count);
        }

        self.frame_count += 1;
        Ok(())
    }

    /// Arena-Release: drop the last frame's lists and hand their elements
    /// back to the arenas. The framebuffer and each arena's high-water mark
    /// are kept, so the next `render` starts pre-sized.
    pub fn release_frame(&mut self) {
        for arena in &mut self.arenas {
            arena.release();
        }
        self.forget_lists();
        engine_trace!("raytile::Scene", "frame {}: arenas released", self.frame_count);
    }

    /// Clear every head that points into the arenas
    fn forget_lists(&mut self) {
        for lists in self.lists.values_mut() {
            *lists = SurfaceLists::default();
        }
        self.global_surfaces = None;
        self.global_lights = None;
        self.tiles.clear();
    }

    /// Tiling phase: per-surface hierarchy update and tile list
    fn update_tiling(&mut self, time: u64, threaded: bool) -> Result<()> {
        let count = self.threads.len();
        let opts = self.config.opts;
        let tiling = opts.contains(SceneOpts::TILING);
        let extend = opts.contains(SceneOpts::TILING_EXT);
        let thresholds = self.config.thresholds;
        let basis = self.basis.tile;
        let hierarchy: &dyn Hierarchy = self.hierarchy.as_ref();

        let mut slices: Vec<Vec<(SurfaceKey, &mut Surface, &mut SurfaceLists)>> =
            (0..count).map(|_| Vec::new()).collect();
        for (position, ((key, surface), (_, lists))) in
            self.objects.surfaces_mut().zip(self.lists.iter_mut()).enumerate()
        {
            slices[position % count].push((key, surface, lists));
        }

        let jobs: Vec<Job<'_>> = self
            .threads
            .iter_mut()
            .zip(self.arenas[SCENE_ARENA + 1..].iter_mut())
            .zip(slices)
            .map(|((thread, arena), slice)| {
                Box::new(move || -> Result<()> {
                    for (key, surface, lists) in slice {
                        hierarchy.update_surface(time, key, surface);
                        lists.tiles = if tiling {
                            thread.rasterize_tile_list(arena, key, surface, &basis, &thresholds, extend)
                        } else {
                            None
                        };
                    }
                    Ok(())
                }) as Job<'_>
            })
            .collect();

        let pool: &mut dyn WorkerPool = if threaded { self.pool.as_mut() } else { &mut self.serial };
        pool.dispatch_update(UpdatePhase::Tiling, jobs)
    }

    /// Camera's surface list, then its light list
    fn rebuild_global_lists(&mut self) -> Result<()> {
        let arena = &mut self.arenas[SCENE_ARENA];
        let viewer = Viewer::Camera(self.objects.camera().frame());
        let relations = Relations {
            objects: &self.objects,
            visibility: self.visibility.as_ref(),
            opts: self.config.opts,
            global_surfaces: None,
        };

        self.global_surfaces = SceneThread::build_surface_relations(arena, &viewer, &relations)?;
        let relations = Relations { global_surfaces: self.global_surfaces, ..relations };
        self.global_lights = SceneThread::build_light_relations(arena, &viewer, &relations)?;
        Ok(())
    }

    /// Relations phase: per-surface relation lists and backend update
    fn update_relations(&mut self, threaded: bool) -> Result<()> {
        let count = self.threads.len();
        let relations = Relations {
            objects: &self.objects,
            visibility: self.visibility.as_ref(),
            opts: self.config.opts,
            global_surfaces: self.global_surfaces,
        };
        let backend: &dyn Backend = self.backend.as_ref();

        let mut slices: Vec<Vec<(SurfaceKey, &mut SurfaceLists)>> =
            (0..count).map(|_| Vec::new()).collect();
        for (position, (key, lists)) in self.lists.iter_mut().enumerate() {
            slices[position % count].push((key, lists));
        }

        let jobs: Vec<Job<'_>> = self
            .threads
            .iter_mut()
            .zip(self.arenas[SCENE_ARENA + 1..].iter_mut())
            .zip(slices)
            .map(|((thread, arena), slice)| {
                Box::new(move || -> Result<()> {
                    for (key, lists) in slice {
                        let Some(surface) = relations.objects.surface(key) else {
                            continue;
                        };
                        thread.build_relations(arena, key, surface, lists, &relations)?;
                        backend.update_surface(&SurfaceUpdate {
                            key,
                            surface,
                            lists,
                            groups: membership(surface),
                        });
                    }
                    Ok(())
                }) as Job<'_>
            })
            .collect();

        let pool: &mut dyn WorkerPool = if threaded { self.pool.as_mut() } else { &mut self.serial };
        pool.dispatch_update(UpdatePhase::Relations, jobs)
    }

    /// Fold surface tile lists into the tile buffer in camera list order,
    /// or give every tile the whole camera list when tiling is off
    fn merge_tiles(&mut self) {
        if !self.config.opts.contains(SceneOpts::TILING) {
            self.tiles.fill(self.global_surfaces);
            return;
        }

        let (scene_arena, thread_arenas) = self.arenas.split_at_mut(SCENE_ARENA + 1);
        let scene_arena = &mut scene_arena[SCENE_ARENA];
        let heads: Vec<Option<ElementId>> = scene_arena
            .iter(self.global_surfaces)
            .filter_map(|(_, element)| match element.payload {
                Payload::Surface(key) => self.lists.get(key).map(|lists| lists.tiles),
                _ => None,
            })
            .collect();
        self.tiles.merge(scene_arena, ListView::new(thread_arenas), heads);
    }

    /// Render phase: one backend call per worker
    fn render_workers(&mut self, threaded: bool) -> Result<()> {
        let count = self.threads.len();
        let fsaa = self.config.fsaa;
        let depth = self.config.stack_depth;
        let (tile_width, tile_height) = (self.config.tile_width, self.config.tile_height);
        let rays = self.basis.rays;
        let ambient = self.ambient;
        let (surfaces, lights) = (self.global_surfaces, self.global_lights);
        let view = ListView::new(&self.arenas);
        let tiles = &self.tiles;
        let objects = &self.objects;
        let lists = &self.lists;
        let backend: &dyn Backend = self.backend.as_ref();

        let jobs: Vec<Job<'_>> = self
            .framebuffer
            .split_rows(count)
            .into_iter()
            .enumerate()
            .map(|(index, rows)| {
                let mut context = RenderContext {
                    rays: rays.worker_rays(index, count, fsaa),
                    ambient,
                    tiles,
                    tile_width,
                    tile_height,
                    view,
                    objects,
                    lists,
                    surfaces,
                    lights,
                    index,
                    count,
                    depth,
                    fsaa,
                    rows,
                };
                Box::new(move || -> Result<()> {
                    backend.render_frame(&mut context);
                    Ok(())
                }) as Job<'_>
            })
            .collect();

        let pool: &mut dyn WorkerPool = if threaded { self.pool.as_mut() } else { &mut self.serial };
        pool.dispatch_render(jobs)
    }

    // ===== DIAGNOSTICS =====

    /// Dump the next frame's state through the logger (one-shot)
    pub fn print_state(&mut self) {
        self.print_pending = true;
    }

    fn dump_state(&self) {
        let view = self.list_view();
        let camera = self.objects.camera();
        let frame = camera.frame();
        engine_info!("raytile::Scene", "camera '{}': pos {:?} hor {:?} ver {:?} nrm {:?} pov {}",
            camera.name(), frame.pos, frame.hor, frame.ver, frame.nrm, frame.pov);
        engine_info!("raytile::Scene", "lights: [{}]",
            describe_list(view, &self.objects, self.global_lights));
        engine_info!("raytile::Scene", "surfaces: [{}]",
            describe_list(view, &self.objects, self.global_surfaces));

        for (key, surface) in self.objects.surfaces() {
            let Some(lists) = self.lists.get(key) else {
                continue;
            };
            engine_info!("raytile::Scene", "surface '{}': bounds {:?}, {} tiles",
                surface.name(), surface.bounds(), view.len(lists.tiles));
            for side in Side::ALL {
                engine_info!("raytile::Scene", "  {:?} surfaces: [{}]",
                    side, describe_list(view, &self.objects, lists.surfaces(side)));
                engine_info!("raytile::Scene", "  {:?} lights: [{}]",
                    side, describe_list(view, &self.objects, lists.lights(side)));
            }
        }

        engine_info!("raytile::Scene", "tile [0][0]: [{}]",
            describe_list(view, &self.objects, self.tiles.get(0, 0)));
    }

    // ===== ACCESSORS =====

    /// Framebuffer of the last rendered frame
    pub fn frame(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Framebuffer, e.g. to draw an FPS counter over the frame
    pub fn frame_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn fsaa(&self) -> Fsaa {
        self.config.fsaa
    }

    /// Antialiasing mode, applied from the next frame
    pub fn set_fsaa(&mut self, fsaa: Fsaa) {
        self.config.fsaa = fsaa;
    }

    pub fn opts(&self) -> SceneOpts {
        self.config.opts
    }

    /// Optimization switches, applied from the next frame
    pub fn set_opts(&mut self, opts: SceneOpts) {
        engine_debug!("raytile::Scene", "opts {:?} -> {:?}", self.config.opts, opts);
        self.config.opts = opts;
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Ambient term of the last rendered frame
    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn tile_buffer(&self) -> &TileBuffer {
        &self.tiles
    }

    /// Resolves every list id of the last frame
    pub fn list_view(&self) -> ListView<'_> {
        ListView::new(&self.arenas)
    }

    /// Camera's surface list
    pub fn global_surfaces(&self) -> Option<ElementId> {
        self.global_surfaces
    }

    /// Camera's light list
    pub fn global_lights(&self) -> Option<ElementId> {
        self.global_lights
    }

    /// List heads of one surface
    pub fn surface_lists(&self, key: SurfaceKey) -> Option<&SurfaceLists> {
        self.lists.get(key)
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Objects, for edits between frames. Group changes are validated by
    /// the next `render`.
    pub fn objects_mut(&mut self) -> &mut ObjectStore {
        &mut self.objects
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.pool.terminate();
        self.serial.terminate();
        self.release_frame();
        engine_trace!("raytile::Scene", "scene dropped after {} frames", self.frame_count);
    }
}

/// Group kinds a surface is a member of
fn membership(surface: &Surface) -> GroupKind {
    let mut groups = GroupKind::empty();
    if surface.trnode().is_some() {
        groups |= GroupKind::TRANSFORM;
    }
    if surface.bvnode().is_some() {
        groups |= GroupKind::BOUNDS;
    }
    groups
}

/// Names along a list, with lights' shadow casters in braces
fn describe_list(view: ListView<'_>, objects: &ObjectStore, head: Option<ElementId>) -> String {
    view.iter(head)
        .map(|(_, element)| match element.payload {
            Payload::Surface(key) => objects
                .surface(key)
                .map_or_else(|| "?".to_string(), |s| s.name().to_string()),
            Payload::Light { light, shadows } => format!(
                "{} {{{}}}",
                objects.light(light).map_or("?", |l| l.name()),
                describe_list(view, objects, shadows),
            ),
            Payload::Group { array, kind, .. } | Payload::Array { array, kind, .. } => format!(
                "<{} {:?}>",
                objects.array(array).map_or("?", |a| a.name()),
                kind,
            ),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
