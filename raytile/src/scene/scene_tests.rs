/// Tests for Scene
///
/// These tests drive whole frames through the mock backend and check the
/// lists, tile buffer and framebuffer each phase leaves behind.

use super::*;
use crate::backend::MockBackend;
use crate::error::Error;
use crate::scene::camera::CameraFrame;
use crate::scene::dispatch::ScopedPool;
use crate::scene::graph::NodeDesc;
use crate::scene::hierarchy::StaticHierarchy;
use crate::scene::objects::AABB;
use crate::scene::visibility::BoundsVisibility;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Helper Functions
// ============================================================================

const OPAQUE: u32 = 0xFF00_0000;

/// Covers tile rows 2..=4 and columns 1..=3 of a 64x64 frame cut into 8x8 tiles
fn tile_box(z: f32) -> AABB {
    AABB::new(Vec3::new(-0.3125, -0.1875, 1.0) * z, Vec3::new(-0.0625, 0.0625, 1.0) * z)
}

fn desc(children: Vec<NodeDesc>) -> SceneDesc {
    let mut nodes = vec![
        NodeDesc::camera("camera", CameraFrame::default()),
        NodeDesc::light("lamp", Vec3::new(0.0, 0.0, -4.0), 0.5),
    ];
    nodes.extend(children);
    SceneDesc::new(NodeDesc::array("root", nodes))
}

fn config(thread_count: usize) -> SceneConfig {
    SceneConfig {
        width: 64,
        height: 64,
        thread_count,
        ..SceneConfig::default()
    }
}

fn create_scene(desc: &SceneDesc, config: SceneConfig) -> (Scene, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::new());
    let scene = Scene::new(
        desc,
        config,
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        backend.clone(),
        Box::new(ScopedPool::new()),
    )
    .unwrap();
    (scene, backend)
}

fn names(scene: &Scene, head: Option<ElementId>) -> Vec<String> {
    let objects = scene.objects();
    scene
        .list_view()
        .iter(head)
        .filter_map(|(_, e)| match e.payload {
            Payload::Surface(key) => Some(objects.surface(key).unwrap().name().to_string()),
            _ => None,
        })
        .collect()
}

/// Records dispatches and lifecycle calls, runs jobs serially
#[derive(Default)]
struct RecordingPool {
    phases: Arc<Mutex<Vec<Option<UpdatePhase>>>>,
    initialized: Arc<AtomicUsize>,
    terminated: Arc<AtomicBool>,
}

impl WorkerPool for RecordingPool {
    fn init(&mut self, thread_count: usize) -> Result<()> {
        self.initialized.store(thread_count, Ordering::SeqCst);
        Ok(())
    }

    fn terminate(&mut self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn dispatch_update<'a>(&mut self, phase: UpdatePhase, jobs: Vec<Job<'a>>) -> Result<()> {
        self.phases.lock().unwrap().push(Some(phase));
        SerialPool::new().dispatch_update(phase, jobs)
    }

    fn dispatch_render<'a>(&mut self, jobs: Vec<Job<'a>>) -> Result<()> {
        self.phases.lock().unwrap().push(None);
        SerialPool::new().dispatch_render(jobs)
    }
}

struct FailingPool;

impl WorkerPool for FailingPool {
    fn init(&mut self, _thread_count: usize) -> Result<()> {
        Err(Error::InitializationFailed("no workers".to_string()))
    }

    fn terminate(&mut self) {}

    fn dispatch_update<'a>(&mut self, _phase: UpdatePhase, _jobs: Vec<Job<'a>>) -> Result<()> {
        Ok(())
    }

    fn dispatch_render<'a>(&mut self, _jobs: Vec<Job<'a>>) -> Result<()> {
        Ok(())
    }
}

/// Moves every surface behind the camera from the first frame on
struct BehindCamera;

impl Hierarchy for BehindCamera {
    fn update(&mut self, _time: u64, _objects: &mut ObjectStore) -> Result<()> {
        Ok(())
    }

    fn update_surface(&self, _time: u64, _key: SurfaceKey, surface: &mut Surface) {
        let bounds = AABB::new(Vec3::new(-0.5, -0.5, -6.0), Vec3::new(0.5, 0.5, -5.0));
        surface.set_bounds(Some(bounds));
        surface.set_position(bounds.center());
    }
}

/// Puts "s1" into two sibling groups
struct SplitGroups;

impl Hierarchy for SplitGroups {
    fn update(&mut self, _time: u64, objects: &mut ObjectStore) -> Result<()> {
        let (g1, g2) = (objects.find_array("g1"), objects.find_array("g2"));
        if let Some(s1) = objects.find_surface("s1") {
            if let Some(surface) = objects.surface_mut(s1) {
                surface.set_groups(g1, g2);
            }
        }
        Ok(())
    }

    fn update_surface(&self, _time: u64, _key: SurfaceKey, _surface: &mut Surface) {}
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_allocates_framebuffer_and_tiles() {
    let (scene, _) = create_scene(&desc(vec![]), config(2));
    assert_eq!(scene.frame().width(), 64);
    assert_eq!(scene.frame().height(), 64);
    assert_eq!(scene.tile_buffer().tiles_in_row(), 8);
    assert_eq!(scene.tile_buffer().tiles_in_col(), 8);
    assert_eq!(scene.thread_count(), 2);
    assert_eq!(scene.frame_count(), 0);
}

#[test]
fn test_partial_tiles_round_up() {
    let config = SceneConfig { width: 70, height: 50, ..config(1) };
    let (scene, _) = create_scene(&desc(vec![]), config);
    assert_eq!(scene.tile_buffer().tiles_in_row(), 9);
    assert_eq!(scene.tile_buffer().tiles_in_col(), 7);
}

#[test]
fn test_new_builds_global_lists() {
    let (scene, _) = create_scene(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(1),
    );
    assert_eq!(names(&scene, scene.global_surfaces()), vec!["box"]);
    assert_eq!(scene.list_view().len(scene.global_lights()), 1);
}

#[test]
fn test_mismatched_framebuffer_rejected() {
    let result = Scene::new(
        &desc(vec![]),
        config(1),
        Some(Framebuffer::new(32, 64).unwrap()),
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(ScopedPool::new()),
    );
    assert!(matches!(result, Err(Error::InvalidFramebuffer(_))));
}

#[test]
fn test_supplied_framebuffer_is_used() {
    let framebuffer = Framebuffer::from_pixels(64, 64, 68, vec![7; 68 * 64]).unwrap();
    let scene = Scene::new(
        &desc(vec![]),
        config(1),
        Some(framebuffer),
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(ScopedPool::new()),
    )
    .unwrap();
    assert_eq!(scene.frame().row(), 68);
}

#[test]
fn test_invalid_config_rejected() {
    let result = Scene::new(
        &desc(vec![]),
        SceneConfig { tile_width: 0, ..config(1) },
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(ScopedPool::new()),
    );
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn test_root_must_be_array() {
    let result = Scene::new(
        &SceneDesc::new(NodeDesc::camera("camera", CameraFrame::default())),
        config(1),
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(ScopedPool::new()),
    );
    assert!(matches!(result, Err(Error::InvalidSceneGraph(_))));
}

#[test]
fn test_pool_init_failure_propagates() {
    let result = Scene::new(
        &desc(vec![]),
        config(1),
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(FailingPool),
    );
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_single_box_covers_nine_tiles() {
    let (mut scene, backend) = create_scene(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(2),
    );
    scene.render(0, DiagnosticMode::Off).unwrap();

    let tiles = scene.tile_buffer();
    let view = scene.list_view();
    let covered: Vec<(u32, u32)> = (0..8)
        .flat_map(|row| (0..8).map(move |col| (row, col)))
        .filter(|&(row, col)| view.len(tiles.get(row, col)) > 0)
        .collect();
    assert_eq!(covered.len(), 9);
    assert!(covered.iter().all(|&(row, col)| (2..=4).contains(&row) && (1..=3).contains(&col)));

    // Mock backend paints the tile list length
    assert_eq!(scene.frame().pixel(20, 28), Some(OPAQUE | 1));
    assert_eq!(scene.frame().pixel(0, 0), Some(OPAQUE));
    assert_eq!(backend.render_calls().len(), 2);
    assert_eq!(scene.frame_count(), 1);
}

#[test]
fn test_tiles_keep_front_to_back_order() {
    let (mut scene, _) = create_scene(
        &desc(vec![
            NodeDesc::surface("far", tile_box(2.0)),
            NodeDesc::surface("near", tile_box(1.0)),
        ]),
        config(2),
    );
    scene.render(0, DiagnosticMode::Off).unwrap();

    assert_eq!(names(&scene, scene.global_surfaces()), vec!["near", "far"]);
    assert_eq!(names(&scene, scene.tile_buffer().get(3, 2)), vec!["near", "far"]);
}

#[test]
fn test_tiling_off_gives_every_tile_the_global_list() {
    let mut config = config(1);
    config.opts.remove(SceneOpts::TILING);
    let (mut scene, _) = create_scene(
        &desc(vec![
            NodeDesc::surface("a", tile_box(1.0)),
            NodeDesc::surface("b", tile_box(3.0)),
        ]),
        config,
    );
    scene.render(0, DiagnosticMode::Off).unwrap();

    let global = scene.global_surfaces();
    assert!(scene.tile_buffer().heads().iter().all(|&head| head == global));
    assert_eq!(scene.frame().pixel(63, 63), Some(OPAQUE | 2));
}

#[test]
fn test_unbounded_surface_reaches_every_tile() {
    let (mut scene, _) = create_scene(
        &desc(vec![NodeDesc::unbounded_surface("floor", Vec3::new(0.0, 1.0, 0.0))]),
        config(3),
    );
    scene.render(0, DiagnosticMode::Off).unwrap();

    let view = scene.list_view();
    assert!(scene.tile_buffer().heads().iter().all(|&head| view.len(head) == 1));
}

#[test]
fn test_backend_sees_every_surface_each_frame() {
    let (mut scene, backend) = create_scene(
        &desc(vec![
            NodeDesc::group("xf", vec![NodeDesc::surface("a", tile_box(2.0))], true, false),
            NodeDesc::surface("b", tile_box(1.0)),
        ]),
        config(2),
    );
    scene.render(0, DiagnosticMode::Off).unwrap();
    scene.render(16, DiagnosticMode::Off).unwrap();

    let calls = backend.surface_calls();
    assert_eq!(calls.len(), 4);

    let a = scene.objects().find_surface("a").unwrap();
    let b = scene.objects().find_surface("b").unwrap();
    let last: Vec<_> = calls[2..].to_vec();
    let call_a = last.iter().find(|c| c.key == a).unwrap();
    let call_b = last.iter().find(|c| c.key == b).unwrap();
    assert_eq!(call_a.groups, GroupKind::TRANSFORM);
    assert_eq!(call_b.groups, GroupKind::empty());
    assert_eq!(Some(&call_b.lists), scene.surface_lists(b));
}

#[test]
fn test_threaded_and_serial_frames_match() {
    let scene_desc = desc(vec![
        NodeDesc::surface("near", tile_box(1.0)),
        NodeDesc::surface("far", tile_box(2.5)),
        NodeDesc::unbounded_surface("floor", Vec3::new(0.0, 2.0, 0.0)),
    ]);

    let (mut threaded, _) = create_scene(&scene_desc, config(4));
    let mut serial_config = config(4);
    serial_config.opts.remove(SceneOpts::THREADING);
    let (mut serial, _) = create_scene(&scene_desc, serial_config);

    threaded.render(0, DiagnosticMode::Off).unwrap();
    serial.render(0, DiagnosticMode::Off).unwrap();
    assert_eq!(threaded.frame().pixels(), serial.frame().pixels());
    assert_eq!(
        names(&threaded, threaded.global_surfaces()),
        names(&serial, serial.global_surfaces()),
    );
}

#[test]
fn test_hierarchy_moves_surface_out_of_view() {
    let backend = Arc::new(MockBackend::new());
    let mut scene = Scene::new(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(2),
        None,
        Box::new(BehindCamera),
        Box::new(BoundsVisibility::new()),
        backend,
        Box::new(ScopedPool::new()),
    )
    .unwrap();
    assert!(scene.global_surfaces().is_some());

    scene.render(0, DiagnosticMode::Off).unwrap();
    assert!(scene.global_surfaces().is_none());
    assert!(scene.tile_buffer().heads().iter().all(Option::is_none));
}

#[test]
fn test_incompatible_regrouping_fails_frame() {
    let mut scene = Scene::new(
        &desc(vec![
            NodeDesc::group("g1", vec![NodeDesc::surface("s1", tile_box(1.0))], true, false),
            NodeDesc::group("g2", vec![NodeDesc::surface("s2", tile_box(2.0))], false, true),
        ]),
        config(1),
        None,
        Box::new(SplitGroups),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(ScopedPool::new()),
    )
    .unwrap();

    let result = scene.render(0, DiagnosticMode::Off);
    assert!(matches!(result, Err(Error::IncompatibleGroups(_))));
    assert_eq!(scene.frame_count(), 0);
}

#[test]
fn test_release_frame_empties_lists_and_keeps_frame() {
    let (mut scene, _) = create_scene(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(2),
    );
    scene.render(0, DiagnosticMode::Off).unwrap();
    let rendered = scene.frame().pixels().to_vec();
    let box_key = scene.objects().find_surface("box").unwrap();
    let marks: Vec<usize> = scene.arenas.iter().map(|a| a.high_water_mark()).collect();
    assert!(marks.iter().any(|&mark| mark > 0));

    scene.release_frame();

    assert!(scene.arenas.iter().all(|a| a.is_empty()));
    let after: Vec<usize> = scene.arenas.iter().map(|a| a.high_water_mark()).collect();
    assert_eq!(after, marks);
    assert!(scene.global_surfaces().is_none());
    assert!(scene.global_lights().is_none());
    assert!(scene.tile_buffer().heads().iter().all(|head| head.is_none()));
    assert_eq!(scene.surface_lists(box_key), Some(&SurfaceLists::default()));
    assert_eq!(scene.frame().pixels(), rendered.as_slice());

    // The next frame rebuilds everything from the released arenas
    scene.render(16, DiagnosticMode::Off).unwrap();
    assert_eq!(names(&scene, scene.global_surfaces()), vec!["box"]);
    assert_eq!(scene.frame().pixels(), rendered.as_slice());
    assert_eq!(scene.frame_count(), 2);
}

#[test]
fn test_ambient_sums_camera_and_lights() {
    let (mut scene, _) = create_scene(&desc(vec![]), config(1));
    scene.render(0, DiagnosticMode::Off).unwrap();
    assert_eq!(scene.ambient(), Vec3::splat(0.5));
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_phases_dispatched_in_order() {
    let pool = RecordingPool::default();
    let (phases, initialized, terminated) =
        (pool.phases.clone(), pool.initialized.clone(), pool.terminated.clone());

    let scene = Scene::new(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(3),
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(pool),
    );
    let mut scene = scene.unwrap();
    assert_eq!(initialized.load(Ordering::SeqCst), 3);

    scene.render(0, DiagnosticMode::Off).unwrap();
    assert_eq!(
        *phases.lock().unwrap(),
        vec![Some(UpdatePhase::Tiling), Some(UpdatePhase::Relations), None],
    );

    drop(scene);
    assert!(terminated.load(Ordering::SeqCst));
}

#[test]
fn test_injected_pool_bypassed_without_threading() {
    let pool = RecordingPool::default();
    let phases = pool.phases.clone();
    let mut config = config(2);
    config.opts.remove(SceneOpts::THREADING);

    let mut scene = Scene::new(
        &desc(vec![]),
        config,
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(pool),
    )
    .unwrap();
    scene.render(0, DiagnosticMode::Off).unwrap();
    assert!(phases.lock().unwrap().is_empty());
}

#[test]
fn test_dump_runs_serially_once() {
    let pool = RecordingPool::default();
    let phases = pool.phases.clone();
    let mut scene = Scene::new(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(2),
        None,
        Box::new(StaticHierarchy::new()),
        Box::new(BoundsVisibility::new()),
        Arc::new(MockBackend::new()),
        Box::new(pool),
    )
    .unwrap();

    scene.print_state();
    scene.render(0, DiagnosticMode::Off).unwrap();
    assert!(phases.lock().unwrap().is_empty());

    scene.render(16, DiagnosticMode::Off).unwrap();
    assert_eq!(phases.lock().unwrap().len(), 3);

    scene.render(32, DiagnosticMode::DumpState).unwrap();
    assert_eq!(phases.lock().unwrap().len(), 3);
    assert_eq!(scene.frame_count(), 3);
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_opts_and_fsaa_apply_next_frame() {
    let (mut scene, backend) = create_scene(
        &desc(vec![NodeDesc::surface("box", tile_box(1.0))]),
        config(2),
    );
    scene.set_fsaa(Fsaa::X4);
    assert_eq!(scene.fsaa(), Fsaa::X4);

    scene.set_opts(SceneOpts::all() - SceneOpts::TILING);
    assert!(!scene.opts().contains(SceneOpts::TILING));
    scene.render(0, DiagnosticMode::Off).unwrap();

    let calls = backend.render_calls();
    assert!(calls.iter().all(|call| call.tile_lengths.iter().all(|&len| len == 1)));
}
