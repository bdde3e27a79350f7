/// Hierarchy update strategies.
///
/// A Hierarchy animates the scene's objects each frame. Two separate
/// phases: a single-threaded pass over the whole store (camera, lights,
/// group assignments), then a per-surface pass run in parallel before
/// each surface is tiled.

use crate::error::Result;
use super::objects::{ObjectStore, Surface, SurfaceKey};

/// Strategy for producing world-space object data.
///
/// `update` runs once per frame before anything else and may touch any
/// object. `update_surface` runs on worker threads, each call owning only
/// the surface it is given.
pub trait Hierarchy: Send + Sync {
    /// Animate the store for `time` (milliseconds).
    ///
    /// Group reassignments made here are re-validated by the scene.
    fn update(&mut self, time: u64, objects: &mut ObjectStore) -> Result<()>;

    /// Recompute one surface's position and bounding polyhedron
    fn update_surface(&self, time: u64, key: SurfaceKey, surface: &mut Surface);
}

/// Static hierarchy: objects keep the data they were described with.
pub struct StaticHierarchy;

impl StaticHierarchy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StaticHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy for StaticHierarchy {
    fn update(&mut self, _time: u64, _objects: &mut ObjectStore) -> Result<()> {
        Ok(())
    }

    fn update_surface(&self, _time: u64, _key: SurfaceKey, _surface: &mut Surface) {}
}
