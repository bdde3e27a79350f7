//! Numeric backend seam
//!
//! The backend evaluates ray/surface intersections and shades pixels. The
//! scene only talks to it through two entry points: one call per surface
//! after its relation lists are rebuilt, and one call per worker to fill
//! that worker's share of the framebuffer.

mod mock_backend;

pub use mock_backend::{MockBackend, RenderCall, SurfaceCall};

use glam::Vec3;
use slotmap::SecondaryMap;
use crate::config::Fsaa;
use crate::framebuffer::FrameRows;
use crate::list::{ElementId, GroupKind, ListView};
use crate::scene::{CameraRays, ObjectStore, Surface, SurfaceKey, SurfaceLists};
use crate::tiling::TileBuffer;

/// Data pushed to the backend for one surface during the relations phase
pub struct SurfaceUpdate<'a> {
    pub key: SurfaceKey,
    pub surface: &'a Surface,
    /// Freshly rebuilt tile and relation list heads
    pub lists: &'a SurfaceLists,
    /// Which group kinds the surface is a member of
    pub groups: GroupKind,
}

/// Per-worker render descriptor
pub struct RenderContext<'a> {
    /// Camera rays and steppers for this worker
    pub rays: CameraRays,
    /// Camera ambient plus every light's contribution
    pub ambient: Vec3,
    pub tiles: &'a TileBuffer,
    /// Tile size in pixels
    pub tile_width: u32,
    pub tile_height: u32,
    /// Resolves every list id of the frame
    pub view: ListView<'a>,
    pub objects: &'a ObjectStore,
    /// Relation lists of every surface
    pub lists: &'a SecondaryMap<SurfaceKey, SurfaceLists>,
    /// Camera's surface list
    pub surfaces: Option<ElementId>,
    /// Camera's light list
    pub lights: Option<ElementId>,
    /// Worker slice
    pub index: usize,
    pub count: usize,
    /// Ray recursion depth
    pub depth: u32,
    pub fsaa: Fsaa,
    /// Framebuffer rows owned by this worker (`y % count == index`)
    pub rows: FrameRows<'a>,
}

/// Numeric backend entry points.
///
/// Both methods are called concurrently from worker threads, each call on
/// data no other worker touches.
pub trait Backend: Send + Sync {
    /// Push one surface's rebuilt lists into its numeric descriptor
    fn update_surface(&self, update: &SurfaceUpdate<'_>);

    /// Fill this worker's framebuffer rows
    fn render_frame(&self, context: &mut RenderContext<'_>);
}
