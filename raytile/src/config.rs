//! Scene configuration.
//!
//! Read once by `Scene::new`; options and antialiasing can be changed
//! between frames through `Scene::set_opts` / `Scene::set_fsaa`.

use bitflags::bitflags;
use crate::error::Result;
use crate::engine_bail;

bitflags! {
    /// Independently switchable scene optimizations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SceneOpts: u32 {
        /// Bin surfaces into screen tiles. Off: every tile gets the full
        /// global surface list.
        const TILING     = 1 << 0;
        /// Separate outer/inner relation lists per surface.
        const TWO_SIDED  = 1 << 1;
        /// Per-light shadow-caster lists. Off: every surface is a
        /// potential caster for every light.
        const SHADOWS    = 1 << 2;
        /// Incremental front-to-back ordering of relation lists.
        /// Off: plain head insertion.
        const SORTING    = 1 << 3;
        /// Thicken each silhouette edge by the tile margin before
        /// rasterizing it.
        const TILING_EXT = 1 << 4;
        /// Dispatch phases through the configured worker pool.
        /// Off: run every slice on the calling thread.
        const THREADING  = 1 << 5;
    }
}

impl Default for SceneOpts {
    fn default() -> Self {
        SceneOpts::all()
    }
}

/// Full screen antialiasing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fsaa {
    /// One ray per pixel
    #[default]
    Off,
    /// Four rotated-grid sub-samples per pixel
    X4,
}

/// Tunable thresholds used by tiling and projection.
///
/// `line` and `tile_margin` are in tile units, `clip` in world units
/// along the camera's forward axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Edges whose |dx| or |dy| is at most this are treated as
    /// axis-aligned runs (both: a single point stamp)
    pub line: f32,
    /// Perpendicular margin added on both ends of an edge when
    /// `SceneOpts::TILING_EXT` is set
    pub tile_margin: f32,
    /// Vertices closer than this to the screen plane count as in front
    pub clip: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            line: 0.01,
            tile_margin: 0.2,
            clip: 0.01,
        }
    }
}

/// Scene construction parameters
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Framebuffer width in pixels
    pub width: u32,
    /// Framebuffer height in pixels
    pub height: u32,
    /// Number of scene threads (slices). Surfaces are assigned by index
    /// modulo this count.
    pub thread_count: usize,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Ray recursion depth handed to the backend
    pub stack_depth: u32,
    /// Optimization switches
    pub opts: SceneOpts,
    /// Antialiasing mode
    pub fsaa: Fsaa,
    /// Tiling/projection thresholds
    pub thresholds: Thresholds,
    /// List elements per arena chunk
    pub arena_chunk: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            thread_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            tile_width: 8,
            tile_height: 8,
            stack_depth: 10,
            opts: SceneOpts::default(),
            fsaa: Fsaa::Off,
            thresholds: Thresholds::default(),
            arena_chunk: 4096,
        }
    }
}

impl SceneConfig {
    /// Check ranges. Called by `Scene::new`.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            engine_bail!("raytile::SceneConfig", InvalidConfiguration,
                "resolution {}x{} has a zero dimension", self.width, self.height);
        }
        if self.thread_count == 0 {
            engine_bail!("raytile::SceneConfig", InvalidConfiguration,
                "thread_count must be at least 1");
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            engine_bail!("raytile::SceneConfig", InvalidConfiguration,
                "tile size {}x{} has a zero dimension", self.tile_width, self.tile_height);
        }
        if self.tile_width > u16::MAX as u32 || self.tile_height > u16::MAX as u32 {
            engine_bail!("raytile::SceneConfig", InvalidConfiguration,
                "tile size {}x{} exceeds {}", self.tile_width, self.tile_height, u16::MAX);
        }
        if self.arena_chunk == 0 {
            engine_bail!("raytile::SceneConfig", InvalidConfiguration,
                "arena_chunk must be at least 1");
        }
        let t = &self.thresholds;
        for (name, value) in [("line", t.line), ("tile_margin", t.tile_margin), ("clip", t.clip)] {
            if !value.is_finite() || value < 0.0 {
                engine_bail!("raytile::SceneConfig", InvalidConfiguration,
                    "threshold '{}' must be finite and non-negative, got {}", name, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
