/*!
# Raytile

Scene preparation stage of a real-time tiled software ray tracer.

Each frame a [`Scene`](raytile::scene::Scene) bins surfaces into screen
tiles, builds ordered relation lists (which surfaces and lights every
surface can see), and hands everything to a numeric backend that traces
the framebuffer in parallel slices.

## Architecture

- **Tiling**: silhouette projection and edge rasterization into tiles
- **Lists**: arena-allocated linked lists, the sorting list builder and the flattener
- **Scene**: object store, per-thread list building and frame orchestration
- **Backend**: trait seam for the numeric tracer (a recording mock is provided)
- **Framebuffer**: 32-bit pixel buffer with interleaved worker rows

Worker threads and the hierarchy animation are injected through traits,
so the scene can run on any thread pool.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod utils;
pub mod list;
pub mod tiling;
pub mod scene;
pub mod backend;
pub mod framebuffer;

// Main raytile namespace module
pub mod raytile {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-wide services
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{Fsaa, SceneConfig, SceneOpts, Thresholds};

    // Framebuffer
    pub use crate::framebuffer::{FrameRows, Framebuffer, RowsIterMut, TextDirection};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{ConsoleLogger, LogEntry, LogSeverity, Logger};
    }

    // Per-frame lists
    pub mod list {
        pub use crate::list::*;
    }

    // Screen tiling
    pub mod tiling {
        pub use crate::tiling::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Backend seam
    pub mod backend {
        pub use crate::backend::*;
    }
}

// Re-export math library at crate root
pub use glam;
