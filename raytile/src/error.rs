//! Error types for the raytile scene layer
//!
//! Every failure this crate reports is a configuration error: a malformed
//! scene graph, an impossible grouping, a framebuffer that violates the
//! layout the backend expects, or invalid settings. Degenerate geometry is
//! never an error; the tiler resolves it locally by over-covering.

use std::fmt;

/// Result type for raytile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Raytile errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Scene graph is malformed (root is not an array, no camera, unknown node)
    InvalidSceneGraph(String),

    /// A surface's transform group and bounds group are not on one ancestor chain
    IncompatibleGroups(String),

    /// Supplied framebuffer violates size or stride requirements
    InvalidFramebuffer(String),

    /// Scene configuration is out of range (threads, tile size, thresholds)
    InvalidConfiguration(String),

    /// Worker pool or another subsystem failed to initialize
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSceneGraph(msg) => write!(f, "Invalid scene graph: {}", msg),
            Error::IncompatibleGroups(msg) => write!(f, "Incompatible groups: {}", msg),
            Error::InvalidFramebuffer(msg) => write!(f, "Invalid framebuffer: {}", msg),
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Build an [`Error`] of the given variant, logging it at ERROR level.
///
/// ```ignore
/// return Err(engine_err!("raytile::Scene", InvalidSceneGraph, "no camera in {}", name));
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::raytile::Error::$variant(message)
    }};
}

/// Log and return an [`Error`] of the given variant from the current function.
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $variant, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
