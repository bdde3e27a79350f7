/// Mock backend (no numeric kernels required)
///
/// Records every call so scene orchestration can be tested without a real
/// tracer. Rendering paints each pixel with the length of its tile list,
/// which makes tile coverage visible in the framebuffer.

use std::sync::Mutex;
use crate::list::GroupKind;
use crate::scene::{SurfaceKey, SurfaceLists};
use super::{Backend, RenderContext, SurfaceUpdate};

/// Alpha bits of every painted pixel
const OPAQUE: u32 = 0xFF00_0000;

// ============================================================================
// Recorded calls
// ============================================================================

/// One `update_surface` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCall {
    pub key: SurfaceKey,
    pub lists: SurfaceLists,
    pub groups: GroupKind,
}

/// One `render_frame` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub index: usize,
    pub count: usize,
    /// Rows handed to the worker
    pub rows: usize,
    /// Length of every tile list, row-major
    pub tile_lengths: Vec<usize>,
}

// ============================================================================
// Mock Backend
// ============================================================================

#[derive(Debug, Default)]
pub struct MockBackend {
    surfaces: Mutex<Vec<SurfaceCall>>,
    renders: Mutex<Vec<RenderCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface updates recorded so far
    pub fn surface_calls(&self) -> Vec<SurfaceCall> {
        self.surfaces.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Render calls recorded so far, in call order
    pub fn render_calls(&self) -> Vec<RenderCall> {
        self.renders.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Forget every recorded call
    pub fn reset(&self) {
        if let Ok(mut calls) = self.surfaces.lock() {
            calls.clear();
        }
        if let Ok(mut calls) = self.renders.lock() {
            calls.clear();
        }
    }
}

impl Backend for MockBackend {
    fn update_surface(&self, update: &SurfaceUpdate<'_>) {
        if let Ok(mut calls) = self.surfaces.lock() {
            calls.push(SurfaceCall {
                key: update.key,
                lists: *update.lists,
                groups: update.groups,
            });
        }
    }

    fn render_frame(&self, context: &mut RenderContext<'_>) {
        let view = context.view;
        let tile_lengths: Vec<usize> = context
            .tiles
            .heads()
            .iter()
            .map(|&head| view.len(head))
            .collect();

        let tiles_in_row = context.tiles.tiles_in_row() as usize;
        let (tile_w, tile_h) = (context.tile_width as usize, context.tile_height as usize);
        for (y, row) in context.rows.iter_mut() {
            let tile_row = y as usize / tile_h;
            for (x, pixel) in row.iter_mut().enumerate() {
                let length = tile_lengths
                    .get(tile_row * tiles_in_row + x / tile_w)
                    .copied()
                    .unwrap_or(0);
                *pixel = OPAQUE | length as u32;
            }
        }

        if let Ok(mut calls) = self.renders.lock() {
            calls.push(RenderCall {
                index: context.index,
                count: context.count,
                rows: context.rows.len(),
                tile_lengths,
            });
        }
    }
}

#[cfg(test)]
#[path = "mock_backend_tests.rs"]
mod tests;
