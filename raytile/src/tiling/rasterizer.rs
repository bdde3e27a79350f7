/// Tile rasterizer.
///
/// Turns projected silhouette edges (in tile-fractional coordinates, one
/// unit per tile) into an inclusive column interval per tile row. The
/// intervals only ever widen while one surface's edges are processed,
/// so edge order does not matter and the result is the tightest interval
/// covering the silhouette's extent in each row.

use glam::Vec2;
use crate::config::Thresholds;

/// Per-row inclusive column bounds for the surface being tiled.
///
/// A row with `min > max` is empty.
#[derive(Debug, Clone)]
pub struct TileBounds {
    min: Vec<i32>,
    max: Vec<i32>,
    tiles_in_row: i32,
}

impl TileBounds {
    /// Bounds for a grid of `tiles_in_row` columns and `tiles_in_col` rows,
    /// every row empty
    pub fn new(tiles_in_row: u32, tiles_in_col: u32) -> Self {
        let mut bounds = Self {
            min: vec![0; tiles_in_col as usize],
            max: vec![0; tiles_in_col as usize],
            tiles_in_row: tiles_in_row as i32,
        };
        bounds.clear();
        bounds
    }

    /// Reset every row to the empty sentinel range
    pub fn clear(&mut self) {
        self.min.fill(self.tiles_in_row);
        self.max.fill(-1);
    }

    /// Mark every tile of the grid
    pub fn fill(&mut self) {
        self.min.fill(0);
        self.max.fill(self.tiles_in_row - 1);
    }

    /// Number of tile rows
    pub fn rows(&self) -> usize {
        self.min.len()
    }

    /// Number of tile columns
    pub fn columns(&self) -> usize {
        self.tiles_in_row as usize
    }

    /// Inclusive column range of `row`, or `None` if the row is empty
    pub fn row(&self, row: usize) -> Option<(u32, u32)> {
        let (min, max) = (*self.min.get(row)?, *self.max.get(row)?);
        (min <= max).then_some((min as u32, max as u32))
    }

    /// Total number of marked tiles
    pub fn tile_count(&self) -> usize {
        (0..self.rows())
            .filter_map(|r| self.row(r))
            .map(|(min, max)| (max - min + 1) as usize)
            .sum()
    }

    /// Widen `row` to cover columns `x1..=x2` (either order), clamped to
    /// the grid
    fn widen(&mut self, row: i32, x1: i32, x2: i32) {
        let (lo, hi) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
        let row = row as usize;
        if self.min[row] > lo {
            self.min[row] = lo.max(0);
        }
        if self.max[row] < hi {
            self.max[row] = hi.min(self.tiles_in_row - 1);
        }
    }

    /// Add one silhouette edge.
    ///
    /// Near-degenerate edges (|dx| and |dy| both within `thresholds.line`)
    /// are stamped as points; edges near-degenerate on one axis are
    /// treated as straight runs. With `extend` the edge is first grown by
    /// `thresholds.tile_margin` at both ends and doubled by two parallel
    /// copies offset by the same margin, so projection error cannot leave
    /// a gap.
    pub fn rasterize_edge(&mut self, p1: Vec2, p2: Vec2, thresholds: &Thresholds, extend: bool) {
        let (p1, p2) = if p1.y > p2.y { (p2, p1) } else { (p1, p2) };

        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        let flat_x = dx.abs() <= thresholds.line;
        let flat_y = dy.abs() <= thresholds.line;

        let (slope, along) = if flat_x && flat_y {
            (0.0, Vec2::new(if dx < 0.0 { -1.0 } else { 1.0 }, 1.0))
        } else if flat_x || flat_y {
            (0.0, Vec2::new(dx, dy))
        } else {
            (dx / dy, Vec2::new(dx, dy))
        };

        if extend {
            let step = along * (thresholds.tile_margin / along.length());
            let normal = Vec2::new(-step.y, step.x);
            let a = p1 - step;
            let b = p2 + step;
            self.rasterize_line(a, b, slope);
            self.rasterize_line(a + normal, b + normal, slope);
            self.rasterize_line(a - normal, b - normal, slope);
        } else {
            self.rasterize_line(p1, p2, slope);
        }
    }

    /// Walk one line (`p1.y <= p2.y`) row by row
    fn rasterize_line(&mut self, p1: Vec2, p2: Vec2, slope: f32) {
        let xmin = 0;
        let xmax = self.tiles_in_row - 1;
        let ymin = 0;
        let ymax = self.rows() as i32 - 1;

        let mut x1 = p1.x.floor() as i32;
        let mut y1 = p1.y.floor() as i32;
        let mut x2 = p2.x.floor() as i32;
        let mut y2 = p2.y.floor() as i32;

        if y1 > ymax || y2 < ymin {
            return;
        }

        // Vertical, horizontal, single-row or entirely outside in x
        if x1 == x2
            || y1 == y2
            || slope == 0.0
            || (x1 < xmin && x2 < xmin)
            || (x1 > xmax && x2 > xmax)
        {
            for row in y1.max(ymin)..=y2.min(ymax) {
                self.widen(row, x1, x2);
            }
            return;
        }

        // Regular line: partial first row, whole rows, partial last row
        y1 = if y1 < ymin { ymin } else { y1 + 1 };
        y2 = if y2 > ymax { ymax } else { y2 - 1 };

        let mut px = p1.x + (y1 as f32 - p1.y) * slope;
        x2 = px.floor() as i32;
        if y1 > ymin {
            self.widen(y1 - 1, x1, x2);
        }
        x1 = x2;

        for row in y1..=y2 {
            px += slope;
            x2 = px.floor() as i32;
            self.widen(row, x1, x2);
            x1 = x2;
        }

        if y2 < ymax {
            x2 = p2.x.floor() as i32;
            self.widen(y2 + 1, x1, x2);
        }
    }
}

#[cfg(test)]
#[path = "rasterizer_tests.rs"]
mod tests;
