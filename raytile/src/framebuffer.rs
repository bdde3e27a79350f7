/// Framebuffer the backend renders into.
///
/// 32-bit ARGB pixels, row-major, with a row stride (`row`) of at least
/// `width` pixels. The backend writes pixels four at a time, so the stride
/// must be a multiple of four.

use crate::error::Result;
use crate::engine_bail;

/// Glyph width in pixels
const DIGIT_W: usize = 5;
/// Glyph height in pixels
const DIGIT_H: usize = 7;

const INK: u32 = 0xFF00_0000;
const PAPER: u32 = 0xFFFF_FFFF;

/// 5x7 digit glyphs, one 5-bit mask per row (bit 4 is the leftmost
/// pixel). Set bits are ink, clear bits paper.
const DIGITS: [[u8; DIGIT_H]; 10] = [
    [0b00000, 0b01110, 0b01010, 0b01010, 0b01010, 0b01110, 0b00000],
    [0b00000, 0b00100, 0b01100, 0b00100, 0b00100, 0b01110, 0b00000],
    [0b00000, 0b01110, 0b00010, 0b01110, 0b01000, 0b01110, 0b00000],
    [0b00000, 0b01110, 0b00010, 0b01110, 0b00010, 0b01110, 0b00000],
    [0b00000, 0b01010, 0b01010, 0b01110, 0b00010, 0b00010, 0b00000],
    [0b00000, 0b01110, 0b01000, 0b01110, 0b00010, 0b01110, 0b00000],
    [0b00000, 0b01110, 0b01000, 0b01110, 0b01010, 0b01110, 0b00000],
    [0b00000, 0b01110, 0b00010, 0b00010, 0b00010, 0b00010, 0b00000],
    [0b00000, 0b01110, 0b01010, 0b01110, 0b01010, 0b01110, 0b00000],
    [0b00000, 0b01110, 0b01010, 0b01110, 0b00010, 0b01110, 0b00000],
];

/// Which way a number grows from its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    /// Anchor is the left edge of the first digit
    Right,
    /// Anchor is the right edge of the last digit
    Left,
}

#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    row: u32,
    pixels: Vec<u32>,
}

impl Framebuffer {
    /// Allocate a cleared framebuffer, stride rounded up to four pixels
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let row = width.next_multiple_of(4);
        Self::from_pixels(width, height, row, vec![0; row as usize * height as usize])
    }

    /// Wrap caller-provided pixels
    pub fn from_pixels(width: u32, height: u32, row: u32, pixels: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            engine_bail!("raytile::Framebuffer", InvalidFramebuffer,
                "size {}x{} has a zero dimension", width, height);
        }
        if row < width {
            engine_bail!("raytile::Framebuffer", InvalidFramebuffer,
                "row stride {} is shorter than width {}", row, width);
        }
        if row % 4 != 0 {
            engine_bail!("raytile::Framebuffer", InvalidFramebuffer,
                "row stride {} is not a multiple of 4 pixels", row);
        }
        let needed = row as usize * height as usize;
        if pixels.len() < needed {
            engine_bail!("raytile::Framebuffer", InvalidFramebuffer,
                "{} pixels supplied, {} needed for {} rows of {}", pixels.len(), needed, height, row);
        }
        Ok(Self { width, height, row, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in pixels
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Raw bytes, e.g. for uploading to a presentation surface
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Pixel at (`x`, `y`), if inside the visible area
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.row + x) as usize).copied()
    }

    /// Fill the visible area with `color`
    pub fn clear(&mut self, color: u32) {
        let width = self.width as usize;
        for row in self.pixels.chunks_mut(self.row as usize).take(self.height as usize) {
            row[..width].fill(color);
        }
    }

    /// Split visible rows between `count` workers: row `y` goes to
    /// worker `y % count`.
    pub fn split_rows(&mut self, count: usize) -> Vec<FrameRows<'_>> {
        let count = count.max(1);
        let width = self.width as usize;
        let mut workers: Vec<FrameRows<'_>> = (0..count)
            .map(|_| FrameRows { width: self.width, rows: Vec::new() })
            .collect();
        for (y, row) in self
            .pixels
            .chunks_mut(self.row as usize)
            .take(self.height as usize)
            .enumerate()
        {
            let (visible, _) = row.split_at_mut(width);
            workers[y % count].rows.push((y as u32, visible));
        }
        workers
    }

    /// Draw `value` in decimal with 5x7 glyphs scaled by `zoom`, anchored
    /// at (`x`, `y`). Pixels outside the frame are skipped.
    pub fn draw_number(&mut self, x: u32, y: u32, direction: TextDirection, zoom: u32, value: u64) {
        let digits: Vec<usize> = value.to_string().bytes().map(|b| (b - b'0') as usize).collect();
        let zoom = zoom.max(1) as i64;
        let glyph_w = DIGIT_W as i64 * zoom;
        let origin_x = match direction {
            TextDirection::Right => x as i64,
            TextDirection::Left => x as i64 - glyph_w * digits.len() as i64,
        };

        for (i, &digit) in digits.iter().enumerate() {
            let left = origin_x + i as i64 * glyph_w;
            for (gy, mask) in DIGITS[digit].iter().enumerate() {
                for gx in 0..DIGIT_W {
                    let color = if mask & (1 << (DIGIT_W - 1 - gx)) != 0 { INK } else { PAPER };
                    for zy in 0..zoom {
                        for zx in 0..zoom {
                            let px = left + gx as i64 * zoom + zx;
                            let py = y as i64 + gy as i64 * zoom + zy;
                            self.put(px, py, color);
                        }
                    }
                }
            }
        }
    }

    fn put(&mut self, x: i64, y: i64, color: u32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let index = y as usize * self.row as usize + x as usize;
        self.pixels[index] = color;
    }
}

/// One worker's share of the framebuffer rows
pub struct FrameRows<'a> {
    width: u32,
    rows: Vec<(u32, &'a mut [u32])>,
}

impl<'a> FrameRows<'a> {
    /// Visible width of every row
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows owned
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(y, pixels)` for every owned row, top to bottom
    pub fn iter_mut(&mut self) -> RowsIterMut<'_, 'a> {
        RowsIterMut { inner: self.rows.iter_mut() }
    }

    /// Pixels of frame row `y`, if owned
    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u32]> {
        self.rows
            .iter_mut()
            .find(|(row_y, _)| *row_y == y)
            .map(|(_, row)| &mut **row)
    }
}

/// Mutable iterator over the rows of a [`FrameRows`]
pub struct RowsIterMut<'r, 'a> {
    inner: std::slice::IterMut<'r, (u32, &'a mut [u32])>,
}

impl<'r, 'a> Iterator for RowsIterMut<'r, 'a> {
    type Item = (u32, &'r mut [u32]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(y, row)| (*y, &mut **row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for RowsIterMut<'_, '_> {}

#[cfg(test)]
#[path = "framebuffer_tests.rs"]
mod tests;
