/// Screen tile buffer: one list head per tile, rebuilt every frame.

use crate::list::{ElementArena, ElementId, ListElement, ListView, OrderTag};

/// Row-major grid of tile list heads
#[derive(Debug, Clone)]
pub struct TileBuffer {
    tiles_in_row: u32,
    tiles_in_col: u32,
    heads: Vec<Option<ElementId>>,
    tails: Vec<Option<ElementId>>,
}

impl TileBuffer {
    /// Empty buffer of `tiles_in_row` columns by `tiles_in_col` rows
    pub fn new(tiles_in_row: u32, tiles_in_col: u32) -> Self {
        let count = (tiles_in_row * tiles_in_col) as usize;
        Self {
            tiles_in_row,
            tiles_in_col,
            heads: vec![None; count],
            tails: vec![None; count],
        }
    }

    /// Columns of tiles
    pub fn tiles_in_row(&self) -> u32 {
        self.tiles_in_row
    }

    /// Rows of tiles
    pub fn tiles_in_col(&self) -> u32 {
        self.tiles_in_col
    }

    /// List head of tile (`row`, `col`)
    pub fn get(&self, row: u32, col: u32) -> Option<ElementId> {
        if row >= self.tiles_in_col || col >= self.tiles_in_row {
            return None;
        }
        self.heads[(row * self.tiles_in_row + col) as usize]
    }

    /// All heads, row-major
    pub fn heads(&self) -> &[Option<ElementId>] {
        &self.heads
    }

    /// Empty every tile
    pub fn clear(&mut self) {
        self.heads.fill(None);
        self.tails.fill(None);
    }

    /// Give every tile the same list (tiling disabled)
    pub fn fill(&mut self, head: Option<ElementId>) {
        self.heads.fill(head);
        self.tails.fill(None);
    }

    /// Rebuild from per-surface tile lists, given in global list order.
    ///
    /// Every tagged element is copied into `arena` and appended to its
    /// tile, so each tile keeps the front-to-back order of the global
    /// list. The per-surface lists are left intact.
    pub fn merge<I>(&mut self, arena: &mut ElementArena, view: ListView<'_>, tile_lists: I)
    where
        I: IntoIterator<Item = Option<ElementId>>,
    {
        self.clear();
        for head in tile_lists {
            for (_, element) in view.iter(head) {
                if let OrderTag::Tile { row, col } = element.order {
                    self.append(arena, row, col, ListElement::new(element.backref, element.payload));
                }
            }
        }
    }

    fn append(&mut self, arena: &mut ElementArena, row: u32, col: u32, element: ListElement) {
        if row >= self.tiles_in_col || col >= self.tiles_in_row {
            return;
        }
        let slot = (row * self.tiles_in_row + col) as usize;
        let id = arena.alloc(element);
        match self.tails[slot] {
            Some(tail) => arena[tail].next = Some(id),
            None => self.heads[slot] = Some(id),
        }
        self.tails[slot] = Some(id);
    }
}

#[cfg(test)]
#[path = "tile_buffer_tests.rs"]
mod tests;
