/// Per-frame bump arena over fixed-size chunks.
///
/// Values are appended and addressed by a dense `usize` index that stays
/// valid until the next [`release`](FrameArena::release). Nothing is ever
/// freed individually: the whole arena is emptied in bulk at frame end.
/// Chunks keep their capacity across frames, and [`reserve`](FrameArena::reserve)
/// pre-sizes the arena to the largest frame seen so far so steady-state
/// frames allocate no chunk memory.
///
/// # Example
///
/// ```ignore
/// let mut arena = FrameArena::new(4);
/// arena.reserve();
/// let a = arena.alloc('a'); // 0
/// let b = arena.alloc('b'); // 1
/// assert_eq!(arena.get(b), Some(&'b'));
/// arena.release();          // both gone, high-water mark stays 2
/// ```
#[derive(Debug)]
pub struct FrameArena<T> {
    chunks: Vec<Vec<T>>,
    chunk_size: usize,
    len: usize,
    high_water_mark: usize,
}

impl<T> FrameArena<T> {
    /// Create an empty arena whose chunks hold `chunk_size` values
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunks: Vec::new(),
            chunk_size: chunk_size.max(1),
            len: 0,
            high_water_mark: 0,
        }
    }

    /// Start a frame: empty the arena and make sure enough chunks exist
    /// for the largest frame seen so far.
    pub fn reserve(&mut self) {
        self.release();
        let needed = self.high_water_mark.div_ceil(self.chunk_size);
        while self.chunks.len() < needed {
            self.chunks.push(Vec::with_capacity(self.chunk_size));
        }
    }

    /// Append a value and return its index
    pub fn alloc(&mut self, value: T) -> usize {
        let index = self.len;
        let chunk = index / self.chunk_size;
        if chunk == self.chunks.len() {
            self.chunks.push(Vec::with_capacity(self.chunk_size));
        }
        self.chunks[chunk].push(value);
        self.len += 1;
        self.high_water_mark = self.high_water_mark.max(self.len);
        index
    }

    /// Value at `index`, if allocated this frame
    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(index / self.chunk_size)
            .and_then(|chunk| chunk.get(index % self.chunk_size))
    }

    /// Mutable value at `index`, if allocated this frame
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let chunk_size = self.chunk_size;
        self.chunks
            .get_mut(index / chunk_size)
            .and_then(|chunk| chunk.get_mut(index % chunk_size))
    }

    /// End a frame: drop every value, keep chunk memory
    pub fn release(&mut self) {
        for chunk in &mut self.chunks {
            chunk.clear();
        }
        self.len = 0;
    }

    /// Values allocated since the last release
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was allocated since the last release
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest `len()` ever reached
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Number of chunks currently held
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl<T> std::ops::Index<usize> for FrameArena<T> {
    type Output = T;

    /// Panics if `index` was not allocated this frame
    fn index(&self, index: usize) -> &T {
        &self.chunks[index / self.chunk_size][index % self.chunk_size]
    }
}

impl<T> std::ops::IndexMut<usize> for FrameArena<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let chunk_size = self.chunk_size;
        &mut self.chunks[index / chunk_size][index % chunk_size]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "frame_arena_tests.rs"]
mod tests;
