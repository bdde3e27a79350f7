/// List elements and the per-thread arenas that hold them.
///
/// Every list the scene builds (tile lists, surface lists, light lists,
/// shadow lists, group sublists) is a singly-linked chain of
/// [`ListElement`]s addressed by [`ElementId`]. Elements live in an
/// [`ElementArena`] for exactly one frame and are released in bulk.

use bitflags::bitflags;
use crate::scene::{ArrayKey, LightKey, SurfaceKey};
use crate::utils::FrameArena;

// ===== ELEMENT ID =====

/// Handle to an element: which arena, and where in it.
///
/// Arena 0 belongs to the scene (global lists, tile buffer), arena `k + 1`
/// to scene thread `k`. Ids are only valid until the owning arena is
/// released at frame end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    arena: u32,
    index: u32,
}

impl ElementId {
    /// Arena this element was allocated from
    pub fn arena(&self) -> usize {
        self.arena as usize
    }

    /// Position inside that arena
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

// ===== GROUP KIND =====

bitflags! {
    /// Why a group node exists. One array may be both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GroupKind: u8 {
        /// Members share one coordinate-frame transform
        const TRANSFORM = 1 << 0;
        /// Members share one bounding-volume test
        const BOUNDS    = 1 << 1;
    }
}

// ===== BACKREF / PAYLOAD =====

/// Object an element was derived from. Drives grouping and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backref {
    None,
    Surface(SurfaceKey),
    Light(LightKey),
    Group(ArrayKey),
}

/// What the backend sees for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// A surface's descriptor
    Surface(SurfaceKey),
    /// A light's descriptor plus its shadow-caster list
    Light {
        light: LightKey,
        shadows: Option<ElementId>,
    },
    /// Unflattened group node owning its own sublist
    Group {
        array: ArrayKey,
        kind: GroupKind,
        sublist: Option<ElementId>,
    },
    /// Flattened group node: the group's descriptor and the last element
    /// that belongs to the group in the flat chain
    Array {
        array: ArrayKey,
        kind: GroupKind,
        last: ElementId,
    },
}

// ===== ORDER =====

/// Result of comparing two neighbours for a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Already in order, stop scanning
    Keep,
    /// The later element belongs in front
    Swap,
    /// No preference, keep scanning
    Neutral,
    /// Cannot be compared, stop scanning
    Unsortable,
}

/// Scratch tag carried by an element for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderTag {
    #[default]
    Clear,
    /// Tile coordinates while the element sits in a tile list
    Tile { row: u32, col: u32 },
    /// Cached comparison against the next element
    Cached(Order),
}

// ===== LIST ELEMENT =====

/// One link of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListElement {
    pub next: Option<ElementId>,
    pub backref: Backref,
    pub payload: Payload,
    pub order: OrderTag,
}

impl ListElement {
    /// Unlinked element with a clear tag
    pub fn new(backref: Backref, payload: Payload) -> Self {
        Self {
            next: None,
            backref,
            payload,
            order: OrderTag::Clear,
        }
    }

    /// Whether this element is a group node (flattened or not)
    pub fn is_group(&self) -> bool {
        matches!(self.payload, Payload::Group { .. } | Payload::Array { .. })
    }
}

// ===== ELEMENT ARENA =====

/// Per-thread element storage for one frame
#[derive(Debug)]
pub struct ElementArena {
    id: u32,
    elements: FrameArena<ListElement>,
}

impl ElementArena {
    /// Create arena number `id` with chunks of `chunk_size` elements
    pub fn new(id: usize, chunk_size: usize) -> Self {
        Self {
            id: id as u32,
            elements: FrameArena::new(chunk_size),
        }
    }

    /// Arena number stamped into every id it hands out
    pub fn id(&self) -> usize {
        self.id as usize
    }

    /// Frame start: drop everything, pre-size to the largest frame so far
    pub fn reserve(&mut self) {
        self.elements.reserve();
    }

    /// Frame end: drop everything
    pub fn release(&mut self) {
        self.elements.release();
    }

    /// Store an element and return its id
    pub fn alloc(&mut self, element: ListElement) -> ElementId {
        let index = self.elements.alloc(element);
        ElementId {
            arena: self.id,
            index: index as u32,
        }
    }

    /// Whether `id` was handed out by this arena this frame
    pub fn owns(&self, id: ElementId) -> bool {
        id.arena == self.id && id.index() < self.elements.len()
    }

    /// Elements allocated this frame
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether nothing was allocated this frame
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Largest frame seen so far
    pub fn high_water_mark(&self) -> usize {
        self.elements.high_water_mark()
    }

    /// Walk a chain that lives entirely in this arena
    pub fn iter(&self, head: Option<ElementId>) -> ArenaIter<'_> {
        ArenaIter { arena: self, cursor: head }
    }
}

impl std::ops::Index<ElementId> for ElementArena {
    type Output = ListElement;

    /// Panics if `id` belongs to another arena
    fn index(&self, id: ElementId) -> &ListElement {
        assert_eq!(id.arena, self.id, "element {:?} read from arena {}", id, self.id);
        &self.elements[id.index()]
    }
}

impl std::ops::IndexMut<ElementId> for ElementArena {
    fn index_mut(&mut self, id: ElementId) -> &mut ListElement {
        assert_eq!(id.arena, self.id, "element {:?} written to arena {}", id, self.id);
        &mut self.elements[id.index()]
    }
}

/// Iterator over `(id, element)` pairs of a single-arena chain
pub struct ArenaIter<'a> {
    arena: &'a ElementArena,
    cursor: Option<ElementId>,
}

impl<'a> Iterator for ArenaIter<'a> {
    type Item = (ElementId, &'a ListElement);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let element = &self.arena[id];
        self.cursor = element.next;
        Some((id, element))
    }
}

// ===== LIST VIEW =====

/// Read-only access to elements across every arena of a scene.
///
/// Chains may cross arenas (a surface's light list points at the scene's
/// global shadow list when per-light shadow lists are off), so the
/// backend and diagnostics read through this view.
#[derive(Clone, Copy)]
pub struct ListView<'a> {
    arenas: &'a [ElementArena],
    first: usize,
}

impl<'a> ListView<'a> {
    /// View over consecutively numbered `arenas`
    pub fn new(arenas: &'a [ElementArena]) -> Self {
        let first = arenas.first().map_or(0, |arena| arena.id());
        Self { arenas, first }
    }

    /// Element behind `id`, or `None` if it is stale or outside the view
    pub fn get(&self, id: ElementId) -> Option<&'a ListElement> {
        let arena = self.arenas.get(id.arena().checked_sub(self.first)?)?;
        if arena.owns(id) {
            Some(&arena[id])
        } else {
            None
        }
    }

    /// Walk a chain starting at `head`
    pub fn iter(&self, head: Option<ElementId>) -> ListIter<'a> {
        ListIter { view: *self, cursor: head }
    }

    /// Number of elements reachable from `head`
    pub fn len(&self, head: Option<ElementId>) -> usize {
        self.iter(head).count()
    }
}

/// Iterator over `(id, element)` pairs of a chain
pub struct ListIter<'a> {
    view: ListView<'a>,
    cursor: Option<ElementId>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = (ElementId, &'a ListElement);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let element = self.view.get(id)?;
        self.cursor = element.next;
        Some((id, element))
    }
}

#[cfg(test)]
#[path = "element_tests.rs"]
mod tests;
