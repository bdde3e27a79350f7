/// Relation list builder.
///
/// Inserts surfaces and lights into a viewer's list, creating the
/// transform/bounds group nodes a candidate needs, and keeps each list
/// roughly front-to-back with an incremental sort that exploits
/// frame-to-frame coherence.
///
/// The sort treats a fresh element as a pivot:
/// 1. walk forward past every element the comparator says belongs in
///    front of the pivot, stopping at the first `Keep`/`Unsortable`
/// 2. find the end of the in-order run starting at the pivot, caching
///    comparisons in the elements' order tags
/// 3. pull every later element that belongs in front of the pivot (with
///    the neutral run trailing it) to just before the pivot

use crate::error::Result;
use crate::engine_bail;
use crate::scene::ArrayKey;
use super::element::{
    Backref, ElementArena, ElementId, GroupKind, ListElement, Order, OrderTag, Payload,
};

// ===== GROUPING =====

/// Ancestor queries over the array hierarchy
pub trait Ancestry {
    /// Whether `ancestor` is a strict ancestor of `node`
    fn is_ancestor(&self, ancestor: ArrayKey, node: ArrayKey) -> bool;
}

/// The groups one candidate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Groups {
    /// Array sharing its transform with the candidate (trnode)
    pub transform: Option<ArrayKey>,
    /// Array sharing its bounding volume with the candidate (bvnode)
    pub bounds: Option<ArrayKey>,
}

impl Groups {
    /// No grouping
    pub fn none() -> Self {
        Self::default()
    }
}

/// Group levels a candidate is nested under, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPath {
    levels: [(ArrayKey, GroupKind); 2],
    len: usize,
}

impl GroupPath {
    /// No group levels: the candidate goes into the top-level list
    pub fn none() -> Self {
        Self {
            levels: [(ArrayKey::default(), GroupKind::empty()); 2],
            len: 0,
        }
    }

    fn push(&mut self, array: ArrayKey, kind: GroupKind) {
        self.levels[self.len] = (array, kind);
        self.len += 1;
    }

    /// Levels, outermost first
    pub fn levels(&self) -> &[(ArrayKey, GroupKind)] {
        &self.levels[..self.len]
    }

    /// Resolve outer/inner nesting of a candidate's groups.
    ///
    /// Both groups on one array give a single level of both kinds.
    /// Otherwise the ancestor is the outer level. Two arrays on different
    /// branches of the hierarchy cannot be nested.
    pub fn resolve(groups: Groups, ancestry: &dyn Ancestry) -> Result<Self> {
        let mut path = Self::none();
        match (groups.transform, groups.bounds) {
            (None, None) => {}
            (Some(t), None) => path.push(t, GroupKind::TRANSFORM),
            (None, Some(b)) => path.push(b, GroupKind::BOUNDS),
            (Some(t), Some(b)) if t == b => {
                path.push(t, GroupKind::TRANSFORM | GroupKind::BOUNDS);
            }
            (Some(t), Some(b)) => {
                if ancestry.is_ancestor(t, b) {
                    path.push(t, GroupKind::TRANSFORM);
                    path.push(b, GroupKind::BOUNDS);
                } else if ancestry.is_ancestor(b, t) {
                    path.push(b, GroupKind::BOUNDS);
                    path.push(t, GroupKind::TRANSFORM);
                } else {
                    engine_bail!("raytile::ListBuilder", IncompatibleGroups,
                        "transform group {:?} and bounds group {:?} are not on one ancestor chain",
                        t, b);
                }
            }
        }
        Ok(path)
    }
}

// ===== LIST BUILDER =====

/// Builds lists inside one arena.
///
/// `sorting == false` degenerates every insertion to head insertion.
pub struct ListBuilder<'a> {
    arena: &'a mut ElementArena,
    sorting: bool,
}

impl<'a> ListBuilder<'a> {
    pub fn new(arena: &'a mut ElementArena, sorting: bool) -> Self {
        Self { arena, sorting }
    }

    /// Arena the builder allocates from
    pub fn arena(&mut self) -> &mut ElementArena {
        self.arena
    }

    /// Insert a candidate into the list at `head`, nested under the group
    /// nodes named by `path` (created on demand), and return its id.
    ///
    /// `cmp(a, b)` compares an element `a` with a later element `b` on
    /// behalf of the viewer: `Swap` means `b` belongs in front of `a`.
    pub fn insert<C>(
        &mut self,
        head: &mut Option<ElementId>,
        element: ListElement,
        path: &GroupPath,
        cmp: &C,
    ) -> ElementId
    where
        C: Fn(&Backref, &Backref) -> Order,
    {
        self.insert_at(head, path.levels(), element, cmp)
    }

    fn insert_at<C>(
        &mut self,
        head: &mut Option<ElementId>,
        levels: &[(ArrayKey, GroupKind)],
        element: ListElement,
        cmp: &C,
    ) -> ElementId
    where
        C: Fn(&Backref, &Backref) -> Order,
    {
        let Some((&(array, kind), inner)) = levels.split_first() else {
            let id = self.arena.alloc(element);
            self.place(head, id, cmp);
            return id;
        };

        let node = match self.find_group(*head, array) {
            Some(node) => node,
            None => {
                let node = self.arena.alloc(ListElement::new(
                    Backref::Group(array),
                    Payload::Group { array, kind, sublist: None },
                ));
                self.place(head, node, cmp);
                node
            }
        };

        let mut sublist = match &mut self.arena[node].payload {
            Payload::Group { sublist, kind: node_kind, .. } => {
                *node_kind |= kind;
                *sublist
            }
            _ => None,
        };
        let id = self.insert_at(&mut sublist, inner, element, cmp);
        if let Payload::Group { sublist: stored, .. } = &mut self.arena[node].payload {
            *stored = sublist;
        }
        id
    }

    fn find_group(&self, head: Option<ElementId>, array: ArrayKey) -> Option<ElementId> {
        self.arena
            .iter(head)
            .find(|(_, e)| matches!(e.payload, Payload::Group { array: a, .. } if a == array))
            .map(|(id, _)| id)
    }

    /// Head-insert `pivot`, then move it (and anything that belongs in
    /// front of it) into place.
    fn place<C>(&mut self, head: &mut Option<ElementId>, pivot: ElementId, cmp: &C)
    where
        C: Fn(&Backref, &Backref) -> Order,
    {
        let arena = &mut *self.arena;
        arena[pivot].next = *head;
        arena[pivot].order = OrderTag::Clear;
        *head = Some(pivot);

        if !self.sorting {
            return;
        }

        let pivot_ref = arena[pivot].backref;

        // Phase 1: sink the pivot past elements that belong in front of it
        let mut last_swap = None;
        let mut cursor = arena[pivot].next;
        while let Some(id) = cursor {
            match cmp(&pivot_ref, &arena[id].backref) {
                Order::Swap => last_swap = Some(id),
                Order::Neutral => {}
                Order::Keep | Order::Unsortable => break,
            }
            cursor = arena[id].next;
        }

        let mut before_pivot = None;
        if let Some(swap) = last_swap {
            *head = arena[pivot].next;
            arena[pivot].next = arena[swap].next;
            arena[swap].next = Some(pivot);
            arena[swap].order = OrderTag::Clear;
            before_pivot = Some(swap);
        }

        // Phase 2: end of the in-order run starting at the pivot
        let mut run_end = pivot;
        while let Some(next) = arena[run_end].next {
            let order = match arena[run_end].order {
                OrderTag::Cached(order) => order,
                _ => {
                    let order = cmp(&arena[run_end].backref, &arena[next].backref);
                    arena[run_end].order = OrderTag::Cached(order);
                    order
                }
            };
            if order != Order::Keep {
                break;
            }
            run_end = next;
        }

        // Phase 3: pull later elements in front of the pivot
        let mut prev = run_end;
        let mut cursor = arena[run_end].next;
        while let Some(id) = cursor {
            if cmp(&pivot_ref, &arena[id].backref) != Order::Swap {
                prev = id;
                cursor = arena[id].next;
                continue;
            }

            let mut tail = id;
            while let (OrderTag::Cached(Order::Neutral), Some(next)) =
                (arena[tail].order, arena[tail].next)
            {
                tail = next;
            }
            let after = arena[tail].next;

            arena[prev].next = after;
            arena[prev].order = OrderTag::Clear;

            match before_pivot {
                Some(before) => {
                    arena[before].next = Some(id);
                    arena[before].order = OrderTag::Clear;
                }
                None => *head = Some(id),
            }
            arena[tail].next = Some(pivot);
            arena[tail].order = OrderTag::Clear;
            before_pivot = Some(tail);

            cursor = after;
        }
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
