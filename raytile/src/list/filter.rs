/// List flattener.
///
/// Collapses group nodes into one chain: each group's sublist is spliced
/// right after its node, the node's payload becomes the group's own
/// descriptor (`Payload::Array`, with the last member of the group), and
/// every order tag is cleared. Nesting depth is bounded by the two group
/// kinds, so plain recursion is fine.

use super::element::{ElementArena, ElementId, OrderTag, Payload};

/// Flatten the list at `head` in place and return its last element.
///
/// Already-flat lists come back unchanged, so calling this twice is a
/// no-op.
pub fn flatten(arena: &mut ElementArena, head: Option<ElementId>) -> Option<ElementId> {
    let mut last = None;
    let mut cursor = head;

    while let Some(id) = cursor {
        let next = arena[id].next;
        arena[id].order = OrderTag::Clear;

        last = Some(id);
        if let Payload::Group { array, kind, sublist } = arena[id].payload {
            let group_last = match flatten(arena, sublist) {
                Some(sub_last) => {
                    arena[id].next = sublist;
                    arena[sub_last].next = next;
                    sub_last
                }
                None => id,
            };
            arena[id].payload = Payload::Array { array, kind, last: group_last };
            last = Some(group_last);
        }

        cursor = next;
    }

    last
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
