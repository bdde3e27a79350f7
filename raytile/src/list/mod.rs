/// Per-frame linked lists: elements and arenas, the sorting list
/// builder, and the flattener that prepares lists for the backend.

pub mod builder;
pub mod element;
pub mod filter;

pub use builder::{Ancestry, GroupPath, Groups, ListBuilder};
pub use element::{
    ArenaIter, Backref, ElementArena, ElementId, GroupKind, ListElement, ListIter, ListView,
    Order, OrderTag, Payload,
};
pub use filter::flatten;
