//! Small allocation utilities shared by the list and tiling code.

mod frame_arena;

pub use frame_arena::FrameArena;
