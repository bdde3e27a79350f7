/// Screen tiling: edge rasterizer, surface projector and the tile buffer.

pub mod projector;
pub mod rasterizer;
pub mod tile_buffer;

pub use projector::{ProjectedVertex, Projector, TileBasis, VertexSide};
pub use rasterizer::TileBounds;
pub use tile_buffer::TileBuffer;
