/// Surface tile-list builder.
///
/// Projects a surface's bounding polyhedron into tile space, clipping
/// edges that cross the screen plane, rasterizes the silhouette into
/// [`TileBounds`] and emits one list element per marked tile.

use glam::{Vec2, Vec3};
use crate::config::Thresholds;
use crate::list::{Backref, ElementArena, ElementId, ListElement, OrderTag, Payload};
use crate::scene::SurfaceKey;
use super::rasterizer::TileBounds;

/// Camera basis for projecting into tile space, recomputed every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBasis {
    /// Camera position
    pub pos: Vec3,
    /// Camera forward axis
    pub nrm: Vec3,
    /// Camera position to the screen's top-left corner
    pub dir: Vec3,
    /// Screen's top-left corner (tiling origin)
    pub org: Vec3,
    /// Horizontal axis scaled to tiles (one unit per tile column)
    pub htl: Vec3,
    /// Vertical axis scaled to tiles (one unit per tile row)
    pub vtl: Vec3,
    /// Distance from the camera to the screen plane
    pub pov: f32,
}

/// Which side of the screen plane a vertex lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSide {
    /// Behind the clip threshold, must be clipped
    Behind,
    /// Projected, but slightly behind the plane: also kept as a clip vertex
    Near,
    /// Projected normally
    Front,
}

/// A vertex after projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedVertex {
    /// Tile-space position (valid unless `side == Behind`)
    pub tile: Vec2,
    /// Signed distance from the screen plane along the forward axis
    pub depth: f32,
    pub side: VertexSide,
}

/// Per-thread projection scratch: vertex buffer plus row bounds
#[derive(Debug)]
pub struct Projector {
    verts: Vec<ProjectedVertex>,
    bounds: TileBounds,
}

impl Projector {
    pub fn new(tiles_in_row: u32, tiles_in_col: u32) -> Self {
        Self {
            verts: Vec::new(),
            bounds: TileBounds::new(tiles_in_row, tiles_in_col),
        }
    }

    /// Row bounds of the last projected surface
    pub fn bounds(&self) -> &TileBounds {
        &self.bounds
    }

    /// Projected and generated clip vertices of the last surface
    pub fn vertices(&self) -> &[ProjectedVertex] {
        &self.verts
    }

    /// Mark the tiles covered by the polyhedron `verts`/`edges`.
    ///
    /// No vertices means an unbounded surface: every tile is marked.
    pub fn project(
        &mut self,
        verts: &[Vec3],
        edges: &[[usize; 2]],
        basis: &TileBasis,
        thresholds: &Thresholds,
        extend: bool,
    ) -> &TileBounds {
        if verts.is_empty() {
            self.bounds.fill();
            return &self.bounds;
        }

        self.bounds.clear();
        self.verts.clear();

        for &v in verts {
            let depth = (v - basis.org).dot(basis.nrm);
            if depth >= 0.0 || depth.abs() <= thresholds.clip {
                let scale = (v - basis.pos).dot(basis.nrm) / basis.pov;
                let vec = (v - basis.pos) / scale - basis.dir;
                let tile = Vec2::new(vec.dot(basis.htl), vec.dot(basis.vtl));
                self.verts.push(ProjectedVertex { tile, depth, side: VertexSide::Front });
            } else {
                self.verts.push(ProjectedVertex { tile: Vec2::ZERO, depth, side: VertexSide::Behind });
            }
        }

        // Vertices just behind the plane also close the clipped silhouette
        for k in 0..verts.len() {
            let vertex = self.verts[k];
            if vertex.side == VertexSide::Front && vertex.depth < 0.0 {
                self.verts[k].side = VertexSide::Near;
                self.verts.push(ProjectedVertex { side: VertexSide::Near, ..vertex });
            }
        }

        for &[a, b] in edges {
            let (Some(&wa), Some(&wb)) = (verts.get(a), verts.get(b)) else {
                continue;
            };
            let (va, vb) = (self.verts[a], self.verts[b]);
            if va.side != VertexSide::Front && vb.side != VertexSide::Front {
                continue;
            }

            let p1 = match va.side {
                VertexSide::Behind => self.clip(wa, wb, va.depth, vb.depth, basis),
                _ => va.tile,
            };
            let p2 = match vb.side {
                VertexSide::Behind => self.clip(wb, wa, vb.depth, va.depth, basis),
                _ => vb.tile,
            };
            self.bounds.rasterize_edge(p1, p2, thresholds, extend);
        }

        let generated = verts.len();
        let total = self.verts.len();
        for i in generated..total {
            for j in i + 1..total {
                let (p1, p2) = (self.verts[i].tile, self.verts[j].tile);
                self.bounds.rasterize_edge(p1, p2, thresholds, extend);
            }
        }

        &self.bounds
    }

    /// Point where the edge from `behind` to `front` crosses the screen
    /// plane, in tile space. The crossing is recorded as a clip vertex.
    fn clip(&mut self, behind: Vec3, front: Vec3, zb: f32, zf: f32, basis: &TileBasis) -> Vec2 {
        let t = zf / (zf - zb);
        let point = front + (behind - front) * t - basis.org;
        let tile = Vec2::new(point.dot(basis.htl), point.dot(basis.vtl));
        self.verts.push(ProjectedVertex { tile, depth: 0.0, side: VertexSide::Near });
        tile
    }

    /// Emit the marked tiles of the last projection as a chain of
    /// elements for `surface`, row-major, each tagged with its tile.
    pub fn emit(&self, arena: &mut ElementArena, surface: SurfaceKey) -> Option<ElementId> {
        let mut head = None;
        let mut tail: Option<ElementId> = None;
        for row in 0..self.bounds.rows() {
            let Some((min, max)) = self.bounds.row(row) else {
                continue;
            };
            for col in min..=max {
                let mut element = ListElement::new(Backref::Surface(surface), Payload::Surface(surface));
                element.order = OrderTag::Tile { row: row as u32, col };
                let id = arena.alloc(element);
                match tail {
                    Some(prev) => arena[prev].next = Some(id),
                    None => head = Some(id),
                }
                tail = Some(id);
            }
        }
        head
    }
}

#[cfg(test)]
#[path = "projector_tests.rs"]
mod tests;
