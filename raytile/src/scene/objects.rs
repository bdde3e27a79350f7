/// Scene objects: arrays, surfaces, lights and cameras.
///
/// `ObjectStore` flattens a [`SceneDesc`] into slot maps. Keys stay valid
/// for the life of the scene. Arrays keep their parent so group nesting
/// can be resolved by walking ancestor chains.

use glam::Vec3;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::Result;
use crate::engine_bail;
use crate::list::{Ancestry, GroupPath, Groups};
use super::camera::CameraFrame;
use super::graph::{NodeDesc, NodeKind, SceneDesc};

// ===== SLOT MAP KEYS =====

new_key_type! {
    /// Stable key for an array (group node) of the scene
    pub struct ArrayKey;
    /// Stable key for a surface of the scene
    pub struct SurfaceKey;
    /// Stable key for a light of the scene
    pub struct LightKey;
    /// Stable key for a camera of the scene
    pub struct CameraKey;
}

/// Key of any named object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKey {
    Array(ArrayKey),
    Surface(SurfaceKey),
    Light(LightKey),
    Camera(CameraKey),
}

// ===== AABB =====

/// Axis-Aligned Bounding Box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// Edges of the box as index pairs into [`corners`](AABB::corners)
    pub const EDGES: [[usize; 2]; 12] = [
        [0, 1], [1, 3], [3, 2], [2, 0],
        [4, 5], [5, 7], [7, 6], [6, 4],
        [0, 4], [1, 5], [2, 6], [3, 7],
    ];

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point (`None` for no points)
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| aabb.expanded_to(p)))
    }

    /// Box grown to contain `point`
    pub fn expanded_to(&self, point: Vec3) -> Self {
        Self::new(self.min.min(point), self.max.max(point))
    }

    /// Centre of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The 8 corners; bit 0 of the index selects max x, bit 1 max y,
    /// bit 2 max z
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
        }
        corners
    }

    /// Test if this AABB fully contains another AABB.
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if this AABB intersects (overlaps) another AABB.
    ///
    /// Returns `true` if the two AABBs overlap or touch.
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

// ===== OBJECTS =====

/// Array node: a group of objects
#[derive(Debug, Clone)]
pub struct Array {
    name: String,
    parent: Option<ArrayKey>,
    transform_group: bool,
    bounds_group: bool,
}

impl Array {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enclosing array, `None` for the root
    pub fn parent(&self) -> Option<ArrayKey> {
        self.parent
    }

    pub fn is_transform_group(&self) -> bool {
        self.transform_group
    }

    pub fn is_bounds_group(&self) -> bool {
        self.bounds_group
    }
}

/// Surface with its world-space bounding polyhedron.
///
/// Bounded surfaces carry the 8 corners and 12 edges of their box;
/// unbounded ones carry none and cover the whole screen.
#[derive(Debug, Clone)]
pub struct Surface {
    name: String,
    parent: ArrayKey,
    position: Vec3,
    bounds: Option<AABB>,
    verts: Vec<Vec3>,
    edges: Vec<[usize; 2]>,
    trnode: Option<ArrayKey>,
    bvnode: Option<ArrayKey>,
}

impl Surface {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Array the surface is declared in
    pub fn parent(&self) -> ArrayKey {
        self.parent
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn bounds(&self) -> Option<&AABB> {
        self.bounds.as_ref()
    }

    /// Replace the bounding box and rebuild the polyhedron from it
    pub fn set_bounds(&mut self, bounds: Option<AABB>) {
        self.bounds = bounds;
        self.verts.clear();
        self.edges.clear();
        if let Some(aabb) = bounds {
            self.verts.extend_from_slice(&aabb.corners());
            self.edges.extend_from_slice(&AABB::EDGES);
        }
    }

    /// Replace the polyhedron with arbitrary geometry (e.g. a rotated
    /// box). The bounding box is recomputed from the vertices.
    pub fn set_geometry(&mut self, verts: Vec<Vec3>, edges: Vec<[usize; 2]>) {
        self.bounds = AABB::from_points(verts.iter().copied());
        self.verts = verts;
        self.edges = edges;
    }

    /// Polyhedron vertices (empty for unbounded surfaces)
    pub fn verts(&self) -> &[Vec3] {
        &self.verts
    }

    /// Polyhedron edges as vertex index pairs
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// Array sharing its transform with this surface
    pub fn trnode(&self) -> Option<ArrayKey> {
        self.trnode
    }

    /// Array sharing its bounding volume with this surface
    pub fn bvnode(&self) -> Option<ArrayKey> {
        self.bvnode
    }

    pub fn set_groups(&mut self, trnode: Option<ArrayKey>, bvnode: Option<ArrayKey>) {
        self.trnode = trnode;
        self.bvnode = bvnode;
    }

    /// Groups used when inserting this surface into relation lists
    pub fn groups(&self) -> Groups {
        Groups { transform: self.trnode, bounds: self.bvnode }
    }
}

/// Point light
#[derive(Debug, Clone)]
pub struct Light {
    name: String,
    position: Vec3,
    color: Vec3,
    luminance: f32,
}

impl Light {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn luminance(&self) -> f32 {
        self.luminance
    }

    /// Contribution to the frame's ambient term
    pub fn ambient(&self) -> Vec3 {
        self.color * self.luminance
    }
}

/// Camera with its ambient light
#[derive(Debug, Clone)]
pub struct Camera {
    name: String,
    frame: CameraFrame,
    ambient_color: Vec3,
    ambient_luminance: f32,
}

impl Camera {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &CameraFrame {
        &self.frame
    }

    pub fn set_frame(&mut self, frame: CameraFrame) {
        self.frame = frame;
    }

    /// Camera's own ambient term
    pub fn ambient(&self) -> Vec3 {
        self.ambient_color * self.ambient_luminance
    }
}

// ===== OBJECT STORE =====

/// All objects of a scene
#[derive(Debug)]
pub struct ObjectStore {
    root: ArrayKey,
    camera: CameraKey,
    arrays: SlotMap<ArrayKey, Array>,
    surfaces: SlotMap<SurfaceKey, Surface>,
    lights: SlotMap<LightKey, Light>,
    cameras: SlotMap<CameraKey, Camera>,
    names: FxHashMap<String, ObjectKey>,
}

/// Nearest flagged ancestors while walking the description
#[derive(Clone, Copy)]
struct Inherited {
    parent: ArrayKey,
    trnode: Option<ArrayKey>,
    bvnode: Option<ArrayKey>,
}

impl ObjectStore {
    /// Flatten a scene description.
    ///
    /// Fails if the root is not an array, if there is no camera, or if
    /// some surface's transform and bounds groups cannot be nested.
    pub fn from_desc(desc: &SceneDesc) -> Result<Self> {
        let NodeKind::Array(root_desc) = &desc.root.kind else {
            engine_bail!("raytile::ObjectStore", InvalidSceneGraph,
                "root node '{}' is not an array", desc.root.name);
        };

        let mut arrays = SlotMap::with_key();
        let root = arrays.insert(Array {
            name: desc.root.name.clone(),
            parent: None,
            transform_group: root_desc.transform_group,
            bounds_group: root_desc.bounds_group,
        });

        let mut store = Self {
            root,
            camera: CameraKey::default(),
            arrays,
            surfaces: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            cameras: SlotMap::with_key(),
            names: FxHashMap::default(),
        };
        store.names.insert(desc.root.name.clone(), ObjectKey::Array(root));

        let inherited = Inherited {
            parent: root,
            trnode: root_desc.transform_group.then_some(root),
            bvnode: root_desc.bounds_group.then_some(root),
        };
        for child in &root_desc.children {
            store.add_node(child, inherited);
        }

        match store.cameras.keys().next() {
            Some(camera) => store.camera = camera,
            None => engine_bail!("raytile::ObjectStore", InvalidSceneGraph,
                "scene '{}' has no camera", desc.root.name),
        }

        store.validate_groups()?;
        Ok(store)
    }

    fn add_node(&mut self, node: &NodeDesc, inherited: Inherited) {
        let key = match &node.kind {
            NodeKind::Array(array) => {
                let key = self.arrays.insert(Array {
                    name: node.name.clone(),
                    parent: Some(inherited.parent),
                    transform_group: array.transform_group,
                    bounds_group: array.bounds_group,
                });
                let nested = Inherited {
                    parent: key,
                    trnode: if array.transform_group { Some(key) } else { inherited.trnode },
                    bvnode: if array.bounds_group { Some(key) } else { inherited.bvnode },
                };
                for child in &array.children {
                    self.add_node(child, nested);
                }
                ObjectKey::Array(key)
            }
            NodeKind::Surface(surface) => {
                let mut value = Surface {
                    name: node.name.clone(),
                    parent: inherited.parent,
                    position: surface.position,
                    bounds: None,
                    verts: Vec::new(),
                    edges: Vec::new(),
                    trnode: inherited.trnode,
                    bvnode: inherited.bvnode,
                };
                value.set_bounds(surface.bounds);
                ObjectKey::Surface(self.surfaces.insert(value))
            }
            NodeKind::Light(light) => ObjectKey::Light(self.lights.insert(Light {
                name: node.name.clone(),
                position: light.position,
                color: light.color,
                luminance: light.luminance,
            })),
            NodeKind::Camera(camera) => ObjectKey::Camera(self.cameras.insert(Camera {
                name: node.name.clone(),
                frame: camera.frame,
                ambient_color: camera.ambient_color,
                ambient_luminance: camera.ambient_luminance,
            })),
        };
        if self.names.insert(node.name.clone(), key).is_some() {
            crate::engine_warn!("raytile::ObjectStore",
                "duplicate object name '{}', lookup returns the last one", node.name);
        }
    }

    /// Check every surface's groups: known arrays, nestable.
    ///
    /// Called at construction and again by the scene after a hierarchy
    /// update reassigns groups.
    pub fn validate_groups(&self) -> Result<()> {
        for (_, surface) in &self.surfaces {
            for array in [surface.trnode, surface.bvnode].into_iter().flatten() {
                if !self.arrays.contains_key(array) {
                    engine_bail!("raytile::ObjectStore", InvalidSceneGraph,
                        "surface '{}' refers to an unknown array", surface.name);
                }
            }
            GroupPath::resolve(surface.groups(), self)?;
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn root(&self) -> ArrayKey {
        self.root
    }

    /// Key of the active camera
    pub fn camera_key(&self) -> CameraKey {
        self.camera
    }

    /// Active camera
    pub fn camera(&self) -> &Camera {
        &self.cameras[self.camera]
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.camera]
    }

    pub fn array(&self, key: ArrayKey) -> Option<&Array> {
        self.arrays.get(key)
    }

    pub fn surface(&self, key: SurfaceKey) -> Option<&Surface> {
        self.surfaces.get(key)
    }

    pub fn surface_mut(&mut self, key: SurfaceKey) -> Option<&mut Surface> {
        self.surfaces.get_mut(key)
    }

    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    pub fn light_mut(&mut self, key: LightKey) -> Option<&mut Light> {
        self.lights.get_mut(key)
    }

    /// Surfaces in declaration order
    pub fn surfaces(&self) -> &SlotMap<SurfaceKey, Surface> {
        &self.surfaces
    }

    /// Surfaces in declaration order, mutable
    pub fn surfaces_mut(&mut self) -> slotmap::basic::IterMut<'_, SurfaceKey, Surface> {
        self.surfaces.iter_mut()
    }

    /// Lights in declaration order
    pub fn lights(&self) -> slotmap::basic::Iter<'_, LightKey, Light> {
        self.lights.iter()
    }

    pub fn arrays(&self) -> slotmap::basic::Iter<'_, ArrayKey, Array> {
        self.arrays.iter()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Look an object up by name
    pub fn find(&self, name: &str) -> Option<ObjectKey> {
        self.names.get(name).copied()
    }

    /// Look a surface up by name
    pub fn find_surface(&self, name: &str) -> Option<SurfaceKey> {
        match self.find(name)? {
            ObjectKey::Surface(key) => Some(key),
            _ => None,
        }
    }

    /// Look a light up by name
    pub fn find_light(&self, name: &str) -> Option<LightKey> {
        match self.find(name)? {
            ObjectKey::Light(key) => Some(key),
            _ => None,
        }
    }

    /// Look an array up by name
    pub fn find_array(&self, name: &str) -> Option<ArrayKey> {
        match self.find(name)? {
            ObjectKey::Array(key) => Some(key),
            _ => None,
        }
    }
}

impl Ancestry for ObjectStore {
    fn is_ancestor(&self, ancestor: ArrayKey, node: ArrayKey) -> bool {
        let mut cursor = self.arrays.get(node).and_then(|a| a.parent);
        while let Some(key) = cursor {
            if key == ancestor {
                return true;
            }
            cursor = self.arrays.get(key).and_then(|a| a.parent);
        }
        false
    }
}

#[cfg(test)]
#[path = "objects_tests.rs"]
mod tests;
