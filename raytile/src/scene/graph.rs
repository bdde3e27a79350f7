/// Scene graph description.
///
/// A plain tree handed to `Scene::new`. The root must be an array; arrays
/// group other nodes and may mark themselves as transform and/or bounds
/// groups for their descendant surfaces. Exactly one camera is used (the
/// first one met in depth-first order).

use glam::Vec3;
use super::camera::CameraFrame;
use super::objects::AABB;

/// Root of a scene description
#[derive(Debug, Clone)]
pub struct SceneDesc {
    pub root: NodeDesc,
}

impl SceneDesc {
    pub fn new(root: NodeDesc) -> Self {
        Self { root }
    }
}

/// One named node
#[derive(Debug, Clone)]
pub struct NodeDesc {
    pub name: String,
    pub kind: NodeKind,
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    Array(ArrayDesc),
    Surface(SurfaceDesc),
    Light(LightDesc),
    Camera(CameraDesc),
}

/// Array (group) node
#[derive(Debug, Clone, Default)]
pub struct ArrayDesc {
    pub children: Vec<NodeDesc>,
    /// Descendant surfaces share this array's transform
    pub transform_group: bool,
    /// Descendant surfaces share this array's bounding volume
    pub bounds_group: bool,
}

/// Surface node
#[derive(Debug, Clone, Default)]
pub struct SurfaceDesc {
    /// World-space bounding box, `None` for unbounded surfaces (planes)
    pub bounds: Option<AABB>,
    pub position: Vec3,
}

/// Point light node
#[derive(Debug, Clone)]
pub struct LightDesc {
    pub position: Vec3,
    pub color: Vec3,
    pub luminance: f32,
}

/// Camera node
#[derive(Debug, Clone)]
pub struct CameraDesc {
    pub frame: CameraFrame,
    pub ambient_color: Vec3,
    pub ambient_luminance: f32,
}

// ===== CONVENIENCE CONSTRUCTORS =====

impl NodeDesc {
    /// Plain array
    pub fn array(name: &str, children: Vec<NodeDesc>) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Array(ArrayDesc { children, ..ArrayDesc::default() }),
        }
    }

    /// Array with explicit group flags
    pub fn group(name: &str, children: Vec<NodeDesc>, transform_group: bool, bounds_group: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Array(ArrayDesc { children, transform_group, bounds_group }),
        }
    }

    /// Bounded surface
    pub fn surface(name: &str, bounds: AABB) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Surface(SurfaceDesc {
                bounds: Some(bounds),
                position: bounds.center(),
            }),
        }
    }

    /// Unbounded surface at `position`
    pub fn unbounded_surface(name: &str, position: Vec3) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Surface(SurfaceDesc { bounds: None, position }),
        }
    }

    /// White point light
    pub fn light(name: &str, position: Vec3, luminance: f32) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Light(LightDesc { position, color: Vec3::ONE, luminance }),
        }
    }

    /// Camera with no ambient light
    pub fn camera(name: &str, frame: CameraFrame) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Camera(CameraDesc {
                frame,
                ambient_color: Vec3::ONE,
                ambient_luminance: 0.0,
            }),
        }
    }
}
