use super::*;
use crate::error::Error;
use crate::scene::graph::{LightDesc, SurfaceDesc};

fn unit_box(x: f32) -> AABB {
    AABB::new(Vec3::new(x, 0.0, 2.0), Vec3::new(x + 1.0, 1.0, 3.0))
}

/// root
/// ├── camera
/// ├── lamp
/// ├── xform (transform group)
/// │   ├── a
/// │   └── bounds (bounds group)
/// │       └── b
/// └── plane (unbounded)
fn sample_desc() -> SceneDesc {
    SceneDesc::new(NodeDesc::array("root", vec![
        NodeDesc::camera("camera", CameraFrame::default()),
        NodeDesc::light("lamp", Vec3::new(0.0, -5.0, 0.0), 2.0),
        NodeDesc::group("xform", vec![
            NodeDesc::surface("a", unit_box(0.0)),
            NodeDesc::group("bounds", vec![
                NodeDesc::surface("b", unit_box(2.0)),
            ], false, true),
        ], true, false),
        NodeDesc::unbounded_surface("plane", Vec3::ZERO),
    ]))
}

// ============================================================================
// AABB
// ============================================================================

#[test]
fn test_aabb_corners_and_edges() {
    let aabb = unit_box(0.0);
    let corners = aabb.corners();
    assert_eq!(corners[0], aabb.min);
    assert_eq!(corners[7], aabb.max);
    for [a, b] in AABB::EDGES {
        // Each edge joins corners differing in exactly one axis
        assert_eq!((a ^ b).count_ones(), 1);
    }
}

#[test]
fn test_aabb_from_points() {
    let aabb = AABB::from_points([Vec3::new(1.0, 5.0, -1.0), Vec3::new(-2.0, 0.0, 3.0)]).unwrap();
    assert_eq!(aabb.min, Vec3::new(-2.0, 0.0, -1.0));
    assert_eq!(aabb.max, Vec3::new(1.0, 5.0, 3.0));
    assert!(AABB::from_points(std::iter::empty()).is_none());
}

#[test]
fn test_aabb_intersects_and_contains() {
    let a = unit_box(0.0);
    let touching = unit_box(1.0);
    let apart = unit_box(3.0);
    assert!(a.intersects(&touching));
    assert!(!a.intersects(&apart));
    let big = AABB::new(Vec3::splat(-10.0), Vec3::splat(10.0));
    assert!(big.contains(&a));
    assert!(!a.contains(&big));
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_from_desc_counts_objects() {
    let store = ObjectStore::from_desc(&sample_desc()).unwrap();
    assert_eq!(store.surface_count(), 3);
    assert_eq!(store.light_count(), 1);
    assert_eq!(store.arrays().count(), 3);
    assert_eq!(store.camera().name(), "camera");
}

#[test]
fn test_surfaces_keep_declaration_order() {
    let store = ObjectStore::from_desc(&sample_desc()).unwrap();
    let names: Vec<&str> = store.surfaces().values().map(|s| s.name()).collect();
    assert_eq!(names, vec!["a", "b", "plane"]);
}

#[test]
fn test_bounded_surface_has_box_polyhedron() {
    let store = ObjectStore::from_desc(&sample_desc()).unwrap();
    let a = store.surface(store.find_surface("a").unwrap()).unwrap();
    assert_eq!(a.verts().len(), 8);
    assert_eq!(a.edges().len(), 12);
    let plane = store.surface(store.find_surface("plane").unwrap()).unwrap();
    assert!(plane.verts().is_empty());
    assert!(plane.bounds().is_none());
}

#[test]
fn test_groups_default_to_nearest_flagged_ancestors() {
    let store = ObjectStore::from_desc(&sample_desc()).unwrap();
    let xform = store.find_array("xform").unwrap();
    let bounds = store.find_array("bounds").unwrap();

    let a = store.surface(store.find_surface("a").unwrap()).unwrap();
    assert_eq!(a.trnode(), Some(xform));
    assert_eq!(a.bvnode(), None);

    let b = store.surface(store.find_surface("b").unwrap()).unwrap();
    assert_eq!(b.trnode(), Some(xform));
    assert_eq!(b.bvnode(), Some(bounds));

    let plane = store.surface(store.find_surface("plane").unwrap()).unwrap();
    assert_eq!(plane.groups(), Groups::none());
}

#[test]
fn test_ancestry_walks_parents() {
    let store = ObjectStore::from_desc(&sample_desc()).unwrap();
    let root = store.root();
    let xform = store.find_array("xform").unwrap();
    let bounds = store.find_array("bounds").unwrap();
    assert!(store.is_ancestor(root, bounds));
    assert!(store.is_ancestor(xform, bounds));
    assert!(!store.is_ancestor(bounds, xform));
    assert!(!store.is_ancestor(xform, xform));
}

#[test]
fn test_find_by_name() {
    let store = ObjectStore::from_desc(&sample_desc()).unwrap();
    assert!(matches!(store.find("lamp"), Some(ObjectKey::Light(_))));
    assert!(store.find_surface("lamp").is_none());
    assert!(store.find("missing").is_none());
    let lamp = store.light(store.find_light("lamp").unwrap()).unwrap();
    assert_eq!(lamp.ambient(), Vec3::splat(2.0));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_root_must_be_array() {
    let desc = SceneDesc::new(NodeDesc::surface("lonely", unit_box(0.0)));
    let result = ObjectStore::from_desc(&desc);
    assert!(matches!(result, Err(Error::InvalidSceneGraph(_))));
}

#[test]
fn test_camera_is_required() {
    let desc = SceneDesc::new(NodeDesc::array("root", vec![
        NodeDesc::surface("a", unit_box(0.0)),
    ]));
    let err = ObjectStore::from_desc(&desc).unwrap_err();
    assert!(matches!(err, Error::InvalidSceneGraph(_)));
    assert!(format!("{}", err).contains("no camera"));
}

#[test]
fn test_sibling_groups_are_rejected() {
    let desc = SceneDesc::new(NodeDesc::array("root", vec![
        NodeDesc::camera("camera", CameraFrame::default()),
        NodeDesc::group("left", vec![NodeDesc::surface("a", unit_box(0.0))], true, false),
        NodeDesc::group("right", vec![], false, true),
    ]));
    let mut store = ObjectStore::from_desc(&desc).unwrap();
    let left = store.find_array("left").unwrap();
    let right = store.find_array("right").unwrap();
    let a = store.find_surface("a").unwrap();
    store.surface_mut(a).unwrap().set_groups(Some(left), Some(right));
    assert!(matches!(store.validate_groups(), Err(Error::IncompatibleGroups(_))));
}

#[test]
fn test_unknown_group_array_is_rejected() {
    let other = ObjectStore::from_desc(&sample_desc()).unwrap();
    let mut foreign = other.find_array("bounds").unwrap();
    let mut store = ObjectStore::from_desc(&SceneDesc::new(NodeDesc::array("root", vec![
        NodeDesc::camera("camera", CameraFrame::default()),
        NodeDesc::surface("a", unit_box(0.0)),
    ])))
    .unwrap();
    // A foreign key may alias a local slot; the null key never does
    if store.array(foreign).is_some() {
        foreign = ArrayKey::default();
    }
    let a = store.find_surface("a").unwrap();
    store.surface_mut(a).unwrap().set_groups(Some(foreign), None);
    assert!(matches!(store.validate_groups(), Err(Error::InvalidSceneGraph(_))));
}

#[test]
fn test_explicit_descriptors() {
    let desc = SceneDesc::new(NodeDesc {
        name: "root".to_string(),
        kind: NodeKind::Array(crate::scene::graph::ArrayDesc {
            children: vec![
                NodeDesc::camera("camera", CameraFrame::default()),
                NodeDesc {
                    name: "s".to_string(),
                    kind: NodeKind::Surface(SurfaceDesc { bounds: None, position: Vec3::X }),
                },
                NodeDesc {
                    name: "l".to_string(),
                    kind: NodeKind::Light(LightDesc {
                        position: Vec3::Y,
                        color: Vec3::new(1.0, 0.5, 0.0),
                        luminance: 2.0,
                    }),
                },
            ],
            transform_group: true,
            bounds_group: false,
        }),
    });
    let store = ObjectStore::from_desc(&desc).unwrap();
    let s = store.surface(store.find_surface("s").unwrap()).unwrap();
    assert_eq!(s.trnode(), Some(store.root()));
    assert_eq!(s.position(), Vec3::X);
    let l = store.light(store.find_light("l").unwrap()).unwrap();
    assert_eq!(l.ambient(), Vec3::new(2.0, 1.0, 0.0));
}
