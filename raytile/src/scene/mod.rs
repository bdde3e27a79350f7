//! Scene module
//!
//! Object store and scene graph, per-thread list building, worker
//! dispatch and the [`Scene`] that drives one frame through every phase.

mod camera;
mod dispatch;
mod graph;
mod hierarchy;
mod objects;
mod scene;
mod scene_thread;
mod visibility;

pub use camera::{CameraFrame, CameraRays, FrameBasis, RayBasis};
pub use dispatch::{DiagnosticMode, Job, ScopedPool, SerialPool, ThreadPool, UpdatePhase, WorkerPool};
pub use graph::{ArrayDesc, CameraDesc, LightDesc, NodeDesc, NodeKind, SceneDesc, SurfaceDesc};
pub use hierarchy::{Hierarchy, StaticHierarchy};
pub use objects::{
    Array, ArrayKey, Camera, CameraKey, Light, LightKey, ObjectKey, ObjectStore, Surface,
    SurfaceKey, AABB,
};
pub use scene::Scene;
pub use scene_thread::{Relations, SceneThread, SurfaceLists};
pub use visibility::{BoundsVisibility, Side, Viewer, Visibility};
