/// Visibility strategies.
///
/// A Visibility decides which objects go into a viewer's relation lists
/// and in what order. It is queried from worker threads while lists are
/// built, so implementations must be stateless or internally
/// synchronized.

use glam::Vec3;
use crate::list::{Backref, Order};
use super::camera::CameraFrame;
use super::objects::{Light, LightKey, ObjectStore, Surface, SurfaceKey};

/// Side of a surface's boundary a relation list is evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Outer,
    Inner,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Outer, Side::Inner];

    /// Slot in two-sided list arrays
    pub fn index(self) -> usize {
        match self {
            Side::Outer => 0,
            Side::Inner => 1,
        }
    }
}

/// Object a relation list is built for
#[derive(Debug, Clone, Copy)]
pub enum Viewer<'a> {
    Camera(&'a CameraFrame),
    Surface {
        key: SurfaceKey,
        surface: &'a Surface,
        side: Side,
    },
    Light {
        key: LightKey,
        light: &'a Light,
    },
}

impl Viewer<'_> {
    /// World-space point the viewer looks from
    pub fn position(&self) -> Vec3 {
        match self {
            Viewer::Camera(frame) => frame.pos,
            Viewer::Surface { surface, .. } => surface.position(),
            Viewer::Light { light, .. } => light.position(),
        }
    }
}

/// Strategy for filling and ordering relation lists.
pub trait Visibility: Send + Sync {
    /// Whether `surface` belongs in `viewer`'s surface list
    fn surface_visible(&self, viewer: &Viewer<'_>, key: SurfaceKey, surface: &Surface) -> bool;

    /// Whether `light` belongs in `viewer`'s light list
    fn light_visible(&self, viewer: &Viewer<'_>, key: LightKey, light: &Light) -> bool;

    /// Whether `caster` may shadow `receiver` from `light`
    fn casts_shadow(&self, light: &Light, caster: &Surface, receiver: &Surface) -> bool;

    /// Compare list element `a` with a later element `b` for `viewer`.
    ///
    /// `Swap` puts `b` in front of `a`, `Keep` leaves them, `Neutral`
    /// expresses no preference and `Unsortable` stops the scan.
    fn order(&self, viewer: &Viewer<'_>, objects: &ObjectStore, a: &Backref, b: &Backref) -> Order;
}

/// Bounding-box visibility.
///
/// - the camera drops surfaces entirely behind it, other viewers see
///   everything
/// - a caster shadows a receiver if its box overlaps the hull of the
///   light and the receiver's box
/// - surfaces are ordered nearest first by distance to their box centre;
///   unbounded surfaces, groups and lights are unsortable
pub struct BoundsVisibility;

impl BoundsVisibility {
    pub fn new() -> Self {
        Self
    }

    fn distance(viewer: &Viewer<'_>, objects: &ObjectStore, element: &Backref) -> Option<f32> {
        let Backref::Surface(key) = element else {
            return None;
        };
        let bounds = objects.surface(*key)?.bounds()?;
        Some(viewer.position().distance_squared(bounds.center()))
    }
}

impl Default for BoundsVisibility {
    fn default() -> Self {
        Self::new()
    }
}

impl Visibility for BoundsVisibility {
    fn surface_visible(&self, viewer: &Viewer<'_>, _key: SurfaceKey, surface: &Surface) -> bool {
        match (viewer, surface.bounds()) {
            (Viewer::Camera(frame), Some(bounds)) => bounds
                .corners()
                .iter()
                .any(|&corner| (corner - frame.pos).dot(frame.nrm) >= 0.0),
            _ => true,
        }
    }

    fn light_visible(&self, _viewer: &Viewer<'_>, _key: LightKey, _light: &Light) -> bool {
        true
    }

    fn casts_shadow(&self, light: &Light, caster: &Surface, receiver: &Surface) -> bool {
        match (caster.bounds(), receiver.bounds()) {
            (Some(caster), Some(receiver)) => {
                caster.intersects(&receiver.expanded_to(light.position()))
            }
            _ => true,
        }
    }

    fn order(&self, viewer: &Viewer<'_>, objects: &ObjectStore, a: &Backref, b: &Backref) -> Order {
        match (Self::distance(viewer, objects, a), Self::distance(viewer, objects, b)) {
            (Some(da), Some(db)) if db < da => Order::Swap,
            (Some(da), Some(db)) if da < db => Order::Keep,
            (Some(_), Some(_)) => Order::Neutral,
            _ => Order::Unsortable,
        }
    }
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;
