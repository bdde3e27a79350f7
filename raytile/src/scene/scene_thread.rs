/// Scene thread: one slice of the per-frame work.
///
/// Surfaces are dealt to threads round-robin by declaration index. A
/// thread rasterizes the tile lists of its surfaces during the tiling
/// phase and rebuilds their relation lists during the relations phase,
/// allocating only from its own arena. The relation builders are also
/// used by the scene itself, on the scene arena, for the camera's lists.

use crate::config::{SceneOpts, Thresholds};
use crate::error::Result;
use crate::list::{
    flatten, Backref, ElementArena, ElementId, GroupPath, ListBuilder, ListElement, Order, Payload,
};
use crate::tiling::{Projector, TileBasis};
use super::objects::{Light, LightKey, ObjectStore, Surface, SurfaceKey};
use super::visibility::{Side, Viewer, Visibility};

// ===== SURFACE LISTS =====

/// List heads owned by one surface for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceLists {
    /// Tiles covered by the surface, each element tagged with its tile
    pub tiles: Option<ElementId>,
    /// Visible surfaces, indexed by [`Side::index`]
    pub surfaces: [Option<ElementId>; 2],
    /// Casting lights, indexed by [`Side::index`]. Each light element
    /// carries its shadow casters.
    pub lights: [Option<ElementId>; 2],
}

impl SurfaceLists {
    pub fn surfaces(&self, side: Side) -> Option<ElementId> {
        self.surfaces[side.index()]
    }

    pub fn lights(&self, side: Side) -> Option<ElementId> {
        self.lights[side.index()]
    }

    /// Drop last frame's relation lists, keeping the tile list
    pub fn clear_relations(&mut self) {
        self.surfaces = [None; 2];
        self.lights = [None; 2];
    }
}

// ===== RELATIONS INPUT =====

/// Read-only inputs of relation list building, shared by all threads
#[derive(Clone, Copy)]
pub struct Relations<'a> {
    pub objects: &'a ObjectStore,
    pub visibility: &'a dyn Visibility,
    pub opts: SceneOpts,
    /// Camera's surface list. Lights fall back to it as their shadow
    /// casters when per-light shadow lists are off.
    pub global_surfaces: Option<ElementId>,
}

impl Relations<'_> {
    fn sorting(&self) -> bool {
        self.opts.contains(SceneOpts::SORTING)
    }
}

// ===== SCENE THREAD =====

/// Per-thread scratch for one slice of surfaces
#[derive(Debug)]
pub struct SceneThread {
    index: usize,
    projector: Projector,
}

impl SceneThread {
    pub fn new(index: usize, tiles_in_row: u32, tiles_in_col: u32) -> Self {
        Self {
            index,
            projector: Projector::new(tiles_in_row, tiles_in_col),
        }
    }

    /// Slice index of this thread
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether this thread owns the surface declared at `position`
    pub fn owns(&self, position: usize, thread_count: usize) -> bool {
        position % thread_count.max(1) == self.index
    }

    /// Project `surface` and emit its tile list into `arena`
    pub fn rasterize_tile_list(
        &mut self,
        arena: &mut ElementArena,
        key: SurfaceKey,
        surface: &Surface,
        basis: &TileBasis,
        thresholds: &Thresholds,
        extend: bool,
    ) -> Option<ElementId> {
        self.projector.project(surface.verts(), surface.edges(), basis, thresholds, extend);
        self.projector.emit(arena, key)
    }

    /// Rebuild every relation list of `surface`.
    ///
    /// Without two-sided lists the inner side shares the outer lists.
    pub fn build_relations(
        &mut self,
        arena: &mut ElementArena,
        key: SurfaceKey,
        surface: &Surface,
        lists: &mut SurfaceLists,
        relations: &Relations<'_>,
    ) -> Result<()> {
        let two_sided = relations.opts.contains(SceneOpts::TWO_SIDED);
        let sides: &[Side] = if two_sided { &Side::ALL[..] } else { &Side::ALL[..1] };

        for &side in sides {
            let viewer = Viewer::Surface { key, surface, side };
            lists.surfaces[side.index()] = Self::build_surface_relations(arena, &viewer, relations)?;
            lists.lights[side.index()] = Self::build_light_relations(arena, &viewer, relations)?;
        }
        if !two_sided {
            lists.surfaces[Side::Inner.index()] = lists.surfaces[Side::Outer.index()];
            lists.lights[Side::Inner.index()] = lists.lights[Side::Outer.index()];
        }
        Ok(())
    }

    /// Build `viewer`'s flat, ordered list of visible surfaces
    pub fn build_surface_relations(
        arena: &mut ElementArena,
        viewer: &Viewer<'_>,
        relations: &Relations<'_>,
    ) -> Result<Option<ElementId>> {
        let objects = relations.objects;
        let cmp = |a: &Backref, b: &Backref| -> Order {
            relations.visibility.order(viewer, objects, a, b)
        };

        let mut head = None;
        let mut builder = ListBuilder::new(arena, relations.sorting());
        for (key, surface) in objects.surfaces() {
            if !relations.visibility.surface_visible(viewer, key, surface) {
                continue;
            }
            let path = GroupPath::resolve(surface.groups(), objects)?;
            let element = ListElement::new(Backref::Surface(key), Payload::Surface(key));
            builder.insert(&mut head, element, &path, &cmp);
        }

        flatten(arena, head);
        Ok(head)
    }

    /// Build `viewer`'s list of casting lights.
    ///
    /// With per-light shadow lists on and a surface viewer, every light
    /// gets its own caster list; otherwise lights share the camera's
    /// surface list.
    pub fn build_light_relations(
        arena: &mut ElementArena,
        viewer: &Viewer<'_>,
        relations: &Relations<'_>,
    ) -> Result<Option<ElementId>> {
        let objects = relations.objects;
        let cmp = |a: &Backref, b: &Backref| -> Order {
            relations.visibility.order(viewer, objects, a, b)
        };
        let receiver = match viewer {
            Viewer::Surface { surface, .. } if relations.opts.contains(SceneOpts::SHADOWS) => {
                Some(*surface)
            }
            _ => None,
        };

        let mut head = None;
        for (key, light) in objects.lights() {
            if !relations.visibility.light_visible(viewer, key, light) {
                continue;
            }
            let shadows = match receiver {
                Some(receiver) => Self::build_shadow_list(arena, key, light, receiver, relations)?,
                None => relations.global_surfaces,
            };
            let element = ListElement::new(
                Backref::Light(key),
                Payload::Light { light: key, shadows },
            );
            ListBuilder::new(arena, relations.sorting())
                .insert(&mut head, element, &GroupPath::none(), &cmp);
        }

        Ok(head)
    }

    /// Surfaces that may shadow `receiver` from `light`, nearest to the
    /// light first
    fn build_shadow_list(
        arena: &mut ElementArena,
        key: LightKey,
        light: &Light,
        receiver: &Surface,
        relations: &Relations<'_>,
    ) -> Result<Option<ElementId>> {
        let objects = relations.objects;
        let viewer = Viewer::Light { key, light };
        let cmp = |a: &Backref, b: &Backref| -> Order {
            relations.visibility.order(&viewer, objects, a, b)
        };

        let mut head = None;
        let mut builder = ListBuilder::new(arena, relations.sorting());
        for (caster_key, caster) in objects.surfaces() {
            if !relations.visibility.casts_shadow(light, caster, receiver) {
                continue;
            }
            let path = GroupPath::resolve(caster.groups(), objects)?;
            let element = ListElement::new(Backref::Surface(caster_key), Payload::Surface(caster_key));
            builder.insert(&mut head, element, &path, &cmp);
        }

        flatten(arena, head);
        Ok(head)
    }
}

#[cfg(test)]
#[path = "scene_thread_tests.rs"]
mod tests;
