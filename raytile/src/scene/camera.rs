/// Camera frame and the per-frame bases derived from it.
///
/// The camera frame is a passive data container: position, screen axes
/// and forward axis are computed by whoever animates the camera (the
/// hierarchy) and merely read here. Each frame the scene derives two
/// bases from it, one for tiling and one for aiming rays.

use glam::Vec3;
use crate::config::Fsaa;
use crate::tiling::TileBasis;

/// Camera pose in world space.
///
/// `hor` spans the screen width, `ver` spans the screen width too and is
/// scaled by the aspect ratio when the basis is derived. `pov` is the
/// distance from `pos` to the screen plane along `nrm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub pos: Vec3,
    pub hor: Vec3,
    pub ver: Vec3,
    pub nrm: Vec3,
    pub pov: f32,
}

impl CameraFrame {
    pub fn new(pos: Vec3, hor: Vec3, ver: Vec3, nrm: Vec3, pov: f32) -> Self {
        Self { pos, hor, ver, nrm, pov }
    }
}

impl Default for CameraFrame {
    /// At the origin looking down +Z, x to the right, y down the screen
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z, 1.0)
    }
}

// ===== RAYS =====

/// Per-pixel ray basis for the whole frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayBasis {
    /// Ray origin (camera position)
    pub pos: Vec3,
    /// Direction through the centre of the top-left pixel
    pub dir: Vec3,
    /// One pixel to the right
    pub hor: Vec3,
    /// One pixel down
    pub ver: Vec3,
    /// Nearest ray distance
    pub pov: f32,
}

/// Ray setup for one worker: four rays per quad plus the steppers that
/// advance them across the worker's interleaved rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRays {
    pub origin: Vec3,
    pub dir: [Vec3; 4],
    pub hor_step: Vec3,
    pub ver_step: Vec3,
    pub t_min: f32,
}

impl RayBasis {
    /// Rays for worker `index` of `count`.
    ///
    /// Off: the quad is four consecutive pixels and steps four pixels.
    /// X4: the quad is one pixel's rotated-grid sub-samples and steps one
    /// pixel. Both step `count` rows vertically.
    pub fn worker_rays(&self, index: usize, count: usize, fsaa: Fsaa) -> CameraRays {
        let row = index as f32;
        let (fdh, fdv, fhr) = match fsaa {
            Fsaa::X4 => {
                let (s, r) = (0.25, 0.08);
                (
                    [-r - s, -r + s, r - s, r + s],
                    [r - s + row, -r - s + row, r + s + row, -r + s + row],
                    1.0,
                )
            }
            Fsaa::Off => ([0.0, 1.0, 2.0, 3.0], [row; 4], 4.0),
        };

        let mut dir = [Vec3::ZERO; 4];
        for k in 0..4 {
            dir[k] = self.dir + self.hor * fdh[k] + self.ver * fdv[k];
        }

        CameraRays {
            origin: self.pos,
            dir,
            hor_step: self.hor * fhr,
            ver_step: self.ver * count as f32,
            t_min: self.pov,
        }
    }
}

// ===== FRAME BASIS =====

/// Everything derived from the camera frame for one rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBasis {
    pub tile: TileBasis,
    pub rays: RayBasis,
}

impl FrameBasis {
    /// Derive the tiling and ray bases for an `x_res`×`y_res` frame cut
    /// into `tile_w`×`tile_h` pixel tiles
    pub fn new(frame: &CameraFrame, x_res: u32, y_res: u32, tile_w: u32, tile_h: u32) -> Self {
        let x_res = x_res as f32;
        let aspect = y_res as f32 / x_res;

        let dir = frame.nrm * frame.pov - (frame.hor + frame.ver * aspect) * 0.5;
        let org = frame.pos + dir;

        let tile = TileBasis {
            pos: frame.pos,
            nrm: frame.nrm,
            dir,
            org,
            htl: frame.hor * (x_res / tile_w as f32),
            vtl: frame.ver * (x_res / tile_h as f32),
            pov: frame.pov,
        };

        let hor = frame.hor / x_res;
        let ver = frame.ver / x_res;
        let rays = RayBasis {
            pos: frame.pos,
            dir: dir + (hor + ver) * 0.5,
            hor,
            ver,
            pov: frame.pov,
        };

        Self { tile, rays }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
