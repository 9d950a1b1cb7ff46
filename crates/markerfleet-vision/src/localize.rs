//! Detection pixel centre + vehicle pose -> arena position.

use markerfleet_core::{polygon_centroid, project_pixel_offset, Pose};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::Detection;

/// Calibration used when a mission does not specify one.
pub const DEFAULT_CALIBRATION: f32 = 700.0;

/// Downward-looking camera model: pixel offsets scale linearly with altitude.
///
/// Image axes are assumed aligned with arena axes (heading is ignored), which
/// matches a gimbal-stabilised nadir camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Localizer {
    /// Pixels per metre at unit altitude.
    pub calibration: f32,
}

impl Default for Localizer {
    fn default() -> Self {
        Self {
            calibration: DEFAULT_CALIBRATION,
        }
    }
}

impl Localizer {
    pub fn new(calibration: f32) -> Self {
        Self { calibration }
    }

    /// Arena position of a pixel seen from `pose`. The returned `z` is the
    /// capture altitude, kept so carriers know how high the marker was seen.
    pub fn locate_pixel(&self, pixel: Point2<f32>, frame_center: Point2<f32>, pose: Pose) -> Point3<f32> {
        let d = project_pixel_offset(pixel, frame_center, pose.altitude(), self.calibration);
        Point3::new(pose.x + d.x, pose.y + d.y, pose.z)
    }

    /// Arena position of `detection`, `None` when its outline is empty or the
    /// result would not be finite.
    pub fn locate(&self, detection: &Detection, frame_center: Point2<f32>, pose: Pose) -> Option<Point3<f32>> {
        let center = polygon_centroid(&detection.polygon)?;
        let p = self.locate_pixel(center, frame_center, pose);
        (p.x.is_finite() && p.y.is_finite() && p.z.is_finite()).then_some(p)
    }

    /// Inverse of [`locate_pixel`](Self::locate_pixel) for a ground point.
    /// `None` at zero altitude, where every ground point maps to the centre.
    pub fn pixel_of(&self, world: Point2<f32>, frame_center: Point2<f32>, pose: Pose) -> Option<Point2<f32>> {
        let alt = pose.altitude();
        if alt <= 0.0 {
            return None;
        }
        let d = (world - pose.ground()) * self.calibration / alt;
        Some(frame_center + d)
    }
}
