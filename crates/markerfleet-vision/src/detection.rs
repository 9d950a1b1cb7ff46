use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::Frame;

/// Decoded marker content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPayload {
    /// 2D barcode text, e.g. `"Box 1 2"` or `"Stone_1"`.
    Text(String),
    /// Fiducial dictionary id.
    Fiducial(u32),
}

impl MarkerPayload {
    /// Queue key for this payload. Fiducial ids become `ArUco_<id>` so they
    /// never collide with text payloads.
    pub fn key(&self) -> String {
        match self {
            MarkerPayload::Text(text) => text.clone(),
            MarkerPayload::Fiducial(id) => format!("ArUco_{id}"),
        }
    }
}

impl fmt::Display for MarkerPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerPayload::Text(text) => f.write_str(text),
            MarkerPayload::Fiducial(id) => write!(f, "fiducial #{id}"),
        }
    }
}

/// One marker seen in a frame: payload plus its image-space outline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub payload: MarkerPayload,
    /// Outline in pixel coordinates (usually 4 corners).
    pub polygon: Vec<Point2<f32>>,
}

impl Detection {
    pub fn text(payload: impl Into<String>, polygon: Vec<Point2<f32>>) -> Self {
        Self {
            payload: MarkerPayload::Text(payload.into()),
            polygon,
        }
    }

    pub fn fiducial(id: u32, polygon: Vec<Point2<f32>>) -> Self {
        Self {
            payload: MarkerPayload::Fiducial(id),
            polygon,
        }
    }

    /// Axis-aligned square outline of side `size` centred at `center`.
    pub fn square_outline(center: Point2<f32>, size: f32) -> Vec<Point2<f32>> {
        let h = 0.5 * size;
        vec![
            Point2::new(center.x - h, center.y - h),
            Point2::new(center.x + h, center.y - h),
            Point2::new(center.x + h, center.y + h),
            Point2::new(center.x - h, center.y + h),
        ]
    }
}

/// Marker decoder. "No marker" is an empty list, never an error.
pub trait MarkerDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection>;
}
