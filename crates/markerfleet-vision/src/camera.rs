use markerfleet_core::Pose;
use nalgebra::Point2;

/// Transient camera failure. Callers skip the frame and carry on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// One camera frame.
///
/// `data` is row-major 8-bit pixels (`channels` per pixel); detectors that
/// work from telemetry alone may receive an empty buffer.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
    /// Vehicle pose at capture time, when the camera link reports it.
    pub pose: Option<Pose>,
}

impl Frame {
    /// Telemetry-only frame without pixel data.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            channels: 0,
            data: Vec::new(),
            pose: None,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Optical centre in pixels (integer half-size, as OpenCV reports it).
    pub fn center(&self) -> Point2<f32> {
        Point2::new((self.width / 2) as f32, (self.height / 2) as f32)
    }

    #[inline]
    pub fn contains(&self, p: Point2<f32>) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f32 && p.y < self.height as f32
    }
}

/// Frame source mounted on one agent.
///
/// `Ok(None)` means "no frame right now" and is expected between frames.
pub trait Camera: Send {
    fn frame(&mut self) -> Result<Option<Frame>, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_uses_integer_half_size() {
        assert_eq!(Frame::empty(640, 480).center(), Point2::new(320.0, 240.0));
        assert_eq!(Frame::empty(641, 481).center(), Point2::new(320.0, 240.0));
    }

    #[test]
    fn contains_is_half_open() {
        let f = Frame::empty(640, 480);
        assert!(f.contains(Point2::new(0.0, 0.0)));
        assert!(f.contains(Point2::new(639.5, 479.5)));
        assert!(!f.contains(Point2::new(640.0, 10.0)));
        assert!(!f.contains(Point2::new(-0.1, 10.0)));
    }
}
