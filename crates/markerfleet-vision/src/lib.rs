//! Camera and marker-detector capabilities, and marker localization.
//!
//! Marker decoding itself is a black box behind [`MarkerDetector`]; this
//! crate only defines the seam and what happens after it:
//! - [`Vocabulary`] decides which payloads are mission tasks and turns them
//!   into queue keys (fiducial ids are namespaced as `ArUco_<id>`),
//! - [`Localizer`] projects a detection's pixel centre into the arena frame.

mod camera;
mod detection;
mod localize;
mod vocabulary;

pub use camera::{Camera, CameraError, Frame};
pub use detection::{Detection, MarkerDetector, MarkerPayload};
pub use localize::{Localizer, DEFAULT_CALIBRATION};
pub use vocabulary::Vocabulary;
