use markerfleet_core::Pose;
use markerfleet_vision::{Localizer, Vocabulary};

use crate::{FlightTiming, RetryPolicy};

/// Per-scanner mission parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannerParams {
    /// Ordered patrol route, already region-filtered.
    pub waypoints: Vec<Pose>,
    /// Altitude for the transit back home before landing.
    pub return_altitude: f32,
    /// Stop patrolling once this many distinct tasks were found locally.
    pub found_enough: usize,
    pub vocabulary: Vocabulary,
    pub localizer: Localizer,
    pub timing: FlightTiming,
    pub retry: RetryPolicy,
}

impl Default for ScannerParams {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            return_altitude: 1.5,
            found_enough: 4,
            vocabulary: Vocabulary::open(),
            localizer: Localizer::default(),
            timing: FlightTiming::default(),
            retry: RetryPolicy::default(),
        }
    }
}
