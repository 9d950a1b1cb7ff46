use std::time::Duration;

use markerfleet_core::{AgentRole, GroupId};
use serde::{Deserialize, Serialize};

use crate::{FlightTiming, RetryPolicy};

/// Carrier variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierKind {
    /// Lands for pickup and drop-off; re-launches for every leg.
    #[default]
    Aerial,
    /// Drives and stops.
    Ground,
    /// Ground obstacle clearer: relocating is the whole action, no drop notification.
    GroundObstacle,
}

impl CarrierKind {
    pub fn role(self) -> AgentRole {
        match self {
            CarrierKind::Aerial => AgentRole::AerialCarrier,
            CarrierKind::Ground | CarrierKind::GroundObstacle => AgentRole::GroundCarrier,
        }
    }

    #[inline]
    pub fn is_aerial(self) -> bool {
        matches!(self, CarrierKind::Aerial)
    }

    #[inline]
    pub fn notifies_drop(self) -> bool {
        !matches!(self, CarrierKind::GroundObstacle)
    }
}

/// Per-carrier mission parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CarrierParams {
    pub kind: CarrierKind,
    pub group: GroupId,
    /// Transit altitude for aerial carriers; ground carriers ignore it.
    pub cruise_altitude: f32,
    /// Deliveries before the carrier stands down.
    pub max_tasks: usize,
    /// Period of the "still waiting" log line while blocked on the queue.
    pub liveness_ms: u64,
    pub timing: FlightTiming,
    pub retry: RetryPolicy,
}

impl CarrierParams {
    pub fn new(kind: CarrierKind, group: impl Into<GroupId>) -> Self {
        Self {
            kind,
            group: group.into(),
            cruise_altitude: 1.5,
            max_tasks: 1,
            liveness_ms: 5_000,
            timing: FlightTiming::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.liveness_ms)
    }
}
