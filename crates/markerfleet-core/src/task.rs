use chrono::{DateTime, Utc};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::AgentId;

/// A discovered marker awaiting pickup.
///
/// Immutable once created; the queue hands each task to at most one carrier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    key: String,
    world_position: Point3<f32>,
    discovered_by: AgentId,
    discovered_at: DateTime<Utc>,
}

impl Task {
    /// New task stamped with the current wall-clock time.
    pub fn new(key: impl Into<String>, world_position: Point3<f32>, discovered_by: AgentId) -> Self {
        Self::with_timestamp(key, world_position, discovered_by, Utc::now())
    }

    pub fn with_timestamp(
        key: impl Into<String>,
        world_position: Point3<f32>,
        discovered_by: AgentId,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            world_position,
            discovered_by,
            discovered_at,
        }
    }

    /// Marker payload identity, unique per mission run.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn world_position(&self) -> Point3<f32> {
        self.world_position
    }

    #[inline]
    pub fn discovered_by(&self) -> &AgentId {
        &self.discovered_by
    }

    #[inline]
    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }
}
