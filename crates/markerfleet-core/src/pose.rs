use std::fmt;

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Stable identifier of one fleet member (e.g. `"scout-0"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Partition of carriers sharing one destination policy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Arena pose: metres in the arena frame, heading in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub heading: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, z: f32, heading: f32) -> Self {
        Self { x, y, z, heading }
    }

    /// Pose at `p` with zero heading.
    pub fn at(p: Point3<f32>) -> Self {
        Self::new(p.x, p.y, p.z, 0.0)
    }

    #[inline]
    pub fn position(&self) -> Point3<f32> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Ground-plane projection of the pose.
    #[inline]
    pub fn ground(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn altitude(&self) -> f32 {
        self.z
    }

    /// Same ground position and heading at another altitude.
    pub fn with_altitude(self, z: f32) -> Self {
        Self { z, ..self }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.heading.is_finite()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2}, hdg {:.0})",
            self.x, self.y, self.z, self.heading
        )
    }
}
