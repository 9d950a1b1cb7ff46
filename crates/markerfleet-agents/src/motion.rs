use markerfleet_core::Pose;

/// Failure reported by a vehicle's motion link.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// Link dropped or timed out; worth retrying.
    #[error("motion link error: {0}")]
    Connection(String),
    /// Vehicle rejected the command; aborts the current leg.
    #[error("motion command rejected: {0}")]
    Command(String),
}

impl MotionError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, MotionError::Connection(_))
    }
}

/// Low-level vehicle control for one agent.
///
/// Implementations own the link to a single vehicle and are only ever driven
/// from that agent's thread.
pub trait MotionController: Send {
    fn arm(&mut self) -> Result<(), MotionError>;
    fn disarm(&mut self) -> Result<(), MotionError>;
    fn takeoff(&mut self) -> Result<(), MotionError>;
    /// Land (aerial) or stop (ground).
    fn land(&mut self) -> Result<(), MotionError>;
    /// Start moving towards `target`; returns once the command is accepted.
    fn goto_pose(&mut self, target: Pose) -> Result<(), MotionError>;
    /// Whether the last [`goto_pose`](Self::goto_pose) target has been reached.
    fn has_arrived(&mut self) -> Result<bool, MotionError>;
    fn current_pose(&mut self) -> Result<Pose, MotionError>;
}
