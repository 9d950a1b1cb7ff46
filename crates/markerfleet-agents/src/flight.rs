//! Bounded launch, transit and landing sequences shared by every agent.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use markerfleet_core::{AgentId, CancelToken, Pose};
use serde::{Deserialize, Serialize};

use crate::{MotionController, MotionError};

/// Bounded retry for the arm/takeoff sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Launch attempts before giving up (each attempt arms once).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff_ms: u64,
    /// Camera reads tried before a scanner gives up on its stream.
    pub camera_attempts: u32,
    /// Pause between camera reads while waiting for the stream.
    pub camera_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1_000,
            camera_attempts: 10,
            camera_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn camera_backoff(&self) -> Duration {
        Duration::from_millis(self.camera_backoff_ms)
    }
}

/// Delays and timeouts, in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightTiming {
    /// Pause between arming and takeoff.
    pub arm_settle_ms: u64,
    /// Climb time before the altitude check.
    pub takeoff_settle_ms: u64,
    /// Altitude that must be exceeded after takeoff, metres.
    pub min_takeoff_altitude: f32,
    /// Arrival / detector polling period.
    pub poll_ms: u64,
    /// Per-waypoint and per-leg arrival budget.
    pub arrival_timeout_ms: u64,
    /// Return-home budget before landing in place.
    pub return_timeout_ms: u64,
    /// Pause after a pickup or drop-off.
    pub settle_ms: u64,
}

impl Default for FlightTiming {
    fn default() -> Self {
        Self {
            arm_settle_ms: 500,
            takeoff_settle_ms: 8_000,
            min_takeoff_altitude: 0.1,
            poll_ms: 50,
            arrival_timeout_ms: 15_000,
            return_timeout_ms: 20_000,
            settle_ms: 3_000,
        }
    }
}

impl FlightTiming {
    pub fn arm_settle(&self) -> Duration {
        Duration::from_millis(self.arm_settle_ms)
    }
    pub fn takeoff_settle(&self) -> Duration {
        Duration::from_millis(self.takeoff_settle_ms)
    }
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
    pub fn arrival_timeout(&self) -> Duration {
        Duration::from_millis(self.arrival_timeout_ms)
    }
    pub fn return_timeout(&self) -> Duration {
        Duration::from_millis(self.return_timeout_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Result of one step of the launch sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchStep {
    /// Step succeeded; move on.
    Next,
    /// Attempt failed but budget remains; arm again.
    Retry,
    /// Budget exhausted or unrecoverable error.
    GiveUp(String),
}

/// How a bounded wait for arrival ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrival {
    Reached,
    TimedOut,
    /// The poll hook asked to stop waiting.
    Interrupted,
    Cancelled,
}

/// One agent's vehicle link plus the policies that bound every wait on it.
pub struct Pilot {
    id: AgentId,
    motion: Box<dyn MotionController>,
    timing: FlightTiming,
    retry: RetryPolicy,
    cancel: CancelToken,
    attempts: u32,
}

impl Pilot {
    pub fn new(
        id: AgentId,
        motion: Box<dyn MotionController>,
        timing: FlightTiming,
        retry: RetryPolicy,
        cancel: CancelToken,
    ) -> Self {
        Self {
            id,
            motion,
            timing,
            retry,
            cancel,
            attempts: 0,
        }
    }

    pub fn timing(&self) -> &FlightTiming {
        &self.timing
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Launch attempts made since the last [`reset_launch`](Self::reset_launch).
    pub fn launch_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset_launch(&mut self) {
        self.attempts = 0;
    }

    /// Cancellable pause. `false` if cancelled.
    pub fn pause(&self, duration: Duration) -> bool {
        self.cancel.sleep(duration)
    }

    fn retry_or_give_up(&self, what: &str, err: &dyn std::fmt::Display, retryable: bool) -> LaunchStep {
        if retryable && self.attempts < self.retry.max_attempts {
            warn!(
                "{}: {what} failed (attempt {}/{}): {err}",
                self.id, self.attempts, self.retry.max_attempts
            );
            if !self.pause(self.retry.backoff()) {
                return LaunchStep::GiveUp("cancelled during launch".to_owned());
            }
            return LaunchStep::Retry;
        }
        LaunchStep::GiveUp(format!(
            "{what} failed after {} attempt(s): {err}",
            self.attempts
        ))
    }

    /// Arm the vehicle. Each call consumes one launch attempt.
    pub fn arm_step(&mut self) -> LaunchStep {
        self.attempts += 1;
        debug!("{}: arming (attempt {})", self.id, self.attempts);
        match self.motion.arm() {
            Ok(()) => LaunchStep::Next,
            Err(err) => {
                let retryable = err.is_retryable();
                self.retry_or_give_up("arming", &err, retryable)
            }
        }
    }

    /// Take off and confirm the vehicle actually climbed.
    pub fn takeoff_step(&mut self) -> LaunchStep {
        if !self.pause(self.timing.arm_settle()) {
            return LaunchStep::GiveUp("cancelled during launch".to_owned());
        }
        if let Err(err) = self.motion.takeoff() {
            let retryable = err.is_retryable();
            return self.retry_or_give_up("takeoff", &err, retryable);
        }
        if !self.pause(self.timing.takeoff_settle()) {
            return LaunchStep::GiveUp("cancelled during launch".to_owned());
        }
        match self.motion.current_pose() {
            Ok(pose) if pose.altitude() > self.timing.min_takeoff_altitude => {
                info!("{}: airborne at {pose}", self.id);
                LaunchStep::Next
            }
            Ok(pose) => {
                let msg = format!(
                    "altitude {:.2} m not above {:.2} m",
                    pose.altitude(),
                    self.timing.min_takeoff_altitude
                );
                self.retry_or_give_up("takeoff", &msg, true)
            }
            Err(err) => {
                let retryable = err.is_retryable();
                self.retry_or_give_up("takeoff", &err, retryable)
            }
        }
    }

    pub fn pose(&mut self) -> Result<Pose, MotionError> {
        self.motion.current_pose()
    }

    pub fn goto(&mut self, target: Pose) -> Result<(), MotionError> {
        debug!("{}: goto {target}", self.id);
        self.motion.goto_pose(target)
    }

    /// Poll arrival until `timeout` elapses, calling `on_poll` with the
    /// current pose between polls. The hook can cut the wait short.
    pub fn wait_arrival<F>(&mut self, timeout: Duration, mut on_poll: F) -> Result<Arrival, MotionError>
    where
        F: FnMut(Pose) -> ControlFlow<()>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Arrival::Cancelled);
            }
            if self.motion.has_arrived()? {
                return Ok(Arrival::Reached);
            }
            let pose = self.motion.current_pose()?;
            if on_poll(pose).is_break() {
                return Ok(Arrival::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Arrival::TimedOut);
            }
            if !self.pause(self.timing.poll().min(deadline - now)) {
                return Ok(Arrival::Cancelled);
            }
        }
    }

    /// Command `target` and wait for it without a poll hook.
    pub fn fly_to(&mut self, target: Pose, timeout: Duration) -> Result<Arrival, MotionError> {
        self.goto(target)?;
        self.wait_arrival(timeout, |_| ControlFlow::Continue(()))
    }

    pub fn land(&mut self) -> Result<(), MotionError> {
        self.motion.land()
    }

    pub fn disarm(&mut self) -> Result<(), MotionError> {
        self.motion.disarm()
    }

    /// Best-effort land + disarm; failures are only logged.
    pub fn safe_landing(&mut self) {
        warn!("{}: safe landing", self.id);
        if let Err(err) = self.motion.land() {
            warn!("{}: land failed during safe landing: {err}", self.id);
        }
        if let Err(err) = self.motion.disarm() {
            warn!("{}: disarm failed during safe landing: {err}", self.id);
        }
    }
}

impl std::fmt::Debug for Pilot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pilot")
            .field("id", &self.id)
            .field("timing", &self.timing)
            .field("retry", &self.retry)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}
