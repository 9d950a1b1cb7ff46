//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use markerfleet_core::Pose;
use markerfleet_vision::{Camera, CameraError, Detection, Frame, MarkerDetector};

use crate::{FlightTiming, MotionController, MotionError};

pub(crate) fn fast_timing() -> FlightTiming {
    FlightTiming {
        arm_settle_ms: 0,
        takeoff_settle_ms: 0,
        min_takeoff_altitude: 0.1,
        poll_ms: 1,
        arrival_timeout_ms: 20,
        return_timeout_ms: 20,
        settle_ms: 0,
    }
}

#[derive(Default)]
struct Calls {
    names: Vec<String>,
    targets: Vec<Pose>,
}

/// Shared record of motion calls, readable after the controller moved into a pilot.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Calls>>);

impl CallLog {
    fn push(&self, call: &str) {
        self.0.lock().expect("call log").names.push(call.to_owned());
    }

    fn push_target(&self, target: Pose) {
        self.0.lock().expect("call log").targets.push(target);
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.0
            .lock()
            .expect("call log")
            .names
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.0.lock().expect("call log").names.clone()
    }

    /// Every accepted goto target, in order.
    pub(crate) fn targets(&self) -> Vec<Pose> {
        self.0.lock().expect("call log").targets.clone()
    }
}

/// Point-mass vehicle that reaches its target after `arrive_after` polls.
pub(crate) struct ScriptedMotion {
    pose: Pose,
    target: Option<Pose>,
    polls: usize,
    arrive_after: Option<usize>,
    arm_failures: usize,
    reject_arm: bool,
    grounded: bool,
    goto_failures_after: Option<usize>,
    gotos: usize,
    log: CallLog,
}

impl ScriptedMotion {
    pub(crate) fn new() -> Self {
        Self {
            pose: Pose::default(),
            target: None,
            polls: 0,
            arrive_after: Some(2),
            arm_failures: 0,
            reject_arm: false,
            grounded: false,
            goto_failures_after: None,
            gotos: 0,
            log: CallLog::default(),
        }
    }

    pub(crate) fn at(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub(crate) fn failing_arm(mut self, times: usize) -> Self {
        self.arm_failures = times;
        self
    }

    pub(crate) fn rejecting_arm(mut self) -> Self {
        self.reject_arm = true;
        self
    }

    pub(crate) fn grounded(mut self) -> Self {
        self.grounded = true;
        self
    }

    pub(crate) fn never_arrives(mut self) -> Self {
        self.arrive_after = None;
        self
    }

    /// The `n`-th and later goto commands fail with a command error.
    pub(crate) fn failing_goto_from(mut self, n: usize) -> Self {
        self.goto_failures_after = Some(n);
        self
    }

    pub(crate) fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl MotionController for ScriptedMotion {
    fn arm(&mut self) -> Result<(), MotionError> {
        self.log.push("arm");
        if self.reject_arm {
            return Err(MotionError::Command("arming denied".into()));
        }
        if self.arm_failures > 0 {
            self.arm_failures -= 1;
            return Err(MotionError::Connection("no heartbeat".into()));
        }
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), MotionError> {
        self.log.push("disarm");
        Ok(())
    }

    fn takeoff(&mut self) -> Result<(), MotionError> {
        self.log.push("takeoff");
        if !self.grounded {
            self.pose.z = 1.5;
        }
        Ok(())
    }

    fn land(&mut self) -> Result<(), MotionError> {
        self.log.push("land");
        self.pose.z = 0.0;
        Ok(())
    }

    fn goto_pose(&mut self, target: Pose) -> Result<(), MotionError> {
        self.gotos += 1;
        self.log.push("goto");
        if self.goto_failures_after.is_some_and(|n| self.gotos >= n) {
            return Err(MotionError::Command("navigation rejected".into()));
        }
        self.log.push_target(target);
        self.target = Some(target);
        self.polls = 0;
        Ok(())
    }

    fn has_arrived(&mut self) -> Result<bool, MotionError> {
        self.polls += 1;
        match (self.target, self.arrive_after) {
            (Some(target), Some(n)) if self.polls >= n => {
                self.pose = target;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn current_pose(&mut self) -> Result<Pose, MotionError> {
        Ok(self.pose)
    }
}

/// Always yields a blank 640x480 frame.
pub(crate) struct BlankCamera;

impl Camera for BlankCamera {
    fn frame(&mut self) -> Result<Option<Frame>, CameraError> {
        Ok(Some(Frame::empty(640, 480)))
    }
}

/// Unreachable for the first `down_for` reads, then alternates blank frames
/// with empty reads, starting with a frame.
pub(crate) struct FlakyCamera {
    down_for: usize,
    reads: usize,
}

impl FlakyCamera {
    pub(crate) fn new(down_for: usize) -> Self {
        Self { down_for, reads: 0 }
    }
}

impl Camera for FlakyCamera {
    fn frame(&mut self) -> Result<Option<Frame>, CameraError> {
        self.reads += 1;
        if self.reads <= self.down_for {
            return Err(CameraError::Unavailable("no stream".into()));
        }
        if (self.reads - self.down_for) % 2 == 0 {
            return Ok(None);
        }
        Ok(Some(Frame::empty(640, 480)))
    }
}

/// Replays one detection list per call, then sees nothing.
pub(crate) struct ScriptedDetector(pub(crate) VecDeque<Vec<Detection>>);

impl MarkerDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Vec<Detection> {
        self.0.pop_front().unwrap_or_default()
    }
}
