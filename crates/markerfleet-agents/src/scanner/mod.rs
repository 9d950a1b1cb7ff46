//! Aerial scanner: launch, patrol a route publishing tasks, return home.

mod params;
mod spotter;

use std::collections::HashSet;
use std::ops::ControlFlow;

use log::{info, warn};
use markerfleet_core::{AgentId, AgentRole, AgentState, CancelToken, MissionPhase, Pose};
use markerfleet_vision::{Camera, MarkerDetector};

use crate::flight::{Arrival, LaunchStep, Pilot};
use crate::{AgentOutcome, MissionLinks, MissionMachine, MotionController};

pub use params::ScannerParams;
use spotter::Spotter;

/// Devices mounted on one scanner.
pub struct ScannerHardware {
    pub motion: Box<dyn MotionController>,
    pub camera: Box<dyn Camera>,
    pub detector: Box<dyn MarkerDetector>,
}

pub struct ScannerAgent {
    state: AgentState,
    pilot: Pilot,
    spotter: Spotter,
    waypoints: Vec<Pose>,
    next_waypoint: usize,
    return_altitude: f32,
    found_enough: usize,
    failure: Option<String>,
}

impl ScannerAgent {
    pub fn new(
        id: AgentId,
        home: Pose,
        params: ScannerParams,
        hardware: ScannerHardware,
        links: MissionLinks,
        cancel: CancelToken,
    ) -> Self {
        let ScannerParams {
            waypoints,
            return_altitude,
            found_enough,
            vocabulary,
            localizer,
            timing,
            retry,
        } = params;
        Self {
            state: AgentState::new(id.clone(), AgentRole::Scanner, home, None),
            pilot: Pilot::new(id.clone(), hardware.motion, timing, retry, cancel),
            spotter: Spotter {
                id,
                camera: hardware.camera,
                detector: hardware.detector,
                vocabulary,
                localizer,
                links,
                seen: HashSet::new(),
                published: Vec::new(),
            },
            waypoints,
            next_waypoint: 0,
            return_altitude,
            found_enough,
            failure: None,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.pilot.cancel_token()
    }

    /// Keys this scanner won the publish for, in discovery order.
    pub fn published(&self) -> &[String] {
        &self.spotter.published
    }

    fn has_found_enough(&self) -> bool {
        self.found_enough > 0 && self.spotter.found() >= self.found_enough
    }

    fn fail(&mut self, reason: String) -> MissionPhase {
        warn!("{}: {reason}", self.state.id);
        self.failure = Some(reason);
        self.pilot.safe_landing();
        MissionPhase::Failed
    }

    fn launch(&mut self, step: LaunchStep, next: MissionPhase) -> MissionPhase {
        match step {
            LaunchStep::Next => next,
            LaunchStep::Retry => MissionPhase::Arming,
            LaunchStep::GiveUp(reason) => self.fail(reason),
        }
    }

    /// Wait for the camera stream before anything spins up. A scanner that
    /// never gets a frame stays on the ground.
    fn check_camera(&mut self) -> MissionPhase {
        let attempts = self.pilot.retry().camera_attempts.max(1);
        let backoff = self.pilot.retry().camera_backoff();
        for attempt in 1..=attempts {
            if self.spotter.camera_ready() {
                self.pilot.reset_launch();
                return MissionPhase::Arming;
            }
            warn!(
                "{}: camera not connected (attempt {attempt}/{attempts})",
                self.state.id
            );
            if attempt < attempts && !self.pilot.pause(backoff) {
                return MissionPhase::Idle;
            }
        }
        let reason = format!("camera not connected after {attempts} attempt(s)");
        warn!("{}: {reason}, skipping mission", self.state.id);
        self.failure = Some(reason);
        MissionPhase::Failed
    }

    /// Visit one waypoint, scanning while in transit.
    fn patrol(&mut self) -> MissionPhase {
        if self.has_found_enough() {
            info!(
                "{}: found {} tasks, returning early",
                self.state.id,
                self.spotter.found()
            );
            return MissionPhase::ReturningHome;
        }
        let Some(&waypoint) = self.waypoints.get(self.next_waypoint) else {
            info!("{}: route complete", self.state.id);
            return MissionPhase::ReturningHome;
        };
        self.next_waypoint += 1;
        info!(
            "{}: waypoint {}/{} {waypoint}",
            self.state.id,
            self.next_waypoint,
            self.waypoints.len()
        );

        if let Err(err) = self.pilot.goto(waypoint) {
            warn!("{}: leaving patrol: {err}", self.state.id);
            return MissionPhase::ReturningHome;
        }

        let found_enough = self.found_enough;
        let timeout = self.pilot.timing().arrival_timeout();
        let waited = self.pilot.wait_arrival(timeout, |pose| {
            self.state.pose = pose;
            self.spotter.scan(pose);
            if found_enough > 0 && self.spotter.found() >= found_enough {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        match waited {
            Ok(Arrival::Reached) => self.rescan(),
            Ok(Arrival::TimedOut) => {
                warn!("{}: waypoint {waypoint} not reached in time", self.state.id);
                self.rescan()
            }
            Ok(Arrival::Interrupted) | Ok(Arrival::Cancelled) => MissionPhase::Patrolling,
            Err(err) => {
                warn!("{}: leaving patrol: {err}", self.state.id);
                MissionPhase::ReturningHome
            }
        }
    }

    /// One more look once the wait at a waypoint is over.
    fn rescan(&mut self) -> MissionPhase {
        match self.pilot.pose() {
            Ok(pose) => {
                self.state.pose = pose;
                self.spotter.scan(pose);
                MissionPhase::Patrolling
            }
            Err(err) => {
                warn!("{}: leaving patrol: {err}", self.state.id);
                MissionPhase::ReturningHome
            }
        }
    }

    fn return_home(&mut self) -> MissionPhase {
        let target = self.state.home.with_altitude(self.return_altitude);
        let timeout = self.pilot.timing().return_timeout();
        match self.pilot.fly_to(target, timeout) {
            Ok(Arrival::Reached) => {}
            Ok(Arrival::Cancelled) => return MissionPhase::ReturningHome,
            Ok(_) => warn!("{}: home not reached in time, landing in place", self.state.id),
            Err(err) => warn!("{}: return failed, landing in place: {err}", self.state.id),
        }
        if let Err(err) = self.pilot.land() {
            return self.fail(format!("landing failed: {err}"));
        }
        if let Err(err) = self.pilot.disarm() {
            warn!("{}: disarm failed: {err}", self.state.id);
        }
        if let Ok(pose) = self.pilot.pose() {
            self.state.pose = pose;
        }
        MissionPhase::Done
    }

    pub fn into_outcome(self) -> AgentOutcome {
        AgentOutcome {
            id: self.state.id,
            role: self.state.role,
            group: None,
            phase: self.state.phase,
            final_pose: self.state.pose,
            published: self.spotter.published,
            delivered: Vec::new(),
            abandoned: None,
            failure: self.failure,
        }
    }
}

impl MissionMachine for ScannerAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }

    fn step(&mut self, phase: MissionPhase) -> MissionPhase {
        match phase {
            MissionPhase::Idle => self.check_camera(),
            MissionPhase::Arming => {
                let step = self.pilot.arm_step();
                self.launch(step, MissionPhase::TakingOff)
            }
            MissionPhase::TakingOff => {
                let step = self.pilot.takeoff_step();
                self.launch(step, MissionPhase::Patrolling)
            }
            MissionPhase::Patrolling => self.patrol(),
            MissionPhase::ReturningHome => self.return_home(),
            MissionPhase::Done | MissionPhase::Failed => phase,
            other => self.fail(format!("scanner cannot run phase {other}")),
        }
    }

    fn abort(&mut self, reason: &str) -> MissionPhase {
        self.fail(reason.to_owned())
    }
}

impl std::fmt::Debug for ScannerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerAgent")
            .field("state", &self.state)
            .field("pilot", &self.pilot)
            .field("waypoints", &self.waypoints.len())
            .field("next_waypoint", &self.next_waypoint)
            .field("found", &self.spotter.found())
            .finish_non_exhaustive()
    }
}
