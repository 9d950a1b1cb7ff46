//! Carrier: take a task, fetch the payload, deliver it, return home.

mod params;

use std::time::{Duration, Instant};

use log::{info, warn};
use markerfleet_core::{AgentId, AgentState, CancelToken, GroupId, MissionPhase, Pose, Task};
use markerfleet_tasks::TakeError;
use nalgebra::Point2;

use crate::flight::{Arrival, LaunchStep, Pilot};
use crate::notify::{fire, NotifyEvent};
use crate::{AgentOutcome, MissionLinks, MissionMachine, MotionController};

pub use params::{CarrierKind, CarrierParams};

/// Queue wait slice, so cancellation is noticed promptly.
const TAKE_SLICE: Duration = Duration::from_millis(50);

pub struct CarrierAgent {
    state: AgentState,
    pilot: Pilot,
    kind: CarrierKind,
    group: GroupId,
    cruise_altitude: f32,
    max_tasks: usize,
    liveness: Duration,
    links: MissionLinks,
    task: Option<Task>,
    /// Where to go once the current launch sequence completes.
    after_launch: MissionPhase,
    delivered: Vec<String>,
    failure: Option<String>,
}

impl CarrierAgent {
    pub fn new(
        id: AgentId,
        home: Pose,
        params: CarrierParams,
        motion: Box<dyn MotionController>,
        links: MissionLinks,
        cancel: CancelToken,
    ) -> Self {
        let liveness = params.liveness();
        let CarrierParams {
            kind,
            group,
            cruise_altitude,
            max_tasks,
            timing,
            retry,
            ..
        } = params;
        Self {
            state: AgentState::new(id.clone(), kind.role(), home, Some(group.clone())),
            pilot: Pilot::new(id, motion, timing, retry, cancel),
            kind,
            group,
            cruise_altitude,
            max_tasks,
            liveness,
            links,
            task: None,
            after_launch: MissionPhase::TransitToPickup,
            delivered: Vec::new(),
            failure: None,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.pilot.cancel_token()
    }

    pub fn kind(&self) -> CarrierKind {
        self.kind
    }

    /// Keys delivered so far, in order.
    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }

    fn fail(&mut self, reason: String) -> MissionPhase {
        warn!("{}: {reason}", self.state.id);
        self.failure = Some(reason);
        self.pilot.safe_landing();
        MissionPhase::Failed
    }

    fn leg_target(&self, ground: Point2<f32>) -> Pose {
        let z = if self.kind.is_aerial() {
            self.cruise_altitude
        } else {
            0.0
        };
        Pose::new(ground.x, ground.y, z, 0.0)
    }

    /// Aerial carriers are on the ground between legs; launch again first.
    fn relaunch(&mut self, next: MissionPhase) -> MissionPhase {
        if !self.kind.is_aerial() {
            return next;
        }
        self.pilot.reset_launch();
        self.after_launch = next;
        MissionPhase::Arming
    }

    fn launch(&mut self, step: LaunchStep, next: MissionPhase) -> MissionPhase {
        match step {
            LaunchStep::Next => next,
            LaunchStep::Retry => MissionPhase::Arming,
            LaunchStep::GiveUp(reason) => self.fail(reason),
        }
    }

    fn wait_for_task(&mut self) -> MissionPhase {
        let started = Instant::now();
        loop {
            if self.pilot.cancel_token().is_cancelled() {
                return MissionPhase::WaitingForTask;
            }
            match self.links.queue.take(TAKE_SLICE) {
                Ok(task) => {
                    let p = task.world_position();
                    info!(
                        "{}: took {} at ({:.2}, {:.2}) [{} left]",
                        self.state.id,
                        task.key(),
                        p.x,
                        p.y,
                        self.links.queue.len()
                    );
                    self.task = Some(task);
                    return self.relaunch(MissionPhase::TransitToPickup);
                }
                Err(TakeError::Closed) => {
                    info!("{}: no tasks left, standing down", self.state.id);
                    return MissionPhase::Done;
                }
                Err(TakeError::TimedOut(_)) if started.elapsed() >= self.liveness => {
                    info!("{}: still waiting for a task", self.state.id);
                    return MissionPhase::WaitingForTask;
                }
                Err(TakeError::TimedOut(_)) => {}
            }
        }
    }

    fn transit(&mut self, target: Pose, here: MissionPhase, next: MissionPhase) -> MissionPhase {
        let timeout = self.pilot.timing().arrival_timeout();
        match self.pilot.fly_to(target, timeout) {
            Ok(Arrival::Cancelled) => here,
            Ok(Arrival::TimedOut) => {
                warn!("{}: {target} not reached in time, continuing", self.state.id);
                next
            }
            Ok(_) => next,
            Err(err) => self.fail(format!("{here} aborted: {err}")),
        }
    }

    fn current_key(&self) -> Option<String> {
        self.task.as_ref().map(|t| t.key().to_owned())
    }

    fn pickup(&mut self) -> MissionPhase {
        let Some(key) = self.current_key() else {
            return self.fail("pickup without a task".to_owned());
        };
        if let Err(err) = self.pilot.land() {
            return self.fail(format!("pickup aborted: {err}"));
        }
        info!("{}: picked up {key}", self.state.id);
        fire(
            self.links.notifier.as_ref(),
            NotifyEvent::Pickup {
                agent: self.state.id.clone(),
                key,
            },
        );
        if !self.pilot.pause(self.pilot.timing().settle()) {
            return MissionPhase::Pickup;
        }
        self.relaunch(MissionPhase::TransitToDestination)
    }

    fn dropoff(&mut self) -> MissionPhase {
        let Some(key) = self.current_key() else {
            return self.fail("drop-off without a task".to_owned());
        };
        if let Err(err) = self.pilot.land() {
            return self.fail(format!("drop-off aborted: {err}"));
        }
        info!("{}: delivered {key}", self.state.id);
        if self.kind.notifies_drop() {
            fire(
                self.links.notifier.as_ref(),
                NotifyEvent::Drop {
                    agent: self.state.id.clone(),
                    key: key.clone(),
                },
            );
        }
        self.task = None;
        self.delivered.push(key);
        if !self.pilot.pause(self.pilot.timing().settle()) {
            return MissionPhase::Dropoff;
        }
        self.relaunch(MissionPhase::ReturningHome)
    }

    fn return_home(&mut self) -> MissionPhase {
        let target = self.leg_target(self.state.home.ground());
        let timeout = self.pilot.timing().return_timeout();
        match self.pilot.fly_to(target, timeout) {
            Ok(Arrival::Cancelled) => return MissionPhase::ReturningHome,
            Ok(Arrival::TimedOut) => {
                warn!("{}: home not reached in time, stopping in place", self.state.id)
            }
            Ok(_) => {}
            Err(err) => return self.fail(format!("return aborted: {err}")),
        }
        if let Err(err) = self.pilot.land() {
            return self.fail(format!("landing failed: {err}"));
        }
        if self.kind.is_aerial() {
            if let Err(err) = self.pilot.disarm() {
                warn!("{}: disarm failed: {err}", self.state.id);
            }
        }
        if let Ok(pose) = self.pilot.pose() {
            self.state.pose = pose;
        }
        if self.delivered.len() < self.max_tasks {
            MissionPhase::WaitingForTask
        } else {
            MissionPhase::Done
        }
    }

    pub fn into_outcome(self) -> AgentOutcome {
        AgentOutcome {
            id: self.state.id,
            role: self.state.role,
            group: Some(self.group),
            phase: self.state.phase,
            final_pose: self.state.pose,
            published: Vec::new(),
            delivered: self.delivered,
            abandoned: self.task.map(|t| t.key().to_owned()),
            failure: self.failure,
        }
    }
}

impl MissionMachine for CarrierAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }

    fn step(&mut self, phase: MissionPhase) -> MissionPhase {
        match phase {
            MissionPhase::Idle => MissionPhase::WaitingForTask,
            MissionPhase::WaitingForTask => self.wait_for_task(),
            MissionPhase::Arming => {
                let step = self.pilot.arm_step();
                self.launch(step, MissionPhase::TakingOff)
            }
            MissionPhase::TakingOff => {
                let step = self.pilot.takeoff_step();
                let next = self.after_launch;
                self.launch(step, next)
            }
            MissionPhase::TransitToPickup => {
                let Some(task) = &self.task else {
                    return self.fail("transit without a task".to_owned());
                };
                let p = task.world_position();
                let target = self.leg_target(Point2::new(p.x, p.y));
                self.transit(target, phase, MissionPhase::Pickup)
            }
            MissionPhase::Pickup => self.pickup(),
            MissionPhase::TransitToDestination => {
                let Some(task) = &self.task else {
                    return self.fail("transit without a task".to_owned());
                };
                let dest = self.links.destinations.resolve(&self.group, task.key());
                info!(
                    "{}: {} goes to ({:.2}, {:.2})",
                    self.state.id,
                    task.key(),
                    dest.x,
                    dest.y
                );
                let target = self.leg_target(dest);
                self.transit(target, phase, MissionPhase::Dropoff)
            }
            MissionPhase::Dropoff => self.dropoff(),
            MissionPhase::ReturningHome => self.return_home(),
            MissionPhase::Done | MissionPhase::Failed => phase,
            other => self.fail(format!("carrier cannot run phase {other}")),
        }
    }

    fn abort(&mut self, reason: &str) -> MissionPhase {
        self.fail(reason.to_owned())
    }
}

impl std::fmt::Debug for CarrierAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierAgent")
            .field("state", &self.state)
            .field("kind", &self.kind)
            .field("pilot", &self.pilot)
            .field("task", &self.task.as_ref().map(Task::key))
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}
