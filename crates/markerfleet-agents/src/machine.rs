//! Common stepping interface and the closed set of fleet roles.

use std::sync::Arc;

use log::{debug, info, warn};
use markerfleet_core::{AgentId, AgentRole, AgentState, CancelToken, GroupId, MissionPhase, Pose};
use markerfleet_tasks::{TaskQueue, TaskRecorder};
use serde::{Deserialize, Serialize};

use crate::{CarrierAgent, DestinationTable, NotificationSink, ScannerAgent};

/// Mission-wide collaborators every agent is constructed with.
#[derive(Clone)]
pub struct MissionLinks {
    pub queue: Arc<TaskQueue>,
    pub recorder: Arc<dyn TaskRecorder>,
    pub notifier: Arc<dyn NotificationSink>,
    pub destinations: Arc<DestinationTable>,
}

impl std::fmt::Debug for MissionLinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionLinks")
            .field("queue", &self.queue)
            .field("destinations", &self.destinations)
            .finish_non_exhaustive()
    }
}

/// One agent's state machine, advanced one phase at a time.
pub trait MissionMachine {
    fn state(&self) -> &AgentState;
    fn state_mut(&mut self) -> &mut AgentState;
    /// Run the work of `phase` and return the phase to enter next.
    fn step(&mut self, phase: MissionPhase) -> MissionPhase;
    /// Stop the mission from any phase (safe landing included).
    fn abort(&mut self, reason: &str) -> MissionPhase;
}

/// Step `machine` until it reaches `Done` or `Failed`.
pub fn drive<M: MissionMachine + ?Sized>(machine: &mut M, cancel: &CancelToken) -> MissionPhase {
    loop {
        let phase = machine.state().phase;
        if phase.is_terminal() {
            return phase;
        }
        let next = if cancel.is_cancelled() {
            machine.abort("mission cancelled")
        } else {
            machine.step(phase)
        };
        if next != phase {
            debug!("{}: {phase} -> {next}", machine.state().id);
        }
        machine.state_mut().phase = next;
    }
}

/// Final report of one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub id: AgentId,
    pub role: AgentRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    pub phase: MissionPhase,
    pub final_pose: Pose,
    /// Keys this agent published (scanners).
    #[serde(default)]
    pub published: Vec<String>,
    /// Keys this agent delivered (carriers).
    #[serde(default)]
    pub delivered: Vec<String>,
    /// Key taken from the queue but not delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abandoned: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl AgentOutcome {
    pub fn succeeded(&self) -> bool {
        self.phase == MissionPhase::Done
    }
}

/// Closed set of fleet roles sharing [`MissionMachine`].
#[derive(Debug)]
pub enum Agent {
    Scanner(ScannerAgent),
    Carrier(CarrierAgent),
}

impl Agent {
    pub fn state(&self) -> &AgentState {
        match self {
            Agent::Scanner(s) => s.state(),
            Agent::Carrier(c) => c.state(),
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.state().id
    }

    pub fn role(&self) -> AgentRole {
        self.state().role
    }

    /// Drive the agent to completion on the calling thread.
    pub fn run(self) -> AgentOutcome {
        let outcome = match self {
            Agent::Scanner(mut scanner) => {
                let cancel = scanner.cancel_token().clone();
                drive(&mut scanner, &cancel);
                scanner.into_outcome()
            }
            Agent::Carrier(mut carrier) => {
                let cancel = carrier.cancel_token().clone();
                drive(&mut carrier, &cancel);
                carrier.into_outcome()
            }
        };
        match &outcome.failure {
            Some(reason) => warn!("{}: mission failed: {reason}", outcome.id),
            None => info!("{}: mission {}", outcome.id, outcome.phase),
        }
        outcome
    }
}

impl From<ScannerAgent> for Agent {
    fn from(agent: ScannerAgent) -> Self {
        Agent::Scanner(agent)
    }
}

impl From<CarrierAgent> for Agent {
    fn from(agent: CarrierAgent) -> Self {
        Agent::Carrier(agent)
    }
}
