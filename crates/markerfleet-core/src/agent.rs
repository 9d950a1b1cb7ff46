use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AgentId, GroupId, Pose};

/// Fleet member role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Aerial marker scanner; produces tasks.
    Scanner,
    /// Aerial carrier; lands for pickup and drop-off.
    AerialCarrier,
    /// Ground carrier; stops for pickup and drop-off.
    GroundCarrier,
}

impl AgentRole {
    #[inline]
    pub fn is_carrier(self) -> bool {
        !matches!(self, AgentRole::Scanner)
    }

    #[inline]
    pub fn is_aerial(self) -> bool {
        !matches!(self, AgentRole::GroundCarrier)
    }
}

/// Step of an agent's mission state machine.
///
/// Scanners walk `Idle -> Arming -> TakingOff -> Patrolling -> ReturningHome -> Done`.
/// Carriers walk `Idle -> WaitingForTask -> Arming -> TakingOff -> TransitToPickup
/// -> Pickup -> TransitToDestination -> Dropoff -> ReturningHome -> Done`.
/// `Failed` is reachable from every non-terminal phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    #[default]
    Idle,
    Arming,
    TakingOff,
    Patrolling,
    WaitingForTask,
    TransitToPickup,
    Pickup,
    TransitToDestination,
    Dropoff,
    ReturningHome,
    Done,
    Failed,
}

impl MissionPhase {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionPhase::Done | MissionPhase::Failed)
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionPhase::Idle => "idle",
            MissionPhase::Arming => "arming",
            MissionPhase::TakingOff => "taking-off",
            MissionPhase::Patrolling => "patrolling",
            MissionPhase::WaitingForTask => "waiting-for-task",
            MissionPhase::TransitToPickup => "transit-to-pickup",
            MissionPhase::Pickup => "pickup",
            MissionPhase::TransitToDestination => "transit-to-destination",
            MissionPhase::Dropoff => "dropoff",
            MissionPhase::ReturningHome => "returning-home",
            MissionPhase::Done => "done",
            MissionPhase::Failed => "failed",
        };
        f.pad(name)
    }
}

/// Per-agent mutable state, owned by the agent's own thread.
///
/// Clones are read-only snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub role: AgentRole,
    pub pose: Pose,
    pub phase: MissionPhase,
    pub home: Pose,
    #[serde(default)]
    pub group: Option<GroupId>,
}

impl AgentState {
    /// Fresh `Idle` state positioned at `home`.
    pub fn new(id: AgentId, role: AgentRole, home: Pose, group: Option<GroupId>) -> Self {
        Self {
            id,
            role,
            pose: home,
            phase: MissionPhase::Idle,
            home,
            group,
        }
    }

    pub fn snapshot(&self) -> AgentState {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_and_failed_are_terminal() {
        let terminal: Vec<_> = [
            MissionPhase::Idle,
            MissionPhase::Arming,
            MissionPhase::TakingOff,
            MissionPhase::Patrolling,
            MissionPhase::WaitingForTask,
            MissionPhase::TransitToPickup,
            MissionPhase::Pickup,
            MissionPhase::TransitToDestination,
            MissionPhase::Dropoff,
            MissionPhase::ReturningHome,
            MissionPhase::Done,
            MissionPhase::Failed,
        ]
        .into_iter()
        .filter(|p| p.is_terminal())
        .collect();
        assert_eq!(terminal, vec![MissionPhase::Done, MissionPhase::Failed]);
    }

    #[test]
    fn new_state_starts_idle_at_home() {
        let home = Pose::new(4.0, 0.0, 0.0, 0.0);
        let state = AgentState::new(
            AgentId::new("transport-0"),
            AgentRole::AerialCarrier,
            home,
            Some(GroupId::new("group-1")),
        );
        assert_eq!(state.phase, MissionPhase::Idle);
        assert_eq!(state.pose, home);
        assert_eq!(state.snapshot(), state);
    }

    #[test]
    fn roles_serialize_snake_case() {
        let json = serde_json::to_string(&AgentRole::GroundCarrier).expect("serialize");
        assert_eq!(json, "\"ground_carrier\"");
        assert!(AgentRole::GroundCarrier.is_carrier());
        assert!(!AgentRole::GroundCarrier.is_aerial());
        assert!(!AgentRole::Scanner.is_carrier());
    }
}
