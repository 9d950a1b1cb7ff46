//! Post-mission summary.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use markerfleet_agents::AgentOutcome;
use serde::{Deserialize, Serialize};

use crate::MissionIoError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scanners: Vec<AgentOutcome>,
    pub carriers: Vec<AgentOutcome>,
    /// False when no scanner published anything and carriers stayed home.
    pub carrier_wave_launched: bool,
    pub tasks_published: usize,
    /// Published tasks nobody took.
    pub tasks_remaining: usize,
}

impl MissionReport {
    pub fn delivered(&self) -> impl Iterator<Item = &str> {
        self.carriers
            .iter()
            .flat_map(|c| c.delivered.iter().map(String::as_str))
    }

    pub fn failed(&self) -> impl Iterator<Item = &AgentOutcome> {
        self.scanners
            .iter()
            .chain(&self.carriers)
            .filter(|o| !o.succeeded())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, MissionIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), MissionIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
