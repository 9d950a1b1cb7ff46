//! JSON mission configuration.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use markerfleet_agents::{
    CarrierKind, CarrierParams, DestinationError, DestinationTable, FlightTiming, RetryPolicy,
    ScannerParams,
};
use markerfleet_core::{AgentId, GroupId, Pose, Triangle};
use markerfleet_vision::{Localizer, Vocabulary, DEFAULT_CALIBRATION};
use serde::{Deserialize, Serialize};

use crate::sim::SimWorld;

#[derive(thiserror::Error, Debug)]
pub enum MissionIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Reasons a mission refuses to start.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("mission has no agents")]
    NoAgents,
    #[error("agent id {0} is used more than once")]
    DuplicateId(AgentId),
    #[error("calibration must be positive and finite, got {0}")]
    Calibration(f32),
    #[error("{0} has a non-finite coordinate")]
    NonFinite(String),
    #[error("carrier {carrier}: group {group} has no destination partition")]
    UnknownGroup { carrier: AgentId, group: GroupId },
    #[error("carrier {0}: task budget must be at least 1")]
    NoTaskBudget(AgentId),
    #[error("carrier {0}: cruise altitude must be positive")]
    CruiseAltitude(AgentId),
    #[error("retry policy must allow at least one attempt")]
    NoRetries,
    #[error("scanner {0}: invalid scan grid")]
    InvalidGrid(AgentId),
    #[error("scanner {0}: no waypoints left after region filtering")]
    EmptyRoute(AgentId),
    #[error(transparent)]
    Destinations(#[from] DestinationError),
}

/// Lawnmower grid over an axis-aligned rectangle at a fixed altitude.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// `[min, max]` along x, inclusive.
    pub x: [f32; 2],
    /// `[min, max]` along y, inclusive.
    pub y: [f32; 2],
    pub step: f32,
    pub altitude: f32,
}

impl GridSpec {
    fn is_valid(&self) -> bool {
        let finite = [self.x[0], self.x[1], self.y[0], self.y[1], self.step, self.altitude]
            .iter()
            .all(|v| v.is_finite());
        finite && self.step > 0.0 && self.x[0] <= self.x[1] && self.y[0] <= self.y[1]
    }

    fn axis(lo: f32, hi: f32, step: f32) -> Vec<f32> {
        let n = ((hi - lo) / step + 1e-3).floor() as usize + 1;
        (0..n).map(|i| lo + i as f32 * step).collect()
    }

    /// Grid points, sweeping y up and down on alternate x columns.
    pub fn points(&self) -> Vec<Pose> {
        if !self.is_valid() {
            return Vec::new();
        }
        let xs = Self::axis(self.x[0], self.x[1], self.step);
        let ys = Self::axis(self.y[0], self.y[1], self.step);
        let mut out = Vec::with_capacity(xs.len() * ys.len());
        for (col, &x) in xs.iter().enumerate() {
            let column = ys.iter().map(|&y| Pose::new(x, y, self.altitude, 0.0));
            if col % 2 == 0 {
                out.extend(column);
            } else {
                out.extend(column.rev());
            }
        }
        out
    }
}

/// Patrol route: explicit waypoints, then an optional generated grid,
/// both filtered by an optional region of interest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRoute {
    #[serde(default)]
    pub waypoints: Vec<Pose>,
    #[serde(default)]
    pub grid: Option<GridSpec>,
    #[serde(default)]
    pub region: Option<Triangle>,
}

impl ScanRoute {
    pub fn resolve(&self) -> Vec<Pose> {
        let grid = self.grid.as_ref().map(GridSpec::points).unwrap_or_default();
        self.waypoints
            .iter()
            .copied()
            .chain(grid)
            .filter(|p| self.region.is_none_or(|r| r.contains(p.ground())))
            .collect()
    }
}

fn default_return_altitude() -> f32 {
    1.5
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub id: AgentId,
    pub home: Pose,
    #[serde(default)]
    pub route: ScanRoute,
    #[serde(default = "default_return_altitude")]
    pub return_altitude: f32,
}

fn default_cruise_altitude() -> f32 {
    1.5
}

fn default_max_tasks() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarrierConfig {
    pub id: AgentId,
    pub home: Pose,
    #[serde(default)]
    pub kind: CarrierKind,
    pub group: GroupId,
    #[serde(default = "default_cruise_altitude")]
    pub cruise_altitude: f32,
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
}

fn default_calibration() -> f32 {
    DEFAULT_CALIBRATION
}

fn default_found_enough() -> usize {
    4
}

fn default_liveness_ms() -> u64 {
    5_000
}

/// Whole-fleet mission description. Immutable once the mission starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Pixels per metre at unit altitude.
    #[serde(default = "default_calibration")]
    pub calibration: f32,
    /// Recognised task keys; absent accepts every payload.
    #[serde(default)]
    pub vocabulary: Vocabulary,
    /// Per-scanner early-return threshold; 0 disables it.
    #[serde(default = "default_found_enough")]
    pub found_enough: usize,
    #[serde(default)]
    pub timing: FlightTiming,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_liveness_ms")]
    pub liveness_ms: u64,
    #[serde(default)]
    pub scanners: Vec<ScannerConfig>,
    #[serde(default)]
    pub carriers: Vec<CarrierConfig>,
    pub destinations: DestinationTable,
    /// Simulated arena for headless runs.
    #[serde(default)]
    pub world: Option<SimWorld>,
}

impl MissionConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, MissionIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), MissionIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn localizer(&self) -> Localizer {
        Localizer::new(self.calibration)
    }

    pub fn scanner_params(&self, scanner: &ScannerConfig) -> ScannerParams {
        ScannerParams {
            waypoints: scanner.route.resolve(),
            return_altitude: scanner.return_altitude,
            found_enough: self.found_enough,
            vocabulary: self.vocabulary.clone(),
            localizer: self.localizer(),
            timing: self.timing.clone(),
            retry: self.retry.clone(),
        }
    }

    pub fn carrier_params(&self, carrier: &CarrierConfig) -> CarrierParams {
        CarrierParams {
            cruise_altitude: carrier.cruise_altitude,
            max_tasks: carrier.max_tasks,
            liveness_ms: self.liveness_ms,
            timing: self.timing.clone(),
            retry: self.retry.clone(),
            ..CarrierParams::new(carrier.kind, carrier.group.clone())
        }
    }

    /// Check everything that must hold before any agent starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanners.is_empty() && self.carriers.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        if !(self.calibration.is_finite() && self.calibration > 0.0) {
            return Err(ConfigError::Calibration(self.calibration));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NoRetries);
        }
        self.destinations.validate()?;

        let mut ids = HashSet::new();
        let all_ids = self
            .scanners
            .iter()
            .map(|s| &s.id)
            .chain(self.carriers.iter().map(|c| &c.id));
        for id in all_ids {
            if !ids.insert(id) {
                return Err(ConfigError::DuplicateId(id.clone()));
            }
        }

        for scanner in &self.scanners {
            validate_scanner(scanner)?;
        }
        for carrier in &self.carriers {
            self.validate_carrier(carrier)?;
        }
        Ok(())
    }

    fn validate_carrier(&self, carrier: &CarrierConfig) -> Result<(), ConfigError> {
        if !carrier.home.is_finite() {
            return Err(ConfigError::NonFinite(format!("carrier {} home", carrier.id)));
        }
        if carrier.max_tasks == 0 {
            return Err(ConfigError::NoTaskBudget(carrier.id.clone()));
        }
        if carrier.kind.is_aerial()
            && !(carrier.cruise_altitude.is_finite() && carrier.cruise_altitude > 0.0)
        {
            return Err(ConfigError::CruiseAltitude(carrier.id.clone()));
        }
        if !self.destinations.has_group(&carrier.group) {
            return Err(ConfigError::UnknownGroup {
                carrier: carrier.id.clone(),
                group: carrier.group.clone(),
            });
        }
        Ok(())
    }
}

fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
    let id = &scanner.id;
    if !scanner.home.is_finite() || !scanner.return_altitude.is_finite() {
        return Err(ConfigError::NonFinite(format!("scanner {id} home")));
    }
    if scanner.route.waypoints.iter().any(|p| !p.is_finite()) {
        return Err(ConfigError::NonFinite(format!("scanner {id} waypoints")));
    }
    if scanner.route.region.is_some_and(|r| !r.is_finite()) {
        return Err(ConfigError::NonFinite(format!("scanner {id} region")));
    }
    if scanner.route.grid.as_ref().is_some_and(|g| !g.is_valid()) {
        return Err(ConfigError::InvalidGrid(id.clone()));
    }
    if scanner.route.resolve().is_empty() {
        return Err(ConfigError::EmptyRoute(id.clone()));
    }
    Ok(())
}
