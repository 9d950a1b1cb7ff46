//! Facade crate for the `markerfleet-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying crates,
//! - [`MissionConfig`]: the JSON mission description and its validation,
//! - [`Mission`]: the two-wave coordinator (scanners, then carriers),
//! - [`sim`]: a simulated arena backend for headless runs and tests.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use markerfleet::agents::LogNotifier;
//! use markerfleet::sim::SimBackend;
//! use markerfleet::tasks::NullRecorder;
//! use markerfleet::{Mission, MissionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MissionConfig::load_json("mission.json")?;
//! let backend = SimBackend::new(config.world.clone().unwrap_or_default(), config.localizer());
//! let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(LogNotifier))?;
//! let report = mission.run(&backend);
//! println!("delivered: {}", report.delivered().count());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `markerfleet::core`: poses, tasks, agent state, arena geometry, logging.
//! - `markerfleet::tasks`: the shared task queue and task record export.
//! - `markerfleet::vision`: camera/detector seams, vocabulary, localization.
//! - `markerfleet::agents`: scanner and carrier state machines, destinations.

pub use markerfleet_agents as agents;
pub use markerfleet_core as core;
pub use markerfleet_tasks as tasks;
pub use markerfleet_vision as vision;

mod config;
mod coordinator;
mod report;
pub mod sim;

pub use config::{
    CarrierConfig, ConfigError, GridSpec, MissionConfig, MissionIoError, ScanRoute, ScannerConfig,
};
pub use coordinator::{FleetBackend, Mission};
pub use report::MissionReport;
