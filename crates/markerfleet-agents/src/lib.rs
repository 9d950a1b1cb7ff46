//! Mission state machines for a marker-hunting fleet.
//!
//! Scanners patrol and publish [`Task`](markerfleet_core::Task)s into a shared
//! [`TaskQueue`](markerfleet_tasks::TaskQueue); carriers take them and deliver
//! the payload to a drop-off point chosen by the [`DestinationTable`]. Both
//! roles implement [`MissionMachine`] and run one per thread via [`Agent::run`].
//!
//! Vehicle control, cameras and marker decoding are injected through the
//! [`MotionController`], [`Camera`](markerfleet_vision::Camera) and
//! [`MarkerDetector`](markerfleet_vision::MarkerDetector) traits.

mod carrier;
mod destination;
mod flight;
mod machine;
mod motion;
mod notify;
mod scanner;

#[cfg(test)]
mod testkit;

pub use carrier::{CarrierAgent, CarrierKind, CarrierParams};
pub use destination::{DestinationError, DestinationRule, DestinationTable, GroupPolicy};
pub use flight::{Arrival, FlightTiming, LaunchStep, Pilot, RetryPolicy};
pub use machine::{drive, Agent, AgentOutcome, MissionLinks, MissionMachine};
pub use motion::{MotionController, MotionError};
pub use notify::{fire, LogNotifier, MemoryNotifier, NotificationSink, NotifyError, NotifyEvent};
pub use scanner::{ScannerAgent, ScannerHardware, ScannerParams};
