//! Core types and utilities for the markerfleet marker-discovery fleet.
//!
//! This crate is intentionally small: arena geometry, the immutable
//! [`Task`] hand-off record, per-agent state types and a couple of process
//! utilities (logger, cancellation). It does *not* know about vehicles,
//! cameras or the shared task queue.

mod agent;
mod cancel;
mod geometry;
mod logger;
mod pose;
mod task;

pub use agent::{AgentRole, AgentState, MissionPhase};
pub use cancel::CancelToken;
pub use geometry::{
    point_in_triangle, polygon_centroid, project_pixel_offset, scale_pixel_offset, Triangle,
};
pub use pose::{AgentId, GroupId, Pose};
pub use task::Task;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
