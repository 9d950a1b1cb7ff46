//! Task hand-off between the scanning and carrying halves of the fleet.
//!
//! - [`TaskQueue`]: the one object shared by every agent thread. Keys are
//!   accepted at most once per run and each accepted task is taken by at
//!   most one consumer.
//! - [`TaskRecorder`]: write-only audit export of discovered tasks.

mod queue;
mod record;

pub use queue::{TakeError, TaskQueue};
pub use record::{
    read_records, JsonLinesRecorder, NullRecorder, RecordError, TaskRecord, TaskRecorder,
};
