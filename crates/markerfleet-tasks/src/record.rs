//! Append-only audit export of discovered tasks.
//!
//! Write-only from the fleet's point of view: nothing reads records back
//! during a mission.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use markerfleet_core::{AgentId, Task};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One exported line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub agent: AgentId,
    pub key: String,
    pub position: Point3<f32>,
    pub discovered_at: DateTime<Utc>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            agent: task.discovered_by().clone(),
            key: task.key().to_owned(),
            position: task.world_position(),
            discovered_at: task.discovered_at(),
        }
    }
}

/// Sink for discovered-task records. Shared by all scanners.
pub trait TaskRecorder: Send + Sync {
    fn record(&self, task: &Task) -> Result<(), RecordError>;
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecorder;

impl TaskRecorder for NullRecorder {
    fn record(&self, _task: &Task) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonLinesRecorder {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
}

impl JsonLinesRecorder {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskRecorder for JsonLinesRecorder {
    fn record(&self, task: &Task) -> Result<(), RecordError> {
        let line = serde_json::to_string(&TaskRecord::from(task))?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// Read every record from a JSON-lines export. Intended for post-mission tooling.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<TaskRecord>, RecordError> {
    let raw = std::fs::read_to_string(path)?;
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| Ok(serde_json::from_str(l)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_appends_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.jsonl");
        let scout = AgentId::new("scout-1");

        {
            let rec = JsonLinesRecorder::open(&path).expect("open");
            rec.record(&Task::new("Box 2 1", Point3::new(0.5, -1.0, 2.0), scout.clone()))
                .expect("record");
        }
        let rec = JsonLinesRecorder::open(&path).expect("reopen");
        rec.record(&Task::new("ArUco_0", Point3::new(1.0, 1.0, 2.0), scout))
            .expect("record");

        let records = read_records(&path).expect("read");
        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["Box 2 1", "ArUco_0"]);
        assert_eq!(records[0].agent.as_str(), "scout-1");
        assert_eq!(records[0].position, Point3::new(0.5, -1.0, 2.0));
    }
}
