use std::collections::HashSet;

use log::{debug, info, warn};
use markerfleet_core::{AgentId, Pose, Task};
use markerfleet_vision::{Camera, Localizer, MarkerDetector, Vocabulary};

use crate::notify::{fire, NotifyEvent};
use crate::MissionLinks;

/// Detection half of a scanner: camera, detector and the local seen-set.
pub(super) struct Spotter {
    pub(super) id: AgentId,
    pub(super) camera: Box<dyn Camera>,
    pub(super) detector: Box<dyn MarkerDetector>,
    pub(super) vocabulary: Vocabulary,
    pub(super) localizer: Localizer,
    pub(super) links: MissionLinks,
    /// Keys this agent has localized, whether or not it won the publish.
    pub(super) seen: HashSet<String>,
    pub(super) published: Vec<String>,
}

impl Spotter {
    pub(super) fn found(&self) -> usize {
        self.seen.len()
    }

    /// One camera read; `true` once the stream delivers a frame.
    pub(super) fn camera_ready(&mut self) -> bool {
        match self.camera.frame() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(err) => {
                debug!("{}: camera not ready: {err}", self.id);
                false
            }
        }
    }

    /// Read one frame and publish every new task in it.
    ///
    /// `pose` is used when the frame does not carry its own capture pose.
    pub(super) fn scan(&mut self, pose: Pose) {
        let frame = match self.camera.frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(err) => {
                debug!("{}: skipping frame: {err}", self.id);
                return;
            }
        };
        let pose = frame.pose.unwrap_or(pose);
        let center = frame.center();

        for detection in self.detector.detect(&frame) {
            let Some(key) = self.vocabulary.recognize(&detection.payload) else {
                continue;
            };
            if self.seen.contains(&key) {
                continue;
            }
            let Some(position) = self.localizer.locate(&detection, center, pose) else {
                debug!("{}: cannot localize {key}", self.id);
                continue;
            };
            self.seen.insert(key.clone());

            let task = Task::new(key.clone(), position, self.id.clone());
            if !self.links.queue.publish(task.clone()) {
                debug!("{}: {key} already published", self.id);
                continue;
            }
            info!(
                "{}: found {key} at ({:.2}, {:.2}) [{} queued]",
                self.id,
                position.x,
                position.y,
                self.links.queue.len()
            );
            if let Err(err) = self.links.recorder.record(&task) {
                warn!("{}: task record for {key} not written: {err}", self.id);
            }
            fire(
                self.links.notifier.as_ref(),
                NotifyEvent::ObjectDetected {
                    agent: self.id.clone(),
                    key: key.clone(),
                },
            );
            self.published.push(key);
        }
    }
}
