//! Two-wave mission barrier: every scanner, then every carrier.

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use log::{error, info, warn};
use markerfleet_agents::{
    Agent, AgentOutcome, CarrierAgent, MissionLinks, MotionController, NotificationSink,
    ScannerAgent, ScannerHardware,
};
use markerfleet_core::{AgentId, AgentRole, CancelToken, MissionPhase, Pose};
use markerfleet_tasks::{TaskQueue, TaskRecorder};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{ConfigError, MissionConfig, MissionReport};

/// Source of per-agent hardware. The simulator implements it; so would a
/// real vehicle link.
pub trait FleetBackend {
    fn scanner_hardware(&self, id: &AgentId, home: Pose) -> ScannerHardware;
    fn carrier_motion(&self, id: &AgentId, home: Pose) -> Box<dyn MotionController>;
}

/// A validated mission ready to run.
pub struct Mission {
    config: MissionConfig,
    links: MissionLinks,
    cancel: CancelToken,
}

impl Mission {
    /// Validate `config` and set up the shared queue. Fails before any agent starts.
    pub fn new(
        config: MissionConfig,
        recorder: Arc<dyn TaskRecorder>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let links = MissionLinks {
            queue: Arc::new(TaskQueue::new()),
            recorder,
            notifier,
            destinations: Arc::new(config.destinations.clone()),
        };
        Ok(Self {
            config,
            links,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.links.queue
    }

    /// Token shared by every agent; cancelling it makes all of them land and stop.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run every scanner to completion, then close the queue.
    pub fn scanner_wave(&self, backend: &dyn FleetBackend) -> Vec<AgentOutcome> {
        let agents = self
            .config
            .scanners
            .iter()
            .map(|sc| {
                Agent::from(ScannerAgent::new(
                    sc.id.clone(),
                    sc.home,
                    self.config.scanner_params(sc),
                    backend.scanner_hardware(&sc.id, sc.home),
                    self.links.clone(),
                    self.cancel.clone(),
                ))
            })
            .collect();
        let outcomes = run_wave("scanner", agents);
        self.links.queue.close();
        outcomes
    }

    /// Run every carrier to completion.
    pub fn carrier_wave(&self, backend: &dyn FleetBackend) -> Vec<AgentOutcome> {
        let agents = self
            .config
            .carriers
            .iter()
            .map(|cc| {
                Agent::from(CarrierAgent::new(
                    cc.id.clone(),
                    cc.home,
                    self.config.carrier_params(cc),
                    backend.carrier_motion(&cc.id, cc.home),
                    self.links.clone(),
                    self.cancel.clone(),
                ))
            })
            .collect();
        run_wave("carrier", agents)
    }

    /// Scanner wave, gate, carrier wave, teardown.
    ///
    /// Consumes the mission: the queue ends closed and the token cancelled,
    /// so another run needs a fresh [`Mission`].
    pub fn run(self, backend: &dyn FleetBackend) -> MissionReport {
        let started_at = Utc::now();
        info!(
            "mission start: {} scanner(s), {} carrier(s)",
            self.config.scanners.len(),
            self.config.carriers.len()
        );

        let scanners = self.scanner_wave(backend);
        let queue = &self.links.queue;
        let launch = !queue.is_empty() || scanners.is_empty();
        info!(
            "scanner wave done: {} task(s) published, {} pending",
            queue.published_count(),
            queue.len()
        );

        let carriers = if launch {
            self.carrier_wave(backend)
        } else {
            info!("no tasks discovered, carriers stay home");
            Vec::new()
        };

        self.cancel.cancel();
        let report = MissionReport {
            started_at,
            finished_at: Utc::now(),
            scanners,
            carriers,
            carrier_wave_launched: launch,
            tasks_published: queue.published_count(),
            tasks_remaining: queue.len(),
        };
        info!(
            "mission finished: {} delivered, {} remaining, {} agent(s) failed",
            report.delivered().count(),
            report.tasks_remaining,
            report.failed().count()
        );
        report
    }
}

impl std::fmt::Debug for Mission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mission")
            .field("scanners", &self.config.scanners.len())
            .field("carriers", &self.config.carriers.len())
            .field("links", &self.links)
            .finish_non_exhaustive()
    }
}

fn lost_outcome(id: AgentId, role: AgentRole, reason: String) -> AgentOutcome {
    AgentOutcome {
        id,
        role,
        group: None,
        phase: MissionPhase::Failed,
        final_pose: Pose::default(),
        published: Vec::new(),
        delivered: Vec::new(),
        abandoned: None,
        failure: Some(reason),
    }
}

/// One named thread per agent; join them all. A panicking agent is
/// reported as failed and never takes the rest of the wave down.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(agents), fields(agents = agents.len()))
)]
fn run_wave(wave: &str, agents: Vec<Agent>) -> Vec<AgentOutcome> {
    if agents.is_empty() {
        return Vec::new();
    }
    info!("{wave} wave: starting {} agent(s)", agents.len());

    let mut handles = Vec::with_capacity(agents.len());
    let mut outcomes = Vec::with_capacity(agents.len());
    for agent in agents {
        let id = agent.id().clone();
        let role = agent.role();
        let spawned = thread::Builder::new()
            .name(id.to_string())
            .spawn(move || agent.run());
        match spawned {
            Ok(handle) => handles.push((id, role, handle)),
            Err(err) => {
                error!("{id}: could not start agent thread: {err}");
                outcomes.push(lost_outcome(id, role, format!("thread spawn failed: {err}")));
            }
        }
    }

    for (id, role, handle) in handles {
        match handle.join() {
            Ok(outcome) => outcomes.push(outcome),
            Err(_) => {
                warn!("{id}: agent thread panicked");
                outcomes.push(lost_outcome(id, role, "agent thread panicked".to_owned()));
            }
        }
    }
    outcomes
}
