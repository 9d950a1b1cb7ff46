//! Simulated arena: point-mass vehicles, nadir cameras and a marker oracle.
//!
//! Vehicles teleport to their goto target after a fixed number of arrival
//! polls. Cameras stamp every frame with the vehicle pose, and the detector
//! reports each world marker whose projection lands inside the frame.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use markerfleet_agents::{MotionController, MotionError, ScannerHardware};
use markerfleet_core::{AgentId, Pose};
use markerfleet_vision::{
    Camera, CameraError, Detection, Frame, Localizer, MarkerDetector, MarkerPayload,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::coordinator::FleetBackend;

/// A marker lying on the arena floor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimMarker {
    pub payload: MarkerPayload,
    pub position: Point2<f32>,
}

/// Injected faults for one vehicle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimFault {
    pub agent: AgentId,
    /// Number of leading arm calls that fail with a link error.
    #[serde(default)]
    pub arm_failures: u32,
    /// Every arm call fails with a link error.
    #[serde(default)]
    pub arm_always_fails: bool,
    /// The n-th (1-based) and later goto commands are rejected.
    #[serde(default)]
    pub goto_rejected_from: Option<u32>,
}

fn default_frame_size() -> [usize; 2] {
    [640, 480]
}

fn default_marker_pixels() -> f32 {
    40.0
}

fn default_arrive_after_polls() -> u32 {
    3
}

fn default_takeoff_altitude() -> f32 {
    1.5
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimWorld {
    #[serde(default)]
    pub markers: Vec<SimMarker>,
    #[serde(default = "default_frame_size")]
    pub frame_size: [usize; 2],
    /// Rendered marker side length in pixels.
    #[serde(default = "default_marker_pixels")]
    pub marker_pixels: f32,
    #[serde(default = "default_arrive_after_polls")]
    pub arrive_after_polls: u32,
    #[serde(default = "default_takeoff_altitude")]
    pub takeoff_altitude: f32,
    /// Every n-th frame is unavailable; 0 never drops.
    #[serde(default)]
    pub camera_dropout_every: u32,
    #[serde(default)]
    pub faults: Vec<SimFault>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            frame_size: default_frame_size(),
            marker_pixels: default_marker_pixels(),
            arrive_after_polls: default_arrive_after_polls(),
            takeoff_altitude: default_takeoff_altitude(),
            camera_dropout_every: 0,
            faults: Vec::new(),
        }
    }
}

impl SimWorld {
    pub fn with_marker(mut self, payload: MarkerPayload, position: Point2<f32>) -> Self {
        self.markers.push(SimMarker { payload, position });
        self
    }

    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.faults.push(fault);
        self
    }

    fn fault(&self, id: &AgentId) -> SimFault {
        self.faults
            .iter()
            .find(|f| &f.agent == id)
            .cloned()
            .unwrap_or_default()
    }
}

/// What a simulated vehicle was asked to do.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTelemetry {
    pub arm_calls: u32,
    pub takeoffs: u32,
    pub landings: u32,
    /// Accepted goto targets, in order.
    pub goto_targets: Vec<Pose>,
    pub final_pose: Pose,
}

#[derive(Debug, Default)]
struct Body {
    armed: bool,
    pose: Pose,
    target: Option<Pose>,
    polls: u32,
    telemetry: SimTelemetry,
}

type BodyHandle = Arc<Mutex<Body>>;

fn lock(body: &BodyHandle) -> MutexGuard<'_, Body> {
    body.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SimVehicle {
    body: BodyHandle,
    fault: SimFault,
    arrive_after: u32,
    takeoff_altitude: f32,
    gotos: u32,
}

impl MotionController for SimVehicle {
    fn arm(&mut self) -> Result<(), MotionError> {
        let mut body = lock(&self.body);
        body.telemetry.arm_calls += 1;
        if self.fault.arm_always_fails || body.telemetry.arm_calls <= self.fault.arm_failures {
            return Err(MotionError::Connection("simulated link drop".to_owned()));
        }
        body.armed = true;
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), MotionError> {
        lock(&self.body).armed = false;
        Ok(())
    }

    fn takeoff(&mut self) -> Result<(), MotionError> {
        let mut body = lock(&self.body);
        if !body.armed {
            return Err(MotionError::Command("takeoff while disarmed".to_owned()));
        }
        body.telemetry.takeoffs += 1;
        body.pose.z = self.takeoff_altitude;
        Ok(())
    }

    fn land(&mut self) -> Result<(), MotionError> {
        let mut body = lock(&self.body);
        body.telemetry.landings += 1;
        body.pose.z = 0.0;
        body.target = None;
        Ok(())
    }

    fn goto_pose(&mut self, target: Pose) -> Result<(), MotionError> {
        self.gotos += 1;
        if self.fault.goto_rejected_from.is_some_and(|n| self.gotos >= n) {
            return Err(MotionError::Command("simulated navigation reject".to_owned()));
        }
        let mut body = lock(&self.body);
        body.target = Some(target);
        body.polls = 0;
        body.telemetry.goto_targets.push(target);
        Ok(())
    }

    fn has_arrived(&mut self) -> Result<bool, MotionError> {
        let mut body = lock(&self.body);
        let Some(target) = body.target else {
            return Ok(false);
        };
        body.polls += 1;
        if body.polls < self.arrive_after {
            return Ok(false);
        }
        body.pose = target;
        Ok(true)
    }

    fn current_pose(&mut self) -> Result<Pose, MotionError> {
        Ok(lock(&self.body).pose)
    }
}

/// Nadir camera bolted to a [`SimVehicle`].
pub struct SimCamera {
    body: BodyHandle,
    size: [usize; 2],
    dropout_every: u32,
    frames: u32,
}

impl Camera for SimCamera {
    fn frame(&mut self) -> Result<Option<Frame>, CameraError> {
        self.frames += 1;
        if self.dropout_every > 0 && self.frames % self.dropout_every == 0 {
            return Err(CameraError::Unavailable("simulated dropout".to_owned()));
        }
        let pose = lock(&self.body).pose;
        Ok(Some(Frame::empty(self.size[0], self.size[1]).with_pose(pose)))
    }
}

/// Oracle detector: projects world markers into the frame.
pub struct SimDetector {
    markers: Arc<[SimMarker]>,
    localizer: Localizer,
    marker_pixels: f32,
}

impl MarkerDetector for SimDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        let Some(pose) = frame.pose else {
            return Vec::new();
        };
        let center = frame.center();
        self.markers
            .iter()
            .filter_map(|m| {
                let px = self.localizer.pixel_of(m.position, center, pose)?;
                frame.contains(px).then(|| Detection {
                    payload: m.payload.clone(),
                    polygon: Detection::square_outline(px, self.marker_pixels),
                })
            })
            .collect()
    }
}

/// Builds simulated hardware and keeps a handle on every vehicle it made.
pub struct SimBackend {
    world: SimWorld,
    markers: Arc<[SimMarker]>,
    localizer: Localizer,
    bodies: Mutex<BTreeMap<AgentId, BodyHandle>>,
}

impl SimBackend {
    pub fn new(world: SimWorld, localizer: Localizer) -> Self {
        let markers = Arc::from(world.markers.clone());
        Self {
            world,
            markers,
            localizer,
            bodies: Mutex::new(BTreeMap::new()),
        }
    }

    fn vehicle(&self, id: &AgentId, home: Pose) -> (SimVehicle, BodyHandle) {
        let body = Arc::new(Mutex::new(Body {
            pose: home,
            ..Body::default()
        }));
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::clone(&body));
        let vehicle = SimVehicle {
            body: Arc::clone(&body),
            fault: self.world.fault(id),
            arrive_after: self.world.arrive_after_polls,
            takeoff_altitude: self.world.takeoff_altitude,
            gotos: 0,
        };
        (vehicle, body)
    }

    pub fn telemetry(&self, id: &AgentId) -> Option<SimTelemetry> {
        let bodies = self.bodies.lock().unwrap_or_else(PoisonError::into_inner);
        bodies.get(id).map(|b| {
            let body = lock(b);
            SimTelemetry {
                final_pose: body.pose,
                ..body.telemetry.clone()
            }
        })
    }
}

impl FleetBackend for SimBackend {
    fn scanner_hardware(&self, id: &AgentId, home: Pose) -> ScannerHardware {
        let (vehicle, body) = self.vehicle(id, home);
        ScannerHardware {
            motion: Box::new(vehicle),
            camera: Box::new(SimCamera {
                body,
                size: self.world.frame_size,
                dropout_every: self.world.camera_dropout_every,
                frames: 0,
            }),
            detector: Box::new(SimDetector {
                markers: Arc::clone(&self.markers),
                localizer: self.localizer,
                marker_pixels: self.world.marker_pixels,
            }),
        }
    }

    fn carrier_motion(&self, id: &AgentId, home: Pose) -> Box<dyn MotionController> {
        Box::new(self.vehicle(id, home).0)
    }
}
