//! Skeleton engine backed by a platform hand-tracking runtime.
//!
//! Some headsets ship hand tracking as a system service with two halves: a
//! static-gesture classifier and a joint tracker.  [`SkeletonEngine`] enables
//! both through the [`HandRuntime`] trait, waits for them to come up, then
//! converts the runtime's per-finger joints into the canonical 21-joint
//! layout every tick.
//!
//! The engine is only supported when a runtime is bound; an unbound engine
//! is still listed in the candidate order so configuration stays portable
//! across devices.

use crate::engine::base::{HandEngine, TaskState, Tick};
use crate::engine::error::TrackingError;
use crate::hand::{
    DetectionMode, DetectionStatus, FailureReason, GestureOption, GestureResult, GestureType,
    transform_joint, PinchInfo, Pose, Vec3, FINGER_BASES, WRIST,
};
use crate::provider::DetectionState;

// ---------------------------------------------------------------------------
// Runtime capability
// ---------------------------------------------------------------------------

/// Status of one runtime service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Unsupported,
    NotStarted,
    Starting,
    Available,
    Error,
}

impl ServiceStatus {
    fn is_settling(self) -> bool {
        matches!(self, ServiceStatus::NotStarted | ServiceStatus::Starting)
    }
}

/// Static gesture as classified by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeGesture {
    Invalid,
    Unknown,
    Fist,
    Five,
    Ok,
    ThumbUp,
    IndexUp,
}

impl From<RuntimeGesture> for GestureType {
    fn from(g: RuntimeGesture) -> Self {
        match g {
            RuntimeGesture::Fist => GestureType::Fist,
            RuntimeGesture::Five => GestureType::Five,
            RuntimeGesture::Ok => GestureType::Ok,
            RuntimeGesture::ThumbUp => GestureType::Like,
            RuntimeGesture::IndexUp => GestureType::Point,
            RuntimeGesture::Invalid | RuntimeGesture::Unknown => GestureType::Unknown,
        }
    }
}

/// Joint positions of one finger, base to tip.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FingerJoints {
    pub joint1: Vec3,
    pub joint2: Vec3,
    pub joint3: Vec3,
    pub tip: Vec3,
}

/// Tracking data for one hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeHand {
    pub valid: bool,
    /// Wrist pose.
    pub pose: Pose,
    /// Thumb, index, middle, ring, pinky.
    pub fingers: [FingerJoints; 5],
}

impl Default for RuntimeHand {
    fn default() -> Self {
        Self {
            valid: false,
            pose: Pose::identity(),
            fingers: [FingerJoints::default(); 5],
        }
    }
}

/// One tracking sample for both hands.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackingData {
    /// Monotonic sample timestamp (runtime clock).
    pub timestamp: u64,
    pub left: RuntimeHand,
    pub right: RuntimeHand,
}

/// Binding to a platform hand-tracking runtime.
pub trait HandRuntime: Send {
    fn gesture_status(&self) -> ServiceStatus;
    fn tracking_status(&self) -> ServiceStatus;
    fn set_gesture_enabled(&mut self, enabled: bool);
    fn set_tracking_enabled(&mut self, enabled: bool);
    /// Latest tracking sample; `Err` means tracking has stopped.
    fn tracking_data(&mut self) -> Result<TrackingData, TrackingError>;
    fn static_gesture(&self, left: bool) -> RuntimeGesture;
}

// ---------------------------------------------------------------------------
// SkeletonEngine
// ---------------------------------------------------------------------------

/// Engine for runtimes that provide a joint skeleton natively.
pub struct SkeletonEngine {
    runtime: Option<Box<dyn HandRuntime>>,
    left: GestureResult,
    right: GestureResult,
    waiting_for_services: bool,
    last_timestamp: Option<u64>,
}

impl SkeletonEngine {
    pub fn new(runtime: Box<dyn HandRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::unbound()
        }
    }

    /// An engine with no runtime on this device.  Never supported.
    pub fn unbound() -> Self {
        Self {
            runtime: None,
            left: Self::create_hand(true),
            right: Self::create_hand(false),
            waiting_for_services: false,
            last_timestamp: None,
        }
    }

    fn create_hand(is_left: bool) -> GestureResult {
        let mut hand = GestureResult::new(is_left);
        hand.confidence = 1.0;
        hand
    }

    fn set_enabled(runtime: &mut dyn HandRuntime, enabled: bool) {
        runtime.set_gesture_enabled(enabled);
        runtime.set_tracking_enabled(enabled);
    }

    fn fail(state: &mut DetectionState, err: TrackingError) -> TaskState {
        log::error!("skeleton: {err}");
        state.fail(FailureReason::from(&err));
        TaskState::Failed
    }
}

/// Copy runtime joints into `hand`, compute pinch, then move all points into
/// rig space when the viewer is parented to a rig.
fn fill_points(hand: &mut GestureResult, data: &RuntimeHand, rig: Option<Pose>) {
    hand.points[WRIST] = data.pose.translation.vector;
    for (finger, &base) in data.fingers.iter().zip(FINGER_BASES.iter()) {
        hand.points[base] = finger.joint1;
        hand.points[base + 1] = finger.joint2;
        hand.points[base + 2] = finger.joint3;
        hand.points[base + 3] = finger.tip;
    }

    // pinch is measured in tracking space, before the rig offset
    hand.pinch = PinchInfo::from_points(&hand.points);

    if let Some(rig) = rig {
        for p in hand.points.iter_mut() {
            *p = transform_joint(&rig, *p);
        }
    }
}

impl HandEngine for SkeletonEngine {
    fn name(&self) -> &'static str {
        "SkeletonEngine"
    }

    fn description(&self) -> &'static str {
        if self.runtime.is_some() {
            "[Experimental] Runtime-provided hand skeleton"
        } else {
            "[Experimental] Requires a hand tracking runtime"
        }
    }

    fn is_supported(&self) -> bool {
        self.runtime.is_some()
    }

    fn setup(&mut self, state: &mut DetectionState, _tick: &Tick) -> TaskState {
        let Some(runtime) = self.runtime.as_deref_mut() else {
            return Self::fail(state, TrackingError::Unsupported("no runtime bound".into()));
        };
        Self::set_enabled(runtime, false);
        self.left = Self::create_hand(true);
        self.right = Self::create_hand(false);
        TaskState::Done
    }

    fn start(
        &mut self,
        _option: &GestureOption,
        state: &mut DetectionState,
        _tick: &Tick,
    ) -> TaskState {
        let Some(runtime) = self.runtime.as_deref_mut() else {
            return Self::fail(state, TrackingError::Unsupported("no runtime bound".into()));
        };

        if !self.waiting_for_services {
            if state.status.is_active() {
                return TaskState::Done;
            }
            if runtime.gesture_status() == ServiceStatus::Unsupported {
                return Self::fail(state, TrackingError::Unsupported("runtime gesture".into()));
            }
            if runtime.tracking_status() == ServiceStatus::Unsupported {
                return Self::fail(state, TrackingError::Unsupported("runtime tracking".into()));
            }
            Self::set_enabled(runtime, true);
            self.waiting_for_services = true;
            // services report their new status from the next tick on
            return TaskState::Pending;
        }

        let gesture = runtime.gesture_status();
        let tracking = runtime.tracking_status();
        if gesture.is_settling() || tracking.is_settling() {
            return TaskState::Pending;
        }
        self.waiting_for_services = false;

        if gesture != ServiceStatus::Available || tracking != ServiceStatus::Available {
            Self::set_enabled(runtime, false);
            return Self::fail(
                state,
                TrackingError::Internal(format!(
                    "runtime start failed (gesture {gesture:?}, tracking {tracking:?})"
                )),
            );
        }

        self.last_timestamp = None;
        state.mode = DetectionMode::Skeleton;
        state.status = DetectionStatus::Starting;
        TaskState::Done
    }

    fn update(&mut self, state: &mut DetectionState, tick: &Tick) {
        let Some(runtime) = self.runtime.as_deref_mut() else {
            return;
        };

        let data = match runtime.tracking_data() {
            Ok(data) => data,
            Err(e) => {
                log::error!("skeleton: tracking stopped: {e}");
                state.fail(FailureReason::Internal);
                return;
            }
        };

        if self.last_timestamp.is_some_and(|last| data.timestamp <= last) {
            return;
        }
        self.last_timestamp = Some(data.timestamp);

        let left = if data.left.valid {
            self.left.gesture = runtime.static_gesture(true).into();
            fill_points(&mut self.left, &data.left, tick.rig);
            Some(self.left.clone())
        } else {
            None
        };
        let right = if data.right.valid {
            self.right.gesture = runtime.static_gesture(false).into();
            fill_points(&mut self.right, &data.right, tick.rig);
            Some(self.right.clone())
        } else {
            None
        };
        state.publish(left, right);
    }

    fn stop(&mut self) {
        if let Some(runtime) = self.runtime.as_deref_mut() {
            Self::set_enabled(runtime, false);
        }
        self.waiting_for_services = false;
        self.last_timestamp = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
