//! Camera-based gesture engine.
//!
//! [`CameraEngine`] drives a native gesture-detection SDK that runs its own
//! camera pipeline and model.  The SDK is reached through the [`GestureApi`]
//! trait; camera access is negotiated through an optional
//! [`PermissionRequester`].
//!
//! # Sequences
//!
//! ```text
//! setup:  wait permission service ─▶ request ─▶ (denied? re-request | fail)
//!         ─▶ use_external_transform(true)
//!
//! start:  start_detection ─┬─ Ok(mode)        ─▶ Starting
//!                          ├─ DeviceBusy      ─▶ wait retry_delay, retry (bounded)
//!                          └─ other / last try ─▶ Error
//!
//! update: set_camera_transform ─▶ poll_result ─┬─ no frame yet  ─▶ wait
//!                                              ├─ index < 0     ─▶ Error(Internal)
//!                                              ├─ index <= last ─▶ ignore (stale)
//!                                              └─ newer         ─▶ publish hands
//! ```

use std::time::{Duration, Instant};

use crate::config::{CameraConfig, PermissionRetry};
use crate::engine::base::{HandEngine, TaskState, Tick};
use crate::engine::error::TrackingError;
use crate::hand::{
    DetectionMode, DetectionStatus, FailureReason, GestureOption, GestureResult, GestureType,
    PinchInfo, Pose, Vec3, JOINT_COUNT,
};
use crate::provider::DetectionState;

// ---------------------------------------------------------------------------
// Native capability
// ---------------------------------------------------------------------------

/// One hand as reported by the native SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHand {
    pub is_left: bool,
    pub gesture: GestureType,
    pub confidence: f32,
    pub points: [Vec3; JOINT_COUNT],
    /// Pinch strength as computed by the SDK, nominally in `[0, 1]`.
    pub pinch_level: f32,
}

impl RawHand {
    fn into_result(self) -> GestureResult {
        GestureResult {
            is_left: self.is_left,
            gesture: self.gesture,
            confidence: self.confidence.clamp(0.0, 1.0),
            points: self.points,
            pinch: PinchInfo::from_level(self.pinch_level),
        }
    }
}

/// Result of one native poll.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Monotonic sequence index of the frame.  A negative value means the
    /// native pipeline has stopped.  Polling between deliveries returns the
    /// previous index again.
    pub index: i64,
    /// Zero, one or two hands.
    pub hands: Vec<RawHand>,
}

/// Binding to a native gesture-detection SDK.
pub trait GestureApi: Send {
    /// Start detection; returns the mode the SDK actually runs in.
    fn start_detection(&mut self, option: &GestureOption) -> Result<DetectionMode, TrackingError>;

    /// Stop detection.  Must be safe to call when not started.
    fn stop_detection(&mut self);

    /// Tell the SDK that the viewer pose is supplied by the host every frame.
    fn use_external_transform(&mut self, enabled: bool);

    /// Push the current viewer pose.
    fn set_camera_transform(&mut self, viewer: &Pose);

    /// Fetch the most recent result frame, or `None` while the pipeline has
    /// not produced one since detection started.
    fn poll_result(&mut self) -> Option<RawFrame>;
}

/// Platform camera-permission service.
pub trait PermissionRequester: Send {
    /// `false` while the platform service is still coming up.
    fn is_initialized(&self) -> bool;

    fn is_granted(&self) -> bool;

    /// Show the permission dialog.  Completion is reported by
    /// [`poll_request`](Self::poll_request).
    fn request(&mut self);

    /// `None` while the dialog is open, `Some(granted)` once it completed.
    fn poll_request(&mut self) -> Option<bool>;
}

// ---------------------------------------------------------------------------
// Task phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum SetupPhase {
    Idle,
    WaitService,
    Requesting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StartPhase {
    Idle,
    Backoff { remaining: u32, until: Instant },
}

// ---------------------------------------------------------------------------
// CameraEngine
// ---------------------------------------------------------------------------

/// Default detection engine backed by a native camera gesture SDK.
pub struct CameraEngine {
    api: Box<dyn GestureApi>,
    permissions: Option<Box<dyn PermissionRequester>>,
    permission_retry: PermissionRetry,
    start_attempts: u32,
    retry_delay: Duration,
    last_index: i64,
    setup_phase: SetupPhase,
    start_phase: StartPhase,
}

impl std::fmt::Debug for CameraEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraEngine")
            .field("start_attempts", &self.start_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("last_index", &self.last_index)
            .finish_non_exhaustive()
    }
}

impl CameraEngine {
    /// Build an engine around `api` using the retry policy from `config`.
    pub fn from_config(api: Box<dyn GestureApi>, config: &CameraConfig) -> Self {
        Self {
            api,
            permissions: None,
            permission_retry: config.permission_retry,
            start_attempts: config.start_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            last_index: -1,
            setup_phase: SetupPhase::Idle,
            start_phase: StartPhase::Idle,
        }
    }

    /// Require camera permission from `requester` during setup.
    pub fn with_permissions(mut self, requester: Box<dyn PermissionRequester>) -> Self {
        self.permissions = Some(requester);
        self
    }

    /// Sequence index of the last accepted frame, `-1` before the first.
    pub fn last_index(&self) -> i64 {
        self.last_index
    }

    /// Permission part of setup.  `Done` once granted (or no requester).
    fn step_permission(&mut self, state: &mut DetectionState) -> TaskState {
        let Some(perm) = self.permissions.as_mut() else {
            return TaskState::Done;
        };

        loop {
            match self.setup_phase {
                SetupPhase::Idle | SetupPhase::WaitService => {
                    if !perm.is_initialized() {
                        self.setup_phase = SetupPhase::WaitService;
                        return TaskState::Pending;
                    }
                    if perm.is_granted() {
                        return TaskState::Done;
                    }
                    log::info!("camera: requesting camera permission");
                    perm.request();
                    self.setup_phase = SetupPhase::Requesting;
                }
                SetupPhase::Requesting => match perm.poll_request() {
                    None => return TaskState::Pending,
                    Some(true) => return TaskState::Done,
                    Some(false) => match self.permission_retry {
                        PermissionRetry::Indefinite => {
                            log::warn!("camera: permission denied, asking again");
                            perm.request();
                            return TaskState::Pending;
                        }
                        PermissionRetry::Once => {
                            log::error!("camera: {}", TrackingError::PermissionDenied);
                            state.fail(FailureReason::PermissionDenied);
                            return TaskState::Failed;
                        }
                    },
                },
            }
        }
    }
}

impl HandEngine for CameraEngine {
    fn name(&self) -> &'static str {
        "CameraEngine"
    }

    fn description(&self) -> &'static str {
        "Default detection engine"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn setup(&mut self, state: &mut DetectionState, _tick: &Tick) -> TaskState {
        if self.setup_phase == SetupPhase::Idle {
            self.last_index = -1;
        }

        let result = self.step_permission(state);
        if !result.is_pending() {
            self.setup_phase = SetupPhase::Idle;
        }
        if result == TaskState::Done {
            self.api.use_external_transform(true);
        }
        result
    }

    fn start(
        &mut self,
        option: &GestureOption,
        state: &mut DetectionState,
        tick: &Tick,
    ) -> TaskState {
        let remaining = match self.start_phase {
            StartPhase::Idle => self.start_attempts,
            StartPhase::Backoff { remaining, until } => {
                if tick.now < until {
                    return TaskState::Pending;
                }
                remaining
            }
        };

        match self.api.start_detection(option) {
            Ok(mode) => {
                self.start_phase = StartPhase::Idle;
                state.mode = mode;
                state.status = DetectionStatus::Starting;
                log::debug!("camera: detection starting in {mode:?} mode");
                TaskState::Done
            }
            Err(e) if e.is_retryable() && remaining > 1 => {
                log::error!("camera: start camera failed ({e}), retrying...");
                self.start_phase = StartPhase::Backoff {
                    remaining: remaining - 1,
                    until: tick.now + self.retry_delay,
                };
                TaskState::Pending
            }
            Err(e) => {
                log::error!("camera: start gesture detection failed: {e}");
                self.start_phase = StartPhase::Idle;
                state.fail(FailureReason::from(&e));
                TaskState::Failed
            }
        }
    }

    fn update(&mut self, state: &mut DetectionState, tick: &Tick) {
        self.api.set_camera_transform(&tick.viewer);

        let Some(frame) = self.api.poll_result() else {
            log::trace!("camera: no frame yet");
            return;
        };
        if frame.index < 0 {
            log::error!("camera: {}", TrackingError::PollFailure(frame.index));
            state.fail(FailureReason::Internal);
            return;
        }
        if frame.index <= self.last_index {
            log::trace!("camera: frame {} already seen", frame.index);
            return;
        }
        self.last_index = frame.index;

        let mut left = None;
        let mut right = None;
        for hand in frame.hands {
            let result = hand.into_result();
            if result.is_left {
                left = Some(result);
            } else {
                right = Some(result);
            }
        }
        state.publish(left, right);
    }

    fn stop(&mut self) {
        self.api.stop_detection();
        self.last_index = -1;
        self.setup_phase = SetupPhase::Idle;
        self.start_phase = StartPhase::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
