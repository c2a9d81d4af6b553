//! Core engine trait and the cooperative task model.
//!
//! # Overview
//!
//! [`HandEngine`] is the capability every backend implements.  It is
//! object-safe and `Send` so the provider can hold an ordered
//! `Vec<Box<dyn HandEngine>>` of candidates.
//!
//! Setup and start may take several ticks (waiting on a permission dialog, a
//! runtime service warming up, or a retry back-off).  Instead of blocking they
//! are written as resumable step functions: the provider calls them once per
//! tick until they return something other than [`TaskState::Pending`].  The
//! first call begins the task; [`HandEngine::stop`] abandons it.
//!
//! [`MockEngine`] (available under `#[cfg(test)]`) is a scripted engine for
//! testing the provider without any native layer.

use std::time::Instant;

use crate::hand::{GestureOption, Pose};
use crate::provider::DetectionState;

// ---------------------------------------------------------------------------
// TaskState
// ---------------------------------------------------------------------------

/// Progress of a multi-tick setup or start sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not finished; call again next tick.
    Pending,
    /// Finished successfully.
    Done,
    /// Finished and left the shared state in `Error`.
    Failed,
}

impl TaskState {
    pub fn is_pending(self) -> bool {
        self == TaskState::Pending
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Per-frame input from the host runtime.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Host clock at the start of this frame.  Retry back-offs are measured
    /// against it, never against the wall clock.
    pub now: Instant,
    /// Current viewer (camera) pose in rig space.
    pub viewer: Pose,
    /// Pose of the rig the viewer is parented to, if any.  Engines that
    /// report hands in tracking space use it to move joints into world space.
    pub rig: Option<Pose>,
}

impl Tick {
    /// A tick at `now` with an identity viewer and no rig.
    pub fn at(now: Instant) -> Self {
        Self {
            now,
            viewer: Pose::identity(),
            rig: None,
        }
    }

    pub fn with_viewer(mut self, viewer: Pose) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_rig(mut self, rig: Pose) -> Self {
        self.rig = Some(rig);
        self
    }
}

// ---------------------------------------------------------------------------
// HandEngine trait
// ---------------------------------------------------------------------------

/// One hand tracking backend.
///
/// # Contract
///
/// - `is_supported` is a pure, non-blocking capability check.  `false` is
///   not an error; the provider simply skips the engine.
/// - `setup` / `start` report failure by calling
///   [`DetectionState::fail`] and returning [`TaskState::Failed`].
/// - `start` sets `Starting` and the negotiated mode on success.
/// - `update` must skip frames whose sequence index is not newer than the
///   last accepted one, and must replace both hands wholesale when it
///   accepts a frame.
/// - `stop` is idempotent and safe to call on an engine that never started.
pub trait HandEngine: Send {
    /// Short display name, e.g. `"CameraEngine"`.
    fn name(&self) -> &'static str;

    /// Human-readable label for diagnostics.
    fn description(&self) -> &'static str;

    fn is_supported(&self) -> bool;

    /// Advance one-time initialisation by one tick.
    fn setup(&mut self, state: &mut DetectionState, tick: &Tick) -> TaskState;

    /// Advance the start sequence by one tick.
    fn start(
        &mut self,
        option: &GestureOption,
        state: &mut DetectionState,
        tick: &Tick,
    ) -> TaskState;

    /// Poll for a new result frame.  Called once per tick while active.
    fn update(&mut self, state: &mut DetectionState, tick: &Tick);

    /// Release native resources and abandon any in-flight task.
    fn stop(&mut self);
}

// Compile-time assertion: Box<dyn HandEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn HandEngine>) {}
};

// ---------------------------------------------------------------------------
// MockEngine  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{CallLog, MockEngine, MockFrame};

#[cfg(test)]
mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::hand::{DetectionMode, DetectionStatus, FailureReason, GestureResult, GestureType};

    /// Shared record of the calls made on one or more mock engines, in order.
    pub type CallLog = Arc<Mutex<Vec<String>>>;

    /// One scripted poll result.
    #[derive(Debug, Clone)]
    pub enum MockFrame {
        /// A frame with the given sequence index and gestures.
        Hands {
            index: i64,
            left: Option<GestureType>,
            right: Option<GestureType>,
        },
        /// A poll hard-failure.
        Fail,
    }

    impl MockFrame {
        pub fn left(index: i64, gesture: GestureType) -> Self {
            MockFrame::Hands { index, left: Some(gesture), right: None }
        }

        pub fn both(index: i64, left: GestureType, right: GestureType) -> Self {
            MockFrame::Hands { index, left: Some(left), right: Some(right) }
        }

        pub fn empty(index: i64) -> Self {
            MockFrame::Hands { index, left: None, right: None }
        }
    }

    /// Scripted engine.  Every trait call is appended to the shared
    /// [`CallLog`] as `"<name>.<method>"`.
    pub struct MockEngine {
        name: &'static str,
        supported: bool,
        setup_ok: bool,
        setup_ticks: u32,
        setup_waited: Option<u32>,
        start_results: VecDeque<bool>,
        start_mode: DetectionMode,
        frames: VecDeque<MockFrame>,
        last_index: i64,
        calls: CallLog,
    }

    impl MockEngine {
        /// An engine that is supported, sets up and starts successfully, and
        /// never produces frames.
        pub fn new(name: &'static str, calls: &CallLog) -> Self {
            Self {
                name,
                supported: true,
                setup_ok: true,
                setup_ticks: 0,
                setup_waited: None,
                start_results: VecDeque::new(),
                start_mode: DetectionMode::Skeleton,
                frames: VecDeque::new(),
                last_index: -1,
                calls: Arc::clone(calls),
            }
        }

        pub fn unsupported(mut self) -> Self {
            self.supported = false;
            self
        }

        pub fn failing_setup(mut self) -> Self {
            self.setup_ok = false;
            self
        }

        /// Setup stays pending for `ticks` extra ticks.
        pub fn setup_ticks(mut self, ticks: u32) -> Self {
            self.setup_ticks = ticks;
            self
        }

        /// Outcomes of successive start calls; once exhausted starts succeed.
        pub fn start_results(mut self, results: impl IntoIterator<Item = bool>) -> Self {
            self.start_results = results.into_iter().collect();
            self
        }

        pub fn failing_start(self) -> Self {
            self.start_results([false])
        }

        pub fn negotiates(mut self, mode: DetectionMode) -> Self {
            self.start_mode = mode;
            self
        }

        pub fn frames(mut self, frames: impl IntoIterator<Item = MockFrame>) -> Self {
            self.frames = frames.into_iter().collect();
            self
        }

        fn record(&self, method: &str) {
            self.calls.lock().unwrap().push(format!("{}.{}", self.name, method));
        }

        fn hand(is_left: bool, gesture: Option<GestureType>) -> Option<GestureResult> {
            gesture.map(|g| {
                let mut r = GestureResult::new(is_left);
                r.gesture = g;
                r.confidence = 1.0;
                r
            })
        }
    }

    impl HandEngine for MockEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "scripted test engine"
        }

        fn is_supported(&self) -> bool {
            self.record("is_supported");
            self.supported
        }

        fn setup(&mut self, state: &mut DetectionState, _tick: &Tick) -> TaskState {
            self.record("setup");
            let waited = self.setup_waited.get_or_insert(0);
            if *waited < self.setup_ticks {
                *waited += 1;
                return TaskState::Pending;
            }
            self.setup_waited = None;
            if self.setup_ok {
                TaskState::Done
            } else {
                state.fail(FailureReason::PermissionDenied);
                TaskState::Failed
            }
        }

        fn start(
            &mut self,
            _option: &GestureOption,
            state: &mut DetectionState,
            _tick: &Tick,
        ) -> TaskState {
            self.record("start");
            if self.start_results.pop_front().unwrap_or(true) {
                state.mode = self.start_mode;
                state.status = DetectionStatus::Starting;
                TaskState::Done
            } else {
                state.fail(FailureReason::Camera);
                TaskState::Failed
            }
        }

        fn update(&mut self, state: &mut DetectionState, _tick: &Tick) {
            self.record("update");
            match self.frames.pop_front() {
                None => {}
                Some(MockFrame::Fail) => state.fail(FailureReason::Internal),
                Some(MockFrame::Hands { index, left, right }) => {
                    if index <= self.last_index {
                        return;
                    }
                    self.last_index = index;
                    state.publish(Self::hand(true, left), Self::hand(false, right));
                }
            }
        }

        fn stop(&mut self) {
            self.record("stop");
            self.last_index = -1;
            self.setup_waited = None;
        }
    }
}
