//! Shared detection state: the latest results and status of whichever engine
//! is currently active.
//!
//! [`DetectionState`] is the single source of truth that consumers read every
//! tick.  It is owned by the [`GestureProvider`](super::GestureProvider) and
//! lent mutably to exactly one engine at a time, so there is never more than
//! one writer per tick.

use serde::Serialize;

use crate::hand::{DetectionMode, DetectionStatus, FailureReason, GestureResult};

// ---------------------------------------------------------------------------
// DetectionState
// ---------------------------------------------------------------------------

/// Latest detection status and per-hand results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionState {
    /// Current running status.
    pub status: DetectionStatus,

    /// Result granularity negotiated by the last successful start.
    ///
    /// Only meaningful while `status` is `Starting` or `Running`.
    pub mode: DetectionMode,

    /// Detailed failure when `status == Error`.
    ///
    /// Not cleared by [`clear`](Self::clear); a successful start resets it.
    pub failure: FailureReason,

    /// Left hand of the latest accepted frame, `None` if not detected.
    pub left: Option<GestureResult>,

    /// Right hand of the latest accepted frame, `None` if not detected.
    pub right: Option<GestureResult>,

    /// `true` when `left` / `right` were replaced during the current tick.
    pub updated_this_frame: bool,
}

impl DetectionState {
    /// Create a state in `NotStarted` with the given requested mode.
    pub fn new(mode: DetectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Reset status, hands and the update flag.
    ///
    /// Called whenever detection starts or stops so results from a previous
    /// engine or run can never leak into the next one.
    pub fn clear(&mut self) {
        self.status = DetectionStatus::NotStarted;
        self.left = None;
        self.right = None;
        self.updated_this_frame = false;
    }

    /// Enter `Error` with `reason`.
    ///
    /// Hands are left untouched so the caller can inspect them at the failure
    /// instant.
    pub fn fail(&mut self, reason: FailureReason) {
        debug_assert!(reason != FailureReason::None, "failure reason must be set");
        self.status = DetectionStatus::Error;
        self.failure = reason;
    }

    /// Replace both hands with a freshly accepted frame.
    pub fn publish(&mut self, left: Option<GestureResult>, right: Option<GestureResult>) {
        self.left = left;
        self.right = right;
        self.updated_this_frame = true;
    }

    pub fn is_error(&self) -> bool {
        self.status == DetectionStatus::Error
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
