//! Errors raised by native tracking capabilities and the engines that wrap
//! them.
//!
//! Engines never propagate these to consumers: they are translated into
//! [`DetectionStatus::Error`](crate::hand::DetectionStatus) plus a
//! [`FailureReason`] and logged.

use thiserror::Error;

use crate::hand::FailureReason;

// ---------------------------------------------------------------------------
// TrackingError
// ---------------------------------------------------------------------------

/// All errors that can arise while probing, starting or polling an engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// The platform or SDK does not provide this capability.
    #[error("hand tracking not supported: {0}")]
    Unsupported(String),

    /// Camera permission was refused.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The camera is held by another client or not ready yet.  Retryable.
    #[error("camera busy")]
    DeviceBusy,

    /// The native layer returned an invalid result handle.
    #[error("result poll failed (index {0})")]
    PollFailure(i64),

    /// Any other native failure.
    #[error("internal tracking error: {0}")]
    Internal(String),

    /// Every configured engine failed to set up or start.
    #[error("no suitable hand tracking engine found")]
    NoViableEngine,
}

impl TrackingError {
    /// `true` when the start attempt may succeed if retried after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackingError::DeviceBusy)
    }
}

impl From<&TrackingError> for FailureReason {
    fn from(err: &TrackingError) -> Self {
        match err {
            TrackingError::Unsupported(_) | TrackingError::NoViableEngine => {
                FailureReason::Unsupported
            }
            TrackingError::PermissionDenied => FailureReason::PermissionDenied,
            TrackingError::DeviceBusy => FailureReason::Camera,
            TrackingError::PollFailure(_) | TrackingError::Internal(_) => FailureReason::Internal,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
