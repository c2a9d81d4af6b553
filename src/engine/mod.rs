//! Hand tracking engines.
//!
//! An engine wraps one native tracking capability and translates its results
//! into the shared [`DetectionState`](crate::provider::DetectionState).
//!
//! # Architecture
//!
//! ```text
//! HandEngine (trait, object-safe)
//!    ├─ CameraEngine   ── GestureApi (+ PermissionRequester)
//!    │                       └─ SimulatedGestureApi (synthetic source)
//!    └─ SkeletonEngine ── HandRuntime (platform service, optional)
//! ```
//!
//! Setup and start are resumable step functions returning [`TaskState`];
//! see [`base`] for the contract.

pub mod base;
pub mod camera;
pub mod error;
pub mod simulated;
pub mod skeleton;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use base::{HandEngine, TaskState, Tick};
pub use camera::{CameraEngine, GestureApi, PermissionRequester, RawFrame, RawHand};
pub use error::TrackingError;
pub use simulated::SimulatedGestureApi;
pub use skeleton::{
    FingerJoints, HandRuntime, RuntimeGesture, RuntimeHand, ServiceStatus, SkeletonEngine,
    TrackingData,
};

#[cfg(test)]
pub use base::{CallLog, MockEngine, MockFrame};
