//! Gesture debouncing.
//!
//! Raw per-frame gestures flicker: a classifier will happily report
//! `Fist, Fist, Unknown, Fist` for a hand that never moved.  A
//! [`HandStateChecker`] turns that stream into a stable three-level state
//! with match/miss hysteresis and notifies subscribers when it changes.
//!
//! ```text
//! DetectionState ──▶ HandFlags (left, right) ──▶ HandStateChecker ──▶ broadcast<HandStateEvent>
//! ```

pub mod flags;
pub mod machine;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use flags::{HandFlags, ParseFlagsError};
pub use machine::{HandState, HandStateChecker, HandStateEvent};
