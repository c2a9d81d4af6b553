//! Engine selection, lifecycle and the shared detection state.
//!
//! ```text
//! host tick ──▶ GestureProvider ──▶ active HandEngine::update ──▶ DetectionState
//!                                                                     │
//!                       consumers (accessors, HandStateChecker) ◀─────┘
//! ```
//!
//! The provider is the only owner of [`DetectionState`]; it lends it to one
//! engine at a time and exposes read-only accessors to everyone else.

pub mod runner;
pub mod state;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use runner::GestureProvider;
pub use state::DetectionState;
