//! Hand tracking: engine selection and lifecycle over interchangeable native
//! backends, plus gesture debouncing.
//!
//! ```text
//! engine ──▶ provider (DetectionState) ──▶ checker ──▶ HandStateEvent
//! ```

pub mod checker;
pub mod config;
pub mod engine;
pub mod hand;
pub mod provider;
