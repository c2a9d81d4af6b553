//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per subsystem,
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CameraConfig, EngineKind, HandStateConfig, PermissionRetry, ProviderConfig,
    ResetCondition, RuntimeConfig, SimulationConfig, StateCondition, MAX_MATCH_FRAMES,
    MAX_MISSING_FRAMES, MAX_TICK_HZ,
};
