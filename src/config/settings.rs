//! Application settings structs, defaults and TOML persistence.
//!
//! Every struct implements `Serialize`, `Deserialize`, `Default` and `Clone`
//! and is marked `#[serde(default)]`, so a hand-edited `settings.toml` only
//! needs the keys it wants to change.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::checker::HandFlags;
use crate::hand::{DetectionMode, GestureOption, GestureType};

/// Upper bound for `min_match_frames`.
pub const MAX_MATCH_FRAMES: u32 = 20;
/// Upper bound for `max_missing_frames`.
pub const MAX_MISSING_FRAMES: u32 = 30;
/// Upper bound for the host tick rate.
pub const MAX_TICK_HZ: u32 = 1000;

// ---------------------------------------------------------------------------
// EngineKind
// ---------------------------------------------------------------------------

/// Engine variants that can appear in the candidate list.
///
/// | Variant  | Backend                                          |
/// |----------|--------------------------------------------------|
/// | Camera   | Camera gesture SDK (`CameraEngine`)              |
/// | Skeleton | Platform hand-tracking runtime (`SkeletonEngine`) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    Camera,
    Skeleton,
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Engine selection and lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Candidate engines in priority order.
    pub engines: Vec<EngineKind>,
    /// Restart the active engine when it fails after running for a while.
    pub auto_restart: bool,
    /// Accepted frames required (strictly more than) before a failure is
    /// eligible for automatic restart.
    pub restart_min_frames: u64,
    /// Start request passed to every engine.
    pub option: GestureOption,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            engines: vec![EngineKind::Skeleton, EngineKind::Camera],
            auto_restart: true,
            restart_min_frames: 100,
            option: GestureOption::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// What to do when the user refuses camera permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionRetry {
    /// Ask again until granted.
    #[default]
    Indefinite,
    /// Give up after the first refusal.
    Once,
}

/// Settings for the camera gesture engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Start attempts when the camera reports busy (1 = no retry).
    pub start_attempts: u32,
    /// Delay between start attempts in milliseconds.
    pub retry_delay_ms: u64,
    pub permission_retry: PermissionRetry,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_attempts: 5,
            retry_delay_ms: 500,
            permission_retry: PermissionRetry::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// HandStateConfig  (debounce checkers)
// ---------------------------------------------------------------------------

/// Hands whose absence forces a checker back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetCondition {
    pub left_missing: bool,
    pub right_missing: bool,
}

impl Default for ResetCondition {
    fn default() -> Self {
        Self {
            left_missing: true,
            right_missing: true,
        }
    }
}

/// One debounced condition (prepare or trigger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateCondition {
    /// Flags the left hand must intersect.
    pub left: HandFlags,
    /// Flags the right hand must intersect.
    pub right: HandFlags,
    /// Matching ticks counted down before the transition commits
    /// (0..=20).  The transition fires on match number `min + 1`.
    pub min_match_frames: u32,
    /// Non-matching ticks tolerated after the transition (0..=30).
    pub max_missing_frames: u32,
}

impl Default for StateCondition {
    fn default() -> Self {
        Self {
            left: HandFlags::ANY,
            right: HandFlags::ANY,
            min_match_frames: 4,
            max_missing_frames: 20,
        }
    }
}

/// One named debounce checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandStateConfig {
    pub name: String,
    /// Allow `Idle -> Trigger` without passing through `Prepare`.
    pub can_skip_prepare: bool,
    pub reset: ResetCondition,
    pub prepare: StateCondition,
    pub trigger: StateCondition,
}

impl Default for HandStateConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            reset: ResetCondition::default(),
            prepare: StateCondition::default(),
            trigger: StateCondition::default(),
            can_skip_prepare: false,
        }
    }
}

impl HandStateConfig {
    /// Point with the left hand to arm, close it into a fist to fire.
    pub fn point_fist() -> Self {
        Self {
            name: "point-fist".into(),
            reset: ResetCondition {
                left_missing: true,
                right_missing: false,
            },
            prepare: StateCondition {
                left: HandFlags::POINT,
                ..StateCondition::default()
            },
            trigger: StateCondition {
                left: HandFlags::FIST,
                ..StateCondition::default()
            },
            can_skip_prepare: false,
        }
    }

    /// Open the right hand to arm, pinch to fire.  A pinch from idle fires
    /// directly.
    pub fn right_pinch() -> Self {
        Self {
            name: "right-pinch".into(),
            reset: ResetCondition {
                left_missing: false,
                right_missing: true,
            },
            prepare: StateCondition {
                right: HandFlags::FIVE | HandFlags::UNKNOWN,
                min_match_frames: 2,
                ..StateCondition::default()
            },
            trigger: StateCondition {
                right: HandFlags::PINCH,
                min_match_frames: 1,
                max_missing_frames: 5,
                ..StateCondition::default()
            },
            can_skip_prepare: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SimulationConfig
// ---------------------------------------------------------------------------

/// Parameters of the synthetic gesture source used when no SDK is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Polls per delivered frame.
    pub detection_every_ticks: u32,
    /// Consecutive frames showing the same gesture.
    pub frames_per_gesture: u32,
    /// Gesture cycle shown by both hands.
    pub gestures: Vec<GestureType>,
    /// Stop delivering (poll failure) after this many frames.
    pub fail_after_frames: Option<u64>,
    /// Start attempts rejected as busy before the source starts.
    pub busy_start_attempts: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            detection_every_ticks: 3,
            frames_per_gesture: 20,
            gestures: vec![
                GestureType::Five,
                GestureType::Point,
                GestureType::Fist,
                GestureType::Ok,
            ],
            fail_after_frames: None,
            busy_start_attempts: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Host loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Ticks per second.
    pub tick_hz: u32,
    /// Print a JSON snapshot of the detection state every N ticks (0 = never).
    pub snapshot_every_ticks: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_hz: 90,
            snapshot_every_ticks: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use hand_tracking::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub camera: CameraConfig,
    pub simulation: SimulationConfig,
    pub runtime: RuntimeConfig,
    /// Debounce checkers, evaluated in order every tick.
    pub checkers: Vec<HandStateConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            camera: CameraConfig::default(),
            simulation: SimulationConfig::default(),
            runtime: RuntimeConfig::default(),
            checkers: vec![HandStateConfig::point_fist(), HandStateConfig::right_pinch()],
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }

    /// Reject values the runtime cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.provider.engines.is_empty() {
            bail!("provider.engines must list at least one engine");
        }
        let mut seen = HashSet::new();
        for kind in &self.provider.engines {
            if !seen.insert(kind) {
                bail!("provider.engines lists {kind:?} more than once");
            }
        }
        if self.camera.start_attempts == 0 {
            bail!("camera.start_attempts must be at least 1");
        }
        if !(1..=MAX_TICK_HZ).contains(&self.runtime.tick_hz) {
            bail!(
                "runtime.tick_hz = {} (must be 1..={MAX_TICK_HZ})",
                self.runtime.tick_hz
            );
        }

        let mut names = HashSet::new();
        for checker in &self.checkers {
            if !names.insert(checker.name.as_str()) {
                bail!("checker name `{}` is used more than once", checker.name);
            }
            for (label, cond) in [("prepare", &checker.prepare), ("trigger", &checker.trigger)] {
                if cond.min_match_frames > MAX_MATCH_FRAMES {
                    bail!(
                        "checkers.{}.{label}.min_match_frames = {} (max {MAX_MATCH_FRAMES})",
                        checker.name,
                        cond.min_match_frames
                    );
                }
                if cond.max_missing_frames > MAX_MISSING_FRAMES {
                    bail!(
                        "checkers.{}.{label}.max_missing_frames = {} (max {MAX_MISSING_FRAMES})",
                        checker.name,
                        cond.max_missing_frames
                    );
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
