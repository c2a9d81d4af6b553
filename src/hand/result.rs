//! Detection result types shared by every engine and consumer.
//!
//! These are the vendor-independent shapes that engines translate native
//! results into.  Consumers only ever see these types, never the native
//! structures behind them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::math::{distance, Vec3};

// ---------------------------------------------------------------------------
// DetectionStatus
// ---------------------------------------------------------------------------

/// Running status of gesture detection.
///
/// ```text
/// NotStarted ──start ok──▶ Starting ──first frame──▶ Running
///                 │                                     │
///                 └──────────────▶ Error ◀──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionStatus {
    /// Detection has not been started, or was stopped.
    #[default]
    NotStarted,
    /// Detection was started but no result frame has arrived yet.
    Starting,
    /// At least one result frame has been received.
    Running,
    /// Detection failed; see [`FailureReason`].
    Error,
}

impl DetectionStatus {
    /// `true` for `Starting` and `Running`.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// DetectionMode
// ---------------------------------------------------------------------------

/// Granularity of the results an engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionMode {
    /// Gesture plus a single 2D point per hand.
    Point2D,
    /// Gesture plus a single 3D point per hand.
    Point3D,
    /// Gesture plus the full 21-joint skeleton.
    #[default]
    Skeleton,
}

impl DetectionMode {
    pub fn has_skeleton(self) -> bool {
        self == Self::Skeleton
    }
}

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Why detection entered [`DetectionStatus::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureReason {
    #[default]
    None,
    /// The platform or runtime does not support this kind of tracking.
    Unsupported,
    /// The user (or platform) refused camera access.
    PermissionDenied,
    /// The camera could not be opened.
    Camera,
    /// Detection stopped unexpectedly inside the native layer.
    Internal,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Unsupported => "unsupported",
            Self::PermissionDenied => "permission denied",
            Self::Camera => "camera unavailable",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// GestureType
// ---------------------------------------------------------------------------

/// Classified static hand gesture.
///
/// The discriminants are stable: the debounce checker derives its bit flags
/// from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum GestureType {
    #[default]
    Unknown = 0,
    /// Index finger extended.
    Point = 1,
    Fist = 2,
    /// Thumb and index forming a ring.
    Ok = 3,
    /// Thumb up.
    Like = 4,
    /// Open palm.
    Five = 5,
    Victory = 6,
}

impl GestureType {
    pub const ALL: [GestureType; 7] = [
        Self::Unknown,
        Self::Point,
        Self::Fist,
        Self::Ok,
        Self::Like,
        Self::Five,
        Self::Victory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Point => "point",
            Self::Fist => "fist",
            Self::Ok => "ok",
            Self::Like => "like",
            Self::Five => "five",
            Self::Victory => "victory",
        }
    }
}

// ---------------------------------------------------------------------------
// GestureOption
// ---------------------------------------------------------------------------

/// Start request passed to an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureOption {
    /// Requested result granularity.  The engine may negotiate a different one.
    pub mode: DetectionMode,
    /// Upper bound on detection frame rate; `None` lets the engine decide.
    pub max_fps: Option<u32>,
}

impl Default for GestureOption {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Skeleton,
            max_fps: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Skeleton layout
// ---------------------------------------------------------------------------

/// Number of joints in the canonical skeleton.
pub const JOINT_COUNT: usize = 21;

/// Index of the wrist joint.
pub const WRIST: usize = 0;
/// Index of the thumb tip.
pub const THUMB_TIP: usize = 4;
/// Index of the index-finger tip.
pub const INDEX_TIP: usize = 8;

/// First joint index of each finger (thumb, index, middle, ring, pinky).
/// Each finger owns four consecutive joints ending at its tip.
pub const FINGER_BASES: [usize; 5] = [1, 5, 9, 13, 17];

// ---------------------------------------------------------------------------
// PinchInfo
// ---------------------------------------------------------------------------

/// Thumb–index distance (metres) at and above which pinch level is 0.
const PINCH_RELEASE_DISTANCE: f32 = 0.0425;
/// Distance range over which the level ramps from 0 to 1.
const PINCH_RAMP: f32 = 0.025;
/// Level at which a hand counts as pinching.
pub const PINCH_THRESHOLD: f32 = 0.7;

/// Pinch strength derived from the thumb and index tips.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PinchInfo {
    /// Pinch strength in `[0, 1]`.
    pub level: f32,
    pub is_pinching: bool,
}

impl PinchInfo {
    /// Build from a raw level, clamping into `[0, 1]`.
    pub fn from_level(level: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            level,
            is_pinching: level >= PINCH_THRESHOLD,
        }
    }

    /// Compute the pinch level from the thumb-tip to index-tip distance.
    ///
    /// ```
    /// use hand_tracking::hand::PinchInfo;
    ///
    /// assert_eq!(PinchInfo::from_distance(0.05).level, 0.0);   // dead zone
    /// assert_eq!(PinchInfo::from_distance(0.01).level, 1.0);   // saturated
    /// assert!(PinchInfo::from_distance(0.015).is_pinching);
    /// ```
    pub fn from_distance(distance: f32) -> Self {
        Self::from_level((PINCH_RELEASE_DISTANCE - distance) / PINCH_RAMP)
    }

    /// Compute the pinch from a full skeleton.
    pub fn from_points(points: &[Vec3; JOINT_COUNT]) -> Self {
        Self::from_distance(distance(points[THUMB_TIP], points[INDEX_TIP]))
    }
}

// ---------------------------------------------------------------------------
// GestureResult
// ---------------------------------------------------------------------------

/// Detection result for one hand in one frame.
///
/// Replaced wholesale on every accepted frame; never mutated in place once
/// published in the shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureResult {
    pub is_left: bool,
    pub gesture: GestureType,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
    /// Joint positions in the canonical layout.  In non-skeleton modes only
    /// the wrist entry is meaningful.
    pub points: [Vec3; JOINT_COUNT],
    pub pinch: PinchInfo,
}

impl GestureResult {
    /// Empty result for the given hand (all joints at the origin).
    pub fn new(is_left: bool) -> Self {
        Self {
            is_left,
            gesture: GestureType::Unknown,
            confidence: 0.0,
            points: [Vec3::zeros(); JOINT_COUNT],
            pinch: PinchInfo::default(),
        }
    }

    /// Position of the hand (the wrist joint).
    pub fn position(&self) -> Vec3 {
        self.points[WRIST]
    }

    pub fn handedness(&self) -> &'static str {
        if self.is_left {
            "left"
        } else {
            "right"
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
