//! Hand data model: gesture classification, status enums, and the 21-joint
//! skeleton every engine reports in.
//!
//! # Skeleton layout
//!
//! ```text
//!            tip  4    8   12   16   20
//!                 3    7   11   15   19
//!                 2    6   10   14   18
//!                 1    5    9   13   17
//!              thumb index middle ring pinky
//!                        0 (wrist)
//! ```

pub mod math;
pub mod result;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use math::{distance, pose, transform_joint, Pose, Quat, Vec3};
pub use result::{
    DetectionMode, DetectionStatus, FailureReason, GestureOption, GestureResult, GestureType,
    PinchInfo, FINGER_BASES, INDEX_TIP, JOINT_COUNT, PINCH_THRESHOLD, THUMB_TIP, WRIST,
};
