//! 3D types for joint positions and viewer poses, backed by `nalgebra`.
//!
//! Joints are plain vectors in metres (x right, y up, z forward).  Poses are
//! rigid transforms: rotation followed by translation.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// Joint position in metres.
pub type Vec3 = Vector3<f32>;

/// Unit rotation.
pub type Quat = UnitQuaternion<f32>;

/// Rigid transform from a local space into its parent space.
pub type Pose = Isometry3<f32>;

/// Build a pose from a position and a rotation.
pub fn pose(position: Vec3, rotation: Quat) -> Pose {
    Isometry3::from_parts(Translation3::from(position), rotation)
}

/// Map a joint from `pose`'s local space into its parent space.
pub fn transform_joint(pose: &Pose, joint: Vec3) -> Vec3 {
    pose.transform_point(&Point3::from(joint)).coords
}

/// Euclidean distance between two joints.
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    (a - b).norm()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: Vec3, b: Vec3) -> bool {
        distance(a, b) < 1e-5
    }

    #[test]
    fn distance_is_euclidean() {
        let d = distance(Vec3::zeros(), Vec3::new(3.0, 4.0, 0.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn identity_pose_is_noop() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(approx(transform_joint(&Pose::identity(), v), v));
    }

    #[test]
    fn quarter_turn_around_y_maps_x_to_minus_z() {
        let p = pose(Vec3::zeros(), Quat::from_axis_angle(&Vec3::y_axis(), FRAC_PI_2));
        let rotated = transform_joint(&p, Vec3::new(1.0, 0.0, 0.0));
        assert!(approx(rotated, Vec3::new(0.0, 0.0, -1.0)), "got {rotated:?}");
    }

    #[test]
    fn pose_rotates_then_translates() {
        let p = pose(
            Vec3::new(0.0, 1.5, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), PI),
        );
        let moved = transform_joint(&p, Vec3::new(0.0, 0.0, 1.0));
        assert!(approx(moved, Vec3::new(0.0, 1.5, -1.0)), "got {moved:?}");
    }
}
