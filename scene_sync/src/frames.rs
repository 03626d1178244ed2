//! Conversions from wire arrays into the operational math types.
//!
//! Matrices arrive row-major. `Mat3` is column-major, so loading the nine
//! floats as columns yields the transpose of what the server meant; every
//! matrix therefore passes through [`mat3_from_wire`] exactly once.

use bevy_math::{Mat3, Quat, Vec3};
use protocol::{RowMajor3, TelemMessage, Vec3Wire};

pub fn vec3_from_wire(v: &Vec3Wire) -> Vec3 {
    Vec3::from_array(*v)
}

pub fn mat3_from_wire(m: &RowMajor3) -> Mat3 {
    Mat3::from_cols_array(&m.0).transpose()
}

/// Orientation of a node whose axes are the columns of `m`. Anything that is
/// not a proper rotation maps to the identity.
pub fn rotation_from_mat3(m: Mat3) -> Quat {
    if !m.is_finite() || (m.determinant() - 1.0).abs() > 1e-2 {
        return Quat::IDENTITY;
    }
    Quat::from_mat3(&m).normalize()
}

/// Whole-vehicle frame rotations carried by a telemetry frame.
///
/// `C_ab` maps frame-b coordinates into frame a.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRotations {
    /// `C0b`: body to fixed.
    pub body_to_world: Mat3,
    /// `Cra_b`: body to rear-axle.
    pub body_to_rear_axle: Mat3,
}

impl Default for FrameRotations {
    fn default() -> Self {
        Self {
            body_to_world: Mat3::IDENTITY,
            body_to_rear_axle: Mat3::IDENTITY,
        }
    }
}

impl FrameRotations {
    pub fn from_telem(msg: &TelemMessage) -> Self {
        Self {
            body_to_world: mat3_from_wire(&msg.c0b),
            body_to_rear_axle: mat3_from_wire(&msg.cra_b),
        }
    }

    /// `Cb_ra`, the orientation of the rear-axle node inside the body node.
    pub fn rear_axle_to_body(&self) -> Mat3 {
        self.body_to_rear_axle.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw(angle: f32) -> RowMajor3 {
        let (s, c) = angle.sin_cos();
        RowMajor3([c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0])
    }

    #[test]
    fn wire_matrix_keeps_row_semantics() {
        let m = mat3_from_wire(&RowMajor3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]));
        // m * x is the first wire column.
        assert_eq!(m * Vec3::X, Vec3::new(1.0, 4.0, 7.0));
        assert_eq!(m.row(0), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rotation_then_transpose_round_trips() {
        let r = mat3_from_wire(&yaw(0.7));
        let v = Vec3::new(0.3, -1.2, 2.5);
        let back = r.transpose() * (r * v);
        assert!((back - v).length() < 1e-5);
    }

    #[test]
    fn rear_axle_orientation_is_transpose() {
        let mut msg = TelemMessage::default();
        msg.cra_b = yaw(0.2);
        let frames = FrameRotations::from_telem(&msg);
        let v = Vec3::X;
        let there = frames.body_to_rear_axle * v;
        let back = frames.rear_axle_to_body() * there;
        assert!((back - v).length() < 1e-6);
    }

    #[test]
    fn degenerate_matrix_falls_back_to_identity() {
        assert_eq!(rotation_from_mat3(Mat3::ZERO), Quat::IDENTITY);
    }
}
