use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{RowMajor3, Vec3Wire};

/// Per-frame dynamic state. Every field defaults when absent so a partial
/// frame only updates what it carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemMessage {
    pub running: bool,
    /// Simulated seconds per wall-clock second.
    pub rate: f32,
    pub method: Option<String>,
    /// Body-frame velocity `[u, v, w]` (m/s).
    #[serde(rename = "U")]
    pub u: Vec3Wire,
    /// Body rates `[p, q, r]` (rad/s).
    pub omega: Vec3Wire,
    /// Euler angles `[phi, theta, psi]` (rad).
    #[serde(rename = "Phi")]
    pub phi: Vec3Wire,
    /// Position of the centre of mass in the fixed frame (m, z down).
    pub r: Vec3Wire,
    /// Rear-axle steering angle (rad).
    pub psi_ra: f32,
    /// Body to fixed frame.
    #[serde(rename = "C0b")]
    pub c0b: RowMajor3,
    /// Body to rear-axle frame.
    #[serde(rename = "Cra_b")]
    pub cra_b: RowMajor3,
    /// Hull lookup query, informational.
    pub query: Vec<f32>,
    pub panels: BTreeMap<String, PanelTelem>,
    pub wing_roots: BTreeMap<String, WingRootTelem>,
    pub hull: HullTelem,
    pub propulsor: PropulsorTelem,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelTelem {
    pub alpha: f32,
    pub beta: f32,
    /// Submerged fraction of the span, measured from the lower end.
    pub f: f32,
    /// End 1 of the panel is the lower (wetted) end.
    pub one_lower: bool,
    /// Centre of pressure of the wetted part, in the frame of the panel's
    /// host: body frame for front panels, rear-axle frame for rear ones.
    #[serde(rename = "r_qc_fC")]
    pub r_qc_fc: Vec3Wire,
    #[serde(rename = "U_mag")]
    pub u_mag: f32,
    #[serde(rename = "L")]
    pub lift: f32,
    #[serde(rename = "D")]
    pub drag: f32,
    /// Force, body frame.
    #[serde(rename = "F")]
    pub force: Vec3Wire,
    /// Moment about the centre of mass, body frame.
    #[serde(rename = "M")]
    pub moment: Vec3Wire,
    /// Water frame to body frame.
    #[serde(rename = "Cbw")]
    pub cbw: RowMajor3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WingRootTelem {
    pub alpha: f32,
    pub beta: f32,
    pub area: f32,
    pub vol: f32,
    pub area_center: Vec3Wire,
    pub vol_center: Vec3Wire,
    #[serde(rename = "U_mag")]
    pub u_mag: f32,
    #[serde(rename = "L")]
    pub lift: f32,
    #[serde(rename = "D")]
    pub drag: f32,
    #[serde(rename = "F_f")]
    pub foil_force: Vec3Wire,
    #[serde(rename = "M_f")]
    pub foil_moment: Vec3Wire,
    #[serde(rename = "F_b")]
    pub buoyant_force: Vec3Wire,
    #[serde(rename = "M_b")]
    pub buoyant_moment: Vec3Wire,
    #[serde(rename = "Cbw")]
    pub cbw: RowMajor3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HullTelem {
    pub alpha: f32,
    pub beta: f32,
    pub area: f32,
    pub vol: f32,
    pub area_center: Vec3Wire,
    pub vol_center: Vec3Wire,
    #[serde(rename = "U_mag")]
    pub u_mag: f32,
    #[serde(rename = "L")]
    pub lift: f32,
    #[serde(rename = "D")]
    pub drag: f32,
    #[serde(rename = "F_h")]
    pub hydro_force: Vec3Wire,
    #[serde(rename = "M_h")]
    pub hydro_moment: Vec3Wire,
    #[serde(rename = "F_b")]
    pub buoyant_force: Vec3Wire,
    #[serde(rename = "M_b")]
    pub buoyant_moment: Vec3Wire,
    #[serde(rename = "Cbw")]
    pub cbw: RowMajor3,
    pub surf: HullSurfTelem,
}

/// Surfaced (planing) contribution, acting at the build's `r_surf`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HullSurfTelem {
    pub alpha: f32,
    pub beta: f32,
    #[serde(rename = "U_mag")]
    pub u_mag: f32,
    #[serde(rename = "L")]
    pub lift: f32,
    #[serde(rename = "D")]
    pub drag: f32,
    #[serde(rename = "F")]
    pub force: Vec3Wire,
    #[serde(rename = "M")]
    pub moment: Vec3Wire,
    #[serde(rename = "Cbw")]
    pub cbw: RowMajor3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropulsorTelem {
    /// Advance angle (rad).
    pub beta: f32,
    /// Submerged fraction of the disc.
    pub fp: f32,
    /// Motor current (A).
    #[serde(rename = "I")]
    pub current: f32,
    /// Shaft speed (rev/s).
    pub n: f32,
    /// Motor voltage (V).
    #[serde(rename = "V")]
    pub voltage: f32,
    /// Thrust (N).
    #[serde(rename = "T")]
    pub thrust: f32,
    /// Shaft torque (N m).
    #[serde(rename = "Q")]
    pub torque: f32,
    /// Force, body frame.
    #[serde(rename = "F")]
    pub force: Vec3Wire,
    /// Moment about the centre of mass, body frame.
    #[serde(rename = "M")]
    pub moment: Vec3Wire,
    /// Propulsor water frame to rear-axle frame.
    #[serde(rename = "Cra_w")]
    pub cra_w: RowMajor3,
}
