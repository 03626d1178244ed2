use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Vec3Wire;

/// Structural description of the vehicle, sent once per model (re)initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildMessage {
    /// Centre of mass in model coordinates; the body frame origin.
    #[serde(rename = "r_CM")]
    pub r_cm: Vec3Wire,
    /// Rear-axle pivot in body coordinates.
    pub r_ra: Vec3Wire,
    /// Full-scale propulsor voltage, used to scale the throttle input.
    #[serde(rename = "V_max", default)]
    pub v_max: f32,
    /// Full-scale rear-axle steering angle (rad).
    #[serde(default)]
    pub psi_ra_max: f32,
    pub panels: BTreeMap<String, PanelBuild>,
    pub hull: HullBuild,
    pub propulsor: PropulsorBuild,
    /// Integrators the server can switch between.
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelBuild {
    #[serde(rename = "r_LE_1")]
    pub r_le_1: Vec3Wire,
    #[serde(rename = "r_LE_2")]
    pub r_le_2: Vec3Wire,
    #[serde(rename = "r_TE_1")]
    pub r_te_1: Vec3Wire,
    #[serde(rename = "r_TE_2")]
    pub r_te_2: Vec3Wire,
    /// Mounted on the steerable rear assembly.
    #[serde(default)]
    pub rear: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HullBuild {
    /// Reference point of the surfaced (planing) contribution.
    pub r_surf: Vec3Wire,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PropulsorBuild {
    /// Propeller hub, in rear-axle coordinates.
    pub r_prop: Vec3Wire,
    /// Propeller diameter (m).
    pub d: f32,
}
