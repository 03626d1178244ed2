use serde::{Deserialize, Serialize};

/// Outbound requests. `set` carries display units (degrees, centimetres for
/// `r.z`); the server converts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Set { state: StateName, value: StateValue },
    /// Toggle run / pause.
    Sim,
    Step { dt: f32 },
    Reset,
    Reinit,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateName {
    #[serde(rename = "U")]
    Velocity,
    #[serde(rename = "omega")]
    Rates,
    #[serde(rename = "Phi")]
    Attitude,
    #[serde(rename = "r")]
    Position,
    #[serde(rename = "rate")]
    Rate,
    #[serde(rename = "input")]
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Vector { x: f32, y: f32, z: f32 },
    Planar { x: f32, y: f32 },
    Scalar(f32),
}
