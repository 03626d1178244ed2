//! Wire messages exchanged with the simulation server.
//!
//! Every frame on the socket is one JSON object discriminated by its `type`
//! field. Inbound frames are [`ServerMessage`]s (`build` / `telem`), outbound
//! frames are [`ClientMessage`]s. Angles travel in radians and rotation
//! matrices travel row-major as nine floats ([`RowMajor3`]).

use serde::{de::DeserializeOwned, Deserialize, Serialize};

mod control;
mod structure;
mod telemetry;

pub use control::{ClientMessage, StateName, StateValue};
pub use structure::{BuildMessage, HullBuild, PanelBuild, PropulsorBuild};
pub use telemetry::{HullSurfTelem, HullTelem, PanelTelem, PropulsorTelem, TelemMessage, WingRootTelem};

/// Three floats as they appear on the wire.
pub type Vec3Wire = [f32; 3];

/// A 3x3 direction-cosine matrix flattened row-major.
///
/// Absent matrices decode as the identity so a partial telemetry frame never
/// collapses a frame to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowMajor3(pub [f32; 9]);

impl RowMajor3 {
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Element at `row`, `col` of the matrix the server meant.
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.0[row * 3 + col]
    }
}

impl Default for RowMajor3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Inbound frames. Kinds this client does not know decode as `Unknown`
/// instead of failing, so they can be logged and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Build(Box<BuildMessage>),
    Telem(Box<TelemMessage>),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_is_not_an_error() {
        let msg: ServerMessage = decode(r#"{"type":"hello","x":1}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Unknown));
    }

    #[test]
    fn missing_type_is_a_decode_error() {
        let err = decode::<ServerMessage>(r#"{"panels":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn row_major_indexing() {
        let m = RowMajor3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(m.at(0, 1), 2.0);
        assert_eq!(m.at(1, 0), 4.0);
        assert_eq!(m.at(2, 2), 9.0);
    }
}
