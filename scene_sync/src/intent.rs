//! User intents coming from the control panel and where each one goes.

use protocol::{ClientMessage, StateName};

use crate::config::VisualConfig;
use crate::registry::Layer;

/// Static meshes loaded from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshToggle {
    Hull,
    Wing,
    RearWing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Connect(String),
    ToggleRun,
    /// Step once by the control panel's `dt`.
    Step,
    Reset,
    Reinitialize,
    Export,
    /// Send the current value of one editable field.
    SetState(StateName),
    SetRate(f32),
    SetInput { x: f32, y: f32 },
    RefocusCamera,
    ToggleCameraFollow,
    ToggleWaterplane,
    ToggleGrid,
    ToggleBodyAxes,
    ToggleFixedAxes,
    /// Outlines of the scene lights, drawn by the renderer.
    ToggleLightHelpers,
    ToggleMesh(MeshToggle),
    ToggleLayer(Layer),
    SetVisuals(VisualConfig),
}

/// Where an intent is handled. Every intent has exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Connect(String),
    Wire(ClientMessage),
    Local,
}

impl Intent {
    /// Wire-bound intents are resolved against the current control fields
    /// (`dt`, the edited state) by the caller; see
    /// [`crate::director::SceneDirector::route`].
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::RefocusCamera
                | Self::ToggleCameraFollow
                | Self::ToggleWaterplane
                | Self::ToggleGrid
                | Self::ToggleBodyAxes
                | Self::ToggleFixedAxes
                | Self::ToggleLightHelpers
                | Self::ToggleMesh(_)
                | Self::ToggleLayer(_)
                | Self::SetVisuals(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_intents_stay_local() {
        assert!(Intent::ToggleLayer(Layer::Forces).is_local());
        assert!(Intent::SetVisuals(VisualConfig::default()).is_local());
        assert!(Intent::ToggleLightHelpers.is_local());
        assert!(!Intent::Export.is_local());
        assert!(!Intent::Connect("ws://x".into()).is_local());
        assert!(!Intent::SetRate(2.0).is_local());
    }
}
