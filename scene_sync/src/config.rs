use bevy_color::Srgba;
use serde::{Deserialize, Serialize};

/// Display settings pushed to every component through `sync_visuals`.
///
/// Treated as an immutable snapshot: editing produces a new value which the
/// director hands to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub stl_opacity: f32,
    pub hull_axes_scale: f32,
    pub foil_axes_scale: f32,
    pub prop_axes_scale: f32,
    pub body_axes_scale: f32,
    /// Metres of arrow per newton.
    pub force_scale: f32,
    /// Metres of arrow per newton-metre.
    pub moment_scale: f32,
    /// Length of a fully submerged panel's indicator.
    pub submergence_scale: f32,
    #[serde(with = "hex_color")]
    pub force_color: Srgba,
    #[serde(with = "hex_color")]
    pub moment_color: Srgba,
    #[serde(with = "hex_color")]
    pub surf_color: Srgba,
    #[serde(with = "hex_color")]
    pub sub_color: Srgba,
    #[serde(with = "hex_color")]
    pub waterplane_color: Srgba,
    pub waterplane_opacity: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            stl_opacity: 0.7,
            hull_axes_scale: 0.5,
            foil_axes_scale: 0.25,
            prop_axes_scale: 0.25,
            body_axes_scale: 1.0,
            force_scale: 0.001,
            moment_scale: 0.01,
            submergence_scale: 0.5,
            force_color: Srgba::rgb_u8(0x00, 0x7b, 0xff),
            moment_color: Srgba::rgb_u8(0xff, 0x00, 0xff),
            surf_color: Srgba::rgb_u8(0xff, 0xff, 0xff),
            sub_color: Srgba::rgb_u8(0xff, 0x9d, 0x00),
            waterplane_color: Srgba::rgb_u8(0x1e, 0x5a, 0x8c),
            waterplane_opacity: 0.35,
        }
    }
}

/// `"#rrggbb"` strings on disk.
mod hex_color {
    use bevy_color::Srgba;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Srgba, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&color.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Srgba, D::Error> {
        let text = String::deserialize(deserializer)?;
        Srgba::hex(&text).map_err(|err| D::Error::custom(format!("bad colour {text:?}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_round_trip_as_hex() {
        let config = VisualConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"#007BFF\"") || json.contains("\"#007bff\""));
        let back: VisualConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: VisualConfig =
            serde_json::from_str(r##"{"force_scale":0.002,"sub_color":"#00ff00"}"##).unwrap();
        assert_eq!(config.force_scale, 0.002);
        assert_eq!(config.sub_color, Srgba::rgb_u8(0, 255, 0));
        assert_eq!(config.moment_scale, VisualConfig::default().moment_scale);
    }

    #[test]
    fn invalid_colour_is_rejected() {
        assert!(serde_json::from_str::<VisualConfig>(r#"{"force_color":"blue-ish"}"#).is_err());
    }
}
