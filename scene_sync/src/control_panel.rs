//! State behind the control panel: read-only simulation readouts in display
//! units, editable control fields, connection status and the formatted
//! telemetry dumps.

use bevy_math::{Vec2, Vec3};
use protocol::{BuildMessage, ClientMessage, StateName, StateValue, TelemMessage};
use serde_json::{Map, Value};
use tracing::warn;

use crate::session::SessionState;

/// Latest simulation state as shown to the user. Angles in degrees, `z` in
/// centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimStates {
    /// u, v, w [m/s]
    pub velocity: Vec3,
    /// p, q, r [deg/s]
    pub rates: Vec3,
    /// phi, theta, psi [deg]
    pub attitude: Vec3,
    /// x, y [m], z [cm]
    pub position: Vec3,
    pub psi_ra: f32,
    pub current: f32,
    pub voltage: f32,
    pub rpm: f32,
    pub thrust: f32,
    pub torque: f32,
    pub running: bool,
}

impl SimStates {
    pub fn from_telem(msg: &TelemMessage) -> Self {
        let deg = |v: [f32; 3]| Vec3::from_array(v.map(f32::to_degrees));
        Self {
            velocity: Vec3::from_array(msg.u),
            rates: deg(msg.omega),
            attitude: deg(msg.phi),
            position: Vec3::new(msg.r[0], msg.r[1], msg.r[2] * 100.0),
            psi_ra: msg.psi_ra.to_degrees(),
            current: msg.propulsor.current,
            voltage: msg.propulsor.voltage,
            rpm: msg.propulsor.n * 60.0,
            thrust: msg.propulsor.thrust,
            torque: msg.propulsor.torque,
            running: msg.running,
        }
    }

    pub fn status(&self) -> &'static str {
        if self.running {
            "Running"
        } else {
            "Paused"
        }
    }
}

/// User-editable fields, in the same display units as [`SimStates`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlStates {
    pub velocity: Vec3,
    pub rates: Vec3,
    pub attitude: Vec3,
    pub position: Vec3,
    /// Step size [s].
    pub dt: f32,
    /// Steering (x) and throttle (y), each in [-1, 1].
    pub input: Vec2,
    /// Simulation speed relative to real time.
    pub rate: f32,
}

impl Default for ControlStates {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            rates: Vec3::ZERO,
            attitude: Vec3::ZERO,
            position: Vec3::ZERO,
            dt: 0.1,
            input: Vec2::ZERO,
            rate: 1.0,
        }
    }
}

/// Pretty-printed telemetry, one dump per section.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryText {
    pub raw: String,
    pub hull: String,
    pub panels: String,
    pub wing_roots: String,
    pub propulsor: String,
    pub misc: String,
}

impl Default for TelemetryText {
    fn default() -> Self {
        let na = || "N/A".to_string();
        Self {
            raw: na(),
            hull: na(),
            panels: na(),
            wing_roots: na(),
            propulsor: na(),
            misc: na(),
        }
    }
}

impl TelemetryText {
    pub fn from_telem(msg: &TelemMessage) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(msg)?;
        let Value::Object(mut fields) = value.clone() else {
            return Ok(Self::default());
        };
        let mut section = |key: &str| {
            fields
                .remove(key)
                .map(|v| format_value(&v))
                .unwrap_or_else(|| "N/A".to_string())
        };
        let hull = section("hull");
        let panels = section("panels");
        let wing_roots = section("wing_roots");
        let propulsor = section("propulsor");
        Ok(Self {
            raw: format_value(&value),
            hull,
            panels,
            wing_roots,
            propulsor,
            misc: format_value(&Value::Object(fields)),
        })
    }

    pub fn sections(&self) -> [(&'static str, &str); 6] {
        [
            ("Raw", &self.raw),
            ("Hull", &self.hull),
            ("Panels", &self.panels),
            ("Wing Roots", &self.wing_roots),
            ("Propulsor", &self.propulsor),
            ("Misc", &self.misc),
        ]
    }
}

/// Renders a telemetry value: numbers to four decimals, direction-cosine
/// matrices (keys starting with `C`) as three rows, other arrays inline as
/// `<a, b, c>`.
pub fn format_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, None, value, 0);
    out
}

fn write_value(out: &mut String, key: Option<&str>, value: &Value, indent: usize) {
    match value {
        Value::Number(n) => out.push_str(&format_number(n.as_f64())),
        Value::Array(items) => {
            let cells: Vec<String> = items.iter().map(format_cell).collect();
            if key.is_some_and(|k| k.starts_with('C')) && cells.len() == 9 {
                let pad = " ".repeat(indent + 2);
                out.push_str("[\n");
                for (i, row) in cells.chunks(3).enumerate() {
                    out.push_str(&format!("{pad}[{}]", row.join(", ")));
                    out.push_str(if i < 2 { ",\n" } else { "\n" });
                }
                out.push_str(&" ".repeat(indent));
                out.push(']');
            } else {
                out.push_str(&format!("<{}>", cells.join(", ")));
            }
        }
        Value::Object(fields) => write_object(out, fields, indent),
        other => out.push_str(&other.to_string()),
    }
}

fn write_object(out: &mut String, fields: &Map<String, Value>, indent: usize) {
    if fields.is_empty() {
        out.push_str("{}");
        return;
    }
    let pad = " ".repeat(indent + 2);
    out.push_str("{\n");
    let last = fields.len() - 1;
    for (i, (key, value)) in fields.iter().enumerate() {
        out.push_str(&format!("{pad}{key}: "));
        write_value(out, Some(key), value, indent + 2);
        out.push_str(if i < last { ",\n" } else { "\n" });
    }
    out.push_str(&" ".repeat(indent));
    out.push('}');
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(n.as_f64()),
        other => other.to_string(),
    }
}

fn format_number(n: Option<f64>) -> String {
    match n {
        Some(n) => format!("{n:.4}"),
        None => "NaN".to_string(),
    }
}

/// Everything the control panel displays or edits.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    pub url: String,
    pub controls: ControlStates,
    status: SessionState,
    last_terminal: Option<SessionState>,
    sim: SimStates,
    telemetry: TelemetryText,
    frames: u64,
    v_max: f32,
    psi_ra_max: f32,
    methods: Vec<String>,
    method: Option<String>,
}

impl ControlPanel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            controls: ControlStates::default(),
            status: SessionState::Idle,
            last_terminal: None,
            sim: SimStates::default(),
            telemetry: TelemetryText::default(),
            frames: 0,
            v_max: 0.0,
            psi_ra_max: 0.0,
            methods: Vec::new(),
            method: None,
        }
    }

    pub fn set_status(&mut self, status: SessionState) {
        match status {
            SessionState::Disconnected | SessionState::Error => {
                self.last_terminal = Some(status)
            }
            SessionState::Connecting => self.last_terminal = None,
            _ => {}
        }
        self.status = status;
    }

    pub fn status(&self) -> SessionState {
        self.status
    }

    /// Status line. An idle session that just lost its connection keeps
    /// saying why.
    pub fn status_text(&self) -> &'static str {
        match (self.status, self.last_terminal) {
            (SessionState::Idle, Some(terminal)) => terminal.label(),
            (SessionState::Idle, None) => "Disconnected",
            (status, _) => status.label(),
        }
    }

    pub fn connect_enabled(&self) -> bool {
        self.status == SessionState::Idle
    }

    /// Step and state edits only make sense while paused.
    pub fn controls_enabled(&self) -> bool {
        !self.sim.running
    }

    pub fn apply_build(&mut self, msg: &BuildMessage) {
        self.v_max = msg.v_max;
        self.psi_ra_max = msg.psi_ra_max;
        self.methods = msg.methods.clone();
        self.method = msg.method.clone();
    }

    pub fn apply_telem(&mut self, msg: &TelemMessage) {
        self.sim = SimStates::from_telem(msg);
        if msg.method.is_some() {
            self.method = msg.method.clone();
        }
        if msg.rate > 0.0 {
            self.controls.rate = msg.rate;
        }
        match TelemetryText::from_telem(msg) {
            Ok(text) => self.telemetry = text,
            Err(err) => warn!(?err, "Failed to format telemetry"),
        }
        self.frames += 1;
    }

    /// Copies the live simulation state into the editable fields.
    pub fn sync_control_states(&mut self) {
        self.controls.velocity = self.sim.velocity;
        self.controls.rates = self.sim.rates;
        self.controls.attitude = self.sim.attitude;
        self.controls.position = self.sim.position;
    }

    pub fn sim(&self) -> &SimStates {
        &self.sim
    }

    pub fn telemetry(&self) -> &TelemetryText {
        &self.telemetry
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Rudder angle [deg] and motor voltage the current input would command.
    pub fn commanded(&self) -> (f32, f32) {
        let input = self.input();
        (
            (-input.x * self.psi_ra_max).to_degrees(),
            input.y * self.v_max,
        )
    }

    fn input(&self) -> Vec2 {
        self.controls.input.clamp(Vec2::NEG_ONE, Vec2::ONE)
    }

    /// The `set` request for one editable field, from its current value.
    pub fn set_state_message(&self, state: StateName) -> ClientMessage {
        let vector = |v: Vec3| StateValue::Vector {
            x: v.x,
            y: v.y,
            z: v.z,
        };
        let value = match state {
            StateName::Velocity => vector(self.controls.velocity),
            StateName::Rates => vector(self.controls.rates),
            StateName::Attitude => vector(self.controls.attitude),
            StateName::Position => vector(self.controls.position),
            StateName::Rate => StateValue::Scalar(self.controls.rate),
            StateName::Input => {
                let input = self.input();
                StateValue::Planar {
                    x: input.x,
                    y: input.y,
                }
            }
        };
        ClientMessage::Set { state, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn telem() -> TelemMessage {
        let mut msg = TelemMessage {
            running: true,
            u: [4.0, 0.1, -0.2],
            omega: [PI, 0.0, 0.0],
            phi: [0.0, PI / 2.0, 0.0],
            r: [10.0, 2.0, -0.25],
            ..Default::default()
        };
        msg.propulsor.n = 30.0;
        msg
    }

    #[test]
    fn sim_states_use_display_units() {
        let sim = SimStates::from_telem(&telem());
        assert!((sim.rates.x - 180.0).abs() < 1e-3);
        assert!((sim.attitude.y - 90.0).abs() < 1e-3);
        assert!((sim.position.z + 25.0).abs() < 1e-4);
        assert_eq!(sim.rpm, 1800.0);
        assert_eq!(sim.status(), "Running");
    }

    #[test]
    fn controls_follow_run_state_and_resync() {
        let mut panel = ControlPanel::new("ws://x");
        panel.controls.velocity = Vec3::splat(9.0);
        panel.apply_telem(&telem());
        assert!(!panel.controls_enabled());
        assert_eq!(panel.controls.velocity, Vec3::splat(9.0));
        panel.sync_control_states();
        assert_eq!(panel.controls.velocity, Vec3::new(4.0, 0.1, -0.2));
    }

    #[test]
    fn set_state_encodes_display_units() {
        let mut panel = ControlPanel::new("ws://x");
        panel.controls.position = Vec3::new(1.0, 2.0, -30.0);
        panel.controls.input = Vec2::new(3.0, -0.5);
        assert_eq!(
            panel.set_state_message(StateName::Position),
            ClientMessage::Set {
                state: StateName::Position,
                value: StateValue::Vector {
                    x: 1.0,
                    y: 2.0,
                    z: -30.0
                },
            }
        );
        assert_eq!(
            panel.set_state_message(StateName::Input),
            ClientMessage::Set {
                state: StateName::Input,
                value: StateValue::Planar { x: 1.0, y: -0.5 },
            }
        );
    }

    #[test]
    fn status_text_remembers_disconnect() {
        let mut panel = ControlPanel::new("ws://x");
        assert!(panel.connect_enabled());
        panel.set_status(SessionState::Connecting);
        assert!(!panel.connect_enabled());
        panel.set_status(SessionState::Connected);
        panel.set_status(SessionState::Error);
        panel.set_status(SessionState::Idle);
        assert_eq!(panel.status_text(), "Error");
        assert!(panel.connect_enabled());
    }

    #[test]
    fn formatter_rounds_and_shapes_arrays() {
        let value = serde_json::json!({
            "Cbw": [1, 0, 0, 0, 1, 0, 0, 0, 1],
            "F": [1.23456, -2, 0],
            "alpha": 0.5,
            "one_lower": true
        });
        let text = format_value(&value);
        assert!(text.contains("  Cbw: [\n    [1.0000, 0.0000, 0.0000],\n"));
        assert!(text.contains("F: <1.2346, -2.0000, 0.0000>"));
        assert!(text.contains("alpha: 0.5000"));
        assert!(text.contains("one_lower: true"));
    }

    #[test]
    fn telemetry_sections_split_the_frame() {
        let text = TelemetryText::from_telem(&telem()).unwrap();
        assert!(text.misc.contains("running: true"));
        assert!(!text.misc.contains("propulsor"));
        assert!(text.propulsor.contains("n: 30.0000"));
        assert!(text.raw.contains("propulsor: {"));
    }
}
