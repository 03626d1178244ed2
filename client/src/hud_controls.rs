//! The control panel: connection, simulation controls, editable states,
//! overlay toggles, display settings and the telemetry dumps.
//!
//! Everything the panel does goes through [`Intent`]s queued on
//! [`PendingIntents`]; the only direct writes are the URL and the edited
//! state fields, which the next `SetState` intent reads back.

use bevy::color::ColorToPacked;
use bevy::prelude::*;
use bevy_egui::egui;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass};
use protocol::StateName;
use scene_sync::control_panel::{ControlPanel, ControlStates};
use scene_sync::{Intent, Layer, MeshToggle, NodeId, VisualConfig};
use tracing::info;

use crate::net::{Director, LinkStats, LiveDirector, PendingIntents};

pub struct HudControlsPlugin;

impl Plugin for HudControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, (keyboard_shortcuts, ui_control_panel));
    }
}

const MESHES: [(MeshToggle, &str); 3] = [
    (MeshToggle::Hull, "Hull mesh"),
    (MeshToggle::Wing, "Wing mesh"),
    (MeshToggle::RearWing, "Rear wing mesh"),
];

/// Read once per frame so the UI never holds the director lock.
struct HudSnapshot {
    panel: ControlPanel,
    visuals: VisualConfig,
    follow: bool,
    layers: [(Layer, bool); 8],
    meshes: [(MeshToggle, &'static str, bool); 3],
    waterplane: bool,
    grid: bool,
    body_axes: bool,
    fixed_axes: bool,
    light_helpers: bool,
}

impl HudSnapshot {
    fn capture(d: &LiveDirector) -> Self {
        let tree = d.tree();
        let shown = |id: NodeId| tree.get(id).is_some_and(|n| n.visible());
        Self {
            panel: d.control_panel().clone(),
            visuals: *d.visuals(),
            follow: d.camera().enabled(),
            layers: Layer::ALL.map(|layer| (layer, d.registry().is_shown(layer))),
            meshes: MESHES.map(|(which, label)| (which, label, shown(d.vehicle().mesh(which)))),
            waterplane: d.grid().waterplane_shown(tree),
            grid: d.grid().grid_shown(tree),
            body_axes: shown(d.vehicle().body_axes().root()),
            fixed_axes: shown(d.vehicle().fixed_axes().root()),
            light_helpers: d.light_helpers_shown(),
        }
    }
}

fn keyboard_shortcuts(
    mut egui_ctx: EguiContexts,
    keys: Res<ButtonInput<KeyCode>>,
    mut pending: ResMut<PendingIntents>,
) {
    let Ok(ctx) = egui_ctx.ctx_mut() else {
        return;
    };
    if ctx.wants_keyboard_input() {
        return;
    }
    let bindings = [
        (KeyCode::Space, Intent::ToggleRun),
        (KeyCode::KeyN, Intent::Step),
        (KeyCode::KeyF, Intent::ToggleCameraFollow),
        (KeyCode::KeyC, Intent::RefocusCamera),
        (KeyCode::KeyG, Intent::ToggleGrid),
        (KeyCode::KeyW, Intent::ToggleWaterplane),
    ];
    for (key, intent) in bindings {
        if keys.just_pressed(key) {
            pending.push(intent);
        }
    }
}

fn ui_control_panel(
    mut egui_ctx: EguiContexts,
    director: Res<Director>,
    stats: Res<LinkStats>,
    mut pending: ResMut<PendingIntents>,
) {
    use egui::*;
    let Ok(ctx) = egui_ctx.ctx_mut() else {
        return;
    };

    let snap = HudSnapshot::capture(&director.lock());
    let mut url = snap.panel.url.clone();
    let mut controls = snap.panel.controls;
    let mut visuals = snap.visuals;
    let mut intents = Vec::new();

    SidePanel::left("control_panel")
        .default_width(320.0)
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                connection_section(ui, &snap, &stats, &mut url, &mut intents);
                ui.separator();
                simulation_section(ui, &snap, &mut controls, &mut intents);
                ui.separator();
                CollapsingHeader::new("States")
                    .default_open(true)
                    .show(ui, |ui| states_section(ui, &snap, &mut controls, &mut intents));
                CollapsingHeader::new("Propulsor")
                    .default_open(true)
                    .show(ui, |ui| propulsor_section(ui, &snap));
                CollapsingHeader::new("View")
                    .default_open(false)
                    .show(ui, |ui| view_section(ui, &snap, &mut intents));
                CollapsingHeader::new("Visuals")
                    .default_open(false)
                    .show(ui, |ui| visuals_section(ui, &mut visuals));
            });
        });

    SidePanel::right("telemetry_panel")
        .default_width(340.0)
        .show(ctx, |ui| {
            ui.heading("Telemetry");
            ScrollArea::vertical().show(ui, |ui| {
                for (name, text) in snap.panel.telemetry().sections() {
                    CollapsingHeader::new(name)
                        .default_open(false)
                        .show(ui, |ui| {
                            if ui.small_button("Log").clicked() {
                                info!(section = name, "\n{text}");
                            }
                            ui.monospace(text);
                        });
                }
            });
        });

    if visuals != snap.visuals {
        intents.push(Intent::SetVisuals(visuals));
    }
    if url != snap.panel.url || controls != snap.panel.controls {
        let mut d = director.lock();
        let panel = d.control_panel_mut();
        panel.url = url;
        panel.controls = controls;
    }
    pending.0.extend(intents);
}

fn connection_section(
    ui: &mut egui::Ui,
    snap: &HudSnapshot,
    stats: &LinkStats,
    url: &mut String,
    intents: &mut Vec<Intent>,
) {
    ui.heading("Connection");
    ui.horizontal(|ui| {
        ui.text_edit_singleline(url);
        if ui
            .add_enabled(snap.panel.connect_enabled(), egui::Button::new("Connect"))
            .clicked()
        {
            intents.push(Intent::Connect(url.clone()));
        }
    });
    ui.label(format!("Status: {}", snap.panel.status_text()));
    ui.monospace(format!(
        "frames {}  builds {}  dt {:.1} ms",
        stats.telems, stats.builds, stats.inter_arrival_ewma_ms
    ));
    if stats.unknown > 0 {
        ui.colored_label(egui::Color32::YELLOW, format!("{} unknown messages", stats.unknown));
    }
}

fn simulation_section(
    ui: &mut egui::Ui,
    snap: &HudSnapshot,
    controls: &mut ControlStates,
    intents: &mut Vec<Intent>,
) {
    let panel = &snap.panel;
    let sim = panel.sim();
    ui.heading("Simulation");
    ui.label(format!("{} ({})", sim.status(), panel.method().unwrap_or("-")));

    ui.horizontal(|ui| {
        let run_label = if sim.running { "Pause" } else { "Run" };
        if ui.button(run_label).clicked() {
            intents.push(Intent::ToggleRun);
        }
        ui.add_enabled_ui(panel.controls_enabled(), |ui| {
            if ui.button("Step").clicked() {
                intents.push(Intent::Step);
            }
            ui.add(
                egui::DragValue::new(&mut controls.dt)
                    .speed(0.01)
                    .range(0.001..=10.0)
                    .suffix(" s"),
            );
        });
    });
    ui.horizontal(|ui| {
        if ui.button("Reset").clicked() {
            intents.push(Intent::Reset);
        }
        if ui.button("Reinitialize").clicked() {
            intents.push(Intent::Reinitialize);
        }
        if ui.button("Export").clicked() {
            intents.push(Intent::Export);
        }
    });

    let mut rate = controls.rate;
    let rate_changed = ui
        .add(
            egui::Slider::new(&mut rate, 0.1..=10.0)
                .logarithmic(true)
                .text("rate"),
        )
        .changed();
    if rate_changed {
        intents.push(Intent::SetRate(rate));
    }

    let mut input = controls.input;
    let steer = ui
        .add(egui::Slider::new(&mut input.x, -1.0..=1.0).text("steering"))
        .changed();
    let throttle = ui
        .add(egui::Slider::new(&mut input.y, -1.0..=1.0).text("throttle"))
        .changed();
    if steer || throttle {
        intents.push(Intent::SetInput {
            x: input.x,
            y: input.y,
        });
    }
    let (rudder, voltage) = panel.commanded();
    ui.monospace(format!("rudder {rudder:>7.2} deg  motor {voltage:>6.2} V"));
}

fn states_section(
    ui: &mut egui::Ui,
    snap: &HudSnapshot,
    controls: &mut ControlStates,
    intents: &mut Vec<Intent>,
) {
    let sim = snap.panel.sim();
    let enabled = snap.panel.controls_enabled();
    egui::Grid::new("states_grid")
        .num_columns(4)
        .striped(true)
        .show(ui, |ui| {
            let rows: [(&str, Vec3, &mut Vec3, StateName); 4] = [
                ("U [m/s]", sim.velocity, &mut controls.velocity, StateName::Velocity),
                ("omega [deg/s]", sim.rates, &mut controls.rates, StateName::Rates),
                ("Phi [deg]", sim.attitude, &mut controls.attitude, StateName::Attitude),
                ("r [m, m, cm]", sim.position, &mut controls.position, StateName::Position),
            ];
            for (label, live, edit, name) in rows {
                ui.label(label);
                ui.monospace(format!("{:>8.3} {:>8.3} {:>8.3}", live.x, live.y, live.z));
                ui.add_enabled_ui(enabled, |ui| {
                    ui.horizontal(|ui| {
                        for v in [&mut edit.x, &mut edit.y, &mut edit.z] {
                            ui.add(egui::DragValue::new(v).speed(0.05).max_decimals(3));
                        }
                    });
                });
                if ui.add_enabled(enabled, egui::Button::new("Set")).clicked() {
                    intents.push(Intent::SetState(name));
                }
                ui.end_row();
            }
        });
    ui.horizontal(|ui| {
        ui.label(format!("psi_ra {:.2} deg", sim.psi_ra));
        if ui.small_button("Copy live").clicked() {
            controls.velocity = sim.velocity;
            controls.rates = sim.rates;
            controls.attitude = sim.attitude;
            controls.position = sim.position;
        }
    });
}

fn propulsor_section(ui: &mut egui::Ui, snap: &HudSnapshot) {
    let sim = snap.panel.sim();
    egui::Grid::new("propulsor_grid").num_columns(2).show(ui, |ui| {
        for (label, value, unit) in [
            ("Speed", sim.rpm, "rpm"),
            ("Current", sim.current, "A"),
            ("Voltage", sim.voltage, "V"),
            ("Thrust", sim.thrust, "N"),
            ("Torque", sim.torque, "N m"),
        ] {
            ui.label(label);
            ui.monospace(format!("{value:>10.2} {unit}"));
            ui.end_row();
        }
    });
}

fn view_section(ui: &mut egui::Ui, snap: &HudSnapshot, intents: &mut Vec<Intent>) {
    ui.horizontal(|ui| {
        if ui.button("Refocus").clicked() {
            intents.push(Intent::RefocusCamera);
        }
        let mut follow = snap.follow;
        if ui.checkbox(&mut follow, "Follow vehicle").changed() {
            intents.push(Intent::ToggleCameraFollow);
        }
    });
    let mut toggle = |ui: &mut egui::Ui, shown: bool, label: &str, intent: Intent| {
        let mut shown = shown;
        if ui.checkbox(&mut shown, label).changed() {
            intents.push(intent);
        }
    };
    toggle(ui, snap.waterplane, "Waterplane", Intent::ToggleWaterplane);
    toggle(ui, snap.grid, "Grid", Intent::ToggleGrid);
    toggle(ui, snap.body_axes, "Body axes", Intent::ToggleBodyAxes);
    toggle(ui, snap.fixed_axes, "Fixed axes", Intent::ToggleFixedAxes);
    toggle(ui, snap.light_helpers, "Light helpers", Intent::ToggleLightHelpers);
    for (which, label, shown) in snap.meshes {
        toggle(ui, shown, label, Intent::ToggleMesh(which));
    }
    ui.separator();
    for (layer, shown) in snap.layers {
        toggle(ui, shown, layer.label(), Intent::ToggleLayer(layer));
    }
}

fn visuals_section(ui: &mut egui::Ui, visuals: &mut VisualConfig) {
    let scales: [(&str, &mut f32, f32); 9] = [
        ("STL opacity", &mut visuals.stl_opacity, 1.0),
        ("Hull axes", &mut visuals.hull_axes_scale, 5.0),
        ("Foil axes", &mut visuals.foil_axes_scale, 5.0),
        ("Propulsor axes", &mut visuals.prop_axes_scale, 5.0),
        ("Body axes", &mut visuals.body_axes_scale, 5.0),
        ("Force [m/N]", &mut visuals.force_scale, 0.05),
        ("Moment [m/Nm]", &mut visuals.moment_scale, 0.5),
        ("Submergence", &mut visuals.submergence_scale, 5.0),
        ("Waterplane opacity", &mut visuals.waterplane_opacity, 1.0),
    ];
    for (label, value, max) in scales {
        ui.add(egui::Slider::new(value, 0.0..=max).text(label));
    }
    let colors: [(&str, &mut Srgba); 5] = [
        ("Force", &mut visuals.force_color),
        ("Moment", &mut visuals.moment_color),
        ("Surfaced", &mut visuals.surf_color),
        ("Submerged", &mut visuals.sub_color),
        ("Waterplane", &mut visuals.waterplane_color),
    ];
    for (label, color) in colors {
        ui.horizontal(|ui| {
            let mut rgb = color.to_u8_array_no_alpha();
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                *color = Srgba::rgb_u8(rgb[0], rgb[1], rgb[2]);
            }
            ui.label(label);
        });
    }
    if ui.button("Defaults").clicked() {
        *visuals = VisualConfig::default();
    }
}
