//! Top-level orchestration of one visualizer instance.

use bevy_math::Vec3;
use protocol::{BuildMessage, ClientMessage, ServerMessage, StateName, StateValue, TelemMessage};
use tracing::{debug, info, warn};

use crate::camera::CameraFollow;
use crate::config::VisualConfig;
use crate::control_panel::ControlPanel;
use crate::frames::{vec3_from_wire, FrameRotations};
use crate::grid::{GridConfig, TilingGrid};
use crate::intent::{Intent, Route};
use crate::registry::{ComponentRegistry, RebuildReport, SyncReport};
use crate::session::{SessionEvent, SessionState, Transport, TransportSession};
use crate::tree::SceneTree;
use crate::vehicle::Vehicle;

#[derive(Debug, Clone)]
pub struct DirectorSettings {
    pub url: String,
    pub visuals: VisualConfig,
    pub grid: GridConfig,
}

impl Default for DirectorSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9000".to_string(),
            visuals: VisualConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

/// What one [`SceneDirector::pump`] applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpReport {
    pub statuses: Vec<SessionState>,
    pub builds: usize,
    pub telems: usize,
    pub unknown: usize,
}

impl PumpReport {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.builds == 0 && self.telems == 0 && self.unknown == 0
    }
}

/// Owns the scene, the components, the connection and the control-panel
/// model. Everything that mutates the scene happens inside `&mut self`
/// calls, so a renderer that reads the tree between calls never sees half a
/// frame.
#[derive(Debug)]
pub struct SceneDirector<T> {
    tree: SceneTree,
    vehicle: Vehicle,
    registry: ComponentRegistry,
    grid: TilingGrid,
    session: TransportSession<T>,
    camera: CameraFollow,
    panel: ControlPanel,
    visuals: VisualConfig,
    light_helpers: bool,
    needs_resync: bool,
    dropped: bool,
}

impl<T: Transport> SceneDirector<T> {
    pub fn new(transport: T, settings: DirectorSettings) -> Self {
        let mut tree = SceneTree::new();
        let visuals = settings.visuals;
        let vehicle = Vehicle::spawn(&mut tree, &visuals);
        let registry = ComponentRegistry::new(&mut tree, vehicle.hosts(), &visuals);
        let root = tree.root();
        let grid = TilingGrid::spawn(&mut tree, root, settings.grid, &visuals);
        Self {
            tree,
            vehicle,
            registry,
            grid,
            session: TransportSession::new(transport),
            camera: CameraFollow::default(),
            panel: ControlPanel::new(settings.url),
            visuals,
            light_helpers: true,
            needs_resync: true,
            dropped: false,
        }
    }

    /// Connects to the URL in the control panel.
    pub fn connect(&mut self) -> bool {
        let url = self.panel.url.clone();
        self.connect_to(&url)
    }

    fn connect_to(&mut self, url: &str) -> bool {
        self.panel.url = url.to_string();
        match self.session.connect(url) {
            Ok(events) => {
                for event in events {
                    self.dispatch(event, &mut PumpReport::default());
                }
                true
            }
            Err(err) => {
                warn!(?err, url, "connect request rejected");
                for event in self.session.take_backlog() {
                    self.dispatch(event, &mut PumpReport::default());
                }
                false
            }
        }
    }

    /// Applies everything the transport delivered since the last call.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        for event in self.session.pump() {
            self.dispatch(event, &mut report);
        }
        report
    }

    fn dispatch(&mut self, event: SessionEvent, report: &mut PumpReport) {
        match event {
            SessionEvent::Status(state) => {
                self.on_status(state);
                report.statuses.push(state);
            }
            SessionEvent::Message(msg) => match msg {
                ServerMessage::Build(build) => {
                    self.apply_build(&build);
                    report.builds += 1;
                }
                ServerMessage::Telem(telem) => {
                    self.apply_telem(&telem);
                    report.telems += 1;
                }
                ServerMessage::Unknown => {
                    warn!("unknown message kind received, ignoring");
                    report.unknown += 1;
                }
            },
        }
    }

    fn on_status(&mut self, state: SessionState) {
        match state {
            SessionState::Disconnected | SessionState::Error => self.dropped = true,
            SessionState::Connected if self.dropped => {
                self.needs_resync = true;
                self.dropped = false;
            }
            _ => {}
        }
        self.panel.set_status(state);
    }

    pub fn apply_build(&mut self, msg: &BuildMessage) -> RebuildReport {
        self.vehicle.apply_build(&mut self.tree, msg);
        let report = self.registry.rebuild(&mut self.tree, msg);
        self.panel.apply_build(msg);
        info!(
            panels = report.created.len(),
            disposed = report.disposed.len(),
            generation = self.registry.generation(),
            "build applied"
        );
        report
    }

    pub fn apply_telem(&mut self, msg: &TelemMessage) -> SyncReport {
        let frames = FrameRotations::from_telem(msg);
        let position = vec3_from_wire(&msg.r);
        self.vehicle.apply_frames(&mut self.tree, &frames, position);
        let report = self.registry.sync_telem(&mut self.tree, msg, &frames);
        self.grid.update(&mut self.tree, self.vehicle.position());
        self.camera.observe(self.vehicle.position());

        self.panel.apply_telem(msg);
        if self.needs_resync {
            debug!("copying live state into control fields");
            self.panel.sync_control_states();
            self.needs_resync = false;
        }
        self.registry.sync_visuals(&mut self.tree, &self.visuals);
        report
    }

    /// Where `intent` goes, given the current control fields.
    pub fn route(&self, intent: &Intent) -> Route {
        let set = |state, value| Route::Wire(ClientMessage::Set { state, value });
        match intent {
            Intent::Connect(url) => Route::Connect(url.clone()),
            Intent::ToggleRun => Route::Wire(ClientMessage::Sim),
            Intent::Step => Route::Wire(ClientMessage::Step {
                dt: self.panel.controls.dt,
            }),
            Intent::Reset => Route::Wire(ClientMessage::Reset),
            Intent::Reinitialize => Route::Wire(ClientMessage::Reinit),
            Intent::Export => Route::Wire(ClientMessage::Export),
            Intent::SetState(name) => Route::Wire(self.panel.set_state_message(*name)),
            Intent::SetRate(rate) => set(StateName::Rate, StateValue::Scalar(*rate)),
            Intent::SetInput { x, y } => set(
                StateName::Input,
                StateValue::Planar {
                    x: x.clamp(-1.0, 1.0),
                    y: y.clamp(-1.0, 1.0),
                },
            ),
            _ => Route::Local,
        }
    }

    /// Carries out one user intent: either a wire request or a local scene
    /// change, never both.
    pub fn handle_intent(&mut self, intent: Intent) -> Route {
        match &intent {
            Intent::SetRate(rate) => self.panel.controls.rate = *rate,
            Intent::SetInput { x, y } => {
                self.panel.controls.input = bevy_math::Vec2::new(*x, *y);
            }
            Intent::Reset => self.needs_resync = true,
            _ => {}
        }
        let route = self.route(&intent);
        match &route {
            Route::Connect(url) => {
                self.connect_to(url);
            }
            Route::Wire(msg) => {
                if !self.session.send(msg) {
                    debug!(?intent, "request dropped, not connected");
                }
            }
            Route::Local => self.apply_local(intent),
        }
        route
    }

    fn apply_local(&mut self, intent: Intent) {
        match intent {
            Intent::RefocusCamera => self.camera.request_refocus(),
            Intent::ToggleCameraFollow => {
                self.camera.toggle();
            }
            Intent::ToggleWaterplane => {
                self.grid.toggle_waterplane(&mut self.tree);
            }
            Intent::ToggleGrid => {
                self.grid.toggle_grid(&mut self.tree);
            }
            Intent::ToggleBodyAxes => self.vehicle.body_axes().toggle(&mut self.tree),
            Intent::ToggleFixedAxes => self.vehicle.fixed_axes().toggle(&mut self.tree),
            Intent::ToggleLightHelpers => self.light_helpers = !self.light_helpers,
            Intent::ToggleMesh(which) => {
                self.vehicle.toggle_mesh(&mut self.tree, which);
            }
            Intent::ToggleLayer(layer) => {
                self.registry.toggle(&mut self.tree, layer);
            }
            Intent::SetVisuals(visuals) => self.set_visuals(visuals),
            other => debug!(?other, "not a local intent"),
        }
    }

    /// Replaces the display settings and pushes them everywhere.
    pub fn set_visuals(&mut self, visuals: VisualConfig) {
        self.visuals = visuals;
        self.registry.sync_visuals(&mut self.tree, &visuals);
        self.grid.sync_visuals(&mut self.tree, &visuals);
        self.vehicle.sync_visuals(&mut self.tree, &visuals);
    }

    /// Closes the connection from this side.
    pub fn disconnect(&mut self) {
        for event in self.session.close() {
            self.dispatch(event, &mut PumpReport::default());
        }
    }

    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SceneTree {
        &mut self.tree
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn grid(&self) -> &TilingGrid {
        &self.grid
    }

    pub fn session(&self) -> &TransportSession<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut TransportSession<T> {
        &mut self.session
    }

    pub fn camera(&self) -> &CameraFollow {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraFollow {
        &mut self.camera
    }

    pub fn control_panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn control_panel_mut(&mut self) -> &mut ControlPanel {
        &mut self.panel
    }

    pub fn visuals(&self) -> &VisualConfig {
        &self.visuals
    }

    /// Lights live in the renderer, not the tree; this only says whether
    /// their outlines should be drawn.
    pub fn light_helpers_shown(&self) -> bool {
        self.light_helpers
    }

    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Vehicle position as of the last telemetry frame.
    pub fn vehicle_position(&self) -> Vec3 {
        self.vehicle.position()
    }
}
