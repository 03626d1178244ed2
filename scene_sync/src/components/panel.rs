use bevy_math::{Mat3, Vec3};
use protocol::{PanelBuild, PanelTelem};
use tracing::debug;

use super::{Disposables, SceneComponent};
use crate::config::VisualConfig;
use crate::frames::{mat3_from_wire, vec3_from_wire};
use crate::primitives::{Arrow, Axes};
use crate::tree::{NodeId, SceneTree, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Panel ids end in `L` or `R` (`"1L"`, `"r2R"`, `"vL"`).
    pub fn from_id(id: &str) -> Option<Self> {
        match id.chars().last()? {
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            _ => None,
        }
    }

    fn sign(side: Option<Self>) -> f32 {
        match side {
            Some(Self::Right) => -1.0,
            _ => 1.0,
        }
    }
}

/// Two triangles covering the quad `r1 r2 r3 r4`, split along `r1`-`r3`.
pub fn quad_triangles(r1: Vec3, r2: Vec3, r3: Vec3, r4: Vec3) -> [Vec3; 6] {
    [r1, r2, r3, r3, r4, r1]
}

pub fn triangles_area(verts: &[Vec3]) -> f32 {
    verts
        .chunks_exact(3)
        .map(|t| 0.5 * (t[1] - t[0]).cross(t[2] - t[0]).length())
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelCorners {
    pub le_1: Vec3,
    pub le_2: Vec3,
    pub te_1: Vec3,
    pub te_2: Vec3,
}

/// Wetted and dry parts of a panel for one submergence fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSplit {
    pub wet: [Vec3; 6],
    pub dry: [Vec3; 6],
    pub le_f: Vec3,
    pub te_f: Vec3,
}

impl PanelCorners {
    pub fn from_build(spec: &PanelBuild) -> Self {
        Self {
            le_1: vec3_from_wire(&spec.r_le_1),
            le_2: vec3_from_wire(&spec.r_le_2),
            te_1: vec3_from_wire(&spec.r_te_1),
            te_2: vec3_from_wire(&spec.r_te_2),
        }
    }

    /// Outward normal; right-hand panels are mirrored so both sides point out.
    pub fn normal(&self, side: Option<Side>) -> Vec3 {
        let n = (self.te_1 - self.le_1).cross(self.le_2 - self.le_1);
        n.normalize_or_zero() * Side::sign(side)
    }

    pub fn area(&self) -> f32 {
        triangles_area(&quad_triangles(self.le_1, self.te_1, self.te_2, self.le_2))
    }

    /// Splits the panel `f` of the way from its lower end. `one_lower` says
    /// the end at corners 1 is the lower, wetted one. `f` must be in [0, 1].
    pub fn split(&self, f: f32, one_lower: bool) -> PanelSplit {
        let (wet_le, wet_te, dry_le, dry_te) = if one_lower {
            (self.le_1, self.te_1, self.le_2, self.te_2)
        } else {
            (self.le_2, self.te_2, self.le_1, self.te_1)
        };
        let le_f = wet_le.lerp(dry_le, f);
        let te_f = wet_te.lerp(dry_te, f);
        PanelSplit {
            wet: quad_triangles(wet_le, wet_te, te_f, le_f),
            dry: quad_triangles(le_f, te_f, dry_te, dry_le),
            le_f,
            te_f,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Uninitialized,
    Built,
    Telemetered,
}

/// One lifting-surface element: a wetted/dry mesh pair plus its water axes
/// and force, moment and submergence arrows.
#[derive(Debug, Clone)]
pub struct Panel {
    id: String,
    side: Option<Side>,
    rear: bool,
    corners: PanelCorners,
    normal: Vec3,
    state: PanelState,
    telem: PanelTelem,
    f: f32,
    visuals: VisualConfig,
    wet_mesh: NodeId,
    dry_mesh: NodeId,
    axes: Axes,
    force: Arrow,
    moment: Arrow,
    submergence: Arrow,
    disposables: Disposables,
}

impl Panel {
    /// Spawns the panel's drawables under `host`. Nothing is shaped until
    /// [`Panel::build`].
    pub fn new(tree: &mut SceneTree, id: &str, host: NodeId, visuals: &VisualConfig) -> Self {
        let mut disposables = Disposables::default();
        let wet_mesh = disposables.track(tree.spawn(host, Shape::Triangles(Vec::new())));
        let dry_mesh = disposables.track(tree.spawn(host, Shape::Triangles(Vec::new())));
        let axes = Axes::spawn(tree, host, visuals.foil_axes_scale);
        disposables.track(axes.root());
        let force = Arrow::spawn(tree, host, visuals.force_color);
        disposables.track(force.root());
        let moment = Arrow::spawn(tree, host, visuals.moment_color);
        disposables.track(moment.root());
        let submergence = Arrow::spawn(tree, host, visuals.sub_color);
        disposables.track(submergence.root());

        let side = Side::from_id(id);
        if side.is_none() {
            debug!(id, "panel id carries no side suffix");
        }

        let mut panel = Self {
            id: id.to_string(),
            side,
            rear: false,
            corners: PanelCorners::default(),
            normal: Vec3::ZERO,
            state: PanelState::Uninitialized,
            telem: PanelTelem::default(),
            f: 0.0,
            visuals: *visuals,
            wet_mesh,
            dry_mesh,
            axes,
            force,
            moment,
            submergence,
            disposables,
        };
        panel.sync_visuals(tree, visuals);
        panel
    }

    pub fn build(&mut self, tree: &mut SceneTree, spec: &PanelBuild) {
        self.corners = PanelCorners::from_build(spec);
        self.rear = spec.rear;
        self.normal = self.corners.normal(self.side);
        self.f = 0.0;
        self.write_meshes(tree, self.telem.one_lower);
        self.state = PanelState::Built;
    }

    /// `to_host` takes body-frame vectors into the frame of the node this
    /// panel hangs under: identity for body panels, `Cra_b` for rear ones.
    pub fn sync_telem(&mut self, tree: &mut SceneTree, telem: &PanelTelem, to_host: Mat3) {
        if self.state == PanelState::Uninitialized {
            debug!(id = %self.id, "telemetry for a panel that was never built");
            return;
        }
        self.telem = *telem;
        self.f = clamp_fraction(&self.id, telem.f);
        self.write_meshes(tree, telem.one_lower);

        let r_qc = vec3_from_wire(&telem.r_qc_fc);
        let v = &self.visuals;
        self.axes.set_origin(tree, r_qc);
        self.axes
            .set_rot_mat(tree, to_host * mat3_from_wire(&telem.cbw));
        self.force.set_origin(tree, r_qc);
        self.force
            .set_point(tree, to_host * vec3_from_wire(&telem.force), v.force_scale);
        self.moment.set_origin(tree, r_qc);
        self.moment
            .set_point(tree, to_host * vec3_from_wire(&telem.moment), v.moment_scale);
        self.submergence.set_origin(tree, r_qc);
        self.submergence
            .set_point(tree, self.normal * self.f, v.submergence_scale);
        self.state = PanelState::Telemetered;
    }

    fn write_meshes(&self, tree: &mut SceneTree, one_lower: bool) {
        let split = self.corners.split(self.f, one_lower);
        tree.set_vertices(self.wet_mesh, split.wet.to_vec());
        tree.set_vertices(self.dry_mesh, split.dry.to_vec());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn rear(&self) -> bool {
        self.rear
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn corners(&self) -> &PanelCorners {
        &self.corners
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Submergence fraction actually drawn, after clamping.
    pub fn fraction(&self) -> f32 {
        self.f
    }

    pub fn telem(&self) -> &PanelTelem {
        &self.telem
    }

    pub fn wet_mesh(&self) -> NodeId {
        self.wet_mesh
    }

    pub fn dry_mesh(&self) -> NodeId {
        self.dry_mesh
    }

    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    pub fn force(&self) -> &Arrow {
        &self.force
    }

    pub fn moment(&self) -> &Arrow {
        &self.moment
    }

    pub fn submergence(&self) -> &Arrow {
        &self.submergence
    }

    pub fn toggle_submerged(&self, tree: &mut SceneTree) {
        tree.toggle_visible(self.wet_mesh);
    }

    pub fn toggle_surfaced(&self, tree: &mut SceneTree) {
        tree.toggle_visible(self.dry_mesh);
    }

    pub fn toggle_submergence(&self, tree: &mut SceneTree) {
        self.submergence.toggle(tree);
    }
}

fn clamp_fraction(id: &str, f: f32) -> f32 {
    if f.is_nan() {
        debug!(id, "submergence fraction is NaN, drawing the panel dry");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&f) {
        debug!(id, f, "submergence fraction out of range, clamping");
    }
    f.clamp(0.0, 1.0)
}

impl SceneComponent for Panel {
    fn disposables(&self) -> &Disposables {
        &self.disposables
    }

    fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig) {
        self.visuals = *visuals;
        tree.set_color(self.wet_mesh, visuals.sub_color);
        tree.set_color(self.dry_mesh, visuals.surf_color);
        self.axes.set_scale(tree, visuals.foil_axes_scale);
        self.force.set_scale(tree, visuals.force_scale);
        self.force.set_color(tree, visuals.force_color);
        self.moment.set_scale(tree, visuals.moment_scale);
        self.moment.set_color(tree, visuals.moment_color);
        self.submergence.set_scale(tree, visuals.submergence_scale);
        self.submergence.set_color(tree, visuals.sub_color);
    }

    fn toggle_axes(&self, tree: &mut SceneTree) {
        self.axes.toggle(tree);
    }

    fn toggle_forces(&self, tree: &mut SceneTree) {
        self.force.toggle(tree);
    }

    fn toggle_moments(&self, tree: &mut SceneTree) {
        self.moment.toggle(tree);
    }
}
