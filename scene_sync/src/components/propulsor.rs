use bevy_color::{Mix, Srgba};
use bevy_math::{Mat3, Vec3};
use protocol::{PropulsorBuild, PropulsorTelem};

use super::{Disposables, SceneComponent};
use crate::config::VisualConfig;
use crate::frames::{mat3_from_wire, vec3_from_wire};
use crate::primitives::{Arrow, Axes};
use crate::tree::{NodeId, SceneTree, Shape};

/// Propeller on the rear axle: a disc sized by the diameter and tinted by
/// how much of it is submerged, plus its water axes and loads.
#[derive(Debug, Clone)]
pub struct Propulsor {
    r_prop: Vec3,
    diameter: f32,
    telem: PropulsorTelem,
    visuals: VisualConfig,
    disc: NodeId,
    water_axes: Axes,
    force: Arrow,
    moment: Arrow,
    submergence: Arrow,
    disposables: Disposables,
}

impl Propulsor {
    pub fn new(tree: &mut SceneTree, host: NodeId, visuals: &VisualConfig) -> Self {
        let mut disposables = Disposables::default();
        let disc = disposables.track(tree.spawn(host, Shape::Disc));
        let water_axes = Axes::spawn(tree, host, visuals.prop_axes_scale);
        disposables.track(water_axes.root());
        let force = Arrow::spawn(tree, host, visuals.force_color);
        disposables.track(force.root());
        let moment = Arrow::spawn(tree, host, visuals.moment_color);
        disposables.track(moment.root());
        let submergence = Arrow::spawn(tree, host, visuals.sub_color);
        disposables.track(submergence.root());

        let mut prop = Self {
            r_prop: Vec3::ZERO,
            diameter: 0.0,
            telem: PropulsorTelem::default(),
            visuals: *visuals,
            disc,
            water_axes,
            force,
            moment,
            submergence,
            disposables,
        };
        prop.build(
            tree,
            &PropulsorBuild {
                r_prop: [0.0; 3],
                d: 0.0,
            },
        );
        prop.sync_visuals(tree, visuals);
        prop
    }

    pub fn build(&mut self, tree: &mut SceneTree, spec: &PropulsorBuild) {
        self.r_prop = vec3_from_wire(&spec.r_prop);
        self.diameter = spec.d.max(0.0);
        tree.set_translation(self.disc, self.r_prop);
        tree.set_scale(self.disc, Vec3::splat(self.diameter / 2.0));
        self.water_axes.set_origin(tree, self.r_prop);
        self.force.set_origin(tree, self.r_prop);
        self.moment.set_origin(tree, self.r_prop);
        self.submergence.set_origin(tree, self.r_prop);
    }

    /// `to_host` is `Cra_b`: loads arrive in the body frame, the propulsor
    /// hangs under the rear-axle node. `Cra_w` is already rear-axle relative.
    pub fn sync_telem(&mut self, tree: &mut SceneTree, telem: &PropulsorTelem, to_host: Mat3) {
        self.telem = *telem;
        let v = &self.visuals;
        self.water_axes.set_rot_mat(tree, mat3_from_wire(&telem.cra_w));
        self.force
            .set_point(tree, to_host * vec3_from_wire(&telem.force), v.force_scale);
        self.moment
            .set_point(tree, to_host * vec3_from_wire(&telem.moment), v.moment_scale);
        self.submergence
            .set_point(tree, Vec3::Z * self.fraction(), v.submergence_scale);
        tree.set_color(self.disc, self.disc_color());
    }

    /// Submerged fraction of the disc, clamped to [0, 1].
    pub fn fraction(&self) -> f32 {
        let fp = self.telem.fp;
        if fp.is_nan() {
            0.0
        } else {
            fp.clamp(0.0, 1.0)
        }
    }

    pub fn disc_color(&self) -> Srgba {
        self.visuals
            .surf_color
            .mix(&self.visuals.sub_color, self.fraction())
    }

    pub fn rpm(&self) -> f32 {
        self.telem.n * 60.0
    }

    pub fn current(&self) -> f32 {
        self.telem.current
    }

    pub fn voltage(&self) -> f32 {
        self.telem.voltage
    }

    pub fn thrust(&self) -> f32 {
        self.telem.thrust
    }

    pub fn torque(&self) -> f32 {
        self.telem.torque
    }

    pub fn diameter(&self) -> f32 {
        self.diameter
    }

    pub fn telem(&self) -> &PropulsorTelem {
        &self.telem
    }

    pub fn disc(&self) -> NodeId {
        self.disc
    }

    pub fn water_axes(&self) -> &Axes {
        &self.water_axes
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

    pub fn toggle_submergence(&self, tree: &mut SceneTree) {
        self.submergence.toggle(tree);
    }
}

impl SceneComponent for Propulsor {
    fn disposables(&self) -> &Disposables {
        &self.disposables
    }

    fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig) {
        self.visuals = *visuals;
        self.water_axes.set_scale(tree, visuals.prop_axes_scale);
        self.force.set_scale(tree, visuals.force_scale);
        self.force.set_color(tree, visuals.force_color);
        self.moment.set_scale(tree, visuals.moment_scale);
        self.moment.set_color(tree, visuals.moment_color);
        self.submergence.set_scale(tree, visuals.submergence_scale);
        self.submergence.set_color(tree, visuals.sub_color);
        tree.set_color(self.disc, self.disc_color());
    }

    fn toggle_axes(&self, tree: &mut SceneTree) {
        self.water_axes.toggle(tree);
    }

    fn toggle_forces(&self, tree: &mut SceneTree) {
        self.force.toggle(tree);
    }

    fn toggle_moments(&self, tree: &mut SceneTree) {
        self.moment.toggle(tree);
    }
}
