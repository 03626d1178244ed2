use protocol::WingRootTelem;

use super::{Disposables, SceneComponent};
use crate::config::VisualConfig;
use crate::frames::{mat3_from_wire, vec3_from_wire};
use crate::primitives::{Arrow, Axes};
use crate::tree::{NodeId, SceneTree};

/// Junction between a wing and its strut. Foil loads act at the wetted-area
/// centroid, buoyancy at the displaced-volume centroid.
#[derive(Debug, Clone)]
pub struct WingRoot {
    telem: WingRootTelem,
    visuals: VisualConfig,
    water_axes: Axes,
    foil_force: Arrow,
    foil_moment: Arrow,
    buoyant_force: Arrow,
    buoyant_moment: Arrow,
    disposables: Disposables,
}

impl WingRoot {
    pub fn new(tree: &mut SceneTree, host: NodeId, visuals: &VisualConfig) -> Self {
        let mut disposables = Disposables::default();
        let water_axes = Axes::spawn(tree, host, visuals.foil_axes_scale);
        disposables.track(water_axes.root());
        let foil_force = Arrow::spawn(tree, host, visuals.force_color);
        disposables.track(foil_force.root());
        let foil_moment = Arrow::spawn(tree, host, visuals.moment_color);
        disposables.track(foil_moment.root());
        let buoyant_force = Arrow::spawn(tree, host, visuals.force_color);
        disposables.track(buoyant_force.root());
        let buoyant_moment = Arrow::spawn(tree, host, visuals.moment_color);
        disposables.track(buoyant_moment.root());

        let mut root = Self {
            telem: WingRootTelem::default(),
            visuals: *visuals,
            water_axes,
            foil_force,
            foil_moment,
            buoyant_force,
            buoyant_moment,
            disposables,
        };
        root.sync_visuals(tree, visuals);
        root
    }

    /// Wing roots carry no static geometry; a new build only clears the loads
    /// left over from the previous model.
    pub fn build(&mut self, tree: &mut SceneTree) {
        self.sync_telem(tree, &WingRootTelem::default());
    }

    pub fn sync_telem(&mut self, tree: &mut SceneTree, telem: &WingRootTelem) {
        self.telem = *telem;
        let v = &self.visuals;
        let area_center = vec3_from_wire(&telem.area_center);
        let vol_center = vec3_from_wire(&telem.vol_center);

        self.water_axes.set_origin(tree, area_center);
        self.water_axes.set_rot_mat(tree, mat3_from_wire(&telem.cbw));

        self.foil_force.set_origin(tree, area_center);
        self.foil_force
            .set_point(tree, vec3_from_wire(&telem.foil_force), v.force_scale);
        self.foil_moment.set_origin(tree, area_center);
        self.foil_moment
            .set_point(tree, vec3_from_wire(&telem.foil_moment), v.moment_scale);

        self.buoyant_force.set_origin(tree, vol_center);
        self.buoyant_force
            .set_point(tree, vec3_from_wire(&telem.buoyant_force), v.force_scale);
        self.buoyant_moment.set_origin(tree, vol_center);
        self.buoyant_moment
            .set_point(tree, vec3_from_wire(&telem.buoyant_moment), v.moment_scale);
    }

    pub fn telem(&self) -> &WingRootTelem {
        &self.telem
    }

    pub fn water_axes(&self) -> &Axes {
        &self.water_axes
    }

    pub fn forces(&self) -> [&Arrow; 2] {
        [&self.foil_force, &self.buoyant_force]
    }

    pub fn moments(&self) -> [&Arrow; 2] {
        [&self.foil_moment, &self.buoyant_moment]
    }
}

impl SceneComponent for WingRoot {
    fn disposables(&self) -> &Disposables {
        &self.disposables
    }

    fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig) {
        self.visuals = *visuals;
        self.water_axes.set_scale(tree, visuals.foil_axes_scale);
        for force in [&mut self.foil_force, &mut self.buoyant_force] {
            force.set_scale(tree, visuals.force_scale);
            force.set_color(tree, visuals.force_color);
        }
        for moment in [&mut self.foil_moment, &mut self.buoyant_moment] {
            moment.set_scale(tree, visuals.moment_scale);
            moment.set_color(tree, visuals.moment_color);
        }
    }

    fn toggle_axes(&self, tree: &mut SceneTree) {
        self.water_axes.toggle(tree);
    }

    fn toggle_forces(&self, tree: &mut SceneTree) {
        self.foil_force.toggle(tree);
        self.buoyant_force.toggle(tree);
    }

    fn toggle_moments(&self, tree: &mut SceneTree) {
        self.foil_moment.toggle(tree);
        self.buoyant_moment.toggle(tree);
    }
}
