use bevy_math::Vec3;
use protocol::{HullBuild, HullTelem};

use super::{Disposables, SceneComponent};
use crate::config::VisualConfig;
use crate::frames::{mat3_from_wire, vec3_from_wire};
use crate::primitives::{Arrow, Axes};
use crate::tree::{NodeId, SceneTree};

/// Hull loads: hydrodynamic at the wetted-area centroid, buoyant at the
/// displaced-volume centroid, planing at the build's `r_surf`.
#[derive(Debug, Clone)]
pub struct Hull {
    r_surf: Vec3,
    telem: HullTelem,
    visuals: VisualConfig,
    water_axes: Axes,
    surf_axes: Axes,
    hydro_force: Arrow,
    hydro_moment: Arrow,
    buoyant_force: Arrow,
    buoyant_moment: Arrow,
    surf_force: Arrow,
    surf_moment: Arrow,
    disposables: Disposables,
}

impl Hull {
    pub fn new(tree: &mut SceneTree, host: NodeId, visuals: &VisualConfig) -> Self {
        let mut disposables = Disposables::default();
        let axes = |tree: &mut SceneTree, d: &mut Disposables| {
            let a = Axes::spawn(tree, host, visuals.hull_axes_scale);
            d.track(a.root());
            a
        };
        let water_axes = axes(tree, &mut disposables);
        let surf_axes = axes(tree, &mut disposables);
        let arrow = |tree: &mut SceneTree, d: &mut Disposables, color| {
            let a = Arrow::spawn(tree, host, color);
            d.track(a.root());
            a
        };
        let hydro_force = arrow(tree, &mut disposables, visuals.force_color);
        let hydro_moment = arrow(tree, &mut disposables, visuals.moment_color);
        let buoyant_force = arrow(tree, &mut disposables, visuals.force_color);
        let buoyant_moment = arrow(tree, &mut disposables, visuals.moment_color);
        let surf_force = arrow(tree, &mut disposables, visuals.force_color);
        let surf_moment = arrow(tree, &mut disposables, visuals.moment_color);

        let mut hull = Self {
            r_surf: Vec3::ZERO,
            telem: HullTelem::default(),
            visuals: *visuals,
            water_axes,
            surf_axes,
            hydro_force,
            hydro_moment,
            buoyant_force,
            buoyant_moment,
            surf_force,
            surf_moment,
            disposables,
        };
        hull.sync_visuals(tree, visuals);
        hull
    }

    pub fn build(&mut self, tree: &mut SceneTree, spec: &HullBuild) {
        self.r_surf = vec3_from_wire(&spec.r_surf);
        self.surf_axes.set_origin(tree, self.r_surf);
        self.surf_force.set_origin(tree, self.r_surf);
        self.surf_moment.set_origin(tree, self.r_surf);
    }

    pub fn sync_telem(&mut self, tree: &mut SceneTree, telem: &HullTelem) {
        self.telem = *telem;
        let v = &self.visuals;
        let area_center = vec3_from_wire(&telem.area_center);
        let vol_center = vec3_from_wire(&telem.vol_center);

        self.water_axes.set_origin(tree, area_center);
        self.water_axes.set_rot_mat(tree, mat3_from_wire(&telem.cbw));
        self.surf_axes.set_rot_mat(tree, mat3_from_wire(&telem.surf.cbw));

        self.hydro_force.set_origin(tree, area_center);
        self.hydro_force
            .set_point(tree, vec3_from_wire(&telem.hydro_force), v.force_scale);
        self.hydro_moment.set_origin(tree, area_center);
        self.hydro_moment
            .set_point(tree, vec3_from_wire(&telem.hydro_moment), v.moment_scale);

        self.buoyant_force.set_origin(tree, vol_center);
        self.buoyant_force
            .set_point(tree, vec3_from_wire(&telem.buoyant_force), v.force_scale);
        self.buoyant_moment.set_origin(tree, vol_center);
        self.buoyant_moment
            .set_point(tree, vec3_from_wire(&telem.buoyant_moment), v.moment_scale);

        self.surf_force
            .set_point(tree, vec3_from_wire(&telem.surf.force), v.force_scale);
        self.surf_moment
            .set_point(tree, vec3_from_wire(&telem.surf.moment), v.moment_scale);
    }

    pub fn r_surf(&self) -> Vec3 {
        self.r_surf
    }

    pub fn telem(&self) -> &HullTelem {
        &self.telem
    }

    pub fn water_axes(&self) -> &Axes {
        &self.water_axes
    }

    pub fn surf_axes(&self) -> &Axes {
        &self.surf_axes
    }

    pub fn forces(&self) -> [&Arrow; 3] {
        [&self.hydro_force, &self.buoyant_force, &self.surf_force]
    }

    pub fn moments(&self) -> [&Arrow; 3] {
        [&self.hydro_moment, &self.buoyant_moment, &self.surf_moment]
    }
}

impl SceneComponent for Hull {
    fn disposables(&self) -> &Disposables {
        &self.disposables
    }

    fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig) {
        self.visuals = *visuals;
        self.water_axes.set_scale(tree, visuals.hull_axes_scale);
        self.surf_axes.set_scale(tree, visuals.hull_axes_scale);
        for force in [
            &mut self.hydro_force,
            &mut self.buoyant_force,
            &mut self.surf_force,
        ] {
            force.set_scale(tree, visuals.force_scale);
            force.set_color(tree, visuals.force_color);
        }
        for moment in [
            &mut self.hydro_moment,
            &mut self.buoyant_moment,
            &mut self.surf_moment,
        ] {
            moment.set_scale(tree, visuals.moment_scale);
            moment.set_color(tree, visuals.moment_color);
        }
    }

    fn toggle_axes(&self, tree: &mut SceneTree) {
        self.water_axes.toggle(tree);
        self.surf_axes.toggle(tree);
    }

    fn toggle_forces(&self, tree: &mut SceneTree) {
        for force in self.forces() {
            force.toggle(tree);
        }
    }

    fn toggle_moments(&self, tree: &mut SceneTree) {
        for moment in self.moments() {
            moment.toggle(tree);
        }
    }
}
