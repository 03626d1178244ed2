//! Vehicle frame groups, static meshes and reference axes.

use bevy_math::Vec3;
use protocol::BuildMessage;

use crate::config::VisualConfig;
use crate::frames::{rotation_from_mat3, vec3_from_wire, FrameRotations};
use crate::intent::MeshToggle;
use crate::primitives::Axes;
use crate::registry::Hosts;
use crate::tree::{MeshAsset, NodeId, SceneTree, Shape};

/// The body node follows `C0b` and `r`; the rear-axle node sits at `r_ra`
/// inside it and follows `Cra_b`. Mesh files are modelled about their own
/// origin and shifted so the centre of mass lands on the body origin.
#[derive(Debug, Clone)]
pub struct Vehicle {
    body: NodeId,
    rear_axle: NodeId,
    hull_mesh: NodeId,
    wing_mesh: NodeId,
    rear_wing_mesh: NodeId,
    body_axes: Axes,
    fixed_axes: Axes,
    r_cm: Vec3,
    r_ra: Vec3,
    position: Vec3,
}

impl Vehicle {
    pub fn spawn(tree: &mut SceneTree, visuals: &VisualConfig) -> Self {
        let root = tree.root();
        let body = tree.spawn(root, Shape::Group);
        let rear_axle = tree.spawn(body, Shape::Group);
        let hull_mesh = tree.spawn(body, Shape::Asset(MeshAsset::Hull));
        let wing_mesh = tree.spawn(body, Shape::Asset(MeshAsset::Wing));
        let rear_wing_mesh = tree.spawn(rear_axle, Shape::Asset(MeshAsset::RearWing));
        let body_axes = Axes::spawn(tree, body, visuals.body_axes_scale);
        let fixed_axes = Axes::spawn(tree, root, visuals.body_axes_scale);
        let vehicle = Self {
            body,
            rear_axle,
            hull_mesh,
            wing_mesh,
            rear_wing_mesh,
            body_axes,
            fixed_axes,
            r_cm: Vec3::ZERO,
            r_ra: Vec3::ZERO,
            position: Vec3::ZERO,
        };
        vehicle.sync_visuals(tree, visuals);
        vehicle
    }

    pub fn hosts(&self) -> Hosts {
        Hosts {
            body: self.body,
            rear_axle: self.rear_axle,
        }
    }

    pub fn apply_build(&mut self, tree: &mut SceneTree, msg: &BuildMessage) {
        self.r_cm = vec3_from_wire(&msg.r_cm);
        self.r_ra = vec3_from_wire(&msg.r_ra);
        tree.set_translation(self.rear_axle, self.r_ra);
        tree.set_translation(self.hull_mesh, -self.r_cm);
        tree.set_translation(self.wing_mesh, -self.r_cm);
        tree.set_translation(self.rear_wing_mesh, -(self.r_cm + self.r_ra));
    }

    pub fn apply_frames(&mut self, tree: &mut SceneTree, frames: &FrameRotations, position: Vec3) {
        if position.is_finite() {
            self.position = position;
        }
        tree.set_rotation(self.body, rotation_from_mat3(frames.body_to_world));
        tree.set_translation(self.body, self.position);
        tree.set_rotation(self.rear_axle, rotation_from_mat3(frames.rear_axle_to_body()));
    }

    pub fn sync_visuals(&self, tree: &mut SceneTree, visuals: &VisualConfig) {
        for mesh in [self.hull_mesh, self.wing_mesh, self.rear_wing_mesh] {
            tree.set_opacity(mesh, visuals.stl_opacity);
        }
        self.body_axes.set_scale(tree, visuals.body_axes_scale);
        self.fixed_axes.set_scale(tree, visuals.body_axes_scale);
    }

    pub fn mesh(&self, which: MeshToggle) -> NodeId {
        match which {
            MeshToggle::Hull => self.hull_mesh,
            MeshToggle::Wing => self.wing_mesh,
            MeshToggle::RearWing => self.rear_wing_mesh,
        }
    }

    pub fn toggle_mesh(&self, tree: &mut SceneTree, which: MeshToggle) -> Option<bool> {
        tree.toggle_visible(self.mesh(which))
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn rear_axle(&self) -> NodeId {
        self.rear_axle
    }

    pub fn body_axes(&self) -> &Axes {
        &self.body_axes
    }

    pub fn fixed_axes(&self) -> &Axes {
        &self.fixed_axes
    }

    pub fn r_cm(&self) -> Vec3 {
        self.r_cm
    }

    pub fn r_ra(&self) -> Vec3 {
        self.r_ra
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Mat3;

    #[test]
    fn meshes_are_shifted_by_build_offsets() {
        let mut tree = SceneTree::new();
        let mut vehicle = Vehicle::spawn(&mut tree, &VisualConfig::default());
        let msg = BuildMessage {
            r_cm: [1.0, 0.0, 0.2],
            r_ra: [-2.0, 0.0, 0.0],
            ..Default::default()
        };
        vehicle.apply_build(&mut tree, &msg);
        let at = |id| tree.get(id).unwrap().transform().translation;
        assert_eq!(at(vehicle.rear_axle()), Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(at(vehicle.mesh(MeshToggle::Hull)), Vec3::new(-1.0, 0.0, -0.2));
        assert_eq!(at(vehicle.mesh(MeshToggle::RearWing)), Vec3::new(1.0, 0.0, -0.2));

        // the rear wing ends up where the hull mesh would put it
        let world = tree
            .world_transform(vehicle.mesh(MeshToggle::RearWing))
            .unwrap();
        assert!((Vec3::from(world.translation) - Vec3::new(-1.0, 0.0, -0.2)).length() < 1e-6);
    }

    #[test]
    fn rear_axle_rotates_by_transpose() {
        let mut tree = SceneTree::new();
        let mut vehicle = Vehicle::spawn(&mut tree, &VisualConfig::default());
        let cra_b = Mat3::from_rotation_z(0.2);
        let frames = FrameRotations {
            body_to_world: Mat3::IDENTITY,
            body_to_rear_axle: cra_b,
        };
        vehicle.apply_frames(&mut tree, &frames, Vec3::new(3.0, 0.0, 0.0));
        let rot = tree.get(vehicle.rear_axle()).unwrap().transform().rotation;
        assert!((rot * Vec3::X - cra_b.transpose() * Vec3::X).length() < 1e-5);
        assert_eq!(vehicle.position(), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn mesh_toggles_are_independent() {
        let mut tree = SceneTree::new();
        let vehicle = Vehicle::spawn(&mut tree, &VisualConfig::default());
        assert_eq!(vehicle.toggle_mesh(&mut tree, MeshToggle::Wing), Some(false));
        assert!(tree.is_shown(vehicle.mesh(MeshToggle::Hull)));
        assert!(!tree.is_shown(vehicle.mesh(MeshToggle::Wing)));
    }
}
