//! Vector arrows and axis triads built from scene-tree nodes.

use bevy_color::Srgba;
use bevy_math::{Mat3, Quat, Vec3};

use crate::frames::rotation_from_mat3;
use crate::tree::{NodeId, SceneTree, Shape};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowStyle {
    /// Shaft radius of an arrow one unit long or longer.
    pub radius: f32,
    /// Head radius relative to the shaft, on top of the shaft radius.
    pub head_radius_frac: f32,
    /// Head length as a fraction of total length.
    pub head_frac: f32,
    /// Upper bound on head length.
    pub head_max: f32,
}

impl Default for ArrowStyle {
    fn default() -> Self {
        Self {
            radius: 0.01,
            head_radius_frac: 1.5,
            head_frac: 0.2,
            head_max: 0.2,
        }
    }
}

/// Shaft and head dimensions for one arrow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowGeometry {
    pub length: f32,
    pub shaft_length: f32,
    pub head_length: f32,
    pub shaft_radius: f32,
    pub head_radius: f32,
}

/// Splits a total length into shaft and head. Radius grows with the square
/// root of length up to the style radius, so short arrows stay thin without
/// vanishing.
pub fn arrow_geometry(length: f32, style: &ArrowStyle) -> ArrowGeometry {
    let length = if length.is_finite() { length.max(0.0) } else { 0.0 };
    let head_length = (length * style.head_frac).min(style.head_max);
    let shaft_radius = style.radius * length.sqrt().min(1.0);
    ArrowGeometry {
        length,
        shaft_length: length - head_length,
        head_length,
        shaft_radius,
        head_radius: shaft_radius * (1.0 + style.head_radius_frac),
    }
}

/// A vector drawn as a cylinder shaft and a cone head, pointing from its
/// origin along local +Y of its root node.
#[derive(Debug, Clone)]
pub struct Arrow {
    root: NodeId,
    shaft: NodeId,
    head: NodeId,
    style: ArrowStyle,
    vector: Vec3,
    direction: Vec3,
    scale: f32,
}

impl Arrow {
    pub fn spawn(tree: &mut SceneTree, parent: NodeId, color: Srgba) -> Self {
        Self::spawn_styled(tree, parent, color, ArrowStyle::default())
    }

    pub fn spawn_styled(
        tree: &mut SceneTree,
        parent: NodeId,
        color: Srgba,
        style: ArrowStyle,
    ) -> Self {
        let root = tree.spawn(parent, Shape::Group);
        let shaft = tree.spawn(root, Shape::Cylinder);
        let head = tree.spawn(root, Shape::Cone);
        let arrow = Self {
            root,
            shaft,
            head,
            style,
            vector: Vec3::ZERO,
            direction: Vec3::Y,
            scale: 1.0,
        };
        arrow.set_color(tree, color);
        arrow.apply_length(tree);
        arrow
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn vector(&self) -> Vec3 {
        self.vector
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn length(&self) -> f32 {
        self.vector.length() * self.scale
    }

    /// Points the arrow along `vector` with length `|vector| * scale`. A zero
    /// or non-finite vector keeps the previous direction.
    pub fn set_point(&mut self, tree: &mut SceneTree, vector: Vec3, scale: f32) {
        self.vector = if vector.is_finite() { vector } else { Vec3::ZERO };
        if let Some(dir) = self.vector.try_normalize() {
            self.direction = dir;
        }
        tree.set_rotation(self.root, Quat::from_rotation_arc(Vec3::Y, self.direction));
        self.scale = scale;
        self.apply_length(tree);
    }

    /// Rescales length only.
    pub fn set_scale(&mut self, tree: &mut SceneTree, scale: f32) {
        self.scale = scale;
        self.apply_length(tree);
    }

    pub fn set_origin(&self, tree: &mut SceneTree, origin: Vec3) {
        tree.set_translation(self.root, origin);
    }

    pub fn set_color(&self, tree: &mut SceneTree, color: Srgba) {
        tree.set_color(self.shaft, color);
        tree.set_color(self.head, color);
    }

    pub fn set_visible(&self, tree: &mut SceneTree, visible: bool) {
        tree.set_visible(self.root, visible);
    }

    pub fn toggle(&self, tree: &mut SceneTree) {
        tree.toggle_visible(self.root);
    }

    pub fn geometry(&self) -> ArrowGeometry {
        arrow_geometry(self.length(), &self.style)
    }

    fn apply_length(&self, tree: &mut SceneTree) {
        let g = self.geometry();
        tree.set_translation(self.shaft, Vec3::new(0.0, g.shaft_length / 2.0, 0.0));
        tree.set_scale(
            self.shaft,
            Vec3::new(g.shaft_radius, g.shaft_length, g.shaft_radius),
        );
        tree.set_translation(
            self.head,
            Vec3::new(0.0, g.shaft_length + g.head_length / 2.0, 0.0),
        );
        tree.set_scale(
            self.head,
            Vec3::new(g.head_radius, g.head_length, g.head_radius),
        );
    }

    pub fn dispose(&self, tree: &mut SceneTree) -> bool {
        tree.dispose(self.root)
    }
}

/// Three unit arrows along local X, Y and Z.
#[derive(Debug, Clone)]
pub struct Axes {
    root: NodeId,
    arrows: [Arrow; 3],
}

impl Axes {
    pub const COLORS: [Srgba; 3] = [
        Srgba::new(1.0, 0.0, 0.0, 1.0),
        Srgba::new(0.0, 1.0, 0.0, 1.0),
        Srgba::new(0.0, 0.0, 1.0, 1.0),
    ];

    pub fn spawn(tree: &mut SceneTree, parent: NodeId, scale: f32) -> Self {
        let root = tree.spawn(parent, Shape::Group);
        let units = [Vec3::X, Vec3::Y, Vec3::Z];
        let arrows = std::array::from_fn(|i| {
            let mut arrow = Arrow::spawn(tree, root, Self::COLORS[i]);
            arrow.set_point(tree, units[i], 1.0);
            arrow
        });
        let axes = Self { root, arrows };
        axes.set_scale(tree, scale);
        axes
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn arrows(&self) -> &[Arrow; 3] {
        &self.arrows
    }

    /// Orients the triad so its arrows are the columns of `m`.
    pub fn set_rot_mat(&self, tree: &mut SceneTree, m: Mat3) {
        tree.set_rotation(self.root, rotation_from_mat3(m));
    }

    pub fn set_scale(&self, tree: &mut SceneTree, scale: f32) {
        tree.set_scale(self.root, Vec3::splat(scale));
    }

    pub fn set_origin(&self, tree: &mut SceneTree, origin: Vec3) {
        tree.set_translation(self.root, origin);
    }

    pub fn set_visible(&self, tree: &mut SceneTree, visible: bool) {
        tree.set_visible(self.root, visible);
    }

    pub fn toggle(&self, tree: &mut SceneTree) {
        tree.toggle_visible(self.root);
    }

    pub fn dispose(&self, tree: &mut SceneTree) -> bool {
        tree.dispose(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_of(tree: &SceneTree, id: NodeId) -> Vec3 {
        tree.get(id).map(|n| n.transform().scale).unwrap()
    }

    #[test]
    fn head_is_capped_for_long_arrows() {
        let style = ArrowStyle::default();
        let short = arrow_geometry(0.5, &style);
        assert!((short.head_length - 0.1).abs() < 1e-6);
        assert!((short.shaft_length - 0.4).abs() < 1e-6);

        let long = arrow_geometry(10.0, &style);
        assert_eq!(long.head_length, style.head_max);
        assert!((long.shaft_length - 9.8).abs() < 1e-5);
    }

    #[test]
    fn radius_is_sub_linear_and_capped() {
        let style = ArrowStyle::default();
        let tiny = arrow_geometry(0.04, &style);
        assert!((tiny.shaft_radius - 0.002).abs() < 1e-6);
        assert_eq!(arrow_geometry(4.0, &style).shaft_radius, style.radius);
        assert_eq!(arrow_geometry(9.0, &style).shaft_radius, style.radius);
        assert!(tiny.head_radius > tiny.shaft_radius);
    }

    #[test]
    fn set_point_orients_and_scales() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let mut arrow = Arrow::spawn(&mut tree, root, Srgba::WHITE);
        arrow.set_point(&mut tree, Vec3::new(0.0, 0.0, -200.0), 0.01);
        assert!((arrow.length() - 2.0).abs() < 1e-5);
        assert!((arrow.direction() - Vec3::NEG_Z).length() < 1e-6);

        let rot = tree.get(arrow.root()).unwrap().transform().rotation;
        assert!((rot * Vec3::Y - Vec3::NEG_Z).length() < 1e-5);

        arrow.set_scale(&mut tree, 0.005);
        assert!((arrow.length() - 1.0).abs() < 1e-5);
        assert!((arrow.direction() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn zero_vector_keeps_last_direction() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let mut arrow = Arrow::spawn(&mut tree, root, Srgba::WHITE);
        arrow.set_point(&mut tree, Vec3::X * 3.0, 1.0);
        arrow.set_point(&mut tree, Vec3::ZERO, 1.0);
        assert_eq!(arrow.direction(), Vec3::X);
        assert_eq!(arrow.length(), 0.0);
        arrow.set_point(&mut tree, Vec3::new(f32::NAN, 0.0, 0.0), 1.0);
        assert_eq!(arrow.direction(), Vec3::X);
        let shaft = tree.children(arrow.root())[0];
        assert_eq!(scale_of(&tree, shaft), Vec3::ZERO);
    }

    #[test]
    fn head_sits_on_top_of_shaft() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let mut arrow = Arrow::spawn(&mut tree, root, Srgba::WHITE);
        arrow.set_point(&mut tree, Vec3::Y, 1.0);
        let kids = tree.children(arrow.root()).to_vec();
        let shaft = *tree.get(kids[0]).unwrap().transform();
        let head = *tree.get(kids[1]).unwrap().transform();
        let shaft_top = shaft.translation.y + shaft.scale.y / 2.0;
        let head_bottom = head.translation.y - head.scale.y / 2.0;
        assert!((shaft_top - head_bottom).abs() < 1e-6);
        assert!((head.translation.y + head.scale.y / 2.0 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn axes_follow_rotation_matrix_columns() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let axes = Axes::spawn(&mut tree, root, 0.5);
        assert_eq!(scale_of(&tree, axes.root()), Vec3::splat(0.5));
        // x -> y, y -> -x
        let m = Mat3::from_cols(Vec3::Y, Vec3::NEG_X, Vec3::Z);
        axes.set_rot_mat(&mut tree, m);
        let world = tree.world_transform(axes.arrows()[0].root()).unwrap();
        let tip = world.transform_vector3(Vec3::Y);
        assert!((tip.normalize() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn dispose_removes_every_part() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let axes = Axes::spawn(&mut tree, root, 1.0);
        assert_eq!(tree.len(), 1 + 1 + 3 * 3);
        assert!(axes.dispose(&mut tree));
        assert!(!axes.dispose(&mut tree));
        assert_eq!(tree.len(), 1);
        assert!(!tree.contains(axes.root()));
    }
}
