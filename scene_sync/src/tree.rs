//! Renderer-facing scene graph.
//!
//! Nodes live in a generational arena: a [`NodeId`] whose slot was freed and
//! reused no longer resolves, so a component holding a stale id can never
//! touch another component's node. Every mutation stamps the node with the
//! tree's clock; a renderer mirrors the tree by comparing those stamps.

use bevy_color::Srgba;
use bevy_math::{Affine3A, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Static meshes supplied by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshAsset {
    Hull,
    Wing,
    RearWing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Transform-only node.
    Group,
    /// Unit cylinder (radius 1, height 1) along +Y, centred on the origin.
    Cylinder,
    /// Unit cone (radius 1, height 1) along +Y, centred on the origin, tip up.
    Cone,
    /// Unit-radius disc in the local YZ plane, facing +X.
    Disc,
    /// Flat triangle list, three vertices per triangle, double sided.
    Triangles(Vec<Vec3>),
    /// Square line grid in the local XY plane.
    GridLines { size: f32, divisions: u32 },
    /// Thin square slab in the local XY plane.
    Tile { size: f32, depth: f32 },
    Asset(MeshAsset),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl NodeTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere around the centre of the points' bounding box.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Some(Self { center, radius })
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shape: Shape,
    transform: NodeTransform,
    visible: bool,
    color: Srgba,
    opacity: f32,
    revision: u64,
    geometry_revision: u64,
    bounds: Option<BoundingSphere>,
}

impl Node {
    fn new(shape: Shape, clock: u64) -> Self {
        let bounds = match &shape {
            Shape::Triangles(verts) => BoundingSphere::from_points(verts),
            _ => None,
        };
        Self {
            parent: None,
            children: Vec::new(),
            shape,
            transform: NodeTransform::IDENTITY,
            visible: true,
            color: Srgba::WHITE,
            opacity: 1.0,
            revision: clock,
            geometry_revision: clock,
            bounds,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn transform(&self) -> &NodeTransform {
        &self.transform
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn color(&self) -> Srgba {
        self.color
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clock value of the last change of any kind.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Clock value of the last change that requires re-uploading geometry.
    pub fn geometry_revision(&self) -> u64 {
        self.geometry_revision
    }

    pub fn bounds(&self) -> Option<BoundingSphere> {
        self.bounds
    }

    pub fn vertices(&self) -> &[Vec3] {
        match &self.shape {
            Shape::Triangles(verts) => verts,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Occupied { node: Node, generation: u32 },
    Vacant { next_vacant: Option<u32>, generation: u32 },
}

#[derive(Debug, Clone)]
pub struct SceneTree {
    slots: Vec<Slot>,
    vacant: Option<u32>,
    num_occupied: usize,
    root: NodeId,
    removed: Vec<NodeId>,
    track_removals: bool,
    clock: u64,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            vacant: None,
            num_occupied: 0,
            root: NodeId {
                index: 0,
                generation: 0,
            },
            removed: Vec::new(),
            track_removals: false,
            clock: 0,
        };
        tree.root = tree.insert(Node::new(Shape::Group, 0));
        tree
    }

    /// The world node. It can be neither detached nor disposed.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Live nodes, including the root and detached nodes.
    pub fn len(&self) -> usize {
        self.num_occupied
    }

    pub fn is_empty(&self) -> bool {
        self.num_occupied == 0
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    fn insert(&mut self, node: Node) -> NodeId {
        self.num_occupied += 1;
        if let Some(index) = self.vacant {
            let slot = &mut self.slots[index as usize];
            let (next_vacant, generation) = match slot {
                Slot::Vacant {
                    next_vacant,
                    generation,
                } => (*next_vacant, *generation),
                Slot::Occupied { .. } => unreachable!("vacant list points at a live slot"),
            };
            *slot = Slot::Occupied { node, generation };
            self.vacant = next_vacant;
            NodeId { index, generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied {
                node,
                generation: 0,
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        if !self.contains(id) {
            return None;
        }
        let next = Slot::Vacant {
            next_vacant: self.vacant,
            generation: id.generation.wrapping_add(1),
        };
        let old = std::mem::replace(&mut self.slots[id.index as usize], next);
        self.vacant = Some(id.index);
        self.num_occupied -= 1;
        match old {
            Slot::Occupied { node, .. } => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied { node, generation }) if *generation == id.generation => {
                Some(node)
            }
            _ => None,
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot::Occupied { node, generation }) if *generation == id.generation => {
                Some(node)
            }
            _ => None,
        }
    }

    /// Creates a node under `parent`. A stale parent leaves the node detached.
    pub fn spawn(&mut self, parent: NodeId, shape: Shape) -> NodeId {
        let id = self.spawn_detached(shape);
        self.attach(id, parent);
        id
    }

    pub fn spawn_detached(&mut self, shape: Shape) -> NodeId {
        self.clock += 1;
        self.insert(Node::new(shape, self.clock))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Moves `child` under `parent`. Refuses the root, stale ids and cycles.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> bool {
        if child == self.root || !self.contains(child) || !self.contains(parent) {
            return false;
        }
        if self.is_ancestor_or_self(child, parent) {
            return false;
        }
        if self.parent(child) == Some(parent) {
            return true;
        }
        self.detach(child);
        if let Some(p) = self.get_mut(parent) {
            p.children.push(child);
        }
        self.update(child, |n| {
            n.parent = Some(parent);
            true
        })
    }

    pub fn detach(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        self.update(child, |n| {
            n.parent = None;
            true
        })
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(p) => id = p,
                None => return false,
            }
        }
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_ancestor_or_self(self.root, id)
    }

    /// Removes `id` and its whole subtree. Disposing a stale id (or the root)
    /// is a no-op returning `false`.
    pub fn dispose(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.remove(next) {
                stack.extend(node.children);
                if self.track_removals {
                    self.removed.push(next);
                }
            }
        }
        true
    }

    /// Starts or stops recording disposed ids for [`Self::drain_removed`].
    /// Off by default, so a tree nobody mirrors does not accumulate them.
    pub fn track_removals(&mut self, on: bool) {
        self.track_removals = on;
        if !on {
            self.removed.clear();
        }
    }

    /// Ids disposed since the last call. Empty unless tracking is on.
    pub fn drain_removed(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.removed)
    }

    /// Attached nodes, parents before children.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.num_occupied);
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn world_transform(&self, id: NodeId) -> Option<Affine3A> {
        let mut acc = self.get(id)?.transform.to_affine();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            let node = self.get(p)?;
            acc = node.transform.to_affine() * acc;
            cursor = node.parent;
        }
        Some(acc)
    }

    /// Visible itself and through every ancestor.
    pub fn is_shown(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            match self.get(c) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Applies `f` and stamps the node if `f` reports a change. Returns
    /// whether the node exists.
    fn update(&mut self, id: NodeId, f: impl FnOnce(&mut Node) -> bool) -> bool {
        let stamp = self.clock + 1;
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        if f(node) {
            node.revision = stamp;
            self.clock = stamp;
        }
        true
    }

    pub fn set_translation(&mut self, id: NodeId, translation: Vec3) -> bool {
        self.update(id, |n| {
            let changed = n.transform.translation != translation;
            n.transform.translation = translation;
            changed
        })
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> bool {
        self.update(id, |n| {
            let changed = n.transform.rotation != rotation;
            n.transform.rotation = rotation;
            changed
        })
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> bool {
        self.update(id, |n| {
            let changed = n.transform.scale != scale;
            n.transform.scale = scale;
            changed
        })
    }

    pub fn set_transform(&mut self, id: NodeId, transform: NodeTransform) -> bool {
        self.update(id, |n| {
            let changed = n.transform != transform;
            n.transform = transform;
            changed
        })
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        self.update(id, |n| {
            let changed = n.visible != visible;
            n.visible = visible;
            changed
        })
    }

    /// Flips visibility, returning the new value.
    pub fn toggle_visible(&mut self, id: NodeId) -> Option<bool> {
        let visible = !self.get(id)?.visible;
        self.set_visible(id, visible);
        Some(visible)
    }

    pub fn set_color(&mut self, id: NodeId, color: Srgba) -> bool {
        self.update(id, |n| {
            let changed = n.color != color;
            n.color = color;
            changed
        })
    }

    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) -> bool {
        let opacity = opacity.clamp(0.0, 1.0);
        self.update(id, |n| {
            let changed = n.opacity != opacity;
            n.opacity = opacity;
            changed
        })
    }

    /// Replaces a triangle list and recomputes its bounds. Non-triangle nodes
    /// are left untouched and report `false`.
    pub fn set_vertices(&mut self, id: NodeId, vertices: Vec<Vec3>) -> bool {
        let stamp = self.clock + 1;
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        let Shape::Triangles(current) = &mut node.shape else {
            return false;
        };
        if *current != vertices {
            node.bounds = BoundingSphere::from_points(&vertices);
            *current = vertices;
            node.revision = stamp;
            node.geometry_revision = stamp;
            self.clock = stamp;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ids_do_not_resolve_after_reuse() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.spawn(root, Shape::Group);
        assert!(tree.dispose(a));
        let b = tree.spawn(root, Shape::Cone);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(!tree.contains(a));
        assert!(!tree.set_visible(a, false));
        assert!(!tree.dispose(a));
        assert!(tree.contains(b));
    }

    #[test]
    fn dispose_removes_subtree_once() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let group = tree.spawn(root, Shape::Group);
        let child = tree.spawn(group, Shape::Cylinder);
        let grandchild = tree.spawn(child, Shape::Cone);
        tree.track_removals(true);
        assert_eq!(tree.len(), 4);

        assert!(tree.dispose(group));
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).is_empty());
        let mut removed = tree.drain_removed();
        removed.sort();
        let mut expected = vec![group, child, grandchild];
        expected.sort();
        assert_eq!(removed, expected);

        assert!(!tree.dispose(group));
        assert!(tree.drain_removed().is_empty());
    }

    #[test]
    fn untracked_tree_keeps_no_removal_backlog() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        for _ in 0..3 {
            let group = tree.spawn(root, Shape::Group);
            tree.spawn(group, Shape::Cylinder);
            tree.dispose(group);
        }
        assert!(tree.drain_removed().is_empty());

        tree.track_removals(true);
        let group = tree.spawn(root, Shape::Group);
        tree.dispose(group);
        assert_eq!(tree.drain_removed(), vec![group]);
    }

    #[test]
    fn root_is_permanent() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        assert!(!tree.dispose(root));
        assert!(!tree.detach(root));
        let g = tree.spawn(root, Shape::Group);
        assert!(!tree.attach(root, g));
        assert!(tree.is_attached(root));
    }

    #[test]
    fn attach_refuses_cycles() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.spawn(root, Shape::Group);
        let b = tree.spawn(a, Shape::Group);
        assert!(!tree.attach(a, b));
        assert!(!tree.attach(a, a));
        assert_eq!(tree.parent(b), Some(a));
    }

    #[test]
    fn reparenting_moves_between_child_lists() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.spawn(root, Shape::Group);
        let b = tree.spawn(root, Shape::Group);
        let leaf = tree.spawn(a, Shape::Disc);
        assert!(tree.attach(leaf, b));
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[leaf]);
        assert!(tree.detach(leaf));
        assert!(!tree.is_attached(leaf));
        assert!(tree.contains(leaf));
    }

    #[test]
    fn unchanged_setters_keep_revision() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let n = tree.spawn(root, Shape::Cone);
        tree.set_translation(n, Vec3::X);
        let rev = tree.get(n).map(Node::revision);
        tree.set_translation(n, Vec3::X);
        tree.set_visible(n, true);
        assert_eq!(tree.get(n).map(Node::revision), rev);
        tree.set_color(n, Srgba::rgb(1.0, 0.0, 0.0));
        assert!(tree.get(n).map(Node::revision) > rev);
    }

    #[test]
    fn set_vertices_bumps_geometry_and_bounds() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let mesh = tree.spawn(root, Shape::Triangles(Vec::new()));
        let geo = tree.get(mesh).map(Node::geometry_revision);
        let verts = vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)];
        assert!(tree.set_vertices(mesh, verts));
        let node = tree.get(mesh).unwrap();
        assert!(Some(node.geometry_revision()) > geo);
        let bounds = node.bounds().unwrap();
        assert!((bounds.center - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
        assert!((bounds.radius - 2.0_f32.sqrt()).abs() < 1e-6);

        let cone = tree.spawn(root, Shape::Cone);
        assert!(!tree.set_vertices(cone, vec![Vec3::ZERO]));
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let body = tree.spawn(root, Shape::Group);
        tree.set_translation(body, Vec3::new(10.0, 0.0, 0.0));
        tree.set_rotation(body, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let leaf = tree.spawn(body, Shape::Group);
        tree.set_translation(leaf, Vec3::X);
        let world = tree.world_transform(leaf).unwrap();
        let p = world.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(10.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn walk_lists_parents_first() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.spawn(root, Shape::Group);
        let b = tree.spawn(a, Shape::Group);
        let c = tree.spawn(root, Shape::Group);
        let detached = tree.spawn_detached(Shape::Group);
        let order = tree.walk();
        let pos = |id| order.iter().position(|x| *x == id);
        assert!(pos(root) < pos(a));
        assert!(pos(a) < pos(b));
        assert!(pos(c).is_some());
        assert_eq!(pos(detached), None);
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.spawn(root, Shape::Group);
        let b = tree.spawn(a, Shape::Cone);
        assert!(tree.is_shown(b));
        assert_eq!(tree.toggle_visible(a), Some(false));
        assert!(!tree.is_shown(b));
        assert!(tree.get(b).unwrap().visible());
    }
}
