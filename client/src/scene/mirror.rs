//! Keeps one bevy entity per attached [`SceneTree`] node.
//!
//! The tree stamps every change with its clock, so a pass only touches
//! entities whose node revision moved. Disposed nodes come back through
//! `drain_removed` and are despawned.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use scene_sync::tree::{Node, NodeTransform, Shape};
use scene_sync::NodeId;

use super::assets::VehicleMeshes;
use crate::net::Director;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirroredNode(pub NodeId);

#[derive(Debug, Clone, Copy)]
struct MirrorEntry {
    entity: Entity,
    parent: Option<NodeId>,
    revision: u64,
    geometry_revision: u64,
    pass: u64,
}

/// Unit meshes shared by every node of the same shape.
#[derive(Resource, Debug, Clone)]
pub struct PrimitiveMeshes {
    pub cylinder: Handle<Mesh>,
    pub cone: Handle<Mesh>,
    pub disc: Handle<Mesh>,
}

/// The mirror is the tree's only consumer of disposed ids.
pub fn track_tree_removals(director: Res<Director>) {
    director.lock().tree_mut().track_removals(true);
}

pub fn init_primitive_meshes(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    commands.insert_resource(PrimitiveMeshes {
        cylinder: meshes.add(Mesh::from(Cylinder::new(1.0, 1.0))),
        cone: meshes.add(Mesh::from(Cone::new(1.0, 1.0))),
        disc: meshes.add(disc_mesh()),
    });
}

#[derive(Default, Debug)]
struct SizedMeshes {
    tiles: HashMap<(u32, u32), Handle<Mesh>>,
    grid_lines: HashMap<(u32, u32), Handle<Mesh>>,
}

#[derive(Resource, Default, Debug)]
pub struct SceneMirror {
    nodes: HashMap<NodeId, MirrorEntry>,
    sized: SizedMeshes,
    clock: Option<u64>,
    passes: u64,
    retry: bool,
}

impl SceneMirror {
    pub fn entity(&self, id: NodeId) -> Option<Entity> {
        self.nodes.get(&id).map(|e| e.entity)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

type MirrorQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static mut Transform,
        &'static mut Visibility,
        Option<&'static Mesh3d>,
        Option<&'static MeshMaterial3d<StandardMaterial>>,
    ),
    With<MirroredNode>,
>;

#[allow(clippy::too_many_arguments)]
pub fn mirror_scene_tree(
    mut commands: Commands,
    director: Res<Director>,
    prims: Res<PrimitiveMeshes>,
    vehicle_meshes: Option<Res<VehicleMeshes>>,
    mut mirror: ResMut<SceneMirror>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut q: MirrorQuery,
) {
    let mut director = director.lock();
    let removed = director.tree_mut().drain_removed();
    let SceneMirror {
        nodes,
        sized,
        clock,
        passes,
        retry,
    } = &mut *mirror;

    for id in removed {
        if let Some(entry) = nodes.remove(&id) {
            commands.entity(entry.entity).try_despawn();
        }
    }

    let tree = director.tree();
    if *clock == Some(tree.clock()) && !*retry {
        return;
    }
    *clock = Some(tree.clock());
    *retry = false;
    *passes += 1;
    let pass = *passes;

    for id in tree.walk() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let parent_entity = node
            .parent()
            .and_then(|p| nodes.get(&p))
            .map(|e| e.entity);

        let Some(entry) = nodes.get(&id).copied() else {
            let mut ec = commands.spawn((
                MirroredNode(id),
                Name::new(node_name(id, node.shape())),
                to_transform(node.transform()),
                visibility(node),
            ));
            if let Some(parent) = parent_entity {
                ec.insert(ChildOf(parent));
            }
            let mesh = mesh_for(
                node,
                &prims,
                vehicle_meshes.as_deref(),
                sized,
                &mut meshes,
            );
            if let Some(mesh) = mesh {
                ec.insert((Mesh3d(mesh), MeshMaterial3d(materials.add(material_for(node)))));
            }
            nodes.insert(
                id,
                MirrorEntry {
                    entity: ec.id(),
                    parent: node.parent(),
                    revision: node.revision(),
                    geometry_revision: node.geometry_revision(),
                    pass,
                },
            );
            continue;
        };

        let mut entry = MirrorEntry { pass, ..entry };
        if entry.parent != node.parent() {
            match parent_entity {
                Some(parent) => {
                    commands.entity(entry.entity).insert(ChildOf(parent));
                }
                None => {
                    commands.entity(entry.entity).remove::<ChildOf>();
                }
            }
            entry.parent = node.parent();
        }
        if entry.revision != node.revision() {
            let Ok((mut transform, mut vis, mesh, material)) = q.get_mut(entry.entity) else {
                // Spawned this frame; commands not applied yet.
                *retry = true;
                nodes.insert(id, entry);
                continue;
            };
            *transform = to_transform(node.transform());
            *vis = visibility(node);
            if let Some(material) = material.and_then(|m| materials.get_mut(&m.0)) {
                apply_material(material, node);
            }
            if entry.geometry_revision != node.geometry_revision() {
                if let (Shape::Triangles(verts), Some(mesh)) = (node.shape(), mesh) {
                    if let Some(mesh) = meshes.get_mut(&mesh.0) {
                        *mesh = triangle_mesh(verts);
                    }
                }
                entry.geometry_revision = node.geometry_revision();
            }
            entry.revision = node.revision();
        }
        nodes.insert(id, entry);
    }

    // Live but detached from the root: keep the entity, hide it.
    for entry in nodes.values() {
        if entry.pass != pass {
            if let Ok((_, mut vis, _, _)) = q.get_mut(entry.entity) {
                *vis = Visibility::Hidden;
            }
        }
    }
}

fn node_name(id: NodeId, shape: &Shape) -> String {
    let kind = match shape {
        Shape::Group => "group",
        Shape::Cylinder => "shaft",
        Shape::Cone => "head",
        Shape::Disc => "disc",
        Shape::Triangles(_) => "patch",
        Shape::GridLines { .. } => "grid",
        Shape::Tile { .. } => "tile",
        Shape::Asset(_) => "mesh",
    };
    format!("{kind} #{}", id.index())
}

pub fn to_transform(t: &NodeTransform) -> Transform {
    Transform {
        translation: t.translation,
        rotation: t.rotation,
        scale: t.scale,
    }
}

fn visibility(node: &Node) -> Visibility {
    if node.visible() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn mesh_for(
    node: &Node,
    prims: &PrimitiveMeshes,
    vehicle: Option<&VehicleMeshes>,
    sized: &mut SizedMeshes,
    meshes: &mut Assets<Mesh>,
) -> Option<Handle<Mesh>> {
    match node.shape() {
        Shape::Group => None,
        Shape::Cylinder => Some(prims.cylinder.clone()),
        Shape::Cone => Some(prims.cone.clone()),
        Shape::Disc => Some(prims.disc.clone()),
        // Each patch owns its mesh; the vertices change every frame.
        Shape::Triangles(verts) => Some(meshes.add(triangle_mesh(verts))),
        Shape::GridLines { size, divisions } => Some(
            sized
                .grid_lines
                .entry((size.to_bits(), *divisions))
                .or_insert_with(|| meshes.add(grid_lines_mesh(*size, *divisions)))
                .clone(),
        ),
        Shape::Tile { size, depth } => Some(
            sized
                .tiles
                .entry((size.to_bits(), depth.to_bits()))
                .or_insert_with(|| meshes.add(Mesh::from(Cuboid::new(*size, *size, *depth))))
                .clone(),
        ),
        Shape::Asset(asset) => vehicle.and_then(|v| v.get(*asset)).cloned(),
    }
}

pub fn material_for(node: &Node) -> StandardMaterial {
    let mut material = StandardMaterial {
        unlit: !matches!(node.shape(), Shape::Asset(_)),
        double_sided: true,
        cull_mode: None,
        perceptual_roughness: 0.8,
        ..Default::default()
    };
    apply_material(&mut material, node);
    material
}

fn apply_material(material: &mut StandardMaterial, node: &Node) {
    let opacity = node.opacity().clamp(0.0, 1.0);
    material.base_color = Color::Srgba(Srgba {
        alpha: opacity,
        ..node.color()
    });
    material.alpha_mode = if opacity < 1.0 {
        AlphaMode::Blend
    } else {
        AlphaMode::Opaque
    };
}

/// Flat-shaded, non-indexed. An empty patch keeps one degenerate triangle
/// so the mesh never has zero vertices.
pub fn triangle_mesh(verts: &[Vec3]) -> Mesh {
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(verts.len().max(3));
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(verts.len().max(3));
    for tri in verts.chunks_exact(3) {
        let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
        for v in tri {
            positions.push(v.to_array());
            normals.push(n.to_array());
        }
    }
    if positions.is_empty() {
        positions = vec![[0.0; 3]; 3];
        normals = vec![[0.0; 3]; 3];
    }
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
}

/// `divisions + 1` lines each way across a `size` square centred on the
/// origin, in the XY plane.
pub fn grid_lines_mesh(size: f32, divisions: u32) -> Mesh {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    let mut positions = Vec::with_capacity(4 * (divisions as usize + 1));
    for i in 0..=divisions {
        let t = -half + i as f32 * step;
        positions.push([t, -half, 0.0]);
        positions.push([t, half, 0.0]);
        positions.push([-half, t, 0.0]);
        positions.push([half, t, 0.0]);
    }
    let normals = vec![[0.0, 0.0, -1.0]; positions.len()];
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
}

/// Unit disc facing +X.
fn disc_mesh() -> Mesh {
    Mesh::from(Circle::new(1.0)).rotated_by(Quat::from_rotation_y(FRAC_PI_2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::mesh::VertexAttributeValues;
    use scene_sync::SceneTree;

    #[test]
    fn patch_mesh_is_flat_shaded() {
        let mesh = triangle_mesh(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ZERO]);
        assert_eq!(mesh.count_vertices(), 3);
        let Some(VertexAttributeValues::Float32x3(normals)) = mesh.attribute(Mesh::ATTRIBUTE_NORMAL)
        else {
            panic!("missing normals");
        };
        assert_eq!(normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn empty_patch_keeps_a_degenerate_triangle() {
        assert_eq!(triangle_mesh(&[]).count_vertices(), 3);
    }

    #[test]
    fn grid_lines_span_the_tile() {
        let mesh = grid_lines_mesh(10.0, 4);
        assert_eq!(mesh.count_vertices(), 20);
        let Some(VertexAttributeValues::Float32x3(pos)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("missing positions");
        };
        assert_eq!(pos[0], [-5.0, -5.0, 0.0]);
        assert_eq!(pos[pos.len() - 1], [5.0, 5.0, 0.0]);
    }

    #[test]
    fn translucent_nodes_blend() {
        let mut tree = SceneTree::new();
        let id = tree.spawn(tree.root(), Shape::Cone);
        tree.set_opacity(id, 0.5);
        let material = material_for(tree.get(id).unwrap());
        assert!(matches!(material.alpha_mode, AlphaMode::Blend));
        assert!(material.unlit);

        let hull = tree.spawn(tree.root(), Shape::Asset(scene_sync::tree::MeshAsset::Hull));
        let material = material_for(tree.get(hull).unwrap());
        assert!(matches!(material.alpha_mode, AlphaMode::Opaque));
        assert!(!material.unlit);
    }
}
