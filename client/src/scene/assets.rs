//! STL meshes for the hull and the two wings.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use scene_sync::tree::MeshAsset;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::Args;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not open mesh file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse STL file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Triangle soup read from an STL file, three positions per face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StlMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
}

impl StlMesh {
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn into_mesh(self) -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions)
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals)
    }
}

/// Accepts both binary and ASCII STL.
pub fn read_stl<R: Read + Seek>(reader: &mut R) -> std::io::Result<StlMesh> {
    let indexed = stl_io::read_stl(reader)?;
    let mut out = StlMesh {
        positions: Vec::with_capacity(indexed.faces.len() * 3),
        normals: Vec::with_capacity(indexed.faces.len() * 3),
    };
    for face in &indexed.faces {
        let corners = face.vertices.map(|i| {
            let v = indexed.vertices[i];
            Vec3::new(v[0], v[1], v[2])
        });
        // Recompute rather than trust the file: exporters often leave zeros.
        let normal = (corners[1] - corners[0])
            .cross(corners[2] - corners[0])
            .normalize_or_zero()
            .to_array();
        for corner in corners {
            out.positions.push(corner.to_array());
            out.normals.push(normal);
        }
    }
    Ok(out)
}

pub fn load_stl(path: &Path) -> Result<StlMesh, AssetError> {
    let mut file = File::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_stl(&mut file).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Handles for whichever vehicle meshes loaded. A missing file leaves its
/// node as an empty transform.
#[derive(Resource, Default, Debug, Clone)]
pub struct VehicleMeshes {
    pub hull: Option<Handle<Mesh>>,
    pub wing: Option<Handle<Mesh>>,
    pub rear_wing: Option<Handle<Mesh>>,
}

impl VehicleMeshes {
    pub fn get(&self, asset: MeshAsset) -> Option<&Handle<Mesh>> {
        match asset {
            MeshAsset::Hull => self.hull.as_ref(),
            MeshAsset::Wing => self.wing.as_ref(),
            MeshAsset::RearWing => self.rear_wing.as_ref(),
        }
    }
}

pub fn load_vehicle_meshes(
    mut commands: Commands,
    args: Res<Args>,
    config: Res<ClientConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let mut load = |name: &str| {
        let path = args.assets.join(name);
        match load_stl(&path) {
            Ok(stl) => {
                info!(path = %path.display(), triangles = stl.triangle_count(), "Loaded mesh");
                Some(meshes.add(stl.into_mesh()))
            }
            Err(err) => {
                warn!(error = %err, "Vehicle mesh unavailable");
                None
            }
        }
    };
    let files = &config.assets;
    commands.insert_resource(VehicleMeshes {
        hull: load(&files.hull),
        wing: load(&files.wing),
        rear_wing: load(&files.rear_wing),
    });
}
