use bevy::prelude::*;

pub mod assets;
pub mod camera;
pub mod mirror;
pub mod setup;

use crate::net::NetSet;

/// Runs after the director has pumped, so a frame's telemetry is on screen
/// the same frame it arrived.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneSet;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<mirror::SceneMirror>()
            .configure_sets(Update, SceneSet.after(NetSet))
            .add_systems(
                Startup,
                (
                    setup::setup_scene,
                    mirror::track_tree_removals,
                    mirror::init_primitive_meshes,
                    assets::load_vehicle_meshes,
                ),
            )
            .add_systems(
                Update,
                (
                    camera::orbit_camera_input,
                    camera::follow_vehicle,
                    camera::apply_orbit,
                    mirror::mirror_scene_tree,
                )
                    .chain()
                    .in_set(SceneSet),
            )
            .add_systems(Update, setup::draw_light_helpers.in_set(SceneSet));
    }
}
