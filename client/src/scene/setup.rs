use bevy::math::Isometry3d;
use bevy::prelude::*;
use bevy::render::camera::PerspectiveProjection;

use super::camera::{GameCamera, OrbitCam, FAR, FOV_DEGREES, NEAR, SCENE_UP};
use crate::net::Director;

/// Lights look at the origin from above (-Z) and, dimly, from below.
const TOP_LIGHT: Vec3 = Vec3::new(2.0, -2.0, -2.0);
const BOTTOM_LIGHT: Vec3 = Vec3::new(-2.0, 2.0, 2.0);
const LIGHT_HELPER_SIZE: f32 = 0.5;

pub fn setup_scene(mut commands: Commands) {
    commands.insert_resource(ClearColor(Color::srgb(0.08, 0.09, 0.11)));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 50.0,
        affects_lightmapped_meshes: true,
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 3_000.0,
            shadows_enabled: false,
            ..Default::default()
        },
        Transform::from_translation(TOP_LIGHT).looking_at(Vec3::ZERO, SCENE_UP),
        Name::new("Top Light"),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 400.0,
            shadows_enabled: false,
            ..Default::default()
        },
        Transform::from_translation(BOTTOM_LIGHT).looking_at(Vec3::ZERO, SCENE_UP),
        Name::new("Bottom Light"),
    ));

    let orbit = OrbitCam::default();
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: FOV_DEGREES.to_radians(),
            near: NEAR,
            far: FAR,
            ..Default::default()
        }),
        orbit.transform(),
        orbit,
        GameCamera,
        Name::new("Orbit Camera"),
    ));
}

/// A square facing along each light's beam and a line to where it aims.
pub fn draw_light_helpers(
    director: Res<Director>,
    lights: Query<(&Transform, &DirectionalLight)>,
    mut gizmos: Gizmos,
) {
    if !director.lock().light_helpers_shown() {
        return;
    }
    for (transform, light) in &lights {
        gizmos.rect(
            Isometry3d::new(transform.translation, transform.rotation),
            Vec2::splat(LIGHT_HELPER_SIZE),
            light.color,
        );
        gizmos.line(transform.translation, aim_point(transform), light.color);
    }
}

fn aim_point(transform: &Transform) -> Vec3 {
    transform.translation + transform.forward() * transform.translation.length()
}
