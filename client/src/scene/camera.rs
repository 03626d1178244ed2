use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

use crate::net::Director;

/// World up for the whole scene: the simulation frame is z-down.
pub const SCENE_UP: Vec3 = Vec3::NEG_Z;

pub const START_POSITION: Vec3 = Vec3::new(5.0, -3.0, -2.0);
pub const FOV_DEGREES: f32 = 35.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 200.0;

#[derive(Component)]
pub struct GameCamera;

/// Orbit rig around `target`. Angles are measured in the z-down frame:
/// yaw about +Z from +X, pitch up towards -Z.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OrbitCam {
    pub target: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl OrbitCam {
    pub fn from_offset(target: Vec3, offset: Vec3) -> Self {
        let radius = offset.length().max(1e-3);
        Self {
            target,
            radius,
            yaw: offset.y.atan2(offset.x),
            pitch: (-offset.z / radius).clamp(-1.0, 1.0).asin(),
            min_radius: 0.5,
            max_radius: FAR * 0.5,
        }
    }

    pub fn offset(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.radius * Vec3::new(cp * cy, cp * sy, -sp)
    }

    pub fn eye(&self) -> Vec3 {
        self.target + self.offset()
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, SCENE_UP)
    }

    pub fn rotate(&mut self, delta: Vec2) {
        const SENS: f32 = 0.005;
        self.yaw -= delta.x * SENS;
        self.pitch = (self.pitch + delta.y * SENS).clamp(-1.5, 1.5);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.radius = (self.radius * 0.9_f32.powf(steps)).clamp(self.min_radius, self.max_radius);
    }
}

impl Default for OrbitCam {
    fn default() -> Self {
        Self::from_offset(Vec3::ZERO, START_POSITION)
    }
}

/// Hold the right mouse button to orbit, scroll to zoom.
pub fn orbit_camera_input(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut wheel: EventReader<MouseWheel>,
    mut q: Query<&mut OrbitCam, With<GameCamera>>,
) {
    let Ok(mut orbit) = q.single_mut() else {
        return;
    };
    if mouse_buttons.pressed(MouseButton::Right) {
        let mut delta = Vec2::ZERO;
        for ev in mouse_motion.read() {
            delta += ev.delta;
        }
        if delta != Vec2::ZERO {
            orbit.rotate(delta);
        }
    } else {
        // Drain motion to avoid bursts when RMB is pressed next
        for _ in mouse_motion.read() {}
    }
    let steps: f32 = wheel.read().map(|ev| ev.y.signum()).sum();
    if steps != 0.0 {
        orbit.zoom(steps);
    }
}

/// Carries the orbit target along with the vehicle and services refocus
/// requests.
pub fn follow_vehicle(director: Res<Director>, mut q: Query<&mut OrbitCam, With<GameCamera>>) {
    let Ok(mut orbit) = q.single_mut() else {
        return;
    };
    let mut director = director.lock();
    let camera = director.camera_mut();
    if let Some(target) = camera.take_refocus() {
        orbit.target = target;
        return;
    }
    let delta = camera.take_delta();
    if delta != Vec3::ZERO {
        orbit.target += delta;
    }
}

pub fn apply_orbit(mut q: Query<(&mut Transform, &OrbitCam), (With<GameCamera>, Changed<OrbitCam>)>) {
    for (mut t, orbit) in &mut q {
        *t = orbit.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_offset_round_trips_through_angles() {
        let orbit = OrbitCam::default();
        assert!(orbit.eye().abs_diff_eq(START_POSITION, 1e-4));
    }

    #[test]
    fn zoom_respects_limits() {
        let mut orbit = OrbitCam::default();
        orbit.zoom(1000.0);
        assert_eq!(orbit.radius, orbit.min_radius);
        orbit.zoom(-10_000.0);
        assert_eq!(orbit.radius, orbit.max_radius);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_pole() {
        let mut orbit = OrbitCam::default();
        orbit.rotate(Vec2::new(0.0, 1.0e6));
        assert_eq!(orbit.pitch, 1.5);
        let up = orbit.transform().up();
        assert!(up.dot(SCENE_UP) > 0.0);
    }
}
