use bevy_math::Vec3;

/// Keeps the camera offset to the vehicle constant while following.
///
/// Each telemetry frame reports the vehicle position through
/// [`CameraFollow::observe`]; the renderer drains the accumulated motion
/// with [`CameraFollow::take_delta`] and moves both the camera and its orbit
/// target by it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFollow {
    enabled: bool,
    last: Option<Vec3>,
    pending: Vec3,
    refocus: bool,
}

impl Default for CameraFollow {
    fn default() -> Self {
        Self {
            enabled: true,
            last: None,
            pending: Vec3::ZERO,
            refocus: false,
        }
    }
}

impl CameraFollow {
    pub fn observe(&mut self, position: Vec3) {
        if !position.is_finite() {
            return;
        }
        if let Some(last) = self.last {
            if self.enabled {
                self.pending += position - last;
            }
        }
        self.last = Some(position);
    }

    pub fn take_delta(&mut self) -> Vec3 {
        std::mem::take(&mut self.pending)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.pending = Vec3::ZERO;
        self.enabled
    }

    /// Last known vehicle position.
    pub fn target(&self) -> Option<Vec3> {
        self.last
    }

    pub fn request_refocus(&mut self) {
        self.refocus = true;
    }

    /// The point to recentre the orbit on, once per request.
    pub fn take_refocus(&mut self) -> Option<Vec3> {
        if !std::mem::take(&mut self.refocus) {
            return None;
        }
        Some(self.last.unwrap_or(Vec3::ZERO))
    }

    /// Forgets the vehicle position, e.g. after a rebuild or reset teleports it.
    pub fn reset(&mut self) {
        self.last = None;
        self.pending = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_motion_between_frames() {
        let mut follow = CameraFollow::default();
        follow.observe(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(follow.take_delta(), Vec3::ZERO);
        follow.observe(Vec3::new(2.0, 0.5, 0.0));
        follow.observe(Vec3::new(4.0, 0.5, -1.0));
        assert_eq!(follow.take_delta(), Vec3::new(3.0, 0.5, -1.0));
        assert_eq!(follow.take_delta(), Vec3::ZERO);
    }

    #[test]
    fn disabled_follow_tracks_without_moving() {
        let mut follow = CameraFollow::default();
        assert!(!follow.toggle());
        follow.observe(Vec3::ZERO);
        follow.observe(Vec3::X);
        assert_eq!(follow.take_delta(), Vec3::ZERO);
        assert!(follow.toggle());
        follow.observe(Vec3::X * 3.0);
        assert_eq!(follow.take_delta(), Vec3::X * 2.0);
    }

    #[test]
    fn refocus_fires_once() {
        let mut follow = CameraFollow::default();
        follow.observe(Vec3::new(5.0, 1.0, 0.0));
        assert_eq!(follow.take_refocus(), None);
        follow.request_refocus();
        assert_eq!(follow.take_refocus(), Some(Vec3::new(5.0, 1.0, 0.0)));
        assert_eq!(follow.take_refocus(), None);
    }
}
