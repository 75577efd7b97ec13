//! Mouse-driven camera controls: orbit the rig around its focus point with
//! a left drag, zoom with the wheel. The controller only computes camera
//! placement; everything else (picking, selection boxes) reads the raw
//! events in the main loop.

use glam::Vec3;
use meshmark_viewport::camera::CameraMode;
use meshmark_viewport::CameraRig;

const ORBIT_SENSITIVITY: f32 = 0.008;
const ZOOM_STEP: f32 = 0.9;
const MIN_DISTANCE: f32 = 0.2;
const MAX_DISTANCE: f32 = 20.0;
/// Keep pitch off the poles so the look-at basis stays well defined.
const PITCH_LIMIT: f32 = 1.54;

pub struct OrbitController {
    yaw: f32,
    pitch: f32,
    distance: f32,
    focus: Vec3,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 3.0,
            focus: Vec3::ZERO,
        }
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Eye position for the current spherical coordinates.
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.focus
            + Vec3::new(
                self.distance * cos_pitch * sin_yaw,
                self.distance * sin_pitch,
                self.distance * cos_pitch * cos_yaw,
            )
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Apply a mouse drag delta in pixels. Ignored while the rig has
    /// rotation locked (editing mode).
    pub fn orbit(&mut self, rig: &mut CameraRig, delta_x: f32, delta_y: f32) {
        if !rig.rotation_allowed() {
            return;
        }
        self.yaw -= delta_x * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch + delta_y * ORBIT_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        rig.set_position(self.eye());
    }

    /// Apply one wheel notch. Perspective zoom moves the eye; orthographic
    /// zoom scales the framed region instead, so the PIP camera follows.
    pub fn zoom(&mut self, rig: &mut CameraRig, notches: f32) {
        let factor = ZOOM_STEP.powf(notches);
        match rig.mode() {
            CameraMode::Perspective => {
                self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
                rig.set_position(self.eye());
            }
            CameraMode::Orthographic => {
                let half_height = rig.orthographic.half_height * factor;
                rig.set_ortho_zoom(half_height);
            }
        }
    }

    pub fn refocus(&mut self, rig: &mut CameraRig, focus: Vec3) {
        self.focus = focus;
        rig.focus(focus);
        rig.set_position(self.eye());
    }
}
