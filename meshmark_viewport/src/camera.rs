//! The three-camera rig: one perspective camera, one orthographic main
//! camera, and one orthographic zoom camera for the picture-in-picture
//! pass. All three are created once and reconfigured in place on resize or
//! mode toggles; exactly one of {perspective, orthographic-main} is active
//! at any time. Projection math follows wgpu's 0..1 clip depth.

use glam::{Mat4, Vec3};
use meshmark_model::Notifier;
use winit::dpi::PhysicalSize;

/// 50 degrees, in radians.
pub const DEFAULT_FOV_Y: f32 = 0.872_664_6;
pub const DEFAULT_NEAR: f32 = 0.05;
pub const DEFAULT_FAR: f32 = 40.0;
/// Fraction of the main orthographic frame the PIP camera frames.
pub const PIP_ZOOM_FRACTION: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Perspective,
    Orthographic,
}

/// Perspective camera; the default way to inspect an asset.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect.max(1e-6), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }
}

/// Orthographic camera; doubles as the PIP camera with a smaller frame.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Half the vertical extent of the framed region, in world units.
    pub half_height: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthographicCamera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        let half_width = self.half_height * self.aspect.max(1e-6);
        Mat4::orthographic_rh(
            -half_width,
            half_width,
            -self.half_height,
            self.half_height,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }
}

/// Normalized device coordinates for a screen-space point, Y inverted so
/// +Y is up in NDC while screen Y grows downward.
pub fn screen_to_ndc(screen: [f32; 2], size: PhysicalSize<u32>) -> [f32; 2] {
    let width = size.width.max(1) as f32;
    let height = size.height.max(1) as f32;
    [
        screen[0] / width * 2.0 - 1.0,
        -(screen[1] / height * 2.0 - 1.0),
    ]
}

pub fn ndc_to_screen(ndc: [f32; 2], size: PhysicalSize<u32>) -> [f32; 2] {
    let width = size.width.max(1) as f32;
    let height = size.height.max(1) as f32;
    [(ndc[0] + 1.0) * 0.5 * width, (1.0 - ndc[1]) * 0.5 * height]
}

/// The persistent camera set plus the notification hooks the render loop
/// and viewport subscribe to.
pub struct CameraRig {
    mode: CameraMode,
    pub perspective: PerspectiveCamera,
    pub orthographic: OrthographicCamera,
    pub pip: OrthographicCamera,
    size: PhysicalSize<u32>,
    allow_rotation: bool,
    changed: Notifier<()>,
    pip_changed: Notifier<()>,
}

impl CameraRig {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let eye = Vec3::new(0.0, 0.0, 3.0);
        let target = Vec3::ZERO;
        let up = Vec3::Y;
        Self {
            mode: CameraMode::Perspective,
            perspective: PerspectiveCamera {
                eye,
                target,
                up,
                fov_y: DEFAULT_FOV_Y,
                aspect,
                near: DEFAULT_NEAR,
                far: DEFAULT_FAR,
            },
            orthographic: OrthographicCamera {
                eye,
                target,
                up,
                half_height: 1.4,
                aspect,
                near: DEFAULT_NEAR,
                far: DEFAULT_FAR,
            },
            pip: OrthographicCamera {
                eye,
                target,
                up,
                half_height: 1.4 * PIP_ZOOM_FRACTION,
                aspect: 1.0,
                near: DEFAULT_NEAR,
                far: DEFAULT_FAR,
            },
            size,
            allow_rotation: true,
            changed: Notifier::new(),
            pip_changed: Notifier::new(),
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn is_perspective(&self) -> bool {
        self.mode == CameraMode::Perspective
    }

    /// Switch projections. The cameras persist; only the active flag flips.
    pub fn set_mode(&mut self, mode: CameraMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        log::info!("camera mode now {:?}", mode);
        self.changed.emit(&());
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigure (never recreate) all three cameras for a new canvas size.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        self.perspective.aspect = aspect;
        self.orthographic.aspect = aspect;
        // The PIP viewport is square, so its aspect stays 1.
        self.changed.emit(&());
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.perspective.eye = position;
        self.orthographic.eye = position;
        self.pip.eye = position;
        self.changed.emit(&());
    }

    pub fn focus(&mut self, point: Vec3) {
        self.perspective.target = point;
        self.orthographic.target = point;
        self.pip.target = point;
        self.changed.emit(&());
        if self.mode == CameraMode::Orthographic {
            self.pip_changed.emit(&());
        }
    }

    /// Zoom the main orthographic frame; the PIP camera keeps framing the
    /// same fixed fraction of it.
    pub fn set_ortho_zoom(&mut self, half_height: f32) {
        self.orthographic.half_height = half_height.max(1e-4);
        self.pip.half_height = self.orthographic.half_height * PIP_ZOOM_FRACTION;
        self.changed.emit(&());
        if self.mode == CameraMode::Orthographic {
            self.pip_changed.emit(&());
        }
    }

    pub fn allow_rotation(&mut self, allow: bool) {
        self.allow_rotation = allow;
    }

    pub fn rotation_allowed(&self) -> bool {
        self.allow_rotation
    }

    pub fn on_changed(&self) -> &Notifier<()> {
        &self.changed
    }

    pub fn on_pip_changed(&self) -> &Notifier<()> {
        &self.pip_changed
    }

    pub fn active_view_projection(&self) -> Mat4 {
        match self.mode {
            CameraMode::Perspective => self.perspective.view_projection(),
            CameraMode::Orthographic => self.orthographic.view_projection(),
        }
    }

    pub fn active_eye(&self) -> Vec3 {
        match self.mode {
            CameraMode::Perspective => self.perspective.eye,
            CameraMode::Orthographic => self.orthographic.eye,
        }
    }

    pub fn active_forward(&self) -> Vec3 {
        match self.mode {
            CameraMode::Perspective => self.perspective.forward(),
            CameraMode::Orthographic => self.orthographic.forward(),
        }
    }

    /// Unproject an NDC point (depth in wgpu's 0..1 range) with the active
    /// camera.
    pub fn unproject(&self, ndc: [f32; 2], depth: f32) -> Vec3 {
        let inverse = self.active_view_projection().inverse();
        let clip = glam::Vec4::new(ndc[0], ndc[1], depth, 1.0);
        let world = inverse * clip;
        world.truncate() / world.w
    }

    /// Project a world point to screen pixels with the active camera.
    /// Points behind a perspective eye are rejected.
    pub fn world_to_screen(&self, world: Vec3) -> Option<[f32; 2]> {
        let clip = self.active_view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        Some(ndc_to_screen([ndc.x, ndc.y], self.size))
    }

    /// Inverse of [`CameraRig::world_to_screen`] for a given NDC depth.
    pub fn screen_to_world(&self, screen: [f32; 2], depth: f32) -> Vec3 {
        self.unproject(screen_to_ndc(screen, self.size), depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-3;

    fn rig() -> CameraRig {
        CameraRig::new(PhysicalSize::new(800, 600))
    }

    #[test]
    fn screen_ndc_round_trip_inverts_y() {
        let size = PhysicalSize::new(800, 600);
        let ndc = screen_to_ndc([0.0, 0.0], size);
        assert_eq!(ndc, [-1.0, 1.0]);
        let back = ndc_to_screen(ndc, size);
        assert_eq!(back, [0.0, 0.0]);

        let centre = screen_to_ndc([400.0, 300.0], size);
        assert!(centre[0].abs() < EPSILON && centre[1].abs() < EPSILON);
    }

    #[test]
    fn world_screen_round_trip_recovers_coordinates() {
        let rig = rig();
        let world = Vec3::new(0.2, -0.1, 0.4);
        let screen = rig.world_to_screen(world).expect("in front of camera");
        let clip = rig.active_view_projection() * world.extend(1.0);
        let depth = clip.z / clip.w;
        let recovered = rig.screen_to_world(screen, depth);
        assert!(
            recovered.distance(world) < EPSILON,
            "{recovered} != {world}"
        );
    }

    #[test]
    fn points_behind_the_perspective_eye_do_not_project() {
        let rig = rig();
        assert!(rig.world_to_screen(Vec3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn mode_toggle_emits_changed_once() {
        let mut rig = rig();
        let count = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let seen = std::rc::Rc::clone(&count);
        rig.on_changed().subscribe(move |_| seen.set(seen.get() + 1));

        rig.set_mode(CameraMode::Orthographic);
        rig.set_mode(CameraMode::Orthographic);
        assert_eq!(count.get(), 1);
        assert_eq!(rig.mode(), CameraMode::Orthographic);
    }

    #[test]
    fn resize_reconfigures_aspect_in_place() {
        let mut rig = rig();
        rig.resize(PhysicalSize::new(400, 400));
        assert!((rig.perspective.aspect - 1.0).abs() < EPSILON);
        assert!((rig.orthographic.aspect - 1.0).abs() < EPSILON);
        assert!((rig.pip.aspect - 1.0).abs() < EPSILON);
    }

    #[test]
    fn ortho_zoom_keeps_pip_fraction() {
        let mut rig = rig();
        rig.set_ortho_zoom(2.0);
        assert!((rig.pip.half_height - 2.0 * PIP_ZOOM_FRACTION).abs() < EPSILON);
    }
}
