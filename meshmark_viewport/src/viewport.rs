//! The viewport orchestrator: owns the scene graph, camera rig, octree,
//! overlay surface, and the atomic-operation gate, reacts to model change
//! notifications, and produces the frame plans the viewer executes. All
//! model-driven mutations route through here so batching and render
//! requests stay consistent.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use meshmark_model::{LandmarkSet, MeshAsset, ModelEvent, Subscription};
use winit::dpi::PhysicalSize;

use crate::camera::{CameraMode, CameraRig};
use crate::compositor::{build_frame_plan, FramePlan};
use crate::gate::RenderGate;
use crate::octree::Octree;
use crate::overlay::OverlayCanvas;
use crate::picking::{
    intersect_scene, landmark_visible, landmarks_in_rect, screen_ray, Intersection, PickTarget,
    ScreenRect,
};
use crate::scene::SceneGraph;

/// Read-only view of the model state the viewport consumes when handling a
/// change notification.
#[derive(Clone, Copy)]
pub struct ModelView<'a> {
    pub mesh: Option<&'a MeshAsset>,
    pub landmarks: &'a LandmarkSet,
}

pub struct Viewport {
    scene: SceneGraph,
    rig: CameraRig,
    gate: RenderGate,
    overlay: OverlayCanvas,
    octree: Option<Octree>,
    connectivity_on: bool,
    editing: bool,
    target_attached: bool,
    pip_decoration_visible: bool,
    pip_subscription: Option<Subscription>,
    needs_redraw: Rc<Cell<bool>>,
    frames_planned: u64,
}

impl Viewport {
    /// Create the viewport in its unattached state; render requests are
    /// silent no-ops until [`Viewport::attach_target`] runs.
    pub fn new(size: PhysicalSize<u32>) -> Self {
        let rig = CameraRig::new(size);
        let gate = RenderGate::new();
        let needs_redraw = Rc::new(Cell::new(false));

        // Camera mutations request a render like any other state change,
        // respecting the gate.
        let redraw = Rc::clone(&needs_redraw);
        let gate_for_camera = gate.clone();
        rig.on_changed().subscribe(move |_| {
            if gate_for_camera.request() {
                redraw.set(true);
            }
        });

        Self {
            scene: SceneGraph::new(),
            rig,
            gate,
            overlay: OverlayCanvas::new(size),
            octree: None,
            connectivity_on: false,
            editing: false,
            target_attached: false,
            pip_decoration_visible: false,
            pip_subscription: None,
            needs_redraw,
            frames_planned: 0,
        }
    }

    /// Mark the render target ready. Until this runs, `render_frame` is a
    /// no-op so early render requests cannot fail.
    pub fn attach_target(&mut self) {
        self.target_attached = true;
        self.request_render();
    }

    /// Ask for a redraw. Swallowed while an atomic batch is open.
    pub fn request_render(&self) {
        if self.gate.request() {
            self.needs_redraw.set(true);
        }
    }

    /// True when something changed since the last planned frame.
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw.get()
    }

    /// Plan one frame. Idempotent and safe to call at any time: returns
    /// `None` while suppressed by the gate or before a target is attached.
    pub fn render_frame(&mut self) -> Option<FramePlan> {
        if !self.target_attached {
            log::trace!("render request before target attach; ignoring");
            return None;
        }
        if self.gate.suppressed() {
            self.request_render();
            return None;
        }
        self.needs_redraw.set(false);
        self.frames_planned += 1;
        Some(build_frame_plan(
            self.rig.size(),
            self.rig.mode(),
            self.connectivity_on,
        ))
    }

    pub fn frames_planned(&self) -> u64 {
        self.frames_planned
    }

    /// Run `operation` as one atomic batch: intermediate render requests
    /// are suppressed and at most one redraw results. Nests freely; only
    /// the outermost batch schedules the redraw.
    pub fn run_atomic<R>(&mut self, operation: impl FnOnce(&mut Self) -> R) -> R {
        let gate = self.gate.clone();
        let (output, render_due) = gate.run_atomic(|| operation(self));
        if render_due {
            self.needs_redraw.set(true);
        }
        output
    }

    /// Dispatch a model change notification.
    pub fn apply_event(&mut self, event: &ModelEvent, model: ModelView<'_>) {
        match event {
            ModelEvent::NewMeshAvailable => self.set_active_mesh(model.mesh),
            ModelEvent::LandmarksChanged => self.set_landmarks(model.landmarks),
            ModelEvent::ConnectivityToggled(on) => {
                self.connectivity_on = *on;
                self.request_render();
            }
            ModelEvent::EditingToggled(on) => {
                self.editing = *on;
                // Editing gestures own the mouse; camera orbiting yields.
                self.rig.allow_rotation(!*on);
                self.request_render();
            }
        }
    }

    /// Swap the active mesh (and its octree) in one batch.
    pub fn set_active_mesh(&mut self, asset: Option<&MeshAsset>) {
        self.run_atomic(|viewport| {
            viewport.scene.set_active_mesh(asset);
            viewport.octree = viewport.scene.mesh().map(|mesh| Octree::build(mesh));
            viewport.request_render();
        });
    }

    /// Rebuild every landmark and connectivity view from `set` in one
    /// batch: dispose-all then reconstruct, one redraw.
    pub fn set_landmarks(&mut self, set: &LandmarkSet) {
        self.run_atomic(|viewport| {
            viewport.scene.rebuild_views(set);
            viewport.request_render();
        });
    }

    /// Toggle between the perspective and orthographic-main cameras. The
    /// PIP decoration follows orthographic mode, and the viewport only
    /// listens for PIP changes while they can matter.
    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        if self.rig.mode() == mode {
            return;
        }
        self.rig.set_mode(mode);
        match mode {
            CameraMode::Orthographic => {
                self.pip_decoration_visible = true;
                let redraw = Rc::clone(&self.needs_redraw);
                let gate = self.gate.clone();
                self.pip_subscription = Some(self.rig.on_pip_changed().subscribe(move |_| {
                    if gate.request() {
                        redraw.set(true);
                    }
                }));
            }
            CameraMode::Perspective => {
                self.pip_decoration_visible = false;
                if let Some(subscription) = self.pip_subscription.take() {
                    self.rig.on_pip_changed().unsubscribe(subscription);
                }
            }
        }
    }

    pub fn pip_decoration_visible(&self) -> bool {
        self.pip_decoration_visible
    }

    pub fn connectivity_on(&self) -> bool {
        self.connectivity_on
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    /// Resize the canvas: cameras are reconfigured and the overlay surface
    /// reallocated.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.rig.resize(size);
        self.overlay.resize(size);
    }

    /// Resolve a screen point against `target`, nearest hit first.
    pub fn intersect(&self, screen_x: f32, screen_y: f32, target: PickTarget) -> Vec<Intersection> {
        let ray = screen_ray(&self.rig, [screen_x, screen_y]);
        intersect_scene(&self.scene, self.octree.as_ref(), &ray, target)
    }

    /// Snap the scene's up direction toward `target`.
    pub fn reorient_up(&mut self, target: Vec3) {
        if self.scene.reorient_up(target) {
            self.request_render();
        }
    }

    pub fn landmark_visible(&self, index: u32) -> bool {
        landmark_visible(&self.scene, self.octree.as_ref(), &self.rig, index)
    }

    pub fn landmarks_in_rect(&self, rect: &ScreenRect) -> Vec<u32> {
        landmarks_in_rect(&self.scene, &self.rig, rect)
    }

    pub fn screen_to_world(&self, screen: [f32; 2], depth: f32) -> Vec3 {
        self.rig.screen_to_world(screen, depth)
    }

    pub fn world_to_screen(&self, world: Vec3) -> Option<[f32; 2]> {
        self.rig.world_to_screen(world)
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut CameraRig {
        &mut self.rig
    }

    pub fn overlay(&self) -> &OverlayCanvas {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayCanvas {
        &mut self.overlay
    }

    pub fn octree(&self) -> Option<&Octree> {
        self.octree.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmark_model::{mesh::unit_sphere, Landmark};

    fn viewport() -> Viewport {
        let mut viewport = Viewport::new(PhysicalSize::new(800, 600));
        viewport.attach_target();
        viewport
    }

    fn landmark_set() -> LandmarkSet {
        LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.0, 0.0, 1.0]),
                Landmark::placed(1, [0.0, 1.0, 0.0]),
            ],
            vec![[0, 1]],
        )
        .expect("set")
    }

    #[test]
    fn render_before_attach_is_a_silent_noop() {
        let mut viewport = Viewport::new(PhysicalSize::new(800, 600));
        assert!(viewport.render_frame().is_none());
        viewport.attach_target();
        assert!(viewport.render_frame().is_some());
    }

    #[test]
    fn mesh_swap_builds_the_octree_and_requests_one_redraw() {
        let mut viewport = viewport();
        viewport.render_frame();
        assert!(!viewport.needs_redraw());

        viewport.set_active_mesh(Some(&MeshAsset::new(unit_sphere())));
        assert!(viewport.octree().is_some());
        assert!(viewport.needs_redraw());
    }

    #[test]
    fn renders_inside_a_batch_are_suppressed() {
        let mut viewport = viewport();
        viewport.run_atomic(|viewport| {
            viewport.set_active_mesh(Some(&MeshAsset::new(unit_sphere())));
            viewport.set_landmarks(&landmark_set());
            assert!(viewport.render_frame().is_none());
            assert!(!viewport.needs_redraw());
        });
        // One redraw for the whole batch.
        assert!(viewport.needs_redraw());
        let frames = viewport.frames_planned();
        viewport.render_frame();
        assert_eq!(viewport.frames_planned(), frames + 1);
        assert!(!viewport.needs_redraw());
    }

    #[test]
    fn landmark_rebuild_is_batched() {
        let mut viewport = viewport();
        viewport.set_active_mesh(Some(&MeshAsset::new(unit_sphere())));
        viewport.render_frame();

        viewport.set_landmarks(&landmark_set());
        assert_eq!(viewport.scene().landmark_views().len(), 2);
        assert_eq!(viewport.scene().connectivity_views().len(), 1);
        assert!(viewport.needs_redraw());
    }

    #[test]
    fn camera_toggle_drives_pip_decoration_and_passes() {
        let mut viewport = viewport();
        viewport.apply_event(
            &ModelEvent::ConnectivityToggled(true),
            ModelView {
                mesh: None,
                landmarks: &LandmarkSet::default(),
            },
        );
        assert!(!viewport.pip_decoration_visible());

        viewport.set_camera_mode(CameraMode::Orthographic);
        assert!(viewport.pip_decoration_visible());
        let plan = viewport.render_frame().expect("plan");
        assert_eq!(plan.pip_passes().count(), 2);
        assert_eq!(plan.helper_passes().count(), 2);

        viewport.set_camera_mode(CameraMode::Perspective);
        assert!(!viewport.pip_decoration_visible());
        let plan = viewport.render_frame().expect("plan");
        assert_eq!(plan.pip_passes().count(), 0);
    }

    #[test]
    fn pip_notifications_only_land_while_orthographic() {
        let mut viewport = viewport();
        viewport.set_camera_mode(CameraMode::Orthographic);
        viewport.render_frame();

        viewport.rig().on_pip_changed().emit(&());
        assert!(viewport.needs_redraw());
        viewport.render_frame();

        viewport.set_camera_mode(CameraMode::Perspective);
        viewport.render_frame();
        viewport.rig().on_pip_changed().emit(&());
        assert!(!viewport.needs_redraw());
    }

    #[test]
    fn camera_changes_request_renders_through_the_gate() {
        let mut viewport = viewport();
        viewport.render_frame();

        viewport.rig_mut().focus(Vec3::new(0.1, 0.0, 0.0));
        assert!(viewport.needs_redraw());
        viewport.render_frame();

        viewport.run_atomic(|viewport| {
            viewport.rig_mut().focus(Vec3::ZERO);
            assert!(!viewport.needs_redraw());
        });
        assert!(viewport.needs_redraw());
    }

    #[test]
    fn editing_mode_locks_camera_rotation() {
        let mut viewport = viewport();
        let model = LandmarkSet::default();
        viewport.apply_event(
            &ModelEvent::EditingToggled(true),
            ModelView {
                mesh: None,
                landmarks: &model,
            },
        );
        assert!(viewport.editing());
        assert!(!viewport.rig().rotation_allowed());
    }

    #[test]
    fn reorienting_the_scene_requests_a_redraw() {
        let mut viewport = viewport();
        viewport.render_frame();
        viewport.reorient_up(Vec3::Z);
        assert!(viewport.needs_redraw());

        viewport.render_frame();
        viewport.reorient_up(Vec3::Z);
        assert!(!viewport.needs_redraw(), "repeat reorientation is a no-op");
    }
}
