//! Frame composition. The viewport describes each frame as an ordered list
//! of passes — which scene, which camera, which viewport/scissor rectangle,
//! and how the color and depth attachments load — and the viewer executes
//! that plan verbatim. Keeping the plan as data makes the pass sequencing
//! (including the depth-reset trick and the PIP pass) testable without a
//! GPU device.

use winit::dpi::PhysicalSize;

use crate::camera::CameraMode;

/// Side length of the square picture-in-picture viewport, in pixels.
pub const PIP_SIZE: u32 = 180;

pub const MAIN_CLEAR_COLOR: [f64; 4] = [0.086, 0.098, 0.125, 1.0];
pub const PIP_CLEAR_COLOR: [f64; 4] = [0.047, 0.055, 0.078, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassScene {
    /// Mesh + landmark views.
    Primary,
    /// Connectivity lines in the mirrored helper hierarchy.
    Helper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassCamera {
    /// Whichever of perspective/orthographic-main is engaged.
    Active,
    /// The orthographic zoom camera.
    Pip,
}

/// Pixel rectangle used for both the viewport and the scissor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One render pass. `clear_color: None` means load the existing color
/// output — that is what lets the helper pass draw connectivity lines over
/// the mesh while the cleared depth buffer lets them show through it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePass {
    pub scene: PassScene,
    pub camera: PassCamera,
    pub rect: PassRect,
    pub clear_color: Option<[f64; 4]>,
    pub clear_depth: bool,
}

/// The whole frame, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub passes: Vec<FramePass>,
}

impl FramePlan {
    pub fn pip_passes(&self) -> impl Iterator<Item = &FramePass> {
        self.passes
            .iter()
            .filter(|pass| pass.camera == PassCamera::Pip)
    }

    pub fn helper_passes(&self) -> impl Iterator<Item = &FramePass> {
        self.passes
            .iter()
            .filter(|pass| pass.scene == PassScene::Helper)
    }
}

/// Fixed-size PIP rectangle anchored at the canvas's bottom-right corner,
/// or `None` when the canvas is too small to host it.
pub fn pip_rect(canvas: PhysicalSize<u32>) -> Option<PassRect> {
    if canvas.width <= PIP_SIZE || canvas.height <= PIP_SIZE {
        return None;
    }
    Some(PassRect {
        x: canvas.width - PIP_SIZE,
        y: canvas.height - PIP_SIZE,
        width: PIP_SIZE,
        height: PIP_SIZE,
    })
}

/// Build the pass list for one frame.
///
/// 1. Primary scene, active camera, full canvas, full clear.
/// 2. With connectivity on: helper scene, depth cleared but color loaded.
/// 3. In orthographic mode: the PIP pass (and its own helper pass) into the
///    bottom-right rectangle with the PIP clear color; the main clear color
///    applies again on the next frame's first pass.
pub fn build_frame_plan(
    canvas: PhysicalSize<u32>,
    mode: CameraMode,
    connectivity_on: bool,
) -> FramePlan {
    let full = PassRect {
        x: 0,
        y: 0,
        width: canvas.width.max(1),
        height: canvas.height.max(1),
    };

    let mut passes = vec![FramePass {
        scene: PassScene::Primary,
        camera: PassCamera::Active,
        rect: full,
        clear_color: Some(MAIN_CLEAR_COLOR),
        clear_depth: true,
    }];

    if connectivity_on {
        passes.push(FramePass {
            scene: PassScene::Helper,
            camera: PassCamera::Active,
            rect: full,
            clear_color: None,
            clear_depth: true,
        });
    }

    if mode == CameraMode::Orthographic {
        if let Some(rect) = pip_rect(canvas) {
            passes.push(FramePass {
                scene: PassScene::Primary,
                camera: PassCamera::Pip,
                rect,
                clear_color: Some(PIP_CLEAR_COLOR),
                clear_depth: true,
            });
            if connectivity_on {
                passes.push(FramePass {
                    scene: PassScene::Helper,
                    camera: PassCamera::Pip,
                    rect,
                    clear_color: None,
                    clear_depth: true,
                });
            }
        }
    }

    FramePlan { passes }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: PhysicalSize<u32> = PhysicalSize::new(800, 600);

    #[test]
    fn perspective_mode_never_includes_a_pip_pass() {
        let plan = build_frame_plan(CANVAS, CameraMode::Perspective, true);
        assert_eq!(plan.passes.len(), 2);
        assert_eq!(plan.pip_passes().count(), 0);
    }

    #[test]
    fn orthographic_mode_appends_the_pip_pass() {
        let plan = build_frame_plan(CANVAS, CameraMode::Orthographic, false);
        assert_eq!(plan.passes.len(), 2);
        let pip = plan.pip_passes().next().expect("pip pass");
        assert_eq!(pip.rect.x, 800 - PIP_SIZE);
        assert_eq!(pip.rect.y, 600 - PIP_SIZE);
        assert_eq!(pip.clear_color, Some(PIP_CLEAR_COLOR));
    }

    #[test]
    fn helper_passes_reset_depth_but_keep_color() {
        let plan = build_frame_plan(CANVAS, CameraMode::Orthographic, true);
        assert_eq!(plan.passes.len(), 4);
        for pass in plan.helper_passes() {
            assert!(pass.clear_depth);
            assert!(pass.clear_color.is_none());
        }
        // Order: primary, helper, pip primary, pip helper.
        assert_eq!(plan.passes[0].scene, PassScene::Primary);
        assert_eq!(plan.passes[1].scene, PassScene::Helper);
        assert_eq!(plan.passes[2].camera, PassCamera::Pip);
        assert_eq!(plan.passes[3].camera, PassCamera::Pip);
    }

    #[test]
    fn tiny_canvases_skip_the_pip_pass() {
        let plan = build_frame_plan(
            PhysicalSize::new(PIP_SIZE, PIP_SIZE),
            CameraMode::Orthographic,
            false,
        );
        assert_eq!(plan.pip_passes().count(), 0);
    }
}
