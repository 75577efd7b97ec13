//! Viewport core for the meshmark landmarking tool: a scene-graph manager
//! with a mirrored helper hierarchy for connectivity overlays, a dual-camera
//! rig with a picture-in-picture pass, ray picking against the active mesh
//! (octree-accelerated), a dirty-rectangle 2D overlay surface, and the
//! atomic-operation gate that batches model mutations into a single render.
//!
//! Everything here is CPU-side and single-threaded; the viewer binary turns
//! the [`compositor::FramePlan`] this crate produces into actual GPU passes.

pub mod camera;
pub mod compositor;
pub mod gate;
pub mod octree;
pub mod overlay;
pub mod picking;
pub mod scene;
pub mod viewport;

pub use camera::{CameraMode, CameraRig};
pub use compositor::{FramePass, FramePlan, PassCamera, PassScene};
pub use gate::RenderGate;
pub use octree::Octree;
pub use overlay::OverlayCanvas;
pub use picking::{Intersection, PickHit, PickTarget};
pub use scene::SceneGraph;
pub use viewport::Viewport;
