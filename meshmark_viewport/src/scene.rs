//! Scene-graph manager. Two structurally identical transform chains hang
//! under the root: the primary chain (mesh + landmark views) and the helper
//! chain (connectivity lines drawn with a depth reset so they show through
//! the mesh). Both chains are ScaleRotate → Translate → content, and every
//! transform mutation runs through one method that writes both, so they
//! cannot drift apart.

pub mod orientation;

use glam::{Mat4, Quat, Vec3};
use meshmark_model::{LandmarkSet, MeshAsset, TriMesh};
use std::rc::Rc;

use orientation::{nearest_axis, reorientation, CanonicalAxis};

/// Landmark sphere radius in normalized (unit-sphere) world units.
pub const LANDMARK_RADIUS: f32 = 0.02;

/// Transforms for one ScaleRotate → Translate chain. The ScaleRotate node
/// holds the unit-sphere normalization scale and all accumulated
/// reorientation rotations; the Translate node recenters the mesh's
/// bounding sphere at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransforms {
    pub scale: f32,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl NodeTransforms {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Full local→world matrix: translate first, then scale and rotate.
    pub fn world_from_local(&self) -> Mat4 {
        Mat4::from_quat(self.rotation)
            * Mat4::from_scale(Vec3::splat(self.scale))
            * Mat4::from_translation(self.translation)
    }
}

/// Visual representation of one placed landmark, positioned in the
/// MeshAndLandmarks node's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkView {
    pub index: u32,
    pub position: Vec3,
}

/// One connectivity edge's line in the helper chain, referencing its two
/// endpoint landmark views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectivityView {
    pub start: u32,
    pub end: u32,
    pub start_position: Vec3,
    pub end_position: Vec3,
}

pub struct SceneGraph {
    primary: NodeTransforms,
    helper: NodeTransforms,
    current_up: CanonicalAxis,
    mesh: Option<Rc<TriMesh>>,
    landmark_views: Vec<LandmarkView>,
    connectivity_views: Vec<ConnectivityView>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self {
            primary: NodeTransforms::IDENTITY,
            helper: NodeTransforms::IDENTITY,
            current_up: CanonicalAxis::PosY,
            mesh: None,
            landmark_views: Vec::new(),
            connectivity_views: Vec::new(),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The one route through which transforms change. Applying the mutation
    /// to the primary and helper chains in the same call keeps the helper
    /// hierarchy transform-identical to the primary one.
    fn mutate_transforms(&mut self, mutate: impl Fn(&mut NodeTransforms)) {
        mutate(&mut self.primary);
        mutate(&mut self.helper);
        debug_assert_eq!(self.primary, self.helper);
    }

    /// Swap in a new active mesh (or tear the current one down with `None`).
    /// The transforms are recomputed so the mesh's bounding sphere lands in
    /// the unit sphere at the origin, oriented by the asset's up/front
    /// hints.
    pub fn set_active_mesh(&mut self, asset: Option<&MeshAsset>) {
        let Some(asset) = asset else {
            self.mesh = None;
            self.mutate_transforms(|transforms| *transforms = NodeTransforms::IDENTITY);
            self.current_up = CanonicalAxis::PosY;
            return;
        };

        let sphere = asset.mesh.bounding_sphere();
        let scale = if sphere.radius > 0.0 {
            1.0 / sphere.radius
        } else {
            1.0
        };
        let translation = -sphere.center;
        let rotation = orientation_from_up_front(asset.up, asset.front);
        self.mutate_transforms(|transforms| {
            *transforms = NodeTransforms {
                scale,
                rotation,
                translation,
            };
        });
        self.current_up = nearest_axis(asset.up);
        self.mesh = Some(Rc::new(asset.mesh.clone()));
        log::info!(
            "active mesh: {} triangles, radius {:.3}, centre {:?}",
            asset.mesh.triangle_count(),
            sphere.radius,
            sphere.center
        );
    }

    /// Snap the up direction to the canonical axis nearest `target` and
    /// rotate both chains accordingly. Returns `true` when anything moved.
    pub fn reorient_up(&mut self, target: Vec3) -> bool {
        let target_axis = nearest_axis(target);
        let Some(correction) = reorientation(self.current_up, target_axis) else {
            return false;
        };
        let quaternion = correction.quaternion();
        self.mutate_transforms(|transforms| {
            transforms.rotation = quaternion * transforms.rotation;
        });
        self.current_up = target_axis;
        log::debug!("up reoriented to {:?}", target_axis);
        true
    }

    /// Throw away every landmark and connectivity view and build fresh ones
    /// from `set`. No incremental diffing: the set's identity changed, so
    /// the old views are disposed wholesale. Callers run this under the
    /// atomic-operation gate so only one render results.
    pub fn rebuild_views(&mut self, set: &LandmarkSet) {
        self.landmark_views.clear();
        self.connectivity_views.clear();

        for (index, position) in set.placed() {
            self.landmark_views.push(LandmarkView {
                index,
                position: Vec3::from(position),
            });
        }
        for &[start, end] in &set.connectivity {
            let Some(start_position) = set.landmarks.get(start as usize).and_then(|l| l.position)
            else {
                continue;
            };
            let Some(end_position) = set.landmarks.get(end as usize).and_then(|l| l.position)
            else {
                continue;
            };
            self.connectivity_views.push(ConnectivityView {
                start,
                end,
                start_position: Vec3::from(start_position),
                end_position: Vec3::from(end_position),
            });
        }
    }

    pub fn mesh(&self) -> Option<&Rc<TriMesh>> {
        self.mesh.as_ref()
    }

    pub fn landmark_views(&self) -> &[LandmarkView] {
        &self.landmark_views
    }

    pub fn connectivity_views(&self) -> &[ConnectivityView] {
        &self.connectivity_views
    }

    pub fn current_up(&self) -> CanonicalAxis {
        self.current_up
    }

    pub fn transforms(&self) -> &NodeTransforms {
        &self.primary
    }

    pub fn helper_transforms(&self) -> &NodeTransforms {
        &self.helper
    }

    pub fn world_from_local(&self) -> Mat4 {
        self.primary.world_from_local()
    }

    /// World-space position of a landmark view.
    pub fn landmark_world_position(&self, view: &LandmarkView) -> Vec3 {
        self.world_from_local().transform_point3(view.position)
    }
}

/// Look-at style orientation: the local up axis aims along `up` and the
/// local forward axis is swung toward `front`. Degenerate hints (zero or
/// parallel vectors) fall back to the identity.
fn orientation_from_up_front(up: Vec3, front: Vec3) -> Quat {
    let forward = front.normalize_or_zero();
    let up = up.normalize_or_zero();
    let right = up.cross(forward);
    if right.length_squared() <= f32::EPSILON {
        return Quat::IDENTITY;
    }
    let right = right.normalize();
    let true_up = forward.cross(right);
    Quat::from_mat3(&glam::Mat3::from_cols(right, true_up, forward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmark_model::{mesh::unit_sphere, Landmark, MeshVertex};
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn offset_mesh() -> MeshAsset {
        // Bounding sphere of radius 2 centred at (1, 0, 0).
        let vertices = vec![
            MeshVertex {
                position: [-1.0, 0.0, 0.0],
                normal: [0.0, 1.0, 0.0],
            },
            MeshVertex {
                position: [3.0, 0.0, 0.0],
                normal: [0.0, 1.0, 0.0],
            },
            MeshVertex {
                position: [1.0, 0.0, 0.0],
                normal: [0.0, 1.0, 0.0],
            },
        ];
        MeshAsset::new(TriMesh::new(vertices, vec![0, 1, 2]).expect("mesh"))
    }

    #[test]
    fn active_mesh_normalizes_scale_and_translation() {
        let mut scene = SceneGraph::new();
        scene.set_active_mesh(Some(&offset_mesh()));

        let transforms = scene.transforms();
        assert!((transforms.scale - 0.5).abs() < EPSILON);
        assert!(transforms.translation.distance(Vec3::new(-1.0, 0.0, 0.0)) < EPSILON);
        assert_eq!(scene.transforms(), scene.helper_transforms());
    }

    #[test]
    fn normalized_mesh_fits_in_the_unit_sphere() {
        let mut asset = MeshAsset::new(unit_sphere());
        // Push the sphere off-centre and inflate it.
        for vertex in &mut asset.mesh.vertices {
            for (component, offset) in vertex.position.iter_mut().zip([4.0, -2.0, 1.0]) {
                *component = *component * 3.0 + offset;
            }
        }
        let mut scene = SceneGraph::new();
        scene.set_active_mesh(Some(&asset));

        let world = scene.world_from_local();
        for vertex in &asset.mesh.vertices {
            let mapped = world.transform_point3(Vec3::from(vertex.position));
            assert!(mapped.length() <= 1.0 + 1e-4, "{mapped} escaped");
        }
    }

    #[test]
    fn clearing_the_mesh_resets_both_chains() {
        let mut scene = SceneGraph::new();
        scene.set_active_mesh(Some(&offset_mesh()));
        scene.set_active_mesh(None);
        assert!(scene.mesh().is_none());
        assert_eq!(*scene.transforms(), NodeTransforms::IDENTITY);
        assert_eq!(*scene.helper_transforms(), NodeTransforms::IDENTITY);
    }

    #[test]
    fn reorient_to_z_is_a_quarter_turn_about_x() {
        let mut scene = SceneGraph::new();
        assert!(scene.reorient_up(Vec3::new(0.1, 0.2, 0.9)));
        assert_eq!(scene.current_up(), CanonicalAxis::PosZ);

        let expected = Quat::from_axis_angle(Vec3::X, FRAC_PI_2);
        let actual = scene.transforms().rotation;
        assert!(actual.angle_between(expected) < 1e-4);
        assert_eq!(scene.transforms(), scene.helper_transforms());
    }

    #[test]
    fn reorienting_twice_to_the_same_target_is_a_noop() {
        let mut scene = SceneGraph::new();
        assert!(scene.reorient_up(Vec3::Z));
        let after_first = *scene.transforms();
        assert!(!scene.reorient_up(Vec3::Z));
        assert_eq!(*scene.transforms(), after_first);
    }

    #[test]
    fn reorientation_always_lands_on_a_canonical_axis() {
        let mut scene = SceneGraph::new();
        for direction in [
            Vec3::new(0.3, -0.8, 0.1),
            Vec3::new(-0.9, 0.1, 0.0),
            Vec3::new(0.2, 0.3, -0.99),
            Vec3::new(0.0, -1.0, 0.0),
        ] {
            scene.reorient_up(direction);
            let up = scene.current_up().vector();
            assert!(
                CanonicalAxis::ALL.iter().any(|axis| axis.vector() == up),
                "{up} is not canonical"
            );
        }
    }

    #[test]
    fn rebuild_replaces_views_wholesale() {
        let mut scene = SceneGraph::new();
        let first = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.0, 0.0, 0.0]),
                Landmark::placed(1, [1.0, 0.0, 0.0]),
            ],
            vec![[0, 1]],
        )
        .expect("set");
        scene.rebuild_views(&first);
        assert_eq!(scene.landmark_views().len(), 2);
        assert_eq!(scene.connectivity_views().len(), 1);

        let second = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.5, 0.5, 0.5]),
                Landmark {
                    index: 1,
                    position: None,
                },
            ],
            vec![[0, 1]],
        )
        .expect("set");
        scene.rebuild_views(&second);
        assert_eq!(scene.landmark_views().len(), 1);
        // The edge's endpoint is unplaced, so no line view survives.
        assert!(scene.connectivity_views().is_empty());
    }

    #[test]
    fn up_front_orientation_aims_the_local_axes() {
        let rotation = orientation_from_up_front(Vec3::Z, Vec3::Y);
        assert!((rotation * Vec3::Z).distance(Vec3::Y) < EPSILON);
        assert!((rotation * Vec3::Y).distance(Vec3::Z) < EPSILON);
    }
}
