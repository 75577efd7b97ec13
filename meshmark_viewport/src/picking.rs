//! Screen-point picking. A screen coordinate becomes a world-space ray
//! whose shape depends on the active projection — perspective rays fan out
//! from the eye, orthographic rays are parallel along the camera's view
//! axis — and the ray is resolved against the mesh (through the octree when
//! one exists) or against landmark spheres. Everything degrades to "no
//! intersections" rather than failing: picking runs inside mouse handlers
//! where a bad frame must not halt interaction.

use glam::Vec3;

use crate::camera::{screen_to_ndc, CameraRig};
use crate::octree::Octree;
use crate::scene::{SceneGraph, LANDMARK_RADIUS};

const RAY_EPSILON: f32 = 1e-7;

/// World-space ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// What to test the pick ray against. An explicit tag, not runtime type
/// inspection: callers say exactly which objects they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    /// Nothing; the pick returns empty immediately.
    None,
    /// The active mesh.
    Mesh,
    /// Every landmark view.
    Landmarks,
    /// A single landmark view by index.
    Landmark(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickHit {
    Mesh { triangle: usize },
    Landmark { index: u32 },
}

/// One resolved intersection, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub distance: f32,
    pub point: Vec3,
    pub hit: PickHit,
}

/// Axis-aligned screen-space rectangle used for group selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl ScreenRect {
    pub fn from_corners(a: [f32; 2], b: [f32; 2]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }

    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.min[0]
            && point[0] <= self.max[0]
            && point[1] >= self.min[1]
            && point[1] <= self.max[1]
    }
}

/// Build the world-space pick ray for a screen point. Perspective rays run
/// from the eye through the point unprojected at mid-depth; orthographic
/// rays start on the near plane and all share the camera's forward
/// direction.
pub fn screen_ray(rig: &CameraRig, screen: [f32; 2]) -> Ray {
    let ndc = screen_to_ndc(screen, rig.size());
    if rig.is_perspective() {
        let through = rig.unproject(ndc, 0.5);
        Ray {
            origin: rig.active_eye(),
            direction: (through - rig.active_eye()).normalize_or_zero(),
        }
    } else {
        Ray {
            origin: rig.unproject(ndc, 0.0),
            direction: rig.active_forward(),
        }
    }
}

/// Resolve `ray` against `target`, nearest hit first.
pub fn intersect_scene(
    scene: &SceneGraph,
    octree: Option<&Octree>,
    ray: &Ray,
    target: PickTarget,
) -> Vec<Intersection> {
    let mut hits = match target {
        PickTarget::None => Vec::new(),
        PickTarget::Mesh => intersect_mesh(scene, octree, ray).into_iter().collect(),
        PickTarget::Landmark(index) => scene
            .landmark_views()
            .iter()
            .filter(|view| view.index == index)
            .filter_map(|view| intersect_landmark(scene, ray, view))
            .collect(),
        PickTarget::Landmarks => scene
            .landmark_views()
            .iter()
            .filter_map(|view| intersect_landmark(scene, ray, view))
            .collect(),
    };
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

fn intersect_mesh(scene: &SceneGraph, octree: Option<&Octree>, ray: &Ray) -> Option<Intersection> {
    let mesh = scene.mesh()?;
    let world_from_local = scene.world_from_local();
    let local_from_world = world_from_local.inverse();

    let local_ray = Ray {
        origin: local_from_world.transform_point3(ray.origin),
        direction: local_from_world
            .transform_vector3(ray.direction)
            .normalize_or_zero(),
    };

    let (local_distance, triangle) = match octree {
        Some(octree) => octree.intersect(mesh, &local_ray)?,
        None => {
            let mut best: Option<(f32, usize)> = None;
            for index in 0..mesh.triangle_count() {
                if let Some(distance) = ray_triangle(&local_ray, &mesh.triangle(index)) {
                    if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                        best = Some((distance, index));
                    }
                }
            }
            best?
        }
    };

    let world_point = world_from_local.transform_point3(local_ray.point_at(local_distance));
    Some(Intersection {
        distance: world_point.distance(ray.origin),
        point: world_point,
        hit: PickHit::Mesh { triangle },
    })
}

fn intersect_landmark(
    scene: &SceneGraph,
    ray: &Ray,
    view: &crate::scene::LandmarkView,
) -> Option<Intersection> {
    let centre = scene.landmark_world_position(view);
    let distance = ray_sphere(ray, centre, LANDMARK_RADIUS)?;
    Some(Intersection {
        distance,
        point: ray.point_at(distance),
        hit: PickHit::Landmark { index: view.index },
    })
}

/// Möller–Trumbore ray/triangle intersection, both-sided. Returns the
/// distance along the ray.
pub fn ray_triangle(ray: &Ray, corners: &[Vec3; 3]) -> Option<f32> {
    let edge1 = corners[1] - corners[0];
    let edge2 = corners[2] - corners[0];
    let p = ray.direction.cross(edge2);
    let determinant = edge1.dot(p);
    if determinant.abs() < RAY_EPSILON {
        return None;
    }
    let inv_determinant = 1.0 / determinant;
    let to_origin = ray.origin - corners[0];
    let u = to_origin.dot(p) * inv_determinant;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = to_origin.cross(edge1);
    let v = ray.direction.dot(q) * inv_determinant;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let distance = edge2.dot(q) * inv_determinant;
    (distance > RAY_EPSILON).then_some(distance)
}

/// Nearest ray/sphere intersection distance.
pub fn ray_sphere(ray: &Ray, centre: Vec3, radius: f32) -> Option<f32> {
    let to_centre = centre - ray.origin;
    let projection = to_centre.dot(ray.direction);
    let closest_sq = to_centre.length_squared() - projection * projection;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let near = projection - half_chord;
    let far = projection + half_chord;
    if near > RAY_EPSILON {
        Some(near)
    } else if far > RAY_EPSILON {
        Some(far)
    } else {
        None
    }
}

/// Whether the landmark is visible from the active camera: true when no
/// mesh hit exists along the ray toward it, or the mesh hit is farther
/// away than the landmark itself.
pub fn landmark_visible(
    scene: &SceneGraph,
    octree: Option<&Octree>,
    rig: &CameraRig,
    index: u32,
) -> bool {
    let Some(view) = scene
        .landmark_views()
        .iter()
        .find(|view| view.index == index)
    else {
        return false;
    };
    let world = scene.landmark_world_position(view);
    let Some(screen) = rig.world_to_screen(world) else {
        return false;
    };
    let ray = screen_ray(rig, screen);

    let landmark_distance = ray_sphere(&ray, world, LANDMARK_RADIUS)
        .unwrap_or_else(|| world.distance(ray.origin) - LANDMARK_RADIUS);
    match intersect_mesh(scene, octree, &ray) {
        None => true,
        Some(mesh_hit) => mesh_hit.distance > landmark_distance,
    }
}

/// Group-selection query: indices of landmarks whose screen projection
/// falls inside `rect`.
pub fn landmarks_in_rect(scene: &SceneGraph, rig: &CameraRig, rect: &ScreenRect) -> Vec<u32> {
    scene
        .landmark_views()
        .iter()
        .filter_map(|view| {
            let screen = rig.world_to_screen(scene.landmark_world_position(view))?;
            rect.contains(screen).then_some(view.index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraMode;
    use meshmark_model::{mesh::unit_sphere, Landmark, LandmarkSet, MeshAsset};
    use winit::dpi::PhysicalSize;

    const EPSILON: f32 = 1e-3;

    fn sphere_scene() -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.set_active_mesh(Some(&MeshAsset::new(unit_sphere())));
        scene
    }

    fn rig() -> CameraRig {
        CameraRig::new(PhysicalSize::new(800, 600))
    }

    #[test]
    fn empty_target_returns_no_hits() {
        let scene = sphere_scene();
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 3.0),
            direction: Vec3::NEG_Z,
        };
        assert!(intersect_scene(&scene, None, &ray, PickTarget::None).is_empty());
    }

    #[test]
    fn mesh_target_without_a_mesh_degrades_to_empty() {
        let scene = SceneGraph::new();
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 3.0),
            direction: Vec3::NEG_Z,
        };
        assert!(intersect_scene(&scene, None, &ray, PickTarget::Mesh).is_empty());
    }

    #[test]
    fn centre_screen_ray_hits_the_unit_sphere() {
        let scene = sphere_scene();
        let rig = rig();
        let ray = screen_ray(&rig, [400.0, 300.0]);
        let hits = intersect_scene(&scene, None, &ray, PickTarget::Mesh);
        assert_eq!(hits.len(), 1);
        // Eye at z=3 looking at a unit sphere: front face is 2 away.
        assert!((hits[0].distance - 2.0).abs() < 1e-2, "{}", hits[0].distance);
    }

    #[test]
    fn octree_and_brute_force_pick_the_same_point() {
        let scene = sphere_scene();
        let rig = rig();
        let octree = Octree::build(scene.mesh().expect("mesh"));
        let ray = screen_ray(&rig, [470.0, 260.0]);

        let brute = intersect_scene(&scene, None, &ray, PickTarget::Mesh);
        let fast = intersect_scene(&scene, Some(&octree), &ray, PickTarget::Mesh);
        assert_eq!(brute.len(), 1);
        assert_eq!(fast.len(), 1);
        assert!(brute[0].point.distance(fast[0].point) < EPSILON);
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let mut rig = rig();
        rig.set_mode(CameraMode::Orthographic);
        let a = screen_ray(&rig, [100.0, 100.0]);
        let b = screen_ray(&rig, [700.0, 500.0]);
        assert!(a.direction.distance(b.direction) < 1e-6);
        assert!(a.origin.distance(b.origin) > 0.1);
    }

    #[test]
    fn perspective_rays_share_the_eye() {
        let rig = rig();
        let a = screen_ray(&rig, [100.0, 100.0]);
        let b = screen_ray(&rig, [700.0, 500.0]);
        assert!(a.origin.distance(b.origin) < 1e-6);
        assert!(a.direction.distance(b.direction) > 1e-3);
    }

    #[test]
    fn landmark_picking_sorts_nearest_first() {
        let mut scene = sphere_scene();
        let set = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.0, 0.0, 1.0]),
                Landmark::placed(1, [0.0, 0.0, -1.0]),
            ],
            Vec::new(),
        )
        .expect("set");
        scene.rebuild_views(&set);

        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 3.0),
            direction: Vec3::NEG_Z,
        };
        let hits = intersect_scene(&scene, None, &ray, PickTarget::Landmarks);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].hit, PickHit::Landmark { index: 0 });
        assert_eq!(hits[1].hit, PickHit::Landmark { index: 1 });
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn front_landmark_is_visible_and_back_landmark_is_occluded() {
        let mut scene = sphere_scene();
        let set = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.0, 0.0, 1.0]),
                Landmark::placed(1, [0.0, 0.0, -1.0]),
            ],
            Vec::new(),
        )
        .expect("set");
        scene.rebuild_views(&set);
        let rig = rig();
        let octree = Octree::build(scene.mesh().expect("mesh"));

        assert!(landmark_visible(&scene, Some(&octree), &rig, 0));
        assert!(!landmark_visible(&scene, Some(&octree), &rig, 1));
    }

    #[test]
    fn selection_rect_collects_contained_landmarks() {
        let mut scene = sphere_scene();
        let set = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.0, 0.0, 1.0]),
                Landmark::placed(1, [0.9, 0.9, 0.0]),
            ],
            Vec::new(),
        )
        .expect("set");
        scene.rebuild_views(&set);
        let rig = rig();

        let centre = rig
            .world_to_screen(scene.landmark_world_position(&scene.landmark_views()[0]))
            .expect("projects");
        let rect = ScreenRect::from_corners(
            [centre[0] - 10.0, centre[1] - 10.0],
            [centre[0] + 10.0, centre[1] + 10.0],
        );
        assert_eq!(landmarks_in_rect(&scene, &rig, &rect), vec![0]);

        let everything = ScreenRect::from_corners([0.0, 0.0], [800.0, 600.0]);
        assert_eq!(landmarks_in_rect(&scene, &rig, &everything), vec![0, 1]);
    }
}
