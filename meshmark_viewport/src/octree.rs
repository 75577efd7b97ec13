//! Triangle octree over the active mesh. Picking happens on every mouse
//! move while editing, so brute-forcing tens of thousands of triangles per
//! event is too slow; the octree prunes to the cells the ray actually
//! crosses and visits them nearest-first so traversal can stop early.

use glam::Vec3;
use meshmark_model::TriMesh;

use crate::picking::{ray_triangle, Ray};

const MAX_DEPTH: u32 = 8;
const LEAF_TRIANGLES: usize = 24;
/// Loose padding so triangles on the boundary land in a cell.
const BOUNDS_PADDING: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    fn from_mesh(mesh: &TriMesh) -> Self {
        let first = Vec3::from(mesh.vertices[0].position);
        let mut min = first;
        let mut max = first;
        for vertex in &mesh.vertices {
            let position = Vec3::from(vertex.position);
            min = min.min(position);
            max = max.max(position);
        }
        Self {
            min: min - Vec3::splat(BOUNDS_PADDING),
            max: max + Vec3::splat(BOUNDS_PADDING),
        }
    }

    fn from_triangle(corners: &[Vec3; 3]) -> Self {
        Self {
            min: corners[0].min(corners[1]).min(corners[2]),
            max: corners[0].max(corners[1]).max(corners[2]),
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    fn octant(&self, index: usize) -> Self {
        let centre = (self.min + self.max) * 0.5;
        let mut min = self.min;
        let mut max = centre;
        if index & 1 != 0 {
            min.x = centre.x;
            max.x = self.max.x;
        }
        if index & 2 != 0 {
            min.y = centre.y;
            max.y = self.max.y;
        }
        if index & 4 != 0 {
            min.z = centre.z;
            max.z = self.max.z;
        }
        Self { min, max }
    }

    /// Slab-method ray entry distance, `None` on a miss. Zero when the ray
    /// starts inside the box.
    fn ray_entry(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let direction = ray.direction[axis];
            if direction.abs() < f32::EPSILON {
                if ray.origin[axis] < self.min[axis] || ray.origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut near = (self.min[axis] - ray.origin[axis]) * inv;
            let mut far = (self.max[axis] - ray.origin[axis]) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }
        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

#[derive(Debug)]
enum OctreeNode {
    Leaf { triangles: Vec<u32> },
    Branch { children: Box<[OctreeNode; 8]> },
}

/// Spatial acceleration structure for ray/mesh intersection, built once per
/// active mesh in the mesh's local coordinate space.
#[derive(Debug)]
pub struct Octree {
    bounds: Aabb,
    root: OctreeNode,
    triangle_count: usize,
}

impl Octree {
    pub fn build(mesh: &TriMesh) -> Self {
        let bounds = Aabb::from_mesh(mesh);
        let triangle_boxes: Vec<Aabb> = (0..mesh.triangle_count())
            .map(|index| Aabb::from_triangle(&mesh.triangle(index)))
            .collect();
        let all: Vec<u32> = (0..mesh.triangle_count() as u32).collect();
        let root = build_node(&triangle_boxes, all, &bounds, 0);
        log::debug!(
            "octree built over {} triangles in {:?}..{:?}",
            mesh.triangle_count(),
            bounds.min,
            bounds.max
        );
        Self {
            bounds,
            root,
            triangle_count: mesh.triangle_count(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Nearest triangle hit along `ray`, as `(distance, triangle index)`.
    /// The ray must be in the same (mesh-local) space the octree was built
    /// in.
    pub fn intersect(&self, mesh: &TriMesh, ray: &Ray) -> Option<(f32, usize)> {
        self.bounds.ray_entry(ray)?;
        let mut best: Option<(f32, usize)> = None;
        intersect_node(&self.root, &self.bounds, mesh, ray, &mut best);
        best
    }
}

fn build_node(
    triangle_boxes: &[Aabb],
    triangles: Vec<u32>,
    bounds: &Aabb,
    depth: u32,
) -> OctreeNode {
    if triangles.len() <= LEAF_TRIANGLES || depth >= MAX_DEPTH {
        return OctreeNode::Leaf { triangles };
    }

    let mut buckets: [Vec<u32>; 8] = Default::default();
    for &triangle in &triangles {
        let triangle_box = &triangle_boxes[triangle as usize];
        for (index, bucket) in buckets.iter_mut().enumerate() {
            if bounds.octant(index).overlaps(triangle_box) {
                bucket.push(triangle);
            }
        }
    }

    // Straddling triangles can defeat subdivision; keep a leaf when no
    // bucket actually got smaller.
    if buckets.iter().all(|bucket| bucket.len() == triangles.len()) {
        return OctreeNode::Leaf { triangles };
    }

    let children = buckets
        .into_iter()
        .enumerate()
        .map(|(index, bucket)| build_node(triangle_boxes, bucket, &bounds.octant(index), depth + 1))
        .collect::<Vec<_>>();
    let children: Box<[OctreeNode; 8]> = match children.try_into() {
        Ok(array) => Box::new(array),
        Err(_) => unreachable!("octant count is fixed"),
    };
    OctreeNode::Branch { children }
}

fn intersect_node(
    node: &OctreeNode,
    bounds: &Aabb,
    mesh: &TriMesh,
    ray: &Ray,
    best: &mut Option<(f32, usize)>,
) {
    match node {
        OctreeNode::Leaf { triangles } => {
            for &triangle in triangles {
                let corners = mesh.triangle(triangle as usize);
                if let Some(distance) = ray_triangle(ray, &corners) {
                    if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                        *best = Some((distance, triangle as usize));
                    }
                }
            }
        }
        OctreeNode::Branch { children } => {
            // Visit octants nearest-first so a hit can prune the rest.
            let mut order: Vec<(f32, usize)> = (0..8)
                .filter_map(|index| {
                    bounds
                        .octant(index)
                        .ray_entry(ray)
                        .map(|entry| (entry, index))
                })
                .collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (entry, index) in order {
                if let Some((best_distance, _)) = best {
                    if *best_distance < entry {
                        break;
                    }
                }
                intersect_node(&children[index], &bounds.octant(index), mesh, ray, best);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmark_model::mesh::{unit_cube, unit_sphere};

    fn brute_force(mesh: &TriMesh, ray: &Ray) -> Option<(f32, usize)> {
        let mut best: Option<(f32, usize)> = None;
        for index in 0..mesh.triangle_count() {
            if let Some(distance) = ray_triangle(ray, &mesh.triangle(index)) {
                if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                    best = Some((distance, index));
                }
            }
        }
        best
    }

    #[test]
    fn octree_agrees_with_brute_force_on_a_sphere() {
        let mesh = unit_sphere();
        let octree = Octree::build(&mesh);

        for (origin, direction) in [
            (Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z),
            (Vec3::new(0.3, -0.2, 3.0), Vec3::NEG_Z),
            (Vec3::new(3.0, 0.1, 0.2), Vec3::NEG_X),
            (Vec3::new(0.0, 0.0, 0.0), Vec3::Y),
        ] {
            let ray = Ray { origin, direction };
            let expected = brute_force(&mesh, &ray);
            let actual = octree.intersect(&mesh, &ray);
            match (expected, actual) {
                (None, None) => {}
                (Some((expected_t, _)), Some((actual_t, _))) => {
                    assert!(
                        (expected_t - actual_t).abs() < 1e-5,
                        "{expected_t} vs {actual_t}"
                    );
                }
                other => panic!("mismatch for {origin}/{direction}: {other:?}"),
            }
        }
    }

    #[test]
    fn rays_that_miss_return_none() {
        let mesh = unit_cube();
        let octree = Octree::build(&mesh);
        let ray = Ray {
            origin: Vec3::new(5.0, 5.0, 5.0),
            direction: Vec3::Y,
        };
        assert!(octree.intersect(&mesh, &ray).is_none());
    }

    #[test]
    fn nearest_face_wins() {
        let mesh = unit_cube();
        let octree = Octree::build(&mesh);
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
        };
        let (distance, _) = octree.intersect(&mesh, &ray).expect("hit");
        // Front face of the half-extent-1 cube sits at z = 1.
        assert!((distance - 4.0).abs() < 1e-4, "distance {distance}");
    }
}
