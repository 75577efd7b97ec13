//! Triangle-mesh payloads handed to the viewport. Meshes arrive from an
//! external loader as plain position/index buffers (parsing is not this
//! crate's business); here they gain normals, a bounding sphere, and the
//! `up`/`front` orientation hints the scene graph uses to normalize and
//! orient the asset. Procedural primitives serve as stand-ins so the viewer
//! can boot without an asset on disk.

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ModelError;

const DEFAULT_SPHERE_LAT_DIVS: u32 = 24;
const DEFAULT_SPHERE_LON_DIVS: u32 = 36;

/// Vertex layout shared with the viewer's GPU upload path.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Smallest sphere the scene graph maps onto the unit sphere at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Indexed triangle mesh in asset-local coordinates.
#[derive(Debug, Clone)]
pub struct TriMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl TriMesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Result<Self, ModelError> {
        let mesh = Self { vertices, indices };
        mesh.validate()?;
        Ok(mesh)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.indices.len() % 3 != 0 {
            return Err(ModelError::RaggedIndices(self.indices.len()));
        }
        if self.indices.is_empty() {
            return Err(ModelError::EmptyMesh);
        }
        let vertex_count = self.vertices.len();
        for &index in &self.indices {
            if index as usize >= vertex_count {
                return Err(ModelError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let base = index * 3;
        [
            Vec3::from(self.vertices[self.indices[base] as usize].position),
            Vec3::from(self.vertices[self.indices[base + 1] as usize].position),
            Vec3::from(self.vertices[self.indices[base + 2] as usize].position),
        ]
    }

    /// Bounding sphere centered on the axis-aligned bounds' midpoint with a
    /// radius reaching the farthest vertex. Not minimal, but stable and
    /// cheap, and the normalization math only needs an enclosing sphere.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let first = Vec3::from(self.vertices[0].position);
        let mut min = first;
        let mut max = first;
        for vertex in &self.vertices {
            let position = Vec3::from(vertex.position);
            min = min.min(position);
            max = max.max(position);
        }
        let center = (min + max) * 0.5;
        let mut radius_sq = 0.0_f32;
        for vertex in &self.vertices {
            radius_sq = radius_sq.max(Vec3::from(vertex.position).distance_squared(center));
        }
        BoundingSphere {
            center,
            radius: radius_sq.sqrt(),
        }
    }
}

/// Mesh plus the orientation hints recorded alongside it. `up` and `front`
/// describe which way the asset considers "up" and which direction it faces.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub mesh: TriMesh,
    pub up: Vec3,
    pub front: Vec3,
}

impl MeshAsset {
    pub fn new(mesh: TriMesh) -> Self {
        Self {
            mesh,
            up: Vec3::Y,
            front: Vec3::Z,
        }
    }

    pub fn with_orientation(mut self, up: Vec3, front: Vec3) -> Self {
        self.up = up;
        self.front = front;
        self
    }
}

/// On-disk JSON form: flat position/index arrays plus optional normals and
/// orientation hints.
#[derive(Debug, Deserialize)]
struct MeshFile {
    positions: Vec<[f32; 3]>,
    indices: Vec<u32>,
    #[serde(default)]
    normals: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    up: Option<[f32; 3]>,
    #[serde(default)]
    front: Option<[f32; 3]>,
}

pub fn load_mesh_asset(path: &Path) -> Result<MeshAsset> {
    let data = fs::read(path).with_context(|| format!("reading mesh file {}", path.display()))?;
    let file: MeshFile = serde_json::from_slice(&data)
        .with_context(|| format!("parsing mesh file {}", path.display()))?;

    let normals = match file.normals {
        Some(normals) if normals.len() == file.positions.len() => normals,
        _ => averaged_normals(&file.positions, &file.indices),
    };
    let vertices = file
        .positions
        .iter()
        .zip(&normals)
        .map(|(position, normal)| MeshVertex {
            position: *position,
            normal: *normal,
        })
        .collect();
    let mesh = TriMesh::new(vertices, file.indices)
        .with_context(|| format!("validating mesh file {}", path.display()))?;

    let mut asset = MeshAsset::new(mesh);
    if let (Some(up), Some(front)) = (file.up, file.front) {
        asset = asset.with_orientation(Vec3::from(up), Vec3::from(front));
    }
    Ok(asset)
}

/// Area-weighted vertex normals for meshes that ship without them.
fn averaged_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let a = Vec3::from(positions[triangle[0] as usize]);
        let b = Vec3::from(positions[triangle[1] as usize]);
        let c = Vec3::from(positions[triangle[2] as usize]);
        let face_normal = (b - a).cross(c - a);
        for &corner in triangle {
            accumulated[corner as usize] += face_normal;
        }
    }
    accumulated
        .into_iter()
        .map(|normal| normal.normalize_or_zero().to_array())
        .collect()
}

/// Unit-radius UV sphere centered at the origin.
pub fn unit_sphere() -> TriMesh {
    build_sphere(DEFAULT_SPHERE_LAT_DIVS, DEFAULT_SPHERE_LON_DIVS)
}

fn build_sphere(lat_divs: u32, lon_divs: u32) -> TriMesh {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for lat in 0..=lat_divs {
        let theta = lat as f32 / lat_divs as f32 * PI;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for lon in 0..=lon_divs {
            let phi = lon as f32 / lon_divs as f32 * 2.0 * PI;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            vertices.push(MeshVertex {
                position: normal,
                normal,
            });
        }
    }

    let stride = lon_divs + 1;
    for lat in 0..lat_divs {
        for lon in 0..lon_divs {
            let a = lat * stride + lon;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    TriMesh { vertices, indices }
}

/// Axis-aligned cube with half-extent 1, face normals.
pub fn unit_cube() -> TriMesh {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up, right) in FACES {
        let normal = Vec3::from(normal);
        let up = Vec3::from(up);
        let right = Vec3::from(right);
        let base = vertices.len() as u32;
        for (du, dv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = normal + right * du + up * dv;
            vertices.push(MeshVertex {
                position: position.to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    TriMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_sphere_covers_offset_mesh() {
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
        let mesh = TriMesh::new(vertices, vec![0, 1, 2]).expect("mesh");
        let sphere = mesh.bounding_sphere();
        assert_eq!(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert!((sphere.radius - 2.0).abs() < 1e-6);
    }

    #[test]
    fn validation_rejects_bad_indices() {
        let vertices = vec![
            MeshVertex {
                position: [0.0; 3],
                normal: [0.0, 1.0, 0.0],
            };
            3
        ];
        assert!(matches!(
            TriMesh::new(vertices.clone(), vec![0, 1]),
            Err(ModelError::RaggedIndices(2))
        ));
        assert!(matches!(
            TriMesh::new(vertices, vec![0, 1, 9]),
            Err(ModelError::IndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn unit_sphere_vertices_sit_on_unit_sphere() {
        let sphere = unit_sphere();
        for vertex in &sphere.vertices {
            let radius = Vec3::from(vertex.position).length();
            assert!((radius - 1.0).abs() < 1e-4, "radius {radius}");
        }
        assert!(sphere.triangle_count() > 0);
    }

    #[test]
    fn cube_bounding_sphere_reaches_corners() {
        let cube = unit_cube();
        let sphere = cube.bounding_sphere();
        assert!(sphere.center.length() < 1e-6);
        assert!((sphere.radius - 3.0_f32.sqrt()).abs() < 1e-5);
    }
}
