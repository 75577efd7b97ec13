//! Data model collaborator for the meshmark viewport: triangle-mesh assets
//! with orientation hints, landmark sets with connectivity edges, change
//! notifications, and the single-slot asset fetch bookkeeping. The viewport
//! crate never mutates this state directly; it reacts to [`ModelEvent`]s and
//! reads the payloads exposed here.

pub mod events;
pub mod fetch;
pub mod landmarks;
pub mod mesh;

pub use events::{ModelEvent, Notifier, Subscription};
pub use fetch::{FetchSlot, FetchToken};
pub use landmarks::{Landmark, LandmarkSet};
pub use mesh::{BoundingSphere, MeshAsset, MeshVertex, TriMesh};

use thiserror::Error;

/// Structural problems in model payloads, caught before they reach the
/// viewport so rendering code can assume well-formed data.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("mesh has {0} indices, which is not a multiple of 3")]
    RaggedIndices(usize),
    #[error("mesh index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("connectivity edge ({0}, {1}) references a missing landmark")]
    DanglingEdge(u32, u32),
}
