//! Landmark collections and their connectivity edges. Landmarks live in the
//! active mesh's local coordinate space; an unplaced landmark has no position
//! yet and simply has no visual representation until the user sets one.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A single labelled point. `index` is the landmark's slot in its template;
/// connectivity edges reference these indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub index: u32,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
}

impl Landmark {
    pub fn placed(index: u32, position: [f32; 3]) -> Self {
        Self {
            index,
            position: Some(position),
        }
    }
}

/// The landmark collection plus user-defined edges between landmark pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub connectivity: Vec<[u32; 2]>,
}

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>, connectivity: Vec<[u32; 2]>) -> Result<Self, ModelError> {
        let set = Self {
            landmarks,
            connectivity,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let count = self.landmarks.len() as u32;
        for &[a, b] in &self.connectivity {
            if a >= count || b >= count {
                return Err(ModelError::DanglingEdge(a, b));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Landmarks that actually have a position, with their slot index.
    pub fn placed(&self) -> impl Iterator<Item = (u32, [f32; 3])> + '_ {
        self.landmarks
            .iter()
            .filter_map(|landmark| landmark.position.map(|position| (landmark.index, position)))
    }

    /// Edge endpoints resolved to positions; edges with an unplaced endpoint
    /// are skipped rather than drawn dangling.
    pub fn placed_edges(&self) -> impl Iterator<Item = ([f32; 3], [f32; 3])> + '_ {
        self.connectivity.iter().filter_map(|&[a, b]| {
            let start = self.landmarks.get(a as usize)?.position?;
            let end = self.landmarks.get(b as usize)?.position?;
            Some((start, end))
        })
    }
}

pub fn load_landmark_set(path: &Path) -> Result<LandmarkSet> {
    let data =
        fs::read(path).with_context(|| format!("reading landmark file {}", path.display()))?;
    let set: LandmarkSet = serde_json::from_slice(&data)
        .with_context(|| format!("parsing landmark file {}", path.display()))?;
    set.validate()
        .with_context(|| format!("validating landmark file {}", path.display()))?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn placed_edges_skip_unplaced_endpoints() {
        let set = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.0, 0.0, 0.0]),
                Landmark {
                    index: 1,
                    position: None,
                },
                Landmark::placed(2, [1.0, 0.0, 0.0]),
            ],
            vec![[0, 1], [0, 2]],
        )
        .expect("set");

        let edges: Vec<_> = set.placed_edges().collect();
        assert_eq!(edges, vec![([0.0, 0.0, 0.0], [1.0, 0.0, 0.0])]);
    }

    #[test]
    fn dangling_edges_are_rejected() {
        let result = LandmarkSet::new(vec![Landmark::placed(0, [0.0; 3])], vec![[0, 4]]);
        assert!(matches!(result, Err(ModelError::DanglingEdge(0, 4))));
    }

    #[test]
    fn landmark_file_round_trips() {
        let set = LandmarkSet::new(
            vec![
                Landmark::placed(0, [0.5, 0.25, -1.0]),
                Landmark::placed(1, [0.0, 1.0, 0.0]),
            ],
            vec![[0, 1]],
        )
        .expect("set");

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let json = serde_json::to_vec(&set).expect("encode");
        file.write_all(&json).expect("write");

        let loaded = load_landmark_set(file.path()).expect("load");
        assert_eq!(loaded.landmarks, set.landmarks);
        assert_eq!(loaded.connectivity, set.connectivity);
    }
}
