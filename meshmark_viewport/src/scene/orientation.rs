//! Canonical-axis bookkeeping for the scene's up direction. After every
//! user-driven reorientation the up vector snaps to the nearest of six
//! axis-aligned unit vectors, and the correction applied to the scene is
//! always a single quarter turn (or half turn) about one of +X, +Y, +Z.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};

/// The six directions the scene's up vector is allowed to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalAxis {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CanonicalAxis {
    /// Stable search order; nearest-axis ties resolve to the earliest entry.
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    pub fn vector(self) -> Vec3 {
        match self {
            Self::PosX => Vec3::X,
            Self::NegX => Vec3::NEG_X,
            Self::PosY => Vec3::Y,
            Self::NegY => Vec3::NEG_Y,
            Self::PosZ => Vec3::Z,
            Self::NegZ => Vec3::NEG_Z,
        }
    }

    fn basis_index(self) -> usize {
        match self {
            Self::PosX | Self::NegX => 0,
            Self::PosY | Self::NegY => 1,
            Self::PosZ | Self::NegZ => 2,
        }
    }
}

/// Canonical axis closest (Euclidean) to `direction`. The comparison is
/// strict, so when two axes are exactly equidistant the earlier one in
/// [`CanonicalAxis::ALL`] wins.
pub fn nearest_axis(direction: Vec3) -> CanonicalAxis {
    let mut best = CanonicalAxis::ALL[0];
    let mut best_distance = direction.distance_squared(best.vector());
    for axis in &CanonicalAxis::ALL[1..] {
        let distance = direction.distance_squared(axis.vector());
        if distance < best_distance {
            best = *axis;
            best_distance = distance;
        }
    }
    best
}

/// A single axis-aligned correction rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reorientation {
    /// One of +X, +Y, +Z.
    pub axis: Vec3,
    /// ±90° or 180°, in radians.
    pub angle: f32,
}

impl Reorientation {
    pub fn quaternion(&self) -> Quat {
        Quat::from_axis_angle(self.axis, self.angle)
    }
}

const BASIS: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

/// Rotation carrying `current` onto `target`, or `None` when they already
/// match. Antipodal pairs get a half turn about the first basis axis
/// perpendicular to `current`; otherwise the rotation axis is the basis
/// axis perpendicular to both, and the quarter-turn sign is the triple
/// product target · (axis × current), which is exactly ±1 here.
pub fn reorientation(current: CanonicalAxis, target: CanonicalAxis) -> Option<Reorientation> {
    if current == target {
        return None;
    }
    let current_index = current.basis_index();
    let target_index = target.basis_index();

    if current_index == target_index {
        let axis_index = usize::from(current_index == 0);
        return Some(Reorientation {
            axis: BASIS[axis_index],
            angle: PI,
        });
    }

    let axis = BASIS[3 - current_index - target_index];
    let sign = target.vector().dot(axis.cross(current.vector()));
    Some(Reorientation {
        axis,
        angle: FRAC_PI_2 * sign,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn assert_carries(current: CanonicalAxis, target: CanonicalAxis) {
        let reorientation = reorientation(current, target).expect("distinct axes");
        let rotated = reorientation.quaternion() * current.vector();
        assert!(
            rotated.distance(target.vector()) < 1e-5,
            "{current:?} -> {target:?}: rotated to {rotated}"
        );
    }

    #[test]
    fn every_axis_pair_is_carried_by_one_rotation() {
        for current in CanonicalAxis::ALL {
            for target in CanonicalAxis::ALL {
                if current == target {
                    assert!(reorientation(current, target).is_none());
                } else {
                    assert_carries(current, target);
                }
            }
        }
    }

    #[test]
    fn y_up_to_z_up_is_a_positive_quarter_turn_about_x() {
        let reorientation =
            reorientation(CanonicalAxis::PosY, CanonicalAxis::PosZ).expect("distinct");
        assert!((reorientation.axis - Vec3::X).length() < EPSILON);
        assert!((reorientation.angle - FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn antipodal_flip_uses_a_half_turn_about_a_perpendicular_axis() {
        let flip = reorientation(CanonicalAxis::PosY, CanonicalAxis::NegY).expect("distinct");
        assert!((flip.angle - PI).abs() < EPSILON);
        assert!(flip.axis.dot(Vec3::Y).abs() < EPSILON);

        let x_flip = reorientation(CanonicalAxis::PosX, CanonicalAxis::NegX).expect("distinct");
        assert!(x_flip.axis.dot(Vec3::X).abs() < EPSILON);
    }

    #[test]
    fn nearest_axis_prefers_the_dominant_component() {
        assert_eq!(nearest_axis(Vec3::new(0.1, 0.9, 0.2)), CanonicalAxis::PosY);
        assert_eq!(
            nearest_axis(Vec3::new(-0.7, 0.1, 0.1)),
            CanonicalAxis::NegX
        );
        assert_eq!(nearest_axis(Vec3::new(0.0, 0.0, -2.0)), CanonicalAxis::NegZ);
    }

    #[test]
    fn exact_ties_resolve_to_the_earlier_axis_in_order() {
        // Equidistant from +X and +Y; +X comes first in the search order.
        assert_eq!(nearest_axis(Vec3::new(1.0, 1.0, 0.0)), CanonicalAxis::PosX);
        // Equidistant from +Y and +Z.
        assert_eq!(nearest_axis(Vec3::new(0.0, 1.0, 1.0)), CanonicalAxis::PosY);
        // The zero vector is equidistant from all six.
        assert_eq!(nearest_axis(Vec3::ZERO), CanonicalAxis::PosX);
    }
}
