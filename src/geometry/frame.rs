/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::model::Member;
use crate::units::Degrees;

const DEGENERATE: f64 = 1e-6;
/// Below this the member axis is treated as parallel to global up
const PARALLEL: f64 = 1e-3;
const ORTHONORMAL: f64 = 1e-6;

/// Orthonormal basis of a member: X along the member, Z biased upward, Y = Z × X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalFrame {
    pub x: DVec3,
    pub y: DVec3,
    pub z: DVec3,
}

impl LocalFrame {
    pub const GLOBAL: LocalFrame = LocalFrame {
        x: DVec3::X,
        y: DVec3::Y,
        z: DVec3::Z,
    };

    pub fn for_member(member: &Member) -> Result<Self, GeometryError> {
        if !member.is_finite() {
            return Err(GeometryError::NonFinite {
                member: member.id.clone(),
            });
        }
        Self::between(member.start, member.end).ok_or_else(|| GeometryError::ZeroLength {
            member: member.id.clone(),
        })
    }

    pub fn between(start: DVec3, end: DVec3) -> Option<Self> {
        let span = end - start;
        if !span.is_finite() || span.length() < DEGENERATE {
            return None;
        }
        let x = span.normalize();
        let up_remainder = DVec3::Z - x * x.dot(DVec3::Z);
        let z = if x.cross(DVec3::Z).length() < PARALLEL {
            // vertical member: borrow global X as the reference instead
            let z = (DVec3::X - x * x.dot(DVec3::X)).normalize();
            if z.z < 0.0 {
                -z
            } else {
                z
            }
        } else {
            up_remainder.normalize()
        };
        let y = z.cross(x);
        Some(Self { x, y, z })
    }

    pub fn is_orthonormal(&self) -> bool {
        let axes = [self.x, self.y, self.z];
        axes.iter()
            .all(|axis| axis.is_finite() && (axis.length() - 1.0).abs() < ORTHONORMAL)
            && self.x.dot(self.y).abs() < ORTHONORMAL
            && self.y.dot(self.z).abs() < ORTHONORMAL
            && self.z.dot(self.x).abs() < ORTHONORMAL
    }

    /// `origin + ox·X + oy·Y + oz·Z`, on the global basis if this one has gone bad
    pub fn place(&self, origin: DVec3, offset: DVec3) -> DVec3 {
        let frame = if self.is_orthonormal() {
            self
        } else {
            &Self::GLOBAL
        };
        origin + frame.x * offset.x + frame.y * offset.y + frame.z * offset.z
    }

    pub fn localize(&self, origin: DVec3, point: DVec3) -> DVec3 {
        let relative = point - origin;
        DVec3::new(relative.dot(self.x), relative.dot(self.y), relative.dot(self.z))
    }

    pub fn is_vertical(&self, tolerance: Degrees) -> bool {
        self.x.z.abs() >= tolerance.cos()
    }

    pub fn is_horizontal(&self, tolerance: Degrees) -> bool {
        self.x.z.abs() <= tolerance.sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(start: DVec3, end: DVec3) -> LocalFrame {
        LocalFrame::between(start, end).unwrap()
    }

    #[test]
    fn test_horizontal_member_z_points_up() {
        let f = frame(DVec3::ZERO, DVec3::new(3000.0, 0.0, 0.0));
        assert!(f.is_orthonormal());
        assert_eq!(f.x, DVec3::X);
        assert!((f.z - DVec3::Z).length() < 1e-12);
        assert!((f.y - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_sloped_member_keeps_z_non_negative() {
        for end in [
            DVec3::new(1000.0, 0.0, -800.0),
            DVec3::new(-1000.0, 500.0, 2000.0),
            DVec3::new(0.0, -300.0, -4000.0),
        ] {
            let f = frame(DVec3::ZERO, end);
            assert!(f.is_orthonormal(), "{end}");
            assert!(f.z.z >= 0.0, "{end}");
            assert!((f.z.cross(f.x) - f.y).length() < 1e-9);
        }
    }

    #[test]
    fn test_vertical_member_uses_secondary_reference() {
        for end in [DVec3::new(0.0, 0.0, 3000.0), DVec3::new(0.0, 0.0, -3000.0)] {
            let f = frame(DVec3::ZERO, end);
            assert!(f.is_orthonormal());
            assert!(f.z.z >= 0.0);
            assert!(f.is_vertical(Degrees(5.0)));
        }
    }

    #[test]
    fn test_degenerate_member_is_an_error() {
        let member = Member::new("M", DVec3::ONE, DVec3::ONE, "IPE200");
        assert_eq!(
            LocalFrame::for_member(&member),
            Err(GeometryError::ZeroLength { member: "M".into() })
        );
        let member = Member::new("N", DVec3::new(f64::NAN, 0.0, 0.0), DVec3::ONE, "IPE200");
        assert!(matches!(
            LocalFrame::for_member(&member),
            Err(GeometryError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_placement_falls_back_to_global_basis() {
        let broken = LocalFrame {
            x: DVec3::ZERO,
            y: DVec3::Y,
            z: DVec3::Z,
        };
        let origin = DVec3::new(100.0, 200.0, 300.0);
        let placed = broken.place(origin, DVec3::new(-20.0, 10.0, 5.0));
        assert_eq!(placed, DVec3::new(80.0, 210.0, 305.0));
    }

    #[test]
    fn test_place_and_localize_agree() {
        let f = frame(DVec3::new(10.0, 20.0, 30.0), DVec3::new(900.0, -400.0, 1200.0));
        let origin = DVec3::new(5000.0, 0.0, 3000.0);
        let offset = DVec3::new(-20.0, 73.0, -84.0);
        let back = f.localize(origin, f.place(origin, offset));
        assert!((back - offset).length() < 1e-9);
    }
}
