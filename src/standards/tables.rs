/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Discrete standard sizes, material grades and the EN 1993-1-8 style rules
//! built on them. Everything here is a pure function of its arguments.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::units::{Kilonewtons, Megapascals};

pub const BOLT_DIAMETERS: [f64; 7] = [16.0, 20.0, 22.0, 24.0, 27.0, 30.0, 36.0];
pub const PLATE_THICKNESSES: [f64; 12] = [
    6.0, 8.0, 10.0, 12.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0,
];
pub const WELD_SIZES: [f64; 9] = [3.0, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0];
pub const ANCHOR_DIAMETERS: [f64; 6] = [16.0, 20.0, 24.0, 30.0, 36.0, 42.0];

/// Partial safety factor for bolts, welds and bearing
pub const GAMMA_M2: f64 = 1.25;
/// Tensile stress area as a share of the nominal shank area
const STRESS_AREA_RATIO: f64 = 0.78;
const FILLET_THROAT_RATIO: f64 = 0.707;
const WELD_CORRELATION: f64 = 0.9;
const SIZE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoltGrade {
    pub name: &'static str,
    /// Ultimate tensile strength
    pub fub: Megapascals,
    pub fyb: Megapascals,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteelGrade {
    pub name: &'static str,
    pub fy: Megapascals,
    pub fu: Megapascals,
}

pub const BOLT_GRADES: [BoltGrade; 4] = [
    BoltGrade { name: "4.6", fub: Megapascals(400.0), fyb: Megapascals(240.0) },
    BoltGrade { name: "5.6", fub: Megapascals(500.0), fyb: Megapascals(300.0) },
    BoltGrade { name: "8.8", fub: Megapascals(800.0), fyb: Megapascals(640.0) },
    BoltGrade { name: "10.9", fub: Megapascals(1000.0), fyb: Megapascals(900.0) },
];

pub const STEEL_GRADES: [SteelGrade; 4] = [
    SteelGrade { name: "S235", fy: Megapascals(235.0), fu: Megapascals(360.0) },
    SteelGrade { name: "S275", fy: Megapascals(275.0), fu: Megapascals(430.0) },
    SteelGrade { name: "S355", fy: Megapascals(355.0), fu: Megapascals(490.0) },
    SteelGrade { name: "S460", fy: Megapascals(460.0), fu: Megapascals(540.0) },
];

pub fn bolt_grade(name: &str) -> Option<BoltGrade> {
    let name = name.trim();
    BOLT_GRADES.iter().copied().find(|grade| grade.name == name)
}

pub fn steel_grade(name: &str) -> Option<SteelGrade> {
    let name = name.trim();
    STEEL_GRADES
        .iter()
        .copied()
        .find(|grade| grade.name.eq_ignore_ascii_case(name))
}

/// The grade itself, or the named default when it is not in the table
pub fn bolt_grade_or(name: &str, default: &str) -> BoltGrade {
    bolt_grade(name)
        .or_else(|| bolt_grade(default))
        .unwrap_or(BOLT_GRADES[2])
}

pub fn steel_grade_or(name: &str, default: &str) -> SteelGrade {
    steel_grade(name)
        .or_else(|| steel_grade(default))
        .unwrap_or(STEEL_GRADES[2])
}

/// A table value, flagged when the requirement exceeded the largest size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardSize {
    pub value: f64,
    pub saturated: bool,
}

/// Nearest size at or above `value`
pub fn round_up(table: &[f64], value: f64) -> StandardSize {
    match table.iter().find(|&&size| size + SIZE_EPSILON >= value) {
        Some(&size) => StandardSize {
            value: size,
            saturated: false,
        },
        None => StandardSize {
            value: table.last().copied().unwrap_or(value),
            saturated: true,
        },
    }
}

pub fn is_standard(table: &[f64], value: f64) -> bool {
    table.iter().any(|size| (size - value).abs() < SIZE_EPSILON)
}

/// Next size strictly above `value`, if there is one
pub fn next_size(table: &[f64], value: f64) -> Option<f64> {
    table.iter().copied().find(|&size| size > value + SIZE_EPSILON)
}

pub fn hole_diameter(bolt_diameter: f64) -> f64 {
    if bolt_diameter <= 24.0 {
        bolt_diameter + 2.0
    } else {
        bolt_diameter + 3.0
    }
}

pub fn stress_area(diameter: f64) -> f64 {
    STRESS_AREA_RATIO * PI * diameter * diameter / 4.0
}

/// Shear resistance of one bolt through the threads, one shear plane
pub fn bolt_shear_capacity(diameter: f64, grade: BoltGrade) -> Kilonewtons {
    Kilonewtons((0.6 * grade.fub).over_area(stress_area(diameter)).0 / GAMMA_M2)
}

/// Bearing resistance of a plate on one bolt
pub fn bearing_capacity(diameter: f64, thickness: f64, steel: SteelGrade) -> Kilonewtons {
    Kilonewtons((2.5 * steel.fu).over_area(diameter * thickness).0 / GAMMA_M2)
}

/// Design shear strength of fillet weld metal
pub fn weld_strength(steel: SteelGrade) -> Megapascals {
    Megapascals(*steel.fu / (3.0_f64.sqrt() * WELD_CORRELATION * GAMMA_M2))
}

pub fn fillet_weld_capacity(size: f64, length: f64, steel: SteelGrade) -> Kilonewtons {
    weld_strength(steel).over_area(FILLET_THROAT_RATIO * size * length)
}

pub fn anchor_tension_capacity(diameter: f64, grade: BoltGrade) -> Kilonewtons {
    Kilonewtons((0.9 * grade.fub).over_area(stress_area(diameter)).0 / GAMMA_M2)
}

/// Smallest diameter whose shank resists `demand` with the given capacity per stress area
fn diameter_for(demand: Kilonewtons, strength: Megapascals) -> f64 {
    if *demand <= 0.0 {
        return 0.0;
    }
    let area = demand.to_newtons() * GAMMA_M2 / *strength;
    (4.0 * area / (STRESS_AREA_RATIO * PI)).sqrt()
}

pub fn required_bolt_diameter(demand_per_bolt: Kilonewtons, grade: BoltGrade) -> f64 {
    diameter_for(demand_per_bolt, 0.6 * grade.fub)
}

pub fn required_anchor_diameter(demand_per_anchor: Kilonewtons, grade: BoltGrade) -> f64 {
    diameter_for(demand_per_anchor, 0.9 * grade.fub)
}

pub fn required_bearing_thickness(demand_per_bolt: Kilonewtons, diameter: f64, steel: SteelGrade) -> f64 {
    if *demand_per_bolt <= 0.0 || diameter <= 0.0 {
        return 0.0;
    }
    demand_per_bolt.to_newtons() * GAMMA_M2 / (2.5 * *steel.fu * diameter)
}

pub fn required_weld_size(demand: Kilonewtons, length: f64, steel: SteelGrade) -> f64 {
    if *demand <= 0.0 || length <= 0.0 {
        return 0.0;
    }
    demand.to_newtons() / (*weld_strength(steel) * FILLET_THROAT_RATIO * length)
}

/// A plate must be at least a third of the way to its bolt diameter, d / 1.5
pub fn min_plate_thickness(bolt_diameter: f64) -> f64 {
    bolt_diameter / 1.5
}

pub fn min_edge_distance(bolt_diameter: f64) -> f64 {
    1.2 * hole_diameter(bolt_diameter)
}

pub fn preferred_edge_distance(bolt_diameter: f64) -> f64 {
    1.5 * hole_diameter(bolt_diameter)
}

pub fn max_edge_distance(thickness: f64) -> f64 {
    4.0 * thickness + 40.0
}

pub fn min_spacing(bolt_diameter: f64) -> f64 {
    2.2 * hole_diameter(bolt_diameter)
}

pub fn preferred_spacing(bolt_diameter: f64) -> f64 {
    3.0 * hole_diameter(bolt_diameter)
}

pub fn max_spacing(thickness: f64) -> f64 {
    (14.0 * thickness).min(200.0)
}

/// Minimum fillet leg for the thicker part joined
pub fn min_weld_size(thickness: f64) -> f64 {
    if thickness <= 6.0 {
        3.0
    } else if thickness <= 13.0 {
        5.0
    } else if thickness <= 19.0 {
        6.0
    } else {
        8.0
    }
}

pub fn min_embedment(anchor_diameter: f64) -> f64 {
    10.0 * anchor_diameter
}

/// 12 d, rounded up to the next 25 mm
pub fn preferred_embedment(anchor_diameter: f64) -> f64 {
    (12.0 * anchor_diameter / 25.0).ceil() * 25.0
}

pub fn min_anchor_spacing(anchor_diameter: f64) -> f64 {
    4.0 * anchor_diameter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(&BOLT_DIAMETERS, 17.3).value, 20.0);
        assert_eq!(round_up(&BOLT_DIAMETERS, 20.0).value, 20.0);
        assert_eq!(round_up(&BOLT_DIAMETERS, 0.0).value, 16.0);
        let big = round_up(&BOLT_DIAMETERS, 50.0);
        assert!(big.saturated);
        assert_eq!(big.value, 36.0);
        assert_eq!(next_size(&PLATE_THICKNESSES, 12.0), Some(15.0));
        assert_eq!(next_size(&PLATE_THICKNESSES, 50.0), None);
    }

    #[test]
    fn test_grades() {
        assert_eq!(bolt_grade("8.8").map(|g| *g.fub), Some(800.0));
        assert_eq!(steel_grade("s275").map(|g| *g.fu), Some(430.0));
        assert!(steel_grade("S999").is_none());
        assert_eq!(steel_grade_or("S999", "S235").name, "S235");
    }

    #[test]
    fn test_m20_88_shear_capacity() {
        // 0.6 * 800 * 245 / 1.25 ~ 94 kN
        let capacity = bolt_shear_capacity(20.0, bolt_grade_or("8.8", "8.8"));
        assert!((*capacity - 94.1).abs() < 1.0, "{capacity}");
        let back = required_bolt_diameter(capacity, bolt_grade_or("8.8", "8.8"));
        assert!((back - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_inverse() {
        let steel = steel_grade_or("S355", "S355");
        let capacity = bearing_capacity(20.0, 12.0, steel);
        assert!((required_bearing_thickness(capacity, 20.0, steel) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_spacing_rules() {
        assert_eq!(hole_diameter(16.0), 18.0);
        assert_eq!(hole_diameter(27.0), 30.0);
        assert!((min_edge_distance(16.0) - 21.6).abs() < 1e-9);
        assert!((preferred_spacing(16.0) - 54.0).abs() < 1e-9);
        assert_eq!(max_spacing(12.0), 168.0);
        assert_eq!(max_spacing(20.0), 200.0);
        assert_eq!(max_edge_distance(10.0), 80.0);
    }

    #[test]
    fn test_weld_and_anchor_rules() {
        assert_eq!(min_weld_size(12.0), 5.0);
        assert_eq!(min_weld_size(20.0), 8.0);
        assert_eq!(min_embedment(20.0), 200.0);
        assert_eq!(preferred_embedment(20.0), 250.0);
        assert_eq!(preferred_embedment(24.0), 300.0);
        assert!(preferred_embedment(30.0) >= 12.0 * 30.0);
    }
}
