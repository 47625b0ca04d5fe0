/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Physical units for connection design
//!
//! Type-safe wrappers for the quantities that flow between the standards
//! tables and the synthesizer, so a force is never passed where a length
//! was expected.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{Deref, Mul};

use serde::{Deserialize, Serialize};

/// Length in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

/// Force in kilonewtons
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilonewtons(pub f64);

/// Stress in megapascals (N/mm²)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Megapascals(pub f64);

/// Moment in kilonewton meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KilonewtonMeters(pub f64);

/// Angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Degrees(pub f64);

impl Deref for Millimeters {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for Kilonewtons {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for Megapascals {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for KilonewtonMeters {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for Degrees {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Megapascals {
    /// Force carried when this stress acts over an area in mm²
    pub fn over_area(self, area_mm2: f64) -> Kilonewtons {
        Kilonewtons(self.0 * area_mm2 / 1000.0)
    }
}

impl Kilonewtons {
    pub fn to_newtons(self) -> f64 {
        self.0 * 1000.0
    }

    /// Split evenly over a number of fasteners, never dividing by zero
    pub fn per(self, count: usize) -> Kilonewtons {
        Kilonewtons(self.0 / count.max(1) as f64)
    }
}

impl Degrees {
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    pub fn from_radians(radians: f64) -> Self {
        Self(radians.to_degrees())
    }

    pub fn cos(self) -> f64 {
        self.to_radians().cos()
    }

    pub fn sin(self) -> f64 {
        self.to_radians().sin()
    }
}

/// Scaling a strength by a reduction factor
impl Mul<Megapascals> for f64 {
    type Output = Megapascals;

    fn mul(self, stress: Megapascals) -> Megapascals {
        Megapascals(self * stress.0)
    }
}

/// A force acting at a lever arm gives a moment
impl Mul<Millimeters> for Kilonewtons {
    type Output = KilonewtonMeters;

    fn mul(self, arm: Millimeters) -> KilonewtonMeters {
        KilonewtonMeters(self.0 * arm.0 / 1000.0)
    }
}

impl Display for Millimeters {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.1} mm", self.0)
    }
}

impl Display for Kilonewtons {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.1} kN", self.0)
    }
}

impl Display for KilonewtonMeters {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.2} kNm", self.0)
    }
}

impl Display for Degrees {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.1}°", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_over_area() {
        let force = Megapascals(800.0).over_area(100.0);
        assert!((*force - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_force_times_arm() {
        let moment = Kilonewtons(10.0) * Millimeters(500.0);
        assert!((*moment - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_fastener_never_divides_by_zero() {
        assert_eq!(Kilonewtons(12.0).per(0), Kilonewtons(12.0));
        assert_eq!(Kilonewtons(12.0).per(4), Kilonewtons(3.0));
    }
}
