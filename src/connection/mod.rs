/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub mod classifier;
pub mod incident;
pub mod synthesizer;

pub use classifier::{Classification, Classifier};
pub use incident::JointIncident;
pub use synthesizer::{JointHardware, SynthesisReport, Synthesizer};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionCategory {
    Splice,
    BasePlate,
    RoofPlate,
    Moment,
    #[default]
    Shear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    Base,
}

impl SizeClass {
    /// Smallest plate outline (width, height) for the class
    pub fn outline(&self) -> (f64, f64) {
        match self {
            SizeClass::Small => (150.0, 200.0),
            SizeClass::Medium => (200.0, 300.0),
            SizeClass::Large => (250.0, 400.0),
            SizeClass::Base => (400.0, 400.0),
        }
    }
}

/// Baseline hardware for a connection category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Bolt rows along the plate height
    pub bolt_rows: usize,
    /// Bolt columns along the plate width
    pub bolt_columns: usize,
    pub anchors: usize,
    pub size_class: SizeClass,
    /// Thickness class, the least plate thickness in mm
    pub thickness: f64,
    /// Least bolt or anchor diameter in mm
    pub fastener_diameter: f64,
}

impl ConnectionParameters {
    pub fn bolt_count(&self) -> usize {
        self.bolt_rows * self.bolt_columns
    }
}

impl ConnectionCategory {
    pub fn parameters(&self) -> ConnectionParameters {
        let (bolt_rows, bolt_columns, anchors, size_class, thickness, fastener_diameter) = match self {
            ConnectionCategory::Splice => (2, 2, 0, SizeClass::Medium, 12.0, 16.0),
            ConnectionCategory::BasePlate => (0, 0, 4, SizeClass::Base, 20.0, 20.0),
            ConnectionCategory::RoofPlate => (2, 2, 0, SizeClass::Medium, 10.0, 16.0),
            ConnectionCategory::Moment => (4, 2, 0, SizeClass::Large, 20.0, 20.0),
            ConnectionCategory::Shear => (2, 2, 0, SizeClass::Small, 10.0, 16.0),
        };
        ConnectionParameters {
            bolt_rows,
            bolt_columns,
            anchors,
            size_class,
            thickness,
            fastener_diameter,
        }
    }

    /// Connections that carry moment need complete penetration welds
    pub fn needs_full_penetration(&self) -> bool {
        matches!(self, ConnectionCategory::Moment)
    }

    pub fn required_members(&self) -> usize {
        match self {
            ConnectionCategory::BasePlate => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_category_has_parameters() {
        for category in ConnectionCategory::iter() {
            let parameters = category.parameters();
            assert!(parameters.bolt_count() > 0 || parameters.anchors > 0, "{category}");
            assert!(parameters.thickness > 0.0);
        }
        assert_eq!(ConnectionCategory::BasePlate.to_string(), "base_plate");
        assert_eq!("moment".parse::<ConnectionCategory>().ok(), Some(ConnectionCategory::Moment));
    }
}
