/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::units::Degrees;

/// Tolerances, limits and budgets for one pipeline run.
///
/// Every field has a default, so a config file only needs to name what it
/// overrides. Lengths are in millimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Endpoints closer than this meet in a joint
    pub joint_tolerance_mm: f64,
    /// Allowed plate and weld displacement from where they belong
    pub alignment_tolerance_mm: f64,
    /// Allowed base plate deviation from the foundation elevation
    pub elevation_tolerance_mm: f64,
    pub collinear_tolerance_deg: f64,
    pub vertical_tolerance_deg: f64,
    /// Smallest corner angle that still counts as a moment corner
    pub significant_angle_deg: f64,
    pub rotation_tolerance_deg: f64,
    pub low_confidence_threshold: f64,
    pub max_iterations: usize,
    pub prediction_timeout_ms: u64,
    pub prediction_min_confidence: f64,
    /// Members passing closer than this without a joint intersect
    pub clearance_mm: f64,
    pub min_member_length_mm: f64,
    pub max_span_mm: f64,
    pub slenderness_limit: f64,
    /// Columns taller than this need a diagonal brace
    pub bracing_height_mm: f64,
    pub eccentricity_tolerance_mm: f64,
    pub moment_threshold_knm: f64,
    /// Base plate overhang around the column section
    pub base_plate_projection_mm: f64,
    pub oversize_factor: f64,
    /// Concrete cover between anchors and the footing edge
    pub anchor_edge_cover_mm: f64,
    pub default_steel_grade: String,
    pub default_bolt_grade: String,
    pub default_anchor_grade: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            joint_tolerance_mm: 100.0,
            alignment_tolerance_mm: 5.0,
            elevation_tolerance_mm: 10.0,
            collinear_tolerance_deg: 5.0,
            vertical_tolerance_deg: 5.0,
            significant_angle_deg: 30.0,
            rotation_tolerance_deg: 2.0,
            low_confidence_threshold: 0.6,
            max_iterations: 5,
            prediction_timeout_ms: 250,
            prediction_min_confidence: 0.7,
            clearance_mm: 10.0,
            min_member_length_mm: 200.0,
            max_span_mm: 12_000.0,
            slenderness_limit: 200.0,
            bracing_height_mm: 6_000.0,
            eccentricity_tolerance_mm: 25.0,
            moment_threshold_knm: 5.0,
            base_plate_projection_mm: 50.0,
            oversize_factor: 3.0,
            anchor_edge_cover_mm: 50.0,
            default_steel_grade: "S355".to_string(),
            default_bolt_grade: "8.8".to_string(),
            default_anchor_grade: "8.8".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("joint_tolerance_mm", self.joint_tolerance_mm),
            ("alignment_tolerance_mm", self.alignment_tolerance_mm),
            ("elevation_tolerance_mm", self.elevation_tolerance_mm),
            ("collinear_tolerance_deg", self.collinear_tolerance_deg),
            ("vertical_tolerance_deg", self.vertical_tolerance_deg),
            ("rotation_tolerance_deg", self.rotation_tolerance_deg),
            ("max_iterations", self.max_iterations as f64),
            ("slenderness_limit", self.slenderness_limit),
            ("oversize_factor", self.oversize_factor),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_millis(self.prediction_timeout_ms)
    }

    pub fn collinear_tolerance(&self) -> Degrees {
        Degrees(self.collinear_tolerance_deg)
    }

    pub fn vertical_tolerance(&self) -> Degrees {
        Degrees(self.vertical_tolerance_deg)
    }
}
