/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::collections::HashMap;

use itertools::Itertools;
use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::connection::incident::JointIncident;
use crate::connection::{ConnectionCategory, ConnectionParameters};
use crate::error::ClassificationAmbiguous;
use crate::geometry::LocalFrame;
use crate::model::{ElementId, StructuralModel};

/// Confidence of the fallback when no pattern matched
const SHEAR_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub joint: ElementId,
    pub category: ConnectionCategory,
    pub confidence: f64,
    pub parameters: ConnectionParameters,
    pub low_confidence: bool,
    /// The pattern that was recognized before falling back to shear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_guess: Option<ConnectionCategory>,
}

/// 1.0 up to half the tolerance, falling to 0.5 at the tolerance
fn margin(deviation: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        return if deviation <= 0.0 { 1.0 } else { 0.5 };
    }
    let half = tolerance / 2.0;
    if deviation <= half {
        1.0
    } else {
        (1.0 - 0.5 * (deviation - half) / half).max(0.5)
    }
}

pub struct Classifier<'a> {
    config: &'a EngineConfig,
    base_elevation: f64,
    top_elevation: f64,
}

impl<'a> Classifier<'a> {
    pub fn new(model: &StructuralModel, config: &'a EngineConfig) -> Self {
        Self {
            config,
            base_elevation: model.base_elevation(),
            top_elevation: model.highest_elevation().unwrap_or(0.0),
        }
    }

    /// Classify every joint of the model, in joint order
    pub fn classify_all(
        &self,
        model: &StructuralModel,
        frames: &HashMap<ElementId, LocalFrame>,
    ) -> Vec<Classification> {
        model
            .joints
            .par_iter()
            .map(|joint| self.classify(&JointIncident::new(joint, model, frames)))
            .collect()
    }

    /// Never fails: unclear arrangements degrade to shear, flagged low confidence
    pub fn classify(&self, incident: &JointIncident) -> Classification {
        let (category, confidence) = self
            .recognize(incident)
            .unwrap_or((ConnectionCategory::Shear, SHEAR_CONFIDENCE));
        let confidence = if incident.rays().is_empty() { 0.0 } else { confidence };
        if confidence < self.config.low_confidence_threshold {
            let ambiguous = ClassificationAmbiguous {
                joint: incident.joint.clone(),
                best_guess: category,
                confidence,
            };
            warn!("{ambiguous}");
            return Classification {
                joint: incident.joint.clone(),
                category: ConnectionCategory::Shear,
                confidence,
                parameters: ConnectionCategory::Shear.parameters(),
                low_confidence: true,
                best_guess: Some(category),
            };
        }
        Classification {
            joint: incident.joint.clone(),
            category,
            confidence,
            parameters: category.parameters(),
            low_confidence: false,
            best_guess: None,
        }
    }

    fn recognize(&self, incident: &JointIncident) -> Option<(ConnectionCategory, f64)> {
        self.base_plate(incident)
            .or_else(|| self.splice(incident))
            .or_else(|| self.roof_plate(incident))
            .or_else(|| self.moment(incident))
    }

    fn base_plate(&self, incident: &JointIncident) -> Option<(ConnectionCategory, f64)> {
        let tolerance = self.config.vertical_tolerance();
        let above_base = incident.position.z - self.base_elevation;
        if above_base > self.config.elevation_tolerance_mm {
            return None;
        }
        let column = incident
            .verticals(tolerance)
            .into_iter()
            .filter(|ray| ray.rises())
            .min_by(|a, b| a.off_vertical().0.total_cmp(&b.off_vertical().0))?;
        let confidence = margin(*column.off_vertical(), *tolerance)
            .min(margin(above_base.max(0.0), self.config.elevation_tolerance_mm));
        Some((ConnectionCategory::BasePlate, confidence))
    }

    fn splice(&self, incident: &JointIncident) -> Option<(ConnectionCategory, f64)> {
        let [a, b] = incident.rays() else {
            return None;
        };
        let angle = *a.angle_to(b);
        let deviation = angle.min(180.0 - angle);
        let tolerance = *self.config.collinear_tolerance();
        (deviation <= tolerance).then(|| (ConnectionCategory::Splice, margin(deviation, tolerance)))
    }

    fn roof_plate(&self, incident: &JointIncident) -> Option<(ConnectionCategory, f64)> {
        let tolerance = self.config.vertical_tolerance();
        let below_top = (self.top_elevation - incident.position.z).abs();
        if below_top > self.config.elevation_tolerance_mm {
            return None;
        }
        let verticals = incident.verticals(tolerance);
        let horizontals = incident.horizontals(tolerance);
        let [column] = verticals.as_slice() else {
            return None;
        };
        if column.rises() || horizontals.is_empty() || verticals.len() + horizontals.len() != incident.rays().len() {
            return None;
        }
        let worst_beam = horizontals
            .iter()
            .map(|ray| *ray.off_horizontal())
            .fold(0.0, f64::max);
        let confidence = margin(*column.off_vertical(), *tolerance)
            .min(margin(worst_beam, *tolerance))
            .min(margin(below_top, self.config.elevation_tolerance_mm));
        Some((ConnectionCategory::RoofPlate, confidence))
    }

    fn moment(&self, incident: &JointIncident) -> Option<(ConnectionCategory, f64)> {
        let tolerance = self.config.vertical_tolerance();
        let horizontals = incident.horizontals(tolerance);
        if horizontals.len() < 2 || !incident.verticals(tolerance).is_empty() {
            return None;
        }
        let significant = self.config.significant_angle_deg;
        let corner = horizontals
            .iter()
            .tuple_combinations()
            .map(|(a, b)| {
                let angle = *a.angle_to(b);
                angle.min(180.0 - angle)
            })
            .fold(0.0, f64::max);
        if corner < significant {
            return None;
        }
        let confidence = (0.5 + (corner - significant) / significant).min(1.0);
        Some((ConnectionCategory::Moment, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::joints::resolve;
    use crate::model::{Foundation, Footprint, Joint, Member};
    use glam::{DVec2, DVec3};

    fn member(id: &str, start: (f64, f64, f64), end: (f64, f64, f64)) -> Member {
        Member::new(id, DVec3::from(start), DVec3::from(end), "HEA200")
    }

    fn classify(model: &mut StructuralModel) -> Vec<Classification> {
        let config = EngineConfig::default();
        let resolved = resolve(&model.members, model.foundation.as_ref(), &config);
        model.joints = resolved.joints;
        Classifier::new(model, &config).classify_all(model, &resolved.frames)
    }

    fn category_at(model: &StructuralModel, found: &[Classification], z: f64, x: f64) -> ConnectionCategory {
        let joint: &Joint = model
            .joints
            .iter()
            .find(|joint| (joint.position.z - z).abs() < 1.0 && (joint.position.x - x).abs() < 1.0)
            .unwrap();
        found.iter().find(|c| c.joint == joint.id).unwrap().category
    }

    #[test]
    fn test_collinear_pair_is_splice() {
        let mut model = StructuralModel::new(vec![
            member("M1", (0.0, 0.0, 0.0), (3000.0, 0.0, 0.0)),
            member("M2", (3000.0, 0.0, 0.0), (6000.0, 0.0, 0.0)),
        ]);
        let found = classify(&mut model);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, ConnectionCategory::Splice);
        assert_eq!(found[0].confidence, 1.0);
    }

    #[test]
    fn test_portal_frame() {
        let mut model = StructuralModel::new(vec![
            member("C1", (0.0, 0.0, 0.0), (0.0, 0.0, 3000.0)),
            member("C2", (6000.0, 0.0, 0.0), (6000.0, 0.0, 3000.0)),
            member("B1", (0.0, 0.0, 3000.0), (6000.0, 0.0, 3000.0)),
        ])
        .with_foundation(Foundation {
            elevation: 0.0,
            footprint: Footprint {
                min: DVec2::new(-1000.0, -1000.0),
                max: DVec2::new(7000.0, 1000.0),
            },
        });
        let found = classify(&mut model);
        assert_eq!(found.len(), 4);
        assert_eq!(category_at(&model, &found, 0.0, 0.0), ConnectionCategory::BasePlate);
        assert_eq!(category_at(&model, &found, 0.0, 6000.0), ConnectionCategory::BasePlate);
        assert_eq!(category_at(&model, &found, 3000.0, 0.0), ConnectionCategory::RoofPlate);
        assert_eq!(category_at(&model, &found, 3000.0, 6000.0), ConnectionCategory::RoofPlate);
    }

    #[test]
    fn test_beams_at_right_angle_are_moment() {
        let mut model = StructuralModel::new(vec![
            member("B1", (0.0, 0.0, 3000.0), (4000.0, 0.0, 3000.0)),
            member("B2", (4000.0, 0.0, 3000.0), (4000.0, 4000.0, 3000.0)),
        ]);
        let found = classify(&mut model);
        assert_eq!(found[0].category, ConnectionCategory::Moment);
        assert!(!found[0].low_confidence);
    }

    #[test]
    fn test_shallow_corner_degrades_to_shear() {
        // 32 degree corner: recognized as moment, but too close to the threshold
        let angle = 32.0_f64.to_radians();
        let mut model = StructuralModel::new(vec![
            member("B1", (0.0, 0.0, 3000.0), (4000.0, 0.0, 3000.0)),
            member(
                "B2",
                (4000.0, 0.0, 3000.0),
                (4000.0 + 4000.0 * angle.cos(), 4000.0 * angle.sin(), 3000.0),
            ),
        ]);
        let found = classify(&mut model);
        assert_eq!(found[0].category, ConnectionCategory::Shear);
        assert!(found[0].low_confidence);
        assert_eq!(found[0].best_guess, Some(ConnectionCategory::Moment));
    }

    #[test]
    fn test_margin() {
        assert_eq!(margin(1.0, 5.0), 1.0);
        assert_eq!(margin(5.0, 5.0), 0.5);
        assert!((margin(3.75, 5.0) - 0.75).abs() < 1e-12);
    }
}
