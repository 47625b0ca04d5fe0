/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Turning clashes into edits. Every clash handed in comes back either as a
//! correction (applied, for review, or failed) or as deferred to the next pass.

use std::collections::HashSet;

use glam::{DVec2, DVec3};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::clash::{Clash, ClashCategory, Remedy, Severity};
use crate::config::EngineConfig;
use crate::error::CorrectionFailure;
use crate::model::{ElementId, Plate, StructuralModel};
use crate::standards::sizing::SizingRegistry;

mod reposition;
mod resize;
mod shift;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CorrectionStatus {
    Applied,
    ReviewRequired,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Point(DVec3),
    Text(String),
}

/// One field of one element, before and after
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub element: ElementId,
    pub field: String,
    pub before: Measure,
    pub after: Measure,
}

impl Change {
    pub fn number(element: &str, field: &str, before: f64, after: f64) -> Self {
        Self {
            element: element.to_string(),
            field: field.to_string(),
            before: Measure::Number(before),
            after: Measure::Number(after),
        }
    }

    pub fn point(element: &str, field: &str, before: DVec3, after: DVec3) -> Self {
        Self {
            element: element.to_string(),
            field: field.to_string(),
            before: Measure::Point(before),
            after: Measure::Point(after),
        }
    }

    pub fn text(element: &str, field: &str, before: &str, after: &str) -> Self {
        Self {
            element: element.to_string(),
            field: field.to_string(),
            before: Measure::Text(before.to_string()),
            after: Measure::Text(after.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub clash_id: String,
    pub category: ClashCategory,
    pub severity: Severity,
    pub element: ElementId,
    pub action: Remedy,
    pub status: CorrectionStatus,
    pub changes: Vec<Change>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPass {
    pub corrections: Vec<Correction>,
    /// Clashes whose element an earlier, more severe correction already touched
    pub deferred: Vec<String>,
}

impl CorrectionPass {
    pub fn count(&self, status: CorrectionStatus) -> usize {
        self.corrections
            .iter()
            .filter(|correction| correction.status == status)
            .count()
    }
}

pub struct ClashCorrector<'a> {
    config: &'a EngineConfig,
    sizing: &'a SizingRegistry,
}

impl<'a> ClashCorrector<'a> {
    pub fn new(config: &'a EngineConfig, sizing: &'a SizingRegistry) -> Self {
        Self { config, sizing }
    }

    /// Apply corrections most severe first. A clash on an element that an earlier
    /// correction in this pass already changed waits for the next pass.
    pub fn correct(&self, model: &mut StructuralModel, clashes: &[Clash]) -> CorrectionPass {
        let mut ordered: Vec<&Clash> = clashes.iter().collect();
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
        let mut pass = CorrectionPass::default();
        let mut touched: HashSet<ElementId> = HashSet::new();
        for clash in ordered {
            let action = clash.category.remedy();
            if action != Remedy::Review && touched.contains(clash.primary()) {
                debug!("Deferring {} on {}", clash.category, clash.primary());
                pass.deferred.push(clash.id.clone());
                continue;
            }
            let outcome = if action == Remedy::Review {
                Err(CorrectionFailure::NotCorrectable(clash.category))
            } else {
                self.apply(model, clash)
            };
            let (status, changes, note) = match outcome {
                Ok(changes) => {
                    touched.insert(clash.primary().to_string());
                    touched.extend(changes.iter().map(|change| change.element.clone()));
                    (CorrectionStatus::Applied, changes, None)
                }
                Err(failure) if failure.needs_review() => {
                    (CorrectionStatus::ReviewRequired, Vec::new(), Some(failure.to_string()))
                }
                Err(failure) => (CorrectionStatus::Failed, Vec::new(), Some(failure.to_string())),
            };
            pass.corrections.push(Correction {
                clash_id: clash.id.clone(),
                category: clash.category,
                severity: clash.severity,
                element: clash.primary().to_string(),
                action,
                status,
                changes,
                note,
            });
        }
        info!(
            "Correction pass: {} applied, {} for review, {} failed, {} deferred",
            pass.count(CorrectionStatus::Applied),
            pass.count(CorrectionStatus::ReviewRequired),
            pass.count(CorrectionStatus::Failed),
            pass.deferred.len()
        );
        pass
    }

    fn apply(&self, model: &mut StructuralModel, clash: &Clash) -> Result<Vec<Change>, CorrectionFailure> {
        use ClashCategory::*;
        match clash.category {
            JointPositionMismatch => self.move_joint(model, clash),
            PlateOffset | PlateElevationMismatch | PlateOverlap => self.move_plate_to_joint(model, clash),
            BasePlateWrongElevation | BasePlateNegativeCoordinate => self.seat_base_plate(model, clash),
            WeldOffEdge => self.snap_weld(model, clash),
            BoltOutsidePlate => self.pull_bolt_inside(model, clash),
            PlateRotation => self.realign_plate(model, clash),
            BasePlateUndersized | BasePlateOversized => self.fit_base_plate(model, clash),
            WeldUndersized => self.grow_weld(model, clash),
            WeldInsufficientPenetration => self.full_penetration(model, clash),
            AnchorEmbedmentInsufficient => self.deepen_anchor(model, clash),
            PlateThicknessInsufficient | BoltBearingInsufficient => self.thicken_plate(model, clash),
            BoltUndersized => self.upsize_bolt(model, clash),
            WeldMissing => self.regenerate_welds(model, clash),
            AnchorMissing => self.regenerate_anchors(model, clash),
            MaterialMismatch => self.respecify_material(model, clash),
            BoltGradeMismatch => self.respecify_bolt_grade(model, clash),
            BoltEdgeDistanceTooSmall | BoltEdgeDistanceTooLarge => self.shift_bolt_from_edge(model, clash),
            BoltSpacingTooSmall | BoltSpacingTooLarge => self.shift_bolt_spacing(model, clash),
            AnchorOutsideFooting => self.shift_anchor_into_footing(model, clash),
            AnchorSpacingTooSmall => self.shift_anchor_spacing(model, clash),
            category => Err(CorrectionFailure::NotCorrectable(category)),
        }
    }
}

pub(crate) fn plate_of<'m>(model: &'m StructuralModel, id: &str) -> Result<&'m Plate, CorrectionFailure> {
    model
        .plate(id)
        .filter(|plate| plate.is_well_formed())
        .ok_or_else(|| CorrectionFailure::MissingElement(id.to_string()))
}

/// One side of a plate outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    /// Local midpoint and run length of this edge on a plate
    pub(crate) fn midpoint(&self, plate: &Plate) -> (DVec3, f64) {
        let (w, h) = (plate.width / 2.0, plate.height / 2.0);
        match self {
            Edge::Left => (DVec3::new(-w, 0.0, 0.0), plate.height),
            Edge::Right => (DVec3::new(w, 0.0, 0.0), plate.height),
            Edge::Bottom => (DVec3::new(0.0, -h, 0.0), plate.width),
            Edge::Top => (DVec3::new(0.0, h, 0.0), plate.width),
        }
    }

    /// The edge whose line runs closest to a local point
    pub(crate) fn nearest(plate: &Plate, local: DVec3) -> Edge {
        let (w, h) = (plate.width / 2.0, plate.height / 2.0);
        let point = DVec2::new(local.x, local.y);
        let distance = |edge: &Edge| {
            let (a, b) = match edge {
                Edge::Left => (DVec2::new(-w, -h), DVec2::new(-w, h)),
                Edge::Right => (DVec2::new(w, -h), DVec2::new(w, h)),
                Edge::Bottom => (DVec2::new(-w, -h), DVec2::new(w, -h)),
                Edge::Top => (DVec2::new(-w, h), DVec2::new(w, h)),
            };
            let t = ((point - a).dot(b - a) / (b - a).length_squared().max(f64::EPSILON)).clamp(0.0, 1.0);
            point.distance(a + (b - a) * t)
        };
        Edge::ALL
            .into_iter()
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
            .unwrap_or(Edge::Left)
    }
}
