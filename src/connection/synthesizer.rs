/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Connection hardware for joints that have none yet.

use std::collections::HashMap;

use glam::{DVec2, DVec3};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::connection::classifier::Classification;
use crate::connection::incident::JointIncident;
use crate::connection::ConnectionCategory;
use crate::error::SynthesisFailure;
use crate::geometry::LocalFrame;
use crate::model::section::Section;
use crate::model::{Anchor, Bolt, ElementId, Joint, Plate, StructuralModel, Weld, WeldKind};
use crate::standards::sizing::{SizedQuantity, SizingRegistry, SizingRequest};
use crate::standards::tables::{max_spacing, min_spacing, preferred_edge_distance, preferred_embedment};
use crate::units::Kilonewtons;

/// Everything created for one joint
#[derive(Debug, Clone, PartialEq)]
pub struct JointHardware {
    pub plate: Plate,
    pub bolts: Vec<Bolt>,
    pub welds: Vec<Weld>,
    pub anchors: Vec<Anchor>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub plates: usize,
    pub bolts: usize,
    pub welds: usize,
    pub anchors: usize,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

/// Symmetric offsets of `count` fasteners across `extent`, kept `edge` from both sides
/// and no further apart than `max_pitch`
pub fn grid_offsets(count: usize, extent: f64, edge: f64, max_pitch: f64) -> Vec<f64> {
    if count <= 1 {
        return vec![0.0; count];
    }
    let pitch = ((extent - 2.0 * edge) / (count - 1) as f64).min(max_pitch).max(0.0);
    let first = -pitch * (count - 1) as f64 / 2.0;
    (0..count).map(|index| first + pitch * index as f64).collect()
}

pub struct Synthesizer<'a> {
    config: &'a EngineConfig,
    sizing: &'a SizingRegistry,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &'a EngineConfig, sizing: &'a SizingRegistry) -> Self {
        Self { config, sizing }
    }

    /// Add hardware to every joint no plate serves yet. Joints that cannot be
    /// served are skipped with a warning.
    pub fn synthesize(
        &self,
        model: &mut StructuralModel,
        classifications: &[Classification],
        frames: &HashMap<ElementId, LocalFrame>,
    ) -> SynthesisReport {
        let by_joint: HashMap<&str, &Classification> = classifications
            .iter()
            .map(|classification| (classification.joint.as_str(), classification))
            .collect();
        let pending: Vec<&Joint> = model
            .joints
            .iter()
            .filter(|joint| !is_served(model, joint))
            .collect();
        let results: Vec<Result<JointHardware, SynthesisFailure>> = pending
            .par_iter()
            .map(|joint| {
                let fallback;
                let classification = match by_joint.get(joint.id.as_str()) {
                    Some(classification) => *classification,
                    None => {
                        fallback = Classification {
                            joint: joint.id.clone(),
                            category: ConnectionCategory::Shear,
                            confidence: 0.0,
                            parameters: ConnectionCategory::Shear.parameters(),
                            low_confidence: true,
                            best_guess: None,
                        };
                        &fallback
                    }
                };
                self.synthesize_joint(model, joint, classification, frames)
            })
            .collect();

        let mut report = SynthesisReport::default();
        for result in results {
            match result {
                Ok(hardware) => {
                    report.plates += 1;
                    report.bolts += hardware.bolts.len();
                    report.welds += hardware.welds.len();
                    report.anchors += hardware.anchors.len();
                    report.warnings.extend(hardware.warnings.iter().cloned());
                    install(model, hardware);
                }
                Err(failure) => {
                    warn!("Skipping joint: {failure}");
                    report.failures.push(failure.to_string());
                }
            }
        }
        info!(
            "Synthesized {} plates, {} bolts, {} welds, {} anchors ({} joints skipped)",
            report.plates,
            report.bolts,
            report.welds,
            report.anchors,
            report.failures.len()
        );
        report
    }

    pub fn synthesize_joint(
        &self,
        model: &StructuralModel,
        joint: &Joint,
        classification: &Classification,
        frames: &HashMap<ElementId, LocalFrame>,
    ) -> Result<JointHardware, SynthesisFailure> {
        if !joint.position.is_finite() {
            return Err(SynthesisFailure::InvalidJoint {
                joint: joint.id.clone(),
            });
        }
        let category = classification.category;
        let parameters = classification.parameters;
        let incident = JointIncident::new(joint, model, frames);
        let required = category.required_members();
        if incident.rays().len() < required {
            return Err(SynthesisFailure::InsufficientMembers {
                joint: joint.id.clone(),
                found: incident.rays().len(),
                required,
            });
        }

        // base plates hang off the column, everything else off the first member
        let primary = match category {
            ConnectionCategory::BasePlate => incident
                .verticals(self.config.vertical_tolerance())
                .into_iter()
                .find(|ray| ray.rises())
                .unwrap_or(&incident.rays()[0]),
            _ => &incident.rays()[0],
        };
        let frame = if primary.frame.is_orthonormal() {
            primary.frame
        } else {
            LocalFrame::GLOBAL
        };
        let mut members: Vec<ElementId> = vec![primary.member.clone()];
        members.extend(
            incident
                .rays()
                .iter()
                .filter(|ray| ray.member != primary.member)
                .map(|ray| ray.member.clone()),
        );
        let sections: Vec<Section> = members
            .iter()
            .filter_map(|id| model.member(id))
            .map(|member| Section::resolve(&member.section).0)
            .collect();
        let demand = members
            .iter()
            .filter_map(|id| model.member(id))
            .map(|member| member.demand())
            .fold(Kilonewtons(0.0), |a, b| if b > a { b } else { a });
        let material = model
            .member(&primary.member)
            .map(|member| member.grade.clone())
            .unwrap_or_else(|| self.config.default_steel_grade.clone());

        let base = category == ConnectionCategory::BasePlate;
        let fasteners = if base {
            parameters.anchors
        } else {
            parameters.bolt_count()
        };
        let (quantity, fastener_grade) = if base {
            (SizedQuantity::AnchorDiameter, &self.config.default_anchor_grade)
        } else {
            (SizedQuantity::BoltDiameter, &self.config.default_bolt_grade)
        };
        let diameter = self
            .sizing
            .size(
                &SizingRequest::new(quantity, fastener_grade, demand.per(fasteners), category)
                    .at_least(parameters.fastener_diameter),
            )
            .value;
        let thickness = self
            .sizing
            .size(
                &SizingRequest::new(SizedQuantity::PlateThickness, &material, demand.per(fasteners), category)
                    .with_bolt_diameter(diameter)
                    .at_least(parameters.thickness),
            )
            .value;

        let (rows, columns) = if base { (2, 2) } else { (parameters.bolt_rows, parameters.bolt_columns) };
        let edge = preferred_edge_distance(diameter);
        let projection = if base { 2.0 * self.config.base_plate_projection_mm } else { 0.0 };
        let grid = |count: usize| (count.saturating_sub(1)) as f64 * min_spacing(diameter) + 2.0 * edge;
        let (outline_width, outline_height) = parameters.size_class.outline();
        let width = sections
            .iter()
            .map(|section| section.width + projection)
            .fold(outline_width.max(grid(columns)), f64::max);
        let height = sections
            .iter()
            .map(|section| section.depth + projection)
            .fold(outline_height.max(grid(rows)), f64::max);

        let plate_id = format!("P-{}", joint.id);
        let plate = Plate {
            id: plate_id.clone(),
            position: joint.position,
            width,
            height,
            thickness,
            material: material.clone(),
            members,
            joint: Some(joint.id.clone()),
            category,
            axis_u: frame.y,
            axis_v: frame.z,
        };

        let mut warnings = Vec::new();
        let mut bolts = Vec::new();
        let mut anchors = Vec::new();
        if base {
            anchors = self.anchors(&plate, diameter, rows, columns);
            if let Some(foundation) = &model.foundation {
                for anchor in &anchors {
                    let plan = DVec2::new(anchor.position.x, anchor.position.y);
                    if !foundation.footprint.contains(plan, self.config.anchor_edge_cover_mm) {
                        warnings.push(format!(
                            "anchor {} lies outside the footing at ({:.0}, {:.0})",
                            anchor.id, plan.x, plan.y
                        ));
                    }
                }
            }
        } else {
            let pitch_limit = max_spacing(thickness);
            let us = grid_offsets(columns, width, edge, pitch_limit);
            let vs = grid_offsets(rows, height, edge, pitch_limit);
            bolts = vs
                .iter()
                .flat_map(|&v| us.iter().map(move |&u| DVec3::new(0.0, u, v)))
                .map(|offset| frame.place(joint.position, offset))
                .enumerate()
                .map(|(index, position)| Bolt {
                    id: format!("B-{}-{}", joint.id, index + 1),
                    position,
                    diameter,
                    grade: self.config.default_bolt_grade.clone(),
                    plate: plate_id.clone(),
                })
                .collect();
        }

        let welds = self.welds(&plate, demand);
        for warning in &warnings {
            warn!("{warning}");
        }
        Ok(JointHardware {
            plate,
            bolts,
            welds,
            anchors,
            warnings,
        })
    }

    /// A grid of anchors through a base plate, each kept a preferred edge distance from the plate edges
    pub fn anchors(&self, plate: &Plate, diameter: f64, rows: usize, columns: usize) -> Vec<Anchor> {
        let edge = preferred_edge_distance(diameter);
        let us = grid_offsets(columns, plate.width, edge, f64::INFINITY);
        let vs = grid_offsets(rows, plate.height, edge, f64::INFINITY);
        let embedment = preferred_embedment(diameter);
        let stem = plate.id.trim_start_matches("P-");
        vs.iter()
            .flat_map(|&v| us.iter().map(move |&u| DVec3::new(u, v, 0.0)))
            .enumerate()
            .map(|(index, offset)| Anchor {
                id: format!("A-{}-{}", stem, index + 1),
                position: plate.global(offset),
                diameter,
                embedment,
                grade: self.config.default_anchor_grade.clone(),
                plate: plate.id.clone(),
            })
            .collect()
    }

    /// Welds along the plate edges: the two width edges, all four for base plates
    pub fn welds(&self, plate: &Plate, demand: Kilonewtons) -> Vec<Weld> {
        let (w, h) = (plate.width / 2.0, plate.height / 2.0);
        let mut edges = vec![(DVec3::new(-w, 0.0, 0.0), plate.height), (DVec3::new(w, 0.0, 0.0), plate.height)];
        if plate.category == ConnectionCategory::BasePlate {
            edges.push((DVec3::new(0.0, -h, 0.0), plate.width));
            edges.push((DVec3::new(0.0, h, 0.0), plate.width));
        }
        let kind = if plate.category.needs_full_penetration() {
            WeldKind::CompletePenetration
        } else {
            WeldKind::Fillet
        };
        let share = demand.per(edges.len());
        edges
            .into_iter()
            .enumerate()
            .map(|(index, (offset, length))| Weld {
                id: format!("W-{}-{}", plate.id.trim_start_matches("P-"), index + 1),
                position: plate.global(offset),
                size: self.weld_size(plate, kind, share, length),
                length,
                kind,
                material: plate.material.clone(),
                plate: plate.id.clone(),
            })
            .collect()
    }

    pub fn weld_size(&self, plate: &Plate, kind: WeldKind, demand: Kilonewtons, length: f64) -> f64 {
        match kind {
            WeldKind::CompletePenetration => plate.thickness,
            WeldKind::Fillet => {
                self.sizing
                    .size(
                        &SizingRequest::new(SizedQuantity::WeldSize, &plate.material, demand, plate.category)
                            .with_thickness(plate.thickness)
                            .with_weld_length(length),
                    )
                    .value
            }
        }
    }
}

/// A joint is served by a plate naming it, or by an unassigned plate with exactly its members
pub fn is_served(model: &StructuralModel, joint: &Joint) -> bool {
    model.plates_serving(joint).next().is_some()
}

/// Add hardware to the model, renaming anything whose id is already taken
fn install(model: &mut StructuralModel, hardware: JointHardware) {
    let JointHardware {
        mut plate,
        mut bolts,
        mut welds,
        mut anchors,
        ..
    } = hardware;
    plate.id = model.unused_id(&plate.id);
    model.plates.push(plate.clone());
    for mut bolt in bolts.drain(..) {
        bolt.id = model.unused_id(&bolt.id);
        bolt.plate = plate.id.clone();
        model.bolts.push(bolt);
    }
    for mut weld in welds.drain(..) {
        weld.id = model.unused_id(&weld.id);
        weld.plate = plate.id.clone();
        model.welds.push(weld);
    }
    for mut anchor in anchors.drain(..) {
        anchor.id = model.unused_id(&anchor.id);
        anchor.plate = plate.id.clone();
        model.anchors.push(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Classifier;
    use crate::geometry::joints::resolve;
    use crate::model::{Footprint, Foundation, Member};
    use crate::standards::tables::min_edge_distance;

    fn prepared(mut model: StructuralModel) -> (StructuralModel, Vec<Classification>, HashMap<ElementId, LocalFrame>) {
        let config = EngineConfig::default();
        let resolved = resolve(&model.members, model.foundation.as_ref(), &config);
        model.joints = resolved.joints;
        let classifications = Classifier::new(&model, &config).classify_all(&model, &resolved.frames);
        (model, classifications, resolved.frames)
    }

    fn splice_model() -> StructuralModel {
        StructuralModel::new(vec![
            Member::new("M1", DVec3::ZERO, DVec3::new(3000.0, 0.0, 0.0), "IPE300"),
            Member::new("M2", DVec3::new(3000.0, 0.0, 0.0), DVec3::new(6000.0, 0.0, 0.0), "IPE300"),
        ])
    }

    #[test]
    fn test_grid_offsets() {
        assert_eq!(grid_offsets(2, 200.0, 27.0, 168.0), vec![-73.0, 73.0]);
        assert_eq!(grid_offsets(2, 300.0, 27.0, 168.0), vec![-84.0, 84.0]);
        assert_eq!(grid_offsets(1, 300.0, 27.0, 168.0), vec![0.0]);
    }

    #[test]
    fn test_splice_hardware() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let (mut model, classifications, frames) = prepared(splice_model());
        let report = Synthesizer::new(&config, &sizing).synthesize(&mut model, &classifications, &frames);
        assert_eq!(report.plates, 1);
        assert_eq!(report.bolts, 4);
        let plate = &model.plates[0];
        assert_eq!(plate.position, DVec3::new(3000.0, 0.0, 0.0));
        assert_eq!((plate.width, plate.height, plate.thickness), (200.0, 300.0, 12.0));
        for bolt in &model.bolts {
            let local = plate.local(bolt.position);
            assert!(local.x.abs() <= plate.width / 2.0 - min_edge_distance(bolt.diameter));
            assert!(local.y.abs() <= plate.height / 2.0 - min_edge_distance(bolt.diameter));
            assert!(local.z.abs() < 1e-9);
            assert_ne!(bolt.position, DVec3::ZERO);
        }
        assert!(model.welds.iter().all(|weld| weld.size >= 5.0));
    }

    #[test]
    fn test_synthesis_runs_once_per_joint() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let (mut model, classifications, frames) = prepared(splice_model());
        let synthesizer = Synthesizer::new(&config, &sizing);
        synthesizer.synthesize(&mut model, &classifications, &frames);
        let again = synthesizer.synthesize(&mut model, &classifications, &frames);
        assert_eq!(again.plates, 0);
        assert_eq!(model.plates.len(), 1);
    }

    #[test]
    fn test_base_plate_gets_anchors_on_the_footing() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let model = StructuralModel::new(vec![Member::new(
            "C1",
            DVec3::new(2000.0, 1000.0, 0.0),
            DVec3::new(2000.0, 1000.0, 3000.0),
            "HEA200",
        )])
        .with_foundation(Foundation {
            elevation: 0.0,
            footprint: Footprint {
                min: DVec2::new(1000.0, 0.0),
                max: DVec2::new(3000.0, 2000.0),
            },
        });
        let (mut model, classifications, frames) = prepared(model);
        let report = Synthesizer::new(&config, &sizing).synthesize(&mut model, &classifications, &frames);
        assert_eq!(report.anchors, 4);
        assert!(report.warnings.is_empty());
        assert_eq!(model.plates[0].category, ConnectionCategory::BasePlate);
        assert!(model.plates[0].normal().z.abs() > 0.99);
        for anchor in &model.anchors {
            assert!(anchor.embedment >= 12.0 * anchor.diameter);
            assert!((anchor.position.z).abs() < 1e-9);
        }
        assert_eq!(model.welds.len(), 4);
    }

    #[test]
    fn test_lonely_joint_fails() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let (model, classifications, frames) = prepared(splice_model());
        let joint = Joint {
            id: "JX".into(),
            position: DVec3::new(3000.0, 0.0, 0.0),
            members: vec!["M1".into(), "GONE".into()],
            confidence: 1.0,
        };
        let result = Synthesizer::new(&config, &sizing).synthesize_joint(&model, &joint, &classifications[0], &frames);
        assert_eq!(
            result,
            Err(SynthesisFailure::InsufficientMembers {
                joint: "JX".into(),
                found: 1,
                required: 2
            })
        );
    }
}
