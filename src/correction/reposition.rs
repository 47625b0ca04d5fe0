/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::DVec3;

use crate::clash::Clash;
use crate::correction::{plate_of, ClashCorrector, Change, Edge};
use crate::error::CorrectionFailure;
use crate::geometry::{intersection_point, LocalFrame};
use crate::model::StructuralModel;
use crate::standards::tables::{min_edge_distance, preferred_edge_distance};

impl ClashCorrector<'_> {
    /// Put a joint back where its members actually meet. Plates serving the joint go with it.
    pub(crate) fn move_joint(&self, model: &mut StructuralModel, clash: &Clash) -> Result<Vec<Change>, CorrectionFailure> {
        let joint = model
            .joint(clash.primary())
            .ok_or_else(|| CorrectionFailure::MissingElement(clash.primary().to_string()))?;
        let members = joint
            .members
            .iter()
            .filter_map(|id| model.member(id))
            .filter(|member| member.is_finite());
        let target = intersection_point(members, joint.position)
            .ok_or_else(|| CorrectionFailure::Infeasible(format!("joint {} has no members to meet at", joint.id)))?;
        let before = joint.position;
        let id = joint.id.clone();
        let delta = target - before;
        let serving: Vec<String> = model.plates_serving(joint).map(|plate| plate.id.clone()).collect();
        if let Some(joint) = model.joint_mut(&id) {
            joint.position = target;
        }
        let mut changes = vec![Change::point(&id, "position", before, target)];
        for plate_id in serving {
            changes.extend(translate(model, &plate_id, delta));
        }
        Ok(changes)
    }

    /// Slide a plate and its hardware onto the joint it serves
    pub(crate) fn move_plate_to_joint(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?;
        let joint = model
            .joint_for_plate(plate)
            .filter(|joint| joint.position.is_finite())
            .ok_or_else(|| CorrectionFailure::Infeasible(format!("plate {} serves no joint", plate.id)))?;
        let delta = joint.position - plate.position;
        if delta.length() <= self.config.alignment_tolerance_mm {
            // already home, so the clash lies with whatever it overlaps
            return Err(CorrectionFailure::Infeasible(format!(
                "plate {} already sits on joint {}",
                plate.id, joint.id
            )));
        }
        let id = plate.id.clone();
        Ok(translate(model, &id, delta))
    }

    /// Drop or lift a base plate onto the foundation elevation
    pub(crate) fn seat_base_plate(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?;
        let delta = DVec3::new(0.0, 0.0, model.base_elevation() - plate.position.z);
        let id = plate.id.clone();
        Ok(translate(model, &id, delta))
    }

    /// Move a weld onto the midpoint of the plate edge nearest to it and make it run the full edge.
    /// A fillet that got shorter is re-sized for its new length.
    pub(crate) fn snap_weld(&self, model: &mut StructuralModel, clash: &Clash) -> Result<Vec<Change>, CorrectionFailure> {
        let weld = model
            .welds
            .iter()
            .find(|weld| weld.id == clash.primary())
            .ok_or_else(|| CorrectionFailure::MissingElement(clash.primary().to_string()))?;
        let plate = plate_of(model, &weld.plate)?;
        let edge = Edge::nearest(plate, plate.local(weld.position));
        let (midpoint, length) = edge.midpoint(plate);
        let target = plate.global(midpoint);
        let mut changes = vec![
            Change::point(&weld.id, "position", weld.position, target),
            Change::number(&weld.id, "length", weld.length, length),
        ];
        let id = weld.id.clone();
        if let Some(weld) = model.weld_mut(&id) {
            weld.position = target;
            weld.length = length;
        }
        changes.extend(self.refit_fillet(model, &id));
        Ok(changes)
    }

    /// Pull a stray bolt back inside its plate, a preferred edge distance in from the edges
    pub(crate) fn pull_bolt_inside(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let bolt = model
            .bolts
            .iter()
            .find(|bolt| bolt.id == clash.primary())
            .ok_or_else(|| CorrectionFailure::MissingElement(clash.primary().to_string()))?;
        let plate = plate_of(model, &bolt.plate)?;
        let (w, h) = (plate.width / 2.0, plate.height / 2.0);
        if w.min(h) < min_edge_distance(bolt.diameter) {
            return Err(CorrectionFailure::Infeasible(format!(
                "plate {} is too small for M{:.0}",
                plate.id, bolt.diameter
            )));
        }
        let edge = preferred_edge_distance(bolt.diameter).min(w).min(h);
        let local = plate.local(bolt.position);
        let inside = DVec3::new(local.x.clamp(edge - w, w - edge), local.y.clamp(edge - h, h - edge), 0.0);
        let target = plate.global(inside);
        let change = Change::point(&bolt.id, "position", bolt.position, target);
        let id = bolt.id.clone();
        if let Some(bolt) = model.bolt_mut(&id) {
            bolt.position = target;
        }
        Ok(vec![change])
    }

    /// Turn a plate square to its member, carrying the hardware along in plate coordinates
    pub(crate) fn realign_plate(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?;
        let member = model
            .primary_member(plate)
            .ok_or_else(|| CorrectionFailure::Infeasible(format!("plate {} has no member to align to", plate.id)))?;
        let frame = LocalFrame::for_member(member).map_err(|error| CorrectionFailure::Infeasible(error.to_string()))?;
        // the member axis becomes the plate normal
        let (axis_u, axis_v) = (frame.y, frame.z);
        let mut realigned = plate.clone();
        realigned.axis_u = axis_u;
        realigned.axis_v = axis_v;

        let mut changes = vec![
            Change::point(&plate.id, "axis_u", plate.axis_u, axis_u),
            Change::point(&plate.id, "axis_v", plate.axis_v, axis_v),
        ];
        let moved: Vec<(String, DVec3, DVec3)> = model
            .bolts_on(&plate.id)
            .map(|bolt| (bolt.id.clone(), bolt.position))
            .chain(model.welds_on(&plate.id).map(|weld| (weld.id.clone(), weld.position)))
            .chain(model.anchors_on(&plate.id).map(|anchor| (anchor.id.clone(), anchor.position)))
            .map(|(id, position)| (id, position, realigned.global(plate.local(position))))
            .collect();
        for (id, before, after) in &moved {
            changes.push(Change::point(id, "position", *before, *after));
        }
        let plate_id = plate.id.clone();
        if let Some(plate) = model.plate_mut(&plate_id) {
            *plate = realigned;
        }
        for (id, _, after) in moved {
            if let Some(bolt) = model.bolt_mut(&id) {
                bolt.position = after;
            } else if let Some(weld) = model.weld_mut(&id) {
                weld.position = after;
            } else if let Some(anchor) = model.anchor_mut(&id) {
                anchor.position = after;
            }
        }
        Ok(changes)
    }
}

/// Translate a plate and record where each of its elements went
fn translate(model: &mut StructuralModel, plate_id: &str, delta: DVec3) -> Vec<Change> {
    let before: Vec<(String, DVec3)> = model
        .plate(plate_id)
        .map(|plate| (plate.id.clone(), plate.position))
        .into_iter()
        .chain(model.bolts_on(plate_id).map(|bolt| (bolt.id.clone(), bolt.position)))
        .chain(model.welds_on(plate_id).map(|weld| (weld.id.clone(), weld.position)))
        .chain(model.anchors_on(plate_id).map(|anchor| (anchor.id.clone(), anchor.position)))
        .collect();
    model.translate_plate(plate_id, delta);
    before
        .into_iter()
        .map(|(id, position)| Change::point(&id, "position", position, position + delta))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash::ClashCategory;
    use crate::config::EngineConfig;
    use crate::connection::ConnectionCategory;
    use crate::correction::CorrectionStatus;
    use crate::model::{Bolt, Joint, Member, Plate, Weld, WeldKind};
    use crate::standards::sizing::SizingRegistry;

    fn model() -> StructuralModel {
        let mut model = StructuralModel::new(vec![
            Member::new("B1", DVec3::ZERO, DVec3::new(3000.0, 0.0, 0.0), "IPE300"),
            Member::new("B2", DVec3::new(3000.0, 0.0, 0.0), DVec3::new(6000.0, 0.0, 0.0), "IPE300"),
        ]);
        model.joints.push(Joint {
            id: "J1".into(),
            position: DVec3::new(3000.0, 0.0, 0.0),
            members: vec!["B1".into(), "B2".into()],
            confidence: 1.0,
        });
        model.plates.push(Plate {
            id: "P1".into(),
            position: DVec3::new(3000.0, 40.0, 0.0),
            width: 200.0,
            height: 300.0,
            thickness: 12.0,
            material: "S355".into(),
            members: vec!["B1".into(), "B2".into()],
            joint: Some("J1".into()),
            category: ConnectionCategory::Splice,
            axis_u: DVec3::Y,
            axis_v: DVec3::Z,
        });
        model.bolts.push(Bolt {
            id: "B-1".into(),
            position: DVec3::new(3000.0, 40.0 + 500.0, 0.0),
            diameter: 16.0,
            grade: "8.8".into(),
            plate: "P1".into(),
        });
        model.welds.push(Weld {
            id: "W-1".into(),
            position: DVec3::new(3000.0, 40.0 + 60.0, 0.0),
            size: 6.0,
            length: 100.0,
            kind: WeldKind::Fillet,
            material: "S355".into(),
            plate: "P1".into(),
        });
        model
    }

    #[test]
    fn test_plate_moves_with_its_hardware() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        let clash = Clash::new(ClashCategory::PlateOffset, "P1");
        let changes = ClashCorrector::new(&config, &sizing).move_plate_to_joint(&mut model, &clash).unwrap();
        assert_eq!(changes.len(), 3);
        assert_eq!(model.plates[0].position, DVec3::new(3000.0, 0.0, 0.0));
        assert_eq!(model.bolts[0].position, DVec3::new(3000.0, 500.0, 0.0));

        let again = ClashCorrector::new(&config, &sizing).move_plate_to_joint(&mut model, &clash);
        assert!(matches!(again, Err(CorrectionFailure::Infeasible(_))));
    }

    #[test]
    fn test_joint_carries_its_plate() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        model.joints[0].position = DVec3::new(3000.0, 0.0, 500.0);
        model.plates[0].position = DVec3::new(3000.0, 0.0, 500.0);
        model.bolts[0].position = DVec3::new(3000.0, 60.0, 500.0);
        let clash = Clash::new(ClashCategory::JointPositionMismatch, "J1");
        let changes = ClashCorrector::new(&config, &sizing).move_joint(&mut model, &clash).unwrap();
        assert_eq!(model.joints[0].position, DVec3::new(3000.0, 0.0, 0.0));
        assert_eq!(model.plates[0].position, model.joints[0].position);
        assert_eq!(model.bolts[0].position, DVec3::new(3000.0, 60.0, 0.0));
        assert!(changes.iter().any(|change| change.element == "P1"));
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn test_stray_bolt_and_weld_come_home() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        let corrector = ClashCorrector::new(&config, &sizing);
        corrector
            .pull_bolt_inside(&mut model, &Clash::new(ClashCategory::BoltOutsidePlate, "B-1"))
            .unwrap();
        let local = model.plates[0].local(model.bolts[0].position);
        assert!(local.x.abs() <= 100.0 - preferred_edge_distance(16.0) + 1e-9);

        corrector
            .snap_weld(&mut model, &Clash::new(ClashCategory::WeldOffEdge, "W-1"))
            .unwrap();
        let weld = &model.welds[0];
        assert_eq!(weld.length, 300.0);
        assert!((model.plates[0].local(weld.position).x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_shortened_weld_is_resized() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        model.members[0].design_load_kn = 500.0;
        model.welds[0].length = 2000.0;
        let changes = ClashCorrector::new(&config, &sizing)
            .snap_weld(&mut model, &Clash::new(ClashCategory::WeldOffEdge, "W-1"))
            .unwrap();
        let weld = &model.welds[0];
        assert_eq!(weld.length, 300.0);
        assert_eq!(weld.size, 10.0);
        assert!(changes.iter().any(|change| change.field == "size"));
    }

    #[test]
    fn test_review_clash_is_not_touched() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        let mut clash = Clash::new(ClashCategory::MemberIntersection, "B1").with("B2");
        clash.id = "C001".into();
        let pass = ClashCorrector::new(&config, &sizing).correct(&mut model, &[clash]);
        assert_eq!(pass.corrections[0].status, CorrectionStatus::ReviewRequired);
        assert_eq!(model, self::model());
    }
}
