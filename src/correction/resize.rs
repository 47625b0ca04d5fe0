/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use crate::clash::checks::base_plate::required_outline;
use crate::clash::checks::properties::prevailing_bolt_grade;
use crate::clash::checks::SLACK;
use crate::clash::Clash;
use crate::connection::{ConnectionCategory, Synthesizer};
use crate::correction::{plate_of, ClashCorrector, Change, Edge};
use crate::error::CorrectionFailure;
use crate::model::section::Section;
use crate::model::{Anchor, Bolt, Plate, StructuralModel, Weld, WeldKind};
use crate::standards::sizing::{SizedQuantity, SizingRequest};
use crate::standards::tables::{
    min_edge_distance, min_spacing, min_weld_size, preferred_edge_distance, preferred_embedment, round_up,
    steel_grade, WELD_SIZES,
};
use crate::units::Kilonewtons;

/// Plate outlines are cut in whole centimeters
const OUTLINE_STEP: f64 = 10.0;

fn missing(id: &str) -> CorrectionFailure {
    CorrectionFailure::MissingElement(id.to_string())
}

fn bolt<'m>(model: &'m StructuralModel, id: &str) -> Result<&'m Bolt, CorrectionFailure> {
    model.bolts.iter().find(|bolt| bolt.id == id).ok_or_else(|| missing(id))
}

fn weld<'m>(model: &'m StructuralModel, id: &str) -> Result<&'m Weld, CorrectionFailure> {
    model.welds.iter().find(|weld| weld.id == id).ok_or_else(|| missing(id))
}

fn anchor<'m>(model: &'m StructuralModel, id: &str) -> Result<&'m Anchor, CorrectionFailure> {
    model.anchors.iter().find(|anchor| anchor.id == id).ok_or_else(|| missing(id))
}

fn round_outline(value: f64) -> f64 {
    (value / OUTLINE_STEP).ceil() * OUTLINE_STEP
}

/// Bring every weld on a plate up to what a new plate thickness demands
fn cascade_welds(model: &mut StructuralModel, plate_id: &str, thickness: f64) -> Vec<Change> {
    let least = round_up(&WELD_SIZES, min_weld_size(thickness)).value;
    let mut changes = Vec::new();
    for weld in model.welds.iter_mut().filter(|weld| weld.plate == plate_id) {
        let wanted = match weld.kind {
            WeldKind::CompletePenetration => thickness,
            WeldKind::Fillet => weld.size.max(least),
        };
        if wanted > weld.size {
            changes.push(Change::number(&weld.id, "size", weld.size, wanted));
            weld.size = wanted;
        }
    }
    changes
}

/// Move the welds of a reshaped plate onto the matching edges of the new outline
fn refit_welds(model: &mut StructuralModel, before: &Plate, after: &Plate) -> Vec<Change> {
    let mut changes = Vec::new();
    for weld in model.welds.iter_mut().filter(|weld| weld.plate == before.id) {
        let edge = Edge::nearest(before, before.local(weld.position));
        let (midpoint, length) = edge.midpoint(after);
        let position = after.global(midpoint);
        changes.push(Change::point(&weld.id, "position", weld.position, position));
        changes.push(Change::number(&weld.id, "length", weld.length, length));
        weld.position = position;
        weld.length = length;
    }
    changes
}

impl ClashCorrector<'_> {
    /// Cut a base plate to the column section plus projection, never inside its anchors
    pub(crate) fn fit_base_plate(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?;
        let column = model
            .primary_member(plate)
            .ok_or_else(|| CorrectionFailure::Infeasible(format!("base plate {} has no column", plate.id)))?;
        let (section, _) = Section::resolve(&column.section);
        let (need_width, need_height) =
            required_outline(section.depth, section.width, self.config.base_plate_projection_mm);
        let (mut hold_width, mut hold_height) = (0.0_f64, 0.0_f64);
        let fasteners = model
            .anchors_on(&plate.id)
            .map(|anchor| (anchor.position, anchor.diameter))
            .chain(model.bolts_on(&plate.id).map(|bolt| (bolt.position, bolt.diameter)));
        for (position, diameter) in fasteners {
            let local = plate.local(position);
            let edge = preferred_edge_distance(diameter);
            hold_width = hold_width.max(2.0 * (local.x.abs() + edge));
            hold_height = hold_height.max(2.0 * (local.y.abs() + edge));
        }
        let factor = self.config.oversize_factor;
        let fit = |current: f64, need: f64, hold: f64| {
            if current + SLACK < need || current > factor * need {
                round_outline(need.max(hold))
            } else {
                current
            }
        };
        let width = fit(plate.width, need_width, hold_width);
        let height = fit(plate.height, need_height, hold_height);
        if (width - plate.width).abs() < SLACK && (height - plate.height).abs() < SLACK {
            return Err(CorrectionFailure::Infeasible(format!(
                "anchors hold base plate {} at {:.0}x{:.0}",
                plate.id, plate.width, plate.height
            )));
        }
        let before = plate.clone();
        let mut after = plate.clone();
        after.width = width;
        after.height = height;
        let mut changes = vec![
            Change::number(&plate.id, "width", plate.width, width),
            Change::number(&plate.id, "height", plate.height, height),
        ];
        if let Some(plate) = model.plate_mut(&before.id) {
            *plate = after.clone();
        }
        changes.extend(refit_welds(model, &before, &after));
        let welds: Vec<String> = model.welds_on(&before.id).map(|weld| weld.id.clone()).collect();
        changes.extend(welds.iter().filter_map(|id| self.refit_fillet(model, id)));
        Ok(changes)
    }

    /// What the sizing rules give a fillet of this length, never less than it has
    fn fillet_size(&self, model: &StructuralModel, weld: &Weld, plate: &Plate) -> f64 {
        let runs = model.welds_on(&plate.id).filter(|weld| weld.is_well_formed()).count();
        let share = model.plate_demand(plate).per(runs);
        self.sizing
            .size(
                &SizingRequest::new(SizedQuantity::WeldSize, &plate.material, share, plate.category)
                    .with_thickness(plate.thickness)
                    .with_weld_length(weld.length)
                    .at_least(weld.size),
            )
            .value
    }

    /// Grow a fillet that has just changed length to what its new length needs
    pub(crate) fn refit_fillet(&self, model: &mut StructuralModel, weld_id: &str) -> Option<Change> {
        let weld = weld(model, weld_id).ok()?;
        if weld.kind != WeldKind::Fillet {
            return None;
        }
        let plate = plate_of(model, &weld.plate).ok()?;
        let size = self.fillet_size(model, weld, plate);
        if size <= weld.size + SLACK {
            return None;
        }
        let change = Change::number(&weld.id, "size", weld.size, size);
        if let Some(weld) = model.weld_mut(weld_id) {
            weld.size = size;
        }
        Some(change)
    }

    pub(crate) fn grow_weld(&self, model: &mut StructuralModel, clash: &Clash) -> Result<Vec<Change>, CorrectionFailure> {
        let weld = weld(model, clash.primary())?;
        let plate = plate_of(model, &weld.plate)?;
        let size = self.fillet_size(model, weld, plate);
        if size <= weld.size + SLACK {
            return Err(CorrectionFailure::Infeasible(format!(
                "weld {} cannot grow past {:.0} mm",
                weld.id, weld.size
            )));
        }
        let change = Change::number(&weld.id, "size", weld.size, size);
        let id = weld.id.clone();
        if let Some(weld) = model.weld_mut(&id) {
            weld.size = size;
        }
        Ok(vec![change])
    }

    pub(crate) fn full_penetration(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let weld = weld(model, clash.primary())?;
        let thickness = plate_of(model, &weld.plate)?.thickness;
        let mut changes = vec![Change::number(&weld.id, "size", weld.size, thickness)];
        if weld.kind != WeldKind::CompletePenetration {
            changes.push(Change::text(&weld.id, "kind", "fillet", "complete_penetration"));
        }
        let id = weld.id.clone();
        if let Some(weld) = model.weld_mut(&id) {
            weld.kind = WeldKind::CompletePenetration;
            weld.size = thickness;
        }
        Ok(changes)
    }

    pub(crate) fn deepen_anchor(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let anchor = anchor(model, clash.primary())?;
        let embedment = preferred_embedment(anchor.diameter).max(anchor.embedment);
        let change = Change::number(&anchor.id, "embedment", anchor.embedment, embedment);
        let id = anchor.id.clone();
        if let Some(anchor) = model.anchor_mut(&id) {
            anchor.embedment = embedment;
        }
        Ok(vec![change])
    }

    /// Thicken a plate for its fasteners and bearing, then raise its welds to match
    pub(crate) fn thicken_plate(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?;
        let bolts = model.bolts_on(&plate.id).filter(|bolt| bolt.is_well_formed()).count();
        let diameter = model
            .bolts_on(&plate.id)
            .filter(|bolt| bolt.is_well_formed())
            .map(|bolt| bolt.diameter)
            .chain(
                model
                    .anchors_on(&plate.id)
                    .filter(|anchor| anchor.is_well_formed())
                    .map(|anchor| anchor.diameter),
            )
            .max_by(f64::total_cmp)
            .ok_or_else(|| CorrectionFailure::Infeasible(format!("plate {} carries no fasteners", plate.id)))?;
        let demand = if bolts == 0 {
            Kilonewtons(0.0)
        } else {
            model.plate_demand(plate).per(bolts)
        };
        let sized = self.sizing.size(
            &SizingRequest::new(SizedQuantity::PlateThickness, &plate.material, demand, plate.category)
                .with_bolt_diameter(diameter)
                .at_least(plate.thickness),
        );
        if sized.value <= plate.thickness + SLACK {
            return Err(CorrectionFailure::Infeasible(format!(
                "plate {} cannot get thicker than {:.0} mm",
                plate.id, plate.thickness
            )));
        }
        let id = plate.id.clone();
        let mut changes = vec![Change::number(&id, "thickness", plate.thickness, sized.value)];
        if let Some(plate) = model.plate_mut(&id) {
            plate.thickness = sized.value;
        }
        changes.extend(cascade_welds(model, &id, sized.value));
        Ok(changes)
    }

    /// Upsize one bolt if it still fits its plate, then thicken the plate to suit
    pub(crate) fn upsize_bolt(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let bolt = bolt(model, clash.primary())?;
        let plate = plate_of(model, &bolt.plate)?;
        let count = model.bolts_on(&plate.id).filter(|bolt| bolt.is_well_formed()).count();
        let demand = model.plate_demand(plate).per(count);
        let sized = self.sizing.size(
            &SizingRequest::new(SizedQuantity::BoltDiameter, &bolt.grade, demand, plate.category)
                .at_least(bolt.diameter),
        );
        let diameter = sized.value;
        if diameter <= bolt.diameter + SLACK {
            return Err(CorrectionFailure::Infeasible(format!(
                "bolt {} is already the largest size that fits",
                bolt.id
            )));
        }
        let local = plate.local(bolt.position);
        let edge = (plate.width / 2.0 - local.x.abs()).min(plate.height / 2.0 - local.y.abs());
        if edge + SLACK < min_edge_distance(diameter) {
            return Err(CorrectionFailure::Infeasible(format!(
                "M{diameter:.0} would sit {edge:.0} mm from the edge of plate {}",
                plate.id
            )));
        }
        let crowded = model
            .bolts_on(&plate.id)
            .filter(|other| other.id != bolt.id && other.is_well_formed())
            .any(|other| other.position.distance(bolt.position) + SLACK < min_spacing(diameter.max(other.diameter)));
        if crowded {
            return Err(CorrectionFailure::Infeasible(format!(
                "no room on plate {} to space M{diameter:.0}",
                plate.id
            )));
        }
        let thickness = self
            .sizing
            .size(
                &SizingRequest::new(SizedQuantity::PlateThickness, &plate.material, demand, plate.category)
                    .with_bolt_diameter(diameter)
                    .at_least(plate.thickness),
            )
            .value;
        let (bolt_id, plate_id, before_thickness) = (bolt.id.clone(), plate.id.clone(), plate.thickness);
        let mut changes = vec![Change::number(&bolt_id, "diameter", bolt.diameter, diameter)];
        if let Some(bolt) = model.bolt_mut(&bolt_id) {
            bolt.diameter = diameter;
        }
        if thickness > before_thickness + SLACK {
            changes.push(Change::number(&plate_id, "thickness", before_thickness, thickness));
            if let Some(plate) = model.plate_mut(&plate_id) {
                plate.thickness = thickness;
            }
            changes.extend(cascade_welds(model, &plate_id, thickness));
        }
        Ok(changes)
    }

    /// Weld a bare plate to its member along the edges
    pub(crate) fn regenerate_welds(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?.clone();
        let demand = model.plate_demand(&plate);
        let welds = Synthesizer::new(self.config, self.sizing).welds(&plate, demand);
        let mut changes = Vec::new();
        for mut weld in welds {
            weld.id = model.unused_id(&weld.id);
            changes.push(Change::text(&weld.id, "presence", "absent", "added"));
            model.welds.push(weld);
        }
        Ok(changes)
    }

    /// Anchor a bare base plate with a two by two group
    pub(crate) fn regenerate_anchors(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?.clone();
        let parameters = ConnectionCategory::BasePlate.parameters();
        let demand = model.plate_demand(&plate).per(parameters.anchors);
        let diameter = self
            .sizing
            .size(
                &SizingRequest::new(
                    SizedQuantity::AnchorDiameter,
                    &self.config.default_anchor_grade,
                    demand,
                    plate.category,
                )
                .at_least(parameters.fastener_diameter),
            )
            .value;
        let anchors = Synthesizer::new(self.config, self.sizing).anchors(&plate, diameter, 2, 2);
        let mut changes = Vec::new();
        for mut anchor in anchors {
            anchor.id = model.unused_id(&anchor.id);
            changes.push(Change::text(&anchor.id, "presence", "absent", "added"));
            model.anchors.push(anchor);
        }
        Ok(changes)
    }

    /// Make a plate and its welds the member's steel
    pub(crate) fn respecify_material(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = plate_of(model, clash.primary())?;
        let member = model
            .primary_member(plate)
            .ok_or_else(|| CorrectionFailure::Infeasible(format!("plate {} has no member", plate.id)))?;
        let expected = steel_grade(&member.grade)
            .map(|grade| grade.name.to_string())
            .unwrap_or_else(|| self.config.default_steel_grade.clone());
        let id = plate.id.clone();
        let mut changes = vec![Change::text(&id, "material", &plate.material, &expected)];
        if let Some(plate) = model.plate_mut(&id) {
            plate.material = expected.clone();
        }
        for weld in model.welds.iter_mut().filter(|weld| weld.plate == id && weld.material != expected) {
            changes.push(Change::text(&weld.id, "material", &weld.material, &expected));
            weld.material = expected.clone();
        }
        Ok(changes)
    }

    pub(crate) fn respecify_bolt_grade(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let bolt = bolt(model, clash.primary())?;
        let neighbours: Vec<&Bolt> = model.bolts_on(&bolt.plate).filter(|bolt| bolt.is_well_formed()).collect();
        let grade = prevailing_bolt_grade(&neighbours, &self.config.default_bolt_grade);
        let change = Change::text(&bolt.id, "grade", &bolt.grade, &grade);
        let id = bolt.id.clone();
        if let Some(bolt) = model.bolt_mut(&id) {
            bolt.grade = grade;
        }
        Ok(vec![change])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash::ClashCategory;
    use crate::config::EngineConfig;
    use crate::model::{Joint, Member};
    use crate::standards::sizing::SizingRegistry;
    use glam::DVec3;

    fn splice(thickness: f64, bolt_diameter: f64) -> StructuralModel {
        let mut model = StructuralModel::new(vec![
            Member::new("B1", DVec3::ZERO, DVec3::new(3000.0, 0.0, 0.0), "IPE300").with_load(40.0),
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
            position: DVec3::new(3000.0, 0.0, 0.0),
            width: 200.0,
            height: 300.0,
            thickness,
            material: "S355".into(),
            members: vec!["B1".into(), "B2".into()],
            joint: Some("J1".into()),
            category: ConnectionCategory::Splice,
            axis_u: DVec3::Y,
            axis_v: DVec3::Z,
        });
        for (index, (y, z)) in [(-50.0, -80.0), (50.0, -80.0), (-50.0, 80.0), (50.0, 80.0)].into_iter().enumerate() {
            model.bolts.push(Bolt {
                id: format!("B-{}", index + 1),
                position: DVec3::new(3000.0, y, z),
                diameter: bolt_diameter,
                grade: "8.8".into(),
                plate: "P1".into(),
            });
        }
        model.welds.push(Weld {
            id: "W-1".into(),
            position: DVec3::new(3000.0, -100.0, 0.0),
            size: 3.0,
            length: 300.0,
            kind: WeldKind::Fillet,
            material: "S355".into(),
            plate: "P1".into(),
        });
        model
    }

    #[test]
    fn test_thicker_plate_raises_its_welds() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = splice(6.0, 16.0);
        let changes = ClashCorrector::new(&config, &sizing)
            .thicken_plate(&mut model, &Clash::new(ClashCategory::PlateThicknessInsufficient, "P1"))
            .unwrap();
        let thickness = model.plates[0].thickness;
        assert!(thickness >= 16.0 / 1.5);
        assert!(model.welds[0].size >= min_weld_size(thickness));
        assert!(changes.iter().any(|change| change.element == "W-1"));
    }

    #[test]
    fn test_bolt_upsize_refused_without_room() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = splice(12.0, 8.0);
        model.members[0].design_load_kn = 400.0;
        for bolt in model.bolts.iter_mut() {
            bolt.position.y /= 2.0;
        }
        // 50 mm apart is too close for the M24 the load asks for
        let result = ClashCorrector::new(&config, &sizing)
            .upsize_bolt(&mut model, &Clash::new(ClashCategory::BoltUndersized, "B-1"));
        assert!(matches!(result, Err(CorrectionFailure::Infeasible(_))));
        assert_eq!(model.bolts[0].diameter, 8.0);
    }

    #[test]
    fn test_missing_welds_are_regenerated_once() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = splice(12.0, 16.0);
        model.welds.clear();
        let changes = ClashCorrector::new(&config, &sizing)
            .regenerate_welds(&mut model, &Clash::new(ClashCategory::WeldMissing, "P1"))
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(model.welds.len(), 2);
        assert!(model.welds.iter().all(|weld| weld.plate == "P1"));
    }
}
