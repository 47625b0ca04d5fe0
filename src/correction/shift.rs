/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::{DVec2, DVec3};

use crate::clash::checks::SLACK;
use crate::clash::{Clash, ClashCategory};
use crate::correction::{plate_of, ClashCorrector, Change};
use crate::error::CorrectionFailure;
use crate::model::{Plate, StructuralModel};
use crate::standards::tables::{
    max_edge_distance, max_spacing, min_anchor_spacing, min_edge_distance, min_spacing, preferred_edge_distance,
};

/// A bolt or anchor as the shifting rules see it
struct Fastener {
    id: String,
    local: DVec3,
    diameter: f64,
}

fn bolts(model: &StructuralModel, plate: &Plate) -> Vec<Fastener> {
    model
        .bolts_on(&plate.id)
        .filter(|bolt| bolt.is_well_formed())
        .map(|bolt| Fastener {
            id: bolt.id.clone(),
            local: plate.local(bolt.position),
            diameter: bolt.diameter,
        })
        .collect()
}

fn anchors(model: &StructuralModel, plate: &Plate) -> Vec<Fastener> {
    model
        .anchors_on(&plate.id)
        .filter(|anchor| anchor.is_well_formed())
        .map(|anchor| Fastener {
            id: anchor.id.clone(),
            local: plate.local(anchor.position),
            diameter: anchor.diameter,
        })
        .collect()
}

fn split<'f>(group: &'f [Fastener], id: &str) -> Result<(&'f Fastener, Vec<&'f Fastener>), CorrectionFailure> {
    let moving = group
        .iter()
        .find(|fastener| fastener.id == id)
        .ok_or_else(|| CorrectionFailure::MissingElement(id.to_string()))?;
    Ok((moving, group.iter().filter(|fastener| fastener.id != id).collect()))
}

fn bolt_plate(model: &StructuralModel, id: &str) -> Result<Plate, CorrectionFailure> {
    let bolt = model
        .bolts
        .iter()
        .find(|bolt| bolt.id == id)
        .ok_or_else(|| CorrectionFailure::MissingElement(id.to_string()))?;
    plate_of(model, &bolt.plate).cloned()
}

fn anchor_plate(model: &StructuralModel, id: &str) -> Result<Plate, CorrectionFailure> {
    let anchor = model
        .anchors
        .iter()
        .find(|anchor| anchor.id == id)
        .ok_or_else(|| CorrectionFailure::MissingElement(id.to_string()))?;
    plate_of(model, &anchor.plate).cloned()
}

fn plan(local: DVec3) -> DVec2 {
    DVec2::new(local.x, local.y)
}

/// A new in-plane position keeps its edge distance and its spacing to every other fastener
fn fits(
    plate: &Plate,
    moving: &Fastener,
    others: &[&Fastener],
    at: DVec3,
    spacing: impl Fn(f64) -> f64,
) -> bool {
    let edge = min_edge_distance(moving.diameter);
    at.x.abs() + edge <= plate.width / 2.0 + SLACK
        && at.y.abs() + edge <= plate.height / 2.0 + SLACK
        && others.iter().all(|other| {
            plan(at).distance(plan(other.local)) + SLACK >= spacing(moving.diameter.max(other.diameter))
        })
}

/// A point on the segment from `toward` out to `from` at the given distance from `toward`
fn at_distance(from: DVec3, toward: DVec3, distance: f64) -> DVec3 {
    let direction = (plan(from) - plan(toward)).try_normalize().unwrap_or(DVec2::X);
    let target = plan(toward) + direction * distance;
    DVec3::new(target.x, target.y, from.z)
}

fn move_bolt(model: &mut StructuralModel, plate: &Plate, moving: &Fastener, at: DVec3) -> Vec<Change> {
    let target = plate.global(at);
    let mut changes = Vec::new();
    if let Some(bolt) = model.bolt_mut(&moving.id) {
        changes.push(Change::point(&bolt.id, "position", bolt.position, target));
        bolt.position = target;
    }
    changes
}

fn move_anchor(model: &mut StructuralModel, plate: &Plate, moving: &Fastener, at: DVec3) -> Vec<Change> {
    let target = plate.global(at);
    let mut changes = Vec::new();
    if let Some(anchor) = model.anchor_mut(&moving.id) {
        changes.push(Change::point(&anchor.id, "position", anchor.position, target));
        anchor.position = target;
    }
    changes
}

fn no_room(plate: &Plate, id: &str) -> CorrectionFailure {
    CorrectionFailure::Infeasible(format!("no room on plate {} to move {id}", plate.id))
}

impl ClashCorrector<'_> {
    /// Bring a bolt in from an edge it crowds, or out toward an edge it is too far from
    pub(crate) fn shift_bolt_from_edge(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let plate = bolt_plate(model, clash.primary())?;
        let group = bolts(model, &plate);
        let (moving, others) = split(&group, clash.primary())?;
        let (w, h) = (plate.width / 2.0, plate.height / 2.0);
        let local = moving.local;
        let candidates: Vec<DVec3> = match clash.category {
            ClashCategory::BoltEdgeDistanceTooSmall => [
                preferred_edge_distance(moving.diameter),
                min_edge_distance(moving.diameter),
            ]
            .into_iter()
            .map(|edge| {
                let (eu, ev) = ((w - edge).max(0.0), (h - edge).max(0.0));
                DVec3::new(local.x.clamp(-eu, eu), local.y.clamp(-ev, ev), local.z)
            })
            .collect(),
            _ => {
                let edge = max_edge_distance(plate.thickness);
                let toward = |coordinate: f64, half: f64| coordinate.signum() * (half - edge).max(0.0);
                if w - local.x.abs() <= h - local.y.abs() {
                    vec![DVec3::new(toward(local.x, w), local.y, local.z)]
                } else {
                    vec![DVec3::new(local.x, toward(local.y, h), local.z)]
                }
            }
        };
        let at = candidates
            .into_iter()
            .find(|&at| fits(&plate, moving, &others, at, min_spacing))
            .ok_or_else(|| no_room(&plate, &moving.id))?;
        Ok(move_bolt(model, &plate, moving, at))
    }

    /// Push a bolt away from a neighbour it crowds, or pull it toward one it is too far from
    pub(crate) fn shift_bolt_spacing(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let neighbour_id = clash.elements.get(1).map_or("", String::as_str);
        let plate = bolt_plate(model, clash.primary())?;
        let group = bolts(model, &plate);
        let (moving, others) = split(&group, clash.primary())?;
        let neighbour = others
            .iter()
            .find(|other| other.id == neighbour_id)
            .ok_or_else(|| CorrectionFailure::MissingElement(neighbour_id.to_string()))?;
        let pitch = match clash.category {
            ClashCategory::BoltSpacingTooSmall => min_spacing(moving.diameter.max(neighbour.diameter)),
            _ => max_spacing(plate.thickness),
        };
        let at = at_distance(moving.local, neighbour.local, pitch);
        if !fits(&plate, moving, &others, at, min_spacing) {
            return Err(no_room(&plate, &moving.id));
        }
        Ok(move_bolt(model, &plate, moving, at))
    }

    /// Pull an anchor back over the footing, as long as it stays on its plate
    pub(crate) fn shift_anchor_into_footing(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let footprint = model
            .foundation
            .map(|foundation| foundation.footprint)
            .ok_or_else(|| CorrectionFailure::Infeasible("the model has no foundation".to_string()))?;
        let plate = anchor_plate(model, clash.primary())?;
        let group = anchors(model, &plate);
        let (moving, others) = split(&group, clash.primary())?;
        let position = plate.global(moving.local);
        let clamped = footprint.clamp(DVec2::new(position.x, position.y), self.config.anchor_edge_cover_mm);
        let at = plate.local(DVec3::new(clamped.x, clamped.y, position.z));
        if !footprint.contains(clamped, self.config.anchor_edge_cover_mm - SLACK)
            || !fits(&plate, moving, &others, at, min_anchor_spacing)
        {
            return Err(CorrectionFailure::Infeasible(format!(
                "footing is too small for the anchors of plate {}",
                plate.id
            )));
        }
        Ok(move_anchor(model, &plate, moving, at))
    }

    pub(crate) fn shift_anchor_spacing(
        &self,
        model: &mut StructuralModel,
        clash: &Clash,
    ) -> Result<Vec<Change>, CorrectionFailure> {
        let neighbour_id = clash.elements.get(1).map_or("", String::as_str);
        let plate = anchor_plate(model, clash.primary())?;
        let group = anchors(model, &plate);
        let (moving, others) = split(&group, clash.primary())?;
        let neighbour = others
            .iter()
            .find(|other| other.id == neighbour_id)
            .ok_or_else(|| CorrectionFailure::MissingElement(neighbour_id.to_string()))?;
        let at = at_distance(
            moving.local,
            neighbour.local,
            min_anchor_spacing(moving.diameter.max(neighbour.diameter)),
        );
        let stays_on_footing = model.foundation.map_or(true, |foundation| {
            let global = plate.global(at);
            foundation
                .footprint
                .contains(DVec2::new(global.x, global.y), self.config.anchor_edge_cover_mm - SLACK)
        });
        if !stays_on_footing || !fits(&plate, moving, &others, at, min_anchor_spacing) {
            return Err(no_room(&plate, &moving.id));
        }
        Ok(move_anchor(model, &plate, moving, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::connection::ConnectionCategory;
    use crate::model::{Anchor, Bolt, Footprint, Foundation, Member};
    use crate::standards::sizing::SizingRegistry;

    fn plate(width: f64, height: f64) -> Plate {
        Plate {
            id: "P1".into(),
            position: DVec3::ZERO,
            width,
            height,
            thickness: 12.0,
            material: "S355".into(),
            members: vec!["C1".into()],
            joint: None,
            category: ConnectionCategory::Splice,
            axis_u: DVec3::X,
            axis_v: DVec3::Y,
        }
    }

    fn bolt(id: &str, x: f64, y: f64) -> Bolt {
        Bolt {
            id: id.into(),
            position: DVec3::new(x, y, 0.0),
            diameter: 16.0,
            grade: "8.8".into(),
            plate: "P1".into(),
        }
    }

    fn model() -> StructuralModel {
        let mut model =
            StructuralModel::new(vec![Member::new("C1", DVec3::ZERO, DVec3::new(0.0, 0.0, 3000.0), "HEA200")]);
        model.plates.push(plate(200.0, 300.0));
        model
    }

    #[test]
    fn test_bolt_moves_in_from_the_edge() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        model.bolts.push(bolt("B1", 95.0, 0.0));
        let clash = Clash::new(ClashCategory::BoltEdgeDistanceTooSmall, "B1").with("P1");
        ClashCorrector::new(&config, &sizing).shift_bolt_from_edge(&mut model, &clash).unwrap();
        let edge = 100.0 - model.bolts[0].position.x;
        assert!(edge + SLACK >= min_edge_distance(16.0));
    }

    #[test]
    fn test_crowded_bolts_spread_to_minimum_pitch() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model();
        model.bolts.push(bolt("B1", 0.0, -10.0));
        model.bolts.push(bolt("B2", 0.0, 10.0));
        let clash = Clash::new(ClashCategory::BoltSpacingTooSmall, "B2").with("B1");
        ClashCorrector::new(&config, &sizing).shift_bolt_spacing(&mut model, &clash).unwrap();
        let pitch = model.bolts[0].position.distance(model.bolts[1].position);
        assert!((pitch - min_spacing(16.0)).abs() < 1e-9);
        assert_eq!(model.bolts[0].position, DVec3::new(0.0, -10.0, 0.0));
    }

    #[test]
    fn test_anchor_pulled_back_over_footing() {
        let config = EngineConfig::default();
        let sizing = SizingRegistry::new(&config);
        let mut model = model().with_foundation(Foundation {
            elevation: 0.0,
            footprint: Footprint {
                min: DVec2::new(-200.0, -200.0),
                max: DVec2::new(130.0, 200.0),
            },
        });
        model.plates[0] = plate(400.0, 400.0);
        model.anchors.push(Anchor {
            id: "A1".into(),
            position: DVec3::new(140.0, 0.0, 0.0),
            diameter: 20.0,
            embedment: 300.0,
            grade: "8.8".into(),
            plate: "P1".into(),
        });
        let clash = Clash::new(ClashCategory::AnchorOutsideFooting, "A1").with("P1");
        ClashCorrector::new(&config, &sizing).shift_anchor_into_footing(&mut model, &clash).unwrap();
        assert!((model.anchors[0].position.x - (130.0 - config.anchor_edge_cover_mm)).abs() < 1e-9);
    }
}
