/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use crate::clash::checks::SLACK;
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::model::{Plate, Weld, WeldKind};
use crate::standards::sizing::{standard_minimum, SizedQuantity, SizingRequest};

/// How far a weld midpoint sits from the nearest edge of its plate, in plate axes
pub fn edge_gap(plate: &Plate, weld: &Weld) -> f64 {
    let local = plate.local(weld.position);
    let (w, h) = (plate.width / 2.0, plate.height / 2.0);
    let outside = (local.x.abs() - w).max(0.0).hypot((local.y.abs() - h).max(0.0));
    let inside = (w - local.x.abs()).min(h - local.y.abs()).max(0.0);
    outside.max(inside).hypot(local.z)
}

/// The fillet size the rules want for one weld of a plate
pub fn required_fillet(index: &ModelIndex, plate: &Plate, weld: &Weld) -> f64 {
    let share = index.plate_demand(plate).per(index.welds_on(&plate.id).len());
    standard_minimum(
        &SizingRequest::new(SizedQuantity::WeldSize, &plate.material, share, plate.category)
            .with_thickness(plate.thickness)
            .with_weld_length(weld.length),
    )
}

pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let tolerance = index.config.alignment_tolerance_mm;
    let mut clashes = Vec::new();
    for plate in index.valid_plates() {
        let welds = index.welds_on(&plate.id);
        if welds.is_empty() {
            if index.primary_member(plate).is_some() {
                clashes.push(
                    Clash::new(ClashCategory::WeldMissing, &plate.id)
                        .observed(0.0, Expectation::AtLeast { value: 1.0 })
                        .at(plate.position)
                        .message(format!("plate {} is not welded to its member", plate.id)),
                );
            }
            continue;
        }
        let full_penetration = plate.category.needs_full_penetration();
        for weld in welds {
            let penetration_short = match weld.kind {
                WeldKind::CompletePenetration => weld.size + SLACK < plate.thickness,
                WeldKind::Fillet => full_penetration,
            };
            if penetration_short {
                clashes.push(
                    Clash::new(ClashCategory::WeldInsufficientPenetration, &weld.id)
                        .with(&plate.id)
                        .observed(weld.size, Expectation::AtLeast { value: plate.thickness })
                        .at(weld.position)
                        .message(format!(
                            "weld {} does not penetrate the {:.0} mm plate {}",
                            weld.id, plate.thickness, plate.id
                        )),
                );
            } else if weld.kind == WeldKind::Fillet {
                let required = required_fillet(index, plate, weld);
                if weld.size + SLACK < required {
                    clashes.push(
                        Clash::new(ClashCategory::WeldUndersized, &weld.id)
                            .with(&plate.id)
                            .observed(weld.size, Expectation::AtLeast { value: required })
                            .at(weld.position)
                            .message(format!("weld {} is {:.0} mm, needs {required:.1} mm", weld.id, weld.size)),
                    );
                }
            }
            let gap = edge_gap(plate, weld);
            if gap > tolerance {
                clashes.push(
                    Clash::new(ClashCategory::WeldOffEdge, &weld.id)
                        .with(&plate.id)
                        .observed(gap, Expectation::AtMost { value: tolerance })
                        .confidence(0.9)
                        .at(weld.position)
                        .message(format!("weld {} runs {gap:.0} mm off the edge of plate {}", weld.id, plate.id)),
                );
            }
        }
    }
    clashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionCategory;
    use glam::DVec3;

    fn plate() -> Plate {
        Plate {
            id: "P1".into(),
            position: DVec3::new(1000.0, 0.0, 0.0),
            width: 200.0,
            height: 300.0,
            thickness: 12.0,
            material: "S355".into(),
            members: vec![],
            joint: None,
            category: ConnectionCategory::Shear,
            axis_u: DVec3::Y,
            axis_v: DVec3::Z,
        }
    }

    fn weld_at(position: DVec3) -> Weld {
        Weld {
            id: "W1".into(),
            position,
            size: 5.0,
            length: 300.0,
            kind: WeldKind::Fillet,
            material: "S355".into(),
            plate: "P1".into(),
        }
    }

    #[test]
    fn test_edge_gap() {
        let plate = plate();
        assert!(edge_gap(&plate, &weld_at(DVec3::new(1000.0, 100.0, 0.0))) < 1e-9);
        assert!((edge_gap(&plate, &weld_at(DVec3::new(1000.0, 60.0, 0.0))) - 40.0).abs() < 1e-9);
        assert!((edge_gap(&plate, &weld_at(DVec3::new(1000.0, 130.0, 0.0))) - 30.0).abs() < 1e-9);
        assert!((edge_gap(&plate, &weld_at(DVec3::new(1020.0, 100.0, 0.0))) - 20.0).abs() < 1e-9);
    }
}
