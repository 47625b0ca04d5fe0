/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::DVec2;

use crate::clash::checks::{section_confidence, SLACK};
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::connection::ConnectionCategory;

/// Smallest (width, height) that clears the column section by the projection on every side
pub fn required_outline(depth: f64, width: f64, projection: f64) -> (f64, f64) {
    (width + 2.0 * projection, depth + 2.0 * projection)
}

/// Base plates against the foundation. Negative coordinates only count when they put
/// the plate below the foundation; offsets relative to a joint are fine.
pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let config = index.config;
    let base = index.base_elevation;
    let mut clashes = Vec::new();
    for plate in index
        .valid_plates()
        .filter(|plate| plate.category == ConnectionCategory::BasePlate)
    {
        let above = plate.position.z - base;
        if above > config.elevation_tolerance_mm {
            clashes.push(
                Clash::new(ClashCategory::BasePlateWrongElevation, &plate.id)
                    .observed(plate.position.z, Expectation::Exactly { value: base })
                    .at(plate.position)
                    .message(format!(
                        "base plate {} sits {above:.0} mm above the foundation at {base:.0}",
                        plate.id
                    )),
            );
        } else if above < -config.elevation_tolerance_mm {
            clashes.push(
                Clash::new(ClashCategory::BasePlateNegativeCoordinate, &plate.id)
                    .observed(plate.position.z, Expectation::AtLeast { value: base })
                    .at(plate.position)
                    .message(format!(
                        "base plate {} is {:.0} mm below the foundation",
                        plate.id, -above
                    )),
            );
        }

        let outside = index.model.foundation.as_ref().is_some_and(|foundation| {
            !foundation
                .footprint
                .contains(DVec2::new(plate.position.x, plate.position.y), 0.0)
        });
        let column = index.primary_member(plate);
        let gap = column
            .map(|column| column.lowest_elevation() - base)
            .filter(|gap| *gap > config.elevation_tolerance_mm);
        if outside || gap.is_some() {
            let mut reasons = Vec::new();
            if outside {
                reasons.push(format!("base plate {} bears outside the footing", plate.id));
            }
            let mut clash = Clash::new(ClashCategory::FoundationGap, &plate.id)
                .confidence(if outside { 0.95 } else { 0.9 })
                .at(plate.position);
            if let (Some(column), Some(gap)) = (column, gap) {
                reasons.push(format!("column {} stops {gap:.0} mm short of the foundation", column.id));
                clash = clash
                    .with(&column.id)
                    .observed(gap, Expectation::AtMost { value: config.elevation_tolerance_mm });
            }
            clashes.push(clash.message(reasons.join("; ")));
        }

        let Some(column) = column else {
            continue;
        };
        let (section, known) = index.section(column);
        let (need_width, need_height) =
            required_outline(section.depth, section.width, config.base_plate_projection_mm);
        let short = (need_width - plate.width).max(need_height - plate.height);
        if short > SLACK {
            clashes.push(
                Clash::new(ClashCategory::BasePlateUndersized, &plate.id)
                    .with(&column.id)
                    .observed(
                        plate.width.min(plate.height),
                        Expectation::AtLeast { value: need_width.min(need_height) },
                    )
                    .confidence(section_confidence(known, 0.95))
                    .at(plate.position)
                    .message(format!(
                        "base plate {} is {:.0}x{:.0}, column {} needs {need_width:.0}x{need_height:.0}",
                        plate.id, plate.width, plate.height, column.id
                    )),
            );
        } else if plate.width > config.oversize_factor * need_width
            || plate.height > config.oversize_factor * need_height
        {
            clashes.push(
                Clash::new(ClashCategory::BasePlateOversized, &plate.id)
                    .with(&column.id)
                    .observed(
                        plate.width.max(plate.height),
                        Expectation::AtMost { value: config.oversize_factor * need_width.max(need_height) },
                    )
                    .confidence(section_confidence(known, 0.8))
                    .at(plate.position)
                    .message(format!("base plate {} is far larger than column {}", plate.id, column.id)),
            );
        }
    }
    clashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{Footprint, Foundation, Member, Plate, StructuralModel};
    use glam::DVec3;

    fn hovering_column_off_the_footing() -> StructuralModel {
        let mut model = StructuralModel::new(vec![Member::new(
            "C1",
            DVec3::new(2000.0, 0.0, 200.0),
            DVec3::new(2000.0, 0.0, 3200.0),
            "HEA200",
        )])
        .with_foundation(Foundation {
            elevation: 0.0,
            footprint: Footprint {
                min: DVec2::new(-600.0, -600.0),
                max: DVec2::new(600.0, 600.0),
            },
        });
        model.plates.push(Plate {
            id: "P1".into(),
            position: DVec3::new(2000.0, 0.0, 0.0),
            width: 400.0,
            height: 400.0,
            thickness: 20.0,
            material: "S355".into(),
            members: vec!["C1".into()],
            joint: None,
            category: ConnectionCategory::BasePlate,
            axis_u: DVec3::X,
            axis_v: DVec3::Y,
        });
        model
    }

    #[test]
    fn test_one_foundation_gap_per_plate() {
        let config = EngineConfig::default();
        let model = hovering_column_off_the_footing();
        let gaps: Vec<Clash> = check(&ModelIndex::new(&model, &config))
            .into_iter()
            .filter(|clash| clash.category == ClashCategory::FoundationGap)
            .collect();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].elements, vec!["P1".to_string(), "C1".to_string()]);
        assert!(gaps[0].message.contains("outside the footing"));
        assert!(gaps[0].message.contains("200 mm short"));
    }

    #[test]
    fn test_plate_on_the_footing_has_no_gap() {
        let config = EngineConfig::default();
        let mut model = hovering_column_off_the_footing();
        model.members[0].start = DVec3::new(0.0, 0.0, 0.0);
        model.members[0].end = DVec3::new(0.0, 0.0, 3000.0);
        model.plates[0].position = DVec3::ZERO;
        let clashes = check(&ModelIndex::new(&model, &config));
        assert!(clashes.iter().all(|clash| clash.category != ClashCategory::FoundationGap));
    }
}
