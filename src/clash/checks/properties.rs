/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::collections::HashMap;

use crate::clash::checks::SLACK;
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::model::{Bolt, Plate};
use crate::standards::sizing::{standard_minimum, SizedQuantity, SizingRequest};
use crate::standards::tables::{bearing_capacity, bolt_grade, min_plate_thickness, steel_grade, steel_grade_or};

/// The grade most bolts on a plate agree on, among grades in the table
pub fn prevailing_bolt_grade(bolts: &[&Bolt], default: &str) -> String {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    for bolt in bolts.iter().filter(|bolt| bolt_grade(&bolt.grade).is_some()) {
        *tally.entry(bolt.grade.trim()).or_default() += 1;
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(grade, _)| grade.to_string())
        .unwrap_or_else(|| default.to_string())
}

/// The steel a plate should be made of: its member's grade if that is known
pub fn expected_material(index: &ModelIndex, plate: &Plate) -> Option<String> {
    let member = index.primary_member(plate)?;
    let grade = steel_grade(&member.grade).map(|grade| grade.name.to_string());
    Some(grade.unwrap_or_else(|| index.config.default_steel_grade.clone()))
}

pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let config = index.config;
    let mut clashes = Vec::new();
    for plate in index.valid_plates() {
        let bolts = index.bolts_on(&plate.id);
        if let Some(diameter) = index.fastener_diameter(plate) {
            let least = min_plate_thickness(diameter);
            if plate.thickness + SLACK < least {
                clashes.push(
                    Clash::new(ClashCategory::PlateThicknessInsufficient, &plate.id)
                        .observed(plate.thickness, Expectation::AtLeast { value: least })
                        .at(plate.position)
                        .message(format!(
                            "plate {} is {:.0} mm thick for {diameter:.0} mm fasteners",
                            plate.id, plate.thickness
                        )),
                );
            } else if !bolts.is_empty() {
                // bearing only matters once the plate meets its geometric minimum
                let demand = index.plate_demand(plate).per(bolts.len());
                let steel = steel_grade_or(&plate.material, &config.default_steel_grade);
                let capacity = bearing_capacity(diameter, plate.thickness, steel);
                if capacity < demand {
                    clashes.push(
                        Clash::new(ClashCategory::BoltBearingInsufficient, &plate.id)
                            .observed(*capacity, Expectation::AtLeast { value: *demand })
                            .confidence(0.9)
                            .at(plate.position)
                            .message(format!(
                                "plate {} bears {capacity} per bolt against {demand}",
                                plate.id
                            )),
                    );
                }
            }
        }

        let demand = index.plate_demand(plate).per(bolts.len());
        for bolt in bolts {
            let required = standard_minimum(&SizingRequest::new(
                SizedQuantity::BoltDiameter,
                &bolt.grade,
                demand,
                plate.category,
            ));
            if bolt.diameter + SLACK < required {
                clashes.push(
                    Clash::new(ClashCategory::BoltUndersized, &bolt.id)
                        .with(&plate.id)
                        .observed(bolt.diameter, Expectation::AtLeast { value: required })
                        .confidence(0.9)
                        .at(bolt.position)
                        .message(format!(
                            "bolt {} is M{:.0}, {demand} needs {required:.1} mm",
                            bolt.id, bolt.diameter
                        )),
                );
            }
        }

        if let Some(expected) = expected_material(index, plate) {
            if !plate.material.trim().eq_ignore_ascii_case(&expected) {
                clashes.push(
                    Clash::new(ClashCategory::MaterialMismatch, &plate.id)
                        .confidence(0.95)
                        .at(plate.position)
                        .message(format!("plate {} is {}, its member is {expected}", plate.id, plate.material)),
                );
            }
        }

        let prevailing = prevailing_bolt_grade(bolts, &config.default_bolt_grade);
        for bolt in bolts.iter().filter(|bolt| bolt.grade.trim() != prevailing) {
            clashes.push(
                Clash::new(ClashCategory::BoltGradeMismatch, &bolt.id)
                    .with(&plate.id)
                    .confidence(0.95)
                    .at(bolt.position)
                    .message(format!(
                        "bolt {} is grade {}, plate {} uses {prevailing}",
                        bolt.id, bolt.grade, plate.id
                    )),
            );
        }
    }
    clashes
}
