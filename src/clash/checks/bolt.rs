/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use itertools::Itertools;

use crate::clash::checks::SLACK;
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::model::{Bolt, Plate};
use crate::standards::tables::{max_edge_distance, max_spacing, min_edge_distance, min_spacing};

/// Distance from a bolt to the nearest plate edge, along each plate axis
pub fn edge_distances(plate: &Plate, bolt: &Bolt) -> (f64, f64) {
    let local = plate.local(bolt.position);
    (plate.width / 2.0 - local.x.abs(), plate.height / 2.0 - local.y.abs())
}

pub fn inside(plate: &Plate, bolt: &Bolt, tolerance: f64) -> bool {
    let local = plate.local(bolt.position);
    local.x.abs() <= plate.width / 2.0
        && local.y.abs() <= plate.height / 2.0
        && local.z.abs() <= plate.thickness / 2.0 + tolerance
}

pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let tolerance = index.config.alignment_tolerance_mm;
    let mut clashes = Vec::new();
    for plate in index.valid_plates() {
        let mut seated: Vec<&Bolt> = Vec::new();
        for &bolt in index.bolts_on(&plate.id) {
            if !inside(plate, bolt, tolerance) {
                clashes.push(
                    Clash::new(ClashCategory::BoltOutsidePlate, &bolt.id)
                        .with(&plate.id)
                        .at(bolt.position)
                        .message(format!("bolt {} is not inside plate {}", bolt.id, plate.id)),
                );
                continue;
            }
            seated.push(bolt);
            let (along_u, along_v) = edge_distances(plate, bolt);
            let edge = along_u.min(along_v);
            let least = min_edge_distance(bolt.diameter);
            let most = max_edge_distance(plate.thickness);
            if edge + SLACK < least {
                clashes.push(
                    Clash::new(ClashCategory::BoltEdgeDistanceTooSmall, &bolt.id)
                        .with(&plate.id)
                        .observed(edge, Expectation::AtLeast { value: least })
                        .at(bolt.position)
                        .message(format!("bolt {} is {edge:.1} mm from the edge, needs {least:.1}", bolt.id)),
                );
            } else if edge > most + SLACK {
                clashes.push(
                    Clash::new(ClashCategory::BoltEdgeDistanceTooLarge, &bolt.id)
                        .with(&plate.id)
                        .observed(edge, Expectation::AtMost { value: most })
                        .confidence(0.9)
                        .at(bolt.position)
                        .message(format!("bolt {} is {edge:.1} mm from every edge", bolt.id)),
                );
            }
        }

        let widest = seated.iter().map(|bolt| bolt.diameter).fold(0.0, f64::max);
        let least = min_spacing(widest);
        for (a, b) in seated.iter().tuple_combinations() {
            let spacing = a.position.distance(b.position);
            if spacing + SLACK < least {
                clashes.push(
                    Clash::new(ClashCategory::BoltSpacingTooSmall, &b.id)
                        .with(&a.id)
                        .observed(spacing, Expectation::AtLeast { value: least })
                        .at(b.position)
                        .message(format!("bolts {} and {} are {spacing:.1} mm apart", a.id, b.id)),
                );
            }
        }

        let most = max_spacing(plate.thickness);
        let mut reported: Vec<(&str, &str)> = Vec::new();
        for bolt in &seated {
            let nearest = seated
                .iter()
                .filter(|other| other.id != bolt.id)
                .map(|other| (other, bolt.position.distance(other.position)))
                .min_by(|x, y| x.1.total_cmp(&y.1));
            let Some((neighbor, spacing)) = nearest else {
                continue;
            };
            let pair = if bolt.id < neighbor.id {
                (bolt.id.as_str(), neighbor.id.as_str())
            } else {
                (neighbor.id.as_str(), bolt.id.as_str())
            };
            if spacing > most + SLACK && !reported.contains(&pair) {
                reported.push(pair);
                clashes.push(
                    Clash::new(ClashCategory::BoltSpacingTooLarge, &bolt.id)
                        .with(&neighbor.id)
                        .observed(spacing, Expectation::AtMost { value: most })
                        .confidence(0.9)
                        .at(bolt.position)
                        .message(format!("bolt {} is {spacing:.0} mm from its nearest neighbor", bolt.id)),
                );
            }
        }
    }
    clashes
}
