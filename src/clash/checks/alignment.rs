/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::DVec2;

use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::connection::ConnectionCategory;
use crate::units::Degrees;

/// Plates against the joint they serve and the member they hang off
pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let config = index.config;
    let mut clashes = Vec::new();
    for plate in index.valid_plates() {
        let Some(joint) = index.joint_for_plate(plate) else {
            continue;
        };
        let delta = plate.position - joint.position;
        let offset = DVec2::new(delta.x, delta.y).length();
        if offset > config.alignment_tolerance_mm {
            clashes.push(
                Clash::new(ClashCategory::PlateOffset, &plate.id)
                    .with(&joint.id)
                    .observed(offset, Expectation::AtMost { value: config.alignment_tolerance_mm })
                    .confidence(0.95)
                    .at(plate.position)
                    .message(format!("plate {} is {offset:.0} mm off joint {} in plan", plate.id, joint.id)),
            );
        }
        // base plates answer to the foundation, not to their joint
        if plate.category != ConnectionCategory::BasePlate && delta.z.abs() > config.elevation_tolerance_mm {
            clashes.push(
                Clash::new(ClashCategory::PlateElevationMismatch, &plate.id)
                    .with(&joint.id)
                    .observed(plate.position.z, Expectation::Exactly { value: joint.position.z })
                    .confidence(1.0)
                    .at(plate.position)
                    .message(format!(
                        "plate {} sits at elevation {:.0}, joint {} at {:.0}",
                        plate.id, plate.position.z, joint.id, joint.position.z
                    )),
            );
        }
        let Some(frame) = index.primary_member(plate).and_then(|member| index.frame(&member.id)) else {
            continue;
        };
        let cosine = plate.normal().dot(frame.x).abs().clamp(0.0, 1.0);
        let rotation = Degrees::from_radians(cosine.acos());
        if *rotation > config.rotation_tolerance_deg {
            clashes.push(
                Clash::new(ClashCategory::PlateRotation, &plate.id)
                    .observed(*rotation, Expectation::AtMost { value: config.rotation_tolerance_deg })
                    .confidence(0.9)
                    .at(plate.position)
                    .message(format!("plate {} is turned {rotation} from its member axis", plate.id)),
            );
        }
    }
    clashes
}
