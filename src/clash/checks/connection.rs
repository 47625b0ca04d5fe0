/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::DVec3;

use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::connection::ConnectionCategory;
use crate::model::Member;
use crate::units::{Kilonewtons, Millimeters};

/// Members meeting at a joint should share one working point
pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let config = index.config;
    let mut clashes = Vec::new();
    for joint in index.model.joints.iter().filter(|joint| joint.position.is_finite()) {
        let members: Vec<&Member> = joint.members.iter().filter_map(|id| index.usable_member(id)).collect();
        if members.len() < 2 {
            continue;
        }
        let ends: Vec<DVec3> = members.iter().map(|member| member.nearest_end(joint.position)).collect();
        let center = ends.iter().copied().sum::<DVec3>() / ends.len() as f64;
        let eccentricity = ends.iter().map(|end| end.distance(center)).fold(0.0, f64::max);
        if eccentricity > config.eccentricity_tolerance_mm {
            clashes.push(
                Clash::new(ClashCategory::ConnectionEccentricity, &joint.id)
                    .observed(eccentricity, Expectation::AtMost { value: config.eccentricity_tolerance_mm })
                    .confidence(0.8)
                    .at(center)
                    .message(format!("members at joint {} miss each other by {eccentricity:.0} mm", joint.id)),
            );
        }

        let demand = members
            .iter()
            .map(|member| member.demand())
            .fold(Kilonewtons(0.0), |a, b| if b > a { b } else { a });
        let moment = demand * Millimeters(eccentricity);
        if *moment <= config.moment_threshold_knm {
            continue;
        }
        let carried = index.model.plates.iter().any(|plate| {
            plate.category == ConnectionCategory::Moment
                && index.joint_for_plate(plate).is_some_and(|served| served.id == joint.id)
        });
        if !carried {
            clashes.push(
                Clash::new(ClashCategory::UnaccountedMoment, &joint.id)
                    .observed(*moment, Expectation::AtMost { value: config.moment_threshold_knm })
                    .confidence(0.7)
                    .at(center)
                    .message(format!("joint {} develops {moment} that no moment connection carries", joint.id)),
            );
        }
    }
    clashes
}
