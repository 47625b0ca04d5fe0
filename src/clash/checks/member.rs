/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use crate::clash::checks::section_confidence;
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};

pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let config = index.config;
    let vertical = config.vertical_tolerance();
    let mut clashes = Vec::new();
    for member in index.usable_members() {
        let length = member.length();
        let middle = member.start.lerp(member.end, 0.5);
        if length > config.max_span_mm {
            clashes.push(
                Clash::new(ClashCategory::ExcessiveSpan, &member.id)
                    .observed(length, Expectation::AtMost { value: config.max_span_mm })
                    .confidence(0.9)
                    .at(middle)
                    .message(format!("member {} spans {:.1} m", member.id, length / 1000.0)),
            );
        }

        let (section, known) = index.section(member);
        let slenderness = length / section.radius_of_gyration;
        if slenderness > config.slenderness_limit {
            clashes.push(
                Clash::new(ClashCategory::ExcessiveSlenderness, &member.id)
                    .observed(slenderness, Expectation::AtMost { value: config.slenderness_limit })
                    .confidence(section_confidence(known, 0.9))
                    .at(middle)
                    .message(format!(
                        "member {} ({}) has slenderness {slenderness:.0}",
                        member.id, section.name
                    )),
            );
        }

        let standing = index.frame(&member.id).is_some_and(|frame| frame.is_vertical(vertical));
        if standing && length > config.bracing_height_mm {
            let braced = index.joints_of(&member.id).iter().any(|joint| {
                joint
                    .members
                    .iter()
                    .filter(|id| **id != member.id)
                    .filter_map(|id| index.frame(id))
                    .any(|frame| !frame.is_vertical(vertical) && !frame.is_horizontal(vertical))
            });
            if !braced {
                clashes.push(
                    Clash::new(ClashCategory::MissingBracing, &member.id)
                        .observed(length, Expectation::AtMost { value: config.bracing_height_mm })
                        .confidence(0.6)
                        .at(middle)
                        .message(format!(
                            "column {} rises {:.1} m with no diagonal framing into it",
                            member.id,
                            length / 1000.0
                        )),
                );
            }
        }
    }
    clashes
}
