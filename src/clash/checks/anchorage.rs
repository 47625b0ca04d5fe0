/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use glam::DVec2;
use itertools::Itertools;

use crate::clash::checks::SLACK;
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::connection::ConnectionCategory;
use crate::standards::tables::{min_anchor_spacing, min_embedment};

pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let cover = index.config.anchor_edge_cover_mm;
    let mut clashes = Vec::new();
    for plate in index.valid_plates() {
        let anchors = index.anchors_on(&plate.id);
        if anchors.is_empty() {
            if plate.category == ConnectionCategory::BasePlate {
                clashes.push(
                    Clash::new(ClashCategory::AnchorMissing, &plate.id)
                        .observed(0.0, Expectation::AtLeast { value: 4.0 })
                        .at(plate.position)
                        .message(format!("base plate {} has no anchors", plate.id)),
                );
            }
            continue;
        }
        for anchor in anchors {
            if let Some(foundation) = &index.model.foundation {
                let plan = DVec2::new(anchor.position.x, anchor.position.y);
                if !foundation.footprint.contains(plan, cover) {
                    clashes.push(
                        Clash::new(ClashCategory::AnchorOutsideFooting, &anchor.id)
                            .with(&plate.id)
                            .at(anchor.position)
                            .message(format!(
                                "anchor {} at ({:.0}, {:.0}) lacks {cover:.0} mm cover in the footing",
                                anchor.id, plan.x, plan.y
                            )),
                    );
                }
            }
            let least = min_embedment(anchor.diameter);
            if anchor.embedment + SLACK < least {
                clashes.push(
                    Clash::new(ClashCategory::AnchorEmbedmentInsufficient, &anchor.id)
                        .observed(anchor.embedment, Expectation::AtLeast { value: least })
                        .at(anchor.position)
                        .message(format!(
                            "anchor {} is embedded {:.0} mm, needs {least:.0}",
                            anchor.id, anchor.embedment
                        )),
                );
            }
        }
        let widest = anchors.iter().map(|anchor| anchor.diameter).fold(0.0, f64::max);
        let least = min_anchor_spacing(widest);
        for (a, b) in anchors.iter().tuple_combinations() {
            let spacing = a.position.distance(b.position);
            if spacing + SLACK < least {
                clashes.push(
                    Clash::new(ClashCategory::AnchorSpacingTooSmall, &b.id)
                        .with(&a.id)
                        .observed(spacing, Expectation::AtLeast { value: least })
                        .at(b.position)
                        .message(format!("anchors {} and {} are {spacing:.0} mm apart", a.id, b.id)),
                );
            }
        }
    }
    clashes
}
