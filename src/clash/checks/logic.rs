/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use crate::clash::{Clash, ClashCategory, ModelIndex};

/// Label for elements whose id is missing
const UNNAMED: &str = "<unnamed>";

fn label(id: &str) -> &str {
    if id.is_empty() {
        UNNAMED
    } else {
        id
    }
}

fn invalid(id: &str, kind: &str) -> Clash {
    Clash::new(ClashCategory::InvalidGeometry, label(id))
        .message(format!("{kind} {} is malformed and was left out of every other check", label(id)))
}

/// Malformed, orphaned and floating elements. None of these can be fixed automatically.
pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let model = index.model;
    let mut clashes = Vec::new();
    for member in &model.members {
        if !member.is_well_formed() {
            clashes.push(invalid(&member.id, "member"));
        } else if index.joints_of(&member.id).is_empty() {
            clashes.push(
                Clash::new(ClashCategory::FloatingMember, &member.id)
                    .confidence(0.9)
                    .at(member.start.lerp(member.end, 0.5))
                    .message(format!("member {} connects to nothing", member.id)),
            );
        }
    }
    for joint in model.joints.iter().filter(|joint| !joint.position.is_finite()) {
        clashes.push(invalid(&joint.id, "joint"));
    }
    for plate in &model.plates {
        if !plate.is_well_formed() {
            clashes.push(invalid(&plate.id, "plate"));
        } else if !plate.members.iter().any(|id| index.member(id).is_some()) {
            clashes.push(
                Clash::new(ClashCategory::OrphanedPlate, &plate.id)
                    .at(plate.position)
                    .message(format!("plate {} serves no known member", plate.id)),
            );
        }
    }
    let orphaned = |parent: &str| index.plate(parent).is_none();
    for bolt in &model.bolts {
        if !bolt.is_well_formed() {
            clashes.push(invalid(&bolt.id, "bolt"));
        } else if orphaned(&bolt.plate) {
            clashes.push(
                Clash::new(ClashCategory::OrphanedBolt, &bolt.id)
                    .at(bolt.position)
                    .message(format!("bolt {} belongs to missing plate {}", bolt.id, bolt.plate)),
            );
        }
    }
    for weld in &model.welds {
        if !weld.is_well_formed() {
            clashes.push(invalid(&weld.id, "weld"));
        } else if orphaned(&weld.plate) {
            clashes.push(
                Clash::new(ClashCategory::OrphanedWeld, &weld.id)
                    .at(weld.position)
                    .message(format!("weld {} belongs to missing plate {}", weld.id, weld.plate)),
            );
        }
    }
    for anchor in &model.anchors {
        if !anchor.is_well_formed() {
            clashes.push(invalid(&anchor.id, "anchor"));
        } else if orphaned(&anchor.plate) {
            clashes.push(
                Clash::new(ClashCategory::OrphanedAnchor, &anchor.id)
                    .at(anchor.position)
                    .message(format!("anchor {} belongs to missing plate {}", anchor.id, anchor.plate)),
            );
        }
    }
    clashes
}
