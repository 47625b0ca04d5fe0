/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use itertools::Itertools;

use crate::clash::checks::section_confidence;
use crate::clash::{Clash, ClashCategory, Expectation, ModelIndex};
use crate::geometry::intersection_point;
use crate::geometry::segment::{closest_endpoints, segment_closest};
use crate::model::{Member, Plate};

/// Closest-point parameters inside this band count as mid-member
const INTERIOR: f64 = 0.02;
/// Overlaps thinner than this are plates touching
const TOUCHING: f64 = 1.0;

pub fn check(index: &ModelIndex) -> Vec<Clash> {
    let mut clashes = Vec::new();
    member_pairs(index, &mut clashes);
    joint_positions(index, &mut clashes);
    plate_pairs(index, &mut clashes);
    penetrations(index, &mut clashes);
    short_members(index, &mut clashes);
    clashes
}

fn member_pairs(index: &ModelIndex, clashes: &mut Vec<Clash>) {
    let config = index.config;
    let members: Vec<&Member> = index.usable_members().collect();
    for (a, b) in members.iter().tuple_combinations() {
        if index.shares_joint(&a.id, &b.id) {
            continue;
        }
        let (_, _, end_gap) = closest_endpoints((a.start, a.end), (b.start, b.end));
        if end_gap < config.joint_tolerance_mm {
            continue;
        }
        let closest = segment_closest(a.start, a.end, b.start, b.end);
        let interior = |p: f64| p > INTERIOR && p < 1.0 - INTERIOR;
        if !interior(closest.s) || !interior(closest.t) {
            continue;
        }
        let (section_a, known_a) = index.section(a);
        let (section_b, known_b) = index.section(b);
        let gap = closest.distance - (section_a.largest_dimension() + section_b.largest_dimension()) / 2.0;
        let location = (a.start.lerp(a.end, closest.s) + b.start.lerp(b.end, closest.t)) / 2.0;
        let known = known_a && known_b;
        if closest.distance < TOUCHING || gap < 0.0 {
            let confidence = if closest.distance < TOUCHING {
                0.95
            } else {
                section_confidence(known, 0.8)
            };
            clashes.push(
                Clash::new(ClashCategory::MemberIntersection, &a.id)
                    .with(&b.id)
                    .observed(gap, Expectation::AtLeast { value: 0.0 })
                    .confidence(confidence)
                    .at(location)
                    .message(format!("{} passes through {}", a.id, b.id)),
            );
        } else if gap < config.clearance_mm {
            clashes.push(
                Clash::new(ClashCategory::InsufficientClearance, &a.id)
                    .with(&b.id)
                    .observed(gap, Expectation::AtLeast { value: config.clearance_mm })
                    .confidence(section_confidence(known, 0.7))
                    .at(location)
                    .message(format!("{} passes {gap:.0} mm from {}", a.id, b.id)),
            );
        }
    }
}

fn joint_positions(index: &ModelIndex, clashes: &mut Vec<Clash>) {
    let tolerance = index.config.joint_tolerance_mm;
    for joint in index.model.joints.iter().filter(|joint| joint.position.is_finite()) {
        let members = joint.members.iter().filter_map(|id| index.usable_member(id));
        let Some(expected) = intersection_point(members, joint.position) else {
            continue;
        };
        let distance = joint.position.distance(expected);
        if distance > tolerance {
            clashes.push(
                Clash::new(ClashCategory::JointPositionMismatch, &joint.id)
                    .observed(distance, Expectation::AtMost { value: tolerance })
                    .confidence(0.95)
                    .at(joint.position)
                    .message(format!("joint {} is {distance:.0} mm from where its members meet", joint.id)),
            );
        }
    }
}

/// How far a plate sits from the joint it serves
fn displacement(index: &ModelIndex, plate: &Plate) -> f64 {
    index
        .joint_for_plate(plate)
        .map(|joint| plate.position.distance(joint.position))
        .unwrap_or(0.0)
}

/// Whether `other` reaches into the slab of `plate`, measured in `plate`'s own axes
fn reaches_into(plate: &Plate, other: &Plate) -> bool {
    let corners = other.corners().map(|corner| plate.local(corner));
    let low = corners.iter().copied().reduce(|a, b| a.min(b));
    let high = corners.iter().copied().reduce(|a, b| a.max(b));
    let (Some(low), Some(high)) = (low, high) else {
        return false;
    };
    let skin = other.thickness / 2.0;
    let overlap = |lo: f64, hi: f64, half: f64| hi.min(half) - lo.max(-half);
    overlap(low.x, high.x, plate.width / 2.0) > TOUCHING
        && overlap(low.y, high.y, plate.height / 2.0) > TOUCHING
        && overlap(low.z - skin, high.z + skin, plate.thickness / 2.0) > 0.0
}

fn plate_pairs(index: &ModelIndex, clashes: &mut Vec<Clash>) {
    let plates: Vec<&Plate> = index.valid_plates().collect();
    for (a, b) in plates.iter().tuple_combinations() {
        if !(reaches_into(a, b) && reaches_into(b, a)) {
            continue;
        }
        // the plate further from its joint is the one to move
        let (moved, other) = if displacement(index, a) > displacement(index, b) {
            (a, b)
        } else {
            (b, a)
        };
        clashes.push(
            Clash::new(ClashCategory::PlateOverlap, &moved.id)
                .with(&other.id)
                .observed(moved.position.distance(other.position), Expectation::None)
                .confidence(0.95)
                .at(moved.position)
                .message(format!("plate {} overlaps plate {}", moved.id, other.id)),
        );
    }
}

fn penetrations(index: &ModelIndex, clashes: &mut Vec<Clash>) {
    for plate in index.valid_plates() {
        let normal = plate.normal();
        for member in index.usable_members() {
            if plate.members.contains(&member.id) {
                continue;
            }
            let da = (member.start - plate.position).dot(normal);
            let db = (member.end - plate.position).dot(normal);
            if da * db >= 0.0 {
                continue;
            }
            let crossing = member.start.lerp(member.end, da / (da - db));
            let local = plate.local(crossing);
            if local.x.abs() < plate.width / 2.0 - TOUCHING && local.y.abs() < plate.height / 2.0 - TOUCHING {
                clashes.push(
                    Clash::new(ClashCategory::PlatePenetration, &plate.id)
                        .with(&member.id)
                        .confidence(0.85)
                        .at(crossing)
                        .message(format!("member {} passes through plate {}", member.id, plate.id)),
                );
            }
        }
    }
}

fn short_members(index: &ModelIndex, clashes: &mut Vec<Clash>) {
    let minimum = index.config.min_member_length_mm;
    for member in index.usable_members() {
        let length = member.length();
        if length < minimum {
            clashes.push(
                Clash::new(ClashCategory::SpanAnomaly, &member.id)
                    .observed(length, Expectation::AtLeast { value: minimum })
                    .confidence(0.6)
                    .at(member.start.lerp(member.end, 0.5))
                    .message(format!("member {} is only {length:.0} mm long", member.id)),
            );
        }
    }
}
