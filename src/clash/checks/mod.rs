/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! One pure function per clash family. Checks only read the index, so they
//! run in any order and in parallel.

use crate::clash::{Clash, ClashFamily, ModelIndex};

pub mod alignment;
pub mod anchorage;
pub mod base_plate;
pub mod bolt;
pub mod connection;
pub mod geometry;
pub mod logic;
pub mod member;
pub mod properties;
pub mod weld;

pub type Check = fn(&ModelIndex) -> Vec<Clash>;

pub const CHECKS: [(ClashFamily, Check); 10] = [
    (ClashFamily::Geometry, geometry::check),
    (ClashFamily::Alignment, alignment::check),
    (ClashFamily::BasePlate, base_plate::check),
    (ClashFamily::Weld, weld::check),
    (ClashFamily::BoltSpacing, bolt::check),
    (ClashFamily::MemberGeometry, member::check),
    (ClashFamily::ConnectionAlignment, connection::check),
    (ClashFamily::Anchorage, anchorage::check),
    (ClashFamily::Properties, properties::check),
    (ClashFamily::StructuralLogic, logic::check),
];

/// Rule comparisons forgive this much, in mm
pub(crate) const SLACK: f64 = 0.01;

/// Confidence of a rule that depends on a section from the catalog
pub(crate) fn section_confidence(known: bool, confidence: f64) -> f64 {
    if known {
        confidence
    } else {
        confidence * 0.7
    }
}
