/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::path::PathBuf;

use thiserror::Error;

use crate::clash::ClashCategory;
use crate::connection::ConnectionCategory;

/// Input that cannot be processed at all. Raised before any stage runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("structural model contains no members")]
    NoMembers,
    #[error("member id {0:?} appears more than once")]
    DuplicateMember(String),
    #[error("could not read structural model: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config value {field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// A member whose local frame cannot be built. The member is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("member {member} has zero length")]
    ZeroLength { member: String },
    #[error("member {member} has a non-finite coordinate")]
    NonFinite { member: String },
}

/// A joint that cannot receive connection hardware. The joint is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisFailure {
    #[error("joint {joint} has {found} resolvable member(s), {required} required")]
    InsufficientMembers {
        joint: String,
        found: usize,
        required: usize,
    },
    #[error("joint {joint} has a non-finite position")]
    InvalidJoint { joint: String },
}

/// Classification fell back to the shear default.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("joint {joint} looked like {best_guess} with confidence {confidence:.2}, classified as shear")]
pub struct ClassificationAmbiguous {
    pub joint: String,
    pub best_guess: ConnectionCategory,
    pub confidence: f64,
}

/// Why a clash was not corrected automatically
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionFailure {
    #[error("{0} cannot be corrected automatically")]
    NotCorrectable(ClashCategory),
    #[error("element {0} no longer exists")]
    MissingElement(String),
    #[error("{0}")]
    Infeasible(String),
}

impl CorrectionFailure {
    /// Missing elements mean the correction failed, everything else goes to a human
    pub fn needs_review(&self) -> bool {
        !matches!(self, CorrectionFailure::MissingElement(_))
    }
}
