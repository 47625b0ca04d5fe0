/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::standards::sizing::SizingRequest;

/// A size estimated by an external model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub value: f64,
    pub confidence: f64,
}

/// Why a prediction was not used. The standards tables take over in every case.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Unavailable {
    #[error("no prediction service configured")]
    Disabled,
    #[error("prediction timed out after {0:?}")]
    Timeout(Duration),
    #[error("prediction skipped, an earlier call is still running")]
    Busy,
    #[error("prediction service failed: {0}")]
    Service(String),
    #[error("prediction confidence {confidence:.2} below {threshold:.2}")]
    LowConfidence { confidence: f64, threshold: f64 },
    #[error("predicted value {value} is not a standard size")]
    OutOfBounds { value: f64 },
    #[error("predicted value {value} is below the standards minimum {minimum}")]
    BelowMinimum { value: f64, minimum: f64 },
}

/// Optional sizing collaborator. Implementations may block; callers bound them with a timeout.
pub trait Predictor: Send + Sync {
    fn predict(&self, request: &SizingRequest) -> Result<Prediction, Unavailable>;
}

impl<F> Predictor for F
where
    F: Fn(&SizingRequest) -> Result<Prediction, Unavailable> + Send + Sync,
{
    fn predict(&self, request: &SizingRequest) -> Result<Prediction, Unavailable> {
        self(request)
    }
}
