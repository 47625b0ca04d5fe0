/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

pub mod prediction;
pub mod sizing;
pub mod tables;

pub use prediction::{Prediction, Predictor, Unavailable};
pub use sizing::{SizedQuantity, Sizing, SizingRegistry, SizingRequest, SizingStats};
