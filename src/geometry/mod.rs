/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Recovering topology from bare member lines: member frames, segment
//! distances and joint inference.

pub mod frame;
pub mod joints;
pub mod segment;

pub use frame::LocalFrame;
pub use joints::{intersection_point, resolve, ResolvedGeometry};
