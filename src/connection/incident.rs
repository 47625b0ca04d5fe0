/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::collections::HashMap;

use glam::DVec3;

use crate::geometry::LocalFrame;
use crate::model::{ElementId, Joint, Member, StructuralModel};
use crate::units::Degrees;

/// A member as seen from a joint: pointing away from it
#[derive(Debug, Clone)]
pub struct Ray {
    pub member: ElementId,
    pub direction: DVec3,
    pub frame: LocalFrame,
}

impl Ray {
    /// Angle from the vertical axis, up or down
    pub fn off_vertical(&self) -> Degrees {
        Degrees::from_radians(self.direction.z.abs().clamp(0.0, 1.0).acos())
    }

    pub fn off_horizontal(&self) -> Degrees {
        Degrees::from_radians(self.direction.z.abs().clamp(0.0, 1.0).asin())
    }

    pub fn rises(&self) -> bool {
        self.direction.z > 0.0
    }

    pub fn angle_to(&self, other: &Ray) -> Degrees {
        Degrees::from_radians(self.direction.dot(other.direction).clamp(-1.0, 1.0).acos())
    }
}

/// The members meeting at a joint, resolved against the model
#[derive(Debug, Clone)]
pub struct JointIncident {
    pub joint: ElementId,
    pub position: DVec3,
    rays: Vec<Ray>,
}

impl JointIncident {
    pub fn new(joint: &Joint, model: &StructuralModel, frames: &HashMap<ElementId, LocalFrame>) -> Self {
        let rays = joint
            .members
            .iter()
            .filter_map(|id| {
                let member = model.member(id)?;
                let frame = *frames.get(id)?;
                Self::ray(member, frame, joint.position)
            })
            .collect();
        Self {
            joint: joint.id.clone(),
            position: joint.position,
            rays,
        }
    }

    fn ray(member: &Member, frame: LocalFrame, position: DVec3) -> Option<Ray> {
        let direction = (member.far_end(position) - member.nearest_end(position)).try_normalize()?;
        Some(Ray {
            member: member.id.clone(),
            direction,
            frame,
        })
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    pub fn verticals(&self, tolerance: Degrees) -> Vec<&Ray> {
        self.rays
            .iter()
            .filter(|ray| *ray.off_vertical() <= *tolerance)
            .collect()
    }

    pub fn horizontals(&self, tolerance: Degrees) -> Vec<&Ray> {
        self.rays
            .iter()
            .filter(|ray| *ray.off_horizontal() <= *tolerance)
            .collect()
    }
}
