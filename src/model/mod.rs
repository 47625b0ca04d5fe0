/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! The structural model: members supplied from upstream, plus the joints and
//! connection hardware this crate derives and corrects.

use std::collections::{BTreeSet, HashSet};

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionCategory;
use crate::error::ModelError;
use crate::units::Kilonewtons;

pub mod section;

pub type ElementId = String;

const AXIS_EPSILON: f64 = 1e-9;

fn default_grade() -> String {
    "S355".to_string()
}

fn full_confidence() -> f64 {
    1.0
}

fn axis_u() -> DVec3 {
    DVec3::X
}

fn axis_v() -> DVec3 {
    DVec3::Y
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: ElementId,
    pub start: DVec3,
    pub end: DVec3,
    /// Cross-section reference, see [`section::Section::lookup`]
    pub section: String,
    #[serde(default = "default_grade")]
    pub grade: String,
    /// Design force delivered to the member's connections, computed upstream
    #[serde(default)]
    pub design_load_kn: f64,
}

impl Member {
    pub fn new(id: &str, start: DVec3, end: DVec3, section: &str) -> Self {
        Self {
            id: id.to_string(),
            start,
            end,
            section: section.to_string(),
            grade: default_grade(),
            design_load_kn: 0.0,
        }
    }

    pub fn with_load(mut self, design_load_kn: f64) -> Self {
        self.design_load_kn = design_load_kn;
        self
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && self.is_finite() && self.length() > AXIS_EPSILON
    }

    pub fn lowest_elevation(&self) -> f64 {
        self.start.z.min(self.end.z)
    }

    pub fn highest_elevation(&self) -> f64 {
        self.start.z.max(self.end.z)
    }

    pub fn nearest_end(&self, point: DVec3) -> DVec3 {
        if self.start.distance_squared(point) <= self.end.distance_squared(point) {
            self.start
        } else {
            self.end
        }
    }

    pub fn far_end(&self, point: DVec3) -> DVec3 {
        if self.start.distance_squared(point) <= self.end.distance_squared(point) {
            self.end
        } else {
            self.start
        }
    }

    pub fn demand(&self) -> Kilonewtons {
        Kilonewtons(self.design_load_kn.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub id: ElementId,
    pub position: DVec3,
    pub members: Vec<ElementId>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

impl Joint {
    pub fn has_member(&self, member_id: &str) -> bool {
        self.members.iter().any(|id| id == member_id)
    }

    pub fn member_set(&self) -> BTreeSet<&str> {
        self.members.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub id: ElementId,
    pub position: DVec3,
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
    pub material: String,
    pub members: Vec<ElementId>,
    #[serde(default)]
    pub joint: Option<ElementId>,
    #[serde(default)]
    pub category: ConnectionCategory,
    /// In-plane axis along the width
    #[serde(default = "axis_u")]
    pub axis_u: DVec3,
    /// In-plane axis along the height
    #[serde(default = "axis_v")]
    pub axis_v: DVec3,
}

impl Plate {
    pub fn u(&self) -> DVec3 {
        self.axis_u.normalize_or_zero()
    }

    pub fn v(&self) -> DVec3 {
        self.axis_v.normalize_or_zero()
    }

    pub fn normal(&self) -> DVec3 {
        self.axis_u.cross(self.axis_v).normalize_or_zero()
    }

    /// Coordinates of a global point along (u, v, normal), relative to the plate center
    pub fn local(&self, point: DVec3) -> DVec3 {
        let relative = point - self.position;
        DVec3::new(
            relative.dot(self.u()),
            relative.dot(self.v()),
            relative.dot(self.normal()),
        )
    }

    pub fn global(&self, local: DVec3) -> DVec3 {
        self.position + self.u() * local.x + self.v() * local.y + self.normal() * local.z
    }

    pub fn corners(&self) -> [DVec3; 4] {
        let (w, h) = (self.width / 2.0, self.height / 2.0);
        [
            self.global(DVec3::new(-w, -h, 0.0)),
            self.global(DVec3::new(w, -h, 0.0)),
            self.global(DVec3::new(w, h, 0.0)),
            self.global(DVec3::new(-w, h, 0.0)),
        ]
    }

    pub fn is_well_formed(&self) -> bool {
        let dimensions = [self.width, self.height, self.thickness];
        !self.id.is_empty()
            && self.position.is_finite()
            && dimensions.iter().all(|d| d.is_finite() && *d > 0.0)
            && self.axis_u.is_finite()
            && self.axis_v.is_finite()
            && self.axis_u.cross(self.axis_v).length() > AXIS_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bolt {
    pub id: ElementId,
    pub position: DVec3,
    pub diameter: f64,
    pub grade: String,
    pub plate: ElementId,
}

impl Bolt {
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
            && self.position.is_finite()
            && self.diameter.is_finite()
            && self.diameter > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeldKind {
    #[default]
    Fillet,
    CompletePenetration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weld {
    pub id: ElementId,
    /// Midpoint of the weld run
    pub position: DVec3,
    pub size: f64,
    pub length: f64,
    #[serde(default)]
    pub kind: WeldKind,
    pub material: String,
    pub plate: ElementId,
}

impl Weld {
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
            && self.position.is_finite()
            && [self.size, self.length]
                .iter()
                .all(|d| d.is_finite() && *d > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: ElementId,
    /// Top of the anchor, where it passes through the base plate
    pub position: DVec3,
    pub diameter: f64,
    pub embedment: f64,
    pub grade: String,
    pub plate: ElementId,
}

impl Anchor {
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
            && self.position.is_finite()
            && [self.diameter, self.embedment]
                .iter()
                .all(|d| d.is_finite() && *d > 0.0)
    }
}

/// Plan extents of the footing in global X/Y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub min: DVec2,
    pub max: DVec2,
}

impl Footprint {
    pub fn contains(&self, point: DVec2, inset: f64) -> bool {
        point.x >= self.min.x + inset
            && point.x <= self.max.x - inset
            && point.y >= self.min.y + inset
            && point.y <= self.max.y - inset
    }

    /// Nearest point inside the inset footprint. Collapses to the center when the inset is too big.
    pub fn clamp(&self, point: DVec2, inset: f64) -> DVec2 {
        let center = (self.min + self.max) / 2.0;
        let low = (self.min + DVec2::splat(inset)).min(center);
        let high = (self.max - DVec2::splat(inset)).max(center);
        point.clamp(low, high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    pub elevation: f64,
    pub footprint: Footprint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralModel {
    pub members: Vec<Member>,
    #[serde(default)]
    pub joints: Vec<Joint>,
    #[serde(default)]
    pub plates: Vec<Plate>,
    #[serde(default)]
    pub bolts: Vec<Bolt>,
    #[serde(default)]
    pub welds: Vec<Weld>,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    #[serde(default)]
    pub foundation: Option<Foundation>,
}

impl StructuralModel {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            joints: Vec::new(),
            plates: Vec::new(),
            bolts: Vec::new(),
            welds: Vec::new(),
            anchors: Vec::new(),
            foundation: None,
        }
    }

    pub fn with_foundation(mut self, foundation: Foundation) -> Self {
        self.foundation = Some(foundation);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: StructuralModel =
            serde_json::from_str(json).map_err(|error| ModelError::Parse(error.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// The only checks that abort a run. Everything else becomes a clash.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.members.is_empty() {
            return Err(ModelError::NoMembers);
        }
        let mut seen = HashSet::new();
        for member in &self.members {
            if !seen.insert(member.id.as_str()) {
                return Err(ModelError::DuplicateMember(member.id.clone()));
            }
        }
        Ok(())
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn joint(&self, id: &str) -> Option<&Joint> {
        self.joints.iter().find(|joint| joint.id == id)
    }

    pub fn joint_mut(&mut self, id: &str) -> Option<&mut Joint> {
        self.joints.iter_mut().find(|joint| joint.id == id)
    }

    pub fn plate(&self, id: &str) -> Option<&Plate> {
        self.plates.iter().find(|plate| plate.id == id)
    }

    pub fn plate_mut(&mut self, id: &str) -> Option<&mut Plate> {
        self.plates.iter_mut().find(|plate| plate.id == id)
    }

    pub fn bolt_mut(&mut self, id: &str) -> Option<&mut Bolt> {
        self.bolts.iter_mut().find(|bolt| bolt.id == id)
    }

    pub fn weld_mut(&mut self, id: &str) -> Option<&mut Weld> {
        self.welds.iter_mut().find(|weld| weld.id == id)
    }

    pub fn anchor_mut(&mut self, id: &str) -> Option<&mut Anchor> {
        self.anchors.iter_mut().find(|anchor| anchor.id == id)
    }

    pub fn bolts_on<'a>(&'a self, plate_id: &'a str) -> impl Iterator<Item = &'a Bolt> + 'a {
        self.bolts.iter().filter(move |bolt| bolt.plate == plate_id)
    }

    pub fn welds_on<'a>(&'a self, plate_id: &'a str) -> impl Iterator<Item = &'a Weld> + 'a {
        self.welds.iter().filter(move |weld| weld.plate == plate_id)
    }

    pub fn anchors_on<'a>(&'a self, plate_id: &'a str) -> impl Iterator<Item = &'a Anchor> + 'a {
        self.anchors.iter().filter(move |anchor| anchor.plate == plate_id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.members.iter().any(|e| e.id == id)
            || self.joints.iter().any(|e| e.id == id)
            || self.plates.iter().any(|e| e.id == id)
            || self.bolts.iter().any(|e| e.id == id)
            || self.welds.iter().any(|e| e.id == id)
            || self.anchors.iter().any(|e| e.id == id)
    }

    pub fn lowest_elevation(&self) -> Option<f64> {
        self.members
            .iter()
            .filter(|member| member.is_finite())
            .map(Member::lowest_elevation)
            .min_by(f64::total_cmp)
    }

    pub fn highest_elevation(&self) -> Option<f64> {
        self.members
            .iter()
            .filter(|member| member.is_finite())
            .map(Member::highest_elevation)
            .max_by(f64::total_cmp)
    }

    /// Where base plates belong: the foundation, or the bottom of the structure without one
    pub fn base_elevation(&self) -> f64 {
        match self.foundation {
            Some(foundation) => foundation.elevation,
            None => self.lowest_elevation().unwrap_or(0.0),
        }
    }

    /// The joint a plate serves: named explicitly, or the joint with exactly its members
    pub fn joint_for_plate(&self, plate: &Plate) -> Option<&Joint> {
        if let Some(joint_id) = &plate.joint {
            if let Some(joint) = self.joint(joint_id) {
                return Some(joint);
            }
        }
        let wanted: BTreeSet<&str> = plate.members.iter().map(String::as_str).collect();
        self.joints.iter().find(|joint| joint.member_set() == wanted)
    }

    /// Plates tied to a joint by id, or by connecting exactly its members
    pub fn plates_serving<'a>(&'a self, joint: &'a Joint) -> impl Iterator<Item = &'a Plate> + 'a {
        let members = joint.member_set();
        self.plates.iter().filter(move |plate| match &plate.joint {
            Some(id) => *id == joint.id,
            None => plate.members.iter().map(String::as_str).collect::<BTreeSet<_>>() == members,
        })
    }

    /// First resolvable, well formed member of a plate. Synthesized plates list it first.
    pub fn primary_member(&self, plate: &Plate) -> Option<&Member> {
        plate
            .members
            .iter()
            .filter_map(|id| self.member(id))
            .find(|member| member.is_well_formed())
    }

    pub fn plate_demand(&self, plate: &Plate) -> Kilonewtons {
        plate
            .members
            .iter()
            .filter_map(|id| self.member(id))
            .map(Member::demand)
            .fold(Kilonewtons(0.0), |a, b| if b > a { b } else { a })
    }

    pub fn hardware_ids(&self, plate_id: &str) -> Vec<ElementId> {
        self.bolts_on(plate_id)
            .map(|bolt| bolt.id.clone())
            .chain(self.welds_on(plate_id).map(|weld| weld.id.clone()))
            .chain(self.anchors_on(plate_id).map(|anchor| anchor.id.clone()))
            .collect()
    }

    /// Move a plate together with everything fastened to it
    pub fn translate_plate(&mut self, plate_id: &str, delta: DVec3) -> Vec<ElementId> {
        let mut touched = vec![plate_id.to_string()];
        if let Some(plate) = self.plate_mut(plate_id) {
            plate.position += delta;
        }
        for bolt in self.bolts.iter_mut().filter(|b| b.plate == plate_id) {
            bolt.position += delta;
            touched.push(bolt.id.clone());
        }
        for weld in self.welds.iter_mut().filter(|w| w.plate == plate_id) {
            weld.position += delta;
            touched.push(weld.id.clone());
        }
        for anchor in self.anchors.iter_mut().filter(|a| a.plate == plate_id) {
            anchor.position += delta;
            touched.push(anchor.id.clone());
        }
        touched
    }

    /// An id not yet used by any element, derived from the wanted one
    pub fn unused_id(&self, wanted: &str) -> ElementId {
        if !self.contains_id(wanted) {
            return wanted.to_string();
        }
        (2..)
            .map(|n| format!("{wanted}#{n}"))
            .find(|candidate| !self.contains_id(candidate))
            .unwrap_or_else(|| wanted.to_string())
    }
}
