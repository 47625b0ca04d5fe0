/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::geometry::joints::member_frames;
use crate::geometry::LocalFrame;
use crate::model::section::Section;
use crate::model::{Anchor, Bolt, ElementId, Joint, Member, Plate, StructuralModel, Weld};
use crate::units::Kilonewtons;

/// Read-only lookups over one snapshot of the model, shared by every check in a pass.
/// Hardware lists only hold well formed elements.
pub struct ModelIndex<'a> {
    pub model: &'a StructuralModel,
    pub config: &'a EngineConfig,
    pub base_elevation: f64,
    members: HashMap<&'a str, &'a Member>,
    sections: HashMap<&'a str, (Section, bool)>,
    plates: HashMap<&'a str, &'a Plate>,
    frames: HashMap<ElementId, LocalFrame>,
    bolts: HashMap<&'a str, Vec<&'a Bolt>>,
    welds: HashMap<&'a str, Vec<&'a Weld>>,
    anchors: HashMap<&'a str, Vec<&'a Anchor>>,
    joints_of: HashMap<&'a str, Vec<&'a Joint>>,
}

impl<'a> ModelIndex<'a> {
    pub fn new(model: &'a StructuralModel, config: &'a EngineConfig) -> Self {
        let (frames, _) = member_frames(&model.members);
        let mut bolts: HashMap<&str, Vec<&Bolt>> = HashMap::new();
        for bolt in model.bolts.iter().filter(|bolt| bolt.is_well_formed()) {
            bolts.entry(bolt.plate.as_str()).or_default().push(bolt);
        }
        let mut welds: HashMap<&str, Vec<&Weld>> = HashMap::new();
        for weld in model.welds.iter().filter(|weld| weld.is_well_formed()) {
            welds.entry(weld.plate.as_str()).or_default().push(weld);
        }
        let mut anchors: HashMap<&str, Vec<&Anchor>> = HashMap::new();
        for anchor in model.anchors.iter().filter(|anchor| anchor.is_well_formed()) {
            anchors.entry(anchor.plate.as_str()).or_default().push(anchor);
        }
        let mut joints_of: HashMap<&str, Vec<&Joint>> = HashMap::new();
        for joint in &model.joints {
            for member in &joint.members {
                joints_of.entry(member.as_str()).or_default().push(joint);
            }
        }
        Self {
            model,
            config,
            base_elevation: model.base_elevation(),
            members: model.members.iter().map(|m| (m.id.as_str(), m)).collect(),
            sections: model
                .members
                .iter()
                .map(|m| (m.id.as_str(), Section::resolve(&m.section)))
                .collect(),
            plates: model.plates.iter().map(|p| (p.id.as_str(), p)).collect(),
            frames,
            bolts,
            welds,
            anchors,
            joints_of,
        }
    }

    pub fn member(&self, id: &str) -> Option<&'a Member> {
        self.members.get(id).copied()
    }

    /// A member that exists and has a usable frame
    pub fn usable_member(&self, id: &str) -> Option<&'a Member> {
        self.member(id).filter(|member| self.frames.contains_key(&member.id))
    }

    pub fn usable_members(&self) -> impl Iterator<Item = &'a Member> + '_ {
        self.model
            .members
            .iter()
            .filter(|member| self.frames.contains_key(&member.id))
    }

    pub fn frame(&self, member_id: &str) -> Option<&LocalFrame> {
        self.frames.get(member_id)
    }

    pub fn plate(&self, id: &str) -> Option<&'a Plate> {
        self.plates.get(id).copied()
    }

    pub fn valid_plates(&self) -> impl Iterator<Item = &'a Plate> + 'a {
        self.model.plates.iter().filter(|plate| plate.is_well_formed())
    }

    pub fn bolts_on(&self, plate_id: &str) -> &[&'a Bolt] {
        self.bolts.get(plate_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn welds_on(&self, plate_id: &str) -> &[&'a Weld] {
        self.welds.get(plate_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn anchors_on(&self, plate_id: &str) -> &[&'a Anchor] {
        self.anchors.get(plate_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn joints_of(&self, member_id: &str) -> &[&'a Joint] {
        self.joints_of.get(member_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn shares_joint(&self, a: &str, b: &str) -> bool {
        self.joints_of(a).iter().any(|joint| joint.has_member(b))
    }

    /// The joint a plate serves, if it has a usable position
    pub fn joint_for_plate(&self, plate: &Plate) -> Option<&'a Joint> {
        self.model
            .joint_for_plate(plate)
            .filter(|joint| joint.position.is_finite())
    }

    pub fn primary_member(&self, plate: &Plate) -> Option<&'a Member> {
        plate.members.iter().find_map(|id| self.usable_member(id))
    }

    /// Section of a member and whether it came from the catalog
    pub fn section(&self, member: &Member) -> (Section, bool) {
        self.sections
            .get(member.id.as_str())
            .copied()
            .unwrap_or_else(|| Section::resolve(&member.section))
    }

    pub fn plate_demand(&self, plate: &Plate) -> Kilonewtons {
        self.model.plate_demand(plate)
    }

    /// Demand per bolt or anchor on a plate
    pub fn fastener_demand(&self, plate: &Plate) -> Kilonewtons {
        let fasteners = self.bolts_on(&plate.id).len() + self.anchors_on(&plate.id).len();
        self.plate_demand(plate).per(fasteners)
    }

    /// Largest bolt or anchor diameter on a plate
    pub fn fastener_diameter(&self, plate: &Plate) -> Option<f64> {
        self.bolts_on(&plate.id)
            .iter()
            .map(|bolt| bolt.diameter)
            .chain(self.anchors_on(&plate.id).iter().map(|anchor| anchor.diameter))
            .max_by(f64::total_cmp)
    }
}
