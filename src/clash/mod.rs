/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! The closed clash taxonomy. Severity and remedy are properties of the
//! category, so they cannot drift between passes.

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::model::ElementId;

pub mod checks;
pub mod detector;
pub mod index;

pub use detector::{ClashDetector, Detection};
pub use index::ModelIndex;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl Severity {
    /// Critical and major clashes stand in the way of convergence
    pub fn is_blocking(&self) -> bool {
        *self >= Severity::Major
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClashFamily {
    Geometry,
    Alignment,
    BasePlate,
    Weld,
    BoltSpacing,
    MemberGeometry,
    ConnectionAlignment,
    Anchorage,
    Properties,
    StructuralLogic,
}

/// How a category gets fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Remedy {
    Reposition,
    Resize,
    Realign,
    Shift,
    Regenerate,
    Respecify,
    Review,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClashCategory {
    MemberIntersection,
    JointPositionMismatch,
    PlateOverlap,
    PlatePenetration,
    InsufficientClearance,
    SpanAnomaly,

    PlateOffset,
    PlateRotation,
    PlateElevationMismatch,

    BasePlateWrongElevation,
    BasePlateNegativeCoordinate,
    BasePlateUndersized,
    BasePlateOversized,
    FoundationGap,

    WeldMissing,
    WeldUndersized,
    WeldInsufficientPenetration,
    WeldOffEdge,

    BoltOutsidePlate,
    BoltEdgeDistanceTooSmall,
    BoltEdgeDistanceTooLarge,
    BoltSpacingTooSmall,
    BoltSpacingTooLarge,

    ExcessiveSpan,
    ExcessiveSlenderness,
    MissingBracing,

    ConnectionEccentricity,
    UnaccountedMoment,

    AnchorMissing,
    AnchorOutsideFooting,
    AnchorSpacingTooSmall,
    AnchorEmbedmentInsufficient,

    PlateThicknessInsufficient,
    BoltUndersized,
    BoltBearingInsufficient,
    MaterialMismatch,
    BoltGradeMismatch,

    OrphanedPlate,
    OrphanedBolt,
    OrphanedWeld,
    OrphanedAnchor,
    FloatingMember,
    InvalidGeometry,
}

impl ClashCategory {
    pub fn severity(&self) -> Severity {
        use ClashCategory::*;
        match self {
            MemberIntersection
            | BasePlateWrongElevation
            | BasePlateNegativeCoordinate
            | BoltOutsidePlate
            | AnchorOutsideFooting
            | AnchorEmbedmentInsufficient
            | OrphanedPlate
            | OrphanedBolt
            | OrphanedWeld
            | OrphanedAnchor
            | InvalidGeometry => Severity::Critical,
            JointPositionMismatch
            | PlateOverlap
            | PlateOffset
            | PlateElevationMismatch
            | BasePlateUndersized
            | FoundationGap
            | WeldMissing
            | WeldUndersized
            | WeldInsufficientPenetration
            | BoltEdgeDistanceTooSmall
            | BoltSpacingTooSmall
            | ExcessiveSlenderness
            | AnchorMissing
            | AnchorSpacingTooSmall
            | PlateThicknessInsufficient
            | BoltUndersized
            | BoltBearingInsufficient
            | FloatingMember => Severity::Major,
            PlatePenetration
            | SpanAnomaly
            | PlateRotation
            | WeldOffEdge
            | ExcessiveSpan
            | MissingBracing
            | ConnectionEccentricity
            | UnaccountedMoment
            | MaterialMismatch
            | BoltGradeMismatch => Severity::Moderate,
            InsufficientClearance | BasePlateOversized | BoltEdgeDistanceTooLarge | BoltSpacingTooLarge => {
                Severity::Minor
            }
        }
    }

    pub fn family(&self) -> ClashFamily {
        use ClashCategory::*;
        match self {
            MemberIntersection | JointPositionMismatch | PlateOverlap | PlatePenetration
            | InsufficientClearance | SpanAnomaly => ClashFamily::Geometry,
            PlateOffset | PlateRotation | PlateElevationMismatch => ClashFamily::Alignment,
            BasePlateWrongElevation | BasePlateNegativeCoordinate | BasePlateUndersized
            | BasePlateOversized | FoundationGap => ClashFamily::BasePlate,
            WeldMissing | WeldUndersized | WeldInsufficientPenetration | WeldOffEdge => ClashFamily::Weld,
            BoltOutsidePlate | BoltEdgeDistanceTooSmall | BoltEdgeDistanceTooLarge | BoltSpacingTooSmall
            | BoltSpacingTooLarge => ClashFamily::BoltSpacing,
            ExcessiveSpan | ExcessiveSlenderness | MissingBracing => ClashFamily::MemberGeometry,
            ConnectionEccentricity | UnaccountedMoment => ClashFamily::ConnectionAlignment,
            AnchorMissing | AnchorOutsideFooting | AnchorSpacingTooSmall | AnchorEmbedmentInsufficient => {
                ClashFamily::Anchorage
            }
            PlateThicknessInsufficient | BoltUndersized | BoltBearingInsufficient | MaterialMismatch
            | BoltGradeMismatch => ClashFamily::Properties,
            OrphanedPlate | OrphanedBolt | OrphanedWeld | OrphanedAnchor | FloatingMember
            | InvalidGeometry => ClashFamily::StructuralLogic,
        }
    }

    pub fn remedy(&self) -> Remedy {
        use ClashCategory::*;
        match self {
            JointPositionMismatch | PlateOverlap | PlateOffset | PlateElevationMismatch
            | BasePlateWrongElevation | BasePlateNegativeCoordinate | WeldOffEdge | BoltOutsidePlate => {
                Remedy::Reposition
            }
            PlateRotation => Remedy::Realign,
            BasePlateUndersized | BasePlateOversized | WeldUndersized | WeldInsufficientPenetration
            | AnchorEmbedmentInsufficient | PlateThicknessInsufficient | BoltUndersized
            | BoltBearingInsufficient => Remedy::Resize,
            BoltEdgeDistanceTooSmall | BoltEdgeDistanceTooLarge | BoltSpacingTooSmall
            | BoltSpacingTooLarge | AnchorOutsideFooting | AnchorSpacingTooSmall => Remedy::Shift,
            WeldMissing | AnchorMissing => Remedy::Regenerate,
            MaterialMismatch | BoltGradeMismatch => Remedy::Respecify,
            MemberIntersection | PlatePenetration | InsufficientClearance | SpanAnomaly | FoundationGap
            | ExcessiveSpan | ExcessiveSlenderness | MissingBracing | ConnectionEccentricity
            | UnaccountedMoment | OrphanedPlate | OrphanedBolt | OrphanedWeld | OrphanedAnchor
            | FloatingMember | InvalidGeometry => Remedy::Review,
        }
    }
}

/// What the violated rule asked for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    Exactly { value: f64 },
    AtLeast { value: f64 },
    AtMost { value: f64 },
    Within { min: f64, max: f64 },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clash {
    pub id: String,
    pub category: ClashCategory,
    pub severity: Severity,
    /// The element to correct comes first
    pub elements: Vec<ElementId>,
    pub observed: Option<f64>,
    pub expected: Expectation,
    pub confidence: f64,
    pub location: Option<DVec3>,
    pub message: String,
}

impl Clash {
    pub fn new(category: ClashCategory, element: &str) -> Self {
        Self {
            id: String::new(),
            category,
            severity: category.severity(),
            elements: vec![element.to_string()],
            observed: None,
            expected: Expectation::None,
            confidence: 1.0,
            location: None,
            message: category.to_string(),
        }
    }

    pub fn with(mut self, element: &str) -> Self {
        self.elements.push(element.to_string());
        self
    }

    pub fn observed(mut self, observed: f64, expected: Expectation) -> Self {
        self.observed = Some(observed);
        self.expected = expected;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn at(mut self, location: DVec3) -> Self {
        if location.is_finite() {
            self.location = Some(location);
        }
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn primary(&self) -> &str {
        self.elements.first().map(String::as_str).unwrap_or_default()
    }

    /// Identity across passes
    pub fn key(&self) -> (ClashCategory, ElementId) {
        (self.category, self.primary().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClashSummary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_category: BTreeMap<ClashCategory, usize>,
}

impl ClashSummary {
    pub fn of(clashes: &[Clash]) -> Self {
        let mut summary = ClashSummary {
            total: clashes.len(),
            ..ClashSummary::default()
        };
        for clash in clashes {
            *summary.by_severity.entry(clash.severity).or_default() += 1;
            *summary.by_category.entry(clash.category).or_default() += 1;
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or_default()
    }

    /// CRITICAL + MAJOR
    pub fn blocking(&self) -> usize {
        self.count(Severity::Critical) + self.count(Severity::Major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_severity_order_is_total() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
        assert!(Severity::Major.is_blocking() && !Severity::Moderate.is_blocking());
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_taxonomy_is_consistent() {
        assert_eq!(ClashCategory::iter().count(), 43);
        for category in ClashCategory::iter() {
            if category.family() == ClashFamily::StructuralLogic {
                assert_eq!(category.remedy(), Remedy::Review, "{category}");
            }
        }
        for family in ClashFamily::iter() {
            assert!(ClashCategory::iter().any(|category| category.family() == family), "{family}");
        }
        assert_eq!(
            ClashCategory::BasePlateWrongElevation.severity(),
            Severity::Critical
        );
        assert_eq!(
            ClashCategory::BasePlateWrongElevation.to_string(),
            "base_plate_wrong_elevation"
        );
    }

    #[test]
    fn test_summary() {
        let clashes = vec![
            Clash::new(ClashCategory::WeldMissing, "P1"),
            Clash::new(ClashCategory::OrphanedBolt, "B1"),
            Clash::new(ClashCategory::BoltSpacingTooLarge, "B2").with("B3"),
        ];
        let summary = ClashSummary::of(&clashes);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.blocking(), 2);
        assert_eq!(summary.count(Severity::Minor), 1);
        assert_eq!(clashes[2].key(), (ClashCategory::BoltSpacingTooLarge, "B2".to_string()));
    }
}
