/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::collections::HashSet;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::clash::checks::CHECKS;
use crate::clash::{Clash, ClashCategory, ClashSummary, ModelIndex};
use crate::config::EngineConfig;
use crate::model::{ElementId, StructuralModel};

/// One detection pass: clashes ordered most severe first, with their counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub clashes: Vec<Clash>,
    pub summary: ClashSummary,
}

impl Detection {
    pub fn blocking(&self) -> usize {
        self.summary.blocking()
    }

    pub fn is_empty(&self) -> bool {
        self.clashes.is_empty()
    }
}

pub struct ClashDetector<'a> {
    config: &'a EngineConfig,
}

impl<'a> ClashDetector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Run every check over the model. Never fails: malformed input becomes clashes.
    pub fn detect(&self, model: &StructuralModel) -> Detection {
        let index = ModelIndex::new(model, self.config);
        let found: Vec<Clash> = CHECKS
            .par_iter()
            .flat_map_iter(|(_, check)| check(&index))
            .collect();

        let mut seen: HashSet<(ClashCategory, Vec<ElementId>)> = HashSet::new();
        let mut clashes: Vec<Clash> = found
            .into_iter()
            .filter(|clash| {
                let mut elements = clash.elements.clone();
                elements.sort();
                seen.insert((clash.category, elements))
            })
            .collect();
        clashes.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.category.cmp(&b.category))
                .then_with(|| a.elements.cmp(&b.elements))
        });
        for (number, clash) in clashes.iter_mut().enumerate() {
            clash.id = format!("C{:03}", number + 1);
        }
        let summary = ClashSummary::of(&clashes);
        debug!(
            "Detected {} clashes, {} blocking",
            summary.total,
            summary.blocking()
        );
        Detection { clashes, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash::Severity;
    use crate::connection::ConnectionCategory;
    use crate::model::{Member, Plate};
    use glam::DVec3;

    #[test]
    fn test_detection_is_sorted_and_numbered() {
        let mut model = StructuralModel::new(vec![Member::new(
            "C1",
            DVec3::ZERO,
            DVec3::new(0.0, 0.0, 3000.0),
            "HEA200",
        )]);
        model.plates.push(Plate {
            id: "P1".into(),
            position: DVec3::new(0.0, 0.0, 3000.0),
            width: 400.0,
            height: 400.0,
            thickness: 20.0,
            material: "S355".into(),
            members: vec!["C1".into()],
            joint: None,
            category: ConnectionCategory::BasePlate,
            axis_u: DVec3::X,
            axis_v: DVec3::Y,
        });
        let detection = ClashDetector::new(&EngineConfig::default()).detect(&model);
        assert_eq!(detection.clashes[0].category, ClashCategory::BasePlateWrongElevation);
        assert_eq!(detection.clashes[0].id, "C001");
        assert!(detection
            .clashes
            .windows(2)
            .all(|pair| pair[0].severity >= pair[1].severity));
        assert_eq!(detection.summary.count(Severity::Critical), 1);
    }
}
