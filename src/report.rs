/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::clash::{Clash, ClashSummary, Severity};
use crate::connection::{Classification, SynthesisReport};
use crate::convergence::{ConvergenceOutcome, IterationRecord, LoopState};
use crate::correction::{Correction, CorrectionStatus};
use crate::standards::sizing::SizingStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportStatus {
    Passed,
    NeedsReview,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ReportStatus,
    pub terminal: LoopState,
    pub iterations: usize,
    pub initial: ClashSummary,
    #[serde(rename = "final")]
    pub remaining: ClashSummary,
    /// Clashes still present in the returned model, most severe first
    pub unresolved: Vec<Clash>,
    pub corrections: Vec<Correction>,
    pub history: Vec<IterationRecord>,
    pub rolled_back: bool,
    pub classifications: Vec<Classification>,
    pub synthesis: SynthesisReport,
    pub warnings: Vec<String>,
    pub sizing: SizingStats,
    pub recommendation: String,
    pub generated_at: String,
}

impl ValidationReport {
    pub fn compile(
        outcome: ConvergenceOutcome,
        classifications: Vec<Classification>,
        synthesis: SynthesisReport,
        mut warnings: Vec<String>,
        sizing: SizingStats,
    ) -> Self {
        warnings.extend(synthesis.warnings.iter().cloned());
        warnings.extend(synthesis.failures.iter().cloned());
        let status = status(&outcome, &classifications);
        let recommendation = recommendation(status, &outcome);
        Self {
            status,
            terminal: outcome.terminal,
            iterations: outcome.iterations,
            initial: outcome.initial.summary,
            remaining: outcome.last.summary,
            unresolved: outcome.last.clashes,
            corrections: outcome.corrections,
            history: outcome.history,
            rolled_back: outcome.rolled_back,
            classifications,
            synthesis,
            warnings,
            sizing,
            recommendation,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ReportStatus::Passed
    }

    pub fn review_required(&self) -> impl Iterator<Item = &Correction> {
        self.corrections
            .iter()
            .filter(|correction| correction.status == CorrectionStatus::ReviewRequired)
    }
}

fn status(outcome: &ConvergenceOutcome, classifications: &[Classification]) -> ReportStatus {
    let remaining = &outcome.last.summary;
    if outcome.rolled_back && outcome.terminal != LoopState::Converged {
        return ReportStatus::Failed;
    }
    if outcome.terminal != LoopState::Converged {
        return if remaining.count(Severity::Critical) > 0 {
            ReportStatus::Failed
        } else {
            ReportStatus::NeedsReview
        };
    }
    let significant = outcome.last.clashes.iter().any(|clash| clash.severity >= Severity::Moderate);
    let reviews = outcome
        .corrections
        .iter()
        .any(|correction| correction.status == CorrectionStatus::ReviewRequired);
    let unsure = classifications.iter().any(|classification| classification.low_confidence);
    if significant || reviews || unsure {
        ReportStatus::NeedsReview
    } else {
        ReportStatus::Passed
    }
}

fn recommendation(status: ReportStatus, outcome: &ConvergenceOutcome) -> String {
    let remaining = outcome.last.clashes.len();
    match (status, outcome.terminal) {
        (ReportStatus::Passed, _) => "Connections are consistent; release for detailing.".to_string(),
        (ReportStatus::Failed, _) if outcome.rolled_back => {
            "Automatic correction made the model worse and was undone; inspect the failed corrections.".to_string()
        }
        (ReportStatus::Failed, _) => {
            format!("{remaining} clashes remain, including critical ones; the model needs engineering input.")
        }
        (_, LoopState::Converged) => {
            format!("No blocking clashes; check {remaining} informational clashes and the review items.")
        }
        (_, LoopState::Exhausted) => {
            format!("Iteration budget spent with {remaining} clashes left; review them or raise the budget.")
        }
        (_, LoopState::Cancelled) => format!("Run was cancelled with {remaining} clashes left."),
        _ => format!("Automatic correction stalled with {remaining} clashes left; review them manually."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash::{ClashCategory, Detection};

    fn outcome(terminal: LoopState, remaining: Vec<Clash>) -> ConvergenceOutcome {
        let last = Detection {
            summary: ClashSummary::of(&remaining),
            clashes: remaining,
        };
        ConvergenceOutcome {
            terminal,
            iterations: 2,
            initial: Detection::default(),
            last,
            corrections: Vec::new(),
            history: Vec::new(),
            rolled_back: false,
        }
    }

    #[test]
    fn test_status_rules() {
        let minor = Clash::new(ClashCategory::BoltSpacingTooLarge, "B1");
        let moderate = Clash::new(ClashCategory::ExcessiveSpan, "M1");
        let critical = Clash::new(ClashCategory::MemberIntersection, "M1");
        assert_eq!(status(&outcome(LoopState::Converged, vec![minor.clone()]), &[]), ReportStatus::Passed);
        assert_eq!(status(&outcome(LoopState::Converged, vec![moderate]), &[]), ReportStatus::NeedsReview);
        assert_eq!(status(&outcome(LoopState::Exhausted, vec![minor]), &[]), ReportStatus::NeedsReview);
        assert_eq!(status(&outcome(LoopState::Escalated, vec![critical]), &[]), ReportStatus::Failed);

        let mut rolled = outcome(LoopState::Escalated, Vec::new());
        rolled.rolled_back = true;
        assert_eq!(status(&rolled, &[]), ReportStatus::Failed);

        let mut restored = outcome(LoopState::Converged, vec![Clash::new(ClashCategory::BoltSpacingTooLarge, "B1")]);
        restored.rolled_back = true;
        assert_eq!(status(&restored, &[]), ReportStatus::Passed);
    }
}
