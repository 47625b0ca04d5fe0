/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Detect, correct, detect again, until nothing blocking is left or there is no
//! point in trying further.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::clash::{ClashDetector, Detection, Remedy};
use crate::config::EngineConfig;
use crate::correction::{ClashCorrector, Correction, CorrectionStatus};
use crate::model::StructuralModel;
use crate::standards::sizing::SizingRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoopState {
    Detecting,
    Correcting,
    Revalidating,
    Converged,
    Exhausted,
    Escalated,
    Cancelled,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoopState::Converged | LoopState::Exhausted | LoopState::Escalated | LoopState::Cancelled
        )
    }
}

/// Shared flag for stopping a run between iterations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocking clash counts around one correction pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub blocking_before: usize,
    pub blocking_after: usize,
    pub applied: usize,
    pub review_required: usize,
    pub failed: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    pub terminal: LoopState,
    pub iterations: usize,
    pub initial: Detection,
    #[serde(rename = "final")]
    pub last: Detection,
    pub corrections: Vec<Correction>,
    pub history: Vec<IterationRecord>,
    /// A pass made things worse and was undone
    pub rolled_back: bool,
}

pub struct ConvergenceLoop<'a> {
    config: &'a EngineConfig,
    sizing: &'a SizingRegistry,
    cancellation: CancellationToken,
}

impl<'a> ConvergenceLoop<'a> {
    pub fn new(config: &'a EngineConfig, sizing: &'a SizingRegistry) -> Self {
        Self {
            config,
            sizing,
            cancellation: CancellationToken::default(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn run(&self, model: &mut StructuralModel) -> ConvergenceOutcome {
        let detector = ClashDetector::new(self.config);
        let corrector = ClashCorrector::new(self.config, self.sizing);
        let mut state = LoopState::Detecting;
        let mut detection = Detection::default();
        let mut initial = None;
        let mut snapshot = None;
        let mut iteration = 0;
        let mut corrections = Vec::new();
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut rolled_back = false;
        let mut pass_start = 0;

        while !state.is_terminal() {
            debug!("Convergence iteration {iteration}: {state}");
            state = match state {
                LoopState::Detecting => {
                    detection = detector.detect(model);
                    initial = Some(detection.clone());
                    LoopState::Correcting
                }
                LoopState::Correcting => {
                    if detection.is_empty() {
                        LoopState::Converged
                    } else if self.cancellation.is_cancelled() {
                        warn!("Cancelled after {iteration} iterations");
                        LoopState::Cancelled
                    } else {
                        iteration += 1;
                        snapshot = Some(model.clone());
                        let pass = corrector.correct(model, &detection.clashes);
                        pass_start = corrections.len();
                        history.push(IterationRecord {
                            iteration,
                            blocking_before: detection.blocking(),
                            blocking_after: detection.blocking(),
                            applied: pass.count(CorrectionStatus::Applied),
                            review_required: pass.count(CorrectionStatus::ReviewRequired),
                            failed: pass.count(CorrectionStatus::Failed),
                            deferred: pass.deferred.len(),
                        });
                        corrections.extend(pass.corrections);
                        LoopState::Revalidating
                    }
                }
                LoopState::Revalidating => {
                    let before = detection.blocking();
                    let revalidated = detector.detect(model);
                    let after = revalidated.blocking();
                    if after > before {
                        error!("Iteration {iteration} raised blocking clashes from {before} to {after}, rolling back");
                        if let Some(saved) = snapshot.take() {
                            *model = saved;
                        }
                        for correction in corrections[pass_start..]
                            .iter_mut()
                            .filter(|correction| correction.status == CorrectionStatus::Applied)
                        {
                            correction.status = CorrectionStatus::Failed;
                            correction.note = Some(format!("rolled back: blocking clashes rose to {after}"));
                        }
                        if let Some(record) = history.last_mut() {
                            record.applied = 0;
                            record.failed = corrections[pass_start..]
                                .iter()
                                .filter(|correction| correction.status == CorrectionStatus::Failed)
                                .count();
                        }
                        rolled_back = true;
                        if before == 0 {
                            // the restored model already had nothing blocking
                            LoopState::Converged
                        } else {
                            LoopState::Escalated
                        }
                    } else {
                        if let Some(record) = history.last_mut() {
                            record.blocking_after = after;
                        }
                        let progressed = revalidated.clashes.len() < detection.clashes.len();
                        detection = revalidated;
                        info!(
                            "Iteration {iteration}: blocking clashes {before} -> {after}, {} in total",
                            detection.clashes.len()
                        );
                        if after == 0 {
                            // only informational clashes left: polish them while that still helps
                            if progressed && has_correctable(&detection) && iteration < self.config.max_iterations {
                                LoopState::Correcting
                            } else {
                                LoopState::Converged
                            }
                        } else if iteration >= self.config.max_iterations {
                            LoopState::Exhausted
                        } else if after >= before {
                            LoopState::Escalated
                        } else {
                            LoopState::Correcting
                        }
                    }
                }
                terminal => terminal,
            };
        }
        info!("Convergence finished {state} after {iteration} iterations");
        ConvergenceOutcome {
            terminal: state,
            iterations: iteration,
            initial: initial.unwrap_or_default(),
            last: detection,
            corrections,
            history,
            rolled_back,
        }
    }
}

/// Anything left that a further pass could still change
fn has_correctable(detection: &Detection) -> bool {
    detection
        .clashes
        .iter()
        .any(|clash| clash.category.remedy() != Remedy::Review)
}
