/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! From bare member lines to a corrected assembly and its validation report.

use std::sync::Arc;

use log::{info, warn};

use crate::config::EngineConfig;
use crate::connection::{Classifier, Synthesizer};
use crate::convergence::{CancellationToken, ConvergenceLoop};
use crate::error::{ClassificationAmbiguous, ModelError};
use crate::geometry::joints::member_frames;
use crate::geometry::resolve;
use crate::model::StructuralModel;
use crate::report::ValidationReport;
use crate::standards::prediction::Predictor;
use crate::standards::sizing::SizingRegistry;

pub struct Pipeline {
    config: EngineConfig,
    predictor: Option<Arc<dyn Predictor>>,
    cancellation: CancellationToken,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            predictor: None,
            cancellation: CancellationToken::default(),
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Resolve joints, classify and synthesize connections, then correct until converged.
    /// Only input without usable members is an error; everything else ends up in the report.
    pub fn run(&self, mut model: StructuralModel) -> Result<(StructuralModel, ValidationReport), ModelError> {
        model.validate()?;
        let config = &self.config;
        let mut warnings = Vec::new();

        let frames = if model.joints.is_empty() {
            let resolved = resolve(&model.members, model.foundation.as_ref(), config);
            warnings.extend(resolved.skipped.iter().map(ToString::to_string));
            warnings.extend(
                resolved
                    .disconnected
                    .iter()
                    .map(|member| format!("member {member} meets no other member")),
            );
            model.joints = resolved.joints;
            resolved.frames
        } else {
            let (frames, skipped) = member_frames(&model.members);
            for error in &skipped {
                warn!("{error}");
            }
            warnings.extend(skipped.iter().map(ToString::to_string));
            frames
        };
        info!("{} joints from {} members", model.joints.len(), model.members.len());

        let classifications = Classifier::new(&model, config).classify_all(&model, &frames);
        warnings.extend(
            classifications
                .iter()
                .filter(|classification| classification.low_confidence)
                .map(|classification| {
                    ClassificationAmbiguous {
                        joint: classification.joint.clone(),
                        best_guess: classification.best_guess.unwrap_or(classification.category),
                        confidence: classification.confidence,
                    }
                    .to_string()
                }),
        );

        let mut sizing = SizingRegistry::new(config);
        if let Some(predictor) = &self.predictor {
            sizing = sizing.with_predictor(Arc::clone(predictor));
        }
        let synthesis = Synthesizer::new(config, &sizing).synthesize(&mut model, &classifications, &frames);
        let outcome = ConvergenceLoop::new(config, &sizing)
            .with_cancellation(self.cancellation.clone())
            .run(&mut model);
        let report = ValidationReport::compile(outcome, classifications, synthesis, warnings, sizing.stats());
        info!("Validation {}: {}", report.status, report.recommendation);
        Ok((model, report))
    }
}

/// Run with standards sizing only
pub fn run_pipeline(
    model: StructuralModel,
    config: &EngineConfig,
) -> Result<(StructuralModel, ValidationReport), ModelError> {
    Pipeline::new(config.clone()).run(model)
}
