/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! The lookup-or-prediction contract: an optional predictor in front of the
//! standards tables, which always produce an in-bounds size.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::config::EngineConfig;
use crate::connection::ConnectionCategory;
use crate::standards::prediction::{Prediction, Predictor, Unavailable};
use crate::standards::tables::*;
use crate::units::Kilonewtons;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SizedQuantity {
    BoltDiameter,
    PlateThickness,
    WeldSize,
    AnchorDiameter,
}

impl SizedQuantity {
    pub fn table(&self) -> &'static [f64] {
        match self {
            SizedQuantity::BoltDiameter => &BOLT_DIAMETERS,
            SizedQuantity::PlateThickness => &PLATE_THICKNESSES,
            SizedQuantity::WeldSize => &WELD_SIZES,
            SizedQuantity::AnchorDiameter => &ANCHOR_DIAMETERS,
        }
    }
}

/// Geometry the rules for a quantity depend on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizingContext {
    pub bolt_diameter: f64,
    pub thickness: f64,
    pub weld_length: f64,
    /// Floor from the connection parameters or the element's current size
    pub at_least: f64,
}

/// What to size and for which demand.
///
/// The required capacity is per fastener for bolts, anchors and plate bearing,
/// and the total carried by the run for welds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingRequest {
    pub quantity: SizedQuantity,
    pub grade: String,
    pub required_capacity: Kilonewtons,
    pub category: ConnectionCategory,
    pub context: SizingContext,
}

impl SizingRequest {
    pub fn new(
        quantity: SizedQuantity,
        grade: &str,
        required_capacity: Kilonewtons,
        category: ConnectionCategory,
    ) -> Self {
        Self {
            quantity,
            grade: grade.to_string(),
            required_capacity,
            category,
            context: SizingContext::default(),
        }
    }

    pub fn with_bolt_diameter(mut self, bolt_diameter: f64) -> Self {
        self.context.bolt_diameter = bolt_diameter;
        self
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.context.thickness = thickness;
        self
    }

    pub fn with_weld_length(mut self, weld_length: f64) -> Self {
        self.context.weld_length = weld_length;
        self
    }

    pub fn at_least(mut self, floor: f64) -> Self {
        self.context.at_least = self.context.at_least.max(floor);
        self
    }
}

/// The continuous minimum the standards rules demand, before rounding to a table size
pub fn standard_minimum(request: &SizingRequest) -> f64 {
    let demand = request.required_capacity;
    let context = &request.context;
    let rule = match request.quantity {
        SizedQuantity::BoltDiameter => {
            required_bolt_diameter(demand, bolt_grade_or(&request.grade, "8.8"))
        }
        SizedQuantity::AnchorDiameter => {
            required_anchor_diameter(demand, bolt_grade_or(&request.grade, "8.8"))
        }
        SizedQuantity::PlateThickness => {
            let steel = steel_grade_or(&request.grade, "S355");
            min_plate_thickness(context.bolt_diameter).max(required_bearing_thickness(
                demand,
                context.bolt_diameter,
                steel,
            ))
        }
        SizedQuantity::WeldSize => {
            let steel = steel_grade_or(&request.grade, "S355");
            min_weld_size(context.thickness).max(required_weld_size(demand, context.weld_length, steel))
        }
    };
    rule.max(context.at_least)
}

/// The standards lookup: never fails, saturates at the largest table size
pub fn standard_size(request: &SizingRequest) -> StandardSize {
    round_up(request.quantity.table(), standard_minimum(request))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SizingSource {
    Prediction { confidence: f64 },
    Standards { fallback: Unavailable },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sizing {
    /// Always a table size
    pub value: f64,
    pub minimum: f64,
    pub source: SizingSource,
    /// The demand exceeded the largest size in the table
    pub saturated: bool,
}

impl Sizing {
    pub fn predicted(&self) -> bool {
        matches!(self.source, SizingSource::Prediction { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingStats {
    pub predicted: usize,
    pub standards: usize,
    pub cache_hits: usize,
    pub timeouts: usize,
}

const QUEUE_DEPTH: usize = 64;

struct Job {
    request: SizingRequest,
    deadline: Instant,
    reply: Sender<Result<Prediction, Unavailable>>,
}

/// The one thread that calls the predictor. A hung call holds only this thread;
/// once a caller has timed out on it, later requests skip straight to the tables
/// until it returns.
struct Worker {
    jobs: SyncSender<Job>,
    running: Arc<AtomicBool>,
    stalled: AtomicBool,
}

impl Worker {
    fn spawn(predictor: Arc<dyn Predictor>) -> Option<Self> {
        let (jobs, queue) = mpsc::sync_channel::<Job>(QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&running);
        let spawned = thread::Builder::new()
            .name("sizing-predictor".to_string())
            .spawn(move || {
                for job in queue {
                    if Instant::now() >= job.deadline {
                        continue;
                    }
                    flag.store(true, Ordering::Release);
                    let result = predictor.predict(&job.request);
                    flag.store(false, Ordering::Release);
                    let _ = job.reply.send(result);
                }
            });
        match spawned {
            Ok(_) => Some(Self {
                jobs,
                running,
                stalled: AtomicBool::new(false),
            }),
            Err(error) => {
                warn!("Prediction disabled, worker not started: {error}");
                None
            }
        }
    }

    fn blocked(&self) -> bool {
        if !self.stalled.load(Ordering::Acquire) {
            return false;
        }
        if self.running.load(Ordering::Acquire) {
            return true;
        }
        self.stalled.store(false, Ordering::Release);
        false
    }
}

/// Per-run sizing service handed to the synthesizer and corrector
pub struct SizingRegistry {
    worker: Option<Worker>,
    timeout: Duration,
    min_confidence: f64,
    cache: Mutex<HashMap<String, Sizing>>,
    predicted: AtomicUsize,
    standards: AtomicUsize,
    cache_hits: AtomicUsize,
    timeouts: AtomicUsize,
}

impl SizingRegistry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            worker: None,
            timeout: config.prediction_timeout(),
            min_confidence: config.prediction_min_confidence,
            cache: Mutex::new(HashMap::new()),
            predicted: AtomicUsize::new(0),
            standards: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            timeouts: AtomicUsize::new(0),
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.worker = Worker::spawn(predictor);
        self
    }

    pub fn has_predictor(&self) -> bool {
        self.worker.is_some()
    }

    pub fn size(&self, request: &SizingRequest) -> Sizing {
        let key = format!("{request:?}");
        if let Some(hit) = self.cache.lock().ok().and_then(|cache| cache.get(&key).cloned()) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return hit;
        }
        let minimum = standard_minimum(request);
        let table = request.quantity.table();
        let sizing = match self
            .predict(request)
            .and_then(|prediction| self.accept(prediction, table, minimum))
        {
            Ok(sizing) => {
                self.predicted.fetch_add(1, Ordering::Relaxed);
                sizing
            }
            Err(fallback) => {
                if matches!(fallback, Unavailable::Timeout(_)) {
                    self.timeouts.fetch_add(1, Ordering::Relaxed);
                }
                if self.has_predictor() {
                    debug!("{} from standards: {fallback}", request.quantity);
                }
                self.standards.fetch_add(1, Ordering::Relaxed);
                let standard = round_up(table, minimum);
                Sizing {
                    value: standard.value,
                    minimum,
                    source: SizingSource::Standards { fallback },
                    saturated: standard.saturated,
                }
            }
        };
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, sizing.clone());
        }
        sizing
    }

    pub fn stats(&self) -> SizingStats {
        SizingStats {
            predicted: self.predicted.load(Ordering::Relaxed),
            standards: self.standards.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    fn predict(&self, request: &SizingRequest) -> Result<Prediction, Unavailable> {
        let Some(worker) = &self.worker else {
            return Err(Unavailable::Disabled);
        };
        if worker.blocked() {
            return Err(Unavailable::Busy);
        }
        let (reply, receiver) = mpsc::channel();
        let job = Job {
            request: request.clone(),
            deadline: Instant::now() + self.timeout,
            reply,
        };
        match worker.jobs.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(Unavailable::Busy),
            Err(TrySendError::Disconnected(_)) => {
                return Err(Unavailable::Service("prediction worker stopped".to_string()))
            }
        }
        match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                worker.stalled.store(true, Ordering::Release);
                Err(Unavailable::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Unavailable::Service("prediction worker stopped".to_string()))
            }
        }
    }

    fn accept(&self, prediction: Prediction, table: &[f64], minimum: f64) -> Result<Sizing, Unavailable> {
        let Prediction { value, confidence } = prediction;
        if !value.is_finite() || value <= 0.0 {
            return Err(Unavailable::OutOfBounds { value });
        }
        if confidence.is_nan() || confidence < self.min_confidence {
            return Err(Unavailable::LowConfidence {
                confidence,
                threshold: self.min_confidence,
            });
        }
        let rounded = round_up(table, value);
        if rounded.saturated {
            return Err(Unavailable::OutOfBounds { value });
        }
        if rounded.value + 1e-9 < minimum {
            return Err(Unavailable::BelowMinimum { value, minimum });
        }
        Ok(Sizing {
            value: rounded.value,
            minimum,
            source: SizingSource::Prediction { confidence },
            saturated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bolt_request(demand: f64) -> SizingRequest {
        SizingRequest::new(
            SizedQuantity::BoltDiameter,
            "8.8",
            Kilonewtons(demand),
            ConnectionCategory::Shear,
        )
    }

    fn fixed(value: f64, confidence: f64) -> Arc<dyn Predictor> {
        Arc::new(move |_: &SizingRequest| Ok::<_, Unavailable>(Prediction { value, confidence }))
    }

    #[test]
    fn test_disabled_predictor_uses_standards() {
        let registry = SizingRegistry::new(&EngineConfig::default());
        let sizing = registry.size(&bolt_request(100.0));
        assert_eq!(sizing.value, 22.0);
        assert_eq!(
            sizing.source,
            SizingSource::Standards {
                fallback: Unavailable::Disabled
            }
        );
    }

    #[test]
    fn test_accepted_prediction_is_rounded_up() {
        let registry = SizingRegistry::new(&EngineConfig::default()).with_predictor(fixed(25.0, 0.9));
        let sizing = registry.size(&bolt_request(100.0));
        assert_eq!(sizing.value, 27.0);
        assert!(sizing.predicted());
        assert_eq!(registry.stats().predicted, 1);
    }

    #[test]
    fn test_prediction_below_minimum_is_rejected() {
        let registry = SizingRegistry::new(&EngineConfig::default()).with_predictor(fixed(16.0, 0.99));
        let sizing = registry.size(&bolt_request(100.0));
        assert_eq!(sizing.value, 22.0);
        assert!(matches!(
            sizing.source,
            SizingSource::Standards {
                fallback: Unavailable::BelowMinimum { .. }
            }
        ));
    }

    #[test]
    fn test_low_confidence_prediction_is_rejected() {
        let registry = SizingRegistry::new(&EngineConfig::default()).with_predictor(fixed(30.0, 0.2));
        let sizing = registry.size(&bolt_request(10.0));
        assert_eq!(sizing.value, 16.0);
        assert!(!sizing.predicted());
    }

    #[test]
    fn test_slow_predictor_times_out() {
        let config = EngineConfig {
            prediction_timeout_ms: 20,
            ..EngineConfig::default()
        };
        let slow: Arc<dyn Predictor> = Arc::new(|_: &SizingRequest| {
            thread::sleep(Duration::from_millis(500));
            Ok::<_, Unavailable>(Prediction {
                value: 36.0,
                confidence: 1.0,
            })
        });
        let registry = SizingRegistry::new(&config).with_predictor(slow);
        let sizing = registry.size(&bolt_request(10.0));
        assert_eq!(sizing.value, 16.0);
        assert_eq!(registry.stats().timeouts, 1);
    }

    #[test]
    fn test_hung_predictor_holds_one_worker() {
        let config = EngineConfig {
            prediction_timeout_ms: 20,
            ..EngineConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let hung: Arc<dyn Predictor> = Arc::new(move |_: &SizingRequest| {
            counted.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2_000));
            Ok::<_, Unavailable>(Prediction {
                value: 36.0,
                confidence: 1.0,
            })
        });
        let registry = SizingRegistry::new(&config).with_predictor(hung);
        let started = Instant::now();
        for demand in 1..=20 {
            let sizing = registry.size(&bolt_request(demand as f64));
            assert!(!sizing.predicted());
        }
        assert!(started.elapsed() < Duration::from_millis(1_000));
        assert_eq!(registry.stats().timeouts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_skipped_while_stalled_names_the_reason() {
        let config = EngineConfig {
            prediction_timeout_ms: 10,
            ..EngineConfig::default()
        };
        let hung: Arc<dyn Predictor> = Arc::new(|_: &SizingRequest| {
            thread::sleep(Duration::from_millis(1_000));
            Ok::<_, Unavailable>(Prediction {
                value: 36.0,
                confidence: 1.0,
            })
        });
        let registry = SizingRegistry::new(&config).with_predictor(hung);
        registry.size(&bolt_request(10.0));
        let skipped = registry.size(&bolt_request(20.0));
        assert_eq!(
            skipped.source,
            SizingSource::Standards {
                fallback: Unavailable::Busy
            }
        );
    }

    #[test]
    fn test_repeated_requests_hit_the_cache() {
        let registry = SizingRegistry::new(&EngineConfig::default());
        let first = registry.size(&bolt_request(50.0));
        let second = registry.size(&bolt_request(50.0));
        assert_eq!(first, second);
        assert_eq!(registry.stats().cache_hits, 1);
        assert_eq!(registry.stats().standards, 1);
    }

    #[test]
    fn test_plate_thickness_covers_bolt_rule() {
        let request = SizingRequest::new(
            SizedQuantity::PlateThickness,
            "S355",
            Kilonewtons(0.0),
            ConnectionCategory::Splice,
        )
        .with_bolt_diameter(20.0);
        let size = standard_size(&request);
        assert_eq!(size.value, 15.0);
        assert!(size.value >= min_plate_thickness(20.0));
    }

    #[test]
    fn test_weld_size_follows_thickness() {
        let request = SizingRequest::new(
            SizedQuantity::WeldSize,
            "S355",
            Kilonewtons(0.0),
            ConnectionCategory::Shear,
        )
        .with_thickness(20.0)
        .with_weld_length(300.0);
        assert_eq!(standard_size(&request).value, 8.0);
    }
}
