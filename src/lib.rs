pub mod clash;
pub mod config;
pub mod connection;
pub mod convergence;
pub mod correction;
pub mod error;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod standards;
pub mod units;

pub use config::EngineConfig;
pub use model::StructuralModel;
pub use pipeline::{run_pipeline, Pipeline};
pub use report::{ReportStatus, ValidationReport};
