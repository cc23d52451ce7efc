//! Gating pipeline composition and execution.

pub mod runner;

pub use runner::{run_jlat, GatingConfig, GatingPipeline, GatingReport, StageSummary};
