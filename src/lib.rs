//! Composable Flow-Cytometry Gating Library
//!
//! This library implements sequential cell-population gating of flow-cytometry
//! event tables: an ordered list of geometric and threshold gates is applied
//! to a sample, each stage filtering the previous stage's survivors, with
//! per-stage retained counts and fractions plus a derived marker-intensity
//! median.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (EventTable, filename metadata rules)
//! - **transform**: Intensity compression (hyperlog)
//! - **gate**: Gate predicates (polygon, threshold)
//! - **pipeline**: Pipeline configuration and execution
//! - **batch**: Parallel per-sample batch runs with failure isolation
//!
//! # Example
//!
//! ```no_run
//! use flowgate::prelude::*;
//!
//! // Load a sample exported as CSV (header = channel names).
//! let table = EventTable::from_csv("sample.csv").unwrap();
//!
//! // Run the J-Lat GFP induction assay: two scatter singlet gates, a
//! // viability threshold and a GFP positivity threshold.
//! let report = run_jlat(&table).unwrap();
//! println!("{report}");
//! assert_eq!(report.stages.len(), 4);
//! ```
//!
//! Custom gate sets are built with [`pipeline::GatingConfig`], which bundles
//! the compression transform with the gate geometry so the two cannot drift
//! apart, and can round-trip through YAML.

pub mod batch;
pub mod data;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod transform;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::batch::{run_batch, BatchOutcome, Sample, SampleFailure, SampleRecord};
    pub use crate::data::{
        parse_filename, EventTable, MetadataField, NamingConvention, Rule, RuleAction, RuleSet,
        SampleMetadata,
    };
    pub use crate::error::{GatingError, Result};
    pub use crate::gate::{Gate, PolygonGate, Region, ThresholdGate};
    pub use crate::pipeline::{
        run_jlat, GatingConfig, GatingPipeline, GatingReport, StageSummary,
    };
    pub use crate::transform::HlogTransform;
}
