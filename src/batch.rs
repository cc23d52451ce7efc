//! Batch gating across samples with per-sample isolation.
//!
//! A pipeline run is a pure function of one event table, so samples are
//! gated in parallel with no shared mutable state. A sample that fails is
//! logged, recorded as a failure and excluded from the result records; the
//! rest of the batch proceeds. No silent blank rows.

use crate::data::{parse_filename, EventTable, NamingConvention, SampleMetadata};
use crate::error::{GatingError, Result};
use crate::pipeline::{GatingPipeline, GatingReport};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// One sample queued for gating.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Acquisition file name; also the metadata source.
    pub id: String,
    pub table: EventTable,
}

impl Sample {
    pub fn new(id: &str, table: EventTable) -> Self {
        Self {
            id: id.to_string(),
            table,
        }
    }
}

/// Gating output for one sample, merged with its filename metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SampleRecord {
    pub id: String,
    pub metadata: SampleMetadata,
    pub report: GatingReport,
}

/// A sample that could not be gated.
#[derive(Debug, Clone, Serialize)]
pub struct SampleFailure {
    pub id: String,
    /// Rendered error, kept as text so the outcome stays serializable.
    pub error: String,
}

/// Outcome of a batch run: successful records plus structured failures.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// One record per successfully gated sample, in input order.
    pub records: Vec<SampleRecord>,
    /// Samples excluded from the records, with the reason.
    pub failures: Vec<SampleFailure>,
}

impl BatchOutcome {
    /// Write the merged metadata + statistics table as TSV.
    ///
    /// One row per successful sample: identity fields, then per-stage
    /// retained fraction and count, then the marker median. This is the
    /// interface consumed by the downstream reporting tooling.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(
            writer,
            "sample\tcell_type\tstimulus\tviability_stain\ttimepoint\treplicate"
        )?;
        if let Some(first) = self.records.first() {
            for stage in &first.report.stages {
                write!(writer, "\t% {}", stage.name)?;
            }
            for stage in &first.report.stages {
                write!(writer, "\tTotal {}", stage.name)?;
            }
            write!(writer, "\tMedian {}", first.report.marker_channel)?;
        }
        writeln!(writer)?;

        for record in &self.records {
            let m = &record.metadata;
            write!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                record.id, m.cell_type, m.stimulus, m.viability_stain, m.timepoint, m.replicate
            )?;
            for stage in &record.report.stages {
                write!(writer, "\t{:.2}", stage.fraction)?;
            }
            for stage in &record.report.stages {
                write!(writer, "\t{}", stage.retained)?;
            }
            writeln!(writer, "\t{:.2}", record.report.marker_median)?;
        }

        Ok(())
    }

    /// Serialize the whole outcome (records and failures) to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(GatingError::from)
    }
}

/// Gate a batch of samples with one pipeline.
///
/// Metadata is parsed from each sample id under the given naming convention.
/// Samples run in parallel; failures are logged with a warning and collected
/// rather than aborting the batch.
pub fn run_batch(
    samples: &[Sample],
    pipeline: &GatingPipeline,
    convention: NamingConvention,
) -> BatchOutcome {
    let results: Vec<(String, std::result::Result<SampleRecord, String>)> = samples
        .par_iter()
        .map(|sample| {
            let outcome = pipeline
                .run(&sample.table)
                .map(|report| SampleRecord {
                    id: sample.id.clone(),
                    metadata: parse_filename(&sample.id, convention),
                    report,
                })
                .map_err(|e| e.to_string());
            (sample.id.clone(), outcome)
        })
        .collect();

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (id, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(sample = %id, %error, "sample excluded from batch results");
                failures.push(SampleFailure { id, error });
            }
        }
    }

    BatchOutcome { records, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Gate, Region, ThresholdGate};
    use crate::pipeline::GatingConfig;
    use tempfile::NamedTempFile;

    fn viability_table(values: Vec<f64>) -> EventTable {
        let n = values.len();
        EventTable::new(
            vec!["7AAD-A".to_string(), "GFP-A".to_string()],
            vec![values, (0..n).map(|i| i as f64 * 10.0).collect()],
        )
        .unwrap()
    }

    fn simple_pipeline() -> GatingPipeline {
        let config = GatingConfig::new("viability-only")
            .gate(Gate::Threshold(
                ThresholdGate::new("Live cells", "7AAD-A", 50.0, Region::Below).unwrap(),
            ))
            .gate(Gate::Threshold(
                ThresholdGate::new("GFP+ cells", "GFP-A", 15.0, Region::Above).unwrap(),
            ))
            .marker("GFP-A");
        GatingPipeline::new(config).unwrap()
    }

    #[test]
    fn test_batch_isolates_failures() {
        let samples = vec![
            Sample::new(
                "J-LAT PMA1 24h.fcs",
                viability_table(vec![0.0, 10.0, 100.0, 20.0]),
            ),
            Sample::new("J-LAT CTL.fcs", viability_table(Vec::new())),
            Sample::new(
                "Jurkat PMA2 24h.fcs",
                viability_table(vec![0.0, 10.0, 20.0]),
            ),
        ];

        let outcome = run_batch(&samples, &simple_pipeline(), NamingConvention::Induction);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "J-LAT CTL.fcs");
        assert!(outcome.failures[0].error.contains("no events"));
        // Input order preserved for the survivors.
        assert_eq!(outcome.records[0].id, "J-LAT PMA1 24h.fcs");
        assert_eq!(outcome.records[1].id, "Jurkat PMA2 24h.fcs");
    }

    #[test]
    fn test_batch_merges_metadata() {
        let samples = vec![Sample::new(
            "J-LAT PMA1 24h sans.fcs",
            viability_table(vec![0.0, 10.0, 20.0, 30.0]),
        )];
        let outcome = run_batch(&samples, &simple_pipeline(), NamingConvention::Induction);

        let record = &outcome.records[0];
        assert_eq!(record.metadata.cell_type, "J-LAT");
        assert_eq!(record.metadata.stimulus, "PMA");
        assert_eq!(record.metadata.viability_stain, "-");
        assert_eq!(record.report.stages.len(), 2);
    }

    #[test]
    fn test_tsv_export() {
        let samples = vec![Sample::new(
            "J-LAT PMA1 24h.fcs",
            viability_table(vec![0.0, 10.0, 100.0, 20.0]),
        )];
        let outcome = run_batch(&samples, &simple_pipeline(), NamingConvention::Induction);

        let file = NamedTempFile::new().unwrap();
        outcome.to_tsv(file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("% Live cells"));
        assert!(content.contains("Total GFP+ cells"));
        assert!(content.contains("Median GFP-A"));
        assert!(content.contains("J-LAT PMA1 24h.fcs"));
    }
}
