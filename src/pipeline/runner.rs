//! Sequential gating of one event table with per-stage yield statistics.

use crate::data::EventTable;
use crate::error::{GatingError, Result};
use crate::gate::{Gate, PolygonGate, Region, ThresholdGate};
use crate::transform::HlogTransform;
use serde::{Deserialize, Serialize};

/// Configuration of a gating pipeline run.
///
/// Bundles the compression transform with the gate list so a gate set cannot
/// be applied to data scaled with different parameters: the geometry is
/// expressed in the transform's display coordinates. `transform: None` means
/// the input table is already in display coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingConfig {
    /// Name of the assay/pipeline.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Compression transform applied once, up front, to all channels.
    #[serde(default)]
    pub transform: Option<HlogTransform>,
    /// Gates in application order; each stage's input is the previous
    /// stage's output.
    pub gates: Vec<Gate>,
    /// Channel the derived intensity statistic is computed on.
    pub marker_channel: String,
}

impl GatingConfig {
    /// Create an empty config with a name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            transform: None,
            gates: Vec::new(),
            marker_channel: String::new(),
        }
    }

    /// Set the compression transform.
    pub fn with_transform(mut self, transform: HlogTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Append a gate.
    pub fn gate(mut self, gate: Gate) -> Self {
        self.gates.push(gate);
        self
    }

    /// Set the marker channel for the derived statistic.
    pub fn marker(mut self, channel: &str) -> Self {
        self.marker_channel = channel.to_string();
        self
    }

    /// Load from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(GatingError::from)
    }

    /// Structural validation, independent of any event table.
    ///
    /// Deserialized configs bypass the gate constructors, so geometry is
    /// re-checked here.
    pub fn validate(&self) -> Result<()> {
        if self.gates.is_empty() {
            return Err(GatingError::InvalidParameter(
                "gating config has no gates".to_string(),
            ));
        }
        if self.marker_channel.is_empty() {
            return Err(GatingError::InvalidParameter(
                "gating config has no marker channel".to_string(),
            ));
        }
        for gate in &self.gates {
            match gate {
                Gate::Polygon(g) if g.vertices.len() < 3 => {
                    return Err(GatingError::InvalidGeometry {
                        gate: g.name.clone(),
                        n_vertices: g.vertices.len(),
                    });
                }
                Gate::Threshold(g) if !g.cutoff.is_finite() => {
                    return Err(GatingError::InvalidParameter(format!(
                        "threshold gate '{}' has non-finite cutoff",
                        g.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The J-Lat GFP induction assay: two scatter singlet gates, a 7-AAD
    /// viability threshold and a GFP positivity threshold, in hyperlog
    /// display coordinates (b = 500).
    pub fn jlat() -> Result<Self> {
        // Singlet discrimination on the scatter area/height relationship:
        // doublets carry disproportionate area for a given height, so the
        // band hugs the diagonal.
        let (x, dx, y, dy, ddy) = (8190.0, 1800.0, 7950.0, 1750.0, 125.0);
        let singlets = PolygonGate::new(
            "Singlets",
            "FSC-A",
            "FSC-H",
            vec![
                (x, y),
                (x + dx, y + dy),
                (x + dx, y + dy + ddy),
                (x, y + ddy),
            ],
        )?;
        let granularity =
            PolygonGate::ellipse("Granularity", "FSC-A", "SSC-A", 9200.0, 8050.0, 780.0, 1.3)?;
        // Dye exclusion: dead cells take up 7-AAD and score high.
        let live = ThresholdGate::new("Live cells", "7AAD-A", 2000.0, Region::Below)?;
        let gfp = ThresholdGate::new("GFP+ cells", "GFP-A", 1000.0, Region::Above)?;

        Ok(Self::new("J-Lat gating")
            .with_transform(HlogTransform::with_b(500.0))
            .gate(Gate::Polygon(singlets))
            .gate(Gate::Polygon(granularity))
            .gate(Gate::Threshold(live))
            .gate(Gate::Threshold(gfp))
            .marker("GFP-A"))
    }
}

/// Yield statistics for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    /// Name of the gate applied at this stage.
    pub name: String,
    /// Events entering the stage.
    pub input: usize,
    /// Events passing the gate.
    pub retained: usize,
    /// Retained fraction, `100 * retained / input`.
    pub fraction: f64,
}

impl std::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} of {} events ({:.2}%)",
            self.name, self.retained, self.input, self.fraction
        )
    }
}

/// Output record of one gating pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingReport {
    /// Per-stage yield statistics, in application order.
    pub stages: Vec<StageSummary>,
    /// Channel the intensity statistic was computed on.
    pub marker_channel: String,
    /// Median marker intensity over the population entering the final gate
    /// (the post-viability population in the four-stage assay).
    pub marker_median: f64,
}

impl GatingReport {
    /// Retained fraction of a stage (0-based).
    pub fn fraction(&self, stage: usize) -> f64 {
        self.stages[stage].fraction
    }

    /// Absolute retained count of a stage (0-based).
    pub fn count(&self, stage: usize) -> usize {
        self.stages[stage].retained
    }

    /// Events surviving the whole pipeline.
    pub fn final_count(&self) -> usize {
        self.stages.last().map(|s| s.retained).unwrap_or(0)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(GatingError::from)
    }
}

impl std::fmt::Display for GatingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Gating report")?;
        for stage in &self.stages {
            writeln!(f, "  {}", stage)?;
        }
        writeln!(
            f,
            "  Median {} (pre-final population): {:.2}",
            self.marker_channel, self.marker_median
        )
    }
}

/// A validated, runnable gating pipeline.
///
/// Running is a pure function of the input table; no state is kept between
/// samples, so callers may gate many samples in parallel with one pipeline.
#[derive(Debug, Clone)]
pub struct GatingPipeline {
    config: GatingConfig,
}

impl GatingPipeline {
    /// Validate a config and wrap it as a runnable pipeline.
    pub fn new(config: GatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The underlying configuration.
    pub fn config(&self) -> &GatingConfig {
        &self.config
    }

    /// Gate one sample.
    ///
    /// Fails fast, before any stage runs, on an empty input table or on a
    /// gate (or marker) channel missing from the table. Fails during the run
    /// when a stage receives an empty input population, naming the stage:
    /// fractions are never NaN and the median is never taken over nothing.
    pub fn run(&self, raw: &EventTable) -> Result<GatingReport> {
        if raw.is_empty() {
            return Err(GatingError::EmptyInput(
                "sample contains no events".to_string(),
            ));
        }
        for gate in &self.config.gates {
            gate.validate_against(raw)?;
        }
        if raw.channel_index(&self.config.marker_channel).is_none() {
            return Err(GatingError::MissingChannel {
                gate: "marker statistic".to_string(),
                channel: self.config.marker_channel.clone(),
            });
        }

        let table = match &self.config.transform {
            Some(t) => t.apply_table(raw),
            None => raw.clone(),
        };

        let mut current: Vec<usize> = (0..table.n_events()).collect();
        let mut pre_final = current.clone();
        let mut stages = Vec::with_capacity(self.config.gates.len());

        for (i, gate) in self.config.gates.iter().enumerate() {
            if current.is_empty() {
                return Err(GatingError::EmptyStageInput {
                    stage: gate.name().to_string(),
                });
            }
            if i == self.config.gates.len() - 1 {
                pre_final = current.clone();
            }
            let kept = gate.filter(&table, &current)?;
            let fraction = 100.0 * kept.len() as f64 / current.len() as f64;
            stages.push(StageSummary {
                name: gate.name().to_string(),
                input: current.len(),
                retained: kept.len(),
                fraction,
            });
            current = kept;
        }

        let marker_median = table.median_of(&self.config.marker_channel, &pre_final)?;

        Ok(GatingReport {
            stages,
            marker_channel: self.config.marker_channel.clone(),
            marker_median,
        })
    }
}

/// Convenience function: run the J-Lat assay preset on one sample.
pub fn run_jlat(raw: &EventTable) -> Result<GatingReport> {
    GatingPipeline::new(GatingConfig::jlat()?)?.run(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four channels, six events, already in display coordinates.
    ///
    /// Scatter channels put events 0-3 inside a simple box gate pair;
    /// event 4 is a scatter outlier; event 5 fails viability.
    fn create_test_table() -> EventTable {
        EventTable::new(
            vec![
                "FSC-A".to_string(),
                "FSC-H".to_string(),
                "7AAD-A".to_string(),
                "GFP-A".to_string(),
            ],
            vec![
                vec![5.0, 5.0, 5.0, 5.0, 50.0, 5.0],
                vec![5.0, 5.0, 5.0, 5.0, 5.0, 5.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0, 100.0],
                vec![10.0, 20.0, 30.0, 40.0, 25.0, 25.0],
            ],
        )
        .unwrap()
    }

    fn box_gate(name: &str) -> Gate {
        Gate::Polygon(
            PolygonGate::new(
                name,
                "FSC-A",
                "FSC-H",
                vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            )
            .unwrap(),
        )
    }

    fn create_test_config() -> GatingConfig {
        GatingConfig::new("test")
            .gate(box_gate("Singlets"))
            .gate(box_gate("Granularity"))
            .gate(Gate::Threshold(
                ThresholdGate::new("Live", "7AAD-A", 50.0, Region::Below).unwrap(),
            ))
            .gate(Gate::Threshold(
                ThresholdGate::new("GFP+", "GFP-A", 25.0, Region::Above).unwrap(),
            ))
            .marker("GFP-A")
    }

    #[test]
    fn test_run_yields_per_stage_statistics() {
        let pipeline = GatingPipeline::new(create_test_config()).unwrap();
        let report = pipeline.run(&create_test_table()).unwrap();

        assert_eq!(report.stages.len(), 4);
        // Stage 1 drops the scatter outlier (event 4).
        assert_eq!(report.count(0), 5);
        assert!((report.fraction(0) - 100.0 * 5.0 / 6.0).abs() < 1e-12);
        // Stage 2 keeps everything that survived stage 1.
        assert_eq!(report.count(1), 5);
        assert_eq!(report.fraction(1), 100.0);
        // Stage 3 drops the 7-AAD-high event (event 5).
        assert_eq!(report.count(2), 4);
        assert_eq!(report.fraction(2), 80.0);
        // Stage 4: GFP >= 25 keeps events 2 and 3.
        assert_eq!(report.count(3), 2);
        assert_eq!(report.fraction(3), 50.0);
        assert_eq!(report.final_count(), 2);
    }

    #[test]
    fn test_monotonic_containment() {
        let pipeline = GatingPipeline::new(create_test_config()).unwrap();
        let report = pipeline.run(&create_test_table()).unwrap();
        for stage in &report.stages {
            assert!(stage.retained <= stage.input);
            assert!((0.0..=100.0).contains(&stage.fraction));
            assert_eq!(stage.fraction == 100.0, stage.retained == stage.input);
            assert_eq!(stage.fraction == 0.0, stage.retained == 0);
        }
        for pair in report.stages.windows(2) {
            assert_eq!(pair[1].input, pair[0].retained);
        }
    }

    #[test]
    fn test_marker_median_over_pre_final_population() {
        let pipeline = GatingPipeline::new(create_test_config()).unwrap();
        let report = pipeline.run(&create_test_table()).unwrap();
        // The median is over the viable population entering the GFP gate
        // (events 0-3: 10, 20, 30, 40), not over the GFP+ survivors.
        assert_eq!(report.marker_median, 25.0);
    }

    #[test]
    fn test_empty_input_fails() {
        let table = EventTable::new(
            vec!["FSC-A".to_string(), "FSC-H".to_string()],
            vec![Vec::new(), Vec::new()],
        )
        .unwrap();
        let pipeline = GatingPipeline::new(create_test_config()).unwrap();
        assert!(matches!(
            pipeline.run(&table),
            Err(GatingError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_empty_stage_input_names_stage() {
        // The viability gate excludes everything, so the GFP stage receives
        // an empty population.
        let config = GatingConfig::new("dead-end")
            .gate(Gate::Threshold(
                ThresholdGate::new("Live", "7AAD-A", -1.0, Region::Below).unwrap(),
            ))
            .gate(Gate::Threshold(
                ThresholdGate::new("GFP+", "GFP-A", 25.0, Region::Above).unwrap(),
            ))
            .marker("GFP-A");
        let pipeline = GatingPipeline::new(config).unwrap();
        match pipeline.run(&create_test_table()) {
            Err(GatingError::EmptyStageInput { stage }) => assert_eq!(stage, "GFP+"),
            other => panic!("expected empty-stage error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_channel_fails_before_gating() {
        let config = create_test_config().gate(Gate::Threshold(
            ThresholdGate::new("extra", "PE-A", 1.0, Region::Above).unwrap(),
        ));
        let pipeline = GatingPipeline::new(config).unwrap();
        assert!(matches!(
            pipeline.run(&create_test_table()),
            Err(GatingError::MissingChannel { .. })
        ));
    }

    #[test]
    fn test_config_without_gates_rejected() {
        let config = GatingConfig::new("empty").marker("GFP-A");
        assert!(GatingPipeline::new(config).is_err());
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let config = GatingConfig::jlat().unwrap();
        let yaml = config.to_yaml().unwrap();
        let parsed = GatingConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.gates.len(), 4);
        assert_eq!(parsed.marker_channel, "GFP-A");
        assert_eq!(
            parsed.transform.map(|t| t.b),
            Some(500.0)
        );
    }

    #[test]
    fn test_yaml_degenerate_polygon_rejected() {
        let yaml = r#"
name: broken
gates:
  - !Polygon
    name: flat
    x_channel: FSC-A
    y_channel: FSC-H
    vertices: [[0.0, 0.0], [1.0, 1.0]]
marker_channel: GFP-A
"#;
        assert!(matches!(
            GatingConfig::from_yaml(yaml),
            Err(GatingError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_jlat_preset_shape() {
        let config = GatingConfig::jlat().unwrap();
        assert_eq!(config.gates.len(), 4);
        assert_eq!(config.gates[0].name(), "Singlets");
        assert_eq!(config.gates[1].channels(), vec!["FSC-A", "SSC-A"]);
        assert_eq!(config.gates[3].name(), "GFP+ cells");
    }
}
