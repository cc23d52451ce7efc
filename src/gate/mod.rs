//! Gate predicates selecting sub-populations of an event table.
//!
//! A gate is an immutable predicate over the one or two channels it declares.
//! Two kinds exist: polygon gates (closed 2-D boundary on a channel pair) and
//! threshold gates (scalar cutoff with a direction on a single channel). Both
//! count the boundary as passing.

pub mod polygon;
pub mod threshold;

pub use polygon::PolygonGate;
pub use threshold::{Region, ThresholdGate};

use crate::data::EventTable;
use crate::error::{GatingError, Result};
use serde::{Deserialize, Serialize};

/// A named gate of either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Gate {
    Polygon(PolygonGate),
    Threshold(ThresholdGate),
}

impl Gate {
    /// The gate's display name.
    pub fn name(&self) -> &str {
        match self {
            Gate::Polygon(g) => &g.name,
            Gate::Threshold(g) => &g.name,
        }
    }

    /// The channels this gate reads.
    pub fn channels(&self) -> Vec<&str> {
        match self {
            Gate::Polygon(g) => vec![g.x_channel.as_str(), g.y_channel.as_str()],
            Gate::Threshold(g) => vec![g.channel.as_str()],
        }
    }

    /// Check that every declared channel exists in the table.
    pub fn validate_against(&self, table: &EventTable) -> Result<()> {
        for channel in self.channels() {
            if table.channel_index(channel).is_none() {
                return Err(GatingError::MissingChannel {
                    gate: self.name().to_string(),
                    channel: channel.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Filter a set of event indices down to those passing the gate.
    ///
    /// Channel lookup happens once per call, not per event. The relative
    /// order of surviving indices is preserved.
    pub fn filter(&self, table: &EventTable, events: &[usize]) -> Result<Vec<usize>> {
        match self {
            Gate::Polygon(g) => {
                let xi = table.channel_index(&g.x_channel).ok_or_else(|| {
                    GatingError::MissingChannel {
                        gate: g.name.clone(),
                        channel: g.x_channel.clone(),
                    }
                })?;
                let yi = table.channel_index(&g.y_channel).ok_or_else(|| {
                    GatingError::MissingChannel {
                        gate: g.name.clone(),
                        channel: g.y_channel.clone(),
                    }
                })?;
                Ok(events
                    .iter()
                    .copied()
                    .filter(|&e| g.contains(table.value(e, xi), table.value(e, yi)))
                    .collect())
            }
            Gate::Threshold(g) => {
                let ci = table.channel_index(&g.channel).ok_or_else(|| {
                    GatingError::MissingChannel {
                        gate: g.name.clone(),
                        channel: g.channel.clone(),
                    }
                })?;
                Ok(events
                    .iter()
                    .copied()
                    .filter(|&e| g.passes(table.value(e, ci)))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scatter_table() -> EventTable {
        EventTable::new(
            vec!["FSC-A".to_string(), "SSC-A".to_string()],
            vec![vec![1.0, 5.0, 9.0], vec![1.0, 5.0, 9.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_filter_preserves_order() {
        let gate = Gate::Threshold(
            ThresholdGate::new("low", "FSC-A", 5.0, Region::Below).unwrap(),
        );
        let table = scatter_table();
        let kept = gate.filter(&table, &[2, 0, 1]).unwrap();
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn test_missing_channel_names_gate() {
        let gate = Gate::Threshold(
            ThresholdGate::new("live", "7AAD-A", 2000.0, Region::Below).unwrap(),
        );
        let table = scatter_table();
        let err = gate.validate_against(&table).unwrap_err();
        match err {
            GatingError::MissingChannel { gate, channel } => {
                assert_eq!(gate, "live");
                assert_eq!(channel, "7AAD-A");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(gate.filter(&table, &[0]).is_err());
    }
}
