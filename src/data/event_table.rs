//! Event table storage for raw flow-cytometry acquisitions.

use crate::error::{GatingError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A table of acquisition events.
///
/// Rows represent events (one detected particle/cell each), columns represent
/// fluorescence/scatter channels. Storage is column-major: each channel is a
/// contiguous `Vec<f64>`, which matches the access pattern of gating (a gate
/// reads one or two whole channels).
///
/// Event order carries no meaning downstream; only counts, fractions and
/// channel statistics are consumed.
#[derive(Debug, Clone)]
pub struct EventTable {
    /// Channel names, in acquisition order.
    channels: Vec<String>,
    /// One intensity column per channel, all of equal length.
    columns: Vec<Vec<f64>>,
}

impl EventTable {
    /// Create a new EventTable from channel names and intensity columns.
    ///
    /// # Arguments
    /// * `channels` - Channel names, one per column
    /// * `columns` - Intensity columns, all of equal length
    ///
    /// Fails if the number of columns does not match the number of channel
    /// names, if columns have unequal lengths, or if a channel name repeats.
    pub fn new(channels: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if channels.len() != columns.len() {
            return Err(GatingError::DimensionMismatch {
                expected: channels.len(),
                actual: columns.len(),
            });
        }
        let mut seen = HashSet::new();
        for name in &channels {
            if !seen.insert(name.as_str()) {
                return Err(GatingError::DuplicateChannel(name.clone()));
            }
        }
        if let Some(first) = columns.first() {
            let n = first.len();
            for (idx, col) in columns.iter().enumerate() {
                if col.len() != n {
                    return Err(GatingError::DimensionMismatch {
                        expected: n,
                        actual: columns[idx].len(),
                    });
                }
            }
        }
        Ok(Self { channels, columns })
    }

    /// Load an event table from a CSV file.
    ///
    /// Expected format: header row with channel names, then one row per event
    /// with numeric intensities.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        let channels: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if channels.is_empty() {
            return Err(GatingError::EmptyInput(
                "CSV has no channel columns".to_string(),
            ));
        }

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); channels.len()];
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != channels.len() {
                return Err(GatingError::DimensionMismatch {
                    expected: channels.len(),
                    actual: record.len(),
                });
            }
            for (col_idx, field) in record.iter().enumerate() {
                let value: f64 =
                    field
                        .trim()
                        .parse()
                        .map_err(|_| GatingError::InvalidIntensity {
                            value: field.to_string(),
                            row: row_idx,
                            channel: channels[col_idx].clone(),
                        })?;
                columns[col_idx].push(value);
            }
        }

        Self::new(channels, columns)
    }

    /// Number of events (rows).
    #[inline]
    pub fn n_events(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of channels (columns).
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// True if the table holds no events.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_events() == 0
    }

    /// Channel names in order.
    #[inline]
    pub fn channel_names(&self) -> &[String] {
        &self.channels
    }

    /// Index of a channel by name.
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }

    /// Full intensity column for a channel.
    pub fn channel(&self, name: &str) -> Result<&[f64]> {
        self.channel_index(name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| GatingError::MissingChannel {
                gate: "event table".to_string(),
                channel: name.to_string(),
            })
    }

    /// Intensity at (event, channel index).
    #[inline]
    pub fn value(&self, event: usize, channel_idx: usize) -> f64 {
        self.columns[channel_idx][event]
    }

    /// New table containing only the given events, in the given order.
    pub fn subset(&self, events: &[usize]) -> EventTable {
        let columns = self
            .columns
            .iter()
            .map(|col| events.iter().map(|&e| col[e]).collect())
            .collect();
        EventTable {
            channels: self.channels.clone(),
            columns,
        }
    }

    /// Map every intensity in every channel through `f`, preserving shape.
    ///
    /// Used to apply the compression transform once, up front, to all
    /// channels with the same parameters.
    pub fn map_intensities<F>(&self, f: F) -> EventTable
    where
        F: Fn(f64) -> f64,
    {
        let columns = self
            .columns
            .iter()
            .map(|col| col.iter().map(|&v| f(v)).collect())
            .collect();
        EventTable {
            channels: self.channels.clone(),
            columns,
        }
    }

    /// Median of a channel restricted to the given events.
    ///
    /// Fails on an empty event subset rather than returning an undefined
    /// value.
    pub fn median_of(&self, channel: &str, events: &[usize]) -> Result<f64> {
        if events.is_empty() {
            return Err(GatingError::EmptyInput(format!(
                "median of '{}' over an empty population is undefined",
                channel
            )));
        }
        let col = self.channel(channel)?;
        let mut values: Vec<f64> = events.iter().map(|&e| col[e]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
        Ok(median)
    }
}
