//! Threshold gates over a single channel.

use crate::error::{GatingError, Result};
use serde::{Deserialize, Serialize};

/// Which side of the cutoff passes the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    /// Events at or above the cutoff pass.
    Above,
    /// Events at or below the cutoff pass.
    Below,
}

/// A gate defined by a scalar cutoff and a direction on one channel.
///
/// Boundary convention: the cutoff itself passes in either direction
/// (`Above` is `>=`, `Below` is `<=`). An event exactly at the cutoff is
/// therefore always retained, consistent with the boundary-inclusive polygon
/// gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdGate {
    /// Display name of the gated population.
    pub name: String,
    /// Channel the cutoff applies to.
    pub channel: String,
    /// Cutoff, in display coordinates.
    pub cutoff: f64,
    pub region: Region,
}

impl ThresholdGate {
    /// Create a threshold gate. The cutoff must be finite.
    pub fn new(name: &str, channel: &str, cutoff: f64, region: Region) -> Result<Self> {
        if !cutoff.is_finite() {
            return Err(GatingError::InvalidParameter(format!(
                "threshold gate '{}' has non-finite cutoff",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            channel: channel.to_string(),
            cutoff,
            region,
        })
    }

    /// Whether a channel value passes the gate.
    #[inline]
    pub fn passes(&self, value: f64) -> bool {
        match self.region {
            Region::Above => value >= self.cutoff,
            Region::Below => value <= self.cutoff,
        }
    }
}
