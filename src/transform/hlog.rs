//! Hyperlog (hlog) compression of raw acquisition intensities.
//!
//! Raw cytometer readings span several decades and include values near or
//! below zero, where a plain log scale breaks down. The hyperlog transform is
//! linear around zero and logarithmic in the tails. Its inverse has a closed
//! form; the forward direction is recovered by bisection, which is safe
//! because the inverse is strictly increasing.
//!
//! Gate geometry is expressed in hyperlog display coordinates, so the same
//! transform parameters must be applied to the event table before gating.
//! [`crate::pipeline::GatingConfig`] bundles the two to keep that coupling
//! explicit.

use crate::data::EventTable;
use serde::{Deserialize, Serialize};

/// Machine range of the acquisition hardware (18-bit ADC).
const MACHINE_MAX: f64 = (1u64 << 18) as f64;

fn default_b() -> f64 {
    500.0
}

fn default_display_max() -> f64 {
    10_000.0
}

fn default_decades() -> f64 {
    MACHINE_MAX.log10()
}

/// Hyperlog transform parameters.
///
/// `b` controls the width of the linear region around zero; `display_max`
/// is the upper end of the display coordinate range the machine maximum maps
/// near; `decades` is the log10 span of the machine range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HlogTransform {
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_display_max")]
    pub display_max: f64,
    #[serde(default = "default_decades")]
    pub decades: f64,
}

impl Default for HlogTransform {
    fn default() -> Self {
        Self {
            b: default_b(),
            display_max: default_display_max(),
            decades: default_decades(),
        }
    }
}

impl HlogTransform {
    /// Transform with a given linearization width and default range.
    pub fn with_b(b: f64) -> Self {
        Self {
            b,
            ..Self::default()
        }
    }

    /// Closed-form inverse: display coordinate -> raw intensity.
    pub fn inverse(&self, y: f64) -> f64 {
        let aux = self.decades / self.display_max * y;
        let s = y.signum();
        if y == 0.0 {
            return 0.0;
        }
        s * 10f64.powf(s * aux) + self.b * aux - s
    }

    /// Forward transform: raw intensity -> display coordinate.
    ///
    /// Computed by bisecting the strictly increasing inverse over the display
    /// range. Raw values beyond the machine range clamp to the range ends.
    pub fn apply(&self, x: f64) -> f64 {
        let (mut lo, mut hi) = if x >= 0.0 {
            (0.0, self.display_max)
        } else {
            (-self.display_max, 0.0)
        };
        if x >= self.inverse(hi) {
            return hi;
        }
        if x <= self.inverse(lo) {
            return lo;
        }
        for _ in 0..64 {
            let mid = 0.5 * (lo + hi);
            if self.inverse(mid) < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    /// Apply the transform to every channel of an event table.
    ///
    /// All channels use the same parameters, matching how the acquisition
    /// software rescales a sample once, up front.
    pub fn apply_table(&self, table: &EventTable) -> EventTable {
        table.map_intensities(|v| self.apply(v))
    }
}
