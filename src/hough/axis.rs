//! Discretised parameter axes with overlapping bins.

use crate::error::{FinderError, Result};
use serde::{Deserialize, Serialize};

/// Inclusive index interval `[lo, hi]` on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DiscreteRange {
    pub lo: usize,
    pub hi: usize,
}

impl DiscreteRange {
    pub fn new(lo: usize, hi: usize) -> Self {
        debug_assert!(lo <= hi);
        Self { lo, hi }
    }

    /// Number of bin intervals spanned.
    #[inline]
    pub fn width(&self) -> usize {
        self.hi - self.lo
    }
}

/// Strictly increasing representative values of one parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscreteAxis {
    values: Vec<f64>,
    overlap: usize,
}

impl DiscreteAxis {
    /// `n_positions` evenly spaced values from `lower` to `upper`. A
    /// degenerate range `lower == upper` yields a fixed single-value axis.
    pub fn linspace(lower: f64, upper: f64, n_positions: usize, overlap: usize) -> Result<Self> {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(FinderError::invalid("axis bounds must be finite"));
        }
        if upper < lower {
            return Err(FinderError::invalid(format!(
                "inverted axis range [{lower}, {upper}]"
            )));
        }
        if lower == upper {
            return Ok(Self {
                values: vec![lower],
                overlap: 0,
            });
        }
        if n_positions < 2 {
            return Err(FinderError::invalid("axis needs at least one bin"));
        }
        let step = (upper - lower) / (n_positions - 1) as f64;
        let mut values: Vec<f64> = (0..n_positions).map(|i| lower + step * i as f64).collect();
        if let Some(last) = values.last_mut() {
            *last = upper;
        }
        Ok(Self { values, overlap })
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn full_range(&self) -> DiscreteRange {
        DiscreteRange::new(0, self.values.len() - 1)
    }

    #[inline]
    pub fn bounds(&self, range: DiscreteRange) -> (f64, f64) {
        (self.values[range.lo], self.values[range.hi])
    }

    /// Splits `range` into `divisions` overlapping children covering it.
    /// Returns the range itself when it cannot shrink any further.
    pub fn divide(&self, range: DiscreteRange, divisions: usize) -> Vec<DiscreteRange> {
        let width = range.width();
        if divisions < 2 || width <= (2 * self.overlap).max(1) {
            return vec![range];
        }
        let mut children = Vec::with_capacity(divisions);
        for i in 0..divisions {
            let start = range.lo + width * i / divisions;
            let end = range.lo + width * (i + 1) / divisions;
            let child = DiscreteRange::new(
                start.saturating_sub(self.overlap).max(range.lo),
                (end + self.overlap).min(range.hi),
            );
            if child.width() >= width {
                return vec![range];
            }
            children.push(child);
        }
        children
    }
}

/// Configuration of one search axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisParams {
    pub lower: f64,
    pub upper: f64,
    /// Number of bin intervals; the axis holds `bins + 1` values.
    pub bins: usize,
    /// Positions of deliberate overlap between sibling bins.
    pub overlap: usize,
    /// Children per node along this axis.
    pub divisions: usize,
}

impl Default for AxisParams {
    fn default() -> Self {
        Self {
            lower: -1.0,
            upper: 1.0,
            bins: 1 << 12,
            overlap: 1,
            divisions: 2,
        }
    }
}

impl AxisParams {
    pub fn new(lower: f64, upper: f64, bins: usize) -> Self {
        Self {
            lower,
            upper,
            bins,
            ..Self::default()
        }
    }

    /// Axis pinned to a single value.
    pub fn fixed(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
            bins: 1,
            overlap: 0,
            divisions: 2,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.bins == 0 {
            return Err(FinderError::invalid(format!("axis {name} has zero bins")));
        }
        if self.divisions < 2 {
            return Err(FinderError::invalid(format!(
                "axis {name} needs at least two divisions"
            )));
        }
        if !(self.lower.is_finite() && self.upper.is_finite()) || self.upper < self.lower {
            return Err(FinderError::invalid(format!(
                "axis {name} has an invalid range [{}, {}]",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    pub fn build(&self, name: &str) -> Result<DiscreteAxis> {
        self.validate(name)?;
        DiscreteAxis::linspace(self.lower, self.upper, self.bins + 1, self.overlap)
    }
}
