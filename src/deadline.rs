//! Cooperative per-event time budget.

use crate::error::{FinderError, Result};
use std::time::{Duration, Instant};

/// Point in time after which long-running stages give up.
#[derive(Clone, Copy, Debug, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn unlimited() -> Self {
        Self { expires_at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    /// Budget in milliseconds; `None` means unlimited.
    pub fn from_budget_ms(budget_ms: Option<f64>) -> Self {
        match budget_ms {
            Some(ms) if ms.is_finite() && ms >= 0.0 => Self::after(Duration::from_secs_f64(ms / 1000.0)),
            _ => Self::unlimited(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |t| Instant::now() >= t)
    }

    /// Errors with `DeadlineExceeded` once the budget is spent.
    #[inline]
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_expired() {
            Err(FinderError::DeadlineExceeded { stage })
        } else {
            Ok(())
        }
    }
}
