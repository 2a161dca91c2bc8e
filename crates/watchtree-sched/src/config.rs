//! Event loop configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

// ── LoopConfig ─────────────────────────────────────────────────────

/// Configuration for an [`EventLoop`](crate::EventLoop).
#[derive(Clone, Debug, Default)]
pub struct LoopConfig {
    /// Target turn rate for [`run_for`](crate::EventLoop::run_for).
    /// `None` runs turns back to back. Default: `None`.
    pub turn_rate_hz: Option<f64>,
    /// Maximum tasks run in a single turn. Tasks beyond the budget stay
    /// queued for the next turn. `None` = unbounded. Default: `None`.
    pub max_tasks_per_turn: Option<usize>,
}

impl LoopConfig {
    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(hz) = self.turn_rate_hz {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(ConfigError::InvalidTurnRate { value: hz });
            }
        }
        if self.max_tasks_per_turn == Some(0) {
            return Err(ConfigError::ZeroTaskBudget);
        }
        Ok(())
    }

    /// Wall-clock budget of one turn, if a turn rate is set.
    pub fn turn_budget(&self) -> Option<Duration> {
        self.turn_rate_hz.map(|hz| Duration::from_secs_f64(1.0 / hz))
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`LoopConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// turn_rate_hz is NaN, infinite, zero, or negative.
    InvalidTurnRate {
        /// The invalid value.
        value: f64,
    },
    /// max_tasks_per_turn is zero; no task could ever run.
    ZeroTaskBudget,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTurnRate { value } => {
                write!(f, "turn_rate_hz must be finite and positive, got {value}")
            }
            Self::ZeroTaskBudget => write!(f, "max_tasks_per_turn must be at least 1"),
        }
    }
}

impl Error for ConfigError {}
