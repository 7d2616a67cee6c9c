/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hyperperiod calculation.
//!
//! The hyperperiod of a set of periodic tasks is the Least Common Multiple
//! (LCM) of all their periods.  It is the window the offline interval table
//! covers and the simulation replays.
//!
//! Periods are integers here: callers express them in clock ticks (base
//! frequency) or in cycles at the selected operating frequency, see
//! [`TasksSpecification::hyperperiod`](crate::task::TasksSpecification::hyperperiod)
//! and [`partition`](crate::partition).

pub mod math;

use tracing::{debug, warn};

use math::lcm_of_slice;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The period slice was empty (or every period was zero).
    NoValidPeriods,

    /// LCM calculation overflowed `u64`.
    ///
    /// Contains the two operands that caused the overflow.
    Overflow { a: u64, b: u64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no tasks with a valid (non-zero) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod of one task set.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperperiodInfo {
    /// LCM of all non-zero periods, in the caller's integer unit.
    pub hyperperiod: u64,
}

impl HyperperiodInfo {
    /// Number of jobs a task of `period` releases within one hyperperiod.
    pub fn jobs_of(&self, period: u64) -> u64 {
        if period == 0 {
            0
        } else {
            self.hyperperiod / period
        }
    }
}

/// Calculate the hyperperiod of `periods`.
///
/// # Errors
/// * [`HyperperiodError::NoValidPeriods`] – every period was zero.
/// * [`HyperperiodError::Overflow`] – LCM computation exceeded `u64`.
pub fn calculate_hyperperiod(periods: &[u64]) -> Result<HyperperiodInfo, HyperperiodError> {
    let valid: Vec<u64> = periods.iter().copied().filter(|&p| p > 0).collect();

    if valid.is_empty() {
        warn!("No tasks with valid periods found");
        return Err(HyperperiodError::NoValidPeriods);
    }

    // Collect unique periods (sorted for deterministic output)
    let unique_periods: Vec<u64> = {
        let mut v = valid.clone();
        v.sort_unstable();
        v.dedup();
        v
    };

    let hyperperiod = lcm_of_slice(&unique_periods)?;

    debug!(
        task_count = valid.len(),
        unique_count = unique_periods.len(),
        hyperperiod,
        "Calculated hyperperiod"
    );

    Ok(HyperperiodInfo { hyperperiod })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_hyperperiod_two_periods() {
        let info = calculate_hyperperiod(&[4, 8]).unwrap();
        assert_eq!(info.hyperperiod, 8);
    }

    #[test]
    fn hyperperiod_three_periods_lcm() {
        let info = calculate_hyperperiod(&[4, 8, 12]).unwrap();
        assert_eq!(info.hyperperiod, 24);
    }

    #[test]
    fn jobs_per_task_divide_hyperperiod() {
        let info = calculate_hyperperiod(&[4, 8, 12]).unwrap();
        assert_eq!(info.jobs_of(4), 6);
        assert_eq!(info.jobs_of(8), 3);
        assert_eq!(info.jobs_of(12), 2);
        assert_eq!(info.jobs_of(0), 0);
    }

    #[test]
    fn empty_periods_returns_no_valid_periods_error() {
        let result = calculate_hyperperiod(&[]);
        assert_eq!(result.unwrap_err(), HyperperiodError::NoValidPeriods);
    }

    #[test]
    fn all_zero_periods_returns_no_valid_periods_error() {
        let result = calculate_hyperperiod(&[0, 0]);
        assert_eq!(result.unwrap_err(), HyperperiodError::NoValidPeriods);
    }

    #[test]
    fn zero_periods_are_skipped() {
        let info = calculate_hyperperiod(&[0, 6, 4]).unwrap();
        assert_eq!(info.hyperperiod, 12);
    }

    #[test]
    fn repeated_periods_do_not_change_the_result() {
        let info = calculate_hyperperiod(&[5, 1, 5, 2]).unwrap();
        assert_eq!(info.hyperperiod, 10);
    }

    #[test]
    fn overflowing_lcm_is_reported() {
        let result = calculate_hyperperiod(&[u64::MAX, u64::MAX - 1]);
        assert!(matches!(result, Err(HyperperiodError::Overflow { .. })));
    }
}
