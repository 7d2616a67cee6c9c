/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types of the scheduler plug-ins.
//!
//! Two types model the two failure layers:
//!
//! * [`AperiodicRejected`]: one aperiodic job could not be admitted.  Not an
//!   error path: it is returned inside
//!   [`AperiodicResponse`](super::AperiodicResponse) and ends up as a warning
//!   in the trace while the periodic schedule carries on.
//! * [`SchedulerError`]: a fatal failure of the plug-in for this run.

use serde::Serialize;
use thiserror::Error;

use crate::partition::PartitionError;
use crate::task::TaskId;

// ── Aperiodic admission ───────────────────────────────────────────────────────

/// An aperiodic job for which no available frequency leaves enough slack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AperiodicRejected {
    pub task: TaskId,
    pub arrival: f64,
    pub deadline: f64,
    /// Execution requirement in cycles.
    pub required_cycles: f64,
    /// Largest slack found (s), at the fastest candidate frequency.
    pub best_slack: f64,
}

impl std::fmt::Display for AperiodicRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "aperiodic task {} ({} cycles, window {}..{}) rejected: at most {:.6}s of slack available",
            self.task, self.required_cycles, self.arrival, self.deadline, self.best_slack
        )
    }
}

// ── Top-level scheduler errors ────────────────────────────────────────────────

/// Fatal failure of a scheduler plug-in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// `schedule_policy` or `aperiodic_arrive` was called before
    /// `offline_stage` succeeded.
    #[error("scheduler '{0}' used before its offline stage")]
    NotInitialised(&'static str),

    /// The offline stage found the periodic task set infeasible.
    #[error("offline stage failed: {0}")]
    Partition(#[from] PartitionError),

    /// A periodic period or requirement does not convert to whole cycles.
    #[error("task {task} cannot be expressed in whole cycles at {frequency_hz} Hz")]
    NonIntegralTiming { task: TaskId, frequency_hz: f64 },
}
