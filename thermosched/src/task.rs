/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task data structures for the simulator.
//!
//! Two task kinds feed the pipeline:
//!
//! ```text
//! config ──► PeriodicTask / AperiodicTask ──► TasksSpecification ──► partitioner, model generator
//!                                                   │
//!                                                   └──► SystemTask (ids assigned) ──► scheduler, simulator
//! ```
//!
//! # Identity model
//! Periodic tasks receive ids `0..n_periodic`; aperiodic tasks are appended
//! after them with fresh ids.  Every per-task row of every matrix in the
//! crate is indexed by [`TaskId`].

use serde::Serialize;

use crate::hyperperiod::{calculate_hyperperiod, HyperperiodError};

/// Index of a task inside the processor model and the scheduler tables.
pub type TaskId = usize;

// ── Energy ────────────────────────────────────────────────────────────────────

/// Optional energy figure attached to a task, in joules per job.
///
/// Kept on the task definition for post-processing only.  Neither the trace
/// nor the thermal model reads it; core power follows the frequency.
pub type EnergyCoefficient = Option<f64>;

// ── Periodic task ─────────────────────────────────────────────────────────────

/// Implicit-deadline periodic task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodicTask {
    /// Worst-case execution requirement in CPU cycles.
    pub worst_case_cycles: f64,

    /// Period in seconds.  The relative deadline equals the period.
    pub period: f64,

    pub energy: EnergyCoefficient,
}

impl PeriodicTask {
    pub fn new(worst_case_cycles: f64, period: f64) -> Self {
        Self {
            worst_case_cycles,
            period,
            energy: None,
        }
    }

    /// Utilisation at `frequency_hz`: `cycles / (period · frequency)`.
    ///
    /// Returns `0.0` when the period or frequency is not positive.
    pub fn utilization(&self, frequency_hz: f64) -> f64 {
        if self.period <= 0.0 || frequency_hz <= 0.0 {
            0.0
        } else {
            self.worst_case_cycles / (self.period * frequency_hz)
        }
    }
}

// ── Aperiodic task ────────────────────────────────────────────────────────────

/// One-shot task released at `arrival` with an absolute `deadline`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AperiodicTask {
    /// Execution requirement in CPU cycles.
    pub worst_case_cycles: f64,

    /// Release instant in seconds.
    pub arrival: f64,

    /// Absolute deadline in seconds.
    pub deadline: f64,

    pub energy: EnergyCoefficient,
}

impl AperiodicTask {
    pub fn new(worst_case_cycles: f64, arrival: f64, deadline: f64) -> Self {
        Self {
            worst_case_cycles,
            arrival,
            deadline,
            energy: None,
        }
    }
}

// ── Task set ──────────────────────────────────────────────────────────────────

/// Immutable task set of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TasksSpecification {
    pub periodic_tasks: Vec<PeriodicTask>,
    pub aperiodic_tasks: Vec<AperiodicTask>,
}

impl TasksSpecification {
    pub fn new(periodic_tasks: Vec<PeriodicTask>, aperiodic_tasks: Vec<AperiodicTask>) -> Self {
        Self {
            periodic_tasks,
            aperiodic_tasks,
        }
    }

    /// Total number of tasks (periodic first, then aperiodic).
    pub fn len(&self) -> usize {
        self.periodic_tasks.len() + self.aperiodic_tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hyperperiod in seconds of the periodic tasks.
    ///
    /// Periods are converted to whole cycles of `base_frequency_hz` before
    /// the LCM is taken, so non-integer second periods are handled as long
    /// as they are a whole number of clock ticks.
    pub fn hyperperiod(&self, base_frequency_hz: f64) -> Result<f64, HyperperiodError> {
        let ticks: Vec<u64> = self
            .periodic_tasks
            .iter()
            .map(|t| (t.period * base_frequency_hz).round() as u64)
            .collect();
        let info = calculate_hyperperiod(&ticks)?;
        Ok(info.hyperperiod as f64 / base_frequency_hz)
    }

    /// Periodic utilisation at `frequency_hz`.
    pub fn utilization(&self, frequency_hz: f64) -> f64 {
        self.periodic_tasks
            .iter()
            .map(|t| t.utilization(frequency_hz))
            .sum()
    }

    /// Assign ids: periodic tasks `0..n_p`, aperiodic tasks `n_p..`.
    pub fn system_tasks(&self) -> Vec<SystemTask> {
        let periodic = self
            .periodic_tasks
            .iter()
            .enumerate()
            .map(|(id, t)| SystemTask {
                id,
                worst_case_cycles: t.worst_case_cycles,
                kind: TaskKind::Periodic { period: t.period },
            });
        let offset = self.periodic_tasks.len();
        let aperiodic = self
            .aperiodic_tasks
            .iter()
            .enumerate()
            .map(move |(i, t)| SystemTask {
                id: offset + i,
                worst_case_cycles: t.worst_case_cycles,
                kind: TaskKind::Aperiodic {
                    arrival: t.arrival,
                    deadline: t.deadline,
                },
            });
        periodic.chain(aperiodic).collect()
    }
}

// ── SystemTask (id-carrying view) ─────────────────────────────────────────────

/// Timing behaviour of a [`SystemTask`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TaskKind {
    Periodic { period: f64 },
    Aperiodic { arrival: f64, deadline: f64 },
}

/// A task together with the id it carries during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemTask {
    pub id: TaskId,
    pub worst_case_cycles: f64,
    pub kind: TaskKind,
}

impl SystemTask {
    pub fn is_periodic(&self) -> bool {
        matches!(self.kind, TaskKind::Periodic { .. })
    }
}

/// A task that has a released, unfinished job at the current instant.
///
/// What the driver hands to [`Scheduler::schedule_policy`].
///
/// [`Scheduler::schedule_policy`]: crate::scheduler::Scheduler::schedule_policy
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableTask {
    pub id: TaskId,
    pub job_id: usize,
    /// Cycles still owed by the current job.
    pub pending_cycles: f64,
    /// Absolute deadline of the current job.
    pub deadline: f64,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
