/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler plug-ins.
//!
//! Every scheduler implements [`Scheduler`], the three-operation contract the
//! simulation driver consumes, and is selected by name through [`by_name`].
//!
//! | Name | Type | Policy |
//! |---|---|---|
//! | `"jdeds"` | [`JdedsScheduler`] | offline LP interval table, laxity-driven online assignment, DVFS, aperiodic admission |
//! | `"global_edf"` | [`GlobalEdfScheduler`] | earliest absolute deadline first on all cores |
//!
//! A scheduler instance owns all of its bookkeeping; two simulations never
//! share one.
//!
//! # Example
//! ```rust,ignore
//! let mut scheduler = scheduler::by_name(&system.scheduler)?;
//! let trace = simulator::simulate(&system, scheduler.as_mut())?;
//! ```

pub mod affinity;
pub mod edf;
pub mod error;
pub mod jdeds;

pub use edf::GlobalEdfScheduler;
pub use error::{AperiodicRejected, SchedulerError};
pub use jdeds::JdedsScheduler;

use crate::error::ConfigurationError;
use crate::system::SystemDefinition;
use crate::task::{ExecutableTask, SystemTask, TaskId};

/// Names accepted by [`by_name`].
pub const SCHEDULER_NAMES: &[&str] = &["jdeds", "global_edf"];

// ── Contract ──────────────────────────────────────────────────────────────────

/// Output of one call to [`Scheduler::schedule_policy`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Task per core for the next quantum; `None` is the idle task.
    pub assignment: Vec<Option<TaskId>>,
    /// Length of the next quantum.  `None` keeps the offline quantum.
    pub quantum: Option<f64>,
    /// Relative frequency per core.  `None` keeps the current frequencies.
    pub frequencies: Option<Vec<f64>>,
}

/// Output of [`Scheduler::aperiodic_arrive`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AperiodicResponse {
    /// Call `schedule_policy` at once rather than waiting for a trigger.
    pub reschedule_now: bool,
    /// Arrivals that could not be admitted.
    pub rejected: Vec<AperiodicRejected>,
}

/// The capability every scheduler plug-in provides to the driver.
pub trait Scheduler: Send {
    fn name(&self) -> &'static str;

    /// Prepare for a run and return the scheduling quantum (s).
    fn offline_stage(
        &mut self,
        system: &SystemDefinition,
        periodic_tasks: &[SystemTask],
        aperiodic_tasks: &[SystemTask],
    ) -> Result<f64, SchedulerError>;

    /// Decide the next quantum.
    ///
    /// `executable` lists tasks with a released, unfinished job;
    /// `active` is the current assignment per core.
    fn schedule_policy(
        &mut self,
        time: f64,
        executable: &[ExecutableTask],
        active: &[Option<TaskId>],
        frequencies: &[f64],
        temperatures: Option<&[f64]>,
    ) -> Result<Decision, SchedulerError>;

    /// React to aperiodic jobs released at `time`.
    fn aperiodic_arrive(
        &mut self,
        time: f64,
        arrived: &[SystemTask],
        frequencies: &[f64],
        temperatures: Option<&[f64]>,
    ) -> Result<AperiodicResponse, SchedulerError>;
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Fresh scheduler instance for `name`.
///
/// # Errors
/// [`ConfigurationError::UnknownScheduler`] for a name not in
/// [`SCHEDULER_NAMES`].
pub fn by_name(name: &str) -> Result<Box<dyn Scheduler>, ConfigurationError> {
    match name {
        "jdeds" => Ok(Box::new(JdedsScheduler::new())),
        "global_edf" => Ok(Box::new(GlobalEdfScheduler::new())),
        other => Err(ConfigurationError::UnknownScheduler(other.to_string())),
    }
}

/// Round `value` to `decimals` decimal digits.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

// ── Tests ─────────────────────────────────────────────────────────────────────
