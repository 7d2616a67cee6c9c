/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Top-level error types.
//!
//! | Type | Fatal | Raised by |
//! |---|---|---|
//! | [`ConfigurationError`] | yes | `SystemDefinition::validate`, model generators, engine preconditions, scheduler registry |
//! | [`PartitionError`](crate::partition::PartitionError) | yes | offline interval partitioner (the infeasible-schedule error) |
//! | [`SchedulerError`](crate::scheduler::SchedulerError) | yes | scheduler plug-ins |
//! | [`AperiodicRejected`](crate::scheduler::AperiodicRejected) | no | carried as a warning in the trace |
//!
//! Nothing in the crate retries: the same input always fails the same way.

use thiserror::Error;

use crate::hyperperiod::HyperperiodError;
use crate::scheduler::SchedulerError;

/// Malformed or empty system definition, or a discretisation that violates
/// the stability preconditions of the simulation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("the CPU has no cores")]
    NoCores,

    #[error("no periodic tasks provided")]
    NoTasks,

    #[error("task {task} has a non-positive period ({period})")]
    InvalidPeriod { task: usize, period: f64 },

    #[error("task {task} has a non-positive execution requirement ({cycles} cycles)")]
    InvalidCycles { task: usize, cycles: f64 },

    #[error("aperiodic task {task} has deadline {deadline} not after arrival {arrival}")]
    InvalidAperiodicWindow {
        task: usize,
        arrival: f64,
        deadline: f64,
    },

    #[error("the CPU lists no available frequencies")]
    NoFrequencies,

    #[error("expected {expected} per-core frequencies, found {found}")]
    FrequencyCountMismatch { expected: usize, found: usize },

    #[error("relative frequency {frequency} is not one of the available frequencies")]
    UnsupportedFrequency { frequency: f64 },

    #[error("core {core} does not fit on the board")]
    CoreOutsideBoard { core: usize },

    #[error("invalid simulation step: {0}")]
    InvalidStep(String),

    #[error("unknown scheduler: '{0}' (valid: jdeds, global_edf)")]
    UnknownScheduler(String),

    /// A firing rate was negative or not finite.
    #[error("transition {transition} of the {model} model has an invalid firing rate {rate}")]
    InvalidRate {
        model: &'static str,
        transition: usize,
        rate: f64,
    },

    /// `(I + A)` has a negative diagonal entry: the sub-step is too coarse for
    /// the fastest transition.  Increase the number of sub-steps.
    #[error(
        "unstable discretisation of the {model} model: place {place} has diagonal {diagonal} \
         (increase the number of sub-steps)"
    )]
    UnstableStep {
        model: &'static str,
        place: usize,
        diagonal: f64,
    },
}

/// Error returned by [`simulate`](crate::simulator::simulate).
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// No horizon was given and the hyperperiod could not be computed.
    #[error("cannot derive the simulation horizon: {0}")]
    Hyperperiod(#[from] HyperperiodError),
}
