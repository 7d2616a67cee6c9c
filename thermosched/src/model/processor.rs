/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Processor / allocation sub-model.
//!
//! Per core `k` the net has `2n + 1` places and `2n` transitions:
//!
//! ```text
//!                 alloc_{k,i}                exec_{k,i}
//!   idle_k ─────────────────► busy_{k,i} ─────────────────► idle_k
//!                                                  └──────► exec_{k,i}   (accumulator)
//! ```
//!
//! * `λ(exec_{k,i}) = η · f_k`, `λ(alloc_{k,i}) = η · λ(exec_{k,i})`.
//! * `Π` enables `alloc_{k,i}` from `idle_k` and `exec_{k,i}` from
//!   `busy_{k,i}`, both with weight 1.
//! * The scheduler gates a core by zeroing the allocation rate of every task
//!   it did not assign to that core, see [`ProcessorModel::gated_rates`].
//!
//! Each core keeps the P-invariant `idle_k + Σ_i busy_{k,i} = 1`; the exec
//! places are sinks that integrate the execution flow.  With a fully
//! allocated core the exec flow is `≈ η·f_k` tokens per second, so one token
//! equals `base_frequency / η` cycles ([`ProcessorModel::cycles_per_token`]).

use nalgebra::{DMatrix, DVector};
use tracing::info;

use super::check_rates;
use crate::error::ConfigurationError;
use crate::platform::CpuSpecification;
use crate::task::TaskId;

/// Dense matrices of the processor Petri net.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorModel {
    pub n_tasks: usize,
    pub n_cores: usize,
    pub eta: f64,

    pub pre: DMatrix<f64>,
    pub post: DMatrix<f64>,
    /// `Post − Pre`.
    pub c: DMatrix<f64>,
    /// Columns of `C` restricted to the allocation transitions.
    pub c_alloc: DMatrix<f64>,
    /// Diagonal of Λ at the initial core frequencies, nothing gated.
    pub lambda: DVector<f64>,
    pub pi: DMatrix<f64>,

    /// `(n·m) × p` selection of the busy places, row `k·n + i`.
    pub s_busy: DMatrix<f64>,
    /// `(n·m) × p` selection of the exec places, row `k·n + i`.
    pub s_exec: DMatrix<f64>,

    pub initial_marking: DVector<f64>,

    /// Cycles represented by one token in an exec place.
    pub cycles_per_token: f64,
}

impl ProcessorModel {
    pub fn places(&self) -> usize {
        self.n_cores * (2 * self.n_tasks + 1)
    }

    pub fn transitions(&self) -> usize {
        self.n_cores * 2 * self.n_tasks
    }

    pub fn busy_place(&self, core: usize, task: TaskId) -> usize {
        core * (2 * self.n_tasks + 1) + task
    }

    pub fn exec_place(&self, core: usize, task: TaskId) -> usize {
        core * (2 * self.n_tasks + 1) + self.n_tasks + task
    }

    pub fn idle_place(&self, core: usize) -> usize {
        core * (2 * self.n_tasks + 1) + 2 * self.n_tasks
    }

    pub fn alloc_transition(&self, core: usize, task: TaskId) -> usize {
        core * 2 * self.n_tasks + task
    }

    pub fn exec_transition(&self, core: usize, task: TaskId) -> usize {
        core * 2 * self.n_tasks + self.n_tasks + task
    }

    /// Firing rates for one quantum.
    ///
    /// Execution rates follow `frequencies`; allocation into `busy_{k,i}` is
    /// enabled only when `assignment[k] == Some(i)`.
    pub fn gated_rates(
        &self,
        frequencies: &[f64],
        assignment: &[Option<TaskId>],
    ) -> Result<DVector<f64>, ConfigurationError> {
        if frequencies.len() != self.n_cores || assignment.len() != self.n_cores {
            return Err(ConfigurationError::FrequencyCountMismatch {
                expected: self.n_cores,
                found: frequencies.len().min(assignment.len()),
            });
        }
        let mut rates = DVector::zeros(self.transitions());
        for (k, (&f, &active)) in frequencies.iter().zip(assignment).enumerate() {
            let exec_rate = self.eta * f;
            for i in 0..self.n_tasks {
                rates[self.exec_transition(k, i)] = exec_rate;
            }
            if let Some(task) = active {
                if task < self.n_tasks {
                    rates[self.alloc_transition(k, task)] = self.eta * exec_rate;
                }
            }
        }
        check_rates("processor", rates.as_slice())?;
        Ok(rates)
    }

    /// `I + C·Λ·Π·h` for the given rates and sub-step length `h`.
    pub fn step_matrix(&self, rates: &DVector<f64>, h: f64) -> DMatrix<f64> {
        let mut scaled = self.c.clone();
        for (j, &rate) in rates.iter().enumerate() {
            for i in 0..scaled.nrows() {
                scaled[(i, j)] *= rate * h;
            }
        }
        let mut a = scaled * &self.pi;
        for i in 0..a.nrows() {
            a[(i, i)] += 1.0;
        }
        a
    }

    /// Executed cycles per `(core, task)`, row `k·n + i`, read from `marking`.
    pub fn executed_cycles(&self, marking: &DVector<f64>) -> DVector<f64> {
        (&self.s_exec * marking) * self.cycles_per_token
    }

    /// Core share held per `(core, task)`, row `k·n + i`.
    pub fn busy_share(&self, marking: &DVector<f64>) -> DVector<f64> {
        &self.s_busy * marking
    }

    /// `idle_k + Σ_i busy_{k,i}` for every core.
    pub fn core_mass(&self, marking: &DVector<f64>) -> Vec<f64> {
        (0..self.n_cores)
            .map(|k| {
                marking[self.idle_place(k)]
                    + (0..self.n_tasks)
                        .map(|i| marking[self.busy_place(k, i)])
                        .sum::<f64>()
            })
            .collect()
    }
}

/// Build the processor Petri net for `n_tasks` tasks on `cpu`.
///
/// # Errors
/// [`ConfigurationError::NoCores`] / [`ConfigurationError::NoTasks`] when
/// either count is zero, [`ConfigurationError::InvalidRate`] for a negative
/// `eta` or frequency.
pub fn generate_processor_model(
    n_tasks: usize,
    cpu: &CpuSpecification,
    eta: f64,
) -> Result<ProcessorModel, ConfigurationError> {
    let n = n_tasks;
    let m = cpu.number_of_cores();
    if m == 0 {
        return Err(ConfigurationError::NoCores);
    }
    if n == 0 {
        return Err(ConfigurationError::NoTasks);
    }

    let p = m * (2 * n + 1);
    let t = m * 2 * n;

    let mut pre = DMatrix::zeros(p, t);
    let mut post = DMatrix::zeros(p, t);
    let mut pi = DMatrix::zeros(t, p);
    let mut lambda = DVector::zeros(t);
    let mut s_busy = DMatrix::zeros(n * m, p);
    let mut s_exec = DMatrix::zeros(n * m, p);
    let mut initial_marking = DVector::zeros(p);

    for k in 0..m {
        let block = k * (2 * n + 1);
        let idle = block + 2 * n;
        let f = cpu.clock_relative_frequencies.get(k).copied().unwrap_or(1.0);

        for i in 0..n {
            let busy = block + i;
            let exec = block + n + i;
            let t_alloc = k * 2 * n + i;
            let t_exec = k * 2 * n + n + i;

            // alloc: idle → busy
            pre[(idle, t_alloc)] = 1.0;
            post[(busy, t_alloc)] = 1.0;

            // exec: busy → idle + exec
            pre[(busy, t_exec)] = 1.0;
            post[(idle, t_exec)] = 1.0;
            post[(exec, t_exec)] = 1.0;

            lambda[t_exec] = eta * f;
            lambda[t_alloc] = eta * eta * f;

            pi[(t_alloc, idle)] = 1.0;
            pi[(t_exec, busy)] = 1.0;

            s_busy[(k * n + i, busy)] = 1.0;
            s_exec[(k * n + i, exec)] = 1.0;
        }

        initial_marking[idle] = 1.0;
    }

    check_rates("processor", lambda.as_slice())?;

    let c = &post - &pre;
    let alloc_columns: Vec<usize> = (0..m)
        .flat_map(|k| (0..n).map(move |i| k * 2 * n + i))
        .collect();
    let c_alloc = c.select_columns(alloc_columns.iter());

    info!(
        tasks = n,
        cores = m,
        places = p,
        transitions = t,
        eta,
        "Generated processor model"
    );

    Ok(ProcessorModel {
        n_tasks: n,
        n_cores: m,
        eta,
        pre,
        post,
        c,
        c_alloc,
        lambda,
        pi,
        s_busy,
        s_exec,
        initial_marking,
        cycles_per_token: cpu.clock_base_frequency / eta,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
