/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Offline interval partitioner.
//!
//! Splits the hyperperiod at every job deadline and solves a linear program
//! for `x[i][j]`, the execution time task `i` receives in interval `j`:
//!
//! | Constraint | Form |
//! |---|---|
//! | capacity | `Σ_i x[i][j] = m · len_j` |
//! | job deadline at `sd[j+1]` | `Σ_{k≤j} x[i][k] = q · c_i` |
//! | other boundary | `Σ_{k≤j} x[i][k] ≥ q · c_i + max(0, r − (t_i − c_i))` |
//! | single core per task | `0 ≤ x[i][j] ≤ len_j` |
//!
//! with `q = ⌊sd[j+1] / t_i⌋` and `r = sd[j+1] mod t_i`.  The objective
//! maximises `Σ x`.  Idle capacity is absorbed by dummy tasks of period `H`
//! that are stripped from the result.
//!
//! Inputs are integers in a common unit (cycles, or periods expressed in
//! cycles at the operating frequency).

pub mod feasibility;

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use thiserror::Error;
use tracing::{debug, info};

use crate::hyperperiod::{calculate_hyperperiod, HyperperiodError};

use feasibility::{first_overlong_task, total_utilization};

/// Allocations below this are reported as zero.
const SOLVER_EPSILON: f64 = 1e-9;

// ── Error type ────────────────────────────────────────────────────────────────

/// Failure of the offline stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    #[error("no periodic tasks to partition")]
    Empty,

    #[error("{cycles} execution requirements given for {periods} periods")]
    LengthMismatch { cycles: usize, periods: usize },

    #[error("the platform has no cores")]
    NoCores,

    /// The linear program has no solution.  This is the infeasible-schedule
    /// error: `utilization` is the bound the caller should bring under
    /// `capacity`.
    #[error("infeasible schedule: utilization {utilization:.4} on capacity {capacity}")]
    Infeasible { utilization: f64, capacity: f64 },

    #[error("no available frequency reaches the required relative frequency {required:.4}")]
    NoFeasibleFrequency { required: f64 },

    #[error("hyperperiod: {0}")]
    Hyperperiod(#[from] HyperperiodError),
}

// ── IntervalPartition ─────────────────────────────────────────────────────────

/// Solution of the offline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalPartition {
    /// `allocation[i][j]`: time task `i` executes in interval `j`.
    pub allocation: Vec<Vec<f64>>,

    /// `sd[0] = 0 < sd[1] < … < sd[k] = hyperperiod`.
    pub breakpoints: Vec<f64>,

    pub hyperperiod: f64,

    /// `sd[j+1] − sd[j]`.
    pub interval_lengths: Vec<f64>,

    /// Capacity left idle in each interval (the stripped dummy tasks).
    pub idle: Vec<f64>,
}

impl IntervalPartition {
    pub fn task_count(&self) -> usize {
        self.allocation.len()
    }

    pub fn interval_count(&self) -> usize {
        self.interval_lengths.len()
    }

    /// `Σ_i x[i][j]` over the real tasks.
    pub fn interval_load(&self, interval: usize) -> f64 {
        self.allocation.iter().map(|row| row[interval]).sum()
    }

    /// The same partition with every time value divided by `divisor`.
    ///
    /// Converts a cycle-unit solution into seconds at a given clock.
    pub fn scaled(&self, divisor: f64) -> Self {
        let div = |v: &f64| v / divisor;
        Self {
            allocation: self
                .allocation
                .iter()
                .map(|row| row.iter().map(div).collect())
                .collect(),
            breakpoints: self.breakpoints.iter().map(div).collect(),
            hyperperiod: self.hyperperiod / divisor,
            interval_lengths: self.interval_lengths.iter().map(div).collect(),
            idle: self.idle.iter().map(div).collect(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Partition the hyperperiod of `cycles`/`periods` across `m` cores.
///
/// # Errors
/// * [`PartitionError::Infeasible`] – a task needs more than its period, the
///   total utilisation exceeds `m`, or the linear program has no solution.
/// * [`PartitionError::Hyperperiod`] – the LCM of the periods overflows.
pub fn partition(
    cycles: &[u64],
    periods: &[u64],
    m: usize,
) -> Result<IntervalPartition, PartitionError> {
    if cycles.is_empty() {
        return Err(PartitionError::Empty);
    }
    if cycles.len() != periods.len() {
        return Err(PartitionError::LengthMismatch {
            cycles: cycles.len(),
            periods: periods.len(),
        });
    }
    if m == 0 {
        return Err(PartitionError::NoCores);
    }

    let capacity = m as f64;
    let c: Vec<f64> = cycles.iter().map(|&v| v as f64).collect();
    let t: Vec<f64> = periods.iter().map(|&v| v as f64).collect();
    let utilization = total_utilization(&c, &t);
    let infeasible = PartitionError::Infeasible {
        utilization,
        capacity,
    };

    if periods.contains(&0) || first_overlong_task(&c, &t).is_some() {
        return Err(infeasible);
    }
    if utilization > capacity + SOLVER_EPSILON {
        return Err(infeasible);
    }

    let info = calculate_hyperperiod(periods)?;
    let h = info.hyperperiod;
    let sd = breakpoints(periods, h);

    // Real tasks first, then idle dummies of period H
    let demand: f64 = c
        .iter()
        .zip(periods)
        .map(|(&ci, &ti)| ci * info.jobs_of(ti) as f64)
        .sum();
    let idle = (capacity * h as f64 - demand).max(0.0);
    let n_real = c.len();
    let mut all_c = c;
    let mut all_t: Vec<u64> = periods.to_vec();
    if idle > SOLVER_EPSILON {
        let dummies = (idle / h as f64).ceil().max(1.0) as usize;
        for _ in 0..dummies {
            all_c.push(idle / dummies as f64);
            all_t.push(h);
        }
    }

    let x = solve(&all_c, &all_t, &sd, m).ok_or(infeasible)?;

    let intervals = sd.len() - 1;
    let interval_lengths: Vec<f64> = sd.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let allocation: Vec<Vec<f64>> = x.iter().take(n_real).cloned().collect();
    let idle_per_interval: Vec<f64> = (0..intervals)
        .map(|j| x.iter().skip(n_real).map(|row| row[j]).sum())
        .collect();

    info!(
        tasks = n_real,
        dummies = all_c.len() - n_real,
        intervals,
        hyperperiod = h,
        utilization,
        "Interval partition solved"
    );

    Ok(IntervalPartition {
        allocation,
        breakpoints: sd.iter().map(|&v| v as f64).collect(),
        hyperperiod: h as f64,
        interval_lengths,
        idle: idle_per_interval,
    })
}

/// Sorted union of every job deadline in `(0, h]`, plus `0`.
fn breakpoints(periods: &[u64], h: u64) -> Vec<u64> {
    let mut sd: Vec<u64> = periods
        .iter()
        .filter(|&&t| t > 0)
        .flat_map(|&t| (1..=h / t).map(move |q| q * t))
        .collect();
    sd.push(0);
    sd.sort_unstable();
    sd.dedup();
    sd
}

/// Build and solve the linear program.  `None` when infeasible.
fn solve(c: &[f64], t: &[u64], sd: &[u64], m: usize) -> Option<Vec<Vec<f64>>> {
    let n = c.len();
    let intervals = sd.len() - 1;

    let mut problem = Problem::new(OptimizationDirection::Maximize);
    let mut vars = Vec::with_capacity(n * intervals);
    for j in 0..intervals {
        let len = (sd[j + 1] - sd[j]) as f64;
        for _ in 0..n {
            vars.push(problem.add_var(1.0, (0.0, len)));
        }
    }
    let var = |i: usize, j: usize| vars[j * n + i];

    // Capacity
    for j in 0..intervals {
        let mut expr = LinearExpr::empty();
        for i in 0..n {
            expr.add(var(i, j), 1.0);
        }
        let len = (sd[j + 1] - sd[j]) as f64;
        problem.add_constraint(expr, ComparisonOp::Eq, m as f64 * len);
    }

    // Temporal
    let mut equalities = 0usize;
    let mut lower_bounds = 0usize;
    for j in 0..intervals {
        let boundary = sd[j + 1];
        for i in 0..n {
            let q = (boundary / t[i]) as f64;
            let r = (boundary % t[i]) as f64;
            let mut expr = LinearExpr::empty();
            for k in 0..=j {
                expr.add(var(i, k), 1.0);
            }
            if r == 0.0 {
                problem.add_constraint(expr, ComparisonOp::Eq, q * c[i]);
                equalities += 1;
            } else {
                let laxity = t[i] as f64 - c[i];
                let bound = q * c[i] + (r - laxity).max(0.0);
                if bound > 0.0 {
                    problem.add_constraint(expr, ComparisonOp::Ge, bound);
                    lower_bounds += 1;
                }
            }
        }
    }

    debug!(
        variables = n * intervals,
        equalities,
        lower_bounds,
        "Solving interval partition"
    );

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(e) => {
            debug!(error = %e, "Interval partition has no solution");
            return None;
        }
    };

    Some(
        (0..n)
            .map(|i| {
                (0..intervals)
                    .map(|j| {
                        let v = solution[var(i, j)];
                        if v.abs() < SOLVER_EPSILON {
                            0.0
                        } else {
                            v
                        }
                    })
                    .collect()
            })
            .collect(),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
