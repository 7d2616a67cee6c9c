/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! JDEDS: interval-table global scheduler with frequency selection.
//!
//! # Offline stage
//! 1. `φ* = max(f_min, U / (m · f_max))`; the operating frequency `f*` is the
//!    smallest available frequency `≥ φ*`.
//! 2. Periods are converted to cycles at `f*` and the hyperperiod is
//!    partitioned ([`crate::partition::partition`]).  The solution, divided by
//!    `f*` in Hz, is the time every task is owed in every interval.
//!
//! # Online stage
//! Each quantum the residual of every running task shrinks.  A new assignment
//! is computed only when a trigger fires: a running task exhausted its share,
//! some task reached zero laxity, an interval boundary was crossed, or an
//! aperiodic job was admitted.  The assignment is zero-laxity tasks, then
//! running tasks, then the rest by descending residual, then idle.
//!
//! All residuals are kept in *reference seconds*: seconds of execution at
//! `f*`.  Running for `dt` at frequency `f` consumes `dt · f / f*` of them.
//!
//! # Aperiodic admission
//! For each candidate frequency `f ≥` the current one, slack is summed over
//! the current interval (from now), every following interval that ends
//! before the deadline, and the part of the last interval up to the
//! deadline.  The lowest frequency whose slack covers the job plus one
//! quantum is selected and that amount is spread over those intervals,
//! earliest first.  The raised frequency holds until every admitted job's
//! windows have passed.

use tracing::{debug, info, warn};

use super::affinity::apply_affinity;
use super::{round_to, AperiodicRejected, AperiodicResponse, Decision, Scheduler, SchedulerError};
use crate::partition::feasibility::{
    candidate_frequencies, minimum_relative_frequency, total_utilization,
};
use crate::partition::{partition, PartitionError};
use crate::system::SystemDefinition;
use crate::task::{ExecutableTask, SystemTask, TaskId, TaskKind};

/// Relative tolerance when converting a time to whole cycles.
const INTEGRAL_TOLERANCE: f64 = 1e-6;

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct JdedsScheduler {
    state: Option<JdedsState>,
}

impl JdedsScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookkeeping of the current run; `None` before the offline stage.
    pub fn state(&self) -> Option<&JdedsState> {
        self.state.as_ref()
    }
}

impl Scheduler for JdedsScheduler {
    fn name(&self) -> &'static str {
        "jdeds"
    }

    fn offline_stage(
        &mut self,
        system: &SystemDefinition,
        periodic_tasks: &[SystemTask],
        aperiodic_tasks: &[SystemTask],
    ) -> Result<f64, SchedulerError> {
        let state = JdedsState::build(system, periodic_tasks, aperiodic_tasks)?;
        let dt = state.dt;
        self.state = Some(state);
        Ok(dt)
    }

    fn schedule_policy(
        &mut self,
        time: f64,
        executable: &[ExecutableTask],
        active: &[Option<TaskId>],
        frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> Result<Decision, SchedulerError> {
        let state = self
            .state
            .as_mut()
            .ok_or(SchedulerError::NotInitialised("jdeds"))?;

        let new_interval = state.advance_interval(time);
        let runnable: Vec<TaskId> = executable.iter().map(|t| t.id).collect();

        let mut next = if state.needs_reschedule(time, &runnable, active, new_interval) {
            let next = state.assign(time, &runnable, active);
            debug!(time, interval = state.interval, assignment = ?next, "JDEDS reschedule");
            next
        } else {
            active.to_vec()
        };
        next.resize(state.cores, None);

        state.consume(&next);
        apply_affinity(active, &mut next, frequencies);

        Ok(Decision {
            assignment: next,
            quantum: None,
            frequencies: Some(vec![state.frequency; state.cores]),
        })
    }

    fn aperiodic_arrive(
        &mut self,
        time: f64,
        arrived: &[SystemTask],
        _frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> Result<AperiodicResponse, SchedulerError> {
        let state = self
            .state
            .as_mut()
            .ok_or(SchedulerError::NotInitialised("jdeds"))?;

        let mut response = AperiodicResponse::default();
        for task in arrived {
            let TaskKind::Aperiodic { arrival, deadline } = task.kind else {
                continue;
            };
            match state.admit(time, task.id, task.worst_case_cycles, deadline) {
                Ok(frequency) => {
                    info!(
                        task = task.id,
                        time,
                        deadline,
                        frequency,
                        "Aperiodic task admitted"
                    );
                    response.reschedule_now = true;
                }
                Err(best_slack) => {
                    let rejection = AperiodicRejected {
                        task: task.id,
                        arrival,
                        deadline,
                        required_cycles: task.worst_case_cycles,
                        best_slack,
                    };
                    warn!(%rejection, "Aperiodic task rejected");
                    response.rejected.push(rejection);
                }
            }
        }
        Ok(response)
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Requirement of one admitted aperiodic job, per interval.
#[derive(Debug, Clone, PartialEq)]
struct AperiodicAllocation {
    task: TaskId,
    /// Global index of the interval `work[0]` belongs to.
    first_interval: usize,
    /// Reference seconds per interval.
    work: Vec<f64>,
}

impl AperiodicAllocation {
    fn work_in(&self, interval: usize) -> f64 {
        interval
            .checked_sub(self.first_interval)
            .and_then(|k| self.work.get(k))
            .copied()
            .unwrap_or(0.0)
    }

    fn last_interval(&self) -> usize {
        self.first_interval + self.work.len().saturating_sub(1)
    }
}

/// Everything JDEDS tracks during one run.
///
/// Intervals carry a *global* index that keeps counting across hyperperiod
/// repetitions; interval `g` replays table column `g mod k`.
#[derive(Debug, Clone)]
pub struct JdedsState {
    cores: usize,
    decimals: u32,
    dt: f64,
    base_hz: f64,

    f_star: f64,
    frequency: f64,
    possible_f: Vec<f64>,

    /// Interval ends within one hyperperiod (s), last is the hyperperiod.
    intervals_end: Vec<f64>,
    hyperperiod: f64,

    periodic_ids: Vec<TaskId>,
    /// `periodic_allocation[r][j]` for task `periodic_ids[r]`, reference seconds.
    periodic_allocation: Vec<Vec<f64>>,
    aperiodic: Vec<AperiodicAllocation>,
    /// Absolute deadline of admitted aperiodic tasks.
    deadlines: Vec<Option<f64>>,

    /// Residual per task id in the current interval, reference seconds.
    interval_cc_left: Vec<f64>,
    interval: usize,
    interval_end: f64,
    aperiodic_arrived: bool,
}

impl JdedsState {
    fn build(
        system: &SystemDefinition,
        periodic_tasks: &[SystemTask],
        aperiodic_tasks: &[SystemTask],
    ) -> Result<Self, SchedulerError> {
        let cpu = &system.cpu;
        let m = cpu.number_of_cores();
        let base_hz = cpu.clock_base_frequency;

        let periodic: Vec<(TaskId, f64, f64)> = periodic_tasks
            .iter()
            .filter_map(|t| match t.kind {
                TaskKind::Periodic { period } => Some((t.id, t.worst_case_cycles, period)),
                TaskKind::Aperiodic { .. } => None,
            })
            .collect();
        if periodic.is_empty() {
            return Err(PartitionError::Empty.into());
        }

        // Frequency selection
        let cycles: Vec<f64> = periodic.iter().map(|&(_, c, _)| c).collect();
        let ticks: Vec<f64> = periodic.iter().map(|&(_, _, t)| t * base_hz).collect();
        let utilization = total_utilization(&cycles, &ticks);
        let f_max = cpu.max_frequency();
        let phi = minimum_relative_frequency(utilization, m, cpu.min_frequency(), f_max);
        let possible_f = candidate_frequencies(&cpu.clock_available_frequencies, phi);
        let Some(&f_star) = possible_f.first() else {
            let capacity = m as f64 * f_max;
            let err = if utilization > capacity {
                PartitionError::Infeasible {
                    utilization,
                    capacity,
                }
            } else {
                PartitionError::NoFeasibleFrequency { required: phi }
            };
            return Err(err.into());
        };
        let f_star_hz = (f_star * base_hz).round();

        // Offline partition in cycles at f*
        let mut cc = Vec::with_capacity(periodic.len());
        let mut tc = Vec::with_capacity(periodic.len());
        for &(id, c, t) in &periodic {
            cc.push(whole_cycles(id, c, f_star_hz)?);
            tc.push(whole_cycles(id, t * f_star_hz, f_star_hz)?);
        }
        let table = partition(&cc, &tc, m)?.scaled(f_star_hz);

        let decimals = system.simulation.float_round;
        let intervals_end: Vec<f64> = table.breakpoints[1..]
            .iter()
            .map(|&v| round_to(v, decimals))
            .collect();

        let n_total = periodic_tasks
            .iter()
            .chain(aperiodic_tasks)
            .map(|t| t.id + 1)
            .max()
            .unwrap_or(0);

        info!(
            scheduler = "jdeds",
            utilization,
            phi_star = phi,
            f_star,
            hyperperiod = table.hyperperiod,
            intervals = intervals_end.len(),
            "Offline stage complete"
        );

        let mut state = Self {
            cores: m,
            decimals,
            dt: system.simulation.dt,
            base_hz,
            f_star,
            frequency: f_star,
            possible_f,
            interval_end: intervals_end[0],
            intervals_end,
            hyperperiod: round_to(table.hyperperiod, decimals),
            periodic_ids: periodic.iter().map(|&(id, _, _)| id).collect(),
            periodic_allocation: table.allocation,
            aperiodic: Vec::new(),
            deadlines: vec![None; n_total],
            interval_cc_left: vec![0.0; n_total],
            interval: 0,
            aperiodic_arrived: true,
        };
        state.load_interval();
        Ok(state)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Global index of the current interval.
    pub fn interval_index(&self) -> usize {
        self.interval
    }

    pub fn interval_end(&self) -> f64 {
        self.interval_end
    }

    pub fn f_star(&self) -> f64 {
        self.f_star
    }

    /// Frequency every core runs at.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn intervals_end(&self) -> &[f64] {
        &self.intervals_end
    }

    pub fn periodic_allocation(&self) -> &[Vec<f64>] {
        &self.periodic_allocation
    }

    pub fn interval_cc_left(&self) -> &[f64] {
        &self.interval_cc_left
    }

    /// Reference seconds granted to an admitted aperiodic task.
    pub fn admitted_work(&self, task: TaskId) -> f64 {
        self.aperiodic
            .iter()
            .filter(|a| a.task == task)
            .flat_map(|a| a.work.iter())
            .sum()
    }

    // ── Interval table ────────────────────────────────────────────────────────

    fn round(&self, value: f64) -> f64 {
        round_to(value, self.decimals)
    }

    /// `(start, end)` of global interval `g`.
    fn interval_bounds(&self, g: usize) -> (f64, f64) {
        let k = self.intervals_end.len();
        let offset = (g / k) as f64 * self.hyperperiod;
        let j = g % k;
        let start = if j == 0 { 0.0 } else { self.intervals_end[j - 1] };
        (self.round(offset + start), self.round(offset + self.intervals_end[j]))
    }

    /// Reference seconds owed per task id in global interval `g`.
    pub(crate) fn interval_demand(&self, g: usize) -> Vec<f64> {
        let j = g % self.intervals_end.len();
        let mut demand = vec![0.0; self.interval_cc_left.len()];
        for (row, &id) in self.periodic_ids.iter().enumerate() {
            demand[id] = self.periodic_allocation[row][j];
        }
        for a in &self.aperiodic {
            demand[a.task] += a.work_in(g);
        }
        demand
    }

    fn load_interval(&mut self) {
        self.interval_cc_left = self.interval_demand(self.interval);
    }

    /// Move to the interval containing `time`.  `true` if a boundary was
    /// crossed.
    fn advance_interval(&mut self, time: f64) -> bool {
        let now = self.round(time);
        let mut advanced = false;
        while now >= self.interval_end {
            self.interval += 1;
            self.interval_end = self.interval_bounds(self.interval).1;
            advanced = true;
        }
        if advanced {
            let current = self.interval;
            self.aperiodic.retain(|a| a.last_interval() >= current);
            if self.aperiodic.is_empty() && self.frequency != self.f_star {
                info!(
                    from = self.frequency,
                    to = self.f_star,
                    "Aperiodic load drained, restoring operating frequency"
                );
                self.frequency = self.f_star;
            }
            self.load_interval();
        }
        advanced
    }

    // ── Online policy ─────────────────────────────────────────────────────────

    fn residual(&self, id: TaskId) -> f64 {
        self.round(self.interval_cc_left.get(id).copied().unwrap_or(0.0))
    }

    /// Time left before `id` must run without pause.
    ///
    /// Admitted aperiodic jobs keep one quantum in hand before their own
    /// deadline for the switch-in delay of the processor net.
    fn laxity(&self, id: TaskId, time: f64) -> f64 {
        let needed = self.interval_cc_left[id] * self.f_star / self.frequency;
        let end = match self.deadlines.get(id).copied().flatten() {
            Some(deadline) if deadline - self.dt < self.interval_end => deadline - self.dt,
            _ => self.interval_end,
        };
        self.round(end - time - needed)
    }

    fn needs_reschedule(
        &mut self,
        time: f64,
        runnable: &[TaskId],
        active: &[Option<TaskId>],
        new_interval: bool,
    ) -> bool {
        let ended = active
            .iter()
            .flatten()
            .any(|&id| self.residual(id) <= 0.0 || !runnable.contains(&id));
        let zero_laxity = (0..self.interval_cc_left.len())
            .any(|id| self.residual(id) > 0.0 && self.laxity(id, time) <= 0.0);
        let boundary = new_interval || self.round(time) == 0.0;
        let arrived = std::mem::take(&mut self.aperiodic_arrived);
        ended || zero_laxity || boundary || arrived
    }

    fn assign(
        &self,
        time: f64,
        runnable: &[TaskId],
        active: &[Option<TaskId>],
    ) -> Vec<Option<TaskId>> {
        let candidates: Vec<TaskId> = (0..self.interval_cc_left.len())
            .filter(|&id| self.residual(id) > 0.0 && runnable.contains(&id))
            .collect();

        let (zero_laxity, rest): (Vec<TaskId>, Vec<TaskId>) = candidates
            .into_iter()
            .partition(|&id| self.laxity(id, time) <= 0.0);
        let (running, mut others): (Vec<TaskId>, Vec<TaskId>) =
            rest.into_iter().partition(|&id| active.contains(&Some(id)));
        others.sort_by(|&a, &b| {
            self.interval_cc_left[b].total_cmp(&self.interval_cc_left[a])
        });

        zero_laxity
            .into_iter()
            .chain(running)
            .chain(others)
            .map(Some)
            .chain(std::iter::repeat(None))
            .take(self.cores)
            .collect()
    }

    fn consume(&mut self, assignment: &[Option<TaskId>]) {
        let used = self.dt * self.frequency / self.f_star;
        for &id in assignment.iter().flatten() {
            if let Some(cc) = self.interval_cc_left.get_mut(id) {
                *cc -= used;
            }
        }
    }

    // ── Aperiodic admission ───────────────────────────────────────────────────

    fn ensure_task(&mut self, id: TaskId) {
        if id >= self.interval_cc_left.len() {
            self.interval_cc_left.resize(id + 1, 0.0);
            self.deadlines.resize(id + 1, None);
        }
    }

    /// Slack (s at `f`) per global interval from `time` up to `deadline`.
    fn slack_windows(&self, time: f64, deadline: f64, f: f64) -> Vec<(usize, f64)> {
        let m = self.cores as f64;
        let ratio = self.f_star / f;

        let load: f64 = self.interval_cc_left.iter().map(|c| c.max(0.0)).sum::<f64>() * ratio;
        let own = (self.interval_end.min(deadline) - time).max(0.0);
        let current = own.min(m * (self.interval_end - time) - load).max(0.0);
        let mut windows = vec![(self.interval, self.round(current))];

        let deadline = self.round(deadline);
        let mut g = self.interval;
        let mut end = self.interval_end;
        while end < deadline {
            g += 1;
            let (start, next_end) = self.interval_bounds(g);
            end = next_end;
            let load: f64 = self.interval_demand(g).iter().sum::<f64>() * ratio;
            let own = (end.min(deadline) - start).max(0.0);
            let slack = own.min(m * (end - start) - load).max(0.0);
            windows.push((g, self.round(slack)));
        }
        windows
    }

    /// Admit an aperiodic job, returning the frequency selected, or the best
    /// slack found when none suffices.
    fn admit(&mut self, time: f64, id: TaskId, cycles: f64, deadline: f64) -> Result<f64, f64> {
        let candidates: Vec<f64> = self
            .possible_f
            .iter()
            .copied()
            .filter(|&f| f >= self.frequency)
            .collect();

        let mut best_slack = 0.0;
        for f in candidates {
            let windows = self.slack_windows(time, deadline, f);
            let total: f64 = windows.iter().map(|&(_, s)| s).sum();
            best_slack = total;
            // one quantum on top of the requirement for the switch-in delay
            let needed = cycles / (f * self.base_hz) + self.dt;
            if self.round(total - needed) < 0.0 {
                continue;
            }

            let mut remaining = needed;
            let mut work = Vec::with_capacity(windows.len());
            for &(_, slack) in &windows {
                if remaining <= 0.0 {
                    break;
                }
                let take = slack.min(remaining);
                work.push(take * f / self.f_star);
                remaining -= take;
            }

            self.ensure_task(id);
            if let Some(&now) = work.first() {
                self.interval_cc_left[id] += now;
            }
            self.deadlines[id] = Some(deadline);
            self.aperiodic.push(AperiodicAllocation {
                task: id,
                first_interval: self.interval,
                work,
            });
            if f > self.frequency {
                info!(from = self.frequency, to = f, "Raising operating frequency");
                self.frequency = f;
            }
            self.aperiodic_arrived = true;
            return Ok(f);
        }
        Err(best_slack)
    }
}

/// `value` as a whole number of cycles, or an error naming the task.
fn whole_cycles(task: TaskId, value: f64, frequency_hz: f64) -> Result<u64, SchedulerError> {
    let rounded = value.round();
    if rounded <= 0.0 || (value - rounded).abs() > INTEGRAL_TOLERANCE * rounded.max(1.0) {
        return Err(SchedulerError::NonIntegralTiming { task, frequency_hz });
    }
    Ok(rounded as u64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fixtures::three_task_system;
    use crate::task::{AperiodicTask, PeriodicTask, TasksSpecification};

    const TOL: f64 = 1e-6;

    fn make_scheduler(system: &SystemDefinition) -> JdedsScheduler {
        let tasks = system.tasks.system_tasks();
        let (periodic, aperiodic): (Vec<_>, Vec<_>) =
            tasks.into_iter().partition(|t| t.is_periodic());
        let mut s = JdedsScheduler::new();
        s.offline_stage(system, &periodic, &aperiodic).unwrap();
        s
    }

    fn make_executable(ids: &[TaskId]) -> Vec<ExecutableTask> {
        ids.iter()
            .map(|&id| ExecutableTask {
                id,
                job_id: 0,
                pending_cycles: 1.0,
                deadline: f64::INFINITY,
            })
            .collect()
    }

    /// Two tasks that fill both cores at the only available frequency.
    fn saturated_system() -> SystemDefinition {
        let mut system = three_task_system();
        system.tasks = TasksSpecification::new(
            vec![PeriodicTask::new(2_000.0, 2.0), PeriodicTask::new(2_000.0, 2.0)],
            vec![AperiodicTask::new(100.0, 0.5, 1.5)],
        );
        system.cpu.clock_available_frequencies = vec![1.0];
        system
    }

    fn aperiodic(id: TaskId, cycles: f64, arrival: f64, deadline: f64) -> SystemTask {
        SystemTask {
            id,
            worst_case_cycles: cycles,
            kind: TaskKind::Aperiodic { arrival, deadline },
        }
    }

    fn hand_built_state(cc: Vec<f64>, interval_end: f64, cores: usize) -> JdedsState {
        let n = cc.len();
        JdedsState {
            cores,
            decimals: 5,
            dt: 0.01,
            base_hz: 1_000.0,
            f_star: 1.0,
            frequency: 1.0,
            possible_f: vec![1.0],
            intervals_end: vec![interval_end],
            hyperperiod: interval_end,
            periodic_ids: (0..n).collect(),
            periodic_allocation: cc.iter().map(|&c| vec![c]).collect(),
            aperiodic: Vec::new(),
            deadlines: vec![None; n],
            interval_cc_left: cc,
            interval: 0,
            interval_end,
            aperiodic_arrived: false,
        }
    }

    // ── Offline stage ─────────────────────────────────────────────────────────

    #[test]
    fn offline_stage_selects_lowest_sufficient_frequency() {
        let s = make_scheduler(&three_task_system());
        let state = s.state().unwrap();
        // U = 1.625 on 2 cores → φ* = 0.8125 → f* = 0.85
        assert_eq!(state.f_star(), 0.85);
        assert_eq!(state.frequency(), 0.85);
        assert_eq!(state.intervals_end(), &[4.0, 8.0, 12.0, 16.0, 20.0, 24.0]);
    }

    #[test]
    fn offline_table_meets_first_deadline() {
        let s = make_scheduler(&three_task_system());
        let state = s.state().unwrap();
        // 2000 cycles at 850 Hz
        assert!((state.periodic_allocation()[0][0] - 2_000.0 / 850.0).abs() < TOL);
        assert!((state.interval_cc_left()[0] - 2_000.0 / 850.0).abs() < TOL);
    }

    #[test]
    fn overloaded_system_is_infeasible() {
        let mut system = three_task_system();
        system.tasks.periodic_tasks.push(PeriodicTask::new(4_000.0, 4.0));
        let tasks = system.tasks.system_tasks();
        let err = JdedsScheduler::new()
            .offline_stage(&system, &tasks, &[])
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Partition(PartitionError::Infeasible { .. })
        ));
    }

    #[test]
    fn use_before_offline_stage_fails() {
        let mut s = JdedsScheduler::new();
        assert_eq!(
            s.schedule_policy(0.0, &[], &[None], &[1.0], None),
            Err(SchedulerError::NotInitialised("jdeds"))
        );
    }

    // ── Assignment policy ─────────────────────────────────────────────────────

    #[test]
    fn zero_laxity_task_comes_first() {
        // laxities at t=0 with interval end 3: 2, 0, 2.5, 1
        let state = hand_built_state(vec![1.0, 3.0, 0.5, 2.0], 3.0, 2);
        let next = state.assign(0.0, &[0, 1, 2, 3], &[Some(2), None]);
        assert_eq!(next, vec![Some(1), Some(2)]);
    }

    #[test]
    fn aperiodic_deadline_is_met_one_quantum_early() {
        let mut state = hand_built_state(vec![1.0, 0.5], 3.0, 1);
        state.deadlines[1] = Some(1.0);
        // 0.99 − 0.49 − 0.5 leaves no laxity, the running task yields
        let next = state.assign(0.49, &[0, 1], &[Some(0)]);
        assert_eq!(next, vec![Some(1)]);
        let earlier = state.assign(0.4, &[0, 1], &[Some(0)]);
        assert_eq!(earlier, vec![Some(0)]);
    }

    #[test]
    fn remaining_tasks_sorted_by_residual() {
        let state = hand_built_state(vec![1.0, 2.5, 0.5, 2.0], 4.0, 3);
        let next = state.assign(0.0, &[0, 1, 2, 3], &[None, None, None]);
        assert_eq!(next, vec![Some(1), Some(3), Some(0)]);
    }

    #[test]
    fn finished_or_unreleased_tasks_are_skipped() {
        let state = hand_built_state(vec![1.0, 0.0, 0.5], 4.0, 3);
        let next = state.assign(0.0, &[1, 2], &[None, None, None]);
        assert_eq!(next, vec![Some(2), None, None]);
    }

    #[test]
    fn residual_shrinks_for_running_tasks_only() {
        let mut state = hand_built_state(vec![1.0, 1.0], 4.0, 1);
        state.consume(&[Some(1)]);
        assert!((state.interval_cc_left[0] - 1.0).abs() < TOL);
        assert!((state.interval_cc_left[1] - 0.99).abs() < TOL);
    }

    #[test]
    fn steady_assignment_is_not_recomputed() {
        let mut state = hand_built_state(vec![1.0, 1.0], 4.0, 1);
        assert!(!state.needs_reschedule(0.5, &[0, 1], &[Some(0)], false));
        // running task no longer runnable
        assert!(state.needs_reschedule(0.5, &[1], &[Some(0)], false));
        // zero laxity of a waiting task
        assert!(state.needs_reschedule(3.0, &[0, 1], &[Some(0)], false));
    }

    #[test]
    fn decision_runs_every_core_at_operating_frequency() {
        let mut s = make_scheduler(&three_task_system());
        let d = s
            .schedule_policy(0.0, &make_executable(&[0, 1, 2]), &[None, None], &[1.0, 1.0], None)
            .unwrap();
        assert_eq!(d.frequencies, Some(vec![0.85, 0.85]));
        assert_eq!(d.quantum, None);
        assert_eq!(d.assignment.iter().flatten().count(), 2);
    }

    // ── Hyperperiod replay ────────────────────────────────────────────────────

    #[test]
    fn table_is_replayed_every_hyperperiod() {
        let mut s = make_scheduler(&three_task_system());
        let executable = make_executable(&[0, 1, 2]);
        let mut active = vec![None, None];
        let mut q = 0u32;
        loop {
            let time = round_to(q as f64 * 0.01, 5);
            if time >= 30.0 {
                break;
            }
            let d = s
                .schedule_policy(time, &executable, &active, &[0.85, 0.85], None)
                .unwrap();
            active = d.assignment;
            q += 1;
        }
        let state = s.state().unwrap();
        // 28 s is the end of replayed interval 6 (table column 0)
        assert_eq!(state.interval_index(), 7);
        assert_eq!(state.interval_end(), 32.0);
        assert_eq!(state.interval_demand(7), state.interval_demand(1));
    }

    // ── Aperiodic admission ───────────────────────────────────────────────────

    #[test]
    fn aperiodic_without_slack_is_rejected_and_table_unchanged() {
        let system = saturated_system();
        let mut s = make_scheduler(&system);
        let (table, residual) = {
            let state = s.state().unwrap();
            (
                state.periodic_allocation().to_vec(),
                state.interval_cc_left().to_vec(),
            )
        };

        let response = s
            .aperiodic_arrive(0.5, &[aperiodic(2, 100.0, 0.5, 1.5)], &[1.0, 1.0], None)
            .unwrap();

        assert!(!response.reschedule_now);
        assert_eq!(response.rejected.len(), 1);
        assert_eq!(response.rejected[0].task, 2);
        assert_eq!(response.rejected[0].best_slack, 0.0);
        let state = s.state().unwrap();
        assert_eq!(state.periodic_allocation(), table.as_slice());
        assert_eq!(state.interval_cc_left(), residual.as_slice());
        assert_eq!(state.admitted_work(2), 0.0);
    }

    #[test]
    fn aperiodic_fitting_idle_capacity_keeps_frequency() {
        let mut s = make_scheduler(&three_task_system());
        let response = s
            .aperiodic_arrive(0.0, &[aperiodic(3, 500.0, 0.0, 24.0)], &[0.85, 0.85], None)
            .unwrap();
        assert!(response.reschedule_now);
        assert!(response.rejected.is_empty());
        let state = s.state().unwrap();
        assert_eq!(state.frequency(), 0.85);
        // requirement plus one reserved quantum
        assert!((state.admitted_work(3) - (500.0 / 850.0 + 0.01)).abs() < TOL);
    }

    #[test]
    fn aperiodic_beyond_idle_capacity_raises_frequency() {
        // idle capacity at f* is 1800 cycles over the hyperperiod
        let mut s = make_scheduler(&three_task_system());
        let response = s
            .aperiodic_arrive(0.0, &[aperiodic(3, 3_000.0, 0.0, 24.0)], &[0.85, 0.85], None)
            .unwrap();
        assert!(response.rejected.is_empty());
        let state = s.state().unwrap();
        assert_eq!(state.frequency(), 1.0);
        // 3 s plus one quantum at 1.0, expressed in reference seconds
        assert!((state.admitted_work(3) - 3.01 / 0.85).abs() < TOL);

        let d = s
            .schedule_policy(0.0, &make_executable(&[0, 1, 2, 3]), &[None, None], &[0.85, 0.85], None)
            .unwrap();
        assert_eq!(d.frequencies, Some(vec![1.0, 1.0]));
    }

    #[test]
    fn whole_cycles_rejects_fractional_values() {
        assert_eq!(whole_cycles(0, 3400.0, 850.0), Ok(3400));
        assert!(whole_cycles(1, 3400.4, 850.0).is_err());
        assert!(whole_cycles(2, 0.0, 850.0).is_err());
    }
}
