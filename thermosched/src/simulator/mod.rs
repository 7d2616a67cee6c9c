/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Lock-step simulation driver.
//!
//! One iteration per quantum, strictly in this order:
//!
//! ```text
//! release jobs ─► aperiodic_arrive ─► schedule_policy ─► gate Λ
//!      ─► processor quantum ─► credit executed cycles ─► thermal quantum
//!      ─► completions ─► deadline misses
//! ```
//!
//! The scheduler only sees the state at quantum boundaries; the engine only
//! sees the decision of the current quantum.
//!
//! # Completion
//! The fluid processor net delivers slightly less than a core-held-busy
//! would.  Its busy place saturates at `η / (η + 1)`, and every dispatch
//! onto a core waits for the previous holder's busy token to drain, which
//! costs up to one token of cycles.  A job therefore counts as complete once
//! fewer than `COMPLETION_SLACK · (C / η + dispatches · base_hz / η)` of its
//! `C` cycles are pending.

pub mod trace;

pub use trace::{
    CpuUsedFrequency, DeadlineMiss, JobSectionExecution, SimulationTrace, TemperatureSample,
};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use tracing::{debug, info, warn};

use crate::engine::Propagator;
use crate::error::{ConfigurationError, SimulationError};
use crate::model::{generate_processor_model, generate_thermal_model, ProcessorModel, ThermalModel};
use crate::scheduler::{round_to, Scheduler};
use crate::system::SystemDefinition;
use crate::task::{ExecutableTask, SystemTask, TaskId, TaskKind};

use trace::TraceRecorder;

/// Multiplier on the cycles the fluid net may fall short of per job.
const COMPLETION_SLACK: f64 = 2.0;

// ── Job bookkeeping ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Job {
    id: usize,
    deadline: f64,
    pending: f64,
    /// Quanta in which the job was switched onto a core.
    dispatches: u32,
}

/// Release and completion state of every task.
struct JobTable {
    tasks: Vec<SystemTask>,
    jobs: Vec<Option<Job>>,
    next_job_id: Vec<usize>,
    /// Next release instant of periodic tasks; `None` once released for
    /// aperiodic ones.
    next_release: Vec<Option<f64>>,
    /// Allowed shortfall from the saturated busy place.
    tolerance: Vec<f64>,
    /// Allowed shortfall per dispatch, one token of cycles.
    switch_tolerance: f64,
}

impl JobTable {
    fn new(tasks: &[SystemTask], eta: f64, cycles_per_token: f64) -> Self {
        let next_release = tasks
            .iter()
            .map(|t| match t.kind {
                TaskKind::Periodic { .. } => Some(0.0),
                TaskKind::Aperiodic { arrival, .. } => Some(arrival),
            })
            .collect();
        Self {
            tasks: tasks.to_vec(),
            jobs: vec![None; tasks.len()],
            next_job_id: vec![0; tasks.len()],
            next_release,
            tolerance: tasks
                .iter()
                .map(|t| COMPLETION_SLACK * t.worst_case_cycles / eta)
                .collect(),
            switch_tolerance: COMPLETION_SLACK * cycles_per_token,
        }
    }

    /// Release every job due at `time`; returns the aperiodic tasks released.
    fn release(&mut self, time: f64, decimals: u32) -> Vec<SystemTask> {
        let now = round_to(time, decimals);
        let mut arrived = Vec::new();
        for (i, task) in self.tasks.iter().enumerate() {
            let Some(release) = self.next_release[i] else {
                continue;
            };
            if round_to(release, decimals) > now {
                continue;
            }
            let (deadline, next) = match task.kind {
                TaskKind::Periodic { period } => (release + period, Some(release + period)),
                TaskKind::Aperiodic { deadline, .. } => {
                    arrived.push(task.clone());
                    (deadline, None)
                }
            };
            self.next_release[i] = next;
            let id = self.next_job_id[i];
            self.next_job_id[i] += 1;
            self.jobs[i] = Some(Job {
                id,
                deadline,
                pending: task.worst_case_cycles,
                dispatches: 0,
            });
        }
        arrived
    }

    fn executable(&self) -> Vec<ExecutableTask> {
        self.jobs
            .iter()
            .enumerate()
            .filter_map(|(id, job)| {
                job.as_ref().map(|j| ExecutableTask {
                    id,
                    job_id: j.id,
                    pending_cycles: j.pending,
                    deadline: j.deadline,
                })
            })
            .collect()
    }

    fn job_of(&self, task: TaskId) -> Option<usize> {
        self.jobs.get(task).and_then(|j| j.as_ref()).map(|j| j.id)
    }

    /// Count one dispatch of every task placed on a core it did not hold.
    fn dispatch(&mut self, previous: &[Option<TaskId>], assignment: &[Option<TaskId>]) {
        for (k, slot) in assignment.iter().enumerate() {
            let Some(task) = *slot else {
                continue;
            };
            if previous.get(k).copied().flatten() == Some(task) {
                continue;
            }
            if let Some(job) = self.jobs.get_mut(task).and_then(|j| j.as_mut()) {
                job.dispatches += 1;
            }
        }
    }

    /// Credit up to `cycles` to the current job of `task`; returns the amount
    /// accepted.
    fn credit(&mut self, task: TaskId, cycles: f64) -> f64 {
        match self.jobs.get_mut(task).and_then(|j| j.as_mut()) {
            Some(job) => {
                let accepted = cycles.min(job.pending).max(0.0);
                job.pending -= accepted;
                accepted
            }
            None => 0.0,
        }
    }

    /// Remove and return jobs that are done.
    fn take_completed(&mut self) -> Vec<(TaskId, usize)> {
        let mut done = Vec::new();
        let per_switch = self.switch_tolerance;
        for (task, slot) in self.jobs.iter_mut().enumerate() {
            let base = self.tolerance[task];
            if slot
                .as_ref()
                .is_some_and(|j| j.pending <= base + per_switch * f64::from(j.dispatches))
            {
                if let Some(job) = slot.take() {
                    done.push((task, job.id));
                }
            }
        }
        done
    }

    /// Remove and return jobs whose deadline is at or before `time`.
    fn take_missed(&mut self, time: f64, decimals: u32) -> Vec<DeadlineMiss> {
        let now = round_to(time, decimals);
        let mut missed = Vec::new();
        for (task, slot) in self.jobs.iter_mut().enumerate() {
            if slot
                .as_ref()
                .is_some_and(|j| round_to(j.deadline, decimals) <= now)
            {
                if let Some(job) = slot.take() {
                    missed.push(DeadlineMiss {
                        task_id: task,
                        job_id: job.id,
                        deadline: job.deadline,
                        pending_cycles: job.pending,
                        periodic: self.tasks[task].is_periodic(),
                    });
                }
            }
        }
        missed
    }

    fn pending_of(&self, task: TaskId) -> Option<f64> {
        self.jobs.get(task).and_then(|j| j.as_ref()).map(|j| j.pending)
    }
}

// ── Propagator caches ─────────────────────────────────────────────────────────

type ProcessorKey = (Vec<Option<TaskId>>, Vec<u64>, u64);
type ThermalKey = (Vec<bool>, Vec<u64>, u64);

/// Propagators kept per engine.  Irregular quanta from aperiodic arrivals
/// would otherwise grow the caches without bound.
const PROPAGATOR_CACHE_LIMIT: usize = 64;

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

/// Empty `cache` when it is full and `key` would add an entry.
fn bound_cache<K: Eq + Hash, V>(cache: &mut HashMap<K, V>, key: &K) {
    if cache.len() >= PROPAGATOR_CACHE_LIMIT && !cache.contains_key(key) {
        debug!(entries = cache.len(), "Propagator cache full, clearing");
        cache.clear();
    }
}

struct Engines {
    processor: ProcessorModel,
    thermal: Option<ThermalModel>,
    processor_substeps: u32,
    thermal_substeps: u32,
    processor_cache: HashMap<ProcessorKey, Propagator<DMatrix<f64>>>,
    thermal_cache: HashMap<ThermalKey, Propagator<CsrMatrix<f64>>>,
}

impl Engines {
    fn processor_quantum(
        &mut self,
        marking: &DVector<f64>,
        assignment: &[Option<TaskId>],
        frequencies: &[f64],
        quantum: f64,
    ) -> Result<DVector<f64>, ConfigurationError> {
        let key = (assignment.to_vec(), bits(frequencies), quantum.to_bits());
        bound_cache(&mut self.processor_cache, &key);
        let propagator = match self.processor_cache.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let rates = self.processor.gated_rates(frequencies, assignment)?;
                let h = quantum / self.processor_substeps as f64;
                let step = self.processor.step_matrix(&rates, h);
                entry.insert(Propagator::new("processor", &step, self.processor_substeps)?)
            }
        };
        Ok(propagator.propagate(marking))
    }

    fn thermal_quantum(
        &mut self,
        marking: &DVector<f64>,
        assignment: &[Option<TaskId>],
        frequencies: &[f64],
        quantum: f64,
    ) -> Result<DVector<f64>, ConfigurationError> {
        let Some(model) = self.thermal.as_ref() else {
            return Ok(marking.clone());
        };
        let busy: Vec<bool> = assignment.iter().map(Option::is_some).collect();
        let key = (busy, bits(frequencies), quantum.to_bits());
        bound_cache(&mut self.thermal_cache, &key);
        let propagator = match self.thermal_cache.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let rates = model.gated_rates(frequencies, &entry.key().0)?;
                let h = quantum / self.thermal_substeps as f64;
                let step = model.step_matrix(&rates, h);
                entry.insert(Propagator::new("thermal", &step, self.thermal_substeps)?)
            }
        };
        Ok(propagator.propagate(marking))
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Run `scheduler` on `system` until the horizon and return the trace.
///
/// The horizon is `simulation.horizon`, or one hyperperiod when unset.
///
/// # Errors
/// * [`SimulationError::Configuration`] – invalid definition, unstable
///   discretisation, or a decision naming an unavailable frequency.
/// * [`SimulationError::Scheduler`] – the offline stage rejected the task set.
pub fn simulate(
    system: &SystemDefinition,
    scheduler: &mut dyn Scheduler,
) -> Result<SimulationTrace, SimulationError> {
    system.validate()?;

    let cpu = &system.cpu;
    let sim = &system.simulation;
    let m = cpu.number_of_cores();
    let decimals = sim.float_round;

    let tasks = system.tasks.system_tasks();
    let (periodic, aperiodic): (Vec<SystemTask>, Vec<SystemTask>) =
        tasks.iter().cloned().partition(|t| t.is_periodic());

    let processor = generate_processor_model(tasks.len(), cpu, system.tcpn.eta)?;
    let thermal = if sim.thermal {
        Some(generate_thermal_model(cpu, &system.environment, sim.mesh_step)?)
    } else {
        None
    };

    let horizon = match sim.horizon {
        Some(h) => h,
        None => system.tasks.hyperperiod(cpu.clock_base_frequency)?,
    };

    let base_quantum = scheduler.offline_stage(system, &periodic, &aperiodic)?;
    if !(base_quantum > 0.0) {
        return Err(ConfigurationError::InvalidStep(format!(
            "scheduler '{}' returned quantum {base_quantum}",
            scheduler.name()
        ))
        .into());
    }

    info!(
        scheduler = scheduler.name(),
        tasks = tasks.len(),
        cores = m,
        horizon,
        quantum = base_quantum,
        thermal = sim.thermal,
        "Simulation started"
    );

    let mut engines = Engines {
        processor_substeps: sim.processor_substeps,
        thermal_substeps: sim.thermal_substeps,
        processor_cache: HashMap::new(),
        thermal_cache: HashMap::new(),
        processor,
        thermal,
    };

    let mut jobs = JobTable::new(
        &tasks,
        system.tcpn.eta,
        engines.processor.cycles_per_token,
    );
    let mut trace = SimulationTrace::new(m);
    let mut recorder = TraceRecorder::new(m);

    let mut marking = engines.processor.initial_marking.clone();
    let mut temperatures = engines.thermal.as_ref().map(|t| t.initial_marking.clone());
    if let (Some(model), Some(t)) = (engines.thermal.as_ref(), temperatures.as_ref()) {
        trace.max_temperature_cores = Some(vec![Vec::new(); m]);
        if sim.record_thermal_map {
            trace.temperature_measures = Some(Vec::new());
        }
        record_temperatures(&mut trace, model, t, 0.0);
    }

    let mut active: Vec<Option<TaskId>> = vec![None; m];
    let mut frequencies = cpu.clock_relative_frequencies.clone();
    let mut time = 0.0;
    let mut quanta = 0u64;

    while round_to(time, decimals) < round_to(horizon, decimals) {
        // Releases
        let arrived = jobs.release(time, decimals);
        let core_temperatures = match (engines.thermal.as_ref(), temperatures.as_ref()) {
            (Some(model), Some(t)) => Some(model.core_max_temperatures(t)),
            _ => None,
        };
        if !arrived.is_empty() {
            let response = scheduler.aperiodic_arrive(
                time,
                &arrived,
                &frequencies,
                core_temperatures.as_deref(),
            )?;
            debug!(
                time,
                arrived = arrived.len(),
                reschedule_now = response.reschedule_now,
                "Aperiodic arrival"
            );
            trace.warnings.extend(response.rejected);
        }

        // Decision
        let executable = jobs.executable();
        let decision = scheduler.schedule_policy(
            time,
            &executable,
            &active,
            &frequencies,
            core_temperatures.as_deref(),
        )?;
        if let Some(next) = decision.frequencies {
            check_frequencies(&next, &cpu.clock_available_frequencies, m)?;
            frequencies = next;
        }
        let quantum = decision.quantum.unwrap_or(base_quantum);
        if !(quantum > 0.0) {
            return Err(ConfigurationError::InvalidStep(format!(
                "scheduler '{}' returned quantum {quantum}",
                scheduler.name()
            ))
            .into());
        }
        let assignment: Vec<Option<TaskId>> = (0..m)
            .map(|k| {
                decision
                    .assignment
                    .get(k)
                    .copied()
                    .flatten()
                    .filter(|&id| jobs.job_of(id).is_some())
            })
            .collect();

        let running: Vec<Option<(TaskId, usize)>> = assignment
            .iter()
            .map(|slot| slot.and_then(|id| jobs.job_of(id).map(|job| (id, job))))
            .collect();
        recorder.decide(&mut trace, time, &running, &frequencies);
        jobs.dispatch(&active, &assignment);

        // Processor quantum
        let next_marking =
            engines.processor_quantum(&marking, &assignment, &frequencies, quantum)?;
        let before = engines.processor.executed_cycles(&marking);
        let after = engines.processor.executed_cycles(&next_marking);
        marking = next_marking;
        let end = round_to(time + quantum, decimals);

        let n = engines.processor.n_tasks;
        for k in 0..m {
            for i in 0..n {
                let delta = after[k * n + i] - before[k * n + i];
                if delta <= 0.0 {
                    continue;
                }
                let accepted = jobs.credit(i, delta);
                if assignment[k] == Some(i) {
                    recorder.executed(k, accepted, end);
                }
            }
        }

        // Thermal quantum
        if let Some(t) = temperatures.take() {
            let next = engines.thermal_quantum(&t, &assignment, &frequencies, quantum)?;
            if let Some(model) = engines.thermal.as_ref() {
                record_temperatures(&mut trace, model, &next, end);
            }
            temperatures = Some(next);
        }

        time = end;
        quanta += 1;

        for (task, job) in jobs.take_completed() {
            debug!(task, job, time, "Job completed");
            recorder.job_ended(&mut trace, task, job);
        }
        for miss in jobs.take_missed(time, decimals) {
            if miss.periodic {
                trace.have_been_scheduled = false;
            }
            warn!(
                task = miss.task_id,
                job = miss.job_id,
                deadline = miss.deadline,
                pending_cycles = miss.pending_cycles,
                periodic = miss.periodic,
                "Deadline missed"
            );
            recorder.job_ended(&mut trace, miss.task_id, miss.job_id);
            trace.deadline_misses.push(miss);
        }

        active = assignment
            .into_iter()
            .map(|slot| slot.filter(|&id| jobs.pending_of(id).is_some()))
            .collect();
    }

    recorder.finish(&mut trace, time);

    info!(
        quanta,
        end_time = time,
        deadline_misses = trace.deadline_misses.len(),
        warnings = trace.warnings.len(),
        migrations = trace.migrations(),
        have_been_scheduled = trace.have_been_scheduled,
        "Simulation finished"
    );
    Ok(trace)
}

fn record_temperatures(
    trace: &mut SimulationTrace,
    model: &ThermalModel,
    marking: &DVector<f64>,
    time: f64,
) {
    if let Some(per_core) = trace.max_temperature_cores.as_mut() {
        for (k, t) in model.core_max_temperatures(marking).into_iter().enumerate() {
            per_core[k].push(t);
        }
    }
    if let Some(samples) = trace.temperature_measures.as_mut() {
        samples.push(TemperatureSample {
            time,
            temperatures: marking.iter().take(model.environment_place).copied().collect(),
        });
    }
}

fn check_frequencies(
    frequencies: &[f64],
    available: &[f64],
    cores: usize,
) -> Result<(), ConfigurationError> {
    if frequencies.len() != cores {
        return Err(ConfigurationError::FrequencyCountMismatch {
            expected: cores,
            found: frequencies.len(),
        });
    }
    match frequencies
        .iter()
        .find(|&&f| !available.iter().any(|&a| (a - f).abs() < 1e-12))
    {
        Some(&frequency) => Err(ConfigurationError::UnsupportedFrequency { frequency }),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{by_name, GlobalEdfScheduler, JdedsScheduler};
    use crate::system::fixtures::three_task_system;
    use crate::task::{AperiodicTask, PeriodicTask, TasksSpecification};

    fn light_system() -> SystemDefinition {
        let mut system = three_task_system();
        system.tasks = TasksSpecification::new(
            vec![PeriodicTask::new(500.0, 2.0), PeriodicTask::new(400.0, 4.0)],
            vec![],
        );
        system
    }

    // ── Job table ─────────────────────────────────────────────────────────────

    #[test]
    fn periodic_jobs_are_released_at_every_period() {
        let tasks = TasksSpecification::new(vec![PeriodicTask::new(10.0, 2.0)], vec![])
            .system_tasks();
        let mut jobs = JobTable::new(&tasks, 100.0, 10.0);
        assert!(jobs.release(0.0, 5).is_empty());
        assert_eq!(jobs.job_of(0), Some(0));
        jobs.credit(0, 10.0);
        assert_eq!(jobs.take_completed(), vec![(0, 0)]);
        jobs.release(1.0, 5);
        assert_eq!(jobs.job_of(0), None);
        jobs.release(2.0, 5);
        assert_eq!(jobs.job_of(0), Some(1));
    }

    #[test]
    fn aperiodic_release_is_reported_once() {
        let tasks = TasksSpecification::new(
            vec![PeriodicTask::new(10.0, 2.0)],
            vec![AperiodicTask::new(5.0, 0.5, 1.5)],
        )
        .system_tasks();
        let mut jobs = JobTable::new(&tasks, 100.0, 10.0);
        assert!(jobs.release(0.0, 5).is_empty());
        assert_eq!(jobs.release(0.5, 5).len(), 1);
        assert!(jobs.release(0.6, 5).is_empty());
        let missed = jobs.take_missed(1.5, 5);
        assert_eq!(missed.len(), 1);
        assert!(!missed[0].periodic);
    }

    #[test]
    fn every_dispatch_widens_the_completion_allowance() {
        let tasks = TasksSpecification::new(vec![PeriodicTask::new(100.0, 1.0)], vec![])
            .system_tasks();
        let mut jobs = JobTable::new(&tasks, 100.0, 10.0);
        jobs.release(0.0, 5);
        jobs.credit(0, 85.0);
        // 15 pending is above 2 · 100 / 100
        assert!(jobs.take_completed().is_empty());

        jobs.dispatch(&[None, None], &[Some(0), None]);
        // staying on the same core is not a dispatch
        jobs.dispatch(&[Some(0), None], &[Some(0), None]);
        // 15 pending is within 2 · (1 + 10)
        assert_eq!(jobs.take_completed(), vec![(0, 0)]);
    }

    #[test]
    fn migration_counts_as_a_dispatch() {
        let tasks = TasksSpecification::new(vec![PeriodicTask::new(100.0, 1.0)], vec![])
            .system_tasks();
        let mut jobs = JobTable::new(&tasks, 100.0, 10.0);
        jobs.release(0.0, 5);
        jobs.dispatch(&[None, None], &[Some(0), None]);
        jobs.dispatch(&[Some(0), None], &[None, Some(0)]);
        jobs.credit(0, 60.0);
        // 40 pending is within 2 · (1 + 2 · 10)
        assert_eq!(jobs.take_completed(), vec![(0, 0)]);
    }

    #[test]
    fn frequency_checks() {
        assert!(check_frequencies(&[1.0, 0.5], &[0.5, 1.0], 2).is_ok());
        assert!(matches!(
            check_frequencies(&[0.7, 1.0], &[0.5, 1.0], 2),
            Err(ConfigurationError::UnsupportedFrequency { .. })
        ));
        assert!(matches!(
            check_frequencies(&[1.0], &[1.0], 2),
            Err(ConfigurationError::FrequencyCountMismatch { .. })
        ));
    }

    // ── Full runs ─────────────────────────────────────────────────────────────

    #[test]
    fn light_load_meets_every_deadline_under_edf() {
        let system = light_system();
        let mut scheduler = GlobalEdfScheduler::new();
        let trace = simulate(&system, &mut scheduler).unwrap();
        assert!(trace.have_been_scheduled, "{:?}", trace.deadline_misses);
        assert_eq!(trace.end_time, 4.0);
        // two jobs of 500 cycles and one of 400
        let executed_0 = trace.executed_cycles_of(0);
        assert!(executed_0 > 980.0 && executed_0 <= 1000.0 + 1e-6, "{executed_0}");
        assert!(trace.max_temperature_cores.is_none());
    }

    #[test]
    fn light_load_meets_every_deadline_under_jdeds() {
        let system = light_system();
        let mut scheduler = JdedsScheduler::new();
        let trace = simulate(&system, &mut scheduler).unwrap();
        assert!(trace.have_been_scheduled, "{:?}", trace.deadline_misses);
        assert_eq!(trace.end_time, 4.0);
        assert!(!trace.scheduling_points.is_empty());
        assert!(trace
            .scheduling_points
            .windows(2)
            .all(|w| w[0] < w[1]));
        // JDEDS runs every core at f*: U = 0.35 → φ* = 0.175 → 0.4
        for core in &trace.cpus_frequencies {
            assert!(core.iter().all(|f| f.frequency_used == 0.4));
        }
    }

    #[test]
    fn edf_capacity_follows_configured_frequencies() {
        let mut system = light_system();
        system.tasks.periodic_tasks = vec![
            PeriodicTask::new(2_000.0, 2.0),
            PeriodicTask::new(2_000.0, 2.0),
            PeriodicTask::new(2_000.0, 2.0),
        ];
        system.cpu.cores.number_of_cores = 3;
        system.cpu.clock_relative_frequencies = vec![1.0, 1.0, 0.4];
        assert!(matches!(
            simulate(&system, &mut GlobalEdfScheduler::new()),
            Err(SimulationError::Scheduler(_))
        ));
    }

    #[test]
    fn heavy_task_misses_under_global_edf() {
        // two light tasks with earlier deadlines delay the heavy one
        let mut system = light_system();
        system.tasks.periodic_tasks = vec![
            PeriodicTask::new(100.0, 1.0),
            PeriodicTask::new(100.0, 1.0),
            PeriodicTask::new(1_050.0, 1.1),
        ];
        system.simulation.horizon = Some(2.0);
        let trace = simulate(&system, &mut GlobalEdfScheduler::new()).unwrap();
        assert!(!trace.have_been_scheduled);
        let miss = trace
            .deadline_misses
            .iter()
            .find(|m| m.task_id == 2)
            .unwrap();
        assert!(miss.periodic);
        assert_eq!(miss.job_id, 0);
        // beyond the allowance of a single dispatch
        assert!(miss.pending_cycles > 2.0 * (1_050.0 / 100.0 + 10.0));
    }

    #[test]
    fn short_task_near_full_utilization_meets_deadlines_under_jdeds() {
        // U = 0.1 + 0.9 + 0.9 on two cores, one frequency only
        let mut system = light_system();
        system.tasks.periodic_tasks = vec![
            PeriodicTask::new(100.0, 1.0),
            PeriodicTask::new(1_800.0, 2.0),
            PeriodicTask::new(1_800.0, 2.0),
        ];
        system.cpu.clock_available_frequencies = vec![1.0];
        system.simulation.horizon = Some(4.0);
        let trace = simulate(&system, &mut JdedsScheduler::new()).unwrap();
        assert!(trace.have_been_scheduled, "{:?}", trace.deadline_misses);
        assert!(trace.executed_cycles_of(0) > 0.0);
    }

    #[test]
    fn reference_set_meets_every_deadline_over_the_hyperperiod() {
        let system = three_task_system();
        let trace = simulate(&system, &mut JdedsScheduler::new()).unwrap();
        assert_eq!(trace.end_time, 24.0);
        assert!(trace.have_been_scheduled, "{:?}", trace.deadline_misses);
        assert!(trace.deadline_misses.is_empty());
    }

    #[test]
    fn admitted_aperiodic_completes_by_its_deadline() {
        let mut system = three_task_system();
        system.tasks.aperiodic_tasks = vec![AperiodicTask::new(400.0, 40.0, 41.0)];
        system.simulation.horizon = Some(48.0);
        let trace = simulate(&system, &mut JdedsScheduler::new()).unwrap();
        assert!(trace.warnings.is_empty(), "{:?}", trace.warnings);
        assert!(trace.have_been_scheduled, "{:?}", trace.deadline_misses);
        assert!(
            !trace.deadline_misses.iter().any(|m| m.task_id == 3),
            "{:?}",
            trace.deadline_misses
        );
        assert!(trace.executed_cycles_of(3) > 300.0);
    }

    #[test]
    fn infeasible_task_set_fails_the_offline_stage() {
        let mut system = light_system();
        system.tasks.periodic_tasks = vec![PeriodicTask::new(5_000.0, 4.0)];
        let mut scheduler = by_name("jdeds").unwrap();
        assert!(matches!(
            simulate(&system, scheduler.as_mut()),
            Err(SimulationError::Scheduler(_))
        ));
    }

    #[test]
    fn thermal_run_heats_the_cores() {
        let mut system = light_system();
        system.simulation.thermal = true;
        system.simulation.mesh_step = 5.0;
        system.simulation.horizon = Some(1.0);
        system.simulation.record_thermal_map = true;
        let trace = simulate(&system, &mut GlobalEdfScheduler::new()).unwrap();

        let temps = trace.max_temperature_cores.as_ref().unwrap();
        assert_eq!(temps.len(), 2);
        // initial sample plus one per quantum
        assert_eq!(temps[0].len(), 101);
        assert_eq!(temps[0][0], 45.0);
        assert!(temps[0].last().copied().unwrap() > 45.0);

        let map = trace.temperature_measures.as_ref().unwrap();
        assert_eq!(map.len(), 101);
        // 100 board cells plus 2 × 4 core cells
        assert_eq!(map[0].temperatures.len(), 108);
    }

    #[test]
    fn rejected_aperiodic_becomes_a_warning() {
        let mut system = three_task_system();
        system.tasks = TasksSpecification::new(
            vec![PeriodicTask::new(2_000.0, 2.0), PeriodicTask::new(2_000.0, 2.0)],
            vec![AperiodicTask::new(100.0, 0.5, 1.5)],
        );
        system.cpu.clock_available_frequencies = vec![1.0];
        system.simulation.horizon = Some(2.0);
        let trace = simulate(&system, &mut JdedsScheduler::new()).unwrap();
        assert_eq!(trace.warnings.len(), 1);
        assert_eq!(trace.warnings[0].task, 2);
        // the aperiodic job never ran and expired at its deadline
        assert_eq!(trace.executed_cycles_of(2), 0.0);
        assert!(trace
            .deadline_misses
            .iter()
            .any(|m| m.task_id == 2 && !m.periodic));
    }

    // ── Propagator caches ─────────────────────────────────────────────────────

    #[test]
    fn processor_cache_stays_bounded() {
        let system = light_system();
        let processor =
            generate_processor_model(2, &system.cpu, system.tcpn.eta).unwrap();
        let mut engines = Engines {
            processor_substeps: 100,
            thermal_substeps: 10,
            processor_cache: HashMap::new(),
            thermal_cache: HashMap::new(),
            thermal: None,
            processor,
        };
        let marking = engines.processor.initial_marking.clone();
        let assignment = [Some(0), Some(1)];
        for step in 1..=PROPAGATOR_CACHE_LIMIT + 6 {
            let quantum = 1e-5 * step as f64;
            engines
                .processor_quantum(&marking, &assignment, &[1.0, 1.0], quantum)
                .unwrap();
            assert!(engines.processor_cache.len() <= PROPAGATOR_CACHE_LIMIT);
        }
        // a repeated quantum is served from the cache
        let before = engines.processor_cache.len();
        let last = 1e-5 * (PROPAGATOR_CACHE_LIMIT + 6) as f64;
        engines
            .processor_quantum(&marking, &assignment, &[1.0, 1.0], last)
            .unwrap();
        assert_eq!(engines.processor_cache.len(), before);
    }

    #[test]
    fn runs_are_deterministic() {
        let system = light_system();
        let a = simulate(&system, &mut JdedsScheduler::new()).unwrap();
        let b = simulate(&system, &mut JdedsScheduler::new()).unwrap();
        assert_eq!(a, b);
    }
}
