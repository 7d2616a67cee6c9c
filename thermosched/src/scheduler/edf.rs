/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Global earliest-deadline-first.
//!
//! Every quantum the `m` executable jobs with the earliest absolute deadlines
//! run, ties broken by task id.  Frequencies are left as configured and
//! every aperiodic arrival is accepted.

use tracing::info;

use super::affinity::apply_affinity;
use super::{AperiodicResponse, Decision, Scheduler, SchedulerError};
use crate::partition::feasibility::total_utilization;
use crate::partition::PartitionError;
use crate::system::SystemDefinition;
use crate::task::{ExecutableTask, SystemTask, TaskId, TaskKind};

#[derive(Debug, Default)]
pub struct GlobalEdfScheduler {
    cores: Option<usize>,
}

impl GlobalEdfScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for GlobalEdfScheduler {
    fn name(&self) -> &'static str {
        "global_edf"
    }

    fn offline_stage(
        &mut self,
        system: &SystemDefinition,
        periodic_tasks: &[SystemTask],
        _aperiodic_tasks: &[SystemTask],
    ) -> Result<f64, SchedulerError> {
        let cpu = &system.cpu;
        let (cycles, periods): (Vec<f64>, Vec<f64>) = periodic_tasks
            .iter()
            .filter_map(|t| match t.kind {
                TaskKind::Periodic { period } => {
                    Some((t.worst_case_cycles, period * cpu.clock_base_frequency))
                }
                TaskKind::Aperiodic { .. } => None,
            })
            .unzip();
        let utilization = total_utilization(&cycles, &periods);
        let capacity: f64 = cpu.clock_relative_frequencies.iter().sum();
        if utilization > capacity {
            return Err(PartitionError::Infeasible {
                utilization,
                capacity,
            }
            .into());
        }

        self.cores = Some(cpu.number_of_cores());
        info!(
            scheduler = self.name(),
            utilization,
            capacity,
            dt = system.simulation.dt,
            "Offline stage complete"
        );
        Ok(system.simulation.dt)
    }

    fn schedule_policy(
        &mut self,
        _time: f64,
        executable: &[ExecutableTask],
        active: &[Option<TaskId>],
        frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> Result<Decision, SchedulerError> {
        let m = self.cores.ok_or(SchedulerError::NotInitialised("global_edf"))?;

        let mut ready: Vec<&ExecutableTask> = executable.iter().collect();
        ready.sort_by(|a, b| a.deadline.total_cmp(&b.deadline).then(a.id.cmp(&b.id)));

        let mut assignment: Vec<Option<TaskId>> = ready.iter().take(m).map(|t| Some(t.id)).collect();
        assignment.resize(m, None);
        apply_affinity(active, &mut assignment, frequencies);

        Ok(Decision {
            assignment,
            quantum: None,
            frequencies: None,
        })
    }

    fn aperiodic_arrive(
        &mut self,
        _time: f64,
        _arrived: &[SystemTask],
        _frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> Result<AperiodicResponse, SchedulerError> {
        if self.cores.is_none() {
            return Err(SchedulerError::NotInitialised("global_edf"));
        }
        Ok(AperiodicResponse {
            reschedule_now: true,
            rejected: Vec::new(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
