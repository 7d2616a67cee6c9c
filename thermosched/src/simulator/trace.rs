/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulation trace: the artifact handed to plotting and statistics.

use serde::Serialize;

use crate::scheduler::AperiodicRejected;
use crate::task::TaskId;

/// A stretch of time one job held one core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSectionExecution {
    pub job_id: usize,
    pub task_id: TaskId,
    pub execution_start_time: f64,
    pub execution_end_time: f64,
    pub number_of_executed_cycles: f64,
}

/// A stretch of time one core ran at one frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuUsedFrequency {
    pub frequency_used: f64,
    pub frequency_set_time: f64,
    pub frequency_unset_time: f64,
}

/// A job still owing cycles when its deadline passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadlineMiss {
    pub task_id: TaskId,
    pub job_id: usize,
    pub deadline: f64,
    pub pending_cycles: f64,
    /// Periodic jobs are hard real-time; aperiodic misses are reported only.
    pub periodic: bool,
}

/// Temperature of every thermal cell at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureSample {
    pub time: f64,
    pub temperatures: Vec<f64>,
}

/// Raw result of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationTrace {
    /// `true` when no periodic job missed its deadline.
    pub have_been_scheduled: bool,
    pub end_time: f64,
    /// Per core.
    pub job_sections_execution: Vec<Vec<JobSectionExecution>>,
    /// Per core.
    pub cpus_frequencies: Vec<Vec<CpuUsedFrequency>>,
    /// Instants at which the assignment or a frequency changed, ascending.
    pub scheduling_points: Vec<f64>,
    /// Time × thermal cell, when requested.
    pub temperature_measures: Option<Vec<TemperatureSample>>,
    /// Per core, the maximum cell temperature after every quantum.
    pub max_temperature_cores: Option<Vec<Vec<f64>>>,
    pub deadline_misses: Vec<DeadlineMiss>,
    /// Aperiodic jobs the scheduler could not admit.
    pub warnings: Vec<AperiodicRejected>,
}

impl SimulationTrace {
    pub(crate) fn new(cores: usize) -> Self {
        Self {
            have_been_scheduled: true,
            job_sections_execution: vec![Vec::new(); cores],
            cpus_frequencies: vec![Vec::new(); cores],
            ..Default::default()
        }
    }

    /// Cycles executed by `task` across all cores and sections.
    pub fn executed_cycles_of(&self, task: TaskId) -> f64 {
        self.job_sections_execution
            .iter()
            .flatten()
            .filter(|s| s.task_id == task)
            .map(|s| s.number_of_executed_cycles)
            .sum()
    }

    /// Sections that start on a different core than the previous section of
    /// the same job ended on.
    pub fn migrations(&self) -> usize {
        let mut sections: Vec<(usize, &JobSectionExecution)> = self
            .job_sections_execution
            .iter()
            .enumerate()
            .flat_map(|(core, list)| list.iter().map(move |s| (core, s)))
            .collect();
        sections.sort_by(|a, b| {
            (a.1.task_id, a.1.job_id)
                .cmp(&(b.1.task_id, b.1.job_id))
                .then(a.1.execution_start_time.total_cmp(&b.1.execution_start_time))
        });
        sections
            .windows(2)
            .filter(|w| {
                let (c0, s0) = w[0];
                let (c1, s1) = w[1];
                s0.task_id == s1.task_id && s0.job_id == s1.job_id && c0 != c1
            })
            .count()
    }
}

/// Open sections and frequency intervals while the run is in flight.
#[derive(Debug)]
pub(crate) struct TraceRecorder {
    open_sections: Vec<Option<JobSectionExecution>>,
    open_frequencies: Vec<Option<CpuUsedFrequency>>,
    last_assignment: Option<Vec<Option<(TaskId, usize)>>>,
    last_frequencies: Option<Vec<f64>>,
}

impl TraceRecorder {
    pub(crate) fn new(cores: usize) -> Self {
        Self {
            open_sections: vec![None; cores],
            open_frequencies: vec![None; cores],
            last_assignment: None,
            last_frequencies: None,
        }
    }

    /// Register the decision for the quantum starting at `time`.
    ///
    /// `running[k]` is the `(task, job)` held by core `k`.
    pub(crate) fn decide(
        &mut self,
        trace: &mut SimulationTrace,
        time: f64,
        running: &[Option<(TaskId, usize)>],
        frequencies: &[f64],
    ) {
        let assignment_changed = self.last_assignment.as_deref() != Some(running);
        let frequencies_changed = self.last_frequencies.as_deref() != Some(frequencies);
        if assignment_changed || frequencies_changed {
            trace.scheduling_points.push(time);
        }

        for (k, &slot) in running.iter().enumerate() {
            let current = self.open_sections[k]
                .as_ref()
                .map(|s| (s.task_id, s.job_id));
            if current != slot {
                if let Some(section) = self.open_sections[k].take() {
                    trace.job_sections_execution[k].push(section);
                }
                self.open_sections[k] = slot.map(|(task_id, job_id)| JobSectionExecution {
                    job_id,
                    task_id,
                    execution_start_time: time,
                    execution_end_time: time,
                    number_of_executed_cycles: 0.0,
                });
            }
        }

        for (k, &f) in frequencies.iter().enumerate() {
            let same = self.open_frequencies[k]
                .as_ref()
                .is_some_and(|o| o.frequency_used == f);
            if !same {
                if let Some(mut open) = self.open_frequencies[k].take() {
                    open.frequency_unset_time = time;
                    trace.cpus_frequencies[k].push(open);
                }
                self.open_frequencies[k] = Some(CpuUsedFrequency {
                    frequency_used: f,
                    frequency_set_time: time,
                    frequency_unset_time: time,
                });
            }
        }

        self.last_assignment = Some(running.to_vec());
        self.last_frequencies = Some(frequencies.to_vec());
    }

    /// Credit `cycles` to the section open on `core` and extend it to `end`.
    pub(crate) fn executed(&mut self, core: usize, cycles: f64, end: f64) {
        if let Some(section) = self.open_sections[core].as_mut() {
            section.number_of_executed_cycles += cycles;
            section.execution_end_time = end;
        }
    }

    /// Close the section of `core` if it belongs to a job that just ended.
    pub(crate) fn job_ended(
        &mut self,
        trace: &mut SimulationTrace,
        task: TaskId,
        job: usize,
    ) {
        for (k, open) in self.open_sections.iter_mut().enumerate() {
            if open.as_ref().is_some_and(|s| s.task_id == task && s.job_id == job) {
                if let Some(section) = open.take() {
                    trace.job_sections_execution[k].push(section);
                }
            }
        }
        if let Some(last) = self.last_assignment.as_mut() {
            for slot in last.iter_mut() {
                if *slot == Some((task, job)) {
                    *slot = None;
                }
            }
        }
    }

    /// Close everything still open at `end`.
    pub(crate) fn finish(mut self, trace: &mut SimulationTrace, end: f64) {
        for (k, open) in self.open_sections.iter_mut().enumerate() {
            if let Some(section) = open.take() {
                trace.job_sections_execution[k].push(section);
            }
        }
        for (k, open) in self.open_frequencies.iter_mut().enumerate() {
            if let Some(mut interval) = open.take() {
                interval.frequency_unset_time = end;
                trace.cpus_frequencies[k].push(interval);
            }
        }
        for sections in &mut trace.job_sections_execution {
            sections.sort_by(|a, b| a.execution_start_time.total_cmp(&b.execution_start_time));
        }
        trace.end_time = end;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_split_on_task_change() {
        let mut trace = SimulationTrace::new(1);
        let mut rec = TraceRecorder::new(1);
        rec.decide(&mut trace, 0.0, &[Some((0, 0))], &[1.0]);
        rec.executed(0, 10.0, 0.01);
        rec.decide(&mut trace, 0.01, &[Some((0, 0))], &[1.0]);
        rec.executed(0, 10.0, 0.02);
        rec.decide(&mut trace, 0.02, &[Some((1, 0))], &[1.0]);
        rec.executed(0, 5.0, 0.03);
        rec.finish(&mut trace, 0.03);

        let sections = &trace.job_sections_execution[0];
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].task_id, 0);
        assert_eq!(sections[0].execution_end_time, 0.02);
        assert_eq!(sections[0].number_of_executed_cycles, 20.0);
        assert_eq!(sections[1].task_id, 1);
        assert_eq!(trace.scheduling_points, vec![0.0, 0.02]);
        assert_eq!(trace.executed_cycles_of(0), 20.0);
    }

    #[test]
    fn frequency_intervals_close_on_change_and_at_the_end() {
        let mut trace = SimulationTrace::new(1);
        let mut rec = TraceRecorder::new(1);
        rec.decide(&mut trace, 0.0, &[None], &[1.0]);
        rec.decide(&mut trace, 1.0, &[None], &[0.5]);
        rec.finish(&mut trace, 2.0);
        assert_eq!(
            trace.cpus_frequencies[0],
            vec![
                CpuUsedFrequency {
                    frequency_used: 1.0,
                    frequency_set_time: 0.0,
                    frequency_unset_time: 1.0
                },
                CpuUsedFrequency {
                    frequency_used: 0.5,
                    frequency_set_time: 1.0,
                    frequency_unset_time: 2.0
                },
            ]
        );
    }

    #[test]
    fn migration_count_follows_jobs_across_cores() {
        let mut trace = SimulationTrace::new(2);
        let mut rec = TraceRecorder::new(2);
        rec.decide(&mut trace, 0.0, &[Some((0, 0)), Some((1, 0))], &[1.0, 1.0]);
        rec.decide(&mut trace, 1.0, &[Some((1, 0)), Some((0, 0))], &[1.0, 1.0]);
        rec.finish(&mut trace, 2.0);
        assert_eq!(trace.migrations(), 2);
    }
}
