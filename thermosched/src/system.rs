/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The complete, already-parsed input of one simulation run.

use serde::Serialize;

use crate::error::ConfigurationError;
use crate::platform::{CpuSpecification, EnvironmentSpecification};
use crate::task::TasksSpecification;

/// Default rate constant η of the processor Petri net.
pub const DEFAULT_ETA: f64 = 100.0;

/// Numerical parameters of the time discretisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSpecification {
    /// Default scheduling quantum (s).
    pub dt: f64,

    /// Horizon of the run (s).  `None` simulates one hyperperiod.
    pub horizon: Option<f64>,

    /// Euler sub-steps per quantum for the processor model.
    pub processor_substeps: u32,

    /// Euler sub-steps per quantum for the thermal model.
    pub thermal_substeps: u32,

    /// Decimal digits kept when comparing instants.
    pub float_round: u32,

    /// Side of a thermal mesh cell (mm).
    pub mesh_step: f64,

    /// Simulate the thermal model alongside the processor model.
    pub thermal: bool,

    /// Keep every thermal cell's temperature at every quantum in the trace.
    pub record_thermal_map: bool,
}

impl Default for SimulationSpecification {
    fn default() -> Self {
        Self {
            dt: 0.01,
            horizon: None,
            processor_substeps: 100,
            thermal_substeps: 10,
            float_round: 5,
            mesh_step: 1.0,
            thermal: false,
            record_thermal_map: false,
        }
    }
}

/// Parameters of the continuous Petri-net encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcpnSpecification {
    /// Rate constant η: execution rate `η·f`, allocation rate `η²·f`.
    pub eta: f64,
}

impl Default for TcpnSpecification {
    fn default() -> Self {
        Self { eta: DEFAULT_ETA }
    }
}

/// Bundle of every input the simulator consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemDefinition {
    pub tasks: TasksSpecification,
    pub cpu: CpuSpecification,
    pub environment: EnvironmentSpecification,
    pub simulation: SimulationSpecification,
    pub tcpn: TcpnSpecification,
    /// Name of the scheduler plug-in, see [`crate::scheduler::by_name`].
    pub scheduler: String,
}

impl SystemDefinition {
    /// Check the structural preconditions shared by every component.
    ///
    /// Checks (in order): cores, tasks, task timing, frequencies, quantum,
    /// mesh.  Board fit of the cores is checked by the thermal generator as it
    /// is only relevant when the thermal model is built.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let m = self.cpu.number_of_cores();
        if m == 0 {
            return Err(ConfigurationError::NoCores);
        }
        if self.tasks.periodic_tasks.is_empty() {
            return Err(ConfigurationError::NoTasks);
        }

        for (task, t) in self.tasks.periodic_tasks.iter().enumerate() {
            if !(t.period > 0.0) {
                return Err(ConfigurationError::InvalidPeriod {
                    task,
                    period: t.period,
                });
            }
            if !(t.worst_case_cycles > 0.0) {
                return Err(ConfigurationError::InvalidCycles {
                    task,
                    cycles: t.worst_case_cycles,
                });
            }
        }
        let offset = self.tasks.periodic_tasks.len();
        for (i, t) in self.tasks.aperiodic_tasks.iter().enumerate() {
            let task = offset + i;
            if !(t.worst_case_cycles > 0.0) {
                return Err(ConfigurationError::InvalidCycles {
                    task,
                    cycles: t.worst_case_cycles,
                });
            }
            if !(t.deadline > t.arrival) || t.arrival < 0.0 {
                return Err(ConfigurationError::InvalidAperiodicWindow {
                    task,
                    arrival: t.arrival,
                    deadline: t.deadline,
                });
            }
        }

        if self.cpu.clock_available_frequencies.is_empty() {
            return Err(ConfigurationError::NoFrequencies);
        }
        if self.cpu.clock_relative_frequencies.len() != m {
            return Err(ConfigurationError::FrequencyCountMismatch {
                expected: m,
                found: self.cpu.clock_relative_frequencies.len(),
            });
        }
        for &frequency in &self.cpu.clock_relative_frequencies {
            let known = self
                .cpu
                .clock_available_frequencies
                .iter()
                .any(|&f| (f - frequency).abs() < 1e-12);
            if !known {
                return Err(ConfigurationError::UnsupportedFrequency { frequency });
            }
        }
        if !(self.cpu.clock_base_frequency > 0.0) {
            return Err(ConfigurationError::InvalidStep(format!(
                "base frequency must be positive, got {}",
                self.cpu.clock_base_frequency
            )));
        }

        let sim = &self.simulation;
        if !(sim.dt > 0.0) {
            return Err(ConfigurationError::InvalidStep(format!(
                "quantum must be positive, got {}",
                sim.dt
            )));
        }
        if sim.processor_substeps == 0 || sim.thermal_substeps == 0 {
            return Err(ConfigurationError::InvalidStep(
                "sub-step counts must be at least 1".to_string(),
            ));
        }
        if sim.thermal && !(sim.mesh_step > 0.0) {
            return Err(ConfigurationError::InvalidStep(format!(
                "mesh step must be positive, got {}",
                sim.mesh_step
            )));
        }
        if !(self.tcpn.eta > 0.0) {
            return Err(ConfigurationError::InvalidStep(format!(
                "eta must be positive, got {}",
                self.tcpn.eta
            )));
        }

        Ok(())
    }
}

// ── Test helpers ──────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::platform::fixtures::cpu;
    use crate::task::PeriodicTask;

    /// Two cores, tasks (2000, 4 s), (5000, 8 s), (6000, 12 s) at 1 kHz.
    pub fn three_task_system() -> SystemDefinition {
        SystemDefinition {
            tasks: TasksSpecification::new(
                vec![
                    PeriodicTask::new(2_000.0, 4.0),
                    PeriodicTask::new(5_000.0, 8.0),
                    PeriodicTask::new(6_000.0, 12.0),
                ],
                vec![],
            ),
            cpu: cpu(2),
            environment: EnvironmentSpecification::default(),
            simulation: SimulationSpecification::default(),
            tcpn: TcpnSpecification::default(),
            scheduler: "jdeds".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
