/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! System definition loading.
//!
//! The expected YAML structure is (JSON works too, it is a YAML subset):
//! ```yaml
//! tasks:
//!   periodic:
//!     - worst_case_cycles: 2000
//!       period: 4
//!   aperiodic:
//!     - worst_case_cycles: 1000
//!       arrival: 3
//!       deadline: 7
//! cpu:
//!   board: { x: 50, y: 50, z: 1, density: 8933, specific_heat: 385, thermal_conductivity: 400 }
//!   cores:
//!     number_of_cores: 2
//!     physical_properties: { x: 10, y: 10, z: 2, density: 2330, specific_heat: 712, thermal_conductivity: 148 }
//!     energy_consumption: { dynamic_alpha: 1.52, dynamic_beta: 0.08 }
//!   clock_base_frequency: 1000
//!   clock_available_frequencies: [0.15, 0.4, 0.6, 0.85, 1.0]
//! environment:
//!   convection_factor: 0.001
//!   environment_temperature: 45
//!   max_temperature: 110
//! simulation:
//!   dt: 0.01
//!   thermal: true
//! scheduler: jdeds
//! ```
//!
//! `environment`, `simulation`, `tcpn` and `scheduler` may be omitted.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::platform::{
    CoresSpecification, CpuSpecification, EnergyConsumption, EnvironmentSpecification,
    MaterialCuboid, Origin,
};
use crate::system::{SimulationSpecification, SystemDefinition, TcpnSpecification, DEFAULT_ETA};
use crate::task::{AperiodicTask, PeriodicTask, TasksSpecification};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the file layout.
#[derive(Debug, Deserialize)]
struct SystemFile {
    tasks: TasksEntry,
    cpu: CpuEntry,
    #[serde(default)]
    environment: Option<EnvironmentEntry>,
    #[serde(default)]
    simulation: SimulationEntry,
    #[serde(default)]
    tcpn: TcpnEntry,
    #[serde(default = "default_scheduler")]
    scheduler: String,
}

#[derive(Debug, Deserialize)]
struct TasksEntry {
    #[serde(default)]
    periodic: Vec<PeriodicEntry>,
    #[serde(default)]
    aperiodic: Vec<AperiodicEntry>,
}

#[derive(Debug, Deserialize)]
struct PeriodicEntry {
    worst_case_cycles: f64,
    period: f64,
    energy: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AperiodicEntry {
    worst_case_cycles: f64,
    arrival: f64,
    deadline: f64,
    energy: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CuboidEntry {
    x: f64,
    y: f64,
    z: f64,
    density: f64,
    specific_heat: f64,
    thermal_conductivity: f64,
}

#[derive(Debug, Deserialize)]
struct EnergyEntry {
    dynamic_alpha: f64,
    dynamic_beta: f64,
}

#[derive(Debug, Deserialize)]
struct OriginEntry {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct CoresEntry {
    number_of_cores: usize,
    physical_properties: CuboidEntry,
    energy_consumption: Option<EnergyEntry>,
    origins: Option<Vec<OriginEntry>>,
}

#[derive(Debug, Deserialize)]
struct CpuEntry {
    board: CuboidEntry,
    cores: CoresEntry,
    clock_base_frequency: f64,
    clock_available_frequencies: Vec<f64>,
    /// Defaults to the highest available frequency on every core.
    clock_relative_frequencies: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentEntry {
    convection_factor: f64,
    environment_temperature: f64,
    max_temperature: f64,
}

/// Every field is optional; missing values take the
/// [`SimulationSpecification`] defaults.
#[derive(Debug, Default, Deserialize)]
struct SimulationEntry {
    dt: Option<f64>,
    horizon: Option<f64>,
    processor_substeps: Option<u32>,
    thermal_substeps: Option<u32>,
    float_round: Option<u32>,
    mesh_step: Option<f64>,
    thermal: Option<bool>,
    record_thermal_map: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TcpnEntry {
    #[serde(default = "default_eta")]
    eta: f64,
}

impl Default for TcpnEntry {
    fn default() -> Self {
        Self { eta: DEFAULT_ETA }
    }
}

fn default_scheduler() -> String {
    "jdeds".to_string()
}

fn default_eta() -> f64 {
    DEFAULT_ETA
}

// ── Conversion ────────────────────────────────────────────────────────────────

impl From<CuboidEntry> for MaterialCuboid {
    fn from(e: CuboidEntry) -> Self {
        Self {
            x: e.x,
            y: e.y,
            z: e.z,
            density: e.density,
            specific_heat: e.specific_heat,
            thermal_conductivity: e.thermal_conductivity,
        }
    }
}

impl From<SimulationEntry> for SimulationSpecification {
    fn from(e: SimulationEntry) -> Self {
        let d = SimulationSpecification::default();
        Self {
            dt: e.dt.unwrap_or(d.dt),
            horizon: e.horizon.or(d.horizon),
            processor_substeps: e.processor_substeps.unwrap_or(d.processor_substeps),
            thermal_substeps: e.thermal_substeps.unwrap_or(d.thermal_substeps),
            float_round: e.float_round.unwrap_or(d.float_round),
            mesh_step: e.mesh_step.unwrap_or(d.mesh_step),
            thermal: e.thermal.unwrap_or(d.thermal),
            record_thermal_map: e.record_thermal_map.unwrap_or(d.record_thermal_map),
        }
    }
}

impl From<CpuEntry> for CpuSpecification {
    fn from(e: CpuEntry) -> Self {
        let mut available = e.clock_available_frequencies;
        available.sort_by(f64::total_cmp);
        available.dedup();

        let m = e.cores.number_of_cores;
        let relative = e.clock_relative_frequencies.unwrap_or_else(|| {
            let top = available.last().copied().unwrap_or(1.0);
            vec![top; m]
        });

        Self {
            board: e.board.into(),
            cores: CoresSpecification {
                number_of_cores: m,
                physical_properties: e.cores.physical_properties.into(),
                energy_consumption: e
                    .cores
                    .energy_consumption
                    .map(|c| EnergyConsumption {
                        dynamic_alpha: c.dynamic_alpha,
                        dynamic_beta: c.dynamic_beta,
                    })
                    .unwrap_or_default(),
                origins: e.cores.origins.map(|list| {
                    list.into_iter()
                        .map(|o| Origin { x: o.x, y: o.y })
                        .collect()
                }),
            },
            clock_base_frequency: e.clock_base_frequency,
            clock_available_frequencies: available,
            clock_relative_frequencies: relative,
        }
    }
}

// ── SystemConfigLoader ────────────────────────────────────────────────────────

/// Reads a [`SystemDefinition`] from disk.
#[derive(Debug, Default)]
pub struct SystemConfigLoader;

impl SystemConfigLoader {
    /// Parse and validate the definition stored at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is
    /// structurally invalid, or the definition fails
    /// [`SystemDefinition::validate`].
    pub fn load_from_file(path: &Path) -> Result<SystemDefinition> {
        info!("Loading system definition from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open system definition: {}", path.display()))?;

        Self::load_from_str(&content)
            .with_context(|| format!("Invalid system definition: {}", path.display()))
    }

    /// Parse and validate a definition held in memory.
    pub fn load_from_str(content: &str) -> Result<SystemDefinition> {
        let file: SystemFile =
            serde_yaml::from_str(content).context("Failed to parse system definition")?;

        if file.environment.is_none() {
            warn!("No environment section, using default ambient conditions");
        }

        let tasks = TasksSpecification::new(
            file.tasks
                .periodic
                .into_iter()
                .map(|t| PeriodicTask {
                    worst_case_cycles: t.worst_case_cycles,
                    period: t.period,
                    energy: t.energy,
                })
                .collect(),
            file.tasks
                .aperiodic
                .into_iter()
                .map(|t| AperiodicTask {
                    worst_case_cycles: t.worst_case_cycles,
                    arrival: t.arrival,
                    deadline: t.deadline,
                    energy: t.energy,
                })
                .collect(),
        );

        let system = SystemDefinition {
            tasks,
            cpu: file.cpu.into(),
            environment: file
                .environment
                .map(|e| EnvironmentSpecification {
                    convection_factor: e.convection_factor,
                    environment_temperature: e.environment_temperature,
                    max_temperature: e.max_temperature,
                })
                .unwrap_or_default(),
            simulation: file.simulation.into(),
            tcpn: TcpnSpecification { eta: file.tcpn.eta },
            scheduler: file.scheduler,
        };

        system.validate().context("System definition rejected")?;

        for (i, t) in system.tasks.periodic_tasks.iter().enumerate() {
            debug!("  Periodic task {}: {} cycles every {} s", i, t.worst_case_cycles, t.period);
        }
        info!(
            periodic = system.tasks.periodic_tasks.len(),
            aperiodic = system.tasks.aperiodic_tasks.len(),
            cores = system.cpu.number_of_cores(),
            scheduler = %system.scheduler,
            thermal = system.simulation.thermal,
            "System definition loaded"
        );

        Ok(system)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const CPU: &str = r#"
cpu:
  board: { x: 50, y: 50, z: 1, density: 8933, specific_heat: 385, thermal_conductivity: 400 }
  cores:
    number_of_cores: 2
    physical_properties: { x: 10, y: 10, z: 2, density: 2330, specific_heat: 712, thermal_conductivity: 148 }
  clock_base_frequency: 1000
  clock_available_frequencies: [1.0, 0.15, 0.6, 0.4, 0.85]
"#;

    fn make_yaml(tasks: &str, rest: &str) -> String {
        format!("{tasks}{CPU}{rest}")
    }

    const THREE_TASKS: &str = r#"
tasks:
  periodic:
    - { worst_case_cycles: 2000, period: 4 }
    - { worst_case_cycles: 5000, period: 8 }
    - { worst_case_cycles: 6000, period: 12, energy: 0.5 }
  aperiodic:
    - { worst_case_cycles: 1000, arrival: 3, deadline: 7 }
"#;

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_definition() {
        let yaml = make_yaml(
            THREE_TASKS,
            r#"
environment: { convection_factor: 0.002, environment_temperature: 25, max_temperature: 90 }
simulation: { dt: 0.02, horizon: 48, thermal: true, mesh_step: 5 }
tcpn: { eta: 50 }
scheduler: global_edf
"#,
        );
        let f = yaml_tempfile(&yaml);
        let system = SystemConfigLoader::load_from_file(f.path()).unwrap();

        assert_eq!(system.tasks.periodic_tasks.len(), 3);
        assert_eq!(system.tasks.periodic_tasks[2].energy, Some(0.5));
        assert_eq!(system.tasks.aperiodic_tasks[0].deadline, 7.0);
        assert_eq!(system.cpu.number_of_cores(), 2);
        assert_eq!(system.environment.environment_temperature, 25.0);
        assert_eq!(system.simulation.dt, 0.02);
        assert_eq!(system.simulation.horizon, Some(48.0));
        assert!(system.simulation.thermal);
        assert_eq!(system.simulation.processor_substeps, 100);
        assert_eq!(system.tcpn.eta, 50.0);
        assert_eq!(system.scheduler, "global_edf");
    }

    #[test]
    fn optional_sections_use_defaults_when_absent() {
        let f = yaml_tempfile(&make_yaml(THREE_TASKS, ""));
        let system = SystemConfigLoader::load_from_file(f.path()).unwrap();

        assert_eq!(system.environment, EnvironmentSpecification::default());
        assert_eq!(system.simulation, SimulationSpecification::default());
        assert_eq!(system.tcpn.eta, 100.0);
        assert_eq!(system.scheduler, "jdeds");
        assert_eq!(system.cpu.cores.energy_consumption, EnergyConsumption::default());
    }

    #[test]
    fn available_frequencies_are_sorted_and_cores_start_at_the_top() {
        let system = SystemConfigLoader::load_from_str(&make_yaml(THREE_TASKS, "")).unwrap();
        assert_eq!(
            system.cpu.clock_available_frequencies,
            vec![0.15, 0.4, 0.6, 0.85, 1.0]
        );
        assert_eq!(system.cpu.clock_relative_frequencies, vec![1.0, 1.0]);
    }

    #[test]
    fn json_is_accepted() {
        let json = r#"{
  "tasks": { "periodic": [ { "worst_case_cycles": 2000, "period": 4 } ] },
  "cpu": {
    "board": { "x": 50, "y": 50, "z": 1, "density": 8933, "specific_heat": 385, "thermal_conductivity": 400 },
    "cores": {
      "number_of_cores": 1,
      "physical_properties": { "x": 10, "y": 10, "z": 2, "density": 2330, "specific_heat": 712, "thermal_conductivity": 148 }
    },
    "clock_base_frequency": 1000,
    "clock_available_frequencies": [0.5, 1.0]
  }
}"#;
        let system = SystemConfigLoader::load_from_str(json).unwrap();
        assert_eq!(system.cpu.number_of_cores(), 1);
        assert_eq!(system.tasks.periodic_tasks[0].period, 4.0);
    }

    #[test]
    fn missing_file_returns_error() {
        let result = SystemConfigLoader::load_from_file(Path::new("/nonexistent/path/system.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(SystemConfigLoader::load_from_file(f.path()).is_err());
    }

    #[test]
    fn invalid_definition_is_rejected_after_parsing() {
        let yaml = make_yaml(
            "tasks:\n  periodic:\n    - { worst_case_cycles: 2000, period: 0 }\n",
            "",
        );
        let err = SystemConfigLoader::load_from_str(&yaml).unwrap_err();
        assert!(format!("{err:#}").contains("non-positive period"));
    }

    #[test]
    fn empty_task_list_is_rejected() {
        let yaml = make_yaml("tasks: {}\n", "");
        assert!(SystemConfigLoader::load_from_str(&yaml).is_err());
    }
}
