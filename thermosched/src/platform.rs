/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Physical description of the simulated platform.
//!
//! All lengths are in millimetres, densities in kg/m³, specific heat in
//! J/(kg·K), thermal conductivity in W/(m·K), convection in W/(m²·K) and
//! temperatures in °C.  Frequencies are relative to
//! [`CpuSpecification::clock_base_frequency`] (so `1.0` is full speed).

use serde::Serialize;

/// Rectangular block of a homogeneous material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialCuboid {
    /// Width along the x axis (mm).
    pub x: f64,
    /// Depth along the y axis (mm).
    pub y: f64,
    /// Thickness (mm).
    pub z: f64,
    /// Density (kg/m³).
    pub density: f64,
    /// Specific heat capacity (J/(kg·K)).
    pub specific_heat: f64,
    /// Thermal conductivity (W/(m·K)).
    pub thermal_conductivity: f64,
}

impl MaterialCuboid {
    /// Heat capacity (J/K) of a `step × step × z` cell of this material.
    pub fn cell_heat_capacity(&self, step_mm: f64) -> f64 {
        let volume_m3 = step_mm * step_mm * self.z * 1e-9;
        self.density * self.specific_heat * volume_m3
    }

    /// In-plane conductance (W/K) between two neighbouring cells.
    ///
    /// Cross-section `step · z`, distance `step`, so the step cancels.
    pub fn lateral_conductance(&self) -> f64 {
        self.thermal_conductivity * self.z * 1e-3
    }
}

/// Dynamic power model `P = α·f³ + β` of a busy core at relative frequency `f`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyConsumption {
    pub dynamic_alpha: f64,
    pub dynamic_beta: f64,
}

impl EnergyConsumption {
    pub fn dynamic_power(&self, relative_frequency: f64) -> f64 {
        self.dynamic_alpha * relative_frequency.powi(3) + self.dynamic_beta
    }
}

impl Default for EnergyConsumption {
    fn default() -> Self {
        Self {
            dynamic_alpha: 1.52,
            dynamic_beta: 0.08,
        }
    }
}

/// Placement of a core's lower-left corner on the board (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
}

/// Cores of the CPU: count, physical block and placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoresSpecification {
    pub number_of_cores: usize,

    /// Physical block of one core (every core is identical).
    pub physical_properties: MaterialCuboid,

    pub energy_consumption: EnergyConsumption,

    /// Explicit placement of every core.  `None` lays cores out in a row,
    /// evenly spaced along x and centred along y.
    pub origins: Option<Vec<Origin>>,
}

/// CPU description: board, cores and clock frequencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSpecification {
    pub board: MaterialCuboid,
    pub cores: CoresSpecification,

    /// Base clock frequency in Hz.  Task cycles are counted at this clock.
    pub clock_base_frequency: f64,

    /// Available relative frequencies, sorted ascending.
    pub clock_available_frequencies: Vec<f64>,

    /// Relative frequency selected for each core at start-up.
    pub clock_relative_frequencies: Vec<f64>,
}

impl CpuSpecification {
    pub fn number_of_cores(&self) -> usize {
        self.cores.number_of_cores
    }

    /// Lowest available relative frequency (`1.0` when none are listed).
    pub fn min_frequency(&self) -> f64 {
        self.clock_available_frequencies
            .first()
            .copied()
            .unwrap_or(1.0)
    }

    /// Highest available relative frequency (`1.0` when none are listed).
    pub fn max_frequency(&self) -> f64 {
        self.clock_available_frequencies
            .last()
            .copied()
            .unwrap_or(1.0)
    }

    /// Core origins, explicit or laid out in a centred row.
    pub fn core_origins(&self) -> Vec<Origin> {
        if let Some(origins) = &self.cores.origins {
            return origins.clone();
        }
        let m = self.cores.number_of_cores.max(1) as f64;
        let core = &self.cores.physical_properties;
        let slot = self.board.x / m;
        (0..self.cores.number_of_cores)
            .map(|k| Origin {
                x: slot * k as f64 + (slot - core.x) / 2.0,
                y: (self.board.y - core.y) / 2.0,
            })
            .collect()
    }
}

/// Surroundings of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSpecification {
    /// Convection coefficient h (W/(m²·K)).
    pub convection_factor: f64,
    /// Ambient temperature (°C); also the initial temperature of every cell.
    pub environment_temperature: f64,
    /// Highest admissible core temperature (°C).  Reported, not enforced.
    pub max_temperature: f64,
}

impl Default for EnvironmentSpecification {
    fn default() -> Self {
        Self {
            convection_factor: 0.001,
            environment_temperature: 45.0,
            max_temperature: 110.0,
        }
    }
}

// ── Test helpers ──────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn copper_board() -> MaterialCuboid {
        MaterialCuboid {
            x: 50.0,
            y: 50.0,
            z: 1.0,
            density: 8933.0,
            specific_heat: 385.0,
            thermal_conductivity: 400.0,
        }
    }

    pub fn silicon_core() -> MaterialCuboid {
        MaterialCuboid {
            x: 10.0,
            y: 10.0,
            z: 2.0,
            density: 2330.0,
            specific_heat: 712.0,
            thermal_conductivity: 148.0,
        }
    }

    /// `m` cores at 1 kHz base clock, frequencies 0.15..1.0, all at 1.0.
    pub fn cpu(m: usize) -> CpuSpecification {
        CpuSpecification {
            board: copper_board(),
            cores: CoresSpecification {
                number_of_cores: m,
                physical_properties: silicon_core(),
                energy_consumption: EnergyConsumption::default(),
                origins: None,
            },
            clock_base_frequency: 1_000.0,
            clock_available_frequencies: vec![0.15, 0.4, 0.6, 0.85, 1.0],
            clock_relative_frequencies: vec![1.0; m],
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn dynamic_power_is_cubic_in_frequency() {
        let e = EnergyConsumption {
            dynamic_alpha: 2.0,
            dynamic_beta: 0.5,
        };
        assert!((e.dynamic_power(1.0) - 2.5).abs() < 1e-12);
        assert!((e.dynamic_power(0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn cell_heat_capacity_of_copper_millimetre_cell() {
        // 8933 · 385 · 1e-9 m³
        let c = copper_board().cell_heat_capacity(1.0);
        assert!((c - 8933.0 * 385.0 * 1e-9).abs() < 1e-15);
    }

    #[test]
    fn default_origins_are_a_centred_row() {
        let origins = cpu(2).core_origins();
        assert_eq!(origins.len(), 2);
        // slot = 25 mm, core = 10 mm → 7.5 mm margin
        assert_eq!(origins[0], Origin { x: 7.5, y: 20.0 });
        assert_eq!(origins[1], Origin { x: 32.5, y: 20.0 });
    }

    #[test]
    fn explicit_origins_are_kept() {
        let mut c = cpu(1);
        c.cores.origins = Some(vec![Origin { x: 1.0, y: 2.0 }]);
        assert_eq!(c.core_origins(), vec![Origin { x: 1.0, y: 2.0 }]);
    }

    #[test]
    fn frequency_bounds_follow_sorted_list() {
        let c = cpu(2);
        assert_eq!(c.min_frequency(), 0.15);
        assert_eq!(c.max_frequency(), 1.0);
    }
}
