/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thermal sub-model.
//!
//! The board and every core are meshed into square cells of side
//! `mesh_step`; each cell is one place whose marking is its temperature.
//! Two extra places hold constants: the environment temperature and a unit
//! power source.
//!
//! | Phenomenon | Transitions | Rate |
//! |---|---|---|
//! | conduction `i ↔ j` with conductance `G` | `i→j`, `j→i`; `Post[j] = C_i / C_j` | `G / C_i` |
//! | convection of cell `i` | out of `i`; env self-loop into `i` | `G_conv / C_i` |
//! | heat generation of core `k` | source self-loop into each core cell, weight `1 / (C · cells)` | `α·f³ + β` when busy, else 0 |
//!
//! `C_i` is the heat capacity of cell `i`.  The resulting `C·Λ·Π` is the
//! standard lumped RC network `C_i dT_i/dt = Σ G (T_j − T_i) + P_i`.
//! Matrices are kept in CSR form: each place touches at most six neighbours.

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use tracing::info;

use super::check_rates;
use crate::error::ConfigurationError;
use crate::platform::{CpuSpecification, EnvironmentSpecification};

/// Sparse matrices of the thermal Petri net.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalModel {
    pub pre: CsrMatrix<f64>,
    pub post: CsrMatrix<f64>,
    /// `Post − Pre`.
    pub c: CsrMatrix<f64>,
    pub pi: CsrMatrix<f64>,
    /// Firing rates with every core busy at its initial frequency.
    pub lambda: DVector<f64>,
    pub initial_marking: DVector<f64>,

    /// Board cells occupy places `0..board_cells`.
    pub board_cells: usize,
    /// Places of each core's cells.
    pub core_places: Vec<std::ops::Range<usize>>,
    pub environment_place: usize,
    pub source_place: usize,
    /// Heat-generation transition of each core.
    pub heat_transitions: Vec<usize>,

    /// `C` transposed: row `t` lists the places transition `t` changes.
    c_by_transition: CsrMatrix<f64>,
    power_per_core: Vec<crate::platform::EnergyConsumption>,
}

impl ThermalModel {
    pub fn places(&self) -> usize {
        self.initial_marking.len()
    }

    pub fn transitions(&self) -> usize {
        self.lambda.len()
    }

    /// Firing rates for one quantum: heat sources follow `frequencies` on busy
    /// cores and are silent on idle ones.
    pub fn gated_rates(
        &self,
        frequencies: &[f64],
        busy: &[bool],
    ) -> Result<DVector<f64>, ConfigurationError> {
        let m = self.heat_transitions.len();
        if frequencies.len() != m || busy.len() != m {
            return Err(ConfigurationError::FrequencyCountMismatch {
                expected: m,
                found: frequencies.len().min(busy.len()),
            });
        }
        let mut rates = self.lambda.clone();
        for (k, &t) in self.heat_transitions.iter().enumerate() {
            rates[t] = if busy[k] {
                self.power_per_core[k].dynamic_power(frequencies[k])
            } else {
                0.0
            };
        }
        check_rates("thermal", rates.as_slice())?;
        Ok(rates)
    }

    /// `I + C·Λ·Π·h` in CSR form.
    pub fn step_matrix(&self, rates: &DVector<f64>, h: f64) -> CsrMatrix<f64> {
        let p = self.places();
        let mut coo = CooMatrix::new(p, p);
        for i in 0..p {
            coo.push(i, i, 1.0);
        }
        for t in 0..self.transitions() {
            let rate = rates[t];
            if rate == 0.0 {
                continue;
            }
            let c_row = self.c_by_transition.row(t);
            let pi_row = self.pi.row(t);
            for (&place, &c) in c_row.col_indices().iter().zip(c_row.values()) {
                for (&source, &w) in pi_row.col_indices().iter().zip(pi_row.values()) {
                    coo.push(place, source, c * rate * w * h);
                }
            }
        }
        CsrMatrix::from(&coo)
    }

    /// Highest cell temperature of every core.
    pub fn core_max_temperatures(&self, marking: &DVector<f64>) -> Vec<f64> {
        self.core_places
            .iter()
            .map(|range| {
                range
                    .clone()
                    .map(|p| marking[p])
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect()
    }
}

/// Accumulates arcs and rates while the mesh is walked.
struct NetBuilder {
    places: usize,
    pre: Vec<(usize, usize, f64)>,
    post: Vec<(usize, usize, f64)>,
    pi: Vec<(usize, usize, f64)>,
    lambda: Vec<f64>,
}

impl NetBuilder {
    fn new(places: usize) -> Self {
        Self {
            places,
            pre: Vec::new(),
            post: Vec::new(),
            pi: Vec::new(),
            lambda: Vec::new(),
        }
    }

    fn transition(&mut self, rate: f64) -> usize {
        self.lambda.push(rate);
        self.lambda.len() - 1
    }

    /// Two opposite transitions moving heat between cells `i` and `j`.
    fn conduction(&mut self, i: usize, ci: f64, j: usize, cj: f64, g: f64) {
        for (from, c_from, to, c_to) in [(i, ci, j, cj), (j, cj, i, ci)] {
            let t = self.transition(g / c_from);
            self.pre.push((from, t, 1.0));
            self.post.push((to, t, c_from / c_to));
            self.pi.push((t, from, 1.0));
        }
    }

    /// Newton cooling of cell `i` towards the environment place.
    fn convection(&mut self, i: usize, ci: f64, env: usize, g: f64) {
        let out = self.transition(g / ci);
        self.pre.push((i, out, 1.0));
        self.pi.push((out, i, 1.0));

        let inflow = self.transition(g / ci);
        self.pre.push((env, inflow, 1.0));
        self.post.push((env, inflow, 1.0));
        self.post.push((i, inflow, 1.0));
        self.pi.push((inflow, env, 1.0));
    }

    fn csr(rows: usize, cols: usize, entries: &[(usize, usize, f64)]) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(rows, cols);
        for &(r, c, v) in entries {
            coo.push(r, c, v);
        }
        CsrMatrix::from(&coo)
    }
}

fn cells(length_mm: f64, step_mm: f64) -> usize {
    (length_mm / step_mm).round().max(1.0) as usize
}

/// Build the thermal Petri net of `cpu` in `environment` on a mesh of
/// `mesh_step` millimetres.
///
/// # Errors
/// * [`ConfigurationError::NoCores`] – the CPU has no cores.
/// * [`ConfigurationError::InvalidStep`] – non-positive mesh step.
/// * [`ConfigurationError::CoreOutsideBoard`] – a core's cells fall outside the board mesh.
pub fn generate_thermal_model(
    cpu: &CpuSpecification,
    environment: &EnvironmentSpecification,
    mesh_step: f64,
) -> Result<ThermalModel, ConfigurationError> {
    let m = cpu.number_of_cores();
    if m == 0 {
        return Err(ConfigurationError::NoCores);
    }
    if mesh_step.is_nan() || mesh_step <= 0.0 {
        return Err(ConfigurationError::InvalidStep(format!(
            "mesh step must be positive, got {mesh_step}"
        )));
    }

    let board = &cpu.board;
    let core = &cpu.cores.physical_properties;

    let (bx, by) = (cells(board.x, mesh_step), cells(board.y, mesh_step));
    let (cx, cy) = (cells(core.x, mesh_step), cells(core.y, mesh_step));
    let board_cells = bx * by;
    let core_cells = cx * cy;

    let env = board_cells + m * core_cells;
    let source = env + 1;
    let places = source + 1;

    let c_board = board.cell_heat_capacity(mesh_step);
    let c_core = core.cell_heat_capacity(mesh_step);
    let face_m2 = mesh_step * mesh_step * 1e-6;

    let mut net = NetBuilder::new(places);
    let mut covered = vec![false; board_cells];

    // Board lateral conduction
    let g_board = board.lateral_conductance();
    for y in 0..by {
        for x in 0..bx {
            let i = y * bx + x;
            if x + 1 < bx {
                net.conduction(i, c_board, i + 1, c_board, g_board);
            }
            if y + 1 < by {
                net.conduction(i, c_board, i + bx, c_board, g_board);
            }
        }
    }

    // Cores: lateral conduction, vertical coupling to the board, heat source
    let g_core = core.lateral_conductance();
    let r_vertical = (core.z * 0.5e-3) / (core.thermal_conductivity * face_m2)
        + (board.z * 0.5e-3) / (board.thermal_conductivity * face_m2);
    let g_vertical = 1.0 / r_vertical;

    let mut core_places = Vec::with_capacity(m);
    let mut heat_transitions = Vec::with_capacity(m);

    for (k, origin) in cpu.core_origins().iter().enumerate().take(m) {
        let ox = (origin.x / mesh_step).round();
        let oy = (origin.y / mesh_step).round();
        if ox < 0.0 || oy < 0.0 || ox as usize + cx > bx || oy as usize + cy > by {
            return Err(ConfigurationError::CoreOutsideBoard { core: k });
        }
        let (ox, oy) = (ox as usize, oy as usize);
        let base = board_cells + k * core_cells;

        for y in 0..cy {
            for x in 0..cx {
                let i = base + y * cx + x;
                if x + 1 < cx {
                    net.conduction(i, c_core, i + 1, c_core, g_core);
                }
                if y + 1 < cy {
                    net.conduction(i, c_core, i + cx, c_core, g_core);
                }
                let below = (oy + y) * bx + ox + x;
                covered[below] = true;
                net.conduction(i, c_core, below, c_board, g_vertical);
            }
        }

        let heat = net.transition(cpu.cores.energy_consumption.dynamic_power(
            cpu.clock_relative_frequencies.get(k).copied().unwrap_or(1.0),
        ));
        net.pre.push((source, heat, 1.0));
        net.post.push((source, heat, 1.0));
        net.pi.push((heat, source, 1.0));
        let weight = 1.0 / (c_core * core_cells as f64);
        for i in base..base + core_cells {
            net.post.push((i, heat, weight));
        }

        core_places.push(base..base + core_cells);
        heat_transitions.push(heat);
    }

    // Convection: board bottom everywhere, board top where uncovered, core tops
    let g_conv = environment.convection_factor * face_m2;
    for (i, &is_covered) in covered.iter().enumerate() {
        let faces = if is_covered { 1.0 } else { 2.0 };
        net.convection(i, c_board, env, faces * g_conv);
    }
    for i in board_cells..env {
        net.convection(i, c_core, env, g_conv);
    }

    let lambda = DVector::from_vec(net.lambda.clone());
    check_rates("thermal", lambda.as_slice())?;

    let transitions = lambda.len();
    let pre = NetBuilder::csr(places, transitions, &net.pre);
    let post = NetBuilder::csr(places, transitions, &net.post);
    let mut c_entries = net.post.clone();
    c_entries.extend(net.pre.iter().map(|&(r, c, v)| (r, c, -v)));
    let c = NetBuilder::csr(places, transitions, &c_entries);
    let c_by_transition = c.transpose();
    let pi = NetBuilder::csr(transitions, places, &net.pi);

    let mut initial_marking = DVector::from_element(net.places, environment.environment_temperature);
    initial_marking[source] = 1.0;

    info!(
        board_cells,
        core_cells,
        cores = m,
        places,
        transitions,
        nnz_c = c.nnz(),
        "Generated thermal model"
    );

    Ok(ThermalModel {
        pre,
        post,
        c,
        pi,
        lambda,
        initial_marking,
        board_cells,
        core_places,
        environment_place: env,
        source_place: source,
        heat_transitions,
        c_by_transition,
        power_per_core: vec![cpu.cores.energy_consumption.clone(); m],
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
