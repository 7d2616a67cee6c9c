/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thermal- and frequency-aware multiprocessor real-time scheduling simulator.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task/          – periodic / aperiodic tasks, ids, hyperperiod of a task set
//! ├── platform/      – CPU, cores, board materials, power model, environment
//! ├── system/        – SystemDefinition bundle and validation
//! ├── config/        – YAML loading of a SystemDefinition
//! ├── hyperperiod/   – GCD / checked LCM helpers
//! ├── model/         – continuous Petri nets: processor (dense), thermal (sparse)
//! ├── engine/        – Euler step, matrix-power shortcut, stability check
//! ├── partition/     – offline LP interval partition, feasibility helpers
//! ├── scheduler/     – plug-in contract, JDEDS, global EDF
//! ├── simulator/     – lock-step driver and trace
//! └── error/         – top-level error taxonomy
//! ```
//!
//! # Example
//! ```rust,ignore
//! let system = config::SystemConfigLoader::load_from_file(path)?;
//! let mut scheduler = scheduler::by_name(&system.scheduler)?;
//! let trace = simulator::simulate(&system, scheduler.as_mut())?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hyperperiod;
pub mod model;
pub mod partition;
pub mod platform;
pub mod scheduler;
pub mod simulator;
pub mod system;
pub mod task;
