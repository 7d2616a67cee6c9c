/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Continuous Petri-net (TCPN) model generator.
//!
//! Both sub-models share one algebraic shape:
//!
//! ```text
//! C = Post − Pre            places × transitions
//! Λ = diag(λ)               firing rates
//! Π                         transitions × places, flow_t = λ_t · (Π·m)_t
//! m' = m + C·Λ·Π·m · h      one Euler sub-step of length h
//! ```
//!
//! * [`processor`] – dense; allocation and execution of tasks on cores.
//! * [`thermal`]   – sparse; heat conduction, convection and generation.
//!
//! The generators are pure functions of the system definition: two calls
//! with the same input produce bit-identical matrices.

pub mod processor;
pub mod thermal;

pub use processor::{generate_processor_model, ProcessorModel};
pub use thermal::{generate_thermal_model, ThermalModel};

use crate::error::ConfigurationError;

/// Reject negative or non-finite firing rates.
pub(crate) fn check_rates(model: &'static str, rates: &[f64]) -> Result<(), ConfigurationError> {
    match rates
        .iter()
        .enumerate()
        .find(|(_, r)| !r.is_finite() || **r < 0.0)
    {
        Some((transition, &rate)) => Err(ConfigurationError::InvalidRate {
            model,
            transition,
            rate,
        }),
        None => Ok(()),
    }
}
