/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Utilisation bounds and operating-frequency selection.
//!
//! # Theory
//! A set of implicit-deadline periodic tasks is schedulable by a fluid
//! (fair-share) scheduler on `m` identical cores if and only if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq m \quad\text{and}\quad C_i \leq T_i \;\forall i$$
//!
//! Running every core at relative frequency `φ` scales each `C_i` by `1/φ`,
//! so the slowest frequency that keeps the bound is
//!
//! $$\varphi^* = \max\left(\varphi_{min}, \frac{U}{m \cdot \varphi_{max}}\right)$$
//!
//! where `U` is measured at the base clock.  The operating frequency is the
//! smallest available frequency at or above `φ*`.

// ── Public API ────────────────────────────────────────────────────────────────

/// `Σ cycles_i / periods_i`, both in the same unit.
///
/// Tasks with a zero period contribute nothing.
pub fn total_utilization(cycles: &[f64], periods: &[f64]) -> f64 {
    cycles
        .iter()
        .zip(periods)
        .filter(|&(_, &t)| t > 0.0)
        .map(|(&c, &t)| c / t)
        .sum()
}

/// Index of the first task whose requirement exceeds its own period.
pub fn first_overlong_task(cycles: &[f64], periods: &[f64]) -> Option<usize> {
    cycles
        .iter()
        .zip(periods)
        .position(|(&c, &t)| c > t)
}

/// Lowest relative frequency `φ*` at which `utilization` fits on `cores`.
///
/// `utilization` is measured at the base clock (relative frequency 1.0).
pub fn minimum_relative_frequency(
    utilization: f64,
    cores: usize,
    min_frequency: f64,
    max_frequency: f64,
) -> f64 {
    if cores == 0 || max_frequency <= 0.0 {
        return f64::INFINITY;
    }
    min_frequency.max(utilization / (cores as f64 * max_frequency))
}

/// All available frequencies at or above `phi`, ascending.
///
/// Empty when even the fastest frequency is too slow.
pub fn candidate_frequencies(available: &[f64], phi: f64) -> Vec<f64> {
    let mut candidates: Vec<f64> = available.iter().copied().filter(|&f| f >= phi).collect();
    candidates.sort_by(f64::total_cmp);
    candidates
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_zero_tasks_is_zero() {
        assert_eq!(total_utilization(&[], &[]), 0.0);
    }

    #[test]
    fn utilization_of_classic_three_task_set() {
        //   C=2 T=4 → 0.5, C=5 T=8 → 0.625, C=6 T=12 → 0.5
        let u = total_utilization(&[2.0, 5.0, 6.0], &[4.0, 8.0, 12.0]);
        assert!((u - 1.625).abs() < 1e-12, "U should be 1.625, got {u}");
    }

    #[test]
    fn zero_period_task_is_skipped() {
        let u = total_utilization(&[2.0, 3.0], &[4.0, 0.0]);
        assert!((u - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overlong_task_is_found() {
        assert_eq!(first_overlong_task(&[2.0, 5.0], &[4.0, 4.0]), Some(1));
        assert_eq!(first_overlong_task(&[4.0], &[4.0]), None);
    }

    #[test]
    fn phi_star_is_clamped_to_min_frequency() {
        let phi = minimum_relative_frequency(0.1, 2, 0.15, 1.0);
        assert_eq!(phi, 0.15);
    }

    #[test]
    fn phi_star_scales_with_utilization() {
        // 1.625 / (2 · 1.0)
        let phi = minimum_relative_frequency(1.625, 2, 0.15, 1.0);
        assert!((phi - 0.8125).abs() < 1e-12);
    }

    #[test]
    fn candidates_start_at_first_frequency_above_phi() {
        let available = [0.15, 0.4, 0.6, 0.85, 1.0];
        assert_eq!(candidate_frequencies(&available, 0.8125), vec![0.85, 1.0]);
        assert_eq!(candidate_frequencies(&available, 0.4), vec![0.4, 0.6, 0.85, 1.0]);
    }

    #[test]
    fn no_candidate_above_max_frequency() {
        assert!(candidate_frequencies(&[0.5, 1.0], 1.2).is_empty());
    }
}
