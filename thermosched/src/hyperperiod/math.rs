/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Integer GCD / checked LCM over clock ticks or cycle counts.

use super::HyperperiodError;

/// Euclid's algorithm.  `gcd(0, x) == x`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// LCM with overflow detection.
///
/// Divides before multiplying, `(a / gcd) · b`, and checks the product.
/// `lcm(0, x) == 0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// Fold a slice of periods into their LCM.  An empty slice yields `0`.
pub fn lcm_of_slice(periods: &[u64]) -> Result<u64, HyperperiodError> {
    let Some((&first, rest)) = periods.split_first() else {
        return Ok(0);
    };
    rest.iter().try_fold(first, |acc, &p| lcm(acc, p))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
