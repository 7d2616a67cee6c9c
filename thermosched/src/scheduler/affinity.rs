/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core affinity.
//!
//! After a scheduler has chosen the set of tasks for the next quantum, the
//! order of that set across cores is free among cores running at the same
//! frequency.  [`apply_affinity`] uses that freedom to keep every task on the
//! core it already occupies.

use crate::task::TaskId;

/// Swap slots of `next` so that a task running on core `i` in `active` stays
/// on core `i`, as long as its new slot runs at the same frequency.
///
/// Idle slots in `active` pin nothing.
pub fn apply_affinity(
    active: &[Option<TaskId>],
    next: &mut [Option<TaskId>],
    frequencies: &[f64],
) {
    let m = next.len().min(active.len()).min(frequencies.len());
    for i in 0..m {
        let Some(current) = active[i] else {
            continue;
        };
        for j in 0..m {
            if j != i && next[j] == Some(current) && frequencies[j] == frequencies[i] {
                next.swap(i, j);
            }
        }
    }
}

/// Tasks that run on a different core in `next` than in `active`.
pub fn migrations(active: &[Option<TaskId>], next: &[Option<TaskId>]) -> usize {
    next.iter()
        .enumerate()
        .filter_map(|(j, task)| task.map(|t| (j, t)))
        .filter(|&(j, t)| {
            active
                .iter()
                .position(|&a| a == Some(t))
                .is_some_and(|i| i != j)
        })
        .count()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
