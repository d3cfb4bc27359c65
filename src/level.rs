//! Experience to level conversion.
//!
//! A table maps each level (the index) to the minimum cumulative experience
//! needed to reach it. Tables must be non-decreasing and start at 0.

use serde::Serialize;
use std::sync::LazyLock;

/// Highest level in the built-in table.
pub const MAX_LEVEL: usize = 99;

/// Built-in experience table covering levels `0..=MAX_LEVEL`.
pub static EXPERIENCE_TABLE: LazyLock<Vec<u64>> = LazyLock::new(|| experience_table(MAX_LEVEL));

/// Build a table for levels `0..=max_level` on the classic curve:
/// each level adds `floor(l + 300 * 2^(l / 7)) / 4` experience.
pub fn experience_table(max_level: usize) -> Vec<u64> {
    let mut table = Vec::with_capacity(max_level + 1);
    table.push(0);

    let mut points: u64 = 0;
    for level in 1..=max_level {
        let l = level as f64;
        points += (l + 300.0 * 2f64.powf(l / 7.0)).floor() as u64;
        table.push(points / 4);
    }

    table
}

/// Greatest level whose threshold is at or below `total_experience`.
///
/// Experience beyond the last threshold is capped at the last level.
pub fn level_for_experience(total_experience: u64, table: &[u64]) -> usize {
    table
        .partition_point(|&threshold| threshold <= total_experience)
        .saturating_sub(1)
}

/// Experience still needed to reach the next level, or 0 at the top of the table.
pub fn experience_to_next_goal(total_experience: u64, table: &[u64]) -> u64 {
    let level = level_for_experience(total_experience, table);
    table
        .get(level + 1)
        .map(|goal| goal.saturating_sub(total_experience))
        .unwrap_or(0)
}

/// Level summary returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub experience: u64,
    pub level: usize,
    /// Threshold of the next level, `None` once the table is exhausted.
    pub next_level_experience: Option<u64>,
    pub experience_to_next_level: u64,
}

impl LevelProgress {
    pub fn new(total_experience: u64, table: &[u64]) -> Self {
        let level = level_for_experience(total_experience, table);
        Self {
            experience: total_experience,
            level,
            next_level_experience: table.get(level + 1).copied(),
            experience_to_next_level: experience_to_next_goal(total_experience, table),
        }
    }
}
