// ⭐ Experience Engine - leveling + evolution state machine
//
// Experience fills a fixed 100-point bucket per level. One large delta can
// roll over several levels, and the evolution checkpoints (16, 36) are checked
// on every level reached along the way, not just the final one.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Experience needed to go from one level to the next
pub const EXPERIENCE_PER_LEVEL: f64 = 100.0;

/// Level at which a stage-1 Pokemon evolves into stage 2
pub const SECOND_STAGE_LEVEL: i64 = 16;

/// Level at which a stage-2 Pokemon evolves into stage 3
pub const THIRD_STAGE_LEVEL: i64 = 36;

/// Highest evolution stage that exists
pub const MAX_EVOLUTION_STAGE: i64 = 3;

/// Lowest experience a completed Move is worth
pub const MIN_COMPLETION_EXPERIENCE: f64 = 5.0;

// ============================================================================
// PROGRESS
// ============================================================================

/// The (level, experience, evolution stage) triple the engine works on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub level: i64,
    pub experience: f64,
    pub evolution_stage: i64,
}

impl Progress {
    pub fn new(level: i64, experience: f64, evolution_stage: i64) -> Self {
        Progress {
            level,
            experience,
            evolution_stage,
        }
    }

    /// Fresh Pokemon: level 1, no experience, first stage
    pub fn starting() -> Self {
        Progress::new(1, 0.0, 1)
    }

    /// Lowest level a Pokemon at this stage is allowed to be
    pub fn min_level_for_stage(stage: i64) -> i64 {
        match stage {
            s if s >= 3 => THIRD_STAGE_LEVEL,
            2 => SECOND_STAGE_LEVEL,
            _ => 1,
        }
    }

    /// Stage 2 needs level >= 16, stage 3 needs level >= 36
    pub fn is_consistent(&self) -> bool {
        (1..=MAX_EVOLUTION_STAGE).contains(&self.evolution_stage)
            && self.level >= Self::min_level_for_stage(self.evolution_stage)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::starting()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Apply an experience delta and return the updated progress.
///
/// Negative deltas only subtract: there is no level-down. Cost does not
/// depend on the size of the delta; the level saturates at `i64::MAX`.
pub fn apply_experience(progress: Progress, delta: f64) -> Progress {
    let mut next = progress;
    next.experience += delta;

    if next.experience.is_nan() || next.experience < EXPERIENCE_PER_LEVEL {
        return next;
    }

    // `as` saturates, so huge totals cannot overflow the level
    let gained = (next.experience / EXPERIENCE_PER_LEVEL).floor() as i64;
    let before = next.level;
    next.level = before.saturating_add(gained);
    next.experience = next.experience.rem_euclid(EXPERIENCE_PER_LEVEL);

    // Checkpoints fire when the gain crosses them, in order
    if crossed(before, next.level, SECOND_STAGE_LEVEL) && next.evolution_stage == 1 {
        next.evolution_stage = 2;
    }
    if crossed(before, next.level, THIRD_STAGE_LEVEL) && next.evolution_stage == 2 {
        next.evolution_stage = 3;
    }

    next
}

fn crossed(from: i64, to: i64, checkpoint: i64) -> bool {
    from < checkpoint && checkpoint <= to
}

/// Experience awarded for completing a Move of the given power
pub fn experience_for_power(power: i64) -> f64 {
    ((power / 10) as f64).max(MIN_COMPLETION_EXPERIENCE)
}

/// Summary of what a single experience gain changed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelUpReport {
    pub levels_gained: i64,
    pub evolutions: i64,
}

impl LevelUpReport {
    pub fn between(before: &Progress, after: &Progress) -> Self {
        LevelUpReport {
            levels_gained: after.level - before.level,
            evolutions: after.evolution_stage - before.evolution_stage,
        }
    }

    pub fn evolved(&self) -> bool {
        self.evolutions > 0
    }
}

// ============================================================================
// TESTS
// ============================================================================
