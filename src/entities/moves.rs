// ⚡ Move Entity - a task owned by one Pokemon
//
// `completed_at` is present if and only if `is_completed` is true.
// Every state change goes through `set_completed` to keep that rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Power given to a Move when none is supplied
pub const DEFAULT_POWER: i64 = 50;

fn default_power() -> i64 {
    DEFAULT_POWER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: Uuid,
    pub pokemon_id: Uuid,

    pub name: String,
    pub description: Option<String>,

    /// 1-100, usually copied from a PowerEstimate
    pub power: i64,

    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Move {
    pub fn new(pokemon_id: Uuid, name: String, description: Option<String>, power: i64) -> Self {
        let now = Utc::now();

        Move {
            id: Uuid::new_v4(),
            pokemon_id,
            name,
            description,
            power,
            is_completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flip the completed flag, stamping or clearing `completed_at`.
    ///
    /// Completing an already-completed Move keeps the first timestamp.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed {
            if !self.is_completed || self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.is_completed = completed;
        self.updated_at = now;
    }

    /// Mark as done. Returns false when it was already done.
    pub fn complete(&mut self) -> bool {
        if self.is_completed {
            return false;
        }
        self.set_completed(true, Utc::now());
        true
    }

    pub fn is_consistent(&self) -> bool {
        self.is_completed == self.completed_at.is_some()
    }

    pub fn apply_update(&mut self, update: MoveUpdate) {
        let now = Utc::now();

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(power) = update.power {
            self.power = power;
        }
        if let Some(completed) = update.is_completed {
            self.set_completed(completed, now);
        }
        self.updated_at = now;
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMove {
    pub pokemon_id: Uuid,
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_power")]
    pub power: i64,
}

impl NewMove {
    pub fn into_move(self) -> Move {
        Move::new(self.pokemon_id, self.name, self.description, self.power)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub power: Option<i64>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}
