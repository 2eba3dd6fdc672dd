// ⚔️ Battle Entity - stored record only
//
// The battle mechanic itself is not implemented; records are created
// with full enemy HP and read back as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_ENEMY_HP: i64 = 100;

fn default_enemy_hp() -> i64 {
    DEFAULT_ENEMY_HP
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: Uuid,
    pub pokemon_id: Uuid,
    pub enemy_name: String,
    pub enemy_max_hp: i64,
    pub enemy_current_hp: i64,
    pub total_damage: i64,
    pub is_victory: bool,
    pub experience_gained: f64,
    pub moves_used: i64,
    /// Seconds
    pub battle_duration: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Battle {
    pub fn new(pokemon_id: Uuid, enemy_name: String, enemy_max_hp: i64) -> Self {
        Battle {
            id: Uuid::new_v4(),
            pokemon_id,
            enemy_name,
            enemy_max_hp,
            enemy_current_hp: enemy_max_hp,
            total_damage: 0,
            is_victory: false,
            experience_gained: 0.0,
            moves_used: 0,
            battle_duration: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBattle {
    pub pokemon_id: Uuid,
    pub enemy_name: String,

    #[serde(default = "default_enemy_hp")]
    pub enemy_max_hp: i64,
}

impl NewBattle {
    pub fn into_battle(self) -> Battle {
        Battle::new(self.pokemon_id, self.enemy_name, self.enemy_max_hp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_starts_at_full_hp() {
        let battle = Battle::new(Uuid::new_v4(), "Team Rocket".to_string(), 250);

        assert_eq!(battle.enemy_current_hp, 250);
        assert_eq!(battle.total_damage, 0);
        assert!(!battle.is_victory);
        assert!(battle.completed_at.is_none());
    }

    #[test]
    fn test_payload_default_hp() {
        let payload: NewBattle = serde_json::from_value(serde_json::json!({
            "pokemon_id": Uuid::new_v4(),
            "enemy_name": "Procrastination"
        }))
        .unwrap();

        assert_eq!(payload.into_battle().enemy_max_hp, DEFAULT_ENEMY_HP);
    }
}
