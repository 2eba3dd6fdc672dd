// 🐉 Pokemon Entity - the character that levels up as Moves get done
//
// Identity (UUID) never changes. Name and type are editable values.
// Level, experience and evolution stage are progress: they only move
// through the Experience Engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::entities::moves::Move;
use crate::experience::{apply_experience, LevelUpReport, Progress};

// ============================================================================
// POKEMON TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
    #[default]
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl PokemonType {
    pub const ALL: [PokemonType; 18] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Electric,
        PokemonType::Grass,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dragon,
        PokemonType::Dark,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PokemonType::Normal => "normal",
            PokemonType::Fire => "fire",
            PokemonType::Water => "water",
            PokemonType::Electric => "electric",
            PokemonType::Grass => "grass",
            PokemonType::Ice => "ice",
            PokemonType::Fighting => "fighting",
            PokemonType::Poison => "poison",
            PokemonType::Ground => "ground",
            PokemonType::Flying => "flying",
            PokemonType::Psychic => "psychic",
            PokemonType::Bug => "bug",
            PokemonType::Rock => "rock",
            PokemonType::Ghost => "ghost",
            PokemonType::Dragon => "dragon",
            PokemonType::Dark => "dark",
            PokemonType::Steel => "steel",
            PokemonType::Fairy => "fairy",
        }
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PokemonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        PokemonType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("Unknown pokemon type: {}", s))
    }
}

// ============================================================================
// POKEMON ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    /// Stable identity - NEVER changes
    pub id: Uuid,

    pub name: String,

    #[serde(rename = "type")]
    pub pokemon_type: PokemonType,

    pub level: i64,
    pub experience: f64,
    pub evolution_stage: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pokemon {
    /// Create a level-1, first-stage Pokemon with a fresh UUID
    pub fn new(name: String, pokemon_type: PokemonType) -> Self {
        let now = Utc::now();
        let start = Progress::starting();

        Pokemon {
            id: Uuid::new_v4(),
            name,
            pokemon_type,
            level: start.level,
            experience: start.experience,
            evolution_stage: start.evolution_stage,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.level, self.experience, self.evolution_stage)
    }

    /// Run `delta` through the Experience Engine and store the result
    pub fn gain_experience(&mut self, delta: f64) -> LevelUpReport {
        let before = self.progress();
        let after = apply_experience(before, delta);

        self.level = after.level;
        self.experience = after.experience;
        self.evolution_stage = after.evolution_stage;
        self.updated_at = Utc::now();

        LevelUpReport::between(&before, &after)
    }

    /// Apply a partial update of the editable values
    pub fn apply_update(&mut self, update: PokemonUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(pokemon_type) = update.pokemon_type {
            self.pokemon_type = pokemon_type;
        }
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPokemon {
    pub name: String,

    #[serde(rename = "type", default)]
    pub pokemon_type: PokemonType,
}

impl NewPokemon {
    pub fn into_pokemon(self) -> Pokemon {
        Pokemon::new(self.name, self.pokemon_type)
    }
}

/// Only name and type are user-editable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PokemonUpdate {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type", default)]
    pub pokemon_type: Option<PokemonType>,
}

/// A Pokemon together with all of its Moves
#[derive(Debug, Clone, Serialize)]
pub struct PokemonWithMoves {
    #[serde(flatten)]
    pub pokemon: Pokemon,
    pub moves: Vec<Move>,
}

// ============================================================================
// TESTS
// ============================================================================
