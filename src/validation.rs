// 📐 Boundary Validation
// Checks request payloads before they reach the store or the estimator.
// All problems are collected, not just the first one.

use serde::Serialize;

use crate::entities::{MoveUpdate, NewBattle, NewMove, NewPokemon, PokemonUpdate};
use crate::power::PowerRequest;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MIN_POWER: i64 = 1;
pub const MAX_POWER: i64 = 100;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

// ============================================================================
// FIELD CHECKS
// ============================================================================

fn check_name(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    let len = value.chars().count();
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "Required field is empty"));
    } else if len > MAX_NAME_LEN {
        errors.push(ValidationError::new(
            field,
            format!("Must be at most {} characters, got {}", MAX_NAME_LEN, len),
        ));
    }
}

fn check_description(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>) {
    if let Some(text) = value {
        let len = text.chars().count();
        if len > MAX_DESCRIPTION_LEN {
            errors.push(ValidationError::new(
                field,
                format!("Must be at most {} characters, got {}", MAX_DESCRIPTION_LEN, len),
            ));
        }
    }
}

fn check_power(errors: &mut Vec<ValidationError>, power: i64) {
    if !(MIN_POWER..=MAX_POWER).contains(&power) {
        errors.push(ValidationError::new(
            "power",
            format!("Must be between {} and {}, got {}", MIN_POWER, MAX_POWER, power),
        ));
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

impl Validate for NewPokemon {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        check_name(&mut errors, "name", &self.name);
        finish(errors)
    }
}

impl Validate for PokemonUpdate {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, "name", name);
        }
        finish(errors)
    }
}

impl Validate for NewMove {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        check_name(&mut errors, "name", &self.name);
        check_description(&mut errors, "description", self.description.as_deref());
        check_power(&mut errors, self.power);
        finish(errors)
    }
}

impl Validate for MoveUpdate {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, "name", name);
        }
        check_description(&mut errors, "description", self.description.as_deref());
        if let Some(power) = self.power {
            check_power(&mut errors, power);
        }
        finish(errors)
    }
}

impl Validate for NewBattle {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        check_name(&mut errors, "enemy_name", &self.enemy_name);
        if self.enemy_max_hp < 1 {
            errors.push(ValidationError::new(
                "enemy_max_hp",
                format!("Must be at least 1, got {}", self.enemy_max_hp),
            ));
        }
        finish(errors)
    }
}

impl Validate for PowerRequest {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        check_name(&mut errors, "move_name", &self.move_name);
        check_description(&mut errors, "move_description", self.move_description.as_deref());
        finish(errors)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PokemonType;
    use crate::power::Difficulty;
    use uuid::Uuid;

    #[test]
    fn test_valid_pokemon() {
        let payload = NewPokemon {
            name: "Pikachu".to_string(),
            pokemon_type: PokemonType::Electric,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_empty_and_long_names_rejected() {
        let empty = NewPokemon {
            name: "   ".to_string(),
            pokemon_type: PokemonType::Normal,
        };
        let errors = empty.validate().unwrap_err();
        assert_eq!(errors[0].field, "name");

        let long = NewPokemon {
            name: "x".repeat(101),
            pokemon_type: PokemonType::Normal,
        };
        assert!(long.validate().is_err());

        let edge = NewPokemon {
            name: "x".repeat(100),
            pokemon_type: PokemonType::Normal,
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_new_move_collects_all_errors() {
        let payload = NewMove {
            pokemon_id: Uuid::new_v4(),
            name: String::new(),
            description: Some("d".repeat(501)),
            power: 0,
        };

        let errors = payload.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "description", "power"]);
    }

    #[test]
    fn test_move_update_only_checks_present_fields() {
        assert!(MoveUpdate::default().validate().is_ok());

        let update = MoveUpdate {
            power: Some(101),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap_err()[0].field, "power");
    }

    #[test]
    fn test_battle_needs_positive_hp() {
        let payload = NewBattle {
            pokemon_id: Uuid::new_v4(),
            enemy_name: "Gym Leader".to_string(),
            enemy_max_hp: 0,
        };
        assert_eq!(payload.validate().unwrap_err()[0].field, "enemy_max_hp");
    }

    #[test]
    fn test_power_request() {
        let request = PowerRequest {
            move_name: "Refactor billing".to_string(),
            move_description: None,
            difficulty_level: Difficulty::Hard,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new("power", "out of range");
        assert_eq!(err.to_string(), "power: out of range");
    }
}
