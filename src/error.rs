//! Error types for the task tracker

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum TodoError {
    #[error("Pokemon with id {0} not found")]
    PokemonNotFound(Uuid),

    #[error("Move with id {0} not found")]
    MoveNotFound(Uuid),

    #[error("Battle with id {0} not found")]
    BattleNotFound(Uuid),

    /// Payload failed boundary validation
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    #[error("Database operation failed: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shared state could not be used (e.g. poisoned lock)
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TodoError {
    /// HTTP status the API answers with
    pub fn status_code(&self) -> u16 {
        match self {
            TodoError::PokemonNotFound(_) | TodoError::MoveNotFound(_) | TodoError::BattleNotFound(_) => 404,
            TodoError::Validation(_) => 422,
            TodoError::Unavailable(_) => 503,
            TodoError::Database(_) | TodoError::Serialization(_) => 500,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            TodoError::PokemonNotFound(_) => "POKEMON_NOT_FOUND",
            TodoError::MoveNotFound(_) => "MOVE_NOT_FOUND",
            TodoError::BattleNotFound(_) => "BATTLE_NOT_FOUND",
            TodoError::Validation(_) => "VALIDATION_ERROR",
            TodoError::Database(_) => "DATABASE_ERROR",
            TodoError::Serialization(_) => "SERIALIZATION_ERROR",
            TodoError::Unavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

impl From<Vec<ValidationError>> for TodoError {
    fn from(errors: Vec<ValidationError>) -> Self {
        TodoError::Validation(errors)
    }
}

pub type TodoResult<T> = Result<T, TodoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_and_status() {
        let id = Uuid::new_v4();
        let err = TodoError::PokemonNotFound(id);

        assert_eq!(err.to_string(), format!("Pokemon with id {} not found", id));
        assert_eq!(err.status_code(), 404);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validation_summary() {
        let err = TodoError::from(vec![
            ValidationError::new("name", "Required field is empty"),
            ValidationError::new("power", "too big"),
        ]);

        assert_eq!(err.status_code(), 422);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(
            err.to_string(),
            "Validation failed: name: Required field is empty; power: too big"
        );
    }
}
