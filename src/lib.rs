// Pokemon TODO - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod experience;      // Experience Engine: levels and evolution
pub mod lm_studio;       // LM Studio client behind the TextGenerator trait
pub mod logging;
pub mod power;           // Power Estimator: AI call + rule-based fallback
pub mod retry;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{ConfigError, Settings};
pub use db::{
    open_database, setup_database,
    create_pokemon, get_pokemon, get_pokemon_with_moves, list_pokemon, update_pokemon, delete_pokemon,
    add_experience,
    create_move, get_move, list_moves_for_pokemon, update_move, delete_move,
    complete_move, complete_move_with_reward, completed_moves, pending_moves, MoveCompletion,
    create_battle, get_battle, list_battles_for_pokemon,
};
pub use entities::{
    Battle, NewBattle,
    Move, MoveUpdate, NewMove,
    NewPokemon, Pokemon, PokemonType, PokemonUpdate, PokemonWithMoves,
};
pub use error::{TodoError, TodoResult};
pub use experience::{apply_experience, experience_for_power, LevelUpReport, Progress};
pub use lm_studio::{FailureKind, InferenceFailure, LmStudioClient, TextGenerator};
pub use power::{
    fallback_estimate, parse_power_response, Difficulty, HealthReport, HealthStatus,
    PowerEstimate, PowerEstimator, PowerRequest,
};
pub use retry::RetryPolicy;
pub use validation::{Validate, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
