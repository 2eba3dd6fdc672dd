// Entity Models
//
// Each entity has a stable identity (UUID) and editable values.
// Pokemon progress (level / experience / stage) is owned by the
// Experience Engine; Move completion state by `Move::set_completed`.

pub mod pokemon;
pub mod moves;
pub mod battle;

pub use pokemon::{NewPokemon, Pokemon, PokemonType, PokemonUpdate, PokemonWithMoves};
pub use moves::{Move, MoveUpdate, NewMove, DEFAULT_POWER};
pub use battle::{Battle, NewBattle, DEFAULT_ENEMY_HP};
