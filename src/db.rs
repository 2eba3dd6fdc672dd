// 🗄️ SQLite store for Pokemon, Moves and Battles
//
// Free functions over a borrowed `Connection`, same shape for every entity:
// create / get / list / update / delete. Payloads are validated here too,
// so the CLI and the API share one boundary.
//
// Storage conventions:
// - UUIDs as TEXT
// - timestamps as RFC 3339 TEXT (fixed microsecond precision, sortable)
// - foreign keys ON, deleting a Pokemon cascades to its Moves and Battles

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{
    Battle, Move, MoveUpdate, NewBattle, NewMove, NewPokemon, Pokemon, PokemonType,
    PokemonUpdate, PokemonWithMoves,
};
use crate::error::{TodoError, TodoResult};
use crate::experience::{experience_for_power, LevelUpReport};
use crate::validation::{Validate, ValidationError};

pub const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// SCHEMA
// ============================================================================

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: impl AsRef<Path>) -> TodoResult<Connection> {
    let conn = Connection::open(path.as_ref())?;
    setup_database(&conn)?;
    info!(path = %path.as_ref().display(), "database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> TodoResult<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pokemon (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'normal',
            level INTEGER NOT NULL DEFAULT 1,
            experience REAL NOT NULL DEFAULT 0,
            evolution_stage INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS moves (
            id TEXT PRIMARY KEY,
            pokemon_id TEXT NOT NULL REFERENCES pokemon(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            power INTEGER NOT NULL DEFAULT 50,
            is_completed INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS battles (
            id TEXT PRIMARY KEY,
            pokemon_id TEXT NOT NULL REFERENCES pokemon(id) ON DELETE CASCADE,
            enemy_name TEXT NOT NULL,
            enemy_max_hp INTEGER NOT NULL DEFAULT 100,
            enemy_current_hp INTEGER NOT NULL DEFAULT 100,
            total_damage INTEGER NOT NULL DEFAULT 0,
            is_victory INTEGER NOT NULL DEFAULT 0,
            experience_gained REAL NOT NULL DEFAULT 0,
            moves_used INTEGER NOT NULL DEFAULT 0,
            battle_duration INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_moves_pokemon ON moves(pokemon_id, is_completed)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_battles_pokemon ON battles(pokemon_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// COLUMN HELPERS
// ============================================================================

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn time_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn optional_time_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn check(payload: &impl Validate) -> TodoResult<()> {
    payload.validate().map_err(TodoError::from)
}

// ============================================================================
// POKEMON
// ============================================================================

const POKEMON_COLUMNS: &str =
    "id, name, type, level, experience, evolution_stage, created_at, updated_at";

fn pokemon_from_row(row: &Row) -> rusqlite::Result<Pokemon> {
    let type_raw: String = row.get(2)?;
    let pokemon_type = type_raw
        .parse::<PokemonType>()
        .map_err(|e| conversion_error(2, e))?;

    Ok(Pokemon {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        pokemon_type,
        level: row.get(3)?,
        experience: row.get(4)?,
        evolution_stage: row.get(5)?,
        created_at: time_column(row, 6)?,
        updated_at: time_column(row, 7)?,
    })
}

pub fn create_pokemon(conn: &Connection, payload: NewPokemon) -> TodoResult<Pokemon> {
    check(&payload)?;
    let pokemon = payload.into_pokemon();

    conn.execute(
        "INSERT INTO pokemon (id, name, type, level, experience, evolution_stage, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            pokemon.id.to_string(),
            pokemon.name,
            pokemon.pokemon_type.as_str(),
            pokemon.level,
            pokemon.experience,
            pokemon.evolution_stage,
            timestamp(&pokemon.created_at),
            timestamp(&pokemon.updated_at),
        ],
    )?;

    debug!(pokemon_id = %pokemon.id, name = %pokemon.name, "pokemon created");
    Ok(pokemon)
}

pub fn get_pokemon(conn: &Connection, id: Uuid) -> TodoResult<Pokemon> {
    let sql = format!("SELECT {} FROM pokemon WHERE id = ?1", POKEMON_COLUMNS);
    conn.query_row(&sql, params![id.to_string()], pokemon_from_row)
        .optional()?
        .ok_or(TodoError::PokemonNotFound(id))
}

pub fn get_pokemon_with_moves(conn: &Connection, id: Uuid) -> TodoResult<PokemonWithMoves> {
    let pokemon = get_pokemon(conn, id)?;
    let moves = query_moves(conn, "WHERE pokemon_id = ?1", id, 0, i64::MAX)?;
    Ok(PokemonWithMoves { pokemon, moves })
}

pub fn list_pokemon(conn: &Connection, skip: i64, limit: i64) -> TodoResult<Vec<Pokemon>> {
    let sql = format!(
        "SELECT {} FROM pokemon ORDER BY created_at, rowid LIMIT ?1 OFFSET ?2",
        POKEMON_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let pokemon = stmt
        .query_map(params![limit.max(0), skip.max(0)], pokemon_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pokemon)
}

/// Persist level / experience / stage and the editable values
fn save_pokemon(conn: &Connection, pokemon: &Pokemon) -> TodoResult<()> {
    conn.execute(
        "UPDATE pokemon
         SET name = ?2, type = ?3, level = ?4, experience = ?5, evolution_stage = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            pokemon.id.to_string(),
            pokemon.name,
            pokemon.pokemon_type.as_str(),
            pokemon.level,
            pokemon.experience,
            pokemon.evolution_stage,
            timestamp(&pokemon.updated_at),
        ],
    )?;
    Ok(())
}

/// Name and type only; progress goes through `add_experience`
pub fn update_pokemon(conn: &Connection, id: Uuid, update: PokemonUpdate) -> TodoResult<Pokemon> {
    check(&update)?;
    let mut pokemon = get_pokemon(conn, id)?;
    pokemon.apply_update(update);
    save_pokemon(conn, &pokemon)?;
    Ok(pokemon)
}

pub fn delete_pokemon(conn: &Connection, id: Uuid) -> TodoResult<()> {
    let deleted = conn.execute("DELETE FROM pokemon WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(TodoError::PokemonNotFound(id));
    }
    info!(pokemon_id = %id, "pokemon deleted");
    Ok(())
}

/// Load, run through the Experience Engine, save. One transaction.
pub fn add_experience(conn: &Connection, id: Uuid, delta: f64) -> TodoResult<(Pokemon, LevelUpReport)> {
    if !delta.is_finite() {
        return Err(TodoError::from(vec![ValidationError::new(
            "experience",
            "Must be a finite number",
        )]));
    }

    let tx = conn.unchecked_transaction()?;
    let mut pokemon = get_pokemon(&tx, id)?;
    let report = pokemon.gain_experience(delta);
    save_pokemon(&tx, &pokemon)?;
    tx.commit()?;

    if report.levels_gained > 0 {
        info!(
            pokemon_id = %id,
            level = pokemon.level,
            stage = pokemon.evolution_stage,
            evolved = report.evolved(),
            "pokemon leveled up"
        );
    }

    Ok((pokemon, report))
}

// ============================================================================
// MOVES
// ============================================================================

const MOVE_COLUMNS: &str =
    "id, pokemon_id, name, description, power, is_completed, completed_at, created_at, updated_at";

fn move_from_row(row: &Row) -> rusqlite::Result<Move> {
    Ok(Move {
        id: uuid_column(row, 0)?,
        pokemon_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        power: row.get(4)?,
        is_completed: row.get(5)?,
        completed_at: optional_time_column(row, 6)?,
        created_at: time_column(row, 7)?,
        updated_at: time_column(row, 8)?,
    })
}

fn query_moves(
    conn: &Connection,
    filter: &str,
    pokemon_id: Uuid,
    skip: i64,
    limit: i64,
) -> TodoResult<Vec<Move>> {
    let sql = format!(
        "SELECT {} FROM moves {} ORDER BY created_at, rowid LIMIT ?2 OFFSET ?3",
        MOVE_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;

    let moves = stmt
        .query_map(
            params![pokemon_id.to_string(), limit.max(0), skip.max(0)],
            move_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(moves)
}

fn save_move(conn: &Connection, mv: &Move) -> TodoResult<()> {
    conn.execute(
        "UPDATE moves
         SET name = ?2, description = ?3, power = ?4, is_completed = ?5, completed_at = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            mv.id.to_string(),
            mv.name,
            mv.description,
            mv.power,
            mv.is_completed,
            mv.completed_at.as_ref().map(timestamp),
            timestamp(&mv.updated_at),
        ],
    )?;
    Ok(())
}

/// The owning Pokemon must exist
pub fn create_move(conn: &Connection, payload: NewMove) -> TodoResult<Move> {
    check(&payload)?;
    get_pokemon(conn, payload.pokemon_id)?;

    let mv = payload.into_move();
    conn.execute(
        "INSERT INTO moves (id, pokemon_id, name, description, power, is_completed, completed_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            mv.id.to_string(),
            mv.pokemon_id.to_string(),
            mv.name,
            mv.description,
            mv.power,
            mv.is_completed,
            mv.completed_at.as_ref().map(timestamp),
            timestamp(&mv.created_at),
            timestamp(&mv.updated_at),
        ],
    )?;

    debug!(move_id = %mv.id, pokemon_id = %mv.pokemon_id, power = mv.power, "move created");
    Ok(mv)
}

pub fn get_move(conn: &Connection, id: Uuid) -> TodoResult<Move> {
    let sql = format!("SELECT {} FROM moves WHERE id = ?1", MOVE_COLUMNS);
    conn.query_row(&sql, params![id.to_string()], move_from_row)
        .optional()?
        .ok_or(TodoError::MoveNotFound(id))
}

pub fn list_moves_for_pokemon(
    conn: &Connection,
    pokemon_id: Uuid,
    skip: i64,
    limit: i64,
) -> TodoResult<Vec<Move>> {
    query_moves(conn, "WHERE pokemon_id = ?1", pokemon_id, skip, limit)
}

pub fn completed_moves(conn: &Connection, pokemon_id: Uuid) -> TodoResult<Vec<Move>> {
    query_moves(conn, "WHERE pokemon_id = ?1 AND is_completed = 1", pokemon_id, 0, i64::MAX)
}

pub fn pending_moves(conn: &Connection, pokemon_id: Uuid) -> TodoResult<Vec<Move>> {
    query_moves(conn, "WHERE pokemon_id = ?1 AND is_completed = 0", pokemon_id, 0, i64::MAX)
}

pub fn update_move(conn: &Connection, id: Uuid, update: MoveUpdate) -> TodoResult<Move> {
    check(&update)?;
    let mut mv = get_move(conn, id)?;
    mv.apply_update(update);
    save_move(conn, &mv)?;
    Ok(mv)
}

pub fn delete_move(conn: &Connection, id: Uuid) -> TodoResult<()> {
    let deleted = conn.execute("DELETE FROM moves WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(TodoError::MoveNotFound(id));
    }
    Ok(())
}

/// Mark done. Completing twice keeps the first `completed_at`.
pub fn complete_move(conn: &Connection, id: Uuid) -> TodoResult<Move> {
    let mut mv = get_move(conn, id)?;
    if mv.complete() {
        save_move(conn, &mv)?;
        debug!(move_id = %id, "move completed");
    }
    Ok(mv)
}

/// Outcome of completing a Move and paying out its experience
#[derive(Debug, Clone, Serialize)]
pub struct MoveCompletion {
    #[serde(rename = "move")]
    pub mv: Move,
    pub pokemon: Pokemon,
    pub experience_awarded: f64,
    pub report: LevelUpReport,
}

/// Complete a Move and credit its owner with `experience_for_power`.
/// A Move that was already done pays nothing.
pub fn complete_move_with_reward(conn: &Connection, id: Uuid) -> TodoResult<MoveCompletion> {
    let tx = conn.unchecked_transaction()?;

    let mut mv = get_move(&tx, id)?;
    let mut pokemon = get_pokemon(&tx, mv.pokemon_id)?;

    let (experience_awarded, report) = if mv.complete() {
        save_move(&tx, &mv)?;
        let award = experience_for_power(mv.power);
        let report = pokemon.gain_experience(award);
        save_pokemon(&tx, &pokemon)?;
        (award, report)
    } else {
        (0.0, LevelUpReport::between(&pokemon.progress(), &pokemon.progress()))
    };

    tx.commit()?;

    Ok(MoveCompletion {
        mv,
        pokemon,
        experience_awarded,
        report,
    })
}

// ============================================================================
// BATTLES
// ============================================================================

const BATTLE_COLUMNS: &str = "id, pokemon_id, enemy_name, enemy_max_hp, enemy_current_hp, total_damage,
     is_victory, experience_gained, moves_used, battle_duration, created_at, completed_at";

fn battle_from_row(row: &Row) -> rusqlite::Result<Battle> {
    Ok(Battle {
        id: uuid_column(row, 0)?,
        pokemon_id: uuid_column(row, 1)?,
        enemy_name: row.get(2)?,
        enemy_max_hp: row.get(3)?,
        enemy_current_hp: row.get(4)?,
        total_damage: row.get(5)?,
        is_victory: row.get(6)?,
        experience_gained: row.get(7)?,
        moves_used: row.get(8)?,
        battle_duration: row.get(9)?,
        created_at: time_column(row, 10)?,
        completed_at: optional_time_column(row, 11)?,
    })
}

pub fn create_battle(conn: &Connection, payload: NewBattle) -> TodoResult<Battle> {
    check(&payload)?;
    get_pokemon(conn, payload.pokemon_id)?;

    let battle = payload.into_battle();
    conn.execute(
        "INSERT INTO battles (id, pokemon_id, enemy_name, enemy_max_hp, enemy_current_hp, total_damage,
                              is_victory, experience_gained, moves_used, battle_duration, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            battle.id.to_string(),
            battle.pokemon_id.to_string(),
            battle.enemy_name,
            battle.enemy_max_hp,
            battle.enemy_current_hp,
            battle.total_damage,
            battle.is_victory,
            battle.experience_gained,
            battle.moves_used,
            battle.battle_duration,
            timestamp(&battle.created_at),
            battle.completed_at.as_ref().map(timestamp),
        ],
    )?;

    Ok(battle)
}

pub fn get_battle(conn: &Connection, id: Uuid) -> TodoResult<Battle> {
    let sql = format!("SELECT {} FROM battles WHERE id = ?1", BATTLE_COLUMNS);
    conn.query_row(&sql, params![id.to_string()], battle_from_row)
        .optional()?
        .ok_or(TodoError::BattleNotFound(id))
}

pub fn list_battles_for_pokemon(conn: &Connection, pokemon_id: Uuid) -> TodoResult<Vec<Battle>> {
    let sql = format!(
        "SELECT {} FROM battles WHERE pokemon_id = ?1 ORDER BY created_at, rowid",
        BATTLE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let battles = stmt
        .query_map(params![pokemon_id.to_string()], battle_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(battles)
}

pub fn count_pokemon(conn: &Connection) -> TodoResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM pokemon", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn add_pokemon(conn: &Connection, name: &str) -> Pokemon {
        create_pokemon(
            conn,
            NewPokemon {
                name: name.to_string(),
                pokemon_type: PokemonType::Fire,
            },
        )
        .unwrap()
    }

    fn add_move(conn: &Connection, pokemon_id: Uuid, name: &str, power: i64) -> Move {
        create_move(
            conn,
            NewMove {
                pokemon_id,
                name: name.to_string(),
                description: None,
                power,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = test_db();
        setup_database(&conn).unwrap();
        assert_eq!(count_pokemon(&conn).unwrap(), 0);
    }

    #[test]
    fn test_pokemon_round_trip() {
        let conn = test_db();
        let created = add_pokemon(&conn, "Charmander");

        let loaded = get_pokemon(&conn, created.id).unwrap();
        assert_eq!(loaded.name, "Charmander");
        assert_eq!(loaded.pokemon_type, PokemonType::Fire);
        assert_eq!(loaded.level, 1);
        assert_eq!(loaded.evolution_stage, 1);
        assert_eq!(loaded.experience, 0.0);
    }

    #[test]
    fn test_missing_pokemon_is_not_found() {
        let conn = test_db();
        let id = Uuid::new_v4();
        assert!(matches!(get_pokemon(&conn, id), Err(TodoError::PokemonNotFound(missing)) if missing == id));
        assert!(delete_pokemon(&conn, id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_rejects_invalid_payload() {
        let conn = test_db();
        let err = create_pokemon(
            &conn,
            NewPokemon {
                name: String::new(),
                pokemon_type: PokemonType::Normal,
            },
        )
        .unwrap_err();

        assert_eq!(err.status_code(), 422);
        assert_eq!(count_pokemon(&conn).unwrap(), 0);
    }

    #[test]
    fn test_list_pokemon_paging() {
        let conn = test_db();
        for name in ["A", "B", "C"] {
            add_pokemon(&conn, name);
        }

        let page: Vec<String> = list_pokemon(&conn, 1, 1).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(page, vec!["B"]);
        assert_eq!(list_pokemon(&conn, 0, DEFAULT_LIMIT).unwrap().len(), 3);
    }

    #[test]
    fn test_update_pokemon_keeps_progress() {
        let conn = test_db();
        let created = add_pokemon(&conn, "Charmander");
        add_experience(&conn, created.id, 250.0).unwrap();

        let updated = update_pokemon(
            &conn,
            created.id,
            PokemonUpdate {
                name: Some("Charmeleon".to_string()),
                pokemon_type: None,
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Charmeleon");
        assert_eq!(updated.level, 3);
        assert_eq!(get_pokemon(&conn, created.id).unwrap().experience, 50.0);
    }

    #[test]
    fn test_add_experience_persists_evolution() {
        let conn = test_db();
        let created = add_pokemon(&conn, "Bulbasaur");

        let (pokemon, report) = add_experience(&conn, created.id, 1500.0).unwrap();
        assert_eq!(pokemon.level, 16);
        assert_eq!(pokemon.evolution_stage, 2);
        assert!(report.evolved());

        let loaded = get_pokemon(&conn, created.id).unwrap();
        assert_eq!(loaded.level, 16);
        assert_eq!(loaded.evolution_stage, 2);

        println!("✅ Experience persisted: level {} stage {}", loaded.level, loaded.evolution_stage);
    }

    #[test]
    fn test_add_experience_rejects_nan() {
        let conn = test_db();
        let created = add_pokemon(&conn, "Psyduck");
        assert_eq!(add_experience(&conn, created.id, f64::NAN).unwrap_err().status_code(), 422);
    }

    #[test]
    fn test_move_needs_existing_pokemon() {
        let conn = test_db();
        let err = create_move(
            &conn,
            NewMove {
                pokemon_id: Uuid::new_v4(),
                name: "Orphan".to_string(),
                description: None,
                power: 10,
            },
        )
        .unwrap_err();

        assert!(matches!(err, TodoError::PokemonNotFound(_)));
    }

    #[test]
    fn test_complete_move_is_idempotent() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Squirtle");
        let mv = add_move(&conn, pokemon.id, "Write report", 40);

        let first = complete_move(&conn, mv.id).unwrap();
        let second = complete_move(&conn, mv.id).unwrap();

        assert!(first.is_completed);
        assert_eq!(first.completed_at, second.completed_at);
        assert!(get_move(&conn, mv.id).unwrap().is_consistent());
    }

    #[test]
    fn test_completed_and_pending_filters() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Eevee");
        let done = add_move(&conn, pokemon.id, "Done", 10);
        add_move(&conn, pokemon.id, "Todo 1", 20);
        add_move(&conn, pokemon.id, "Todo 2", 30);
        complete_move(&conn, done.id).unwrap();

        assert_eq!(completed_moves(&conn, pokemon.id).unwrap().len(), 1);
        assert_eq!(pending_moves(&conn, pokemon.id).unwrap().len(), 2);
        assert_eq!(list_moves_for_pokemon(&conn, pokemon.id, 0, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_update_move_uncomplete_clears_stamp() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Eevee");
        let mv = add_move(&conn, pokemon.id, "Laundry", 15);
        complete_move(&conn, mv.id).unwrap();

        let reopened = update_move(
            &conn,
            mv.id,
            MoveUpdate {
                is_completed: Some(false),
                power: Some(25),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!reopened.is_completed);
        assert!(reopened.completed_at.is_none());

        let loaded = get_move(&conn, mv.id).unwrap();
        assert_eq!(loaded.power, 25);
        assert!(loaded.completed_at.is_none());
    }

    #[test]
    fn test_complete_with_reward_pays_once() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Pikachu");
        let mv = add_move(&conn, pokemon.id, "Refactor billing", 65);

        let first = complete_move_with_reward(&conn, mv.id).unwrap();
        assert_eq!(first.experience_awarded, 6.0);
        assert_eq!(first.pokemon.experience, 6.0);

        let second = complete_move_with_reward(&conn, mv.id).unwrap();
        assert_eq!(second.experience_awarded, 0.0);
        assert_eq!(get_pokemon(&conn, pokemon.id).unwrap().experience, 6.0);
    }

    #[test]
    fn test_delete_pokemon_cascades() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Magikarp");
        let mv = add_move(&conn, pokemon.id, "Splash", 1);
        let battle = create_battle(
            &conn,
            NewBattle {
                pokemon_id: pokemon.id,
                enemy_name: "Gyarados".to_string(),
                enemy_max_hp: 100,
            },
        )
        .unwrap();

        delete_pokemon(&conn, pokemon.id).unwrap();

        assert!(get_move(&conn, mv.id).unwrap_err().is_not_found());
        assert!(get_battle(&conn, battle.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_battle_records() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Onix");
        let battle = create_battle(
            &conn,
            NewBattle {
                pokemon_id: pokemon.id,
                enemy_name: "Deadline".to_string(),
                enemy_max_hp: 300,
            },
        )
        .unwrap();

        let loaded = get_battle(&conn, battle.id).unwrap();
        assert_eq!(loaded.enemy_current_hp, 300);
        assert_eq!(list_battles_for_pokemon(&conn, pokemon.id).unwrap().len(), 1);
    }

    #[test]
    fn test_pokemon_with_moves() {
        let conn = test_db();
        let pokemon = add_pokemon(&conn, "Snorlax");
        add_move(&conn, pokemon.id, "Nap", 5);
        add_move(&conn, pokemon.id, "Eat", 5);

        let view = get_pokemon_with_moves(&conn, pokemon.id).unwrap();
        assert_eq!(view.moves.len(), 2);
        assert_eq!(view.moves[0].name, "Nap");
    }
}
