// 🌐 REST API - Pokemon, Moves, Battles and the Power Estimator over HTTP
//
// Everything lives under /api/v1 except the root welcome and /health.
// Handlers lock the shared connection for the duration of one store call;
// the estimator is awaited without holding the lock.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::db;
use crate::entities::{Battle, Move, MoveUpdate, NewBattle, NewMove, NewPokemon, Pokemon, PokemonUpdate, PokemonWithMoves};
use crate::error::{TodoError, TodoResult};
use crate::power::{HealthReport, PowerEstimate, PowerEstimator, PowerRequest};
use crate::validation::{Validate, ValidationError};
use crate::VERSION;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub estimator: Arc<PowerEstimator>,
}

impl AppState {
    pub fn new(conn: Connection, estimator: PowerEstimator) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            estimator: Arc::new(estimator),
        }
    }

    /// Run one store call with the connection locked
    fn with_db<T>(&self, f: impl FnOnce(&Connection) -> TodoResult<T>) -> TodoResult<T> {
        let conn = self
            .db
            .lock()
            .map_err(|_| TodoError::Unavailable("database lock poisoned".to_string()))?;
        f(&conn)
    }
}

// ============================================================================
// Error envelope
// ============================================================================

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    status_code: u16,
    error_id: Uuid,
    timestamp: DateTime<Utc>,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationError>>,
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error_id = Uuid::new_v4();

        if status.is_server_error() {
            error!(%error_id, error = %self, "request failed");
        } else {
            warn!(%error_id, error = %self, "request rejected");
        }

        // Internal details stay in the log
        let message = match &self {
            TodoError::Database(_) | TodoError::Serialization(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let details = match &self {
            TodoError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };

        let body = ErrorBody {
            message,
            status_code: status.as_u16(),
            error_id,
            timestamp: Utc::now(),
            code: self.code(),
            details,
        };

        (status, Json(json!({ "error": body }))).into_response()
    }
}

// ============================================================================
// Extractors
// ============================================================================
//
// Same as axum's Json / Query / Path, but a rejection becomes a
// `TodoError::Validation` so clients always get the error envelope.

fn rejected(location: &str, message: String) -> TodoError {
    TodoError::from(vec![ValidationError::new(location, message)])
}

/// JSON body
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = TodoError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| rejected("body", e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Query string
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = TodoError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| rejected("query", e.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// Path parameters
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = TodoError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| rejected("path", e.body_text()))?;
        Ok(ApiPath(value))
    }
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    db::DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ExperienceQuery {
    pub experience: f64,
}

// ============================================================================
// Root handlers
// ============================================================================

/// GET / - Welcome banner
async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to Pokemon TODO API",
        "version": VERSION,
    }))
}

/// GET /health - Liveness
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

// ============================================================================
// Pokemon handlers
// ============================================================================

/// POST /api/v1/pokemon
async fn create_pokemon(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewPokemon>,
) -> TodoResult<(StatusCode, Json<Pokemon>)> {
    let pokemon = state.with_db(|conn| db::create_pokemon(conn, payload))?;
    Ok((StatusCode::CREATED, Json(pokemon)))
}

/// GET /api/v1/pokemon?skip=&limit=
async fn list_pokemon(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> TodoResult<Json<Vec<Pokemon>>> {
    let pokemon = state.with_db(|conn| db::list_pokemon(conn, page.skip, page.limit))?;
    Ok(Json(pokemon))
}

/// GET /api/v1/pokemon/:id - includes Moves
async fn get_pokemon(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> TodoResult<Json<PokemonWithMoves>> {
    let view = state.with_db(|conn| db::get_pokemon_with_moves(conn, id))?;
    Ok(Json(view))
}

/// PUT /api/v1/pokemon/:id
async fn update_pokemon(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<PokemonUpdate>,
) -> TodoResult<Json<Pokemon>> {
    let pokemon = state.with_db(|conn| db::update_pokemon(conn, id, update))?;
    Ok(Json(pokemon))
}

/// DELETE /api/v1/pokemon/:id
async fn delete_pokemon(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> TodoResult<StatusCode> {
    state.with_db(|conn| db::delete_pokemon(conn, id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/pokemon/:id/add-experience?experience=
async fn add_experience(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ExperienceQuery>,
) -> TodoResult<Json<Pokemon>> {
    let (pokemon, _report) = state.with_db(|conn| db::add_experience(conn, id, query.experience))?;
    Ok(Json(pokemon))
}

// ============================================================================
// Move handlers
// ============================================================================

/// POST /api/v1/moves
async fn create_move(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewMove>,
) -> TodoResult<(StatusCode, Json<Move>)> {
    let mv = state.with_db(|conn| db::create_move(conn, payload))?;
    Ok((StatusCode::CREATED, Json(mv)))
}

/// GET /api/v1/moves/pokemon/:pokemon_id?skip=&limit=
async fn list_moves(
    State(state): State<AppState>,
    ApiPath(pokemon_id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> TodoResult<Json<Vec<Move>>> {
    let moves = state.with_db(|conn| db::list_moves_for_pokemon(conn, pokemon_id, page.skip, page.limit))?;
    Ok(Json(moves))
}

/// GET /api/v1/moves/pokemon/:pokemon_id/completed
async fn completed_moves(
    State(state): State<AppState>,
    ApiPath(pokemon_id): ApiPath<Uuid>,
) -> TodoResult<Json<Vec<Move>>> {
    Ok(Json(state.with_db(|conn| db::completed_moves(conn, pokemon_id))?))
}

/// GET /api/v1/moves/pokemon/:pokemon_id/pending
async fn pending_moves(
    State(state): State<AppState>,
    ApiPath(pokemon_id): ApiPath<Uuid>,
) -> TodoResult<Json<Vec<Move>>> {
    Ok(Json(state.with_db(|conn| db::pending_moves(conn, pokemon_id))?))
}

/// GET /api/v1/moves/:id
async fn get_move(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> TodoResult<Json<Move>> {
    Ok(Json(state.with_db(|conn| db::get_move(conn, id))?))
}

/// PUT /api/v1/moves/:id
async fn update_move(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<MoveUpdate>,
) -> TodoResult<Json<Move>> {
    Ok(Json(state.with_db(|conn| db::update_move(conn, id, update))?))
}

/// DELETE /api/v1/moves/:id
async fn delete_move(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> TodoResult<StatusCode> {
    state.with_db(|conn| db::delete_move(conn, id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/moves/:id/complete
async fn complete_move(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> TodoResult<Json<Move>> {
    Ok(Json(state.with_db(|conn| db::complete_move(conn, id))?))
}

// ============================================================================
// Battle handlers
// ============================================================================

/// POST /api/v1/battles
async fn create_battle(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewBattle>,
) -> TodoResult<(StatusCode, Json<Battle>)> {
    let battle = state.with_db(|conn| db::create_battle(conn, payload))?;
    Ok((StatusCode::CREATED, Json(battle)))
}

/// GET /api/v1/battles/:id
async fn get_battle(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> TodoResult<Json<Battle>> {
    Ok(Json(state.with_db(|conn| db::get_battle(conn, id))?))
}

/// GET /api/v1/battles/pokemon/:pokemon_id
async fn list_battles(
    State(state): State<AppState>,
    ApiPath(pokemon_id): ApiPath<Uuid>,
) -> TodoResult<Json<Vec<Battle>>> {
    Ok(Json(state.with_db(|conn| db::list_battles_for_pokemon(conn, pokemon_id))?))
}

// ============================================================================
// AI handlers
// ============================================================================

/// POST /api/v1/ai/calculate-power (also mounted as /suggest-power)
async fn calculate_power(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PowerRequest>,
) -> TodoResult<Json<PowerEstimate>> {
    request.validate()?;

    let estimate = state
        .estimator
        .estimate_power(
            &request.move_name,
            request.move_description.as_deref(),
            request.difficulty_level,
        )
        .await;

    Ok(Json(estimate))
}

/// GET /api/v1/ai/health
async fn ai_health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.estimator.health_check().await)
}

// ============================================================================
// Router
// ============================================================================

/// CORS for the configured origins. No origins means any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api_routes = Router::new()
        // Pokemon
        .route("/pokemon", post(create_pokemon).get(list_pokemon))
        .route(
            "/pokemon/:id",
            get(get_pokemon).put(update_pokemon).delete(delete_pokemon),
        )
        .route("/pokemon/:id/add-experience", post(add_experience))
        // Moves
        .route("/moves", post(create_move))
        .route("/moves/pokemon/:pokemon_id", get(list_moves))
        .route("/moves/pokemon/:pokemon_id/completed", get(completed_moves))
        .route("/moves/pokemon/:pokemon_id/pending", get(pending_moves))
        .route("/moves/:id", get(get_move).put(update_move).delete(delete_move))
        .route("/moves/:id/complete", post(complete_move))
        // Battles
        .route("/battles", post(create_battle))
        .route("/battles/pokemon/:pokemon_id", get(list_battles))
        .route("/battles/:id", get(get_battle))
        // Power Estimator
        .route("/ai/calculate-power", post(calculate_power))
        .route("/ai/suggest-power", post(calculate_power))
        .route("/ai/health", get(ai_health));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
