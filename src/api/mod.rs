use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{
    get_all_matches, get_all_players, get_matches_by_status, get_player_by_id, get_rating_history,
    init_database, SqliteStore,
};
use crate::models::{ApiResponse, Match, MatchStatus, Player, PlayerCard};
use crate::services::{PlayerRating, RatingEngine, RecalculationSummary};

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub engine: RatingEngine,
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let pool = init_database(&config.database_url).await?;

    let state = AppState {
        store: SqliteStore::new(pool),
        engine: RatingEngine::new(config.engine),
    };
    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Pelada API server listening on port {}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/players", get(list_players_handler))
        .route("/players/{id}", get(get_player_card_handler))
        .route("/players/{id}/preview", get(preview_rating_handler))
        .route("/matches", get(list_matches_handler))
        .route("/ratings/recalculate", post(recalculate_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Pelada ratings API is running"))
}

// GET /players - Roster with persisted ratings
async fn list_players_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Player>>>, StatusCode> {
    match get_all_players(state.store.pool()).await {
        Ok(players) => Ok(Json(ApiResponse::success(players))),
        Err(e) => {
            tracing::error!("Failed to fetch players: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /players/{id} - Player card with rating history
async fn get_player_card_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<ApiResponse<PlayerCard>>, StatusCode> {
    let pool = state.store.pool();
    match get_player_by_id(pool, &player_id).await {
        Ok(Some(player)) => {
            let history = get_rating_history(pool, &player_id).await.map_err(|e| {
                tracing::error!("Failed to fetch rating history: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            let fut_stats = player.attributes().to_fut_stats();
            Ok(Json(ApiResponse::success(PlayerCard {
                player,
                fut_stats,
                history,
            })))
        }
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch player: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /players/{id}/preview - Fresh rating computed from history, not persisted
async fn preview_rating_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<ApiResponse<PlayerRating>>, StatusCode> {
    let pool = state.store.pool();
    let (players, matches) = match tokio::try_join!(get_all_players(pool), get_all_matches(pool)) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Failed to load snapshot for preview: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let player = players
        .iter()
        .find(|p| p.id == player_id)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ApiResponse::success(state.engine.compute(player, &matches, &players))))
}

#[derive(Debug, Deserialize)]
pub struct MatchFilter {
    pub status: Option<String>,
}

// GET /matches?status=FINISHED - Match history, newest first
async fn list_matches_handler(
    State(state): State<AppState>,
    Query(filter): Query<MatchFilter>,
) -> Result<Json<ApiResponse<Vec<Match>>>, StatusCode> {
    let pool = state.store.pool();
    let result = match filter.status.as_deref() {
        Some(raw) => {
            let status: MatchStatus = raw.to_uppercase().parse().map_err(|_| StatusCode::BAD_REQUEST)?;
            get_matches_by_status(pool, status).await
        }
        None => get_all_matches(pool).await,
    };

    match result {
        Ok(matches) => Ok(Json(ApiResponse::success(matches))),
        Err(e) => {
            tracing::error!("Failed to fetch matches: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// POST /ratings/recalculate - Recompute and persist every player's rating
async fn recalculate_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RecalculationSummary>>, StatusCode> {
    match state.engine.recalculate_from_store(&state.store).await {
        Ok(summary) => Ok(Json(ApiResponse::success(summary))),
        Err(e) => {
            tracing::error!("Failed to recalculate ratings: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
