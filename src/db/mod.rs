pub mod seed;
pub use seed::seed_data;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::error::{PeladaError, Result};
use crate::models::legacy::parse_match_date;
use crate::models::*;
use crate::services::RatingStore;

pub async fn clear_all_data(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM rating_history").execute(pool).await?;
    sqlx::query("DELETE FROM matches").execute(pool).await?;
    sqlx::query("DELETE FROM players").execute(pool).await?;
    tracing::info!("All data cleared");
    Ok(())
}

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Single-connection in-memory database (every connection would otherwise
/// see its own empty database).
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            position TEXT,
            rating INTEGER,
            base_overall INTEGER,
            fin_rating INTEGER,
            vis_rating INTEGER,
            dec_rating INTEGER,
            def_rating INTEGER,
            vit_rating INTEGER,
            exp_rating INTEGER,
            fut_stats TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Rosters, events and per-match maps are stored as JSON documents.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'SCHEDULED',
            team_a TEXT NOT NULL,
            team_b TEXT NOT NULL,
            score_a INTEGER NOT NULL DEFAULT 0,
            score_b INTEGER NOT NULL DEFAULT 0,
            shootout_score_a INTEGER,
            shootout_score_b INTEGER,
            events TEXT NOT NULL,
            positions TEXT NOT NULL DEFAULT '{}',
            conceded_overrides TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rating_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id TEXT NOT NULL,
            date TEXT NOT NULL,
            overall INTEGER NOT NULL,
            has_match INTEGER NOT NULL,
            FOREIGN KEY (player_id) REFERENCES players (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_status ON matches(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_player ON rating_history(player_id, date)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

// Player operations
pub async fn insert_player(pool: &SqlitePool, player: &Player) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let fut_stats = player.fut_stats.map(|s| serde_json::to_string(&s)).transpose()?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO players
        (id, name, position, rating, base_overall, fin_rating, vis_rating, dec_rating,
         def_rating, vit_rating, exp_rating, fut_stats, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&player.id)
    .bind(&player.name)
    .bind(player.position.map(Position::code))
    .bind(player.rating)
    .bind(player.base_overall)
    .bind(player.fin_rating)
    .bind(player.vis_rating)
    .bind(player.dec_rating)
    .bind(player.def_rating)
    .bind(player.vit_rating)
    .bind(player.exp_rating)
    .bind(fut_stats)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

fn player_from_row(row: &SqliteRow) -> Result<Player> {
    let position = row
        .get::<Option<String>, _>("position")
        .and_then(|p| p.parse::<Position>().ok());
    let fut_stats = row
        .get::<Option<String>, _>("fut_stats")
        .map(|s| serde_json::from_str::<FutStats>(&s))
        .transpose()?;

    Ok(Player {
        id: row.get("id"),
        name: row.get("name"),
        position,
        rating: row.get("rating"),
        base_overall: row.get("base_overall"),
        fin_rating: row.get("fin_rating"),
        vis_rating: row.get("vis_rating"),
        dec_rating: row.get("dec_rating"),
        def_rating: row.get("def_rating"),
        vit_rating: row.get("vit_rating"),
        exp_rating: row.get("exp_rating"),
        fut_stats,
    })
}

pub async fn get_player_by_id(pool: &SqlitePool, player_id: &str) -> Result<Option<Player>> {
    let row = sqlx::query("SELECT * FROM players WHERE id = ?")
        .bind(player_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(player_from_row).transpose()
}

pub async fn get_all_players(pool: &SqlitePool) -> Result<Vec<Player>> {
    let rows = sqlx::query("SELECT * FROM players ORDER BY name")
        .fetch_all(pool)
        .await?;

    rows.iter().map(player_from_row).collect()
}

pub async fn find_players_by_name(pool: &SqlitePool, name: &str) -> Result<Vec<Player>> {
    let rows = sqlx::query("SELECT * FROM players WHERE LOWER(name) LIKE LOWER(?) ORDER BY name")
        .bind(format!("%{}%", name))
        .fetch_all(pool)
        .await?;

    rows.iter().map(player_from_row).collect()
}

/// Partial update: only the fields present in `update` are written.
pub async fn update_player_ratings(
    pool: &SqlitePool,
    player_id: &str,
    update: &PlayerRatingUpdate,
) -> Result<()> {
    let fut_stats = update.fut_stats.map(|s| serde_json::to_string(&s)).transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE players SET
            rating = COALESCE(?, rating),
            fin_rating = COALESCE(?, fin_rating),
            vis_rating = COALESCE(?, vis_rating),
            dec_rating = COALESCE(?, dec_rating),
            def_rating = COALESCE(?, def_rating),
            vit_rating = COALESCE(?, vit_rating),
            exp_rating = COALESCE(?, exp_rating),
            fut_stats = COALESCE(?, fut_stats),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(update.overall)
    .bind(update.fin_rating)
    .bind(update.vis_rating)
    .bind(update.dec_rating)
    .bind(update.def_rating)
    .bind(update.vit_rating)
    .bind(update.exp_rating)
    .bind(fut_stats)
    .bind(Utc::now().to_rfc3339())
    .bind(player_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PeladaError::PlayerNotFound(player_id.to_string()));
    }
    Ok(())
}

// Match operations
pub async fn insert_match(pool: &SqlitePool, match_data: &Match) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO matches
        (id, date, status, team_a, team_b, score_a, score_b, shootout_score_a,
         shootout_score_b, events, positions, conceded_overrides)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&match_data.id)
    .bind(match_data.date.to_rfc3339())
    .bind(match_data.status.as_str())
    .bind(serde_json::to_string(&match_data.team_a)?)
    .bind(serde_json::to_string(&match_data.team_b)?)
    .bind(match_data.score_a)
    .bind(match_data.score_b)
    .bind(match_data.shootout_score_a)
    .bind(match_data.shootout_score_b)
    .bind(serde_json::to_string(&match_data.events)?)
    .bind(serde_json::to_string(&match_data.positions)?)
    .bind(serde_json::to_string(&match_data.conceded_overrides)?)
    .execute(pool)
    .await?;

    Ok(())
}

fn match_from_row(row: &SqliteRow) -> Result<Match> {
    Ok(Match {
        id: row.get("id"),
        date: parse_match_date(&row.get::<String, _>("date"))?,
        status: row.get::<String, _>("status").parse()?,
        team_a: serde_json::from_str(&row.get::<String, _>("team_a"))?,
        team_b: serde_json::from_str(&row.get::<String, _>("team_b"))?,
        score_a: row.get("score_a"),
        score_b: row.get("score_b"),
        shootout_score_a: row.get("shootout_score_a"),
        shootout_score_b: row.get("shootout_score_b"),
        events: serde_json::from_str(&row.get::<String, _>("events"))?,
        positions: serde_json::from_str(&row.get::<String, _>("positions"))?,
        conceded_overrides: serde_json::from_str(&row.get::<String, _>("conceded_overrides"))?,
    })
}

pub async fn get_all_matches(pool: &SqlitePool) -> Result<Vec<Match>> {
    let rows = sqlx::query("SELECT * FROM matches ORDER BY date DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(match_from_row).collect()
}

pub async fn get_matches_by_status(pool: &SqlitePool, status: MatchStatus) -> Result<Vec<Match>> {
    let rows = sqlx::query("SELECT * FROM matches WHERE status = ? ORDER BY date DESC")
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;

    rows.iter().map(match_from_row).collect()
}

// Rating history operations
pub async fn insert_rating_history(pool: &SqlitePool, point: &RatingHistoryPoint) -> Result<()> {
    sqlx::query("INSERT INTO rating_history (player_id, date, overall, has_match) VALUES (?, ?, ?, ?)")
        .bind(&point.player_id)
        .bind(point.date.to_rfc3339())
        .bind(point.overall)
        .bind(point.has_match)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_rating_history(pool: &SqlitePool, player_id: &str) -> Result<Vec<RatingHistoryPoint>> {
    let rows = sqlx::query("SELECT * FROM rating_history WHERE player_id = ? ORDER BY date ASC, id ASC")
        .bind(player_id)
        .fetch_all(pool)
        .await?;

    let mut history = Vec::new();
    for row in rows {
        history.push(RatingHistoryPoint {
            player_id: row.get("player_id"),
            date: parse_match_date(&row.get::<String, _>("date"))?,
            overall: row.get("overall"),
            has_match: row.get("has_match"),
        });
    }
    Ok(history)
}

/// The storage collaborator the rating engine reads from and writes to.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl RatingStore for SqliteStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        let players = get_all_players(&self.pool).await?;
        let matches = get_all_matches(&self.pool).await?;
        Ok(Snapshot { players, matches })
    }

    async fn update_player(&self, id: &str, update: &PlayerRatingUpdate) -> Result<()> {
        update_player_ratings(&self.pool, id, update).await
    }

    async fn append_history(&self, point: &RatingHistoryPoint) -> Result<()> {
        insert_rating_history(&self.pool, point).await
    }
}
