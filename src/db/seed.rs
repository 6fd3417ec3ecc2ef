use chrono::{Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::{insert_match, insert_player};
use crate::error::Result;
use crate::models::{EventType, Match, MatchEvent, MatchStatus, Player, Position, TeamSide};

pub async fn seed_data(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Database already seeded ({} players found), skipping.", count);
        return Ok(());
    }

    tracing::info!("Seeding database with demo roster and matches...");

    seed_players(pool).await?;
    seed_matches(pool).await?;

    tracing::info!("Database seeded successfully.");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
//  Roster
// ─────────────────────────────────────────────────────────────────────────────

async fn seed_players(pool: &SqlitePool) -> Result<()> {
    // (id, name, position, base overall)
    let roster: Vec<(&str, &str, Position, i32)> = vec![
        ("p_01", "Rafa",     Position::Gk,  78),
        ("p_02", "Tiago",    Position::Gk,  72),
        ("p_03", "Bruno",    Position::Def, 76),
        ("p_04", "Leo",      Position::Def, 70),
        ("p_05", "Diego",    Position::Def, 74),
        ("p_06", "Marcelo",  Position::Def, 68),
        ("p_07", "Gabi",     Position::Mid, 80),
        ("p_08", "Pedrinho", Position::Mid, 73),
        ("p_09", "Caio",     Position::Mid, 77),
        ("p_10", "Renan",    Position::Mid, 69),
        ("p_11", "Juninho",  Position::Fwd, 82),
        ("p_12", "Vitor",    Position::Fwd, 75),
    ];

    for (id, name, position, base) in &roster {
        let mut player = Player::new(*id, *name, Some(*position));
        player.base_overall = Some(*base);
        player.rating = Some(*base);
        insert_player(pool, &player).await?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
//  Matches
// ─────────────────────────────────────────────────────────────────────────────

fn event(player_id: &str, side: TeamSide, event_type: EventType, period: u8) -> MatchEvent {
    MatchEvent {
        id: Uuid::new_v4().to_string(),
        event_type,
        player_id: player_id.to_string(),
        team_id: side,
        timestamp: 0,
        period,
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

async fn seed_matches(pool: &SqlitePool) -> Result<()> {
    let first_saturday = Utc
        .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    let side_a = ["p_01", "p_03", "p_04", "p_07", "p_08", "p_11"];
    let side_b = ["p_02", "p_05", "p_06", "p_09", "p_10", "p_12"];

    use EventType::{Assist, Goal};
    use TeamSide::{A, B};

    // (score a, score b, shootout, events)
    let fixtures: Vec<(i32, i32, Option<(i32, i32)>, Vec<MatchEvent>)> = vec![
        (3, 1, None, vec![
            event("p_11", A, Goal, 1), event("p_07", A, Assist, 1),
            event("p_11", A, Goal, 2), event("p_08", A, Goal, 2),
            event("p_12", B, Goal, 2), event("p_09", B, Assist, 2),
        ]),
        (2, 2, Some((4, 3)), vec![
            event("p_07", A, Goal, 1), event("p_12", B, Goal, 1),
            event("p_10", B, Assist, 1), event("p_03", A, Goal, 2),
            event("p_12", B, Goal, 2),
        ]),
        (0, 1, None, vec![
            event("p_09", B, Goal, 2), event("p_12", B, Assist, 2),
        ]),
        (4, 2, None, vec![
            event("p_11", A, Goal, 1), event("p_11", A, Goal, 1),
            event("p_07", A, Assist, 1), event("p_08", A, Assist, 2),
            event("p_11", A, Goal, 2), event("p_04", A, Goal, 2),
            event("p_12", B, Goal, 1), event("p_05", B, Goal, 2),
        ]),
    ];

    for (week, (score_a, score_b, shootout, events)) in fixtures.into_iter().enumerate() {
        let m = Match {
            id: format!("match_{:02}", week + 1),
            date: first_saturday + Duration::weeks(week as i64),
            status: MatchStatus::Finished,
            team_a: ids(&side_a),
            team_b: ids(&side_b),
            score_a,
            score_b,
            shootout_score_a: shootout.map(|(a, _)| a),
            shootout_score_b: shootout.map(|(_, b)| b),
            events,
            positions: HashMap::new(),
            conceded_overrides: HashMap::new(),
        };
        insert_match(pool, &m).await?;
    }

    let upcoming = Match {
        id: "match_05".to_string(),
        date: first_saturday + Duration::weeks(4),
        status: MatchStatus::Scheduled,
        team_a: ids(&side_b),
        team_b: ids(&side_a),
        score_a: 0,
        score_b: 0,
        shootout_score_a: None,
        shootout_score_b: None,
        events: vec![],
        positions: HashMap::new(),
        conceded_overrides: HashMap::new(),
    };
    insert_match(pool, &upcoming).await?;

    Ok(())
}
