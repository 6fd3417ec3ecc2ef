use anyhow::Result;

use crate::config::Config;
use crate::db::{
    clear_all_data, find_players_by_name, get_all_matches, get_all_players, get_rating_history, init_database,
    insert_match, insert_player, seed_data, SqliteStore,
};
use crate::models::legacy::parse_snapshot;
use crate::services::RatingEngine;
use crate::utils::{calculate_win_percentage, format_rating_delta};

pub async fn init_db(config: &Config, reset: bool, seed: bool) -> Result<()> {
    let pool = init_database(&config.database_url).await?;
    if reset {
        clear_all_data(&pool).await?;
        println!("🧹 Cleared players, matches and rating history");
    }
    if seed {
        seed_data(&pool).await?;
    }
    println!("✅ Database ready at {}", config.database_url);
    Ok(())
}

pub async fn recalculate(config: &Config) -> Result<()> {
    let pool = init_database(&config.database_url).await?;
    let store = SqliteStore::new(pool);
    let engine = RatingEngine::new(config.engine);

    println!("⚽ Recalculating ratings for every player...");

    let summary = engine.recalculate_from_store(&store).await?;

    println!(
        "✅ {} players updated ({} without finished matches)",
        summary.updated, summary.without_data
    );
    if summary.failed > 0 {
        println!("⚠️  {} players could not be saved, see the log for details", summary.failed);
    }
    Ok(())
}

pub async fn import_snapshot(config: &Config, path: &str) -> Result<()> {
    let pool = init_database(&config.database_url).await?;

    println!("📥 Importing {}...", path);

    let raw = tokio::fs::read_to_string(path).await?;
    let snapshot = parse_snapshot(&raw)?;

    for player in &snapshot.players {
        insert_player(&pool, player).await?;
    }
    for match_data in &snapshot.matches {
        insert_match(&pool, match_data).await?;
    }

    println!(
        "✅ Imported {} players and {} matches",
        snapshot.players.len(),
        snapshot.matches.len()
    );
    println!("💡 Run `pelada recalculate` to refresh the ratings.");
    Ok(())
}

pub async fn show_player(config: &Config, name: &str) -> Result<()> {
    let pool = init_database(&config.database_url).await?;

    println!("🔍 Searching for player: {}", name);

    let found = find_players_by_name(&pool, name).await?;
    let all_players = get_all_players(&pool).await?;

    let Some(player) = found.first() else {
        println!("❌ No players found matching '{}'", name);
        let suggestions = closest_names(name, all_players.iter().map(|p| p.name.as_str()), 3);
        if !suggestions.is_empty() {
            println!("\n💡 Did you mean:");
            for suggestion in suggestions {
                println!("   • {}", suggestion);
            }
        }
        return Ok(());
    };

    if found.len() > 1 {
        println!("📋 Found {} players matching '{}':\n", found.len(), name);
        for (i, p) in found.iter().enumerate() {
            println!("{}. {} ({})", i + 1, p.name, position_label(p.position));
        }
        println!("\n🔍 Showing details for first match:");
    }

    let matches = get_all_matches(&pool).await?;
    let engine = RatingEngine::new(config.engine);
    let rating = engine.compute(player, &matches, &all_players);
    let attrs = player.attributes();

    println!("📊 Player Card:");
    println!("   Name: {}", player.name);
    println!("   Position: {}", position_label(player.position));
    println!("   Overall: {} (base {})", player.rating.unwrap_or(player.baseline()), player.baseline());
    println!(
        "   FIN {} | VIS {} | DEC {} | DEF {} | VIT {} | EXP {}",
        attrs.fin, attrs.vis, attrs.dec, attrs.def, attrs.vit, attrs.exp
    );

    println!("\n📅 Finished Matches:");
    println!(
        "   Played: {} | Goals: {} | Assists: {} | Wins: {} ({:.1}%)",
        rating.matches_count,
        rating.goals,
        rating.assists,
        rating.wins,
        calculate_win_percentage(rating.wins, rating.matches_count)
    );
    if let Some(stored) = player.rating {
        if stored != rating.overall {
            println!(
                "   Next recalculation: {} ({})",
                rating.overall,
                format_rating_delta(stored, rating.overall)
            );
        }
    }

    let history = get_rating_history(&pool, &player.id).await?;
    if !history.is_empty() {
        println!("\n📈 Overall History:");
        let mut previous: Option<i32> = None;
        for point in history.iter().rev().take(5).rev() {
            let delta = previous
                .map(|p| format!(" ({})", format_rating_delta(p, point.overall)))
                .unwrap_or_default();
            println!("   {} → {}{}", point.date.format("%Y-%m-%d %H:%M"), point.overall, delta);
            previous = Some(point.overall);
        }
    }

    Ok(())
}

fn position_label(position: Option<crate::models::Position>) -> &'static str {
    position.map(|p| p.code()).unwrap_or("?")
}

/// Roster names most similar to `query`, best first.
fn closest_names<'a>(query: &str, names: impl Iterator<Item = &'a str>, limit: usize) -> Vec<&'a str> {
    let query = query.to_lowercase();
    let mut scored: Vec<(f64, &str)> = names
        .map(|name| (strsim::jaro_winkler(&query, &name.to_lowercase()), name))
        .filter(|(score, _)| *score >= 0.75)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, name)| name).collect()
}
