use chrono::{DateTime, Utc};
use futures::future::join_all;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::Result;
use crate::models::{
    Attributes, FutStats, Match, Player, PlayerRatingUpdate, RatingHistoryPoint, Snapshot,
};
use crate::services::aggregator::{self, RosterIndex};
use crate::services::{attributes, overall};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Only count matches where the recorded per-match position equals the
    /// player's current position.
    pub strict_position_match: bool,
    /// Treat a shootout victory after a level score as a win for VIT.
    pub count_shootout_wins: bool,
}

/// Storage collaborator: snapshot reads and independent per-player writes.
pub trait RatingStore: Sync {
    fn load_snapshot(&self) -> impl Future<Output = Result<Snapshot>> + Send;

    fn update_player(
        &self,
        id: &str,
        update: &PlayerRatingUpdate,
    ) -> impl Future<Output = Result<()>> + Send;

    fn append_history(&self, point: &RatingHistoryPoint) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRating {
    pub player_id: String,
    pub overall: i32,
    pub attributes: Attributes,
    pub fut_stats: FutStats,
    pub matches_count: u32,
    pub goals: u32,
    pub assists: u32,
    pub wins: u32,
    /// False when the player had no qualifying matches and defaults were used.
    pub has_data: bool,
}

impl PlayerRating {
    fn without_data(player: &Player) -> Self {
        let attributes = Attributes::DEFAULT;
        Self {
            player_id: player.id.clone(),
            overall: player.baseline().clamp(1, 99),
            attributes,
            fut_stats: attributes.to_fut_stats(),
            matches_count: 0,
            goals: 0,
            assists: 0,
            wins: 0,
            has_data: false,
        }
    }

    pub fn to_update(&self) -> PlayerRatingUpdate {
        PlayerRatingUpdate {
            overall: Some(self.overall),
            fin_rating: Some(self.attributes.fin),
            vis_rating: Some(self.attributes.vis),
            dec_rating: Some(self.attributes.dec),
            def_rating: Some(self.attributes.def),
            vit_rating: Some(self.attributes.vit),
            exp_rating: Some(self.attributes.exp),
            fut_stats: Some(self.fut_stats),
        }
    }

    pub fn history_point(&self, date: DateTime<Utc>) -> RatingHistoryPoint {
        RatingHistoryPoint {
            player_id: self.player_id.clone(),
            date,
            overall: self.overall,
            has_match: self.has_data,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationSummary {
    pub updated: usize,
    pub failed: usize,
    pub without_data: usize,
}

pub fn finished_match_count(matches: &[Match]) -> usize {
    matches.iter().filter(|m| m.is_finished()).count()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RatingEngine {
    config: EngineConfig,
}

impl RatingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rating for one player against the full history and roster.
    pub fn compute(&self, player: &Player, matches: &[Match], all_players: &[Player]) -> PlayerRating {
        let roster = RosterIndex::new(all_players);
        self.compute_indexed(player, matches, &roster, finished_match_count(matches))
    }

    fn compute_indexed(
        &self,
        player: &Player,
        matches: &[Match],
        roster: &RosterIndex<'_>,
        total_finished: usize,
    ) -> PlayerRating {
        let agg = aggregator::aggregate(player, matches, roster, &self.config);
        if !agg.has_data() {
            return PlayerRating::without_data(player);
        }

        let breakdown = attributes::calculate(&agg, player.position, total_finished);
        let overall = overall::synthesize(&breakdown.attributes, player.position, player.baseline());

        PlayerRating {
            player_id: player.id.clone(),
            overall,
            attributes: breakdown.attributes,
            fut_stats: breakdown.attributes.to_fut_stats(),
            matches_count: agg.matches_count,
            goals: agg.raw_goals,
            assists: agg.raw_assists,
            wins: agg.subset_wins,
            has_data: true,
        }
    }

    /// Ratings for the whole roster, computed in parallel over the snapshot.
    pub fn compute_all(&self, players: &[Player], matches: &[Match]) -> Vec<PlayerRating> {
        let roster = RosterIndex::new(players);
        let total_finished = finished_match_count(matches);
        players
            .par_iter()
            .map(|player| self.compute_indexed(player, matches, &roster, total_finished))
            .collect()
    }

    /// Computes every player and persists each result independently. A failed
    /// write is logged and counted; it never blocks the other players.
    pub async fn recalculate_all<S: RatingStore>(
        &self,
        players: &[Player],
        matches: &[Match],
        store: &S,
    ) -> RecalculationSummary {
        let ratings = self.compute_all(players, matches);
        let now = Utc::now();

        let outcomes = join_all(ratings.iter().map(|rating| persist(store, rating, now))).await;

        let mut summary = RecalculationSummary::default();
        for (rating, saved) in ratings.iter().zip(outcomes) {
            if saved {
                summary.updated += 1;
            } else {
                summary.failed += 1;
            }
            if !rating.has_data {
                summary.without_data += 1;
            }
        }

        tracing::info!(
            "Recalculated {} players ({} saved, {} failed, {} without matches)",
            ratings.len(),
            summary.updated,
            summary.failed,
            summary.without_data
        );
        summary
    }

    pub async fn recalculate_from_store<S: RatingStore>(&self, store: &S) -> Result<RecalculationSummary> {
        let snapshot = store.load_snapshot().await?;
        Ok(self
            .recalculate_all(&snapshot.players, &snapshot.matches, store)
            .await)
    }
}

async fn persist<S: RatingStore>(store: &S, rating: &PlayerRating, date: DateTime<Utc>) -> bool {
    if let Err(e) = store.update_player(&rating.player_id, &rating.to_update()).await {
        tracing::warn!("Failed to save rating for player {}: {}", rating.player_id, e);
        return false;
    }
    if let Err(e) = store.append_history(&rating.history_point(date)).await {
        tracing::warn!("Saved rating for player {} but not its history: {}", rating.player_id, e);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeladaError;
    use crate::models::{EventType, MatchEvent, MatchStatus, Position, TeamSide};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        players: Mutex<Vec<Player>>,
        matches: Vec<Match>,
        history: Mutex<Vec<RatingHistoryPoint>>,
        failing: HashSet<String>,
    }

    impl RatingStore for MemoryStore {
        async fn load_snapshot(&self) -> Result<Snapshot> {
            Ok(Snapshot {
                players: self.players.lock().unwrap().clone(),
                matches: self.matches.clone(),
            })
        }

        async fn update_player(&self, id: &str, update: &PlayerRatingUpdate) -> Result<()> {
            if self.failing.contains(id) {
                return Err(PeladaError::PlayerNotFound(id.to_string()));
            }
            let mut players = self.players.lock().unwrap();
            let player = players
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| PeladaError::PlayerNotFound(id.to_string()))?;
            player.apply(update);
            Ok(())
        }

        async fn append_history(&self, point: &RatingHistoryPoint) -> Result<()> {
            self.history.lock().unwrap().push(point.clone());
            Ok(())
        }
    }

    fn player(id: &str, position: Position) -> Player {
        Player::new(id, id, Some(position))
    }

    fn event(player_id: &str, event_type: EventType) -> MatchEvent {
        MatchEvent {
            id: String::new(),
            event_type,
            player_id: player_id.to_string(),
            team_id: TeamSide::A,
            timestamp: 0,
            period: 1,
        }
    }

    fn win_for_striker() -> Match {
        Match {
            id: "m1".to_string(),
            date: Utc::now(),
            status: MatchStatus::Finished,
            team_a: vec!["fwd".to_string(), "mid".to_string()],
            team_b: vec!["opp".to_string(), "opp_gk".to_string()],
            score_a: 3,
            score_b: 1,
            shootout_score_a: None,
            shootout_score_b: None,
            events: vec![
                event("fwd", EventType::Goal),
                event("fwd", EventType::Goal),
                event("fwd", EventType::Assist),
                event("mid", EventType::Goal),
            ],
            positions: HashMap::new(),
            conceded_overrides: HashMap::new(),
        }
    }

    fn roster() -> Vec<Player> {
        let mut fwd = player("fwd", Position::Fwd);
        fwd.base_overall = Some(75);
        vec![
            fwd,
            player("mid", Position::Mid),
            player("opp", Position::Def),
            player("opp_gk", Position::Gk),
            player("bench", Position::Mid),
        ]
    }

    #[test]
    fn test_single_match_striker_is_bit_exact() {
        let players = roster();
        let rating = RatingEngine::default().compute(&players[0], &[win_for_striker()], &players);

        assert!(rating.has_data);
        assert_eq!(
            rating.attributes,
            Attributes { fin: 8, vis: 4, dec: 7, def: 20, vit: 99, exp: 99 }
        );
        assert_eq!(rating.overall, 60);
        assert_eq!((rating.goals, rating.assists, rating.wins), (2, 1, 1));
    }

    #[test]
    fn test_no_data_returns_baseline_and_defaults() {
        let mut players = roster();
        players[4].base_overall = Some(68);
        let rating = RatingEngine::default().compute(&players[4], &[win_for_striker()], &players);
        assert!(!rating.has_data);
        assert_eq!(rating.overall, 68);
        assert_eq!(rating.attributes, Attributes::DEFAULT);
    }

    #[test]
    fn test_compute_is_idempotent_and_matches_parallel_run() {
        let players = roster();
        let matches = vec![win_for_striker()];
        let engine = RatingEngine::default();
        let all = engine.compute_all(&players, &matches);
        for (p, parallel) in players.iter().zip(&all) {
            let first = engine.compute(p, &matches, &players);
            let second = engine.compute(p, &matches, &players);
            assert_eq!(first, second);
            assert_eq!(&first, parallel);
        }
    }

    #[tokio::test]
    async fn test_recalculate_all_isolates_failed_writes() {
        let store = MemoryStore {
            players: Mutex::new(roster()),
            matches: vec![win_for_striker()],
            failing: HashSet::from(["mid".to_string()]),
            ..MemoryStore::default()
        };

        let summary = RatingEngine::default().recalculate_from_store(&store).await.unwrap();
        assert_eq!(summary, RecalculationSummary { updated: 4, failed: 1, without_data: 1 });

        let players = store.players.lock().unwrap();
        assert_eq!(players[0].rating, Some(60));
        assert_eq!(players[0].fin_rating, Some(8));
        assert_eq!(players[1].rating, None);
        assert_eq!(store.history.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_recalculate_all_tolerates_empty_inputs() {
        let store = MemoryStore::default();
        let engine = RatingEngine::default();
        let summary = engine.recalculate_all(&[], &[], &store).await;
        assert_eq!(summary, RecalculationSummary::default());

        let lonely = vec![player("solo", Position::Gk)];
        let store = MemoryStore {
            players: Mutex::new(lonely.clone()),
            ..MemoryStore::default()
        };
        let summary = engine.recalculate_all(&lonely, &[], &store).await;
        assert_eq!(summary, RecalculationSummary { updated: 1, failed: 0, without_data: 1 });
        assert_eq!(store.players.lock().unwrap()[0].rating, Some(75));
    }
}
