use std::collections::HashMap;

use crate::models::{EventType, Match, Player, Position, TeamSide, DEFAULT_RATING};
use crate::services::EngineConfig;
use crate::utils::mean_or;

pub const MIN_DIFFICULTY: f64 = 0.6;
pub const MAX_DIFFICULTY: f64 = 1.5;

/// Read-only id lookup over the roster snapshot, shared by every per-player
/// computation of a recalculation run.
pub struct RosterIndex<'a> {
    players: HashMap<&'a str, &'a Player>,
}

impl<'a> RosterIndex<'a> {
    pub fn new(players: &'a [Player]) -> Self {
        Self {
            players: players.iter().map(|p| (p.id.as_str(), p)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a Player> {
        self.players.get(id).copied()
    }

    /// Rating of a roster member; ids missing from the roster count as 75.
    pub fn rating_of(&self, id: &str) -> f64 {
        self.get(id)
            .map(|p| p.current_rating())
            .unwrap_or(DEFAULT_RATING) as f64
    }

    /// Mean rating of a team; an empty team averages 75.
    pub fn team_average(&self, ids: &[String]) -> f64 {
        mean_or(ids.iter().map(|id| self.rating_of(id)), DEFAULT_RATING as f64)
    }
}

/// Opponent strength relative to the player's own team, clamped to [0.6, 1.5].
pub fn difficulty_ratio(my_team_avg: f64, opp_team_avg: f64) -> f64 {
    (opp_team_avg / my_team_avg.max(1.0)).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Ratings of the defensive teammates a GK or DEF shared the pitch with.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DefensiveContext {
    pub rating_sum: f64,
    pub count: u32,
}

impl DefensiveContext {
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.rating_sum / self.count as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchAggregate {
    pub weighted_goals: f64,
    pub weighted_assists: f64,
    pub weighted_conceded: f64,
    pub subset_wins: u32,
    pub matches_count: u32,
    pub raw_goals: u32,
    pub raw_assists: u32,
    pub defensive: DefensiveContext,
}

impl MatchAggregate {
    pub fn has_data(&self) -> bool {
        self.matches_count > 0
    }
}

/// Whether `m` counts towards the player's rating.
pub fn qualifies(player: &Player, m: &Match, config: &EngineConfig) -> Option<TeamSide> {
    if !m.is_finished() {
        return None;
    }
    let side = m.side_of(&player.id)?;
    if config.strict_position_match {
        if let Some(played) = m.positions.get(&player.id) {
            if Some(*played) != player.position {
                return None;
            }
        }
    }
    Some(side)
}

fn is_defensive_partner(player_position: Option<Position>, teammate_position: Option<Position>) -> bool {
    match (player_position, teammate_position) {
        (Some(Position::Gk), Some(Position::Def)) => true,
        (Some(Position::Def), Some(Position::Gk | Position::Def)) => true,
        _ => false,
    }
}

/// Difficulty-weighted tally of the player's finished matches.
pub fn aggregate(
    player: &Player,
    matches: &[Match],
    roster: &RosterIndex<'_>,
    config: &EngineConfig,
) -> MatchAggregate {
    let mut agg = MatchAggregate::default();

    for m in matches {
        let Some(side) = qualifies(player, m, config) else {
            continue;
        };
        let my_team = m.roster(side);
        let opp_team = m.roster(side.opponent());

        let ratio = difficulty_ratio(roster.team_average(my_team), roster.team_average(opp_team));

        let goals = m.count_events(&player.id, EventType::Goal);
        let assists = m.count_events(&player.id, EventType::Assist);
        let conceded = m.conceded_by(&player.id, side);

        agg.weighted_goals += goals as f64 * ratio;
        agg.weighted_assists += assists as f64 * ratio;
        agg.weighted_conceded += conceded as f64 * (1.0 / ratio);
        agg.raw_goals += goals;
        agg.raw_assists += assists;
        agg.matches_count += 1;

        if m.winner(config.count_shootout_wins) == Some(side) {
            agg.subset_wins += 1;
        }

        for teammate in my_team.iter().filter(|id| **id != player.id) {
            if let Some(mate) = roster.get(teammate) {
                if is_defensive_partner(player.position, mate.position) {
                    agg.defensive.rating_sum += mate.current_rating() as f64;
                    agg.defensive.count += 1;
                }
            }
        }
    }

    tracing::debug!(
        player = %player.id,
        matches = agg.matches_count,
        weighted_goals = agg.weighted_goals,
        weighted_assists = agg.weighted_assists,
        weighted_conceded = agg.weighted_conceded,
        "Aggregated match history"
    );

    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchEvent, MatchStatus};
    use chrono::Utc;

    fn rated(id: &str, position: Position, rating: i32) -> Player {
        let mut p = Player::new(id, id, Some(position));
        p.rating = Some(rating);
        p
    }

    fn goal(player_id: &str, side: TeamSide, event_type: EventType) -> MatchEvent {
        MatchEvent {
            id: String::new(),
            event_type,
            player_id: player_id.to_string(),
            team_id: side,
            timestamp: 0,
            period: 1,
        }
    }

    fn game(team_a: &[&str], team_b: &[&str], score: (i32, i32), events: Vec<MatchEvent>) -> Match {
        Match {
            id: "m".to_string(),
            date: Utc::now(),
            status: MatchStatus::Finished,
            team_a: team_a.iter().map(|s| s.to_string()).collect(),
            team_b: team_b.iter().map(|s| s.to_string()).collect(),
            score_a: score.0,
            score_b: score.1,
            shootout_score_a: None,
            shootout_score_b: None,
            events,
            positions: HashMap::new(),
            conceded_overrides: HashMap::new(),
        }
    }

    #[test]
    fn test_difficulty_ratio_is_clamped() {
        assert_eq!(difficulty_ratio(40.0, 90.0), MAX_DIFFICULTY);
        assert_eq!(difficulty_ratio(90.0, 40.0), MIN_DIFFICULTY);
        assert!((difficulty_ratio(80.0, 88.0) - 1.1).abs() < 1e-9);
        assert_eq!(difficulty_ratio(0.0, 1.0), 1.0);
    }

    #[test]
    fn test_team_average_defaults_missing_players() {
        let players = vec![rated("a", Position::Mid, 85)];
        let roster = RosterIndex::new(&players);
        assert_eq!(roster.team_average(&["a".to_string(), "ghost".to_string()]), 80.0);
        assert_eq!(roster.team_average(&[]), 75.0);
    }

    #[test]
    fn test_aggregate_weights_by_opponent_strength() {
        let players = vec![
            rated("me", Position::Fwd, 50),
            rated("mate", Position::Def, 50),
            rated("opp1", Position::Mid, 90),
            rated("opp2", Position::Gk, 90),
        ];
        let roster = RosterIndex::new(&players);
        let m = game(
            &["me", "mate"],
            &["opp1", "opp2"],
            (1, 2),
            vec![goal("me", TeamSide::A, EventType::Goal)],
        );

        let agg = aggregate(&players[0], &[m], &roster, &EngineConfig::default());
        // 90 / 50 = 1.8, clamped to 1.5
        assert!((agg.weighted_goals - 1.5).abs() < 1e-9);
        assert!((agg.weighted_conceded - 2.0 / 1.5).abs() < 1e-9);
        assert_eq!(agg.subset_wins, 0);
        assert_eq!(agg.matches_count, 1);
    }

    #[test]
    fn test_aggregate_skips_unfinished_and_absent_matches() {
        let players = vec![rated("me", Position::Mid, 75)];
        let roster = RosterIndex::new(&players);
        let mut live = game(&["me"], &["x"], (3, 0), vec![]);
        live.status = MatchStatus::Live;
        let absent = game(&["y"], &["x"], (3, 0), vec![]);

        let agg = aggregate(&players[0], &[live, absent], &roster, &EngineConfig::default());
        assert!(!agg.has_data());
    }

    #[test]
    fn test_own_goals_are_not_goals() {
        let players = vec![rated("me", Position::Fwd, 75)];
        let roster = RosterIndex::new(&players);
        let m = game(&["me"], &["x"], (0, 1), vec![goal("me", TeamSide::A, EventType::OwnGoal)]);
        let agg = aggregate(&players[0], &[m], &roster, &EngineConfig::default());
        assert_eq!(agg.raw_goals, 0);
    }

    #[test]
    fn test_strict_position_filters_role_changes() {
        let players = vec![rated("me", Position::Fwd, 75)];
        let roster = RosterIndex::new(&players);
        let mut as_keeper = game(&["me"], &["x"], (1, 0), vec![]);
        as_keeper.positions.insert("me".to_string(), Position::Gk);
        let unrecorded = game(&["me"], &["x"], (1, 0), vec![]);
        let matches = vec![as_keeper, unrecorded];

        let lenient = aggregate(&players[0], &matches, &roster, &EngineConfig::default());
        assert_eq!(lenient.matches_count, 2);

        let strict_config = EngineConfig {
            strict_position_match: true,
            ..EngineConfig::default()
        };
        let strict = aggregate(&players[0], &matches, &roster, &strict_config);
        assert_eq!(strict.matches_count, 1);
    }

    #[test]
    fn test_keeper_collects_defender_teammates() {
        let players = vec![
            rated("gk", Position::Gk, 75),
            rated("d1", Position::Def, 60),
            rated("d2", Position::Def, 70),
            rated("fw", Position::Fwd, 99),
        ];
        let roster = RosterIndex::new(&players);
        let m = game(&["gk", "d1", "d2", "fw"], &["x"], (0, 0), vec![]);
        let agg = aggregate(&players[0], &[m], &roster, &EngineConfig::default());
        assert_eq!(agg.defensive.count, 2);
        assert_eq!(agg.defensive.average(), Some(65.0));
    }

    #[test]
    fn test_defender_collects_keeper_and_defender_teammates() {
        let players = vec![
            rated("d1", Position::Def, 50),
            rated("gk", Position::Gk, 80),
            rated("d2", Position::Def, 70),
            rated("mid", Position::Mid, 99),
            rated("fw", Position::Fwd, 99),
            rated("opp_gk", Position::Gk, 10),
        ];
        let roster = RosterIndex::new(&players);
        let first = game(&["d1", "gk", "d2", "mid", "fw"], &["opp_gk"], (1, 0), vec![]);
        let second = game(&["opp_gk"], &["d1", "gk", "fw"], (0, 0), vec![]);
        let agg = aggregate(&players[0], &[first, second], &roster, &EngineConfig::default());
        // gk + d2 in the first match, gk in the second; opposing keeper ignored
        assert_eq!(agg.defensive.count, 3);
        assert_eq!(agg.defensive.average(), Some(230.0 / 3.0));
    }
}
