use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PeladaError;

pub mod legacy;

/// Rating assumed for any player whose rating is unknown.
pub const DEFAULT_RATING: i32 = 75;
/// Attribute value reported when a player has no qualifying matches.
pub const DEFAULT_ATTRIBUTE: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    Gk,
    Def,
    Mid,
    Fwd,
}

impl Position {
    pub fn code(self) -> &'static str {
        match self {
            Position::Gk => "GK",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }
}

impl FromStr for Position {
    type Err = PeladaError;

    /// Accepts the canonical codes plus the legacy Portuguese labels
    /// ("Goleiro", "ZAGUEIRO", "Meia", ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "GOLEIRO" => Ok(Position::Gk),
            "DEF" | "DEFENSOR" | "ZAGUEIRO" => Ok(Position::Def),
            "MID" | "MEIA" | "MEIO" => Ok(Position::Mid),
            "FWD" | "ATACANTE" => Ok(Position::Fwd),
            _ => Err(PeladaError::InvalidPosition(s.to_string())),
        }
    }
}

impl TryFrom<String> for Position {
    type Error = PeladaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.code().to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unrecognised position labels become `None` ("unknown") instead of
/// rejecting the whole player document.
fn lenient_position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|label| match label.parse() {
        Ok(position) => Some(position),
        Err(_) => {
            tracing::warn!("Unknown position '{}', treating as unknown", label);
            None
        }
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Live,
    HalfTime,
    Finished,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Live => "LIVE",
            MatchStatus::HalfTime => "HALF_TIME",
            MatchStatus::Finished => "FINISHED",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(MatchStatus::Scheduled),
            "LIVE" => Ok(MatchStatus::Live),
            "HALF_TIME" => Ok(MatchStatus::HalfTime),
            "FINISHED" => Ok(MatchStatus::Finished),
            _ => Err(PeladaError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    A,
    B,
}

impl TeamSide {
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::A => TeamSide::B,
            TeamSide::B => TeamSide::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Goal,
    Assist,
    CardYellow,
    CardRed,
    OwnGoal,
}

fn first_period() -> u8 {
    1
}

/// Match dates arrive as RFC 3339, as naive local timestamps from the
/// scheduler, or as bare dates.
fn flexible_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    legacy::parse_match_date(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub player_id: String,
    pub team_id: TeamSide,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default = "first_period")]
    pub period: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    #[serde(deserialize_with = "flexible_date")]
    pub date: DateTime<Utc>,
    pub status: MatchStatus,
    pub team_a: Vec<String>,
    pub team_b: Vec<String>,
    #[serde(default)]
    pub score_a: i32,
    #[serde(default)]
    pub score_b: i32,
    #[serde(default)]
    pub shootout_score_a: Option<i32>,
    #[serde(default)]
    pub shootout_score_b: Option<i32>,
    #[serde(default)]
    pub events: Vec<MatchEvent>,
    /// Position each player actually played in this match, when recorded.
    #[serde(default)]
    pub positions: HashMap<String, Position>,
    /// Manually recorded goals conceded for a player (usually the keeper).
    #[serde(default)]
    pub conceded_overrides: HashMap<String, i32>,
}

impl Match {
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Side the player lined up on. Team A wins if an id was listed twice.
    pub fn side_of(&self, player_id: &str) -> Option<TeamSide> {
        if self.team_a.iter().any(|id| id == player_id) {
            Some(TeamSide::A)
        } else if self.team_b.iter().any(|id| id == player_id) {
            Some(TeamSide::B)
        } else {
            None
        }
    }

    pub fn roster(&self, side: TeamSide) -> &[String] {
        match side {
            TeamSide::A => &self.team_a,
            TeamSide::B => &self.team_b,
        }
    }

    /// Final score for a side; negative scores are read as zero.
    pub fn score(&self, side: TeamSide) -> i32 {
        match side {
            TeamSide::A => self.score_a.max(0),
            TeamSide::B => self.score_b.max(0),
        }
    }

    pub fn count_events(&self, player_id: &str, event_type: EventType) -> u32 {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type && e.player_id == player_id)
            .count() as u32
    }

    /// Goals the player is charged with in this match: the manual override
    /// if one was recorded, otherwise the opponent's final score.
    pub fn conceded_by(&self, player_id: &str, side: TeamSide) -> i32 {
        self.conceded_overrides
            .get(player_id)
            .copied()
            .unwrap_or_else(|| self.score(side.opponent()))
            .max(0)
    }

    /// Winning side on the scoreboard. A level score is only decided by the
    /// shootout when `count_shootout` is set.
    pub fn winner(&self, count_shootout: bool) -> Option<TeamSide> {
        use std::cmp::Ordering;

        match self.score(TeamSide::A).cmp(&self.score(TeamSide::B)) {
            Ordering::Greater => Some(TeamSide::A),
            Ordering::Less => Some(TeamSide::B),
            Ordering::Equal if count_shootout => {
                let shootout_a = self.shootout_score_a.unwrap_or(0);
                let shootout_b = self.shootout_score_b.unwrap_or(0);
                match shootout_a.cmp(&shootout_b) {
                    Ordering::Greater => Some(TeamSide::A),
                    Ordering::Less => Some(TeamSide::B),
                    Ordering::Equal => None,
                }
            }
            Ordering::Equal => None,
        }
    }
}

/// The six engine attributes, each in [0, 99].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub fin: i32,
    pub vis: i32,
    pub dec: i32,
    pub def: i32,
    pub vit: i32,
    pub exp: i32,
}

impl Attributes {
    pub const DEFAULT: Attributes = Attributes {
        fin: DEFAULT_ATTRIBUTE,
        vis: DEFAULT_ATTRIBUTE,
        dec: DEFAULT_ATTRIBUTE,
        def: DEFAULT_ATTRIBUTE,
        vit: DEFAULT_ATTRIBUTE,
        exp: DEFAULT_ATTRIBUTE,
    };

    pub fn values(&self) -> [i32; 6] {
        [self.fin, self.vis, self.dec, self.def, self.vit, self.exp]
    }

    /// Card projection: FIN→sho, VIS→pas, DEC→dri, VIT→pac, EXP→phy, DEF→def.
    pub fn to_fut_stats(&self) -> FutStats {
        FutStats {
            pac: self.vit,
            sho: self.fin,
            pas: self.vis,
            dri: self.dec,
            def: self.def,
            phy: self.exp,
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes::DEFAULT
    }
}

/// Display-only card stats. Never read back as a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutStats {
    pub pac: i32,
    pub sho: i32,
    pub pas: i32,
    pub dri: i32,
    pub def: i32,
    pub phy: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PlayerDocument")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Option<Position>,
    /// Current Overall, as last persisted by the engine.
    pub rating: Option<i32>,
    pub base_overall: Option<i32>,
    pub fin_rating: Option<i32>,
    pub vis_rating: Option<i32>,
    pub dec_rating: Option<i32>,
    pub def_rating: Option<i32>,
    pub vit_rating: Option<i32>,
    pub exp_rating: Option<i32>,
    pub fut_stats: Option<FutStats>,
}

/// Player document as exported by the app. The same document may carry both
/// `rating` and the engine-written `overall`, and either spelling of the base.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerDocument {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "lenient_position")]
    position: Option<Position>,
    #[serde(default)]
    rating: Option<i32>,
    #[serde(default)]
    overall: Option<i32>,
    #[serde(default)]
    base_overall: Option<i32>,
    #[serde(default, rename = "base_overall")]
    base_overall_snake: Option<i32>,
    #[serde(default)]
    fin_rating: Option<i32>,
    #[serde(default)]
    vis_rating: Option<i32>,
    #[serde(default)]
    dec_rating: Option<i32>,
    #[serde(default)]
    def_rating: Option<i32>,
    #[serde(default)]
    vit_rating: Option<i32>,
    #[serde(default)]
    exp_rating: Option<i32>,
    #[serde(default)]
    fut_stats: Option<FutStats>,
}

impl From<PlayerDocument> for Player {
    fn from(doc: PlayerDocument) -> Self {
        Player {
            id: doc.id,
            name: doc.name,
            position: doc.position,
            rating: doc.overall.or(doc.rating),
            base_overall: doc.base_overall.or(doc.base_overall_snake),
            fin_rating: doc.fin_rating,
            vis_rating: doc.vis_rating,
            dec_rating: doc.dec_rating,
            def_rating: doc.def_rating,
            vit_rating: doc.vit_rating,
            exp_rating: doc.exp_rating,
            fut_stats: doc.fut_stats,
        }
    }
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            rating: None,
            base_overall: None,
            fin_rating: None,
            vis_rating: None,
            dec_rating: None,
            def_rating: None,
            vit_rating: None,
            exp_rating: None,
            fut_stats: None,
        }
    }

    /// Rating used when this player is averaged into a team.
    pub fn current_rating(&self) -> i32 {
        self.rating.unwrap_or(DEFAULT_RATING)
    }

    /// Anchor the Overall is re-centred on: `baseOverall ?? rating ?? 75`.
    pub fn baseline(&self) -> i32 {
        self.base_overall.or(self.rating).unwrap_or(DEFAULT_RATING)
    }

    pub fn attributes(&self) -> Attributes {
        Attributes {
            fin: self.fin_rating.unwrap_or(DEFAULT_ATTRIBUTE),
            vis: self.vis_rating.unwrap_or(DEFAULT_ATTRIBUTE),
            dec: self.dec_rating.unwrap_or(DEFAULT_ATTRIBUTE),
            def: self.def_rating.unwrap_or(DEFAULT_ATTRIBUTE),
            vit: self.vit_rating.unwrap_or(DEFAULT_ATTRIBUTE),
            exp: self.exp_rating.unwrap_or(DEFAULT_ATTRIBUTE),
        }
    }

    /// Merge a partial update; absent fields keep their current value.
    pub fn apply(&mut self, update: &PlayerRatingUpdate) {
        self.rating = update.overall.or(self.rating);
        self.fin_rating = update.fin_rating.or(self.fin_rating);
        self.vis_rating = update.vis_rating.or(self.vis_rating);
        self.dec_rating = update.dec_rating.or(self.dec_rating);
        self.def_rating = update.def_rating.or(self.def_rating);
        self.vit_rating = update.vit_rating.or(self.vit_rating);
        self.exp_rating = update.exp_rating.or(self.exp_rating);
        self.fut_stats = update.fut_stats.or(self.fut_stats);
    }
}

/// Partial write contract for a player's rating fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRatingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fin_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vis_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub def_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vit_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fut_stats: Option<FutStats>,
}

/// One entry of a player's Overall timeline, appended on every persisted recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingHistoryPoint {
    pub player_id: String,
    pub date: DateTime<Utc>,
    pub overall: i32,
    pub has_match: bool,
}

/// Read contract of the storage collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCard {
    pub player: Player,
    pub fut_stats: FutStats,
    pub history: Vec<RatingHistoryPoint>,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn finished(score_a: i32, score_b: i32) -> Match {
        Match {
            id: "m1".to_string(),
            date: Utc::now(),
            status: MatchStatus::Finished,
            team_a: vec!["a1".to_string(), "a2".to_string()],
            team_b: vec!["b1".to_string()],
            score_a,
            score_b,
            shootout_score_a: None,
            shootout_score_b: None,
            events: vec![],
            positions: HashMap::new(),
            conceded_overrides: HashMap::new(),
        }
    }

    #[test]
    fn test_position_parses_codes_and_legacy_labels() {
        assert_eq!("GK".parse::<Position>().unwrap(), Position::Gk);
        assert_eq!("Goleiro".parse::<Position>().unwrap(), Position::Gk);
        assert_eq!("ZAGUEIRO".parse::<Position>().unwrap(), Position::Def);
        assert_eq!("Defensor".parse::<Position>().unwrap(), Position::Def);
        assert_eq!("meia".parse::<Position>().unwrap(), Position::Mid);
        assert_eq!("ATACANTE".parse::<Position>().unwrap(), Position::Fwd);
        assert!("LIBERO".parse::<Position>().is_err());
    }

    #[test]
    fn test_player_unknown_position_is_none() {
        let json = r#"{"id":"p1","name":"Zé","position":"LIBERO","overall":80}"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert_eq!(player.position, None);
        assert_eq!(player.rating, Some(80));
        assert_eq!(player.baseline(), 80);
    }

    #[test]
    fn test_player_with_rating_and_overall_prefers_overall() {
        let json = r#"{"id":"p1","name":"Ana","position":"ATACANTE","rating":80,"overall":83,
                       "baseOverall":78,"base_overall":70}"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert_eq!(player.rating, Some(83));
        assert_eq!(player.base_overall, Some(78));

        let snake: Player =
            serde_json::from_str(r#"{"id":"p2","name":"Beto","rating":71,"base_overall":69}"#).unwrap();
        assert_eq!(snake.rating, Some(71));
        assert_eq!(snake.baseline(), 69);
    }

    #[test]
    fn test_player_serializes_back_to_same_values() {
        let mut player = Player::new("p1", "Ana", Some(Position::Fwd));
        player.rating = Some(81);
        player.base_overall = Some(77);
        let json = serde_json::to_string(&player).unwrap();
        let back: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(back, player);
    }

    #[test]
    fn test_baseline_prefers_base_overall() {
        let mut player = Player::new("p1", "Zé", Some(Position::Mid));
        assert_eq!(player.baseline(), 75);
        player.rating = Some(82);
        assert_eq!(player.baseline(), 82);
        player.base_overall = Some(70);
        assert_eq!(player.baseline(), 70);
    }

    #[test]
    fn test_winner_ignores_shootout_unless_enabled() {
        let mut m = finished(2, 2);
        m.shootout_score_a = Some(4);
        m.shootout_score_b = Some(3);
        assert_eq!(m.winner(false), None);
        assert_eq!(m.winner(true), Some(TeamSide::A));
        assert_eq!(finished(1, 3).winner(false), Some(TeamSide::B));
    }

    #[test]
    fn test_conceded_uses_override_then_opponent_score() {
        let mut m = finished(1, 3);
        assert_eq!(m.conceded_by("a1", TeamSide::A), 3);
        assert_eq!(m.conceded_by("b1", TeamSide::B), 1);
        m.conceded_overrides.insert("a1".to_string(), 1);
        assert_eq!(m.conceded_by("a1", TeamSide::A), 1);
        m.score_a = -4;
        assert_eq!(m.conceded_by("b1", TeamSide::B), 0);
    }

    #[test]
    fn test_fut_stats_projection() {
        let attrs = Attributes { fin: 1, vis: 2, dec: 3, def: 4, vit: 5, exp: 6 };
        let fut = attrs.to_fut_stats();
        assert_eq!((fut.sho, fut.pas, fut.dri, fut.def, fut.pac, fut.phy), (1, 2, 3, 4, 5, 6));
    }

    #[test]
    fn test_apply_keeps_absent_fields() {
        let mut player = Player::new("p1", "Zé", Some(Position::Fwd));
        player.vis_rating = Some(40);
        player.apply(&PlayerRatingUpdate {
            overall: Some(77),
            fin_rating: Some(12),
            ..Default::default()
        });
        assert_eq!(player.rating, Some(77));
        assert_eq!(player.fin_rating, Some(12));
        assert_eq!(player.vis_rating, Some(40));
    }

    #[test]
    fn test_match_deserializes_store_document() {
        let json = r#"{
            "id": "m9", "date": "2025-03-01T20:00:00Z", "status": "FINISHED",
            "teamA": ["p1"], "teamB": ["p2"], "scoreA": 2, "scoreB": 1,
            "events": [{"id":"e1","type":"GOAL","playerId":"p1","teamId":"A","timestamp":0,"period":1}]
        }"#;
        let m: Match = serde_json::from_str(json).unwrap();
        assert!(m.is_finished());
        assert_eq!(m.count_events("p1", EventType::Goal), 1);
        assert!(m.positions.is_empty());
    }

    #[test]
    fn test_match_accepts_naive_and_date_only_dates() {
        let naive: Match = serde_json::from_str(
            r#"{"id":"m1","date":"2025-03-01T20:00:00","status":"SCHEDULED","teamA":[],"teamB":[]}"#,
        )
        .unwrap();
        assert_eq!(naive.date, Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap());

        let bare: Match = serde_json::from_str(
            r#"{"id":"m2","date":"2025-03-01","status":"FINISHED","teamA":["p1"],"teamB":[]}"#,
        )
        .unwrap();
        assert_eq!(bare.date, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }
}
