//! Adapter for the older match documents: rosters keyed by player name under
//! `team_white` / `team_red`, per-player goal and assist counts instead of an
//! event log, and Portuguese position labels.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use std::collections::HashMap;

use crate::error::{PeladaError, Result};
use crate::models::{EventType, Match, MatchEvent, MatchStatus, Player, Position, Snapshot, TeamSide};

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyLineupEntry {
    pub name: String,
    #[serde(default)]
    pub goals: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub conceded: Option<i32>,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMatch {
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub score_red: i32,
    #[serde(default)]
    pub score_white: i32,
    #[serde(default)]
    pub team_red: Vec<LegacyLineupEntry>,
    #[serde(default)]
    pub team_white: Vec<LegacyLineupEntry>,
}

/// Upper bound on goals or assists a single lineup entry may claim.
pub const MAX_EVENTS_PER_ENTRY: u32 = 99;

/// Either document shape, as found in exported snapshots. The shape is chosen
/// by its roster keys, so a malformed current document is an error rather
/// than a legacy match with empty rosters.
#[derive(Debug, Clone)]
pub enum MatchRecord {
    Current(Match),
    Legacy(LegacyMatch),
}

impl<'de> Deserialize<'de> for MatchRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let is_legacy = ["team_white", "team_red"].iter().any(|key| value.get(*key).is_some());
        if is_legacy {
            serde_json::from_value(value).map(MatchRecord::Legacy).map_err(de::Error::custom)
        } else {
            serde_json::from_value(value).map(MatchRecord::Current).map_err(de::Error::custom)
        }
    }
}

/// Resolves legacy roster names to player ids.
pub struct NameIndex {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl NameIndex {
    pub fn new(players: &[Player]) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for player in players {
            exact.insert(player.name.clone(), player.id.clone());
            folded
                .entry(player.name.trim().to_lowercase())
                .or_insert_with(|| player.id.clone());
        }
        Self { exact, folded }
    }

    /// Exact name first, then case-insensitive. Unknown names get a stable
    /// synthetic id so they still count as a (default-rated) team member.
    pub fn resolve(&self, name: &str) -> String {
        if let Some(id) = self.exact.get(name) {
            return id.clone();
        }
        if let Some(id) = self.folded.get(&name.trim().to_lowercase()) {
            return id.clone();
        }
        tracing::warn!("Legacy roster name '{}' not found in players, using synthetic id", name);
        format!("legacy:{}", name)
    }
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM[:SS]` timestamps
/// (read as UTC) or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_match_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| {
        PeladaError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

impl LegacyMatch {
    /// Converts into the canonical shape. White maps to side A, red to side B.
    /// Legacy documents only exist for played games, so the result is FINISHED.
    pub fn into_match(self, names: &NameIndex) -> Result<Match> {
        let date = parse_match_date(&self.date)?;
        let mut converted = Match {
            id: self.id,
            date,
            status: MatchStatus::Finished,
            team_a: Vec::with_capacity(self.team_white.len()),
            team_b: Vec::with_capacity(self.team_red.len()),
            score_a: self.score_white,
            score_b: self.score_red,
            shootout_score_a: None,
            shootout_score_b: None,
            events: Vec::new(),
            positions: HashMap::new(),
            conceded_overrides: HashMap::new(),
        };

        for (side, lineup) in [(TeamSide::A, self.team_white), (TeamSide::B, self.team_red)] {
            for entry in lineup {
                check_count(&converted.id, &entry.name, "goal", entry.goals)?;
                check_count(&converted.id, &entry.name, "assist", entry.assists)?;
                let player_id = names.resolve(&entry.name);
                converted.push_legacy_entry(side, player_id, entry);
            }
        }

        if let Some(winner) = self.winner.as_deref() {
            let expected = converted.winner(false);
            let declared = match winner {
                "WHITE" => Some(TeamSide::A),
                "RED" => Some(TeamSide::B),
                _ => None,
            };
            if declared != expected {
                tracing::warn!(
                    "Legacy match {} declares winner {} but the score is {}-{}",
                    converted.id,
                    winner,
                    converted.score_a,
                    converted.score_b
                );
            }
        }

        Ok(converted)
    }
}

fn check_count(match_id: &str, name: &str, stat: &'static str, count: u32) -> Result<()> {
    if count > MAX_EVENTS_PER_ENTRY {
        return Err(PeladaError::ImplausibleCount {
            match_id: match_id.to_string(),
            name: name.to_string(),
            stat,
            count,
        });
    }
    Ok(())
}

impl Match {
    fn push_legacy_entry(&mut self, side: TeamSide, player_id: String, entry: LegacyLineupEntry) {
        let events = std::iter::repeat(EventType::Goal)
            .take(entry.goals as usize)
            .chain(std::iter::repeat(EventType::Assist).take(entry.assists as usize));
        for event_type in events {
            self.events.push(MatchEvent {
                id: format!("{}-{}", self.id, self.events.len()),
                event_type,
                player_id: player_id.clone(),
                team_id: side,
                timestamp: 0,
                period: 1,
            });
        }

        if let Some(conceded) = entry.conceded {
            self.conceded_overrides.insert(player_id.clone(), conceded);
        }
        if let Some(position) = entry.position.as_deref().and_then(|p| p.parse::<Position>().ok()) {
            self.positions.insert(player_id.clone(), position);
        }

        match side {
            TeamSide::A => self.team_a.push(player_id),
            TeamSide::B => self.team_b.push(player_id),
        }
    }
}

/// Normalises a mixed list of match documents against the given roster.
pub fn normalize_matches(records: Vec<MatchRecord>, players: &[Player]) -> Result<Vec<Match>> {
    let names = NameIndex::new(players);
    records
        .into_iter()
        .map(|record| match record {
            MatchRecord::Current(m) => Ok(m),
            MatchRecord::Legacy(legacy) => legacy.into_match(&names),
        })
        .collect()
}

/// Exported `{players, matches}` document, matches in either shape.
#[derive(Debug, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
}

pub fn parse_snapshot(json: &str) -> Result<Snapshot> {
    let file: SnapshotFile = serde_json::from_str(json)?;
    let matches = normalize_matches(file.matches, &file.players)?;
    Ok(Snapshot {
        players: file.players,
        matches,
    })
}
