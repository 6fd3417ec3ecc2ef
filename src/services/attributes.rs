use crate::models::{Attributes, Position, DEFAULT_RATING};
use crate::services::aggregator::MatchAggregate;
use crate::utils::round_clamp;

/// Players with fewer qualifying matches than this have their rates diluted.
pub const CONFIDENCE_FLOOR: u32 = 5;

const MIN_DEF_MULTIPLIER: f64 = 2.0;
const MAX_DEF_MULTIPLIER: f64 = 10.0;

/// Calculator output plus the intermediate values worth inspecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeBreakdown {
    pub attributes: Attributes,
    /// Unclamped win percentage; VIT is this value capped at 99.
    pub win_rate: i32,
    pub confidence_divisor: f64,
    pub def_multiplier: f64,
    pub base_def: i32,
}

fn rate_score(weighted: f64, confidence_divisor: f64, per_match_target: f64) -> i32 {
    round_clamp((weighted / confidence_divisor / per_match_target) * 99.0, 0, 99)
}

/// Stricter baseline and steeper penalty for keepers; GK and DEF are then
/// softened or hardened by the strength of the defenders around them.
fn def_multiplier(position: Option<Position>, teammates_avg: Option<f64>) -> f64 {
    let base = if position == Some(Position::Gk) { 6.0 } else { 4.0 };
    match position {
        Some(Position::Gk | Position::Def) => {
            let team_def_factor = teammates_avg.unwrap_or(DEFAULT_RATING as f64) / DEFAULT_RATING as f64;
            (base * (2.0 - team_def_factor)).clamp(MIN_DEF_MULTIPLIER, MAX_DEF_MULTIPLIER)
        }
        _ => base,
    }
}

fn def_scale(position: Option<Position>) -> f64 {
    match position {
        Some(Position::Mid) => 0.4,
        Some(Position::Fwd) => 0.2,
        _ => 1.0,
    }
}

pub fn calculate(
    agg: &MatchAggregate,
    position: Option<Position>,
    total_finished_matches: usize,
) -> AttributeBreakdown {
    let matches = agg.matches_count.max(1) as f64;
    let confidence_divisor = agg.matches_count.max(CONFIDENCE_FLOOR) as f64;

    let fin = rate_score(agg.weighted_goals, confidence_divisor, 5.0);
    let vis = rate_score(agg.weighted_assists, confidence_divisor, 5.0);
    let dec = rate_score(agg.weighted_goals + agg.weighted_assists, confidence_divisor, 8.0);

    let avg_conceded = agg.weighted_conceded / matches;
    let def_baseline = if position == Some(Position::Gk) { 1.0 } else { 2.0 };
    let multiplier = def_multiplier(position, agg.defensive.average());
    let base_def = round_clamp(99.0 - (avg_conceded - def_baseline) * multiplier, 0, 99);
    let def = round_clamp(base_def as f64 * def_scale(position), 0, 99);

    let win_rate = if agg.matches_count > 0 {
        ((agg.subset_wins as f64 / agg.matches_count as f64) * 100.0).round() as i32
    } else {
        0
    };
    let vit = win_rate.clamp(0, 99);

    let exp = round_clamp(
        (agg.matches_count as f64 / total_finished_matches.max(1) as f64) * 99.0,
        0,
        99,
    );

    AttributeBreakdown {
        attributes: Attributes { fin, vis, dec, def, vit, exp },
        win_rate,
        confidence_divisor,
        def_multiplier: multiplier,
        base_def,
    }
}
