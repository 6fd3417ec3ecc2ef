use crate::models::{Attributes, Position};
use crate::utils::round_clamp;

/// Position-weighted average of the six attributes, roughly 0-99.
pub fn performance(attrs: &Attributes, position: Option<Position>) -> f64 {
    let Attributes { fin, vis, dec, def, vit, exp } = *attrs;
    let (fin, vis, dec, def, vit, exp) = (
        fin as f64, vis as f64, dec as f64, def as f64, vit as f64, exp as f64,
    );

    match position {
        Some(Position::Fwd) => (fin * 6.5 + dec * 2.0 + vis * 1.5 + vit * 1.0 + exp * 0.5) / 11.5,
        Some(Position::Gk) => (def * 8.0 + exp * 2.0 + vit * 1.0) / 11.0,
        Some(Position::Mid) => {
            (vis * 3.5 + dec * 2.5 + vit * 2.0 + fin * 1.5 + exp * 1.0 + def * 1.0) / 11.5
        }
        Some(Position::Def) => {
            (def * 6.0 + vit * 2.0 + dec * 1.5 + vis * 1.0 + fin * 1.0 + exp * 0.5) / 11.5
        }
        None => (fin + vis + dec + def + vit + exp) / 6.0,
    }
}

/// Re-centres the weighted performance on the player's baseline: an average
/// performance of 50 leaves the baseline unchanged. Result is in [1, 99].
pub fn synthesize(attrs: &Attributes, position: Option<Position>, baseline: i32) -> i32 {
    let avg_performance = performance(attrs, position);
    round_clamp(baseline as f64 + avg_performance / 2.0 - 25.0, 1, 99)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT: Attributes = Attributes { fin: 50, vis: 50, dec: 50, def: 50, vit: 50, exp: 50 };

    #[test]
    fn test_average_performance_keeps_baseline() {
        for position in [Some(Position::Gk), Some(Position::Mid), Some(Position::Fwd), None] {
            assert_eq!(synthesize(&FLAT, position, 75), 75);
        }
    }

    #[test]
    fn test_defender_weights_exceed_divisor() {
        // DEF weights sum to 12 over a divisor of 11.5: 600 / 11.5 = 52.17
        assert!((performance(&FLAT, Some(Position::Def)) - 600.0 / 11.5).abs() < 1e-9);
        assert_eq!(synthesize(&FLAT, Some(Position::Def), 75), 76);
    }

    #[test]
    fn test_forward_formula() {
        let attrs = Attributes { fin: 8, vis: 4, dec: 7, def: 20, vit: 99, exp: 99 };
        // (52 + 14 + 6 + 99 + 49.5) / 11.5 = 19.17...
        assert!((performance(&attrs, Some(Position::Fwd)) - 220.5 / 11.5).abs() < 1e-9);
        assert_eq!(synthesize(&attrs, Some(Position::Fwd), 75), 60);
    }

    #[test]
    fn test_keeper_ignores_attacking_attributes() {
        let attrs = Attributes { fin: 0, vis: 0, dec: 0, def: 88, vit: 60, exp: 40 };
        let boosted = Attributes { fin: 99, vis: 99, dec: 99, ..attrs };
        assert_eq!(
            synthesize(&attrs, Some(Position::Gk), 70),
            synthesize(&boosted, Some(Position::Gk), 70)
        );
        // (704 + 80 + 60) / 11 = 76.73 -> 70 + 38.36 - 25 = 83.36
        assert_eq!(synthesize(&attrs, Some(Position::Gk), 70), 83);
    }

    #[test]
    fn test_position_weights_differ() {
        let attrs = Attributes { fin: 90, vis: 30, dec: 60, def: 10, vit: 50, exp: 50 };
        let fwd = synthesize(&attrs, Some(Position::Fwd), 75);
        let def = synthesize(&attrs, Some(Position::Def), 75);
        assert!(fwd > def);
    }

    #[test]
    fn test_overall_is_clamped() {
        let max = Attributes { fin: 99, vis: 99, dec: 99, def: 99, vit: 99, exp: 99 };
        let min = Attributes { fin: 0, vis: 0, dec: 0, def: 0, vit: 0, exp: 0 };
        assert_eq!(synthesize(&max, Some(Position::Mid), 99), 99);
        assert_eq!(synthesize(&min, Some(Position::Mid), 10), 1);
        assert_eq!(synthesize(&min, None, 75), 50);
    }
}
