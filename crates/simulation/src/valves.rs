//! Global demand valves.
//!
//! The three valves summarize how much the outside world wants each zone
//! family to grow. They are recomputed every other cycle from the census and
//! tax level, and are read-only everywhere else; the zone automaton adds the
//! valve straight into its growth score.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::census::Census;
use crate::config::GameLevel;

pub const RES_VALVE_RANGE: i16 = 2000;
pub const COM_VALVE_RANGE: i16 = 1500;
pub const IND_VALVE_RANGE: i16 = 1500;

/// Demand adjustment per tax point. Indexed by `min(tax + level, 20)`.
const TAX_TABLE: [i16; 21] = [
    200, 150, 120, 100, 80, 50, 30, 0, -10, -40, -100, -150, -200, -250, -300, -350, -400, -450,
    -500, -550, -600,
];

const BIRTH_RATE: f32 = 0.02;

#[derive(Resource, Debug, Clone, Copy, Default, Serialize, Deserialize, Encode, Decode)]
pub struct Valves {
    pub res_valve: i16,
    pub com_valve: i16,
    pub ind_valve: i16,
}

/// Recomputes the valves from current and previous census samples.
///
/// Projections: residential follows migration (employment ratio) plus
/// births; commercial follows the internal market scaled by the labour base;
/// industrial follows the external market for the difficulty level. Each
/// projection becomes a ratio against the current population, capped at 2.0,
/// then `(ratio - 1) * 600` plus the tax-table entry is added to the valve.
pub fn set_valves(valves: &mut Valves, census: &Census, city_tax: u8, level: GameLevel) {
    let normalized_res_pop = census.normalized_res_pop() as f32;

    let prev_com = census.com_hist.short[1] as f32;
    let prev_ind = census.ind_hist.short[1] as f32;
    let prev_res = census.res_hist.short[1] as f32;

    let employment = if normalized_res_pop > 0.0 {
        (prev_com + prev_ind) / normalized_res_pop
    } else {
        1.0
    };
    let migration = normalized_res_pop * (employment - 1.0);
    let births = normalized_res_pop * BIRTH_RATE;
    let projected_res = normalized_res_pop + migration + births;

    let employment_base = prev_com + prev_ind;
    let labor_base = if employment_base > 0.0 {
        (prev_res / employment_base).clamp(0.0, 1.3)
    } else {
        1.0
    };

    let internal_market =
        (normalized_res_pop + census.com_pop as f32 + census.employment_pop() as f32) / 3.7;
    let projected_com = internal_market * labor_base;

    let projected_ind =
        (census.employment_pop() as f32 * labor_base * level.external_market_factor()).max(5.0);

    let res_ratio = if normalized_res_pop > 0.0 {
        projected_res / normalized_res_pop
    } else {
        1.3
    };
    let com_ratio = if census.com_pop > 0 {
        projected_com / census.com_pop as f32
    } else {
        projected_com
    };
    let ind_ratio = if census.employment_pop() > 0 {
        projected_ind / census.employment_pop() as f32
    } else {
        projected_ind
    };

    let tax_index = (city_tax as usize + level.index()).min(TAX_TABLE.len() - 1);
    let tax_term = TAX_TABLE[tax_index] as f32;

    let res_delta = (res_ratio.min(2.0) - 1.0) * 600.0 + tax_term;
    let com_delta = (com_ratio.min(2.0) - 1.0) * 600.0 + tax_term;
    let ind_delta = (ind_ratio.min(2.0) - 1.0) * 600.0 + tax_term;

    valves.res_valve = clamp_valve(valves.res_valve, res_delta, RES_VALVE_RANGE);
    valves.com_valve = clamp_valve(valves.com_valve, com_delta, COM_VALVE_RANGE);
    valves.ind_valve = clamp_valve(valves.ind_valve, ind_delta, IND_VALVE_RANGE);

    // A missing stadium/airport/seaport freezes positive demand until built.
    if census.res_cap && valves.res_valve > 0 {
        valves.res_valve = 0;
    }
    if census.com_cap && valves.com_valve > 0 {
        valves.com_valve = 0;
    }
    if census.ind_cap && valves.ind_valve > 0 {
        valves.ind_valve = 0;
    }
}

fn clamp_valve(valve: i16, delta: f32, range: i16) -> i16 {
    (valve as f32 + delta).clamp(-(range as f32), range as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_city_demands_settlement() {
        let mut valves = Valves::default();
        let census = Census::default();
        set_valves(&mut valves, &census, 7, GameLevel::Easy);
        // No residents yet: growth pressure for homes and industry, none for
        // shops (no internal market).
        assert!(valves.res_valve > 0);
        assert!(valves.ind_valve > 0);
        assert!(valves.com_valve < 0);
    }

    #[test]
    fn test_valves_clamp_at_range() {
        let mut valves = Valves::default();
        let census = Census::default();
        for _ in 0..30 {
            set_valves(&mut valves, &census, 0, GameLevel::Easy);
        }
        assert_eq!(valves.ind_valve, IND_VALVE_RANGE);
        assert!(valves.res_valve <= RES_VALVE_RANGE);
    }

    #[test]
    fn test_high_tax_suppresses_demand() {
        let mut low_tax = Valves::default();
        let mut high_tax = Valves::default();
        let census = Census::default();
        set_valves(&mut low_tax, &census, 0, GameLevel::Easy);
        set_valves(&mut high_tax, &census, 20, GameLevel::Easy);
        assert!(high_tax.res_valve < low_tax.res_valve);
        assert!(high_tax.ind_valve < low_tax.ind_valve);
    }

    #[test]
    fn test_caps_zero_positive_valves() {
        let mut valves = Valves::default();
        let mut census = Census::default();
        census.res_cap = true;
        census.ind_cap = true;
        set_valves(&mut valves, &census, 7, GameLevel::Easy);
        assert_eq!(valves.res_valve, 0);
        assert_eq!(valves.ind_valve, 0);
        // Negative commercial demand is not masked by a cap.
        assert!(valves.com_valve < 0);
    }

    #[test]
    fn test_tax_index_saturates() {
        let mut valves = Valves::default();
        let census = Census::default();
        // Tax 20 on Hard indexes past the table end and must saturate.
        set_valves(&mut valves, &census, 20, GameLevel::Hard);
        assert!(valves.res_valve <= 0);
    }
}
