//! Compile-time simulation constants: grid dimensions, scheduler cadences,
//! and the difficulty-level tables the economy reads.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub const GRID_WIDTH: usize = 120;
pub const GRID_HEIGHT: usize = 100;

/// The full-map scan is amortized over this many scheduler phases.
pub const SCAN_PHASES: usize = 8;

/// The scheduler loops through this many phases per simulation cycle.
pub const PHASE_COUNT: u8 = 16;

/// `sim_cycle` wraps to zero at this value.
pub const CYCLE_WRAP: u16 = 1024;

/// City time units per year. Tax collection and the long-term census run on
/// this boundary.
pub const TIME_UNITS_PER_YEAR: u64 = 48;

/// City time units between short-term census snapshots.
pub const SHORT_CENSUS_INTERVAL: u64 = 4;

/// Length of the census history rings.
pub const HISTORY_LEN: usize = 120;

// Per-pass cadence tables, indexed by `SimSpeed::index()`. A pass runs only
// on cycles where `sim_cycle % table[speed] == 0`, so higher speeds spread
// the expensive passes across more cycles.
pub const SPEED_POWER_SCAN: [u16; 3] = [2, 4, 5];
pub const SPEED_POLLUTION_SCAN: [u16; 3] = [2, 7, 17];
pub const SPEED_CRIME_SCAN: [u16; 3] = [1, 8, 18];
pub const SPEED_POPULATION_SCAN: [u16; 3] = [1, 9, 19];
pub const SPEED_COVERAGE_SCAN: [u16; 3] = [1, 10, 20];

/// Difficulty setting. Affects external-market demand, tax yield, and
/// disaster frequency.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub enum GameLevel {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl GameLevel {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            GameLevel::Easy => 0,
            GameLevel::Medium => 1,
            GameLevel::Hard => 2,
        }
    }

    /// External-market multiplier applied to projected industrial demand.
    pub fn external_market_factor(self) -> f32 {
        [1.2, 1.1, 0.98][self.index()]
    }

    /// Tax yield multiplier. Easier levels collect more per capita.
    pub fn tax_factor(self) -> f32 {
        [1.4, 1.2, 0.8][self.index()]
    }

    /// One random disaster roll succeeds with probability `1 / chance`.
    pub fn disaster_chance(self) -> u16 {
        [480, 240, 60][self.index()]
    }
}
