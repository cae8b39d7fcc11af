//! Population and infrastructure tallies.
//!
//! Scan-rebuilt counters are cleared at the top of every cycle and
//! re-accumulated by the tile handlers as the scan slices run; histories,
//! smoothing ramps, and cap flags persist across cycles.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::HISTORY_LEN;

/// Short-term and long-term history rings for one census series. Index 0 is
/// the newest sample; the valve feedback reads index 1 (the previous sample).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct HistoryPair {
    pub short: Vec<i32>,
    pub long: Vec<i32>,
}

impl Default for HistoryPair {
    fn default() -> Self {
        Self {
            short: vec![0; HISTORY_LEN],
            long: vec![0; HISTORY_LEN],
        }
    }
}

impl HistoryPair {
    fn push_short(&mut self, value: i32) {
        self.short.rotate_right(1);
        self.short[0] = value;
    }

    fn push_long(&mut self, value: i32) {
        self.long.rotate_right(1);
        self.long[0] = value;
    }
}

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct Census {
    // Scan-rebuilt population counters.
    pub res_pop: i32,
    pub com_pop: i32,
    pub ind_pop: i32,
    pub farm_pop: i32,
    pub res_zone_count: i32,
    pub com_zone_count: i32,
    pub ind_zone_count: i32,
    pub farm_zone_count: i32,

    // Scan-rebuilt infrastructure counters.
    pub road_total: i32,
    pub rail_total: i32,
    pub fire_count: i32,
    pub powered_zone_count: i32,
    pub unpowered_zone_count: i32,
    pub coal_plant_count: i32,
    pub nuclear_plant_count: i32,
    pub fire_station_count: i32,
    pub police_station_count: i32,
    pub stadium_count: i32,
    pub seaport_count: i32,
    pub airport_count: i32,
    pub pump_count: i32,

    // Written by the aggregation passes.
    pub land_value_average: i16,
    pub pollution_average: i16,
    pub crime_average: i16,
    pub traffic_average: i16,
    /// World coordinates of the dirtiest block; monster rolls target it.
    pub pollution_max: (usize, usize),
    /// World coordinates of the worst crime block; patrol signals target it.
    pub crime_max: (usize, usize),
    /// Mean zone position, recomputed by the population-density pass.
    pub city_centre: (usize, usize),

    // Smoothing ramps feeding the crime/pollution histories.
    pub crime_ramp: i16,
    pub pollution_ramp: i16,

    // Demand caps: set when growth needs a missing unique building.
    pub res_cap: bool,
    pub com_cap: bool,
    pub ind_cap: bool,

    pub res_hist: HistoryPair,
    pub com_hist: HistoryPair,
    pub ind_hist: HistoryPair,
    pub crime_hist: HistoryPair,
    pub pollution_hist: HistoryPair,
    pub money_hist: HistoryPair,
}

impl Census {
    /// Top-of-cycle reset. Only the counters the scan re-accumulates are
    /// touched; histories, ramps, averages, and caps carry over.
    pub fn clear_scan_counts(&mut self) {
        self.res_pop = 0;
        self.com_pop = 0;
        self.ind_pop = 0;
        self.farm_pop = 0;
        self.res_zone_count = 0;
        self.com_zone_count = 0;
        self.ind_zone_count = 0;
        self.farm_zone_count = 0;
        self.road_total = 0;
        self.rail_total = 0;
        self.fire_count = 0;
        self.powered_zone_count = 0;
        self.unpowered_zone_count = 0;
        self.coal_plant_count = 0;
        self.nuclear_plant_count = 0;
        self.fire_station_count = 0;
        self.police_station_count = 0;
        self.stadium_count = 0;
        self.seaport_count = 0;
        self.airport_count = 0;
        self.pump_count = 0;
    }

    /// Residential population normalized to the same scale as the
    /// commercial/industrial counts.
    #[inline]
    pub fn normalized_res_pop(&self) -> i32 {
        self.res_pop / 8
    }

    /// Farm jobs count as industrial employment.
    #[inline]
    pub fn employment_pop(&self) -> i32 {
        self.ind_pop + self.farm_pop
    }

    /// Short-term census snapshot, every `SHORT_CENSUS_INTERVAL` time units.
    pub fn take_short_census(&mut self, cash_flow: i64) {
        self.res_hist.push_short(self.normalized_res_pop());
        self.com_hist.push_short(self.com_pop);
        self.ind_hist.push_short(self.employment_pop());

        self.crime_ramp += (self.crime_average - self.crime_ramp) / 4;
        self.crime_hist.push_short(self.crime_ramp as i32);
        self.pollution_ramp += (self.pollution_average - self.pollution_ramp) / 4;
        self.pollution_hist.push_short(self.pollution_ramp as i32);

        let money = ((cash_flow / 20) + 128).clamp(0, 255) as i32;
        self.money_hist.push_short(money);
    }

    /// Long-term census snapshot, once per year.
    pub fn take_long_census(&mut self) {
        self.res_hist.push_long(self.normalized_res_pop());
        self.com_hist.push_long(self.com_pop);
        self.ind_hist.push_long(self.employment_pop());
        self.crime_hist.push_long(self.crime_ramp as i32);
        self.pollution_hist.push_long(self.pollution_ramp as i32);
        let newest = self.money_hist.short[0];
        self.money_hist.push_long(newest);
    }

    /// Total zone count across the four families.
    pub fn total_zone_count(&self) -> i32 {
        self.res_zone_count + self.com_zone_count + self.ind_zone_count + self.farm_zone_count
    }

    /// Displayed city population. Each commercial/industrial population
    /// point stands for eight workers, and the whole figure is scaled the
    /// way the classic city counters read.
    pub fn scaled_population(&self) -> i64 {
        (self.res_pop as i64 + (self.com_pop as i64 + self.employment_pop() as i64) * 8) * 20
    }
}
