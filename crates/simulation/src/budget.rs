//! City budget: yearly tax collection and the maintenance effect levels the
//! road and coverage handlers consume.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::census::Census;
use crate::config::GameLevel;

pub const MAX_ROAD_EFFECT: i16 = 32;
pub const MAX_FIRE_EFFECT: i16 = 1000;
pub const MAX_POLICE_EFFECT: i16 = 1000;

/// Road upkeep cost per tile, by difficulty. Rail counts double.
const ROAD_COST_FACTOR: [f32; 3] = [0.7, 0.9, 1.2];
const FIRE_STATION_MAINTENANCE: i64 = 100;
const POLICE_STATION_MAINTENANCE: i64 = 100;

const STARTING_FUNDS: i64 = 20_000;
const DEFAULT_TAX: u8 = 7;

#[derive(Resource, Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct CityBudget {
    pub total_funds: i64,
    /// City tax rate, 0..=20.
    pub city_tax: u8,
    /// Fraction of requested road upkeep actually funded, 0.0..=1.0.
    pub road_percent: f32,
    pub fire_percent: f32,
    pub police_percent: f32,
    /// Most recent yearly tax intake.
    pub tax_fund: i64,
    /// Mean tax rate over the last year, accumulated by the scheduler.
    pub tax_average: f32,
    /// Net yearly cash flow: taxes minus maintenance actually paid.
    pub cash_flow: i64,
    /// How well maintained roads are; below max they start crumbling.
    pub road_effect: i16,
    /// Fire/police effectiveness bought this year; scales station coverage.
    pub fire_effect: i16,
    pub police_effect: i16,
}

impl Default for CityBudget {
    fn default() -> Self {
        Self {
            total_funds: STARTING_FUNDS,
            city_tax: DEFAULT_TAX,
            road_percent: 1.0,
            fire_percent: 1.0,
            police_percent: 1.0,
            tax_fund: 0,
            tax_average: DEFAULT_TAX as f32,
            cash_flow: 0,
            road_effect: MAX_ROAD_EFFECT,
            fire_effect: MAX_FIRE_EFFECT,
            police_effect: MAX_POLICE_EFFECT,
        }
    }
}

impl CityBudget {
    /// Underfunded roads decay; the road handler rolls against the effect.
    #[inline]
    pub fn should_degrade_road(&self) -> bool {
        self.road_effect < MAX_ROAD_EFFECT
    }
}

/// Yearly collection. Taxes scale with population, average land value, the
/// tax rate, and the difficulty factor; maintenance is paid out of taxes
/// plus the treasury, scaled down proportionally when both run short, and
/// whatever fraction was paid sets the effect levels for the coming year.
pub fn collect_tax(budget: &mut CityBudget, census: &Census, level: GameLevel) {
    let road_request = ((census.road_total + census.rail_total * 2) as f32
        * ROAD_COST_FACTOR[level.index()]) as i64;
    let fire_request = census.fire_station_count as i64 * FIRE_STATION_MAINTENANCE;
    let police_request = census.police_station_count as i64 * POLICE_STATION_MAINTENANCE;

    let population = census.scaled_population();
    let base = population * census.land_value_average.max(0) as i64 / 120;
    budget.tax_fund = (base as f32 * budget.city_tax as f32 * level.tax_factor()) as i64;

    if population == 0 {
        // Nobody to tax and nothing to maintain: effects recover to full.
        budget.road_effect = MAX_ROAD_EFFECT;
        budget.fire_effect = MAX_FIRE_EFFECT;
        budget.police_effect = MAX_POLICE_EFFECT;
        budget.cash_flow = 0;
        return;
    }

    let road_spend = (road_request as f32 * budget.road_percent) as i64;
    let fire_spend = (fire_request as f32 * budget.fire_percent) as i64;
    let police_spend = (police_request as f32 * budget.police_percent) as i64;

    let want = road_spend + fire_spend + police_spend;
    let available = budget.total_funds + budget.tax_fund;
    let scale = if want > 0 && available < want {
        available.max(0) as f32 / want as f32
    } else {
        1.0
    };

    let road_paid = (road_spend as f32 * scale) as i64;
    let fire_paid = (fire_spend as f32 * scale) as i64;
    let police_paid = (police_spend as f32 * scale) as i64;

    budget.cash_flow = budget.tax_fund - road_paid - fire_paid - police_paid;
    budget.total_funds += budget.cash_flow;

    budget.road_effect = effect_of(road_paid, road_request, MAX_ROAD_EFFECT);
    budget.fire_effect = effect_of(fire_paid, fire_request, MAX_FIRE_EFFECT);
    budget.police_effect = effect_of(police_paid, police_request, MAX_POLICE_EFFECT);
}

fn effect_of(paid: i64, requested: i64, max: i16) -> i16 {
    if requested == 0 {
        max
    } else {
        (max as i64 * paid / requested) as i16
    }
}
