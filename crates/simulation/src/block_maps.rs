//! The full set of named aggregation grids and their periodic decay.

use bevy::prelude::*;

use crate::block_map::BlockMap;

/// Rate-of-growth values are clamped to this magnitude.
pub const RATE_OF_GROWTH_LIMIT: i16 = 200;

/// Traffic density saturates here; the router stops accumulating at the cap.
pub const TRAFFIC_MAX: i16 = 240;

/// Every aggregation grid the simulation maintains. Resolutions follow how
/// coarse each signal is: coverage flags are per-tile, neighborhood signals
/// are 2x2, station influence and growth tracking are 8x8.
#[derive(Resource)]
pub struct BlockMaps {
    pub pollution_density: BlockMap,
    pub land_value: BlockMap,
    pub crime_rate: BlockMap,
    pub population_density: BlockMap,
    pub traffic_density: BlockMap,
    pub terrain_density: BlockMap,
    pub rate_of_growth: BlockMap,
    pub com_rate: BlockMap,
    pub fire_station: BlockMap,
    pub fire_station_effect: BlockMap,
    pub police_station: BlockMap,
    pub police_station_effect: BlockMap,
    pub power_grid: BlockMap,
    pub water_grid: BlockMap,
}

impl Default for BlockMaps {
    fn default() -> Self {
        Self {
            pollution_density: BlockMap::new(2),
            land_value: BlockMap::new(2),
            crime_rate: BlockMap::new(2),
            population_density: BlockMap::new(2),
            traffic_density: BlockMap::new(2),
            terrain_density: BlockMap::new(4),
            rate_of_growth: BlockMap::new(8),
            com_rate: BlockMap::new(8),
            fire_station: BlockMap::new(8),
            fire_station_effect: BlockMap::new(8),
            police_station: BlockMap::new(8),
            police_station_effect: BlockMap::new(8),
            power_grid: BlockMap::new(1),
            water_grid: BlockMap::new(1),
        }
    }
}

/// Nudges the growth-rate record at a zone's coordinates, clamped to
/// `±RATE_OF_GROWTH_LIMIT`. Zone transitions call this with ±8.
pub fn adjust_rate_of_growth(maps: &mut BlockMaps, x: usize, y: usize, delta: i16) {
    let value = (maps.rate_of_growth.world_get(x, y) + delta)
        .clamp(-RATE_OF_GROWTH_LIMIT, RATE_OF_GROWTH_LIMIT);
    maps.rate_of_growth.world_set(x, y, value);
}

/// Traffic fades every cycle: light congestion clears outright, heavy
/// congestion sheds a larger fixed amount.
pub fn decay_traffic(traffic: &mut BlockMap) {
    for by in 0..traffic.height {
        for bx in 0..traffic.width {
            let value = traffic.get(bx, by);
            if value == 0 {
                continue;
            }
            let next = if value <= 24 {
                0
            } else if value > 200 {
                value - 34
            } else {
                value - 24
            };
            traffic.set(bx, by, next);
        }
    }
}

/// Growth-rate records creep back toward zero one point per decay tick.
pub fn decay_rate_of_growth(rate_of_growth: &mut BlockMap) {
    for by in 0..rate_of_growth.height {
        for bx in 0..rate_of_growth.width {
            let value = rate_of_growth.get(bx, by);
            if value == 0 {
                continue;
            }
            let next = if value > 0 { value - 1 } else { value + 1 };
            rate_of_growth.set(
                bx,
                by,
                next.clamp(-RATE_OF_GROWTH_LIMIT, RATE_OF_GROWTH_LIMIT),
            );
        }
    }
}
