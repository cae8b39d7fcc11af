//! Residential zones.

use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::context::SimContext;
use crate::grid::{Cell, TileGrid};
use crate::tiles::{is_commercial, is_industrial, RES_BASE, RES_MAX_TIER};
use crate::valves::Valves;
use crate::zones::{land_location_score, process_zone, ZoneFamily};

/// Homes. Residential population is recorded at eight people per tier so
/// the employment ratio can compare it against job counts.
pub struct Residential;

impl ZoneFamily for Residential {
    const BASE: u16 = RES_BASE;
    const MAX_TIER: u8 = RES_MAX_TIER;
    const TRAFFIC_THRESHOLD: u16 = 35;

    fn population(tier: u8) -> u16 {
        tier as u16 * 8
    }

    fn record_census(census: &mut Census, pop: u16) {
        census.res_zone_count += 1;
        census.res_pop += pop as i32;
    }

    fn valve(valves: &Valves) -> i16 {
        valves.res_valve
    }

    /// Commuters look for anywhere that employs people.
    fn is_destination(value: u16) -> bool {
        is_commercial(value) || is_industrial(value)
    }

    fn location_score(maps: &BlockMaps, x: usize, y: usize) -> i32 {
        land_location_score(maps, x, y)
    }

    fn utility_ok(cell: &Cell) -> bool {
        cell.is_powered()
    }
}

/// Scan handler for residential zone centers.
pub fn process_residential(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    process_zone::<Residential>(grid, x, y, ctx);
}
