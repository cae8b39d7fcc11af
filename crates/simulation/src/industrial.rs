//! Industrial zones.

use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::context::SimContext;
use crate::grid::{Cell, TileGrid};
use crate::tiles::{is_residential, IND_BASE, IND_MAX_TIER};
use crate::valves::Valves;
use crate::zones::{land_location_score, process_zone, ZoneFamily};

/// Factories. Industry tolerates its own pollution poorly in scoring terms
/// but is the main pollution source, which is what pushes it to the edges
/// of a grown city.
pub struct Industrial;

impl ZoneFamily for Industrial {
    const BASE: u16 = IND_BASE;
    const MAX_TIER: u8 = IND_MAX_TIER;
    const TRAFFIC_THRESHOLD: u16 = 10;

    fn population(tier: u8) -> u16 {
        tier as u16
    }

    fn record_census(census: &mut Census, pop: u16) {
        census.ind_zone_count += 1;
        census.ind_pop += pop as i32;
    }

    fn valve(valves: &Valves) -> i16 {
        valves.ind_valve
    }

    /// Factories need workers at home.
    fn is_destination(value: u16) -> bool {
        is_residential(value)
    }

    fn location_score(maps: &BlockMaps, x: usize, y: usize) -> i32 {
        land_location_score(maps, x, y)
    }

    fn utility_ok(cell: &Cell) -> bool {
        cell.is_powered()
    }
}

/// Scan handler for industrial zone centers.
pub fn process_industrial(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    process_zone::<Industrial>(grid, x, y, ctx);
}
