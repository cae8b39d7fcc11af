//! Commercial zones.

use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::context::SimContext;
use crate::grid::{Cell, TileGrid};
use crate::tiles::{is_residential, COM_BASE, COM_MAX_TIER};
use crate::valves::Valves;
use crate::zones::{process_zone, ZoneFamily};

/// Shops and offices. Unlike the land-sensitive families, commercial sites
/// are scored by centrality: the com-rate map falls off with distance from
/// the city centre, so downtown lots are worth far more than fringe ones.
pub struct Commercial;

impl ZoneFamily for Commercial {
    const BASE: u16 = COM_BASE;
    const MAX_TIER: u8 = COM_MAX_TIER;
    const TRAFFIC_THRESHOLD: u16 = 5;

    fn population(tier: u8) -> u16 {
        tier as u16
    }

    fn record_census(census: &mut Census, pop: u16) {
        census.com_zone_count += 1;
        census.com_pop += pop as i32;
    }

    fn valve(valves: &Valves) -> i16 {
        valves.com_valve
    }

    /// Shops need customers at home.
    fn is_destination(value: u16) -> bool {
        is_residential(value)
    }

    fn location_score(maps: &BlockMaps, x: usize, y: usize) -> i32 {
        maps.com_rate.world_get(x, y) as i32
    }

    fn utility_ok(cell: &Cell) -> bool {
        cell.is_powered()
    }
}

/// Scan handler for commercial zone centers.
pub fn process_commercial(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    process_zone::<Commercial>(grid, x, y, ctx);
}
