//! Agricultural zones.
//!
//! Farms follow the same automaton as the other families but depend on
//! irrigation instead of electricity: the water scan marks farm centers
//! reached through the aqueduct network, and a dry farm is scored the same
//! way an unpowered factory is. Farm jobs ride the industrial demand valve
//! and count as industrial employment in the census.

use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::context::SimContext;
use crate::grid::{Cell, TileGrid};
use crate::tiles::{is_commercial, is_industrial, FARM_BASE, FARM_MAX_TIER};
use crate::valves::Valves;
use crate::zones::{land_location_score, process_zone, ZoneFamily};

pub struct Agriculture;

impl ZoneFamily for Agriculture {
    const BASE: u16 = FARM_BASE;
    const MAX_TIER: u8 = FARM_MAX_TIER;
    const TRAFFIC_THRESHOLD: u16 = 15;

    fn population(tier: u8) -> u16 {
        tier as u16
    }

    fn record_census(census: &mut Census, pop: u16) {
        census.farm_zone_count += 1;
        census.farm_pop += pop as i32;
    }

    fn valve(valves: &Valves) -> i16 {
        valves.ind_valve
    }

    /// Produce is trucked to markets and processors.
    fn is_destination(value: u16) -> bool {
        is_commercial(value) || is_industrial(value)
    }

    fn location_score(maps: &BlockMaps, x: usize, y: usize) -> i32 {
        land_location_score(maps, x, y)
    }

    fn utility_ok(cell: &Cell) -> bool {
        cell.is_irrigated()
    }
}

/// Scan handler for farm zone centers.
pub fn process_agriculture(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    process_zone::<Agriculture>(grid, x, y, ctx);
}
