//! The tile scan and its dispatch table.
//!
//! One pass over the grid is amortized across the scheduler's slice phases;
//! [`scan_slice`] walks the columns of one slice. Every visited cell first
//! gets its coverage flags refreshed from the network maps and, at zone
//! centers, its repair check and power tally. Dispatch then walks the
//! [`ScanRegistry`] in registration order and runs the first handler whose
//! matcher accepts the cell, so a cell is processed by at most one handler
//! per scan and precedence is spelled out in one place.

use bevy::prelude::*;

use crate::agriculture::process_agriculture;
use crate::commercial::process_commercial;
use crate::config::{GRID_WIDTH, SCAN_PHASES};
use crate::context::{SimContext, TileHandler};
use crate::disasters::{process_fire, process_flood, process_radiation};
use crate::grid::{Cell, TileGrid};
use crate::industrial::process_industrial;
use crate::residential::process_residential;
use crate::roads::{process_rail, process_road};
use crate::services::{
    process_airport, process_coal_plant, process_fire_station, process_nuclear_plant,
    process_police_station, process_pump, process_seaport, process_stadium,
};
use crate::tiles::{
    is_commercial, is_farm, is_fire, is_flood, is_hydraulic, is_industrial, is_rail,
    is_residential, is_road, AIRPORT, COAL_PLANT, FIRE_STATION, FLOOD, NUCLEAR_PLANT,
    POLICE_STATION, RADIATION, SEAPORT, STADIUM, WATER_PUMP,
};

/// How one registry entry decides whether it wants a cell.
#[derive(Clone, Copy)]
pub enum TileMatcher {
    /// The exact tile code; service-building centers are matched this way.
    Exact(u16),
    /// Any cell whose code satisfies the predicate.
    Predicate(fn(u16) -> bool),
    /// Zone-center cells whose code satisfies the predicate. Footprint
    /// body cells share the family band, so the flag check keeps the zone
    /// automaton off them.
    ZoneCenter(fn(u16) -> bool),
}

impl TileMatcher {
    fn matches(&self, cell: &Cell) -> bool {
        match self {
            TileMatcher::Exact(code) => cell.tile_type == *code,
            TileMatcher::Predicate(pred) => pred(cell.tile_type),
            TileMatcher::ZoneCenter(pred) => cell.is_zone_center() && pred(cell.tile_type),
        }
    }
}

/// Ordered dispatch table for the tile scan.
#[derive(Resource)]
pub struct ScanRegistry {
    entries: Vec<(TileMatcher, TileHandler)>,
}

impl Default for ScanRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ScanRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The full production table: damage bands first, then carriers, then
    /// the zone families, then the service buildings.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(TileMatcher::Predicate(is_fire), process_fire);
        registry.register(TileMatcher::Predicate(is_flood), process_flood);
        registry.register(TileMatcher::Exact(RADIATION), process_radiation);
        registry.register(TileMatcher::Predicate(is_road), process_road);
        registry.register(TileMatcher::Predicate(is_rail), process_rail);
        registry.register(TileMatcher::ZoneCenter(is_residential), process_residential);
        registry.register(TileMatcher::ZoneCenter(is_commercial), process_commercial);
        registry.register(TileMatcher::ZoneCenter(is_industrial), process_industrial);
        registry.register(TileMatcher::ZoneCenter(is_farm), process_agriculture);
        registry.register(TileMatcher::Exact(COAL_PLANT), process_coal_plant);
        registry.register(TileMatcher::Exact(NUCLEAR_PLANT), process_nuclear_plant);
        registry.register(TileMatcher::Exact(FIRE_STATION), process_fire_station);
        registry.register(TileMatcher::Exact(POLICE_STATION), process_police_station);
        registry.register(TileMatcher::Exact(STADIUM), process_stadium);
        registry.register(TileMatcher::Exact(SEAPORT), process_seaport);
        registry.register(TileMatcher::Exact(AIRPORT), process_airport);
        registry.register(TileMatcher::Exact(WATER_PUMP), process_pump);
        registry
    }

    pub fn register(&mut self, matcher: TileMatcher, handler: TileHandler) {
        self.entries.push((matcher, handler));
    }

    /// First handler in registration order that accepts the cell.
    pub fn handler_for(&self, cell: &Cell) -> Option<TileHandler> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(cell))
            .map(|&(_, handler)| handler)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Column range covered by one scan phase.
pub fn slice_bounds(phase: usize) -> (usize, usize) {
    let start = phase * GRID_WIDTH / SCAN_PHASES;
    let end = (phase + 1) * GRID_WIDTH / SCAN_PHASES;
    (start, end)
}

/// Scans the columns `x_start..x_end` over the full grid height.
///
/// Cells below the damage band are inert and skipped outright. For the
/// rest the dispatch preamble runs first: conductive cells take their
/// POWERED flag from the power coverage map, hydraulic cells take
/// IRRIGATED from the water coverage map, and zone centers get their
/// repair check and the powered/unpowered tally.
pub fn scan_slice(
    registry: &ScanRegistry,
    grid: &mut TileGrid,
    ctx: &mut SimContext<'_>,
    x_start: usize,
    x_end: usize,
) {
    for x in x_start..x_end {
        for y in 0..grid.height {
            let value = grid.value(x, y);
            if value < FLOOD {
                continue;
            }

            let powered = ctx.maps.power_grid.world_get(x, y) > 0;
            let irrigated = ctx.maps.water_grid.world_get(x, y) > 0;
            let cell = grid.get_mut(x, y);
            if cell.is_conductive() {
                cell.set_powered(powered);
            }
            if is_hydraulic(value) {
                cell.set_irrigated(irrigated);
            }

            let cell = *grid.get(x, y);
            if cell.is_zone_center() {
                ctx.repair.check_tile(grid, x, y, ctx.city_time);
                if cell.is_powered() {
                    ctx.census.powered_zone_count += 1;
                } else {
                    ctx.census.unpowered_zone_count += 1;
                }
            }

            if let Some(handler) = registry.handler_for(&cell) {
                handler(grid, x, y, ctx);
            }
        }
    }
}
