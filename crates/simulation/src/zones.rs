//! Zone growth and decay.
//!
//! All four populated zone families run the same automaton over their
//! center cells: tally census population, occasionally prove a road
//! connection to the family's destination tiles, then score the site and
//! move at most one density tier up or down. The family-specific pieces
//! live behind [`ZoneFamily`]; the handlers in `residential`, `commercial`,
//! `industrial`, and `agriculture` are thin instantiations of
//! [`process_zone`].

use crate::block_maps::{adjust_rate_of_growth, BlockMaps};
use crate::census::Census;
use crate::context::SimContext;
use crate::grid::{Cell, TileFlags, TileGrid};
use crate::random::SimRandom;
use crate::tiles::{footprint_base, zone_center, zone_tier, FLOOD, ROAD_BASE, ZONE_CENTER_OFFSET};
use crate::traffic::{make_traffic, RouteResult};
use crate::valves::Valves;

/// Score assigned to a zone whose utility (power or irrigation) is absent.
/// Below the growth floor, so unserviced zones can only decline.
const UNSERVICED_SCORE: i32 = -500;

/// Scores at or below this can never grow.
const GROWTH_FLOOR: i32 = -350;

/// Scores at or above this can never decay.
const DECAY_CEILING: i32 = 350;

/// Offset pitting the score against a signed 16-bit draw; keeps transition
/// probabilities in the single-digit percent range for ordinary scores.
const SCORE_BIAS: i32 = 26380;

/// Growth-rate bump recorded when a zone changes tier.
const GROWTH_DELTA: i16 = 8;

/// The family-specific parts of the zone automaton.
pub trait ZoneFamily {
    /// First tile code of the family's band.
    const BASE: u16;
    /// Highest populated tier.
    const MAX_TIER: u8;
    /// Road checks run when the zone population beats a draw in
    /// `0..=TRAFFIC_THRESHOLD`, so busier zones check more often.
    const TRAFFIC_THRESHOLD: u16;

    /// Census population contributed by a zone at `tier`.
    fn population(tier: u8) -> u16;

    /// Accumulates this zone into the scan census.
    fn record_census(census: &mut Census, pop: u16);

    /// Demand valve driving growth pressure.
    fn valve(valves: &Valves) -> i16;

    /// What a trip from this zone is trying to reach.
    fn is_destination(value: u16) -> bool;

    /// Site desirability term added to the valve.
    fn location_score(maps: &BlockMaps, x: usize, y: usize) -> i32;

    /// Whether the utility this family depends on is present at the center.
    fn utility_ok(cell: &Cell) -> bool;
}

/// Runs the automaton for one zone-center cell.
pub fn process_zone<F: ZoneFamily>(
    grid: &mut TileGrid,
    x: usize,
    y: usize,
    ctx: &mut SimContext<'_>,
) {
    let tier = zone_tier(grid.value(x, y), F::BASE);
    let pop = F::population(tier);
    F::record_census(ctx.census, pop);

    let route = if pop > ctx.rng.get_random(F::TRAFFIC_THRESHOLD) {
        make_traffic(grid, ctx, x, y, F::is_destination)
    } else {
        RouteResult::RouteFound
    };

    // A zone with no road at all on its perimeter declines immediately.
    if route == RouteResult::NoRoadFound {
        decay_zone::<F>(grid, ctx, x, y, tier);
        return;
    }

    // Empty zones are evaluated every visit, populated ones one in eight.
    if tier != 0 && !ctx.rng.get_chance(7) {
        return;
    }

    let score = if F::utility_ok(grid.get(x, y)) {
        F::valve(ctx.valves) as i32 + F::location_score(ctx.maps, x, y)
    } else {
        UNSERVICED_SCORE
    };

    if score > GROWTH_FLOOR && score - SCORE_BIAS > ctx.rng.get_random16_signed() as i32 {
        grow_zone::<F>(grid, ctx, x, y, tier);
        return;
    }
    if score < DECAY_CEILING && score + SCORE_BIAS < ctx.rng.get_random16_signed() as i32 {
        decay_zone::<F>(grid, ctx, x, y, tier);
    }
}

fn grow_zone<F: ZoneFamily>(
    grid: &mut TileGrid,
    ctx: &mut SimContext<'_>,
    x: usize,
    y: usize,
    tier: u8,
) {
    if tier >= F::MAX_TIER {
        return;
    }
    let variant = land_value_variant(ctx.maps, x, y);
    let center = zone_center(F::BASE, tier + 1, variant);
    if zone_plop(grid, x, y, footprint_base(center)) {
        adjust_rate_of_growth(ctx.maps, x, y, GROWTH_DELTA);
    }
}

fn decay_zone<F: ZoneFamily>(
    grid: &mut TileGrid,
    ctx: &mut SimContext<'_>,
    x: usize,
    y: usize,
    tier: u8,
) {
    if tier == 0 {
        return;
    }
    let variant = land_value_variant(ctx.maps, x, y);
    let center = zone_center(F::BASE, tier - 1, variant);
    if zone_plop(grid, x, y, footprint_base(center)) {
        adjust_rate_of_growth(ctx.maps, x, y, -GROWTH_DELTA);
    }
}

/// Rewrites the 3x3 footprint centered at `(x, y)` with the nine codes
/// starting at `base`. Flood, radiation, or fire anywhere in the footprint
/// blocks redevelopment until the damage clears; rubble is built over.
pub fn zone_plop(grid: &mut TileGrid, x: usize, y: usize, base: u16) -> bool {
    for dy in -1..=1 {
        for dx in -1..=1 {
            let Some((cx, cy)) = grid.offset(x, y, dx, dy) else {
                return false;
            };
            let v = grid.value(cx, cy);
            if (FLOOD..ROAD_BASE).contains(&v) {
                return false;
            }
        }
    }
    let mut code = base;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if let Some((cx, cy)) = grid.offset(x, y, dx, dy) {
                let mut flags =
                    TileFlags::CONDUCTIVE | TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE;
                if code == base + ZONE_CENTER_OFFSET {
                    flags |= TileFlags::ZONE_CENTER;
                }
                grid.set(cx, cy, code, flags);
            }
            code += 1;
        }
    }
    true
}

/// Land-value class of a site after pollution, used to pick the tile
/// variant a transition builds.
pub fn land_value_variant(maps: &BlockMaps, x: usize, y: usize) -> u8 {
    let value = maps.land_value.world_get(x, y) - maps.pollution_density.world_get(x, y);
    if value < 30 {
        0
    } else if value < 80 {
        1
    } else if value < 150 {
        2
    } else {
        3
    }
}

/// Shared location term for the land-sensitive families: land value net of
/// pollution, scaled and recentered so a barren site scores -3000 and a
/// prime one +3000.
pub fn land_location_score(maps: &BlockMaps, x: usize, y: usize) -> i32 {
    let value = (maps.land_value.world_get(x, y) - maps.pollution_density.world_get(x, y)) as i32;
    (value * 32).clamp(0, 6000) - 3000
}
