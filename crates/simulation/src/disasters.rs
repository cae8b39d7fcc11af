//! Fires, floods, radiation, and the random-disaster wheel.
//!
//! The damage band below the road codes is maintained by three tile
//! handlers: fire spreads to combustible neighbors and burns down to
//! rubble at a rate set by fire-station coverage, flood water creeps while
//! the city-wide flood counter runs and recedes afterwards, and radiation
//! decays on a very long fuse. The wheel in [`process_disasters`] starts
//! new trouble at a per-difficulty rate; the `make_*` functions are also
//! the entry points for externally triggered disasters.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::block_maps::adjust_rate_of_growth;
use crate::context::SimContext;
use crate::grid::{TileFlags, TileGrid};
use crate::messages::{Message, MessageLog};
use crate::random::SimRandom;
use crate::tiles::{
    footprint_size, is_rubble, is_tree, CHANNEL, DIRT, FIRE, FLOOD, LAST_WATER, RADIATION,
    ROAD_BASE, RUBBLE,
};

/// Cycles a fresh flood keeps spreading before it starts to recede.
const FLOOD_DURATION: u16 = 30;

/// Meltdown odds per nuclear-plant visit, indexed by difficulty.
const MELTDOWN_ODDS: [u16; 3] = [30000, 20000, 10000];

/// Growth-rate penalty for a zone caught by fire or flood.
const DAMAGE_GROWTH_PENALTY: i16 = -20;

const DX: [i32; 4] = [0, 1, 0, -1];
const DY: [i32; 4] = [-1, 0, 1, 0];

#[derive(Resource, Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct DisasterState {
    /// Remaining cycles of active flood spread.
    pub flood_count: u16,
    /// Master switch for the random wheel; external triggers ignore it.
    pub enabled: bool,
}

impl Default for DisasterState {
    fn default() -> Self {
        Self {
            flood_count: 0,
            enabled: true,
        }
    }
}

impl crate::Saveable for DisasterState {
    const SAVE_KEY: &'static str = "disasters";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

// ---------------------------------------------------------------------------
// Tile handlers
// ---------------------------------------------------------------------------

/// Scan handler for burning cells.
pub fn process_fire(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.fire_count += 1;

    // Each cardinal neighbor has a one-in-eight chance of catching.
    for dir in 0..4 {
        if !ctx.rng.get_chance(7) {
            continue;
        }
        let Some((nx, ny)) = grid.offset(x, y, DX[dir], DY[dir]) else {
            continue;
        };
        let cell = *grid.get(nx, ny);
        if !cell.is_combustible() {
            continue;
        }
        if cell.is_zone_center() {
            damage_zone(grid, ctx, nx, ny);
        }
        let variant = ctx.rng.get_random16() & 3;
        grid.set(nx, ny, FIRE + variant, TileFlags::ANIMATED);
    }

    // Strong station coverage burns fires out quickly; none at all lets
    // them smolder for a long time.
    let coverage = ctx.maps.fire_station_effect.world_get(x, y);
    let rate = if coverage > 100 {
        1
    } else if coverage > 20 {
        2
    } else if coverage > 0 {
        3
    } else {
        10
    };
    if ctx.rng.get_random(rate) == 0 {
        let variant = ctx.rng.get_random16() & 3;
        grid.set(x, y, RUBBLE + variant, TileFlags::BULLDOZABLE);
    }
}

/// Scan handler for flooded cells.
pub fn process_flood(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    if ctx.disasters.flood_count > 0 {
        for dir in 0..4 {
            if !ctx.rng.get_chance(7) {
                continue;
            }
            let Some((nx, ny)) = grid.offset(x, y, DX[dir], DY[dir]) else {
                continue;
            };
            let cell = *grid.get(nx, ny);
            let value = cell.tile_type;
            let floodable =
                cell.is_combustible() || value == DIRT || is_tree(value) || is_rubble(value);
            if !floodable {
                continue;
            }
            if cell.is_zone_center() {
                damage_zone(grid, ctx, nx, ny);
            }
            let variant = ctx.rng.get_random(2);
            grid.set(nx, ny, FLOOD + variant, TileFlags::empty());
        }
    } else if ctx.rng.get_chance(15) {
        grid.clear(x, y);
    }
}

/// Scan handler for radioactive cells. Contamination decays on a roughly
/// one-in-4096 chance per visit.
pub fn process_radiation(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    if ctx.rng.get_chance(4095) {
        grid.clear(x, y);
    }
}

/// A burning or flooded zone loses growth momentum and its whole footprint
/// becomes clearable wreckage.
fn damage_zone(grid: &mut TileGrid, ctx: &mut SimContext<'_>, x: usize, y: usize) {
    adjust_rate_of_growth(ctx.maps, x, y, DAMAGE_GROWTH_PENALTY);
    let size = footprint_size(grid.value(x, y));
    for dy in -1..size - 1 {
        for dx in -1..size - 1 {
            if let Some((cx, cy)) = grid.offset(x, y, dx, dy) {
                let cell = grid.get_mut(cx, cy);
                if cell.tile_type >= ROAD_BASE {
                    cell.flags.insert(TileFlags::BULLDOZABLE);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// The wheel and external triggers
// ---------------------------------------------------------------------------

/// Once-per-cycle disaster bookkeeping: ticks the flood counter down and
/// occasionally spins up new trouble, more often on harder difficulties.
pub fn process_disasters(grid: &mut TileGrid, ctx: &mut SimContext<'_>) {
    if ctx.disasters.flood_count > 0 {
        ctx.disasters.flood_count -= 1;
    }
    if !ctx.disasters.enabled {
        return;
    }
    if ctx.rng.get_random(ctx.level.disaster_chance()) != 0 {
        return;
    }
    match ctx.rng.get_random(8) {
        0 | 1 => make_fire(grid, ctx.rng, ctx.messages, ctx.city_time),
        2 | 3 => make_flood(grid, ctx.disasters, ctx.rng, ctx.messages, ctx.city_time),
        7 | 8 => {
            // The monster heads for the smog; a clean city never sees one.
            let (mx, my) = ctx.census.pollution_max;
            if (mx, my) != (0, 0) {
                ctx.messages.push(
                    Message::MonsterSighted {
                        x: mx as u16,
                        y: my as u16,
                    },
                    ctx.city_time,
                );
            }
        }
        _ => {}
    }
}

/// Meltdown roll for one nuclear-plant visit; fires well under once per
/// ten thousand visits even on hard difficulty.
pub fn check_meltdown(
    grid: &mut TileGrid,
    ctx: &mut SimContext<'_>,
    x: usize,
    y: usize,
) -> bool {
    if !ctx.disasters.enabled {
        return false;
    }
    if ctx.rng.get_random(MELTDOWN_ODDS[ctx.level.index()]) != 0 {
        return false;
    }
    make_meltdown(grid, ctx.rng, ctx.messages, ctx.city_time, x, y);
    true
}

/// Ignites one random combustible, non-center cell. A miss is silent, so
/// the wheel stays cheap.
pub fn make_fire(
    grid: &mut TileGrid,
    rng: &mut dyn RngCore,
    messages: &mut MessageLog,
    city_time: u64,
) {
    let x = rng.get_random((grid.width - 1) as u16) as usize;
    let y = rng.get_random((grid.height - 1) as u16) as usize;
    let cell = *grid.get(x, y);
    if cell.is_combustible() && !cell.is_zone_center() {
        let variant = rng.get_random16() & 3;
        grid.set(x, y, FIRE + variant, TileFlags::ANIMATED);
        messages.push(
            Message::FireReported {
                x: x as u16,
                y: y as u16,
            },
            city_time,
        );
    }
}

/// Starts a flood at a random river edge and arms the spread counter.
pub fn make_flood(
    grid: &mut TileGrid,
    disasters: &mut DisasterState,
    rng: &mut dyn RngCore,
    messages: &mut MessageLog,
    city_time: u64,
) {
    for _ in 0..300 {
        let x = rng.get_random((grid.width - 1) as u16) as usize;
        let y = rng.get_random((grid.height - 1) as u16) as usize;
        let value = grid.value(x, y);
        // Only the shore band floods outward, not open river or channel.
        if value <= CHANNEL || value > LAST_WATER {
            continue;
        }
        for dir in 0..4 {
            let Some((nx, ny)) = grid.offset(x, y, DX[dir], DY[dir]) else {
                continue;
            };
            let cell = *grid.get(nx, ny);
            if cell.tile_type == DIRT || (cell.is_bulldozable() && cell.is_combustible()) {
                grid.set(nx, ny, FLOOD, TileFlags::empty());
                disasters.flood_count = FLOOD_DURATION;
                messages.push(
                    Message::FloodReported {
                        x: nx as u16,
                        y: ny as u16,
                    },
                    city_time,
                );
                return;
            }
        }
    }
}

/// Sets everything combustible in the 3x3 around the blast on fire.
pub fn make_explosion(
    grid: &mut TileGrid,
    rng: &mut dyn RngCore,
    messages: &mut MessageLog,
    city_time: u64,
    x: usize,
    y: usize,
) {
    messages.push(
        Message::ExplosionReported {
            x: x as u16,
            y: y as u16,
        },
        city_time,
    );
    for dy in -1..=1 {
        for dx in -1..=1 {
            let Some((cx, cy)) = grid.offset(x, y, dx, dy) else {
                continue;
            };
            if grid.get(cx, cy).is_combustible() {
                let variant = rng.get_random16() & 3;
                grid.set(cx, cy, FIRE + variant, TileFlags::ANIMATED);
            }
        }
    }
}

/// Nuclear accident at the plant centered on `(x, y)`: the whole footprint
/// goes up in flames and fallout scatters over the surrounding area.
pub fn make_meltdown(
    grid: &mut TileGrid,
    rng: &mut dyn RngCore,
    messages: &mut MessageLog,
    city_time: u64,
    x: usize,
    y: usize,
) {
    for dy in -1..3 {
        for dx in -1..3 {
            if let Some((cx, cy)) = grid.offset(x, y, dx, dy) {
                let variant = rng.get_random16() & 3;
                grid.set(cx, cy, FIRE + variant, TileFlags::ANIMATED);
            }
        }
    }
    for _ in 0..200 {
        let rx = x as i32 - 20 + rng.get_random(40) as i32;
        let ry = y as i32 - 15 + rng.get_random(30) as i32;
        if rx < 0 || rx >= grid.width as i32 || ry < 0 || ry >= grid.height as i32 {
            continue;
        }
        let (rx, ry) = (rx as usize, ry as usize);
        let cell = *grid.get(rx, ry);
        if cell.is_zone_center() {
            continue;
        }
        if cell.tile_type == DIRT || cell.is_combustible() {
            grid.set(rx, ry, RADIATION, TileFlags::empty());
        }
    }
    messages.push(
        Message::NuclearMeltdown {
            x: x as u16,
            y: y as u16,
        },
        city_time,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::SimState;
    use crate::tiles::RES_BASE;
    use crate::zones::zone_plop;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_uncovered_fire_burns_to_rubble() {
        let mut state = SimState::new();
        state.grid.set(10, 10, FIRE, TileFlags::ANIMATED);
        // Zero stream: every spread roll hits dirt neighbors (no effect)
        // and the burn-out roll lands.
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire(grid, 10, 10, ctx);
        });
        assert!(is_rubble(state.grid.value(10, 10)));
        assert_eq!(state.census.fire_count, 1);
    }

    #[test]
    fn test_fire_spreads_to_combustible_neighbors() {
        let mut state = SimState::new();
        state.grid.set(10, 10, FIRE, TileFlags::ANIMATED);
        state
            .grid
            .set(11, 10, RES_BASE, TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE);
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire(grid, 10, 10, ctx);
        });
        assert_eq!(state.grid.value(11, 10), FIRE);
        assert!(state.grid.get(11, 10).is_animated());
    }

    #[test]
    fn test_covered_fire_outlasts_one_visit() {
        let mut state = SimState::new();
        state.grid.set(10, 10, FIRE, TileFlags::ANIMATED);
        state.maps.fire_station_effect.world_set(10, 10, 150);
        // Draw 1 misses every chance roll and loses the burn-out coin flip.
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire(grid, 10, 10, ctx);
        });
        assert_eq!(state.grid.value(10, 10), FIRE);
    }

    #[test]
    fn test_burning_zone_center_loses_growth() {
        let mut state = SimState::new();
        state.grid.set(10, 10, FIRE, TileFlags::ANIMATED);
        assert!(zone_plop(&mut state.grid, 12, 10, RES_BASE));
        // The fire's east neighbor (11, 10) is zone body; make it the
        // center instead so the footprint penalty path runs.
        let center = *state.grid.get(12, 10);
        *state.grid.get_mut(11, 10) = center;
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire(grid, 10, 10, ctx);
        });
        assert_eq!(state.maps.rate_of_growth.world_get(11, 10), -20);
        assert_eq!(state.grid.value(11, 10), FIRE);
    }

    #[test]
    fn test_flood_spreads_while_counter_runs() {
        let mut state = SimState::new();
        state.grid.set(10, 10, FLOOD, TileFlags::empty());
        state.disasters.flood_count = 5;
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_flood(grid, 10, 10, ctx);
        });
        assert_eq!(state.grid.value(11, 10), FLOOD);
        assert_eq!(state.grid.value(9, 10), FLOOD);
        assert_eq!(state.grid.value(10, 9), FLOOD);
        assert_eq!(state.grid.value(10, 11), FLOOD);
    }

    #[test]
    fn test_flood_recedes_when_counter_expires() {
        let mut state = SimState::new();
        state.grid.set(10, 10, FLOOD, TileFlags::empty());
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_flood(grid, 10, 10, ctx);
        });
        assert_eq!(state.grid.value(10, 10), DIRT);
    }

    #[test]
    fn test_radiation_decays_only_on_the_long_roll() {
        let mut state = SimState::new();
        state.grid.set(10, 10, RADIATION, TileFlags::empty());
        let mut miss = StepRng::new(1, 0);
        state.run(&mut miss, |grid, ctx| {
            process_radiation(grid, 10, 10, ctx);
        });
        assert_eq!(state.grid.value(10, 10), RADIATION);

        let mut hit = StepRng::new(0, 0);
        state.run(&mut hit, |grid, ctx| {
            process_radiation(grid, 10, 10, ctx);
        });
        assert_eq!(state.grid.value(10, 10), DIRT);
    }

    #[test]
    fn test_meltdown_torches_the_plant_and_scatters_fallout() {
        let mut state = SimState::new();
        let mut rng = StepRng::new(0, 0);
        let mut messages = MessageLog::default();
        make_meltdown(&mut state.grid, &mut rng, &mut messages, 7, 30, 30);

        for dy in -1i32..3 {
            for dx in -1i32..3 {
                let (cx, cy) = state.grid.offset(30, 30, dx, dy).unwrap();
                assert!(state.grid.value(cx, cy) >= FIRE);
            }
        }
        // The zero stream lands every scatter roll on (10, 15).
        assert_eq!(state.grid.value(10, 15), RADIATION);
        assert!(messages.contains(Message::NuclearMeltdown { x: 30, y: 30 }));
    }

    #[test]
    fn test_make_flood_starts_at_a_river_edge() {
        let mut state = SimState::new();
        // Shore water at the origin; the zero stream samples (0, 0) every
        // attempt, and the east neighbor is dirt.
        state.grid.set(0, 0, CHANNEL + 3, TileFlags::empty());
        let mut rng = StepRng::new(0, 0);
        let mut messages = MessageLog::default();
        let mut disasters = DisasterState::default();
        make_flood(&mut state.grid, &mut disasters, &mut rng, &mut messages, 3);
        assert_eq!(state.grid.value(1, 0), FLOOD);
        assert_eq!(disasters.flood_count, FLOOD_DURATION);
        assert!(messages.contains(Message::FloodReported { x: 1, y: 0 }));
    }

    #[test]
    fn test_flood_counter_ticks_down() {
        let mut state = SimState::new();
        state.disasters.flood_count = 3;
        state.disasters.enabled = false;
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_disasters(grid, ctx);
        });
        assert_eq!(state.disasters.flood_count, 2);
    }
}
