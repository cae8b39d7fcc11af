//! Road and rail surface upkeep.
//!
//! Every driveable cell the scan visits is tallied for the budget, rolled
//! against decay when transport funding has slipped, and (for roads)
//! reskinned between the plain and congested surface bands to match the
//! traffic-density map.

use rand::RngCore;

use crate::context::SimContext;
use crate::grid::{TileFlags, TileGrid};
use crate::random::SimRandom;
use crate::tiles::{HEAVY_TRAFFIC_BASE, LIGHT_TRAFFIC_BASE, ROAD_BASE, RUBBLE};

/// Band bases indexed by congestion class.
const DENSITY_BASES: [u16; 3] = [ROAD_BASE, LIGHT_TRAFFIC_BASE, HEAVY_TRAFFIC_BASE];

/// Scan handler for every road-band cell.
pub fn process_road(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.road_total += 1;

    if roll_decay(ctx) {
        crumble(grid, x, y, ctx.rng);
        return;
    }

    // Reskin between the plain and congested bands; the shape nibble is
    // shared across all three bands.
    let value = grid.value(x, y);
    let band: usize = if value < LIGHT_TRAFFIC_BASE {
        0
    } else if value < HEAVY_TRAFFIC_BASE {
        1
    } else {
        2
    };
    let mut density = (ctx.maps.traffic_density.world_get(x, y) >> 6) as usize;
    if density > 1 {
        density -= 1;
    }
    if band != density {
        let shape = (value - ROAD_BASE) & 15;
        let cell = grid.get_mut(x, y);
        cell.tile_type = DENSITY_BASES[density] + shape;
        cell.flags.set(TileFlags::ANIMATED, density > 0);
    }
}

/// Scan handler for every rail cell. Rails never carry the congestion
/// bands but decay under the same funding rules as roads.
pub fn process_rail(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.rail_total += 1;
    if roll_decay(ctx) {
        crumble(grid, x, y, ctx.rng);
    }
}

/// One-in-512 decay roll, only armed while transport funding is short and
/// only biting when the funded effect loses to a 0..31 draw.
fn roll_decay(ctx: &mut SimContext<'_>) -> bool {
    ctx.budget.should_degrade_road()
        && ctx.rng.get_chance(511)
        && ctx.budget.road_effect < (ctx.rng.get_random16() & 31) as i16
}

fn crumble(grid: &mut TileGrid, x: usize, y: usize, rng: &mut dyn RngCore) {
    let value = RUBBLE + (rng.get_random16() & 3);
    grid.set(x, y, value, TileFlags::BULLDOZABLE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::SimState;
    use crate::tiles::{is_rubble, RAILS, ROADS};
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_road_tally_and_no_decay_at_full_funding() {
        let mut state = SimState::new();
        state.grid.set(5, 5, ROADS, TileFlags::BULLDOZABLE);
        // Zero stream would pass every chance roll, but full funding keeps
        // the decay branch disarmed.
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_road(grid, 5, 5, ctx);
        });
        assert_eq!(state.census.road_total, 1);
        assert_eq!(state.grid.value(5, 5), ROADS);
    }

    #[test]
    fn test_unfunded_road_crumbles() {
        let mut state = SimState::new();
        state.grid.set(5, 5, ROADS, TileFlags::BULLDOZABLE);
        state.budget.road_effect = 0;
        // Draws 0, 31, 62: the chance roll hits on 0 and the 0..31 draw of
        // 31 beats a zero effect; the last draw picks the rubble variant.
        let mut rng = StepRng::new(0, 31);
        state.run(&mut rng, |grid, ctx| {
            process_road(grid, 5, 5, ctx);
        });
        assert!(is_rubble(state.grid.value(5, 5)));
        assert!(state.grid.get(5, 5).is_bulldozable());
    }

    #[test]
    fn test_congestion_reskins_the_surface() {
        let mut state = SimState::new();
        state.grid.set(5, 5, ROADS, TileFlags::BULLDOZABLE);
        state.maps.traffic_density.world_set(5, 5, 100);
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_road(grid, 5, 5, ctx);
        });
        // Density 100 >> 6 = 1: light congestion band, same shape nibble.
        assert_eq!(state.grid.value(5, 5), LIGHT_TRAFFIC_BASE + (ROADS - ROAD_BASE));
        assert!(state.grid.get(5, 5).is_animated());

        // Traffic decayed away: the surface swaps back and stops animating.
        state.maps.traffic_density.world_set(5, 5, 0);
        state.run(&mut rng, |grid, ctx| {
            process_road(grid, 5, 5, ctx);
        });
        assert_eq!(state.grid.value(5, 5), ROADS);
        assert!(!state.grid.get(5, 5).is_animated());
    }

    #[test]
    fn test_heavy_band_needs_saturated_traffic() {
        let mut state = SimState::new();
        state.grid.set(5, 5, ROADS, TileFlags::BULLDOZABLE);
        state.maps.traffic_density.world_set(5, 5, 200);
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_road(grid, 5, 5, ctx);
        });
        // 200 >> 6 = 3, stepped down to 2: heavy band.
        assert_eq!(state.grid.value(5, 5), HEAVY_TRAFFIC_BASE + (ROADS - ROAD_BASE));
    }

    #[test]
    fn test_rail_tally() {
        let mut state = SimState::new();
        state.grid.set(5, 5, RAILS, TileFlags::BULLDOZABLE);
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_rail(grid, 5, 5, ctx);
        });
        assert_eq!(state.census.rail_total, 1);
        assert_eq!(state.grid.value(5, 5), RAILS);
    }
}
