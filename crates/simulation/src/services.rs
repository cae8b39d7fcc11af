//! Service-building handlers.
//!
//! Power plants and pump stations seed the network traversals, protection
//! stations project budget-scaled coverage into the raw station maps, and
//! the unique buildings only need counting so the advisory cadence can lift
//! the matching demand caps. Coverage written here is raw: the aggregation
//! pass smooths it into the effect maps afterwards.

use crate::context::SimContext;
use crate::disasters::check_meltdown;
use crate::grid::TileGrid;
use crate::traffic::find_perimeter_road;

pub fn process_coal_plant(_grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.coal_plant_count += 1;
    ctx.power.push_root(x, y);
}

pub fn process_nuclear_plant(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.nuclear_plant_count += 1;
    if check_meltdown(grid, ctx, x, y) {
        return;
    }
    ctx.power.push_root(x, y);
}

/// An unpowered station has half coverage; one cut off from the road
/// network halves again. POWERED is refreshed by the scan dispatch before
/// this runs.
pub fn process_fire_station(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.fire_station_count += 1;
    let mut effect = ctx.budget.fire_effect;
    if !grid.get(x, y).is_powered() {
        effect /= 2;
    }
    if find_perimeter_road(grid, x, y).is_none() {
        effect /= 2;
    }
    let current = ctx.maps.fire_station.world_get(x, y);
    ctx.maps.fire_station.world_set(x, y, current + effect);
}

pub fn process_police_station(grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.police_station_count += 1;
    let mut effect = ctx.budget.police_effect;
    if !grid.get(x, y).is_powered() {
        effect /= 2;
    }
    if find_perimeter_road(grid, x, y).is_none() {
        effect /= 2;
    }
    let current = ctx.maps.police_station.world_get(x, y);
    ctx.maps.police_station.world_set(x, y, current + effect);
}

pub fn process_stadium(_grid: &mut TileGrid, _x: usize, _y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.stadium_count += 1;
}

pub fn process_seaport(_grid: &mut TileGrid, _x: usize, _y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.seaport_count += 1;
}

pub fn process_airport(_grid: &mut TileGrid, _x: usize, _y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.airport_count += 1;
}

pub fn process_pump(_grid: &mut TileGrid, x: usize, y: usize, ctx: &mut SimContext<'_>) {
    ctx.census.pump_count += 1;
    ctx.water.push_root(x, y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileFlags;
    use crate::messages::Message;
    use crate::test_harness::SimState;
    use crate::tiles::{
        COAL_PLANT, FIRE, FIRE_STATION, NUCLEAR_PLANT, POLICE_STATION, ROADS, WATER_PUMP,
    };
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_coal_plant_seeds_power_scan() {
        let mut state = SimState::new();
        state.grid.set(
            10,
            10,
            COAL_PLANT,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_coal_plant(grid, 10, 10, ctx);
        });
        assert_eq!(state.census.coal_plant_count, 1);
        assert_eq!(state.power.pending(), 1);
    }

    #[test]
    fn test_nuclear_plant_seeds_power_scan() {
        let mut state = SimState::new();
        state.grid.set(
            30,
            30,
            NUCLEAR_PLANT,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        // Draw 1 misses the meltdown roll.
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_nuclear_plant(grid, 30, 30, ctx);
        });
        assert_eq!(state.census.nuclear_plant_count, 1);
        assert_eq!(state.power.pending(), 1);
        assert_eq!(state.grid.value(30, 30), NUCLEAR_PLANT);
    }

    #[test]
    fn test_nuclear_meltdown_roll_destroys_the_plant() {
        let mut state = SimState::new();
        state.grid.set(
            30,
            30,
            NUCLEAR_PLANT,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        // The zero stream lands the meltdown roll on the first visit.
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_nuclear_plant(grid, 30, 30, ctx);
        });
        assert_eq!(state.census.nuclear_plant_count, 1);
        assert_eq!(state.power.pending(), 0);
        assert_eq!(state.grid.value(30, 30), FIRE);
        assert!(state
            .messages
            .contains(Message::NuclearMeltdown { x: 30, y: 30 }));
    }

    #[test]
    fn test_disabled_disasters_never_melt_down() {
        let mut state = SimState::new();
        state.disasters.enabled = false;
        state.grid.set(
            30,
            30,
            NUCLEAR_PLANT,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        let mut rng = StepRng::new(0, 0);
        state.run(&mut rng, |grid, ctx| {
            process_nuclear_plant(grid, 30, 30, ctx);
        });
        assert_eq!(state.grid.value(30, 30), NUCLEAR_PLANT);
        assert_eq!(state.power.pending(), 1);
    }

    #[test]
    fn test_fire_station_full_coverage_when_powered_and_connected() {
        let mut state = SimState::new();
        state.grid.set(
            10,
            10,
            FIRE_STATION,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER | TileFlags::POWERED,
        );
        state
            .grid
            .set(12, 10, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire_station(grid, 10, 10, ctx);
        });
        assert_eq!(state.census.fire_station_count, 1);
        assert_eq!(state.maps.fire_station.world_get(10, 10), 1000);
    }

    #[test]
    fn test_isolated_unpowered_station_covers_a_quarter() {
        let mut state = SimState::new();
        state.grid.set(
            10,
            10,
            FIRE_STATION,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire_station(grid, 10, 10, ctx);
        });
        assert_eq!(state.maps.fire_station.world_get(10, 10), 250);
    }

    #[test]
    fn test_station_coverage_accumulates_per_block() {
        let mut state = SimState::new();
        state.grid.set(
            10,
            10,
            FIRE_STATION,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER | TileFlags::POWERED,
        );
        state
            .grid
            .set(12, 10, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_fire_station(grid, 10, 10, ctx);
            process_fire_station(grid, 10, 10, ctx);
        });
        assert_eq!(state.maps.fire_station.world_get(10, 10), 2000);
        assert_eq!(state.census.fire_station_count, 2);
    }

    #[test]
    fn test_police_station_halves_without_power() {
        let mut state = SimState::new();
        state.grid.set(
            40,
            40,
            POLICE_STATION,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        state
            .grid
            .set(42, 40, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_police_station(grid, 40, 40, ctx);
        });
        assert_eq!(state.census.police_station_count, 1);
        assert_eq!(state.maps.police_station.world_get(40, 40), 500);
    }

    #[test]
    fn test_unique_buildings_are_counted() {
        let mut state = SimState::new();
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_stadium(grid, 10, 10, ctx);
            process_seaport(grid, 20, 20, ctx);
            process_airport(grid, 30, 30, ctx);
        });
        assert_eq!(state.census.stadium_count, 1);
        assert_eq!(state.census.seaport_count, 1);
        assert_eq!(state.census.airport_count, 1);
    }

    #[test]
    fn test_pump_seeds_water_scan() {
        let mut state = SimState::new();
        state.grid.set(50, 50, WATER_PUMP, TileFlags::BULLDOZABLE);
        let mut rng = StepRng::new(1, 0);
        state.run(&mut rng, |grid, ctx| {
            process_pump(grid, 50, 50, ctx);
        });
        assert_eq!(state.census.pump_count, 1);
        assert_eq!(state.water.pending(), 1);
    }
}
