//! The 16-phase scheduler.
//!
//! One external tick advances exactly one phase, so a full simulation cycle
//! spreads over sixteen ticks: phase 0 is housekeeping, phases 1-8 each scan
//! one vertical slice of the map, and phases 9-15 run the census, decay,
//! traversal, and aggregation passes on per-speed cadences. Nothing here
//! suspends mid-phase; pausing simply stops the phase counter, so resuming
//! continues exactly where the city left off.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::block_maps::{decay_rate_of_growth, decay_traffic, BlockMaps};
use crate::budget::{collect_tax, CityBudget};
use crate::census::Census;
use crate::config::{
    GameLevel, CYCLE_WRAP, PHASE_COUNT, SHORT_CENSUS_INTERVAL, SPEED_COVERAGE_SCAN,
    SPEED_CRIME_SCAN, SPEED_POLLUTION_SCAN, SPEED_POPULATION_SCAN, SPEED_POWER_SCAN,
    TIME_UNITS_PER_YEAR,
};
use crate::context::SimContext;
use crate::coverage::service_coverage_scan;
use crate::crime::crime_scan;
use crate::disasters::{process_disasters, DisasterState};
use crate::evaluation::{evaluate, CityEvaluation};
use crate::grid::TileGrid;
use crate::irrigation::{do_water_scan, WaterScan};
use crate::land_value::pollution_terrain_land_value_scan;
use crate::map_scanner::{scan_slice, slice_bounds, ScanRegistry};
use crate::messages::{send_messages, MessageLog};
use crate::population_density::population_density_scan;
use crate::power::{do_power_scan, PowerScan};
use crate::random::SimRng;
use crate::repair::RepairRegistry;
use crate::valves::{set_valves, Valves};

/// Cycles between rate-of-growth decay passes.
const GROWTH_DECAY_INTERVAL: u16 = 5;

/// Simulation speed. Faster settings advance more phases per wall-clock
/// second and also stretch the aggregation cadences so the expensive passes
/// stay amortized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub enum SimSpeed {
    Paused,
    Slow,
    #[default]
    Medium,
    Fast,
}

impl SimSpeed {
    /// Index into the per-pass cadence tables in `config`.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            SimSpeed::Paused | SimSpeed::Slow => 0,
            SimSpeed::Medium => 1,
            SimSpeed::Fast => 2,
        }
    }

    /// External ticks per phase advance; `None` pauses outright.
    fn tick_divisor(self) -> Option<u32> {
        match self {
            SimSpeed::Paused => None,
            SimSpeed::Slow => Some(4),
            SimSpeed::Medium => Some(2),
            SimSpeed::Fast => Some(1),
        }
    }
}

/// Scheduler state: the phase and cycle counters and the speed throttle.
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Simulation {
    pub speed: SimSpeed,
    /// External tick counter feeding the speed throttle.
    speed_cycle: u32,
    /// The phase the next advance will run, 0..16.
    pub phase: u8,
    /// Scan cycle counter, wrapping at `CYCLE_WRAP`.
    pub sim_cycle: u16,
    /// Simulated time units since founding; `TIME_UNITS_PER_YEAR` per year.
    pub city_time: u64,
    /// City tax summed per time unit, folded into the yearly average.
    tax_acc: u32,
    /// Set for a new or freshly loaded city; the first phase 0 clears it and
    /// runs an evaluation so the report card is never blank.
    pub needs_initial_eval: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            speed: SimSpeed::Medium,
            speed_cycle: 0,
            phase: 0,
            sim_cycle: 0,
            city_time: 0,
            tax_acc: 0,
            needs_initial_eval: true,
        }
    }
}

impl Simulation {
    /// Calendar year since founding.
    pub fn year(&self) -> u64 {
        self.city_time / TIME_UNITS_PER_YEAR
    }

    /// Month within the year, 0..12.
    pub fn month(&self) -> u64 {
        self.city_time % TIME_UNITS_PER_YEAR / 4
    }

    /// Speed throttle, called once per external tick. Pausing leaves every
    /// counter untouched so resuming is transparent.
    pub fn should_advance(&mut self) -> bool {
        let Some(divisor) = self.speed.tick_divisor() else {
            return false;
        };
        self.speed_cycle = self.speed_cycle.wrapping_add(1);
        self.speed_cycle % divisor == 0
    }
}

impl crate::Saveable for Simulation {
    const SAVE_KEY: &'static str = "scheduler";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

/// Runs one scheduler phase and advances the phase counter.
#[allow(clippy::too_many_arguments)]
pub fn advance_phase(
    sim: &mut Simulation,
    grid: &mut TileGrid,
    census: &mut Census,
    valves: &mut Valves,
    maps: &mut BlockMaps,
    budget: &mut CityBudget,
    messages: &mut MessageLog,
    power: &mut PowerScan,
    water: &mut WaterScan,
    repair: &RepairRegistry,
    registry: &ScanRegistry,
    disasters: &mut DisasterState,
    rng: &mut dyn RngCore,
    level: GameLevel,
    eval: &mut CityEvaluation,
) {
    let speed = sim.speed.index();
    match sim.phase {
        0 => {
            sim.sim_cycle = (sim.sim_cycle + 1) % CYCLE_WRAP;
            if sim.needs_initial_eval {
                sim.needs_initial_eval = false;
                evaluate(
                    eval,
                    census,
                    maps,
                    budget,
                    valves,
                    messages,
                    rng,
                    sim.city_time,
                );
            }
            sim.city_time += 1;
            sim.tax_acc += budget.city_tax as u32;
            if sim.sim_cycle & 1 == 0 {
                set_valves(valves, census, budget.city_tax, level);
            }
            census.clear_scan_counts();
            // Stations re-report their coverage as the slices visit them.
            maps.fire_station.clear();
            maps.police_station.clear();
        }
        phase @ 1..=8 => {
            let (x_start, x_end) = slice_bounds(phase as usize - 1);
            let mut ctx = SimContext {
                census: &mut *census,
                valves: &*valves,
                maps: &mut *maps,
                budget: &*budget,
                rng: &mut *rng,
                messages: &mut *messages,
                power: &mut *power,
                water: &mut *water,
                repair,
                disasters: &mut *disasters,
                city_time: sim.city_time,
                level,
            };
            scan_slice(registry, grid, &mut ctx, x_start, x_end);
        }
        9 => {
            if sim.city_time % SHORT_CENSUS_INTERVAL == 0 {
                census.take_short_census(budget.cash_flow);
            }
            if sim.city_time % TIME_UNITS_PER_YEAR == 0 {
                census.take_long_census();
                collect_tax(budget, census, level);
                budget.tax_average = sim.tax_acc as f32 / TIME_UNITS_PER_YEAR as f32;
                sim.tax_acc = 0;
                evaluate(
                    eval,
                    census,
                    maps,
                    budget,
                    valves,
                    messages,
                    rng,
                    sim.city_time,
                );
            }
        }
        10 => {
            if sim.sim_cycle % GROWTH_DECAY_INTERVAL == 0 {
                decay_rate_of_growth(&mut maps.rate_of_growth);
            }
            decay_traffic(&mut maps.traffic_density);
            send_messages(census, budget, messages, sim.city_time);
        }
        11 => {
            if sim.sim_cycle % SPEED_POWER_SCAN[speed] == 0 {
                do_power_scan(power, grid, maps, census, messages, sim.city_time);
                do_water_scan(water, grid, maps, census, messages, sim.city_time);
            }
        }
        12 => {
            if sim.sim_cycle % SPEED_POLLUTION_SCAN[speed] == 0 {
                pollution_terrain_land_value_scan(grid, maps, census, rng);
            }
        }
        13 => {
            if sim.sim_cycle % SPEED_CRIME_SCAN[speed] == 0 {
                crime_scan(maps, census);
            }
        }
        14 => {
            if sim.sim_cycle % SPEED_POPULATION_SCAN[speed] == 0 {
                population_density_scan(grid, maps, census);
            }
        }
        _ => {
            if sim.sim_cycle % SPEED_COVERAGE_SCAN[speed] == 0 {
                service_coverage_scan(maps);
            }
            let mut ctx = SimContext {
                census: &mut *census,
                valves: &*valves,
                maps: &mut *maps,
                budget: &*budget,
                rng: &mut *rng,
                messages: &mut *messages,
                power: &mut *power,
                water: &mut *water,
                repair,
                disasters: &mut *disasters,
                city_time: sim.city_time,
                level,
            };
            process_disasters(grid, &mut ctx);
        }
    }
    sim.phase = (sim.phase + 1) % PHASE_COUNT;
}

/// `FixedUpdate` driver: applies the speed throttle, then advances one phase.
#[allow(clippy::too_many_arguments)]
pub fn tick_simulation(
    mut sim: ResMut<Simulation>,
    mut grid: ResMut<TileGrid>,
    mut census: ResMut<Census>,
    mut valves: ResMut<Valves>,
    mut maps: ResMut<BlockMaps>,
    mut budget: ResMut<CityBudget>,
    mut messages: ResMut<MessageLog>,
    mut power: ResMut<PowerScan>,
    mut water: ResMut<WaterScan>,
    repair: Res<RepairRegistry>,
    registry: Res<ScanRegistry>,
    mut disasters: ResMut<DisasterState>,
    mut rng: ResMut<SimRng>,
    level: Res<GameLevel>,
    mut eval: ResMut<CityEvaluation>,
) {
    if !sim.should_advance() {
        return;
    }
    advance_phase(
        &mut sim,
        &mut grid,
        &mut census,
        &mut valves,
        &mut maps,
        &mut budget,
        &mut messages,
        &mut power,
        &mut water,
        &repair,
        &registry,
        &mut disasters,
        &mut rng.0,
        *level,
        &mut eval,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileFlags;
    use crate::messages::Message;
    use crate::tiles::{COAL_PLANT, FIRE, WIRE_H};
    use rand::rngs::mock::StepRng;

    struct World {
        sim: Simulation,
        grid: TileGrid,
        census: Census,
        valves: Valves,
        maps: BlockMaps,
        budget: CityBudget,
        messages: MessageLog,
        power: PowerScan,
        water: WaterScan,
        repair: RepairRegistry,
        registry: ScanRegistry,
        disasters: DisasterState,
        eval: CityEvaluation,
        level: GameLevel,
    }

    impl World {
        fn new() -> Self {
            Self {
                sim: Simulation::default(),
                grid: TileGrid::default(),
                census: Census::default(),
                valves: Valves::default(),
                maps: BlockMaps::default(),
                budget: CityBudget::default(),
                messages: MessageLog::default(),
                power: PowerScan::default(),
                water: WaterScan::default(),
                repair: RepairRegistry::default(),
                registry: ScanRegistry::default(),
                disasters: DisasterState {
                    enabled: false,
                    ..Default::default()
                },
                eval: CityEvaluation::default(),
                level: GameLevel::Medium,
            }
        }

        fn step(&mut self, rng: &mut dyn RngCore) {
            advance_phase(
                &mut self.sim,
                &mut self.grid,
                &mut self.census,
                &mut self.valves,
                &mut self.maps,
                &mut self.budget,
                &mut self.messages,
                &mut self.power,
                &mut self.water,
                &self.repair,
                &self.registry,
                &mut self.disasters,
                rng,
                self.level,
                &mut self.eval,
            );
        }

        fn cycle(&mut self, rng: &mut dyn RngCore) {
            for _ in 0..PHASE_COUNT {
                self.step(rng);
            }
        }
    }

    #[test]
    fn test_phase_counter_wraps_and_time_advances() {
        let mut world = World::new();
        let mut rng = StepRng::new(0, 0);
        world.cycle(&mut rng);
        assert_eq!(world.sim.phase, 0);
        assert_eq!(world.sim.sim_cycle, 1);
        assert_eq!(world.sim.city_time, 1);

        world.sim.sim_cycle = CYCLE_WRAP - 1;
        world.step(&mut rng);
        assert_eq!(world.sim.sim_cycle, 0);
    }

    #[test]
    fn test_initial_evaluation_runs_before_the_clear() {
        let mut world = World::new();
        world.census.res_pop = 101;
        let mut rng = StepRng::new(0, 0);
        world.step(&mut rng);
        assert!(!world.sim.needs_initial_eval);
        assert_eq!(world.eval.city_population, 2020);
        assert!(world.messages.contains(Message::CityGrewTo(1)));
        assert_eq!(world.census.res_pop, 0);
        assert_eq!(world.sim.city_time, 1);
    }

    #[test]
    fn test_valves_recompute_on_even_cycles_only() {
        let mut world = World::new();
        world.sim.needs_initial_eval = false;
        let mut rng = StepRng::new(0, 0);
        world.cycle(&mut rng);
        // Cycle 1 is odd; valves stay at their defaults.
        assert_eq!(world.valves.res_valve, 0);
        world.cycle(&mut rng);
        assert!(world.valves.res_valve > 0);
    }

    #[test]
    fn test_yearly_boundary_snapshots_collects_and_evaluates() {
        let mut world = World::new();
        world.sim.phase = 9;
        world.sim.city_time = 48;
        world.sim.tax_acc = 7 * 48;
        world.census.res_pop = 101;
        let mut rng = StepRng::new(0, 0);
        world.step(&mut rng);
        assert_eq!(world.census.res_hist.short[0], 12);
        assert_eq!(world.census.res_hist.long[0], 12);
        assert_eq!(world.budget.tax_average, 7.0);
        assert_eq!(world.sim.tax_acc, 0);
        assert_eq!(world.eval.city_population, 2020);
        assert_eq!(world.sim.phase, 10);
    }

    #[test]
    fn test_off_year_phase_nine_only_takes_short_census() {
        let mut world = World::new();
        world.sim.phase = 9;
        world.sim.city_time = 44;
        world.census.res_pop = 101;
        let mut rng = StepRng::new(0, 0);
        world.step(&mut rng);
        assert_eq!(world.census.res_hist.short[0], 12);
        assert_eq!(world.census.res_hist.long[0], 0);
        assert_eq!(world.eval.city_population, 0);
    }

    #[test]
    fn test_full_cycle_scans_every_slice() {
        let mut world = World::new();
        world.sim.needs_initial_eval = false;
        world.grid.set(3, 50, FIRE, TileFlags::ANIMATED);
        world.grid.set(115, 50, FIRE, TileFlags::ANIMATED);
        // Chance rolls all miss: the fires neither spread nor burn out.
        let mut rng = StepRng::new(1, 0);
        world.cycle(&mut rng);
        assert_eq!(world.census.fire_count, 2);
        assert_eq!(world.grid.value(3, 50), FIRE);
        assert_eq!(world.grid.value(115, 50), FIRE);
    }

    #[test]
    fn test_power_scan_waits_for_its_cadence() {
        let mut world = World::new();
        world.sim.needs_initial_eval = false;
        world.grid.set(
            5,
            5,
            COAL_PLANT,
            TileFlags::CONDUCTIVE | TileFlags::ZONE_CENTER,
        );
        world.grid.set(6, 5, WIRE_H, TileFlags::CONDUCTIVE);
        let mut rng = StepRng::new(0, 0);

        // Medium speed runs the power scan on every fourth cycle.
        for _ in 0..3 {
            world.cycle(&mut rng);
        }
        assert_eq!(world.maps.power_grid.world_get(6, 5), 0);
        assert!(world.power.pending() > 0);

        world.cycle(&mut rng);
        assert_eq!(world.maps.power_grid.world_get(5, 5), 1);
        assert_eq!(world.maps.power_grid.world_get(6, 5), 1);
        assert_eq!(world.power.pending(), 0);

        // The next scan pass copies coverage onto the tile flags.
        world.cycle(&mut rng);
        assert!(world.grid.get(5, 5).is_powered());
        assert!(world.grid.get(6, 5).is_powered());
    }

    #[test]
    fn test_pause_throttle_is_transparent() {
        let mut sim = Simulation {
            speed: SimSpeed::Paused,
            ..Default::default()
        };
        for _ in 0..10 {
            assert!(!sim.should_advance());
        }
        assert_eq!(sim.speed_cycle, 0);

        sim.speed = SimSpeed::Medium;
        let advanced = (0..8).filter(|_| sim.should_advance()).count();
        assert_eq!(advanced, 4);

        sim.speed = SimSpeed::Fast;
        assert!(sim.should_advance());

        sim.speed = SimSpeed::Slow;
        let advanced = (0..8).filter(|_| sim.should_advance()).count();
        assert_eq!(advanced, 2);
    }

    #[test]
    fn test_calendar_helpers() {
        let sim = Simulation {
            city_time: 100,
            ..Default::default()
        };
        assert_eq!(sim.year(), 2);
        assert_eq!(sim.month(), 1);
        assert_eq!(Simulation::default().year(), 0);
    }
}
