//! # Test harness for Gridpolis
//!
//! [`SimState`] owns one of every simulation resource so unit tests can
//! drive individual tile handlers and passes without spinning up an App.
//! The integration harness wrapping `bevy::app::App` lives further down as
//! [`TestCity`].

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::RngCore;

use crate::block_maps::BlockMaps;
use crate::budget::CityBudget;
use crate::census::Census;
use crate::config::{GameLevel, PHASE_COUNT};
use crate::context::SimContext;
use crate::disasters::DisasterState;
use crate::evaluation::CityEvaluation;
use crate::grid::{TileFlags, TileGrid};
use crate::irrigation::WaterScan;
use crate::messages::{Message, MessageLog};
use crate::power::PowerScan;
use crate::random::SimRng;
use crate::repair::RepairRegistry;
use crate::scheduler::{SimSpeed, Simulation};
use crate::tiles::{
    footprint_base, zone_center, COAL_PLANT, FIRE_STATION, POLICE_STATION, ROADS, WATER_PUMP,
    WIRE_H, WIRE_V,
};
use crate::valves::Valves;
use crate::zones::zone_plop;
use crate::SimulationPlugin;

/// One of everything a [`SimContext`] borrows, plus the grid.
pub struct SimState {
    pub grid: TileGrid,
    pub census: Census,
    pub valves: Valves,
    pub maps: BlockMaps,
    pub budget: CityBudget,
    pub messages: MessageLog,
    pub power: PowerScan,
    pub water: WaterScan,
    pub repair: RepairRegistry,
    pub disasters: DisasterState,
    pub city_time: u64,
    pub level: GameLevel,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            grid: TileGrid::default(),
            census: Census::default(),
            valves: Valves::default(),
            maps: BlockMaps::default(),
            budget: CityBudget::default(),
            messages: MessageLog::default(),
            power: PowerScan::default(),
            water: WaterScan::default(),
            repair: RepairRegistry::default(),
            disasters: DisasterState::default(),
            city_time: 0,
            level: GameLevel::Medium,
        }
    }

    /// Runs `f` against a [`SimContext`] assembled from this state, the
    /// same way the phase scheduler assembles one from ECS resources.
    pub fn run<R>(
        &mut self,
        rng: &mut dyn RngCore,
        f: impl FnOnce(&mut TileGrid, &mut SimContext<'_>) -> R,
    ) -> R {
        let mut ctx = SimContext {
            census: &mut self.census,
            valves: &self.valves,
            maps: &mut self.maps,
            budget: &self.budget,
            rng,
            messages: &mut self.messages,
            power: &mut self.power,
            water: &mut self.water,
            repair: &self.repair,
            disasters: &mut self.disasters,
            city_time: self.city_time,
            level: self.level,
        };
        f(&mut self.grid, &mut ctx)
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TestCity
// ---------------------------------------------------------------------------

/// A headless Bevy App wrapping [`SimulationPlugin`] for integration tests.
///
/// Use the builder methods to lay out a city, then `tick()` or
/// `run_cycles()` to advance the scheduler and assert on the resources.
/// Time advances by exactly one fixed timestep per tick via
/// [`TimeUpdateStrategy::ManualDuration`], so runs are fully deterministic.
pub struct TestCity {
    app: App,
}

impl TestCity {
    /// An empty dirt map at Fast speed with the random disaster wheel off
    /// and the default RNG seed. Externally triggered disasters still work.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);

        let step = app.world().resource::<Time<Fixed>>().timestep();
        app.insert_resource(TimeUpdateStrategy::ManualDuration(step));
        app.world_mut().resource_mut::<Simulation>().speed = SimSpeed::Fast;
        app.world_mut().resource_mut::<DisasterState>().enabled = false;

        // First update initializes the clock without firing FixedUpdate.
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern, consumes and returns Self)
    // -----------------------------------------------------------------------

    /// Reseed the simulation RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.app.insert_resource(SimRng::from_seed_u64(seed));
        self
    }

    pub fn with_level(mut self, level: GameLevel) -> Self {
        self.app.insert_resource(level);
        self
    }

    pub fn with_speed(mut self, speed: SimSpeed) -> Self {
        self.app.world_mut().resource_mut::<Simulation>().speed = speed;
        self
    }

    /// Turn the random disaster wheel back on.
    pub fn with_disasters(mut self) -> Self {
        self.app
            .world_mut()
            .resource_mut::<DisasterState>()
            .enabled = true;
        self
    }

    pub fn with_funds(mut self, funds: i64) -> Self {
        self.app
            .world_mut()
            .resource_mut::<CityBudget>()
            .total_funds = funds;
        self
    }

    pub fn with_tax(mut self, tax: u8) -> Self {
        self.app.world_mut().resource_mut::<CityBudget>().city_tax = tax;
        self
    }

    /// Write one raw cell.
    pub fn with_tile(mut self, x: usize, y: usize, value: u16, flags: TileFlags) -> Self {
        self.app
            .world_mut()
            .resource_mut::<TileGrid>()
            .set(x, y, value, flags);
        self
    }

    /// Lay an axis-aligned road run between two cells (inclusive).
    pub fn with_road(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        debug_assert!(x0 == x1 || y0 == y1, "roads are laid along one axis");
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                grid.set(x, y, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
            }
        }
        self
    }

    /// Lay an axis-aligned power wire run between two cells (inclusive).
    pub fn with_wire(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        debug_assert!(x0 == x1 || y0 == y1, "wires are laid along one axis");
        let value = if y0 == y1 { WIRE_H } else { WIRE_V };
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                grid.set(x, y, value, TileFlags::CONDUCTIVE | TileFlags::BULLDOZABLE);
            }
        }
        self
    }

    /// Plop an empty 3x3 zone of the given family (`RES_BASE`, `COM_BASE`,
    /// `IND_BASE`, or `FARM_BASE`) centered at `(x, y)`.
    pub fn with_zone(mut self, x: usize, y: usize, base: u16) -> Self {
        let center = zone_center(base, 0, 0);
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        assert!(
            zone_plop(&mut grid, x, y, footprint_base(center)),
            "zone footprint at ({x}, {y}) was blocked"
        );
        self
    }

    /// Plop a 4x4 coal plant centered at `(x, y)`.
    pub fn with_coal_plant(mut self, x: usize, y: usize) -> Self {
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        building_plop(&mut grid, x, y, COAL_PLANT, 4);
        self
    }

    /// Plop a 3x3 fire station centered at `(x, y)`.
    pub fn with_fire_station(mut self, x: usize, y: usize) -> Self {
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        building_plop(&mut grid, x, y, FIRE_STATION, 3);
        self
    }

    /// Plop a 3x3 police station centered at `(x, y)`.
    pub fn with_police_station(mut self, x: usize, y: usize) -> Self {
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        building_plop(&mut grid, x, y, POLICE_STATION, 3);
        self
    }

    /// Place a single-cell water pump at `(x, y)`.
    pub fn with_pump(mut self, x: usize, y: usize) -> Self {
        self.app
            .world_mut()
            .resource_mut::<TileGrid>()
            .set(x, y, WATER_PUMP, TileFlags::BULLDOZABLE);
        self
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks. At Fast speed each tick advances exactly
    /// one scheduler phase.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Run N full 16-phase cycles. Only meaningful at Fast speed, where
    /// ticks and phases line up one to one.
    pub fn run_cycles(&mut self, n: u32) {
        assert_eq!(
            self.sim().speed,
            SimSpeed::Fast,
            "run_cycles assumes Fast speed"
        );
        self.tick(u32::from(PHASE_COUNT) * n);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn sim(&self) -> &Simulation {
        self.resource::<Simulation>()
    }

    pub fn grid(&self) -> &TileGrid {
        self.resource::<TileGrid>()
    }

    pub fn census(&self) -> &Census {
        self.resource::<Census>()
    }

    pub fn valves(&self) -> &Valves {
        self.resource::<Valves>()
    }

    pub fn budget(&self) -> &CityBudget {
        self.resource::<CityBudget>()
    }

    pub fn maps(&self) -> &BlockMaps {
        self.resource::<BlockMaps>()
    }

    pub fn messages(&self) -> &MessageLog {
        self.resource::<MessageLog>()
    }

    pub fn evaluation(&self) -> &CityEvaluation {
        self.resource::<CityEvaluation>()
    }

    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_tile(&self, x: usize, y: usize, expected: u16) {
        let value = self.grid().value(x, y);
        assert_eq!(value, expected, "expected tile {expected} at ({x}, {y}), found {value}");
    }

    pub fn assert_powered(&self, x: usize, y: usize) {
        assert!(
            self.grid().get(x, y).is_powered(),
            "expected ({x}, {y}) to be powered"
        );
    }

    pub fn assert_unpowered(&self, x: usize, y: usize) {
        assert!(
            !self.grid().get(x, y).is_powered(),
            "expected ({x}, {y}) to be unpowered"
        );
    }

    pub fn assert_message(&self, message: Message) {
        assert!(
            self.messages().contains(message),
            "expected message {message:?} in the log"
        );
    }

    pub fn assert_resource_exists<T: Resource>(&self) {
        assert!(
            self.app.world().get_resource::<T>().is_some(),
            "expected resource {} to exist",
            std::any::type_name::<T>()
        );
    }
}

/// Writes a square building footprint in the row-major sequence the repair
/// registry expects, flagging the center cell.
fn building_plop(grid: &mut TileGrid, x: usize, y: usize, center: u16, size: i32) {
    let mut code = center as i32 - 2 - size;
    for dy in -1..size - 1 {
        for dx in -1..size - 1 {
            code += 1;
            let Some((cx, cy)) = grid.offset(x, y, dx, dy) else {
                continue;
            };
            let mut flags =
                TileFlags::CONDUCTIVE | TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE;
            if cx == x && cy == y {
                flags |= TileFlags::ZONE_CENTER;
            }
            grid.set(cx, cy, code as u16, flags);
        }
    }
}
