//! Yearly city evaluation.
//!
//! Rates the city 0..=1000 from the census problem indicators, tracks the
//! year-over-year population delta, and classifies the city by size. Class
//! upgrades push a `CityGrewTo` message; the survey and approval figures are
//! plain data for a frontend to display.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::block_maps::BlockMaps;
use crate::budget::{CityBudget, MAX_FIRE_EFFECT, MAX_POLICE_EFFECT, MAX_ROAD_EFFECT};
use crate::census::Census;
use crate::messages::{Message, MessageLog};
use crate::random::SimRandom;
use crate::valves::Valves;

pub const PROBLEM_COUNT: usize = 7;

const BASE_SCORE: i32 = 500;
const SCORE_MAX: i32 = 1000;
/// Each suppressed demand valve or missing unique building costs 15%.
const CAP_PENALTY: f32 = 0.85;
const SLUMP_PENALTY: f32 = 0.85;
const SLUMP_VALVE: i16 = -1000;
const SURVEY_BALLOTS: u32 = 100;
const SURVEY_ROUNDS: usize = 600;
const APPROVAL_BALLOTS: u32 = 100;

/// City size classes in ascending order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub enum CityClass {
    Village,
    Town,
    City,
    Capital,
    Metropolis,
    Megalopolis,
}

impl CityClass {
    pub const ALL: &'static [CityClass] = &[
        CityClass::Village,
        CityClass::Town,
        CityClass::City,
        CityClass::Capital,
        CityClass::Metropolis,
        CityClass::Megalopolis,
    ];

    /// Population a city must exceed to graduate into this class.
    pub fn required_population(self) -> i64 {
        match self {
            CityClass::Village => 0,
            CityClass::Town => 2_000,
            CityClass::City => 10_000,
            CityClass::Capital => 50_000,
            CityClass::Metropolis => 100_000,
            CityClass::Megalopolis => 500_000,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CityClass::Village => "Village",
            CityClass::Town => "Town",
            CityClass::City => "City",
            CityClass::Capital => "Capital",
            CityClass::Metropolis => "Metropolis",
            CityClass::Megalopolis => "Megalopolis",
        }
    }

    /// Index into the class ladder, 0-5; the `CityGrewTo` payload.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// The class a city of the given population belongs to.
    pub fn for_population(population: i64) -> CityClass {
        let mut class = CityClass::Village;
        for &candidate in Self::ALL {
            if population > candidate.required_population() {
                class = candidate;
            }
        }
        class
    }
}

/// The survey categories residents complain about, in ballot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityProblem {
    Crime,
    Pollution,
    HousingCost,
    Taxes,
    Traffic,
    Unemployment,
    Fire,
}

impl CityProblem {
    pub const ALL: &'static [CityProblem] = &[
        CityProblem::Crime,
        CityProblem::Pollution,
        CityProblem::HousingCost,
        CityProblem::Taxes,
        CityProblem::Traffic,
        CityProblem::Unemployment,
        CityProblem::Fire,
    ];
}

/// The mayor's report card, refreshed by the yearly evaluation.
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct CityEvaluation {
    pub city_class: CityClass,
    pub city_population: i64,
    pub population_delta: i64,
    /// Taxable infrastructure value in currency units.
    pub assessed_value: i64,
    /// Overall rating 0..=1000, blended half-and-half with the prior year.
    pub city_score: i32,
    pub score_delta: i32,
    /// "What is the city's worst problem?" survey tallies, by ballot order.
    pub problem_votes: [u16; PROBLEM_COUNT],
    /// Percentage of residents approving of the mayor.
    pub approval: u8,
}

impl Default for CityEvaluation {
    fn default() -> Self {
        Self {
            city_class: CityClass::Village,
            city_population: 0,
            population_delta: 0,
            assessed_value: 0,
            city_score: BASE_SCORE,
            score_delta: 0,
            problem_votes: [0; PROBLEM_COUNT],
            approval: 50,
        }
    }
}

/// Full evaluation pass: population and class, assessed value, the problem
/// survey, the city score, and the approval poll. Runs yearly from the
/// scheduler and once when a city is first loaded.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    eval: &mut CityEvaluation,
    census: &mut Census,
    maps: &BlockMaps,
    budget: &CityBudget,
    valves: &Valves,
    messages: &mut MessageLog,
    rng: &mut dyn RngCore,
    city_time: u64,
) {
    let population = census.scaled_population();
    if population == 0 {
        *eval = CityEvaluation::default();
        return;
    }

    eval.population_delta = population - eval.city_population;
    eval.city_population = population;
    eval.assessed_value = assessed_value(census);

    let previous_class = eval.city_class;
    eval.city_class = CityClass::for_population(population);
    if eval.city_class > previous_class {
        messages.push(Message::CityGrewTo(eval.city_class.index()), city_time);
    }

    // The survey reads the traffic figure the advisories also use; it is
    // refreshed here and stays until the next evaluation.
    census.traffic_average = traffic_average(maps);

    let problems = problem_table(census, budget);
    vote_problems(&mut eval.problem_votes, &problems, rng);

    let score = score_city(
        census,
        budget,
        valves,
        &problems,
        eval.population_delta,
        population,
    );
    let previous_score = eval.city_score;
    eval.city_score = (previous_score + score) / 2;
    eval.score_delta = eval.city_score - previous_score;
    eval.approval = approval_poll(eval.city_score, rng);
}

/// Infrastructure book value: transport by tile, buildings by kind.
fn assessed_value(census: &Census) -> i64 {
    let mut value = census.road_total as i64 * 5;
    value += census.rail_total as i64 * 10;
    value += census.police_station_count as i64 * 1000;
    value += census.fire_station_count as i64 * 1000;
    value += census.stadium_count as i64 * 3000;
    value += census.seaport_count as i64 * 5000;
    value += census.airport_count as i64 * 10_000;
    value += census.coal_plant_count as i64 * 3000;
    value += census.nuclear_plant_count as i64 * 6000;
    value += census.pump_count as i64 * 500;
    value * 1000
}

/// Mean traffic density over land-valued blocks, scaled up 2.4x so jams
/// register on the same 0..=255 scale as the other problems.
fn traffic_average(maps: &BlockMaps) -> i16 {
    let mut total: i64 = 0;
    let mut count: i64 = 1;
    for ((bx, by), land) in maps.land_value.iter() {
        if land > 0 {
            total += maps.traffic_density.get(bx, by) as i64;
            count += 1;
        }
    }
    ((total / count) * 12 / 5) as i16
}

/// Severity 0..=255 per survey category.
fn problem_table(census: &Census, budget: &CityBudget) -> [i16; PROBLEM_COUNT] {
    let mut table = [0i16; PROBLEM_COUNT];
    table[CityProblem::Crime as usize] = census.crime_average;
    table[CityProblem::Pollution as usize] = census.pollution_average;
    table[CityProblem::HousingCost as usize] = census.land_value_average * 7 / 10;
    table[CityProblem::Taxes as usize] = budget.city_tax as i16 * 10;
    table[CityProblem::Traffic as usize] = census.traffic_average * 2 / 3;
    table[CityProblem::Unemployment as usize] = unemployment_problem(census);
    table[CityProblem::Fire as usize] = fire_problem(census);
    table
}

fn unemployment_problem(census: &Census) -> i16 {
    let jobs = (census.com_pop + census.employment_pop()) * 8;
    if jobs == 0 {
        return 0;
    }
    let ratio = census.res_pop as f32 / jobs as f32;
    (((ratio - 1.0) * 255.0) as i16).clamp(0, 255)
}

fn fire_problem(census: &Census) -> i16 {
    (census.fire_count * 5).min(255) as i16
}

/// Round-robin ballot: each resident polled names the first category whose
/// severity beats their tolerance roll, until the ballots or the rounds run
/// out.
fn vote_problems(
    votes: &mut [u16; PROBLEM_COUNT],
    table: &[i16; PROBLEM_COUNT],
    rng: &mut dyn RngCore,
) {
    *votes = [0; PROBLEM_COUNT];
    let mut cast = 0;
    let mut problem = 0;
    for _ in 0..SURVEY_ROUNDS {
        if cast >= SURVEY_BALLOTS {
            break;
        }
        if (rng.get_random(300) as i16) < table[problem] {
            votes[problem] += 1;
            cast += 1;
        }
        problem = (problem + 1) % PROBLEM_COUNT;
    }
}

/// This year's raw score before blending. Starts from the inverted problem
/// total, then pays for suppressed demand, crumbling services, slumping
/// valves, population momentum, active fires, the tax rate, and blackouts.
fn score_city(
    census: &Census,
    budget: &CityBudget,
    valves: &Valves,
    problems: &[i16; PROBLEM_COUNT],
    population_delta: i64,
    population: i64,
) -> i32 {
    let total: i32 = problems.iter().map(|&p| p as i32).sum();
    let total = (total / 3).min(256);
    let mut score = ((256 - total) * 4).clamp(0, SCORE_MAX) as f32;

    if census.res_cap {
        score *= CAP_PENALTY;
    }
    if census.com_cap {
        score *= CAP_PENALTY;
    }
    if census.ind_cap {
        score *= CAP_PENALTY;
    }
    if budget.road_effect < MAX_ROAD_EFFECT {
        score -= (MAX_ROAD_EFFECT - budget.road_effect) as f32;
    }
    if budget.police_effect < MAX_POLICE_EFFECT {
        score *= 0.9 + budget.police_effect as f32 / 10_000.1;
    }
    if budget.fire_effect < MAX_FIRE_EFFECT {
        score *= 0.9 + budget.fire_effect as f32 / 10_000.1;
    }
    if valves.res_valve < SLUMP_VALVE {
        score *= SLUMP_PENALTY;
    }
    if valves.com_valve < SLUMP_VALVE {
        score *= SLUMP_PENALTY;
    }
    if valves.ind_valve < SLUMP_VALVE {
        score *= SLUMP_PENALTY;
    }

    let momentum = if population_delta == 0 || population_delta == population {
        1.0
    } else if population_delta > 0 {
        population_delta as f32 / population as f32 + 1.0
    } else {
        0.95 + population_delta as f32 / (population - population_delta) as f32
    };
    score *= momentum;

    score -= fire_problem(census) as f32;
    score -= budget.city_tax as f32;

    let zones = census.powered_zone_count + census.unpowered_zone_count;
    if zones > 0 {
        score *= census.powered_zone_count as f32 / zones as f32;
    }

    (score as i32).clamp(0, SCORE_MAX)
}

fn approval_poll(score: i32, rng: &mut dyn RngCore) -> u8 {
    let mut yes = 0u32;
    for _ in 0..APPROVAL_BALLOTS {
        if (rng.get_random(1000) as i32) < score {
            yes += 1;
        }
    }
    yes as u8
}

impl crate::Saveable for CityEvaluation {
    const SAVE_KEY: &'static str = "evaluation";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
