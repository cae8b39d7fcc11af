//! Road-network trip routing.
//!
//! Zones prove they are connected to the rest of the city by driving a
//! random walk along roads and rails. The walk starts from the first
//! driveable cell on the ring just outside the zone footprint, wanders up
//! to thirty steps without reversing, and succeeds the moment any cell
//! adjacent to the driver matches the destination predicate. Successful
//! trips deposit congestion along the remembered waypoints.

use rand::RngCore;

use crate::block_maps::{BlockMaps, TRAFFIC_MAX};
use crate::context::SimContext;
use crate::grid::TileGrid;
use crate::messages::{Message, MessageLog};
use crate::random::SimRandom;
use crate::tiles::{is_driveable, ROAD_BASE, WIRE_BASE};

/// Step budget for one trip attempt.
pub const MAX_TRAFFIC_DISTANCE: u32 = 30;

/// Congestion deposited on each remembered waypoint of a successful trip.
const TRAFFIC_PER_TRIP: i16 = 50;

/// The twelve cells ringing a 3x3 zone footprint, scanned in fixed order.
const PERIM_X: [i32; 12] = [-1, 0, 1, 2, 2, 2, 1, 0, -1, -2, -2, -2];
const PERIM_Y: [i32; 12] = [-2, -2, -2, -1, 0, 1, 2, 2, 2, 1, 0, -1];

/// Cardinal directions in clockwise order starting north.
const DX: [i32; 4] = [0, 1, 0, -1];
const DY: [i32; 4] = [-1, 0, 1, 0];

/// What a zone learns from one routing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteResult {
    /// A trip reached the destination; congestion was recorded.
    RouteFound,
    /// A road ring exists but every walk dead-ended or ran out of steps.
    NoRouteFound,
    /// No driveable cell borders the zone at all.
    NoRoadFound,
}

/// Destination test applied to tiles adjacent to the driver.
pub type DestPredicate = fn(u16) -> bool;

/// Routes one trip for the zone centered at `(x, y)`.
pub fn make_traffic(
    grid: &TileGrid,
    ctx: &mut SimContext<'_>,
    x: usize,
    y: usize,
    dest: DestPredicate,
) -> RouteResult {
    let Some((start_x, start_y)) = find_perimeter_road(grid, x, y) else {
        return RouteResult::NoRoadFound;
    };
    let mut positions = Vec::with_capacity(MAX_TRAFFIC_DISTANCE as usize / 2);
    if try_drive(grid, ctx.rng, start_x, start_y, dest, &mut positions) {
        add_traffic(
            grid,
            ctx.maps,
            ctx.rng,
            ctx.messages,
            ctx.city_time,
            &positions,
        );
        RouteResult::RouteFound
    } else {
        RouteResult::NoRouteFound
    }
}

/// First driveable cell on the perimeter ring, in table order.
pub fn find_perimeter_road(grid: &TileGrid, x: usize, y: usize) -> Option<(usize, usize)> {
    for i in 0..PERIM_X.len() {
        let Some((px, py)) = grid.offset(x, y, PERIM_X[i], PERIM_Y[i]) else {
            continue;
        };
        if is_driveable(grid.value(px, py)) {
            return Some((px, py));
        }
    }
    None
}

/// Random walk from a road cell toward anything matching `dest`.
///
/// Waypoints are remembered every other step. At a dead end one waypoint is
/// traded for three extra steps of budget; when none remain the trip fails.
pub fn try_drive(
    grid: &TileGrid,
    rng: &mut dyn RngCore,
    start_x: usize,
    start_y: usize,
    dest: DestPredicate,
    positions: &mut Vec<(usize, usize)>,
) -> bool {
    let mut x = start_x;
    let mut y = start_y;
    let mut last_dir: Option<usize> = None;
    let mut dist: u32 = 0;
    while dist < MAX_TRAFFIC_DISTANCE {
        if let Some(dir) = try_go(grid, rng, x, y, last_dir) {
            let Some((nx, ny)) = grid.offset(x, y, DX[dir], DY[dir]) else {
                return false;
            };
            x = nx;
            y = ny;
            last_dir = Some((dir + 2) & 3);
            if dist & 1 == 1 {
                positions.push((x, y));
            }
            if drive_done(grid, x, y, dest) {
                return true;
            }
        } else if !positions.is_empty() {
            positions.pop();
            dist += 3;
        } else {
            return false;
        }
        dist += 1;
    }
    false
}

/// Picks the next direction: the sole open one when there is no choice,
/// otherwise a random draw with clockwise retry. Never reverses.
fn try_go(
    grid: &TileGrid,
    rng: &mut dyn RngCore,
    x: usize,
    y: usize,
    exclude: Option<usize>,
) -> Option<usize> {
    let mut open = [false; 4];
    let mut count = 0;
    for dir in 0..4 {
        if Some(dir) == exclude {
            continue;
        }
        if let Some((nx, ny)) = grid.offset(x, y, DX[dir], DY[dir]) {
            if is_driveable(grid.value(nx, ny)) {
                open[dir] = true;
                count += 1;
            }
        }
    }
    match count {
        0 => None,
        1 => open.iter().position(|&o| o),
        _ => {
            let mut dir = (rng.get_random16() & 3) as usize;
            while !open[dir] {
                dir = (dir + 1) & 3;
            }
            Some(dir)
        }
    }
}

/// Destination check against the driver's four neighbors, north first.
fn drive_done(grid: &TileGrid, x: usize, y: usize, dest: DestPredicate) -> bool {
    for dir in 0..4 {
        if let Some((nx, ny)) = grid.offset(x, y, DX[dir], DY[dir]) {
            if dest(grid.value(nx, ny)) {
                return true;
            }
        }
    }
    false
}

/// Deposits congestion on every remembered waypoint still in the road
/// band. Saturated cells stay at the cap and occasionally flag themselves
/// for a traffic-watch flyover.
fn add_traffic(
    grid: &TileGrid,
    maps: &mut BlockMaps,
    rng: &mut dyn RngCore,
    messages: &mut MessageLog,
    city_time: u64,
    positions: &[(usize, usize)],
) {
    for &(x, y) in positions {
        let value = grid.value(x, y);
        if !(ROAD_BASE..WIRE_BASE).contains(&value) {
            continue;
        }
        let mut traffic = maps.traffic_density.world_get(x, y) + TRAFFIC_PER_TRIP;
        if traffic > TRAFFIC_MAX {
            traffic = TRAFFIC_MAX;
            if rng.get_random(5) == 0 {
                messages.push(
                    Message::AttractHelicopter {
                        x: x as u16,
                        y: y as u16,
                    },
                    city_time,
                );
            }
        }
        maps.traffic_density.world_set(x, y, traffic);
    }
}
