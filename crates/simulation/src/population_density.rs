//! Population-density survey, city centre, and commercial centrality.
//!
//! Zone centers project their population onto the density map, which is
//! then triple-smoothed so peaks bleed into the surrounding blocks. The
//! same walk over the centers computes the mean zone position; that centre
//! feeds the commercial centrality map every scoring pass reads.

use crate::block_map::{smooth, BlockMap};
use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::grid::TileGrid;
use crate::land_value::city_centre_distance;
use crate::tiles::{
    is_commercial, is_farm, is_industrial, is_residential, zone_tier, COM_BASE, FARM_BASE,
    IND_BASE, RES_BASE,
};

/// Raw per-center density cap before smoothing.
const DENSITY_CAP: i16 = 254;

/// Zone population on the shared 8-per-tier scale regardless of family.
fn equalized_population(v: u16) -> i16 {
    let tier = if is_residential(v) {
        zone_tier(v, RES_BASE)
    } else if is_commercial(v) {
        zone_tier(v, COM_BASE)
    } else if is_industrial(v) {
        zone_tier(v, IND_BASE)
    } else if is_farm(v) {
        zone_tier(v, FARM_BASE)
    } else {
        return 0;
    };
    tier as i16 * 8
}

pub fn population_density_scan(grid: &TileGrid, maps: &mut BlockMaps, census: &mut Census) {
    let mut raw = BlockMap::new(maps.population_density.block_size);
    let mut x_total: usize = 0;
    let mut y_total: usize = 0;
    let mut centers: usize = 0;

    for y in 0..grid.height {
        for x in 0..grid.width {
            let cell = grid.get(x, y);
            if !cell.is_zone_center() {
                continue;
            }
            x_total += x;
            y_total += y;
            centers += 1;
            let density = (equalized_population(cell.tile_type) * 8).min(DENSITY_CAP);
            raw.world_set(x, y, density);
        }
    }

    let smoothed = smooth(&smooth(&smooth(&raw)));
    for by in 0..smoothed.height {
        for bx in 0..smoothed.width {
            maps.population_density.set(bx, by, smoothed.get(bx, by) * 2);
        }
    }

    // Service buildings count toward the centre even though they carry no
    // population.
    census.city_centre = if centers > 0 {
        (x_total / centers, y_total / centers)
    } else {
        (grid.width / 2, grid.height / 2)
    };

    compute_com_rate(maps, census);
}

/// Centrality score per 8x8 block: +64 at the city centre falling to -64 at
/// the distance cap. Commercial zones use it as their location term.
fn compute_com_rate(maps: &mut BlockMaps, census: &Census) {
    for by in 0..maps.com_rate.height {
        for bx in 0..maps.com_rate.width {
            let dist = city_centre_distance(
                census,
                bx * maps.com_rate.block_size,
                by * maps.com_rate.block_size,
            ) / 2;
            maps.com_rate.set(bx, by, 64 - dist * 4);
        }
    }
}
