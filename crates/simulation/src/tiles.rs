//! Tile type codes and classification predicates.
//!
//! Codes are ordered so that range comparisons double as classifications:
//! everything below `FLOOD` is inert to the scanner, the repair pass restores
//! only codes in `[RUBBLE, ROAD_BASE)`, and the router's driveability test is
//! a pair of band checks. Zone bands are arithmetic: each `(tier, variant)`
//! pair owns a block of nine consecutive codes forming the 3x3 footprint in
//! row-major order, with the center at offset 4.

pub const DIRT: u16 = 0;

// Natural terrain. Water and trees feed the terrain-density survey.
pub const RIVER: u16 = 2;
pub const CHANNEL: u16 = 4;
pub const LAST_WATER: u16 = 20;
pub const TREE_BASE: u16 = 21;
pub const WOODS: u16 = 37;
pub const LAST_TREE: u16 = 43;

pub const RUBBLE: u16 = 44;
pub const LAST_RUBBLE: u16 = 47;
pub const FLOOD: u16 = 48;
pub const LAST_FLOOD: u16 = 51;
pub const RADIATION: u16 = 52;
pub const FIRE: u16 = 56;
pub const LAST_FIRE: u16 = 63;

// Transport and power carriers.
pub const ROAD_BASE: u16 = 64;
pub const ROADS: u16 = 66;
pub const LIGHT_TRAFFIC_BASE: u16 = 80;
pub const HEAVY_TRAFFIC_BASE: u16 = 144;
pub const WIRE_BASE: u16 = 208;
pub const WIRE_H: u16 = 208;
pub const WIRE_V: u16 = 209;
pub const RAIL_BASE: u16 = 224;
pub const RAILS: u16 = 226;

// Zone families. Each family starts with one empty-footprint block, followed
// by `max_tier * 4` populated blocks (four land-value variants per tier).
pub const ZONE_FOOTPRINT: u16 = 9;
pub const ZONE_CENTER_OFFSET: u16 = 4;
pub const VARIANTS_PER_TIER: u16 = 4;

pub const RES_BASE: u16 = 240;
pub const RES_CLR: u16 = RES_BASE + ZONE_CENTER_OFFSET;
pub const RES_POP_BASE: u16 = RES_BASE + ZONE_FOOTPRINT;
pub const RES_MAX_TIER: u8 = 4;
pub const LAST_RES: u16 = RES_POP_BASE + RES_MAX_TIER as u16 * VARIANTS_PER_TIER * ZONE_FOOTPRINT - 1;

pub const COM_BASE: u16 = 423;
pub const COM_CLR: u16 = COM_BASE + ZONE_CENTER_OFFSET;
pub const COM_POP_BASE: u16 = COM_BASE + ZONE_FOOTPRINT;
pub const COM_MAX_TIER: u8 = 5;
pub const LAST_COM: u16 = COM_POP_BASE + COM_MAX_TIER as u16 * VARIANTS_PER_TIER * ZONE_FOOTPRINT - 1;

pub const IND_BASE: u16 = 612;
pub const IND_CLR: u16 = IND_BASE + ZONE_CENTER_OFFSET;
pub const IND_POP_BASE: u16 = IND_BASE + ZONE_FOOTPRINT;
pub const IND_MAX_TIER: u8 = 4;
pub const LAST_IND: u16 = IND_POP_BASE + IND_MAX_TIER as u16 * VARIANTS_PER_TIER * ZONE_FOOTPRINT - 1;

pub const FARM_BASE: u16 = 765;
pub const FARM_CLR: u16 = FARM_BASE + ZONE_CENTER_OFFSET;
pub const FARM_POP_BASE: u16 = FARM_BASE + ZONE_FOOTPRINT;
pub const FARM_MAX_TIER: u8 = 3;
pub const LAST_FARM: u16 =
    FARM_POP_BASE + FARM_MAX_TIER as u16 * VARIANTS_PER_TIER * ZONE_FOOTPRINT - 1;

// Service buildings. The footprint convention matches zones: the center sits
// at local offset (1, 1), i.e. index `size + 1` into the sequential block.
pub const SEAPORT_BASE: u16 = 882;
pub const SEAPORT: u16 = SEAPORT_BASE + 5;
pub const AIRPORT_BASE: u16 = 898;
pub const AIRPORT: u16 = AIRPORT_BASE + 7;
pub const COAL_BASE: u16 = 934;
pub const COAL_PLANT: u16 = COAL_BASE + 5;
pub const LAST_COAL: u16 = COAL_BASE + 15;
pub const NUCLEAR_BASE: u16 = 950;
pub const NUCLEAR_PLANT: u16 = NUCLEAR_BASE + 5;
pub const FIRE_STATION_BASE: u16 = 966;
pub const FIRE_STATION: u16 = FIRE_STATION_BASE + 4;
pub const POLICE_STATION_BASE: u16 = 975;
pub const POLICE_STATION: u16 = POLICE_STATION_BASE + 4;
pub const STADIUM_BASE: u16 = 984;
pub const STADIUM: u16 = STADIUM_BASE + 5;

// Irrigation carriers.
pub const WATER_PUMP: u16 = 1000;
pub const AQUEDUCT_BASE: u16 = 1001;
pub const AQUEDUCT_H: u16 = 1001;
pub const AQUEDUCT_V: u16 = 1002;
pub const LAST_AQUEDUCT: u16 = 1016;

pub const LAST_TILE: u16 = LAST_AQUEDUCT;

#[inline]
pub fn is_water(v: u16) -> bool {
    (RIVER..=LAST_WATER).contains(&v)
}

#[inline]
pub fn is_tree(v: u16) -> bool {
    (TREE_BASE..=LAST_TREE).contains(&v)
}

/// Natural terrain that contributes to the terrain-density survey.
#[inline]
pub fn is_natural(v: u16) -> bool {
    v != DIRT && v < RUBBLE
}

#[inline]
pub fn is_rubble(v: u16) -> bool {
    (RUBBLE..=LAST_RUBBLE).contains(&v)
}

#[inline]
pub fn is_flood(v: u16) -> bool {
    (FLOOD..=LAST_FLOOD).contains(&v)
}

#[inline]
pub fn is_radioactive(v: u16) -> bool {
    (RADIATION..FIRE).contains(&v)
}

#[inline]
pub fn is_fire(v: u16) -> bool {
    (FIRE..=LAST_FIRE).contains(&v)
}

#[inline]
pub fn is_road(v: u16) -> bool {
    (ROAD_BASE..WIRE_BASE).contains(&v)
}

#[inline]
pub fn is_wire(v: u16) -> bool {
    (WIRE_BASE..RAIL_BASE).contains(&v)
}

#[inline]
pub fn is_rail(v: u16) -> bool {
    (RAIL_BASE..RES_BASE).contains(&v)
}

/// Traffic can travel over roads and rails but not bare power wires.
#[inline]
pub fn is_driveable(v: u16) -> bool {
    v >= ROAD_BASE && v < RES_BASE && !is_wire(v)
}

#[inline]
pub fn is_residential(v: u16) -> bool {
    (RES_BASE..=LAST_RES).contains(&v)
}

#[inline]
pub fn is_commercial(v: u16) -> bool {
    (COM_BASE..=LAST_COM).contains(&v)
}

#[inline]
pub fn is_industrial(v: u16) -> bool {
    (IND_BASE..=LAST_IND).contains(&v)
}

#[inline]
pub fn is_farm(v: u16) -> bool {
    (FARM_BASE..=LAST_FARM).contains(&v)
}

// Zone-center predicates for the dispatch table. Within a family band the
// center is the fifth code of its nine-code footprint block, so centrality
// is recoverable from the value alone.
#[inline]
fn is_center_of(v: u16, base: u16) -> bool {
    (v - base) % ZONE_FOOTPRINT == ZONE_CENTER_OFFSET
}

#[inline]
pub fn is_residential_center(v: u16) -> bool {
    is_residential(v) && is_center_of(v, RES_BASE)
}

#[inline]
pub fn is_commercial_center(v: u16) -> bool {
    is_commercial(v) && is_center_of(v, COM_BASE)
}

#[inline]
pub fn is_industrial_center(v: u16) -> bool {
    is_industrial(v) && is_center_of(v, IND_BASE)
}

#[inline]
pub fn is_farm_center(v: u16) -> bool {
    is_farm(v) && is_center_of(v, FARM_BASE)
}

/// Water carriers: aqueducts, pumps, and farm centers (irrigation runs
/// through fields the way power runs through zone centers).
#[inline]
pub fn is_hydraulic(v: u16) -> bool {
    (AQUEDUCT_BASE..=LAST_AQUEDUCT).contains(&v) || v == WATER_PUMP || is_farm_center(v)
}

/// Decode the population tier from a zone-center code. `base` is the
/// family's first code.
#[inline]
pub fn zone_tier(v: u16, base: u16) -> u8 {
    let pop_base = base + ZONE_FOOTPRINT;
    if v < pop_base {
        0
    } else {
        ((v - pop_base) / ZONE_FOOTPRINT / VARIANTS_PER_TIER) as u8 + 1
    }
}

/// Encode a zone-center code for `(tier, variant)`. Tier 0 has a single
/// footprint block; the variant is ignored there.
#[inline]
pub fn zone_center(base: u16, tier: u8, variant: u8) -> u16 {
    debug_assert!(variant < VARIANTS_PER_TIER as u8);
    if tier == 0 {
        base + ZONE_CENTER_OFFSET
    } else {
        let block = (tier as u16 - 1) * VARIANTS_PER_TIER + variant as u16;
        base + ZONE_FOOTPRINT + block * ZONE_FOOTPRINT + ZONE_CENTER_OFFSET
    }
}

/// First code of the footprint block a zone-center code belongs to.
#[inline]
pub fn footprint_base(center: u16) -> u16 {
    center - ZONE_CENTER_OFFSET
}

/// Footprint edge length for a zone-center code. Zone families and the
/// small stations are 3x3; the large service buildings are bigger.
pub fn footprint_size(center: u16) -> i32 {
    match center {
        AIRPORT => 6,
        SEAPORT | COAL_PLANT | NUCLEAR_PLANT | STADIUM => 4,
        WATER_PUMP => 1,
        _ => 3,
    }
}

/// Pollution emitted per scan by a tile of this type.
pub fn pollution_value(v: u16) -> i16 {
    if v < WIRE_BASE {
        if v >= HEAVY_TRAFFIC_BASE {
            return 75;
        }
        if v >= LIGHT_TRAFFIC_BASE {
            return 50;
        }
        if v < ROAD_BASE {
            if v >= FIRE {
                return 90;
            }
            if v >= RADIATION {
                return 255;
            }
        }
        return 0;
    }
    // Populated industrial lots emit; empty industrial zones do not.
    if is_industrial(v) {
        return if v >= IND_POP_BASE { 50 } else { 0 };
    }
    // Seaport, airport, and the coal plant share the heavy-emitter band.
    if (SEAPORT_BASE..=LAST_COAL).contains(&v) {
        return 100;
    }
    0
}
