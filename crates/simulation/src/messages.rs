//! Outbound message log.
//!
//! The simulation never draws or plays anything; everything a frontend (or a
//! sprite layer) would react to is pushed here as plain data, stamped with
//! city time. Advisory messages run on a cadence keyed off the low bits of
//! city time so only one condition is checked per time unit.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::budget::CityBudget;
use crate::census::Census;

/// Advisories repeat at most once per pass through the 64-unit cadence.
const MAX_MESSAGES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Message {
    // Growth advisories.
    NeedMoreResidential,
    NeedMoreCommercial,
    NeedMoreIndustrial,
    NeedMoreRoads,
    NeedMoreRail,
    NeedElectricity,
    NeedStadium,
    NeedSeaport,
    NeedAirport,
    NeedFireStation,
    NeedPoliceStation,
    // Quality-of-life warnings.
    Blackouts,
    HighPollution,
    HighCrime,
    TrafficJams,
    TaxTooHigh,
    RoadsNeedFunding,
    FireDeptNeedsFunding,
    PoliceNeedsFunding,
    // Network exhaustion.
    NotEnoughPower,
    NotEnoughWater,
    // Sprite-layer signals: positions are world tile coordinates.
    AttractHelicopter { x: u16, y: u16 },
    MonsterSighted { x: u16, y: u16 },
    FireReported { x: u16, y: u16 },
    FloodReported { x: u16, y: u16 },
    ExplosionReported { x: u16, y: u16 },
    NuclearMeltdown { x: u16, y: u16 },
    // Evaluation milestones. The payload is the new city-class index.
    CityGrewTo(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct MessageEntry {
    pub message: Message,
    pub time: u64,
}

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct MessageLog {
    entries: Vec<MessageEntry>,
}

impl MessageLog {
    /// Push a message, trimming the oldest entries past capacity.
    pub fn push(&mut self, message: Message, time: u64) {
        self.entries.push(MessageEntry { message, time });
        if self.entries.len() > MAX_MESSAGES {
            let excess = self.entries.len() - MAX_MESSAGES;
            self.entries.drain(0..excess);
        }
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&MessageEntry> {
        self.entries.last()
    }

    pub fn contains(&self, message: Message) -> bool {
        self.entries.iter().any(|e| e.message == message)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl crate::Saveable for MessageLog {
    const SAVE_KEY: &'static str = "message_log";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

/// Periodic advisories, one condition per city-time unit on a 64-unit wheel.
/// Also maintains the three demand-cap flags: a large city that still lacks
/// its stadium/seaport/airport has the matching valve frozen at zero.
pub fn send_messages(
    census: &mut Census,
    budget: &CityBudget,
    log: &mut MessageLog,
    city_time: u64,
) {
    let total_zones = census.total_zone_count();
    let powered = census.powered_zone_count;
    let unpowered = census.unpowered_zone_count;
    let total_pop = census.scaled_population();

    match city_time & 63 {
        1 => {
            if total_zones / 4 >= census.res_zone_count {
                log.push(Message::NeedMoreResidential, city_time);
            }
        }
        5 => {
            if total_zones / 8 >= census.com_zone_count {
                log.push(Message::NeedMoreCommercial, city_time);
            }
        }
        10 => {
            if total_zones / 8 >= census.ind_zone_count + census.farm_zone_count {
                log.push(Message::NeedMoreIndustrial, city_time);
            }
        }
        14 => {
            if total_zones > 10 && total_zones * 2 > census.road_total {
                log.push(Message::NeedMoreRoads, city_time);
            }
        }
        18 => {
            if total_zones > 50 && total_zones > census.rail_total {
                log.push(Message::NeedMoreRail, city_time);
            }
        }
        22 => {
            if total_zones > 10 && powered == 0 {
                log.push(Message::NeedElectricity, city_time);
            }
        }
        26 => {
            if census.res_pop > 500 && census.stadium_count == 0 {
                census.res_cap = true;
                log.push(Message::NeedStadium, city_time);
            } else {
                census.res_cap = false;
            }
        }
        28 => {
            if census.employment_pop() > 70 && census.seaport_count == 0 {
                census.ind_cap = true;
                log.push(Message::NeedSeaport, city_time);
            } else {
                census.ind_cap = false;
            }
        }
        30 => {
            if census.com_pop > 100 && census.airport_count == 0 {
                census.com_cap = true;
                log.push(Message::NeedAirport, city_time);
            } else {
                census.com_cap = false;
            }
        }
        32 => {
            let zone_count = powered + unpowered;
            if zone_count > 0 && (powered as f32 / zone_count as f32) < 0.7 {
                log.push(Message::Blackouts, city_time);
            }
        }
        35 => {
            if census.pollution_average > 60 {
                log.push(Message::HighPollution, city_time);
            }
        }
        42 => {
            if census.crime_average > 100 {
                log.push(Message::HighCrime, city_time);
            }
        }
        45 => {
            if total_pop > 60 && census.fire_station_count == 0 {
                log.push(Message::NeedFireStation, city_time);
            }
        }
        48 => {
            if total_pop > 60 && census.police_station_count == 0 {
                log.push(Message::NeedPoliceStation, city_time);
            }
        }
        51 => {
            if budget.city_tax > 12 {
                log.push(Message::TaxTooHigh, city_time);
            }
        }
        54 => {
            if budget.road_effect < 20 && census.road_total > 30 {
                log.push(Message::RoadsNeedFunding, city_time);
            }
        }
        57 => {
            if budget.fire_effect < 700 && total_pop > 20 {
                log.push(Message::FireDeptNeedsFunding, city_time);
            }
        }
        60 => {
            if budget.police_effect < 700 && total_pop > 20 {
                log.push(Message::PoliceNeedsFunding, city_time);
            }
        }
        63 => {
            if census.traffic_average > 60 {
                log.push(Message::TrafficJams, city_time);
            }
        }
        _ => {}
    }
}
