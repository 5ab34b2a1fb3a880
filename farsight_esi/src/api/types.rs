use farsight_core::{
    CharacterInfo, CharacterLocation, Killmail, SolarSystem, ZkbKill,
    ids::{
        CharacterId, ConstellationId, KillmailId, SolarSystemId, StarId, StationId, StructureId,
    },
};
use serde::Deserialize;
use serde_json::Value;

/// `/v1/characters/{id}/location/`. Only the system id is guaranteed; a
/// character in open space docks nowhere.
#[derive(Debug, Deserialize)]
pub(crate) struct LocationResponse {
    pub solar_system_id: i32,
    #[serde(default)]
    pub station_id: Option<i32>,
    #[serde(default)]
    pub structure_id: Option<i64>,
}

impl From<LocationResponse> for CharacterLocation {
    fn from(value: LocationResponse) -> Self {
        Self {
            solar_system_id: SolarSystemId(value.solar_system_id),
            station_id: value.station_id.map(StationId),
            structure_id: value.structure_id.map(StructureId),
        }
    }
}

/// `/v4/universe/systems/{id}/`. The nested arrays are kept as raw JSON; the
/// overlay stores and displays them without ever picking them apart.
#[derive(Debug, Deserialize)]
pub(crate) struct SystemResponse {
    pub system_id: i32,
    pub constellation_id: i32,
    pub name: String,
    pub planets: Value,
    pub position: Value,
    pub security_class: String,
    pub security_status: f64,
    pub star_id: i32,
    pub stargates: Value,
    pub stations: Value,
}

impl From<SystemResponse> for SolarSystem {
    fn from(value: SystemResponse) -> Self {
        Self {
            system_id: SolarSystemId(value.system_id),
            constellation_id: ConstellationId(value.constellation_id),
            name: value.name,
            planets_json: value.planets.to_string(),
            position_json: value.position.to_string(),
            security_class: value.security_class,
            security_status: value.security_status,
            star_id: StarId(value.star_id),
            stargates_json: value.stargates.to_string(),
            stations_json: value.stations.to_string(),
        }
    }
}

/// `/v1/killmails/{id}/{hash}/`.
#[derive(Debug, Deserialize)]
pub(crate) struct KillmailResponse {
    pub killmail_id: i64,
    pub killmail_time: String,
    pub solar_system_id: i32,
    pub attackers: Value,
    pub victim: Value,
}

impl KillmailResponse {
    /// The hash is part of the request, not the payload; it travels alongside.
    pub fn into_killmail(self, killmail_hash: String) -> Killmail {
        Killmail {
            killmail_id: KillmailId(self.killmail_id),
            killmail_hash,
            solar_system_id: SolarSystemId(self.solar_system_id),
            attackers_json: self.attackers.to_string(),
            victim_json: self.victim.to_string(),
            kill_time: self.killmail_time,
        }
    }
}

/// `/v4/characters/{id}/`.
#[derive(Debug, Deserialize)]
pub(crate) struct CharacterResponse {
    pub name: String,
    pub corporation_id: i64,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    pub birthday: String,
    #[serde(default)]
    pub security_status: f64,
}

impl CharacterResponse {
    pub fn into_info(self, character_id: CharacterId) -> CharacterInfo {
        CharacterInfo {
            character_id,
            name: self.name,
            corporation_id: self.corporation_id,
            // No alliance is the common case, not an error.
            alliance_id: self.alliance_id.unwrap_or(0),
            birthday: self.birthday,
            security_status: self.security_status,
        }
    }
}

/// One entry of the zKillboard per-system feed.
#[derive(Debug, Deserialize)]
pub(crate) struct ZkbEntry {
    pub killmail_id: i64,
    pub zkb: ZkbMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ZkbMeta {
    pub hash: String,
    pub fitted_value: f64,
    pub total_value: f64,
    pub points: i32,
    pub npc: bool,
    pub solo: bool,
    pub awox: bool,
}

impl From<ZkbEntry> for ZkbKill {
    fn from(value: ZkbEntry) -> Self {
        Self {
            killmail_id: KillmailId(value.killmail_id),
            killmail_hash: value.zkb.hash,
            fitted_value: value.zkb.fitted_value,
            total_value: value.zkb.total_value,
            points: value.zkb.points,
            npc: value.zkb.npc,
            solo: value.zkb.solo,
            awox: value.zkb.awox,
        }
    }
}
