use serde::{Deserialize, Serialize};

use crate::ids::{
    CharacterId, ConstellationId, KillmailId, SolarSystemId, StarId, StationId, StructureId,
    TypeId,
};

/// Static universe geography. Immutable once fetched, cached indefinitely by
/// system id. The nested ESI arrays (planets, stargates, stations, position)
/// are carried as raw JSON text since the overlay never takes them apart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarSystem {
    pub system_id: SolarSystemId,
    pub constellation_id: ConstellationId,
    pub name: String,
    pub planets_json: String,
    pub position_json: String,
    pub security_class: String,
    pub security_status: f64,
    pub star_id: StarId,
    pub stargates_json: String,
    pub stations_json: String,
}

/// A fully resolved killmail. Immutable once fetched, cached indefinitely by
/// the composite (id, hash) key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Killmail {
    pub killmail_id: KillmailId,
    pub killmail_hash: String,
    pub solar_system_id: SolarSystemId,
    pub attackers_json: String,
    pub victim_json: String,
    pub kill_time: String,
}

/// Inventory type reference row. Bulk-loaded once during store migration from
/// the bundled dataset, read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryType {
    pub type_id: TypeId,
    pub group_id: i32,
    pub type_name: String,
    pub description: String,
    pub mass: f64,
    pub volume: f64,
}

/// Where a character currently is. Transient, produced fresh on every
/// location query. A character in open space has neither station nor
/// structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacterLocation {
    pub solar_system_id: SolarSystemId,
    pub station_id: Option<StationId>,
    pub structure_id: Option<StructureId>,
}

/// Kill summary from the zKillboard feed. Transient, never cached; only used
/// to drive killmail resolution and value display.
#[derive(Clone, Debug, PartialEq)]
pub struct ZkbKill {
    pub killmail_id: KillmailId,
    pub killmail_hash: String,
    pub fitted_value: f64,
    pub total_value: f64,
    pub points: i32,
    pub npc: bool,
    pub solo: bool,
    pub awox: bool,
}

/// Public character sheet data. Transient, resolved on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterInfo {
    pub character_id: CharacterId,
    pub name: String,
    pub corporation_id: i64,
    /// 0 when the character is not in an alliance.
    pub alliance_id: i64,
    pub birthday: String,
    pub security_status: f64,
}
