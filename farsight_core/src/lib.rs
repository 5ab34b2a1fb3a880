pub mod entities;
pub mod ids;
pub mod time;

pub use entities::{
    CharacterInfo, CharacterLocation, InventoryType, Killmail, SolarSystem, ZkbKill,
};
pub use ids::{
    CharacterId, ConstellationId, KillmailId, SolarSystemId, StarId, StationId, StructureId,
    TypeId,
};
pub use time::{Timestamp, TokenExpiry};
