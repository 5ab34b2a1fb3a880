use std::{path::Path, time::Duration};

use farsight_core::{
    InventoryType, Killmail, SolarSystem,
    ids::{ConstellationId, KillmailId, SolarSystemId, StarId, TypeId},
};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

use crate::{StoreError, migrate};

/// Handle to the overlay's SQLite store. Cheap to clone; all clones share one
/// pool. The store is only ever touched from the session's executor thread,
/// so keyed reads and write-backs need no locking beyond statement atomicity.
#[derive(Clone, Debug)]
pub struct OverlayStore {
    pool: SqlitePool,
}

impl OverlayStore {
    pub async fn connect(database_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_options)
            .await?;

        migrate::run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn solar_system(
        &self,
        system_id: SolarSystemId,
    ) -> Result<Option<SolarSystem>, StoreError> {
        let rows: Vec<DbSolarSystem> = sqlx::query_as(
            "SELECT id, constellationid, name, planets, position, securityclass,
                    securitystatus, starid, stargates, stations
             FROM solarsystem WHERE id = ?",
        )
        .bind(system_id.0)
        .fetch_all(&self.pool)
        .await?;

        single_row(rows, "solarsystem", system_id.to_string()).map(|row| row.map(Into::into))
    }

    pub async fn insert_solar_system(&self, system: &SolarSystem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO solarsystem(id, constellationid, name, planets, position,
                                     securityclass, securitystatus, starid, stargates, stations)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(system.system_id.0)
        .bind(system.constellation_id.0)
        .bind(&system.name)
        .bind(&system.planets_json)
        .bind(&system.position_json)
        .bind(&system.security_class)
        .bind(system.security_status)
        .bind(system.star_id.0)
        .bind(&system.stargates_json)
        .bind(&system.stations_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn killmail(
        &self,
        killmail_id: KillmailId,
        killmail_hash: &str,
    ) -> Result<Option<Killmail>, StoreError> {
        let rows: Vec<DbKillmail> = sqlx::query_as(
            "SELECT id, hash, systemid, attackers, victim, killtime
             FROM killmail WHERE id = ? AND hash = ?",
        )
        .bind(killmail_id.0)
        .bind(killmail_hash)
        .fetch_all(&self.pool)
        .await?;

        single_row(rows, "killmail", format!("{killmail_id}/{killmail_hash}"))
            .map(|row| row.map(Into::into))
    }

    pub async fn insert_killmail(&self, killmail: &Killmail) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO killmail(id, hash, systemid, attackers, victim, killtime)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(killmail.killmail_id.0)
        .bind(&killmail.killmail_hash)
        .bind(killmail.solar_system_id.0)
        .bind(&killmail.attackers_json)
        .bind(&killmail.victim_json)
        .bind(&killmail.kill_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn inventory_type(
        &self,
        type_id: TypeId,
    ) -> Result<Option<InventoryType>, StoreError> {
        let rows: Vec<DbInventoryType> = sqlx::query_as(
            "SELECT typeid, groupid, typename, description, mass, volume
             FROM invtypes WHERE typeid = ?",
        )
        .bind(type_id.0)
        .fetch_all(&self.pool)
        .await?;

        single_row(rows, "invtypes", type_id.to_string()).map(|row| row.map(Into::into))
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Keyed reads map row counts onto the resolution contract: zero rows is a
/// cache miss, one row is the canonical entity, anything else is corruption
/// and must surface, never be silently repaired.
fn single_row<T>(
    mut rows: Vec<T>,
    table: &'static str,
    key: String,
) -> Result<Option<T>, StoreError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.remove(0))),
        count => Err(StoreError::DuplicateRows { table, key, count }),
    }
}

#[derive(Debug, FromRow)]
struct DbSolarSystem {
    id: i32,
    constellationid: i32,
    name: String,
    planets: String,
    position: String,
    securityclass: String,
    securitystatus: f64,
    starid: i32,
    stargates: String,
    stations: String,
}

impl From<DbSolarSystem> for SolarSystem {
    fn from(value: DbSolarSystem) -> Self {
        Self {
            system_id: SolarSystemId(value.id),
            constellation_id: ConstellationId(value.constellationid),
            name: value.name,
            planets_json: value.planets,
            position_json: value.position,
            security_class: value.securityclass,
            security_status: value.securitystatus,
            star_id: StarId(value.starid),
            stargates_json: value.stargates,
            stations_json: value.stations,
        }
    }
}

#[derive(Debug, FromRow)]
struct DbInventoryType {
    typeid: i32,
    groupid: i32,
    typename: String,
    description: String,
    mass: f64,
    volume: f64,
}

impl From<DbInventoryType> for InventoryType {
    fn from(value: DbInventoryType) -> Self {
        Self {
            type_id: TypeId(value.typeid),
            group_id: value.groupid,
            type_name: value.typename,
            description: value.description,
            mass: value.mass,
            volume: value.volume,
        }
    }
}

#[derive(Debug, FromRow)]
struct DbKillmail {
    id: i64,
    hash: String,
    systemid: i32,
    attackers: String,
    victim: String,
    killtime: String,
}

impl From<DbKillmail> for Killmail {
    fn from(value: DbKillmail) -> Self {
        Self {
            killmail_id: KillmailId(value.id),
            killmail_hash: value.hash,
            solar_system_id: SolarSystemId(value.systemid),
            attackers_json: value.attackers,
            victim_json: value.victim,
            kill_time: value.killtime,
        }
    }
}
