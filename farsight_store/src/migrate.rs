use flate2::read::GzDecoder;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::StoreError;

/// Schema version this binary understands. Bump when adding a step below.
pub const CURRENT_VERSION: i64 = 4;

/// Bundled inventory-type reference dataset (gzip-compressed CSV export).
const INV_TYPES_GZ: &[u8] = include_bytes!("../assets/invTypes.csv.gz");

/// Monotonic, additive migration driven by `PRAGMA user_version`: every step
/// moves the schema forward by exactly one version. There is no downgrade
/// path; a store written by a newer binary is rejected.
pub(crate) async fn run(pool: &SqlitePool) -> Result<(), StoreError> {
    let mut version = user_version(pool).await?;

    if version > CURRENT_VERSION {
        return Err(StoreError::SchemaFromTheFuture {
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    while version < CURRENT_VERSION {
        log::info!("migrating store schema {} -> {}", version, version + 1);
        apply_step(pool, version).await?;
        version += 1;
        set_user_version(pool, version).await?;
    }

    Ok(())
}

async fn apply_step(pool: &SqlitePool, from: i64) -> Result<(), StoreError> {
    match from {
        0 => {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS token(
                    refreshtoken TEXT NOT NULL,
                    charactername TEXT NOT NULL,
                    characterid INTEGER NOT NULL,
                    accesstoken TEXT NOT NULL,
                    expireson TEXT NOT NULL,
                    codechallenge TEXT NOT NULL
                )",
            )
            .execute(pool)
            .await?;
        }
        1 => {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS solarsystem(
                    id INTEGER PRIMARY KEY,
                    constellationid INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    planets TEXT NOT NULL,
                    position TEXT NOT NULL,
                    securityclass TEXT NOT NULL,
                    securitystatus REAL NOT NULL,
                    starid INTEGER NOT NULL,
                    stargates TEXT NOT NULL,
                    stations TEXT NOT NULL
                )",
            )
            .execute(pool)
            .await?;
        }
        2 => {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS killmail(
                    id INTEGER NOT NULL,
                    hash TEXT NOT NULL,
                    systemid INTEGER NOT NULL,
                    attackers TEXT NOT NULL,
                    victim TEXT NOT NULL,
                    killtime TEXT NOT NULL,
                    PRIMARY KEY (id, hash)
                )",
            )
            .execute(pool)
            .await?;
        }
        3 => {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS invtypes(
                    typeid INTEGER PRIMARY KEY,
                    groupid INTEGER NOT NULL,
                    typename TEXT NOT NULL,
                    description TEXT NOT NULL,
                    mass REAL NOT NULL,
                    volume REAL NOT NULL
                )",
            )
            .execute(pool)
            .await?;

            load_inv_types(pool).await?;
        }
        other => return Err(StoreError::UnsupportedMigration { from: other }),
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct TypeCsvRow {
    #[serde(rename = "typeID")]
    type_id: i32,
    #[serde(rename = "groupID")]
    group_id: i32,
    #[serde(rename = "typeName")]
    type_name: String,
    description: String,
    mass: f64,
    volume: f64,
}

/// Bulk-loads the bundled dataset in one transaction so a crash mid-load
/// leaves the table empty rather than half-populated.
async fn load_inv_types(pool: &SqlitePool) -> Result<(), StoreError> {
    let mut reader = csv::Reader::from_reader(GzDecoder::new(INV_TYPES_GZ));
    let mut tx = pool.begin().await?;
    let mut loaded = 0usize;

    for row in reader.deserialize::<TypeCsvRow>() {
        let row = row.map_err(|err| StoreError::TypeDataset(err.to_string()))?;
        sqlx::query(
            "INSERT INTO invtypes(typeid, groupid, typename, description, mass, volume)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(row.type_id)
        .bind(row.group_id)
        .bind(&row.type_name)
        .bind(&row.description)
        .bind(row.mass)
        .bind(row.volume)
        .execute(&mut *tx)
        .await?;
        loaded += 1;
    }

    tx.commit().await?;
    log::info!("loaded {loaded} inventory types from bundled dataset");
    Ok(())
}

async fn user_version(pool: &SqlitePool) -> Result<i64, StoreError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

async fn set_user_version(pool: &SqlitePool, version: i64) -> Result<(), StoreError> {
    // PRAGMA does not take bind parameters; the value is an integer we control.
    sqlx::query(&format!("PRAGMA user_version = {version}"))
        .execute(pool)
        .await?;
    Ok(())
}
