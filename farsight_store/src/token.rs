use farsight_core::{TokenExpiry, ids::CharacterId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{OverlayStore, StoreError};

/// The process-wide authentication record. Exactly one is "current" at a
/// time; it is never used for an API call without an expiry check immediately
/// beforehand, and every mutation is persisted before the token is used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub refresh_token: String,
    pub access_token: String,
    pub character_id: CharacterId,
    pub character_name: String,
    pub expires_on: TokenExpiry,
    /// The PKCE code verifier the token was obtained with. The SSO requires
    /// it again on every refresh grant.
    pub code_challenge: String,
}

impl OverlayStore {
    /// Appends a token row. Historical rows are kept; `latest_token` picks
    /// the live one by expiry.
    pub async fn save_token(&self, record: &TokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO token(refreshtoken, charactername, characterid,
                               accesstoken, expireson, codechallenge)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.refresh_token)
        .bind(&record.character_name)
        .bind(record.character_id.0)
        .bind(&record.access_token)
        .bind(record.expires_on.as_str())
        .bind(&record.code_challenge)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// The most-recently-expiring stored token, if any. The fixed-width
    /// expiry format makes the string ORDER BY chronological.
    pub async fn latest_token(&self) -> Result<Option<TokenRecord>, StoreError> {
        let row: Option<DbToken> = sqlx::query_as(
            "SELECT refreshtoken, charactername, characterid, accesstoken, expireson, codechallenge
             FROM token ORDER BY expireson DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }
}

#[derive(Debug, FromRow)]
struct DbToken {
    refreshtoken: String,
    charactername: String,
    characterid: i64,
    accesstoken: String,
    expireson: String,
    codechallenge: String,
}

impl From<DbToken> for TokenRecord {
    fn from(value: DbToken) -> Self {
        Self {
            refresh_token: value.refreshtoken,
            access_token: value.accesstoken,
            character_id: CharacterId(value.characterid),
            character_name: value.charactername,
            expires_on: TokenExpiry::new(value.expireson),
            code_challenge: value.codechallenge,
        }
    }
}
