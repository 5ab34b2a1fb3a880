use farsight_core::{TokenExpiry, ids::CharacterId};
use serde::Deserialize;

/// Output of `begin_authorization`. The verifier must be retained until the
/// token exchange; it also becomes the record's `code_challenge` afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginRequest {
    pub authorization_url: String,
    pub code_verifier: String,
}

/// Parsed `/v2/oauth/token` response for the authorization-code grant.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub refresh_token: String,
}

/// Parsed `/verify/` response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedCharacter {
    pub character_id: CharacterId,
    pub character_name: String,
    pub character_owner_hash: String,
    pub expires_on: TokenExpiry,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyResponse {
    #[serde(rename = "CharacterID")]
    pub character_id: i64,
    #[serde(rename = "CharacterName")]
    pub character_name: String,
    #[serde(rename = "CharacterOwnerHash")]
    pub character_owner_hash: String,
    #[serde(rename = "ExpiresOn")]
    pub expires_on: String,
    #[serde(rename = "TokenType")]
    pub token_type: String,
}

impl From<VerifyResponse> for VerifiedCharacter {
    fn from(value: VerifyResponse) -> Self {
        Self {
            character_id: CharacterId(value.character_id),
            character_name: value.character_name,
            character_owner_hash: value.character_owner_hash,
            expires_on: TokenExpiry::new(value.expires_on),
            token_type: value.token_type,
        }
    }
}

/// Refresh grants only guarantee the two rotating tokens; everything else is
/// re-read through `/verify/`.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshGrant {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}
