mod flow;
mod listener;
mod pkce;
mod types;

pub use flow::{SsoClient, open_in_browser};
pub use types::{LoginRequest, TokenGrant, VerifiedCharacter};
