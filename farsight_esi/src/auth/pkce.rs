use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};

pub(crate) struct PkcePair {
    /// Secret retained by the caller until the token exchange (and reused on
    /// every refresh grant afterwards).
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`, embedded in the authorization URL.
    pub challenge: String,
}

/// RFC 7636 S256 pair: 32 bytes from a cryptographically seeded generator,
/// base64url-encoded without padding to form the verifier; the challenge is
/// the base64url-encoded SHA-256 digest of that verifier string.
pub(crate) fn generate_pair() -> PkcePair {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill(&mut seed);

    let verifier = URL_SAFE_NO_PAD.encode(seed);
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

    PkcePair {
        verifier,
        challenge,
    }
}
