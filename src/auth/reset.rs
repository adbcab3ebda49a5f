use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

/// How long a reset secret stays redeemable.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);

const RESET_SECRET_BYTES: usize = 32;

/// Mint a fresh reset secret.
///
/// Returns the URL-safe plaintext (mailed to the user, never stored), the
/// fingerprint to persist, and the absolute expiry instant.
pub fn generate() -> (String, String, OffsetDateTime) {
    let mut bytes = [0u8; RESET_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = Base64UrlUnpadded::encode_string(&bytes);
    let fp = fingerprint(&plaintext);
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    (plaintext, fp, expires)
}

/// Deterministic one-way fingerprint of a reset secret, used for
/// lookup-by-equality against the stored value.
pub fn fingerprint(plaintext: &str) -> String {
    let digest = Sha256::digest(plaintext.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}
