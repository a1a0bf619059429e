//! Armored public-key text.
//!
//! Public keys travel through the registry as human-transportable text so
//! that operators can paste them into configuration and approver records.
//! The armor is a base64 body between BEGIN/END marker lines:
//!
//! ```text
//! -----BEGIN REGTRUST PUBLIC KEY-----
//! m4wYl0p...
//! -----END REGTRUST PUBLIC KEY-----
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::VerifyingKey;

use crate::error::CryptoError;

const HEADER: &str = "-----BEGIN REGTRUST PUBLIC KEY-----";
const FOOTER: &str = "-----END REGTRUST PUBLIC KEY-----";

/// Encode a public key as armored text.
#[must_use]
pub fn encode_public_key(key: &VerifyingKey) -> String {
    format!("{HEADER}\n{}\n{FOOTER}", BASE64.encode(key.as_bytes()))
}

/// Decode armored public-key text.
///
/// Leading and trailing whitespace around each line is tolerated; anything
/// outside the marker lines is rejected.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidArmor`] when the markers or base64 body are
/// malformed, and [`CryptoError::InvalidPublicKey`] when the decoded bytes
/// are not a valid Ed25519 public key.
pub fn decode_public_key(text: &str) -> Result<VerifyingKey, CryptoError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    match lines.next() {
        Some(line) if line == HEADER => {},
        _ => return Err(CryptoError::invalid_armor("missing BEGIN marker")),
    }

    let mut body = String::new();
    let mut saw_footer = false;
    for line in lines {
        if line == FOOTER {
            saw_footer = true;
            break;
        }
        body.push_str(line);
    }
    if !saw_footer {
        return Err(CryptoError::invalid_armor("missing END marker"));
    }

    let raw = BASE64
        .decode(body.as_bytes())
        .map_err(|e| CryptoError::invalid_armor(format!("bad base64 body: {e}")))?;

    let raw: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        CryptoError::invalid_public_key(format!("expected 32 key bytes, got {}", raw.len()))
    })?;

    VerifyingKey::from_bytes(&raw).map_err(|e| CryptoError::invalid_public_key(e.to_string()))
}
