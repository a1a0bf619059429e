//! The signed-envelope blob.
//!
//! An envelope is the transportable form of a signed approval: one payload
//! plus one or more detached signatures over it, serialized as JSON. It
//! plays the role a clearsigned message plays in PGP-based systems — the
//! payload rides inside the blob and is only trusted once a signature over
//! it verifies.
//!
//! Decoding an envelope proves nothing. Trust decisions happen when a
//! caller checks the decoded signatures against a specific key set.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::ed25519::{verify_detached, Ed25519Signer};
use crate::error::CryptoError;
use crate::fingerprint;

/// Wire form of a signed envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Base64 of the payload bytes.
    #[serde(rename = "Payload")]
    payload: String,

    /// Detached signatures over the payload.
    #[serde(rename = "Signatures")]
    signatures: Vec<EnvelopeSignature>,
}

/// One detached signature inside an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeSignature {
    /// Fingerprint of the signing key (lowercase hex SHA-256).
    #[serde(rename = "KeyFingerprint")]
    key_fingerprint: String,

    /// Base64 of the 64-byte Ed25519 signature.
    #[serde(rename = "Signature")]
    signature: String,
}

/// A decoded envelope: payload bytes plus parsed signatures.
#[derive(Debug, Clone)]
pub struct DecodedEnvelope {
    /// The payload the signatures cover.
    pub payload: Vec<u8>,
    signatures: Vec<(String, Vec<u8>)>,
}

/// Sign a payload with one or more keys, producing the envelope blob.
///
/// # Errors
///
/// Returns an error if no signers are supplied.
pub fn sign(payload: &[u8], signers: &[&Ed25519Signer]) -> Result<Vec<u8>, CryptoError> {
    if signers.is_empty() {
        return Err(CryptoError::invalid_envelope("no signers supplied"));
    }

    let envelope = SignedEnvelope {
        payload: BASE64.encode(payload),
        signatures: signers
            .iter()
            .map(|s| EnvelopeSignature {
                key_fingerprint: s.fingerprint(),
                signature: BASE64.encode(s.sign(payload)),
            })
            .collect(),
    };

    serde_json::to_vec(&envelope).map_err(|e| CryptoError::invalid_envelope(e.to_string()))
}

/// Decode an envelope blob without verifying anything.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidEnvelope`] for blobs that are not valid
/// envelope JSON or whose base64 fields do not decode.
pub fn decode(blob: &[u8]) -> Result<DecodedEnvelope, CryptoError> {
    let envelope: SignedEnvelope =
        serde_json::from_slice(blob).map_err(|e| CryptoError::invalid_envelope(e.to_string()))?;

    let payload = BASE64
        .decode(envelope.payload.as_bytes())
        .map_err(|e| CryptoError::invalid_envelope(format!("bad payload base64: {e}")))?;

    let mut signatures = Vec::with_capacity(envelope.signatures.len());
    for sig in envelope.signatures {
        let raw = BASE64
            .decode(sig.signature.as_bytes())
            .map_err(|e| CryptoError::invalid_envelope(format!("bad signature base64: {e}")))?;
        signatures.push((sig.key_fingerprint, raw));
    }

    Ok(DecodedEnvelope {
        payload,
        signatures,
    })
}

impl DecodedEnvelope {
    /// Check whether any signature in the envelope verifies under any of the
    /// supplied keys.
    ///
    /// Fingerprints inside the envelope are advisory routing hints only; a
    /// signature is accepted purely on cryptographic verification, so a
    /// forged fingerprint cannot widen trust.
    pub fn signed_by_any<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a VerifyingKey>,
    {
        for key in keys {
            for (_, sig) in &self.signatures {
                if verify_detached(key, &self.payload, sig).unwrap_or(false) {
                    return true;
                }
            }
        }
        false
    }

    /// Fingerprints claimed by the envelope's signatures.
    pub fn claimed_fingerprints(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(|(fp, _)| fp.as_str())
    }
}

/// Decode a blob and check it against a key set in one step.
///
/// This is the `IsSignedBy` primitive: `(valid, payload)`. Malformed blobs
/// and unmatched signatures both come back as `(false, empty)` — the caller
/// only ever branches on validity.
pub fn is_signed_by<'a, I>(blob: &[u8], keys: I) -> (bool, Vec<u8>)
where
    I: IntoIterator<Item = &'a VerifyingKey>,
{
    match decode(blob) {
        Ok(envelope) => {
            if envelope.signed_by_any(keys) {
                (true, envelope.payload)
            } else {
                (false, Vec::new())
            }
        },
        Err(_) => (false, Vec::new()),
    }
}

/// Convenience check that an envelope was signed by one specific key.
pub fn signed_by(blob: &[u8], key: &VerifyingKey) -> bool {
    is_signed_by(blob, std::iter::once(key)).0
}
