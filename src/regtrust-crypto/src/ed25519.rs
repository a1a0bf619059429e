//! Ed25519 key handling.
//!
//! Approver and trust-anchor keys are plain Ed25519 keypairs. The signer
//! half only exists so that approval tooling and tests can produce signed
//! envelopes; the verification engine itself never holds private keys.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::armor;
use crate::error::CryptoError;

/// Compute the fingerprint of a public key.
///
/// Lowercase hex SHA-256 over the raw 32-byte key. This is the key identity
/// used in signed envelopes and on approver revisions.
pub fn fingerprint(key: &VerifyingKey) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// An Ed25519 signing key with the regtrust identity conventions attached.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create a new signer with a random key.
    #[must_use]
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a signer from seed bytes (32 bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if the seed is not exactly 32 bytes.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = seed.try_into().map_err(|_| {
            CryptoError::invalid_private_key(format!(
                "Ed25519 seed must be 32 bytes, got {}",
                seed.len()
            ))
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Get the verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Get the fingerprint of the public key.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.verifying_key())
    }

    /// Get the armored public-key text for this signer.
    #[must_use]
    pub fn public_key_armored(&self) -> String {
        armor::encode_public_key(&self.verifying_key())
    }

    /// Sign raw bytes, returning the 64-byte detached signature.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }
}

/// Verify a detached signature against a public key.
///
/// A malformed signature is reported as an error; a well-formed signature
/// that does not match yields `Ok(false)`.
pub(crate) fn verify_detached(
    key: &VerifyingKey,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| {
        CryptoError::invalid_signature(format!(
            "Ed25519 signature must be 64 bytes, got {}",
            signature.len()
        ))
    })?;

    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

    Ok(key.verify_strict(data, &sig).is_ok())
}
