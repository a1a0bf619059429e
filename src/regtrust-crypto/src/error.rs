//! Error types for signature operations.

use thiserror::Error;

/// Errors that can occur while handling keys, armor, or envelopes.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material could not be parsed.
    #[error("Invalid public key: {reason}")]
    InvalidPublicKey {
        /// Reason the key is invalid.
        reason: String,
    },

    /// Private key material could not be parsed.
    #[error("Invalid private key: {reason}")]
    InvalidPrivateKey {
        /// Reason the key is invalid.
        reason: String,
    },

    /// Armored text is not well formed.
    #[error("Invalid armor: {reason}")]
    InvalidArmor {
        /// Reason the armor is invalid.
        reason: String,
    },

    /// A signed envelope could not be decoded.
    #[error("Invalid envelope: {reason}")]
    InvalidEnvelope {
        /// Reason the envelope is invalid.
        reason: String,
    },

    /// A signature has the wrong shape for its algorithm.
    #[error("Invalid signature: {reason}")]
    InvalidSignature {
        /// Reason the signature is invalid.
        reason: String,
    },
}

impl CryptoError {
    /// Build an [`CryptoError::InvalidPublicKey`].
    pub fn invalid_public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }

    /// Build an [`CryptoError::InvalidPrivateKey`].
    pub fn invalid_private_key(reason: impl Into<String>) -> Self {
        Self::InvalidPrivateKey {
            reason: reason.into(),
        }
    }

    /// Build an [`CryptoError::InvalidArmor`].
    pub fn invalid_armor(reason: impl Into<String>) -> Self {
        Self::InvalidArmor {
            reason: reason.into(),
        }
    }

    /// Build an [`CryptoError::InvalidEnvelope`].
    pub fn invalid_envelope(reason: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            reason: reason.into(),
        }
    }

    /// Build an [`CryptoError::InvalidSignature`].
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
        }
    }
}
