//! Key sets used to check approval signatures.

use tracing::debug;

use regtrust_crypto::{armor, envelope, fingerprint, CryptoError, VerifyingKey};

/// A collection of keys an approval envelope may be checked against.
///
/// Implemented by [`TrustAnchors`] for root-of-trust checks and by
/// [`crate::ApproverSetRevisionExport`] for delegated membership checks.
pub trait KeySet {
    /// Checks whether the envelope carries a valid signature from any key
    /// in the set. Returns the signed payload on success, empty otherwise.
    fn is_signed_by(&self, blob: &[u8]) -> (bool, Vec<u8>);
}

/// The pinned root-of-trust keys.
///
/// Anchors are loaded once at engine construction. An empty anchor set
/// never validates anything.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors {
    keys: Vec<(String, VerifyingKey)>,
}

impl TrustAnchors {
    /// An empty anchor set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an armored public key to the anchor set.
    pub fn add_key(&mut self, armored: &str) -> Result<(), CryptoError> {
        let key = armor::decode_public_key(armored)?;
        let fpr = fingerprint(&key);
        debug!(fingerprint = %fpr, "trust anchor loaded");
        self.keys.push((fpr, key));
        Ok(())
    }

    /// True when no anchors are pinned.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of pinned anchors.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Fingerprints of the pinned anchors.
    pub fn fingerprints(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(fpr, _)| fpr.as_str())
    }
}

impl KeySet for TrustAnchors {
    fn is_signed_by(&self, blob: &[u8]) -> (bool, Vec<u8>) {
        let keys: Vec<VerifyingKey> = self.keys.iter().map(|(_, k)| *k).collect();
        envelope::is_signed_by(blob, &keys)
    }
}
