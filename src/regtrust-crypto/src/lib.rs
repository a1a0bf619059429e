//! # regtrust-crypto
//!
//! Signature primitives for the regtrust verification engine.
//!
//! This crate supplies the "is this blob validly signed, and by which key"
//! capability that the verification engine consumes. It deliberately knows
//! nothing about registry objects, change requests, or trust policy:
//!
//! - [`Ed25519Signer`] / key material handling ([`ed25519`])
//! - armored public-key text ([`armor`])
//! - the transportable signed-envelope blob ([`envelope`])
//!
//! Key identity is a SHA-256 fingerprint of the raw public key bytes,
//! rendered as lowercase hex.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod armor;
pub mod envelope;
pub mod error;

mod ed25519;

pub use ed25519::{fingerprint, Ed25519Signer};
pub use envelope::{DecodedEnvelope, SignedEnvelope};
pub use error::CryptoError;

pub use ed25519_dalek::VerifyingKey;
