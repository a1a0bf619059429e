//! # regtrust-verify-core
//!
//! Trust-chain verification for the regtrust registrar backend.
//!
//! Registry objects (domains, hosts, contacts, approvers, approver sets)
//! are only ever mutated through change requests that carry signed
//! approvals. This crate proves, for any object revision, that its
//! authorizing approval is backed by a signature chain rooted in a pinned
//! trust anchor — possibly through several levels of delegated approver
//! sets — and that the stored object has not drifted from what was signed.
//!
//! ## Architecture
//!
//! ```text
//! GetVerified<Kind>(id, timestamp)
//!        │  fetch object as of timestamp
//!        ▼
//! VerifyChangeRequest ──► TrustAnchors.is_signed_by ──────────┐
//!        │ (anchor miss)                                      │
//!        ▼                                                    ▼
//! VerifyApproverSet (recursive, time-travelled)      Attestation decode
//!        │  collect verified members                          │
//!        ▼                                                    ▼
//! verified member keys.is_signed_by ──────────► structural comparison
//! ```
//!
//! The engine is a pure read path: it consumes an [`store::ObjectStore`]
//! and a [`keyset::TrustAnchors`], and every verification call returns an
//! explicit `verified` flag with accumulated errors. Partial trust applies
//! to approver sets — one independently verified member is enough.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod approver;
pub mod approver_set;
pub mod client;
pub mod config;
pub mod contact;
pub mod domain;
pub mod engine;
pub mod error;
pub mod host;
pub mod keyset;
pub mod store;
pub mod types;

mod compare;

pub use approver::{ApproverExportFull, ApproverExportShort, ApproverRevisionExport};
pub use approver_set::{
    ApproverSetExportFull, ApproverSetExportShort, ApproverSetRevisionExport,
};
pub use client::RegistryClient;
pub use config::VerifyConfig;
pub use contact::{ContactExport, ContactExportShort, ContactRevisionExport};
pub use domain::{DomainExport, DomainRevisionExport, DsDataEntry};
pub use engine::{
    ApproverSetOutcome, ChangeRequestOutcome, VerificationEngine, VerifiedObject,
};
pub use error::VerifyError;
pub use host::{HostAddress, HostExport, HostExportShort, HostRevisionExport};
pub use keyset::{KeySet, TrustAnchors};
pub use store::{MemoryStore, ObjectStore, StoreError};
pub use types::{
    Action, ApprovalExport, Attestation, ChangeRequestExport, ObjectType, RegistrarObject,
    RevisionExport,
};
