//! Error types for verification operations.
//!
//! Verification calls accumulate errors instead of stopping at the first
//! one; the explicit `verified` flag on each outcome is authoritative.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::ObjectType;

/// Errors that can occur during trust-chain verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The object store failed or the object does not exist.
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    /// Fetched bytes could not be decoded into the expected export.
    #[error("Unable to parse {object_type} {id}: {message}")]
    Parse {
        /// Kind of object being decoded.
        object_type: ObjectType,
        /// Identifier of the object being decoded.
        id: i64,
        /// Underlying decode error.
        message: String,
    },

    /// A signed payload could not be decoded into the expected shape.
    #[error("Unable to decode signed payload: {message}")]
    Payload {
        /// Underlying decode error.
        message: String,
    },

    /// The object has no current revision.
    #[error("No current revision found for {object_type} {id}")]
    NoCurrentRevision {
        /// Kind of object missing its revision.
        object_type: ObjectType,
        /// Identifier of the object.
        id: i64,
    },

    /// The current revision has no authorizing change request.
    #[error("Unable to find a change request for {object_type} revision {revision_id}")]
    NoChangeRequest {
        /// Kind of object whose revision is unanchored.
        object_type: ObjectType,
        /// Identifier of the revision.
        revision_id: i64,
    },

    /// An export was serialized before it was ever persisted.
    #[error("Unable to serialize {object_type} with no ID")]
    IdNotSet {
        /// Kind of object being serialized.
        object_type: ObjectType,
    },

    /// A change request was referenced with a non-positive identifier.
    #[error("Invalid change request ID {id}")]
    InvalidChangeRequestId {
        /// The offending identifier.
        id: i64,
    },

    /// The change request carries no final approval.
    #[error("No final approval found for change request {id}")]
    NoFinalApproval {
        /// Identifier of the change request.
        id: i64,
    },

    /// A signature blob did not verify under the candidate key set.
    #[error("Not signed by anchor")]
    NotSignedByAnchor,

    /// The recovered attestation declined the change.
    #[error("Change request {id} was not approved")]
    NotApproved {
        /// Identifier of the change request.
        id: i64,
    },

    /// The recovered attestation targets a different object kind.
    #[error("Approval for change request {id} targets {actual}, expected {expected}")]
    WrongObjectType {
        /// Identifier of the change request.
        id: i64,
        /// Kind the attestation actually targets.
        actual: ObjectType,
        /// Kind the verifier required.
        expected: ObjectType,
    },

    /// A delegated approver set could not be verified.
    #[error("Approver set {id} was not verified")]
    ApproverSetNotVerified {
        /// Identifier of the approver set.
        id: i64,
    },

    /// A declared member of an approver set failed independent verification.
    #[error("Unable to find the verified approver {id} at time {timestamp}")]
    ApproverNotVerified {
        /// Identifier of the approver.
        id: i64,
        /// Timestamp the approver was resolved at.
        timestamp: i64,
    },

    /// No member of an approver set could be verified.
    #[error("No verified approvers found for approver set {id} at time {timestamp}")]
    NoVerifiedApprovers {
        /// Identifier of the approver set.
        id: i64,
        /// Timestamp the members were resolved at.
        timestamp: i64,
    },

    /// Two revisions disagree on a semantically meaningful field.
    #[error("The {field} fields did not match")]
    FieldMismatch {
        /// Name of the mismatched field.
        field: &'static str,
    },

    /// An approver's stored fingerprint disagrees with its public key.
    #[error("Approver {id} fingerprint does not match its public key")]
    FingerprintMismatch {
        /// Identifier of the approver.
        id: i64,
    },

    /// The delegation chain exceeded the configured depth bound.
    #[error("Trust chain exceeded maximum depth {max}")]
    ChainLimit {
        /// The configured bound.
        max: usize,
    },

    /// The delegation chain revisited a node — fail closed.
    #[error("Trust chain cycle detected at {object_type} {id} @ {timestamp}")]
    ChainCycle {
        /// Kind of the revisited node.
        object_type: ObjectType,
        /// Identifier of the revisited node.
        id: i64,
        /// Timestamp of the revisited node.
        timestamp: i64,
    },

    /// Key or envelope handling failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] regtrust_crypto::CryptoError),
}
