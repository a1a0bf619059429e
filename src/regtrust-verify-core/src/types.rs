//! Shared export types and the verification traits.
//!
//! Exports are the JSON snapshots the registry hands out for signing and
//! auditing. Field names stay in the registry's PascalCase form so the
//! payload an approver signs reads the same everywhere it appears.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::VerifyError;

/// Kinds of registry object the verifier can operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// A registered domain.
    #[serde(rename = "domain")]
    Domain,
    /// A name-server host.
    #[serde(rename = "host")]
    Host,
    /// A registrant/admin/tech/billing contact.
    #[serde(rename = "contact")]
    Contact,
    /// An individual signer.
    #[serde(rename = "approver")]
    Approver,
    /// A named group of signers.
    #[serde(rename = "approverset")]
    ApproverSet,
    /// A proposed mutation carrying approvals.
    #[serde(rename = "changerequest")]
    ChangeRequest,
}

impl ObjectType {
    /// The registry's string form for this object kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Host => "host",
            Self::Contact => "contact",
            Self::Approver => "approver",
            Self::ApproverSet => "approverset",
            Self::ChangeRequest => "changerequest",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision recorded inside a signed attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// The change was approved.
    #[serde(rename = "approve")]
    Approved,
    /// The change was declined.
    #[serde(rename = "decline")]
    Declined,
}

/// Export snapshot of a single approval on a change request.
///
/// The approval's actual decision and the revision it endorses are not
/// stored in the clear — they only exist inside [`ApprovalExport::signature`]
/// and are recovered by verifying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApprovalExport {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state of the approval.
    pub state: String,

    /// Whether a signature has been uploaded.
    pub is_signed: bool,
    /// Whether this approval is authoritative for its change request.
    pub is_final_approval: bool,

    /// Change request this approval belongs to.
    #[serde(rename = "ChangeRequestID")]
    pub change_request_id: i64,
    /// Approver set that rendered the decision.
    #[serde(rename = "ApproverSetID")]
    pub approver_set_id: i64,

    /// The opaque signed blob (a [`regtrust_crypto::envelope`] envelope).
    pub signature: Vec<u8>,

    /// When the approval was created; delegated verification resolves the
    /// approver set as of this instant.
    pub created_at: DateTime<Utc>,
    /// Who created the approval.
    pub created_by: String,
}

/// Export snapshot of a change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeRequestExport {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state of the change request.
    pub state: String,

    /// Kind of object the change request mutates.
    pub registrar_object_type: ObjectType,
    /// Identifier of the object the change request mutates.
    #[serde(rename = "RegistrarObjectID")]
    pub registrar_object_id: i64,

    /// Revision in force when the change request was opened.
    #[serde(rename = "InitialRevisionID")]
    pub initial_revision_id: i64,
    /// Revision the change request proposes.
    #[serde(rename = "ProposedRevisionID")]
    pub proposed_revision_id: i64,

    /// Approvals rendered so far, in order.
    pub approvals: Vec<ApprovalExport>,

    /// When the change request was created.
    pub created_at: DateTime<Utc>,
    /// Who created the change request.
    pub created_by: String,
}

impl ChangeRequestExport {
    /// The first approval flagged final, if any.
    ///
    /// Exactly one final approval is expected; multiplicity beyond one is a
    /// precondition violation upstream and is not defended against here.
    #[must_use]
    pub fn final_approval(&self) -> Option<&ApprovalExport> {
        self.approvals.iter().find(|a| a.is_final_approval)
    }
}

/// The structured content recovered from a valid approval signature.
///
/// `ExportRev` stays raw: the verifier decides what object kind to decode
/// it as only after checking `ObjectType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attestation {
    /// Approval this attestation answers.
    #[serde(rename = "ApprovalID")]
    pub approval_id: i64,
    /// Raw bytes of the endorsed object export.
    pub export_rev: Box<RawValue>,
    /// Who downloaded and signed the attestation.
    pub username: String,
    /// The decision.
    pub action: Action,
    /// Kind of object the endorsed export describes.
    pub object_type: ObjectType,
    /// Signatures of the other approvals, echoed on final approvals.
    #[serde(rename = "Signature", default)]
    pub signatures: Vec<Vec<u8>>,
}

impl Attestation {
    /// Decode an attestation from a trusted payload.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Payload`] when the bytes are not attestation
    /// JSON.
    pub fn from_payload(payload: &[u8]) -> Result<Self, VerifyError> {
        serde_json::from_slice(payload).map_err(|e| VerifyError::Payload {
            message: e.to_string(),
        })
    }
}

/// One version of a registry object, as exported.
///
/// Implemented by every revision export; gives the engine uniform access to
/// the authorizing change request and the structural-equality check used
/// for tamper evidence.
pub trait RevisionExport {
    /// Revision identifier (`<= 0` means "no revision").
    fn id(&self) -> i64;

    /// Change request that authorized this revision (`<= 0` means none).
    fn change_request_id(&self) -> i64;

    /// Structural comparison against another export of the same revision.
    ///
    /// Compares every semantically meaningful field and accumulates one
    /// error per mismatch; administrative bookkeeping (creation stamps,
    /// revision workflow state) is ignored.
    fn compare_export(&self, other: &Self) -> (bool, Vec<VerifyError>);
}

/// A registry object the engine can fetch and verify.
pub trait RegistrarObject: DeserializeOwned + Serialize + Send {
    /// The registry's kind tag for this object.
    const OBJECT_TYPE: ObjectType;

    /// The revision export type for this object kind.
    type Revision: RevisionExport + Clone + Send + Sync;

    /// Object identifier.
    fn id(&self) -> i64;

    /// The live, authoritative revision.
    fn current_revision(&self) -> &Self::Revision;

    /// The revision proposed by an in-flight change request.
    fn pending_revision(&self) -> &Self::Revision;

    /// Serializes the export back into registry JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::IdNotSet`] for an export that was never
    /// persisted.
    fn to_json(&self) -> Result<String, VerifyError> {
        if self.id() <= 0 {
            return Err(VerifyError::IdNotSet {
                object_type: Self::OBJECT_TYPE,
            });
        }
        serde_json::to_string(self).map_err(|e| VerifyError::Payload {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_round_trips_through_registry_strings() {
        let json = serde_json::to_string(&ObjectType::ApproverSet).unwrap();
        assert_eq!(json, "\"approverset\"");
        let back: ObjectType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ObjectType::ApproverSet);
    }

    #[test]
    fn action_uses_registry_verbs() {
        assert_eq!(serde_json::to_string(&Action::Approved).unwrap(), "\"approve\"");
        assert_eq!(serde_json::to_string(&Action::Declined).unwrap(), "\"decline\"");
    }

    #[test]
    fn final_approval_picks_first_flagged() {
        let approval = |id, is_final| ApprovalExport {
            id,
            state: "approved".into(),
            is_signed: true,
            is_final_approval: is_final,
            change_request_id: 1,
            approver_set_id: 1,
            signature: Vec::new(),
            created_at: Utc::now(),
            created_by: "test".into(),
        };
        let cr = ChangeRequestExport {
            id: 1,
            state: "approved".into(),
            registrar_object_type: ObjectType::Domain,
            registrar_object_id: 9,
            initial_revision_id: 0,
            proposed_revision_id: 2,
            approvals: vec![approval(10, false), approval(11, true), approval(12, true)],
            created_at: Utc::now(),
            created_by: "test".into(),
        };
        assert_eq!(cr.final_approval().unwrap().id, 11);
    }

    #[test]
    fn attestation_keeps_export_rev_raw() {
        let json = r#"{
            "ApprovalID": 4,
            "ExportRev": {"ID": 7, "Nested": [1, 2]},
            "Username": "ops",
            "Action": "approve",
            "ObjectType": "domain",
            "Signature": []
        }"#;
        let att = Attestation::from_payload(json.as_bytes()).unwrap();
        assert_eq!(att.action, Action::Approved);
        assert!(att.export_rev.get().contains("\"Nested\""));
    }
}
