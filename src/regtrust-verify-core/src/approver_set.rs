//! Approver set exports.
//!
//! An approver set carries the membership that may sign approvals on its
//! behalf. Membership is only trusted after the engine has verified each
//! member approver; verified members and their parsed keys live alongside
//! the export but never cross the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use regtrust_crypto::{armor, envelope, fingerprint, VerifyingKey};

use crate::approver::{ApproverExportFull, ApproverExportShort};
use crate::compare::{refs_match, FieldChecker};
use crate::error::VerifyError;
use crate::keyset::KeySet;
use crate::types::{ObjectType, RegistrarObject, RevisionExport};

/// Export snapshot of an approver set, with its current and pending revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproverSetExportFull {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,

    /// The live, authoritative revision.
    pub current_revision: ApproverSetRevisionExport,
    /// The revision proposed by an in-flight change request.
    pub pending_revision: ApproverSetRevisionExport,

    /// When the set was created.
    pub created_at: DateTime<Utc>,
    /// Who created the set.
    pub created_by: String,
}

/// Short export of an approver set, used where other objects reference one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproverSetExportShort {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,
    /// Display title.
    pub title: String,

    /// When the set was created.
    pub created_at: DateTime<Utc>,
    /// Who created the set.
    pub created_by: String,
}

/// Export snapshot of one approver set revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproverSetRevisionExport {
    /// Revision identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Approver set this revision belongs to.
    #[serde(rename = "ApproverSetID")]
    pub approver_set_id: i64,

    /// Workflow state of the revision.
    pub revision_state: String,
    /// State the object should take when this revision is promoted.
    pub desired_state: String,

    /// Display title.
    pub title: String,
    /// Description of the set's purpose.
    pub description: String,

    /// Member approvers declared by this revision.
    pub approvers: Vec<ApproverExportShort>,

    /// Operator notes saved with the revision.
    pub saved_notes: String,

    /// Change request that authorized this revision.
    #[serde(rename = "ChangeRequestID")]
    pub change_request_id: i64,

    /// Ticket reference for the change.
    #[serde(rename = "IssueCR")]
    pub issue_cr: String,
    /// Free-form notes.
    pub notes: String,

    /// Approver sets that must approve changes to this object.
    pub required_approver_sets: Vec<ApproverSetExportShort>,
    /// Approver sets informed of changes to this object.
    pub informed_approver_sets: Vec<ApproverSetExportShort>,

    /// When the revision was created.
    pub created_at: DateTime<Utc>,
    /// Who created the revision.
    pub created_by: String,

    /// Members that passed verification. Populated by the engine.
    #[serde(skip)]
    verified_approvers: Vec<ApproverExportFull>,
    /// Parsed keys of verified members, fingerprint first.
    #[serde(skip)]
    keys: Vec<(String, VerifyingKey)>,
}

impl ApproverSetRevisionExport {
    /// Records a member approver as verified, parsing its armored key.
    ///
    /// The approver's current revision must carry a decodable public key.
    /// When the revision also carries a fingerprint it must match the key,
    /// otherwise the member is rejected.
    pub fn add_verified_approver(
        &mut self,
        approver: ApproverExportFull,
    ) -> Result<(), VerifyError> {
        let revision = approver.current_revision();
        let key = armor::decode_public_key(&revision.public_key)?;
        let fpr = fingerprint(&key);
        if !revision.fingerprint.is_empty() && revision.fingerprint != fpr {
            return Err(VerifyError::FingerprintMismatch { id: approver.id });
        }
        debug!(approver = approver.id, fingerprint = %fpr, "approver key accepted");
        self.keys.push((fpr, key));
        self.verified_approvers.push(approver);
        Ok(())
    }

    /// True when at least one member survived verification.
    pub fn has_verified_approvers(&self) -> bool {
        !self.verified_approvers.is_empty()
    }

    /// The members that passed verification.
    pub fn verified_approvers(&self) -> &[ApproverExportFull] {
        &self.verified_approvers
    }
}

impl KeySet for ApproverSetRevisionExport {
    fn is_signed_by(&self, blob: &[u8]) -> (bool, Vec<u8>) {
        let keys: Vec<VerifyingKey> = self.keys.iter().map(|(_, k)| *k).collect();
        envelope::is_signed_by(blob, &keys)
    }
}

impl RevisionExport for ApproverSetRevisionExport {
    fn id(&self) -> i64 {
        self.id
    }

    fn change_request_id(&self) -> i64 {
        self.change_request_id
    }

    fn compare_export(&self, other: &Self) -> (bool, Vec<VerifyError>) {
        let mut chk = FieldChecker::new();
        chk.eq(&self.id, &other.id, "ID");
        chk.eq(
            &self.approver_set_id,
            &other.approver_set_id,
            "ApproverSetID",
        );
        chk.eq(&self.desired_state, &other.desired_state, "DesiredState");
        chk.eq(&self.title, &other.title, "Title");
        chk.eq(&self.description, &other.description, "Description");
        chk.check(
            refs_match(&self.approvers, &other.approvers, |a| (a.id, a.state.clone())),
            "Approvers",
        );
        chk.eq(&self.saved_notes, &other.saved_notes, "SavedNotes");
        chk.eq(&self.issue_cr, &other.issue_cr, "IssueCR");
        chk.eq(&self.notes, &other.notes, "Notes");
        chk.check(
            refs_match(
                &self.required_approver_sets,
                &other.required_approver_sets,
                |s| (s.id, s.state.clone()),
            ),
            "RequiredApproverSets",
        );
        chk.check(
            refs_match(
                &self.informed_approver_sets,
                &other.informed_approver_sets,
                |s| (s.id, s.state.clone()),
            ),
            "InformedApproverSets",
        );
        chk.finish()
    }
}

impl RegistrarObject for ApproverSetExportFull {
    const OBJECT_TYPE: ObjectType = ObjectType::ApproverSet;
    type Revision = ApproverSetRevisionExport;

    fn id(&self) -> i64 {
        self.id
    }

    fn current_revision(&self) -> &Self::Revision {
        &self.current_revision
    }

    fn pending_revision(&self) -> &Self::Revision {
        &self.pending_revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approver::ApproverRevisionExport;
    use regtrust_crypto::Ed25519Signer;

    fn set_revision() -> ApproverSetRevisionExport {
        ApproverSetRevisionExport {
            id: 12,
            approver_set_id: 6,
            revision_state: "active".into(),
            desired_state: "active".into(),
            title: "infrastructure approvers".into(),
            description: "changes to production zones".into(),
            approvers: vec![],
            saved_notes: String::new(),
            change_request_id: 19,
            issue_cr: "CR-12".into(),
            notes: String::new(),
            required_approver_sets: vec![],
            informed_approver_sets: vec![],
            created_at: Utc::now(),
            created_by: "bootstrap".into(),
            verified_approvers: vec![],
            keys: vec![],
        }
    }

    fn approver_with_key(signer: &Ed25519Signer, fpr: &str) -> ApproverExportFull {
        let revision = ApproverRevisionExport {
            id: 2,
            approver_id: 1,
            revision_state: "active".into(),
            desired_state: "active".into(),
            name: "Jamie Ops".into(),
            email_address: "jamie@example.net".into(),
            role: "registrar operator".into(),
            username: "jamie".into(),
            employee_id: 1041,
            department: "infrastructure".into(),
            is_admin: false,
            public_key: signer.public_key_armored(),
            fingerprint: fpr.into(),
            saved_notes: String::new(),
            change_request_id: 3,
            issue_cr: "CR-2".into(),
            notes: String::new(),
            required_approver_sets: vec![],
            informed_approver_sets: vec![],
            created_at: Utc::now(),
            created_by: "bootstrap".into(),
        };
        ApproverExportFull {
            id: 1,
            state: "active".into(),
            current_revision: revision.clone(),
            pending_revision: revision,
            created_at: Utc::now(),
            created_by: "bootstrap".into(),
        }
    }

    #[test]
    fn verified_member_key_accepts_its_signature() {
        let signer = Ed25519Signer::random();
        let mut revision = set_revision();
        revision
            .add_verified_approver(approver_with_key(&signer, ""))
            .unwrap();
        assert!(revision.has_verified_approvers());

        let blob = envelope::sign(b"{\"Action\":\"approve\"}", &[&signer]).unwrap();
        let (ok, payload) = revision.is_signed_by(&blob);
        assert!(ok);
        assert_eq!(payload, b"{\"Action\":\"approve\"}");
    }

    #[test]
    fn fingerprint_mismatch_rejects_member() {
        let signer = Ed25519Signer::random();
        let mut revision = set_revision();
        let err = revision
            .add_verified_approver(approver_with_key(&signer, "not-the-fingerprint"))
            .unwrap_err();
        assert!(matches!(err, VerifyError::FingerprintMismatch { id: 1 }));
        assert!(!revision.has_verified_approvers());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let member = Ed25519Signer::random();
        let outsider = Ed25519Signer::random();
        let mut revision = set_revision();
        revision
            .add_verified_approver(approver_with_key(&member, ""))
            .unwrap();

        let blob = envelope::sign(b"payload", &[&outsider]).unwrap();
        let (ok, _) = revision.is_signed_by(&blob);
        assert!(!ok);
    }

    #[test]
    fn membership_change_is_reported() {
        let a = set_revision();
        let mut b = a.clone();
        b.approvers.push(ApproverExportShort {
            id: 99,
            state: "active".into(),
            created_at: Utc::now(),
            created_by: "bootstrap".into(),
        });
        let (pass, errs) = a.compare_export(&b);
        assert!(!pass);
        assert!(matches!(
            errs[0],
            VerifyError::FieldMismatch { field: "Approvers" }
        ));
    }
}
