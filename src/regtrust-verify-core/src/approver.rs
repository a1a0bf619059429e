//! Approver exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approver_set::ApproverSetExportShort;
use crate::compare::{refs_match, FieldChecker};
use crate::error::VerifyError;
use crate::types::{ObjectType, RegistrarObject, RevisionExport};

/// Export snapshot of an approver, with its current and pending revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproverExportFull {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,

    /// The live, authoritative revision.
    pub current_revision: ApproverRevisionExport,
    /// The revision proposed by an in-flight change request.
    pub pending_revision: ApproverRevisionExport,

    /// When the approver was created.
    pub created_at: DateTime<Utc>,
    /// Who created the approver.
    pub created_by: String,
}

/// Short export of an approver, used where approver sets list their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproverExportShort {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,

    /// When the approver was created.
    pub created_at: DateTime<Utc>,
    /// Who created the approver.
    pub created_by: String,
}

/// Export snapshot of one approver revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproverRevisionExport {
    /// Revision identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Approver this revision belongs to.
    #[serde(rename = "ApproverID")]
    pub approver_id: i64,

    /// Workflow state of the revision.
    pub revision_state: String,
    /// State the object should take when this revision is promoted.
    pub desired_state: String,

    /// Full name.
    pub name: String,
    /// Email address.
    pub email_address: String,
    /// Role within the organization.
    pub role: String,
    /// Login name, matched against attestation usernames.
    pub username: String,
    /// Employee identifier.
    #[serde(rename = "EmployeeID")]
    pub employee_id: i64,
    /// Department.
    pub department: String,
    /// Whether the approver holds administrative privileges.
    pub is_admin: bool,

    /// Armored signing public key for the approver.
    pub public_key: String,
    /// Expected fingerprint of the public key. Empty means unchecked.
    pub fingerprint: String,

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
}

impl RevisionExport for ApproverRevisionExport {
    fn id(&self) -> i64 {
        self.id
    }

    fn change_request_id(&self) -> i64 {
        self.change_request_id
    }

    fn compare_export(&self, other: &Self) -> (bool, Vec<VerifyError>) {
        let mut chk = FieldChecker::new();
        chk.eq(&self.id, &other.id, "ID");
        chk.eq(&self.approver_id, &other.approver_id, "ApproverID");
        chk.eq(&self.desired_state, &other.desired_state, "DesiredState");
        chk.eq(&self.name, &other.name, "Name");
        chk.eq(&self.email_address, &other.email_address, "EmailAddress");
        chk.eq(&self.role, &other.role, "Role");
        chk.eq(&self.username, &other.username, "Username");
        chk.eq(&self.employee_id, &other.employee_id, "EmployeeID");
        chk.eq(&self.department, &other.department, "Department");
        chk.eq(&self.is_admin, &other.is_admin, "IsAdmin");
        chk.eq(&self.public_key, &other.public_key, "PublicKey");
        chk.eq(&self.fingerprint, &other.fingerprint, "Fingerprint");
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

impl RegistrarObject for ApproverExportFull {
    const OBJECT_TYPE: ObjectType = ObjectType::Approver;
    type Revision = ApproverRevisionExport;

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
