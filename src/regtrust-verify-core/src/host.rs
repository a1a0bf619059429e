//! Host exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approver_set::ApproverSetExportShort;
use crate::compare::{refs_match, FieldChecker};
use crate::error::VerifyError;
use crate::types::{ObjectType, RegistrarObject, RevisionExport};

/// Export snapshot of a host, with its current and pending revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostExport {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,

    /// Fully qualified host name.
    pub host_name: String,
    /// Registry repository object identifier.
    #[serde(rename = "HostROID")]
    pub host_roid: String,

    /// The live, authoritative revision.
    pub current_revision: HostRevisionExport,
    /// The revision proposed by an in-flight change request.
    pub pending_revision: HostRevisionExport,

    /// When the host was created.
    pub created_at: DateTime<Utc>,
    /// Who created the host.
    pub created_by: String,
}

/// Short export of a host, used where domains reference their nameservers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostExportShort {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,
    /// Fully qualified host name.
    pub host_name: String,

    /// When the host was created.
    pub created_at: DateTime<Utc>,
    /// Who created the host.
    pub created_by: String,
}

/// One address record attached to a host revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostAddress {
    /// Address literal.
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    /// IP protocol version, 4 or 6.
    pub protocol: i64,
}

/// Export snapshot of one host revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostRevisionExport {
    /// Revision identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Host this revision belongs to.
    #[serde(rename = "HostID")]
    pub host_id: i64,

    /// Workflow state of the revision.
    pub revision_state: String,
    /// State the object should take when this revision is promoted.
    pub desired_state: String,

    /// EPP clientDeleteProhibited.
    pub client_delete_prohibited_status: bool,
    /// EPP serverDeleteProhibited.
    pub server_delete_prohibited_status: bool,
    /// EPP clientTransferProhibited.
    pub client_transfer_prohibited_status: bool,
    /// EPP serverTransferProhibited.
    pub server_transfer_prohibited_status: bool,
    /// EPP clientUpdateProhibited.
    pub client_update_prohibited_status: bool,
    /// EPP serverUpdateProhibited.
    pub server_update_prohibited_status: bool,

    /// Glue addresses for the host.
    pub host_addresses: Vec<HostAddress>,

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

impl RevisionExport for HostRevisionExport {
    fn id(&self) -> i64 {
        self.id
    }

    fn change_request_id(&self) -> i64 {
        self.change_request_id
    }

    fn compare_export(&self, other: &Self) -> (bool, Vec<VerifyError>) {
        let mut chk = FieldChecker::new();
        chk.eq(&self.id, &other.id, "ID");
        chk.eq(&self.host_id, &other.host_id, "HostID");
        chk.eq(&self.desired_state, &other.desired_state, "DesiredState");
        chk.eq(
            &self.client_delete_prohibited_status,
            &other.client_delete_prohibited_status,
            "ClientDeleteProhibitedStatus",
        );
        chk.eq(
            &self.server_delete_prohibited_status,
            &other.server_delete_prohibited_status,
            "ServerDeleteProhibitedStatus",
        );
        chk.eq(
            &self.client_transfer_prohibited_status,
            &other.client_transfer_prohibited_status,
            "ClientTransferProhibitedStatus",
        );
        chk.eq(
            &self.server_transfer_prohibited_status,
            &other.server_transfer_prohibited_status,
            "ServerTransferProhibitedStatus",
        );
        chk.eq(
            &self.client_update_prohibited_status,
            &other.client_update_prohibited_status,
            "ClientUpdateProhibitedStatus",
        );
        chk.eq(
            &self.server_update_prohibited_status,
            &other.server_update_prohibited_status,
            "ServerUpdateProhibitedStatus",
        );
        chk.check(
            refs_match(&self.host_addresses, &other.host_addresses, |a| {
                (a.ip_address.clone(), a.protocol)
            }),
            "HostAddresses",
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

impl RegistrarObject for HostExport {
    const OBJECT_TYPE: ObjectType = ObjectType::Host;
    type Revision = HostRevisionExport;

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

    fn revision() -> HostRevisionExport {
        HostRevisionExport {
            id: 7,
            host_id: 3,
            revision_state: "active".into(),
            desired_state: "active".into(),
            client_delete_prohibited_status: false,
            server_delete_prohibited_status: true,
            client_transfer_prohibited_status: false,
            server_transfer_prohibited_status: true,
            client_update_prohibited_status: false,
            server_update_prohibited_status: true,
            host_addresses: vec![HostAddress {
                ip_address: "192.0.2.53".into(),
                protocol: 4,
            }],
            saved_notes: String::new(),
            change_request_id: 21,
            issue_cr: "CR-31".into(),
            notes: String::new(),
            required_approver_sets: vec![],
            informed_approver_sets: vec![],
            created_at: Utc::now(),
            created_by: "bootstrap".into(),
        }
    }

    #[test]
    fn identical_revisions_compare_equal() {
        let a = revision();
        let b = a.clone();
        assert!(a.compare_export(&b).0);
    }

    #[test]
    fn added_glue_address_is_reported() {
        let a = revision();
        let mut b = a.clone();
        b.host_addresses.push(HostAddress {
            ip_address: "2001:db8::53".into(),
            protocol: 6,
        });
        let (pass, errs) = a.compare_export(&b);
        assert!(!pass);
        assert!(matches!(
            errs[0],
            VerifyError::FieldMismatch { field: "HostAddresses" }
        ));
    }
}
