//! Domain exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approver_set::ApproverSetExportShort;
use crate::compare::{refs_match, FieldChecker};
use crate::contact::ContactExportShort;
use crate::error::VerifyError;
use crate::host::HostExportShort;
use crate::types::{ObjectType, RegistrarObject, RevisionExport};

/// Export snapshot of a domain, with its current and pending revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainExport {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,

    /// Fully qualified domain name.
    pub domain_name: String,
    /// Registry repository object identifier.
    #[serde(rename = "DomainROID")]
    pub domain_roid: String,

    /// The live, authoritative revision.
    pub current_revision: DomainRevisionExport,
    /// The revision proposed by an in-flight change request.
    pub pending_revision: DomainRevisionExport,

    /// Registration expiry reported by the registry.
    pub expire_date: DateTime<Utc>,

    /// When the domain was created.
    pub created_at: DateTime<Utc>,
    /// Who created the domain.
    pub created_by: String,
}

/// One DS record attached to a domain revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DsDataEntry {
    /// DNSKEY key tag.
    pub key_tag: i64,
    /// DNSSEC algorithm number.
    pub algorithm: i64,
    /// Digest type number.
    pub digest_type: i64,
    /// Hex digest of the DNSKEY.
    pub digest: String,
}

/// Export snapshot of one domain revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainRevisionExport {
    /// Revision identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Domain this revision belongs to.
    #[serde(rename = "DomainID")]
    pub domain_id: i64,

    /// Workflow state of the revision.
    pub revision_state: String,
    /// State the object should take when this revision is promoted.
    pub desired_state: String,

    /// Ownership class, for reporting.
    pub class: String,
    /// Internal owner tag.
    pub owners: String,

    /// EPP clientDeleteProhibited.
    pub client_delete_prohibited_status: bool,
    /// EPP serverDeleteProhibited.
    pub server_delete_prohibited_status: bool,
    /// EPP clientHold.
    pub client_hold_status: bool,
    /// EPP serverHold.
    pub server_hold_status: bool,
    /// EPP clientRenewProhibited.
    pub client_renew_prohibited_status: bool,
    /// EPP serverRenewProhibited.
    pub server_renew_prohibited_status: bool,
    /// EPP clientTransferProhibited.
    pub client_transfer_prohibited_status: bool,
    /// EPP serverTransferProhibited.
    pub server_transfer_prohibited_status: bool,
    /// EPP clientUpdateProhibited.
    pub client_update_prohibited_status: bool,
    /// EPP serverUpdateProhibited.
    pub server_update_prohibited_status: bool,

    /// Registrant contact.
    pub domain_registrant: ContactExportShort,
    /// Administrative contact.
    pub domain_admin_contact: ContactExportShort,
    /// Technical contact.
    pub domain_tech_contact: ContactExportShort,
    /// Billing contact.
    pub domain_billing_contact: ContactExportShort,

    /// Delegated nameservers.
    pub hostnames: Vec<HostExportShort>,
    /// DS records published for the domain.
    #[serde(rename = "DSDataEntries")]
    pub ds_data_entries: Vec<DsDataEntry>,

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

impl RevisionExport for DomainRevisionExport {
    fn id(&self) -> i64 {
        self.id
    }

    fn change_request_id(&self) -> i64 {
        self.change_request_id
    }

    fn compare_export(&self, other: &Self) -> (bool, Vec<VerifyError>) {
        let mut chk = FieldChecker::new();
        chk.eq(&self.id, &other.id, "ID");
        chk.eq(&self.domain_id, &other.domain_id, "DomainID");
        chk.eq(&self.desired_state, &other.desired_state, "DesiredState");
        chk.eq(&self.class, &other.class, "Class");
        chk.eq(&self.owners, &other.owners, "Owners");
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
            &self.client_hold_status,
            &other.client_hold_status,
            "ClientHoldStatus",
        );
        chk.eq(
            &self.server_hold_status,
            &other.server_hold_status,
            "ServerHoldStatus",
        );
        chk.eq(
            &self.client_renew_prohibited_status,
            &other.client_renew_prohibited_status,
            "ClientRenewProhibitedStatus",
        );
        chk.eq(
            &self.server_renew_prohibited_status,
            &other.server_renew_prohibited_status,
            "ServerRenewProhibitedStatus",
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
            contact_matches(&self.domain_registrant, &other.domain_registrant),
            "DomainRegistrant",
        );
        chk.check(
            contact_matches(&self.domain_admin_contact, &other.domain_admin_contact),
            "DomainAdminContact",
        );
        chk.check(
            contact_matches(&self.domain_tech_contact, &other.domain_tech_contact),
            "DomainTechContact",
        );
        chk.check(
            contact_matches(&self.domain_billing_contact, &other.domain_billing_contact),
            "DomainBillingContact",
        );
        chk.check(
            refs_match(&self.hostnames, &other.hostnames, |h| {
                (h.id, h.host_name.clone())
            }),
            "Hostnames",
        );
        chk.check(
            refs_match(&self.ds_data_entries, &other.ds_data_entries, |d| {
                (d.key_tag, d.algorithm, d.digest_type, d.digest.clone())
            }),
            "DSDataEntries",
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

fn contact_matches(a: &ContactExportShort, b: &ContactExportShort) -> bool {
    a.id == b.id && a.name == b.name
}

impl RegistrarObject for DomainExport {
    const OBJECT_TYPE: ObjectType = ObjectType::Domain;
    type Revision = DomainRevisionExport;

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
