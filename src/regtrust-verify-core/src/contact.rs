//! Contact exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approver_set::ApproverSetExportShort;
use crate::compare::{refs_match, FieldChecker};
use crate::error::VerifyError;
use crate::types::{ObjectType, RegistrarObject, RevisionExport};

/// Export snapshot of a contact, with its current and pending revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactExport {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,

    /// Identifier of this contact at the registry.
    #[serde(rename = "ContactRegistryID")]
    pub contact_registry_id: String,
    /// Registry repository object identifier.
    #[serde(rename = "ContactROID")]
    pub contact_roid: String,

    /// The live, authoritative revision.
    pub current_revision: ContactRevisionExport,
    /// The revision proposed by an in-flight change request.
    pub pending_revision: ContactRevisionExport,

    /// When the contact was created.
    pub created_at: DateTime<Utc>,
    /// Who created the contact.
    pub created_by: String,
}

/// Short export of a contact, used where other objects reference one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactExportShort {
    /// Row identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Workflow state.
    pub state: String,
    /// Display name.
    pub name: String,

    /// When the contact was created.
    pub created_at: DateTime<Utc>,
    /// Who created the contact.
    pub created_by: String,
}

/// Export snapshot of one contact revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactRevisionExport {
    /// Revision identifier.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Contact this revision belongs to.
    #[serde(rename = "ContactID")]
    pub contact_id: i64,

    /// Workflow state of the revision.
    pub revision_state: String,
    /// State the object should take when this revision is promoted.
    pub desired_state: String,

    /// Full name.
    pub name: String,
    /// Organization.
    pub org: String,
    /// Street address.
    pub address_street: String,
    /// City.
    pub address_city: String,
    /// State or province.
    pub address_state: String,
    /// Postal code.
    pub address_postal_code: String,
    /// Country code.
    pub address_country: String,
    /// Email address.
    pub email_address: String,
    /// Voice phone number.
    pub voice_phone_number: String,
    /// Fax number.
    pub fax_phone_number: String,

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

impl RevisionExport for ContactRevisionExport {
    fn id(&self) -> i64 {
        self.id
    }

    fn change_request_id(&self) -> i64 {
        self.change_request_id
    }

    fn compare_export(&self, other: &Self) -> (bool, Vec<VerifyError>) {
        let mut chk = FieldChecker::new();
        chk.eq(&self.id, &other.id, "ID");
        chk.eq(&self.contact_id, &other.contact_id, "ContactID");
        chk.eq(&self.desired_state, &other.desired_state, "DesiredState");
        chk.eq(&self.name, &other.name, "Name");
        chk.eq(&self.org, &other.org, "Org");
        chk.eq(&self.address_street, &other.address_street, "AddressStreet");
        chk.eq(&self.address_city, &other.address_city, "AddressCity");
        chk.eq(&self.address_state, &other.address_state, "AddressState");
        chk.eq(
            &self.address_postal_code,
            &other.address_postal_code,
            "AddressPostalCode",
        );
        chk.eq(
            &self.address_country,
            &other.address_country,
            "AddressCountry",
        );
        chk.eq(&self.email_address, &other.email_address, "EmailAddress");
        chk.eq(
            &self.voice_phone_number,
            &other.voice_phone_number,
            "VoicePhoneNumber",
        );
        chk.eq(
            &self.fax_phone_number,
            &other.fax_phone_number,
            "FaxPhoneNumber",
        );
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

impl RegistrarObject for ContactExport {
    const OBJECT_TYPE: ObjectType = ObjectType::Contact;
    type Revision = ContactRevisionExport;

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

    fn revision() -> ContactRevisionExport {
        ContactRevisionExport {
            id: 4,
            contact_id: 2,
            revision_state: "active".into(),
            desired_state: "active".into(),
            name: "Jamie Ops".into(),
            org: "Example Registrar".into(),
            address_street: "1 Registry Way".into(),
            address_city: "Springfield".into(),
            address_state: "OR".into(),
            address_postal_code: "97477".into(),
            address_country: "US".into(),
            email_address: "ops@example.net".into(),
            voice_phone_number: "+1.5415551212".into(),
            fax_phone_number: String::new(),
            client_delete_prohibited_status: false,
            server_delete_prohibited_status: true,
            client_transfer_prohibited_status: false,
            server_transfer_prohibited_status: true,
            client_update_prohibited_status: false,
            server_update_prohibited_status: false,
            saved_notes: String::new(),
            change_request_id: 11,
            issue_cr: "CR-88".into(),
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
        let (pass, errs) = a.compare_export(&b);
        assert!(pass);
        assert!(errs.is_empty());
    }

    #[test]
    fn bookkeeping_fields_are_ignored() {
        let a = revision();
        let mut b = a.clone();
        b.created_by = "someone-else".into();
        b.revision_state = "superseded".into();
        assert!(a.compare_export(&b).0);
    }

    #[test]
    fn email_drift_is_reported() {
        let a = revision();
        let mut b = a.clone();
        b.email_address = "evil@example.net".into();
        let (pass, errs) = a.compare_export(&b);
        assert!(!pass);
        assert!(matches!(
            errs[0],
            VerifyError::FieldMismatch { field: "EmailAddress" }
        ));
    }
}
