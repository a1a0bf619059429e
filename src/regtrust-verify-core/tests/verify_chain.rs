//! End-to-end verification chains over an in-memory store.
//!
//! Fixtures are raw export JSON, built the way the registry emits it, so
//! these tests cover the wire format as well as the chain logic.

use std::sync::Arc;

use serde_json::{json, Value};

use regtrust_crypto::{envelope, Ed25519Signer};
use regtrust_verify_core::{
    ApproverSetExportFull, MemoryStore, ObjectStore, ObjectType, TrustAnchors, VerificationEngine,
    VerifyConfig, VerifyError,
};

fn at(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .expect("fixture timestamp in range")
        .to_rfc3339()
}

fn engine(store: Arc<MemoryStore>, anchors: TrustAnchors) -> VerificationEngine {
    VerificationEngine::new(store, anchors, VerifyConfig::default())
}

fn anchors_for(signer: &Ed25519Signer) -> TrustAnchors {
    let mut anchors = TrustAnchors::new();
    anchors
        .add_key(&signer.public_key_armored())
        .expect("anchor key decodes");
    anchors
}

fn contact_short(id: i64) -> Value {
    json!({
        "ID": id,
        "State": "active",
        "Name": format!("Contact {id}"),
        "CreatedAt": at(10),
        "CreatedBy": "bootstrap",
    })
}

fn domain_revision(id: i64, domain_id: i64, change_request_id: i64) -> Value {
    json!({
        "ID": id,
        "DomainID": domain_id,
        "RevisionState": "active",
        "DesiredState": "active",
        "Class": "corporate",
        "Owners": "infra",
        "ClientDeleteProhibitedStatus": false,
        "ServerDeleteProhibitedStatus": true,
        "ClientHoldStatus": false,
        "ServerHoldStatus": false,
        "ClientRenewProhibitedStatus": false,
        "ServerRenewProhibitedStatus": false,
        "ClientTransferProhibitedStatus": false,
        "ServerTransferProhibitedStatus": true,
        "ClientUpdateProhibitedStatus": false,
        "ServerUpdateProhibitedStatus": true,
        "DomainRegistrant": contact_short(2),
        "DomainAdminContact": contact_short(2),
        "DomainTechContact": contact_short(3),
        "DomainBillingContact": contact_short(4),
        "Hostnames": [],
        "DSDataEntries": [],
        "SavedNotes": "",
        "ChangeRequestID": change_request_id,
        "IssueCR": format!("CR-{change_request_id}"),
        "Notes": "",
        "RequiredApproverSets": [],
        "InformedApproverSets": [],
        "CreatedAt": at(50),
        "CreatedBy": "bootstrap",
    })
}

fn domain(id: i64, name: &str, revision: &Value) -> Value {
    json!({
        "ID": id,
        "State": "active",
        "DomainName": name,
        "DomainROID": format!("D{id}-REG"),
        "CurrentRevision": revision,
        "PendingRevision": revision,
        "ExpireDate": at(4_000_000),
        "CreatedAt": at(10),
        "CreatedBy": "bootstrap",
    })
}

fn approver_revision(
    id: i64,
    approver_id: i64,
    change_request_id: i64,
    public_key: &str,
) -> Value {
    json!({
        "ID": id,
        "ApproverID": approver_id,
        "RevisionState": "active",
        "DesiredState": "active",
        "Name": format!("Approver {approver_id}"),
        "EmailAddress": format!("approver{approver_id}@example.net"),
        "Role": "registrar operator",
        "Username": format!("approver{approver_id}"),
        "EmployeeID": 1000 + approver_id,
        "Department": "infrastructure",
        "IsAdmin": false,
        "PublicKey": public_key,
        "Fingerprint": "",
        "SavedNotes": "",
        "ChangeRequestID": change_request_id,
        "IssueCR": format!("CR-{change_request_id}"),
        "Notes": "",
        "RequiredApproverSets": [],
        "InformedApproverSets": [],
        "CreatedAt": at(50),
        "CreatedBy": "bootstrap",
    })
}

fn approver(id: i64, revision: &Value) -> Value {
    json!({
        "ID": id,
        "State": "active",
        "CurrentRevision": revision,
        "PendingRevision": revision,
        "CreatedAt": at(10),
        "CreatedBy": "bootstrap",
    })
}

fn approver_short(id: i64) -> Value {
    json!({
        "ID": id,
        "State": "active",
        "CreatedAt": at(10),
        "CreatedBy": "bootstrap",
    })
}

fn set_revision(
    id: i64,
    approver_set_id: i64,
    change_request_id: i64,
    member_ids: &[i64],
) -> Value {
    json!({
        "ID": id,
        "ApproverSetID": approver_set_id,
        "RevisionState": "active",
        "DesiredState": "active",
        "Title": format!("approver set {approver_set_id}"),
        "Description": "delegated approvals",
        "Approvers": member_ids.iter().map(|&m| approver_short(m)).collect::<Vec<_>>(),
        "SavedNotes": "",
        "ChangeRequestID": change_request_id,
        "IssueCR": format!("CR-{change_request_id}"),
        "Notes": "",
        "RequiredApproverSets": [],
        "InformedApproverSets": [],
        "CreatedAt": at(50),
        "CreatedBy": "bootstrap",
    })
}

fn approver_set(id: i64, revision: &Value) -> Value {
    json!({
        "ID": id,
        "State": "active",
        "CurrentRevision": revision,
        "PendingRevision": revision,
        "CreatedAt": at(10),
        "CreatedBy": "bootstrap",
    })
}

/// Signs an attestation over `export` the way an approver's workstation
/// does: decision plus the full endorsed export, wrapped in an envelope.
fn attestation_blob(
    approval_id: i64,
    export: &Value,
    object_type: &str,
    action: &str,
    signer: &Ed25519Signer,
) -> Vec<u8> {
    let attestation = json!({
        "ApprovalID": approval_id,
        "ExportRev": export,
        "Username": "ops",
        "Action": action,
        "ObjectType": object_type,
        "Signature": [],
    });
    let payload = serde_json::to_vec(&attestation).expect("attestation serializes");
    envelope::sign(&payload, &[signer]).expect("envelope signs")
}

fn change_request(
    id: i64,
    object_type: &str,
    object_id: i64,
    proposed_revision_id: i64,
    approver_set_id: i64,
    signature: &[u8],
    created_secs: i64,
) -> Value {
    json!({
        "ID": id,
        "State": "approved",
        "RegistrarObjectType": object_type,
        "RegistrarObjectID": object_id,
        "InitialRevisionID": 0,
        "ProposedRevisionID": proposed_revision_id,
        "Approvals": [{
            "ID": id * 10,
            "State": "approved",
            "IsSigned": true,
            "IsFinalApproval": true,
            "ChangeRequestID": id,
            "ApproverSetID": approver_set_id,
            "Signature": signature,
            "CreatedAt": at(created_secs),
            "CreatedBy": "ops",
        }],
        "CreatedAt": at(created_secs),
        "CreatedBy": "ops",
    })
}

fn put(store: &MemoryStore, object_type: ObjectType, id: i64, valid_from: i64, value: &Value) {
    store.put(
        object_type,
        id,
        valid_from,
        serde_json::to_vec(value).expect("fixture serializes"),
    );
}

/// Stores an approver whose own change request is signed directly by the
/// given anchor. Returns nothing; the approver is id `id` with key `key`.
fn seed_anchor_signed_approver(
    store: &MemoryStore,
    id: i64,
    change_request_id: i64,
    key: &Ed25519Signer,
    anchor: &Ed25519Signer,
    created_secs: i64,
) {
    let revision = approver_revision(id * 10, id, change_request_id, &key.public_key_armored());
    let export = approver(id, &revision);
    let blob = attestation_blob(change_request_id * 10, &export, "approver", "approve", anchor);
    let cr = change_request(
        change_request_id,
        "approver",
        id,
        id * 10,
        0,
        &blob,
        created_secs,
    );
    put(store, ObjectType::Approver, id, 100, &export);
    put(store, ObjectType::ChangeRequest, change_request_id, 100, &cr);
}

/// Stores an approver set whose own change request is anchor-signed.
fn seed_anchor_signed_set(
    store: &MemoryStore,
    id: i64,
    change_request_id: i64,
    member_ids: &[i64],
    anchor: &Ed25519Signer,
    created_secs: i64,
) {
    let revision = set_revision(id * 10, id, change_request_id, member_ids);
    let export = approver_set(id, &revision);
    let blob = attestation_blob(
        change_request_id * 10,
        &export,
        "approverset",
        "approve",
        anchor,
    );
    let cr = change_request(
        change_request_id,
        "approverset",
        id,
        id * 10,
        0,
        &blob,
        created_secs,
    );
    put(store, ObjectType::ApproverSet, id, 100, &export);
    put(store, ObjectType::ChangeRequest, change_request_id, 100, &cr);
}

#[tokio::test]
async fn anchor_signed_domain_verifies() {
    let root = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &root);
    let cr = change_request(11, "domain", 1, 2, 0, &blob, 120);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 150).await;
    assert!(result.verified, "{:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.object.unwrap().domain_name, "example.net");
}

#[tokio::test]
async fn declined_attestation_does_not_verify() {
    let root = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "decline", &root);
    let cr = change_request(11, "domain", 1, 2, 0, &blob, 120);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 150).await;
    assert!(!result.verified);
    assert!(result.object.is_none());
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::NotApproved { id: 11 })));
}

#[tokio::test]
async fn tampered_live_state_is_detected() {
    let root = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &root);
    let cr = change_request(11, "domain", 1, 2, 0, &blob, 120);

    // The live copy drifts after signing: a nameserver appears that the
    // approval never endorsed.
    let mut live = export.clone();
    live["CurrentRevision"]["Hostnames"] = json!([{
        "ID": 66, "State": "active", "HostName": "ns1.attacker.example",
        "CreatedAt": at(130), "CreatedBy": "attacker",
    }]);
    put(&store, ObjectType::Domain, 1, 100, &live);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 150).await;
    assert!(!result.verified);
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::FieldMismatch { field: "Hostnames" })));
}

#[tokio::test]
async fn wrong_object_kind_in_attestation_is_rejected() {
    let root = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    // Attestation claims to endorse a host.
    let blob = attestation_blob(110, &export, "host", "approve", &root);
    let cr = change_request(11, "domain", 1, 2, 0, &blob, 120);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 150).await;
    assert!(!result.verified);
    assert!(result.errors.iter().any(|e| matches!(
        e,
        VerifyError::WrongObjectType {
            actual: ObjectType::Host,
            expected: ObjectType::Domain,
            ..
        }
    )));
}

#[tokio::test]
async fn empty_anchor_set_verifies_nothing() {
    let root = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &root);
    let cr = change_request(11, "domain", 1, 2, 0, &blob, 120);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    // Same data, but the verifier pins no anchors.
    let engine = engine(store, TrustAnchors::new());
    let result = engine.get_verified_domain(1, 150).await;
    assert!(!result.verified);
}

#[tokio::test]
async fn verification_is_idempotent() {
    let root = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &root);
    let cr = change_request(11, "domain", 1, 2, 0, &blob, 120);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let first = engine.verify_change_request(11, 2).await;
    let second = engine.verify_change_request(11, 2).await;
    assert!(first.verified);
    assert!(second.verified);
    assert_eq!(first.signed_payload, second.signed_payload);
    assert_eq!(first.object_type, second.object_type);
}

#[tokio::test]
async fn delegated_set_verifies_with_one_surviving_member() {
    let root = Ed25519Signer::random();
    let member1 = Ed25519Signer::random();
    let member2 = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    // Member 1 is fully anchored. Member 2 exists but its change request
    // is missing; member 3 is not in the store at all.
    seed_anchor_signed_approver(&store, 1, 31, &member1, &root, 105);
    let rev2 = approver_revision(20, 2, 32, &member2.public_key_armored());
    put(&store, ObjectType::Approver, 2, 100, &approver(2, &rev2));
    seed_anchor_signed_set(&store, 6, 61, &[1, 2, 3], &root, 110);

    // The domain approval is signed by member 1 on behalf of set 6.
    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &member1);
    let cr = change_request(11, "domain", 1, 2, 6, &blob, 150);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 200).await;
    assert!(result.verified, "{:?}", result.errors);
    // Member failures are tolerated but still reported.
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::ApproverNotVerified { id: 2, .. })));
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::ApproverNotVerified { id: 3, .. })));
}

#[tokio::test]
async fn quorum_loss_fails_the_delegated_chain() {
    let root = Ed25519Signer::random();
    let member1 = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    // Set 7 declares members 2 and 3; neither can be verified.
    seed_anchor_signed_set(&store, 7, 71, &[2, 3], &root, 110);

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &member1);
    let cr = change_request(11, "domain", 1, 2, 7, &blob, 150);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 200).await;
    assert!(!result.verified);
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::NoVerifiedApprovers { id: 7, .. })));
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::ApproverSetNotVerified { id: 7 })));
}

#[tokio::test]
async fn member_signature_does_not_rescue_an_unverified_set() {
    let root = Ed25519Signer::random();
    let member1 = Ed25519Signer::random();
    let rogue = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    seed_anchor_signed_approver(&store, 1, 31, &member1, &root, 105);

    // Set 9's own change request is signed by a key no anchor knows, so
    // the set never verifies even though member 1 would.
    let set_rev = set_revision(90, 9, 91, &[1]);
    let set_export = approver_set(9, &set_rev);
    let set_blob = attestation_blob(910, &set_export, "approverset", "approve", &rogue);
    let set_cr = change_request(91, "approverset", 9, 90, 0, &set_blob, 110);
    put(&store, ObjectType::ApproverSet, 9, 100, &set_export);
    put(&store, ObjectType::ChangeRequest, 91, 100, &set_cr);

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &member1);
    let cr = change_request(11, "domain", 1, 2, 9, &blob, 150);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 200).await;
    assert!(!result.verified);
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, VerifyError::ApproverSetNotVerified { id: 9 })));
}

#[tokio::test]
async fn self_delegating_set_trips_cycle_detection() {
    let root = Ed25519Signer::random();
    let rogue = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    // Set 8's own change request names set 8 as its approver set.
    let set_rev = set_revision(80, 8, 81, &[1]);
    let set_export = approver_set(8, &set_rev);
    let set_blob = attestation_blob(810, &set_export, "approverset", "approve", &rogue);
    let set_cr = change_request(81, "approverset", 8, 80, 8, &set_blob, 150);
    put(&store, ObjectType::ApproverSet, 8, 100, &set_export);
    put(&store, ObjectType::ChangeRequest, 81, 100, &set_cr);

    let revision = domain_revision(2, 1, 11);
    let export = domain(1, "example.net", &revision);
    let blob = attestation_blob(110, &export, "domain", "approve", &rogue);
    let cr = change_request(11, "domain", 1, 2, 8, &blob, 150);
    put(&store, ObjectType::Domain, 1, 100, &export);
    put(&store, ObjectType::ChangeRequest, 11, 100, &cr);

    let engine = engine(store, anchors_for(&root));
    let result = engine.get_verified_domain(1, 200).await;
    assert!(!result.verified);
    assert!(result.errors.iter().any(|e| matches!(
        e,
        VerifyError::ChainCycle {
            object_type: ObjectType::ApproverSet,
            id: 8,
            ..
        }
    )));
}

#[tokio::test]
async fn membership_resolves_as_of_the_approval_instant() {
    let root = Ed25519Signer::random();
    let member1 = Ed25519Signer::random();
    let member4 = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    seed_anchor_signed_approver(&store, 1, 31, &member1, &root, 105);
    seed_anchor_signed_approver(&store, 4, 34, &member4, &root, 105);

    // Set 10 rotates membership at t=300: member 1 out, member 4 in.
    seed_anchor_signed_set(&store, 10, 101, &[1], &root, 110);
    let new_rev = set_revision(102, 10, 103, &[4]);
    let new_export = approver_set(10, &new_rev);
    let new_blob = attestation_blob(1030, &new_export, "approverset", "approve", &root);
    let new_cr = change_request(103, "approverset", 10, 102, 0, &new_blob, 310);
    put(&store, ObjectType::ApproverSet, 10, 300, &new_export);
    put(&store, ObjectType::ChangeRequest, 103, 300, &new_cr);

    // Domain revision 41 was approved at t=150 by member 1; revision 42
    // at t=350 by member 4, each under the membership of its own moment.
    let old_rev = domain_revision(41, 4, 14);
    let old_export = domain(4, "example.org", &old_rev);
    let old_blob = attestation_blob(140, &old_export, "domain", "approve", &member1);
    let old_cr = change_request(14, "domain", 4, 41, 10, &old_blob, 150);
    put(&store, ObjectType::Domain, 4, 100, &old_export);
    put(&store, ObjectType::ChangeRequest, 14, 100, &old_cr);

    let new_rev = domain_revision(42, 4, 15);
    let new_export = domain(4, "example.org", &new_rev);
    let new_blob = attestation_blob(150, &new_export, "domain", "approve", &member4);
    let new_cr = change_request(15, "domain", 4, 42, 10, &new_blob, 350);
    put(&store, ObjectType::Domain, 4, 300, &new_export);
    put(&store, ObjectType::ChangeRequest, 15, 300, &new_cr);

    let engine = engine(store, anchors_for(&root));

    let old = engine.get_verified_domain(4, 200).await;
    assert!(old.verified, "{:?}", old.errors);
    assert_eq!(old.object.unwrap().current_revision.id, 41);

    let new = engine.get_verified_domain(4, 400).await;
    assert!(new.verified, "{:?}", new.errors);
    assert_eq!(new.object.unwrap().current_revision.id, 42);
}

#[tokio::test]
async fn verify_approver_set_reports_surviving_members() {
    let root = Ed25519Signer::random();
    let member1 = Ed25519Signer::random();
    let store = Arc::new(MemoryStore::new());

    seed_anchor_signed_approver(&store, 1, 31, &member1, &root, 105);
    seed_anchor_signed_set(&store, 6, 61, &[1, 3], &root, 110);

    let bytes = store
        .fetch(ObjectType::ApproverSet, 6)
        .await
        .expect("set fixture present");
    let set: ApproverSetExportFull = serde_json::from_slice(&bytes).expect("set parses");

    let engine = engine(store, anchors_for(&root));
    let outcome = engine.verify_approver_set(&set).await;
    assert!(outcome.verified, "{:?}", outcome.errors);
    let revision = outcome.revision.expect("verified outcome carries revision");
    assert_eq!(revision.verified_approvers().len(), 1);
    assert_eq!(revision.verified_approvers()[0].id, 1);
}
