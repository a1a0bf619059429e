//! The trust-chain verification engine.
//!
//! Every entry point answers the same question: is this piece of registry
//! state backed by a signature chain that terminates at a pinned trust
//! anchor? Approvals signed directly by an anchor are accepted as-is;
//! approvals signed by a delegated approver set are accepted only after the
//! set itself has been verified, recursively and as of the moment the
//! approval was created.
//!
//! Verification never mutates anything. Each call returns an outcome with
//! an explicit `verified` flag and the errors accumulated along the way;
//! any failure leaves the flag false.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::approver::ApproverExportFull;
use crate::approver_set::{ApproverSetExportFull, ApproverSetRevisionExport};
use crate::config::VerifyConfig;
use crate::contact::ContactExport;
use crate::domain::DomainExport;
use crate::error::VerifyError;
use crate::host::HostExport;
use crate::keyset::{KeySet, TrustAnchors};
use crate::store::ObjectStore;
use crate::types::{
    Action, ApprovalExport, Attestation, ChangeRequestExport, ObjectType, RegistrarObject,
    RevisionExport,
};

/// Outcome of verifying a change request's approval chain.
#[derive(Debug)]
pub struct ChangeRequestOutcome {
    /// Whether the chain terminated at a trust anchor with an approval.
    pub verified: bool,
    /// Errors accumulated along the way.
    pub errors: Vec<VerifyError>,
    /// The endorsed object export recovered from the final approval's
    /// signature. Empty unless `verified`.
    pub signed_payload: Vec<u8>,
    /// Kind of object the attestation endorses. `None` unless `verified`.
    pub object_type: Option<ObjectType>,
}

impl ChangeRequestOutcome {
    fn failed(errors: Vec<VerifyError>) -> Self {
        Self {
            verified: false,
            errors,
            signed_payload: Vec::new(),
            object_type: None,
        }
    }
}

/// Outcome of verifying an approver set.
#[derive(Debug)]
pub struct ApproverSetOutcome {
    /// Whether the set's current revision is anchored and has at least one
    /// verified member.
    pub verified: bool,
    /// The set's current revision with verified members attached.
    /// `None` unless `verified`.
    pub revision: Option<ApproverSetRevisionExport>,
    /// Errors accumulated along the way, including tolerated member
    /// failures.
    pub errors: Vec<VerifyError>,
}

impl ApproverSetOutcome {
    fn failed(errors: Vec<VerifyError>) -> Self {
        Self {
            verified: false,
            revision: None,
            errors,
        }
    }
}

/// Outcome of fetching and verifying a registry object.
#[derive(Debug)]
pub struct VerifiedObject<T> {
    /// Whether the object's current revision matched its signed approval.
    pub verified: bool,
    /// Errors accumulated along the way.
    pub errors: Vec<VerifyError>,
    /// The fetched object. `None` unless `verified`.
    pub object: Option<T>,
}

impl<T> VerifiedObject<T> {
    fn failed(errors: Vec<VerifyError>) -> Self {
        Self {
            verified: false,
            errors,
            object: None,
        }
    }
}

/// Tracks delegation depth and visited nodes along one verification call.
///
/// Nodes are keyed by kind, identifier, and resolution timestamp, so the
/// same set resolved at two different instants counts as two nodes.
/// Revisits and depth overruns fail closed.
#[derive(Debug, Clone)]
struct ChainGuard {
    depth: usize,
    max: usize,
    visited: HashSet<(ObjectType, i64, i64)>,
}

impl ChainGuard {
    fn new(max: usize) -> Self {
        Self {
            depth: 0,
            max,
            visited: HashSet::new(),
        }
    }

    fn enter(
        &self,
        object_type: ObjectType,
        id: i64,
        timestamp: i64,
    ) -> Result<Self, VerifyError> {
        if self.depth >= self.max {
            return Err(VerifyError::ChainLimit { max: self.max });
        }
        let node = (object_type, id, timestamp);
        if self.visited.contains(&node) {
            return Err(VerifyError::ChainCycle {
                object_type,
                id,
                timestamp,
            });
        }
        let mut next = self.clone();
        next.depth += 1;
        next.visited.insert(node);
        Ok(next)
    }
}

/// The verification engine.
///
/// Holds the pinned trust anchors and the export source; all verification
/// calls are read-only and safe to issue concurrently.
pub struct VerificationEngine {
    store: Arc<dyn ObjectStore>,
    anchors: TrustAnchors,
    config: VerifyConfig,
}

impl VerificationEngine {
    /// Builds an engine over a store and a set of pinned anchors.
    pub fn new(store: Arc<dyn ObjectStore>, anchors: TrustAnchors, config: VerifyConfig) -> Self {
        debug!(anchors = anchors.len(), "verification engine ready");
        Self {
            store,
            anchors,
            config,
        }
    }

    /// The pinned trust anchors.
    pub fn anchors(&self) -> &TrustAnchors {
        &self.anchors
    }

    /// Verifies a change request's approval chain.
    ///
    /// `expected_revision_id` is the revision the caller believes the
    /// change request proposes; a disagreement is logged but does not fail
    /// the chain, since the signed payload is compared structurally by the
    /// object entry points anyway.
    #[instrument(skip(self))]
    pub async fn verify_change_request(
        &self,
        change_request_id: i64,
        expected_revision_id: i64,
    ) -> ChangeRequestOutcome {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.verify_change_request_inner(change_request_id, Some(expected_revision_id), &guard)
            .await
    }

    /// Verifies an already-fetched approver set.
    ///
    /// On success the outcome carries the set's current revision with the
    /// members that survived independent verification attached.
    #[instrument(skip(self, set), fields(approver_set = set.id))]
    pub async fn verify_approver_set(&self, set: &ApproverSetExportFull) -> ApproverSetOutcome {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.verify_approver_set_inner(set, guard).await
    }

    /// Fetches the domain as of `timestamp` and verifies it.
    #[instrument(skip(self))]
    pub async fn get_verified_domain(
        &self,
        id: i64,
        timestamp: i64,
    ) -> VerifiedObject<DomainExport> {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.get_verified_inner(id, timestamp, &guard).await
    }

    /// Fetches the host as of `timestamp` and verifies it.
    #[instrument(skip(self))]
    pub async fn get_verified_host(&self, id: i64, timestamp: i64) -> VerifiedObject<HostExport> {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.get_verified_inner(id, timestamp, &guard).await
    }

    /// Fetches the contact as of `timestamp` and verifies it.
    #[instrument(skip(self))]
    pub async fn get_verified_contact(
        &self,
        id: i64,
        timestamp: i64,
    ) -> VerifiedObject<ContactExport> {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.get_verified_inner(id, timestamp, &guard).await
    }

    /// Fetches the approver as of `timestamp` and verifies it.
    #[instrument(skip(self))]
    pub async fn get_verified_approver(
        &self,
        id: i64,
        timestamp: i64,
    ) -> VerifiedObject<ApproverExportFull> {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.get_verified_inner(id, timestamp, &guard).await
    }

    /// Fetches the approver set as of `timestamp` and verifies it.
    #[instrument(skip(self))]
    pub async fn get_verified_approver_set(
        &self,
        id: i64,
        timestamp: i64,
    ) -> VerifiedObject<ApproverSetExportFull> {
        let guard = ChainGuard::new(self.config.max_chain_depth);
        self.get_verified_inner(id, timestamp, &guard).await
    }

    async fn get_verified_inner<T: RegistrarObject>(
        &self,
        id: i64,
        timestamp: i64,
        guard: &ChainGuard,
    ) -> VerifiedObject<T> {
        let bytes = match self.store.fetch_at(T::OBJECT_TYPE, id, timestamp).await {
            Ok(bytes) => bytes,
            Err(err) => return VerifiedObject::failed(vec![err.into()]),
        };
        let object: T = match parse_export(T::OBJECT_TYPE, id, &bytes) {
            Ok(object) => object,
            Err(err) => return VerifiedObject::failed(vec![err]),
        };

        let current = object.current_revision();
        if current.id() <= 0 {
            return VerifiedObject::failed(vec![VerifyError::NoCurrentRevision {
                object_type: T::OBJECT_TYPE,
                id,
            }]);
        }
        let change_request_id = current.change_request_id();
        if change_request_id <= 0 {
            return VerifiedObject::failed(vec![VerifyError::NoChangeRequest {
                object_type: T::OBJECT_TYPE,
                revision_id: current.id(),
            }]);
        }

        let chain = self
            .verify_change_request_inner(change_request_id, None, guard)
            .await;
        let mut errors = chain.errors;
        if !chain.verified {
            return VerifiedObject::failed(errors);
        }
        if chain.object_type != Some(T::OBJECT_TYPE) {
            errors.push(VerifyError::WrongObjectType {
                id: change_request_id,
                actual: chain.object_type.unwrap_or(ObjectType::ChangeRequest),
                expected: T::OBJECT_TYPE,
            });
            return VerifiedObject::failed(errors);
        }

        let signed: T = match parse_export(T::OBJECT_TYPE, id, &chain.signed_payload) {
            Ok(signed) => signed,
            Err(err) => {
                errors.push(err);
                return VerifiedObject::failed(errors);
            }
        };

        // A signed export freezes the proposed change as its pending
        // revision; once promoted, that same revision is the live current
        // one. Drift between the two is tamper evidence.
        let (matched, mismatches) = object
            .current_revision()
            .compare_export(signed.pending_revision());
        errors.extend(mismatches);
        if !matched {
            return VerifiedObject::failed(errors);
        }

        debug!(object_type = %T::OBJECT_TYPE, id, "object verified");
        VerifiedObject {
            verified: true,
            errors,
            object: Some(object),
        }
    }

    async fn verify_change_request_inner(
        &self,
        change_request_id: i64,
        expected_revision_id: Option<i64>,
        guard: &ChainGuard,
    ) -> ChangeRequestOutcome {
        if change_request_id <= 0 {
            return ChangeRequestOutcome::failed(vec![VerifyError::InvalidChangeRequestId {
                id: change_request_id,
            }]);
        }

        let bytes = match self
            .store
            .fetch(ObjectType::ChangeRequest, change_request_id)
            .await
        {
            Ok(bytes) => bytes,
            Err(err) => return ChangeRequestOutcome::failed(vec![err.into()]),
        };
        let cr: ChangeRequestExport =
            match parse_export(ObjectType::ChangeRequest, change_request_id, &bytes) {
                Ok(cr) => cr,
                Err(err) => return ChangeRequestOutcome::failed(vec![err]),
            };

        if let Some(expected) = expected_revision_id {
            if expected != cr.proposed_revision_id {
                warn!(
                    change_request = cr.id,
                    expected,
                    proposed = cr.proposed_revision_id,
                    "change request proposes a different revision than expected"
                );
            }
        }

        let Some(approval) = cr.final_approval() else {
            return ChangeRequestOutcome::failed(vec![VerifyError::NoFinalApproval { id: cr.id }]);
        };

        let mut errors = Vec::new();
        let (anchored, payload) = self.anchors.is_signed_by(&approval.signature);
        let payload = if anchored {
            debug!(change_request = cr.id, "final approval signed by trust anchor");
            payload
        } else {
            match self
                .verify_delegated_approval(cr.id, approval, &mut errors, guard)
                .await
            {
                Ok(payload) => payload,
                Err(err) => {
                    errors.push(err);
                    return ChangeRequestOutcome::failed(errors);
                }
            }
        };

        let attestation = match Attestation::from_payload(&payload) {
            Ok(attestation) => attestation,
            Err(err) => {
                errors.push(err);
                return ChangeRequestOutcome::failed(errors);
            }
        };
        if attestation.action != Action::Approved {
            errors.push(VerifyError::NotApproved { id: cr.id });
            return ChangeRequestOutcome::failed(errors);
        }

        debug!(
            change_request = cr.id,
            signer = %attestation.username,
            object_type = %attestation.object_type,
            "change request verified"
        );
        ChangeRequestOutcome {
            verified: true,
            errors,
            signed_payload: attestation.export_rev.get().as_bytes().to_vec(),
            object_type: Some(attestation.object_type),
        }
    }

    /// Resolves the approver set the approval names, as of the approval's
    /// creation, verifies it, and checks the approval signature against the
    /// set's verified member keys.
    async fn verify_delegated_approval(
        &self,
        change_request_id: i64,
        approval: &ApprovalExport,
        errors: &mut Vec<VerifyError>,
        guard: &ChainGuard,
    ) -> Result<Vec<u8>, VerifyError> {
        let timestamp = approval.created_at.timestamp();
        debug!(
            change_request = change_request_id,
            approver_set = approval.approver_set_id,
            timestamp,
            "final approval not anchor-signed, trying delegated approver set"
        );

        let bytes = self
            .store
            .fetch_at(ObjectType::ApproverSet, approval.approver_set_id, timestamp)
            .await?;
        let set: ApproverSetExportFull =
            parse_export(ObjectType::ApproverSet, approval.approver_set_id, &bytes)?;

        let child = guard.enter(ObjectType::ApproverSet, set.id, timestamp)?;
        let outcome = self.verify_approver_set_inner(&set, child).await;
        errors.extend(outcome.errors);
        let Some(revision) = outcome.revision.filter(|_| outcome.verified) else {
            return Err(VerifyError::ApproverSetNotVerified {
                id: approval.approver_set_id,
            });
        };

        let (signed, payload) = revision.is_signed_by(&approval.signature);
        if !signed {
            return Err(VerifyError::NotSignedByAnchor);
        }
        Ok(payload)
    }

    fn verify_approver_set_inner<'a>(
        &'a self,
        set: &'a ApproverSetExportFull,
        guard: ChainGuard,
    ) -> BoxFuture<'a, ApproverSetOutcome> {
        async move {
            let current = set.current_revision();
            if current.id() <= 0 {
                return ApproverSetOutcome::failed(vec![VerifyError::NoCurrentRevision {
                    object_type: ObjectType::ApproverSet,
                    id: set.id,
                }]);
            }
            let change_request_id = current.change_request_id();
            if change_request_id <= 0 {
                return ApproverSetOutcome::failed(vec![VerifyError::NoChangeRequest {
                    object_type: ObjectType::ApproverSet,
                    revision_id: current.id(),
                }]);
            }

            let bytes = match self
                .store
                .fetch(ObjectType::ChangeRequest, change_request_id)
                .await
            {
                Ok(bytes) => bytes,
                Err(err) => return ApproverSetOutcome::failed(vec![err.into()]),
            };
            let cr: ChangeRequestExport =
                match parse_export(ObjectType::ChangeRequest, change_request_id, &bytes) {
                    Ok(cr) => cr,
                    Err(err) => return ApproverSetOutcome::failed(vec![err]),
                };
            let Some(approval) = cr.final_approval() else {
                return ApproverSetOutcome::failed(vec![VerifyError::NoFinalApproval {
                    id: cr.id,
                }]);
            };

            let mut errors = Vec::new();
            let (anchored, payload) = self.anchors.is_signed_by(&approval.signature);
            let payload = if anchored {
                debug!(approver_set = set.id, "set approval signed by trust anchor");
                payload
            } else {
                match self
                    .verify_delegated_approval(cr.id, approval, &mut errors, &guard)
                    .await
                {
                    Ok(payload) => payload,
                    Err(err) => {
                        errors.push(err);
                        return ApproverSetOutcome::failed(errors);
                    }
                }
            };

            let attestation = match Attestation::from_payload(&payload) {
                Ok(attestation) => attestation,
                Err(err) => {
                    errors.push(err);
                    return ApproverSetOutcome::failed(errors);
                }
            };
            if attestation.action != Action::Approved {
                errors.push(VerifyError::NotApproved { id: cr.id });
                return ApproverSetOutcome::failed(errors);
            }
            if attestation.object_type != ObjectType::ApproverSet {
                errors.push(VerifyError::WrongObjectType {
                    id: cr.id,
                    actual: attestation.object_type,
                    expected: ObjectType::ApproverSet,
                });
                return ApproverSetOutcome::failed(errors);
            }

            let endorsed: ApproverSetExportFull = match parse_export(
                ObjectType::ApproverSet,
                set.id,
                attestation.export_rev.get().as_bytes(),
            ) {
                Ok(endorsed) => endorsed,
                Err(err) => {
                    errors.push(err);
                    return ApproverSetOutcome::failed(errors);
                }
            };
            let (matched, mismatches) = set
                .current_revision()
                .compare_export(endorsed.pending_revision());
            errors.extend(mismatches);
            if !matched {
                return ApproverSetOutcome::failed(errors);
            }

            // Membership is only trusted via members that verify on their
            // own; one surviving member is enough.
            let mut revision = set.current_revision().clone();
            let member_timestamp = cr.created_at.timestamp();
            let members = revision.approvers.clone();
            for member in &members {
                let child = match guard.enter(ObjectType::Approver, member.id, member_timestamp) {
                    Ok(child) => child,
                    Err(err) => {
                        errors.push(err);
                        errors.push(VerifyError::ApproverNotVerified {
                            id: member.id,
                            timestamp: member_timestamp,
                        });
                        continue;
                    }
                };
                let verified: VerifiedObject<ApproverExportFull> = self
                    .get_verified_inner(member.id, member_timestamp, &child)
                    .await;
                errors.extend(verified.errors);
                let Some(approver) = verified.object.filter(|_| verified.verified) else {
                    errors.push(VerifyError::ApproverNotVerified {
                        id: member.id,
                        timestamp: member_timestamp,
                    });
                    continue;
                };
                if let Err(err) = revision.add_verified_approver(approver) {
                    errors.push(err);
                    errors.push(VerifyError::ApproverNotVerified {
                        id: member.id,
                        timestamp: member_timestamp,
                    });
                }
            }

            if !revision.has_verified_approvers() {
                errors.push(VerifyError::NoVerifiedApprovers {
                    id: set.id,
                    timestamp: member_timestamp,
                });
                return ApproverSetOutcome::failed(errors);
            }

            debug!(
                approver_set = set.id,
                members = revision.verified_approvers().len(),
                "approver set verified"
            );
            ApproverSetOutcome {
                verified: true,
                revision: Some(revision),
                errors,
            }
        }
        .boxed()
    }
}

fn parse_export<T: DeserializeOwned>(
    object_type: ObjectType,
    id: i64,
    bytes: &[u8],
) -> Result<T, VerifyError> {
    serde_json::from_slice(bytes).map_err(|e| VerifyError::Parse {
        object_type,
        id,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_guard_enforces_depth() {
        let guard = ChainGuard::new(2);
        let one = guard.enter(ObjectType::ApproverSet, 1, 100).unwrap();
        let two = one.enter(ObjectType::ApproverSet, 2, 100).unwrap();
        let err = two.enter(ObjectType::ApproverSet, 3, 100).unwrap_err();
        assert!(matches!(err, VerifyError::ChainLimit { max: 2 }));
    }

    #[test]
    fn chain_guard_detects_revisits() {
        let guard = ChainGuard::new(8);
        let one = guard.enter(ObjectType::ApproverSet, 1, 100).unwrap();
        let err = one.enter(ObjectType::ApproverSet, 1, 100).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::ChainCycle {
                object_type: ObjectType::ApproverSet,
                id: 1,
                timestamp: 100
            }
        ));
    }

    #[test]
    fn same_set_at_different_instants_is_not_a_cycle() {
        let guard = ChainGuard::new(8);
        let one = guard.enter(ObjectType::ApproverSet, 1, 100).unwrap();
        assert!(one.enter(ObjectType::ApproverSet, 1, 200).is_ok());
    }
}
