//! Integration tests for the compliance review workflow

mod common;

use common::*;
use loop_service::contract::{ComplianceStatus, LoopError};
use loop_service::domain::LoopEvent;

#[tokio::test]
async fn owner_submits_and_admin_approves() {
    let fx = Fixture::new();
    let id = fx.loop_for(&agent(), new_loop("1 Review Rd")).await;

    fx.service.request_compliance(&agent(), id).await.unwrap();
    let record = fx.loops.get(id).unwrap().compliance;
    assert_eq!(record.status, ComplianceStatus::Pending);
    assert!(record.requested_at.is_some());
    assert_eq!(record.reviewed_at, None);

    fx.service.approve_compliance(&admin(), id).await.unwrap();
    let record = fx.loops.get(id).unwrap().compliance;
    assert_eq!(record.status, ComplianceStatus::Approved);
    assert_eq!(record.reviewer_id, Some(ADMIN_ID));
    assert!(record.reviewed_at.is_some());

    assert_eq!(
        fx.events.actions(),
        vec!["LOOP_CREATED", "COMPLIANCE_PENDING", "COMPLIANCE_APPROVED"]
    );
    assert!(fx
        .events
        .notifications()
        .iter()
        .any(|e| matches!(e, LoopEvent::ComplianceChanged { status, .. } if status == "approved")));
}

#[tokio::test]
async fn deny_returns_loop_to_agent() {
    let fx = Fixture::new();
    let id = fx.loop_for(&agent(), new_loop("2 Review Rd")).await;
    fx.service.request_compliance(&agent(), id).await.unwrap();
    fx.service.deny_compliance(&admin(), id).await.unwrap();

    let record = fx.loops.get(id).unwrap().compliance;
    assert_eq!(record.status, ComplianceStatus::Denied);
    assert_eq!(record.reviewer_id, Some(ADMIN_ID));
}

#[tokio::test]
async fn resubmission_keeps_previous_review_columns() {
    let fx = Fixture::new();
    let id = fx.loop_for(&agent(), new_loop("3 Review Rd")).await;
    fx.service.request_compliance(&agent(), id).await.unwrap();
    fx.service.deny_compliance(&admin(), id).await.unwrap();
    let denied = fx.loops.get(id).unwrap().compliance;

    fx.service.request_compliance(&agent(), id).await.unwrap();
    let record = fx.loops.get(id).unwrap().compliance;
    assert_eq!(record.status, ComplianceStatus::Pending);
    assert_eq!(record.reviewed_at, denied.reviewed_at);
    assert_eq!(record.reviewer_id, Some(ADMIN_ID));
    assert!(record.requested_at >= denied.requested_at);
}

#[tokio::test]
async fn review_without_request_is_accepted() {
    let fx = Fixture::new();
    let id = fx.loop_for(&agent(), new_loop("4 Review Rd")).await;
    fx.service.approve_compliance(&admin(), id).await.unwrap();

    let record = fx.loops.get(id).unwrap().compliance;
    assert_eq!(record.status, ComplianceStatus::Approved);
    assert_eq!(record.requested_at, None);
}

#[tokio::test]
async fn agents_cannot_review() {
    let fx = Fixture::new();
    let id = fx.loop_for(&agent(), new_loop("5 Review Rd")).await;
    fx.service.request_compliance(&agent(), id).await.unwrap();

    let err = fx.service.approve_compliance(&agent(), id).await.unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));
    let err = fx.service.deny_compliance(&agent(), id).await.unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));
    assert_eq!(
        fx.loops.get(id).unwrap().compliance.status,
        ComplianceStatus::Pending
    );
}

#[tokio::test]
async fn only_owner_or_admin_may_submit() {
    let fx = Fixture::new();
    let id = fx.loop_for(&agent(), new_loop("6 Review Rd")).await;

    let err = fx.service.request_compliance(&other_agent(), id).await.unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));
    fx.service.request_compliance(&admin(), id).await.unwrap();
}

#[tokio::test]
async fn unknown_loop_is_not_found_for_admins() {
    let fx = Fixture::new();
    let err = fx.service.approve_compliance(&admin(), 77).await.unwrap_err();
    assert_eq!(err, LoopError::not_found("loop", 77));
    let err = fx.service.request_compliance(&agent(), 77).await.unwrap_err();
    assert_eq!(err, LoopError::not_found("loop", 77));
}
