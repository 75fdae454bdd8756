//! Integration tests for organizations, membership and the people directory

mod common;

use common::*;
use loop_service::contract::{LoopError, OrganizationInput};

fn org(name: &str) -> OrganizationInput {
    OrganizationInput {
        name: name.to_string(),
        description: Some(format!("{name} office")),
    }
}

#[tokio::test]
async fn create_assigns_initial_members() {
    let fx = Fixture::new();
    let details = fx
        .service
        .create_organization(&admin(), org("  North Branch "), &[AGENT_ID, OTHER_AGENT_ID, 999])
        .await
        .unwrap();

    assert_eq!(details.organization.name, "North Branch");
    assert_eq!(details.organization.creator_name.as_deref(), Some("Avery Admin"));
    assert_eq!(details.organization.member_count, 2);
    let names: Vec<_> = details.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Blake Agent", "Casey Agent"]);
    assert!(details
        .members
        .iter()
        .all(|m| m.assigned_by == ADMIN_ID && m.assigned_by_name.as_deref() == Some("Avery Admin")));
}

#[tokio::test]
async fn organization_writes_are_admin_only() {
    let fx = Fixture::new();
    let err = fx
        .service
        .create_organization(&agent(), org("Rogue"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));

    let id = fx
        .service
        .create_organization(&admin(), org("East"), &[])
        .await
        .unwrap()
        .organization
        .id;
    let err = fx.service.delete_organization(&agent(), id).await.unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));
    let err = fx
        .service
        .add_user_to_org(&agent(), id, AGENT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));
    let err = fx.service.list_available_users(&agent(), id).await.unwrap_err();
    assert!(matches!(err, LoopError::Forbidden { .. }));
}

#[tokio::test]
async fn names_are_required_and_unique() {
    let fx = Fixture::new();
    let err = fx
        .service
        .create_organization(&admin(), org(" "), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Validation { .. }));

    let west = fx.service.create_organization(&admin(), org("West"), &[]).await.unwrap();
    let err = fx
        .service
        .create_organization(&admin(), org("West"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Conflict { .. }));

    let south = fx.service.create_organization(&admin(), org("South"), &[]).await.unwrap();
    let err = fx
        .service
        .update_organization(&admin(), south.organization.id, org("West"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::Conflict { .. }));

    // keeping its own name is not a conflict
    fx.service
        .update_organization(&admin(), west.organization.id, org("West"))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_without_description_keeps_it() {
    let fx = Fixture::new();
    let id = fx
        .service
        .create_organization(&admin(), org("Central"), &[])
        .await
        .unwrap()
        .organization
        .id;

    let renamed = fx
        .service
        .update_organization(
            &admin(),
            id,
            OrganizationInput {
                name: "Central Hub".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.organization.name, "Central Hub");
    assert_eq!(renamed.organization.description, "Central office");

    let listed = fx.service.list_organizations().await.unwrap();
    assert_eq!(listed[0].name, "Central Hub");
}

#[tokio::test]
async fn re_adding_a_member_refreshes_the_assignment() {
    let fx = Fixture::new();
    let id = fx
        .service
        .create_organization(&admin(), org("Uptown"), &[AGENT_ID])
        .await
        .unwrap()
        .organization
        .id;
    let first = fx.service.list_org_users(id).await.unwrap()[0].assigned_at;

    let members = fx.service.add_user_to_org(&admin(), id, AGENT_ID).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].assigned_at >= first);
    assert_eq!(fx.organizations.membership_count(), 1);
}

#[tokio::test]
async fn adding_unknown_user_or_org_is_not_found() {
    let fx = Fixture::new();
    let id = fx
        .service
        .create_organization(&admin(), org("Midtown"), &[])
        .await
        .unwrap()
        .organization
        .id;

    let err = fx.service.add_user_to_org(&admin(), id, 404).await.unwrap_err();
    assert_eq!(err, LoopError::not_found("user", 404));
    let err = fx
        .service
        .add_user_to_org(&admin(), 404, AGENT_ID)
        .await
        .unwrap_err();
    assert_eq!(err, LoopError::not_found("organization", 404));
}

#[tokio::test]
async fn removing_a_non_member_is_a_no_op() {
    let fx = Fixture::new();
    let id = fx
        .service
        .create_organization(&admin(), org("Harbor"), &[AGENT_ID])
        .await
        .unwrap()
        .organization
        .id;

    let members = fx
        .service
        .remove_user_from_org(&admin(), id, OTHER_AGENT_ID)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);

    let members = fx
        .service
        .remove_user_from_org(&admin(), id, AGENT_ID)
        .await
        .unwrap();
    assert!(members.is_empty());
    let actions = fx.events.actions();
    assert_eq!(actions.iter().filter(|a| *a == "USER_UNASSIGNED").count(), 1);
}

#[tokio::test]
async fn available_users_skip_members_and_suspended() {
    let fx = Fixture::new();
    let id = fx
        .service
        .create_organization(&admin(), org("Lakeside"), &[AGENT_ID])
        .await
        .unwrap()
        .organization
        .id;

    let available: Vec<_> = fx
        .service
        .list_available_users(&admin(), id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(available, vec![ADMIN_ID, OTHER_AGENT_ID]);
}

#[tokio::test]
async fn deleting_an_organization_drops_its_assignments() {
    let fx = Fixture::new();
    let id = fx
        .service
        .create_organization(&admin(), org("Old Town"), &[AGENT_ID, OTHER_AGENT_ID])
        .await
        .unwrap()
        .organization
        .id;

    fx.service.delete_organization(&admin(), id).await.unwrap();
    assert_eq!(fx.organizations.membership_count(), 0);
    let err = fx.service.get_organization(id).await.unwrap_err();
    assert_eq!(err, LoopError::not_found("organization", id));
    let err = fx.service.delete_organization(&admin(), id).await.unwrap_err();
    assert!(matches!(err, LoopError::NotFound { .. }));
}

#[tokio::test]
async fn people_are_listed_by_recent_activity_with_their_orgs() {
    let fx = Fixture::new();
    fx.service
        .create_organization(&admin(), org("Riverside"), &[AGENT_ID])
        .await
        .unwrap();

    let people = fx.service.list_people(None).await.unwrap();
    let ids: Vec<_> = people.iter().map(|p| p.id).collect();
    // never-active users trail, ordered by name
    assert_eq!(ids, vec![ADMIN_ID, AGENT_ID, OTHER_AGENT_ID, SUSPENDED_ID]);

    let blake = &people[1];
    assert_eq!(blake.organizations.len(), 1);
    assert_eq!(blake.organizations[0].name, "Riverside");

    let found = fx.service.list_people(Some("  CASEY ")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, OTHER_AGENT_ID);

    let by_email = fx.service.list_people(Some("drew.suspended@")).await.unwrap();
    assert_eq!(by_email[0].id, SUSPENDED_ID);
}

#[tokio::test]
async fn person_lookup() {
    let fx = Fixture::new();
    let person = fx.service.get_person(AGENT_ID).await.unwrap();
    assert_eq!(person.email, "blake.agent@example.com");
    let err = fx.service.get_person(42).await.unwrap_err();
    assert_eq!(err, LoopError::not_found("user", 42));
}
