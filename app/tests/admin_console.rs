//! Admin console: gating, user-management guardrails, reports.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use eventhub::UserUpdate;
use eventhub_core::authorization::{DenyReason, Principal};
use eventhub_core::roster::Rejection;
use eventhub_core::store::IdentityStore;
use eventhub_core::types::{EventId, EventStatus, IdentityFilter, Role, UserId};
use eventhub_core::{ConflictReason, EventHubError};
use eventhub_testing::fixtures;

fn user_id(principal: &Principal) -> UserId {
    principal.as_actor().expect("authenticated").id
}

const PROTECTED: EventHubError = EventHubError::Forbidden(DenyReason::ProtectedAccount);

#[tokio::test]
async fn console_is_admin_only() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;

    assert_eq!(
        hub.dashboard(&Principal::Anonymous).await,
        Err(EventHubError::Unauthorized)
    );
    for principal in [&organizer, &user] {
        assert_eq!(
            hub.dashboard(principal).await,
            Err(EventHubError::Forbidden(DenyReason::InsufficientRole))
        );
        assert_eq!(
            hub.statistics(principal).await,
            Err(EventHubError::Forbidden(DenyReason::InsufficientRole))
        );
        assert!(hub
            .list_users(principal, &IdentityFilter::default(), hub.admin_page(1))
            .await
            .is_err());
        assert!(hub.promote_to_organizer(principal, user_id(&user)).await.is_err());
    }
}

#[tokio::test]
async fn admins_cannot_delete_themselves_or_other_admins() {
    let (store, hub) = common::hub();
    let ada = common::principal(&store, "ada", Role::Admin).await;
    let grace = common::principal(&store, "grace", Role::Admin).await;

    assert_eq!(hub.delete_user(&ada, user_id(&ada)).await, Err(PROTECTED));
    assert_eq!(hub.delete_user(&ada, user_id(&grace)).await, Err(PROTECTED));
    assert!(store.find_identity(user_id(&grace)).await.unwrap().is_some());
}

#[tokio::test]
async fn other_admins_cannot_be_edited_or_demoted() {
    let (store, hub) = common::hub();
    let ada = common::principal(&store, "ada", Role::Admin).await;
    let grace = common::principal(&store, "grace", Role::Admin).await;
    let grace_row = store.find_identity(user_id(&grace)).await.unwrap().unwrap();

    let mut update = UserUpdate::from_identity(&grace_row);
    update.is_active = false;
    assert_eq!(hub.update_user(&ada, grace_row.id, update).await, Err(PROTECTED));
    assert_eq!(hub.demote_to_user(&ada, grace_row.id).await, Err(PROTECTED));
    assert_eq!(hub.promote_to_organizer(&ada, grace_row.id).await, Err(PROTECTED));

    // Editing one's own account is allowed.
    let ada_row = store.find_identity(user_id(&ada)).await.unwrap().unwrap();
    let mut own = UserUpdate::from_identity(&ada_row);
    own.email = "ada@lovelace.example".to_string();
    let updated = hub.update_user(&ada, ada_row.id, own).await.unwrap();
    assert_eq!(updated.email, "ada@lovelace.example");
}

#[tokio::test]
async fn promotion_grants_event_creation() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let id = user_id(&user);

    let promoted = hub.promote_to_organizer(&admin, id).await.unwrap();
    assert_eq!(promoted.role, Role::Organizer);

    // Principals carry the role they were resolved with.
    let organizer = Principal::actor(id, promoted.role);
    let draft = fixtures::draft("Promoted", 3, EventStatus::Draft);
    assert!(hub.create_event(&organizer, draft).await.is_ok());

    let again = hub.promote_to_organizer(&admin, id).await.unwrap();
    assert_eq!(again.updated_at, promoted.updated_at);

    let demoted = hub.demote_to_user(&admin, id).await.unwrap();
    assert_eq!(demoted.role, Role::User);
    assert_eq!(
        store.find_identity(id).await.unwrap().map(|i| i.role),
        Some(Role::User)
    );
}

#[tokio::test]
async fn update_user_validates_and_keeps_identities_unique() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let user = common::principal(&store, "uma", Role::User).await;
    common::principal(&store, "vic", Role::User).await;
    let row = store.find_identity(user_id(&user)).await.unwrap().unwrap();

    let taken = UserUpdate {
        username: "vic".to_string(),
        ..UserUpdate::from_identity(&row)
    };
    assert_eq!(
        hub.update_user(&admin, row.id, taken).await,
        Err(EventHubError::Conflict(ConflictReason::UsernameTaken))
    );

    let malformed = UserUpdate {
        email: "not-an-email".to_string(),
        ..UserUpdate::from_identity(&row)
    };
    assert!(matches!(
        hub.update_user(&admin, row.id, malformed).await,
        Err(EventHubError::ValidationFailed(_))
    ));

    let deactivate = UserUpdate {
        is_active: false,
        ..UserUpdate::from_identity(&row)
    };
    let updated = hub.update_user(&admin, row.id, deactivate).await.unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.username, "uma");

    let missing = UserId::new();
    assert_eq!(
        hub.update_user(&admin, missing, UserUpdate::from_identity(&row)).await,
        Err(EventHubError::identity_not_found(missing))
    );
}

#[tokio::test]
async fn deleting_a_user_removes_their_events_and_registrations() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;

    let owned = common::event(&hub, &organizer, 5, EventStatus::Published).await;
    let other = common::event(&hub, &admin, 5, EventStatus::Published).await;
    hub.register_for_event(&user, owned.id, hub.now()).await.unwrap();
    hub.register_for_event(&user, other.id, hub.now()).await.unwrap();
    hub.register_for_event(&organizer, other.id, hub.now()).await.unwrap();

    hub.delete_user(&admin, user_id(&user)).await.unwrap();
    assert_eq!(store.all_registrations().await.len(), 1);

    hub.delete_user(&admin, user_id(&organizer)).await.unwrap();
    assert_eq!(store.event_count().await, 1);
    assert!(store.all_registrations().await.is_empty());
    assert!(store.find_identity(user_id(&organizer)).await.unwrap().is_none());
}

#[tokio::test]
async fn admin_can_cancel_any_registration() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 1, EventStatus::Published).await;
    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();

    assert_eq!(
        hub.cancel_registration(&organizer, event.id, user_id(&user)).await,
        Err(EventHubError::Forbidden(DenyReason::InsufficientRole))
    );

    let cancelled = hub
        .cancel_registration(&admin, event.id, user_id(&user))
        .await
        .unwrap();
    assert!(!cancelled.is_active());
    assert_eq!(
        hub.cancel_registration(&admin, event.id, user_id(&user)).await,
        Err(EventHubError::Rejected(Rejection::NotRegistered))
    );

    // The seat is free again.
    let next = common::principal(&store, "vic", Role::User).await;
    assert!(hub.register_for_event(&next, event.id, hub.now()).await.is_ok());
}

#[tokio::test]
async fn registration_listings_include_history() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 2, EventStatus::Published).await;
    let other = common::event(&hub, &organizer, 2, EventStatus::Published).await;

    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();
    hub.unregister_from_event(&user, event.id).await.unwrap();
    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();
    hub.register_for_event(&user, other.id, hub.now()).await.unwrap();

    let for_event = hub
        .event_registrations(&admin, event.id, hub.admin_page(1))
        .await
        .unwrap();
    assert_eq!(for_event.total, 2);
    assert!(for_event.items.iter().all(|r| r.event_id == event.id));

    let everything = hub
        .all_registrations(&admin, None, hub.admin_page(1))
        .await
        .unwrap();
    assert_eq!(everything.total, 3);

    let missing = EventId::new();
    assert_eq!(
        hub.event_registrations(&admin, missing, hub.admin_page(1)).await,
        Err(EventHubError::event_not_found(missing))
    );
    assert_eq!(
        hub.all_registrations(&organizer, None, hub.admin_page(1)).await,
        Err(EventHubError::Forbidden(DenyReason::InsufficientRole))
    );
}

#[tokio::test]
async fn listings_for_admins() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    common::principal(&store, "uma", Role::User).await;
    common::principal(&store, "vic", Role::User).await;

    let draft = common::event(&hub, &organizer, 2, EventStatus::Draft).await;
    common::event(&hub, &organizer, 2, EventStatus::Published).await;

    let users = hub
        .list_users(
            &admin,
            &IdentityFilter {
                role: Some(Role::User),
                ..IdentityFilter::default()
            },
            hub.admin_page(1),
        )
        .await
        .unwrap();
    assert_eq!(users.total, 2);
    assert_eq!(users.per_page, 20);

    let search = IdentityFilter {
        search: Some("OLGA@".to_string()),
        ..IdentityFilter::default()
    };
    let found = hub.list_users(&admin, &search, hub.admin_page(1)).await.unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].role, Role::Organizer);

    let all = hub
        .list_all_events(&admin, None, None, hub.admin_page(1))
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    let drafts = hub
        .list_all_events(&admin, Some(EventStatus::Draft), None, hub.admin_page(1))
        .await
        .unwrap();
    assert_eq!(drafts.items.len(), 1);
    assert_eq!(drafts.items[0].id, draft.id);
}

#[tokio::test]
async fn dashboard_and_statistics_count_everything() {
    let (store, hub) = common::hub();
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;

    let mut workshop = fixtures::draft("Workshop", 5, EventStatus::Published);
    workshop.category = Some("workshop".to_string());
    let workshop = hub.create_event(&organizer, workshop).await.unwrap();
    let draft = common::event(&hub, &organizer, 5, EventStatus::Draft).await;
    hub.cancel_event(&organizer, draft.id).await.unwrap();

    hub.register_for_event(&user, workshop.id, hub.now()).await.unwrap();
    hub.unregister_from_event(&user, workshop.id).await.unwrap();
    hub.register_for_event(&user, workshop.id, hub.now()).await.unwrap();

    let dashboard = hub.dashboard(&admin).await.unwrap();
    assert_eq!(dashboard.total_users, 3);
    assert_eq!(dashboard.total_events, 2);
    assert_eq!(dashboard.total_registrations, 2);
    assert_eq!(dashboard.users_by_role.admin, 1);
    assert_eq!(dashboard.users_by_role.organizer, 1);
    assert_eq!(dashboard.users_by_role.user, 1);
    assert_eq!(dashboard.events_by_status.published, 1);
    assert_eq!(dashboard.events_by_status.cancelled, 1);
    assert_eq!(dashboard.recent_registrations.len(), 2);
    assert_eq!(dashboard.recent_events.len(), 2);
    assert_eq!(dashboard.upcoming_events.len(), 1);
    assert_eq!(dashboard.upcoming_events[0].id, workshop.id);

    let stats = hub.statistics(&admin).await.unwrap();
    assert_eq!(stats.users.active, 3);
    assert_eq!(stats.events.upcoming, 2);
    assert_eq!(stats.events.past, 0);
    assert_eq!(stats.events.by_category.len(), 1);
    assert_eq!(stats.events.by_category[0].category, "workshop");
    assert_eq!(stats.registrations.active, 1);
    assert_eq!(stats.registrations.cancelled, 1);
    assert_eq!(stats.registrations.monthly.len(), 12);
    let current = stats.registrations.monthly.last().unwrap();
    assert_eq!((current.year, current.month, current.count), (2025, 1, 2));
}
