//! Event lifecycle, browsing and registration through [`EventHub`].

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::{Datelike, Duration, NaiveDate};
use eventhub::EventSearch;
use eventhub_core::authorization::{DenyReason, Principal};
use eventhub_core::roster::Rejection;
use eventhub_core::types::{Capacity, EventId, EventPatch, EventStatus, PageRequest, Role, UserId};
use eventhub_core::EventHubError;
use eventhub_testing::fixtures;

fn rejected(rejection: Rejection) -> EventHubError {
    EventHubError::Rejected(rejection)
}

#[tokio::test]
async fn only_organizers_and_admins_create_events() {
    let (store, hub) = common::hub();
    let user = common::principal(&store, "uma", Role::User).await;
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let draft = || fixtures::draft("Board games", 5, EventStatus::Draft);

    assert_eq!(
        hub.create_event(&Principal::Anonymous, draft()).await,
        Err(EventHubError::Unauthorized)
    );
    assert_eq!(
        hub.create_event(&user, draft()).await,
        Err(EventHubError::Forbidden(DenyReason::InsufficientRole))
    );

    let event = hub.create_event(&organizer, draft()).await.unwrap();
    assert_eq!(event.status, EventStatus::Draft);
    assert_eq!(Some(&event.creator_id), organizer.as_actor().map(|a| &a.id));

    assert!(hub.create_event(&admin, draft()).await.is_ok());
    assert_eq!(store.event_count().await, 2);
}

#[tokio::test]
async fn create_event_validates_fields_and_schedule() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;

    let mut short = fixtures::draft("Talk", 5, EventStatus::Draft);
    short.description = "too short".to_string();
    assert!(matches!(
        hub.create_event(&organizer, short).await,
        Err(EventHubError::ValidationFailed(_))
    ));

    let mut past = fixtures::draft("Talk", 5, EventStatus::Draft);
    past.starts_at = fixtures::now() - Duration::days(1);
    past.registration_deadline = None;
    assert!(matches!(
        hub.create_event(&organizer, past).await,
        Err(EventHubError::ValidationFailed(_))
    ));

    let mut late_deadline = fixtures::draft("Talk", 5, EventStatus::Draft);
    late_deadline.registration_deadline = Some(late_deadline.starts_at + Duration::hours(1));
    assert!(matches!(
        hub.create_event(&organizer, late_deadline).await,
        Err(EventHubError::ValidationFailed(_))
    ));

    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn draft_events_do_not_accept_registrations() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 5, EventStatus::Draft).await;

    assert_eq!(
        hub.register_for_event(&user, event.id, hub.now()).await,
        Err(rejected(Rejection::EventNotPublished))
    );

    hub.publish_event(&organizer, event.id).await.unwrap();
    let registration = hub.register_for_event(&user, event.id, hub.now()).await.unwrap();
    assert!(registration.is_active());
    assert_eq!(registration.registered_at, hub.now());
}

#[tokio::test]
async fn register_checks_existence_then_authentication() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let event = common::event(&hub, &organizer, 5, EventStatus::Published).await;

    let missing = EventId::new();
    assert_eq!(
        hub.register_for_event(&Principal::Anonymous, missing, hub.now()).await,
        Err(EventHubError::event_not_found(missing))
    );
    assert_eq!(
        hub.register_for_event(&Principal::Anonymous, event.id, hub.now()).await,
        Err(EventHubError::Unauthorized)
    );
}

#[tokio::test]
async fn unknown_identities_cannot_take_a_seat() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let event = common::event(&hub, &organizer, 1, EventStatus::Published).await;

    let ghost = UserId::new();
    assert_eq!(
        hub.register_for_event(&Principal::actor(ghost, Role::User), event.id, hub.now()).await,
        Err(EventHubError::identity_not_found(ghost))
    );

    let details = hub.event_details(&organizer, event.id).await.unwrap();
    assert_eq!(details.availability.active, 0);
    assert!(hub.event_attendees(&organizer, event.id).await.unwrap().is_empty());
    assert!(store.all_registrations().await.is_empty());

    // The seat is still there for a real account.
    let user = common::principal(&store, "uma", Role::User).await;
    assert!(hub.register_for_event(&user, event.id, hub.now()).await.is_ok());
}

#[tokio::test]
async fn creators_cannot_register_for_their_own_events() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let admin = common::principal(&store, "ada", Role::Admin).await;

    let own = common::event(&hub, &organizer, 5, EventStatus::Published).await;
    assert_eq!(
        hub.register_for_event(&organizer, own.id, hub.now()).await,
        Err(rejected(Rejection::SelfRegistrationForbidden))
    );

    let admins_own = common::event(&hub, &admin, 5, EventStatus::Published).await;
    assert_eq!(
        hub.register_for_event(&admin, admins_own.id, hub.now()).await,
        Err(rejected(Rejection::SelfRegistrationForbidden))
    );

    // Organizers register for other people's events like anyone else.
    assert!(hub.register_for_event(&organizer, admins_own.id, hub.now()).await.is_ok());
    let rows = store.all_registrations().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_id, admins_own.id);
}

#[tokio::test]
async fn capacity_one_scenario() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let a = common::principal(&store, "a", Role::User).await;
    let b = common::principal(&store, "b", Role::User).await;
    let event = common::event(&hub, &organizer, 1, EventStatus::Published).await;

    hub.register_for_event(&a, event.id, hub.now()).await.unwrap();
    assert_eq!(
        hub.register_for_event(&b, event.id, hub.now()).await,
        Err(rejected(Rejection::EventFull))
    );

    hub.unregister_from_event(&a, event.id).await.unwrap();
    hub.register_for_event(&b, event.id, hub.now()).await.unwrap();

    let details = hub.event_details(&b, event.id).await.unwrap();
    assert!(details.is_registered);
    assert!(details.availability.is_full);
    assert_eq!(details.availability.available_spots, 0);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 5, EventStatus::Published).await;

    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();
    assert_eq!(
        hub.register_for_event(&user, event.id, hub.now()).await,
        Err(rejected(Rejection::AlreadyRegistered))
    );
    assert_eq!(store.all_registrations().await.len(), 1);
}

#[tokio::test]
async fn re_registration_keeps_one_active_row() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 5, EventStatus::Published).await;

    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();
    let cancelled = hub.unregister_from_event(&user, event.id).await.unwrap();
    assert!(!cancelled.is_active());
    assert_eq!(cancelled.cancelled_at, Some(hub.now()));
    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();

    let rows = store.all_registrations().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|r| r.is_active()).count(), 1);
}

#[tokio::test]
async fn unregister_requires_an_active_registration() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 5, EventStatus::Published).await;

    assert_eq!(
        hub.unregister_from_event(&user, event.id).await,
        Err(rejected(Rejection::NotRegistered))
    );
    assert_eq!(
        hub.unregister_from_event(&Principal::Anonymous, event.id).await,
        Err(EventHubError::Unauthorized)
    );
}

#[tokio::test]
async fn registration_window_closes_at_deadline() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 5, EventStatus::Published).await;
    let deadline = event.registration_deadline.expect("fixture has a deadline");

    assert_eq!(
        hub.register_for_event(&user, event.id, deadline).await,
        Err(rejected(Rejection::RegistrationClosed))
    );
    assert!(hub
        .register_for_event(&user, event.id, deadline - Duration::seconds(1))
        .await
        .is_ok());
}

#[tokio::test]
async fn ownership_rules_for_edit_and_delete() {
    let (store, hub) = common::hub();
    let olga = common::principal(&store, "olga", Role::Organizer).await;
    let oscar = common::principal(&store, "oscar", Role::Organizer).await;
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &olga, 5, EventStatus::Published).await;
    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();

    assert_eq!(
        hub.delete_event(&oscar, event.id).await,
        Err(EventHubError::Forbidden(DenyReason::NotOwner))
    );
    let rename = EventPatch {
        title: Some("Renamed".to_string()),
        ..EventPatch::default()
    };
    assert_eq!(
        hub.update_event(&oscar, event.id, rename.clone()).await,
        Err(EventHubError::Forbidden(DenyReason::NotOwner))
    );
    assert_eq!(
        hub.event_attendees(&oscar, event.id).await,
        Err(EventHubError::Forbidden(DenyReason::NotOwner))
    );

    let renamed = hub.update_event(&olga, event.id, rename).await.unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert_eq!(hub.event_attendees(&olga, event.id).await.unwrap().len(), 1);

    hub.delete_event(&admin, event.id).await.unwrap();
    assert_eq!(store.event_count().await, 0);
    assert!(store.all_registrations().await.is_empty());
    assert_eq!(
        hub.delete_event(&admin, event.id).await,
        Err(EventHubError::event_not_found(event.id))
    );
}

#[tokio::test]
async fn capacity_cannot_drop_below_active_registrations() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let event = common::event(&hub, &organizer, 3, EventStatus::Published).await;
    for name in ["a", "b"] {
        let user = common::principal(&store, name, Role::User).await;
        hub.register_for_event(&user, event.id, hub.now()).await.unwrap();
    }

    let resize = |n| EventPatch {
        capacity: Some(Capacity::new(n).unwrap()),
        ..EventPatch::default()
    };
    assert_eq!(
        hub.update_event(&organizer, event.id, resize(1)).await,
        Err(rejected(Rejection::CapacityBelowRegistrations))
    );
    let resized = hub.update_event(&organizer, event.id, resize(2)).await.unwrap();
    assert_eq!(resized.capacity.value(), 2);

    let details = hub.event_details(&organizer, event.id).await.unwrap();
    assert!(details.availability.is_full);
    assert!(details.can_manage);
}

#[tokio::test]
async fn cancelled_events_stay_cancelled() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 3, EventStatus::Published).await;
    hub.register_for_event(&user, event.id, hub.now()).await.unwrap();

    let cancelled = hub.cancel_event(&organizer, event.id).await.unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);

    assert_eq!(
        hub.publish_event(&organizer, event.id).await,
        Err(rejected(Rejection::InvalidStatusTransition))
    );
    // Re-asserting the current status is a no-op.
    assert!(hub.cancel_event(&organizer, event.id).await.is_ok());

    let other = common::principal(&store, "vic", Role::User).await;
    assert_eq!(
        hub.register_for_event(&other, event.id, hub.now()).await,
        Err(rejected(Rejection::EventNotPublished))
    );
    // Existing registrations survive and can still be released.
    assert!(hub.unregister_from_event(&user, event.id).await.is_ok());
}

#[tokio::test]
async fn drafts_are_hidden_from_other_viewers() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let admin = common::principal(&store, "ada", Role::Admin).await;
    let user = common::principal(&store, "uma", Role::User).await;
    let event = common::event(&hub, &organizer, 3, EventStatus::Draft).await;

    assert_eq!(
        hub.event_details(&user, event.id).await,
        Err(EventHubError::event_not_found(event.id))
    );
    assert_eq!(
        hub.event_details(&Principal::Anonymous, event.id).await,
        Err(EventHubError::event_not_found(event.id))
    );
    assert!(hub.event_details(&organizer, event.id).await.unwrap().can_manage);
    assert!(hub.event_details(&admin, event.id).await.unwrap().can_manage);

    hub.publish_event(&organizer, event.id).await.unwrap();
    let public = hub.event_details(&Principal::Anonymous, event.id).await.unwrap();
    assert!(!public.can_manage);
    assert!(!public.is_registered);
    assert!(public.availability.is_registration_open);
    assert_eq!(public.availability.available_spots, 3);
}

#[tokio::test]
async fn upcoming_listing_filters_and_orders() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;

    let mut late = fixtures::draft("Rust Workshop", 5, EventStatus::Published);
    late.starts_at += Duration::days(10);
    late.category = Some("workshop".to_string());
    late.location = "Berlin, Room 4".to_string();
    hub.create_event(&organizer, late).await.unwrap();

    let soon = fixtures::draft("Go Meetup", 5, EventStatus::Published);
    hub.create_event(&organizer, soon).await.unwrap();

    let hidden = fixtures::draft("Secret rust plans", 5, EventStatus::Draft);
    hub.create_event(&organizer, hidden).await.unwrap();

    let all = hub
        .list_upcoming_events(&Principal::Anonymous, EventSearch::default(), hub.page(1))
        .await
        .unwrap();
    let titles: Vec<_> = all.items.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["Go Meetup", "Rust Workshop"]);

    let search = EventSearch {
        search: Some("RUST".to_string()),
        location: Some("berlin".to_string()),
        ..EventSearch::default()
    };
    let found = hub
        .list_upcoming_events(&Principal::Anonymous, search, hub.page(1))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].category.as_deref(), Some("workshop"));

    let window = EventSearch {
        starts_until: Some(fixtures::now() + Duration::days(31)),
        ..EventSearch::default()
    };
    let found = hub
        .list_upcoming_events(&Principal::Anonymous, window, hub.page(1))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].title, "Go Meetup");
}

#[tokio::test]
async fn listings_paginate_with_configured_page_size() {
    let (store, hub) = common::hub();
    let hub = hub.with_page_sizes(2, 20);
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    for _ in 0..5 {
        common::event(&hub, &organizer, 5, EventStatus::Published).await;
    }

    let page = hub
        .list_upcoming_events(&Principal::Anonymous, EventSearch::default(), hub.page(3))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages(), 3);
    assert!(!page.has_next());

    // Hand-built requests with zero fields read as the first page.
    let zero = hub
        .list_upcoming_events(
            &Principal::Anonymous,
            EventSearch::default(),
            PageRequest { page: 0, per_page: 2 },
        )
        .await
        .unwrap();
    assert_eq!(zero.items.len(), 2);
    assert_eq!(zero.total, 5);
}

#[tokio::test]
async fn my_events_and_registered_events() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;
    let user = common::principal(&store, "uma", Role::User).await;

    let mut later = fixtures::draft("Later", 5, EventStatus::Published);
    later.starts_at += Duration::days(5);
    let later = hub.create_event(&organizer, later).await.unwrap();
    let sooner = common::event(&hub, &organizer, 5, EventStatus::Published).await;
    common::event(&hub, &organizer, 5, EventStatus::Draft).await;

    let mine = hub.my_events(&organizer, hub.page(1)).await.unwrap();
    assert_eq!(mine.total, 3);
    assert!(hub.my_events(&user, hub.page(1)).await.unwrap().items.is_empty());
    assert_eq!(
        hub.my_events(&Principal::Anonymous, hub.page(1)).await,
        Err(EventHubError::Unauthorized)
    );

    hub.register_for_event(&user, later.id, hub.now()).await.unwrap();
    hub.register_for_event(&user, sooner.id, hub.now()).await.unwrap();
    let registered = hub.registered_events(&user).await.unwrap();
    let ids: Vec<_> = registered.iter().map(|(_, e)| e.id).collect();
    assert_eq!(ids, [sooner.id, later.id]);
}

#[tokio::test]
async fn calendar_groups_published_events_by_day() {
    let (store, hub) = common::hub();
    let organizer = common::principal(&store, "olga", Role::Organizer).await;

    // Fixture events start 30 days after 2025-01-01.
    let january = common::event(&hub, &organizer, 5, EventStatus::Published).await;
    let mut february = fixtures::draft("February", 5, EventStatus::Published);
    february.starts_at += Duration::days(5);
    hub.create_event(&organizer, february).await.unwrap();
    common::event(&hub, &organizer, 5, EventStatus::Draft).await;

    let month = hub
        .event_calendar(&Principal::Anonymous, 2025, 1)
        .await
        .unwrap();
    assert_eq!(month.len(), 1);
    let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    assert_eq!(month[&day].len(), 1);
    assert_eq!(month[&day][0].id, january.id);

    let next = hub
        .event_calendar(&Principal::Anonymous, 2025, 2)
        .await
        .unwrap();
    assert!(next.keys().all(|d| d.month() == 2));
    assert_eq!(next.values().map(Vec::len).sum::<usize>(), 1);

    assert!(matches!(
        hub.event_calendar(&Principal::Anonymous, 2025, 13).await,
        Err(EventHubError::ValidationFailed(_))
    ));
}
