//! Shared setup for the application tests.

#![allow(dead_code, clippy::expect_used)]

use eventhub::EventHub;
use eventhub_core::authorization::Principal;
use eventhub_core::store::IdentityStore;
use eventhub_core::types::{Event, EventStatus, Role};
use eventhub_testing::{InMemoryStore, fixtures, init_test_tracing, test_clock};
use std::sync::Arc;

/// A hub over a fresh in-memory store, both on the fixed test clock.
pub fn hub() -> (Arc<InMemoryStore>, EventHub<InMemoryStore>) {
    init_test_tracing();
    let clock = Arc::new(test_clock());
    let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
    let hub = EventHub::with_clock(store.clone(), clock);
    (store, hub)
}

/// Insert an identity and return its principal.
pub async fn principal(store: &InMemoryStore, username: &str, role: Role) -> Principal {
    let identity = store
        .insert_identity(fixtures::identity(username, role))
        .await
        .expect("insert identity");
    Principal::actor(identity.id, identity.role)
}

/// Create an event through the hub as `creator`.
pub async fn event(
    hub: &EventHub<InMemoryStore>,
    creator: &Principal,
    capacity: u32,
    status: EventStatus,
) -> Event {
    hub.create_event(creator, fixtures::draft("Community meetup", capacity, status))
        .await
        .expect("create event")
}
