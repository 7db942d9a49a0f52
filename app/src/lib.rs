//! # EventHub
//!
//! Application layer of the EventHub event-management backend.
//!
//! - [`EventHub`]: event lifecycle, browsing, registration and the admin
//!   console, generic over any [`Store`](eventhub_core::store::Store)
//! - [`AccountService`]: sign-up, login and profile flows (re-exported from
//!   `eventhub-auth`)
//! - [`Config`]: environment-driven configuration
//! - [`telemetry`]: tracing subscriber setup
//!
//! HTTP routing and page rendering are outside this crate; a web layer
//! calls these services with the principal resolved from its session.
//!
//! ## Example
//!
//! ```
//! use eventhub::EventHub;
//! use eventhub_core::authorization::Principal;
//! use eventhub_core::store::IdentityStore;
//! use eventhub_core::types::{EventStatus, Role};
//! use eventhub_testing::{fixtures, test_clock, InMemoryStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> eventhub_core::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let hub = EventHub::with_clock(store.clone(), Arc::new(test_clock()));
//!
//! let organizer = store.insert_identity(fixtures::identity("olga", Role::Organizer)).await?;
//! let attendee = store.insert_identity(fixtures::identity("ann", Role::User)).await?;
//! let olga = Principal::actor(organizer.id, organizer.role);
//! let ann = Principal::actor(attendee.id, attendee.role);
//!
//! let event = hub
//!     .create_event(&olga, fixtures::draft("Launch party", 1, EventStatus::Published))
//!     .await?;
//! hub.register_for_event(&ann, event.id, hub.now()).await?;
//!
//! let details = hub.event_details(&ann, event.id).await?;
//! assert!(details.is_registered);
//! assert!(details.availability.is_full);
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod hub;
pub mod telemetry;

pub use admin::{Dashboard, UserUpdate};
pub use config::{Config, ConfigError};
pub use eventhub_auth::{AccountService, Argon2Hasher, ProfileUpdate, SignUp};
pub use hub::{EventDetails, EventHub, EventSearch};
