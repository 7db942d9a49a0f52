//! # EventHub Authentication
//!
//! Account flows for EventHub: sign-up, login by username or email,
//! password change and profile edits, on top of any
//! [`IdentityStore`](eventhub_core::store::IdentityStore).
//!
//! ## Features
//!
//! - **Argon2id**: salted PHC-string hashes via [`Argon2Hasher`]
//! - **Pluggable hashing**: [`CredentialHasher`] lets tests use a cheap hasher
//! - **Form rules**: field limits shared by every account flow ([`validation`])
//!
//! ## Example
//!
//! ```
//! use eventhub_auth::{AccountService, Argon2Hasher, SignUp};
//! use eventhub_testing::InMemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let accounts = AccountService::new(Arc::new(InMemoryStore::new()), Argon2Hasher::new());
//! accounts
//!     .sign_up(SignUp::new("alice", "alice@example.com", "s3cret!"))
//!     .await
//!     .unwrap();
//!
//! let identity = accounts.login("alice@example.com", "s3cret!").await.unwrap();
//! assert_eq!(identity.username, "alice");
//! # }
//! ```

pub mod accounts;
pub mod password;
pub mod validation;

pub use accounts::{AccountService, ProfileUpdate, SignUp};
pub use password::{Argon2Hasher, CredentialHasher};
