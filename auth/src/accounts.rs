//! Account flows: sign-up, login, password change and profile edits.

use crate::password::CredentialHasher;
use crate::validation::{
    normalize_name, validate_email, validate_name, validate_password, validate_username,
};
use eventhub_core::authorization::Principal;
use eventhub_core::environment::{Clock, SystemClock};
use eventhub_core::store::IdentityStore;
use eventhub_core::types::{Identity, Role, UserId};
use eventhub_core::{EventHubError, Result};
use std::sync::Arc;

/// Input for creating an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUp {
    /// Desired username
    pub username: String,
    /// Contact email, also accepted as login
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
    /// Optional first name
    pub first_name: Option<String>,
    /// Optional last name
    pub last_name: Option<String>,
}

impl SignUp {
    /// Sign-up input without names.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    fn validate(&self) -> Result<()> {
        validate_username(self.username.trim())?;
        validate_email(self.email.trim())?;
        validate_password(&self.password)?;
        validate_name("First name", self.first_name.as_deref())?;
        validate_name("Last name", self.last_name.as_deref())
    }
}

/// Replacement profile fields for an existing account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New username
    pub username: String,
    /// New email
    pub email: String,
    /// New first name; `None` clears it
    pub first_name: Option<String>,
    /// New last name; `None` clears it
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    /// Start from the identity's current profile.
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            username: identity.username.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_username(self.username.trim())?;
        validate_email(self.email.trim())?;
        validate_name("First name", self.first_name.as_deref())?;
        validate_name("Last name", self.last_name.as_deref())
    }
}

/// Account service.
///
/// Generic over the identity store and the credential hasher so the flows
/// run unchanged against `PostgreSQL` or the in-memory store.
pub struct AccountService<S, H> {
    store: Arc<S>,
    hasher: H,
    clock: Arc<dyn Clock>,
}

impl<S, H> std::fmt::Debug for AccountService<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

impl<S: IdentityStore, H: CredentialHasher> AccountService<S, H> {
    /// Create a service on the system clock.
    pub fn new(store: Arc<S>, hasher: H) -> Self {
        Self::with_clock(store, hasher, Arc::new(SystemClock))
    }

    /// Create a service with an explicit clock.
    pub fn with_clock(store: Arc<S>, hasher: H, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            hasher,
            clock,
        }
    }

    /// Register a new account with role `user`.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::ValidationFailed`] for malformed fields
    /// - [`EventHubError::Conflict`] if the username or email is taken
    pub async fn sign_up(&self, input: SignUp) -> Result<Identity> {
        self.create_account(input, Role::User).await
    }

    /// Create an account with an explicit role. Used to provision the
    /// first admin.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sign_up`].
    pub async fn create_account(&self, input: SignUp, role: Role) -> Result<Identity> {
        input.validate()?;

        let now = self.clock.now();
        let identity = Identity {
            id: UserId::new(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            password_hash: self.hasher.hash(&input.password)?,
            first_name: normalize_name(input.first_name),
            last_name: normalize_name(input.last_name),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let identity = self.store.insert_identity(identity).await?;
        tracing::info!(
            user_id = %identity.id,
            username = %identity.username,
            role = identity.role.as_str(),
            "Account created"
        );
        Ok(identity)
    }

    /// Authenticate by username or email.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::InvalidCredentials`] for an unknown login or a wrong password
    /// - [`EventHubError::AccountDisabled`] if the password is right but the
    ///   account is deactivated
    pub async fn login(&self, login: &str, password: &str) -> Result<Identity> {
        let Some(identity) = self.store.find_identity_by_login(login.trim()).await? else {
            tracing::warn!("Login failed: unknown account");
            return Err(EventHubError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &identity.password_hash)? {
            tracing::warn!(user_id = %identity.id, "Login failed: wrong password");
            return Err(EventHubError::InvalidCredentials);
        }

        if !identity.is_active {
            tracing::warn!(user_id = %identity.id, "Login refused: account disabled");
            return Err(EventHubError::AccountDisabled);
        }

        tracing::info!(user_id = %identity.id, "Logged in");
        Ok(identity)
    }

    /// Resolve a stored identity into the principal used by the gate.
    ///
    /// Deleted or deactivated accounts come back anonymous.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Storage`] on backend failure.
    pub async fn principal(&self, user_id: UserId) -> Result<Principal> {
        Ok(match self.store.find_identity(user_id).await? {
            Some(identity) if identity.is_active => Principal::actor(identity.id, identity.role),
            _ => Principal::Anonymous,
        })
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::NotFound`] if the account does not exist
    /// - [`EventHubError::InvalidCredentials`] if `current` is wrong
    /// - [`EventHubError::ValidationFailed`] if `new` is too short or too long
    pub async fn change_password(&self, user_id: UserId, current: &str, new: &str) -> Result<()> {
        let mut identity = self.load(user_id).await?;

        if !self.hasher.verify(current, &identity.password_hash)? {
            tracing::warn!(user_id = %user_id, "Password change refused: wrong current password");
            return Err(EventHubError::InvalidCredentials);
        }
        validate_password(new)?;

        identity.password_hash = self.hasher.hash(new)?;
        identity.updated_at = self.clock.now();
        self.store.update_identity(&identity).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Update username, email and names.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::NotFound`] if the account does not exist
    /// - [`EventHubError::ValidationFailed`] for malformed fields
    /// - [`EventHubError::Conflict`] if the new username or email belongs to
    ///   another account
    pub async fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> Result<Identity> {
        update.validate()?;
        let mut identity = self.load(user_id).await?;

        identity.username = update.username.trim().to_string();
        identity.email = update.email.trim().to_string();
        identity.first_name = normalize_name(update.first_name);
        identity.last_name = normalize_name(update.last_name);
        identity.updated_at = self.clock.now();
        self.store.update_identity(&identity).await?;

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(identity)
    }

    async fn load(&self, user_id: UserId) -> Result<Identity> {
        self.store
            .find_identity(user_id)
            .await?
            .ok_or_else(|| EventHubError::identity_not_found(user_id))
    }
}
