//! Field rules for account forms.

use eventhub_core::{EventHubError, Result};

/// Shortest accepted username.
pub const MIN_USERNAME_LEN: usize = 3;
/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 80;
/// Longest accepted email address.
pub const MAX_EMAIL_LEN: usize = 120;
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;
/// Longest accepted password.
pub const MAX_PASSWORD_LEN: usize = 100;
/// Longest accepted first or last name.
pub const MAX_NAME_LEN: usize = 50;

fn invalid(message: impl Into<String>) -> EventHubError {
    EventHubError::ValidationFailed(message.into())
}

/// # Errors
///
/// Returns [`EventHubError::ValidationFailed`] unless the username is
/// 3 to 80 characters without an `@`.
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if username.trim().is_empty() {
        return Err(invalid("Username is required"));
    }
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(invalid(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    // Login matches usernames and emails in one lookup.
    if username.contains('@') {
        return Err(invalid("Username cannot contain '@'"));
    }
    Ok(())
}

/// Accepts `local@domain` with exactly one `@`, non-empty sides, no
/// whitespace and a dot in the domain.
///
/// # Errors
///
/// Returns [`EventHubError::ValidationFailed`] for anything else.
pub fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(invalid("Email is required"));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(invalid(format!(
            "Email must be less than {MAX_EMAIL_LEN} characters"
        )));
    }

    let well_formed = !email.contains(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if !well_formed {
        return Err(invalid("Please enter a valid email address"));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`EventHubError::ValidationFailed`] unless the password is
/// 6 to 100 characters.
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(invalid(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`EventHubError::ValidationFailed`] if a given name is longer
/// than 50 characters.
pub fn validate_name(field: &str, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) if name.chars().count() > MAX_NAME_LEN => Err(invalid(format!(
            "{field} must be less than {MAX_NAME_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

/// Trim a free-text name, mapping blank input to `None`.
#[must_use]
pub fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
