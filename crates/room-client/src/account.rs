//! Sign-up and sign-in.
//!
//! [`AccountService`] validates forms locally and then calls the injected
//! [`AccountStore`] (the hosted auth and document store). Store failures
//! carry the store's own message, which is shown to the user as is.

use crate::errors::AccountError;
use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Shortest accepted phone number, in characters.
pub const MIN_PHONE_LEN: usize = 10;

/// Account identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub account_id: AccountId,
    pub email: String,
}

impl SignedInUser {
    /// Greeting shown after a successful sign-in.
    pub fn welcome_message(&self) -> String {
        format!("Welcome back, {}!", self.email)
    }
}

/// Profile document stored per account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Error reported by the account store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AccountStoreError {
    pub message: String,
}

impl AccountStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Hosted auth and document store.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an email/password account.
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountId, AccountStoreError>;

    /// Sign in with email and password.
    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignedInUser, AccountStoreError>;

    /// Write the profile document for `account`.
    async fn write_profile(
        &self,
        account: &AccountId,
        profile: &UserProfile,
    ) -> Result<(), AccountStoreError>;
}

/// Sign-up form contents.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignUpForm {
    /// Check the form. Rules are applied in order and the first failure
    /// wins: matching passwords, an `@` in the email, a phone number of at
    /// least [`MIN_PHONE_LEN`] characters.
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(AccountError::PasswordMismatch);
        }
        if !self.email.contains('@') {
            return Err(AccountError::InvalidEmail);
        }
        if self.phone.chars().count() < MIN_PHONE_LEN {
            return Err(AccountError::InvalidPhone);
        }
        Ok(())
    }
}

/// Sign-in form contents.
#[derive(Debug, Clone)]
pub struct SignInForm {
    pub email: String,
    pub password: SecretString,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.email.is_empty() || self.password.expose_secret().is_empty() {
            return Err(AccountError::MissingCredentials);
        }
        Ok(())
    }
}

/// Account flows over an [`AccountStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Create the account, then write its profile document.
    #[instrument(skip_all, name = "room.account.sign_up")]
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AccountId, AccountError> {
        form.validate()?;

        let account_id = self
            .store
            .create_account(&form.email, &form.password)
            .await
            .map_err(|e| {
                warn!(target: "room.account", error = %e, "Account creation failed");
                AccountError::SignUpFailed(e.message)
            })?;

        let profile = UserProfile {
            name: form.name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            created_at: Utc::now(),
        };

        self.store
            .write_profile(&account_id, &profile)
            .await
            .map_err(|e| {
                warn!(target: "room.account", error = %e, "Profile write failed");
                AccountError::ProfileWriteFailed(e.message)
            })?;

        info!(target: "room.account", account_id = %account_id, "Account created");
        Ok(account_id)
    }

    #[instrument(skip_all, name = "room.account.sign_in")]
    pub async fn sign_in(&self, form: &SignInForm) -> Result<SignedInUser, AccountError> {
        form.validate()?;

        let user = self
            .store
            .sign_in(&form.email, &form.password)
            .await
            .map_err(|e| {
                warn!(target: "room.account", error = %e, "Sign-in failed");
                AccountError::SignInFailed(e.message)
            })?;

        info!(target: "room.account", account_id = %user.account_id, "Signed in");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sign_up_form() -> SignUpForm {
        SignUpForm {
            name: "Ada".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "5551234567".to_string(),
            password: SecretString::from("hunter22"),
            confirm_password: SecretString::from("hunter22"),
        }
    }

    #[test]
    fn test_valid_sign_up_form() {
        assert!(sign_up_form().validate().is_ok());
    }

    #[test]
    fn test_password_mismatch_checked_first() {
        let form = SignUpForm {
            confirm_password: SecretString::from("other"),
            email: "no-at-sign".to_string(),
            phone: "123".to_string(),
            ..sign_up_form()
        };
        assert_eq!(form.validate().unwrap_err(), AccountError::PasswordMismatch);
    }

    #[test]
    fn test_email_checked_before_phone() {
        let form = SignUpForm {
            email: "ada.example.com".to_string(),
            phone: "123".to_string(),
            ..sign_up_form()
        };
        assert_eq!(form.validate().unwrap_err(), AccountError::InvalidEmail);
    }

    #[test]
    fn test_short_phone_rejected() {
        let form = SignUpForm {
            phone: "555123456".to_string(),
            ..sign_up_form()
        };
        assert_eq!(form.validate().unwrap_err(), AccountError::InvalidPhone);
    }

    #[test]
    fn test_sign_in_requires_both_fields() {
        let form = SignInForm {
            email: String::new(),
            password: SecretString::from("x"),
        };
        assert_eq!(form.validate().unwrap_err(), AccountError::MissingCredentials);

        let form = SignInForm {
            email: "a@b.c".to_string(),
            password: SecretString::from(""),
        };
        assert_eq!(form.validate().unwrap_err(), AccountError::MissingCredentials);
    }

    #[test]
    fn test_profile_serializes_created_at_camel_case() {
        let profile = UserProfile {
            name: "Ada".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "5551234567".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_form_debug_redacts_passwords() {
        let debug = format!("{:?}", sign_up_form());
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn test_welcome_message() {
        let user = SignedInUser {
            account_id: AccountId("uid-1".to_string()),
            email: "ada@example.com".to_string(),
        };
        assert_eq!(user.welcome_message(), "Welcome back, ada@example.com!");
    }
}
