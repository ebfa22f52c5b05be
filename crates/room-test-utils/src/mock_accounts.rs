//! In-memory account store.

use common::secret::{ExposeSecret, SecretString};
use room_client::account::{
    AccountId, AccountStore, AccountStoreError, SignedInUser, UserProfile,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Account store backed by maps, with failure switches.
#[derive(Debug, Default)]
pub struct MockAccountStore {
    accounts: Mutex<HashMap<String, (AccountId, String)>>,
    profiles: Mutex<HashMap<AccountId, UserProfile>>,
    fail_profile_writes: Mutex<Option<String>>,
}

impl MockAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing account.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        let id = AccountId(format!("uid-{email}"));
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (id, password.to_string()));
        self
    }

    /// Make profile writes fail with `message`.
    #[must_use]
    pub fn failing_profile_writes(self, message: &str) -> Self {
        *self.fail_profile_writes.lock().unwrap() = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn profile(&self, account: &AccountId) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(account).cloned()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl AccountStore for MockAccountStore {
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountId, AccountStoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AccountStoreError::new(
                "The email address is already in use by another account.",
            ));
        }

        let id = AccountId(format!("uid-{email}"));
        accounts.insert(
            email.to_string(),
            (id.clone(), password.expose_secret().to_string()),
        );
        Ok(id)
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignedInUser, AccountStoreError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((id, stored)) if stored == password.expose_secret() => Ok(SignedInUser {
                account_id: id.clone(),
                email: email.to_string(),
            }),
            Some(_) => Err(AccountStoreError::new("Wrong password.")),
            None => Err(AccountStoreError::new("No user found with this email.")),
        }
    }

    async fn write_profile(
        &self,
        account: &AccountId,
        profile: &UserProfile,
    ) -> Result<(), AccountStoreError> {
        if let Some(message) = self.fail_profile_writes.lock().unwrap().clone() {
            return Err(AccountStoreError::new(message));
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(account.clone(), profile.clone());
        Ok(())
    }
}
