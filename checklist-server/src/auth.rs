use argon2::{
    password_hash::{
        rand_core::OsRng,
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString
    },
    Argon2
};
use checklist_core::{seed, ChecklistError, TaskScope, User};

use crate::errors::ServerResult;
use crate::store::StoreHandle;

/// Registers and authenticates users against the `users` table.
#[derive(Clone)]
pub struct CredentialStore {
    store: Option<StoreHandle>,
}

impl CredentialStore {
    pub fn new(store: Option<StoreHandle>) -> Self {
        Self { store }
    }

    fn store(&self) -> Result<&StoreHandle, ChecklistError> {
        self.store.as_ref().ok_or(ChecklistError::StoreNotConfigured)
    }

    pub fn hash_password(password: &str) -> ServerResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    pub fn verify_password(password: &str, hash: &str) -> ServerResult<bool> {
        let parsed_hash = PasswordHash::new(hash)?;
        let argon2 = Argon2::default();
        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    /// Create an account and seed its personal checklist.
    ///
    /// Seeding failures are logged only; the account exists either way.
    pub async fn register(&self, username: &str, password: &str) -> ServerResult<User> {
        let store = self.store()?;

        if store.find_user(username).await?.is_some() {
            return Err(ChecklistError::DuplicateUsername.into());
        }

        let password_hash = Self::hash_password(password)?;
        let record = store.insert_user(username, &password_hash).await?;
        tracing::info!(user_id = record.id, username = %record.username, "Registered user");

        self.seed_user_tasks(store, record.id).await;

        Ok(record.to_user())
    }

    /// Unknown usernames and wrong passwords fail identically.
    pub async fn login(&self, username: &str, password: &str) -> ServerResult<User> {
        let store = self.store()?;

        let Some(record) = store.find_user(username).await? else {
            tracing::debug!(username = %username, "Login for unknown user");
            return Err(ChecklistError::InvalidCredentials.into());
        };

        if !Self::verify_password(password, &record.password_hash).unwrap_or(false) {
            tracing::debug!(user_id = record.id, "Login with wrong password");
            return Err(ChecklistError::InvalidCredentials.into());
        }

        Ok(record.to_user())
    }

    async fn seed_user_tasks(&self, store: &StoreHandle, user_id: i64) {
        let scope = TaskScope::Owner(user_id);
        let tasks = seed::seed_tasks(scope);

        match store.insert_tasks(&tasks, scope.owner()).await {
            Ok(()) => {
                tracing::debug!(user_id, count = tasks.len(), "Seeded user checklist");
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to seed user checklist");
            }
        }
    }
}
