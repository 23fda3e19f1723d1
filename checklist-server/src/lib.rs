pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod errors;
pub mod queries;
pub mod repository;
pub mod schema;
pub mod sessions;
pub mod setup;
pub mod store;

use auth::CredentialStore;
use sessions::SessionRegistry;
use store::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no store is configured; every session then runs on the
    /// built-in checklist.
    pub store: Option<StoreHandle>,
    pub credentials: CredentialStore,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(store: Option<StoreHandle>) -> Self {
        Self {
            credentials: CredentialStore::new(store.clone()),
            sessions: SessionRegistry::new(),
            store,
        }
    }
}
