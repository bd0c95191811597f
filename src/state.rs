//! Shared application state for all routes. Everything here is read-only after startup.

use crate::auth::{Accounts, Auth};
use crate::service::users::UserAccounts;
use axum::extract::FromRef;
use sqlx::MySqlPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub auth: Arc<Auth>,
    /// Consulted when a stale token is replaced.
    pub accounts: Accounts,
}

impl AppState {
    pub fn new(pool: MySqlPool, auth: Arc<Auth>) -> Self {
        let accounts: Accounts = Arc::new(UserAccounts::new(pool.clone()));
        AppState { pool, auth, accounts }
    }
}

impl FromRef<AppState> for Arc<Auth> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Accounts {
    fn from_ref(state: &AppState) -> Self {
        state.accounts.clone()
    }
}
