//! Current account standing, consulted whenever a stale token is replaced so
//! bans and privilege changes reach the replacement.

use crate::auth::gate::Permission;
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;

/// What a replacement token is minted from.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub username: String,
    pub is_admin: bool,
    pub banned: bool,
    pub perms: Vec<Permission>,
}

#[async_trait]
pub trait AccountSource: Send + Sync {
    /// `None` when the account no longer exists.
    async fn standing(&self, user_id: i64) -> Result<Option<Standing>, AppError>;
}

pub type Accounts = Arc<dyn AccountSource>;
