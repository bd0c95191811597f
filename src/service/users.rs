//! User accounts: registration, credentials, profiles and admin moderation.

use crate::auth::{AccountSource, Permission, Standing};
use crate::error::AppError;
use crate::sql::{InsertList, QueryBuf, UpdateList, WhereList};
use crate::store::{from_row, Connection, Database};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

const USER_COLUMNS: &str = "id, name, email, bio, is_admin, banned, can_submit, can_review, \
     can_report, can_message, date_created";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Private; never part of a public profile.
    #[serde(skip_serializing)]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub banned: bool,
    pub can_submit: bool,
    pub can_review: bool,
    pub can_report: bool,
    pub can_message: bool,
    pub date_created: Option<String>,
}

impl User {
    pub fn permissions(&self) -> Vec<Permission> {
        [
            (self.can_submit, Permission::CanSubmit),
            (self.can_review, Permission::CanReview),
            (self.can_report, Permission::CanReport),
            (self.can_message, Permission::CanMessage),
        ]
        .into_iter()
        .filter_map(|(held, p)| held.then_some(p))
        .collect()
    }
}

impl From<User> for Standing {
    fn from(user: User) -> Self {
        Standing {
            perms: user.permissions(),
            username: user.name,
            is_admin: user.is_admin,
            banned: user.banned,
        }
    }
}

/// Account standing read from the users table, one pooled connection per lookup.
pub struct UserAccounts {
    pool: MySqlPool,
}

impl UserAccounts {
    pub fn new(pool: MySqlPool) -> Self {
        UserAccounts { pool }
    }
}

#[async_trait]
impl AccountSource for UserAccounts {
    async fn standing(&self, user_id: i64) -> Result<Option<Standing>, AppError> {
        let mut conn = Connection::acquire(&self.pool).await?;
        let user = get_user(&mut conn, user_id).await?;
        conn.close();
        Ok(user.map(Standing::from))
    }
}

/// Stored password hash for one user.
#[derive(Deserialize)]
pub struct Credential {
    #[serde(rename = "id")]
    pub user_id: i64,
    #[serde(rename = "phash")]
    pub password_hash: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password_hash: String,
    pub email: Option<String>,
}

/// Sparse profile update. `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub bio: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
    pub banned: Option<bool>,
    pub can_submit: Option<bool>,
    pub can_review: Option<bool>,
    pub can_report: Option<bool>,
    pub can_message: Option<bool>,
}

pub async fn add_user(db: &mut dyn Database, user: &NewUser) -> Result<i64, AppError> {
    let mut cols = InsertList::new();
    cols.add("name", &user.name);
    cols.add("phash", &user.password_hash);
    cols.add("email", user.email.clone());
    let q = cols.into_insert("users")?;
    // A concurrent registration can win between `name_taken` and this insert.
    let res = match db.execute(&q.sql, &q.params).await {
        Ok(res) => res,
        Err(e) if e.is_unique_violation() => {
            return Err(AppError::Conflict(format!("username {} is taken", user.name)));
        }
        Err(e) => return Err(e),
    };
    tracing::info!(user_id = res.insert_id, "user registered");
    Ok(res.insert_id as i64)
}

pub async fn name_taken(db: &mut dyn Database, name: &str) -> Result<bool, AppError> {
    let mut filter = WhereList::new();
    filter.add_if("name", name, true);
    let w = filter.render();
    let rows = db
        .query(&format!("SELECT id FROM users {} LIMIT 1", w.sql), &w.params)
        .await?;
    Ok(!rows.is_empty())
}

pub async fn get_credential(db: &mut dyn Database, name: &str) -> Result<Option<Credential>, AppError> {
    let mut filter = WhereList::new();
    filter.add_if("name", name, true);
    let w = filter.render();
    let rows = db
        .query(&format!("SELECT id, phash FROM users {} LIMIT 1", w.sql), &w.params)
        .await?;
    rows.into_iter().next().map(from_row).transpose()
}

pub async fn get_user(db: &mut dyn Database, id: i64) -> Result<Option<User>, AppError> {
    let mut filter = WhereList::new();
    filter.add("id", id);
    let w = filter.render();
    let mut q = QueryBuf::new(format!("SELECT {} FROM users {}", USER_COLUMNS, w.sql));
    q.params = w.params;
    let rows = db.query(&q.sql, &q.params).await?;
    rows.into_iter().next().map(from_row).transpose()
}

/// Moderation columns are only written when `is_admin`. Returns `false` when
/// nothing was queued and no statement ran.
pub async fn update_user(
    db: &mut dyn Database,
    id: i64,
    patch: &UserPatch,
    is_admin: bool,
) -> Result<bool, AppError> {
    let mut set = UpdateList::new();
    set.add("email", patch.email.clone());
    set.add("bio", patch.bio.clone());
    set.add("phash", patch.password_hash.clone());
    set.add_if("is_admin", patch.is_admin, is_admin);
    set.add_if("banned", patch.banned, is_admin);
    set.add_if("can_submit", patch.can_submit, is_admin);
    set.add_if("can_review", patch.can_review, is_admin);
    set.add_if("can_report", patch.can_report, is_admin);
    set.add_if("can_message", patch.can_message, is_admin);

    let mut target = WhereList::new();
    target.add("id", id);
    let Some(q) = set.into_update("users", target)? else {
        return Ok(false);
    };
    db.execute(&q.sql, &q.params).await?;
    Ok(true)
}
