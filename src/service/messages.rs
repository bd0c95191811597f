//! Private messages between users.

use crate::error::AppError;
use crate::sql::{InsertList, QueryBuf, UpdateList, WhereList};
use crate::store::{from_rows, Database};
use serde::{Deserialize, Serialize};

const MESSAGE_SELECT: &str = "SELECT m.id, m.user_from_id, f.name AS user_from_name, m.user_to_id, \
     m.subject, m.body, m.is_read, m.date_created \
     FROM messages m LEFT JOIN users f ON f.id = m.user_from_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Message {
    pub id: i64,
    pub user_from_id: i64,
    pub user_from_name: Option<String>,
    pub user_to_id: i64,
    pub subject: Option<String>,
    pub body: String,
    pub is_read: bool,
    pub date_created: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_from_id: i64,
    pub user_to_id: i64,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub user_to_id: Option<i64>,
    pub user_from_id: Option<i64>,
    pub unread_only: bool,
}

pub async fn add_message(db: &mut dyn Database, msg: &NewMessage) -> Result<i64, AppError> {
    let mut cols = InsertList::new();
    cols.add("user_from_id", msg.user_from_id);
    cols.add("user_to_id", msg.user_to_id);
    cols.add("subject", msg.subject.clone());
    cols.add_direct("body", &msg.body);
    let q = cols.into_insert("messages")?;
    let res = db.execute(&q.sql, &q.params).await?;
    tracing::debug!(message_id = res.insert_id, to = msg.user_to_id, "message sent");
    Ok(res.insert_id as i64)
}

pub async fn get_messages(db: &mut dyn Database, f: &MessageFilter) -> Result<Vec<Message>, AppError> {
    let mut filter = WhereList::new();
    filter.add("m.user_to_id", f.user_to_id);
    filter.add("m.user_from_id", f.user_from_id);
    filter.add_if("m.is_read", false, f.unread_only);
    let w = filter.render();
    let mut q = QueryBuf::new(format!("{} {} ORDER BY m.date_created DESC, m.id DESC", MESSAGE_SELECT, w.sql));
    q.params = w.params;
    let rows = db.query(&q.sql, &q.params).await?;
    from_rows(rows)
}

/// Marks a message read. Only the recipient's own messages match, so `false`
/// means no such message in their inbox.
pub async fn mark_read(db: &mut dyn Database, id: i64, recipient_id: i64) -> Result<bool, AppError> {
    let mut set = UpdateList::new();
    set.add("is_read", Some(true));

    let mut target = WhereList::new();
    target.add("id", id);
    target.add("user_to_id", recipient_id);
    let Some(q) = set.into_update("messages", target)? else {
        return Ok(false);
    };
    let res = db.execute(&q.sql, &q.params).await?;
    Ok(res.affected_rows > 0)
}
