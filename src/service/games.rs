//! Games: submission, lookup, filtered listing and admin edits.

use crate::error::AppError;
use crate::sql::{InsertList, QueryBuf, UpdateList, WhereList};
use crate::store::{from_row, from_rows, Database};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 500;

/// Aggregates exclude removed reviews.
const GAME_SELECT: &str = "SELECT g.id, g.name, g.url, g.author, g.collab, g.adder_id, g.removed, \
     g.date_created, AVG(r.rating) AS rating, AVG(r.difficulty) AS difficulty, \
     COUNT(r.id) AS review_count \
     FROM games g LEFT JOIN reviews r ON r.game_id = g.id AND r.removed = FALSE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub collab: bool,
    pub adder_id: Option<i64>,
    pub removed: bool,
    pub date_created: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewGame {
    pub name: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub collab: bool,
    pub adder_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub collab: Option<bool>,
    pub removed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOrder {
    #[default]
    Name,
    DateCreated,
    Rating,
    Difficulty,
}

impl GameOrder {
    fn as_sql(self) -> &'static str {
        match self {
            GameOrder::Name => "g.name ASC",
            GameOrder::DateCreated => "g.date_created DESC",
            GameOrder::Rating => "rating DESC",
            GameOrder::Difficulty => "difficulty DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    /// Substring match on the name.
    pub name: Option<String>,
    pub author: Option<String>,
    /// Only honored for admins; everyone else sees non-removed games.
    pub removed: Option<bool>,
    pub order: GameOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub async fn add_game(db: &mut dyn Database, game: &NewGame) -> Result<i64, AppError> {
    let mut cols = InsertList::new();
    cols.add("name", &game.name);
    cols.add("url", game.url.clone());
    cols.add("author", game.author.clone());
    cols.add("collab", game.collab);
    cols.add("adder_id", game.adder_id);
    let q = cols.into_insert("games")?;
    let res = db.execute(&q.sql, &q.params).await?;
    Ok(res.insert_id as i64)
}

pub async fn get_game(db: &mut dyn Database, id: i64, include_removed: bool) -> Result<Option<Game>, AppError> {
    let mut filter = WhereList::new();
    filter.add("g.id", id);
    filter.add_if("g.removed", false, !include_removed);
    let w = filter.render();
    let sql = format!("{} {} GROUP BY g.id", GAME_SELECT, w.sql);
    let rows = db.query(&sql, &w.params).await?;
    rows.into_iter().next().map(from_row).transpose()
}

pub async fn get_games(db: &mut dyn Database, f: &GameFilter, is_admin: bool) -> Result<Vec<Game>, AppError> {
    let mut filter = WhereList::new();
    if let Some(name) = f.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        filter.add_phrase("g.name LIKE ?", [format!("%{}%", escape_like(name))])?;
    }
    filter.add("g.author", f.author.clone());
    match f.removed {
        Some(removed) if is_admin => filter.add_if("g.removed", removed, true),
        _ => filter.add_if("g.removed", false, true),
    };

    let w = filter.render();
    let mut q = QueryBuf::new(format!(
        "{} {} GROUP BY g.id ORDER BY {}, g.id ASC LIMIT ? OFFSET ?",
        GAME_SELECT,
        w.sql,
        f.order.as_sql()
    ));
    q.params = w.params;
    q.push_param(f.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT));
    q.push_param(f.offset.unwrap_or(0));
    let rows = db.query(&q.sql, &q.params).await?;
    from_rows(rows)
}

/// Returns `false` when the patch was empty and nothing ran.
pub async fn update_game(db: &mut dyn Database, id: i64, patch: &GamePatch, is_admin: bool) -> Result<bool, AppError> {
    let mut set = UpdateList::new();
    set.add("name", patch.name.clone());
    set.add("url", patch.url.clone());
    set.add("author", patch.author.clone());
    set.add("collab", patch.collab);
    set.add_if("removed", patch.removed, is_admin);

    let mut target = WhereList::new();
    target.add("id", id);
    let Some(q) = set.into_update("games", target)? else {
        return Ok(false);
    };
    db.execute(&q.sql, &q.params).await?;
    Ok(true)
}
