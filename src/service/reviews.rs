//! Reviews of games. A rating or difficulty of `0` is a real score, so both go
//! through `add_direct` whenever they are present.

use crate::error::AppError;
use crate::sql::{InsertList, QueryBuf, UpdateList, WhereList};
use crate::store::{from_row, from_rows, Database};
use serde::{Deserialize, Serialize};

pub const RATING_MAX: f64 = 10.0;
pub const DIFFICULTY_MAX: f64 = 100.0;

const REVIEW_SELECT: &str = "SELECT r.id, r.game_id, r.user_id, u.name AS user_name, r.comment, \
     r.rating, r.difficulty, r.removed, r.date_created \
     FROM reviews r JOIN users u ON u.id = r.user_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Review {
    pub id: i64,
    pub game_id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub comment: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
    pub removed: bool,
    pub date_created: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub game_id: i64,
    pub user_id: i64,
    pub comment: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    pub comment: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
    pub removed: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub game_id: Option<i64>,
    pub user_id: Option<i64>,
    pub include_removed: bool,
}

pub async fn add_review(db: &mut dyn Database, review: &NewReview) -> Result<i64, AppError> {
    let mut cols = InsertList::new();
    cols.add("game_id", review.game_id);
    cols.add("user_id", review.user_id);
    cols.add("comment", review.comment.clone());
    if let Some(rating) = review.rating {
        cols.add_direct("rating", rating);
    }
    if let Some(difficulty) = review.difficulty {
        cols.add_direct("difficulty", difficulty);
    }
    let q = cols.into_insert("reviews")?;
    let res = db.execute(&q.sql, &q.params).await?;
    Ok(res.insert_id as i64)
}

pub async fn get_review(db: &mut dyn Database, id: i64) -> Result<Option<Review>, AppError> {
    let mut filter = WhereList::new();
    filter.add("r.id", id);
    let w = filter.render();
    let rows = db
        .query(&format!("{} {}", REVIEW_SELECT, w.sql), &w.params)
        .await?;
    rows.into_iter().next().map(from_row).transpose()
}

pub async fn get_reviews(db: &mut dyn Database, f: &ReviewFilter) -> Result<Vec<Review>, AppError> {
    let mut filter = WhereList::new();
    filter.add("r.game_id", f.game_id);
    filter.add("r.user_id", f.user_id);
    filter.add_if("r.removed", false, !f.include_removed);
    let w = filter.render();
    let mut q = QueryBuf::new(format!("{} {} ORDER BY r.date_created DESC, r.id DESC", REVIEW_SELECT, w.sql));
    q.params = w.params;
    let rows = db.query(&q.sql, &q.params).await?;
    from_rows(rows)
}

pub async fn update_review(
    db: &mut dyn Database,
    id: i64,
    patch: &ReviewPatch,
    is_admin: bool,
) -> Result<bool, AppError> {
    let mut set = UpdateList::new();
    set.add("comment", patch.comment.clone());
    set.add("rating", patch.rating);
    set.add("difficulty", patch.difficulty);
    set.add_if("removed", patch.removed, is_admin);

    let mut target = WhereList::new();
    target.add("id", id);
    let Some(q) = set.into_update("reviews", target)? else {
        return Ok(false);
    };
    db.execute(&q.sql, &q.params).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqlParam;
    use crate::store::testing::RecordingDb;
    use serde_json::json;

    #[tokio::test]
    async fn test_zero_rating_is_stored() {
        let mut db = RecordingDb::default();
        add_review(
            &mut db,
            &NewReview {
                game_id: 2,
                user_id: 7,
                comment: Some(String::new()),
                rating: Some(0.0),
                difficulty: None,
            },
        )
        .await
        .unwrap();
        let q = db.last();
        assert_eq!(
            q.sql,
            "INSERT INTO reviews (game_id, user_id, rating) VALUES (?, ?, ?)"
        );
        assert_eq!(q.params[2], SqlParam::Float(0.0));
    }

    #[tokio::test]
    async fn test_listing_for_a_game() {
        let mut db = RecordingDb::with_rows(vec![vec![json!({
            "id": 1, "game_id": 2, "user_id": 7, "user_name": "kayin", "comment": "hard",
            "rating": 0.0, "difficulty": 90.0, "removed": false,
            "date_created": "2021-02-03T04:05:06"
        })]]);
        let f = ReviewFilter {
            game_id: Some(2),
            ..Default::default()
        };
        let reviews = get_reviews(&mut db, &f).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, Some(0.0));
        let q = db.last();
        assert!(q.sql.contains("WHERE (r.game_id = ?) AND (r.removed = ?) ORDER BY"));
        assert_eq!(q.params, vec![SqlParam::Int(2), SqlParam::Bool(false)]);
        assert_eq!(serde_json::to_value(&reviews[0]).unwrap()["userName"], "kayin");
    }

    #[tokio::test]
    async fn test_owner_patch_cannot_restore() {
        let mut db = RecordingDb::default();
        let patch = ReviewPatch {
            rating: Some(5.5),
            removed: Some(false),
            ..Default::default()
        };
        assert!(update_review(&mut db, 3, &patch, false).await.unwrap());
        assert_eq!(db.last().sql, "UPDATE reviews SET rating = ? WHERE (id = ?)");

        assert!(update_review(&mut db, 3, &patch, true).await.unwrap());
        assert_eq!(
            db.last().sql,
            "UPDATE reviews SET rating = ?, removed = ? WHERE (id = ?)"
        );
    }

    #[tokio::test]
    async fn test_get_review_missing() {
        let mut db = RecordingDb::default();
        assert!(get_review(&mut db, 3).await.unwrap().is_none());
        assert!(db.last().sql.ends_with("WHERE (r.id = ?)"));
    }
}
