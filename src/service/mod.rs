//! Data access for each table, built on the clause builders, plus request validation.

pub mod games;
pub mod messages;
pub mod reports;
pub mod reviews;
pub mod users;
mod validation;
pub use validation::{parse_id, FieldRule, Format, RequestValidator};
pub use validation::{EMAIL, GAME_NAME, LONG_TEXT, SHORT_TEXT, URL, USERNAME};
