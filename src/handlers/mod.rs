//! HTTP handlers, one module per resource.

pub mod auth;
pub mod games;
pub mod messages;
pub mod reports;
pub mod reviews;
pub mod users;
