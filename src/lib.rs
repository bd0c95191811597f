//! Delicious Fruit: REST backend for a game-review site, with positional-parameter
//! SQL clause builders and token authentication with soft refresh.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::Auth;
pub use config::{AppConfig, AuthConfig};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use response::{success_many, success_one, success_one_ok};
pub use routes::{api_routes, common_routes_with_ready};
pub use state::AppState;
pub use store::{Connection, Database};
