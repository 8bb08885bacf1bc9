//! Calculator API Library
//!
//! This module exports the core types and functions for testing and reuse.

pub mod calculator;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod schemas;
pub mod security;

pub use config::Config;
pub use db::{create_pool, run_migrations, Db};
pub use error::{AppError, Result};
pub use routes::router;

use security::TokenIssuer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Db,
    pub config: Config,
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Create a new AppState; signing keys are derived from `config`
    pub fn new(pool: Db, config: Config) -> Self {
        let tokens = TokenIssuer::from_config(&config);
        Self {
            pool,
            config,
            tokens,
        }
    }
}
