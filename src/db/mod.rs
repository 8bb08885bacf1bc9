pub mod calculations;
pub mod pool;
pub mod tokens;
pub mod users;

pub use pool::{create_pool, run_migrations};

/// Database handle type, cloned into every handler through `AppState`
pub type Db = sqlx::SqlitePool;
