pub mod models;
pub mod store;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Embedded schema migrations; tests run the same migrator against
/// `sqlite::memory:`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open (creating if missing) and migrate the mirror database.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
