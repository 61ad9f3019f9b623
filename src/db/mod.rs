pub mod entities;
pub mod schema;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support {
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};

    use super::schema::ensure_schema;

    /// A fresh in-memory SQLite database with the credential table created.
    pub(crate) async fn memory_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        // Every pooled connection would otherwise get its own empty database.
        opt.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(opt).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }
}
