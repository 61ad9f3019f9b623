use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::db::entities::prelude::Credential;

/// Creates the `credentials` table from the entity definition if it is missing.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_credentials = schema.create_table_from_entity(Credential);
    create_credentials.if_not_exists();
    db.execute(backend.build(&create_credentials)).await?;

    info!(backend = ?backend, "Credential schema is in place.");
    Ok(())
}
