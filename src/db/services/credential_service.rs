use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as Json;
use tracing::{debug, info};

use crate::db::entities::{credential, prelude::Credential};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    /// Covers both a missing row and a row owned by somebody else.
    #[error("Credential not found or does not exist")]
    NotFound(i32),
    #[error("credential owner could not be resolved")]
    OwnerUnresolved,
}

/// Field values to write on update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialChanges {
    pub title: Option<String>,
    pub platform: Option<String>,
    pub data: Option<Json>,
}

impl CredentialChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.platform.is_none() && self.data.is_none()
    }
}

pub struct CredentialService;

impl CredentialService {
    pub async fn create(
        db: &DbConn,
        owner: Option<i32>,
        title: String,
        platform: String,
        data: Json,
    ) -> Result<credential::Model, CredentialError> {
        let user_id = owner.ok_or(CredentialError::OwnerUnresolved)?;

        let new_credential = credential::ActiveModel {
            user_id: Set(user_id),
            title: Set(title),
            platform: Set(platform),
            data: Set(data),
            ..Default::default()
        };

        let created = new_credential.insert(db).await?;
        info!(
            credential_id = created.id,
            user_id,
            platform = %created.platform,
            "Credential created."
        );
        Ok(created)
    }

    /// Looks up a credential by id, restricted to rows owned by `owner`.
    pub async fn find_owned(
        db: &DbConn,
        credential_id: i32,
        owner: Option<i32>,
    ) -> Result<credential::Model, CredentialError> {
        // No owner can never match the non-null user_id column.
        let Some(user_id) = owner else {
            return Err(CredentialError::NotFound(credential_id));
        };

        Credential::find_by_id(credential_id)
            .filter(credential::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(CredentialError::NotFound(credential_id))
    }

    pub async fn list_owned(
        db: &DbConn,
        owner: Option<i32>,
    ) -> Result<Vec<credential::Model>, CredentialError> {
        let Some(user_id) = owner else {
            return Ok(Vec::new());
        };

        let credentials = Credential::find()
            .filter(credential::Column::UserId.eq(user_id))
            .order_by_asc(credential::Column::Id)
            .all(db)
            .await?;
        debug!(user_id, count = credentials.len(), "Listed credentials.");
        Ok(credentials)
    }

    pub async fn update(
        db: &DbConn,
        credential_id: i32,
        owner: Option<i32>,
        changes: CredentialChanges,
    ) -> Result<credential::Model, CredentialError> {
        let existing = Self::find_owned(db, credential_id, owner).await?;

        if changes.is_empty() {
            debug!(credential_id, "Update carried no changes.");
            return Ok(existing);
        }

        let mut active_credential: credential::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            active_credential.title = Set(title);
        }
        if let Some(platform) = changes.platform {
            active_credential.platform = Set(platform);
        }
        if let Some(data) = changes.data {
            active_credential.data = Set(data);
        }

        let updated = active_credential.update(db).await?;
        info!(credential_id, user_id = updated.user_id, "Credential updated.");
        Ok(updated)
    }
}
