use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::db::entities::credential;
use crate::web::models::Patch;

const LABEL_MIN_CHARS: usize = 2;
const LABEL_MAX_CHARS: usize = 20;

/// Integration targets accepted by the platform endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Gmail,
    Llm,
    Telegram,
}

impl Platform {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Gmail => "gmail",
            Platform::Llm => "llm",
            Platform::Telegram => "telegram",
        }
    }
}

fn validate_label_patch(value: &Patch<String>) -> Result<(), ValidationError> {
    let Some(label) = value.as_value() else {
        return Ok(());
    };
    let chars = label.chars().count();
    if (LABEL_MIN_CHARS..=LABEL_MAX_CHARS).contains(&chars) {
        Ok(())
    } else {
        let mut err = ValidationError::new("length");
        err.message = Some("must be between 2 and 20 characters".into());
        Err(err)
    }
}

// --- Requests ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCredentialRequest {
    #[validate(length(min = 2, max = 20))]
    pub title: String,
    #[validate(length(min = 2, max = 20))]
    pub platform: String,
    pub data: Map<String, Value>,
    pub user_id: Option<i32>,
}

/// `fields` is stored verbatim; its keys are not checked against the platform.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlatformCredentialRequest {
    #[validate(length(min = 2, max = 20))]
    pub title: String,
    pub platform: Platform,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCredentialRequest {
    pub id: i32,
    #[serde(default)]
    #[validate(custom(function = "validate_label_patch"))]
    pub title: Patch<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_label_patch"))]
    pub platform: Patch<String>,
    #[serde(default)]
    pub data: Patch<Map<String, Value>>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlatformCredentialRequest {
    pub id: i32,
    #[serde(default)]
    #[validate(custom(function = "validate_label_patch"))]
    pub title: Patch<String>,
    /// Replaces the stored data entirely when present.
    #[serde(default)]
    pub fields: Patch<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct GetCredentialQuery {
    pub credential_id: i32,
    pub user_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListCredentialsQuery {
    pub user_id: Option<i32>,
}

// --- Responses ---

#[derive(Debug, Serialize)]
pub struct CredentialIdData {
    pub credential_id: i32,
}

#[derive(Debug, Serialize)]
pub struct CredentialSummary {
    pub credential_id: i32,
    pub title: String,
    pub platform: String,
}

impl From<credential::Model> for CredentialSummary {
    fn from(model: credential::Model) -> Self {
        Self {
            credential_id: model.id,
            title: model.title,
            platform: model.platform,
        }
    }
}

/// Single-item view. Never carries the secret payload.
#[derive(Debug, Serialize)]
pub struct CredentialPublic {
    pub id: i32,
    pub title: String,
    pub platform: String,
    pub user_id: i32,
}

impl From<credential::Model> for CredentialPublic {
    fn from(model: credential::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            platform: model.platform,
            user_id: model.user_id,
        }
    }
}

/// Listing view. Unlike [`CredentialPublic`] it includes `data`.
#[derive(Debug, Serialize)]
pub struct CredentialRecord {
    pub user_id: i32,
    pub id: i32,
    pub title: String,
    pub platform: String,
    pub data: Value,
}

impl From<credential::Model> for CredentialRecord {
    fn from(model: credential::Model) -> Self {
        Self {
            user_id: model.user_id,
            id: model.id,
            title: model.title,
            platform: model.platform,
            data: model.data,
        }
    }
}
