use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::web::error::AppError;
use crate::web::models::Claims;

/// The identity a credential operation runs under.
///
/// Built from the identity middleware's output and passed explicitly to every
/// credential handler, so the owner precedence is visible where it is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    authenticated_user_id: Option<i32>,
}

impl Caller {
    pub const fn anonymous() -> Self {
        Self {
            authenticated_user_id: None,
        }
    }

    pub const fn authenticated(user_id: i32) -> Self {
        Self {
            authenticated_user_id: Some(user_id),
        }
    }

    /// Owner for the generic endpoints: the authenticated id if there is one,
    /// otherwise whatever id the client asserted.
    ///
    /// Known weakness: an anonymous caller can act on any user's rows by
    /// asserting their id. Set `require_authentication` to close it.
    pub fn owner_or_asserted(&self, asserted: Option<i32>) -> Option<i32> {
        self.authenticated_user_id.or(asserted)
    }

    /// Owner for the platform endpoints, which never trust client input.
    pub const fn authenticated_owner(&self) -> Option<i32> {
        self.authenticated_user_id
    }
}

pub fn issue_token(
    user_id: i32,
    subject: &str,
    jwt_secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let expiration = (Utc::now() + ttl).timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        user_id,
        exp: usize::try_from(expiration).map_err(|_| {
            AppError::InternalServerError("Token expiry lies before the epoch".to_string())
        })?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token creation failed: {e}")))
}

pub fn verify_token(token: &str, jwt_secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
