use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::services::auth_service::verify_token;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError};

pub const TOKEN_COOKIE: &str = "accessToken";

/// Attaches an [`AuthenticatedUser`] when the request carries a valid token.
///
/// Requests without a token continue anonymously unless the server is
/// configured to require authentication.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    // Authorization header first, then the cookie.
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()));

    let Some(token) = token else {
        if state.config.require_authentication {
            return Err(AppError::Unauthorized("No token provided".to_string()));
        }
        debug!(path = %req.uri().path(), "Anonymous request.");
        return Ok(next.run(req).await);
    };

    let claims = verify_token(&token, &state.config.jwt_secret).map_err(|e| {
        warn!(error = ?e, "JWT decoding error during identity middleware.");
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    req.extensions_mut().insert(AuthenticatedUser {
        id: claims.user_id,
        subject: claims.sub,
    });
    Ok(next.run(req).await)
}
