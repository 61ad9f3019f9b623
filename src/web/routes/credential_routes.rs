use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;

use crate::db::services::credential_service::{
    CredentialChanges, CredentialError, CredentialService,
};
use crate::services::auth_service::Caller;
use crate::web::extract::{AppJson, AppQuery, validate_request};
use crate::web::models::ApiResponse;
use crate::web::models::credential_models::{
    CreateCredentialRequest, CreatePlatformCredentialRequest, CredentialIdData, CredentialPublic,
    CredentialRecord, CredentialSummary, GetCredentialQuery, ListCredentialsQuery,
    UpdateCredentialRequest, UpdatePlatformCredentialRequest,
};
use crate::web::{AppError, AppState};

const ADDED_MESSAGE: &str = "Credentials added successfully";
const UPDATED_MESSAGE: &str = "Credential updated successfully";
const FETCHED_MESSAGE: &str = "Credential fetched successfully";

pub const CREDENTIAL_API_PREFIX: &str = "/api/v1/credential";

/// Routes carry the full prefix rather than being nested, because a nested
/// `/` never matches the trailing-slash form existing clients call.
pub fn credential_router() -> Router<Arc<AppState>> {
    let path = |suffix: &str| format!("{CREDENTIAL_API_PREFIX}{suffix}");

    Router::new()
        .route(CREDENTIAL_API_PREFIX, get(get_credential))
        .route(&path("/"), get(get_credential))
        .route(&path("/all"), get(get_all_credentials))
        .route(&path("/create"), post(create_credential))
        .route(&path("/create-platform"), post(create_platform_credential))
        .route(&path("/update"), post(update_credential))
        .route(&path("/update-platform"), post(update_platform_credential))
}

async fn create_credential(
    State(app_state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(payload): AppJson<CreateCredentialRequest>,
) -> Result<Json<ApiResponse<CredentialIdData>>, AppError> {
    validate_request(&payload)?;

    let credential = CredentialService::create(
        &app_state.db_pool,
        caller.owner_or_asserted(payload.user_id),
        payload.title,
        payload.platform,
        Value::Object(payload.data),
    )
    .await?;

    Ok(Json(ApiResponse::new(
        ADDED_MESSAGE,
        CredentialIdData {
            credential_id: credential.id,
        },
    )))
}

async fn create_platform_credential(
    State(app_state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(payload): AppJson<CreatePlatformCredentialRequest>,
) -> Result<Json<ApiResponse<CredentialSummary>>, AppError> {
    validate_request(&payload)?;

    let credential = CredentialService::create(
        &app_state.db_pool,
        caller.authenticated_owner(),
        payload.title,
        payload.platform.as_str().to_string(),
        Value::Object(payload.fields),
    )
    .await?;

    Ok(Json(ApiResponse::new(ADDED_MESSAGE, credential.into())))
}

async fn update_credential(
    State(app_state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(payload): AppJson<UpdateCredentialRequest>,
) -> Result<Json<ApiResponse<CredentialIdData>>, AppError> {
    validate_request(&payload)?;

    let changes = CredentialChanges {
        title: payload.title.into_value(),
        platform: payload.platform.into_value(),
        data: payload.data.into_value().map(Value::Object),
    };
    let credential = CredentialService::update(
        &app_state.db_pool,
        payload.id,
        caller.owner_or_asserted(payload.user_id),
        changes,
    )
    .await?;

    Ok(Json(ApiResponse::new(
        UPDATED_MESSAGE,
        CredentialIdData {
            credential_id: credential.id,
        },
    )))
}

async fn update_platform_credential(
    State(app_state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(payload): AppJson<UpdatePlatformCredentialRequest>,
) -> Result<Json<ApiResponse<CredentialSummary>>, AppError> {
    validate_request(&payload)?;

    // The platform tag itself is fixed on this path.
    let changes = CredentialChanges {
        title: payload.title.into_value(),
        platform: None,
        data: payload.fields.into_value().map(Value::Object),
    };
    let credential = CredentialService::update(
        &app_state.db_pool,
        payload.id,
        caller.authenticated_owner(),
        changes,
    )
    .await?;

    Ok(Json(ApiResponse::new(UPDATED_MESSAGE, credential.into())))
}

async fn get_credential(
    State(app_state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(query): AppQuery<GetCredentialQuery>,
) -> Result<Json<ApiResponse<CredentialPublic>>, AppError> {
    let credential = CredentialService::find_owned(
        &app_state.db_pool,
        query.credential_id,
        caller.owner_or_asserted(query.user_id),
    )
    .await?;

    Ok(Json(ApiResponse::new(FETCHED_MESSAGE, credential.into())))
}

async fn get_all_credentials(
    State(app_state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(query): AppQuery<ListCredentialsQuery>,
) -> Result<Json<Vec<CredentialRecord>>, AppError> {
    let credentials = CredentialService::list_owned(
        &app_state.db_pool,
        caller.owner_or_asserted(query.user_id),
    )
    .await?;

    Ok(Json(credentials.into_iter().map(CredentialRecord::from).collect()))
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DbErr(e) => AppError::DatabaseError(e.to_string()),
            CredentialError::NotFound(_) => AppError::NotFoundOrForbidden(err.to_string()),
            CredentialError::OwnerUnresolved => AppError::InternalServerError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::db::test_support::memory_db;
    use crate::server::config::ServerConfig;
    use crate::services::auth_service::issue_token;
    use crate::web::create_axum_router;
    use crate::web::middleware::auth::TOKEN_COOKIE;

    const SECRET: &str = "route-test-secret";

    fn test_config(require_authentication: bool) -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: SECRET.to_string(),
            require_authentication,
            bootstrap_schema: true,
            db_max_connections: 1,
            log_dir: "logs".to_string(),
        })
    }

    async fn test_app() -> (Router, DatabaseConnection) {
        let db = memory_db().await;
        (create_axum_router(db.clone(), test_config(false)), db)
    }

    fn token_for(user_id: i32) -> String {
        issue_token(user_id, "tester", SECRET, Duration::hours(1)).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn platform_credential_lifecycle() {
        let (app, _db) = test_app().await;
        let token = token_for(7);

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/create-platform",
                Some(&token),
                json!({
                    "title": "mail1",
                    "platform": "gmail",
                    "fields": { "email": "a@b.com", "app_password": "x" }
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Credentials added successfully");
        assert_eq!(body["data"]["title"], "mail1");
        assert_eq!(body["data"]["platform"], "gmail");
        let id = body["data"]["credential_id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            get(&format!("/api/v1/credential?credential_id={id}"), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Credential fetched successfully");
        assert_eq!(
            body["data"],
            json!({ "id": id, "title": "mail1", "platform": "gmail", "user_id": 7 })
        );

        let (status, body) = send(&app, get("/api/v1/credential/all", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "user_id": 7,
                "id": id,
                "title": "mail1",
                "platform": "gmail",
                "data": { "email": "a@b.com", "app_password": "x" }
            }])
        );

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/update-platform",
                Some(&token),
                json!({ "id": id, "fields": { "email": "c@d.com" } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Credential updated successfully");
        assert_eq!(
            body["data"],
            json!({ "credential_id": id, "title": "mail1", "platform": "gmail" })
        );

        let (_, body) = send(&app, get("/api/v1/credential/all", Some(&token))).await;
        assert_eq!(body[0]["data"], json!({ "email": "c@d.com" }));
    }

    #[tokio::test]
    async fn generic_paths_fall_back_to_asserted_user_id() {
        let (app, db) = test_app().await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/create",
                None,
                json!({
                    "title": "openai",
                    "platform": "llm",
                    "data": { "api_key": "sk-1" },
                    "user_id": 42
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["credential_id"].as_i64().unwrap();

        let stored = CredentialService::find_owned(&db, i32::try_from(id).unwrap(), Some(42))
            .await
            .unwrap();
        assert_eq!(stored.title, "openai");

        let (status, body) = send(
            &app,
            get(&format!("/api/v1/credential?credential_id={id}&user_id=42"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user_id"], 42);
        assert!(body["data"].get("data").is_none());

        let (_, body) = send(&app, get("/api/v1/credential/all?user_id=42", None)).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(&app, get("/api/v1/credential/all", None)).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn single_credential_is_served_with_and_without_trailing_slash() {
        let (app, db) = test_app().await;
        let created = CredentialService::create(
            &db,
            Some(7),
            "mail1".to_string(),
            "gmail".to_string(),
            json!({ "email": "a@b.com" }),
        )
        .await
        .unwrap();

        for base in ["/api/v1/credential", "/api/v1/credential/"] {
            let (status, body) = send(
                &app,
                get(&format!("{base}?credential_id={}&user_id=7", created.id), None),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "GET {base}");
            assert_eq!(
                body["data"],
                json!({ "id": created.id, "title": "mail1", "platform": "gmail", "user_id": 7 })
            );
        }

        // The identity middleware still guards the trailing-slash route.
        let (status, _) = send(
            &app,
            get(
                &format!("/api/v1/credential/?credential_id={}", created.id),
                Some("not-a-jwt"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_id_beats_asserted_id() {
        let (app, db) = test_app().await;
        let token = token_for(7);

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/create",
                Some(&token),
                json!({ "title": "bot", "platform": "telegram", "data": {}, "user_id": 99 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = i32::try_from(body["data"]["credential_id"].as_i64().unwrap()).unwrap();

        assert!(CredentialService::find_owned(&db, id, Some(7)).await.is_ok());
        assert!(CredentialService::find_owned(&db, id, Some(99)).await.is_err());

        let (_, body) = send(&app, get("/api/v1/credential/all?user_id=99", Some(&token))).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["user_id"], 7);
    }

    #[tokio::test]
    async fn generic_update_keeps_fields_that_were_not_supplied() {
        let (app, db) = test_app().await;
        let created = CredentialService::create(
            &db,
            Some(7),
            "mail1".to_string(),
            "gmail".to_string(),
            json!({ "email": "a@b.com" }),
        )
        .await
        .unwrap();

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/update",
                None,
                json!({ "id": created.id, "title": "renamed", "data": null, "user_id": 7 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({ "credential_id": created.id }));

        let stored = CredentialService::find_owned(&db, created.id, Some(7))
            .await
            .unwrap();
        assert_eq!(stored.title, "renamed");
        assert_eq!(stored.platform, "gmail");
        assert_eq!(stored.data, json!({ "email": "a@b.com" }));
    }

    #[tokio::test]
    async fn foreign_rows_look_missing() {
        let (app, db) = test_app().await;
        let created = CredentialService::create(
            &db,
            Some(7),
            "mail1".to_string(),
            "gmail".to_string(),
            json!({}),
        )
        .await
        .unwrap();
        let intruder = token_for(8);

        let (status, body) = send(
            &app,
            get(
                &format!("/api/v1/credential?credential_id={}", created.id),
                Some(&intruder),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Credential not found or does not exist");

        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/credential/update-platform",
                Some(&intruder),
                json!({ "id": created.id, "title": "mine now" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // The platform path ignores any asserted owner, so anonymous callers never match.
        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/credential/update-platform",
                None,
                json!({ "id": created.id, "title": "mine now", "user_id": 7 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            get("/api/v1/credential?credential_id=9999&user_id=7", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Credential not found or does not exist");

        let stored = CredentialService::find_owned(&db, created.id, Some(7))
            .await
            .unwrap();
        assert_eq!(stored.title, "mail1");
    }

    #[tokio::test]
    async fn invalid_payloads_never_reach_storage() {
        let (app, db) = test_app().await;
        let token = token_for(7);

        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/credential/create-platform",
                Some(&token),
                json!({ "title": "chat", "platform": "slack", "fields": {} }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/create",
                Some(&token),
                json!({ "title": "x", "platform": "gmail", "data": {} }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("title"));

        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/credential/create",
                Some(&token),
                json!({ "title": "mail", "platform": "gmail", "data": "secret" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/api/v1/credential", Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(CredentialService::list_owned(&db, Some(7)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn platform_create_without_identity_is_an_internal_error() {
        let (app, db) = test_app().await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/credential/create-platform",
                None,
                json!({ "title": "mail1", "platform": "gmail", "fields": {} }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Internal server error"));
        assert!(CredentialService::list_owned(&db, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tokens_are_read_from_cookie_and_checked() {
        let (app, _db) = test_app().await;

        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/credential/all")
            .header(header::COOKIE, format!("{TOKEN_COOKIE}={}", token_for(7)))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) =
            send(&app, get("/api/v1/credential/all", Some("not-a-jwt"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn required_authentication_rejects_anonymous_callers() {
        let db = memory_db().await;
        let app = create_axum_router(db, test_config(true));

        let (status, body) = send(&app, get("/api/v1/credential/all?user_id=7", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token provided");

        let (status, _) = send(&app, get("/api/v1/credential/all", Some(&token_for(7)))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
