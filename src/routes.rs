use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    auth::{self, AdminClaims, UserClaims},
    error::{AppError, AppResult},
    settings,
    state::State as AppState,
    votes::{self, TallyEntry},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/api/votes", post(cast_vote_handler).get(tally_handler))
        .route(
            "/api/settings",
            get(read_settings_handler).post(write_settings_handler),
        )
        .route("/api/admin/login", post(login_handler))
        .route("/api/admin/verify", get(verify_handler))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    // Defaulted so a missing field reads as empty and fails validation
    // with a 400 rather than a deserialization rejection.
    #[serde(default)]
    pub category_slug: String,
    #[serde(default)]
    pub nominee_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteResponse {
    pub message: String,
    pub nominee_id: String,
    pub category_slug: String,
    pub new_count: i64,
}

pub async fn cast_vote_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CastVoteRequest>,
) -> AppResult<Json<CastVoteResponse>> {
    let outcome = votes::cast_vote(
        state.store.as_ref(),
        &payload.category_slug,
        &payload.nominee_id,
    )
    .await?;

    Ok(Json(CastVoteResponse {
        message: "Vote registered".to_string(),
        nominee_id: outcome.key.nominee_id,
        category_slug: outcome.key.category_slug,
        new_count: outcome.new_count,
    }))
}

#[derive(Serialize)]
pub struct TallyResponse {
    pub success: bool,
    pub votes: Vec<TallyEntry>,
}

pub async fn tally_handler(
    _admin: AdminClaims,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<TallyResponse>> {
    let votes = votes::tally(state.store.as_ref()).await?;

    Ok(Json(TallyResponse {
        success: true,
        votes,
    }))
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: Map<String, Value>,
}

pub async fn read_settings_handler(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<SettingsResponse>> {
    let settings = settings::read(state.store.as_ref()).await?;

    Ok(Json(SettingsResponse {
        success: true,
        settings,
    }))
}

pub async fn write_settings_handler(
    _admin: AdminClaims,
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> AppResult<Json<SettingsResponse>> {
    let written = settings::write(state.store.as_ref(), document).await?;

    Ok(Json(SettingsResponse {
        success: true,
        settings: written,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let configured = state
        .config
        .admin_password
        .as_deref()
        .ok_or_else(|| AppError::Configuration("ADMIN_PASSWORD is not set".to_string()))?;
    let secret = state
        .config
        .token_secret
        .as_deref()
        .ok_or_else(|| AppError::Configuration("TOKEN_SECRET is not set".to_string()))?;

    // Same generic message for an empty or wrong password; the response
    // reveals nothing about the configured secret.
    if payload.password.is_empty() || payload.password != configured {
        return Err(AppError::Authentication("Invalid password".to_string()));
    }

    let token = auth::create_token(secret)?;

    Ok(Json(json!({ "message": "Login successful", "token": token })))
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub user: UserClaims,
}

pub async fn verify_handler(AdminClaims(claims): AdminClaims) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        success: true,
        user: claims.user,
    })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, database::memory::MemoryStore};

    fn test_app() -> Router {
        router(AppState::for_tests(Arc::new(MemoryStore::default())))
    }

    fn admin_token() -> String {
        auth::create_token("test-token-secret").unwrap()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    #[tokio::test]
    async fn casting_votes_returns_running_count() {
        let app = test_app();
        let body = json!({ "categorySlug": "best-anime", "nomineeId": "nom-A" });

        let (status, first) = send(&app, Method::POST, "/api/votes", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["newCount"], 1);
        assert_eq!(first["categorySlug"], "best-anime");
        assert_eq!(first["nomineeId"], "nom-A");

        let (_, second) = send(&app, Method::POST, "/api/votes", None, Some(body)).await;
        assert_eq!(second["newCount"], 2);
    }

    #[tokio::test]
    async fn vote_with_missing_fields_is_a_400() {
        let app = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/votes",
            None,
            Some(json!({ "categorySlug": "best-anime" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn wrong_verb_on_votes_is_a_405() {
        let app = test_app();

        let (status, _) = send(&app, Method::PUT, "/api/votes", None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn tally_requires_a_token() {
        let app = test_app();

        let (status, _) = send(&app, Method::GET, "/api/votes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tally_reports_every_counter() {
        let app = test_app();
        for _ in 0..3 {
            send(
                &app,
                Method::POST,
                "/api/votes",
                None,
                Some(json!({ "categorySlug": "best-anime", "nomineeId": "nom-A" })),
            )
            .await;
        }
        send(
            &app,
            Method::POST,
            "/api/votes",
            None,
            Some(json!({ "categorySlug": "best-anime", "nomineeId": "nom-B" })),
        )
        .await;

        let token = admin_token();
        let (status, body) = send(&app, Method::GET, "/api/votes", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let votes = body["votes"].as_array().unwrap();
        assert_eq!(votes.len(), 2);
        let count_for = |nominee: &str| {
            votes
                .iter()
                .find(|v| v["nomineeId"] == nominee)
                .map(|v| v["count"].as_i64().unwrap())
                .unwrap()
        };
        assert_eq!(count_for("nom-A"), 3);
        assert_eq!(count_for("nom-B"), 1);
    }

    #[tokio::test]
    async fn tally_with_no_votes_is_an_empty_list() {
        let app = test_app();
        let token = admin_token();

        let (status, body) = send(&app, Method::GET, "/api/votes", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["votes"], json!([]));
    }

    #[tokio::test]
    async fn non_admin_token_is_forbidden() {
        use chrono::{Duration, Utc};
        use jsonwebtoken::{encode, EncodingKey, Header};

        let app = test_app();
        let claims = auth::Claims {
            user: UserClaims { is_admin: false },
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-token-secret".as_bytes()),
        )
        .unwrap();

        let (status, _) = send(&app, Method::GET, "/api/votes", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_issues_a_verifiable_token() {
        let app = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({ "password": "test-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, "/api/admin/verify", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["isAdmin"], true);
    }

    #[tokio::test]
    async fn wrong_password_gets_a_401_and_no_token() {
        let app = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({ "password": "nope" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn login_without_configured_password_is_a_server_error() {
        let state = Arc::new(AppState {
            config: Config {
                port: 0,
                redis_url: String::new(),
                admin_password: None,
                token_secret: None,
            },
            store: Arc::new(MemoryStore::default()),
        });
        let app = router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({ "password": "anything" })),
        )
        .await;

        // Misconfiguration must not masquerade as a wrong password.
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn settings_read_is_public_and_defaults_to_empty() {
        let app = test_app();

        let (status, body) = send(&app, Method::GET, "/api/settings", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"], json!({}));
    }

    #[tokio::test]
    async fn settings_writes_overwrite_the_whole_document() {
        let app = test_app();
        let token = admin_token();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/settings",
            Some(&token),
            Some(json!({ "showPremios": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"], json!({ "showPremios": false }));

        send(
            &app,
            Method::POST,
            "/api/settings",
            Some(&token),
            Some(json!({ "votingActive": true })),
        )
        .await;

        let (_, body) = send(&app, Method::GET, "/api/settings", None, None).await;
        assert_eq!(body["settings"], json!({ "votingActive": true }));
    }

    #[tokio::test]
    async fn unauthorized_settings_write_leaves_document_untouched() {
        let app = test_app();
        let token = admin_token();

        send(
            &app,
            Method::POST,
            "/api/settings",
            Some(&token),
            Some(json!({ "showPremios": true })),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/settings",
            None,
            Some(json!({ "showPremios": false })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, body) = send(&app, Method::GET, "/api/settings", None, None).await;
        assert_eq!(body["settings"], json!({ "showPremios": true }));
    }

    #[tokio::test]
    async fn non_object_settings_body_is_a_400() {
        let app = test_app();
        let token = admin_token();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/settings",
            Some(&token),
            Some(json!(["showPremios"])),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
