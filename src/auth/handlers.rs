use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, CredentialsRequest, PublicUser},
        extractors::AuthUser,
        services,
    },
    error::{AppError, AppResult, INVALID_TOKEN},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

/// Unwraps a JSON body, turning syntax and content-type errors into a 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AppError::Validation("Invalid request body.".into())
    })
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let res = services::signup(state.users.as_ref(), &state.keys, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let res = services::login(state.users.as_ref(), &state.keys, json_body(body)?).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    // a valid token may outlive its user
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token for unknown user");
        AppError::Unauthorized(INVALID_TOKEN)
    })?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use tower::ServiceExt;

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn app() -> Router {
        crate::app::build_app(AppState::in_memory(crate::config::AppConfig::for_tests()))
    }

    #[tokio::test]
    async fn signup_returns_created_user_and_token() {
        let (status, body) = call(
            app(),
            post_json("/auth/signup", serde_json::json!({"email": "a@x.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"]["id"].is_string());
        assert!(body["user"]["createdAt"].is_string());
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn signup_does_not_judge_email_shape() {
        let (status, body) = call(
            app(),
            post_json("/auth/signup", serde_json::json!({"email": "admin@localhost", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "admin@localhost");
    }

    #[tokio::test]
    async fn signup_conflict_and_validation_statuses() {
        let app = app();
        let creds = serde_json::json!({"email": "a@x.com", "password": "pw"});
        let (status, _) = call(app.clone(), post_json("/auth/signup", creds.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(app.clone(), post_json("/auth/signup", creds)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email is already in use.");

        let (status, body) =
            call(app.clone(), post_json("/auth/signup", serde_json::json!({"email": "b@x.com"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email and password are required.");

        let req = Request::post("/auth/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request body.");
    }

    #[tokio::test]
    async fn login_wrong_password_is_generic_401() {
        let app = app();
        call(
            app.clone(),
            post_json("/auth/signup", serde_json::json!({"email": "a@x.com", "password": "right"})),
        )
        .await;

        let (status, body) = call(
            app.clone(),
            post_json("/auth/login", serde_json::json!({"email": "a@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({"message": "Invalid email or password."}));

        let (status, unknown) = call(
            app.clone(),
            post_json("/auth/login", serde_json::json!({"email": "z@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, body);

        let (status, ok) = call(
            app,
            post_json("/auth/login", serde_json::json!({"email": "a@x.com", "password": "right"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(ok["token"].is_string());
    }

    #[tokio::test]
    async fn me_requires_token() {
        let app = app();
        let (_, signed_up) = call(
            app.clone(),
            post_json("/auth/signup", serde_json::json!({"email": "a@x.com", "password": "pw"})),
        )
        .await;
        let token = signed_up["token"].as_str().unwrap();

        let (status, body) =
            call(app.clone(), Request::get("/auth/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], INVALID_TOKEN);

        let req = Request::get("/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, me) = call(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], signed_up["user"]["id"]);
    }
}
