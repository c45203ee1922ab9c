use crate::domain::models::{ActivityKind, UserRole};
use crate::state::SharedState;
use crate::web::session;
use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: UserRole,
    pub name: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state)
}

async fn login(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.check(&ip).await {
        tracing::warn!("Login rate limit exceeded for IP: {}", ip);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let email = payload.email.trim().to_lowercase();
    let user = state
        .store
        .users
        .query(&[crate::store::eq("email", email)], None, Some(1))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .next()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !user.is_active {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let parsed_hash = PasswordHash::new(&user.hash).map_err(|_| StatusCode::UNAUTHORIZED)?;
    Argon2::default()
        .verify_password(payload.code.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = session::sign_session(user.id, &user.role, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    state
        .activity
        .record(
            ActivityKind::Login,
            format!("{} logged in", user.name),
            Some(user.id),
        )
        .await;

    let resp = LoginResponse {
        user_id: user.id,
        role: user.role,
        name: user.name,
    };

    // SECURITY: Use Secure flag in production (HTTPS only)
    let secure_flag = if std::env::var("PRODUCTION").is_ok() {
        "; Secure"
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        format!("session={token}; HttpOnly; SameSite=Lax; Path=/{secure_flag}")
            .parse()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );
    Ok((headers, Json(resp)))
}

async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
            .parse()
            .unwrap_or_else(|_| axum::http::HeaderValue::from_static("")),
    );
    (headers, StatusCode::NO_CONTENT)
}
