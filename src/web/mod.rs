pub mod assignments;
pub mod auth;
pub mod dashboard;
pub mod employees;
pub mod requests;
pub mod services;
pub mod session;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/requests", requests::router(state.clone()))
        .nest("/admin/services", services::router(state.clone()))
        .nest("/admin/employees", employees::router(state.clone()))
        .nest("/admin/assignments", assignments::router(state.clone()))
        .nest("/admin/dashboard", dashboard::router(state))
}
