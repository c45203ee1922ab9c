use crate::domain::models::{ActivityKind, Service};
use crate::error::OpsError;
use crate::state::SharedState;
use crate::web::session::AdminSession;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/:id", get(get_service).put(update_service))
        .route("/:id/deactivate", post(deactivate_service))
        .with_state(state)
}

/// Admin view of the catalog: inactive entries included, unlike the public
/// listing.
async fn list_services(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Service>>, OpsError> {
    let mut services = state.store.services.all().await;
    services.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(services))
}

async fn get_service(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, OpsError> {
    let service = state.store.services.get(id).await?;
    Ok(Json(service))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateService {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub base_cost: Decimal,
}

async fn create_service(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<CreateService>,
) -> Result<Json<Service>, OpsError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(OpsError::validation("name is required"));
    }
    if payload.category.trim().is_empty() {
        return Err(OpsError::validation("category is required"));
    }
    if payload.base_cost < Decimal::ZERO {
        return Err(OpsError::validation("base cost cannot be negative"));
    }

    let duplicate = state
        .store
        .services
        .query(&[crate::store::eq("name", name)], None, Some(1))
        .await?;
    if !duplicate.is_empty() {
        return Err(OpsError::Conflict(format!(
            "a service named {name} already exists"
        )));
    }

    let service = Service {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: payload.category.trim().to_string(),
        description: payload.description,
        base_cost: payload.base_cost,
        active: true,
        request_count: 0,
        created_at: Utc::now(),
        created_by: Some(admin),
        updated_at: None,
    };
    state.store.services.add(service.clone()).await?;

    state
        .activity
        .record(
            ActivityKind::Service,
            format!("Added new service: {}", service.name),
            Some(admin),
        )
        .await;

    Ok(Json(service))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateService {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub base_cost: Option<Decimal>,
    pub active: Option<bool>,
}

async fn update_service(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateService>,
) -> Result<Json<Service>, OpsError> {
    if let Some(cost) = payload.base_cost {
        if cost < Decimal::ZERO {
            return Err(OpsError::validation("base cost cannot be negative"));
        }
    }
    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() {
            return Err(OpsError::validation("name cannot be empty"));
        }
    }

    let updated = state
        .store
        .services
        .update(id, |s| {
            if let Some(name) = payload.name.clone() {
                s.name = name.trim().to_string();
            }
            if let Some(category) = payload.category.clone() {
                s.category = category.trim().to_string();
            }
            if let Some(description) = payload.description.clone() {
                s.description = Some(description);
            }
            if let Some(cost) = payload.base_cost {
                s.base_cost = cost;
            }
            if let Some(active) = payload.active {
                s.active = active;
            }
            s.updated_at = Some(Utc::now());
        })
        .await?;

    state
        .activity
        .record(
            ActivityKind::Update,
            format!("Updated service: {}", updated.name),
            Some(admin),
        )
        .await;

    Ok(Json(updated))
}

/// Soft delete: the entry leaves the public catalog but stays on record, so
/// requests already taken against it keep resolving.
async fn deactivate_service(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, OpsError> {
    let updated = state
        .store
        .services
        .update(id, |s| {
            s.active = false;
            s.updated_at = Some(Utc::now());
        })
        .await?;

    state
        .activity
        .record(
            ActivityKind::Delete,
            format!("Deactivated service: {}", updated.name),
            Some(admin),
        )
        .await;

    Ok(Json(json!({ "deactivated": id })))
}
