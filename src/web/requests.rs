use crate::analytics::stats::{popularity, Popularity};
use crate::coordinator::CreateAssignment;
use crate::domain::models::{
    ActivityKind, Assignee, RequestStatus, Service, ServiceRequest, Urgency,
};
use crate::error::OpsError;
use crate::state::SharedState;
use crate::store::{eq, OrderBy};
use crate::web::session::AdminSession;
use axum::{
    extract::{ConnectInfo, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // Public surface: browse the catalog, submit a request.
        .route("/services", get(list_services))
        .route("/", post(submit_request).get(list_requests))
        .route(
            "/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/:id/assign", post(assign_request))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogItem {
    #[serde(flatten)]
    service: Service,
    popularity: Popularity,
}

async fn list_services(
    State(state): State<SharedState>,
) -> Result<Json<Vec<CatalogItem>>, OpsError> {
    let services = state
        .store
        .services
        .query(&[eq("active", true)], Some(OrderBy::asc("name")), None)
        .await?;
    let catalog = services
        .into_iter()
        .map(|service| CatalogItem {
            popularity: popularity(service.request_count),
            service,
        })
        .collect();
    Ok(Json(catalog))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub service_id: Option<Uuid>,
    pub service_name: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub details: Option<String>,
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub urgency: Urgency,
    pub deadline: Option<NaiveDate>,
}

/// Public intake, throttled per client IP. The request lands pending and
/// unassigned; the catalog counter bump is best-effort and never fails the
/// submission.
async fn submit_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<ServiceRequest>, OpsError> {
    let ip = addr.ip().to_string();
    if !state.submit_limiter.check(&ip).await {
        tracing::warn!("Submission rate limit exceeded for IP: {}", ip);
        return Err(OpsError::RateLimited);
    }

    if payload.client_name.trim().is_empty() || payload.client_phone.trim().is_empty() {
        return Err(OpsError::validation("client name and phone are required"));
    }
    if payload.service_name.trim().is_empty() {
        return Err(OpsError::validation("service name is required"));
    }

    let service = match payload.service_id {
        Some(id) => state.store.services.find(id).await,
        None => None,
    };
    let cost = payload
        .cost
        .or_else(|| service.as_ref().map(|s| s.base_cost))
        .unwrap_or(Decimal::ZERO);
    if cost < Decimal::ZERO {
        return Err(OpsError::validation("cost cannot be negative"));
    }

    let request = ServiceRequest {
        id: Uuid::new_v4(),
        service_id: payload.service_id,
        service_name: payload.service_name.trim().to_string(),
        client_name: payload.client_name.trim().to_string(),
        client_email: payload.client_email.trim().to_lowercase(),
        client_phone: payload.client_phone.trim().to_string(),
        details: payload.details,
        cost,
        urgency: payload.urgency,
        status: RequestStatus::Pending,
        assigned_to: None,
        assigned_by: None,
        assigned_at: None,
        reassigned_at: None,
        deadline: payload.deadline,
        created_at: Utc::now(),
        updated_at: None,
        completed_at: None,
    };
    state.store.service_requests.add(request.clone()).await?;

    if let Some(service) = service {
        let bump = state
            .store
            .services
            .update(service.id, |s| s.request_count += 1)
            .await;
        if let Err(e) = bump {
            tracing::warn!("Failed to bump request count for {}: {}", service.name, e);
        }
    }

    state
        .activity
        .record(
            ActivityKind::Request,
            format!(
                "New request from {} for {}",
                request.client_name, request.service_name
            ),
            None,
        )
        .await;

    Ok(Json(request))
}

#[derive(Deserialize)]
struct ListParams {
    status: Option<RequestStatus>,
    limit: Option<usize>,
}

async fn list_requests(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ServiceRequest>>, OpsError> {
    let filters = match params.status {
        Some(status) => vec![eq("status", serde_json::to_value(status).unwrap_or(Value::Null))],
        None => Vec::new(),
    };
    let requests = state
        .store
        .service_requests
        .query(&filters, Some(OrderBy::desc("createdAt")), params.limit)
        .await?;
    Ok(Json(requests))
}

async fn get_request(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceRequest>, OpsError> {
    let request = state.store.service_requests.get(id).await?;
    Ok(Json(request))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub status: Option<RequestStatus>,
    pub cost: Option<Decimal>,
    pub urgency: Option<Urgency>,
    pub deadline: Option<NaiveDate>,
    pub note: Option<String>,
}

async fn update_request(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<ServiceRequest>, OpsError> {
    if let Some(cost) = payload.cost {
        if cost < Decimal::ZERO {
            return Err(OpsError::validation("cost cannot be negative"));
        }
    }

    let now = Utc::now();
    let updated = state
        .store
        .service_requests
        .update(id, |r| {
            if let Some(status) = payload.status {
                r.status = status;
                if status == RequestStatus::Completed && r.completed_at.is_none() {
                    r.completed_at = Some(now);
                }
            }
            if let Some(cost) = payload.cost {
                r.cost = cost;
            }
            if let Some(urgency) = payload.urgency {
                r.urgency = urgency;
            }
            if let Some(deadline) = payload.deadline {
                r.deadline = Some(deadline);
            }
            if let Some(note) = payload.note.as_deref() {
                // Notes accumulate in the free-text details field.
                r.details = Some(match r.details.take() {
                    Some(existing) => format!("{existing}\n{note}"),
                    None => note.to_string(),
                });
            }
            r.updated_at = Some(now);
        })
        .await?;

    state
        .activity
        .record(
            ActivityKind::Update,
            format!("Updated request {id}"),
            Some(admin),
        )
        .await;

    Ok(Json(updated))
}

async fn delete_request(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, OpsError> {
    state.store.service_requests.delete(id).await?;
    state
        .activity
        .record(
            ActivityKind::Delete,
            format!("Deleted request {id}"),
            Some(admin),
        )
        .await;
    Ok(Json(json!({ "deleted": id })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub assignee: Assignee,
    #[serde(default)]
    pub priority: Urgency,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<u32>,
    pub notes: Option<String>,
    pub percentage_override: Option<u32>,
}

async fn assign_request(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignBody>,
) -> Result<Json<Value>, OpsError> {
    let assignment_id = state
        .coordinator
        .create(
            admin,
            CreateAssignment {
                request_id: id,
                assignee: payload.assignee,
                priority: payload.priority,
                deadline: payload.deadline,
                estimated_hours: payload.estimated_hours,
                notes: payload.notes,
                percentage_override: payload.percentage_override,
            },
        )
        .await?;
    Ok(Json(json!({ "assignmentId": assignment_id })))
}
