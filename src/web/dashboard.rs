use crate::analytics::stats::{assignment_stats, popularity, AssignmentStats, Popularity};
use crate::domain::models::{
    Activity, Assignment, Employee, EmployeeStatus, Payout, RequestStatus, Service,
    ServiceRequest, User, UserRole,
};
use crate::error::OpsError;
use crate::state::SharedState;
use crate::web::session::{AdminSession, UserSession};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/overview", get(overview))
        .route("/activity", get(activity))
        .route("/payouts", get(payouts))
        .route("/export", get(export))
        .route("/me", get(me))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestCounts {
    total: usize,
    pending: usize,
    processing: usize,
    completed: usize,
    cancelled: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogSummary {
    id: Uuid,
    name: String,
    category: String,
    request_count: u64,
    popularity: Popularity,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Overview {
    requests: RequestCounts,
    /// Realized revenue: summed cost of completed requests.
    revenue: Decimal,
    active_employees: usize,
    assignments: AssignmentStats,
    catalog: Vec<CatalogSummary>,
}

async fn overview(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<Overview>, OpsError> {
    let requests = state.store.service_requests.all().await;
    let employees = state.store.employees.all().await;
    let assignments = state.store.assignments.all().await;
    let services = state.store.services.all().await;

    let count = |status: RequestStatus| requests.iter().filter(|r| r.status == status).count();
    let revenue = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
        .map(|r| r.cost)
        .sum();

    let mut catalog: Vec<CatalogSummary> = services
        .into_iter()
        .filter(|s| s.active)
        .map(|s| CatalogSummary {
            id: s.id,
            name: s.name,
            category: s.category,
            request_count: s.request_count,
            popularity: popularity(s.request_count),
        })
        .collect();
    catalog.sort_by(|a, b| b.request_count.cmp(&a.request_count));

    Ok(Json(Overview {
        requests: RequestCounts {
            total: requests.len(),
            pending: count(RequestStatus::Pending),
            processing: count(RequestStatus::Processing),
            completed: count(RequestStatus::Completed),
            cancelled: count(RequestStatus::Cancelled),
        },
        revenue,
        active_employees: employees
            .iter()
            .filter(|e| e.status == EmployeeStatus::Active)
            .count(),
        assignments: assignment_stats(
            &assignments,
            &employees,
            &requests,
            Utc::now(),
        ),
        catalog,
    }))
}

#[derive(Deserialize)]
struct ActivityParams {
    limit: Option<usize>,
}

async fn activity(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<Activity>>, OpsError> {
    let entries = state.activity.recent(params.limit.unwrap_or(50)).await?;
    Ok(Json(entries))
}

async fn payouts(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Payout>>, OpsError> {
    let mut payouts = state.store.payouts.all().await;
    payouts.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
    Ok(Json(payouts))
}

/// Account view without the credential hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserExport {
    id: Uuid,
    email: String,
    name: String,
    role: UserRole,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<User> for UserExport {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Export {
    exported_at: DateTime<Utc>,
    users: Vec<UserExport>,
    services: Vec<Service>,
    service_requests: Vec<ServiceRequest>,
    employees: Vec<Employee>,
    assignments: Vec<Assignment>,
    payouts: Vec<Payout>,
    activities: Vec<Activity>,
}

/// Full backup of every collection, credentials stripped.
async fn export(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<Export>, OpsError> {
    Ok(Json(Export {
        exported_at: Utc::now(),
        users: state
            .store
            .users
            .all()
            .await
            .into_iter()
            .map(UserExport::from)
            .collect(),
        services: state.store.services.all().await,
        service_requests: state.store.service_requests.all().await,
        employees: state.store.employees.all().await,
        assignments: state.store.assignments.all().await,
        payouts: state.store.payouts.all().await,
        activities: state.store.activities.all().await,
    }))
}

async fn me(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<UserExport>, OpsError> {
    let user = state.store.users.get(user_id).await?;
    Ok(Json(user.into()))
}
