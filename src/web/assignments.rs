use crate::analytics::stats::{assignment_stats, AssignmentStats};
use crate::coordinator::{CreateAssignment, UpdateAssignment};
use crate::domain::models::{Assignee, Assignment, AssignmentStatus, Payout, Urgency};
use crate::error::OpsError;
use crate::state::SharedState;
use crate::web::session::AdminSession;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route("/stats", get(stats))
        .route("/:id", get(get_assignment).delete(remove_assignment))
        .route("/:id/status", post(update_status))
        .route("/:id/complete", post(complete))
        .route("/:id/reassign", post(reassign))
        .route("/:id/payout", post(payout))
        .with_state(state)
}

/// Assignment row joined with the display fields the board needs, resolved
/// from the request and employee snapshots.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentView {
    #[serde(flatten)]
    assignment: Assignment,
    employee_name: String,
    service_name: Option<String>,
    client_name: Option<String>,
}

async fn list_assignments(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<AssignmentView>>, OpsError> {
    let mut assignments = state.store.assignments.all().await;
    let employees = state.store.employees.all().await;
    let requests = state.store.service_requests.all().await;

    assignments.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));

    let views = assignments
        .into_iter()
        .map(|assignment| {
            let employee_name = match assignment.employee_id {
                Assignee::Admin => "Admin".to_string(),
                Assignee::Employee(id) => employees
                    .iter()
                    .find(|e| e.id == id)
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
            };
            let request = requests.iter().find(|r| r.id == assignment.request_id);
            AssignmentView {
                employee_name,
                service_name: request.map(|r| r.service_name.clone()),
                client_name: request.map(|r| r.client_name.clone()),
                assignment,
            }
        })
        .collect();
    Ok(Json(views))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub request_id: Uuid,
    pub assignee: Assignee,
    #[serde(default)]
    pub priority: Urgency,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<u32>,
    pub notes: Option<String>,
    pub percentage_override: Option<u32>,
}

async fn create_assignment(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<CreateBody>,
) -> Result<Json<Assignment>, OpsError> {
    let id = state
        .coordinator
        .create(
            admin,
            CreateAssignment {
                request_id: payload.request_id,
                assignee: payload.assignee,
                priority: payload.priority,
                deadline: payload.deadline,
                estimated_hours: payload.estimated_hours,
                notes: payload.notes,
                percentage_override: payload.percentage_override,
            },
        )
        .await?;
    let assignment = state.store.assignments.get(id).await?;
    Ok(Json(assignment))
}

async fn stats(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<AssignmentStats>, OpsError> {
    let assignments = state.store.assignments.all().await;
    let employees = state.store.employees.all().await;
    let requests = state.store.service_requests.all().await;
    Ok(Json(assignment_stats(
        &assignments,
        &employees,
        &requests,
        Utc::now(),
    )))
}

async fn get_assignment(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, OpsError> {
    let assignment = state.store.assignments.get(id).await?;
    Ok(Json(assignment))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: AssignmentStatus,
    pub priority: Option<Urgency>,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    pub progress_note: Option<String>,
}

async fn update_status(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusBody>,
) -> Result<Json<Assignment>, OpsError> {
    let updated = state
        .coordinator
        .update_status(
            admin,
            id,
            UpdateAssignment {
                status: payload.status,
                priority: payload.priority,
                deadline: payload.deadline,
                notes: payload.notes,
                progress_note: payload.progress_note,
            },
        )
        .await?;
    Ok(Json(updated))
}

async fn complete(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, OpsError> {
    state.coordinator.mark_completed(admin, id).await?;
    let assignment = state.store.assignments.get(id).await?;
    Ok(Json(assignment))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignBody {
    pub employee_id: Uuid,
    pub reason: Option<String>,
}

async fn reassign(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignBody>,
) -> Result<Json<Assignment>, OpsError> {
    state
        .coordinator
        .reassign(admin, id, payload.employee_id, payload.reason)
        .await?;
    let assignment = state.store.assignments.get(id).await?;
    Ok(Json(assignment))
}

async fn payout(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payout>, OpsError> {
    let payout = state.coordinator.process_payout(admin, id).await?;
    Ok(Json(payout))
}

async fn remove_assignment(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, OpsError> {
    state.coordinator.remove(admin, id).await?;
    Ok(Json(json!({ "removed": id })))
}
