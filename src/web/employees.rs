use crate::analytics::stats::{job_counters, performance_pct, JobCounters};
use crate::domain::models::{
    ActivityKind, Assignee, Assignment, Employee, EmployeeRole, EmployeeStatus,
};
use crate::error::OpsError;
use crate::state::SharedState;
use crate::web::session::AdminSession;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/:id", get(get_employee).put(update_employee))
        .route("/:id/deactivate", post(deactivate_employee))
        .with_state(state)
}

/// Employee row as the back office renders it: the stored document plus job
/// counters and the completion rate derived from the assignment snapshot.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeView {
    #[serde(flatten)]
    employee: Employee,
    #[serde(flatten)]
    counters: JobCounters,
    performance: u32,
}

fn view(employee: Employee, assignments: &[Assignment]) -> EmployeeView {
    let counters = job_counters(&employee, assignments);
    EmployeeView {
        employee,
        counters,
        performance: performance_pct(counters),
    }
}

async fn list_employees(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<EmployeeView>>, OpsError> {
    let employees = state.store.employees.all().await;
    let assignments = state.store.assignments.all().await;
    let views = employees
        .into_iter()
        .map(|e| view(e, &assignments))
        .collect();
    Ok(Json(views))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: EmployeeRole,
    pub specialization: Option<String>,
    pub percentage: u32,
    pub address: Option<String>,
    pub notes: Option<String>,
}

async fn create_employee(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<CreateEmployee>,
) -> Result<Json<Employee>, OpsError> {
    if payload.name.trim().is_empty() {
        return Err(OpsError::validation("name is required"));
    }
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(OpsError::validation("a valid email is required"));
    }
    let phone = payload.phone.trim();
    if phone.len() < 7 || !phone.chars().all(|c| c.is_ascii_digit() || c == '+') {
        return Err(OpsError::validation("a valid phone number is required"));
    }
    if payload.percentage > 100 {
        return Err(OpsError::validation("percentage must be between 0 and 100"));
    }

    let duplicate = state
        .store
        .employees
        .query(&[crate::store::eq("email", email.clone())], None, Some(1))
        .await?;
    if !duplicate.is_empty() {
        return Err(OpsError::Conflict(format!(
            "an employee with email {email} already exists"
        )));
    }

    let employee = Employee {
        id: Uuid::new_v4(),
        employee_id: format!("EMP{:06}", OsRng.next_u32() % 1_000_000),
        name: payload.name.trim().to_string(),
        email,
        phone: phone.to_string(),
        role: payload.role,
        specialization: payload.specialization,
        percentage: payload.percentage,
        status: EmployeeStatus::Active,
        address: payload.address,
        notes: payload.notes,
        created_at: Utc::now(),
        created_by: Some(admin),
        updated_at: None,
    };
    state.store.employees.add(employee.clone()).await?;

    state
        .activity
        .record(
            ActivityKind::Employee,
            format!("Added employee: {}", employee.name),
            Some(admin),
        )
        .await;

    Ok(Json(employee))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeDetail {
    #[serde(flatten)]
    employee: EmployeeView,
    recent_assignments: Vec<Assignment>,
}

async fn get_employee(
    AdminSession(_): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeDetail>, OpsError> {
    let employee = state.store.employees.get(id).await?;
    let assignments = state.store.assignments.all().await;

    let mut mine: Vec<Assignment> = assignments
        .iter()
        .filter(|a| a.employee_id == Assignee::Employee(id))
        .cloned()
        .collect();
    mine.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
    mine.truncate(5);

    Ok(Json(EmployeeDetail {
        employee: view(employee, &assignments),
        recent_assignments: mine,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<EmployeeRole>,
    pub specialization: Option<String>,
    pub percentage: Option<u32>,
    pub status: Option<EmployeeStatus>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Edits the stored defaults. Percentage changes apply to future assignments
/// only; anything already assigned keeps the share quoted at assignment time.
async fn update_employee(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployee>,
) -> Result<Json<Employee>, OpsError> {
    if let Some(pct) = payload.percentage {
        if pct > 100 {
            return Err(OpsError::validation("percentage must be between 0 and 100"));
        }
    }

    let updated = state
        .store
        .employees
        .update(id, |e| {
            if let Some(name) = payload.name.clone() {
                e.name = name;
            }
            if let Some(phone) = payload.phone.clone() {
                e.phone = phone;
            }
            if let Some(role) = payload.role {
                e.role = role;
            }
            if let Some(specialization) = payload.specialization.clone() {
                e.specialization = Some(specialization);
            }
            if let Some(pct) = payload.percentage {
                e.percentage = pct;
            }
            if let Some(status) = payload.status {
                e.status = status;
            }
            if let Some(address) = payload.address.clone() {
                e.address = Some(address);
            }
            if let Some(notes) = payload.notes.clone() {
                e.notes = Some(notes);
            }
            e.updated_at = Some(Utc::now());
        })
        .await?;

    state
        .activity
        .record(
            ActivityKind::Employee,
            format!("Updated employee: {}", updated.name),
            Some(admin),
        )
        .await;

    Ok(Json(updated))
}

async fn deactivate_employee(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, OpsError> {
    state.coordinator.deactivate_employee(admin, id).await?;
    Ok(Json(json!({ "deactivated": id })))
}
