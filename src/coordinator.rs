use crate::analytics::stats::payout_amount;
use crate::domain::models::{
    ActivityKind, Assignee, Assignment, AssignmentStatus, Employee, EmployeeStatus, Payout,
    PayoutStatus, ProgressUpdate, RequestStatus, ServiceRequest, Urgency,
};
use crate::error::OpsError;
use crate::services::activity::ActivityLogger;
use crate::store::Store;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Coordinates every state transition that touches a ServiceRequest and its
/// Assignment together. The store offers no cross-collection transactions,
/// so multi-write operations run as a forward sequence with a compensating
/// revert; a compensation failure is surfaced and logged as a consistency
/// warning for manual correction.
///
/// Operations are not reentrant-safe against each other for the same record:
/// no lock is held across the awaits between writes. Adding optimistic
/// locking at the store boundary is the designated extension point.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<Store>,
    activity: ActivityLogger,
}

#[derive(Debug, Clone)]
pub struct CreateAssignment {
    pub request_id: Uuid,
    pub assignee: Assignee,
    pub priority: Urgency,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<u32>,
    pub notes: Option<String>,
    pub percentage_override: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAssignment {
    pub status: AssignmentStatus,
    pub priority: Option<Urgency>,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    pub progress_note: Option<String>,
}

impl Coordinator {
    pub fn new(store: Arc<Store>, activity: ActivityLogger) -> Self {
        Self { store, activity }
    }

    /// Assigns a pending request to an employee (or the admin). Two writes,
    /// request first; if the assignment insert then fails, the request update
    /// is compensated and the original error surfaced.
    pub async fn create(&self, actor: Uuid, input: CreateAssignment) -> Result<Uuid, OpsError> {
        let request = self.store.service_requests.get(input.request_id).await?;
        if request.assigned_to.is_some() || request.status != RequestStatus::Pending {
            return Err(OpsError::validation(
                "request is already assigned or no longer pending",
            ));
        }

        if let Some(pct) = input.percentage_override {
            if pct > 100 {
                return Err(OpsError::validation("percentage must be between 0 and 100"));
            }
        }

        // Percentage is frozen here; the admin sentinel always earns 0.
        let employee_percentage = match input.assignee {
            Assignee::Admin => 0,
            Assignee::Employee(id) => {
                let employee = self.active_employee(id).await?;
                input.percentage_override.unwrap_or(employee.percentage)
            }
        };

        let now = Utc::now();
        self.store
            .service_requests
            .update(request.id, |r| {
                r.assigned_to = Some(input.assignee);
                r.assigned_by = Some(actor);
                r.assigned_at = Some(now);
                r.status = RequestStatus::Processing;
            })
            .await?;

        let assignment = Assignment {
            id: Uuid::new_v4(),
            request_id: request.id,
            employee_id: input.assignee,
            assigned_by: actor,
            assigned_at: now,
            status: AssignmentStatus::Assigned,
            priority: input.priority,
            deadline: input.deadline,
            estimated_hours: input.estimated_hours,
            notes: input.notes.unwrap_or_default(),
            employee_percentage,
            payout_processed: false,
            payout_amount: None,
            progress_updates: Vec::new(),
            completed_at: None,
            completed_by: None,
            previous_employee_id: None,
            reassigned_at: None,
            reassigned_by: None,
            reassignment_reason: None,
            updated_at: None,
        };

        let assignment_id = match self.store.assignments.add(assignment).await {
            Ok(id) => id,
            Err(err) => {
                self.compensate_create(request.id, actor, &err).await;
                return Err(err.into());
            }
        };

        self.activity
            .record(
                ActivityKind::Assignment,
                format!("Created assignment for request {}", request.id),
                Some(actor),
            )
            .await;

        Ok(assignment_id)
    }

    async fn compensate_create(
        &self,
        request_id: Uuid,
        actor: Uuid,
        cause: &crate::store::StoreError,
    ) {
        tracing::warn!(
            "assignment create failed after request {} was updated: {}",
            request_id,
            cause
        );
        let revert = self
            .store
            .service_requests
            .update(request_id, |r| {
                r.assigned_to = None;
                r.assigned_by = None;
                r.assigned_at = None;
                r.status = RequestStatus::Pending;
            })
            .await;

        match revert {
            Ok(_) => {
                self.activity
                    .record(
                        ActivityKind::Warning,
                        format!(
                            "Assignment create failed for request {request_id}; request reverted to pending"
                        ),
                        Some(actor),
                    )
                    .await;
            }
            Err(revert_err) => {
                tracing::error!(
                    "compensation failed, request {} left marked processing without an assignment: {}",
                    request_id,
                    revert_err
                );
                self.activity
                    .record(
                        ActivityKind::Warning,
                        format!(
                            "Request {request_id} is marked processing with no assignment; manual correction needed"
                        ),
                        Some(actor),
                    )
                    .await;
            }
        }
    }

    pub async fn mark_completed(&self, actor: Uuid, assignment_id: Uuid) -> Result<(), OpsError> {
        let assignment = self.store.assignments.get(assignment_id).await?;
        if assignment.status.is_terminal() {
            return Err(OpsError::validation(
                "assignment is already completed or cancelled",
            ));
        }

        let now = Utc::now();
        self.store
            .assignments
            .update(assignment_id, |a| {
                a.status = AssignmentStatus::Completed;
                a.completed_at = Some(now);
                a.completed_by = Some(actor);
                a.updated_at = Some(now);
            })
            .await?;

        self.mirror_request_completed(assignment.request_id, now).await?;

        self.activity
            .record(
                ActivityKind::Update,
                format!("Marked assignment {assignment_id} as completed"),
                Some(actor),
            )
            .await;

        Ok(())
    }

    /// Transfers the assignment to another active employee, recording
    /// provenance. The frozen percentage is deliberately left untouched so
    /// reassignment never changes the economics quoted at assignment time.
    pub async fn reassign(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        new_employee_id: Uuid,
        reason: Option<String>,
    ) -> Result<(), OpsError> {
        let assignment = self.store.assignments.get(assignment_id).await?;
        if assignment.employee_id == Assignee::Employee(new_employee_id) {
            return Err(OpsError::validation(
                "assignment already belongs to that employee",
            ));
        }
        self.active_employee(new_employee_id).await?;

        let now = Utc::now();
        let previous = assignment.employee_id;
        self.store
            .assignments
            .update(assignment_id, |a| {
                a.employee_id = Assignee::Employee(new_employee_id);
                a.previous_employee_id = Some(previous);
                a.reassigned_at = Some(now);
                a.reassigned_by = Some(actor);
                a.reassignment_reason = reason.clone();
                a.updated_at = Some(now);
            })
            .await?;

        self.store
            .service_requests
            .update(assignment.request_id, |r| {
                r.assigned_to = Some(Assignee::Employee(new_employee_id));
                r.reassigned_at = Some(now);
            })
            .await?;

        self.activity
            .record(
                ActivityKind::Assignment,
                format!("Reassigned assignment {assignment_id}"),
                Some(actor),
            )
            .await;

        Ok(())
    }

    /// Deletes the assignment and reverts the linked request to an
    /// unassigned pending state.
    pub async fn remove(&self, actor: Uuid, assignment_id: Uuid) -> Result<(), OpsError> {
        let assignment = self.store.assignments.get(assignment_id).await?;
        self.store.assignments.delete(assignment_id).await?;

        self.store
            .service_requests
            .update(assignment.request_id, |r| {
                r.assigned_to = None;
                r.assigned_by = None;
                r.assigned_at = None;
                r.status = RequestStatus::Pending;
            })
            .await?;

        self.activity
            .record(
                ActivityKind::Delete,
                format!("Removed assignment {assignment_id}"),
                Some(actor),
            )
            .await;

        Ok(())
    }

    /// Creates the payout record for a completed assignment using the frozen
    /// per-assignment percentage, and flags the assignment so a second
    /// attempt is refused.
    pub async fn process_payout(&self, actor: Uuid, assignment_id: Uuid) -> Result<Payout, OpsError> {
        let assignment = self.store.assignments.get(assignment_id).await?;
        if assignment.status != AssignmentStatus::Completed {
            return Err(OpsError::validation(
                "only completed assignments can have payouts processed",
            ));
        }
        if assignment.payout_processed {
            return Err(OpsError::validation(
                "payout already processed for this assignment",
            ));
        }

        let request = self.store.service_requests.get(assignment.request_id).await?;
        let amount = payout_amount(request.cost, assignment.employee_percentage);

        let payout = Payout {
            id: Uuid::new_v4(),
            assignment_id,
            employee_id: assignment.employee_id,
            amount,
            percentage: assignment.employee_percentage,
            request_cost: request.cost,
            status: PayoutStatus::Pending,
            processed_by: actor,
            processed_at: Utc::now(),
        };
        self.store.payouts.add(payout.clone()).await?;

        if let Err(err) = self
            .store
            .assignments
            .update(assignment_id, |a| {
                a.payout_processed = true;
                a.payout_amount = Some(amount);
            })
            .await
        {
            tracing::warn!(
                "payout {} recorded but assignment {} flag update failed: {}",
                payout.id,
                assignment_id,
                err
            );
            self.activity
                .record(
                    ActivityKind::Warning,
                    format!(
                        "Payout recorded for assignment {assignment_id} but the processed flag was not set"
                    ),
                    Some(actor),
                )
                .await;
            return Err(err.into());
        }

        self.activity
            .record(
                ActivityKind::Update,
                format!("Processed payout of KES {amount} for assignment {assignment_id}"),
                Some(actor),
            )
            .await;

        Ok(payout)
    }

    /// FSM-validated status change plus optional field updates and an
    /// append-only progress note.
    pub async fn update_status(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        update: UpdateAssignment,
    ) -> Result<Assignment, OpsError> {
        let assignment = self.store.assignments.get(assignment_id).await?;
        if !assignment.status.can_transition(update.status) {
            return Err(OpsError::validation(format!(
                "invalid status transition {:?} -> {:?}",
                assignment.status, update.status
            )));
        }

        let now = Utc::now();
        let completing =
            update.status == AssignmentStatus::Completed && assignment.status != AssignmentStatus::Completed;

        let updated = self
            .store
            .assignments
            .update(assignment_id, |a| {
                a.status = update.status;
                if let Some(priority) = update.priority {
                    a.priority = priority;
                }
                if let Some(deadline) = update.deadline {
                    a.deadline = Some(deadline);
                }
                if let Some(notes) = update.notes.clone() {
                    a.notes = notes;
                }
                if let Some(text) = update.progress_note.clone() {
                    a.progress_updates.push(ProgressUpdate {
                        text,
                        timestamp: now,
                        updated_by: actor,
                    });
                }
                if completing {
                    a.completed_at = Some(now);
                    a.completed_by = Some(actor);
                }
                a.updated_at = Some(now);
            })
            .await?;

        if completing {
            self.mirror_request_completed(assignment.request_id, now).await?;
        }

        self.activity
            .record(
                ActivityKind::Update,
                format!("Updated assignment {assignment_id}"),
                Some(actor),
            )
            .await;

        Ok(updated)
    }

    /// Soft delete: employees are never physically removed, they transition
    /// to inactive. Refused while any of their assignments is still open.
    pub async fn deactivate_employee(&self, actor: Uuid, employee_id: Uuid) -> Result<(), OpsError> {
        let employee = self.store.employees.get(employee_id).await?;

        let open_jobs = self
            .store
            .assignments
            .all()
            .await
            .into_iter()
            .filter(|a| a.employee_id == Assignee::Employee(employee_id) && a.status.is_active())
            .count();
        if open_jobs > 0 {
            return Err(OpsError::validation(
                "cannot remove employee with active assignments; reassign or complete jobs first",
            ));
        }

        self.store
            .employees
            .update(employee_id, |e| {
                e.status = EmployeeStatus::Inactive;
                e.updated_at = Some(Utc::now());
            })
            .await?;

        self.activity
            .record(
                ActivityKind::Delete,
                format!("Removed employee: {}", employee.name),
                Some(actor),
            )
            .await;

        Ok(())
    }

    async fn active_employee(&self, id: Uuid) -> Result<Employee, OpsError> {
        let employee = self.store.employees.get(id).await?;
        if employee.status != EmployeeStatus::Active {
            return Err(OpsError::validation("employee is not active"));
        }
        Ok(employee)
    }

    async fn mirror_request_completed(
        &self,
        request_id: Uuid,
        now: chrono::DateTime<Utc>,
    ) -> Result<ServiceRequest, OpsError> {
        let mirrored = self
            .store
            .service_requests
            .update(request_id, |r| {
                r.status = RequestStatus::Completed;
                r.completed_at = Some(now);
            })
            .await?;
        Ok(mirrored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EmployeeRole, User, UserRole};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<Store>,
        coordinator: Coordinator,
        admin: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(Store::new());
        let activity = ActivityLogger::new(store.clone());
        let coordinator = Coordinator::new(store.clone(), activity);

        let admin = Uuid::new_v4();
        store
            .users
            .add(User {
                id: admin,
                email: "admin@imarisha.local".to_string(),
                name: "Administrator".to_string(),
                hash: String::new(),
                role: UserRole::Admin,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        Fixture {
            store,
            coordinator,
            admin,
        }
    }

    async fn add_employee(store: &Store, name: &str, percentage: u32) -> Uuid {
        let id = Uuid::new_v4();
        store
            .employees
            .add(Employee {
                id,
                employee_id: format!("EMP{:06}", 42),
                name: name.to_string(),
                email: format!("{name}@imarisha.local"),
                phone: "0700111222".to_string(),
                role: EmployeeRole::Technician,
                specialization: None,
                percentage,
                status: EmployeeStatus::Active,
                address: None,
                notes: None,
                created_at: Utc::now(),
                created_by: None,
                updated_at: None,
            })
            .await
            .unwrap();
        id
    }

    async fn add_pending_request(store: &Store, cost: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        store
            .service_requests
            .add(ServiceRequest {
                id,
                service_id: None,
                service_name: "KRA Services".to_string(),
                client_name: "Client".to_string(),
                client_email: "client@example.com".to_string(),
                client_phone: "0711000000".to_string(),
                details: None,
                cost,
                urgency: Urgency::Normal,
                status: RequestStatus::Pending,
                assigned_to: None,
                assigned_by: None,
                assigned_at: None,
                reassigned_at: None,
                deadline: None,
                created_at: Utc::now(),
                updated_at: None,
                completed_at: None,
            })
            .await
            .unwrap();
        id
    }

    fn create_input(request_id: Uuid, assignee: Assignee) -> CreateAssignment {
        CreateAssignment {
            request_id,
            assignee,
            priority: Urgency::Normal,
            deadline: None,
            estimated_hours: None,
            notes: None,
            percentage_override: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_and_mirrors_request() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Wanjiku", 30).await;
        let req = add_pending_request(&f.store, dec!(5000)).await;

        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();

        let assignment = f.store.assignments.get(assignment_id).await.unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Assigned);
        assert_eq!(assignment.employee_percentage, 30);

        let request = f.store.service_requests.get(req).await.unwrap();
        assert_eq!(request.status, RequestStatus::Processing);
        assert_eq!(request.assigned_to, Some(Assignee::Employee(emp)));
        assert_eq!(request.assigned_by, Some(f.admin));
    }

    #[tokio::test]
    async fn test_create_then_remove_round_trips_request() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Otieno", 25).await;
        let req = add_pending_request(&f.store, dec!(1000)).await;

        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();
        f.coordinator.remove(f.admin, assignment_id).await.unwrap();

        let request = f.store.service_requests.get(req).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.assigned_to, None);
        assert!(f.store.assignments.find(assignment_id).await.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_missing_and_already_assigned() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Achieng", 30).await;

        let missing = f
            .coordinator
            .create(f.admin, create_input(Uuid::new_v4(), Assignee::Employee(emp)))
            .await;
        assert!(matches!(missing, Err(OpsError::NotFound(_))));

        let req = add_pending_request(&f.store, dec!(500)).await;
        f.coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();
        let again = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Admin))
            .await;
        assert!(matches!(again, Err(OpsError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_inactive_employee_and_bad_override() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Mutua", 30).await;
        f.store
            .employees
            .update(emp, |e| e.status = EmployeeStatus::OnLeave)
            .await
            .unwrap();
        let req = add_pending_request(&f.store, dec!(500)).await;

        let res = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await;
        assert!(matches!(res, Err(OpsError::Validation(_))));

        let mut input = create_input(req, Assignee::Admin);
        input.percentage_override = Some(101);
        let res = f.coordinator.create(f.admin, input).await;
        assert!(matches!(res, Err(OpsError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_compensates_when_assignment_write_fails() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Njeri", 30).await;
        let req = add_pending_request(&f.store, dec!(500)).await;

        f.store.assignments.fail_next_write();
        let res = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await;
        assert!(res.is_err());

        // The forward write on the request was rolled back.
        let request = f.store.service_requests.get(req).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.assigned_to, None);
        assert_eq!(f.store.assignments.len().await, 0);
    }

    #[tokio::test]
    async fn test_percentage_override_stays_frozen() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Kamau", 30).await;
        let req = add_pending_request(&f.store, dec!(10000)).await;

        let mut input = create_input(req, Assignee::Employee(emp));
        input.percentage_override = Some(50);
        let assignment_id = f.coordinator.create(f.admin, input).await.unwrap();

        // Editing the employee's default afterwards never touches it.
        f.store
            .employees
            .update(emp, |e| e.percentage = 40)
            .await
            .unwrap();

        let assignment = f.store.assignments.get(assignment_id).await.unwrap();
        assert_eq!(assignment.employee_percentage, 50);
    }

    #[tokio::test]
    async fn test_mark_completed_mirrors_and_guards_terminal() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Wafula", 30).await;
        let req = add_pending_request(&f.store, dec!(2000)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();

        f.coordinator.mark_completed(f.admin, assignment_id).await.unwrap();

        let assignment = f.store.assignments.get(assignment_id).await.unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Completed);
        assert!(assignment.completed_at.is_some());
        let request = f.store.service_requests.get(req).await.unwrap();
        assert_eq!(request.status, RequestStatus::Completed);

        let twice = f.coordinator.mark_completed(f.admin, assignment_id).await;
        assert!(matches!(twice, Err(OpsError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reassign_keeps_frozen_percentage_and_records_provenance() {
        let f = fixture().await;
        let first = add_employee(&f.store, "Moraa", 30).await;
        let second = add_employee(&f.store, "Barasa", 45).await;
        let req = add_pending_request(&f.store, dec!(4000)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(first)))
            .await
            .unwrap();

        // Reassigning to the same employee is refused.
        let same = f
            .coordinator
            .reassign(f.admin, assignment_id, first, None)
            .await;
        assert!(matches!(same, Err(OpsError::Validation(_))));

        f.coordinator
            .reassign(f.admin, assignment_id, second, Some("workload".to_string()))
            .await
            .unwrap();

        let assignment = f.store.assignments.get(assignment_id).await.unwrap();
        assert_eq!(assignment.employee_id, Assignee::Employee(second));
        assert_eq!(assignment.previous_employee_id, Some(Assignee::Employee(first)));
        assert_eq!(assignment.reassignment_reason.as_deref(), Some("workload"));
        // Economics quoted at assignment time survive the transfer.
        assert_eq!(assignment.employee_percentage, 30);

        let request = f.store.service_requests.get(req).await.unwrap();
        assert_eq!(request.assigned_to, Some(Assignee::Employee(second)));
    }

    #[tokio::test]
    async fn test_process_payout_thirty_percent_of_ten_thousand() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Wanjiku", 30).await;
        let req = add_pending_request(&f.store, dec!(10000)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();
        f.coordinator.mark_completed(f.admin, assignment_id).await.unwrap();

        let payout = f.coordinator.process_payout(f.admin, assignment_id).await.unwrap();
        assert_eq!(payout.amount, dec!(3000.00));
        assert_eq!(payout.percentage, 30);
        assert_eq!(payout.request_cost, dec!(10000));
        assert_eq!(payout.status, PayoutStatus::Pending);

        let assignment = f.store.assignments.get(assignment_id).await.unwrap();
        assert!(assignment.payout_processed);
        assert_eq!(assignment.payout_amount, Some(dec!(3000.00)));
    }

    #[tokio::test]
    async fn test_process_payout_exactly_once() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Otieno", 25).await;
        let req = add_pending_request(&f.store, dec!(1000)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();

        // Not completed yet.
        let early = f.coordinator.process_payout(f.admin, assignment_id).await;
        assert!(matches!(early, Err(OpsError::Validation(_))));

        f.coordinator.mark_completed(f.admin, assignment_id).await.unwrap();
        f.coordinator.process_payout(f.admin, assignment_id).await.unwrap();

        let second = f.coordinator.process_payout(f.admin, assignment_id).await;
        assert!(matches!(second, Err(OpsError::Validation(_))));
        assert_eq!(f.store.payouts.len().await, 1);
    }

    #[tokio::test]
    async fn test_payout_uses_frozen_percentage_not_live_default() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Njoroge", 30).await;
        let req = add_pending_request(&f.store, dec!(10000)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();
        f.coordinator.mark_completed(f.admin, assignment_id).await.unwrap();

        // Default changes before the payout is processed.
        f.store
            .employees
            .update(emp, |e| e.percentage = 60)
            .await
            .unwrap();

        let payout = f.coordinator.process_payout(f.admin, assignment_id).await.unwrap();
        assert_eq!(payout.amount, dec!(3000.00));
        assert_eq!(payout.percentage, 30);
    }

    #[tokio::test]
    async fn test_update_status_enforces_transition_table() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Chebet", 30).await;
        let req = add_pending_request(&f.store, dec!(800)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();

        let updated = f
            .coordinator
            .update_status(
                f.admin,
                assignment_id,
                UpdateAssignment {
                    status: AssignmentStatus::InProgress,
                    progress_note: Some("started on eCitizen portal".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AssignmentStatus::InProgress);
        assert_eq!(updated.progress_updates.len(), 1);
        assert_eq!(updated.progress_updates[0].updated_by, f.admin);

        f.coordinator
            .update_status(
                f.admin,
                assignment_id,
                UpdateAssignment {
                    status: AssignmentStatus::Cancelled,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Terminal state admits nothing else.
        let out_of_terminal = f
            .coordinator
            .update_status(
                f.admin,
                assignment_id,
                UpdateAssignment {
                    status: AssignmentStatus::InProgress,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(out_of_terminal, Err(OpsError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_status_completion_mirrors_request() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Auma", 30).await;
        let req = add_pending_request(&f.store, dec!(800)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();

        f.coordinator
            .update_status(
                f.admin,
                assignment_id,
                UpdateAssignment {
                    status: AssignmentStatus::Completed,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let request = f.store.service_requests.get(req).await.unwrap();
        assert_eq!(request.status, RequestStatus::Completed);
        assert!(request.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_deactivate_employee_refused_with_open_jobs() {
        let f = fixture().await;
        let emp = add_employee(&f.store, "Kiptoo", 30).await;
        let req = add_pending_request(&f.store, dec!(1500)).await;
        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Employee(emp)))
            .await
            .unwrap();
        f.coordinator
            .update_status(
                f.admin,
                assignment_id,
                UpdateAssignment {
                    status: AssignmentStatus::InProgress,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let refused = f.coordinator.deactivate_employee(f.admin, emp).await;
        assert!(matches!(refused, Err(OpsError::Validation(_))));

        f.coordinator.mark_completed(f.admin, assignment_id).await.unwrap();
        f.coordinator.deactivate_employee(f.admin, emp).await.unwrap();

        let employee = f.store.employees.get(emp).await.unwrap();
        assert_eq!(employee.status, EmployeeStatus::Inactive);
    }

    #[tokio::test]
    async fn test_admin_assignee_earns_zero_percentage() {
        let f = fixture().await;
        let req = add_pending_request(&f.store, dec!(700)).await;

        let assignment_id = f
            .coordinator
            .create(f.admin, create_input(req, Assignee::Admin))
            .await
            .unwrap();
        let assignment = f.store.assignments.get(assignment_id).await.unwrap();
        assert_eq!(assignment.employee_percentage, 0);

        f.coordinator.mark_completed(f.admin, assignment_id).await.unwrap();
        let payout = f.coordinator.process_payout(f.admin, assignment_id).await.unwrap();
        assert_eq!(payout.amount, Decimal::ZERO);
    }
}
