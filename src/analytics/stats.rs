use crate::domain::models::{
    Assignee, Assignment, AssignmentStatus, Employee, ServiceRequest,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Dashboard block derived from the assignment snapshot. Recomputed
/// wholesale on every snapshot change; no incremental path at this volume.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub total: usize,
    pub active: usize,
    pub overdue: usize,
    pub top_performer: Option<TopPerformer>,
    pub total_payout: Decimal,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub employee_id: Assignee,
    pub name: String,
    pub completed_jobs: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobCounters {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub completed_jobs: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Popularity {
    Low,
    Medium,
    High,
}

const POPULARITY_HIGH_THRESHOLD: u64 = 20;
const POPULARITY_MEDIUM_THRESHOLD: u64 = 10;

/// Three-tier classification of a service's request volume.
pub fn popularity(request_count: u64) -> Popularity {
    if request_count > POPULARITY_HIGH_THRESHOLD {
        Popularity::High
    } else if request_count > POPULARITY_MEDIUM_THRESHOLD {
        Popularity::Medium
    } else {
        Popularity::Low
    }
}

/// Payout share of a request's cost, rounded to cents.
pub fn payout_amount(cost: Decimal, percentage: u32) -> Decimal {
    (cost * Decimal::from(percentage) / Decimal::from(100)).round_dp(2)
}

fn is_overdue(assignment: &Assignment, now: DateTime<Utc>) -> bool {
    match assignment.deadline {
        Some(deadline) => !assignment.status.is_terminal() && deadline < now.date_naive(),
        None => false,
    }
}

pub fn assignment_stats(
    assignments: &[Assignment],
    employees: &[Employee],
    requests: &[ServiceRequest],
    now: DateTime<Utc>,
) -> AssignmentStats {
    let total = assignments.len();
    let active = assignments.iter().filter(|a| a.status.is_active()).count();
    let overdue = assignments.iter().filter(|a| is_overdue(a, now)).count();

    // Realized payout over completed assignments, using the percentage frozen
    // on each assignment rather than the employee's live default.
    let total_payout: Decimal = assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Completed)
        .filter_map(|a| {
            let request = requests.iter().find(|r| r.id == a.request_id)?;
            Some(payout_amount(request.cost, a.employee_percentage))
        })
        .sum();

    AssignmentStats {
        total,
        active,
        overdue,
        top_performer: top_performer(assignments, employees),
        total_payout,
    }
}

/// Assignee with the most completed assignments. Ties resolve to whichever
/// assignee was encountered first in snapshot order; `None` when nothing is
/// completed yet.
pub fn top_performer(
    assignments: &[Assignment],
    employees: &[Employee],
) -> Option<TopPerformer> {
    let mut tally: Vec<(Assignee, usize)> = Vec::new();
    for assignment in assignments {
        if assignment.status != AssignmentStatus::Completed {
            continue;
        }
        match tally.iter_mut().find(|(who, _)| *who == assignment.employee_id) {
            Some((_, count)) => *count += 1,
            None => tally.push((assignment.employee_id, 1)),
        }
    }

    // Strictly-greater comparison keeps the first-encountered winner on ties.
    let mut best: Option<(Assignee, usize)> = None;
    for (who, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((who, count));
        }
    }
    let (who, completed_jobs) = best?;

    let name = match who {
        Assignee::Admin => "Admin".to_string(),
        Assignee::Employee(id) => employees
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
    };

    Some(TopPerformer {
        employee_id: who,
        name,
        completed_jobs,
    })
}

pub fn job_counters(employee: &Employee, assignments: &[Assignment]) -> JobCounters {
    let mine = assignments
        .iter()
        .filter(|a| a.employee_id == Assignee::Employee(employee.id));

    let mut counters = JobCounters::default();
    for assignment in mine {
        counters.total_jobs += 1;
        if assignment.status.is_active() {
            counters.active_jobs += 1;
        }
        if assignment.status == AssignmentStatus::Completed {
            counters.completed_jobs += 1;
        }
    }
    counters
}

/// Completed share of all jobs ever assigned, as a rounded whole percent.
pub fn performance_pct(counters: JobCounters) -> u32 {
    if counters.total_jobs == 0 {
        return 0;
    }
    ((counters.completed_jobs as f64 / counters.total_jobs as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EmployeeRole, EmployeeStatus, RequestStatus, Urgency};
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn employee(name: &str, percentage: u32) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            employee_id: format!("EMP{:06}", 1),
            name: name.to_string(),
            email: format!("{name}@imarisha.local"),
            phone: "0700000000".to_string(),
            role: EmployeeRole::Technician,
            specialization: None,
            percentage,
            status: EmployeeStatus::Active,
            address: None,
            notes: None,
            created_at: Utc::now(),
            created_by: None,
            updated_at: None,
        }
    }

    fn request(cost: Decimal) -> ServiceRequest {
        ServiceRequest {
            id: Uuid::new_v4(),
            service_id: None,
            service_name: "KRA Services".to_string(),
            client_name: "Client".to_string(),
            client_email: "client@example.com".to_string(),
            client_phone: "0711000000".to_string(),
            details: None,
            cost,
            urgency: Urgency::Normal,
            status: RequestStatus::Completed,
            assigned_to: None,
            assigned_by: None,
            assigned_at: None,
            reassigned_at: None,
            deadline: None,
            created_at: Utc::now(),
            updated_at: None,
            completed_at: None,
        }
    }

    fn assignment(
        who: Assignee,
        request_id: Uuid,
        status: AssignmentStatus,
        percentage: u32,
    ) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            request_id,
            employee_id: who,
            assigned_by: Uuid::new_v4(),
            assigned_at: Utc::now(),
            status,
            priority: Urgency::Normal,
            deadline: None,
            estimated_hours: None,
            notes: String::new(),
            employee_percentage: percentage,
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
        }
    }

    #[test]
    fn test_popularity_thresholds() {
        assert_eq!(popularity(0), Popularity::Low);
        assert_eq!(popularity(10), Popularity::Low);
        assert_eq!(popularity(11), Popularity::Medium);
        assert_eq!(popularity(20), Popularity::Medium);
        assert_eq!(popularity(21), Popularity::High);
    }

    #[test]
    fn test_payout_amount_thirty_percent_of_ten_thousand() {
        assert_eq!(payout_amount(dec!(10000), 30), dec!(3000.00));
        assert_eq!(payout_amount(dec!(333), 33), dec!(109.89));
        assert_eq!(payout_amount(dec!(500), 0), dec!(0));
    }

    #[test]
    fn test_top_performer_empty_set_is_none() {
        let stats = assignment_stats(&[], &[], &[], Utc::now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.overdue, 0);
        assert!(stats.top_performer.is_none());
        assert_eq!(stats.total_payout, Decimal::ZERO);
    }

    #[test]
    fn test_top_performer_and_performance_percentages() {
        let ace = employee("Wanjiku", 30);
        let rookie = employee("Otieno", 25);
        let req = request(dec!(1000));

        let mut assignments = Vec::new();
        // Ace: 5 completed of 5.
        for _ in 0..5 {
            assignments.push(assignment(
                Assignee::Employee(ace.id),
                req.id,
                AssignmentStatus::Completed,
                30,
            ));
        }
        // Rookie: 3 completed of 10.
        for i in 0..10 {
            let status = if i < 3 {
                AssignmentStatus::Completed
            } else {
                AssignmentStatus::InProgress
            };
            assignments.push(assignment(Assignee::Employee(rookie.id), req.id, status, 25));
        }

        let employees = vec![ace.clone(), rookie.clone()];
        let top = top_performer(&assignments, &employees).unwrap();
        assert_eq!(top.employee_id, Assignee::Employee(ace.id));
        assert_eq!(top.name, "Wanjiku");
        assert_eq!(top.completed_jobs, 5);

        assert_eq!(performance_pct(job_counters(&ace, &assignments)), 100);
        assert_eq!(performance_pct(job_counters(&rookie, &assignments)), 30);
    }

    #[test]
    fn test_top_performer_tie_breaks_on_first_encountered() {
        let first = employee("First", 30);
        let second = employee("Second", 30);
        let req = request(dec!(100));

        let assignments = vec![
            assignment(Assignee::Employee(first.id), req.id, AssignmentStatus::Completed, 30),
            assignment(Assignee::Employee(second.id), req.id, AssignmentStatus::Completed, 30),
        ];

        let top = top_performer(&assignments, &[first.clone(), second]).unwrap();
        assert_eq!(top.employee_id, Assignee::Employee(first.id));
    }

    #[test]
    fn test_overdue_never_counts_terminal_assignments() {
        let who = Assignee::Admin;
        let req = request(dec!(100));
        let yesterday = (Utc::now() - Duration::days(1)).date_naive();

        let mut late_open = assignment(who, req.id, AssignmentStatus::InProgress, 0);
        late_open.deadline = Some(yesterday);
        let mut late_done = assignment(who, req.id, AssignmentStatus::Completed, 0);
        late_done.deadline = Some(yesterday);
        let mut late_cancelled = assignment(who, req.id, AssignmentStatus::Cancelled, 0);
        late_cancelled.deadline = Some(yesterday);
        let mut future = assignment(who, req.id, AssignmentStatus::Assigned, 0);
        future.deadline = Some(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap());

        let stats = assignment_stats(
            &[late_open, late_done, late_cancelled, future],
            &[],
            &[req],
            Utc::now(),
        );
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.active, 2);
    }

    #[test]
    fn test_total_payout_uses_frozen_assignment_percentage() {
        // Employee default says 40, but the assignment froze 30.
        let emp = employee("Achieng", 40);
        let req = request(dec!(10000));
        let done = assignment(
            Assignee::Employee(emp.id),
            req.id,
            AssignmentStatus::Completed,
            30,
        );

        let stats = assignment_stats(&[done], &[emp], std::slice::from_ref(&req), Utc::now());
        assert_eq!(stats.total_payout, dec!(3000.00));
    }

    #[test]
    fn test_performance_pct_zero_total_is_zero() {
        assert_eq!(performance_pct(JobCounters::default()), 0);
    }
}
