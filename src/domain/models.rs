use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A persisted document. `COLLECTION` is the logical collection name on the
/// wire; `id` is the document key.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    fn id(&self) -> Uuid;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    Admin,
    Staff,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    #[default]
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }

    /// Valid transitions: `assigned -> in-progress | completed | cancelled`,
    /// `in-progress -> completed | cancelled`. Terminal states admit nothing,
    /// and a same-state write is always a no-op transition.
    pub fn can_transition(self, to: Self) -> bool {
        if self == to {
            return true;
        }
        match self {
            Self::Assigned => matches!(to, Self::InProgress | Self::Completed | Self::Cancelled),
            Self::InProgress => matches!(to, Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmployeeRole {
    Technician,
    Support,
    Developer,
    Manager,
    Other,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    Login,
    Request,
    Assignment,
    Employee,
    Service,
    Update,
    Delete,
    Warning,
}

/// The party responsible for an assignment: a real employee document or the
/// `admin` sentinel used when the administrator takes the job personally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignee {
    Admin,
    Employee(Uuid),
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Employee(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for Assignee {
    type Err = uuid::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "admin" {
            Ok(Self::Admin)
        } else {
            Uuid::parse_str(raw).map(Self::Employee)
        }
    }
}

impl Serialize for Assignee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Assignee {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Back-office account. Access codes are stored argon2-hashed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    fn id(&self) -> Uuid {
        self.id
    }
}

/// A catalog entry on the public site. `request_count` drives the popularity
/// classification on the dashboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_cost: Decimal,
    pub active: bool,
    #[serde(default)]
    pub request_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Service {
    const COLLECTION: &'static str = "services";
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub id: Uuid,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    pub service_name: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    #[serde(default)]
    pub details: Option<String>,
    pub cost: Decimal,
    #[serde(default)]
    pub urgency: Urgency,
    pub status: RequestStatus,
    #[serde(default)]
    pub assigned_to: Option<Assignee>,
    #[serde(default)]
    pub assigned_by: Option<Uuid>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reassigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Record for ServiceRequest {
    const COLLECTION: &'static str = "serviceRequests";
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    /// Human-readable code, e.g. `EMP493021`.
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: EmployeeRole,
    #[serde(default)]
    pub specialization: Option<String>,
    /// Share of a request's cost paid out to this employee, 0..=100.
    pub percentage: u32,
    pub status: EmployeeStatus,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Employee {
    const COLLECTION: &'static str = "employees";
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub updated_by: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub employee_id: Assignee,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub priority: Urgency,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<u32>,
    #[serde(default)]
    pub notes: String,
    /// Frozen at assignment time; later edits to the employee's default
    /// percentage never change it.
    pub employee_percentage: u32,
    #[serde(default)]
    pub payout_processed: bool,
    #[serde(default)]
    pub payout_amount: Option<Decimal>,
    #[serde(default)]
    pub progress_updates: Vec<ProgressUpdate>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_by: Option<Uuid>,
    #[serde(default)]
    pub previous_employee_id: Option<Assignee>,
    #[serde(default)]
    pub reassigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reassigned_by: Option<Uuid>,
    #[serde(default)]
    pub reassignment_reason: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Assignment {
    const COLLECTION: &'static str = "assignments";
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Immutable once created; a later change to the request cost or the
/// employee's percentage never rewrites an existing payout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub employee_id: Assignee,
    pub amount: Decimal,
    pub percentage: u32,
    pub request_cost: Decimal,
    pub status: PayoutStatus,
    pub processed_by: Uuid,
    pub processed_at: DateTime<Utc>,
}

impl Record for Payout {
    const COLLECTION: &'static str = "payouts";
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl Record for Activity {
    const COLLECTION: &'static str = "activities";
    fn id(&self) -> Uuid {
        self.id
    }
}
