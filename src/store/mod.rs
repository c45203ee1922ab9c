pub mod memory;
pub mod seed;

use crate::domain::models::{
    Activity, Assignment, Employee, Payout, Service, ServiceRequest, User,
};
use serde_json::Value;
use thiserror::Error;

pub use memory::{Collection, Snapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id} does not exist")]
    NotFound { collection: &'static str, id: String },

    #[error("write to {collection} rejected")]
    Rejected { collection: &'static str },

    #[error("encode failure in {collection}: {message}")]
    Encode {
        collection: &'static str,
        message: String,
    },
}

/// Equality predicate against a wire-named field, the only filter shape the
/// remote store supports.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: &'static str,
    pub value: Value,
}

pub fn eq(field: &'static str, value: impl Into<Value>) -> Filter {
    Filter {
        field,
        value: value.into(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderBy {
    pub field: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// The seven logical collections of the system, each a typed handle onto the
/// document store. The adapter contract (get / query / subscribe / add /
/// update / delete, no cross-collection atomicity) is what the coordinator
/// and the aggregator program against.
pub struct Store {
    pub users: Collection<User>,
    pub services: Collection<Service>,
    pub service_requests: Collection<ServiceRequest>,
    pub employees: Collection<Employee>,
    pub assignments: Collection<Assignment>,
    pub payouts: Collection<Payout>,
    pub activities: Collection<Activity>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            users: Collection::new(),
            services: Collection::new(),
            service_requests: Collection::new(),
            employees: Collection::new(),
            assignments: Collection::new(),
            payouts: Collection::new(),
            activities: Collection::new(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
