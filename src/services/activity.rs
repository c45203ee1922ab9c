use crate::domain::models::{Activity, ActivityKind};
use crate::error::OpsError;
use crate::store::{OrderBy, Store};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Fire-and-forget audit feed. A failed write is logged and swallowed; the
/// activity trail must never fail the operation that produced it.
#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<Store>,
}

impl ActivityLogger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        kind: ActivityKind,
        description: impl Into<String>,
        user_id: Option<Uuid>,
    ) {
        let entry = Activity {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            user_id,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.activities.add(entry).await {
            tracing::warn!("Failed to record activity: {}", e);
        }
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<Activity>, OpsError> {
        let entries = self
            .store
            .activities
            .query(&[], Some(OrderBy::desc("timestamp")), Some(limit))
            .await?;
        Ok(entries)
    }
}
