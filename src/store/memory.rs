use super::{Filter, OrderBy, StoreError};
use crate::domain::models::Record;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// An immutable, insertion-ordered view of a whole collection, swapped in
/// wholesale after every mutation so readers never see a half-applied write.
pub type Snapshot<T> = Arc<[T]>;

/// In-memory stand-in for one remote document collection. Linear scans are
/// deliberate: the system holds hundreds of records, not millions.
pub struct Collection<T: Record> {
    docs: RwLock<Vec<T>>,
    publisher: watch::Sender<Snapshot<T>>,
    #[cfg(test)]
    fail_next_write: std::sync::atomic::AtomicBool,
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(Snapshot::from(Vec::new()));
        Self {
            docs: RwLock::new(Vec::new()),
            publisher,
            #[cfg(test)]
            fail_next_write: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Live subscription delivering the full snapshot on every change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.publisher.subscribe()
    }

    pub async fn get(&self, id: Uuid) -> Result<T, StoreError> {
        self.find(id).await.ok_or(StoreError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })
    }

    pub async fn find(&self, id: Uuid) -> Option<T> {
        self.docs.read().await.iter().find(|d| d.id() == id).cloned()
    }

    pub async fn all(&self) -> Vec<T> {
        self.docs.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// Field-equality query with optional ordering and limit, matching the
    /// remote store's query surface.
    pub async fn query(
        &self,
        filters: &[Filter],
        order: Option<OrderBy>,
        limit: Option<usize>,
    ) -> Result<Vec<T>, StoreError> {
        let docs = self.docs.read().await;
        let mut hits = Vec::new();
        for doc in docs.iter() {
            let value = encode::<T>(doc)?;
            if filters
                .iter()
                .all(|f| field_of(&value, f.field) == &f.value)
            {
                hits.push((value, doc.clone()));
            }
        }
        drop(docs);

        if let Some(order) = order {
            hits.sort_by(|(a, _), (b, _)| {
                let ord = compare_values(field_of(a, order.field), field_of(b, order.field));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let mut out: Vec<T> = hits.into_iter().map(|(_, doc)| doc).collect();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    pub async fn add(&self, record: T) -> Result<Uuid, StoreError> {
        self.check_poisoned()?;
        let id = record.id();
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| d.id() == id) {
            return Err(StoreError::Rejected {
                collection: T::COLLECTION,
            });
        }
        docs.push(record);
        self.publish(&docs);
        Ok(id)
    }

    /// Partial update: the closure patches the document in place. The patched
    /// document is returned.
    pub async fn update(&self, id: Uuid, patch: impl FnOnce(&mut T)) -> Result<T, StoreError> {
        self.check_poisoned()?;
        let mut docs = self.docs.write().await;
        let slot = docs
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or(StoreError::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            })?;
        patch(slot);
        let updated = slot.clone();
        self.publish(&docs);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_poisoned()?;
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| d.id() != id);
        if docs.len() == before {
            return Err(StoreError::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            });
        }
        self.publish(&docs);
        Ok(())
    }

    fn publish(&self, docs: &[T]) {
        // send_replace so publishing works with zero live subscribers.
        self.publisher.send_replace(Snapshot::from(docs.to_vec()));
    }

    #[cfg(test)]
    pub(crate) fn fail_next_write(&self) {
        self.fail_next_write
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_poisoned(&self) -> Result<(), StoreError> {
        if self
            .fail_next_write
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StoreError::Rejected {
                collection: T::COLLECTION,
            });
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_poisoned(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn encode<T: Record>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(|e| StoreError::Encode {
        collection: T::COLLECTION,
        message: e.to_string(),
    })
}

fn field_of<'a>(value: &'a Value, field: &str) -> &'a Value {
    value.get(field).unwrap_or(&Value::Null)
}

/// Total order over the JSON scalar types the records use. Timestamps are
/// RFC 3339 strings, so lexicographic string order is chronological order.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Activity, ActivityKind};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn entry(desc: &str, age_minutes: i64) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            kind: ActivityKind::Update,
            description: desc.to_string(),
            user_id: None,
            timestamp: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_add_get_delete() {
        let coll: Collection<Activity> = Collection::new();
        let a = entry("first", 0);
        let id = coll.add(a.clone()).await.unwrap();
        assert_eq!(id, a.id);

        let got = coll.get(id).await.unwrap();
        assert_eq!(got.description, "first");

        // Duplicate ids are refused.
        assert!(coll.add(a).await.is_err());

        coll.delete(id).await.unwrap();
        assert!(coll.get(id).await.is_err());
        assert!(coll.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn test_update_patches_in_place() {
        let coll: Collection<Activity> = Collection::new();
        let id = coll.add(entry("before", 0)).await.unwrap();

        let updated = coll
            .update(id, |a| a.description = "after".to_string())
            .await
            .unwrap();
        assert_eq!(updated.description, "after");
        assert_eq!(coll.get(id).await.unwrap().description, "after");

        let missing = Uuid::new_v4();
        assert!(coll.update(missing, |_| {}).await.is_err());
    }

    #[tokio::test]
    async fn test_query_equality_order_limit() {
        let coll: Collection<Activity> = Collection::new();
        coll.add(entry("oldest", 30)).await.unwrap();
        coll.add(entry("middle", 20)).await.unwrap();
        coll.add(entry("newest", 10)).await.unwrap();

        let all = coll
            .query(&[], Some(OrderBy::desc("timestamp")), None)
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(names, ["newest", "middle", "oldest"]);

        let limited = coll
            .query(&[], Some(OrderBy::desc("timestamp")), Some(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let hits = coll
            .query(&[super::super::eq("description", json!("middle"))], None, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "middle");

        let none = coll
            .query(&[super::super::eq("description", json!("nope"))], None, None)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_sees_atomic_snapshots() {
        let coll: Collection<Activity> = Collection::new();
        let mut rx = coll.subscribe();
        assert!(rx.borrow().is_empty());

        coll.add(entry("one", 0)).await.unwrap();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.len(), 1);

        coll.add(entry("two", 0)).await.unwrap();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.len(), 2);

        // The first snapshot is untouched by the later publish.
        assert_eq!(snap[0].description, "one");
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let coll: Collection<Activity> = Collection::new();
        coll.fail_next_write();
        assert!(coll.add(entry("doomed", 0)).await.is_err());
        // The failure is one-shot.
        assert!(coll.add(entry("fine", 0)).await.is_ok());
    }
}
