use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::document::{
    CancelHandle, Document, DocumentStore, Fields, Query, SetMode, Snapshot, Subscription,
};
use crate::error::StoreError;

/// In-memory DocumentStore for tests, demos and offline use.
///
/// Every mutation re-pushes a fresh snapshot to each live feed watching the
/// touched collection, the way a managed real-time database would.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    listeners: Vec<Listener>,
    fault: Option<StoreError>,
}

#[derive(Debug)]
struct Listener {
    query: Query,
    tx: mpsc::UnboundedSender<Snapshot>,
    cancel: CancelHandle,
}

impl Listener {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `fault` until reset with `None`.
    pub fn fail_with(&self, fault: Option<StoreError>) {
        self.inner.lock().fault = fault;
    }

    /// Push `err` to every live feed, as if the backend dropped them.
    pub fn break_feeds(&self, err: StoreError) {
        let mut inner = self.inner.lock();
        inner.prune();
        for listener in &inner.listeners {
            let _ = listener.tx.send(Err(err.clone()));
        }
    }

    /// Number of feeds that are still delivering.
    pub fn active_feeds(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.prune();
        inner.listeners.len()
    }

    /// Number of documents stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Inner {
    fn check(&self) -> Result<(), StoreError> {
        match &self.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn prune(&mut self) {
        self.listeners.retain(Listener::is_live);
    }

    fn run(&self, query: &Query) -> Vec<Document> {
        match query {
            Query::Document { collection, id } => self
                .collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .map(|data| vec![Document::new(id.clone(), data.clone())])
                .unwrap_or_default(),
            Query::Collection {
                collection,
                filter,
                order,
            } => {
                let Some(docs) = self.collections.get(collection) else {
                    return Vec::new();
                };
                let mut matches: Vec<Document> = docs
                    .iter()
                    .filter(|(_, data)| match filter {
                        Some(filter) => data.get(&filter.field) == Some(&filter.value),
                        None => true,
                    })
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect();
                if let Some(order) = order {
                    matches.sort_by(|a, b| {
                        let ord = compare(a.data.get(&order.field), b.data.get(&order.field));
                        if order.descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    });
                }
                matches
            }
        }
    }

    /// Re-push every feed that watches `collection`.
    fn notify(&mut self, collection: &str) {
        self.prune();
        for listener in &self.listeners {
            if listener.query.collection_name() == collection {
                let _ = listener.tx.send(Ok(self.run(&listener.query)));
            }
        }
    }

    fn docs_mut(&mut self, collection: &str) -> &mut BTreeMap<String, Fields> {
        self.collections.entry(collection.to_string()).or_default()
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Merge `patch` into `target`, descending into nested objects.
fn deep_merge(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        match value {
            Value::Object(nested) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge(existing, nested),
                _ => {
                    target.insert(key, Value::Object(nested));
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        query.validate()?;
        let mut inner = self.inner.lock();
        inner.check()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelHandle::new();
        let _ = tx.send(Ok(inner.run(&query)));
        inner.prune();
        inner.listeners.push(Listener {
            query,
            tx,
            cancel: cancel.clone(),
        });
        Ok(Subscription {
            snapshots: rx,
            cancel,
        })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.lock();
        inner.check()?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn create(&self, collection: &str, data: Fields) -> Result<String, StoreError> {
        let mut inner = self.inner.lock();
        inner.check()?;
        let id = uuid::Uuid::new_v4().to_string();
        inner.docs_mut(collection).insert(id.clone(), data);
        inner.notify(collection);
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        mode: SetMode,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check()?;
        let docs = inner.docs_mut(collection);
        match docs.get_mut(id) {
            Some(existing) if mode == SetMode::Merge => deep_merge(existing, data),
            _ => {
                docs.insert(id.to_string(), data);
            }
        }
        inner.notify(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check()?;
        let Some(existing) = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };
        existing.extend(patch);
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check()?;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        inner.notify(collection);
        Ok(())
    }
}
