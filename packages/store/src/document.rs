//! # Document store: the remote collection store seen from the client
//!
//! Everything the live stores need from the managed document database goes
//! through the [`DocumentStore`] trait, so the same store logic runs against the
//! in-memory backend ([`crate::MemoryStore`]) in tests and against a real
//! remote adapter in production.
//!
//! ## Primitives
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`subscribe`](DocumentStore::subscribe) | Opens a live feed for a [`Query`]. Every item on the feed is a full snapshot. |
//! | [`get`](DocumentStore::get) | Reads a single document. |
//! | [`create`](DocumentStore::create) | Inserts a document and returns its assigned id. |
//! | [`set`](DocumentStore::set) | Writes a document under a known id, replacing or deep-merging. |
//! | [`update`](DocumentStore::update) | Merges top-level fields into an existing document. |
//! | [`delete`](DocumentStore::delete) | Removes a document. |
//!
//! ## Feeds
//!
//! A [`Subscription`] pairs the receiving end of the snapshot feed with a
//! [`CancelHandle`]. Cancelling is idempotent; once cancelled the backend stops
//! delivering and the receiver sees the end of the stream.
//!
//! ## Schema boundary
//!
//! Documents arrive as loosely typed JSON maps ([`Fields`]). [`decode`] turns one
//! into a typed entity and reports a [`StoreError::Schema`] on any mismatch;
//! [`to_fields`] goes the other way for writes.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use crate::error::StoreError;

/// Loosely typed document body.
pub type Fields = Map<String, Value>;

/// A document as stored remotely: its key plus its body.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// One push of a live feed: the complete result set, or the reason it failed.
pub type Snapshot = Result<Vec<Document>, StoreError>;

/// Equality filter on a top-level field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// What a feed watches.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    Collection {
        collection: String,
        filter: Option<FieldFilter>,
        order: Option<OrderBy>,
    },
    Document {
        collection: String,
        id: String,
    },
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Query::Collection {
            collection: collection.into(),
            filter: None,
            order: None,
        }
    }

    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Query::Document {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Keep only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Query::Collection { filter, .. } = &mut self {
            *filter = Some(FieldFilter {
                field: field.into(),
                value: value.into(),
            });
        }
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        if let Query::Collection { order, .. } = &mut self {
            *order = Some(OrderBy {
                field: field.into(),
                descending,
            });
        }
        self
    }

    pub fn collection_name(&self) -> &str {
        match self {
            Query::Collection { collection, .. } | Query::Document { collection, .. } => collection,
        }
    }

    /// Reject queries no backend could run.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.collection_name().is_empty() {
            return Err(StoreError::InvalidQuery("empty collection name".into()));
        }
        match self {
            Query::Collection { filter, order, .. } => {
                if filter.as_ref().is_some_and(|f| f.field.is_empty()) {
                    return Err(StoreError::InvalidQuery("empty filter field".into()));
                }
                if order.as_ref().is_some_and(|o| o.field.is_empty()) {
                    return Err(StoreError::InvalidQuery("empty sort field".into()));
                }
            }
            Query::Document { id, .. } => {
                if id.is_empty() {
                    return Err(StoreError::InvalidQuery("empty document id".into()));
                }
            }
        }
        Ok(())
    }
}

/// How [`DocumentStore::set`] treats an existing document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetMode {
    Replace,
    Merge,
}

/// Idempotent cancellation signal shared between a feed and its owner.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Stop the feed. Safe to call any number of times.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// A live feed: snapshots in, cancellation out.
#[derive(Debug)]
pub struct Subscription {
    pub snapshots: mpsc::UnboundedReceiver<Snapshot>,
    pub cancel: CancelHandle,
}

impl Subscription {
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<Snapshot>, CancelHandle) {
        (self.snapshots, self.cancel)
    }
}

/// Async interface to a remote document-collection store.
pub trait DocumentStore: Send + Sync + 'static {
    fn subscribe(
        &self,
        query: Query,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;
    fn create(
        &self,
        collection: &str,
        data: Fields,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
    fn set(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        mode: SetMode,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Serialize an entity or patch into a document body.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Decode a pushed document into its typed entity.
pub fn decode<T: DeserializeOwned>(collection: &str, doc: &Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc.data.clone())).map_err(|e| StoreError::Schema {
        collection: collection.to_string(),
        id: doc.id.clone(),
        reason: e.to_string(),
    })
}
