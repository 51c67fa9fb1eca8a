//! Prospect store: a live mirror of the signed-in user's prospects.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::config::StoreConfig;
use crate::document::{decode, to_fields, Document, DocumentStore, Query};
use crate::error::StoreError;
use crate::live::{LiveCollection, LiveView};
use crate::models::{current_timestamp, Identity, NewProspect, Prospect, ProspectPatch, ProspectStatus};
use crate::session::Lifecycle;
use crate::validate;

pub struct ProspectStore<S: DocumentStore> {
    store: S,
    collection: String,
    live: Arc<LiveCollection<Prospect>>,
}

impl<S: DocumentStore> ProspectStore<S> {
    pub fn new(store: S, config: &StoreConfig) -> Self {
        Self {
            store,
            collection: config.collections.prospects.clone(),
            live: Arc::new(LiveCollection::new("prospects")),
        }
    }

    pub fn view(&self) -> LiveView<Prospect> {
        self.live.view()
    }

    pub fn prospects(&self) -> Vec<Prospect> {
        self.live.view().items
    }

    pub fn find(&self, id: &str) -> Option<Prospect> {
        self.live.view().items.into_iter().find(|p| p.id == id)
    }

    /// Prospect counts per pipeline stage, zero-filled.
    pub fn count_by_status(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<&'static str, usize> =
            ProspectStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for prospect in self.live.view().items {
            *counts.entry(prospect.status.as_str()).or_default() += 1;
        }
        counts
    }

    pub fn changes(&self) -> watch::Receiver<LiveView<Prospect>> {
        self.live.changes()
    }

    /// Start mirroring the prospects owned by `owner_id`, replacing any previous feed.
    pub async fn initialize(&self, owner_id: &str) -> Result<(), StoreError> {
        let query = Query::collection(&self.collection).where_eq("userId", owner_id);
        let collection = self.collection.clone();
        self.live
            .open(&self.store, owner_id, query, move |docs| decode_all(&collection, docs))
            .await
    }

    pub fn clear(&self) {
        self.live.clear();
    }

    /// Create a prospect and return its id. The mirror picks it up from the next push.
    pub async fn add(&self, prospect: NewProspect) -> Result<String, StoreError> {
        validate::new_prospect(&prospect)?;
        let fields = to_fields(&prospect.into_prospect(current_timestamp()))?;
        self.live
            .track("add", self.store.create(&self.collection, fields).await)
    }

    /// Merge the supplied fields into an existing prospect.
    pub async fn update(&self, id: &str, patch: ProspectPatch) -> Result<(), StoreError> {
        validate::prospect_patch(&patch)?;
        let mut fields = to_fields(&patch)?;
        fields.insert("updatedAt".to_string(), Value::from(current_timestamp()));
        self.live
            .track("update", self.store.update(&self.collection, id, fields).await)
    }

    /// Remove a prospect. Deleting an unknown id succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.store.delete(&self.collection, id).await {
            Err(err) if err.is_not_found() => {
                debug!(id, "prospect already gone");
                Ok(())
            }
            result => self.live.track("delete", result),
        }
    }
}

fn decode_all(collection: &str, docs: Vec<Document>) -> Result<Vec<Prospect>, StoreError> {
    docs.iter()
        .map(|doc| {
            let mut prospect: Prospect = decode(collection, doc)?;
            prospect.id = doc.id.clone();
            Ok(prospect)
        })
        .collect()
}

#[async_trait]
impl<S: DocumentStore> Lifecycle for ProspectStore<S> {
    fn name(&self) -> &'static str {
        "prospects"
    }

    async fn initialize(&self, identity: &Identity) -> Result<(), StoreError> {
        ProspectStore::initialize(self, &identity.uid).await
    }

    fn clear(&self) {
        ProspectStore::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fields;
    use crate::error::ValidationError;
    use crate::live::settle;
    use crate::memory::MemoryStore;
    use tracing_test::traced_test;

    fn new_prospect(owner: &str, first_name: &str) -> NewProspect {
        NewProspect {
            owner_id: owner.into(),
            first_name: first_name.into(),
            last_name: "Chen".into(),
            email: "michael.chen@cloudscale.io".into(),
            company: "CloudScale".into(),
            position: "CTO".into(),
            ..NewProspect::default()
        }
    }

    fn setup() -> (MemoryStore, ProspectStore<MemoryStore>) {
        let backend = MemoryStore::new();
        let store = ProspectStore::new(backend.clone(), &StoreConfig::default());
        (backend, store)
    }

    #[tokio::test]
    async fn test_mirror_shows_only_owned_prospects() {
        let (_backend, store) = setup();
        store.add(new_prospect("u2", "Other")).await.unwrap();
        store.initialize("u1").await.unwrap();
        let id = store.add(new_prospect("u1", "Michael")).await.unwrap();

        let view = settle(&mut store.changes(), |v| !v.items.is_empty()).await;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].id, id);
        assert_eq!(view.items[0].owner_id, "u1");
        assert_eq!(store.find(&id).map(|p| p.full_name()), Some("Michael Chen".into()));
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_a_single_feed() {
        let (backend, store) = setup();
        store.initialize("u1").await.unwrap();
        store.initialize("u1").await.unwrap();
        assert_eq!(backend.active_feeds(), 1);

        store.clear();
        assert_eq!(backend.active_feeds(), 0);
        assert!(!store.view().is_loading);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let (backend, store) = setup();
        store.initialize("u1").await.unwrap();

        let mut bad = new_prospect("u1", "Michael");
        bad.email = "not-an-email".into();
        let err = store.add(bad).await.unwrap_err();

        assert_eq!(
            err,
            StoreError::Validation(ValidationError::InvalidEmail("not-an-email".into()))
        );
        assert!(backend.is_empty("prospects"));
        assert_eq!(store.view().error, None);
    }

    #[tokio::test]
    async fn test_update_is_reflected_after_push() {
        let (_backend, store) = setup();
        store.initialize("u1").await.unwrap();
        let id = store.add(new_prospect("u1", "Michael")).await.unwrap();
        let before = settle(&mut store.changes(), |v| v.items.len() == 1).await;

        store
            .update(&id, ProspectPatch::status(ProspectStatus::Contacted))
            .await
            .unwrap();
        let view = settle(&mut store.changes(), |v| {
            v.items.first().is_some_and(|p| p.status == ProspectStatus::Contacted)
        })
        .await;

        let updated = &view.items[0];
        assert_eq!(updated.first_name, "Michael");
        assert!(updated.updated_at >= before.items[0].updated_at);
        assert_eq!(store.count_by_status()["contacted"], 1);
        assert_eq!(store.count_by_status()["new"], 0);
    }

    #[tokio::test]
    async fn test_update_unknown_prospect_is_recorded() {
        let (_backend, store) = setup();
        store.initialize("u1").await.unwrap();
        settle(&mut store.changes(), |v| !v.is_loading).await;
        let err = store
            .update("missing", ProspectPatch::status(ProspectStatus::Disqualified))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.view().error, Some(err));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (backend, store) = setup();
        store.initialize("u1").await.unwrap();
        let id = store.add(new_prospect("u1", "Michael")).await.unwrap();

        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();

        assert!(backend.is_empty("prospects"));
        let view = settle(&mut store.changes(), |v| v.items.is_empty()).await;
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_broken_feed_keeps_stale_prospects() {
        let (backend, store) = setup();
        store.initialize("u1").await.unwrap();
        store.add(new_prospect("u1", "Michael")).await.unwrap();
        settle(&mut store.changes(), |v| v.items.len() == 1).await;

        backend.break_feeds(StoreError::PermissionDenied("prospects".into()));
        let view = settle(&mut store.changes(), |v| v.error.is_some()).await;

        assert_eq!(view.items.len(), 1);
        assert!(!view.is_loading);
        assert_eq!(
            view.error.as_ref().map(StoreError::cause),
            Some(&StoreError::PermissionDenied("prospects".into()))
        );
        assert!(logs_contain("feed failed"));
    }

    #[tokio::test]
    async fn test_malformed_document_fails_whole_push() {
        let (backend, store) = setup();
        store.initialize("u1").await.unwrap();
        store.add(new_prospect("u1", "Michael")).await.unwrap();
        settle(&mut store.changes(), |v| v.items.len() == 1).await;

        let mut broken = Fields::new();
        broken.insert("userId".into(), Value::from("u1"));
        broken.insert("firstName".into(), Value::from(42));
        backend.create("prospects", broken).await.unwrap();

        let view = settle(&mut store.changes(), |v| v.error.is_some()).await;
        assert_eq!(view.items.len(), 1);
        assert!(matches!(view.error.as_ref().map(StoreError::cause), Some(StoreError::Schema { .. })));
    }
}
