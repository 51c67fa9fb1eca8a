//! Template store: the signed-in user's message templates, newest first.
//!
//! `variables` is always derived from `content` on write; callers never
//! supply it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::config::StoreConfig;
use crate::document::{decode, to_fields, Document, DocumentStore, Query};
use crate::error::StoreError;
use crate::live::{LiveCollection, LiveView};
use crate::models::{current_timestamp, Identity, MessageTemplate, NewTemplate, TemplatePatch, TemplateType};
use crate::placeholders::extract_placeholders;
use crate::session::Lifecycle;
use crate::validate;

pub struct TemplateStore<S: DocumentStore> {
    store: S,
    collection: String,
    live: Arc<LiveCollection<MessageTemplate>>,
}

impl<S: DocumentStore> TemplateStore<S> {
    pub fn new(store: S, config: &StoreConfig) -> Self {
        Self {
            store,
            collection: config.collections.templates.clone(),
            live: Arc::new(LiveCollection::new("templates")),
        }
    }

    pub fn view(&self) -> LiveView<MessageTemplate> {
        self.live.view()
    }

    pub fn templates(&self) -> Vec<MessageTemplate> {
        self.live.view().items
    }

    pub fn changes(&self) -> watch::Receiver<LiveView<MessageTemplate>> {
        self.live.changes()
    }

    /// The template flagged as default for a channel, falling back to the newest one.
    pub fn default_template(&self, template_type: TemplateType) -> Option<MessageTemplate> {
        let templates: Vec<_> = self
            .live
            .view()
            .items
            .into_iter()
            .filter(|t| t.template_type == template_type)
            .collect();
        templates
            .iter()
            .find(|t| t.is_default)
            .or_else(|| templates.first())
            .cloned()
    }

    pub async fn initialize(&self, owner_id: &str) -> Result<(), StoreError> {
        let query = Query::collection(&self.collection)
            .where_eq("userId", owner_id)
            .order_by("createdAt", true);
        let collection = self.collection.clone();
        self.live
            .open(&self.store, owner_id, query, move |docs| decode_all(&collection, docs))
            .await
    }

    pub fn clear(&self) {
        self.live.clear();
    }

    /// Create a template and return its id.
    pub async fn add(&self, template: NewTemplate) -> Result<String, StoreError> {
        validate::new_template(&template)?;
        let now = current_timestamp();
        let record = MessageTemplate {
            id: String::new(),
            variables: extract_placeholders(&template.content),
            name: template.name,
            content: template.content,
            template_type: template.template_type,
            owner_id: template.owner_id,
            is_default: template.is_default,
            created_at: now,
            updated_at: now,
        };
        let fields = to_fields(&record)?;
        self.live
            .track("add", self.store.create(&self.collection, fields).await)
    }

    /// Merge edits into a template. `variables` is recomputed only when `content` changes.
    pub async fn update(&self, id: &str, patch: TemplatePatch) -> Result<(), StoreError> {
        validate::template_patch(&patch)?;
        let mut fields = to_fields(&patch)?;
        if let Some(content) = &patch.content {
            let variables = extract_placeholders(content);
            fields.insert("variables".to_string(), Value::from(variables));
        }
        fields.insert("updatedAt".to_string(), Value::from(current_timestamp()));
        self.live
            .track("update", self.store.update(&self.collection, id, fields).await)
    }

    /// Remove a template. Deleting an unknown id succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.store.delete(&self.collection, id).await {
            Err(err) if err.is_not_found() => {
                debug!(id, "template already gone");
                Ok(())
            }
            result => self.live.track("delete", result),
        }
    }
}

fn decode_all(collection: &str, docs: Vec<Document>) -> Result<Vec<MessageTemplate>, StoreError> {
    docs.iter()
        .map(|doc| {
            let mut template: MessageTemplate = decode(collection, doc)?;
            template.id = doc.id.clone();
            Ok(template)
        })
        .collect()
}

#[async_trait]
impl<S: DocumentStore> Lifecycle for TemplateStore<S> {
    fn name(&self) -> &'static str {
        "templates"
    }

    async fn initialize(&self, identity: &Identity) -> Result<(), StoreError> {
        TemplateStore::initialize(self, &identity.uid).await
    }

    fn clear(&self) {
        TemplateStore::clear(self);
    }
}
