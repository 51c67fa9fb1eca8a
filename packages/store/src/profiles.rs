//! Profile store: the signed-in user's own profile document.
//!
//! The profile is created lazily on first sign-in and its `lastLoginAt` is
//! refreshed on every later one, before the feed is opened. Edits are
//! server-confirmed like every other write; the mirror changes only when the
//! feed pushes the merged document back.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::document::{decode, to_fields, Document, DocumentStore, Query, SetMode};
use crate::error::StoreError;
use crate::live::{LiveCollection, LiveView};
use crate::models::{current_timestamp, Identity, ProfilePatch, UserProfile};
use crate::session::Lifecycle;
use crate::validate;

pub struct ProfileStore<S: DocumentStore> {
    store: S,
    collection: String,
    live: Arc<LiveCollection<UserProfile>>,
}

impl<S: DocumentStore> ProfileStore<S> {
    pub fn new(store: S, config: &StoreConfig) -> Self {
        Self {
            store,
            collection: config.collections.users.clone(),
            live: Arc::new(LiveCollection::new("profile")),
        }
    }

    /// The mirrored profile, or `None` when signed out or not yet delivered.
    pub fn profile(&self) -> Option<UserProfile> {
        self.live.view().items.into_iter().next()
    }

    pub fn view(&self) -> LiveView<UserProfile> {
        self.live.view()
    }

    pub fn changes(&self) -> watch::Receiver<LiveView<UserProfile>> {
        self.live.changes()
    }

    /// Ensure the profile document exists, then mirror it.
    pub async fn initialize(&self, identity: &Identity) -> Result<(), StoreError> {
        let generation = self.live.begin(&identity.uid);
        if let Err(cause) = self.ensure_profile(identity).await {
            let err = StoreError::subscription(cause);
            self.live.fail(generation, err.clone());
            return Err(err);
        }

        let query = Query::document(&self.collection, &identity.uid);
        let collection = self.collection.clone();
        let uid = identity.uid.clone();
        self.live
            .connect(generation, &self.store, query, move |docs| {
                decode_profile(&collection, &uid, docs)
            })
            .await
    }

    async fn ensure_profile(&self, identity: &Identity) -> Result<(), StoreError> {
        let now = current_timestamp();
        match self.store.get(&self.collection, &identity.uid).await? {
            None => {
                info!(uid = %identity.uid, "creating profile");
                let fields = to_fields(&UserProfile::from_identity(identity, now))?;
                self.store
                    .set(&self.collection, &identity.uid, fields, SetMode::Replace)
                    .await
            }
            Some(doc) if decode::<UserProfile>(&self.collection, &doc).is_err() => {
                warn!(uid = %identity.uid, "repairing malformed profile");
                let mut fields = to_fields(&UserProfile::from_identity(identity, now))?;
                fields.extend(doc.data);
                fields.insert("lastLoginAt".to_string(), json!(now));
                self.store
                    .set(&self.collection, &identity.uid, fields, SetMode::Replace)
                    .await
            }
            Some(_) => {
                debug!(uid = %identity.uid, "refreshing last login");
                let fields = to_fields(&json!({ "lastLoginAt": now }))?;
                self.store
                    .set(&self.collection, &identity.uid, fields, SetMode::Merge)
                    .await
            }
        }
    }

    /// Merge edits into the mirrored profile. Rejected until the feed has delivered one.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<(), StoreError> {
        validate::profile_patch(&patch)?;
        let Some(profile) = self.profile() else {
            return Err(StoreError::NoActiveIdentity);
        };
        let fields = to_fields(&patch)?;
        let result = self
            .store
            .set(&self.collection, &profile.user_id, fields, SetMode::Merge)
            .await;
        self.live.track("update_profile", result)
    }

    pub fn clear(&self) {
        self.live.clear();
    }
}

fn decode_profile(
    collection: &str,
    uid: &str,
    docs: Vec<Document>,
) -> Result<Vec<UserProfile>, StoreError> {
    let Some(doc) = docs.first() else {
        return Err(StoreError::ProfileMissing(uid.to_string()));
    };
    let mut profile: UserProfile = decode(collection, doc)?;
    if profile.user_id.is_empty() {
        profile.user_id = doc.id.clone();
    }
    Ok(vec![profile])
}

#[async_trait]
impl<S: DocumentStore> Lifecycle for ProfileStore<S> {
    fn name(&self) -> &'static str {
        "profile"
    }

    async fn initialize(&self, identity: &Identity) -> Result<(), StoreError> {
        ProfileStore::initialize(self, identity).await
    }

    fn clear(&self) {
        ProfileStore::clear(self);
    }
}
