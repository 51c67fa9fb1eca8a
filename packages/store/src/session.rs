//! # Session controller: store lifecycles driven by authentication state
//!
//! Each store implements [`Lifecycle`]. The [`SessionController`] reacts to
//! [`AuthState`] changes:
//!
//! | Auth state | Action |
//! |------------|--------|
//! | loading | nothing |
//! | signed in | `initialize` every store for the identity |
//! | signed out | `clear` every store |
//!
//! A store that fails to initialize is reported and logged; the remaining
//! stores are still initialized.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::models::Identity;

/// A store whose feed follows the signed-in identity.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &'static str;
    async fn initialize(&self, identity: &Identity) -> Result<(), StoreError>;
    fn clear(&self);
}

/// Authentication state as published by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Identity>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            user: Some(identity),
            loading: false,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }
}

#[derive(Default)]
pub struct SessionController {
    stores: Vec<Arc<dyn Lifecycle>>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn Lifecycle>) -> Self {
        self.stores.push(store);
        self
    }

    /// React to one auth state. Returns the stores that failed to initialize.
    pub async fn apply(&self, state: &AuthState) -> Vec<(&'static str, StoreError)> {
        if state.loading {
            debug!("auth state still loading");
            return Vec::new();
        }
        let Some(identity) = &state.user else {
            info!("signed out, clearing stores");
            for store in &self.stores {
                store.clear();
            }
            return Vec::new();
        };

        info!(uid = %identity.uid, "signed in, initializing stores");
        let mut failures = Vec::new();
        for store in &self.stores {
            if let Err(err) = store.initialize(identity).await {
                error!(store = store.name(), error = %err, "store failed to initialize");
                failures.push((store.name(), err));
            }
        }
        failures
    }

    /// Follow `auth` until its sender is dropped, skipping repeats of the applied state.
    pub fn spawn(self: Arc<Self>, mut auth: watch::Receiver<AuthState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut applied: Option<AuthState> = None;
            loop {
                let state = auth.borrow_and_update().clone();
                if !state.loading && applied.as_ref() != Some(&state) {
                    self.apply(&state).await;
                    applied = Some(state);
                }
                if auth.changed().await.is_err() {
                    debug!("auth feed closed");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Lifecycle for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn initialize(&self, identity: &Identity) -> Result<(), StoreError> {
            self.calls.lock().push(format!("init:{}", identity.uid));
            if self.fail {
                return Err(StoreError::Unavailable("down".into()));
            }
            Ok(())
        }

        fn clear(&self) {
            self.calls.lock().push("clear".into());
        }
    }

    #[tokio::test]
    async fn test_apply_follows_auth_state() {
        let recorder = Arc::new(Recorder::default());
        let controller = SessionController::new().with_store(recorder.clone());

        controller.apply(&AuthState::default()).await;
        assert!(recorder.calls.lock().is_empty());

        controller
            .apply(&AuthState::signed_in(Identity::new("u1")))
            .await;
        controller.apply(&AuthState::signed_out()).await;

        assert_eq!(*recorder.calls.lock(), vec!["init:u1", "clear"]);
    }

    #[tokio::test]
    async fn test_failing_store_does_not_block_others() {
        let broken = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let healthy = Arc::new(Recorder::default());
        let controller = SessionController::new()
            .with_store(broken.clone())
            .with_store(healthy.clone());

        let failures = controller
            .apply(&AuthState::signed_in(Identity::new("u1")))
            .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].1, StoreError::Unavailable("down".into()));
        assert_eq!(*healthy.calls.lock(), vec!["init:u1"]);
    }

    #[tokio::test]
    async fn test_spawn_skips_repeated_states() {
        let recorder = Arc::new(Recorder::default());
        let controller = Arc::new(SessionController::new().with_store(recorder.clone()));
        let (tx, rx) = watch::channel(AuthState::default());
        let task = controller.spawn(rx);

        tx.send_replace(AuthState::signed_in(Identity::new("u1")));
        while recorder.calls.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        tx.send_replace(AuthState::signed_in(Identity::new("u1")));
        tokio::task::yield_now().await;
        tx.send_replace(AuthState::signed_out());
        drop(tx);
        task.await.unwrap();

        let calls = recorder.calls.lock().clone();
        assert_eq!(calls.first().map(String::as_str), Some("init:u1"));
        assert_eq!(calls.last().map(String::as_str), Some("clear"));
        assert_eq!(calls.iter().filter(|c| c.starts_with("init")).count(), 1);
    }

    #[tokio::test]
    async fn test_switching_users_leaves_no_residual_data() {
        use crate::config::StoreConfig;
        use crate::live::settle;
        use crate::memory::MemoryStore;
        use crate::models::NewProspect;
        use crate::profiles::ProfileStore;
        use crate::prospects::ProspectStore;
        use crate::templates::TemplateStore;

        let backend = MemoryStore::new();
        let config = StoreConfig::default();
        let prospects = Arc::new(ProspectStore::new(backend.clone(), &config));
        let profile = Arc::new(ProfileStore::new(backend.clone(), &config));
        let templates = Arc::new(TemplateStore::new(backend.clone(), &config));
        let controller = SessionController::new()
            .with_store(prospects.clone())
            .with_store(profile.clone())
            .with_store(templates.clone());

        let failures = controller
            .apply(&AuthState::signed_in(Identity::new("u1").with_email("u1@example.com")))
            .await;
        assert!(failures.is_empty());
        prospects
            .add(NewProspect {
                owner_id: "u1".into(),
                first_name: "Sarah".into(),
                last_name: "Johnson".into(),
                email: "sarah.j@techvision.com".into(),
                company: "TechVision Inc.".into(),
                position: "VP of Engineering".into(),
                ..NewProspect::default()
            })
            .await
            .unwrap();
        settle(&mut prospects.changes(), |v| v.items.len() == 1).await;
        assert_eq!(backend.active_feeds(), 3);

        controller.apply(&AuthState::signed_out()).await;
        assert!(prospects.prospects().is_empty());
        assert!(profile.profile().is_none());
        assert_eq!(backend.active_feeds(), 0);

        controller
            .apply(&AuthState::signed_in(Identity::new("u2").with_email("u2@example.com")))
            .await;
        let view = settle(&mut prospects.changes(), |v| !v.is_loading).await;
        assert!(view.items.is_empty());
        let me = settle(&mut profile.changes(), |v| !v.items.is_empty()).await;
        assert_eq!(me.items[0].user_id, "u2");
        assert_eq!(backend.active_feeds(), 3);
    }
}
