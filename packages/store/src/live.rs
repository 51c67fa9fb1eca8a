//! # Live mirror: local state fed by one remote subscription
//!
//! [`LiveCollection`] is the machinery shared by the prospect, profile and
//! template stores. It owns the observable [`LiveView`] and the bookkeeping for
//! the single feed that is allowed to write into it.
//!
//! ## Feed generations
//!
//! Every [`begin`](LiveCollection::begin) and [`clear`](LiveCollection::clear)
//! bumps a generation counter and cancels the feed bound to the previous one.
//! Pushes carry the generation of the feed that produced them and are applied
//! only while that generation is current, so a push that was already in flight
//! when its feed was torn down can never reach the mirror.
//!
//! ## Update rules
//!
//! | Event | items | is_loading | error |
//! |-------|-------|------------|-------|
//! | `begin(key)` | kept for the same key, emptied for a new key | `true` | cleared |
//! | push `Ok(snapshot)` | replaced by the snapshot | `false` | cleared |
//! | push `Err(cause)` | kept | `false` | `Subscription(cause)` |
//! | mutation failure | kept | unchanged | the failure, unless cleared |
//! | `clear()` | emptied | `false` | cleared |
//!
//! The view is published through a [`tokio::sync::watch`] channel, so readers
//! can either take a copy with [`view`](LiveCollection::view) or wait for
//! changes with [`changes`](LiveCollection::changes).

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::document::{CancelHandle, Document, DocumentStore, Query, Subscription};
use crate::error::StoreError;

/// Observable state of a store.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveView<T> {
    pub items: Vec<T>,
    pub is_loading: bool,
    pub error: Option<StoreError>,
}

impl<T> Default for LiveView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

impl<T> LiveView<T> {
    fn cleared() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
struct FeedSlot {
    generation: u64,
    key: Option<String>,
    cancel: Option<CancelHandle>,
}

impl FeedSlot {
    fn teardown(&mut self, label: &str) {
        if let Some(cancel) = self.cancel.take() {
            debug!(feed = label, generation = self.generation, "tearing down feed");
            cancel.cancel();
        }
        self.generation += 1;
    }
}

pub struct LiveCollection<T> {
    label: &'static str,
    view: watch::Sender<LiveView<T>>,
    feed: Mutex<FeedSlot>,
}

impl<T> LiveCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(label: &'static str) -> Self {
        let (view, _rx) = watch::channel(LiveView::default());
        Self {
            label,
            view,
            feed: Mutex::new(FeedSlot::default()),
        }
    }

    pub fn view(&self) -> LiveView<T> {
        self.view.borrow().clone()
    }

    pub fn changes(&self) -> watch::Receiver<LiveView<T>> {
        self.view.subscribe()
    }

    /// Retire the current feed and open a new generation for `key`.
    pub fn begin(&self, key: &str) -> u64 {
        let mut feed = self.feed.lock();
        feed.teardown(self.label);
        let same_key = feed.key.as_deref() == Some(key);
        feed.key = Some(key.to_string());
        self.view.send_modify(|view| {
            if !same_key {
                view.items.clear();
            }
            view.is_loading = true;
            view.error = None;
        });
        info!(feed = self.label, generation = feed.generation, "starting feed");
        feed.generation
    }

    /// Bind a feed to `generation`. A feed for a retired generation is cancelled on the spot.
    pub fn attach(&self, generation: u64, cancel: &CancelHandle) -> bool {
        let mut feed = self.feed.lock();
        if feed.generation != generation {
            debug!(feed = self.label, generation, "feed superseded before it was attached");
            cancel.cancel();
            return false;
        }
        feed.cancel = Some(cancel.clone());
        true
    }

    /// Replace the mirror with a pushed snapshot.
    pub fn apply(&self, generation: u64, items: Vec<T>) -> bool {
        let feed = self.feed.lock();
        if feed.generation != generation {
            debug!(feed = self.label, generation, "discarding push from a retired feed");
            return false;
        }
        debug!(feed = self.label, generation, count = items.len(), "snapshot applied");
        self.view.send_modify(|view| {
            view.items = items;
            view.is_loading = false;
            view.error = None;
        });
        true
    }

    /// Record a feed failure, keeping the last known items.
    pub fn fail(&self, generation: u64, cause: StoreError) -> bool {
        let feed = self.feed.lock();
        if feed.generation != generation {
            return false;
        }
        let err = StoreError::subscription(cause);
        warn!(feed = self.label, generation, error = %err, "feed failed");
        self.view.send_modify(|view| {
            view.is_loading = false;
            view.error = Some(err);
        });
        true
    }

    /// Pass a mutation result through, recording a failure on the view.
    /// A cleared store keeps its view clean.
    pub fn track<R>(&self, op: &'static str, result: Result<R, StoreError>) -> Result<R, StoreError> {
        if let Err(err) = &result {
            warn!(feed = self.label, op, error = %err, "mutation failed");
            if self.feed.lock().key.is_some() {
                let err = err.clone();
                self.view.send_modify(|view| view.error = Some(err));
            }
        }
        result
    }

    /// Tear down the feed and reset the view.
    pub fn clear(&self) {
        let mut feed = self.feed.lock();
        feed.teardown(self.label);
        feed.key = None;
        self.view.send_replace(LiveView::cleared());
        info!(feed = self.label, generation = feed.generation, "feed cleared");
    }

    /// Subscribe for an already begun generation and start pumping its pushes.
    pub async fn connect<S, F>(
        self: &Arc<Self>,
        generation: u64,
        store: &S,
        query: Query,
        decode: F,
    ) -> Result<(), StoreError>
    where
        S: DocumentStore,
        F: Fn(Vec<Document>) -> Result<Vec<T>, StoreError> + Send + 'static,
    {
        match store.subscribe(query).await {
            Ok(subscription) => {
                if self.attach(generation, &subscription.cancel) {
                    self.spawn_feed(generation, subscription, decode);
                }
                Ok(())
            }
            Err(cause) => {
                let err = StoreError::subscription(cause);
                self.fail(generation, err.clone());
                Err(err)
            }
        }
    }

    /// [`begin`](Self::begin) followed by [`connect`](Self::connect).
    pub async fn open<S, F>(
        self: &Arc<Self>,
        store: &S,
        key: &str,
        query: Query,
        decode: F,
    ) -> Result<(), StoreError>
    where
        S: DocumentStore,
        F: Fn(Vec<Document>) -> Result<Vec<T>, StoreError> + Send + 'static,
    {
        let generation = self.begin(key);
        self.connect(generation, store, query, decode).await
    }

    fn spawn_feed<F>(self: &Arc<Self>, generation: u64, subscription: Subscription, decode: F)
    where
        F: Fn(Vec<Document>) -> Result<Vec<T>, StoreError> + Send + 'static,
    {
        let live: Weak<Self> = Arc::downgrade(self);
        let label = self.label;
        let (mut snapshots, cancel) = subscription.into_parts();

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    next = snapshots.recv() => next,
                };
                let Some(snapshot) = next else {
                    debug!(feed = label, generation, "feed closed by the store");
                    break;
                };
                let Some(live) = live.upgrade() else {
                    cancel.cancel();
                    break;
                };
                match snapshot.and_then(&decode) {
                    Ok(items) => live.apply(generation, items),
                    Err(err) => live.fail(generation, err),
                };
            }
        });
    }
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        if let Some(cancel) = self.feed.get_mut().cancel.take() {
            cancel.cancel();
        }
    }
}

/// Wait until the view satisfies `ready`, failing the test after a second.
#[cfg(test)]
pub(crate) async fn settle<T: Clone>(
    rx: &mut watch::Receiver<LiveView<T>>,
    ready: impl FnMut(&LiveView<T>) -> bool,
) -> LiveView<T> {
    let view = tokio::time::timeout(std::time::Duration::from_secs(1), rx.wait_for(ready))
        .await
        .expect("view never settled")
        .expect("view sender dropped");
    view.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_replaces_mirror() {
        let live = LiveCollection::<u32>::new("test");
        let generation = live.begin("u1");
        assert!(live.view().is_loading);

        assert!(live.apply(generation, vec![1, 2, 3]));
        assert!(live.apply(generation, vec![9]));

        let view = live.view();
        assert_eq!(view.items, vec![9]);
        assert!(!view.is_loading);
    }

    #[test]
    fn test_late_push_after_clear_is_discarded() {
        let live = LiveCollection::<u32>::new("test");
        let generation = live.begin("u1");
        live.apply(generation, vec![1]);

        live.clear();
        assert!(!live.apply(generation, vec![7]));
        assert!(!live.fail(generation, StoreError::Unavailable("late".into())));

        assert_eq!(live.view(), LiveView::cleared());
    }

    #[test]
    fn test_failure_keeps_stale_items() {
        let live = LiveCollection::<u32>::new("test");
        let generation = live.begin("u1");
        live.apply(generation, vec![4, 5]);

        live.fail(generation, StoreError::PermissionDenied("rules".into()));

        let view = live.view();
        assert_eq!(view.items, vec![4, 5]);
        assert!(!view.is_loading);
        assert_eq!(
            view.error,
            Some(StoreError::subscription(StoreError::PermissionDenied(
                "rules".into()
            )))
        );
    }

    #[test]
    fn test_begin_for_new_key_drops_items() {
        let live = LiveCollection::<u32>::new("test");
        let first = live.begin("u1");
        live.apply(first, vec![1]);

        let again = live.begin("u1");
        assert_eq!(live.view().items, vec![1], "same key keeps stale data");
        assert!(!live.apply(first, vec![2]), "older generation is retired");

        live.begin("u2");
        assert!(live.view().items.is_empty());
        assert!(!live.apply(again, vec![3]));
    }

    #[test]
    fn test_attach_cancels_superseded_feed() {
        let live = LiveCollection::<u32>::new("test");
        let stale = live.begin("u1");
        let current = live.begin("u1");

        let stale_cancel = CancelHandle::new();
        assert!(!live.attach(stale, &stale_cancel));
        assert!(stale_cancel.is_cancelled());

        let cancel = CancelHandle::new();
        assert!(live.attach(current, &cancel));
        live.clear();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_track_records_mutation_errors() {
        let live = LiveCollection::<u32>::new("test");
        live.begin("u1");
        let result: Result<(), _> = live.track("add", Err(StoreError::Unavailable("down".into())));
        assert!(result.is_err());
        assert_eq!(
            live.view().error,
            Some(StoreError::Unavailable("down".into()))
        );
        assert_eq!(live.track("add", Ok(3)), Ok(3));
    }

    #[test]
    fn test_failure_after_clear_leaves_view_clean() {
        let live = LiveCollection::<u32>::new("test");
        live.begin("u1");
        live.clear();

        let result: Result<(), _> = live.track("add", Err(StoreError::Unavailable("down".into())));

        assert!(result.is_err());
        assert_eq!(live.view(), LiveView::cleared());
    }
}
