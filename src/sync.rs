//! Observing changes made by other writers of the shared store.
//!
//! Two mechanisms are offered. [`Poller`] re-reads on a fixed interval and
//! publishes only when an explicit fingerprint of the observed value changes;
//! this works across processes sharing the data directory. [`KeyWatcher`]
//! listens to the store's own write notifications, which only cover writes
//! made through the same `LocalStore` handle.

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::core::store::{LocalStore, StoreEvent};

pub type Fingerprint = u64;

/// Hash of the value's JSON form.
pub fn fingerprint<T: Serialize>(value: &T) -> Fingerprint {
    let mut hasher = DefaultHasher::new();
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(e) => warn!(error = %e, "could not fingerprint value"),
    }
    hasher.finish()
}

/// Receiving side of a running poll loop. Dropping it stops the loop.
pub struct PollHandle<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T: Clone> PollHandle<T> {
    /// The most recently published value.
    pub fn latest(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait until the observed value changes. `None` once the loop has stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct Poller;

impl Poller {
    /// Poll `probe` every `interval`, publishing when its JSON fingerprint changes.
    pub fn spawn<T, P>(interval: Duration, probe: P) -> PollHandle<T>
    where
        T: Serialize + Send + Sync + 'static,
        P: FnMut() -> T + Send + 'static,
    {
        Self::spawn_with(interval, probe, fingerprint::<T>)
    }

    /// Like [`Poller::spawn`] with a caller-chosen dirty check.
    pub fn spawn_with<T, P, D>(interval: Duration, probe: P, dirty_key: D) -> PollHandle<T>
    where
        T: Send + Sync + 'static,
        P: FnMut() -> T + Send + 'static,
        D: Fn(&T) -> Fingerprint + Send + 'static,
    {
        Self::run(interval, None, probe, dirty_key)
    }

    /// Like [`Poller::spawn_with`], but also probes as soon as `watcher`
    /// reports a write made through this process's store handle.
    pub fn spawn_watching<T, P, D>(
        interval: Duration,
        watcher: KeyWatcher,
        probe: P,
        dirty_key: D,
    ) -> PollHandle<T>
    where
        T: Send + Sync + 'static,
        P: FnMut() -> T + Send + 'static,
        D: Fn(&T) -> Fingerprint + Send + 'static,
    {
        Self::run(interval, Some(watcher), probe, dirty_key)
    }

    fn run<T, P, D>(
        interval: Duration,
        mut nudge: Option<KeyWatcher>,
        mut probe: P,
        dirty_key: D,
    ) -> PollHandle<T>
    where
        T: Send + Sync + 'static,
        P: FnMut() -> T + Send + 'static,
        D: Fn(&T) -> Fingerprint + Send + 'static,
    {
        let initial = probe();
        let mut last = dirty_key(&initial);
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately and the initial value is already published.
            ticker.tick().await;

            loop {
                let mut store_gone = false;
                match nudge.as_mut() {
                    Some(watcher) => tokio::select! {
                        _ = ticker.tick() => {}
                        change = watcher.changed() => store_gone = change.is_none(),
                    },
                    None => {
                        ticker.tick().await;
                    }
                }
                if store_gone {
                    nudge = None;
                }

                let value = probe();
                let key = dirty_key(&value);
                if key == last {
                    continue;
                }
                last = key;
                debug!(?interval, "poll observed a change");
                if tx.send(value).is_err() {
                    break;
                }
            }
        });

        PollHandle { rx, task }
    }
}

/// Push notifications for writes to `keys` made through this store handle.
pub fn watch_store(store: &LocalStore, keys: &[&str]) -> KeyWatcher {
    KeyWatcher::new(store, keys)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Key(StoreEvent),
    /// Notifications were dropped; the watcher should re-read everything it shows.
    Resync,
}

/// Push-style notifications for a set of keys.
pub struct KeyWatcher {
    rx: broadcast::Receiver<StoreEvent>,
    keys: Vec<String>,
}

impl KeyWatcher {
    pub fn new(store: &LocalStore, keys: &[&str]) -> Self {
        Self {
            rx: store.subscribe(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Next change to one of the watched keys. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Change> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.keys.iter().any(|k| *k == event.key) => {
                    return Some(Change::Key(event))
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "store notifications lagged");
                    return Some(Change::Resync);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
