//! Watch-fed secret cache
//!
//! Holds the secrets of a single namespace in memory so the resolver can read
//! the coordination secret without an API round-trip. A background task
//! drives a `kube::runtime::watcher` stream into [`SecretCache::apply_event`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::lookup::{LookupError, SecretLookup};

/// Pause before re-polling a watch stream that reported an error
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// In-memory view of the secrets in one namespace
pub struct SecretCache {
    namespace: String,
    secrets: DashMap<String, Arc<Secret>>,
    /// Objects staged during a relist, swapped in on `InitDone`
    relist: Mutex<Option<HashMap<String, Arc<Secret>>>>,
    synced: AtomicBool,
    synced_notify: Notify,
}

impl SecretCache {
    /// Create an empty, unsynced cache for the given namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            secrets: DashMap::new(),
            relist: Mutex::new(None),
            synced: AtomicBool::new(false),
            synced_notify: Notify::new(),
        }
    }

    /// Namespace this cache serves
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the initial list has completed
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Number of cached secrets
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the cache holds no secrets
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Wait until the initial list has completed
    pub async fn wait_until_synced(&self) {
        loop {
            let notified = self.synced_notify.notified();
            if self.is_synced() {
                return;
            }
            notified.await;
        }
    }

    /// Apply one watcher event to the cache
    pub fn apply_event(&self, event: Event<Secret>) {
        match event {
            Event::Init => {
                debug!(namespace = %self.namespace, "Secret relist started");
                *self.relist_buffer() = Some(HashMap::new());
            }
            Event::InitApply(secret) => {
                if let Some(name) = secret.metadata.name.clone() {
                    self.relist_buffer()
                        .get_or_insert_with(HashMap::new)
                        .insert(name, Arc::new(secret));
                }
            }
            Event::InitDone => {
                let staged = self.relist_buffer().take().unwrap_or_default();
                self.secrets.retain(|name, _| staged.contains_key(name));
                for (name, secret) in staged {
                    self.secrets.insert(name, secret);
                }
                if !self.synced.swap(true, Ordering::AcqRel) {
                    info!(
                        namespace = %self.namespace,
                        secrets = self.secrets.len(),
                        "Secret cache synced"
                    );
                }
                self.synced_notify.notify_waiters();
            }
            Event::Apply(secret) => {
                if let Some(name) = secret.metadata.name.clone() {
                    debug!(namespace = %self.namespace, secret = %name, "Secret applied");
                    self.secrets.insert(name, Arc::new(secret));
                }
            }
            Event::Delete(secret) => {
                if let Some(name) = secret.metadata.name.as_deref() {
                    debug!(namespace = %self.namespace, secret = %name, "Secret deleted");
                    self.secrets.remove(name);
                }
            }
        }
    }

    /// Watch the namespace and keep the cache current until the stream ends
    pub async fn run(self: Arc<Self>, client: Client) {
        let api: Api<Secret> = Api::namespaced(client, &self.namespace);
        let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();

        info!(namespace = %self.namespace, "Starting secret watcher");

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => self.apply_event(event),
                Err(e) => {
                    warn!(namespace = %self.namespace, error = %e, "Secret watcher error, will retry");
                    tokio::time::sleep(WATCH_RETRY_DELAY).await;
                }
            }
        }

        info!(namespace = %self.namespace, "Secret watcher stopped");
    }

    fn relist_buffer(&self) -> std::sync::MutexGuard<'_, Option<HashMap<String, Arc<Secret>>>> {
        // A poisoned buffer only holds staged objects; the next Init resets it.
        self.relist.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SecretLookup for SecretCache {
    fn lookup(&self, name: &str, namespace: &str) -> Result<Arc<Secret>, LookupError> {
        if namespace != self.namespace {
            return Err(LookupError::WrongNamespace {
                served: self.namespace.clone(),
                requested: namespace.to_string(),
            });
        }
        if !self.is_synced() {
            return Err(LookupError::NotSynced {
                namespace: self.namespace.clone(),
            });
        }
        self.secrets
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LookupError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}
