//! Two-tier detection cache: an in-process map in front of a [`DurableStore`].
//!
//! Entries are keyed by project path and execution context. Stale entries are
//! served immediately while a single background refresh per key runs.

pub mod store;

pub use store::{DurableStore, FileStore, MemoryStore, StoredEntry};

use crate::config::Config;
use crate::detector::{DetectOptions, Detector};
use crate::models::{DetectionReport, ExecutionContext};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: String,
    pub context: ExecutionContext,
}

impl CacheKey {
    pub fn new(path: &str, context: ExecutionContext) -> Self {
        Self {
            path: path.to_string(),
            context,
        }
    }

    /// `"<context-label>|<path>"`, the key used by the durable tier.
    pub fn storage_key(&self) -> String {
        format!("{}|{}", self.context.label(), self.path)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub report: Arc<DetectionReport>,
    pub created_at: DateTime<Utc>,
    pub context: ExecutionContext,
}

impl CacheEntry {
    fn new(report: Arc<DetectionReport>, context: ExecutionContext) -> Self {
        Self {
            report,
            created_at: Utc::now(),
            context,
        }
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        match age.to_std() {
            Ok(age) => age >= ttl,
            // Written "in the future" (clock skew): treat as fresh unless ttl is zero.
            Err(_) => ttl.is_zero(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub fast_tier_size: usize,
    pub fast_tier_keys: Vec<String>,
    pub durable_tier_keys: Vec<String>,
    pub in_flight_keys: Vec<String>,
}

/// Cloneable handle; clones share both tiers and the in-flight set.
#[derive(Clone)]
pub struct DetectionCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    detector: Detector,
    durable: Arc<dyn DurableStore>,
    fast: Mutex<HashMap<CacheKey, CacheEntry>>,
    in_flight: Mutex<HashSet<CacheKey>>,
    ttl: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight marker however the refresh task ends.
struct InFlightGuard {
    inner: Arc<CacheInner>,
    key: CacheKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.inner.in_flight).remove(&self.key);
    }
}

impl DetectionCache {
    pub fn new(detector: Detector, durable: Arc<dyn DurableStore>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                detector,
                durable,
                fast: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashSet::new()),
                ttl,
            }),
        }
    }

    /// File-backed cache under the configured cache dir.
    pub fn from_config(detector: Detector, config: &Config) -> Self {
        let store = FileStore::new(config.cache_dir().join("detections"));
        Self::new(detector, Arc::new(store), config.cache_ttl())
    }

    /// Report for `path` in its current context.
    ///
    /// Fresh hit: cached report. Stale hit: cached report, plus a background
    /// refresh unless one is already running for the key. Miss or
    /// `force_refresh`: detect now and write both tiers.
    pub async fn get_or_detect(
        &self,
        path: &str,
        project_id: Option<&str>,
        force_refresh: bool,
    ) -> Arc<DetectionReport> {
        let context = self.inner.detector.runner().context(path, project_id);
        let key = CacheKey::new(path, context);
        self.inner.evict_other_contexts(&key);

        if force_refresh {
            debug!(key = %key.storage_key(), "forced refresh");
            return self.inner.detect_and_store(&key, project_id).await;
        }

        if let Some(entry) = self.inner.lookup(&key) {
            if entry.is_stale(self.inner.ttl) {
                self.schedule_refresh(key, project_id);
            }
            return entry.report;
        }

        debug!(key = %key.storage_key(), "cache miss");
        self.inner.detect_and_store(&key, project_id).await
    }

    fn schedule_refresh(&self, key: CacheKey, project_id: Option<&str>) {
        if !lock(&self.inner.in_flight).insert(key.clone()) {
            debug!(key = %key.storage_key(), "refresh already in flight");
            return;
        }

        debug!(key = %key.storage_key(), "scheduling background refresh");
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            key,
        };
        let project_id = project_id.map(str::to_string);
        tokio::spawn(async move {
            guard
                .inner
                .detect_and_store(&guard.key, project_id.as_deref())
                .await;
        });
    }

    /// Drop every context's entry for `path`, or everything when `None`.
    pub fn clear(&self, path: Option<&str>) {
        match path {
            Some(path) => {
                lock(&self.inner.fast).retain(|key, _| key.path != path);
                for context in ExecutionContext::ALL {
                    let key = CacheKey::new(path, context);
                    self.inner.clear_durable(Some(&key.storage_key()));
                }
            }
            None => {
                lock(&self.inner.fast).clear();
                self.inner.clear_durable(None);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut fast_tier_keys: Vec<String> = lock(&self.inner.fast)
            .keys()
            .map(CacheKey::storage_key)
            .collect();
        fast_tier_keys.sort();

        let mut in_flight_keys: Vec<String> = lock(&self.inner.in_flight)
            .iter()
            .map(CacheKey::storage_key)
            .collect();
        in_flight_keys.sort();

        let durable_tier_keys = self.inner.durable.list_keys().unwrap_or_else(|e| {
            warn!(error = %e, "failed to list durable cache keys");
            Vec::new()
        });

        CacheStats {
            fast_tier_size: fast_tier_keys.len(),
            fast_tier_keys,
            durable_tier_keys,
            in_flight_keys,
        }
    }
}

impl CacheInner {
    /// Fast tier, then durable tier. A durable hit is promoted into the fast tier.
    fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Some(entry) = lock(&self.fast).get(key) {
            return Some(entry.clone());
        }

        let stored = match self.durable.get(&key.storage_key()) {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                self.evict_other_durable(key);
                return None;
            }
            Err(e) => {
                warn!(key = %key.storage_key(), error = %e, "durable cache read failed");
                return None;
            }
        };

        if stored.context != key.context.label() {
            return None;
        }

        let entry = CacheEntry {
            report: Arc::new(stored.report),
            created_at: stored.created_at,
            context: key.context,
        };
        lock(&self.fast).insert(key.clone(), entry.clone());
        Some(entry)
    }

    async fn detect_and_store(
        &self,
        key: &CacheKey,
        project_id: Option<&str>,
    ) -> Arc<DetectionReport> {
        let options = DetectOptions::new(&key.path).with_project_id(project_id);
        let report = Arc::new(self.detector.detect(&options).await);

        if !report.success {
            debug!(key = %key.storage_key(), "detection failed, not caching");
            return report;
        }

        lock(&self.fast).insert(
            key.clone(),
            CacheEntry::new(Arc::clone(&report), key.context),
        );
        if let Err(e) = self.durable.set(
            &key.storage_key(),
            &key.path,
            key.context.label(),
            &report,
        ) {
            warn!(key = %key.storage_key(), error = %e, "durable cache write failed");
        }
        report
    }

    /// Entries for the same path under another context are leftovers from a
    /// topology change (e.g. a remote link coming up).
    fn evict_other_contexts(&self, key: &CacheKey) {
        let evicted: Vec<CacheKey> = {
            let mut fast = lock(&self.fast);
            let stale: Vec<CacheKey> = fast
                .keys()
                .filter(|k| k.path == key.path && k.context != key.context)
                .cloned()
                .collect();
            for k in &stale {
                fast.remove(k);
            }
            stale
        };

        for k in evicted {
            debug!(key = %k.storage_key(), "evicting entry from previous context");
            self.clear_durable(Some(&k.storage_key()));
        }
    }

    fn evict_other_durable(&self, key: &CacheKey) {
        for context in ExecutionContext::ALL {
            if context != key.context {
                let other = CacheKey::new(&key.path, context);
                self.clear_durable(Some(&other.storage_key()));
            }
        }
    }

    fn clear_durable(&self, storage_key: Option<&str>) {
        if let Err(e) = self.durable.clear(storage_key) {
            warn!(key = ?storage_key, error = %e, "durable cache clear failed");
        }
    }
}
