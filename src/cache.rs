use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::InvoicesPage;

/// ViewCache
///
/// Cache of rendered listing pages. Mutations call `invalidate` so the next read of the
/// listing goes back to the store.
///
/// Every `invalidate` advances the cache generation. A reader takes the generation
/// before querying the store and hands it back to `put`; a page read across an
/// invalidation is then dropped instead of cached.
#[async_trait]
pub trait ViewCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<InvoicesPage>;
    /// Current generation, to be taken before the store is read.
    async fn generation(&self) -> u64;
    /// Stores `page` unless the cache was invalidated after `seen_generation`.
    async fn put(&self, key: String, page: InvoicesPage, seen_generation: u64);
    /// Drops every cached entry rendered under `path`.
    async fn invalidate(&self, path: &str);
}

/// CacheState
///
/// The shared cache handle held in the application state.
pub type CacheState = Arc<dyn ViewCache>;

/// Upper bound on cached pages. Each distinct search string is its own key.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cache key for one page of the listing at `path`.
pub fn listing_key(path: &str, query: &str, page: u32) -> String {
    format!("{path}?query={query}&page={page}")
}

#[derive(Default)]
struct Entries {
    pages: HashMap<String, InvoicesPage>,
    generation: u64,
}

/// InMemoryViewCache
///
/// Process-local `ViewCache`. Keys are `listing_key` strings. Once `capacity` pages are
/// held, new keys are not cached until the next invalidation frees room.
pub struct InMemoryViewCache {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl Default for InMemoryViewCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl InMemoryViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.pages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.pages.is_empty()
    }
}

/// Whether `key` was rendered for `path` (exact path, or path followed by a query).
fn key_under_path(key: &str, path: &str) -> bool {
    match key.strip_prefix(path) {
        Some(rest) => rest.is_empty() || rest.starts_with('?'),
        None => false,
    }
}

#[async_trait]
impl ViewCache for InMemoryViewCache {
    async fn get(&self, key: &str) -> Option<InvoicesPage> {
        self.entries.read().await.pages.get(key).cloned()
    }

    async fn generation(&self) -> u64 {
        self.entries.read().await.generation
    }

    async fn put(&self, key: String, page: InvoicesPage, seen_generation: u64) {
        let mut entries = self.entries.write().await;
        if entries.generation != seen_generation {
            tracing::debug!(key = %key, "listing page read across an invalidation, not cached");
            return;
        }
        if entries.pages.len() >= self.capacity && !entries.pages.contains_key(&key) {
            tracing::debug!(key = %key, capacity = self.capacity, "view cache full, not cached");
            return;
        }
        entries.pages.insert(key, page);
    }

    async fn invalidate(&self, path: &str) {
        let mut entries = self.entries.write().await;
        entries.generation += 1;
        let before = entries.pages.len();
        entries.pages.retain(|key, _| !key_under_path(key, path));
        tracing::debug!(path, dropped = before - entries.pages.len(), "view cache invalidated");
    }
}
