use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

/// A single cached upstream response, keyed by the full request URI.
///
/// `age` is a recency counter, not wall-clock time: it is reset to 0
/// whenever the item is touched (fetched, inserted, or the target of
/// an eviction overwrite) and incremented on every touch of any other
/// item in the same cache. Larger age means less recently used.
#[derive(Clone, Debug)]
pub struct CacheItem {
    pub uri: String,
    pub body: Bytes,
    pub age: u32,
}

impl CacheItem {
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[derive(Default)]
struct CacheInner {
    items: Vec<CacheItem>,
    total_size: usize,
}

impl CacheInner {
    fn touch_all_but(&mut self, idx: usize) {
        for (i, item) in self.items.iter_mut().enumerate() {
            if i == idx {
                item.age = 0;
            } else {
                item.age += 1;
            }
        }
    }

    /// Index of the item with the largest age, ties broken by the
    /// first one encountered (matches the linear scan in the original
    /// linked-list cache).
    fn oldest_index(&self) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (i, item) in self.items.iter().enumerate() {
            if best.map(|(_, age)| item.age > age).unwrap_or(true) {
                best = Some((i, item.age));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Shared content cache with a bounded total footprint, per-item age
/// tracking, and single-victim LRU-style eviction. Reader/writer
/// discipline: `probe` is reader-class, everything that mutates
/// recency (`fetch`, `insert`, `evict_and_insert`) is writer-class —
/// ¬4.2 widens `fetch` to a writer precisely because it bumps ages.
pub struct ObjectCache {
    inner: RwLock<CacheInner>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Reader-class: report whether `uri` has a cached entry.
    pub async fn probe(&self, uri: &str) -> bool {
        let inner = self.inner.read().await;
        inner.items.iter().any(|item| item.uri == uri)
    }

    /// Writer-class: copy out a cached body and reset its recency.
    /// Returns `None` if the item isn't present, which can legitimately
    /// happen if an eviction raced a prior `probe` (§9, probe/fetch
    /// race open question) — callers must treat that as a miss.
    pub async fn fetch(&self, uri: &str) -> Option<Bytes> {
        let mut inner = self.inner.write().await;
        let idx = inner.items.iter().position(|item| item.uri == uri)?;
        let body = inner.items[idx].body.clone();
        inner.touch_all_but(idx);
        trace!(uri, "cache fetch touched recency");
        Some(body)
    }

    /// Writer-class: insert a new item. Precondition: `body.len() <=
    /// MAX_OBJECT_SIZE` and the addition must fit under
    /// `MAX_CACHE_SIZE`. Returns `false` (no-op) if either precondition
    /// fails — cache operations are best-effort and never surface an
    /// error to the caller (§4.2 failure semantics).
    pub async fn insert(&self, uri: String, body: Bytes) -> bool {
        let size = body.len();
        if size > MAX_OBJECT_SIZE {
            return false;
        }
        let mut inner = self.inner.write().await;
        if inner.total_size + size > MAX_CACHE_SIZE {
            return false;
        }
        inner.items.push(CacheItem { uri, body, age: 0 });
        let new_idx = inner.items.len() - 1;
        inner.touch_all_but(new_idx);
        inner.total_size += size;
        debug!(total_size = inner.total_size, count = inner.items.len(), "cache insert");
        true
    }

    /// Writer-class: select the item with the largest age and, if
    /// replacing it frees enough room, overwrite it in place with the
    /// new key/body and reset its age. If the single oldest item does
    /// not free enough space, this is a silent no-op — the original
    /// source does not retry with additional victims and this
    /// implementation preserves that (§9 open question: partial
    /// eviction).
    pub async fn evict_and_insert(&self, uri: String, body: Bytes) -> bool {
        let size = body.len();
        if size > MAX_OBJECT_SIZE {
            return false;
        }
        let mut inner = self.inner.write().await;
        let Some(victim_idx) = inner.oldest_index() else {
            return false;
        };
        let victim_size = inner.items[victim_idx].size();
        if inner.total_size - victim_size + size > MAX_CACHE_SIZE {
            return false;
        }
        inner.total_size = inner.total_size - victim_size + size;
        inner.items[victim_idx] = CacheItem { uri, body, age: 0 };
        inner.touch_all_but(victim_idx);
        debug!(total_size = inner.total_size, "cache eviction");
        true
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn total_size(&self) -> usize {
        self.inner.read().await.total_size
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}
