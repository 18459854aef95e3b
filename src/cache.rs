//! Two-tier result cache
//!
//! Processed results are cached under their [`ContentIdentifier`] in a
//! bounded in-memory LRU tier, optionally backed by a durable tier: one
//! file per identifier in a flat directory on persistent storage. Entries
//! are immutable once written, so the tiers need no cross-entry
//! consistency machinery.
//!
//! The durable tier is an optimization, never a correctness dependency:
//! read failures are downgraded to cache misses and write failures to
//! no-ops, logged at warn level.

use crate::error::{MatteError, Result};
use crate::hasher::{content_hash, ContentIdentifier};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Cache counters and occupancy snapshot
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Entries currently resident in the in-memory tier
    pub entries: usize,
    /// Total bytes held by the in-memory tier
    pub total_bytes: u64,
    /// Lookups answered from the in-memory tier
    pub memory_hits: u64,
    /// Lookups answered from the durable tier (and promoted)
    pub durable_hits: u64,
    /// Lookups that missed both tiers
    pub misses: u64,
    /// Entries evicted from the in-memory tier by capacity pressure
    pub evictions: u64,
}

struct MemoryEntry {
    bytes: Vec<u8>,
    stamp: u64,
}

/// Fixed-capacity in-memory tier with strict LRU eviction
///
/// A monotonic access clock plus a `BTreeMap` stamp index gives O(log n)
/// lookup of the least-recently-used entry without scanning.
struct MemoryTier {
    capacity: usize,
    entries: HashMap<ContentIdentifier, MemoryEntry>,
    stamp_index: BTreeMap<u64, ContentIdentifier>,
    clock: u64,
    memory_hits: u64,
    durable_hits: u64,
    misses: u64,
    evictions: u64,
}

impl MemoryTier {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            stamp_index: BTreeMap::new(),
            clock: 0,
            memory_hits: 0,
            durable_hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn get(&mut self, id: &str) -> Option<Vec<u8>> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(id)?;
        self.stamp_index.remove(&entry.stamp);
        entry.stamp = stamp;
        self.stamp_index.insert(stamp, id.to_string());
        Some(entry.bytes.clone())
    }

    fn insert(&mut self, id: &str, bytes: Vec<u8>) {
        let stamp = self.tick();

        // Overwrite rather than duplicate when the identifier is present.
        if let Some(existing) = self.entries.get_mut(id) {
            self.stamp_index.remove(&existing.stamp);
            existing.bytes = bytes;
            existing.stamp = stamp;
            self.stamp_index.insert(stamp, id.to_string());
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        self.entries.insert(id.to_string(), MemoryEntry { bytes, stamp });
        self.stamp_index.insert(stamp, id.to_string());
    }

    fn evict_lru(&mut self) {
        if let Some((_, id)) = self.stamp_index.pop_first() {
            self.entries.remove(&id);
            self.evictions += 1;
            log::debug!("Evicted least-recently-used cache entry: {}", id);
        }
    }

    fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.stamp_index.clear();
        count
    }
}

/// Two-tier result cache keyed by content identifier
///
/// Thread-safe: `get` and `put` take `&self` and may be called from any
/// number of tasks concurrently. The in-memory tier sits behind a mutex
/// with short critical sections; durable-tier I/O runs outside the lock,
/// so a `put`/`get` race on the same identifier resolves to last writer
/// wins without torn entries.
pub struct ResultCache {
    memory: Mutex<MemoryTier>,
    durable_dir: Option<PathBuf>,
}

impl ResultCache {
    /// Create a memory-only cache with the given entry capacity
    ///
    /// Entries exist only transiently for the process lifetime; the
    /// durable tier is never consulted.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: Mutex::new(MemoryTier::new(capacity.max(1))),
            durable_dir: None,
        }
    }

    /// Create a cache backed by a durable tier in the given directory
    ///
    /// # Errors
    /// - Failed to create the durable cache directory
    pub fn with_durable_dir(capacity: usize, dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| MatteError::file_io_error("create cache directory", dir, &e))?;
        }

        Ok(Self {
            memory: Mutex::new(MemoryTier::new(capacity.max(1))),
            durable_dir: Some(dir.to_path_buf()),
        })
    }

    /// Create a cache from the processing configuration
    ///
    /// The durable tier is enabled only when result retention is on.
    ///
    /// # Errors
    /// - Failed to create the durable cache directory
    pub fn from_config(config: &crate::config::MatteConfig) -> Result<Self> {
        if config.keep_results {
            Self::with_durable_dir(config.cache_capacity, &config.cache_dir)
        } else {
            Ok(Self::new(config.cache_capacity))
        }
    }

    /// Whether the durable tier is enabled
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.durable_dir.is_some()
    }

    /// Look up an entry, memory tier first
    ///
    /// On a memory miss the durable tier is consulted and a hit is
    /// promoted into the memory tier before returning. Returns `None` on
    /// a full miss or when a durable read fails.
    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        {
            let mut tier = self.memory.lock().expect("cache mutex poisoned");
            if let Some(bytes) = tier.get(id) {
                tier.memory_hits += 1;
                return Some(bytes);
            }
        }

        // Durable read runs outside the lock so slow storage never stalls
        // unrelated lookups.
        let bytes = self.read_durable(id)?;

        let mut tier = self.memory.lock().expect("cache mutex poisoned");
        tier.insert(id, bytes.clone());
        tier.durable_hits += 1;
        Some(bytes)
    }

    /// Insert an entry, evicting the least-recently-used one at capacity
    ///
    /// The entry is mirrored to the durable tier when that tier is
    /// enabled. A durable write failure is logged and ignored.
    pub fn put(&self, id: &str, bytes: Vec<u8>) {
        {
            let mut tier = self.memory.lock().expect("cache mutex poisoned");
            tier.insert(id, bytes.clone());
        }

        self.write_durable(id, &bytes);
    }

    /// Record a full miss on both tiers
    ///
    /// Called by the lookup path once it is known that neither tier held
    /// the identifier.
    fn record_miss(&self) {
        let mut tier = self.memory.lock().expect("cache mutex poisoned");
        tier.misses += 1;
    }

    /// Snapshot of cache counters and occupancy
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let tier = self.memory.lock().expect("cache mutex poisoned");
        CacheStats {
            entries: tier.entries.len(),
            total_bytes: tier.entries.values().map(|e| e.bytes.len() as u64).sum(),
            memory_hits: tier.memory_hits,
            durable_hits: tier.durable_hits,
            misses: tier.misses,
            evictions: tier.evictions,
        }
    }

    /// Clear both tiers
    ///
    /// Removes every in-memory entry and deletes every durable entry
    /// file. Returns the number of durable entries removed.
    ///
    /// # Errors
    /// - Failed to read the durable cache directory
    /// - Failed to remove a durable entry file
    pub fn clear(&self) -> Result<usize> {
        self.memory.lock().expect("cache mutex poisoned").clear();

        let Some(dir) = &self.durable_dir else {
            return Ok(0);
        };
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = fs::read_dir(dir)
            .map_err(|e| MatteError::file_io_error("read cache directory", dir, &e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| MatteError::file_io_error("read cache directory", dir, &e))?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("png") {
                fs::remove_file(&path)
                    .map_err(|e| MatteError::file_io_error("remove cache entry", &path, &e))?;
                removed += 1;
            }
        }

        log::info!("Cleared result cache ({} durable entries removed)", removed);
        Ok(removed)
    }

    /// Path of the durable entry file for an identifier
    ///
    /// Returns `None` when the durable tier is disabled. The file may not
    /// exist.
    #[must_use]
    pub fn durable_path(&self, id: &str) -> Option<PathBuf> {
        self.durable_dir
            .as_ref()
            .map(|dir| dir.join(durable_file_name(id)))
    }

    fn read_durable(&self, id: &str) -> Option<Vec<u8>> {
        let Some(path) = self.durable_path(id) else {
            self.record_miss();
            return None;
        };

        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.record_miss();
                None
            },
            Err(e) => {
                log::warn!(
                    "Durable cache read failed for '{}', treating as miss: {}",
                    path.display(),
                    e
                );
                self.record_miss();
                None
            },
        }
    }

    fn write_durable(&self, id: &str, bytes: &[u8]) {
        let Some(dir) = &self.durable_dir else {
            return;
        };
        let path = dir.join(durable_file_name(id));

        // Stage through a temporary file in the same directory and rename
        // into place, so concurrent readers never observe a torn entry.
        let result = tempfile::NamedTempFile::new_in(dir)
            .and_then(|mut tmp| {
                tmp.write_all(bytes)?;
                Ok(tmp)
            })
            .and_then(|tmp| tmp.persist(&path).map_err(|e| e.error));

        match result {
            Ok(_) => log::debug!("Stored durable cache entry: {}", path.display()),
            Err(e) => log::warn!(
                "Durable cache write failed for '{}', entry kept in memory only: {}",
                path.display(),
                e
            ),
        }
    }
}

/// Map an identifier to a filesystem-safe durable entry file name
///
/// Plain identifiers map directly to `<id>.png`. Identifiers containing
/// path separators or other unsafe characters fall back to a hash-based
/// name, keeping the mapping deterministic without collisions between
/// distinct identifiers.
fn durable_file_name(id: &str) -> String {
    let safe = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if safe {
        format!("{}.png", id)
    } else {
        let digest = content_hash(id.as_bytes());
        format!("id-{}.png", digest.get(..32).unwrap_or(&digest))
    }
}
