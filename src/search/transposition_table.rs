//! Concurrent transposition table keyed by Zobrist hash.
//!
//! Slots are split across shards, each behind its own `RwLock`: probes take
//! the shared lock, stores and reclamation take the exclusive one. Every
//! entry carries the generation it was written in. `new_generation` is
//! called once per iterative-deepening iteration and reports when a sweep of
//! entries older than the reclamation window is due. The searcher runs that
//! sweep (`reclaim_stale`) as a background job on its worker pool, or inline
//! when it has no pool.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Fail-high: the true score is at least `score`.
    Lower,
    /// Fail-low: the true score is at most `score`.
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<u64>,
    pub generation: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
    pub reclaimed: u64,
}

#[derive(Debug)]
struct TableShard {
    slots: Vec<Option<TTEntry>>,
}

#[derive(Debug)]
pub struct TranspositionTable {
    shards: Vec<RwLock<TableShard>>,
    slots_per_shard: usize,
    generation: AtomicU8,
    probes: AtomicU64,
    hits: AtomicU64,
    stores: AtomicU64,
    reclaimed: AtomicU64,
}

impl TranspositionTable {
    /// Age at which a foreign entry may be overwritten regardless of depth.
    const AGE_REPLACE_THRESHOLD: u8 = 4;
    const DEPTH_REPLACE_MARGIN: u8 = 2;
    /// Entries older than this many generations are evicted by reclamation.
    pub const RECLAIM_AGE: u8 = 8;
    /// Reclamation runs on every n-th generation bump.
    pub const RECLAIM_INTERVAL: u8 = 4;
    pub const DEFAULT_SHARDS: usize = 16;

    pub fn new_with_mb(size_mb: usize) -> Self {
        Self::new_with_mb_and_shards(size_mb, Self::DEFAULT_SHARDS)
    }

    pub fn new_with_mb_and_shards(size_mb: usize, shard_count: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let entry_size = std::mem::size_of::<Option<TTEntry>>().max(1);
        let shard_count = shard_count.max(1);
        let slots_per_shard = (bytes / entry_size / shard_count).max(1);
        Self::with_slots(slots_per_shard, shard_count)
    }

    fn with_slots(slots_per_shard: usize, shard_count: usize) -> Self {
        let shards = (0..shard_count)
            .map(|_| {
                RwLock::new(TableShard {
                    slots: vec![None; slots_per_shard],
                })
            })
            .collect();
        Self {
            shards,
            slots_per_shard,
            generation: AtomicU8::new(0),
            probes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
        }
    }

    /// Total slot count across all shards.
    #[inline]
    pub fn len(&self) -> usize {
        self.shards.len() * self.slots_per_shard
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> TTStats {
        TTStats {
            probes: self.probes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn locate(&self, key: u64) -> (usize, usize) {
        let shard = (key as usize) % self.shards.len();
        let slot = ((key >> 20) as usize) % self.slots_per_shard;
        (shard, slot)
    }

    // A panic while holding a shard lock cannot leave a slot half-written, so
    // poisoned guards are used as-is.
    fn read_shard(&self, index: usize) -> RwLockReadGuard<'_, TableShard> {
        self.shards[index].read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shard(&self, index: usize) -> RwLockWriteGuard<'_, TableShard> {
        self.shards[index].write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn probe(&self, key: u64) -> Option<TTEntry> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let (shard, slot) = self.locate(key);
        let hit = self.read_shard(shard).slots[slot].filter(|entry| entry.key == key);
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Store `entry`, stamping it with the current generation.
    ///
    /// For the same key the entry only replaces one of lower or equal depth.
    /// A different key evicts the resident entry if that entry is stale or
    /// not much deeper.
    pub fn store(&self, mut entry: TTEntry) {
        self.stores.fetch_add(1, Ordering::Relaxed);
        let current = self.generation();
        entry.generation = current;

        let (shard, slot) = self.locate(entry.key);
        let mut guard = self.write_shard(shard);
        let replace = match guard.slots[slot] {
            None => true,
            Some(existing) if existing.key == entry.key => entry.depth >= existing.depth,
            Some(existing) => {
                let age = current.wrapping_sub(existing.generation);
                age >= Self::AGE_REPLACE_THRESHOLD
                    || entry.depth.saturating_add(Self::DEPTH_REPLACE_MARGIN) >= existing.depth
            }
        };
        if replace {
            guard.slots[slot] = Some(entry);
        }
    }

    /// Advance the generation. Returns `true` every `RECLAIM_INTERVAL` bumps,
    /// when a `reclaim_stale` sweep is due.
    pub fn new_generation(&self) -> bool {
        let next = self.generation.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        next % Self::RECLAIM_INTERVAL == 0
    }

    /// Evict every entry older than `RECLAIM_AGE`, one shard at a time under
    /// its exclusive lock. Returns the number of evicted entries.
    pub fn reclaim_stale(&self) -> usize {
        let current = self.generation();
        let mut evicted = 0usize;
        for index in 0..self.shards.len() {
            let mut guard = self.write_shard(index);
            for slot in guard.slots.iter_mut() {
                let stale = slot
                    .map(|entry| current.wrapping_sub(entry.generation) > Self::RECLAIM_AGE)
                    .unwrap_or(false);
                if stale {
                    *slot = None;
                    evicted += 1;
                }
            }
        }
        self.reclaimed.fetch_add(evicted as u64, Ordering::Relaxed);
        evicted
    }

    pub fn clear(&self) {
        for index in 0..self.shards.len() {
            self.write_shard(index).slots.fill(None);
        }
        self.generation.store(0, Ordering::Relaxed);
        self.probes.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.stores.store(0, Ordering::Relaxed);
        self.reclaimed.store(0, Ordering::Relaxed);
    }

    /// Occupied slots.
    pub fn occupancy(&self) -> usize {
        (0..self.shards.len())
            .map(|index| self.read_shard(index).slots.iter().flatten().count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{Bound, TTEntry, TranspositionTable};

    fn entry(key: u64, depth: u8, score: i32, bound: Bound) -> TTEntry {
        TTEntry {
            key,
            depth,
            score,
            bound,
            best_move: Some(key ^ 0xff),
            generation: 0,
        }
    }

    #[test]
    fn store_and_probe_round_trip() {
        let tt = TranspositionTable::new_with_mb(1);
        tt.store(entry(123, 5, 42, Bound::Exact));
        let got = tt.probe(123).expect("entry should exist");
        assert_eq!(got.key, 123);
        assert_eq!(got.depth, 5);
        assert_eq!(got.score, 42);
        assert_eq!(got.best_move, Some(123 ^ 0xff));
        assert!(tt.probe(124).is_none());

        let stats = tt.stats();
        assert_eq!(stats.probes, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.stores, 1);
    }

    #[test]
    fn depth_preferred_replacement() {
        let tt = TranspositionTable::new_with_mb(1);
        let key = 555;
        tt.store(entry(key, 2, 1, Bound::Upper));
        tt.store(entry(key, 1, 9, Bound::Exact));
        assert_eq!(tt.probe(key).expect("exists").score, 1);

        tt.store(entry(key, 2, 5, Bound::Lower));
        assert_eq!(tt.probe(key).expect("exists").score, 5, "equal depth replaces");

        tt.store(entry(key, 6, 3, Bound::Lower));
        let got = tt.probe(key).expect("exists");
        assert_eq!(got.depth, 6);
        assert_eq!(got.score, 3);
    }

    #[test]
    fn colliding_key_evicts_only_when_stale_or_shallow_gap() {
        let tt = TranspositionTable::with_slots(1, 1);
        tt.store(entry(10, 9, 1, Bound::Exact));
        tt.store(entry(11, 3, 2, Bound::Exact));
        assert!(tt.probe(10).is_some(), "much deeper resident survives");

        for _ in 0..TranspositionTable::AGE_REPLACE_THRESHOLD {
            tt.new_generation();
        }
        tt.store(entry(11, 3, 2, Bound::Exact));
        assert!(tt.probe(10).is_none(), "stale resident is evicted");
        assert_eq!(tt.probe(11).expect("new entry").score, 2);
    }

    #[test]
    fn generation_reclamation_evicts_old_entries() {
        let tt = TranspositionTable::with_slots(64, 4);
        for key in 0..32u64 {
            tt.store(entry(key << 20 | key, 4, key as i32, Bound::Exact));
        }
        let before = tt.occupancy();
        assert!(before > 0);

        // Keep one entry fresh by re-storing it each generation.
        let fresh_key = 7u64 << 20 | 7;
        for _ in 0..=TranspositionTable::RECLAIM_AGE {
            tt.new_generation();
            tt.store(entry(fresh_key, 4, 7, Bound::Exact));
        }
        let evicted = tt.reclaim_stale();
        assert_eq!(evicted, before - 1);
        assert!(tt.probe(fresh_key).is_some());
        assert_eq!(tt.occupancy(), 1);
    }

    #[test]
    fn concurrent_probe_and_store_are_consistent() {
        let tt = Arc::new(TranspositionTable::new_with_mb_and_shards(1, 8));
        let writers: Vec<_> = (0..4u64)
            .map(|thread_id| {
                let tt = Arc::clone(&tt);
                thread::spawn(move || {
                    for i in 0..2_000u64 {
                        let key = (thread_id * 2_000 + i + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
                        tt.store(entry(key, (i % 8) as u8, i as i32, Bound::Exact));
                        if let Some(found) = tt.probe(key) {
                            assert_eq!(found.key, key);
                            assert_eq!(found.best_move, Some(key ^ 0xff));
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread should not panic");
        }
        let stats = tt.stats();
        assert_eq!(stats.stores, 8_000);
        assert!(stats.hits > 0);
    }
}
