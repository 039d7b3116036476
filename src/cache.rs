// Quote cache: memoizes price breakdowns keyed on the full input tuple.
// A stay is re-priced whenever dates, guests or the rate sheet change; the
// cache only saves the recomputation, results are identical either way.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::calendar::StayWindow;
use crate::property::PropertySlug;
use crate::rates::RateSheet;
use crate::resolver::{NightlyPriceResolver, PriceBreakdown};

#[derive(Debug, Default)]
pub struct CacheStats {
    pub items_count: AtomicUsize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub average_lookup_time_ns: AtomicU64,
    pub total_lookups: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
    pub average_lookup_time_ns: u64,
    pub total_lookups: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl_seconds: u64,
    pub eviction_policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl_seconds: 300,
            eviction_policy: EvictionPolicy::LeastRecentlyUsed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    LeastRecentlyUsed,
    LeastFrequentlyUsed,
    OldestFirst,
}

/// Everything a breakdown depends on.
///
/// Equality is structural: two keys match only when the property, the stay,
/// the guest count and every row of the rate sheet are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub property: PropertySlug,
    pub window: StayWindow,
    pub guests: u32,
    pub sheet: Arc<RateSheet>,
}

impl QuoteKey {
    pub fn new(property: PropertySlug, window: StayWindow, guests: u32, sheet: Arc<RateSheet>) -> Self {
        Self {
            property,
            window,
            guests,
            sheet,
        }
    }

    fn compute(&self) -> PriceBreakdown {
        NightlyPriceResolver::new(&self.sheet).resolve_window(&self.window, self.guests)
    }
}

pub trait PriceCache: Send + Sync + 'static {
    // Cached breakdown, or resolve and remember it
    fn quote(&self, key: QuoteKey) -> PriceBreakdown;

    // Drop entries for one property, or everything with None
    fn invalidate(&self, property: Option<PropertySlug>) -> usize;

    fn stats(&self) -> CacheStatsReport;
}

struct CacheEntry {
    breakdown: PriceBreakdown,
    created_at: Instant,
    ttl: Duration,
    access_count: usize,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct QuoteCache {
    entries: DashMap<QuoteKey, CacheEntry>,
    config: RwLock<CacheConfig>,
    // Held across evict-then-insert so concurrent stores cannot overshoot max_entries
    admission: Mutex<()>,
    stats: CacheStats,
}

impl QuoteCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config: RwLock::new(config),
            admission: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&self, key: &QuoteKey) -> Option<PriceBreakdown> {
        let now = Instant::now();
        self.stats.total_lookups.fetch_add(1, Ordering::SeqCst);

        let mut expired = false;
        let found = match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.access_count += 1;
                entry.last_accessed = Instant::now();
                Some(entry.breakdown.clone())
            }
            Some(_) => {
                expired = true;
                None
            }
            None => None,
        };

        // The shard guard from get_mut is released here; another thread may
        // refresh the entry before the removal below, so it re-checks expiry
        if expired {
            self.remove_entry(key, true);
        }

        if found.is_some() {
            self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
        } else {
            self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        }
        self.store_lookup_time(now);
        found
    }

    // Returns false when the cache is configured with no capacity
    pub fn store(&self, key: QuoteKey, breakdown: PriceBreakdown, ttl: Option<Duration>) -> bool {
        let _admission = self.admission.lock();
        let (max_entries, default_ttl) = {
            let config = self.config.read();
            (config.max_entries, config.default_ttl_seconds)
        };
        if max_entries == 0 {
            return false;
        }

        if !self.entries.contains_key(&key) {
            while self.entries.len() >= max_entries {
                if !self.remove_victim() {
                    break;
                }
            }
        }

        let now = Instant::now();
        let entry = CacheEntry {
            breakdown,
            created_at: now,
            ttl: ttl.unwrap_or_else(|| Duration::from_secs(default_ttl)),
            access_count: 0,
            last_accessed: now,
        };
        if self.entries.insert(key, entry).is_none() {
            self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    pub fn set_eviction_policy(&self, policy: EvictionPolicy) {
        self.config.write().eviction_policy = policy;
    }

    // Shrinking evicts down to the new limit
    pub fn resize(&self, max_entries: usize) {
        let _admission = self.admission.lock();
        self.config.write().max_entries = max_entries;

        while self.entries.len() > max_entries {
            if !self.remove_victim() {
                break;
            }
        }
        info!(max_entries, items = self.entries.len(), "quote cache resized");
    }

    fn remove_victim(&self) -> bool {
        let policy = self.config.read().eviction_policy;

        let victim = match policy {
            EvictionPolicy::LeastRecentlyUsed => self
                .entries
                .iter()
                .min_by_key(|entry| entry.last_accessed)
                .map(|entry| entry.key().clone()),
            EvictionPolicy::LeastFrequentlyUsed => self
                .entries
                .iter()
                .min_by_key(|entry| entry.access_count)
                .map(|entry| entry.key().clone()),
            EvictionPolicy::OldestFirst => self
                .entries
                .iter()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key().clone()),
        };

        match victim {
            Some(key) => {
                debug!(property = %key.property, ?policy, "evicting quote");
                self.remove_entry(&key, false)
            }
            None => false,
        }
    }

    // With `expired` set, only an entry that is still expired is removed
    fn remove_entry(&self, key: &QuoteKey, expired: bool) -> bool {
        let removed = if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired())
        } else {
            self.entries.remove(key)
        };
        if removed.is_none() {
            return false;
        }
        self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
        if expired {
            self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        } else {
            self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    fn store_lookup_time(&self, started: Instant) {
        let duration_ns = started.elapsed().as_nanos() as u64;
        let total_lookups = self.stats.total_lookups.load(Ordering::SeqCst) as u64;
        let current_avg = self.stats.average_lookup_time_ns.load(Ordering::SeqCst);

        let new_avg = if total_lookups <= 1 {
            duration_ns
        } else {
            (current_avg * (total_lookups - 1) + duration_ns) / total_lookups
        };

        self.stats
            .average_lookup_time_ns
            .store(new_avg, Ordering::SeqCst);
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl PriceCache for QuoteCache {
    fn quote(&self, key: QuoteKey) -> PriceBreakdown {
        if let Some(breakdown) = self.get(&key) {
            return breakdown;
        }

        let breakdown = key.compute();
        self.store(key, breakdown.clone(), None);
        breakdown
    }

    fn invalidate(&self, property: Option<PropertySlug>) -> usize {
        let keys: Vec<QuoteKey> = self
            .entries
            .iter()
            .filter(|entry| property.map_or(true, |p| entry.key().property == p))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = keys
            .iter()
            .filter(|key| self.remove_entry(key, false))
            .count();
        info!(?property, removed, "invalidated cached quotes");
        removed
    }

    fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            average_lookup_time_ns: self.stats.average_lookup_time_ns.load(Ordering::SeqCst),
            total_lookups: self.stats.total_lookups.load(Ordering::SeqCst),
        }
    }
}

// Resolves every time; for callers that do not want memoization
#[derive(Debug, Default)]
pub struct NoCache {
    lookups: AtomicUsize,
}

impl PriceCache for NoCache {
    fn quote(&self, key: QuoteKey) -> PriceBreakdown {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        key.compute()
    }

    fn invalidate(&self, _property: Option<PropertySlug>) -> usize {
        0
    }

    fn stats(&self) -> CacheStatsReport {
        let lookups = self.lookups.load(Ordering::SeqCst);
        CacheStatsReport {
            miss_count: lookups,
            total_lookups: lookups,
            ..Default::default()
        }
    }
}
