//! In-memory idempotency ledger.
//!
//! The ledger answers one question for provider callbacks: has this logical
//! event already been acted upon within the retention window? Entries expire
//! lazily when read; [`IdempotencyLedger::sweep_expired`] removes the rest and
//! is driven by [`crate::idempotency::IdempotencySweepJob`].
//!
//! The correctness-critical path is [`IdempotencyLedger::try_acquire`] (or its
//! guard form [`IdempotencyLedger::claim`]): checking for a live entry and
//! inserting a claim happen under the same map-shard lock, so for concurrent
//! deliveries of one event exactly one caller wins.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::idempotency::clock::{Clock, SystemClock};
use crate::idempotency::key::IdempotencyKey;
use crate::observability::get_metrics;

/// Default retention window.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Ledger record for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyEntry {
    /// `false` while a handler holds the claim, `true` once the side effect
    /// has been applied.
    pub processed: bool,
    pub recorded_at: DateTime<Utc>,
}

impl IdempotencyEntry {
    fn claimed(at: DateTime<Utc>) -> Self {
        Self {
            processed: false,
            recorded_at: at,
        }
    }

    fn processed(at: DateTime<Utc>) -> Self {
        Self {
            processed: true,
            recorded_at: at,
        }
    }
}

/// Age of a single entry at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryAge {
    pub key: IdempotencyKey,
    pub processed: bool,
    pub expired: bool,
    pub recorded_at: DateTime<Utc>,
    pub age_seconds: i64,
}

/// Diagnostic snapshot of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_entries: usize,
    pub live_entries: usize,
    pub retention_seconds: i64,
    /// Oldest first.
    pub entries: Vec<EntryAge>,
}

/// Process-local record of which provider events have been handled.
#[derive(Debug)]
pub struct IdempotencyLedger {
    entries: DashMap<IdempotencyKey, IdempotencyEntry>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl IdempotencyLedger {
    /// Creates a ledger on the system clock.
    pub fn new(retention: Duration) -> Result<Self> {
        Self::with_clock(retention, Arc::new(SystemClock))
    }

    pub fn with_clock(retention: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if retention <= Duration::zero() {
            return Err(AppError::Configuration(format!(
                "idempotency retention must be positive, got {} seconds",
                retention.num_seconds()
            )));
        }

        Ok(Self {
            entries: DashMap::new(),
            retention,
            clock,
        })
    }

    pub fn default_retention() -> Duration {
        Duration::hours(DEFAULT_RETENTION_HOURS)
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_live(&self, entry: &IdempotencyEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.recorded_at) < self.retention
    }

    /// Returns true if `key` was marked processed within the retention window.
    ///
    /// An expired entry found here is evicted. Claims that are still in flight
    /// report `false`; use [`Self::try_acquire`] to decide whether to act.
    pub fn is_processed(&self, key: &IdempotencyKey) -> bool {
        let now = self.clock.now();

        match self.entries.get(key) {
            None => return false,
            Some(entry) if self.is_live(entry.value(), now) => return entry.processed,
            Some(_) => {}
        }

        if self
            .entries
            .remove_if(key, |_, entry| !self.is_live(entry, now))
            .is_some()
        {
            tracing::debug!(key = %key, "Evicted expired idempotency entry on read");
            get_metrics().record_ledger_evictions(1);
        }
        false
    }

    /// Records `key` as processed, refreshing the timestamp if present.
    pub fn mark_processed(&self, key: &IdempotencyKey) {
        let now = self.clock.now();
        self.entries
            .insert(key.clone(), IdempotencyEntry::processed(now));
    }

    /// Atomically claims `key` if no live entry exists.
    ///
    /// Returns `true` only to the caller that wins; every other caller gets
    /// `false` until the entry is released or expires.
    pub fn try_acquire(&self, key: &IdempotencyKey) -> bool {
        self.acquire(key).is_some()
    }

    fn acquire(&self, key: &IdempotencyKey) -> Option<DateTime<Utc>> {
        let now = self.clock.now();

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if self.is_live(occupied.get(), now) {
                    return None;
                }
                occupied.insert(IdempotencyEntry::claimed(now));
                get_metrics().record_ledger_evictions(1);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(IdempotencyEntry::claimed(now));
            }
        }
        Some(now)
    }

    /// Claims `key` and returns a guard that releases it on drop unless
    /// committed.
    pub fn claim(&self, key: &IdempotencyKey) -> Option<LedgerClaim<'_>> {
        self.acquire(key).map(|claimed_at| LedgerClaim {
            ledger: self,
            key: key.clone(),
            claimed_at,
            settled: false,
        })
    }

    /// Drops an unprocessed claim on `key`. Processed entries are kept.
    pub fn release(&self, key: &IdempotencyKey) -> bool {
        self.entries
            .remove_if(key, |_, entry| !entry.processed)
            .is_some()
    }

    fn release_claim(&self, key: &IdempotencyKey, claimed_at: DateTime<Utc>) -> bool {
        self.entries
            .remove_if(key, |_, entry| {
                !entry.processed && entry.recorded_at == claimed_at
            })
            .is_some()
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;

        self.entries.retain(|_, entry| {
            let keep = self.is_live(entry, now);
            if !keep {
                evicted += 1;
            }
            keep
        });

        if evicted > 0 {
            get_metrics().record_ledger_evictions(evicted as u64);
        }
        evicted
    }

    pub fn stats(&self) -> LedgerStats {
        let now = self.clock.now();

        let mut entries: Vec<EntryAge> = self
            .entries
            .iter()
            .map(|item| {
                let entry = item.value();
                EntryAge {
                    key: item.key().clone(),
                    processed: entry.processed,
                    expired: !self.is_live(entry, now),
                    recorded_at: entry.recorded_at,
                    age_seconds: now.signed_duration_since(entry.recorded_at).num_seconds(),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then_with(|| a.key.cmp(&b.key)));

        LedgerStats {
            total_entries: entries.len(),
            live_entries: entries.iter().filter(|e| !e.expired).count(),
            retention_seconds: self.retention.num_seconds(),
            entries,
        }
    }
}

/// Held claim on an idempotency key.
///
/// Dropping the guard without calling [`LedgerClaim::commit`] releases the
/// key so a redelivery can be processed.
#[must_use = "dropping a claim releases it immediately"]
#[derive(Debug)]
pub struct LedgerClaim<'a> {
    ledger: &'a IdempotencyLedger,
    key: IdempotencyKey,
    claimed_at: DateTime<Utc>,
    settled: bool,
}

impl LedgerClaim<'_> {
    pub fn key(&self) -> &IdempotencyKey {
        &self.key
    }

    /// Marks the key processed.
    pub fn commit(mut self) {
        self.ledger.mark_processed(&self.key);
        self.settled = true;
    }

    /// Gives the key back without marking it processed.
    pub fn release(mut self) {
        self.ledger.release_claim(&self.key, self.claimed_at);
        self.settled = true;
    }
}

impl Drop for LedgerClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.ledger.release_claim(&self.key, self.claimed_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::clock::ManualClock;
    use crate::idempotency::key::EventSource;

    fn ledger_with_clock() -> (IdempotencyLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let ledger =
            IdempotencyLedger::with_clock(IdempotencyLedger::default_retention(), clock.clone())
                .unwrap();
        (ledger, clock)
    }

    fn key(id: &str) -> IdempotencyKey {
        IdempotencyKey::derive(EventSource::PaymentProvider, id, "paid")
    }

    #[test]
    fn test_rejects_non_positive_retention() {
        assert!(matches!(
            IdempotencyLedger::new(Duration::zero()),
            Err(AppError::Configuration(_))
        ));
        assert!(IdempotencyLedger::new(Duration::seconds(-5)).is_err());
    }

    #[test]
    fn test_mark_then_is_processed() {
        let (ledger, _) = ledger_with_clock();
        let k = key("ORDER-1");

        assert!(!ledger.is_processed(&k));
        ledger.mark_processed(&k);
        assert!(ledger.is_processed(&k));

        // Marking twice is harmless.
        ledger.mark_processed(&k);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_is_processed_evicts_expired() {
        let (ledger, clock) = ledger_with_clock();
        let k = key("ORDER-2");
        ledger.mark_processed(&k);

        clock.advance(Duration::hours(24));
        assert!(!ledger.is_processed(&k));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_mark_processed_refreshes_timestamp() {
        let (ledger, clock) = ledger_with_clock();
        let k = key("ORDER-3");
        ledger.mark_processed(&k);

        clock.advance(Duration::hours(20));
        ledger.mark_processed(&k);
        clock.advance(Duration::hours(20));

        assert!(ledger.is_processed(&k));
    }

    #[test]
    fn test_try_acquire_once() {
        let (ledger, _) = ledger_with_clock();
        let k = key("ORDER-4");

        assert!(ledger.try_acquire(&k));
        assert!(!ledger.try_acquire(&k));
        assert!(!ledger.is_processed(&k));

        ledger.mark_processed(&k);
        assert!(!ledger.try_acquire(&k));
    }

    #[test]
    fn test_release_only_drops_claims() {
        let (ledger, _) = ledger_with_clock();
        let claimed = key("ORDER-5");
        let done = key("ORDER-6");

        assert!(ledger.try_acquire(&claimed));
        ledger.mark_processed(&done);

        assert!(ledger.release(&claimed));
        assert!(!ledger.release(&done));
        assert!(ledger.try_acquire(&claimed));
        assert!(ledger.is_processed(&done));
    }

    #[test]
    fn test_claim_guard_releases_on_drop() {
        let (ledger, _) = ledger_with_clock();
        let k = key("ORDER-7");

        {
            let claim = ledger.claim(&k).expect("fresh key");
            assert_eq!(claim.key(), &k);
            assert!(ledger.claim(&k).is_none());
        }

        let claim = ledger.claim(&k).expect("released on drop");
        claim.commit();
        assert!(ledger.is_processed(&k));
        assert!(ledger.claim(&k).is_none());
    }

    #[test]
    fn test_stale_claim_release_keeps_newer_claim() {
        let (ledger, clock) = ledger_with_clock();
        let k = key("ORDER-8");

        let stale = ledger.claim(&k).unwrap();
        clock.advance(Duration::hours(25));
        assert!(ledger.try_acquire(&k));

        stale.release();
        assert!(!ledger.try_acquire(&k));
    }

    #[test]
    fn test_sweep_expired() {
        let (ledger, clock) = ledger_with_clock();
        ledger.mark_processed(&key("OLD-1"));
        ledger.mark_processed(&key("OLD-2"));
        clock.advance(Duration::hours(23));
        ledger.mark_processed(&key("NEW-1"));
        clock.advance(Duration::hours(2));

        assert_eq!(ledger.sweep_expired(), 2);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_processed(&key("NEW-1")));
        assert_eq!(ledger.sweep_expired(), 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let (ledger, clock) = ledger_with_clock();
        ledger.mark_processed(&key("A"));
        clock.advance(Duration::hours(2));
        assert!(ledger.try_acquire(&key("B")));
        clock.advance(Duration::minutes(30));

        let stats = ledger.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.live_entries, 2);
        assert_eq!(stats.retention_seconds, 86_400);
        assert_eq!(stats.entries[0].key, key("A"));
        assert_eq!(stats.entries[0].age_seconds, 9_000);
        assert!(stats.entries[0].processed);
        assert_eq!(stats.entries[1].age_seconds, 1_800);
        assert!(!stats.entries[1].processed);
    }
}
