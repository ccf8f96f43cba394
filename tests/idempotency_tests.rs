mod common;

use grounds_webhooks::idempotency::{EventSource, IdempotencyKey, IdempotencyLedger, ManualClock};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Barrier;

fn payment_key(order_id: &str) -> IdempotencyKey {
    IdempotencyKey::derive(EventSource::PaymentProvider, order_id, "paid")
}

#[test]
fn test_try_acquire_true_once_per_window() {
    let (ledger, clock) = common::manual_ledger();
    let key = payment_key("ORDER-1");

    assert!(ledger.try_acquire(&key));
    ledger.mark_processed(&key);

    for _ in 0..5 {
        clock.advance(common::hours(4));
        assert!(!ledger.try_acquire(&key));
    }
}

#[test]
fn test_expiry_is_reversible() {
    let (ledger, clock) = common::manual_ledger();
    let key = payment_key("ORDER-2");

    assert!(ledger.try_acquire(&key));
    ledger.mark_processed(&key);

    clock.advance(common::hours(24));
    assert!(!ledger.is_processed(&key));
    assert!(ledger.try_acquire(&key));
    assert!(!ledger.try_acquire(&key));
}

#[test]
fn test_boundary_just_inside_window() {
    let (ledger, clock) = common::manual_ledger();
    let key = payment_key("ORDER-3");
    ledger.mark_processed(&key);

    clock.advance(common::hours(24) - chrono::Duration::seconds(1));
    assert!(ledger.is_processed(&key));
    assert!(!ledger.try_acquire(&key));
}

#[test]
fn test_independent_ledgers_do_not_share_state() {
    let (first, _) = common::manual_ledger();
    let (second, _) = common::manual_ledger();
    let key = payment_key("ORDER-4");

    assert!(first.try_acquire(&key));
    assert!(second.try_acquire(&key));
}

#[test]
fn test_derive_key_injective_over_fixture_ids() {
    let sources = [EventSource::PaymentProvider, EventSource::ShippingProvider];
    let ids = ["ORDER-1", "ORDER-10", "ORDER-1:0", "SHIP-9", "SHIP:9", "a%3Ab"];
    let statuses = ["paid", "failed", "refunded", "shipped", "delivered", "a:b"];

    let mut keys = HashSet::new();
    for source in sources {
        for id in ids {
            for status in statuses {
                let key = IdempotencyKey::derive(source, id, status);
                assert_eq!(key, IdempotencyKey::derive(source, id, status));
                keys.insert(key);
            }
        }
    }
    assert_eq!(keys.len(), sources.len() * ids.len() * statuses.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_try_acquire_single_winner() {
    for n in [2usize, 16, 128] {
        let ledger = Arc::new(
            IdempotencyLedger::new(IdempotencyLedger::default_retention()).unwrap(),
        );
        let key = payment_key(&format!("ORDER-RACE-{}", n));
        let barrier = Arc::new(Barrier::new(n));

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let ledger = ledger.clone();
                let key = key.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    ledger.try_acquire(&key)
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "expected exactly one winner for n = {}", n);
    }
}

#[test]
fn test_concurrent_try_acquire_on_os_threads() {
    let ledger = IdempotencyLedger::with_clock(
        IdempotencyLedger::default_retention(),
        Arc::new(ManualClock::new(common::test_start())),
    )
    .unwrap();
    let key = IdempotencyKey::derive(EventSource::ShippingProvider, "SHIP-9", "delivered");
    let barrier = std::sync::Barrier::new(32);

    let winners = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..32)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    ledger.try_acquire(&key)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count()
    });

    assert_eq!(winners, 1);
}

#[test]
fn test_stats_reports_entry_ages() {
    let (ledger, clock) = common::manual_ledger();
    ledger.mark_processed(&payment_key("ORDER-A"));
    clock.advance(common::hours(1));
    assert!(ledger.try_acquire(&payment_key("ORDER-B")));
    clock.advance(common::hours(24));

    let stats = ledger.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.live_entries, 0);
    assert_eq!(stats.entries[0].age_seconds, 25 * 3600);
    assert!(stats.entries.iter().all(|e| e.expired));

    assert_eq!(ledger.sweep_expired(), 2);
    assert_eq!(ledger.stats().total_entries, 0);
}
