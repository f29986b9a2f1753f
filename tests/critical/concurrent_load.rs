//! Phase 4 (P0): admission control under concurrent load.
//! Racing requests must not stretch the per-minute budget, and one client's
//! burst must not eat into another's.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tubedown_core::limit::RateLimiter;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn p0_rate_limiter_admits_exactly_the_budget_under_load() {
    let limiter = Arc::new(RateLimiter::per_minute(10));
    let admitted = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..40 {
        let limiter = Arc::clone(&limiter);
        let admitted = Arc::clone(&admitted);
        tasks.push(tokio::spawn(async move {
            if limiter.admit("203.0.113.7") {
                admitted.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for task in tasks {
        task.await.expect("admit task");
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn p0_rate_limiter_keeps_client_budgets_separate_under_load() {
    let limiter = Arc::new(RateLimiter::per_minute(10));
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for n in 0..60 {
        let limiter = Arc::clone(&limiter);
        let counter = if n % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        let client = if n % 2 == 0 { "198.51.100.1" } else { "198.51.100.2" };
        tasks.push(tokio::spawn(async move {
            if limiter.admit(client) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for task in tasks {
        task.await.expect("admit task");
    }

    assert_eq!(first.load(Ordering::SeqCst), 10, "first client budget");
    assert_eq!(second.load(Ordering::SeqCst), 10, "second client budget");
}
