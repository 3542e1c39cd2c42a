//! Integration tests for Ratelane
//!
//! These tests verify end-to-end behavior of lanes, the admission queue and
//! the pacer together.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ratelane::classify::{OverloadPolicy, ProviderError};
use ratelane::config::Config;
use ratelane::domain::Priority;
use ratelane::lanes::ProviderLanes;
use ratelane::pacer::{AdaptivePacer, PacerConfig};
use ratelane::queue::{AdmissionQueue, QueueError};
use ratelane::retry::RetryPolicy;
use ratelane::simulate::{Provider, SimulatedProvider};
use tokio::sync::oneshot;

/// Keep the drain loop busy until the returned sender fires
async fn occupy(queue: &AdmissionQueue) -> oneshot::Sender<()> {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let _ticket = queue
        .submit(Priority::NORMAL, move || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok::<_, ProviderError>(())
        })
        .expect("Failed to submit blocker");
    started_rx.await.expect("Blocker never started");
    release_tx
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_mixed_priorities_with_rate_limit() {
    let pacer = Arc::new(AdaptivePacer::new(PacerConfig::default()).expect("Default pacer config is valid"));
    let queue = AdmissionQueue::with_pacer("primary", pacer.clone(), OverloadPolicy::default())
        .expect("Failed to spawn queue");
    let order = Arc::new(Mutex::new(Vec::new()));

    let release = occupy(&queue).await;

    let high = {
        let order = order.clone();
        queue
            .submit(Priority::HIGH, move || async move {
                order.lock().unwrap().push("high");
                Err::<&str, _>(ProviderError::from_status(429, "Too Many Requests", None))
            })
            .unwrap()
    };
    let low = {
        let order = order.clone();
        queue
            .submit(Priority::LOW, move || async move {
                order.lock().unwrap().push("low");
                Ok::<_, ProviderError>("low-result")
            })
            .unwrap()
    };
    let critical = {
        let order = order.clone();
        queue
            .submit(Priority::CRITICAL, move || async move {
                order.lock().unwrap().push("critical");
                Ok::<_, ProviderError>("critical-result")
            })
            .unwrap()
    };

    release.send(()).unwrap();

    assert_eq!(critical.await.unwrap(), "critical-result");
    match high.await {
        Err(QueueError::Operation(err)) => assert!(err.is_rate_limit()),
        other => panic!("expected rate limit, got {:?}", other),
    }
    assert_eq!(low.await.unwrap(), "low-result");

    assert_eq!(*order.lock().unwrap(), vec!["critical", "high", "low"]);

    // Grew exactly once, and the success right after did not undo it
    assert_eq!(pacer.current_delay().await, Duration::from_millis(600));

    let state = queue.state().await.unwrap();
    assert_eq!(state.stats.total_submitted, 4);
    assert_eq!(state.stats.total_settled(), 4);
    assert_eq!(state.stats.total_overloads, 1);
}

#[tokio::test(start_paused = true)]
async fn test_latency_grows_under_pressure_then_relaxes() {
    let config = Config::default();
    let queue = AdmissionQueue::for_provider(&config, "primary").expect("Failed to spawn queue");
    let api = Arc::new(SimulatedProvider::new("primary").with_overload_every(1));

    for n in 0..3 {
        let api = api.clone();
        let result = queue.run(Priority::NORMAL, move || async move { api.call(n).await }).await;
        assert!(result.is_err());
    }
    assert_eq!(queue.state().await.unwrap().current_delay, Duration::from_millis(2400));

    // Provider recovers; wait out the quiet period
    tokio::time::sleep(Duration::from_secs(6)).await;
    let calm = Arc::new(SimulatedProvider::new("primary"));
    let api = calm.clone();
    queue.run(Priority::NORMAL, move || async move { api.call(99).await }).await.unwrap();

    assert_eq!(queue.state().await.unwrap().current_delay, Duration::from_millis(1920));
}

#[tokio::test(start_paused = true)]
async fn test_low_priority_waits_behind_stream_of_critical() {
    let queue = AdmissionQueue::spawn(
        "starve",
        PacerConfig {
            base_ms: 1,
            ..Default::default()
        },
        OverloadPolicy::default(),
    )
    .expect("Failed to spawn queue");
    let order = Arc::new(Mutex::new(Vec::new()));
    let release = occupy(&queue).await;

    let low = {
        let order = order.clone();
        queue
            .submit(Priority::LOW, move || async move {
                order.lock().unwrap().push(Priority::LOW);
                Ok::<_, ProviderError>(())
            })
            .unwrap()
    };

    // Each critical item enqueues the next one while it runs
    fn chain(queue: AdmissionQueue, order: Arc<Mutex<Vec<Priority>>>, remaining: u32) {
        if remaining == 0 {
            return;
        }
        let next = queue.clone();
        let _ = queue.submit(Priority::CRITICAL, move || async move {
            order.lock().unwrap().push(Priority::CRITICAL);
            chain(next, order, remaining - 1);
            Ok::<_, ProviderError>(())
        });
    }
    chain(queue.clone(), order.clone(), 5);

    release.send(()).unwrap();
    low.await.unwrap();

    let order = order.lock().unwrap();
    assert_eq!(order.len(), 6);
    assert_eq!(order.last(), Some(&Priority::LOW));
    assert!(order[..5].iter().all(|p| *p == Priority::CRITICAL));
}

#[tokio::test(start_paused = true)]
async fn test_every_submission_settles_once() {
    let queue = AdmissionQueue::spawn(
        "settle",
        PacerConfig {
            base_ms: 1,
            ..Default::default()
        },
        OverloadPolicy::default(),
    )
    .expect("Failed to spawn queue");
    let api = Arc::new(SimulatedProvider::new("settle").with_overload_every(3));

    let mut tickets = Vec::new();
    for n in 0..30u64 {
        let api = api.clone();
        tickets.push(
            queue
                .submit((n % 7) as i32 + 1, move || async move { api.call(n).await })
                .unwrap(),
        );
    }

    let mut ok = 0;
    let mut failed = 0;
    for ticket in tickets {
        match ticket.await {
            Ok(_) => ok += 1,
            Err(QueueError::Operation(_)) => failed += 1,
            Err(other) => panic!("unexpected queue error: {}", other),
        }
    }

    assert_eq!(ok + failed, 30);
    assert_eq!(failed, 10);
    assert_eq!(api.calls(), 30);

    let state = queue.state().await.unwrap();
    assert_eq!(state.stats.total_succeeded, 20);
    assert_eq!(state.stats.total_failed, 10);
    assert_eq!(state.stats.total_overloads, 10);
}

// =============================================================================
// Lanes and retry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_through_lane() {
    let lanes = ProviderLanes::new(Config::default());
    let queue = lanes.lane("primary").await.expect("Failed to open lane");
    let api = Arc::new(SimulatedProvider::new("primary").with_overload_every(2));

    // Call 1 succeeds, call 2 is limited, its retry (call 3) succeeds
    let first = {
        let api = api.clone();
        queue.run(Priority::HIGH, move || async move { api.call(1).await }).await
    };
    assert!(first.is_ok());

    let policy = lanes.retry_policy("primary");
    let api_for_retry = api.clone();
    let second = policy
        .run(&queue, Priority::HIGH, move || {
            let api = api_for_retry.clone();
            async move { api.call(2).await }
        })
        .await
        .unwrap();

    assert_eq!(second, "primary#2");
    assert_eq!(api.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_provider_uses_default_lane_settings() {
    let lanes = ProviderLanes::new(Config::default());
    let queue = lanes.lane("some-new-api").await.expect("Failed to open lane");
    assert_eq!(queue.name(), "primary");

    let policy: RetryPolicy = lanes.retry_policy("some-new-api");
    assert_eq!(policy.max_retries, 3);
}
