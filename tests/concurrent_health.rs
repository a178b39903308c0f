//! Concurrent health mutation safety
//!
//! Many logical requests report outcomes for the same endpoints at once;
//! every increment must survive (no read-modify-write races losing updates).

use std::sync::Arc;
use steadyroute::{EndpointConfig, FailoverPolicy, FailoverRouter, UpstreamFailure};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_lose_no_increments() {
    const TASKS: usize = 100;

    let router = Arc::new(FailoverRouter::new());
    // High threshold keeps the endpoint selectable while counters accumulate.
    router
        .register_with_policy(
            "g",
            vec![
                EndpointConfig::new("http://a:8080/v1"),
                EndpointConfig::new("http://b:8080/v1"),
            ],
            FailoverPolicy::default().failure_threshold(1_000),
        )
        .await
        .unwrap();

    let selection = router.select("g").await.unwrap();
    assert_eq!(selection.index(), 0);

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let router = router.clone();
            let selection = selection.clone();
            tokio::spawn(async move {
                router
                    .record_failure(&selection, &UpstreamFailure::http(500, "boom"))
                    .await;
            })
        })
        .collect();
    futures::future::join_all(handles).await;

    let statuses = router.health_snapshot("g").await.unwrap();
    assert_eq!(statuses[0].health().consecutive_failures(), TASKS as u32);
    assert_eq!(statuses[0].health().total_failure_count(), TASKS as u32);
    assert!(statuses[0].health().is_healthy(), "threshold not reached");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executes_are_isolated() {
    const TASKS: usize = 50;

    let router = Arc::new(FailoverRouter::new());
    router
        .register(
            "g",
            vec![
                EndpointConfig::new("http://a:8080/v1"),
                EndpointConfig::new("http://b:8080/v1"),
            ],
        )
        .await
        .unwrap();

    // The primary rejects every request; the fallback serves them all. No
    // ordering is promised between tasks; the router just has to stay
    // internally consistent and keep serving.
    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .execute("g", move |endpoint| async move {
                        if endpoint.url().starts_with("http://a") {
                            Err(UpstreamFailure::http(503, "down"))
                        } else {
                            Ok(endpoint.url().to_string())
                        }
                    })
                    .await
            })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        let routed = handle
            .expect("task must not panic")
            .expect("every request has a healthy fallback");
        assert_eq!(routed.response(), "http://b:8080/v1");
    }

    // Invariant check after the storm: the fallback served everything and
    // carries no consecutive failures; the primary stays demoted.
    let statuses = router.health_snapshot("g").await.unwrap();
    assert!(!statuses[0].health().is_healthy());
    assert!(statuses[0].health().consecutive_failures() >= 1);
    assert!(statuses[1].health().is_healthy());
    assert_eq!(statuses[1].health().consecutive_failures(), 0);
}
