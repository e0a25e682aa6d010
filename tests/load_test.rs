//! Load testing for the load-balancing proxy.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_round_robin_distribution_under_load() {
    let (b1, hits1) = common::start_counting_backend("b1").await;
    let (b2, hits2) = common::start_counting_backend("b2").await;
    let (b3, hits3) = common::start_counting_backend("b3").await;

    let (proxy_addr, shutdown, pool) = common::start_proxy(common::proxy_config(&[b1, b2, b3])).await;

    let concurrency = 10;
    let requests_per_task = 30;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}", proxy_addr);
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let res = client.get(&url).send().await.unwrap();
                assert!(res.status().is_success());
                latencies.push(req_start.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies: Vec<Duration> = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }
    let duration = start.elapsed();

    assert_eq!(all_latencies.len(), total_requests);
    assert_eq!(hits1.load(Ordering::SeqCst), 100);
    assert_eq!(hits2.load(Ordering::SeqCst), 100);
    assert_eq!(hits3.load(Ordering::SeqCst), 100);

    for snapshot in pool.snapshot() {
        assert_eq!(snapshot.selections, 100);
        assert_eq!(snapshot.successes, 100);
        assert_eq!(snapshot.timeouts + snapshot.connection_failures, 0);
    }

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", total_requests as f64 / duration.as_secs_f64());
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    shutdown.trigger();
}
