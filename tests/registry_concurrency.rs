use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use prometrics::labels::{Labels, labels_from};
use prometrics::metrics::{MetricRegistry, gather};

const WORKERS: usize = 8;
const ROUNDS: usize = 200;

#[test]
fn concurrent_lifecycle_with_scrape_loop() {
    let registry = Arc::new(MetricRegistry::new());
    let stop = Arc::new(AtomicBool::new(false));

    let scraper = {
        let registry = registry.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut scrapes = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let families = gather(&registry);
                for family in &families {
                    assert!(!family.get_metric().is_empty());
                }
                prometrics::metrics::render(&registry).expect("render must not fail");
                scrapes += 1;
            }
            scrapes
        })
    };

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let registry = registry.clone();
            thread::spawn(move || {
                let gauge = format!("worker_{}_events", worker);
                let collector_labels = labels_from([("worker", &*worker.to_string())]);
                for round in 0..ROUNDS {
                    registry
                        .register_gauge(&gauge, &["kind"], "Events per worker")
                        .unwrap();
                    registry
                        .increment(&gauge, &labels_from([("kind", "tick")]))
                        .unwrap();
                    registry
                        .register_collector(
                            "worker_round",
                            collector_labels.clone(),
                            "Current round per worker",
                            move |_| round as f64,
                        )
                        .unwrap();
                    if round % 2 == 0 {
                        assert!(registry.unregister(&gauge));
                        assert!(registry.unregister_collector("worker_round", &collector_labels));
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }
    stop.store(true, Ordering::SeqCst);
    let scrapes = scraper.join().expect("scraper panicked");
    assert!(scrapes > 0);

    // The last round is odd, so every worker ends with a fresh gauge and its collector.
    assert_eq!(registry.len(), WORKERS * 2);
    for worker in 0..WORKERS {
        let gauge = format!("worker_{}_events", worker);
        assert_eq!(
            registry.gauge_value(&gauge, &labels_from([("kind", "tick")])),
            Some(1.0)
        );
    }
}

#[test]
fn removed_handle_is_never_reported_by_a_later_scrape() {
    let registry = Arc::new(MetricRegistry::new());

    for round in 0..100 {
        let labels = labels_from([("round", &*round.to_string())]);
        registry
            .register_collector("ephemeral", labels.clone(), "Short lived", |_| 1.0)
            .unwrap();
        assert!(registry.unregister_collector("ephemeral", &labels));

        let reported: HashSet<String> = gather(&registry)
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(!reported.contains("ephemeral"));
    }
}

#[test]
fn racing_registrations_of_one_key_insert_exactly_once() {
    let registry = Arc::new(MetricRegistry::new());

    let inserted: usize = (0..16)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                registry
                    .register_collector("shared", Labels::new(), "Shared", |_| 1.0)
                    .unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().expect("registration panicked"))
        .filter(|inserted| *inserted)
        .count();

    assert_eq!(inserted, 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_increment_disjoint_series() {
    let registry = Arc::new(MetricRegistry::new());
    registry
        .register_gauge("requests", &["method"], "Requests seen")
        .unwrap();

    let tasks: Vec<_> = ["GET", "POST", "PUT", "DELETE"]
        .into_iter()
        .map(|method| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let labels = labels_from([("method", method)]);
                for _ in 0..250 {
                    registry.increment("requests", &labels).unwrap();
                }
            })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.expect("task panicked");
    }

    for method in ["GET", "POST", "PUT", "DELETE"] {
        assert_eq!(
            registry.gauge_value("requests", &labels_from([("method", method)])),
            Some(250.0)
        );
    }
}
