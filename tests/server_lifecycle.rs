mod common;

use std::sync::Arc;

use prometrics::labels::labels_from;
use prometrics::metrics::MetricRegistry;
use prometrics::startup::{MetricsServer, register_self_metrics};

use common::load_test_config;

#[tokio::test]
async fn integration_listen_scrape_stop() {
    let registry = Arc::new(MetricRegistry::new());
    register_self_metrics(&registry).unwrap();
    registry
        .register_collector(
            "queue_depth",
            labels_from([("queue", "default")]),
            "Jobs waiting in the queue",
            |_| 7.0,
        )
        .unwrap();

    let mut server = MetricsServer::new(Arc::new(load_test_config()), registry);
    let addr = server.listen().await.expect("server should bind");
    assert_eq!(server.local_addr(), Some(addr));
    // Listening twice keeps the first listener.
    assert_eq!(server.listen().await.unwrap(), addr);

    let body = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .expect("scrape request failed")
        .text()
        .await
        .unwrap();
    assert!(body.contains("queue_depth{queue=\"default\"} 7"));
    assert!(body.contains("prometrics_registered_metrics 3"));

    server.stop_listen().await.expect("server should stop");
    assert_eq!(server.local_addr(), None);
    assert!(reqwest::get(format!("http://{}/health", addr)).await.is_err());

    // Stopping an idle server is a no-op.
    server.stop_listen().await.unwrap();
}
