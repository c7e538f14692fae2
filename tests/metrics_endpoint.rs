use metrics_relay::infrastructure::{create_noop_telemetry, create_prom_telemetry};
use std::sync::Arc;

mod common;
use common::TestServer;

// NOTE: The Prometheus recorder is process-global. Every server in this
// binary that uses it shares one registry, so assertions only check for
// presence, never exact counts.

#[tokio::test]
async fn prometheus_exporter_tracks_requests_and_updates() {
    // ---
    let server = TestServer::start(None, create_prom_telemetry().unwrap()).await;

    for path in ["/update/counter/PollCount/1", "/update/gauge/Alloc/3.5"] {
        let res = server.client.post(server.url(path)).send().await.unwrap();
        assert!(res.status().is_success());
    }
    server.client.get(server.url("/ping")).send().await.unwrap();

    let res = server.client.get(server.url("/metrics")).send().await.unwrap();
    assert!(res.status().is_success());

    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "{content_type}");

    let body = res.text().await.unwrap();
    assert!(body.contains("http_requests_total"), "{body}");
    assert!(body.contains(r#"path="/update/{kind}/{name}/{value}""#), "{body}");
    assert!(body.contains(r#"metric_updates_total{kind="counter"}"#), "{body}");
    assert!(body.contains(r#"metric_updates_total{kind="gauge"}"#), "{body}");
}

#[tokio::test]
async fn noop_exporter_serves_empty_body() {
    // ---
    let server = TestServer::start(None, create_noop_telemetry().unwrap()).await;
    server.client.get(server.url("/ping")).send().await.unwrap();

    let res = server.client.get(server.url("/metrics")).send().await.unwrap();
    assert!(res.status().is_success());
    assert!(res.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn metrics_endpoint_survives_load() {
    // ---
    let server = Arc::new(TestServer::start(None, create_prom_telemetry().unwrap()).await);

    let futures = (0..30).map(|i| {
        let server = Arc::clone(&server);
        async move {
            let res = match i % 3 {
                0 => server.client.post(server.url(&format!("/update/counter/load/{i}"))).send().await,
                1 => server.client.get(server.url("/")).send().await,
                _ => server.client.get(server.url("/metrics")).send().await,
            };
            res.map(|res| res.status())
        }
    });

    let statuses = futures::future::join_all(futures).await;
    for (i, status) in statuses.into_iter().enumerate() {
        let status = status.unwrap_or_else(|err| panic!("Request {i} failed: {err}"));
        assert!(status.is_success(), "Request {i} returned {status}");
    }

    // 0 + 3 + ... + 27
    assert_eq!(server.value("counter", "load").await.unwrap(), "135");
}
