// Test helpers are intentionally partially used
#![allow(dead_code)]

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use metrics_relay::domain::{StoragePtr, TelemetryPtr};
use metrics_relay::infrastructure::{create_noop_telemetry, MemStorage};
use metrics_relay::{create_router, AppState, Signer};
use reqwest::Client;
use std::io::{Read, Write};
use std::sync::{Arc, Once};
use tokio::net::TcpListener;

// ============================================================================
// Test Setup
// ============================================================================

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness; `RUST_LOG` filters it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A collector server on an ephemeral port, backed by in-memory storage.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
    pub storage: StoragePtr,
}

impl TestServer {
    // ---
    pub async fn new() -> Self {
        Self::start(None, create_noop_telemetry().unwrap()).await
    }

    /// Server that verifies and signs bodies with `key`.
    pub async fn signed(key: &str) -> Self {
        Self::start(Signer::new(key), create_noop_telemetry().unwrap()).await
    }

    pub async fn start(signer: Option<Signer>, telemetry: TelemetryPtr) -> Self {
        // ---
        init_tracing();

        let storage: StoragePtr = Arc::new(MemStorage::new());
        let app = create_router(AppState::new(storage.clone(), telemetry), signer);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            storage,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Plain-text body of `GET /value/{kind}/{name}`, or the status on failure.
    pub async fn value(&self, kind: &str, name: &str) -> Result<String, reqwest::StatusCode> {
        // ---
        let res = self
            .client
            .get(self.url(&format!("/value/{kind}/{name}")))
            .send()
            .await
            .unwrap();

        match res.status() {
            reqwest::StatusCode::OK => Ok(res.text().await.unwrap()),
            status => Err(status),
        }
    }
}

// ============================================================================
// Body helpers
// ============================================================================

pub fn gzip(plain: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plain).unwrap();
    encoder.finish().unwrap()
}

pub fn gunzip(packed: &[u8]) -> Vec<u8> {
    let mut plain = Vec::new();
    GzDecoder::new(packed).read_to_end(&mut plain).unwrap();
    plain
}
