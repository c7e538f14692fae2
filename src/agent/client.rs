use crate::backoff::{Backoff, RetryableError};
use crate::domain::MetricsSnapshot;
use crate::shutdown::Shutdown;
use crate::signer::{Signer, SIGNATURE_HEADER};
use anyhow::{anyhow, bail, Result};
use bytes::Bytes;
use flate2::{write::GzEncoder, Compression};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Pending reports held between the report loop and the workers.
pub const QUEUE_CAPACITY: usize = 256;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One queued delivery: the gzipped batch plus the signature of the
/// uncompressed JSON.
#[derive(Debug, Clone)]
struct Job {
    payload: Bytes,
    signature: Option<String>,
}

/// Everything a worker needs to deliver a job.
struct Delivery {
    http: reqwest::Client,
    url: String,
    backoff: Backoff,
    shutdown: Shutdown,
}

/// Buffered delivery of metric batches to `POST /updates`.
///
/// `report_all` serializes, signs and compresses a snapshot, then queues it.
/// A fixed pool of workers drains the queue. Failed deliveries are retried on
/// connection errors, then logged and dropped.
pub struct MetricsClient {
    // ---
    jobs: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    signer: Option<Signer>,
    shutdown: Shutdown,
}

impl MetricsClient {
    // ---
    /// Starts `workers` delivery tasks targeting `http://{address}/updates`.
    pub fn new(address: &str, signer: Option<Signer>, workers: usize, shutdown: Shutdown) -> Result<Self> {
        Self::with_backoff(address, signer, workers, shutdown, Backoff::standard())
    }

    pub fn with_backoff(
        address: &str,
        signer: Option<Signer>,
        workers: usize,
        shutdown: Shutdown,
        backoff: Backoff,
    ) -> Result<Self> {
        // ---
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let delivery = Arc::new(Delivery {
            http,
            url: format!("http://{address}/updates"),
            backoff,
            shutdown: shutdown.clone(),
        });

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|id| tokio::spawn(worker(id, rx.clone(), delivery.clone())))
            .collect();

        Ok(Self {
            jobs: Some(tx),
            workers,
            signer,
            shutdown,
        })
    }

    /// Queues the whole snapshot as one batch. Empty snapshots are skipped.
    ///
    /// Waits while the queue is full. Gives up with an error if shutdown
    /// fires before there is room.
    pub async fn report_all(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        // ---
        if snapshot.is_empty() {
            return Ok(());
        }

        let json = serde_json::to_vec(&snapshot.to_wire())?;
        let signature = self.signer.as_ref().map(|signer| signer.sign(&json));
        let job = Job {
            payload: Bytes::from(gzip(&json)?),
            signature,
        };

        let Some(jobs) = &self.jobs else {
            bail!("metrics client is closed");
        };

        tokio::select! {
            biased;
            sent = jobs.send(job) => sent.map_err(|_| anyhow!("delivery workers have stopped")),
            _ = self.shutdown.wait() => Err(anyhow!("shutting down, report of {} metrics dropped", snapshot.len())),
        }
    }

    /// Stops accepting reports and waits for the workers to drain the queue.
    /// Later reports fail.
    pub async fn close(&mut self) {
        // ---
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                tracing::error!("Delivery worker panicked: {err}");
            }
        }
    }
}

async fn worker(id: usize, jobs: Arc<Mutex<mpsc::Receiver<Job>>>, delivery: Arc<Delivery>) {
    // ---
    loop {
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let result = delivery
            .backoff
            .retry_until(delivery.shutdown.wait(), || send_once(&delivery, &job))
            .await;

        if let Err(err) = result {
            tracing::error!(worker = id, "Report dropped: {err:#}");
        }
    }

    tracing::debug!(worker = id, "Delivery worker stopped");
}

async fn send_once(delivery: &Delivery, job: &Job) -> Result<()> {
    // ---
    let mut request = delivery
        .http
        .post(&delivery.url)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_ENCODING, "gzip")
        .body(job.payload.clone());

    if let Some(signature) = &job.signature {
        request = request.header(SIGNATURE_HEADER, signature);
    }

    let response = request.send().await.map_err(|err| {
        if err.is_connect() {
            RetryableError::wrap(err)
        } else {
            anyhow::Error::new(err)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("server answered {status}: {}", body.trim());
    }

    tracing::debug!(%status, "Report delivered");
    Ok(())
}

fn gzip(plain: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(plain)?;
    Ok(encoder.finish()?)
}
