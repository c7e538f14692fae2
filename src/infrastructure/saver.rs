use crate::domain::{Metric, MetricValue, StoragePtr, WireMetric};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};

/// Writes full storage snapshots to a newline-delimited JSON file and
/// replays them at startup.
///
/// The saver only goes through the storage contract: it reads with
/// `get_all` and writes with `set_gauge`/`set_counter`.
pub struct StorageSaver {
    // ---
    storage: StoragePtr,
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl StorageSaver {
    // ---
    /// Opens `path` for read/write, creating it if absent.
    pub async fn open(storage: StoragePtr, path: impl AsRef<Path>) -> Result<Self> {
        // ---
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .with_context(|| format!("failed to open snapshot file {}", path.display()))?;

        Ok(Self {
            storage,
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replays every record in the file into storage.
    ///
    /// Counters accumulate on replay, so storage must be empty beforehand.
    /// Returns the number of records applied.
    pub async fn load(&self) -> Result<usize> {
        // ---
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(0)).await?;

        let mut lines = BufReader::new(&mut *file).lines();
        let mut applied = 0;
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let record: WireMetric = serde_json::from_str(&line)
                .with_context(|| format!("{}:{line_no}: malformed record", self.path.display()))?;
            let metric = Metric::try_from(record)
                .with_context(|| format!("{}:{line_no}: invalid record", self.path.display()))?;

            match metric.value {
                MetricValue::Gauge(v) => self.storage.set_gauge(&metric.name, v).await?,
                MetricValue::Counter(d) => self.storage.set_counter(&metric.name, d).await?,
            }
            applied += 1;
        }

        tracing::info!(path = %self.path.display(), applied, "Restored metrics from snapshot");
        Ok(applied)
    }

    /// Replaces the file contents with the current storage snapshot.
    /// Returns the number of records written.
    pub async fn save(&self) -> Result<usize> {
        // ---
        // The file lock is held across the read, so concurrent saves write
        // in the order their snapshots were taken.
        let mut file = self.file.lock().await;
        let snapshot = self.storage.get_all().await?;

        let mut buf = Vec::with_capacity(snapshot.len() * 48);
        for record in snapshot.to_wire() {
            serde_json::to_writer(&mut buf, &record)?;
            buf.push(b'\n');
        }

        file.set_len(0).await?;
        file.seek(SeekFrom::Start(0)).await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        file.sync_data().await?;

        tracing::debug!(path = %self.path.display(), records = snapshot.len(), "Snapshot saved");
        Ok(snapshot.len())
    }
}

/// When to run the saver after an update.
///
/// A zero interval saves after every update. Otherwise a save is due at most
/// once per interval.
#[derive(Debug)]
pub struct SavePolicy {
    // ---
    interval: Duration,
    last_save: Mutex<Instant>,
}

impl SavePolicy {
    // ---
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_save: Mutex::new(Instant::now()),
        }
    }

    /// Returns true if the caller should save now. A positive answer
    /// reserves the current window, so concurrent callers do not both save.
    pub fn claim_due(&self) -> bool {
        // ---
        if self.interval.is_zero() {
            return true;
        }

        let mut last_save = self.last_save.lock();
        if last_save.elapsed() < self.interval {
            return false;
        }

        *last_save = Instant::now();
        true
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::MetricsStorage;
    use crate::infrastructure::storage::MemStorage;
    use std::sync::Arc;

    async fn seeded() -> Arc<MemStorage> {
        // ---
        let storage = Arc::new(MemStorage::new());
        storage.set_gauge("Alloc", 1.5).await.unwrap();
        storage.set_counter("PollCount", 7).await.unwrap();
        storage
    }

    #[tokio::test]
    async fn save_writes_one_record_per_line() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let saver = StorageSaver::open(seeded().await, &path).await.unwrap();

        assert_eq!(saver.save().await.unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"id":"Alloc","type":"gauge","value":1.5}"#,
                r#"{"id":"PollCount","type":"counter","delta":7}"#,
            ]
        );
    }

    #[tokio::test]
    async fn save_replaces_previous_contents() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, "stale stale stale stale stale stale stale stale\n".repeat(20)).unwrap();

        let saver = StorageSaver::open(seeded().await, &path).await.unwrap();
        saver.save().await.unwrap();
        saver.save().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn load_restores_exact_values_into_empty_storage() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        StorageSaver::open(seeded().await, &path)
            .await
            .unwrap()
            .save()
            .await
            .unwrap();

        let fresh = Arc::new(MemStorage::new());
        let saver = StorageSaver::open(fresh.clone(), &path).await.unwrap();
        assert_eq!(saver.load().await.unwrap(), 2);

        assert_eq!(fresh.get_gauge("Alloc").await.unwrap(), Some(1.5));
        assert_eq!(fresh.get_counter("PollCount").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn load_of_new_file_is_empty() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(MemStorage::new());
        let saver = StorageSaver::open(storage.clone(), dir.path().join("new.json"))
            .await
            .unwrap();

        assert_eq!(saver.load().await.unwrap(), 0);
        assert!(storage.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_reports_line_of_bad_record() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, "{\"id\":\"a\",\"type\":\"gauge\",\"value\":1}\n\nnot json\n").unwrap();

        let saver = StorageSaver::open(Arc::new(MemStorage::new()), &path).await.unwrap();
        let err = saver.load().await.unwrap_err();
        assert!(err.to_string().contains(":3:"), "{err:#}");
    }

    /// Storage whose first `get_all` stalls after reading until released.
    struct StalledRead {
        inner: MemStorage,
        stalled: std::sync::atomic::AtomicBool,
        reached: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl MetricsStorage for StalledRead {
        async fn get_gauge(&self, name: &str) -> Result<Option<f64>> {
            self.inner.get_gauge(name).await
        }
        async fn get_counter(&self, name: &str) -> Result<Option<i64>> {
            self.inner.get_counter(name).await
        }
        async fn get_many(&self, keys: &crate::domain::MetricKeys) -> Result<crate::domain::MetricsSnapshot> {
            self.inner.get_many(keys).await
        }
        async fn get_all(&self) -> Result<crate::domain::MetricsSnapshot> {
            // ---
            let snapshot = self.inner.get_all().await?;
            if !self.stalled.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            Ok(snapshot)
        }
        async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
            self.inner.set_gauge(name, value).await
        }
        async fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
            self.inner.set_counter(name, delta).await
        }
        async fn set_many(&self, items: &crate::domain::MetricsSnapshot) -> Result<()> {
            self.inner.set_many(items).await
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn overlapping_saves_leave_the_newest_snapshot() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let storage = Arc::new(StalledRead {
            inner: MemStorage::new(),
            stalled: Default::default(),
            reached: Default::default(),
            release: Default::default(),
        });
        storage.set_counter("c", 1).await.unwrap();
        let saver = Arc::new(StorageSaver::open(storage.clone(), &path).await.unwrap());

        let older = tokio::spawn({
            let saver = saver.clone();
            async move { saver.save().await }
        });
        storage.reached.notified().await;

        storage.set_counter("c", 1).await.unwrap();
        let newer = tokio::spawn({
            let saver = saver.clone();
            async move { saver.save().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        storage.release.notify_one();
        older.await.unwrap().unwrap();
        newer.await.unwrap().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), r#"{"id":"c","type":"counter","delta":2}"#);
    }

    #[test]
    fn zero_interval_is_always_due() {
        // ---
        let policy = SavePolicy::new(Duration::ZERO);
        assert!(policy.claim_due());
        assert!(policy.claim_due());
    }

    #[test]
    fn interval_throttles_saves() {
        // ---
        let policy = SavePolicy::new(Duration::from_millis(50));
        assert!(!policy.claim_due());

        std::thread::sleep(Duration::from_millis(60));
        assert!(policy.claim_due());
        assert!(!policy.claim_due());
    }
}
