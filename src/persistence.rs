use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::model::Booking;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable home for the booking list. Saves always carry the full list.
#[async_trait]
pub trait BookingPersistence: Send + Sync {
    async fn save(&self, bookings: &[Booking]) -> Result<(), PersistError>;
    async fn load(&self) -> Result<Vec<Booking>, PersistError>;
}

/// Single JSON document on disk.
///
/// Saves write `<path>.tmp`, fsync it, then rename over `path`, so a crash
/// mid-save leaves the previous document intact.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut s: OsString = self.path.as_os_str().to_owned();
        s.push(".tmp");
        PathBuf::from(s)
    }
}

#[async_trait]
impl BookingPersistence for JsonFileStore {
    async fn save(&self, bookings: &[Booking]) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(bookings)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp_path = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// A missing or blank file loads as no bookings.
    async fn load(&self) -> Result<Vec<Booking>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Keeps the last saved list in memory. Useful for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryPersistence {
    saved: Mutex<Vec<Booking>>,
    saves: AtomicU64,
}

impl MemoryPersistence {
    pub fn new(initial: Vec<Booking>) -> Self {
        Self {
            saved: Mutex::new(initial),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of completed saves.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<Booking> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl BookingPersistence for MemoryPersistence {
    async fn save(&self, bookings: &[Booking]) -> Result<(), PersistError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = bookings.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Booking>, PersistError> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use std::fs;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("roombook_test_persistence");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn sample() -> Vec<Booking> {
        let t = Utc.with_ymd_and_hms(2030, 3, 4, 10, 0, 0).unwrap();
        let mut cancelled = Booking::new(
            Ulid::new(),
            RoomId::from("CR002"),
            Span::new(t, t + TimeDelta::minutes(45)),
            BookingStatus::Approved,
            t - TimeDelta::days(2),
        );
        cancelled.transition(BookingStatus::Cancelled, t - TimeDelta::days(1)).unwrap();
        vec![
            Booking::new(
                Ulid::new(),
                RoomId::from("CR001"),
                Span::new(t, t + TimeDelta::hours(1)),
                BookingStatus::Approved,
                t - TimeDelta::days(1),
            ),
            cancelled,
            Booking::new(
                Ulid::new(),
                RoomId::from("CR001"),
                Span::new(t + TimeDelta::hours(2), t + TimeDelta::hours(3)),
                BookingStatus::Pending,
                t - TimeDelta::hours(5),
            ),
        ]
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let path = tmp_path("roundtrip.json");
        let store = JsonFileStore::new(&path);
        let bookings = sample();

        store.save(&bookings).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, bookings);

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn document_uses_strings_and_iso_timestamps() {
        let path = tmp_path("format.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample()).await.unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""status": "Approved""#));
        assert!(text.contains(r#""status": "Cancelled""#));
        assert!(text.contains("2030-03-04T10:00:00Z"));
        assert!(!store.tmp_path().exists());

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn save_overwrites_previous_document() {
        let path = tmp_path("overwrite.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample()).await.unwrap();
        store.save(&[]).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let path = tmp_path("missing.json");
        let store = JsonFileStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_blank_file_is_empty() {
        let path = tmp_path("blank.json");
        fs::write(&path, "  \n").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn load_corrupt_file_is_an_error() {
        let path = tmp_path("corrupt.json");
        fs::write(&path, "[{\"id\": 12").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load().await, Err(PersistError::Json(_))));
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn save_creates_parent_directory() {
        let dir = std::env::temp_dir().join("roombook_test_persistence").join("nested_parent");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("bookings.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn memory_persistence_counts_saves() {
        let mem = MemoryPersistence::default();
        assert_eq!(mem.saves(), 0);
        mem.save(&sample()).await.unwrap();
        assert_eq!(mem.saves(), 1);
        assert_eq!(mem.load().await.unwrap().len(), 3);
    }
}
