use super::{RecordLog, StoreError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory record log.
///
/// Records are kept in serialized form so read-back behaves like the file log,
/// including per-record parse failures for lines injected with [`MemoryLog::push_raw`].
pub struct MemoryLog<T> {
    lines: Arc<RwLock<Vec<String>>>,
    fail_appends: Arc<AtomicBool>,
    _record: PhantomData<fn() -> T>,
}

impl<T> MemoryLog<T> {
    pub fn new() -> Self {
        Self {
            lines: Arc::new(RwLock::new(Vec::new())),
            fail_appends: Arc::new(AtomicBool::new(false)),
            _record: PhantomData,
        }
    }

    /// Makes subsequent appends fail with [`StoreError::Unavailable`].
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Appends a raw line without validation.
    pub async fn push_raw(&self, line: impl Into<String>) {
        self.lines.write().await.push(line.into());
    }

    pub async fn len(&self) -> usize {
        self.lines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lines.read().await.is_empty()
    }
}

impl<T> Default for MemoryLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoryLog<T> {
    fn clone(&self) -> Self {
        Self {
            lines: Arc::clone(&self.lines),
            fail_appends: Arc::clone(&self.fail_appends),
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T> RecordLog<T> for MemoryLog<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn append(&self, record: &T) -> Result<(), StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("appends disabled".to_string()));
        }
        let line =
            serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.lines.write().await.push(line);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Result<T, StoreError>>, StoreError> {
        let lines = self.lines.read().await;
        Ok(lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| StoreError::Malformed {
                    line: index + 1,
                    message: e.to_string(),
                })
            })
            .collect())
    }
}
