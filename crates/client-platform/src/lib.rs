//! Durable key/value storage backing the persisted client session.
//!
//! The model mirrors browser local storage: string keys, string values, and
//! removal of an absent key is not an error. Writes are applied as batches so a
//! multi-key session record never lands half-written.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("durable store unavailable: {0}")]
    Unavailable(String),
    #[error("durable store contents are corrupt: {0}")]
    Corrupt(String),
    #[error("durable store backend failure: {0}")]
    Backend(String),
}

/// One mutation inside a store batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Remove { key: String },
}

impl StoreOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Apply every operation or none of them.
    fn apply(&self, batch: &[StoreOp]) -> Result<(), StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(&[StoreOp::set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.apply(&[StoreOp::remove(key)])
    }
}

impl<T: DurableStore + ?Sized> DurableStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn apply(&self, batch: &[StoreOp]) -> Result<(), StoreError> {
        (**self).apply(batch)
    }
}

#[derive(Clone, Default, Debug)]
pub struct InMemoryDurableStore {
    data: Arc<RwLock<BTreeMap<String, String>>>,
}

impl InMemoryDurableStore {
    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DurableStore for InMemoryDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let data = self
            .data
            .read()
            .map_err(|_| StoreError::Backend("poisoned lock".to_owned()))?;
        Ok(data.get(key).cloned())
    }

    fn apply(&self, batch: &[StoreOp]) -> Result<(), StoreError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StoreError::Backend("poisoned lock".to_owned()))?;
        apply_batch(&mut data, batch);
        Ok(())
    }
}

/// JSON-file store: the whole key space lives in one object on disk.
///
/// Every batch rewrites the file through a temp file and rename, so a crash
/// leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileDurableStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDurableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "failed reading {}: {err}",
                    self.path.display()
                )));
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str::<BTreeMap<String, String>>(&raw).map_err(|err| {
            StoreError::Corrupt(format!("failed parsing {}: {err}", self.path.display()))
        })
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if data.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StoreError::Backend(format!(
                    "failed deleting {}: {err}",
                    self.path.display()
                ))),
            };
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                StoreError::Unavailable(format!(
                    "failed creating store directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let encoded =
            serde_json::to_vec_pretty(data).map_err(|err| StoreError::Backend(err.to_string()))?;
        let temp_path = temp_path_for(&self.path);
        fs::write(&temp_path, encoded).map_err(|err| {
            StoreError::Backend(format!(
                "failed writing temp store file {}: {err}",
                temp_path.display()
            ))
        })?;

        if let Err(rename_err) = fs::rename(&temp_path, &self.path) {
            // Windows does not allow replacing existing files via rename.
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    let _ = fs::remove_file(&temp_path);
                    return Err(StoreError::Backend(format!(
                        "failed replacing {} after rename error ({rename_err}): {err}",
                        self.path.display()
                    )));
                }
            }
            fs::rename(&temp_path, &self.path).map_err(|err| {
                let _ = fs::remove_file(&temp_path);
                StoreError::Backend(format!(
                    "failed writing {} after temp write: {err}",
                    self.path.display()
                ))
            })?;
        }

        Ok(())
    }
}

impl DurableStore for FileDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn apply(&self, batch: &[StoreOp]) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Backend("poisoned lock".to_owned()))?;
        let mut data = self.load()?;
        apply_batch(&mut data, batch);
        debug!(
            path = %self.path.display(),
            op_count = batch.len(),
            key_count = data.len(),
            "persisting durable store batch"
        );
        self.persist(&data)
    }
}

/// Prefixes every key with a namespace, e.g. `bondly_user`.
#[derive(Clone, Debug)]
pub struct ScopedDurableStore<S: DurableStore> {
    inner: S,
    namespace: String,
}

impl<S: DurableStore> ScopedDurableStore<S> {
    pub fn new(inner: S, namespace: impl Into<String>) -> Self {
        Self {
            inner,
            namespace: namespace.into(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}_{key}", self.namespace)
    }
}

impl<S: DurableStore> DurableStore for ScopedDurableStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(&self.scoped_key(key))
    }

    fn apply(&self, batch: &[StoreOp]) -> Result<(), StoreError> {
        let scoped = batch
            .iter()
            .map(|op| match op {
                StoreOp::Set { key, value } => StoreOp::set(self.scoped_key(key), value.clone()),
                StoreOp::Remove { key } => StoreOp::remove(self.scoped_key(key)),
            })
            .collect::<Vec<_>>();
        self.inner.apply(&scoped)
    }
}

fn apply_batch(data: &mut BTreeMap<String, String>, batch: &[StoreOp]) {
    for op in batch {
        match op {
            StoreOp::Set { key, value } => {
                data.insert(key.clone(), value.clone());
            }
            StoreOp::Remove { key } => {
                data.remove(key);
            }
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("session.json");
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    parent.join(format!(".{file_name}.{now_nanos}.tmp"))
}
