use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::policy::errors::StoreError;
use crate::policy::types::PolicyConfiguration;

/// Durable home of the [`PolicyConfiguration`]. Every decision loads a
/// fresh copy; every administrative change saves the whole value.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<PolicyConfiguration, StoreError>;
    fn save(&self, config: &PolicyConfiguration) -> Result<(), StoreError>;

    /// Load, transform and save as one step. No other write to the store
    /// can interleave between the load and the save.
    fn update(
        &self,
        apply: &mut dyn FnMut(&PolicyConfiguration) -> PolicyConfiguration,
    ) -> Result<PolicyConfiguration, StoreError>;
}

/// Serializes read-modify-write cycles on settings files within the process.
static FILE_WRITE_LOCK: Mutex<()> = Mutex::new(());

fn file_write_guard() -> MutexGuard<'static, ()> {
    // The lock guards no data, so a poisoned guard is still usable.
    FILE_WRITE_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key-value settings file: a JSON object mapping option keys to
/// configuration documents. Several deployments can share one file under
/// different keys.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    key: String,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Corrupt(format!(
                "`{}` does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    /// Merge `config` under this store's key and replace the file. Callers
    /// hold the file write lock.
    fn write_locked(&self, config: &PolicyConfiguration) -> Result<(), StoreError> {
        let mut document = self.read_document()?;
        document.insert(self.key.clone(), serde_json::to_value(config)?);
        let body = serde_json::to_string_pretty(&Value::Object(document))?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        // Write aside and rename so readers never observe a partial document.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(body.as_bytes()).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::info!(
            path = %self.path.display(),
            key = %self.key,
            restricted = config.global.restricted_roles().len(),
            assignments = config.assignments().len(),
            "Saved policy configuration"
        );
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<PolicyConfiguration, StoreError> {
        let mut document = self.read_document()?;
        match document.remove(&self.key) {
            Some(value) => Ok(serde_json::from_value::<PolicyConfiguration>(value)?.sanitized()),
            None => Ok(PolicyConfiguration::default()),
        }
    }

    fn save(&self, config: &PolicyConfiguration) -> Result<(), StoreError> {
        let _guard = file_write_guard();
        self.write_locked(config)
    }

    fn update(
        &self,
        apply: &mut dyn FnMut(&PolicyConfiguration) -> PolicyConfiguration,
    ) -> Result<PolicyConfiguration, StoreError> {
        let _guard = file_write_guard();
        let next = apply(&self.load()?);
        self.write_locked(&next)?;
        Ok(next)
    }
}

/// In-process store for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<PolicyConfiguration>,
}

impl MemoryStore {
    pub fn new(config: PolicyConfiguration) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<PolicyConfiguration, StoreError> {
        self.inner
            .read()
            .map(|c| c.clone())
            .map_err(|_| StoreError::Unavailable)
    }

    fn save(&self, config: &PolicyConfiguration) -> Result<(), StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Unavailable)?;
        *guard = config.clone();
        Ok(())
    }

    fn update(
        &self,
        apply: &mut dyn FnMut(&PolicyConfiguration) -> PolicyConfiguration,
    ) -> Result<PolicyConfiguration, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Unavailable)?;
        let next = apply(&*guard);
        *guard = next.clone();
        Ok(next)
    }
}
