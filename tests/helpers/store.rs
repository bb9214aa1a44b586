use gatehouse::policy::persist::{ConfigStore, JsonFileStore};
use gatehouse::policy::types::PolicyConfiguration;
use tempfile::TempDir;

/// File-backed settings store living in a temporary directory.
pub struct TestStore {
    pub store: JsonFileStore,
    _dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(dir.path().join("settings.json"), "gatehouse_options");
        Self { store, _dir: dir }
    }

    pub fn with(config: &PolicyConfiguration) -> Self {
        let test_store = Self::new();
        test_store
            .store
            .save(config)
            .expect("Failed to save configuration");
        test_store
    }
}
