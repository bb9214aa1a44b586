use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::GateError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub site: Site,
    pub store: Store,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Public base URL of the site; redirect paths are joined onto it
    pub url: String,
    /// Path prefixes of background API calls that must never be redirected
    #[serde(default = "default_async_prefixes")]
    pub async_prefixes: Vec<String>,
}

fn default_async_prefixes() -> Vec<String> {
    vec!["/admin-ajax".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// JSON settings file holding the policy configuration
    pub path: PathBuf,
    /// Key of this deployment's configuration inside the settings file
    pub option_key: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

impl Default for Site {
    fn default() -> Self {
        Self {
            url: "http://localhost".to_string(),
            async_prefixes: default_async_prefixes(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/gatehouse.json"),
            option_key: "gatehouse_options".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, GateError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)?
            .set_default("server.port", Server::default().port)?
            .set_default("site.url", Site::default().url)?
            .set_default("site.async_prefixes", Site::default().async_prefixes)?
            .set_default(
                "store.path",
                Store::default().path.to_string_lossy().to_string(),
            )?
            .set_default("store.option_key", Store::default().option_key)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: GATEHOUSE__SERVER__PORT=9090, etc.
        builder = builder.add_source(config::Environment::with_prefix("GATEHOUSE").separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        // Normalize store path to be relative to current dir
        if s.store.path.is_relative() {
            s.store.path = std::env::current_dir()?.join(&s.store.path);
        }

        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_settings_load_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.server.port, 8090);
        assert_eq!(settings.site.url, "http://localhost");
        assert_eq!(settings.site.async_prefixes, vec!["/admin-ajax"]);
        assert!(settings.store.path.is_absolute());
        assert!(settings.store.path.ends_with("data/gatehouse.json"));
    }

    #[test]
    fn test_settings_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[server]
host = "127.0.0.1"
port = 9191

[site]
url = "https://blog.example.com"
async_prefixes = ["/wp-admin/admin-ajax.php", "/wp-json"]

[store]
path = "/var/lib/gatehouse/options.json"
option_key = "rbts_admin_bar_control_options"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.site.url, "https://blog.example.com");
        assert_eq!(
            settings.site.async_prefixes,
            vec!["/wp-admin/admin-ajax.php", "/wp-json"]
        );
        assert_eq!(
            settings.store.path,
            PathBuf::from("/var/lib/gatehouse/options.json")
        );
        assert_eq!(settings.store.option_key, "rbts_admin_bar_control_options");
    }

    #[test]
    fn test_settings_env_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[site]
url = "https://file.example"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        env::set_var("GATEHOUSE__SERVER__HOST", "192.168.1.1");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        // File values survive where the environment is silent
        assert_eq!(settings.site.url, "https://file.example");
        assert_eq!(settings.server.host, "192.168.1.1");

        env::remove_var("GATEHOUSE__SERVER__HOST");
    }
}
