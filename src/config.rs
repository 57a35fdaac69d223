//! Configuration file handling.
//!
//! The configuration file is stored at `$FINSYNC_HOME/config.json`. It names the backend, the
//! account the session works with, the storage engine for the mirror and the outbox, and backup
//! settings.

use crate::backup::Backup;
use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::store::{Storage, StorageMode};
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "finsync";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CURRENCY: &str = "RUB";
const SECRETS: &str = ".secrets";
const BACKUPS: &str = ".backups";
const TOKEN: &str = "token";
const CONFIG_JSON: &str = "config.json";
const CACHE_JSON: &str = "cache.json";

/// The configuration of the app. It is instantiated from the path to `$FINSYNC_HOME`, from which
/// it loads `config.json`, and it provides the paths of everything else kept in that directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

/// The settings passed to `Config::create`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InitSettings {
    pub base_url: String,
    pub account_id: i64,
    pub currency: Option<String>,
    pub storage: StorageMode,
}

impl Config {
    /// Creates the data directory and its subdirectories, writes an initial `config.json` and
    /// initializes the configured storage backend.
    pub async fn create(dir: impl Into<PathBuf>, settings: InitSettings) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the finsync home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if utils::exists(&config_path).await? {
            bail!("A config file already exists at {}", config_path.display());
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        let config_file = ConfigFile {
            base_url: settings.base_url,
            account_id: settings.account_id,
            currency: settings
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            storage: settings.storage,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let config = Self {
            root,
            backups,
            secrets,
            config_path,
            config_file,
        };
        config
            .open_storage()
            .await
            .context("Unable to initialize local storage")?;
        Ok(config)
    }

    /// - Validates that `home` and its config file exist
    /// - Loads the config file
    /// - Validates that the backups and secrets directories exist
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::read(home.into()).await.pub_result(ErrorType::Config)
    }

    async fn read(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The finsync home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            backups: root.join(BACKUPS),
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join(CACHE_JSON)
    }

    pub fn base_url(&self) -> &str {
        &self.config_file.base_url
    }

    pub fn account_id(&self) -> i64 {
        self.config_file.account_id
    }

    /// The currency given to placeholder account snapshots.
    pub fn currency(&self) -> &str {
        &self.config_file.currency
    }

    pub fn storage(&self) -> StorageMode {
        self.config_file.storage
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.request_timeout_secs)
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves it against the root.
    pub fn token_path(&self) -> PathBuf {
        let p = self.config_file.token_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }

    /// Reads the bearer token. A missing token file means requests are sent without
    /// authorization.
    pub async fn token(&self) -> Res<Option<String>> {
        let path = self.token_path();
        if !utils::exists(&path).await? {
            return Ok(None);
        }
        let token = utils::read(&path).await?.trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }

    /// Opens the storage backend this config selects.
    pub async fn open_storage(&self) -> Res<Storage> {
        Storage::open(&self.root, self.storage()).await
    }

    /// Opens a backend other than the configured one, e.g. as a migration target.
    pub async fn open_storage_as(&self, mode: StorageMode) -> Res<Storage> {
        Storage::open(&self.root, mode).await
    }

    /// Changes the configured storage mode and saves the config file.
    pub async fn set_storage(&mut self, mode: StorageMode) -> Res<()> {
        self.config_file.storage = mode;
        self.config_file.save(&self.config_path).await
    }
}

/// The serialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finsync",
///   "config_version": 1,
///   "base_url": "https://api.example.com/v1/",
///   "account_id": 1,
///   "currency": "RUB",
///   "storage": "sqlite",
///   "request_timeout_secs": 30,
///   "backup_copies": 5,
///   "token_path": ".secrets/token"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, always "finsync"
    app_name: String,

    config_version: u8,

    /// Root URL of the backend; endpoint paths are joined onto it
    base_url: String,

    account_id: i64,

    #[serde(default = "default_currency")]
    currency: String,

    #[serde(default)]
    storage: StorageMode,

    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// Path to the bearer token file, relative to the home directory or absolute.
    /// Defaults to $FINSYNC_HOME/.secrets/token if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: String::new(),
            account_id: 0,
            currency: default_currency(),
            storage: StorageMode::default(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            backup_copies: BACKUP_COPIES,
            token_path: None,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Unsupported config_version {} (this build supports up to {})",
            config.config_version,
            CONFIG_VERSION
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        utils::serialize(path.as_ref(), self)
            .await
            .context("Unable to write config file")
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(storage: StorageMode) -> InitSettings {
        InitSettings {
            base_url: "https://api.example.com/v1/".to_string(),
            account_id: 1,
            currency: None,
            storage,
        }
    }

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("finsync_home");
        let config = Config::create(&home, settings(StorageMode::Sqlite))
            .await
            .unwrap();

        assert!(config.backups().is_dir());
        assert!(config.secrets().is_dir());
        assert!(config.root().join(crate::db::SQLITE_FILE).is_file());
        assert_eq!(config.currency(), DEFAULT_CURRENCY);

        let loaded = Config::load(&home).await.unwrap();
        assert_eq!(loaded.base_url(), "https://api.example.com/v1/");
        assert_eq!(loaded.account_id(), 1);
        assert_eq!(loaded.storage(), StorageMode::Sqlite);
        assert_eq!(loaded.request_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), settings(StorageMode::Json))
            .await
            .unwrap();
        assert!(Config::create(dir.path(), settings(StorageMode::Json))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_load_missing_home_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path().join("nope")).await.is_err());
        assert!(Config::load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_set_storage_persists() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::create(dir.path(), settings(StorageMode::Json))
            .await
            .unwrap();
        config.set_storage(StorageMode::Sqlite).await.unwrap();
        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(loaded.storage(), StorageMode::Sqlite);
    }

    #[tokio::test]
    async fn test_token() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), settings(StorageMode::Json))
            .await
            .unwrap();
        assert_eq!(config.token().await.unwrap(), None);
        utils::write(config.token_path(), "secret-token\n")
            .await
            .unwrap();
        assert_eq!(
            config.token().await.unwrap().as_deref(),
            Some("secret-token")
        );
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        let json = r#"{
            "app_name": "finsync",
            "config_version": 1,
            "base_url": "http://localhost:8080/",
            "account_id": 3
        }"#;
        utils::write(&path, json).await.unwrap();

        let config = ConfigFile::load(&path).await.unwrap();
        assert_eq!(config.account_id, 3);
        assert_eq!(config.storage, StorageMode::Sqlite);
        assert_eq!(config.backup_copies, BACKUP_COPIES);
        assert_eq!(config.token_path(), PathBuf::from(SECRETS).join(TOKEN));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        let json = r#"{
            "app_name": "wrong_app",
            "config_version": 1,
            "base_url": "http://localhost/",
            "account_id": 1
        }"#;
        utils::write(&path, json).await.unwrap();

        let err = ConfigFile::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("token_path"));
        assert!(json.contains("\"storage\":\"sqlite\""));
    }
}
