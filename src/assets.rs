//! Config loading with an embedded fallback
//!
//! - If `CONFIG_FILE` is NOT set: use the embedded config.yaml (no filesystem access)
//! - If `CONFIG_FILE` IS set and the file is missing: seed it with the embedded default
//! - If `CONFIG_FILE` IS set and the file exists: read it from disk

use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Embedded default config
#[derive(RustEmbed)]
#[folder = "."]
#[include = "config.yaml"]
struct EmbeddedConfig;

const CONFIG_NAME: &str = "config.yaml";

/// Report of init (extraction) operations
#[derive(Debug, Default)]
pub struct InitReport {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
}

/// Where the active configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
    /// `CONFIG_FILE` points at a file that does not exist yet
    Missing(PathBuf),
}

pub struct AssetLoader {
    /// External config file path (from CONFIG_FILE env var)
    config_file: Option<PathBuf>,
}

impl AssetLoader {
    /// `config_file` should be `Some` only if the env var was set.
    pub fn new(config_file: Option<PathBuf>) -> Self {
        Self { config_file }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("CONFIG_FILE").ok().map(PathBuf::from))
    }

    pub fn config_source(&self) -> ConfigSource {
        match &self.config_file {
            Some(path) if path.exists() => ConfigSource::File(path.clone()),
            Some(path) => ConfigSource::Missing(path.clone()),
            None => ConfigSource::Embedded,
        }
    }

    /// Read the config file, falling back to the embedded default.
    pub fn read_config(&self) -> io::Result<Cow<'static, [u8]>> {
        if let Some(ref path) = self.config_file {
            if path.exists() {
                tracing::trace!(path = %path.display(), "Loading config from filesystem");
                return Ok(Cow::Owned(fs::read(path)?));
            }
        }

        Self::embedded()
            .map(|data| {
                tracing::trace!("Loading config from embedded assets");
                data
            })
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Embedded config.yaml not found")
            })
    }

    pub fn read_config_string(&self) -> io::Result<String> {
        let bytes = self.read_config()?;
        String::from_utf8(bytes.into_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write the embedded default to `CONFIG_FILE` if it is set but missing.
    ///
    /// Returns true when a file was written.
    pub fn seed_if_configured(&self) -> io::Result<bool> {
        let Some(ref path) = self.config_file else {
            return Ok(false);
        };
        if path.exists() {
            return Ok(false);
        }
        let Some(data) = Self::embedded() else {
            return Ok(false);
        };
        Self::write_file(path, &data)?;
        tracing::info!(path = %path.display(), "Seeded config file with embedded default");
        Ok(true)
    }

    /// Extract the embedded config (init command).
    ///
    /// Uses `CONFIG_FILE` if set, otherwise `./config.yaml`.
    pub fn init(&self, force: bool) -> io::Result<InitReport> {
        let mut report = InitReport::default();
        let path = self
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("./{CONFIG_NAME}")));

        if !force && path.exists() {
            report.skipped.push(path.display().to_string());
            return Ok(report);
        }
        if let Some(data) = Self::embedded() {
            Self::write_file(&path, &data)?;
            report.written.push(path.display().to_string());
        }
        Ok(report)
    }

    pub fn list_embedded() -> Vec<String> {
        EmbeddedConfig::iter().map(|s| s.to_string()).collect()
    }

    fn embedded() -> Option<Cow<'static, [u8]>> {
        EmbeddedConfig::get(CONFIG_NAME).map(|f| f.data)
    }

    fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_config_present() {
        let loader = AssetLoader::new(None);
        let content = loader.read_config_string().unwrap();
        assert!(content.contains("bind_addr"));
        assert_eq!(loader.config_source(), ConfigSource::Embedded);
        assert_eq!(AssetLoader::list_embedded(), vec!["config.yaml".to_string()]);
    }

    #[test]
    fn test_external_config_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server:\n  bind_addr: \"127.0.0.1:1\"\n").unwrap();

        let loader = AssetLoader::new(Some(path.clone()));
        assert!(loader.read_config_string().unwrap().contains("127.0.0.1:1"));
        assert_eq!(loader.config_source(), ConfigSource::File(path));
    }

    #[test]
    fn test_missing_external_config_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");
        let loader = AssetLoader::new(Some(path.clone()));

        assert_eq!(loader.config_source(), ConfigSource::Missing(path));
        assert!(loader.read_config_string().unwrap().contains("bind_addr"));
    }

    #[test]
    fn test_seed_writes_missing_file_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let loader = AssetLoader::new(Some(path.clone()));

        assert!(loader.seed_if_configured().unwrap());
        assert!(path.exists());
        assert!(!loader.seed_if_configured().unwrap());
    }

    #[test]
    fn test_seed_without_env_is_noop() {
        assert!(!AssetLoader::new(None).seed_if_configured().unwrap());
    }

    #[test]
    fn test_init_skips_existing_unless_forced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "custom").unwrap();
        let loader = AssetLoader::new(Some(path.clone()));

        let report = loader.init(false).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom");

        let report = loader.init(true).unwrap();
        assert_eq!(report.written.len(), 1);
        assert!(fs::read_to_string(&path).unwrap().contains("bind_addr"));
    }
}
