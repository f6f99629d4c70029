//! Configuration for voxnote paths and service endpoints.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VOXNOTE_HOME, VOXNOTE_SPEECH_URL,
//!    VOXNOTE_LANGUAGE_URL, VOXNOTE_API_KEY)
//! 2. Config file (.voxnote/config.yaml)
//! 3. Defaults (~/.voxnote, local service endpoints)
//!
//! Config file discovery:
//! - Searches current directory and parents for .voxnote/config.yaml
//! - Paths in the config file are relative to the config file's parent

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub services: Option<ServicesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to config file)
    pub home: Option<String>,
    /// Drop folder watched for new audio clips
    pub drop_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfig {
    pub speech_url: Option<String>,
    pub language_url: Option<String>,
    pub language_model: Option<String>,
    pub api_key: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to voxnote home (engine state)
    pub home: PathBuf,
    /// Drop folder watched for new audio clips
    pub drop_dir: PathBuf,
    /// Speech-to-text endpoint (multipart)
    pub speech_url: String,
    /// Language-understanding endpoint (chat completions)
    pub language_url: String,
    /// Model name sent to the language endpoint
    pub language_model: String,
    /// Bearer token for both services, if any
    pub api_key: Option<String>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// The blob-store database file
    pub fn db_path(&self) -> PathBuf {
        self.home.join("voxnote.db")
    }
}

fn default_speech_url() -> String {
    "http://127.0.0.1:8080/transcribe".to_string()
}

fn default_language_url() -> String {
    "http://127.0.0.1:8080/v1/chat/completions".to_string()
}

fn default_language_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".voxnote").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".voxnote");

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // Home: env > file > default
    let home = if let Ok(env_home) = std::env::var("VOXNOTE_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home_str)) = (
        config_file.as_deref(),
        file.as_ref().and_then(|f| f.paths.home.as_deref()),
    ) {
        let base = path.parent().unwrap_or(Path::new("."));
        resolve_path(base, home_str)
    } else {
        default_home
    };

    // Drop folder: file > default (home/inbox)
    let drop_dir = if let (Some(path), Some(drop_str)) = (
        config_file.as_deref(),
        file.as_ref().and_then(|f| f.paths.drop_dir.as_deref()),
    ) {
        let base = path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(base, drop_str)
    } else {
        home.join("inbox")
    };

    let services = file.as_ref().and_then(|f| f.services.clone()).unwrap_or_default();

    let speech_url = std::env::var("VOXNOTE_SPEECH_URL")
        .ok()
        .or(services.speech_url)
        .unwrap_or_else(default_speech_url);

    let language_url = std::env::var("VOXNOTE_LANGUAGE_URL")
        .ok()
        .or(services.language_url)
        .unwrap_or_else(default_language_url);

    let language_model = std::env::var("VOXNOTE_LANGUAGE_MODEL")
        .ok()
        .or(services.language_model)
        .unwrap_or_else(default_language_model);

    let api_key = std::env::var("VOXNOTE_API_KEY").ok().or(services.api_key);

    Ok(ResolvedConfig {
        home,
        drop_dir,
        speech_url,
        language_url,
        language_model,
        api_key,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let voxnote_dir = temp.path().join(".voxnote");
        std::fs::create_dir_all(&voxnote_dir).unwrap();

        let config_path = voxnote_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
  drop_dir: ../recordings
services:
  speech_url: https://stt.example.com/transcribe
  language_model: small-instruct
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./".to_string()));
        assert_eq!(config.paths.drop_dir, Some("../recordings".to_string()));

        let services = config.services.unwrap();
        assert_eq!(
            services.speech_url,
            Some("https://stt.example.com/transcribe".to_string())
        );
        assert_eq!(services.language_model, Some("small-instruct".to_string()));
        assert_eq!(services.api_key, None);
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            resolve_path(&base, "./clips"),
            PathBuf::from("/home/user/project/clips")
        );
    }

    #[test]
    fn test_default_endpoints() {
        assert!(default_speech_url().ends_with("/transcribe"));
        assert!(default_language_url().ends_with("/chat/completions"));
    }
}
