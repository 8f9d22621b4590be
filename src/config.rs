use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "QUESTION_IMAGES_API_URL";

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn default_export_dir() -> PathBuf {
    match home_dir() {
        Some(home) => home.join("Downloads"),
        None => PathBuf::from("."),
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Where exported PDFs are written.
    #[serde(default = "default_export_dir")]
    pub directory: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 800,
            height: 600,
            min_width: 400,
            min_height: 300,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: default_export_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        let mut config = if config_path.exists() {
            match Self::read(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("{:#}. Using defaults.", e);
                    Config::default()
                }
            }
        } else {
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            Config::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }

        tracing::debug!(path = %config_path.display(), base_url = %config.api.base_url, "loaded config");
        config
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Error reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Error parsing {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        match home_dir() {
            Some(home) => home.join(".config/question-images"),
            None => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "http://10.0.0.5:5000"

            [window]
            width = 1200
            height = 900
            min_width = 600
            min_height = 400

            [export]
            directory = "/tmp/pdfs"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://10.0.0.5:5000");
        assert_eq!(config.window.width, 1200);
        assert_eq!(config.export.directory, PathBuf::from("/tmp/pdfs"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::parse("[api]\n").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.window.height, 600);
        assert!(config.export.directory.ends_with("Downloads") || config.export.directory == PathBuf::from("."));
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(Config::parse("[window]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn test_read_reports_path() {
        let err = Config::read(Path::new("/nonexistent/question-images/config.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/question-images/config.toml"));
    }
}
