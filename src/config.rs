// ⚙️ App Config - where the data lives and which two brands are compared

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Governance tables (SQLite, WAL)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Submission ledger JSON
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,

    #[serde(default = "default_brand_a")]
    pub brand_a: String,

    #[serde(default = "default_brand_b")]
    pub brand_b: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_brand_a() -> String {
    "TMH".to_string()
}

fn default_brand_b() -> String {
    "Raymond".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: default_data_dir(),
            database_path: None,
            ledger_path: None,
            brand_a: default_brand_a(),
            brand_b: default_brand_b(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Point every derived path at another data directory
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    /// Defaults to `<data_dir>/governance.db`
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("governance.db"))
    }

    /// Defaults to `<data_dir>/financial/submissions.json`
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("financial").join("submissions.json"))
    }

    pub fn brands(&self) -> [&str; 2] {
        [&self.brand_a, &self.brand_b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database_path(), PathBuf::from("data/governance.db"));
        assert_eq!(config.ledger_path(), PathBuf::from("data/financial/submissions.json"));
        assert_eq!(config.brands(), ["TMH", "Raymond"]);
    }

    #[test]
    fn test_partial_file_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harmonize.json");
        fs::write(&path, r#"{ "brand_b": "Northwind", "ledger_path": "/tmp/ledger.json" }"#).unwrap();

        let config = AppConfig::load_or_default(&path)
            .unwrap()
            .with_data_dir(PathBuf::from("/srv/data"));

        assert_eq!(config.brand_a, "TMH");
        assert_eq!(config.brand_b, "Northwind");
        assert_eq!(config.database_path(), PathBuf::from("/srv/data/governance.db"));
        assert_eq!(config.ledger_path(), PathBuf::from("/tmp/ledger.json"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = AppConfig::load_or_default("/nonexistent/harmonize.json").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
