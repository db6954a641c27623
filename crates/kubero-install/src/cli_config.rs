//! Kubero CLI configuration file
//!
//! The CLI reads `api.url` and `api.token` from `~/.config/kubero/config.toml`.
//! Other keys in that file belong to the CLI and are kept as they are.

use std::fs;
use std::path::PathBuf;

use kubero_provision::{CliConfigStore, Error, Result};
use toml::{Table, Value};

use crate::config::config_dir;

/// TOML-backed [`CliConfigStore`]
#[derive(Debug, Clone)]
pub struct TomlCliConfig {
    path: PathBuf,
}

impl TomlCliConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/kubero/config.toml`
    pub fn default_location() -> Self {
        Self::new(config_dir().join("config.toml"))
    }

    fn load(&self) -> Result<Table> {
        if !self.path.exists() {
            return Ok(Table::new());
        }
        let content = fs::read_to_string(&self.path)?;
        content.parse::<Table>().map_err(|e| {
            Error::validation(format!("{} is not valid TOML: {e}", self.path.display()))
        })
    }
}

impl CliConfigStore for TomlCliConfig {
    fn write(&self, url: &str, token: &str) -> Result<PathBuf> {
        let mut table = self.load()?;

        let api = table
            .entry("api")
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(api) = api else {
            return Err(Error::validation(format!(
                "'api' in {} is not a table",
                self.path.display()
            )));
        };
        api.insert("url".into(), Value::String(url.into()));
        api.insert("token".into(), Value::String(token.into()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&table)
            .map_err(|e| Error::validation(format!("serializing CLI config: {e}")))?;
        fs::write(&self.path, content)?;

        tracing::debug!(path = %self.path.display(), "CLI config written");
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_file_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlCliConfig::new(dir.path().join("kubero/config.toml"));

        let path = store.write("http://kubero.example.com", "tok").unwrap();

        let table: Table = fs::read_to_string(path).unwrap().parse().unwrap();
        assert_eq!(table["api"]["url"].as_str(), Some("http://kubero.example.com"));
        assert_eq!(table["api"]["token"].as_str(), Some("tok"));
    }

    #[test]
    fn test_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[api]\nurl = \"http://old\"\ntimeout = 30\n\n[defaults]\npipeline = \"web\"\n",
        )
        .unwrap();

        TomlCliConfig::new(&path).write("http://new", "t2").unwrap();

        let table: Table = fs::read_to_string(&path).unwrap().parse().unwrap();
        assert_eq!(table["api"]["url"].as_str(), Some("http://new"));
        assert_eq!(table["api"]["timeout"].as_integer(), Some(30));
        assert_eq!(table["defaults"]["pipeline"].as_str(), Some("web"));
    }

    #[test]
    fn test_rejects_non_table_api() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api = \"http://old\"\n").unwrap();

        assert!(TomlCliConfig::new(&path).write("http://new", "t").is_err());
    }
}
