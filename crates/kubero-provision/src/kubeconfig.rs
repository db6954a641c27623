//! Kubeconfig merging
//!
//! Credentials of a freshly provisioned cluster are folded into the
//! user's kubeconfig. The merge only ever adds or replaces entries by
//! name; clusters, users and contexts that the incoming document does not
//! mention are left as they were.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A kubeconfig document
///
/// Only the named lists and the current context are interpreted; every
/// other top-level key is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clusters: Vec<NamedEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<NamedEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<NamedEntry>,
    #[serde(
        rename = "current-context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_context: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An entry of `clusters`, `users` or `contexts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub name: String,
    #[serde(flatten)]
    pub body: BTreeMap<String, Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn upsert(entries: &mut Vec<NamedEntry>, incoming: Vec<NamedEntry>) {
    for entry in incoming {
        match entries.iter_mut().find(|e| e.name == entry.name) {
            Some(slot) => *slot = entry,
            None => entries.push(entry),
        }
    }
}

impl Kubeconfig {
    /// An empty `v1` `Config` document
    pub fn empty() -> Self {
        Self {
            api_version: Some("v1".into()),
            kind: Some("Config".into()),
            clusters: vec![],
            users: vec![],
            contexts: vec![],
            current_context: None,
            extra: BTreeMap::new(),
        }
    }

    /// Parse a kubeconfig document
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(bytes).map_err(|e| Error::kubeconfig(e.to_string()))
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Fold `incoming` into `self`.
    ///
    /// Same-named entries are replaced by the incoming ones, new entries are
    /// appended and the current context becomes the incoming one.
    pub fn merge(&mut self, incoming: Kubeconfig) {
        upsert(&mut self.clusters, incoming.clusters);
        upsert(&mut self.users, incoming.users);
        upsert(&mut self.contexts, incoming.contexts);
        self.current_context = incoming.current_context;
    }

    pub fn cluster(&self, name: &str) -> Option<&NamedEntry> {
        self.clusters.iter().find(|e| e.name == name)
    }

    pub fn user(&self, name: &str) -> Option<&NamedEntry> {
        self.users.iter().find(|e| e.name == name)
    }

    pub fn context(&self, name: &str) -> Option<&NamedEntry> {
        self.contexts.iter().find(|e| e.name == name)
    }
}

/// Merge a raw incoming document into `existing`.
///
/// Fails only when `incoming` cannot be parsed.
pub fn merge(mut existing: Kubeconfig, incoming: &[u8]) -> Result<Kubeconfig> {
    let incoming = Kubeconfig::parse(incoming)?;
    existing.merge(incoming);
    Ok(existing)
}

/// The kubeconfig file on disk
#[derive(Debug, Clone)]
pub struct KubeconfigStore {
    path: PathBuf,
}

impl KubeconfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// First entry of `$KUBECONFIG`, else `~/.kube/config`
    pub fn default_location() -> Result<Self> {
        let from_env = std::env::var_os("KUBECONFIG")
            .and_then(|paths| std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()));

        let path = match from_env {
            Some(path) => path,
            None => dirs::home_dir()
                .map(|home| home.join(".kube").join("config"))
                .ok_or_else(|| Error::kubeconfig("cannot determine home directory"))?,
        };
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current document; a missing or blank file is an empty config
    pub fn load(&self) -> Result<Kubeconfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no kubeconfig yet");
            return Ok(Kubeconfig::empty());
        }

        let raw = fs::read(&self.path)?;
        if raw.trim_ascii().is_empty() {
            return Ok(Kubeconfig::empty());
        }
        Kubeconfig::parse(&raw)
    }

    /// Write the document, creating `~/.kube` when needed
    pub fn save(&self, config: &Kubeconfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, config.to_yaml()?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Read-modify-write: merge `incoming` into the stored document
    pub fn merge_in(&self, incoming: &[u8]) -> Result<Kubeconfig> {
        let incoming = Kubeconfig::parse(incoming)?;
        let mut existing = self.load()?;
        existing.merge(incoming);
        self.save(&existing)?;

        info!(
            path = %self.path.display(),
            current_context = existing.current_context.as_deref().unwrap_or(""),
            "kubeconfig updated"
        );
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING: &str = r"
apiVersion: v1
kind: Config
preferences: {}
clusters:
- name: prod
  cluster:
    server: https://prod.example.com
- name: shared
  cluster:
    server: https://old.example.com
users:
- name: prod-admin
  user:
    token: prod-token
contexts:
- name: prod
  context:
    cluster: prod
    user: prod-admin
current-context: prod
";

    const INCOMING: &str = r"
apiVersion: v1
kind: Config
clusters:
- name: kind-kubero
  cluster:
    server: https://127.0.0.1:6443
- name: shared
  cluster:
    server: https://new.example.com
users:
- name: kind-kubero
  user:
    client-certificate-data: Y2VydA==
contexts:
- name: kind-kubero
  context:
    cluster: kind-kubero
    user: kind-kubero
current-context: kind-kubero
";

    fn server(config: &Kubeconfig, name: &str) -> String {
        config.cluster(name).unwrap().body["cluster"]["server"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_merge_keeps_union_of_entries() {
        let existing = Kubeconfig::parse(EXISTING.as_bytes()).unwrap();
        let merged = merge(existing, INCOMING.as_bytes()).unwrap();

        let names: Vec<&str> = merged.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["prod", "shared", "kind-kubero"]);
        assert!(merged.user("prod-admin").is_some());
        assert!(merged.user("kind-kubero").is_some());
        assert!(merged.context("prod").is_some());
        assert!(merged.context("kind-kubero").is_some());
    }

    #[test]
    fn test_merge_incoming_wins_on_collision() {
        let existing = Kubeconfig::parse(EXISTING.as_bytes()).unwrap();
        let merged = merge(existing, INCOMING.as_bytes()).unwrap();

        assert_eq!(server(&merged, "shared"), "https://new.example.com");
        assert_eq!(server(&merged, "prod"), "https://prod.example.com");
        assert_eq!(merged.clusters.len(), 3);
    }

    #[test]
    fn test_merge_takes_incoming_current_context() {
        let existing = Kubeconfig::parse(EXISTING.as_bytes()).unwrap();
        let merged = merge(existing, INCOMING.as_bytes()).unwrap();
        assert_eq!(merged.current_context.as_deref(), Some("kind-kubero"));
    }

    #[test]
    fn test_merge_preserves_unknown_top_level_keys() {
        let existing = Kubeconfig::parse(EXISTING.as_bytes()).unwrap();
        let merged = merge(existing, INCOMING.as_bytes()).unwrap();
        assert!(merged.extra.contains_key("preferences"));
        assert!(merged.to_yaml().unwrap().contains("preferences"));
    }

    #[test]
    fn test_merge_rejects_unparseable_incoming() {
        let existing = Kubeconfig::parse(EXISTING.as_bytes()).unwrap();
        let err = merge(existing, b"clusters: [unterminated").unwrap_err();
        assert!(matches!(err, Error::Kubeconfig { .. }));
    }

    #[test]
    fn test_null_lists_parse_as_empty() {
        let config = Kubeconfig::parse(b"apiVersion: v1\nclusters: null\ncontexts: null\nusers: null\n")
            .unwrap();
        assert!(config.clusters.is_empty());
        assert!(config.current_context.is_none());
    }

    #[test]
    fn test_store_merge_in_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = KubeconfigStore::new(dir.path().join(".kube").join("config"));
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), EXISTING).unwrap();

        store.merge_in(INCOMING.as_bytes()).unwrap();

        let on_disk = store.load().unwrap();
        assert!(on_disk.cluster("prod").is_some());
        assert!(on_disk.cluster("kind-kubero").is_some());
        assert_eq!(on_disk.current_context.as_deref(), Some("kind-kubero"));
    }

    #[test]
    fn test_store_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = KubeconfigStore::new(dir.path().join("nested").join("config"));

        let merged = store.merge_in(INCOMING.as_bytes()).unwrap();

        assert_eq!(merged.clusters.len(), 2);
        assert!(store.path().exists());
        assert_eq!(merged.kind.as_deref(), Some("Config"));
    }
}
