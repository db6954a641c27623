//! Installer configuration file and resolution
//!
//! Path: `~/.config/kubero/install.toml` (XDG-style). Every value is
//! optional; whatever is missing after CLI flags, environment variables
//! and the file have been consulted is asked for interactively.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result, bail};
use kubero_provision::config::InstallConfigBuilder as Builder;
use kubero_provision::{
    ClusterProvider, IngressProvider, InstallConfig, VcsCredentials, VcsProvider, VcsSetting,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Args;

/// Kind cluster name used when none is configured
pub const DEFAULT_KIND_CLUSTER: &str = "kubero";

static DOMAIN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}$")
});

/// Configuration file structure
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub olm: OlmConfig,
    #[serde(default)]
    pub vcs: BTreeMap<String, VcsConfig>,
    #[serde(default)]
    pub provision: BTreeMap<String, ProvisionConfig>,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub cli: CliConfig,
    /// Pre-answered confirmations, e.g. `metrics = false`
    #[serde(default)]
    pub answers: BTreeMap<String, bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UiConfig {
    pub domain: Option<String>,
    pub port: Option<String>,
    pub secure_port: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub session_key: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// scaleway, linode, gke, digitalocean or kind
    #[serde(rename = "type")]
    pub cluster_type: Option<String>,
    pub ingress_provider: Option<String>,
    /// Name of the kind cluster to create
    pub name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OlmConfig {
    pub release: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VcsConfig {
    pub enabled: Option<bool>,
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub app_password: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Program and arguments; stdout must be the new cluster's kubeconfig
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub readiness_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub http_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    pub api_url: Option<String>,
}

/// Base directory for Kubero configuration files
/// Always ~/.config/kubero (even on macOS, for consistency with the CLI)
pub fn config_dir() -> PathBuf {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kubero")
}

/// Installer config path
pub fn config_path() -> PathBuf {
    config_dir().join("install.toml")
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfig> {
    let path = path.cloned().unwrap_or_else(config_path);

    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    } else {
        Ok(FileConfig::default())
    }
}

/// Check that `domain` looks like a DNS name
pub fn validate_domain(domain: &str) -> Result<()> {
    let re = DOMAIN
        .as_ref()
        .map_err(|e| anyhow::anyhow!("domain pattern: {e}"))?;
    if !re.is_match(domain) {
        bail!("'{domain}' is not a valid domain name");
    }
    Ok(())
}

fn parse_setting<T>(value: Option<&String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("{key}: {e}"))
}

fn resolve_vcs(
    provider: VcsProvider,
    file: Option<&VcsConfig>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Option<VcsSetting>> {
    let empty = VcsConfig::default();
    let file = file.unwrap_or(&empty);
    if file.enabled == Some(false) {
        return Ok(Some(VcsSetting::Disabled));
    }

    let prefix = provider.env_prefix();
    let credentials = if provider.uses_app_password() {
        let username = env(&format!("{prefix}_USERNAME")).or_else(|| file.username.clone());
        let app_password =
            env(&format!("{prefix}_APP_PASSWORD")).or_else(|| file.app_password.clone());
        username
            .zip(app_password)
            .map(|(username, app_password)| VcsCredentials::AppPassword {
                username,
                app_password,
            })
    } else {
        env(&format!("{prefix}_PERSONAL_ACCESS_TOKEN"))
            .or_else(|| file.token.clone())
            .map(|token| VcsCredentials::Token {
                token,
                base_url: env(&format!("{prefix}_BASEURL"))
                    .or_else(|| file.base_url.clone())
                    .unwrap_or_else(|| provider.default_base_url().to_string()),
            })
    };

    match credentials {
        Some(credentials) => Ok(Some(VcsSetting::Enabled(credentials))),
        None if file.enabled == Some(true) => bail!(
            "vcs.{} is enabled but its credentials are missing",
            provider.key()
        ),
        None => Ok(None),
    }
}

/// Merge CLI args, environment and config file into an [`InstallConfig`]
///
/// Priority: CLI args > env vars > config file. Clap already folded the
/// `KUBERO_*` variables into `args`.
pub fn resolve(
    args: &Args,
    file: &FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<InstallConfig> {
    let mut builder = InstallConfig::builder().assume_defaults(args.yes);

    let admin_user = args.user.clone().or_else(|| file.admin.user.clone());
    let admin_password = args
        .user_password
        .clone()
        .or_else(|| file.admin.password.clone());
    let api_token = args.apitoken.clone().or_else(|| file.admin.api_token.clone());
    let domain = args.domain.clone().or_else(|| file.ui.domain.clone());
    let port = args.port.clone().or_else(|| file.ui.port.clone());
    let secure_port = args
        .secureport
        .clone()
        .or_else(|| file.ui.secure_port.clone());

    if let Some(domain) = &domain {
        validate_domain(domain)?;
    }

    builder = set(builder, admin_user, Builder::admin_user);
    builder = set(builder, admin_password, Builder::admin_password);
    builder = set(builder, api_token, Builder::api_token);
    builder = set(builder, domain, Builder::domain);
    builder = set(builder, port, Builder::port);
    builder = set(builder, secure_port, Builder::secure_port);
    builder = set(builder, file.ui.webhook_url.clone(), Builder::webhook_url);
    builder = set(builder, file.ui.webhook_secret.clone(), Builder::webhook_secret);
    builder = set(builder, file.ui.session_key.clone(), Builder::session_key);
    builder = set(builder, file.olm.release.clone(), Builder::olm_release);
    builder = set(builder, file.cli.api_url.clone(), Builder::cli_api_url);

    let cluster_provider = match args.cluster_type {
        Some(provider) => Some(provider),
        None => parse_setting::<ClusterProvider>(file.cluster.cluster_type.as_ref(), "cluster.type")?,
    };
    if let Some(provider) = cluster_provider {
        builder = builder.cluster_provider(provider);
    }

    let ingress_provider = match args.ingress_provider {
        Some(provider) => Some(provider),
        None => parse_setting::<IngressProvider>(
            file.cluster.ingress_provider.as_ref(),
            "cluster.ingress_provider",
        )?,
    };
    if let Some(provider) = ingress_provider {
        builder = builder.ingress_provider(provider);
    }

    for key in file.vcs.keys() {
        if VcsProvider::from_key(key).is_none() {
            bail!("unknown version control provider [vcs.{key}]");
        }
    }
    for provider in VcsProvider::ALL {
        if let Some(setting) = resolve_vcs(provider, file.vcs.get(provider.key()), &env)? {
            builder = builder.vcs(provider, setting);
        }
    }

    for (key, answer) in &file.answers {
        builder = builder.answer(key, *answer);
    }

    let readiness = args.timeout.or(file.timeouts.readiness_secs);
    if let Some(secs) = readiness {
        builder = builder.readiness_timeout(Duration::from_secs(secs));
    }
    if let Some(ms) = file.timeouts.poll_interval_ms {
        builder = builder.poll_interval(Duration::from_millis(ms));
    }

    Ok(builder.build())
}

fn set(builder: Builder, value: Option<String>, apply: fn(Builder, String) -> Builder) -> Builder {
    match value {
        Some(value) => apply(builder, value),
        None => builder,
    }
}

/// Provisioning commands from `[provision.<provider>]`
pub fn provision_commands(file: &FileConfig) -> Result<BTreeMap<ClusterProvider, Vec<String>>> {
    file.provision
        .iter()
        .filter(|(_, p)| !p.command.is_empty())
        .map(|(key, p)| {
            let provider = key
                .parse::<ClusterProvider>()
                .map_err(|e| anyhow::anyhow!("[provision.{key}]: {e}"))?;
            Ok((provider, p.command.clone()))
        })
        .collect()
}

/// Timeout for manifest downloads
pub fn http_timeout(file: &FileConfig) -> Duration {
    Duration::from_secs(file.timeouts.http_secs.unwrap_or(30))
}
