//! Configuration types for a Kubero installation
//!
//! Every field that could be asked interactively is an `Option`: `None`
//! means "not given, ask when needed", `Some` means the operator set it
//! up front and no prompt is shown.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::poller::{DEFAULT_POLL_INTERVAL, DEFAULT_READINESS_TIMEOUT};
use crate::secrets::{VcsCredentials, VcsProvider};

/// Kubernetes distributions the installer knows how to provision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterProvider {
    Scaleway,
    Linode,
    Gke,
    DigitalOcean,
    Kind,
}

impl ClusterProvider {
    pub const ALL: [Self; 5] = [
        Self::Scaleway,
        Self::Linode,
        Self::Gke,
        Self::DigitalOcean,
        Self::Kind,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scaleway => "scaleway",
            Self::Linode => "linode",
            Self::Gke => "gke",
            Self::DigitalOcean => "digitalocean",
            Self::Kind => "kind",
        }
    }

    /// ingress-nginx manifest flavour matching this cluster
    pub fn default_ingress(self) -> IngressProvider {
        match self {
            Self::Kind => IngressProvider::Kind,
            Self::Linode | Self::Gke => IngressProvider::Cloud,
            Self::Scaleway => IngressProvider::Scw,
            Self::DigitalOcean => IngressProvider::Do,
        }
    }

    /// Whether the Kubero UI ingress needs an explicit `nginx` class
    pub fn needs_nginx_class(self) -> bool {
        matches!(self, Self::Linode | Self::DigitalOcean | Self::Gke)
    }
}

impl fmt::Display for ClusterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                format!("unknown cluster type '{s}', expected one of scaleway, linode, gke, digitalocean, kind")
            })
    }
}

/// Provider directory of the ingress-nginx static deploy manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngressProvider {
    Kind,
    Aws,
    Baremetal,
    Cloud,
    Do,
    Exoscale,
    Scw,
}

impl IngressProvider {
    pub const ALL: [Self; 7] = [
        Self::Kind,
        Self::Aws,
        Self::Baremetal,
        Self::Cloud,
        Self::Do,
        Self::Exoscale,
        Self::Scw,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kind => "kind",
            Self::Aws => "aws",
            Self::Baremetal => "baremetal",
            Self::Cloud => "cloud",
            Self::Do => "do",
            Self::Exoscale => "exoscale",
            Self::Scw => "scw",
        }
    }

    /// Label shown when asking for a provider
    pub fn label(self) -> &'static str {
        match self {
            Self::Cloud => "cloud (Azure, Google, Oracle, Linode)",
            Self::Do => "do (DigitalOcean)",
            Self::Scw => "scw (Scaleway)",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for IngressProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngressProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown ingress provider '{s}'"))
    }
}

/// Operator's choice for one version control integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsSetting {
    Disabled,
    Enabled(VcsCredentials),
}

/// Configuration for a Kubero installation run
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Admin username for the Kubero UI
    pub admin_user: Option<String>,
    /// Admin password for the Kubero UI
    pub admin_password: Option<String>,
    /// API token for the admin user
    pub api_token: Option<String>,
    /// Domain the Kubero UI is served on
    pub domain: Option<String>,
    /// Kubero UI HTTP port
    pub port: Option<String>,
    /// Kubero UI HTTPS port
    pub secure_port: Option<String>,
    /// URL repository webhooks are sent to
    pub webhook_url: Option<String>,
    /// Shared secret for repository webhooks
    pub webhook_secret: Option<String>,
    /// Session signing key for the UI
    pub session_key: Option<String>,
    /// Cluster type, chosen or provisioned
    pub cluster_provider: Option<ClusterProvider>,
    /// ingress-nginx manifest flavour
    pub ingress_provider: Option<IngressProvider>,
    /// OLM release, e.g. "0.22.0"
    pub olm_release: Option<String>,
    /// API URL written into the CLI config
    pub cli_api_url: Option<String>,
    /// Version control integrations
    pub vcs: BTreeMap<VcsProvider, VcsSetting>,
    /// Pre-answered confirmations, keyed by decision key
    pub answers: BTreeMap<String, bool>,
    /// Accept the default answer for every confirmation without asking
    pub assume_defaults: bool,
    /// Upper bound for each readiness wait
    pub readiness_timeout: Duration,
    /// Pause between readiness probes
    pub poll_interval: Duration,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            admin_user: None,
            admin_password: None,
            api_token: None,
            domain: None,
            port: None,
            secure_port: None,
            webhook_url: None,
            webhook_secret: None,
            session_key: None,
            cluster_provider: None,
            ingress_provider: None,
            olm_release: None,
            cli_api_url: None,
            vcs: BTreeMap::new(),
            answers: BTreeMap::new(),
            assume_defaults: false,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl InstallConfig {
    /// Create a new config builder
    pub fn builder() -> InstallConfigBuilder {
        InstallConfigBuilder::default()
    }
}

/// Builder for `InstallConfig`
#[derive(Debug, Clone, Default)]
pub struct InstallConfigBuilder {
    config: InstallConfig,
}

impl InstallConfigBuilder {
    pub fn admin_user(mut self, user: impl Into<String>) -> Self {
        self.config.admin_user = Some(user.into());
        self
    }

    pub fn admin_password(mut self, password: impl Into<String>) -> Self {
        self.config.admin_password = Some(password.into());
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = Some(domain.into());
        self
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = Some(port.into());
        self
    }

    pub fn secure_port(mut self, port: impl Into<String>) -> Self {
        self.config.secure_port = Some(port.into());
        self
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.webhook_url = Some(url.into());
        self
    }

    pub fn webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.webhook_secret = Some(secret.into());
        self
    }

    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.config.session_key = Some(key.into());
        self
    }

    pub fn cluster_provider(mut self, provider: ClusterProvider) -> Self {
        self.config.cluster_provider = Some(provider);
        self
    }

    pub fn ingress_provider(mut self, provider: IngressProvider) -> Self {
        self.config.ingress_provider = Some(provider);
        self
    }

    pub fn olm_release(mut self, release: impl Into<String>) -> Self {
        self.config.olm_release = Some(release.into());
        self
    }

    pub fn cli_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.cli_api_url = Some(url.into());
        self
    }

    pub fn vcs(mut self, provider: VcsProvider, setting: VcsSetting) -> Self {
        self.config.vcs.insert(provider, setting);
        self
    }

    /// Pre-answer the confirmation with the given decision key
    pub fn answer(mut self, key: impl Into<String>, yes: bool) -> Self {
        self.config.answers.insert(key.into(), yes);
        self
    }

    pub fn assume_defaults(mut self, assume: bool) -> Self {
        self.config.assume_defaults = assume;
        self
    }

    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.config.readiness_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn build(self) -> InstallConfig {
        self.config
    }
}
