//! Run context and the collaborators a run talks to
//!
//! Everything a step needs beyond its own definition comes through
//! [`RunContext`]: the configuration (updated as answers are collected),
//! the command runner, the prompter and reporter, the manifest fetcher,
//! the cluster provisioner, the kubeconfig store and the CLI config store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::config::{ClusterProvider, IngressProvider, InstallConfig, VcsSetting};
use crate::error::{Error, Result};
use crate::kubeconfig::KubeconfigStore;
use crate::poller::Poller;
use crate::runner::CommandRunner;
use crate::secrets::{VcsCredentials, VcsProvider, generate_password};
use crate::steps::{Confirmation, StepOutcome};

/// Choice for a cluster that is none of [`ClusterProvider::ALL`]
const OTHER_CLUSTER: &str = "other";

/// OLM releases offered for installation
pub const OLM_RELEASES: [&str; 4] = ["0.19.0", "0.20.0", "0.21.0", "0.22.0"];

/// Asks the operator questions
pub trait Prompter {
    /// Yes/no question
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Free-text question; an empty default means no default
    fn input(&self, prompt: &str, default: &str) -> Result<String>;

    /// Pick one of `options`, returns the index
    fn select(&self, prompt: &str, options: &[&str], default: usize) -> Result<usize>;
}

/// What the operator sees at the end of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// `domain:port` of the UI, when known
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Renders progress of a run
pub trait Reporter {
    /// A step's action is about to run
    fn action_started(&self, step: &str, description: &str);

    /// A step is waiting for a readiness probe
    fn waiting(&self, step: &str, probe: &str);

    /// A step reached a terminal state
    fn step_finished(&self, step: &str, outcome: &StepOutcome);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Closing message of a full installation
    fn summary(&self, summary: &InstallSummary);
}

/// Fetches remote manifests
pub trait ManifestFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Creates a cluster and hands back its kubeconfig
pub trait ClusterProvisioner {
    fn provision(&self, provider: ClusterProvider) -> Result<Vec<u8>>;
}

/// Persists the Kubero CLI's `api.url` and `api.token`
pub trait CliConfigStore {
    /// Returns where the settings were written
    fn write(&self, url: &str, token: &str) -> Result<PathBuf>;
}

/// External collaborators of a run
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
    pub reporter: &'a dyn Reporter,
    pub fetcher: &'a dyn ManifestFetcher,
    pub provisioner: &'a dyn ClusterProvisioner,
    pub cli_config: &'a dyn CliConfigStore,
}

/// State threaded through every step of a run
pub struct RunContext<'a> {
    /// Configuration, filled in as the run collects answers
    pub config: InstallConfig,
    collaborators: Collaborators<'a>,
    kubeconfig: KubeconfigStore,
    poller: Poller,
    decisions: BTreeMap<String, bool>,
    /// The operator said the installed cluster is none of the known types
    unknown_cluster: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: InstallConfig,
        collaborators: Collaborators<'a>,
        kubeconfig: KubeconfigStore,
    ) -> Self {
        let poller = Poller::new(config.poll_interval);
        Self {
            config,
            collaborators,
            kubeconfig,
            poller,
            decisions: BTreeMap::new(),
            unknown_cluster: false,
        }
    }

    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.collaborators.runner
    }

    pub fn reporter(&self) -> &'a dyn Reporter {
        self.collaborators.reporter
    }

    pub fn fetcher(&self) -> &'a dyn ManifestFetcher {
        self.collaborators.fetcher
    }

    pub fn provisioner(&self) -> &'a dyn ClusterProvisioner {
        self.collaborators.provisioner
    }

    pub fn cli_config(&self) -> &'a dyn CliConfigStore {
        self.collaborators.cli_config
    }

    pub fn kubeconfig(&self) -> &KubeconfigStore {
        &self.kubeconfig
    }

    pub fn poller(&self) -> Poller {
        self.poller
    }

    /// Resolve a confirmation.
    ///
    /// Order: an earlier answer for the same key in this run, a configured
    /// answer, the default when defaults are assumed, and finally the
    /// prompter.
    pub fn decide(&mut self, confirmation: &Confirmation) -> Result<bool> {
        if let Some(&answer) = self.decisions.get(&confirmation.key) {
            return Ok(answer);
        }

        let answer = match self.config.answers.get(&confirmation.key) {
            Some(&answer) => answer,
            None if self.config.assume_defaults => confirmation.default,
            None => self
                .collaborators
                .prompter
                .confirm(&confirmation.prompt, confirmation.default)?,
        };

        debug!(key = %confirmation.key, answer, "decision recorded");
        self.decisions.insert(confirmation.key.clone(), answer);
        Ok(answer)
    }

    /// Ask a free-text question, or take the default when defaults are assumed
    pub fn ask(&self, prompt: &str, default: &str) -> Result<String> {
        if self.config.assume_defaults {
            if default.is_empty() {
                return Err(Error::validation(format!(
                    "'{prompt}' has no default and prompting is disabled"
                )));
            }
            return Ok(default.to_string());
        }
        self.collaborators.prompter.input(prompt, default)
    }

    fn choose(&self, prompt: &str, options: &[&str], default: usize) -> Result<usize> {
        if self.config.assume_defaults {
            return Ok(default);
        }
        self.collaborators.prompter.select(prompt, options, default)
    }

    fn remember(
        &mut self,
        field: fn(&mut InstallConfig) -> &mut Option<String>,
        prompt: &str,
        default: impl FnOnce() -> String,
    ) -> Result<String> {
        if let Some(value) = field(&mut self.config).clone() {
            return Ok(value);
        }
        let value = self.ask(prompt, &default())?;
        *field(&mut self.config) = Some(value.clone());
        Ok(value)
    }

    /// The cluster type; asked once when not configured
    pub fn cluster_provider(&mut self, prompt: &str) -> Result<ClusterProvider> {
        if let Some(provider) = self.config.cluster_provider {
            return Ok(provider);
        }

        let labels: Vec<&str> = ClusterProvider::ALL.iter().map(|p| p.as_str()).collect();
        let default = ClusterProvider::ALL
            .iter()
            .position(|p| *p == ClusterProvider::Linode)
            .unwrap_or(0);
        let picked = ClusterProvider::ALL[self.choose(prompt, &labels, default)?];

        self.config.cluster_provider = Some(picked);
        Ok(picked)
    }

    /// The cluster Kubero goes onto, `None` when it is of no known type
    ///
    /// Asked once when not configured. Unattended runs treat an
    /// unconfigured cluster as unknown.
    pub fn installed_cluster(&mut self) -> Result<Option<ClusterProvider>> {
        if let Some(provider) = self.config.cluster_provider {
            return Ok(Some(provider));
        }
        if self.config.assume_defaults || self.unknown_cluster {
            return Ok(None);
        }

        let mut labels: Vec<&str> = ClusterProvider::ALL.iter().map(|p| p.as_str()).collect();
        labels.push(OTHER_CLUSTER);
        let picked = self.collaborators.prompter.select(
            "Which cluster type have you installed?",
            &labels,
            labels.len() - 1,
        )?;

        match ClusterProvider::ALL.get(picked) {
            Some(&provider) => {
                self.config.cluster_provider = Some(provider);
                Ok(Some(provider))
            }
            None => {
                self.unknown_cluster = true;
                Ok(None)
            }
        }
    }

    /// The ingress-nginx flavour, defaulting to the cluster's
    pub fn ingress_provider(&mut self) -> Result<IngressProvider> {
        if let Some(provider) = self.config.ingress_provider {
            return Ok(provider);
        }

        let suggested = self
            .installed_cluster()?
            .map_or(IngressProvider::Baremetal, ClusterProvider::default_ingress);
        let labels: Vec<&str> = IngressProvider::ALL.iter().map(|p| p.label()).collect();
        let default = IngressProvider::ALL
            .iter()
            .position(|p| *p == suggested)
            .unwrap_or(0);
        let picked = IngressProvider::ALL[self.choose("Ingress provider", &labels, default)?];

        self.config.ingress_provider = Some(picked);
        Ok(picked)
    }

    /// OLM release to install
    pub fn olm_release(&mut self) -> Result<String> {
        if let Some(release) = &self.config.olm_release {
            return Ok(release.clone());
        }

        let default = OLM_RELEASES.len() - 1;
        let release =
            OLM_RELEASES[self.choose("Install OLM from which release?", &OLM_RELEASES, default)?]
                .to_string();
        self.config.olm_release = Some(release.clone());
        Ok(release)
    }

    pub fn admin_user(&mut self) -> Result<String> {
        self.remember(|c| &mut c.admin_user, "Admin user", || "admin".into())
    }

    pub fn admin_password(&mut self) -> Result<String> {
        self.remember(|c| &mut c.admin_password, "Admin password", || {
            generate_password(12)
        })
    }

    pub fn api_token(&mut self) -> Result<String> {
        self.remember(
            |c| &mut c.api_token,
            "Random string for admin API token",
            || generate_password(20),
        )
    }

    pub fn webhook_secret(&mut self) -> Result<String> {
        self.remember(
            |c| &mut c.webhook_secret,
            "Random string for your webhook secret",
            || generate_password(20),
        )
    }

    pub fn session_key(&mut self) -> Result<String> {
        self.remember(
            |c| &mut c.session_key,
            "Random string for your session key",
            || generate_password(20),
        )
    }

    pub fn domain(&mut self) -> Result<String> {
        self.remember(|c| &mut c.domain, "Kubero UI domain", || {
            "kubero.lacolhost.com".into()
        })
    }

    pub fn webhook_url(&mut self) -> Result<String> {
        let domain = self.domain()?;
        self.remember(
            |c| &mut c.webhook_url,
            "URL to which the webhooks should be sent",
            || format!("{domain}/api/repo/webhooks"),
        )
    }

    /// Credentials of one version control integration, `None` when not wanted
    ///
    /// Integrations that are not configured are skipped when defaults are
    /// assumed, since their tokens cannot be defaulted.
    pub fn vcs_credentials(&mut self, provider: VcsProvider) -> Result<Option<VcsCredentials>> {
        match self.config.vcs.get(&provider) {
            Some(VcsSetting::Disabled) => return Ok(None),
            Some(VcsSetting::Enabled(credentials)) => return Ok(Some(credentials.clone())),
            None if self.config.assume_defaults => return Ok(None),
            None => {}
        }

        let confirmation = Confirmation::optional(
            format!("vcs-{}", provider.key()),
            format!("Configure {}", provider.label()),
        )
        .default_answer(provider == VcsProvider::Github);
        if !self.decide(&confirmation)? {
            self.config.vcs.insert(provider, VcsSetting::Disabled);
            return Ok(None);
        }

        let label = provider.label();
        let credentials = if provider.uses_app_password() {
            VcsCredentials::AppPassword {
                username: self.ask(&format!("{label} username"), "")?,
                app_password: self.ask(&format!("{label} app password"), "")?,
            }
        } else {
            VcsCredentials::Token {
                token: self.ask(&format!("{label} personal access token"), "")?,
                base_url: self.ask(&format!("{label} URL"), provider.default_base_url())?,
            }
        };

        self.config
            .vcs
            .insert(provider, VcsSetting::Enabled(credentials.clone()));
        Ok(Some(credentials))
    }
}
