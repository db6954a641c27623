//! Kubero UI secret material

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::runner::CommandLine;

const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!+?._-%";

/// Generate a random password from a shell-friendly alphabet
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())]))
        .collect()
}

/// A Kubero UI login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub insecure: bool,
    pub apitoken: String,
}

/// Encode users the way the UI reads `KUBERO_USERS`: base64 of a JSON list
pub fn encode_users(users: &[UserRecord]) -> Result<String> {
    let json = serde_json::to_vec(users)?;
    Ok(STANDARD.encode(json))
}

/// Version control systems the UI can integrate with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VcsProvider {
    Github,
    Gitea,
    Gogs,
    Gitlab,
    Bitbucket,
}

impl VcsProvider {
    /// Order in which integrations are offered and written
    pub const ALL: [Self; 5] = [
        Self::Github,
        Self::Gitea,
        Self::Gogs,
        Self::Gitlab,
        Self::Bitbucket,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitea => "gitea",
            Self::Gogs => "gogs",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Gitea => "Gitea",
            Self::Gogs => "Gogs",
            Self::Gitlab => "GitLab",
            Self::Bitbucket => "Bitbucket",
        }
    }

    /// Prefix of the secret keys and environment variables
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Github => "GITHUB",
            Self::Gitea => "GITEA",
            Self::Gogs => "GOGS",
            Self::Gitlab => "GITLAB",
            Self::Bitbucket => "BITBUCKET",
        }
    }

    /// Base URL offered when asking for a self-hosted instance
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Github => "https://api.github.com",
            Self::Gitea | Self::Gogs => "http://localhost:3000",
            Self::Gitlab => "http://localhost:3080",
            Self::Bitbucket => "https://api.bitbucket.org",
        }
    }

    /// Bitbucket authenticates with username + app password, the rest with a token
    pub fn uses_app_password(self) -> bool {
        matches!(self, Self::Bitbucket)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

/// Credentials for one integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCredentials {
    Token { token: String, base_url: String },
    AppPassword { username: String, app_password: String },
}

impl VcsCredentials {
    /// The two secret literals this integration contributes
    pub fn literals(&self, provider: VcsProvider) -> [(String, String); 2] {
        let prefix = provider.env_prefix();
        match self {
            Self::Token { token, base_url } => [
                (format!("{prefix}_PERSONAL_ACCESS_TOKEN"), token.clone()),
                (format!("{prefix}_BASEURL"), base_url.clone()),
            ],
            Self::AppPassword {
                username,
                app_password,
            } => [
                (format!("{prefix}_USERNAME"), username.clone()),
                (format!("{prefix}_APP_PASSWORD"), app_password.clone()),
            ],
        }
    }
}

/// Literal key/value pairs for the `kubero-secrets` secret
///
/// Lives only in memory for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct SecretBundle {
    literals: Vec<(String, String)>,
}

impl SecretBundle {
    /// Start a bundle with the entries every installation needs
    pub fn new(webhook_secret: &str, session_key: &str, users: &[UserRecord]) -> Result<Self> {
        Ok(Self {
            literals: vec![
                ("KUBERO_WEBHOOK_SECRET".into(), webhook_secret.into()),
                ("KUBERO_SESSION_KEY".into(), session_key.into()),
                ("KUBERO_USERS".into(), encode_users(users)?),
            ],
        })
    }

    /// Add the entries of one version control integration
    pub fn add_vcs(&mut self, provider: VcsProvider, credentials: &VcsCredentials) {
        self.literals.extend(credentials.literals(provider));
    }

    pub fn literals(&self) -> &[(String, String)] {
        &self.literals
    }

    /// `kubectl create secret generic <name> --from-literal=... -n <namespace>`
    pub fn create_command(&self, name: &str, namespace: &str) -> CommandLine {
        let cmd = CommandLine::kubectl().args(["create", "secret", "generic", name]);
        self.literals
            .iter()
            .fold(cmd, |cmd, (key, value)| cmd.literal(key, value))
            .namespace(namespace)
    }
}
