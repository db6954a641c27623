//! The Kubero UI secret

use tracing::debug;

use super::{Confirmation, KUBERO_NAMESPACE, Step};
use crate::context::RunContext;
use crate::error::Result;
use crate::runner::CommandLine;
use crate::secrets::{SecretBundle, UserRecord, VcsProvider};

/// Name of the secret the UI reads its settings from
pub const KUBERO_SECRET_NAME: &str = "kubero-secrets";

/// Create `kubero-secrets` once; an existing secret is never replaced
#[derive(Debug, Clone, Default)]
pub struct EnsureKuberoSecret {
    confirmation: Option<Confirmation>,
}

impl EnsureKuberoSecret {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask before creating
    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Collect every value of the bundle, asking for what is not configured
    pub fn bundle(ctx: &mut RunContext<'_>) -> Result<SecretBundle> {
        let webhook_secret = ctx.webhook_secret()?;
        let session_key = ctx.session_key()?;
        let admin = UserRecord {
            username: ctx.admin_user()?,
            password: ctx.admin_password()?,
            insecure: true,
            apitoken: ctx.api_token()?,
        };

        let mut bundle = SecretBundle::new(&webhook_secret, &session_key, &[admin])?;
        for provider in VcsProvider::ALL {
            if let Some(credentials) = ctx.vcs_credentials(provider)? {
                debug!(provider = provider.key(), "integration enabled");
                bundle.add_vcs(provider, &credentials);
            }
        }
        Ok(bundle)
    }
}

impl Step for EnsureKuberoSecret {
    fn name(&self) -> &str {
        "kubero-secret"
    }

    fn description(&self) -> &str {
        "Create Kubero secret"
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        vec![CommandLine::get("secret", KUBERO_SECRET_NAME).namespace(KUBERO_NAMESPACE)]
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        self.confirmation.clone()
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let bundle = Self::bundle(ctx)?;
        ctx.runner()
            .run(&bundle.create_command(KUBERO_SECRET_NAME, KUBERO_NAMESPACE))?;
        Ok(())
    }
}
