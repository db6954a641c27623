//! ingress-nginx controller

use super::{Confirmation, Step};
use crate::config::IngressProvider;
use crate::context::RunContext;
use crate::error::Result;
use crate::runner::CommandLine;

/// Controller release whose static manifests are applied
pub const INGRESS_CONTROLLER_VERSION: &str = "v1.5.1";

/// Install ingress-nginx from the upstream static manifest for a provider
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallIngress;

impl InstallIngress {
    /// Static deploy manifest for `provider`
    pub fn manifest_url(provider: IngressProvider) -> String {
        format!(
            "https://raw.githubusercontent.com/kubernetes/ingress-nginx/controller-{INGRESS_CONTROLLER_VERSION}/deploy/static/provider/{provider}/deploy.yaml"
        )
    }
}

impl Step for InstallIngress {
    fn name(&self) -> &str {
        "ingress"
    }

    fn description(&self) -> &str {
        "Install Ingress"
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        vec![CommandLine::get("ns", "ingress-nginx")]
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        Some(Confirmation::optional("ingress", "Install Ingress"))
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let provider = ctx.ingress_provider()?;
        ctx.runner()
            .run(&CommandLine::apply(&Self::manifest_url(provider)))?;
        Ok(())
    }
}
