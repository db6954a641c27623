//! Generic kubectl steps

use super::{Confirmation, Readiness, Step};
use crate::context::RunContext;
use crate::error::Result;
use crate::runner::CommandLine;

/// Run one kubectl command, guarded by idempotency probes
#[derive(Debug, Clone)]
pub struct KubectlStep {
    name: String,
    description: String,
    /// Command performing the installation
    pub command: CommandLine,
    /// If any of these prints something, skip running `command`
    pub unless: Vec<CommandLine>,
    pub confirmation: Option<Confirmation>,
    pub readiness: Vec<Readiness>,
}

impl KubectlStep {
    /// Create a new command step
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        command: CommandLine,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            command,
            unless: vec![],
            confirmation: None,
            readiness: vec![],
        }
    }

    /// Add an idempotency guard
    pub fn unless(mut self, check: CommandLine) -> Self {
        self.unless.push(check);
        self
    }

    /// Ask before running
    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Wait for a condition once the command succeeded
    pub fn wait_for(mut self, readiness: Readiness) -> Self {
        self.readiness.push(readiness);
        self
    }
}

impl Step for KubectlStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        self.unless.clone()
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        self.confirmation.clone()
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        ctx.runner().run(&self.command)?;
        Ok(())
    }

    fn readiness(&self) -> Vec<Readiness> {
        self.readiness.clone()
    }
}

/// metrics-server from the latest upstream release
pub fn metrics_server() -> KubectlStep {
    KubectlStep::new(
        "metrics",
        "Install Kubernetes internal metrics service",
        CommandLine::apply(
            "https://github.com/kubernetes-sigs/metrics-server/releases/latest/download/components.yaml",
        ),
    )
    .unless(CommandLine::get("deployments.apps", "metrics-server").namespace("kube-system"))
    .confirm(Confirmation::optional(
        "metrics",
        "Install Kubernetes internal metrics service (required for HPA, Horizontal Pod Autoscaling)",
    ))
    .wait_for(Readiness::deployment("metrics-server", "kube-system"))
}

/// cert-manager through OperatorHub
pub fn cert_manager() -> KubectlStep {
    KubectlStep::new(
        "cert-manager",
        "Install SSL Certmanager",
        CommandLine::create("https://operatorhub.io/install/cert-manager.yaml"),
    )
    .unless(CommandLine::get("deployment", "cert-manager-webhook").namespace("operators"))
    .confirm(Confirmation::optional("cert-manager", "Install SSL Certmanager"))
    .wait_for(Readiness::deployment("cert-manager-webhook", "operators"))
}

/// Kubero operator through OperatorHub
pub fn kubero_operator() -> KubectlStep {
    KubectlStep::new(
        "kubero-operator",
        "Install Kubero Operator",
        CommandLine::apply("https://operatorhub.io/install/kubero-operator.yaml"),
    )
    .unless(CommandLine::get("operator", "kubero-operator.operators"))
    .wait_for(Readiness::api_group("application.kubero.dev"))
}
