//! Installation step definitions
//!
//! Each step implements the [`Step`] trait and is driven through the same
//! state machine by [`execute`]: precondition probes, confirmation, action,
//! readiness wait.

mod cluster;
mod command;
mod finish;
mod ingress;
mod kubero_ui;
mod namespace;
mod olm;
mod secret;

pub use cluster::{ProvisionCluster, VerifyCluster};
pub use command::{KubectlStep, cert_manager, kubero_operator, metrics_server};
pub use finish::{DnsGuidance, FinalSummary, WriteCliConfig};
pub use ingress::{INGRESS_CONTROLLER_VERSION, InstallIngress};
pub use kubero_ui::{ApplyKuberoUi, KUBERO_SAMPLE_URL, customize_sample};
pub use namespace::EnsureNamespace;
pub use olm::{OlmCrds, OlmOperator};
pub use secret::{EnsureKuberoSecret, KUBERO_SECRET_NAME};

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::Result;
use crate::poller::Probe;
use crate::runner::CommandLine;

/// Namespace the Kubero UI lives in
pub const KUBERO_NAMESPACE: &str = "kubero";

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The action itself errored
    Action(String),
    /// The resource did not become ready in time
    ReadinessTimeout(String),
    /// The operator declined a step the installation cannot do without
    MandatoryDeclined(String),
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(message) => write!(f, "action failed: {message}"),
            Self::ReadinessTimeout(message) => write!(f, "not ready in time: {message}"),
            Self::MandatoryDeclined(guidance) => write!(f, "declined: {guidance}"),
        }
    }
}

/// Result of running a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step was already satisfied, skipped
    Skipped,
    /// Step executed successfully
    Installed,
    /// Operator answered no to an optional step
    Declined,
    /// Step failed; the run stops here
    Failed(StepFailure),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A yes/no question guarding a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Decision key; steps sharing a key are asked once per run
    pub key: String,
    pub prompt: String,
    pub default: bool,
    /// Declining aborts the run
    pub mandatory: bool,
    /// Shown when a mandatory confirmation is declined
    pub guidance: String,
}

impl Confirmation {
    /// A question whose "no" skips the step (default answer: yes)
    pub fn optional(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            default: true,
            mandatory: false,
            guidance: String::new(),
        }
    }

    /// A question whose "no" aborts the run (default answer: yes)
    pub fn mandatory(
        key: impl Into<String>,
        prompt: impl Into<String>,
        guidance: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            default: true,
            mandatory: true,
            guidance: guidance.into(),
        }
    }

    pub fn default_answer(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

/// A condition a step waits for after its action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Deployment reports `condition=available`
    DeploymentAvailable {
        name: String,
        namespace: String,
    },
    /// API group serves at least one resource type
    ApiGroupRegistered(String),
}

impl Readiness {
    pub fn deployment(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::DeploymentAvailable {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn api_group(group: impl Into<String>) -> Self {
        Self::ApiGroupRegistered(group.into())
    }

    /// Probe command for this condition
    ///
    /// `timeout` bounds how long a single probe run may block.
    pub fn probe(&self, timeout: Duration) -> Probe {
        match self {
            Self::DeploymentAvailable { name, namespace } => {
                Probe::Succeeds(CommandLine::wait_available(name, namespace, timeout))
            }
            Self::ApiGroupRegistered(group) => Probe::NonEmpty(CommandLine::kubectl().args([
                "api-resources".to_string(),
                format!("--api-group={group}"),
                "--no-headers=true".to_string(),
            ])),
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeploymentAvailable { name, namespace } => {
                write!(f, "deployment/{name} in {namespace} to become available")
            }
            Self::ApiGroupRegistered(group) => write!(f, "API group {group} to be served"),
        }
    }
}

/// A single installation step
///
/// All steps must be:
/// - **Idempotent**: a satisfied precondition skips the step entirely
/// - **Single-shot**: the action performs one mutation and is never retried
/// - **Describable**: have a stable name and a human-readable description
pub trait Step {
    /// Stable name used in results and logs
    fn name(&self) -> &str;

    /// Human-readable description of what this step does
    fn description(&self) -> &str;

    /// Probes that report the step as already satisfied.
    ///
    /// The step is skipped if any of them prints something. If empty,
    /// the step is always attempted.
    fn check_commands(&self) -> Vec<CommandLine> {
        Vec::new()
    }

    /// Question asked before acting, if any
    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        None
    }

    /// Perform the installation
    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()>;

    /// Conditions to wait for after a successful action
    fn readiness(&self) -> Vec<Readiness> {
        Vec::new()
    }
}

/// Run one step through precondition, confirmation, action and readiness
pub fn execute(step: &dyn Step, ctx: &mut RunContext<'_>) -> StepOutcome {
    let runner = ctx.runner();

    let checks = step.check_commands();
    if let Some(hit) = checks.iter().find(|check| !runner.probe(check).trim_ascii().is_empty()) {
        info!(step = step.name(), check = %hit, "already satisfied");
        return StepOutcome::Skipped;
    }

    if let Some(confirmation) = step.confirmation(ctx) {
        match ctx.decide(&confirmation) {
            Ok(true) => {}
            Ok(false) if confirmation.mandatory => {
                warn!(step = step.name(), "mandatory step declined");
                return StepOutcome::Failed(StepFailure::MandatoryDeclined(confirmation.guidance));
            }
            Ok(false) => {
                info!(step = step.name(), "declined");
                return StepOutcome::Declined;
            }
            Err(e) => return StepOutcome::Failed(StepFailure::Action(e.to_string())),
        }
    }

    ctx.reporter()
        .action_started(step.name(), step.description());
    if let Err(e) = step.apply(ctx) {
        warn!(step = step.name(), error = %e, "action failed");
        return StepOutcome::Failed(StepFailure::Action(e.to_string()));
    }

    let timeout = ctx.config.readiness_timeout;
    for readiness in step.readiness() {
        let what = readiness.to_string();
        ctx.reporter().waiting(step.name(), &what);
        let waited =
            ctx.poller()
                .wait_for_with(runner, &what, timeout, |left| readiness.probe(left));
        if let Err(e) = waited {
            warn!(step = step.name(), error = %e, "readiness timed out");
            return StepOutcome::Failed(StepFailure::ReadinessTimeout(e.to_string()));
        }
    }

    info!(step = step.name(), "installed");
    StepOutcome::Installed
}
