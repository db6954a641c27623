//! Installation pipelines - ordered step sequences

use std::fmt;
use std::str::FromStr;

use tracing::{info, info_span};

use crate::context::RunContext;
use crate::steps::{
    ApplyKuberoUi, Confirmation, DnsGuidance, EnsureKuberoSecret, EnsureNamespace, FinalSummary,
    InstallIngress, KUBERO_NAMESPACE, OlmCrds, OlmOperator, ProvisionCluster, Step, StepFailure,
    StepOutcome, VerifyCluster, WriteCliConfig, cert_manager, execute, kubero_operator,
    metrics_server,
};

/// A part of the installation that can be run on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Kubernetes,
    Olm,
    Ingress,
    Metrics,
    CertManager,
    Kubero,
    KuberoOperator,
    KuberoUi,
}

impl Component {
    pub const ALL: [Self; 8] = [
        Self::Kubernetes,
        Self::Olm,
        Self::Ingress,
        Self::Metrics,
        Self::CertManager,
        Self::Kubero,
        Self::KuberoOperator,
        Self::KuberoUi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::Olm => "olm",
            Self::Ingress => "ingress",
            Self::Metrics => "metrics",
            Self::CertManager => "certmanager",
            Self::Kubero => "kubero",
            Self::KuberoOperator => "kubero-operator",
            Self::KuberoUi => "kubero-ui",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown component '{s}'"))
    }
}

/// Ordered `(step name, outcome)` entries of a run
///
/// Ends at the first failed step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineResult {
    pub entries: Vec<(String, StepOutcome)>,
}

impl PipelineResult {
    /// The failed step, if the run stopped early
    pub fn failure(&self) -> Option<(&str, &StepFailure)> {
        self.entries.last().and_then(|(name, outcome)| match outcome {
            StepOutcome::Failed(failure) => Some((name.as_str(), failure)),
            _ => None,
        })
    }

    pub fn succeeded(&self) -> bool {
        self.failure().is_none()
    }

    /// Outcome of the named step, if it ran
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, outcome)| outcome)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// An ordered list of installation steps
pub struct Pipeline {
    /// What this pipeline installs
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<Box<dyn Step>>,
}

fn ui_confirmation() -> Confirmation {
    Confirmation::optional("kubero-ui", "Install Kubero UI")
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: vec![],
        }
    }

    /// Add a step to the pipeline
    pub fn add_step<S: Step + 'static>(&mut self, step: S) {
        self.steps.push(Box::new(step));
    }

    /// Add a step fluently
    pub fn with_step<S: Step + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    fn with_kubernetes(self) -> Self {
        self.with_step(ProvisionCluster).with_step(VerifyCluster)
    }

    fn with_olm(self) -> Self {
        self.with_step(OlmCrds).with_step(OlmOperator)
    }

    fn with_kubero_ui(self) -> Self {
        self.with_step(EnsureNamespace::new(KUBERO_NAMESPACE).confirm(ui_confirmation()))
            .with_step(EnsureKuberoSecret::new().confirm(ui_confirmation()))
            .with_step(ApplyKuberoUi::new().confirm(ui_confirmation()))
    }

    /// The complete installation, from cluster to summary
    pub fn full() -> Self {
        Self::new("full")
            // =========================================================
            // Phase 1: Cluster
            // =========================================================
            .with_kubernetes()
            // =========================================================
            // Phase 2: Prerequisites
            // =========================================================
            .with_olm()
            .with_step(InstallIngress)
            .with_step(metrics_server())
            .with_step(cert_manager())
            // =========================================================
            // Phase 3: Kubero
            // =========================================================
            .with_step(kubero_operator())
            .with_kubero_ui()
            // =========================================================
            // Phase 4: Wrap-up
            // =========================================================
            .with_step(WriteCliConfig)
            .with_step(DnsGuidance)
            .with_step(FinalSummary)
    }

    /// Only the steps of one component
    pub fn component(component: Component) -> Self {
        let pipeline = Self::new(component.as_str());
        match component {
            Component::Kubernetes => pipeline.with_kubernetes(),
            Component::Olm => pipeline.with_olm(),
            Component::Ingress => pipeline.with_step(InstallIngress),
            Component::Metrics => pipeline.with_step(metrics_server()),
            Component::CertManager => pipeline.with_step(cert_manager()),
            Component::Kubero => pipeline.with_step(kubero_operator()).with_kubero_ui(),
            Component::KuberoOperator => pipeline.with_step(kubero_operator()),
            Component::KuberoUi => pipeline.with_kubero_ui(),
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, stopping at the first failure
    pub fn run(&self, ctx: &mut RunContext<'_>) -> PipelineResult {
        let _span = info_span!("pipeline", name = %self.name).entered();
        let mut result = PipelineResult::default();

        for step in &self.steps {
            let outcome = execute(step.as_ref(), ctx);
            ctx.reporter().step_finished(step.name(), &outcome);

            let failed = outcome.is_failed();
            result.entries.push((step.name().to_string(), outcome));
            if failed {
                info!(step = step.name(), "stopping after failed step");
                break;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pipeline_order() {
        assert_eq!(
            Pipeline::full().step_names(),
            vec![
                "provision-cluster",
                "verify-cluster",
                "olm-crds",
                "olm",
                "ingress",
                "metrics",
                "cert-manager",
                "kubero-operator",
                "kubero-namespace",
                "kubero-secret",
                "kubero-ui",
                "cli-config",
                "dns-guidance",
                "summary",
            ]
        );
    }

    #[test]
    fn test_component_groups() {
        assert_eq!(
            Pipeline::component(Component::Kubernetes).step_names(),
            vec!["provision-cluster", "verify-cluster"]
        );
        assert_eq!(
            Pipeline::component(Component::Kubero).step_names(),
            vec!["kubero-operator", "kubero-namespace", "kubero-secret", "kubero-ui"]
        );
        assert_eq!(
            Pipeline::component(Component::CertManager).step_names(),
            vec!["cert-manager"]
        );
    }

    #[test]
    fn test_no_component_runs_trailing_steps() {
        for component in Component::ALL {
            let names = Pipeline::component(component).step_names().join(",");
            for trailing in ["cli-config", "dns-guidance", "summary"] {
                assert!(!names.contains(trailing), "{component} runs {trailing}");
            }
        }
    }

    #[test]
    fn test_component_parses() {
        assert_eq!("certmanager".parse(), Ok(Component::CertManager));
        assert_eq!("kubero-ui".parse(), Ok(Component::KuberoUi));
        assert!("dashboard".parse::<Component>().is_err());
    }
}
