//! Operator Lifecycle Manager
//!
//! OLM is installed in two steps sharing one decision: the CRDs, then the
//! operators themselves. An OpenShift cluster ships OLM in its own
//! namespace, which counts as installed too.

use super::{Confirmation, Readiness, Step};
use crate::context::RunContext;
use crate::error::Result;
use crate::runner::CommandLine;

/// Namespace the upstream manifests install OLM into
pub const OLM_NAMESPACE: &str = "olm";

const OPENSHIFT_OLM_NAMESPACE: &str = "openshift-operator-lifecycle-manager";

/// Release download directory for an OLM version
pub fn release_url(release: &str) -> String {
    format!("https://github.com/operator-framework/operator-lifecycle-manager/releases/download/v{release}")
}

fn olm_deployments() -> Vec<CommandLine> {
    [OPENSHIFT_OLM_NAMESPACE, OLM_NAMESPACE]
        .into_iter()
        .map(|ns| CommandLine::get("deployment", "olm-operator").namespace(ns))
        .collect()
}

fn olm_confirmation() -> Confirmation {
    Confirmation::mandatory("olm", "Install OLM", "OLM is required to install Kubero")
}

/// OLM custom resource definitions
#[derive(Debug, Clone, Copy, Default)]
pub struct OlmCrds;

impl Step for OlmCrds {
    fn name(&self) -> &str {
        "olm-crds"
    }

    fn description(&self) -> &str {
        "Install OLM CRDs"
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        let mut checks = vec![CommandLine::get("crd", "subscriptions.operators.coreos.com")];
        checks.extend(olm_deployments());
        checks
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        Some(olm_confirmation())
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let release = ctx.olm_release()?;
        let crds = format!("{}/crds.yaml", release_url(&release));
        ctx.runner().run(&CommandLine::create(&crds))?;
        Ok(())
    }
}

/// OLM and catalog operators
#[derive(Debug, Clone, Copy, Default)]
pub struct OlmOperator;

impl Step for OlmOperator {
    fn name(&self) -> &str {
        "olm"
    }

    fn description(&self) -> &str {
        "Install OLM"
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        olm_deployments()
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        Some(olm_confirmation())
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let release = ctx.olm_release()?;
        let olm = format!("{}/olm.yaml", release_url(&release));
        ctx.runner().run(&CommandLine::create(&olm))?;
        Ok(())
    }

    fn readiness(&self) -> Vec<Readiness> {
        vec![
            Readiness::deployment("olm-operator", OLM_NAMESPACE),
            Readiness::deployment("catalog-operator", OLM_NAMESPACE),
        ]
    }
}
