//! Namespace creation

use super::{Confirmation, Step};
use crate::context::RunContext;
use crate::error::Result;
use crate::runner::CommandLine;

/// Create a namespace unless it exists
#[derive(Debug, Clone)]
pub struct EnsureNamespace {
    /// Namespace name
    pub namespace: String,
    confirmation: Option<Confirmation>,
    description: String,
}

impl EnsureNamespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let description = format!("Create namespace {namespace}");
        Self {
            namespace,
            confirmation: None,
            description,
        }
    }

    /// Ask before creating
    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }
}

impl Step for EnsureNamespace {
    fn name(&self) -> &str {
        "kubero-namespace"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        vec![CommandLine::get("ns", &self.namespace)]
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        self.confirmation.clone()
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let cmd = CommandLine::kubectl().args(["create", "namespace", &self.namespace]);
        ctx.runner().run(&cmd)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallConfig;
    use crate::steps::{StepOutcome, execute};
    use crate::testing::Harness;

    #[test]
    fn test_existing_namespace_is_skipped() {
        let harness = Harness::new();
        harness.runner.succeed("get ns kubero", "kubero   Active   3d");
        let mut ctx = harness.context(InstallConfig::default());

        assert_eq!(
            execute(&EnsureNamespace::new("kubero"), &mut ctx),
            StepOutcome::Skipped
        );
        assert!(harness.runner.mutations().is_empty());
    }

    #[test]
    fn test_missing_namespace_is_created() {
        let harness = Harness::new();
        let mut ctx = harness.context(InstallConfig::default());

        assert_eq!(
            execute(&EnsureNamespace::new("kubero"), &mut ctx),
            StepOutcome::Installed
        );
        assert_eq!(harness.runner.mutations(), vec!["kubectl create namespace kubero"]);
    }
}
