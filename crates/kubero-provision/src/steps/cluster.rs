//! Cluster provisioning and verification

use tracing::info;

use super::{Confirmation, Step};
use crate::context::RunContext;
use crate::error::Result;
use crate::runner::CommandLine;

/// Create a cluster through the provisioner and merge its kubeconfig
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionCluster;

impl Step for ProvisionCluster {
    fn name(&self) -> &str {
        "provision-cluster"
    }

    fn description(&self) -> &str {
        "Start a kubernetes cluster"
    }

    /// Non-interactive runs only create a cluster when a provider was given
    fn confirmation(&self, ctx: &RunContext<'_>) -> Option<Confirmation> {
        let default = !ctx.config.assume_defaults || ctx.config.cluster_provider.is_some();
        Some(
            Confirmation::optional("provision-cluster", "Start a kubernetes cluster")
                .default_answer(default),
        )
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let provider = ctx.cluster_provider("Select a cluster type")?;
        ctx.reporter()
            .info(&format!("Provisioning a {provider} cluster, this may take a while"));

        let kubeconfig = ctx.provisioner().provision(provider)?;
        let merged = ctx.kubeconfig().merge_in(&kubeconfig)?;

        let current = merged.current_context.unwrap_or_default();
        info!(%provider, context = %current, "cluster provisioned");
        ctx.reporter().info(&format!(
            "Kubeconfig {} updated, current context is {current}",
            ctx.kubeconfig().path().display()
        ));
        Ok(())
    }
}

/// Make sure kubectl reaches the cluster the operator means to install on
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyCluster;

impl Step for VerifyCluster {
    fn name(&self) -> &str {
        "verify-cluster"
    }

    fn description(&self) -> &str {
        "Check the target cluster"
    }

    /// Lists the known contexts so the operator sees what they confirm
    fn confirmation(&self, ctx: &RunContext<'_>) -> Option<Confirmation> {
        let contexts = ctx
            .runner()
            .probe(&CommandLine::kubectl().args(["config", "get-contexts"]));
        if !contexts.trim_ascii().is_empty() {
            ctx.reporter()
                .info(String::from_utf8_lossy(&contexts).trim_end());
        }

        let current = ctx
            .runner()
            .probe(&CommandLine::kubectl().args(["config", "current-context"]));
        let current = String::from_utf8_lossy(&current).trim().to_string();

        let prompt = if current.is_empty() {
            "Install Kubero on the current kubectl context?".to_string()
        } else {
            format!("Install Kubero on the current context '{current}'?")
        };
        Some(Confirmation::mandatory(
            "verify-cluster",
            prompt,
            "switch to the target cluster with `kubectl config use-context <name>` and run the installer again",
        ))
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let info = ctx
            .runner()
            .run(&CommandLine::kubectl().arg("cluster-info"))?;
        ctx.reporter().info(info.stdout_str().trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterProvider, InstallConfig};
    use crate::steps::{StepFailure, StepOutcome, execute};
    use crate::testing::Harness;

    #[test]
    fn test_provision_merges_kubeconfig() {
        let harness = Harness::new();
        harness.prompter.answer("Select a cluster type", "kind");
        let mut ctx = harness.context(InstallConfig::default());

        assert_eq!(execute(&ProvisionCluster, &mut ctx), StepOutcome::Installed);
        assert_eq!(harness.provisioner.provisioned(), vec![ClusterProvider::Kind]);
        assert_eq!(ctx.config.cluster_provider, Some(ClusterProvider::Kind));

        let on_disk = ctx.kubeconfig().load().unwrap();
        assert_eq!(on_disk.current_context.as_deref(), Some("kind-kubero"));
    }

    #[test]
    fn test_provision_failure_is_an_action_failure() {
        let harness = Harness::new();
        harness.provisioner.fail("quota exceeded");
        let config = InstallConfig::builder()
            .cluster_provider(ClusterProvider::Linode)
            .build();
        let mut ctx = harness.context(config);

        match execute(&ProvisionCluster, &mut ctx) {
            StepOutcome::Failed(StepFailure::Action(message)) => {
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("expected action failure, got {other:?}"),
        }
        assert!(!harness.kubeconfig_path().exists());
    }

    #[test]
    fn test_assume_defaults_without_provider_keeps_existing_cluster() {
        let harness = Harness::new();
        let config = InstallConfig::builder().assume_defaults(true).build();
        let mut ctx = harness.context(config);

        assert_eq!(execute(&ProvisionCluster, &mut ctx), StepOutcome::Declined);
        assert!(harness.provisioner.provisioned().is_empty());
    }

    #[test]
    fn test_verify_names_current_context() {
        let harness = Harness::new();
        let mut ctx = harness.context(InstallConfig::default());

        assert_eq!(execute(&VerifyCluster, &mut ctx), StepOutcome::Installed);
        assert!(harness.prompter.asked()[0].contains("'kind-kubero'"));
        assert_eq!(harness.runner.count("kubectl cluster-info"), 1);
    }

    #[test]
    fn test_verify_decline_is_fatal() {
        let harness = Harness::new();
        harness.prompter.answer("current context", "n");
        let mut ctx = harness.context(InstallConfig::default());

        assert!(matches!(
            execute(&VerifyCluster, &mut ctx),
            StepOutcome::Failed(StepFailure::MandatoryDeclined(_))
        ));
        assert_eq!(harness.runner.count("cluster-info"), 0);
    }

    #[test]
    fn test_contexts_listed_before_asking() {
        let harness = Harness::new();
        harness.runner.succeed(
            "config get-contexts",
            "CURRENT   NAME          CLUSTER\n*         kind-kubero   kind-kubero\n          prod          prod\n",
        );
        harness.prompter.answer("current context", "n");
        let mut ctx = harness.context(InstallConfig::default());

        assert!(execute(&VerifyCluster, &mut ctx).is_failed());
        assert!(
            harness
                .reporter
                .messages()
                .iter()
                .any(|m| m.contains("prod          prod"))
        );
        assert_eq!(harness.runner.count("cluster-info"), 0);
    }

    #[test]
    fn test_unreachable_cluster_fails() {
        let harness = Harness::new();
        harness
            .runner
            .fail("cluster-info", "The connection to the server localhost:8080 was refused");
        let mut ctx = harness.context(InstallConfig::default());

        assert!(execute(&VerifyCluster, &mut ctx).is_failed());
    }
}
