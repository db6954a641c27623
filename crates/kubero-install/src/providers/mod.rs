//! Cluster provisioning
//!
//! kind clusters are created directly. Managed clouds are created by a
//! command the operator configures under `[provision.<type>]`; its stdout
//! must be the new cluster's kubeconfig.

mod command;
mod kind;

use std::collections::BTreeMap;

use kubero_provision::{ClusterProvider, ClusterProvisioner, CommandRunner, Error, Result};
use tracing::info;

pub use command::ExternalCommand;
pub use kind::Kind;

/// Dispatches a [`ClusterProvider`] to the way it is created
pub struct Provisioners<'a> {
    runner: &'a dyn CommandRunner,
    kind: Kind,
    commands: BTreeMap<ClusterProvider, ExternalCommand>,
}

impl<'a> Provisioners<'a> {
    pub fn new(runner: &'a dyn CommandRunner, kind: Kind) -> Self {
        Self {
            runner,
            kind,
            commands: BTreeMap::new(),
        }
    }

    /// Use `argv` to create clusters of type `provider`
    pub fn with_command(mut self, provider: ClusterProvider, argv: Vec<String>) -> Result<Self> {
        self.commands.insert(provider, ExternalCommand::new(argv)?);
        Ok(self)
    }
}

impl ClusterProvisioner for Provisioners<'_> {
    fn provision(&self, provider: ClusterProvider) -> Result<Vec<u8>> {
        if let Some(command) = self.commands.get(&provider) {
            info!(%provider, command = %command.command_line(), "running provisioning command");
            return command.provision(self.runner);
        }

        match provider {
            ClusterProvider::Kind => {
                info!(name = %self.kind.name, "creating kind cluster");
                self.kind.provision(self.runner)
            }
            other => Err(Error::provision(format!(
                "no provisioning command configured for {other}; add \
                 [provision.{other}] command = [...] to {} or create the cluster yourself",
                crate::config::config_path().display()
            ))),
        }
    }
}
