//! Local kind cluster

use kubero_provision::{CommandLine, CommandRunner, Result};

/// Creates a kind cluster and exports its kubeconfig
#[derive(Debug, Clone)]
pub struct Kind {
    pub name: String,
}

impl Kind {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn create_command(&self) -> CommandLine {
        CommandLine::new("kind").args(["create", "cluster", "--name", self.name.as_str()])
    }

    pub fn kubeconfig_command(&self) -> CommandLine {
        CommandLine::new("kind").args(["get", "kubeconfig", "--name", self.name.as_str()])
    }

    /// Create the cluster; the returned bytes are its kubeconfig
    pub fn provision(&self, runner: &dyn CommandRunner) -> Result<Vec<u8>> {
        runner.run(&self.create_command())?;
        Ok(runner.run(&self.kubeconfig_command())?.stdout)
    }
}
