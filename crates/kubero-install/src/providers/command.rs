//! Operator-supplied provisioning command

use kubero_provision::{CommandLine, CommandRunner, Error, Result};

/// Runs a configured program whose stdout is the new cluster's kubeconfig
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    argv: Vec<String>,
}

impl ExternalCommand {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(Error::provision("provisioning command is empty"));
        }
        Ok(Self { argv })
    }

    pub fn command_line(&self) -> CommandLine {
        CommandLine::new(&self.argv[0]).args(&self.argv[1..])
    }

    pub fn provision(&self, runner: &dyn CommandRunner) -> Result<Vec<u8>> {
        let output = runner.run(&self.command_line())?;
        if output.is_empty() {
            return Err(Error::provision(format!(
                "`{}` printed no kubeconfig",
                self.argv.join(" ")
            )));
        }
        Ok(output.stdout)
    }
}
