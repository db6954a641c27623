//! External command execution
//!
//! Every probe and every action in the installer ends up as a
//! [`CommandLine`] handed to a [`CommandRunner`]. The builder keeps
//! positional arguments, `--from-literal` pairs and the namespace flag
//! apart and renders them once, in insertion order, so the exact
//! invocation is reproducible.

use std::borrow::Cow;
use std::fmt;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// A command invocation: program, arguments, literal pairs and namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    literals: Vec<(String, String)>,
    namespace: Option<String>,
}

impl CommandLine {
    /// Create an invocation of an arbitrary program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            literals: vec![],
            namespace: None,
        }
    }

    /// Create a `kubectl` invocation
    pub fn kubectl() -> Self {
        Self::new("kubectl")
    }

    /// `kubectl get <kind> <name>`
    pub fn get(kind: &str, name: &str) -> Self {
        Self::kubectl().args(["get", kind, name])
    }

    /// `kubectl apply -f <source>`
    pub fn apply(source: &str) -> Self {
        Self::kubectl().args(["apply", "-f", source])
    }

    /// `kubectl create -f <source>`
    pub fn create(source: &str) -> Self {
        Self::kubectl().args(["create", "-f", source])
    }

    /// `kubectl wait --for=condition=available deployment/<name> -n <ns> --timeout=<secs>s`
    pub fn wait_available(deployment: &str, namespace: &str, timeout: Duration) -> Self {
        Self::kubectl()
            .arg("wait")
            .arg("--for=condition=available")
            .arg(format!("deployment/{deployment}"))
            .args(["-n", namespace])
            .arg(format!("--timeout={}", kubectl_duration(timeout)))
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a `--from-literal=KEY=VALUE` pair
    pub fn literal(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.literals.push((key.into(), value.into()));
        self
    }

    /// Target namespace, rendered last as `-n <namespace>`
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Program to execute
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Literal pairs in insertion order
    pub fn literals(&self) -> &[(String, String)] {
        &self.literals
    }

    /// Final argument vector
    pub fn render(&self) -> Vec<String> {
        let mut rendered = self.args.clone();
        rendered.extend(
            self.literals
                .iter()
                .map(|(key, value)| format!("--from-literal={key}={value}")),
        );
        if let Some(namespace) = &self.namespace {
            rendered.push("-n".into());
            rendered.push(namespace.clone());
        }
        rendered
    }

    /// Full command line including literal values (not for display)
    pub fn to_unredacted_string(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.render())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Whole seconds as `Ns`, anything finer as `Nms` (rounded up)
fn kubectl_duration(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_nanos().div_ceil(1_000_000))
    }
}

/// Literal values are secrets, so they are masked
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        for (key, _) in &self.literals {
            write!(f, " --from-literal={key}=***")?;
        }
        if let Some(namespace) = &self.namespace {
            write!(f, " -n {namespace}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Stdout as text
    pub fn stdout_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// True when stdout holds nothing but whitespace
    pub fn is_empty(&self) -> bool {
        self.stdout.trim_ascii().is_empty()
    }
}

/// Runs external commands synchronously
pub trait CommandRunner {
    /// Run the command. Non-zero exit and launch failure are errors.
    fn run(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Run an idempotency probe.
    ///
    /// Errors are folded into empty output: a resource that does not
    /// exist and a cluster that cannot be reached look the same here.
    fn probe(&self, command: &CommandLine) -> Vec<u8> {
        match self.run(command) {
            Ok(output) => output.stdout,
            Err(e) => {
                debug!(command = %command, error = %e, "probe returned nothing");
                Vec::new()
            }
        }
    }
}

/// Runs commands as child processes of the installer
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        debug!(command = %command, "running");

        let output = Command::new(command.program())
            .args(command.render())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Launch {
                program: command.program().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(command = %command, status = ?output.status, "command failed");
            return Err(Error::CommandFailed {
                command: command.to_string(),
                stderr,
            });
        }

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_renders_kind_name_namespace() {
        let cmd = CommandLine::get("deployment", "olm-operator").namespace("olm");
        assert_eq!(
            cmd.render(),
            vec!["get", "deployment", "olm-operator", "-n", "olm"]
        );
    }

    #[test]
    fn test_wait_available_shape() {
        let cmd =
            CommandLine::wait_available("kubero-sample", "kubero", Duration::from_secs(180));
        assert_eq!(
            cmd.to_unredacted_string(),
            "kubectl wait --for=condition=available deployment/kubero-sample -n kubero --timeout=180s"
        );
    }

    #[test]
    fn test_wait_available_keeps_sub_second_timeouts() {
        let cmd = CommandLine::wait_available("olm-operator", "olm", Duration::from_micros(1_250_500));
        assert!(cmd.to_unredacted_string().ends_with("--timeout=1251ms"));

        let cmd = CommandLine::wait_available("olm-operator", "olm", Duration::ZERO);
        assert!(cmd.to_unredacted_string().ends_with("--timeout=0s"));
    }

    #[test]
    fn test_literals_render_in_insertion_order_before_namespace() {
        let cmd = CommandLine::kubectl()
            .args(["create", "secret", "generic", "kubero-secrets"])
            .literal("B", "2")
            .literal("A", "1")
            .namespace("kubero");

        assert_eq!(
            cmd.render(),
            vec![
                "create",
                "secret",
                "generic",
                "kubero-secrets",
                "--from-literal=B=2",
                "--from-literal=A=1",
                "-n",
                "kubero",
            ]
        );
    }

    #[test]
    fn test_display_masks_literal_values() {
        let cmd = CommandLine::kubectl()
            .args(["create", "secret", "generic", "s"])
            .literal("KUBERO_SESSION_KEY", "hunter2");
        let shown = cmd.to_string();

        assert!(shown.contains("--from-literal=KUBERO_SESSION_KEY=***"));
        assert!(!shown.contains("hunter2"));
        assert!(cmd.to_unredacted_string().contains("hunter2"));
    }

    #[test]
    fn test_output_whitespace_is_empty() {
        let output = CommandOutput {
            stdout: b" \n".to_vec(),
            stderr: vec![],
        };
        assert!(output.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_stdout() {
        let cmd = CommandLine::new("sh").args(["-c", "echo ready"]);
        let output = SystemRunner.run(&cmd).unwrap();
        assert_eq!(output.stdout_str().trim(), "ready");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_nonzero_exit_is_error() {
        let cmd = CommandLine::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        match SystemRunner.run(&cmd) {
            Err(Error::CommandFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_folds_errors_into_empty_output() {
        let cmd = CommandLine::new("sh").args(["-c", "exit 1"]);
        assert!(SystemRunner.probe(&cmd).is_empty());

        let missing = CommandLine::new("kubero-definitely-not-a-binary");
        assert!(matches!(
            SystemRunner.run(&missing),
            Err(Error::Launch { .. })
        ));
        assert!(SystemRunner.probe(&missing).is_empty());
    }
}
