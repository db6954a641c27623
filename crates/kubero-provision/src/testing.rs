//! Scripted collaborators for tests

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use tempfile::TempDir;

use crate::config::{ClusterProvider, InstallConfig};
use crate::context::{
    ClusterProvisioner, CliConfigStore, Collaborators, InstallSummary, ManifestFetcher, Prompter,
    Reporter, RunContext,
};
use crate::error::{Error, Result};
use crate::kubeconfig::KubeconfigStore;
use crate::runner::{CommandLine, CommandOutput, CommandRunner};
use crate::steps::{KUBERO_SAMPLE_URL, StepOutcome};

pub const API_RESOURCES: &str = "kuberoes  application.kubero.dev/v1alpha1  true  Kubero";

pub const KIND_KUBECONFIG: &str = r"
apiVersion: v1
kind: Config
clusters:
- name: kind-kubero
  cluster:
    server: https://127.0.0.1:6443
users:
- name: kind-kubero
  user:
    client-certificate-data: Y2VydA==
contexts:
- name: kind-kubero
  context:
    cluster: kind-kubero
    user: kind-kubero
current-context: kind-kubero
";

pub const KUBERO_SAMPLE: &str = r"
apiVersion: application.kubero.dev/v1alpha1
kind: Kubero
metadata:
  name: kubero-sample
spec:
  replicaCount: 1
  image:
    repository: ghcr.io/kubero-dev/kubero/kubero
    tag: latest
  ingress:
    enabled: true
    className: ''
    hosts:
    - host: kubero.lacolhost.com
      paths:
      - path: /
        pathType: ImplementationSpecific
  kubero:
    debug: ''
    namespace: kubero
    context: inClusterContext
    webhook_url: https://kubero.lacolhost.com/api/repo/webhooks
";

struct Rule {
    pattern: String,
    responses: VecDeque<std::result::Result<String, String>>,
}

/// Command runner answering from scripted rules
///
/// A rule matches when the unredacted command line contains its pattern;
/// later rules win. Each rule hands out its responses in order and keeps
/// repeating the last one. Unmatched `kubectl get` calls fail with
/// NotFound, `api-resources` lists a Kubero type, the current context is
/// `kind-kubero` and everything else succeeds silently.
#[derive(Default)]
pub struct FakeRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond<'s>(
        &self,
        pattern: &str,
        responses: impl IntoIterator<Item = std::result::Result<&'s str, &'s str>>,
    ) {
        let responses = responses
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            responses,
        });
    }

    pub fn succeed(&self, pattern: &str, stdout: &str) {
        self.respond(pattern, [Ok(stdout)]);
    }

    pub fn fail(&self, pattern: &str, stderr: &str) {
        self.respond(pattern, [Err(stderr)]);
    }

    /// Every command line run so far, unredacted
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }

    /// Calls that change the cluster
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with("kubectl apply") || c.starts_with("kubectl create"))
            .cloned()
            .collect()
    }

    fn scripted(&self, line: &str) -> Option<std::result::Result<String, String>> {
        let mut rules = self.rules.borrow_mut();
        let rule = rules.iter_mut().rev().find(|r| line.contains(&r.pattern))?;
        if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        }
    }

    fn fallback(line: &str) -> std::result::Result<String, String> {
        if line.starts_with("kubectl get ") {
            Err("Error from server (NotFound)".into())
        } else if line.contains("api-resources") {
            Ok(API_RESOURCES.into())
        } else if line.contains("config current-context") {
            Ok("kind-kubero\n".into())
        } else {
            Ok(String::new())
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        let line = command.to_unredacted_string();
        self.calls.borrow_mut().push(line.clone());

        match self
            .scripted(&line)
            .unwrap_or_else(|| Self::fallback(&line))
        {
            Ok(stdout) => Ok(CommandOutput {
                stdout: stdout.into_bytes(),
                stderr: vec![],
            }),
            Err(stderr) => Err(Error::CommandFailed {
                command: command.to_string(),
                stderr,
            }),
        }
    }
}

/// Prompter answering by prompt fragment
///
/// Unanswered prompts take their default.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<Vec<(String, String)>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answer(&self, fragment: &str, answer: &str) {
        self.answers
            .borrow_mut()
            .push((fragment.to_string(), answer.to_string()));
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn lookup(&self, prompt: &str) -> Option<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.answers
            .borrow()
            .iter()
            .rev()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, answer)| answer.clone())
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(match self.lookup(prompt).as_deref() {
            Some("y" | "yes") => true,
            Some("n" | "no") => false,
            _ => default,
        })
    }

    fn input(&self, prompt: &str, default: &str) -> Result<String> {
        Ok(self.lookup(prompt).unwrap_or_else(|| default.to_string()))
    }

    fn select(&self, prompt: &str, options: &[&str], default: usize) -> Result<usize> {
        Ok(self
            .lookup(prompt)
            .and_then(|answer| options.iter().position(|o| o.starts_with(answer.as_str())))
            .unwrap_or(default))
    }
}

/// Reporter keeping everything it is told
#[derive(Default)]
pub struct RecordingReporter {
    finished: RefCell<Vec<(String, StepOutcome)>>,
    messages: RefCell<Vec<String>>,
    warnings: RefCell<Vec<String>>,
    summaries: RefCell<Vec<InstallSummary>>,
}

impl RecordingReporter {
    pub fn finished(&self) -> Vec<(String, StepOutcome)> {
        self.finished.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    pub fn summaries(&self) -> Vec<InstallSummary> {
        self.summaries.borrow().clone()
    }
}

impl Reporter for RecordingReporter {
    fn action_started(&self, step: &str, description: &str) {
        self.messages
            .borrow_mut()
            .push(format!("{step}: {description}"));
    }

    fn waiting(&self, step: &str, probe: &str) {
        self.messages
            .borrow_mut()
            .push(format!("{step}: waiting for {probe}"));
    }

    fn step_finished(&self, step: &str, outcome: &StepOutcome) {
        self.finished
            .borrow_mut()
            .push((step.to_string(), outcome.clone()));
    }

    fn info(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }

    fn summary(&self, summary: &InstallSummary) {
        self.summaries.borrow_mut().push(summary.clone());
    }
}

/// Fetcher serving fixed documents
#[derive(Default)]
pub struct StaticFetcher {
    documents: RefCell<BTreeMap<String, Vec<u8>>>,
    requests: RefCell<Vec<String>>,
}

impl StaticFetcher {
    pub fn serve(&self, url: &str, body: &str) {
        self.documents
            .borrow_mut()
            .insert(url.to_string(), body.as_bytes().to_vec());
    }

    /// Stop serving everything
    pub fn clear(&self) {
        self.documents.borrow_mut().clear();
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ManifestFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.documents.borrow().get(url).cloned().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("404 for {url}"),
            ))
        })
    }
}

/// Provisioner handing back a fixed kubeconfig
pub struct FakeProvisioner {
    kubeconfig: RefCell<std::result::Result<String, String>>,
    provisioned: RefCell<Vec<ClusterProvider>>,
}

impl Default for FakeProvisioner {
    fn default() -> Self {
        Self {
            kubeconfig: RefCell::new(Ok(KIND_KUBECONFIG.to_string())),
            provisioned: RefCell::new(vec![]),
        }
    }
}

impl FakeProvisioner {
    pub fn fail(&self, message: &str) {
        *self.kubeconfig.borrow_mut() = Err(message.to_string());
    }

    pub fn provisioned(&self) -> Vec<ClusterProvider> {
        self.provisioned.borrow().clone()
    }
}

impl ClusterProvisioner for FakeProvisioner {
    fn provision(&self, provider: ClusterProvider) -> Result<Vec<u8>> {
        self.provisioned.borrow_mut().push(provider);
        self.kubeconfig
            .borrow()
            .clone()
            .map(String::into_bytes)
            .map_err(Error::provision)
    }
}

/// CLI config store keeping the last write in memory
#[derive(Default)]
pub struct MemoryCliConfig {
    written: RefCell<Option<(String, String)>>,
}

impl MemoryCliConfig {
    pub fn written(&self) -> Option<(String, String)> {
        self.written.borrow().clone()
    }
}

impl CliConfigStore for MemoryCliConfig {
    fn write(&self, url: &str, token: &str) -> Result<PathBuf> {
        *self.written.borrow_mut() = Some((url.to_string(), token.to_string()));
        Ok(PathBuf::from("kubero/config.toml"))
    }
}

/// All fakes plus a scratch directory for the kubeconfig
pub struct Harness {
    pub runner: FakeRunner,
    pub prompter: ScriptedPrompter,
    pub reporter: RecordingReporter,
    pub fetcher: StaticFetcher,
    pub provisioner: FakeProvisioner,
    pub cli_config: MemoryCliConfig,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let fetcher = StaticFetcher::default();
        fetcher.serve(KUBERO_SAMPLE_URL, KUBERO_SAMPLE);
        Self {
            runner: FakeRunner::new(),
            prompter: ScriptedPrompter::default(),
            reporter: RecordingReporter::default(),
            fetcher,
            provisioner: FakeProvisioner::default(),
            cli_config: MemoryCliConfig::default(),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn kubeconfig_path(&self) -> PathBuf {
        self.dir.path().join("kube").join("config")
    }

    pub fn context(&self, config: InstallConfig) -> RunContext<'_> {
        self.context_with_runner(&self.runner, config)
    }

    /// Context whose commands go to `runner` instead of the scripted one
    pub fn context_with_runner<'a>(
        &'a self,
        runner: &'a dyn CommandRunner,
        config: InstallConfig,
    ) -> RunContext<'a> {
        let collaborators = Collaborators {
            runner,
            prompter: &self.prompter,
            reporter: &self.reporter,
            fetcher: &self.fetcher,
            provisioner: &self.provisioner,
            cli_config: &self.cli_config,
        };
        RunContext::new(
            config,
            collaborators,
            KubeconfigStore::new(self.kubeconfig_path()),
        )
    }
}
