//! Kubero UI custom resource

use std::io::Write;

use serde_yaml::Value;
use tracing::{info, warn};

use super::{Confirmation, KUBERO_NAMESPACE, Readiness, Step};
use crate::config::ClusterProvider;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::runner::CommandLine;

/// Sample `Kubero` resource published with the operator
pub const KUBERO_SAMPLE_URL: &str = "https://raw.githubusercontent.com/kubero-dev/kubero-operator/main/config/samples/application_v1alpha1_kubero.yaml";

fn field<'v>(value: &'v mut Value, key: &str) -> Result<&'v mut Value> {
    value
        .get_mut(key)
        .ok_or_else(|| Error::validation(format!("Kubero sample has no `{key}` field")))
}

fn set(value: &mut Value, key: &str, to: &str) -> Result<()> {
    let mapping = value
        .as_mapping_mut()
        .ok_or_else(|| Error::validation(format!("cannot set `{key}` on a non-mapping")))?;
    mapping.insert(Value::from(key), Value::from(to));
    Ok(())
}

/// Point the sample at our domain and webhook URL
///
/// `spec.ingress.className` is forced to `nginx` when `nginx_class` is set.
pub fn customize_sample(
    sample: &[u8],
    domain: &str,
    webhook_url: &str,
    nginx_class: bool,
) -> Result<String> {
    let mut doc: Value = serde_yaml::from_slice(sample)?;
    let spec = field(&mut doc, "spec")?;

    let ingress = field(spec, "ingress")?;
    let first_host = field(ingress, "hosts")?
        .get_mut(0)
        .ok_or_else(|| Error::validation("Kubero sample has no ingress host"))?;
    set(first_host, "host", domain)?;
    if nginx_class {
        set(ingress, "className", "nginx")?;
    }

    set(field(spec, "kubero")?, "webhook_url", webhook_url)?;

    Ok(serde_yaml::to_string(&doc)?)
}

/// Apply the customized Kubero resource from a temporary file
///
/// The file is removed after a successful apply and kept for a manual
/// retry otherwise.
#[derive(Debug, Clone, Default)]
pub struct ApplyKuberoUi {
    confirmation: Option<Confirmation>,
}

impl ApplyKuberoUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask before applying
    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }
}

impl Step for ApplyKuberoUi {
    fn name(&self) -> &str {
        "kubero-ui"
    }

    fn description(&self) -> &str {
        "Install Kubero UI"
    }

    fn check_commands(&self) -> Vec<CommandLine> {
        vec![
            CommandLine::kubectl()
                .args(["get", "kuberoes.application.kubero.dev"])
                .namespace(KUBERO_NAMESPACE),
        ]
    }

    fn confirmation(&self, _ctx: &RunContext<'_>) -> Option<Confirmation> {
        self.confirmation.clone()
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let sample = ctx.fetcher().fetch(KUBERO_SAMPLE_URL)?;
        let domain = ctx.domain()?;
        let webhook_url = ctx.webhook_url()?;
        let nginx_class = ctx
            .installed_cluster()?
            .is_some_and(ClusterProvider::needs_nginx_class);
        let manifest = customize_sample(&sample, &domain, &webhook_url, nginx_class)?;

        let mut file = tempfile::Builder::new()
            .prefix("kuberoUI-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(manifest.as_bytes())?;
        file.flush()?;

        let path = file.path().to_string_lossy().into_owned();
        let cmd = CommandLine::apply(&path).namespace(KUBERO_NAMESPACE);
        match ctx.runner().run(&cmd) {
            Ok(_) => {
                file.close()?;
                info!(%domain, "Kubero UI resource applied");
                Ok(())
            }
            Err(e) => {
                let (_, path) = file.keep().map_err(|e| Error::Io(e.error))?;
                warn!(path = %path.display(), "keeping Kubero UI manifest");
                Err(Error::ManifestKept {
                    path,
                    message: e.to_string(),
                })
            }
        }
    }

    fn readiness(&self) -> Vec<Readiness> {
        vec![Readiness::deployment("kubero-sample", KUBERO_NAMESPACE)]
    }
}
