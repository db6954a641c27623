//! Trailing steps of a full installation

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Confirmation, KUBERO_NAMESPACE, Step};
use crate::context::{InstallSummary, RunContext};
use crate::error::Result;
use crate::runner::CommandLine;

/// Write `api.url` and `api.token` for the Kubero CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteCliConfig;

impl Step for WriteCliConfig {
    fn name(&self) -> &str {
        "cli-config"
    }

    fn description(&self) -> &str {
        "Generate CLI config"
    }

    /// Without a token there is nothing sensible to write non-interactively
    fn confirmation(&self, ctx: &RunContext<'_>) -> Option<Confirmation> {
        let default = !ctx.config.assume_defaults || ctx.config.api_token.is_some();
        Some(Confirmation::optional("cli-config", "Generate CLI config").default_answer(default))
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let default_url = if let Some(url) = ctx.config.cli_api_url.clone() {
            url
        } else {
            let domain = ctx.domain()?;
            match (&ctx.config.secure_port, &ctx.config.port) {
                (Some(port), _) => format!("https://{domain}:{port}"),
                (None, Some(port)) => format!("http://{domain}:{port}"),
                (None, None) => format!("http://{domain}"),
            }
        };
        let url = ctx.ask("Kubero host address", &default_url)?;
        let token_default = ctx.config.api_token.clone().unwrap_or_default();
        let token = ctx.ask("Kubero token", &token_default)?;

        let path = ctx.cli_config().write(&url, &token)?;
        ctx.config.cli_api_url = Some(url);
        ctx.reporter()
            .info(&format!("CLI config written to {}", path.display()));
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct IngressList {
    #[serde(default)]
    items: Vec<Ingress>,
}

#[derive(Debug, Default, Deserialize)]
struct Ingress {
    #[serde(default)]
    spec: IngressSpec,
    #[serde(default)]
    status: IngressStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IngressSpec {
    #[serde(default)]
    rules: Vec<IngressRule>,
}

#[derive(Debug, Default, Deserialize)]
struct IngressRule {
    host: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IngressStatus {
    #[serde(default, rename = "loadBalancer")]
    load_balancer: LoadBalancer,
}

#[derive(Debug, Default, Deserialize)]
struct LoadBalancer {
    #[serde(default)]
    ingress: Vec<LoadBalancerIngress>,
}

#[derive(Debug, Default, Deserialize)]
struct LoadBalancerIngress {
    ip: Option<String>,
    hostname: Option<String>,
}

/// DNS records pointing each ingress host at its load balancer
///
/// Hosts without an assigned load balancer address are left out.
pub fn dns_records(ingress_json: &[u8]) -> Result<Vec<String>> {
    let list: IngressList = serde_json::from_slice(ingress_json)?;

    let mut records = Vec::new();
    for item in &list.items {
        let Some(target) = item.status.load_balancer.ingress.first() else {
            continue;
        };
        let hosts = item
            .spec
            .rules
            .iter()
            .filter_map(|r| r.host.as_deref())
            .filter(|h| !h.is_empty());
        for host in hosts {
            match (target.ip.as_deref(), target.hostname.as_deref()) {
                (Some(ip), _) if !ip.is_empty() => records.push(format!("{host}.\tIN\tA\t{ip}")),
                (_, Some(name)) if !name.is_empty() => {
                    records.push(format!("{host}.\tIN\tCNAME\t{name}."));
                }
                _ => {}
            }
        }
    }
    Ok(records)
}

/// Tell the operator which DNS records the UI needs
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsGuidance;

impl Step for DnsGuidance {
    fn name(&self) -> &str {
        "dns-guidance"
    }

    fn description(&self) -> &str {
        "Show DNS records"
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let cmd = CommandLine::kubectl().args(["get", "ingress", "-n", KUBERO_NAMESPACE, "-o", "json"]);
        let output = match ctx.runner().run(&cmd) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "cannot read kubero ingress");
                ctx.reporter().warn("Failed to fetch DNS information");
                return Ok(());
            }
        };

        let records = dns_records(&output.stdout)?;
        ctx.reporter()
            .warn("Make sure your DNS is pointing to your Kubernetes cluster");
        if records.is_empty() {
            debug!("no load balancer address assigned yet");
        }
        for record in &records {
            ctx.reporter().info(record);
        }
        Ok(())
    }
}

/// Closing message with the UI credentials when they are all known
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalSummary;

impl Step for FinalSummary {
    fn name(&self) -> &str {
        "summary"
    }

    fn description(&self) -> &str {
        "Installation summary"
    }

    fn apply(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let config = &ctx.config;
        let summary = match (
            &config.domain,
            &config.port,
            &config.api_token,
            &config.admin_password,
        ) {
            (Some(domain), Some(port), Some(_), Some(password)) => InstallSummary {
                url: Some(format!("{domain}:{port}")),
                user: config.admin_user.clone(),
                password: Some(password.clone()),
            },
            _ => InstallSummary::default(),
        };
        ctx.reporter().summary(&summary);
        Ok(())
    }
}
