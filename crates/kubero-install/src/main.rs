//! Kubero Install - Bootstrap Kubero on a Kubernetes cluster
//!
//! Walks through cluster selection, OLM, ingress, metrics, cert-manager,
//! the Kubero operator and the Kubero UI. Every step checks whether its
//! target already exists, so the installer can be re-run safely.
//!
//! # Usage
//!
//! ```bash
//! # Full interactive install
//! kubero-install
//!
//! # Unattended install into an existing kind cluster
//! kubero-install --yes --cluster-type kind -d kubero.example.com
//!
//! # Install a single component
//! kubero-install -c certmanager
//! ```

mod cli_config;
mod config;
mod providers;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};
use console::{Emoji, style};
use kubero_provision::preflight::{check_binaries, missing_required, provider_binary};
use kubero_provision::{
    ClusterProvider, Collaborators, Component, HttpFetcher, IngressProvider, InstallConfig,
    KubeconfigStore, Orchestrator, RunContext, Selector, SystemRunner,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::{DEFAULT_KIND_CLUSTER, config_path, http_timeout, load_config};
use providers::{Kind, Provisioners};
use ui::{CHECK, CROSS, TerminalUi};

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

#[derive(Parser, Debug)]
#[command(name = "kubero-install")]
#[command(version, about = "Install Kubero on a Kubernetes cluster", long_about = None)]
struct Args {
    /// Install a single component: kubernetes, olm, ingress, metrics,
    /// certmanager, kubero, kubero-operator, kubero-ui
    #[arg(short = 'c', long)]
    component: Option<Component>,

    /// Admin username for the Kubero UI
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Password for the admin user
    #[arg(short = 'U', long, env = "KUBERO_ADMIN_PASSWORD", hide_env_values = true)]
    user_password: Option<String>,

    /// API token for the admin user
    #[arg(short = 'a', long, env = "KUBERO_API_TOKEN", hide_env_values = true)]
    apitoken: Option<String>,

    /// Kubero UI HTTP port
    #[arg(short = 'p', long)]
    port: Option<String>,

    /// Kubero UI HTTPS port; the CLI config then points at https
    #[arg(short = 'P', long)]
    secureport: Option<String>,

    /// Domain the Kubero UI is served on
    #[arg(short = 'd', long)]
    domain: Option<String>,

    /// Accept defaults instead of asking (unattended install)
    #[arg(short = 'y', long)]
    yes: bool,

    /// Cluster type: scaleway, linode, gke, digitalocean, kind
    #[arg(long)]
    cluster_type: Option<ClusterProvider>,

    /// ingress-nginx flavour: kind, aws, baremetal, cloud, do, exoscale, scw
    #[arg(long)]
    ingress_provider: Option<IngressProvider>,

    /// Seconds to wait for each component to become ready
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show config file path and exit
    #[arg(long)]
    show_config: bool,
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Show config path and exit
    if args.show_config {
        let path = args.config.clone().unwrap_or_else(config_path);
        println!("{FOLDER}Config: {}", path.display());
        if path.exists() {
            println!("  {CHECK}exists");
        } else {
            println!("  {} not found (will use defaults)", style("!").yellow());
        }
        return Ok(());
    }

    let file = load_config(args.config.as_ref())?;
    let install = config::resolve(&args, &file, |key| std::env::var(key).ok())?;

    preflight(&install)?;
    print_banner(&args, &install);

    let runner = SystemRunner;
    let terminal = TerminalUi::new();
    let fetcher =
        HttpFetcher::new(http_timeout(&file)).context("Failed to set up the HTTP client")?;
    let kind_name = file
        .cluster
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_KIND_CLUSTER.to_string());
    let mut provisioners = Provisioners::new(&runner, Kind::new(kind_name));
    for (provider, argv) in config::provision_commands(&file)? {
        provisioners = provisioners.with_command(provider, argv)?;
    }
    let cli_config = cli_config::TomlCliConfig::default_location();

    let collaborators = Collaborators {
        runner: &runner,
        prompter: &terminal,
        reporter: &terminal,
        fetcher: &fetcher,
        provisioner: &provisioners,
        cli_config: &cli_config,
    };
    let kubeconfig = KubeconfigStore::default_location()?;
    let mut ctx = RunContext::new(install, collaborators, kubeconfig);

    let selector = args
        .component
        .map_or(Selector::Full, Selector::Component);
    let result = Orchestrator::run(selector, &mut ctx);

    ui::print_results(&result);

    if let Some((step, failure)) = result.failure() {
        eprintln!();
        eprintln!("{CROSS}{} {failure}", style(format!("{step} failed:")).red().bold());
        std::process::exit(1);
    }

    Ok(())
}

/// Refuse to start without kubectl; warn about missing provider tools
fn preflight(install: &InstallConfig) -> Result<()> {
    println!("{LOOKING_GLASS}Checking required tools...");
    let checks = check_binaries();

    let missing = missing_required(&checks);
    if !missing.is_empty() {
        for check in checks.iter().filter(|c| !c.found()) {
            eprintln!(
                "  {CROSS}{} {}",
                style(check.binary.name).red(),
                style(check.binary.purpose).dim()
            );
        }
        bail!("Missing required tools: {}", missing.join(", "));
    }

    let provider_tool = install.cluster_provider.and_then(provider_binary);
    if let Some(binary) = provider_tool
        && !checks.iter().any(|c| c.binary.name == binary && c.found())
    {
        println!(
            "  {} {} not found, creating a new cluster may fail",
            style("!").yellow(),
            style(binary).cyan()
        );
    }

    Ok(())
}

fn print_banner(args: &Args, install: &InstallConfig) {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════╗")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("║           KUBERO INSTALLER            ║")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════╝")
            .cyan()
            .bold()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);

    let unset = || "(ask)".to_string();
    table.add_row(vec![
        Cell::new("Install"),
        Cell::new(
            args.component
                .map_or_else(|| "everything".to_string(), |c| c.to_string()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Cluster type"),
        Cell::new(
            install
                .cluster_provider
                .map_or_else(unset, |p| p.to_string()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Domain"),
        Cell::new(install.domain.clone().unwrap_or_else(unset)),
    ]);
    table.add_row(vec![
        Cell::new("Admin user"),
        Cell::new(install.admin_user.clone().unwrap_or_else(unset)),
    ]);
    table.add_row(vec![
        Cell::new("Admin password"),
        Cell::new(if install.admin_password.is_some() {
            "***".to_string()
        } else {
            unset()
        }),
    ]);
    table.add_row(vec![
        Cell::new("Readiness timeout"),
        Cell::new(format!("{}s", install.readiness_timeout.as_secs())),
    ]);
    table.add_row(vec![
        Cell::new("Mode"),
        Cell::new(if install.assume_defaults {
            "unattended"
        } else {
            "interactive"
        }),
    ]);

    println!("{table}");
    println!("\n{ROCKET}Installing...\n");
}
