//! Kubero Provision - Cluster Installation Library
//!
//! This crate installs the Kubero platform onto a Kubernetes cluster as a
//! sequence of idempotent steps: every step probes for its target resource,
//! asks before acting, performs a single mutation and waits for readiness.
//!
//! # Architecture
//!
//! - [`Step`] trait: Common interface for all installation steps
//! - [`steps`] module: Concrete steps (cluster, OLM, ingress, operators, UI)
//! - [`Pipeline`]: Ordered step list for a full install or one component
//! - [`Orchestrator`]: Runs a pipeline, halting at the first failure
//! - [`RunContext`]: Configuration and collaborators threaded through a run
//! - [`kubeconfig`] module: Merging new cluster credentials into a kubeconfig
//!
//! # Example
//!
//! ```ignore
//! use kubero_provision::{InstallConfig, Orchestrator, RunContext, Selector};
//!
//! let config = InstallConfig::builder()
//!     .domain("kubero.example.com")
//!     .assume_defaults(true)
//!     .build();
//!
//! let mut ctx = RunContext::new(config, collaborators, KubeconfigStore::default_location()?);
//! let result = Orchestrator::run(Selector::Full, &mut ctx);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod kubeconfig;
pub mod orchestrator;
pub mod pipeline;
pub mod poller;
pub mod preflight;
pub mod runner;
pub mod secrets;
pub mod steps;

#[cfg(test)]
mod testing;

pub use config::{ClusterProvider, IngressProvider, InstallConfig, VcsSetting};
pub use context::{
    CliConfigStore, ClusterProvisioner, Collaborators, InstallSummary, ManifestFetcher, Prompter,
    Reporter, RunContext,
};
pub use error::{Error, Result};
pub use fetch::HttpFetcher;
pub use kubeconfig::{Kubeconfig, KubeconfigStore};
pub use orchestrator::{Orchestrator, Selector};
pub use pipeline::{Component, Pipeline, PipelineResult};
pub use poller::{Poller, Probe};
pub use runner::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use secrets::{SecretBundle, UserRecord, VcsCredentials, VcsProvider};
pub use steps::{Step, StepFailure, StepOutcome};
