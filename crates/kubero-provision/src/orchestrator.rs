//! Installation orchestrator

use tracing::info;

use crate::context::RunContext;
use crate::pipeline::{Component, Pipeline, PipelineResult};

/// What to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    /// Everything, including CLI config and summary
    #[default]
    Full,
    /// One component's steps only
    Component(Component),
}

/// Runs the pipeline a selector stands for
#[derive(Debug, Clone, Copy, Default)]
pub struct Orchestrator;

impl Orchestrator {
    pub fn pipeline(selector: Selector) -> Pipeline {
        match selector {
            Selector::Full => Pipeline::full(),
            Selector::Component(component) => Pipeline::component(component),
        }
    }

    /// Run strictly in order; the first failure ends the run without cleanup
    pub fn run(selector: Selector, ctx: &mut RunContext<'_>) -> PipelineResult {
        let pipeline = Self::pipeline(selector);
        info!(pipeline = %pipeline.name, steps = pipeline.steps.len(), "starting installation");

        let result = pipeline.run(ctx);
        match result.failure() {
            Some((step, failure)) => info!(step, %failure, "installation stopped"),
            None => info!(steps = result.entries.len(), "installation finished"),
        }
        result
    }
}
