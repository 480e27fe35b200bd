//! End-to-end build pipeline composition.
//!
//! Sequences checkout, version read, image build, and the bounded
//! container run, and guarantees the run's container is reaped after the
//! runner returns, whatever the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;
use crate::image::{ImageBuilder, ToolchainPin};
use crate::reaper;
use crate::report::{Reporter, TracingReporter};
use crate::runner::{BoundedRunner, RunStatus, RunnerConfig};
use crate::source::{SourceFetcher, DEFAULT_BRANCH, DEFAULT_CLONE_DEPTH};
use crate::version;

/// Configuration shared by all pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// git program used for checkout.
    pub git: String,
    /// Branch cloned before the pinned revision is checked out.
    pub branch: String,
    /// Shallow-clone depth.
    pub clone_depth: u32,
    /// Toolchain pin applied to the recipe before the image build.
    pub pin: Option<ToolchainPin>,
    /// Container run configuration; its engine program is also used for
    /// the image build and the final reap.
    pub runner: RunnerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            clone_depth: DEFAULT_CLONE_DEPTH,
            pin: Some(ToolchainPin::go_154_to_153()),
            runner: RunnerConfig::default(),
        }
    }
}

/// One build to perform.
///
/// `container` must be unique across concurrent invocations, and
/// `workdir` must be exclusively owned by this invocation; neither is
/// enforced here.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub repo: String,
    pub revision: String,
    pub image: String,
    pub container: String,
    pub workdir: PathBuf,
    pub deadline: Duration,
}

/// Record of a completed pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub repo: String,
    pub revision: String,
    pub version: String,
    pub image: String,
    pub container: String,
    pub outcome: RunStatus,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Composes the build stages over one working tree.
pub struct BuildPipeline {
    fetcher: SourceFetcher,
    builder: ImageBuilder,
    runner: BoundedRunner,
    engine: String,
    reporter: Arc<dyn Reporter>,
}

impl BuildPipeline {
    pub fn new(config: PipelineConfig, reporter: Arc<dyn Reporter>) -> Self {
        let engine = config.runner.engine.clone();
        Self {
            fetcher: SourceFetcher::new()
                .with_git(config.git)
                .with_branch(config.branch)
                .with_depth(config.clone_depth),
            builder: ImageBuilder::new()
                .with_engine(engine.clone())
                .with_pin(config.pin),
            runner: BoundedRunner::new(config.runner),
            engine,
            reporter,
        }
    }

    /// Pipeline with the default tracing reporter.
    pub fn with_tracing(config: PipelineConfig) -> Self {
        Self::new(config, Arc::new(TracingReporter))
    }

    /// Runs one build end to end.
    ///
    /// Halts at the first failing stage. The run's container is removed
    /// after the runner returns on every path, including timeouts and
    /// hard errors; removal failures are reported, never propagated.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildReport, PipelineError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let tree = self
            .fetcher
            .fetch(&request.repo, &request.revision, &request.workdir)
            .await?;

        // The version is read as soon as the tree exists; it does not
        // depend on the build succeeding.
        let version = version::binary_version(tree.root())?;
        info!(
            repo = %request.repo,
            revision = %request.revision,
            version = %version,
            "Source fetched"
        );

        self.builder.build(&tree, &request.image).await?;

        let result = self
            .runner
            .run(
                &tree,
                &request.image,
                &request.container,
                request.deadline,
                self.reporter.as_ref(),
            )
            .await;

        // Mandatory teardown: runs for every runner outcome before the
        // result is surfaced.
        reaper::remove_container(&self.engine, &request.container, self.reporter.as_ref()).await;

        let outcome = result?;
        Ok(BuildReport {
            repo: request.repo.clone(),
            revision: request.revision.clone(),
            version,
            image: request.image.clone(),
            container: request.container.clone(),
            outcome,
            started_at,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}
