//! Command-line interface for binforge.
//!
//! Thin caller around [`BuildPipeline`]: parses arguments, picks a
//! working directory, runs one build, and prints the report as JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::pipeline::{BuildPipeline, BuildRequest, PipelineConfig};
use crate::source::DEFAULT_BRANCH;

/// Default wall-clock ceiling for one containerized build.
const DEFAULT_DEADLINE_SECS: u64 = 7200;

/// Build release binaries for a pinned source revision inside a container.
#[derive(Parser, Debug)]
#[command(name = "binforge")]
#[command(about = "Containerized release-binary builder")]
#[command(version)]
#[command(
    long_about = "binforge checks out a pinned revision, builds a container image from its \
Dockerfile, and runs the build command inside a fresh privileged container under a hard \
deadline. The container is always removed afterwards.\n\nExample usage:\n  binforge \
https://github.com/docker/docker.git abc123 --image docker-build --deadline-secs 3600"
)]
pub struct Cli {
    /// Repository to build (URL or local path).
    pub repo: String,

    /// Revision (commit, branch, or tag) to pin the build to.
    pub revision: String,

    /// Tag for the image built from the revision's Dockerfile.
    #[arg(short, long, default_value = "binforge-build")]
    pub image: String,

    /// Container name for the build run. Must be unique per concurrent
    /// run; derived from the revision when omitted.
    #[arg(short, long)]
    pub container: Option<String>,

    /// Directory to check the source out into. A temporary directory is
    /// used (and discarded) when omitted.
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Branch cloned before the revision is checked out.
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Maximum build duration in seconds before the run is killed.
    #[arg(short = 't', long, default_value_t = DEFAULT_DEADLINE_SECS)]
    pub deadline_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs one build for the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep the tempdir guard alive for the whole build.
    let mut tempdir = None;
    let workdir = match &cli.workdir {
        Some(dir) => dir.clone(),
        None => {
            let dir = tempfile::tempdir().context("creating working directory")?;
            let path = dir.path().to_path_buf();
            tempdir = Some(dir);
            path
        }
    };

    let container = cli
        .container
        .clone()
        .unwrap_or_else(|| container_name(&cli.revision));

    let config = PipelineConfig {
        branch: cli.branch.clone(),
        ..PipelineConfig::default()
    };
    let request = BuildRequest {
        repo: cli.repo.clone(),
        revision: cli.revision.clone(),
        image: cli.image.clone(),
        container,
        workdir,
        deadline: Duration::from_secs(cli.deadline_secs),
    };

    let report = BuildPipeline::with_tracing(config).run(&request).await?;
    info!(
        version = %report.version,
        container = %report.container,
        "Build finished in {:.1}s",
        report.duration_secs
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    drop(tempdir);
    Ok(())
}

/// Derives a safe default container name from the revision.
fn container_name(revision: &str) -> String {
    let safe = revision.replace('/', "-").replace(' ', "_");
    format!("binforge-{safe}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name_basic() {
        assert_eq!(container_name("abc123"), "binforge-abc123");
    }

    #[test]
    fn test_container_name_sanitizes_refs() {
        assert_eq!(container_name("release/v1.10"), "binforge-release-v1.10");
        assert_eq!(container_name("my tag"), "binforge-my_tag");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["binforge", "https://example.com/r.git", "abc123"]);
        assert_eq!(cli.repo, "https://example.com/r.git");
        assert_eq!(cli.revision, "abc123");
        assert_eq!(cli.image, "binforge-build");
        assert_eq!(cli.branch, "master");
        assert_eq!(cli.deadline_secs, DEFAULT_DEADLINE_SECS);
        assert!(cli.container.is_none());
        assert!(cli.workdir.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "binforge",
            "repo.git",
            "v1.2.3",
            "--image",
            "custom:tag",
            "--container",
            "builder-7",
            "--deadline-secs",
            "60",
        ]);
        assert_eq!(cli.image, "custom:tag");
        assert_eq!(cli.container.as_deref(), Some("builder-7"));
        assert_eq!(cli.deadline_secs, 60);
    }
}
