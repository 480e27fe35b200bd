//! Deadline-bounded execution of the build command in a fresh container.
//!
//! The container process and a deadline timer progress independently and
//! are joined by a first-to-complete race; exactly one side wins. The
//! winning side determines the result, the losing side is discarded (the
//! timer) or killed (the process). Teardown of the container itself is
//! the caller's job and must happen for every outcome.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::RunError;
use crate::report::Reporter;
use crate::source::WorkingTree;

/// Subdirectory of the working tree collecting the built binaries.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "bundles";

/// Path inside the container where the build writes its output.
pub const DEFAULT_MOUNT_TARGET: &str = "/go/src/github.com/docker/docker/bundles";

/// Configuration for the containerized build run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Container engine program to invoke.
    pub engine: String,
    /// Working-tree subdirectory bind-mounted into the container.
    pub output_subdir: String,
    /// Container-side path of the bind mount.
    pub mount_target: String,
    /// Environment variables set inside the container.
    pub env: Vec<(String, String)>,
    /// Build command and arguments run inside the container.
    pub command: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            output_subdir: DEFAULT_OUTPUT_SUBDIR.to_string(),
            mount_target: DEFAULT_MOUNT_TARGET.to_string(),
            env: vec![(
                "DOCKER_CROSSPLATFORMS".to_string(),
                "windows/amd64".to_string(),
            )],
            command: vec!["hack/make.sh".to_string(), "cross".to_string()],
        }
    }
}

/// Terminal result of a build run that completed before its deadline.
///
/// A build command that ran and exited non-zero is a valid, informative
/// outcome, not a pipeline error; timeouts and processes that never
/// reported an exit code surface as [`RunError`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunStatus {
    Succeeded,
    FailedWithOutput { output: String },
}

impl RunStatus {
    pub fn succeeded(&self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }
}

/// Runs the build command in a container with a hard wall-clock ceiling.
#[derive(Debug, Clone, Default)]
pub struct BoundedRunner {
    config: RunnerConfig,
}

impl BoundedRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runs `command` inside a new container named `container` from
    /// `image`, enforcing `deadline`.
    ///
    /// The container gets privileged capabilities (the containerized
    /// build spawns nested containers) and a bind mount exposing the
    /// tree's output subdirectory. After a completed run, the engine's
    /// own wait status is fetched as a secondary confirmation; a failure
    /// there is reported but never overrides the primary result.
    pub async fn run(
        &self,
        tree: &WorkingTree,
        image: &str,
        container: &str,
        deadline: Duration,
        reporter: &dyn Reporter,
    ) -> Result<RunStatus, RunError> {
        let host_dir = tree.root().join(&self.config.output_subdir);
        std::fs::create_dir_all(&host_dir)?;

        let mut cmd = Command::new(&self.config.engine);
        cmd.args(self.run_args(&host_dir, image, container));
        cmd.current_dir(tree.root());

        debug!(container = container, image = image, ?deadline, "Starting build run");
        let result = wait_bounded(cmd, container, deadline, reporter).await;

        // Secondary confirmation from the engine's side of the run, for
        // any process that ran to completion (signal-killed included).
        // Never on the timeout path, and never overriding the primary
        // result.
        if matches!(&result, Ok(_) | Err(RunError::Terminated { .. })) {
            match Command::new(&self.config.engine)
                .args(["wait", container])
                .output()
                .await
            {
                Ok(output) if output.status.success() => {}
                Ok(output) => reporter.cleanup_warning(
                    "wait",
                    &format!(
                        "engine wait for '{}' failed: {}{}",
                        container,
                        String::from_utf8_lossy(&output.stdout),
                        String::from_utf8_lossy(&output.stderr)
                    ),
                ),
                Err(e) => reporter.cleanup_warning(
                    "wait",
                    &format!("engine wait for '{}' failed: {}", container, e),
                ),
            }
        }

        result
    }

    /// Argument vector for the engine's run invocation.
    fn run_args(&self, host_dir: &Path, image: &str, container: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-i".to_string(),
            "--privileged".to_string(),
        ];
        for (key, value) in &self.config.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push("--name".to_string());
        args.push(container.to_string());
        args.push("-v".to_string());
        args.push(format!("{}:{}", host_dir.display(), self.config.mount_target));
        args.push(image.to_string());
        args.extend(self.config.command.iter().cloned());
        args
    }
}

/// Races the spawned process against the deadline; exactly one side wins.
async fn wait_bounded(
    mut cmd: Command,
    container: &str,
    deadline: Duration,
    reporter: &dyn Reporter,
) -> Result<RunStatus, RunError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    // Drain both pipes on their own tasks so neither side of the race
    // can block on a full pipe buffer.
    let mut stdout = child.stdout.take();
    let out_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });
    let mut stderr = child.stderr.take();
    let err_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            let stdout = out_task.await.unwrap_or_default();
            let stderr = err_task.await.unwrap_or_default();
            let output = format!(
                "{}{}",
                String::from_utf8_lossy(&stdout),
                String::from_utf8_lossy(&stderr)
            );
            match status.code() {
                Some(0) => {
                    if !output.is_empty() {
                        reporter.container_log(container, &output);
                    }
                    Ok(RunStatus::Succeeded)
                }
                // The command ran to completion and reported failure:
                // an expected outcome, not a pipeline error.
                Some(_) => {
                    if !output.is_empty() {
                        reporter.build_failed(container, &output);
                    }
                    Ok(RunStatus::FailedWithOutput { output })
                }
                None => Err(RunError::Terminated { output }),
            }
        }
        _ = &mut timer => {
            if let Err(e) = child.kill().await {
                reporter.cleanup_warning(
                    "kill",
                    &format!("killing build process failed: {}", e),
                );
            }
            Err(RunError::Timeout { deadline })
        }
    }
}
