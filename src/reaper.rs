//! Forced container removal.

use tokio::process::Command;

use crate::report::Reporter;

/// Forcibly removes `container`, tolerating absence and engine failures.
///
/// Always runs in a cleanup position after the run's result is already
/// determined, so every failure (already removed, never created, engine
/// unreachable) is reported as a warning and swallowed.
pub async fn remove_container(engine: &str, container: &str, reporter: &dyn Reporter) {
    match Command::new(engine)
        .args(["rm", "-f", container])
        .output()
        .await
    {
        Ok(output) if output.status.success() => {}
        Ok(output) => reporter.cleanup_warning(
            "reap",
            &format!(
                "removing container '{}' failed: {}{}",
                container,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
        ),
        Err(e) => reporter.cleanup_warning(
            "reap",
            &format!("removing container '{}' failed: {}", container, e),
        ),
    }
}
