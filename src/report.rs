//! Reporting collaborator for the build pipeline.
//!
//! The pipeline never logs through a global callout directly; it reports
//! through this trait so callers can capture build failures and cleanup
//! warnings (tests inject recorders, production injects
//! [`TracingReporter`]).

/// Receives the noteworthy, non-fatal events of a build run.
///
/// Fatal conditions travel as errors; everything here is informational
/// and must never influence control flow.
pub trait Reporter: Send + Sync {
    /// Output captured from a container whose build command succeeded.
    fn container_log(&self, container: &str, output: &str);

    /// Output captured from a container whose build command ran and
    /// exited non-zero. A failing build is a valid outcome, not a
    /// pipeline malfunction.
    fn build_failed(&self, container: &str, output: &str);

    /// A best-effort cleanup or confirmation step failed (container
    /// removal, process kill, engine wait). Never overrides the primary
    /// result.
    fn cleanup_warning(&self, context: &str, detail: &str);
}

/// Default reporter forwarding to `tracing`.
///
/// Levels mirror what each event means operationally: container logs are
/// debug noise, build failures are informative, cleanup problems warrant
/// a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn container_log(&self, container: &str, output: &str) {
        tracing::debug!(container = container, "Container log: {}", output);
    }

    fn build_failed(&self, container: &str, output: &str) {
        tracing::info!(container = container, "Build failed: {}", output);
    }

    fn cleanup_warning(&self, context: &str, detail: &str) {
        tracing::warn!(context = context, "{}", detail);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording reporter shared by unit tests.

    use std::sync::Mutex;

    use super::Reporter;

    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        pub container_logs: Mutex<Vec<(String, String)>>,
        pub build_failures: Mutex<Vec<(String, String)>>,
        pub cleanup_warnings: Mutex<Vec<(String, String)>>,
    }

    impl Reporter for RecordingReporter {
        fn container_log(&self, container: &str, output: &str) {
            self.container_logs
                .lock()
                .unwrap()
                .push((container.to_string(), output.to_string()));
        }

        fn build_failed(&self, container: &str, output: &str) {
            self.build_failures
                .lock()
                .unwrap()
                .push((container.to_string(), output.to_string()));
        }

        fn cleanup_warning(&self, context: &str, detail: &str) {
            self.cleanup_warnings
                .lock()
                .unwrap()
                .push((context.to_string(), detail.to_string()));
        }
    }
}
