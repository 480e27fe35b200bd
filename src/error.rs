//! Error types for binforge operations.
//!
//! One enum per pipeline stage:
//! - Source fetch (clone + checkout)
//! - Version file read
//! - Image build (recipe patch + docker build)
//! - Bounded container run
//!
//! A build command that runs and exits non-zero is NOT represented here;
//! that is an expected outcome and surfaces as
//! [`crate::runner::RunStatus::FailedWithOutput`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while materializing a working tree.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("git clone failed: {output}")]
    CloneFailed { output: String },

    #[error("git checkout of '{revision}' failed: {output}")]
    CheckoutFailed { revision: String, output: String },

    #[error("git rev-parse failed: {output}")]
    RevParseFailed { output: String },

    #[error("failed to invoke git: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while reading the version file.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("failed to read version file '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that can occur while producing the build image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The toolchain pin could not be applied to the recipe. This is a
    /// hard failure distinct from the image build itself failing.
    #[error("failed to patch build recipe '{path}': {reason}")]
    Patch { path: PathBuf, reason: String },

    #[error("image build failed: {output}")]
    BuildFailed { output: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while running the build container.
#[derive(Debug, Error)]
pub enum RunError {
    /// The deadline elapsed before the build finished. The process was
    /// killed best-effort; a kill failure does not change this result.
    #[error("build killed after exceeding the {deadline:?} deadline")]
    Timeout { deadline: Duration },

    /// The process ended without reporting an exit code (killed by a
    /// signal or otherwise unable to run to completion).
    #[error("build process terminated without an exit code: {output}")]
    Terminated { output: String },

    #[error("failed to launch build container: {0}")]
    Io(#[from] std::io::Error),
}

/// Error of a full pipeline invocation, tagged by the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("version read failed: {0}")]
    Version(#[from] VersionError),

    #[error("image build failed: {0}")]
    Image(#[from] ImageError),

    #[error("build run failed: {0}")]
    Run(#[from] RunError),
}
