//! binforge: containerized release-binary builder.
//!
//! This library drives one build end to end: shallow checkout of a pinned
//! source revision, a toolchain-pin patch of its Dockerfile, a `docker build`,
//! a deadline-bounded privileged `docker run` of the build command, and an
//! unconditional teardown of the spawned container.

pub mod cli;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod reaper;
pub mod report;
pub mod runner;
pub mod source;
pub mod version;

// Re-export commonly used error types
pub use error::{FetchError, ImageError, PipelineError, RunError, VersionError};
pub use pipeline::{BuildPipeline, BuildReport, BuildRequest, PipelineConfig};
pub use report::{Reporter, TracingReporter};
pub use runner::{BoundedRunner, RunStatus, RunnerConfig};
pub use source::{SourceFetcher, WorkingTree};
