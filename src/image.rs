//! Container image production from a working tree's build recipe.
//!
//! Before the image build, one deterministic patch is applied to the
//! recipe: a version-pin substitution for an embedded toolchain version.
//! This is a narrow workaround for a known-bad pinned toolchain, not a
//! templating mechanism.

use std::path::Path;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::ImageError;
use crate::source::WorkingTree;

/// Build recipe file expected at the working-tree root.
pub const RECIPE_FILE: &str = "Dockerfile";

/// A single `ENV <variable> <from>` → `ENV <variable> <to>` substitution
/// in the build recipe.
#[derive(Debug, Clone)]
pub struct ToolchainPin {
    pub variable: String,
    pub from: String,
    pub to: String,
}

impl ToolchainPin {
    pub fn new(
        variable: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// The pin the original build bot shipped with: Go 1.5.4 is swapped
    /// for 1.5.3 in the upstream Dockerfile.
    pub fn go_154_to_153() -> Self {
        Self::new("GO_VERSION", "1.5.4", "1.5.3")
    }

    /// Applies the substitution, failing when the expected line is absent.
    fn apply(&self, recipe: &str) -> Result<String, String> {
        let pattern = format!(
            r"(?m)^(ENV\s+{})\s+{}\s*$",
            regex::escape(&self.variable),
            regex::escape(&self.from)
        );
        let re = Regex::new(&pattern).map_err(|e| e.to_string())?;
        if !re.is_match(recipe) {
            return Err(format!(
                "pin pattern 'ENV {} {}' not found",
                self.variable, self.from
            ));
        }
        Ok(re
            .replace(recipe, format!("$1 {}", self.to).as_str())
            .into_owned())
    }
}

/// Builds a container image from the recipe at the working-tree root.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    engine: String,
    pin: Option<ToolchainPin>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            pin: Some(ToolchainPin::go_154_to_153()),
        }
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the container engine program to invoke.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Overrides (or disables) the toolchain pin applied before building.
    pub fn with_pin(mut self, pin: Option<ToolchainPin>) -> Self {
        self.pin = pin;
        self
    }

    /// Patches the recipe and builds the image tagged `tag`.
    ///
    /// A failed patch is [`ImageError::Patch`]; a non-zero exit from the
    /// engine build is [`ImageError::BuildFailed`] with captured output.
    pub async fn build(&self, tree: &WorkingTree, tag: &str) -> Result<(), ImageError> {
        if let Some(pin) = &self.pin {
            patch_recipe(tree.root(), pin)?;
        }

        debug!(tag = tag, context = %tree.root().display(), "Building image");
        let output = Command::new(&self.engine)
            .args(["build", "-t", tag, "."])
            .current_dir(tree.root())
            .output()
            .await?;
        if !output.status.success() {
            return Err(ImageError::BuildFailed {
                output: format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(())
    }
}

/// Applies `pin` to the recipe under `root`, in place.
///
/// The target path is explicit; the process's current directory plays no
/// part, so callers invoking the pipeline from anywhere patch the right
/// file.
fn patch_recipe(root: &Path, pin: &ToolchainPin) -> Result<(), ImageError> {
    let path = root.join(RECIPE_FILE);
    let recipe = std::fs::read_to_string(&path).map_err(|e| ImageError::Patch {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let patched = pin.apply(&recipe).map_err(|reason| ImageError::Patch {
        path: path.clone(),
        reason,
    })?;
    std::fs::write(&path, patched).map_err(|e| ImageError::Patch {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}
