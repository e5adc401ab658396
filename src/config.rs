//! Orchestration configuration.
//!
//! Loaded from `<root>/.wavefront/config.yaml` when present, then overridden
//! by `WAVEFRONT_*` environment variables. Every field has a default, so an
//! absent file is the common case.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;
use crate::error::Error;
use crate::graph::Phase;
use crate::store::LockPolicy;

/// Location of the config file relative to the project root.
pub const CONFIG_FILE: &str = ".wavefront/config.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the task graph and its lock marker.
    pub state_dir: PathBuf,
    /// Directory for specification artifacts.
    pub specs_dir: PathBuf,
    /// Directory for plan artifacts.
    pub plans_dir: PathBuf,
    /// Deprecated artifact directories, still accepted with a warning.
    pub legacy_dirs: Vec<PathBuf>,
    /// Lock acquisition policy.
    pub lock: LockConfig,
    /// Worker role classification.
    pub roles: RoleConfig,
    /// Action classification.
    pub actions: ActionConfig,
}

/// Lock retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Maximum number of acquisition attempts.
    pub attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_interval_ms: u64,
}

/// Which worker roles implement, review, or check spec alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Roles whose completion records implementation status.
    pub implementation: Vec<String>,
    /// Roles that produce code-review verdicts.
    pub review: Vec<String>,
    /// Roles that produce spec-alignment verdicts.
    pub spec_review: Vec<String>,
}

/// How action names map onto the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Utility actions that bypass phase validation.
    pub exempt: Vec<String>,
    /// Action name to the phase it moves the workflow into.
    pub phases: BTreeMap<String, Phase>,
}

/// What kind of worker finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// Writes code for a task.
    Implementation,
    /// Reviews a task's code.
    Review,
    /// Checks the wave against the specification.
    SpecReview,
    /// Anything else.
    Other,
}

/// Where an artifact path lives relative to the allowed directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactLocation {
    /// Under the specs or plans directory.
    Allowed,
    /// Under a deprecated directory.
    Legacy,
    /// Anywhere else.
    Outside,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".wavefront/state"),
            specs_dir: PathBuf::from(".wavefront/specs"),
            plans_dir: PathBuf::from(".wavefront/plans"),
            legacy_dirs: vec![PathBuf::from("specs"), PathBuf::from("docs/plans")],
            lock: LockConfig::default(),
            roles: RoleConfig::default(),
            actions: ActionConfig::default(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { attempts: 50, retry_interval_ms: 100 }
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            implementation: names(&[
                "implementer",
                "developer",
                "backend-developer",
                "frontend-developer",
                "test-engineer",
            ]),
            review: names(&["reviewer", "code-reviewer", "security-reviewer"]),
            spec_review: names(&["spec-reviewer", "spec-alignment"]),
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        let phases = [
            ("brainstorm", Phase::Brainstorm),
            ("specify", Phase::Specify),
            ("clarify", Phase::Clarify),
            ("architecture", Phase::Architecture),
            ("architect", Phase::Architecture),
            ("plan", Phase::Architecture),
            ("decompose", Phase::Decompose),
            ("tasks", Phase::Decompose),
            ("execute", Phase::Execute),
            ("implement", Phase::Execute),
        ]
        .into_iter()
        .map(|(name, phase)| (name.to_string(), phase))
        .collect();
        Self { exempt: names(&["status", "help", "review", "memory", "gate"]), phases }
    }
}

// Roles may arrive namespaced, e.g. `plugin:implementer`.
fn bare_name(name: &str) -> String {
    name.rsplit(':').next().unwrap_or(name).trim().to_ascii_lowercase()
}

impl RoleConfig {
    /// Classifies a worker role.
    #[must_use]
    pub fn classify(&self, role: &str) -> RoleKind {
        let role = bare_name(role);
        let contains = |list: &[String]| list.iter().any(|r| bare_name(r) == role);
        if contains(&self.spec_review) {
            RoleKind::SpecReview
        } else if contains(&self.review) {
            RoleKind::Review
        } else if contains(&self.implementation) {
            RoleKind::Implementation
        } else {
            RoleKind::Other
        }
    }
}

impl ActionConfig {
    /// Returns `true` for actions exempt from phase validation.
    #[must_use]
    pub fn is_exempt(&self, action: &str) -> bool {
        let action = bare_name(action.trim_start_matches('/'));
        self.exempt.iter().any(|a| bare_name(a) == action)
    }

    /// Returns the phase an action moves the workflow into, if known.
    #[must_use]
    pub fn target_phase(&self, action: &str) -> Option<Phase> {
        let action = bare_name(action.trim_start_matches('/'));
        self.phases.iter().find(|(name, _)| bare_name(name) == action).map(|(_, phase)| *phase)
    }
}

impl Config {
    /// Loads configuration for the project at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// an environment override is not a valid number.
    pub fn load(ctx: &ServiceContext, root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let mut config = if ctx.fs.exists(&path) {
            let contents = ctx
                .fs
                .read_to_string(&path)
                .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(config = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies `WAVEFRONT_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("WAVEFRONT_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("WAVEFRONT_LOCK_ATTEMPTS") {
            self.lock.attempts = raw
                .parse()
                .map_err(|e| Error::Config(format!("WAVEFRONT_LOCK_ATTEMPTS={raw}: {e}")))?;
        }
        if let Some(raw) = lookup("WAVEFRONT_LOCK_RETRY_MS") {
            self.lock.retry_interval_ms = raw
                .parse()
                .map_err(|e| Error::Config(format!("WAVEFRONT_LOCK_RETRY_MS={raw}: {e}")))?;
        }
        Ok(())
    }

    /// Lock policy derived from [`LockConfig`].
    #[must_use]
    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy {
            attempts: self.lock.attempts.max(1),
            retry_interval: Duration::from_millis(self.lock.retry_interval_ms),
        }
    }

    /// State directory resolved against the project root.
    #[must_use]
    pub fn state_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.state_dir)
    }

    /// Classifies an artifact path against the allowed directories.
    ///
    /// Absolute paths are made relative to `root` first; paths that escape
    /// the root with `..` are always outside.
    #[must_use]
    pub fn artifact_location(&self, root: &Path, path: &str) -> ArtifactLocation {
        let path = Path::new(path);
        let relative = if path.is_absolute() {
            match path.strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => return ArtifactLocation::Outside,
            }
        } else {
            path
        };
        let normalized: PathBuf =
            relative.components().filter(|c| !matches!(c, Component::CurDir)).collect();
        if normalized.components().any(|c| matches!(c, Component::ParentDir)) {
            return ArtifactLocation::Outside;
        }

        if [&self.specs_dir, &self.plans_dir].iter().any(|dir| normalized.starts_with(dir)) {
            ArtifactLocation::Allowed
        } else if self.legacy_dirs.iter().any(|dir| normalized.starts_with(dir)) {
            ArtifactLocation::Legacy
        } else {
            ArtifactLocation::Outside
        }
    }

    /// Human-readable list of the allowed artifact directories.
    #[must_use]
    pub fn allowed_dirs(&self) -> String {
        format!("{}, {}", self.specs_dir.display(), self.plans_dir.display())
    }
}
