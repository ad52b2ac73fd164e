//! Stage trait and types for the provisioning sequence.
//!
//! Every step of the install is modeled as a stage with:
//! - State detection (current vs desired)
//! - Apply function (converge current → desired)
//!
//! Stages are guarded "ensure state X" operations, not unconditional
//! commands: a rerun on an already-provisioned host converges to NoChange
//! instead of failing. The plan runs strictly in order and the first
//! failure aborts the run.

use anyhow::Result;
use std::fmt;

/// Current or desired state of the external artifact a stage manages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    /// Artifact exists/is configured
    Present { details: Option<String> },
    /// Artifact does not exist/is not configured
    Absent,
    /// Artifact exists but differs from desired
    Modified { from: String, to: String },
    /// State cannot be determined (e.g., database not reachable)
    Unknown,
}

/// Result of applying a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No changes needed
    NoChange,
    /// Artifact was created
    Created,
    /// Artifact was modified
    Modified,
    /// Apply was skipped
    Skipped { reason: String },
}

/// Context passed to apply operations
pub struct ApplyContext {
    pub dry_run: bool,
    pub verbose: bool,
}

/// Core trait for all provisioning stages
pub trait Stage: fmt::Debug {
    /// Stable stage name used by `--only`/`--skip` and progress output
    fn name(&self) -> &'static str;

    /// Human-readable description of what apply will ensure
    fn description(&self) -> String;

    /// Detect current state of the managed artifact
    fn current_state(&self) -> Result<StageState>;

    /// Get the desired state
    fn desired_state(&self) -> StageState;

    /// Check if the stage needs changes
    fn needs_apply(&self) -> Result<bool> {
        let current = self.current_state()?;
        let desired = self.desired_state();
        Ok(current != desired)
    }

    /// Apply changes to reach desired state
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyOutcome>;
}

/// A diff between current and desired state
#[derive(Debug, Clone)]
pub struct StageDiff {
    pub stage_name: &'static str,
    pub description: String,
    pub current: StageState,
    pub desired: StageState,
}

impl StageDiff {
    pub fn from_stage(stage: &dyn Stage) -> Result<Option<Self>> {
        let current = stage.current_state()?;
        let desired = stage.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            stage_name: stage.name(),
            description: stage.description(),
            current,
            desired,
        }))
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present { details: Some(d) } => write!(f, "present ({d})"),
            Self::Present { details: None } => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
            Self::Modified { from, to } => write!(f, "{from} → {to}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// Re-export submodules
pub mod app_config;
pub mod checkout;
pub mod database;
pub mod permissions;
pub mod php_ini;
pub mod service;

pub use app_config::AppConfig;
pub use checkout::Checkout;
pub use database::DbBootstrap;
pub use permissions::TreePermissions;
pub use php_ini::PhpIniPatch;
pub use service::{ServiceReload, ServiceRunning};
