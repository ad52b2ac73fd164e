//! Sequential executor with UI integration.
//!
//! Stages run strictly in plan order, one at a time; each stage blocks on
//! its child processes. The first failure aborts the run with the stage
//! name attached. No rollback: prior stages leave whatever state they
//! reached, and every stage is a guarded ensure, so the next run resumes
//! where this one stopped.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;

use crate::progress;
use crate::stage::{ApplyContext, ApplyOutcome, Stage, StageDiff};
use crate::ui;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Summary of execution results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub skipped: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified
    }

    fn record(&mut self, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::NoChange => self.no_change += 1,
            ApplyOutcome::Created => self.created += 1,
            ApplyOutcome::Modified => self.modified += 1,
            ApplyOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Execute the plan.
pub fn execute(stages: &[Box<dyn Stage>], opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    // 1. Compute diffs for all stages
    let diffs = compute_diffs(stages)?;

    // 2. Display what will change
    display_diffs(&diffs);

    if diffs.is_empty() {
        println!();
        ui::success("Nothing to do - lab is already provisioned");
        return Ok(ExecuteSummary {
            no_change: stages.len(),
            ..Default::default()
        });
    }

    // 3. Confirm (unless --yes)
    if !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: stages.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary {
            skipped: stages.len(),
            ..Default::default()
        });
    }

    // 4. Apply in order, fail fast
    println!();
    println!(
        "  {} Applying {} stages...",
        "→".cyan(),
        stages.len().to_string().bold()
    );

    let mut summary = ExecuteSummary::default();
    let mut lines = Vec::with_capacity(stages.len());
    let pb = progress::stage_bar(stages.len() as u64);

    for stage in stages {
        pb.set_message(stage.name().to_string());

        let mut ctx = ApplyContext {
            dry_run: false,
            verbose: opts.verbose,
        };
        let outcome = stage
            .apply(&mut ctx)
            .with_context(|| format!("stage `{}` failed", stage.name()))
            .inspect_err(|_| pb.finish_and_clear())?;

        lines.push(match &outcome {
            ApplyOutcome::NoChange => {
                format!("  {} {}", "○".dimmed(), stage.description())
            }
            ApplyOutcome::Created | ApplyOutcome::Modified => {
                format!("  {} {}", "✓".green(), stage.description())
            }
            ApplyOutcome::Skipped { reason } => {
                format!("  {} {} ({reason})", "⊘".yellow(), stage.description())
            }
        });

        summary.record(&outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();

    for line in &lines {
        println!("{line}");
    }

    // 5. Summary
    print_summary(&summary);

    Ok(summary)
}

fn compute_diffs(stages: &[Box<dyn Stage>]) -> Result<Vec<StageDiff>> {
    let mut diffs = Vec::new();
    for stage in stages {
        if let Some(diff) = StageDiff::from_stage(stage.as_ref())
            .with_context(|| format!("could not inspect stage `{}`", stage.name()))?
        {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

fn display_diffs(diffs: &[StageDiff]) {
    if diffs.is_empty() {
        return;
    }

    ui::section("Planned Changes");
    for diff in diffs {
        println!(
            "  {} {} {}",
            "~".yellow(),
            format!("[{}]", diff.stage_name).bold(),
            diff.description
        );
        println!(
            "      {} {}",
            "current:".dimmed(),
            diff.current.to_string().dimmed()
        );
        println!("      {} {}", "desired:".dimmed(), diff.desired);
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    println!("  {} Lab provisioned successfully!", "✓".green().bold());

    if summary.created > 0 {
        println!("    • {} stages created state", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} stages modified state", summary.modified);
    }
    if summary.no_change > 0 {
        println!("    • {} stages already converged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} stages skipped", summary.skipped);
    }
}
