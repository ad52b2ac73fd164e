//! Status command - per-stage current vs desired state, no mutation.

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::config::LabConfig;
use crate::stage::StageState;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    if !ctx.quiet {
        ui::banner();
    }
    ui::header("Lab Status");

    let config = LabConfig::load(ctx.config_path.as_deref())?;
    config.validate()?;

    ui::section("Configuration");
    ui::kv("Web root", &config.web_root_path().display().to_string());
    ui::kv("Checkout", &config.checkout_path().display().to_string());
    ui::kv(
        "Database",
        &format!(
            "{} as {}@{}",
            config.db_name, config.db_user, config.db_host
        ),
    );
    ui::kv(
        "Services",
        &format!("{} / {}", config.db_service, config.web_service),
    );

    ui::section("Stages");

    let stages = super::install::build_full_plan(&config);
    let mut pending = 0usize;

    for stage in &stages {
        let current = stage.current_state()?;
        let desired = stage.desired_state();

        if current == desired {
            println!(
                "  {} {:<14} {}",
                "✓".green(),
                stage.name(),
                current.to_string().dimmed()
            );
        } else {
            pending += 1;
            let marker = if current == StageState::Unknown {
                "?".yellow().to_string()
            } else {
                "✗".yellow().to_string()
            };
            println!(
                "  {} {:<14} {} {} {}",
                marker,
                stage.name(),
                current.to_string().yellow(),
                "→".dimmed(),
                desired
            );
        }
    }

    println!();
    if pending == 0 {
        ui::success("Lab is fully provisioned");
    } else {
        ui::info(&format!(
            "{pending} stage(s) pending - run {} to converge",
            "vulnlab install".bold()
        ));
    }

    Ok(())
}
