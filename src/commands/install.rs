//! Install command - run the full provisioning sequence.
//!
//! Builds the ordered stage plan from the resolved config and hands it to
//! the sequential executor. The prerequisite gate runs eagerly, before the
//! plan is even built.

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::InstallArgs;
use crate::config::LabConfig;
use crate::engine::{self, ExecuteOptions};
use crate::stage::{
    AppConfig, Checkout, DbBootstrap, PhpIniPatch, ServiceReload, ServiceRunning, Stage,
    TreePermissions,
};
use crate::ui;

/// Stage names in plan order.
pub const STAGE_NAMES: &[(&str, &str)] = &[
    ("checkout", "Clone the application under the web root"),
    ("permissions", "Make the checkout tree world-writable"),
    ("app-config", "Materialize and patch config.inc.php"),
    ("db-service", "Start the database service"),
    ("db-bootstrap", "Create schema, user, and grants"),
    ("web-service", "Start the web server"),
    ("php-ini", "Enable url handling flags in php.ini"),
    ("web-reload", "Reload the web server"),
];

pub fn run(ctx: &Context, args: InstallArgs) -> Result<()> {
    if !ctx.quiet {
        ui::banner();
    }

    if args.list_stages {
        list_stages();
        return Ok(());
    }

    ui::header("DVWA Lab Provisioning");

    let config = LabConfig::load(ctx.config_path.as_deref())?;
    config.validate()?;

    // Prerequisites are checked before anything else so no stage ever runs
    // against a missing tool.
    super::doctor::ensure_prerequisites()?;

    let stages = build_plan(&config, &args);
    if stages.is_empty() {
        ui::warn("Stage selection matched nothing - check --only/--skip values");
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        verbose: ctx.verbose > 0,
    };
    let summary = engine::execute(&stages, &opts)?;

    if !args.dry_run && summary.skipped == 0 {
        print_completion_notice(&config);
    }

    Ok(())
}

/// The complete ordered plan, used by `status` and as the base for filtering.
pub fn build_full_plan(config: &LabConfig) -> Vec<Box<dyn Stage>> {
    STAGE_NAMES
        .iter()
        .map(|&(name, _)| build_stage(config, name))
        .collect()
}

/// Build the ordered plan, honoring `--only`/`--skip`.
fn build_plan(config: &LabConfig, args: &InstallArgs) -> Vec<Box<dyn Stage>> {
    let selected = selected_stages(args);

    STAGE_NAMES
        .iter()
        .filter(|&&(name, _)| selected.contains(&name))
        .map(|&(name, _)| build_stage(config, name))
        .collect()
}

fn build_stage(config: &LabConfig, name: &str) -> Box<dyn Stage> {
    match name {
        "checkout" => Box::new(Checkout::new(config)),
        "permissions" => Box::new(TreePermissions::new(config)),
        "app-config" => Box::new(AppConfig::new(config)),
        "db-service" => Box::new(ServiceRunning::new(&config.db_service, "db-service")),
        "db-bootstrap" => Box::new(DbBootstrap::new(config)),
        "web-service" => Box::new(ServiceRunning::new(&config.web_service, "web-service")),
        "php-ini" => Box::new(PhpIniPatch::new(config)),
        "web-reload" => Box::new(ServiceReload::new(&config.web_service, "web-reload")),
        other => unreachable!("unknown stage name {other}"),
    }
}

fn selected_stages(args: &InstallArgs) -> Vec<&str> {
    let all: Vec<&str> = STAGE_NAMES.iter().map(|&(name, _)| name).collect();

    if let Some(ref only) = args.only {
        let only_set: Vec<&str> = only.split(',').map(str::trim).collect();
        return all.into_iter().filter(|s| only_set.contains(s)).collect();
    }

    if let Some(ref skip) = args.skip {
        let skip_set: Vec<&str> = skip.split(',').map(str::trim).collect();
        return all.into_iter().filter(|s| !skip_set.contains(s)).collect();
    }

    all
}

fn list_stages() {
    ui::header("Provisioning Stages");
    println!();
    for (name, desc) in STAGE_NAMES {
        println!("  {:<14} {}", name.bold(), desc.dimmed());
    }
    println!();
    ui::section("Usage Examples");
    println!();
    println!("  {} Run the full sequence", "vulnlab install".bold());
    println!(
        "  {} Preview without changes",
        "vulnlab install --dry-run".bold()
    );
    println!(
        "  {} Skip the database stages",
        "vulnlab install --skip=db-service,db-bootstrap".bold()
    );
}

/// The one step left to the operator: schema population goes through the
/// application's own setup page.
fn print_completion_notice(config: &LabConfig) {
    println!();
    ui::success("DVWA installation complete (except for in-app database setup)");
    println!();
    println!(
        "  Visit {} in your browser, log in with {}/{},",
        config.setup_url().bold(),
        config.db_user.bold(),
        config.db_password.bold()
    );
    println!("  go to the 'Setup' page, and click 'Create / Reset Database'.");
    println!("  Then log in again to start using DVWA.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InstallArgs {
        InstallArgs {
            dry_run: false,
            yes: false,
            only: None,
            skip: None,
            list_stages: false,
        }
    }

    #[test]
    fn full_plan_is_in_provisioning_order() {
        let plan = build_plan(&LabConfig::default(), &args());
        let names: Vec<&str> = plan.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "checkout",
                "permissions",
                "app-config",
                "db-service",
                "db-bootstrap",
                "web-service",
                "php-ini",
                "web-reload",
            ]
        );
    }

    #[test]
    fn only_filter_keeps_plan_order() {
        let plan = build_plan(
            &LabConfig::default(),
            &InstallArgs {
                only: Some("db-bootstrap,checkout".into()),
                ..args()
            },
        );
        let names: Vec<&str> = plan.iter().map(|s| s.name()).collect();
        // Plan order wins over the order given on the command line.
        assert_eq!(names, vec!["checkout", "db-bootstrap"]);
    }

    #[test]
    fn skip_filter_removes_stages() {
        let plan = build_plan(
            &LabConfig::default(),
            &InstallArgs {
                skip: Some("php-ini, web-reload".into()),
                ..args()
            },
        );
        let names: Vec<&str> = plan.iter().map(|s| s.name()).collect();
        assert!(!names.contains(&"php-ini"));
        assert!(!names.contains(&"web-reload"));
        assert_eq!(names.len(), STAGE_NAMES.len() - 2);
    }

    #[test]
    fn unknown_only_value_selects_nothing() {
        let plan = build_plan(
            &LabConfig::default(),
            &InstallArgs {
                only: Some("bogus".into()),
                ..args()
            },
        );
        assert!(plan.is_empty());
    }
}
