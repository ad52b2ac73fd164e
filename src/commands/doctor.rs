//! Doctor command - prerequisite and configuration health checks.
//!
//! Also home of the prerequisite table the install command enforces before
//! any stage runs: if a tool here is missing, nothing else may start.

use anyhow::Result;
use colored::Colorize;
use std::fs;

use crate::Context;
use crate::config::LabConfig;
use crate::error::ProvisionError;
use crate::runner;
use crate::ui;

/// One required external tool: name, probe arguments, what it is for, and
/// install hints per platform family.
pub struct RequiredTool {
    pub name: &'static str,
    pub probe_args: &'static [&'static str],
    pub description: &'static str,
    pub apt_hint: &'static str,
    pub yum_hint: &'static str,
}

/// Everything a full provisioning run invokes.
///
/// Wider than the classic checklist (git/mysql/apache) on purpose: later
/// stages also shell out to php, service, and chmod, and the prerequisite
/// stage guarantees nothing runs against a missing dependency.
pub const REQUIRED_TOOLS: &[RequiredTool] = &[
    RequiredTool {
        name: "git",
        probe_args: &["--version"],
        description: "Version control, fetches the DVWA source",
        apt_hint: "sudo apt install git",
        yum_hint: "sudo yum install git",
    },
    RequiredTool {
        name: "mysql",
        probe_args: &["--version"],
        description: "Database client, bootstraps schema and user",
        apt_hint: "sudo apt install mysql-server",
        yum_hint: "sudo yum install mysql-server",
    },
    RequiredTool {
        name: "apache2ctl",
        probe_args: &["-v"],
        description: "Web server control binary",
        apt_hint: "sudo apt install apache2",
        yum_hint: "sudo yum install httpd",
    },
    RequiredTool {
        name: "php",
        probe_args: &["-v"],
        description: "PHP runtime, serves the application",
        apt_hint: "sudo apt install php libapache2-mod-php php-mysql",
        yum_hint: "sudo yum install php php-mysqlnd",
    },
    RequiredTool {
        name: "service",
        probe_args: &["--version"],
        description: "Service manager wrapper",
        apt_hint: "sudo apt install init-system-helpers",
        yum_hint: "sudo yum install initscripts",
    },
    RequiredTool {
        name: "chmod",
        probe_args: &["--version"],
        description: "Permission tool, relaxes the checkout tree",
        apt_hint: "sudo apt install coreutils",
        yum_hint: "sudo yum install coreutils",
    },
];

/// Combined install hint for a tool, one platform per line.
pub fn install_hint(tool: &RequiredTool) -> String {
    format!(
        "On Debian/Ubuntu: {}\nOn CentOS/RHEL: {}",
        tool.apt_hint, tool.yum_hint
    )
}

/// Probe one tool by invoking it.
fn tool_available(tool: &RequiredTool) -> bool {
    runner::run_quiet(tool.name, tool.probe_args) || runner::command_exists(tool.name)
}

/// Fail-fast prerequisite gate used by the install command.
///
/// Returns the first missing tool as a structured error so no later stage
/// ever runs against a missing dependency.
pub fn ensure_prerequisites() -> Result<()> {
    for tool in REQUIRED_TOOLS {
        if !tool_available(tool) {
            return Err(ProvisionError::MissingTool {
                tool: tool.name.to_string(),
                hint: install_hint(tool),
            }
            .into());
        }
    }
    Ok(())
}

struct Issue {
    category: &'static str,
    summary: String,
    detail: Option<String>,
    fix_cmd: Option<String>,
}

pub fn run(ctx: &Context) -> Result<()> {
    if !ctx.quiet {
        ui::banner();
    }
    ui::header("Lab Host Health Check");

    let mut issues: Vec<Issue> = Vec::new();

    check_commands(&mut issues);
    let config = check_config(ctx, &mut issues);
    check_web_root(&config, &mut issues);

    println!();
    if issues.is_empty() {
        ui::success("All checks passed - ready to provision");
        ui::dim("Reminder: this tool sets up a deliberately vulnerable target.");
        ui::dim("Keep the lab host off untrusted networks.");
    } else {
        print_issue_summary(&issues);
        anyhow::bail!("{} issue(s) found", issues.len());
    }

    Ok(())
}

fn check_commands(issues: &mut Vec<Issue>) {
    ui::section("Required Commands");

    for tool in REQUIRED_TOOLS {
        if tool_available(tool) {
            println!(
                "  {} {} - {}",
                "✓".green(),
                tool.name,
                tool.description.dimmed()
            );
        } else {
            println!(
                "  {} {} - {} {}",
                "✗".red(),
                tool.name,
                tool.description,
                "(missing)".red()
            );
            issues.push(Issue {
                category: "Required Commands",
                summary: format!("{} is not installed", tool.name),
                detail: Some(install_hint(tool)),
                fix_cmd: Some(tool.apt_hint.to_string()),
            });
        }
    }
}

fn check_config(ctx: &Context, issues: &mut Vec<Issue>) -> LabConfig {
    ui::section("Configuration");

    match LabConfig::load(ctx.config_path.as_deref()) {
        Ok(config) => {
            println!(
                "  {} lab config - db {}@{}, services {}/{}",
                "✓".green(),
                config.db_user,
                config.db_host,
                config.db_service,
                config.web_service
            );
            config
        }
        Err(e) => {
            println!("  {} lab config {}", "⚠".yellow(), "(invalid)".yellow());
            issues.push(Issue {
                category: "Configuration",
                summary: "Lab config could not be loaded".into(),
                detail: Some(format!("{e:#}")),
                fix_cmd: None,
            });
            LabConfig::default()
        }
    }
}

fn check_web_root(config: &LabConfig, issues: &mut Vec<Issue>) {
    ui::section("Web Root");

    let web_root = config.web_root_path();
    if !web_root.is_dir() {
        println!(
            "  {} {} {}",
            "✗".red(),
            web_root.display(),
            "(missing)".red()
        );
        issues.push(Issue {
            category: "Web Root",
            summary: format!("{} does not exist", web_root.display()),
            detail: Some("The web server package usually creates it".into()),
            fix_cmd: Some(format!("sudo mkdir -p {}", web_root.display())),
        });
        return;
    }

    // Writability probe: the clone happens inside this directory.
    let probe = web_root.join(".vulnlab-write-probe");
    match fs::write(&probe, b"") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            println!("  {} {} - writable", "✓".green(), web_root.display());
        }
        Err(_) => {
            println!(
                "  {} {} {}",
                "✗".yellow(),
                web_root.display(),
                "(not writable)".yellow()
            );
            issues.push(Issue {
                category: "Web Root",
                summary: format!("{} is not writable", web_root.display()),
                detail: Some("The checkout stage clones into this directory".into()),
                fix_cmd: Some("run vulnlab with sufficient privileges".into()),
            });
        }
    }

    if config.checkout_path().is_dir() {
        println!(
            "  {} existing checkout at {}",
            "ℹ".blue(),
            config.checkout_path().display()
        );
    }
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        let num = i + 1;
        println!(
            "  {}  {} {}",
            format!("{num}.").bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(detail) = &issue.detail {
            for line in detail.lines() {
                println!("      {}", line.dimmed());
            }
        }
        println!();
    }

    let fix_cmds: Vec<&str> = issues.iter().filter_map(|i| i.fix_cmd.as_deref()).collect();
    if !fix_cmds.is_empty() {
        ui::section("Quick Fixes");
        println!(
            "  {}",
            "Run these commands to resolve the issues above:".dimmed()
        );
        println!();
        for cmd in &fix_cmds {
            println!("    {}", cmd.bold());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_invoked_tool_is_listed() {
        let names: Vec<&str> = REQUIRED_TOOLS.iter().map(|t| t.name).collect();
        for expected in ["git", "mysql", "apache2ctl", "php", "service", "chmod"] {
            assert!(names.contains(&expected), "{expected} missing from table");
        }
    }

    #[test]
    fn install_hint_names_both_platforms() {
        let hint = install_hint(&REQUIRED_TOOLS[0]);
        assert!(hint.contains("Debian/Ubuntu: sudo apt install git"));
        assert!(hint.contains("CentOS/RHEL: sudo yum install git"));
    }

    #[test]
    fn missing_tool_error_carries_the_hint() {
        let tool = &REQUIRED_TOOLS[1];
        let err = ProvisionError::MissingTool {
            tool: tool.name.into(),
            hint: install_hint(tool),
        };
        assert_eq!(err.to_string(), "mysql is not installed");
        assert!(err.detail().unwrap().contains("mysql-server"));
    }
}
