//! Database bootstrap stage - ensure schema, user, and grants exist.
//!
//! Probes use the same root client session the bootstrap itself needs, so
//! no extra privilege is assumed. All administrative statements of one
//! apply run in a single client invocation, in order: schema, user, grant,
//! flush.

use anyhow::Result;

use super::{ApplyContext, ApplyOutcome, Stage, StageState};
use crate::config::LabConfig;
use crate::runner;

/// What the probes found missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingParts {
    pub schema: bool,
    pub user: bool,
}

impl MissingParts {
    pub fn any(self) -> bool {
        self.schema || self.user
    }
}

/// Administrative statements for one bootstrap session, in order.
///
/// Only missing parts are created, but grants and the privilege flush are
/// re-issued whenever anything was missing: `GRANT` is idempotent and the
/// flush must come after user and grants for the app to authenticate.
pub fn bootstrap_statements(config: &LabConfig, missing: MissingParts) -> Vec<String> {
    let mut statements = Vec::new();
    if missing.schema {
        statements.push(format!("CREATE DATABASE {}", config.db_name));
    }
    if missing.user {
        statements.push(format!(
            "CREATE USER '{}'@'{}' IDENTIFIED BY '{}'",
            config.db_user, config.db_host, config.db_password
        ));
    }
    if missing.any() {
        statements.push(format!(
            "GRANT ALL PRIVILEGES ON {}.* TO '{}'@'{}'",
            config.db_name, config.db_user, config.db_host
        ));
        statements.push("FLUSH PRIVILEGES".to_string());
    }
    statements
}

/// Parse `SHOW DATABASES LIKE '<name>'` output (with `-N`).
pub fn schema_listed(stdout: &str, name: &str) -> bool {
    stdout.lines().any(|l| l.trim() == name)
}

/// Parse the `mysql.user` lookup output (with `-N`).
pub fn user_listed(stdout: &str, user: &str) -> bool {
    stdout.lines().any(|l| l.trim() == user)
}

#[derive(Debug, Clone)]
pub struct DbBootstrap {
    lab: LabConfig,
}

impl DbBootstrap {
    pub fn new(config: &LabConfig) -> Self {
        Self { lab: config.clone() }
    }

    fn query(&self, sql: &str) -> Result<String> {
        runner::run_capture("mysql", &["-u", "root", "-N", "-e", sql])
    }

    fn probe_missing(&self) -> Result<MissingParts> {
        let schemas = self.query(&format!("SHOW DATABASES LIKE '{}'", self.lab.db_name))?;
        let users = self.query(&format!(
            "SELECT user FROM mysql.user WHERE user = '{}' AND host = '{}'",
            self.lab.db_user, self.lab.db_host
        ))?;
        Ok(MissingParts {
            schema: !schema_listed(&schemas, &self.lab.db_name),
            user: !user_listed(&users, &self.lab.db_user),
        })
    }
}

impl Stage for DbBootstrap {
    fn name(&self) -> &'static str {
        "db-bootstrap"
    }

    fn description(&self) -> String {
        format!(
            "Create database {} and user {}@{}",
            self.lab.db_name, self.lab.db_user, self.lab.db_host
        )
    }

    fn current_state(&self) -> Result<StageState> {
        let missing = match self.probe_missing() {
            Ok(m) => m,
            // Database unreachable (not running, no root access): we cannot
            // tell, and the answer may change once the service stage ran.
            Err(e) => {
                log::debug!("database probe failed: {e:#}");
                return Ok(StageState::Unknown);
            }
        };

        Ok(match (missing.schema, missing.user) {
            (false, false) => StageState::Present { details: None },
            (true, true) => StageState::Absent,
            (true, false) => StageState::Modified {
                from: "schema missing".into(),
                to: format!("schema {}", self.lab.db_name),
            },
            (false, true) => StageState::Modified {
                from: "user missing".into(),
                to: format!("user {}@{}", self.lab.db_user, self.lab.db_host),
            },
        })
    }

    fn desired_state(&self) -> StageState {
        StageState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyOutcome> {
        if ctx.dry_run {
            return Ok(ApplyOutcome::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let missing = self.probe_missing()?;
        if !missing.any() {
            return Ok(ApplyOutcome::NoChange);
        }

        let session = bootstrap_statements(&self.lab, missing).join("; ");
        if ctx.verbose {
            log::info!("database bootstrap session: {session}");
        }
        runner::run_checked("mysql", &["-u", "root", "-e", &session])?;
        Ok(ApplyOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MISSING: MissingParts = MissingParts {
        schema: true,
        user: true,
    };

    #[test]
    fn full_bootstrap_emits_four_statements_in_order() {
        let statements = bootstrap_statements(&LabConfig::default(), ALL_MISSING);
        assert_eq!(
            statements,
            vec![
                "CREATE DATABASE dvwa".to_string(),
                "CREATE USER 'admin'@'127.0.0.1' IDENTIFIED BY 'password'".to_string(),
                "GRANT ALL PRIVILEGES ON dvwa.* TO 'admin'@'127.0.0.1'".to_string(),
                "FLUSH PRIVILEGES".to_string(),
            ]
        );
    }

    #[test]
    fn user_is_scoped_to_the_configured_host() {
        let config = LabConfig {
            db_host: "10.0.0.5".into(),
            ..Default::default()
        };
        let statements = bootstrap_statements(&config, ALL_MISSING);
        assert!(statements[1].contains("'admin'@'10.0.0.5'"));
        assert!(statements[2].contains("'admin'@'10.0.0.5'"));
    }

    #[test]
    fn missing_user_only_skips_schema_creation() {
        let statements = bootstrap_statements(
            &LabConfig::default(),
            MissingParts {
                schema: false,
                user: true,
            },
        );
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE USER"));
        assert!(statements[1].starts_with("GRANT"));
        assert_eq!(statements[2], "FLUSH PRIVILEGES");
    }

    #[test]
    fn nothing_missing_emits_no_statements() {
        let statements = bootstrap_statements(
            &LabConfig::default(),
            MissingParts {
                schema: false,
                user: false,
            },
        );
        assert!(statements.is_empty());
    }

    #[test]
    fn schema_listed_matches_exact_name() {
        assert!(schema_listed("dvwa\n", "dvwa"));
        assert!(schema_listed("information_schema\ndvwa\n", "dvwa"));
        assert!(!schema_listed("dvwa_backup\n", "dvwa"));
        assert!(!schema_listed("", "dvwa"));
    }

    #[test]
    fn user_listed_matches_exact_name() {
        assert!(user_listed("admin\n", "admin"));
        assert!(!user_listed("administrator\n", "admin"));
        assert!(!user_listed("", "admin"));
    }
}
