use secrecy::ExposeSecret;
use serde::Serialize;
use teamdraw_core::config::{AppConfig, LoadOptions};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Runs every readiness check. Exits 1 when any check did not pass.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code(report.overall_status);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn exit_code(status: CheckStatus) -> u8 {
    match status {
        CheckStatus::Pass => 0,
        CheckStatus::Fail | CheckStatus::Skipped => 1,
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_tokens(&config));
            checks.push(check_directory_readiness(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "slack_token_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "directory_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    let app_prefix = token_prefix(config.slack.app_token.expose_secret());
    let bot_prefix = token_prefix(config.slack.bot_token.expose_secret());
    DoctorCheck {
        name: "slack_token_readiness",
        status: CheckStatus::Pass,
        details: format!("app token `{app_prefix}-***`, bot token `{bot_prefix}-***`"),
    }
}

fn check_directory_readiness(config: &AppConfig) -> DoctorCheck {
    let directory = &config.directory;
    if !directory.enabled {
        return DoctorCheck {
            name: "directory_readiness",
            status: CheckStatus::Pass,
            details: "member directory disabled; mentions resolve to bare member ids".to_string(),
        };
    }

    let base_url = directory.base_url.as_deref().unwrap_or("<unset>");
    DoctorCheck {
        name: "directory_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "members fetched from `{}/{}` with a {}s timeout",
            base_url.trim_end_matches('/'),
            directory.members_path.trim_start_matches('/'),
            directory.timeout_secs
        ),
    }
}

fn token_prefix(token: &str) -> &str {
    token.split_once('-').map_or("", |(prefix, _)| prefix)
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
