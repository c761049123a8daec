use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use teamdraw_core::config::{AppConfig, LoadOptions, CONFIG_FILE_NAME};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let fields: Vec<(&str, String, &str)> = vec![
        (
            "slack.app_token",
            redact_token(config.slack.app_token.expose_secret()),
            "TEAMDRAW_SLACK_APP_TOKEN",
        ),
        (
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            "TEAMDRAW_SLACK_BOT_TOKEN",
        ),
        ("directory.enabled", config.directory.enabled.to_string(), "TEAMDRAW_DIRECTORY_ENABLED"),
        (
            "directory.base_url",
            config.directory.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "TEAMDRAW_DIRECTORY_BASE_URL",
        ),
        (
            "directory.token_url",
            config.directory.token_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "TEAMDRAW_DIRECTORY_TOKEN_URL",
        ),
        (
            "directory.members_path",
            config.directory.members_path.clone(),
            "TEAMDRAW_DIRECTORY_MEMBERS_PATH",
        ),
        (
            "directory.timeout_secs",
            config.directory.timeout_secs.to_string(),
            "TEAMDRAW_DIRECTORY_TIMEOUT_SECS",
        ),
        (
            "draw.default_team_size",
            config.draw.default_team_size.to_string(),
            "TEAMDRAW_DRAW_DEFAULT_TEAM_SIZE",
        ),
        (
            "draw.default_pick_count",
            config.draw.default_pick_count.to_string(),
            "TEAMDRAW_DRAW_DEFAULT_PICK_COUNT",
        ),
        ("draw.team_label", config.draw.team_label.clone(), "TEAMDRAW_DRAW_TEAM_LABEL"),
        (
            "draw.remainder_label",
            config.draw.remainder_label.clone(),
            "TEAMDRAW_DRAW_REMAINDER_LABEL",
        ),
        (
            "draw.seed",
            config.draw.seed.map_or_else(|| "<entropy>".to_string(), |seed| seed.to_string()),
            "TEAMDRAW_DRAW_SEED",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "TEAMDRAW_SERVER_BIND_ADDRESS"),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            "TEAMDRAW_SERVER_HEALTH_CHECK_PORT",
        ),
        ("logging.level", config.logging.level.clone(), "TEAMDRAW_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "TEAMDRAW_LOGGING_FORMAT"),
    ];

    for (key, value, env_key) in fields {
        lines.push(render_line(
            key,
            &value,
            field_source(
                key,
                Some(env_key),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(CONFIG_FILE_NAME);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(CONFIG_FILE_NAME);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
