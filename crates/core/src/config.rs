use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "teamdraw.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub directory: DirectoryConfig,
    pub draw: DrawConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
}

/// External member directory queried at startup to learn display names.
#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub token_url: Option<String>,
    pub members_path: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DrawConfig {
    pub default_team_size: i64,
    pub default_pick_count: i64,
    pub team_label: String,
    pub remainder_label: String,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub directory_enabled: Option<bool>,
    pub directory_base_url: Option<String>,
    pub directory_token_url: Option<String>,
    pub draw_seed: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig { app_token: String::new().into(), bot_token: String::new().into() },
            directory: DirectoryConfig {
                enabled: false,
                base_url: None,
                token_url: None,
                members_path: "members".to_string(),
                timeout_secs: 10,
            },
            draw: DrawConfig {
                default_team_size: 3,
                default_pick_count: 1,
                team_label: "Team".to_string(),
                remainder_label: "Leftover members".to_string(),
                seed: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(app_token) = slack.app_token {
                self.slack.app_token = secret_value(app_token);
            }
            if let Some(bot_token) = slack.bot_token {
                self.slack.bot_token = secret_value(bot_token);
            }
        }

        if let Some(directory) = patch.directory {
            if let Some(enabled) = directory.enabled {
                self.directory.enabled = enabled;
            }
            if let Some(base_url) = directory.base_url {
                self.directory.base_url = Some(base_url);
            }
            if let Some(token_url) = directory.token_url {
                self.directory.token_url = Some(token_url);
            }
            if let Some(members_path) = directory.members_path {
                self.directory.members_path = members_path;
            }
            if let Some(timeout_secs) = directory.timeout_secs {
                self.directory.timeout_secs = timeout_secs;
            }
        }

        if let Some(draw) = patch.draw {
            if let Some(default_team_size) = draw.default_team_size {
                self.draw.default_team_size = default_team_size;
            }
            if let Some(default_pick_count) = draw.default_pick_count {
                self.draw.default_pick_count = default_pick_count;
            }
            if let Some(team_label) = draw.team_label {
                self.draw.team_label = team_label;
            }
            if let Some(remainder_label) = draw.remainder_label {
                self.draw.remainder_label = remainder_label;
            }
            if let Some(seed) = draw.seed {
                self.draw.seed = Some(seed);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TEAMDRAW_SLACK_APP_TOKEN") {
            self.slack.app_token = secret_value(value);
        }
        if let Some(value) = read_env("TEAMDRAW_SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }

        if let Some(value) = read_env("TEAMDRAW_DIRECTORY_ENABLED") {
            self.directory.enabled = parse_bool("TEAMDRAW_DIRECTORY_ENABLED", &value)?;
        }
        if let Some(value) = read_env("TEAMDRAW_DIRECTORY_BASE_URL") {
            self.directory.base_url = Some(value);
        }
        if let Some(value) = read_env("TEAMDRAW_DIRECTORY_TOKEN_URL") {
            self.directory.token_url = Some(value);
        }
        if let Some(value) = read_env("TEAMDRAW_DIRECTORY_MEMBERS_PATH") {
            self.directory.members_path = value;
        }
        if let Some(value) = read_env("TEAMDRAW_DIRECTORY_TIMEOUT_SECS") {
            self.directory.timeout_secs = parse_u64("TEAMDRAW_DIRECTORY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TEAMDRAW_DRAW_DEFAULT_TEAM_SIZE") {
            self.draw.default_team_size = parse_i64("TEAMDRAW_DRAW_DEFAULT_TEAM_SIZE", &value)?;
        }
        if let Some(value) = read_env("TEAMDRAW_DRAW_DEFAULT_PICK_COUNT") {
            self.draw.default_pick_count = parse_i64("TEAMDRAW_DRAW_DEFAULT_PICK_COUNT", &value)?;
        }
        if let Some(value) = read_env("TEAMDRAW_DRAW_TEAM_LABEL") {
            self.draw.team_label = value;
        }
        if let Some(value) = read_env("TEAMDRAW_DRAW_REMAINDER_LABEL") {
            self.draw.remainder_label = value;
        }
        if let Some(value) = read_env("TEAMDRAW_DRAW_SEED") {
            self.draw.seed = Some(parse_u64("TEAMDRAW_DRAW_SEED", &value)?);
        }

        if let Some(value) = read_env("TEAMDRAW_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TEAMDRAW_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("TEAMDRAW_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("TEAMDRAW_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TEAMDRAW_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("TEAMDRAW_LOGGING_LEVEL").or_else(|| read_env("TEAMDRAW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TEAMDRAW_LOGGING_FORMAT").or_else(|| read_env("TEAMDRAW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = secret_value(slack_app_token);
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(enabled) = overrides.directory_enabled {
            self.directory.enabled = enabled;
        }
        if let Some(base_url) = overrides.directory_base_url {
            self.directory.base_url = Some(base_url);
        }
        if let Some(token_url) = overrides.directory_token_url {
            self.directory.token_url = Some(token_url);
        }
        if let Some(seed) = overrides.draw_seed {
            self.draw.seed = Some(seed);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_directory(&self.directory)?;
        validate_draw(&self.draw)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let app_token = slack.app_token.expose_secret();
    if app_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.app_token is required. Get it from https://api.slack.com/apps > Your App > Basic Information > App-Level Tokens".to_string()
        ));
    }
    if !app_token.starts_with("xapp-") {
        let hint = if app_token.starts_with("xoxb-") {
            " (hint: you may have used the bot token instead of the app token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.app_token must start with `xapp-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    Ok(())
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    if directory.timeout_secs == 0 || directory.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "directory.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if directory.members_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "directory.members_path must not be empty".to_string(),
        ));
    }

    if !directory.enabled {
        return Ok(());
    }

    for (key, value) in
        [("directory.base_url", &directory.base_url), ("directory.token_url", &directory.token_url)]
    {
        let Some(url) = value.as_deref().map(str::trim).filter(|url| !url.is_empty()) else {
            return Err(ConfigError::Validation(format!(
                "{key} is required when directory.enabled is true"
            )));
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_draw(draw: &DrawConfig) -> Result<(), ConfigError> {
    if draw.default_team_size < 1 {
        return Err(ConfigError::Validation(
            "draw.default_team_size must be at least 1".to_string(),
        ));
    }

    if draw.default_pick_count < 1 {
        return Err(ConfigError::Validation(
            "draw.default_pick_count must be at least 1".to_string(),
        ));
    }

    if draw.team_label.trim().is_empty() || draw.remainder_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "draw.team_label and draw.remainder_label must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    directory: Option<DirectoryPatch>,
    draw: Option<DrawPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    token_url: Option<String>,
    members_path: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DrawPatch {
    default_team_size: Option<i64>,
    default_pick_count: Option<i64>,
    team_label: Option<String>,
    remainder_label: Option<String>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
