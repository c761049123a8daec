use async_trait::async_trait;
use teamdraw_core::MemberId;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};
use crate::roster::RosterError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandName {
    Pick,
    Team,
}

impl CommandName {
    pub fn slash(&self) -> &'static str {
        match self {
            Self::Pick => "/pick",
            Self::Team => "/team",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: CommandName,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickSource {
    /// Occupants of the caller's voice room, minus `excluded`.
    Voice { excluded: Vec<MemberId> },
    Members { targets: Vec<MemberId> },
    Text { items: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickRequest {
    pub count: Option<i64>,
    pub source: PickSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TeamSource {
    Voice { excluded: Vec<MemberId> },
    Members { members: Vec<MemberId> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamRequest {
    pub size: Option<i64>,
    pub source: TeamSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawCommand {
    Pick(PickRequest),
    Team(TeamRequest),
    Help,
    Invalid { command: CommandName, reason: String },
    Unknown { command: CommandName, verb: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error(transparent)]
    Roster(#[from] RosterError),
}

pub fn normalize_command(payload: SlashCommandPayload) -> Result<CommandEnvelope, CommandParseError> {
    let command = match payload.command.trim() {
        "/pick" => CommandName::Pick,
        "/team" => CommandName::Team,
        _ => return Err(CommandParseError::UnsupportedCommand(payload.command)),
    };

    Ok(CommandEnvelope {
        command,
        text: payload.text.trim().to_owned(),
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_ts: payload.trigger_ts,
        request_id: payload.request_id,
    })
}

pub fn parse_command(command: CommandName, input: &str) -> DrawCommand {
    let tokens = tokenize(input);
    match command {
        CommandName::Pick => parse_pick(tokens),
        CommandName::Team => parse_team(tokens),
    }
}

fn parse_pick(tokens: Vec<String>) -> DrawCommand {
    let mut tokens = tokens.into_iter();
    let Some(verb) = tokens.next() else {
        return DrawCommand::Help;
    };
    let verb = verb.to_ascii_lowercase();
    let rest: Vec<String> = tokens.collect();

    match verb.as_str() {
        "help" => DrawCommand::Help,
        "voice" => match parse_member_args(CommandName::Pick, "count", rest) {
            Ok((count, excluded)) => {
                DrawCommand::Pick(PickRequest { count, source: PickSource::Voice { excluded } })
            }
            Err(invalid) => invalid,
        },
        "user" => match parse_member_args(CommandName::Pick, "count", rest) {
            Ok((_, targets)) if targets.is_empty() => DrawCommand::Invalid {
                command: CommandName::Pick,
                reason: "Mention at least one member to pick from.".to_owned(),
            },
            Ok((count, targets)) => {
                DrawCommand::Pick(PickRequest { count, source: PickSource::Members { targets } })
            }
            Err(invalid) => invalid,
        },
        "text" => parse_text_args(rest),
        _ => DrawCommand::Unknown { command: CommandName::Pick, verb },
    }
}

fn parse_team(tokens: Vec<String>) -> DrawCommand {
    let Some(first) = tokens.first() else {
        return DrawCommand::Help;
    };

    match first.to_ascii_lowercase().as_str() {
        "help" => DrawCommand::Help,
        "voice" => match parse_member_args(CommandName::Team, "size", tokens[1..].to_vec()) {
            Ok((size, excluded)) => {
                DrawCommand::Team(TeamRequest { size, source: TeamSource::Voice { excluded } })
            }
            Err(invalid) => invalid,
        },
        _ => match parse_member_args(CommandName::Team, "size", tokens) {
            Ok((_, members)) if members.is_empty() => DrawCommand::Invalid {
                command: CommandName::Team,
                reason: "Mention the members to split, or use `/team voice`.".to_owned(),
            },
            Ok((size, members)) => {
                DrawCommand::Team(TeamRequest { size, source: TeamSource::Members { members } })
            }
            Err(invalid) => invalid,
        },
    }
}

/// Parses `[N | key=N] <@member>...`. Any other token is rejected.
fn parse_member_args(
    command: CommandName,
    key: &str,
    tokens: Vec<String>,
) -> Result<(Option<i64>, Vec<MemberId>), DrawCommand> {
    let invalid = |reason: String| DrawCommand::Invalid { command, reason };
    let mut number = None;
    let mut members = Vec::new();

    for token in tokens {
        if let Some(member) = parse_mention_token(&token) {
            members.push(member);
            continue;
        }

        let raw = match token.split_once('=') {
            Some((name, value)) if name.eq_ignore_ascii_case(key) => value,
            Some(_) => return Err(invalid(format!("Unexpected argument `{token}`."))),
            None => token.as_str(),
        };
        let Ok(value) = raw.trim().parse::<i64>() else {
            return Err(invalid(format!("Unexpected argument `{token}`.")));
        };
        if number.replace(value).is_some() {
            return Err(invalid(format!("The {key} was given more than once.")));
        }
    }

    Ok((number, members))
}

fn parse_text_args(tokens: Vec<String>) -> DrawCommand {
    let mut count = None;
    let mut items = Vec::new();

    for token in tokens {
        if let Some((name, value)) = token.split_once('=') {
            if name.eq_ignore_ascii_case("count") {
                let Ok(value) = value.trim().parse::<i64>() else {
                    return DrawCommand::Invalid {
                        command: CommandName::Pick,
                        reason: format!("`{token}` is not a whole number."),
                    };
                };
                if count.replace(value).is_some() {
                    return DrawCommand::Invalid {
                        command: CommandName::Pick,
                        reason: "The count was given more than once.".to_owned(),
                    };
                }
                continue;
            }
        }
        items.push(token);
    }

    if items.is_empty() {
        return DrawCommand::Invalid {
            command: CommandName::Pick,
            reason: "Give at least one item to pick from.".to_owned(),
        };
    }

    DrawCommand::Pick(PickRequest { count, source: PickSource::Text { items } })
}

/// Splits on whitespace; double quotes (straight or curly) group words into one token.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;

    for ch in input.chars() {
        match ch {
            '"' | '\u{201C}' | '\u{201D}' => {
                quoted = !quoted;
                was_quoted = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if !current.is_empty() || was_quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                was_quoted = false;
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() || was_quoted {
        tokens.push(current);
    }

    tokens
}

/// Extracts the user id from a Slack mention escape (`<@U123>` or `<@U123|name>`).
pub fn parse_mention_token(token: &str) -> Option<MemberId> {
    let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.split_once('|').map_or(inner, |(id, _)| id).trim();
    let valid = !id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric());
    valid.then(|| MemberId(id.to_owned()))
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: DrawCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        envelope: CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match parse_command(envelope.command, &envelope.text) {
            DrawCommand::Pick(request) => self.service.pick(request, &envelope).await,
            DrawCommand::Team(request) => self.service.split_teams(request, &envelope).await,
            DrawCommand::Help => Ok(blocks::help_message()),
            DrawCommand::Invalid { reason, .. } => {
                Ok(blocks::error_message(&reason, &envelope.request_id))
            }
            DrawCommand::Unknown { command, verb } => Ok(blocks::error_message(
                &format!(
                    "Unsupported command `{slash} {verb}`. Try `{slash} help`.",
                    slash = command.slash()
                ),
                &envelope.request_id,
            )),
        }
    }
}

#[async_trait]
pub trait DrawCommandService: Send + Sync {
    async fn pick(
        &self,
        request: PickRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn split_teams(
        &self,
        request: TeamRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;
}
