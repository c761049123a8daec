use std::fmt::Display;

use serde::Serialize;
use teamdraw_core::draw::{Group, GroupLabel};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

/// Who sees a response: everyone in the channel, or only the invoking user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    InChannel,
    Ephemeral,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub response_type: ResponseType,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    response_type: ResponseType,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self {
            fallback_text: fallback_text.into(),
            response_type: ResponseType::InChannel,
            blocks: Vec::new(),
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.response_type = ResponseType::Ephemeral;
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            fallback_text: self.fallback_text,
            response_type: self.response_type,
            blocks: self.blocks,
        }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Wording used for team headings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupNaming {
    pub team: String,
    pub remainder: String,
}

impl Default for GroupNaming {
    fn default() -> Self {
        Self { team: "Team".to_owned(), remainder: "Leftover members".to_owned() }
    }
}

impl GroupNaming {
    pub fn render(&self, label: GroupLabel) -> String {
        label.render(&self.team, &self.remainder)
    }
}

pub fn join_entities<T: Display>(entities: &[T]) -> String {
    entities.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

pub fn teams_message<T: Display>(groups: &[Group<T>], naming: &GroupNaming) -> MessageTemplate {
    if groups.is_empty() {
        return MessageBuilder::new("Team draw: no candidates")
            .section("draw.teams.empty.v1", |section| {
                section.plain("No candidates to split into teams.");
            })
            .build();
    }

    let lines: Vec<String> = groups
        .iter()
        .map(|group| format!("{}: {}", naming.render(group.label()), join_entities(group.members())))
        .collect();

    let mut builder = MessageBuilder::new(format!("Team draw\n{}", lines.join("\n")))
        .section("draw.teams.header.v1", |section| {
            section.mrkdwn("*Team draw*");
        });
    for (index, group) in groups.iter().enumerate() {
        builder = builder.section(format!("draw.teams.group.{}.v1", index + 1), |section| {
            section.mrkdwn(format!(
                "*{}*: {}",
                naming.render(group.label()),
                join_entities(group.members())
            ));
        });
    }
    builder.build()
}

pub fn pick_message<T: Display>(picked: &[T]) -> MessageTemplate {
    if picked.is_empty() {
        return MessageBuilder::new("Draw result: no candidates")
            .section("draw.pick.empty.v1", |section| {
                section.plain("No candidates to pick from.");
            })
            .build();
    }

    let joined = join_entities(picked);
    MessageBuilder::new(format!("Draw result: {joined}"))
        .section("draw.pick.result.v1", |section| {
            section.mrkdwn(format!("*Draw result*\n{joined}"));
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .ephemeral()
        .section("draw.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("draw.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Draw command help")
        .ephemeral()
        .section("draw.help.pick.v1", |section| {
            section.mrkdwn(
                "*Pick*\n• `/pick voice [count] [@exclude ...]` from your voice room\n• `/pick user [count] @member ...` from mentioned members\n• `/pick text [count=N] item \"two words\" ...` from typed items",
            );
        })
        .section("draw.help.team.v1", |section| {
            section.mrkdwn(
                "*Teams*\n• `/team [size] @member ...` split mentioned members\n• `/team voice [size] [@exclude ...]` split your voice room\nA size of 0 keeps everyone in one team.",
            );
        })
        .build()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use teamdraw_core::draw::random::seeded;
    use teamdraw_core::draw::{partition, Capacity, Pool};

    use super::{
        error_message, help_message, pick_message, teams_message, Block, GroupNaming,
        ResponseType, TextObject,
    };

    fn section_text(block: &Block) -> Option<&str> {
        match block {
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
            | Block::Section { text: TextObject::Plain { text }, .. } => Some(text),
            Block::Context { .. } => None,
        }
    }

    #[test]
    fn teams_message_renders_one_line_per_group() {
        let capacity = Capacity::Bounded(NonZeroUsize::new(2).expect("non-zero"));
        let groups = partition(Pool::new(["a", "b", "c", "d", "e"]), capacity, &mut seeded(3));
        let message = teams_message(&groups, &GroupNaming::default());

        assert_eq!(message.response_type, ResponseType::InChannel);
        assert_eq!(message.blocks.len(), 4);
        assert!(section_text(&message.blocks[1]).is_some_and(|text| text.starts_with("*Team 1*: ")));
        assert!(section_text(&message.blocks[2]).is_some_and(|text| text.starts_with("*Team 2*: ")));
        assert!(section_text(&message.blocks[3])
            .is_some_and(|text| text.starts_with("*Leftover members*: ")));
        assert_eq!(message.fallback_text.lines().count(), 4);
    }

    #[test]
    fn teams_message_uses_custom_naming() {
        let groups = partition(Pool::new(["a"]), Capacity::Unbounded, &mut seeded(1));
        let naming = GroupNaming { team: "Squad".to_owned(), remainder: "Bench".to_owned() };
        let message = teams_message(&groups, &naming);

        assert_eq!(section_text(&message.blocks[1]), Some("*Squad 1*: a"));
    }

    #[test]
    fn empty_results_render_placeholder_sections() {
        let teams = teams_message::<&str>(&[], &GroupNaming::default());
        assert!(section_text(&teams.blocks[0]).is_some_and(|text| text.contains("No candidates")));

        let picked = pick_message::<String>(&[]);
        assert!(section_text(&picked.blocks[0]).is_some_and(|text| text.contains("No candidates")));
    }

    #[test]
    fn pick_message_comma_joins_entities() {
        let message = pick_message(&["pizza", "sushi"]);
        assert_eq!(message.fallback_text, "Draw result: pizza, sushi");
        assert_eq!(section_text(&message.blocks[0]), Some("*Draw result*\npizza, sushi"));
    }

    #[test]
    fn error_and_help_messages_are_ephemeral() {
        let error = error_message("You are not in a voice room.", "req-9");
        assert_eq!(error.response_type, ResponseType::Ephemeral);
        assert!(matches!(
            &error.blocks[1],
            Block::Context { elements, .. }
                if elements == &vec![TextObject::plain("Correlation ID: req-9")]
        ));

        assert_eq!(help_message().response_type, ResponseType::Ephemeral);
    }

    #[test]
    fn message_serializes_with_slack_field_names() {
        let json = serde_json::to_value(pick_message(&["x"])).expect("serialize message");
        assert_eq!(json["response_type"], "in_channel");
        assert_eq!(json["blocks"][0]["type"], "section");
        assert_eq!(json["blocks"][0]["text"]["type"], "mrkdwn");
    }
}
