use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use teamdraw_core::config::DrawConfig;
use teamdraw_core::draw::random::from_seed_or_entropy;
use teamdraw_core::{partition, sample, Capacity, DomainError, DrawCount, Member, MemberId, Pool};
use tracing::info;

use crate::blocks::{self, GroupNaming, MessageTemplate};
use crate::commands::{
    CommandEnvelope, CommandRouteError, DrawCommandService, PickRequest, PickSource, TeamRequest,
    TeamSource,
};
use crate::roster::{RosterError, RosterProvider};

const NOT_IN_VOICE_ROOM: &str = "You are not in a voice room.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawSettings {
    pub default_team_size: i64,
    pub default_pick_count: i64,
    pub naming: GroupNaming,
    pub seed: Option<u64>,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self { default_team_size: 3, default_pick_count: 1, naming: GroupNaming::default(), seed: None }
    }
}

impl DrawSettings {
    pub fn from_config(config: &DrawConfig) -> Self {
        Self {
            default_team_size: config.default_team_size,
            default_pick_count: config.default_pick_count,
            naming: GroupNaming {
                team: config.team_label.clone(),
                remainder: config.remainder_label.clone(),
            },
            seed: config.seed,
        }
    }
}

/// Why a draw was turned down before reaching the engine.
enum Rejection {
    User(String),
    Roster(RosterError),
}

impl From<RosterError> for Rejection {
    fn from(error: RosterError) -> Self {
        Self::Roster(error)
    }
}

impl From<DomainError> for Rejection {
    fn from(error: DomainError) -> Self {
        Self::User(error.to_string())
    }
}

/// Resolves candidates through a roster and runs the draw engine on them.
pub struct RosterDrawService<R> {
    roster: Arc<R>,
    settings: DrawSettings,
    rng: Mutex<StdRng>,
}

impl<R> RosterDrawService<R>
where
    R: RosterProvider,
{
    pub fn new(roster: Arc<R>, settings: DrawSettings) -> Self {
        let rng = Mutex::new(from_seed_or_entropy(settings.seed));
        Self { roster, settings, rng }
    }

    pub fn settings(&self) -> &DrawSettings {
        &self.settings
    }

    fn with_rng<T>(&self, draw: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        draw(&mut rng)
    }

    async fn voice_pool(
        &self,
        caller: &str,
        excluded: &[MemberId],
    ) -> Result<Pool<Member>, Rejection> {
        let caller = MemberId(caller.to_owned());
        let Some(occupants) = self.roster.voice_room_members(&caller).await? else {
            return Err(Rejection::User(NOT_IN_VOICE_ROOM.to_owned()));
        };
        let excluded: Vec<Member> =
            excluded.iter().map(|id| Member::unresolved(id.as_str())).collect();
        Ok(Pool::excluding(occupants, &excluded))
    }

    async fn mentioned_pool(&self, ids: &[MemberId]) -> Result<Pool<Member>, Rejection> {
        let mut members = Vec::with_capacity(ids.len());
        for id in ids {
            members.push(self.roster.resolve_member(id).await?);
        }
        Ok(Pool::new(members))
    }

    async fn run_pick(
        &self,
        request: PickRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, Rejection> {
        let count = DrawCount::new(request.count.unwrap_or(self.settings.default_pick_count))?;
        let (pool_size, message) = match request.source {
            PickSource::Text { items } => {
                let pool = Pool::from_labels(items);
                let pool_size = pool.len();
                let picked = self.with_rng(|rng| sample(pool, count, rng));
                (pool_size, blocks::pick_message(&picked))
            }
            PickSource::Voice { excluded } => {
                let pool = self.voice_pool(&envelope.user_id, &excluded).await?;
                let pool_size = pool.len();
                let picked = self.with_rng(|rng| sample(pool, count, rng));
                (pool_size, blocks::pick_message(&picked))
            }
            PickSource::Members { targets } => {
                let pool = self.mentioned_pool(&targets).await?;
                let pool_size = pool.len();
                let picked = self.with_rng(|rng| sample(pool, count, rng));
                (pool_size, blocks::pick_message(&picked))
            }
        };

        info!(
            event_name = "draw.pick.completed",
            correlation_id = %envelope.request_id,
            channel_id = %envelope.channel_id,
            pool_size,
            count = count.get(),
            "pick drawn"
        );
        Ok(message)
    }

    async fn run_split(
        &self,
        request: TeamRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, Rejection> {
        let capacity =
            Capacity::from_requested(request.size.unwrap_or(self.settings.default_team_size))?;
        let pool = match request.source {
            TeamSource::Voice { excluded } => {
                self.voice_pool(&envelope.user_id, &excluded).await?
            }
            TeamSource::Members { members } => self.mentioned_pool(&members).await?,
        };
        let pool_size = pool.len();
        let groups = self.with_rng(|rng| partition(pool, capacity, rng));

        info!(
            event_name = "draw.teams.completed",
            correlation_id = %envelope.request_id,
            channel_id = %envelope.channel_id,
            pool_size,
            capacity = ?capacity.limit(),
            groups = groups.len(),
            "teams drawn"
        );
        Ok(blocks::teams_message(&groups, &self.settings.naming))
    }
}

fn settle(
    outcome: Result<MessageTemplate, Rejection>,
    envelope: &CommandEnvelope,
) -> Result<MessageTemplate, CommandRouteError> {
    match outcome {
        Ok(message) => Ok(message),
        Err(Rejection::User(reason)) => {
            info!(
                event_name = "draw.rejected",
                correlation_id = %envelope.request_id,
                command = envelope.command.slash(),
                reason = %reason,
                "draw request rejected"
            );
            Ok(blocks::error_message(&reason, &envelope.request_id))
        }
        Err(Rejection::Roster(error)) => Err(CommandRouteError::Roster(error)),
    }
}

#[async_trait]
impl<R> DrawCommandService for RosterDrawService<R>
where
    R: RosterProvider + 'static,
{
    async fn pick(
        &self,
        request: PickRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        settle(self.run_pick(request, envelope).await, envelope)
    }

    async fn split_teams(
        &self,
        request: TeamRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        settle(self.run_split(request, envelope).await, envelope)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use teamdraw_core::config::DrawConfig;
    use teamdraw_core::{Member, MemberId};
    use tracing::Level;

    use super::{DrawSettings, RosterDrawService};
    use crate::blocks::{Block, MessageTemplate, ResponseType, TextObject};
    use crate::commands::{
        CommandEnvelope, CommandName, CommandRouteError, DrawCommandService, PickRequest,
        PickSource, TeamRequest, TeamSource,
    };
    use crate::roster::{InMemoryRoster, RosterError, RosterProvider};

    fn ids(values: &[&str]) -> Vec<MemberId> {
        values.iter().map(|value| MemberId((*value).to_owned())).collect()
    }

    fn envelope(command: CommandName, user_id: &str) -> CommandEnvelope {
        CommandEnvelope {
            command,
            text: String::new(),
            channel_id: "C1".to_owned(),
            user_id: user_id.to_owned(),
            trigger_ts: "1".to_owned(),
            request_id: "req-7".to_owned(),
        }
    }

    fn seeded_settings() -> DrawSettings {
        DrawSettings { seed: Some(7), ..DrawSettings::default() }
    }

    fn texts(message: &MessageTemplate) -> Vec<&str> {
        message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text: TextObject::Mrkdwn { text }, .. }
                | Block::Section { text: TextObject::Plain { text }, .. } => Some(text.as_str()),
                Block::Context { .. } => None,
            })
            .collect()
    }

    fn voice_roster() -> Arc<InMemoryRoster> {
        let roster = Arc::new(InMemoryRoster::new());
        for user in ["U1", "U2", "U3", "U4", "U5", "U6", "U7"] {
            roster.record_voice_state(MemberId(user.to_owned()), Some("R1".to_owned()));
        }
        roster
    }

    #[test]
    fn settings_follow_draw_config() {
        let config = DrawConfig {
            default_team_size: 4,
            default_pick_count: 2,
            team_label: "Squad".to_owned(),
            remainder_label: "Bench".to_owned(),
            seed: Some(11),
        };
        let settings = DrawSettings::from_config(&config);
        assert_eq!(settings.default_team_size, 4);
        assert_eq!(settings.naming.remainder, "Bench");
        assert_eq!(settings.seed, Some(11));
    }

    #[tokio::test]
    async fn voice_teams_split_room_with_remainder() {
        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        let message = service
            .split_teams(
                TeamRequest { size: Some(3), source: TeamSource::Voice { excluded: Vec::new() } },
                &envelope(CommandName::Team, "U1"),
            )
            .await
            .expect("split");

        let sections = texts(&message);
        assert_eq!(sections.len(), 4);
        assert!(sections[1].starts_with("*Team 1*: "));
        assert!(sections[2].starts_with("*Team 2*: "));
        assert!(sections[3].starts_with("*Leftover members*: "));
        assert_eq!(sections[3].matches("<@").count(), 1);
    }

    #[tokio::test]
    async fn voice_pick_honours_exclusions() {
        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        let excluded = ids(&["U1", "U2", "U3", "U4", "U5", "U6"]);
        let message = service
            .pick(
                PickRequest { count: Some(3), source: PickSource::Voice { excluded } },
                &envelope(CommandName::Pick, "U1"),
            )
            .await
            .expect("pick");

        assert_eq!(message.fallback_text, "Draw result: <@U7>");
    }

    #[tokio::test]
    async fn caller_outside_voice_room_gets_ephemeral_error() {
        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        let message = service
            .pick(
                PickRequest { count: None, source: PickSource::Voice { excluded: Vec::new() } },
                &envelope(CommandName::Pick, "U99"),
            )
            .await
            .expect("pick");

        assert_eq!(message.response_type, ResponseType::Ephemeral);
        assert!(message.fallback_text.contains("not in a voice room"));
    }

    #[tokio::test]
    async fn non_positive_pick_count_is_rejected() {
        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        let message = service
            .pick(
                PickRequest {
                    count: Some(0),
                    source: PickSource::Text { items: vec!["a".to_owned()] },
                },
                &envelope(CommandName::Pick, "U1"),
            )
            .await
            .expect("pick");

        assert_eq!(message.response_type, ResponseType::Ephemeral);
        assert!(message.fallback_text.contains("count must be at least 1"));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn rejected_draws_are_logged_at_info() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        service
            .pick(
                PickRequest { count: None, source: PickSource::Voice { excluded: Vec::new() } },
                &envelope(CommandName::Pick, "U99"),
            )
            .await
            .expect("pick");

        let output = String::from_utf8(log.0.lock().expect("log buffer").clone()).expect("utf8");
        let line = output
            .lines()
            .find(|line| line.contains("draw request rejected"))
            .expect("rejection logged");
        assert!(line.contains(" INFO "));
        assert!(line.contains("draw.rejected"));
    }

    #[tokio::test]
    async fn text_pick_drops_blank_items_and_caps_at_pool_size() {
        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        let items = vec!["pizza".to_owned(), "  ".to_owned(), "pizza".to_owned()];
        let message = service
            .pick(
                PickRequest { count: Some(5), source: PickSource::Text { items } },
                &envelope(CommandName::Pick, "U1"),
            )
            .await
            .expect("pick");

        assert_eq!(message.fallback_text, "Draw result: pizza");
    }

    #[tokio::test]
    async fn mentioned_members_are_deduplicated_and_unbounded_size_keeps_one_team() {
        let service = RosterDrawService::new(voice_roster(), seeded_settings());
        let message = service
            .split_teams(
                TeamRequest {
                    size: Some(0),
                    source: TeamSource::Members { members: ids(&["U1", "U2", "U1"]) },
                },
                &envelope(CommandName::Team, "U1"),
            )
            .await
            .expect("split");

        let sections = texts(&message);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].matches("<@").count(), 2);
    }

    #[tokio::test]
    async fn same_seed_reproduces_the_same_draw() {
        let request = || PickRequest {
            count: Some(3),
            source: PickSource::Text {
                items: ["a", "b", "c", "d", "e", "f"].map(str::to_owned).to_vec(),
            },
        };
        let first = RosterDrawService::new(voice_roster(), seeded_settings())
            .pick(request(), &envelope(CommandName::Pick, "U1"))
            .await
            .expect("pick");
        let second = RosterDrawService::new(voice_roster(), seeded_settings())
            .pick(request(), &envelope(CommandName::Pick, "U1"))
            .await
            .expect("pick");

        assert_eq!(first, second);
    }

    struct FailingRoster;

    #[async_trait]
    impl RosterProvider for FailingRoster {
        async fn voice_room_members(
            &self,
            _user_id: &MemberId,
        ) -> Result<Option<Vec<Member>>, RosterError> {
            Err(RosterError::Unavailable("directory offline".to_owned()))
        }

        async fn resolve_member(&self, _member_id: &MemberId) -> Result<Member, RosterError> {
            Err(RosterError::Unavailable("directory offline".to_owned()))
        }
    }

    #[tokio::test]
    async fn roster_failures_surface_as_route_errors() {
        let service = RosterDrawService::new(Arc::new(FailingRoster), seeded_settings());
        let error = service
            .split_teams(
                TeamRequest { size: None, source: TeamSource::Members { members: ids(&["U1"]) } },
                &envelope(CommandName::Team, "U1"),
            )
            .await
            .expect_err("roster failure");

        assert!(matches!(error, CommandRouteError::Roster(RosterError::Unavailable(_))));
    }
}
