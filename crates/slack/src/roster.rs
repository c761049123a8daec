use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use teamdraw_core::{Member, MemberId};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("roster unavailable: {0}")]
    Unavailable(String),
}

/// Resolves chat participants into candidate members.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Occupants of the voice room `user_id` is in, in join order. `None` when
    /// the user is not in a voice room.
    async fn voice_room_members(&self, user_id: &MemberId)
        -> Result<Option<Vec<Member>>, RosterError>;

    /// Looks a member up by id. Unknown ids resolve to a bare member.
    async fn resolve_member(&self, member_id: &MemberId) -> Result<Member, RosterError>;
}

#[derive(Debug, Default)]
struct RosterState {
    members: HashMap<MemberId, Member>,
    rooms: HashMap<String, Vec<MemberId>>,
    occupancy: HashMap<MemberId, String>,
}

impl RosterState {
    fn member(&self, id: &MemberId) -> Member {
        self.members.get(id).cloned().unwrap_or_else(|| Member::unresolved(id.as_str()))
    }

    fn leave_room(&mut self, user_id: &MemberId) {
        let Some(room_id) = self.occupancy.remove(user_id) else {
            return;
        };
        if let Some(occupants) = self.rooms.get_mut(&room_id) {
            occupants.retain(|occupant| occupant != user_id);
            if occupants.is_empty() {
                self.rooms.remove(&room_id);
            }
        }
    }
}

/// Process-local roster fed by the member directory and voice state events.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    state: RwLock<RosterState>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces members keyed by id. Returns how many were written.
    pub fn upsert_members(&self, members: impl IntoIterator<Item = Member>) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut written = 0;
        for member in members {
            state.members.insert(member.id.clone(), member);
            written += 1;
        }
        written
    }

    /// Moves `user_id` into `room_id`, or out of any room when `room_id` is `None`.
    pub fn record_voice_state(&self, user_id: MemberId, room_id: Option<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.occupancy.get(&user_id) == room_id.as_ref() {
            return;
        }

        state.leave_room(&user_id);
        if let Some(room_id) = room_id {
            state.rooms.entry(room_id.clone()).or_default().push(user_id.clone());
            state.occupancy.insert(user_id, room_id);
        }
    }

    pub fn member_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).members.len()
    }

    pub fn active_room_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).rooms.len()
    }
}

#[async_trait]
impl RosterProvider for InMemoryRoster {
    async fn voice_room_members(
        &self,
        user_id: &MemberId,
    ) -> Result<Option<Vec<Member>>, RosterError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let Some(room_id) = state.occupancy.get(user_id) else {
            return Ok(None);
        };
        let occupants = state.rooms.get(room_id).map(Vec::as_slice).unwrap_or_default();
        Ok(Some(occupants.iter().map(|id| state.member(id)).collect()))
    }

    async fn resolve_member(&self, member_id: &MemberId) -> Result<Member, RosterError> {
        Ok(self.state.read().unwrap_or_else(PoisonError::into_inner).member(member_id))
    }
}
