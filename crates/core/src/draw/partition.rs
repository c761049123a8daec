use std::fmt;
use std::num::NonZeroUsize;

use crate::draw::pool::Pool;
use crate::draw::random::RandomSource;
use crate::errors::DomainError;

/// Member limit of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capacity {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl Capacity {
    /// Interprets a user-requested team size. Sizes of zero or below mean "no limit".
    pub fn from_requested(size: i64) -> Result<Self, DomainError> {
        if size <= 0 {
            return Ok(Self::Unbounded);
        }
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::Bounded)
            .ok_or(DomainError::InvalidGroupSize(size))
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Bounded(limit) => Some(limit.get()),
            Self::Unbounded => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupLabel {
    /// 1-based team number.
    Team(usize),
    Remainder,
}

impl GroupLabel {
    pub fn render(&self, team_label: &str, remainder_label: &str) -> String {
        match self {
            Self::Team(index) => format!("{team_label} {index}"),
            Self::Remainder => remainder_label.to_owned(),
        }
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team(index) => write!(f, "Team {index}"),
            Self::Remainder => f.write_str("Leftover members"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group<T> {
    label: GroupLabel,
    capacity: Capacity,
    members: Vec<T>,
}

impl<T> Group<T> {
    pub fn new(label: GroupLabel, capacity: Capacity) -> Self {
        let members = match capacity {
            Capacity::Bounded(limit) => Vec::with_capacity(limit.get()),
            Capacity::Unbounded => Vec::new(),
        };
        Self { label, capacity, members }
    }

    pub fn label(&self) -> GroupLabel {
        self.label
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn members(&self) -> &[T] {
        &self.members
    }

    pub fn into_members(self) -> Vec<T> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.limit().is_some_and(|limit| self.members.len() >= limit)
    }

    /// Appends `member`, handing it back when the group is already full.
    pub fn try_push(&mut self, member: T) -> Result<(), T> {
        if self.is_full() {
            return Err(member);
        }
        self.members.push(member);
        Ok(())
    }
}

/// Splits `pool` into teams of `capacity` members plus a leftover group.
///
/// Teams are filled one at a time by uniform random draws. Once fewer than
/// `capacity` entities remain they all go into a single unbounded
/// [`GroupLabel::Remainder`] group, which is omitted when nothing is left.
/// An unbounded capacity yields one team holding the whole pool.
pub fn partition<T, R>(mut pool: Pool<T>, capacity: Capacity, rng: &mut R) -> Vec<Group<T>>
where
    R: RandomSource + ?Sized,
{
    let mut groups = Vec::new();
    if pool.is_empty() {
        return groups;
    }

    let Capacity::Bounded(limit) = capacity else {
        let mut everyone = Group::new(GroupLabel::Team(1), Capacity::Unbounded);
        everyone.members = pool.into_vec();
        groups.push(everyone);
        return groups;
    };

    let mut index = 1;
    while pool.len() >= limit.get() {
        let mut team = Group::new(GroupLabel::Team(index), capacity);
        while !team.is_full() {
            let Some(member) = pool.draw(rng) else {
                break;
            };
            if team.try_push(member).is_err() {
                break;
            }
        }
        groups.push(team);
        index += 1;
    }

    if !pool.is_empty() {
        let mut leftover = Group::new(GroupLabel::Remainder, Capacity::Unbounded);
        leftover.members = pool.into_vec();
        groups.push(leftover);
    }

    groups
}
