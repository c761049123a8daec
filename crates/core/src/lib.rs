pub mod config;
pub mod domain;
pub mod draw;
pub mod errors;

pub use domain::member::{Member, MemberId, MemberRecord};
pub use draw::{partition, sample, Capacity, DrawCount, Group, GroupLabel, Pool, RandomSource};
pub use errors::{ApplicationError, DomainError, InterfaceError};
