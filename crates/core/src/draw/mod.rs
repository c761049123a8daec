//! Randomized team splitting and picking.
//!
//! Both operations consume a [`Pool`] built fresh for each command and draw
//! from it through an injected [`RandomSource`]:
//!
//! - [`partition`] fills fixed-size teams and collects the rest in a leftover group.
//! - [`sample`] picks a number of entities without replacement.

pub mod partition;
pub mod pool;
pub mod random;
pub mod sample;

pub use partition::{partition, Capacity, Group, GroupLabel};
pub use pool::Pool;
pub use random::RandomSource;
pub use sample::{sample, DrawCount};
