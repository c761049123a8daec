use std::num::NonZeroUsize;

use crate::draw::pool::Pool;
use crate::draw::random::RandomSource;
use crate::errors::DomainError;

/// How many entities a pick should draw. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawCount(NonZeroUsize);

impl DrawCount {
    pub const ONE: Self = Self(NonZeroUsize::MIN);

    pub fn new(requested: i64) -> Result<Self, DomainError> {
        usize::try_from(requested)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or(DomainError::InvalidDrawCount(requested))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl Default for DrawCount {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<NonZeroUsize> for DrawCount {
    fn from(value: NonZeroUsize) -> Self {
        Self(value)
    }
}

/// Draws up to `count` entities from `pool` without replacement.
///
/// Each draw is uniform over what is still in the pool. The result is capped
/// at the pool size, so asking for more than is available returns the whole
/// pool in random order.
pub fn sample<T, R>(mut pool: Pool<T>, count: DrawCount, rng: &mut R) -> Vec<T>
where
    R: RandomSource + ?Sized,
{
    let mut picked = Vec::with_capacity(count.get().min(pool.len()));
    while picked.len() < count.get() {
        let Some(entity) = pool.draw(rng) else {
            break;
        };
        picked.push(entity);
    }
    picked
}
