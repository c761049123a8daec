use std::collections::HashSet;
use std::hash::Hash;

use crate::draw::random::RandomSource;

/// Working set of candidates for a single draw.
///
/// A pool is duplicate-free and is consumed by the operation it is handed to.
/// Entities leave it one at a time through [`Pool::draw`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pool<T> {
    items: Vec<T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Eq + Hash> Pool<T> {
    /// Builds a pool, keeping the first occurrence of each entity.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        items.into_iter().collect()
    }

    /// Builds a pool from `members` with every entity equal to one in `excluded` removed.
    pub fn excluding<'a>(
        members: impl IntoIterator<Item = T>,
        excluded: impl IntoIterator<Item = &'a T>,
    ) -> Self
    where
        T: 'a,
    {
        let excluded: HashSet<&T> = excluded.into_iter().collect();
        members.into_iter().filter(|member| !excluded.contains(&member)).collect()
    }
}

impl Pool<String> {
    /// Builds a pool of free-text labels. Labels are trimmed; blank ones are dropped.
    pub fn from_labels<S>(labels: impl IntoIterator<Item = S>) -> Self
    where
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_owned())
            .filter(|label| !label.is_empty())
            .collect()
    }
}

impl<T> Pool<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Removes and returns one remaining entity chosen uniformly at random.
    ///
    /// The chosen slot is filled by the last entity (swap-and-shrink), so each
    /// draw is O(1) and the remaining entities stay a contiguous, duplicate-free
    /// set.
    pub fn draw<R>(&mut self, rng: &mut R) -> Option<T>
    where
        R: RandomSource + ?Sized,
    {
        if self.items.is_empty() {
            return None;
        }
        let index = rng.next_index(self.items.len());
        Some(self.items.swap_remove(index))
    }
}

impl<T: Eq + Hash> FromIterator<T> for Pool<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        let mut seen = HashSet::with_capacity(items.len());
        let first_seen: Vec<bool> = items.iter().map(|item| seen.insert(item)).collect();
        drop(seen);
        let items = items
            .into_iter()
            .zip(first_seen)
            .filter_map(|(item, first)| first.then_some(item))
            .collect();
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::Pool;
    use crate::draw::random::{seeded, RandomSource};

    struct LastIndex;

    impl RandomSource for LastIndex {
        fn next_index(&mut self, bound: usize) -> usize {
            bound - 1
        }
    }

    struct FirstIndex;

    impl RandomSource for FirstIndex {
        fn next_index(&mut self, _bound: usize) -> usize {
            0
        }
    }

    #[test]
    fn new_drops_duplicates_keeping_first_occurrence() {
        let pool = Pool::new(["b", "a", "b", "c", "a"]);
        assert_eq!(pool.as_slice(), &["b", "a", "c"]);
    }

    #[test]
    fn large_inputs_dedupe_to_distinct_entities_in_first_seen_order() {
        let pool = Pool::new((0..20_000).chain((0..20_000).rev()).chain(5..10));
        assert_eq!(pool.len(), 20_000);
        assert!(pool.as_slice().iter().copied().eq(0..20_000));
    }

    #[test]
    fn excluding_filters_every_excluded_entity() {
        let excluded = vec!["bob", "dave", "zed"];
        let pool = Pool::excluding(["alice", "bob", "carol", "dave"], excluded.iter());
        assert_eq!(pool.as_slice(), &["alice", "carol"]);
    }

    #[test]
    fn excluding_everyone_leaves_an_empty_pool() {
        let members = ["alice", "bob"];
        let pool = Pool::excluding(members, members.iter());
        assert!(pool.is_empty());
    }

    #[test]
    fn labels_are_trimmed_and_blank_entries_discarded() {
        let pool = Pool::from_labels(["  pizza ", "", "   ", "sushi", "pizza"]);
        assert_eq!(pool.as_slice(), &["pizza".to_owned(), "sushi".to_owned()]);
    }

    #[test]
    fn draw_on_empty_pool_returns_none() {
        let mut pool: Pool<u8> = Pool::default();
        assert_eq!(pool.draw(&mut seeded(1)), None);
    }

    #[test]
    fn draw_swaps_last_entity_into_the_vacated_slot() {
        let mut pool = Pool::new([1, 2, 3, 4]);
        assert_eq!(pool.draw(&mut FirstIndex), Some(1));
        assert_eq!(pool.as_slice(), &[4, 2, 3]);
        assert_eq!(pool.draw(&mut LastIndex), Some(3));
        assert_eq!(pool.as_slice(), &[4, 2]);
    }

    #[test]
    fn draining_yields_every_entity_exactly_once() {
        let mut pool = Pool::new(0..50);
        let mut rng = seeded(3);
        let mut drawn = Vec::new();
        while let Some(item) = pool.draw(&mut rng) {
            drawn.push(item);
        }
        drawn.sort_unstable();
        assert_eq!(drawn, (0..50).collect::<Vec<_>>());
    }
}
