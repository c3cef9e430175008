//! Pure batching combinators.

/// Splits `items` into batches of at most `max_size`, lazily.
///
/// Every batch has exactly `max_size` items except possibly the last, which
/// holds whatever remains. `max_size == 0` is treated as `1` so the
/// iterator always makes progress instead of looping forever on an empty
/// batch.
pub fn chunk_by<I>(items: I, max_size: usize) -> ChunkBy<I::IntoIter>
where
    I: IntoIterator,
{
    ChunkBy {
        inner: items.into_iter(),
        max_size: max_size.max(1),
    }
}

/// Iterator returned by [`chunk_by`].
pub struct ChunkBy<I> {
    inner: I,
    max_size: usize,
}

impl<I: Iterator> Iterator for ChunkBy<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.max_size);
        for _ in 0..self.max_size {
            match self.inner.next() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Splits a key-grouped sequence into groups, lazily.
///
/// Each group holds at most `max_keys` distinct keys. A key whose own value
/// list is longer than `max_per_list` is split into `max_per_list`-sized
/// pieces that force a group boundary right after they're emitted; a key
/// whose remaining values already fit within `max_per_list` is appended to
/// the group whole, even if doing so pushes the group's total value count
/// past `max_per_list` — only a forced split or hitting `max_keys` starts a
/// new group. This reproduces the grouping a consumer actually observes:
/// the per-group value total is a soft target, the per-key piece size is
/// the hard one. Keys and values keep their input order; keys with an empty
/// value list are dropped entirely; `max_per_list == 0` is treated as `1`.
pub fn chunk_by_key<I, K, V>(pairs: I, max_per_list: usize, max_keys: usize) -> ChunkByKey<I::IntoIter, K, V>
where
    I: IntoIterator<Item = (K, Vec<V>)>,
    K: Clone,
{
    ChunkByKey {
        inner: pairs.into_iter(),
        max_per_list: max_per_list.max(1),
        max_keys: max_keys.max(1),
        pending: None,
    }
}

/// Iterator returned by [`chunk_by_key`].
pub struct ChunkByKey<I, K, V> {
    inner: I,
    max_per_list: usize,
    max_keys: usize,
    pending: Option<(K, Vec<V>)>,
}

impl<I, K, V> ChunkByKey<I, K, V>
where
    I: Iterator<Item = (K, Vec<V>)>,
{
    fn pull_next_nonempty(&mut self) -> Option<(K, Vec<V>)> {
        for (key, values) in self.inner.by_ref() {
            if !values.is_empty() {
                return Some((key, values));
            }
        }
        None
    }
}

impl<I, K, V> Iterator for ChunkByKey<I, K, V>
where
    I: Iterator<Item = (K, Vec<V>)>,
    K: Clone,
{
    type Item = Vec<(K, Vec<V>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut group: Vec<(K, Vec<V>)> = Vec::new();
        let mut keys_in_group = 0usize;

        loop {
            if self.pending.is_none() {
                self.pending = self.pull_next_nonempty();
            }
            let Some((key, mut values)) = self.pending.take() else {
                break;
            };

            if values.len() > self.max_per_list {
                if keys_in_group >= self.max_keys {
                    self.pending = Some((key, values));
                    return Some(group);
                }
                let piece: Vec<V> = values.drain(..self.max_per_list).collect();
                group.push((key.clone(), piece));
                if !values.is_empty() {
                    self.pending = Some((key, values));
                }
                return Some(group);
            }

            if keys_in_group >= self.max_keys {
                self.pending = Some((key, values));
                return Some(group);
            }
            group.push((key, values));
            keys_in_group += 1;
        }

        if group.is_empty() {
            None
        } else {
            Some(group)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_by_splits_evenly() {
        let batches: Vec<Vec<i32>> = chunk_by(1..=7, 3).collect();
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn chunk_by_empty_input_yields_nothing() {
        let batches: Vec<Vec<i32>> = chunk_by(Vec::<i32>::new(), 3).collect();
        assert!(batches.is_empty());
    }

    #[test]
    fn chunk_by_key_worked_example() {
        let input = vec![("A", vec![1, 2, 3, 4, 5]), ("B", vec![6, 7])];
        let groups: Vec<Vec<(&str, Vec<i32>)>> = chunk_by_key(input, 3, 10).collect();
        assert_eq!(
            groups,
            vec![
                vec![("A", vec![1, 2, 3])],
                vec![("A", vec![4, 5]), ("B", vec![6, 7])],
            ]
        );
    }

    #[test]
    fn chunk_by_key_drops_empty_value_lists() {
        let input = vec![("A", vec![1]), ("B", Vec::<i32>::new()), ("C", vec![2])];
        let groups: Vec<Vec<(&str, Vec<i32>)>> = chunk_by_key(input, 10, 10).collect();
        assert_eq!(groups, vec![vec![("A", vec![1]), ("C", vec![2])]]);
    }

    #[test]
    fn chunk_by_key_respects_max_keys() {
        let input = vec![("A", vec![1]), ("B", vec![2]), ("C", vec![3])];
        let groups: Vec<Vec<(&str, Vec<i32>)>> = chunk_by_key(input, 10, 2).collect();
        assert_eq!(
            groups,
            vec![
                vec![("A", vec![1]), ("B", vec![2])],
                vec![("C", vec![3])],
            ]
        );
    }

    #[test]
    fn chunk_by_key_preserves_every_value_exactly_once() {
        let input = vec![("A", (0..20).collect::<Vec<i32>>()), ("B", vec![100, 101])];
        let groups: Vec<Vec<(&str, Vec<i32>)>> = chunk_by_key(input.clone(), 7, 5).collect();

        let mut seen: Vec<(&str, i32)> = Vec::new();
        for group in &groups {
            for (key, values) in group {
                for v in values {
                    seen.push((*key, *v));
                }
            }
        }
        let mut expected: Vec<(&str, i32)> = Vec::new();
        for (key, values) in &input {
            for v in values {
                expected.push((*key, *v));
            }
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn chunk_by_key_never_splits_a_key_into_a_piece_larger_than_max_per_list() {
        let input = vec![("A", (0..50).collect::<Vec<i32>>())];
        let groups: Vec<Vec<(&str, Vec<i32>)>> = chunk_by_key(input, 6, 100).collect();
        for group in &groups {
            for (_, values) in group {
                assert!(values.len() <= 6);
            }
        }
    }
}
