//! Recursive search for a rule that enough waiting participants share.
//!
//! The search binds one slot of the rule per depth: first the group size,
//! then each dimension in configured order. At every depth the candidates
//! are bucketed by the values they accept for the slot, the buckets are
//! visited in random order, and a bucket smaller than the group size bound
//! so far is pruned. The first fully bound rule that is not already
//! exhausted this cycle wins.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::core::registry::Waiting;
use crate::models::{DimensionKey, DimensionValue, MatchRule, ParticipantId};

/// A fully bound rule and every candidate that accepts all of its bindings
#[derive(Debug, Clone)]
pub struct Found<P, K, V> {
    pub rule: MatchRule<K, V>,
    pub eligible: HashSet<P>,
}

/// Which part of the rule a depth binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    GroupSize,
    Dimension(usize),
}

impl Slot {
    fn next(self, dimensions: usize) -> Option<Slot> {
        let next = match self {
            Slot::GroupSize => 0,
            Slot::Dimension(index) => index + 1,
        };
        (next < dimensions).then_some(Slot::Dimension(next))
    }
}

/// Rule under construction along the current search branch
#[derive(Debug)]
struct Partial<V> {
    group_size: usize,
    values: Vec<V>,
}

impl<V: Clone> Partial<V> {
    fn to_rule<K: Clone>(&self, dimensions: &[K]) -> MatchRule<K, V> {
        MatchRule {
            group_size: self.group_size,
            bindings: dimensions
                .iter()
                .cloned()
                .zip(self.values.iter().cloned())
                .collect(),
        }
    }
}

/// Search `candidates` for a rule not in `exhausted`
///
/// Every candidate must have a profile in `waiting`; candidates without one
/// are ignored.
pub fn find_rule<P, K, V, R>(
    dimensions: &[K],
    waiting: &Waiting<P, V>,
    candidates: &HashSet<P>,
    exhausted: &HashSet<MatchRule<K, V>>,
    rng: &mut R,
) -> Option<Found<P, K, V>>
where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
    R: Rng + ?Sized,
{
    let mut search = RuleSearch {
        dimensions,
        waiting,
        exhausted,
        rng,
    };
    let mut partial = Partial {
        group_size: 0,
        values: Vec::with_capacity(dimensions.len()),
    };

    search.descend(Slot::GroupSize, candidates, &mut partial)
}

struct RuleSearch<'a, P, K, V: DimensionValue, R: ?Sized> {
    dimensions: &'a [K],
    waiting: &'a Waiting<P, V>,
    exhausted: &'a HashSet<MatchRule<K, V>>,
    rng: &'a mut R,
}

impl<'a, P, K, V, R> RuleSearch<'a, P, K, V, R>
where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
    R: Rng + ?Sized,
{
    fn descend(
        &mut self,
        slot: Slot,
        candidates: &HashSet<P>,
        partial: &mut Partial<V>,
    ) -> Option<Found<P, K, V>> {
        let waiting = self.waiting;

        match slot {
            Slot::GroupSize => {
                let buckets = bucket_by(candidates, |participant| {
                    waiting.get(participant).map(|profile| profile.size_set())
                });
                self.try_buckets(slot, buckets, partial, |partial, size| {
                    partial.group_size = size;
                })
            }
            Slot::Dimension(index) => {
                let buckets = bucket_by(candidates, |participant| {
                    waiting
                        .get(participant)
                        .and_then(|profile| profile.accepted(index))
                });
                self.try_buckets(slot, buckets, partial, |partial, value| {
                    partial.values.truncate(index);
                    partial.values.push(value);
                })
            }
        }
    }

    fn try_buckets<T>(
        &mut self,
        slot: Slot,
        buckets: HashMap<T, HashSet<P>>,
        partial: &mut Partial<V>,
        bind: impl Fn(&mut Partial<V>, T),
    ) -> Option<Found<P, K, V>> {
        // Random value order keeps the same participants from always being
        // discovered first.
        let mut order: Vec<(T, HashSet<P>)> = buckets.into_iter().collect();
        order.shuffle(&mut *self.rng);

        for (value, bucket) in order {
            bind(partial, value);

            if bucket.len() < partial.group_size {
                continue;
            }

            match slot.next(self.dimensions.len()) {
                Some(next) => {
                    if let Some(found) = self.descend(next, &bucket, partial) {
                        return Some(found);
                    }
                }
                None => {
                    let rule = partial.to_rule(self.dimensions);
                    if self.exhausted.contains(&rule) {
                        tracing::trace!("Skipping exhausted rule: {:?}", rule);
                        continue;
                    }
                    return Some(Found {
                        rule,
                        eligible: bucket,
                    });
                }
            }
        }

        None
    }
}

/// Inverted index: accepted value -> candidates accepting it
fn bucket_by<'w, P, T, F>(candidates: &HashSet<P>, accepted: F) -> HashMap<T, HashSet<P>>
where
    P: ParticipantId,
    T: Eq + Hash + Clone + 'w,
    F: Fn(&P) -> Option<&'w HashSet<T>>,
{
    let mut buckets: HashMap<T, HashSet<P>> = HashMap::new();

    for participant in candidates {
        let Some(values) = accepted(participant) else {
            continue;
        };
        for value in values {
            buckets
                .entry(value.clone())
                .or_default()
                .insert(participant.clone());
        }
    }

    buckets
}
