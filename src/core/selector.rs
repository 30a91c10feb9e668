use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::HashSet;

use crate::models::{DimensionKey, DimensionValue, Group, MatchRule, ParticipantId};

/// Strategy that partitions an eligible set into concrete groups
///
/// Every returned group must be a subset of `eligible`, hold exactly
/// `rule.group_size` participants, and share no participant with another
/// returned group. The committer checks these and aborts the cycle with
/// `MatchError::InvariantViolation` otherwise. Participants left out of
/// every group stay registered.
pub trait GroupSelector<P, K, V>: Send + Sync {
    fn select(
        &self,
        rule: &MatchRule<K, V>,
        eligible: &HashSet<P>,
        rng: &mut dyn RngCore,
    ) -> Vec<Group<P>>;
}

/// Default selector: shuffle the eligible set, then cut it into consecutive
/// chunks of the group size. A short final chunk is not a group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuffleChunkSelector;

impl<P, K, V> GroupSelector<P, K, V> for ShuffleChunkSelector
where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
{
    fn select(
        &self,
        rule: &MatchRule<K, V>,
        eligible: &HashSet<P>,
        rng: &mut dyn RngCore,
    ) -> Vec<Group<P>> {
        if rule.group_size == 0 {
            return Vec::new();
        }

        let mut order: Vec<P> = eligible.iter().cloned().collect();
        order.shuffle(rng);

        order
            .chunks_exact(rule.group_size)
            .map(|chunk| chunk.iter().cloned().collect())
            .collect()
    }
}

/// Any matching closure can stand in for a selector
impl<P, K, V, F> GroupSelector<P, K, V> for F
where
    P: ParticipantId,
    F: Fn(&MatchRule<K, V>, &HashSet<P>, &mut dyn RngCore) -> Vec<Group<P>> + Send + Sync,
{
    fn select(
        &self,
        rule: &MatchRule<K, V>,
        eligible: &HashSet<P>,
        rng: &mut dyn RngCore,
    ) -> Vec<Group<P>> {
        self(rule, eligible, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rule(size: usize) -> MatchRule<&'static str, u8> {
        MatchRule {
            group_size: size,
            bindings: Vec::new(),
        }
    }

    #[test]
    fn test_chunks_leave_remainder_out() {
        let eligible: HashSet<u32> = (0..7).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let groups = ShuffleChunkSelector.select(&rule(3), &eligible, &mut rng);

        assert_eq!(groups.len(), 2);
        let mut seen = HashSet::new();
        for group in &groups {
            assert_eq!(group.len(), 3);
            for member in group.iter() {
                assert!(eligible.contains(member));
                assert!(seen.insert(*member), "participant {} in two groups", member);
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_too_few_yields_nothing() {
        let eligible: HashSet<u32> = (0..3).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        assert!(ShuffleChunkSelector.select(&rule(4), &eligible, &mut rng).is_empty());
    }

    #[test]
    fn test_selection_is_shuffled() {
        let eligible: HashSet<u32> = (0..10).collect();
        let mut firsts = HashSet::new();

        for seed in 0..32 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let groups = ShuffleChunkSelector.select(&rule(5), &eligible, &mut rng);
            let mut first: Vec<u32> = groups[0].iter().copied().collect();
            first.sort_unstable();
            firsts.insert(first);
        }

        assert!(firsts.len() > 1);
    }

    #[test]
    fn test_closure_selector() {
        let pick_none = |_: &MatchRule<&'static str, u8>,
                         _: &HashSet<u32>,
                         _: &mut dyn RngCore|
         -> Vec<Group<u32>> { Vec::new() };
        let eligible: HashSet<u32> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(pick_none.select(&rule(2), &eligible, &mut rng).is_empty());
    }
}
