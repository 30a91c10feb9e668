use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::core::error::MatchError;
use crate::models::identity::{DimensionKey, DimensionValue};

/// Smallest group the engine will ever form
pub const MIN_GROUP_SIZE: usize = 2;

/// A participant's declared acceptable group sizes and, per dimension, the
/// acceptable values.
///
/// Value sets are stored in the engine's configured dimension order, so the
/// n-th set belongs to the n-th dimension key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceProfile<V: Eq + Hash> {
    size_set: HashSet<usize>,
    accepted: Vec<HashSet<V>>,
}

impl<V: DimensionValue> PreferenceProfile<V> {
    /// Validate raw submit arguments against the configured dimensions
    ///
    /// # Errors
    /// `InvalidArgument` if the size set is empty or holds a size below two,
    /// if the map's keys differ from `dimensions`, or if any value set is empty.
    pub fn new<K: DimensionKey>(
        dimensions: &[K],
        size_set: HashSet<usize>,
        mut values_by_dimension: HashMap<K, HashSet<V>>,
    ) -> Result<Self, MatchError> {
        if size_set.is_empty() {
            return Err(MatchError::invalid("size set cannot be empty"));
        }

        if size_set.iter().any(|&size| size < MIN_GROUP_SIZE) {
            return Err(MatchError::invalid("group size cannot be less than two"));
        }

        let complete = values_by_dimension.len() == dimensions.len()
            && dimensions.iter().all(|key| values_by_dimension.contains_key(key));
        if !complete {
            return Err(MatchError::invalid(format!(
                "values must contain exactly the dimensions: {:?}",
                dimensions
            )));
        }

        if values_by_dimension.values().any(HashSet::is_empty) {
            return Err(MatchError::invalid("accepted value set cannot be empty"));
        }

        let accepted = dimensions
            .iter()
            .filter_map(|key| values_by_dimension.remove(key))
            .collect();

        Ok(Self { size_set, accepted })
    }

    /// Group sizes this participant is willing to join
    pub fn size_set(&self) -> &HashSet<usize> {
        &self.size_set
    }

    /// Accepted values for the dimension at `index` in configured order
    pub fn accepted(&self, index: usize) -> Option<&HashSet<V>> {
        self.accepted.get(index)
    }

    /// Whether every binding of `rule` (and its group size) is acceptable
    pub fn accepts<K>(&self, rule: &MatchRule<K, V>) -> bool {
        self.size_set.contains(&rule.group_size)
            && rule.bindings.len() == self.accepted.len()
            && rule
                .bindings
                .iter()
                .zip(&self.accepted)
                .all(|((_, value), values)| values.contains(value))
    }
}

/// One concrete combination of group size and a single accepted value per
/// dimension.
///
/// Bindings follow the engine's dimension order. Two rules are equal when
/// the group size and every binding are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRule<K, V> {
    #[serde(rename = "groupSize")]
    pub group_size: usize,
    pub bindings: Vec<(K, V)>,
}

impl<K: PartialEq, V> MatchRule<K, V> {
    /// Bound value for `key`, if the rule binds it
    pub fn get(&self, key: &K) -> Option<&V> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == key)
            .map(|(_, value)| value)
    }
}

/// A set of participants handed to the match handler together
#[derive(Debug, Clone, Serialize)]
pub struct Group<P> {
    members: HashSet<P>,
}

impl<P: Eq + Hash> PartialEq for Group<P> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<P: Eq + Hash> Eq for Group<P> {}

impl<P: Eq + Hash> Group<P> {
    pub fn new(members: HashSet<P>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, participant: &P) -> bool {
        self.members.contains(participant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.members.iter()
    }

    pub fn members(&self) -> &HashSet<P> {
        &self.members
    }

    pub fn into_members(self) -> HashSet<P> {
        self.members
    }
}

impl<P: Eq + Hash> FromIterator<P> for Group<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<P: Eq + Hash> IntoIterator for Group<P> {
    type Item = P;
    type IntoIter = std::collections::hash_set::IntoIter<P>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<&'static str> {
        vec!["color", "food"]
    }

    fn values(color: &[&'static str], food: &[&'static str]) -> HashMap<&'static str, HashSet<&'static str>> {
        HashMap::from([
            ("color", color.iter().copied().collect()),
            ("food", food.iter().copied().collect()),
        ])
    }

    #[test]
    fn test_profile_keeps_dimension_order() {
        let profile = PreferenceProfile::new(
            &dims(),
            HashSet::from([2, 3]),
            values(&["red"], &["pizza", "chicken"]),
        )
        .unwrap();

        assert!(profile.accepted(0).unwrap().contains("red"));
        assert!(profile.accepted(1).unwrap().contains("chicken"));
        assert!(profile.accepted(2).is_none());
    }

    #[test]
    fn test_profile_rejects_small_sizes() {
        let err = PreferenceProfile::new(&dims(), HashSet::from([1, 4]), values(&["red"], &["pizza"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: group size cannot be less than two");
    }

    #[test]
    fn test_profile_rejects_extra_dimension() {
        let mut map = values(&["red"], &["pizza"]);
        map.insert("place", HashSet::from(["cafe"]));

        let err = PreferenceProfile::new(&dims(), HashSet::from([2]), map).unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));
    }

    #[test]
    fn test_profile_accepts_rule() {
        let profile = PreferenceProfile::new(
            &dims(),
            HashSet::from([2, 3]),
            values(&["red", "blue"], &["pizza"]),
        )
        .unwrap();

        let rule = MatchRule {
            group_size: 3,
            bindings: vec![("color", "blue"), ("food", "pizza")],
        };
        assert!(profile.accepts(&rule));

        let too_big = MatchRule { group_size: 4, ..rule.clone() };
        assert!(!profile.accepts(&too_big));

        let wrong_food = MatchRule {
            group_size: 3,
            bindings: vec![("color", "blue"), ("food", "potato")],
        };
        assert!(!profile.accepts(&wrong_food));
    }

    #[test]
    fn test_rule_lookup_by_key() {
        let rule = MatchRule {
            group_size: 2,
            bindings: vec![("color", "green"), ("food", "potato")],
        };

        assert_eq!(rule.get(&"food"), Some(&"potato"));
        assert_eq!(rule.get(&"place"), None);
    }

    #[test]
    fn test_group_collapses_duplicates() {
        let group: Group<&str> = ["a", "b", "a"].into_iter().collect();
        assert_eq!(group.len(), 2);
        assert!(group.contains(&"b"));
    }
}
