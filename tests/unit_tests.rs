// Unit tests for Group Matcher

use group_matcher::core::{find_rule, Registry, Waiting};
use group_matcher::{
    Group, GroupSelector, MatchError, MatchRule, ParticipantId, PreferenceProfile,
    ShuffleChunkSelector,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const DIMENSIONS: [&str; 2] = ["color", "food"];

fn create_profile(sizes: &[usize], colors: &[&'static str], foods: &[&'static str]) -> PreferenceProfile<&'static str> {
    let values = HashMap::from([
        ("color", colors.iter().copied().collect()),
        ("food", foods.iter().copied().collect()),
    ]);
    PreferenceProfile::new(&DIMENSIONS, sizes.iter().copied().collect(), values).unwrap()
}

fn create_rule(size: usize, color: &'static str, food: &'static str) -> MatchRule<&'static str, &'static str> {
    MatchRule {
        group_size: size,
        bindings: vec![("color", color), ("food", food)],
    }
}

#[test]
fn test_profile_accepts_rule() {
    let profile = create_profile(&[2, 3], &["red", "blue"], &["pizza"]);

    assert!(profile.accepts(&create_rule(2, "blue", "pizza")));
    assert!(profile.accepts(&create_rule(3, "red", "pizza")));
    assert!(!profile.accepts(&create_rule(4, "red", "pizza")));
    assert!(!profile.accepts(&create_rule(2, "green", "pizza")));
    assert!(!profile.accepts(&create_rule(2, "red", "potato")));
}

#[test]
fn test_profile_keeps_dimension_order() {
    let profile = create_profile(&[2], &["red"], &["pizza", "potato"]);

    assert_eq!(profile.accepted(0), Some(&HashSet::from(["red"])));
    assert_eq!(profile.accepted(1), Some(&HashSet::from(["pizza", "potato"])));
    assert_eq!(profile.accepted(2), None);
}

#[test]
fn test_profile_rejects_unknown_dimension() {
    let values = HashMap::from([
        ("color", HashSet::from(["red"])),
        ("drink", HashSet::from(["tea"])),
    ]);

    let err = PreferenceProfile::new(&DIMENSIONS, HashSet::from([2]), values).unwrap_err();
    assert!(matches!(err, MatchError::InvalidArgument(_)));
}

#[test]
fn test_rule_serializes_bindings() {
    let rule = create_rule(2, "blue", "pizza");
    let json = serde_json::to_value(&rule).unwrap();

    assert_eq!(json["groupSize"], 2);
    assert_eq!(json["bindings"][0][0], "color");
    assert_eq!(json["bindings"][1][1], "pizza");

    let back: MatchRule<String, String> = serde_json::from_value(json).unwrap();
    assert_eq!(back.get(&"food".to_string()), Some(&"pizza".to_string()));
}

#[test]
fn test_group_equality_ignores_order() {
    let first: Group<u32> = vec![1, 2, 3].into_iter().collect();
    let second: Group<u32> = vec![3, 1, 2].into_iter().collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert!(first.contains(&2));
}

#[test]
fn test_unset_identities() {
    assert!(String::new().is_unset());
    assert!(Uuid::nil().is_unset());
    assert!(!Uuid::new_v4().is_unset());
    assert!(!0u64.is_unset());
}

#[test]
fn test_registry_insert_and_remove() {
    let registry: Registry<&'static str, &'static str> = Registry::new();
    let profile = create_profile(&[2], &["red"], &["pizza"]);

    assert!(registry.insert("a", profile.clone()));
    assert!(!registry.insert("a", create_profile(&[5], &["blue"], &["potato"])));
    assert_eq!(registry.get(&"a"), Some(profile));

    assert!(registry.remove(&"a"));
    assert!(!registry.remove(&"a"));
    assert!(registry.is_empty());
}

#[test]
fn test_find_rule_returns_every_eligible_candidate() {
    let waiting: Waiting<&'static str, &'static str> = HashMap::from([
        ("a", create_profile(&[2], &["red", "blue"], &["pizza"])),
        ("b", create_profile(&[2, 3], &["blue"], &["pizza", "potato"])),
        ("c", create_profile(&[2], &["blue"], &["pizza"])),
        ("d", create_profile(&[2], &["green"], &["potato"])),
    ]);
    let candidates: HashSet<_> = waiting.keys().copied().collect();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let found = find_rule(&DIMENSIONS, &waiting, &candidates, &HashSet::new(), &mut rng).unwrap();

    assert_eq!(found.rule, create_rule(2, "blue", "pizza"));
    assert_eq!(found.eligible, HashSet::from(["a", "b", "c"]));
}

#[test]
fn test_find_rule_respects_candidates_and_exhausted() {
    let waiting: Waiting<&'static str, &'static str> = HashMap::from([
        ("a", create_profile(&[2], &["blue"], &["pizza"])),
        ("b", create_profile(&[2], &["blue"], &["pizza"])),
        ("c", create_profile(&[2], &["blue"], &["pizza"])),
    ]);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let only_one = HashSet::from(["a"]);
    assert!(find_rule(&DIMENSIONS, &waiting, &only_one, &HashSet::new(), &mut rng).is_none());

    let all: HashSet<_> = waiting.keys().copied().collect();
    let exhausted = HashSet::from([create_rule(2, "blue", "pizza")]);
    assert!(find_rule(&DIMENSIONS, &waiting, &all, &exhausted, &mut rng).is_none());
}

#[test]
fn test_default_selector_chunks_eligible() {
    let eligible: HashSet<u32> = (0..7).collect();
    let rule: MatchRule<&'static str, &'static str> = MatchRule {
        group_size: 3,
        bindings: Vec::new(),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let groups = ShuffleChunkSelector.select(&rule, &eligible, &mut rng);

    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|group| group.len() == 3));
    assert!(groups[0].members().is_disjoint(groups[1].members()));
    assert!(groups.iter().flat_map(Group::iter).all(|id| eligible.contains(id)));
}
