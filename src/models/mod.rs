// Model exports
pub mod domain;
pub mod identity;

pub use domain::{Group, MatchRule, PreferenceProfile, MIN_GROUP_SIZE};
pub use identity::{DimensionKey, DimensionValue, ParticipantId};
