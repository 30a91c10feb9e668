//! Group Matcher - periodic multi-dimensional group matching engine
//!
//! Participants register a set of acceptable group sizes and, for every
//! configured dimension, a set of acceptable values. A background ticker
//! repeatedly searches the waiting pool for a rule (one group size plus one
//! value per dimension) enough participants share, partitions them into
//! groups and hands each group to a caller-supplied handler.

pub mod config;
pub mod core;
pub mod models;

// Re-export commonly used types
pub use config::{ErrorPolicy, MatcherSettings, Settings};
pub use core::{
    CycleReport, EngineConfig, GroupSelector, HandlerError, MatchError, MatchHandler, Matcher,
    ShuffleChunkSelector,
};
pub use models::{DimensionKey, DimensionValue, Group, MatchRule, ParticipantId, PreferenceProfile};
