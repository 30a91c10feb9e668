// Core algorithm exports
pub mod committer;
pub mod error;
pub mod matcher;
pub mod registry;
mod scheduler;
pub mod search;
pub mod selector;

pub use committer::MatchHandler;
pub use error::{HandlerError, MatchError};
pub use matcher::{CycleReport, EngineConfig, Matcher};
pub use registry::{Registry, RegistryGuard, Waiting};
pub use search::{find_rule, Found};
pub use selector::{GroupSelector, ShuffleChunkSelector};
