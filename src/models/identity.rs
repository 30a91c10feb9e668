use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a participant waiting to be grouped.
///
/// The engine never looks inside an identity beyond equality and hashing.
/// `is_unset` lets identity types with a "blank" value (empty string, nil
/// UUID) be rejected at submit time.
pub trait ParticipantId: Eq + Hash + Clone + Debug + Send + Sync + 'static {
    /// Whether this identity is the blank value of its type
    fn is_unset(&self) -> bool {
        false
    }
}

impl ParticipantId for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl ParticipantId for &'static str {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl ParticipantId for uuid::Uuid {
    fn is_unset(&self) -> bool {
        self.is_nil()
    }
}

// Numeric ids have no blank value
impl ParticipantId for u16 {}
impl ParticipantId for u32 {}
impl ParticipantId for u64 {}
impl ParticipantId for usize {}
impl ParticipantId for i32 {}
impl ParticipantId for i64 {}

/// Name of a preference axis shared by every participant of one engine
pub trait DimensionKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> DimensionKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// A value a participant may accept along some dimension
pub trait DimensionValue: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> DimensionValue for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identities_are_unset() {
        assert!(String::new().is_unset());
        assert!("".is_unset());
        assert!(uuid::Uuid::nil().is_unset());
    }

    #[test]
    fn test_regular_identities_are_set() {
        assert!(!"alice".to_string().is_unset());
        assert!(!"bob".is_unset());
        assert!(!uuid::Uuid::new_v4().is_unset());
        assert!(!0u64.is_unset());
    }
}
