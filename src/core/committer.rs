use std::collections::HashSet;

use crate::core::error::{HandlerError, MatchError};
use crate::core::registry::Waiting;
use crate::models::{DimensionKey, DimensionValue, Group, MatchRule, ParticipantId};

/// Receives every committed group
///
/// Called synchronously from the cycle while the registry is locked, once
/// per group. The rule and group are private copies. Returning an error
/// aborts the rest of the cycle; groups committed before it stay committed.
///
/// A handler must not call back into the matcher that invoked it. `submit`,
/// `cancel` and `run_cycle` detect this and fail with `InvalidArgument`;
/// anything else waits on the lock the cycle already holds.
pub trait MatchHandler<P, K, V>: Send + Sync {
    fn on_match(&self, rule: MatchRule<K, V>, group: Group<P>) -> Result<(), HandlerError>;
}

impl<P, K, V, F> MatchHandler<P, K, V> for F
where
    P: ParticipantId,
    F: Fn(MatchRule<K, V>, Group<P>) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_match(&self, rule: MatchRule<K, V>, group: Group<P>) -> Result<(), HandlerError> {
        self(rule, group)
    }
}

/// Working sets a commit removes matched participants from
pub(crate) struct CommitTarget<'a, P, V: DimensionValue> {
    pub waiting: &'a mut Waiting<P, V>,
    pub pool: &'a mut HashSet<P>,
}

/// Verify and commit `groups` for `rule` in order
///
/// Each group is checked against what is still left of `eligible`, so a
/// group overlapping an earlier one fails the subset check. Members are
/// removed from the registry before the handler sees them.
pub(crate) fn commit_groups<P, K, V>(
    rule: &MatchRule<K, V>,
    groups: Vec<Group<P>>,
    eligible: &mut HashSet<P>,
    target: &mut CommitTarget<'_, P, V>,
    handler: &dyn MatchHandler<P, K, V>,
) -> Result<usize, MatchError>
where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
{
    let mut committed = 0;

    for group in groups {
        tracing::debug!("Committing group {:?} for {:?}", group, rule);

        if !group.iter().all(|member| eligible.contains(member)) {
            tracing::error!(
                "Group is not a subset of the eligible set: rule={:?}, group={:?}, eligible={:?}",
                rule,
                group,
                eligible
            );
            return Err(MatchError::violation(
                "group must be a subset of the eligible set",
            ));
        }

        if group.len() != rule.group_size {
            tracing::error!(
                "Group size {} does not match rule: rule={:?}, group={:?}",
                group.len(),
                rule,
                group
            );
            return Err(MatchError::violation(
                "group must have exactly the rule's group size",
            ));
        }

        for member in group.iter() {
            eligible.remove(member);
            target.pool.remove(member);
            target.waiting.remove(member);
        }

        if let Err(e) = handler.on_match(rule.clone(), group.clone()) {
            tracing::error!(
                "Match handler failed: rule={:?}, group={:?}, error={}",
                rule,
                group,
                e
            );
            return Err(MatchError::Handler(e));
        }

        committed += 1;
    }

    Ok(committed)
}
