use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::{ErrorPolicy, MatcherSettings};
use crate::core::committer::{commit_groups, CommitTarget, MatchHandler};
use crate::core::error::MatchError;
use crate::core::registry::Registry;
use crate::core::scheduler::Ticker;
use crate::core::search::{find_rule, Found};
use crate::core::selector::{GroupSelector, ShuffleChunkSelector};
use crate::models::{DimensionKey, DimensionValue, ParticipantId, PreferenceProfile};

/// Construction parameters for a [`Matcher`]
#[derive(Debug, Clone)]
pub struct EngineConfig<K> {
    /// Ordered, distinct dimension keys; may be empty
    pub dimensions: Vec<K>,
    /// Pause between the end of one cycle and the start of the next
    pub cycle_delay: Duration,
    /// What the scheduler does after a failed cycle
    pub on_error: ErrorPolicy,
    /// Seed for the search/selection generator; entropy when unset
    pub seed: Option<u64>,
}

impl<K> EngineConfig<K> {
    pub fn new(dimensions: Vec<K>, cycle_delay: Duration) -> Self {
        Self {
            dimensions,
            cycle_delay,
            on_error: ErrorPolicy::default(),
            seed: None,
        }
    }

    pub fn from_settings(dimensions: Vec<K>, settings: &MatcherSettings) -> Self {
        Self {
            dimensions,
            cycle_delay: Duration::from_millis(settings.cycle_delay_ms),
            on_error: settings.on_error,
            seed: settings.seed,
        }
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Outcome of one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub rules_found: usize,
    pub groups_formed: usize,
    pub participants_matched: usize,
    pub remaining: usize,
    pub elapsed: Duration,
}

/// State shared between the public handle and the scheduler task
pub(crate) struct Core<P, K, V: DimensionValue> {
    dimensions: Vec<K>,
    registry: Registry<P, V>,
    // Only touched while the registry lock is held
    rng: Mutex<ChaCha8Rng>,
    selector: Box<dyn GroupSelector<P, K, V>>,
    handler: Box<dyn MatchHandler<P, K, V>>,
}

impl<P, K, V> Core<P, K, V>
where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
{
    /// Scan, search, select and commit until no further rule matches
    pub(crate) fn run_cycle(&self) -> Result<CycleReport, MatchError> {
        self.ensure_not_reentrant("run_cycle")?;

        let started = Instant::now();
        let mut waiting = self.registry.lock();

        if waiting.is_empty() {
            return Ok(CycleReport {
                elapsed: started.elapsed(),
                ..CycleReport::default()
            });
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut pool: HashSet<P> = waiting.keys().cloned().collect();
        let mut exhausted = HashSet::new();
        let mut report = CycleReport::default();

        tracing::debug!("Cycle started: waiting={}", pool.len());

        while let Some(Found { rule, mut eligible }) =
            find_rule(&self.dimensions, &*waiting, &pool, &exhausted, &mut *rng)
        {
            tracing::debug!("Found rule {:?} with {} eligible", rule, eligible.len());

            exhausted.insert(rule.clone());
            report.rules_found += 1;

            let groups = self.selector.select(&rule, &eligible, &mut *rng);

            let mut target = CommitTarget {
                waiting: &mut *waiting,
                pool: &mut pool,
            };
            let committed = commit_groups(
                &rule,
                groups,
                &mut eligible,
                &mut target,
                self.handler.as_ref(),
            )?;

            report.groups_formed += committed;
            report.participants_matched += committed * rule.group_size;

            tracing::debug!("Unmatched for {:?}: {:?}", rule, eligible);
        }

        report.remaining = waiting.len();
        report.elapsed = started.elapsed();

        tracing::debug!(
            "Cycle finished: rules={}, groups={}, matched={}, remaining={}, elapsed={:?}",
            report.rules_found,
            report.groups_formed,
            report.participants_matched,
            report.remaining,
            report.elapsed
        );

        Ok(report)
    }

    /// Reject a call made from inside this engine's own cycle
    ///
    /// Only the cycle's thread is detected. A handler that hands the call to
    /// another thread and waits for it still deadlocks.
    fn ensure_not_reentrant(&self, operation: &str) -> Result<(), MatchError> {
        if self.registry.is_held_by_current_thread() {
            tracing::error!("{}() called from a match handler of the same matcher", operation);
            return Err(MatchError::invalid(format!(
                "{}() cannot be called from this matcher's match handler",
                operation
            )));
        }
        Ok(())
    }
}

/// Group-matching engine
///
/// Participants register a profile with [`Matcher::submit`] and wait. A
/// background ticker started by [`Matcher::start`] runs one cycle at a time,
/// `cycle_delay` after the previous one ended, and hands every group it
/// forms to the injected [`MatchHandler`].
///
/// A running cycle holds the registry lock for its full duration, so
/// `submit`/`cancel` block until it finishes. The handler runs inside that
/// lock: calling `submit`, `cancel` or `run_cycle` on the same matcher from
/// the handler fails with `InvalidArgument`, and the read accessors
/// (`waiting`, `is_waiting`, `profile`) must not be called from it at all.
pub struct Matcher<P, K, V: DimensionValue> {
    core: Arc<Core<P, K, V>>,
    cycle_delay: Duration,
    on_error: ErrorPolicy,
    ticker: Mutex<Option<Ticker>>,
}

impl<P, K, V> Matcher<P, K, V>
where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
{
    /// Create a matcher using the default shuffle-and-chunk selector
    ///
    /// # Errors
    /// `InvalidArgument` if `config.dimensions` repeats a key.
    pub fn new(
        config: EngineConfig<K>,
        handler: impl MatchHandler<P, K, V> + 'static,
    ) -> Result<Self, MatchError> {
        Self::with_selector(config, handler, ShuffleChunkSelector)
    }

    /// Create a matcher with a custom group selector
    pub fn with_selector(
        config: EngineConfig<K>,
        handler: impl MatchHandler<P, K, V> + 'static,
        selector: impl GroupSelector<P, K, V> + 'static,
    ) -> Result<Self, MatchError> {
        let mut distinct = HashSet::with_capacity(config.dimensions.len());
        if let Some(duplicate) = config.dimensions.iter().find(|key| !distinct.insert(*key)) {
            return Err(MatchError::invalid(format!(
                "duplicate dimension key: {:?}",
                duplicate
            )));
        }

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        tracing::info!(
            "Matcher created: dimensions={:?}, delay={:?}, on_error={:?}",
            config.dimensions,
            config.cycle_delay,
            config.on_error
        );

        Ok(Self {
            core: Arc::new(Core {
                dimensions: config.dimensions,
                registry: Registry::new(),
                rng: Mutex::new(rng),
                selector: Box::new(selector),
                handler: Box::new(handler),
            }),
            cycle_delay: config.cycle_delay,
            on_error: config.on_error,
            ticker: Mutex::new(None),
        })
    }

    /// Register a participant and start waiting for a match
    ///
    /// # Arguments
    /// * `participant` - Identity of the participant; must not be unset
    /// * `size_set` - Group sizes the participant accepts, each at least two
    /// * `values_by_dimension` - Accepted values for exactly the configured dimensions
    ///
    /// # Returns
    /// `Ok(true)` once the profile is stored, or `Ok(false)` without touching
    /// the stored profile if the participant is already waiting
    ///
    /// # Errors
    /// `InvalidArgument` if the participant is unset, the size set is empty or
    /// holds a size below two, the map's keys differ from the configured
    /// dimensions, or any value set is empty. Also `InvalidArgument` when
    /// called from this matcher's own match handler.
    pub fn submit(
        &self,
        participant: P,
        size_set: HashSet<usize>,
        values_by_dimension: HashMap<K, HashSet<V>>,
    ) -> Result<bool, MatchError> {
        tracing::debug!(
            "submit(): participant={:?}, size_set={:?}, values={:?}",
            participant,
            size_set,
            values_by_dimension
        );

        if participant.is_unset() {
            return Err(MatchError::invalid("participant cannot be unset"));
        }

        self.core.ensure_not_reentrant("submit")?;

        let profile = PreferenceProfile::new(&self.core.dimensions, size_set, values_by_dimension)?;
        Ok(self.core.registry.insert(participant, profile))
    }

    /// [`Matcher::submit`] for matchers configured without dimensions
    pub fn submit_sizes(&self, participant: P, size_set: HashSet<usize>) -> Result<bool, MatchError> {
        self.submit(participant, size_set, HashMap::new())
    }

    /// Stop waiting; returns `Ok(false)` if the participant was not waiting
    pub fn cancel(&self, participant: &P) -> Result<bool, MatchError> {
        tracing::debug!("cancel(): participant={:?}", participant);

        if participant.is_unset() {
            return Err(MatchError::invalid("participant cannot be unset"));
        }

        self.core.ensure_not_reentrant("cancel")?;

        Ok(self.core.registry.remove(participant))
    }

    /// Run one cycle on the calling thread
    ///
    /// This is what the ticker does on every tick. It serializes with the
    /// ticker through the registry lock.
    ///
    /// # Returns
    /// CycleReport with the rules found, groups formed and participants
    /// still waiting
    ///
    /// # Errors
    /// `InvariantViolation` if the selector breaks the group contract,
    /// `Handler` if the match handler fails, `InvalidArgument` when called
    /// from this matcher's own match handler.
    pub fn run_cycle(&self) -> Result<CycleReport, MatchError> {
        self.core.run_cycle()
    }

    /// Start the background ticker on the current tokio runtime
    ///
    /// # Errors
    /// `NoRuntime` outside a runtime, `AlreadyRunning` if a ticker is live.
    pub fn start(&self) -> Result<(), MatchError> {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);

        if ticker.as_ref().is_some_and(|live| !live.is_finished()) {
            return Err(MatchError::AlreadyRunning);
        }

        *ticker = Some(Ticker::spawn(
            Arc::clone(&self.core),
            self.cycle_delay,
            self.on_error,
        )?);

        tracing::info!("Matcher scheduler started: delay={:?}", self.cycle_delay);
        Ok(())
    }

    /// Stop the ticker, waiting for an in-flight cycle to finish
    pub async fn stop(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(ticker) = ticker {
            ticker.stop().await;
        }
    }

    /// Whether a ticker is live
    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|live| !live.is_finished())
    }

    /// Number of participants currently waiting
    pub fn waiting(&self) -> usize {
        self.core.registry.len()
    }

    pub fn is_waiting(&self, participant: &P) -> bool {
        self.core.registry.contains(participant)
    }

    /// Copy of a waiting participant's profile
    pub fn profile(&self, participant: &P) -> Option<PreferenceProfile<V>> {
        self.core.registry.get(participant)
    }

    pub fn dimensions(&self) -> &[K] {
        &self.core.dimensions
    }
}
