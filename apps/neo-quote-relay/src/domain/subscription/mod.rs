//! Subscription Registry
//!
//! Domain types for the shared instrument subscription set.
//!
//! # Design
//!
//! All connected clients share one registry: a deduplicated set of
//! [`InstrumentKey`] values. Subscribe requests from any connection grow
//! the set, the poller reads it as a snapshot each cycle, and every client
//! receives quotes for the union of everything subscribed. There is no
//! per-client filtering.
//!
//! Unsubscribe handling is configurable. Some front-end builds send
//! unsubscribe messages they do not expect to take effect, so the registry
//! supports treating them as accepted-but-ignored alongside the default
//! removal behavior.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::domain::instrument::{InstrumentKey, SymbolParseError};

// =============================================================================
// Unsubscribe Policy
// =============================================================================

/// How the registry treats unsubscribe requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsubscribePolicy {
    /// Remove the named instruments from the registry.
    #[default]
    Remove,
    /// Accept the request but leave the registry untouched.
    Ignore,
}

impl UnsubscribePolicy {
    /// Parse a policy name, case-insensitively.
    ///
    /// Returns `None` for anything other than `remove` or `ignore` so the
    /// caller can reject a misconfigured value instead of guessing.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "remove" => Some(Self::Remove),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }

    /// Get the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Ignore => "ignore",
        }
    }
}

// =============================================================================
// Batch Outcome
// =============================================================================

/// Result of applying one subscribe or unsubscribe batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Keys inserted into (or removed from) the registry by this batch.
    pub changed: Vec<InstrumentKey>,
    /// Symbols dropped without touching the registry, with the reason.
    pub rejected: Vec<SymbolParseError>,
}

impl BatchOutcome {
    /// Check whether the batch had any effect or rejection at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.rejected.is_empty()
    }
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Deduplicated set of subscribed instruments, shared by every connection
/// and the poller.
///
/// A batch takes the write lock once, so two clients subscribing the same
/// symbol concurrently still end with exactly one entry and no torn state.
///
/// # Example
///
/// ```rust
/// use neo_quote_relay::domain::subscription::{SubscriptionRegistry, UnsubscribePolicy};
///
/// let registry = SubscriptionRegistry::new(UnsubscribePolicy::Remove);
///
/// let outcome = registry.subscribe(&["NSE|11536".to_string(), "bogus".to_string()]);
/// assert_eq!(outcome.changed.len(), 1);
/// assert_eq!(outcome.rejected.len(), 1);
/// assert_eq!(registry.len(), 1);
///
/// registry.unsubscribe(&["NSE|11536".to_string()]);
/// assert!(registry.is_empty());
/// ```
pub struct SubscriptionRegistry {
    policy: UnsubscribePolicy,
    instruments: RwLock<HashSet<InstrumentKey>>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(UnsubscribePolicy::default())
    }
}

impl SubscriptionRegistry {
    /// Create an empty registry with the given unsubscribe policy.
    #[must_use]
    pub fn new(policy: UnsubscribePolicy) -> Self {
        Self {
            policy,
            instruments: RwLock::new(HashSet::new()),
        }
    }

    /// Add every parseable symbol in the batch to the registry.
    ///
    /// Unparseable symbols are reported in the outcome and skipped; they
    /// never abort the rest of the batch. Symbols already present leave
    /// the registry unchanged and are not reported as changes.
    pub fn subscribe(&self, raw_symbols: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut instruments = self.instruments.write();

        for raw in raw_symbols {
            match InstrumentKey::parse(raw) {
                Ok(key) => {
                    if instruments.insert(key.clone()) {
                        outcome.changed.push(key);
                    }
                }
                Err(reason) => outcome.rejected.push(reason),
            }
        }

        outcome
    }

    /// Apply an unsubscribe batch according to the configured policy.
    ///
    /// Under [`UnsubscribePolicy::Ignore`] the request is accepted and
    /// dropped whole, without even parsing the symbols. Under
    /// [`UnsubscribePolicy::Remove`] each parseable symbol is removed if
    /// present; parse failures are reported and skipped as in subscribe.
    pub fn unsubscribe(&self, raw_symbols: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        if self.policy == UnsubscribePolicy::Ignore {
            return outcome;
        }

        let mut instruments = self.instruments.write();

        for raw in raw_symbols {
            match InstrumentKey::parse(raw) {
                Ok(key) => {
                    if instruments.remove(&key) {
                        outcome.changed.push(key);
                    }
                }
                Err(reason) => outcome.rejected.push(reason),
            }
        }

        outcome
    }

    /// Point-in-time copy of the registered instruments.
    ///
    /// The poller works from one snapshot per cycle; subscriptions that
    /// arrive mid-cycle take effect the following cycle.
    #[must_use]
    pub fn snapshot(&self) -> Vec<InstrumentKey> {
        self.instruments.read().iter().cloned().collect()
    }

    /// Number of registered instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.read().len()
    }

    /// Check whether no instruments are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.read().is_empty()
    }

    /// Check whether a specific instrument is registered.
    #[must_use]
    pub fn contains(&self, key: &InstrumentKey) -> bool {
        self.instruments.read().contains(key)
    }

    /// The unsubscribe policy this registry was built with.
    #[must_use]
    pub const fn policy(&self) -> UnsubscribePolicy {
        self.policy
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn subscribe_adds_distinct_valid_pairs() {
        let registry = SubscriptionRegistry::default();

        let outcome = registry.subscribe(&symbols(&["NSE|11536", "NFO|54321", "BSE|500325"]));

        assert_eq!(outcome.changed.len(), 3);
        assert!(outcome.rejected.is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn subscribe_dedupes_equal_pairs() {
        let registry = SubscriptionRegistry::default();

        // Same instrument spelled with both separators, twice over.
        let outcome = registry.subscribe(&symbols(&["NSE|11536", "NSE 11536", "NSE|11536"]));

        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::default();

        registry.subscribe(&symbols(&["NSE|11536"]));
        let second = registry.subscribe(&symbols(&["NSE|11536"]));

        assert!(second.changed.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn malformed_symbol_skipped_rest_of_batch_applies() {
        let registry = SubscriptionRegistry::default();

        let outcome = registry.subscribe(&symbols(&["garbage", "NSE|11536", "A|B|C"]));

        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_exchange_never_enters_registry() {
        let registry = SubscriptionRegistry::default();

        let outcome = registry.subscribe(&symbols(&["XYZ|1", "NSE|11536"]));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&InstrumentKey::parse("NSE|11536").unwrap()));
        assert_eq!(
            outcome.rejected,
            vec![SymbolParseError::UnknownExchange {
                exchange: "XYZ".to_string()
            }]
        );
    }

    #[test]
    fn registry_size_counts_distinct_valid_pairs_only() {
        let registry = SubscriptionRegistry::default();

        registry.subscribe(&symbols(&[
            "NSE|11536",
            "NSE 11536",
            "XYZ|1",
            "broken symbol here",
            "NFO|54321",
        ]));
        registry.subscribe(&symbols(&["NFO|54321", "BFO|9"]));

        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unsubscribe_removes_under_remove_policy() {
        let registry = SubscriptionRegistry::new(UnsubscribePolicy::Remove);

        registry.subscribe(&symbols(&["NSE|11536", "NFO|54321"]));
        let outcome = registry.unsubscribe(&symbols(&["NSE|11536"]));

        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&InstrumentKey::parse("NSE|11536").unwrap()));
    }

    #[test]
    fn unsubscribe_is_a_no_op_under_ignore_policy() {
        let registry = SubscriptionRegistry::new(UnsubscribePolicy::Ignore);

        registry.subscribe(&symbols(&["NSE|11536"]));
        let outcome = registry.unsubscribe(&symbols(&["NSE|11536", "garbage"]));

        assert!(outcome.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_unknown_symbol_changes_nothing() {
        let registry = SubscriptionRegistry::new(UnsubscribePolicy::Remove);

        registry.subscribe(&symbols(&["NSE|11536"]));
        let outcome = registry.unsubscribe(&symbols(&["NFO|54321"]));

        assert!(outcome.changed.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let registry = SubscriptionRegistry::default();

        registry.subscribe(&symbols(&["NSE|11536"]));
        let snapshot = registry.snapshot();

        registry.subscribe(&symbols(&["NFO|54321"]));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn batch_outcome_is_empty() {
        assert!(BatchOutcome::default().is_empty());

        let registry = SubscriptionRegistry::default();
        let outcome = registry.subscribe(&symbols(&["NSE|11536"]));
        assert!(!outcome.is_empty());
    }

    #[test]
    fn unsubscribe_policy_parsing() {
        assert_eq!(
            UnsubscribePolicy::from_str_case_insensitive("remove"),
            Some(UnsubscribePolicy::Remove)
        );
        assert_eq!(
            UnsubscribePolicy::from_str_case_insensitive("REMOVE"),
            Some(UnsubscribePolicy::Remove)
        );
        assert_eq!(
            UnsubscribePolicy::from_str_case_insensitive("Ignore"),
            Some(UnsubscribePolicy::Ignore)
        );
        assert_eq!(UnsubscribePolicy::from_str_case_insensitive("drop"), None);
    }

    #[test]
    fn unsubscribe_policy_as_str() {
        assert_eq!(UnsubscribePolicy::Remove.as_str(), "remove");
        assert_eq!(UnsubscribePolicy::Ignore.as_str(), "ignore");
    }

    #[test]
    fn thread_safety_concurrent_identical_subscribes() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::default());
        let mut handles = vec![];

        // Ten clients race to subscribe the same instrument.
        for _ in 0..10 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                r.subscribe(&["NSE|11536".to_string()]);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn thread_safety_concurrent_mixed_batches() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::default());
        let mut handles = vec![];

        for i in 0..10 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                r.subscribe(&[format!("NSE|{i}"), "BFO|9".to_string()]);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Ten distinct NSE tokens plus the shared BFO instrument.
        assert_eq!(registry.len(), 11);
    }
}
