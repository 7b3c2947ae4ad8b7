//! Fallback handler registration and resolution.

use std::collections::HashSet;

use faultguard_core::classifier::{FaultMatcher, MatcherIdentity};
use faultguard_core::{DefinitionError, GuardError};

/// The registered handlers of one fallback strategy, generic over the
/// handler shape (synchronous or future-producing).
///
/// Typed candidates are consulted in registration order and the first
/// match wins, which keeps resolution deterministic: the same fault shape
/// always selects the same handler. Registering two candidates for the
/// same error type or fault kind is rejected at build time. The untyped
/// catch-all, if present, handles whatever no typed candidate matched.
pub struct FallbackCandidates<E, H> {
    typed: Vec<(FaultMatcher<E>, H)>,
    catch_all: Option<H>,
    identities: HashSet<MatcherIdentity>,
}

impl<E, H> FallbackCandidates<E, H> {
    pub(crate) fn new() -> Self {
        Self {
            typed: Vec::new(),
            catch_all: None,
            identities: HashSet::new(),
        }
    }

    /// Registers a typed candidate. Kind- and type-based matchers must be
    /// unique; predicate matchers may repeat (they have no identity).
    pub(crate) fn add_typed(
        &mut self,
        matcher: FaultMatcher<E>,
        handler: H,
    ) -> Result<(), DefinitionError> {
        if let Some(identity) = matcher.identity() {
            if !self.identities.insert(identity) {
                return Err(DefinitionError::DuplicateFallbackHandler(
                    matcher.describe(),
                ));
            }
        }
        self.typed.push((matcher, handler));
        Ok(())
    }

    /// Registers the catch-all candidate.
    pub(crate) fn set_catch_all(&mut self, handler: H) -> Result<(), DefinitionError> {
        if self.catch_all.is_some() {
            return Err(DefinitionError::DuplicateFallbackHandler(
                "any fault".to_string(),
            ));
        }
        self.catch_all = Some(handler);
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.typed.is_empty() && self.catch_all.is_none()
    }

    /// Picks the handler for the fault: first matching typed candidate in
    /// registration order, then the catch-all, then nothing.
    pub(crate) fn resolve(
        &self,
        fault: &GuardError<E>,
        inspect_cause_chain: bool,
    ) -> Option<&H> {
        for (matcher, handler) in &self.typed {
            let matched = if inspect_cause_chain {
                matcher.matches(fault) || matcher.matches_with_causes(fault)
            } else {
                matcher.matches(fault)
            };
            if matched {
                return Some(handler);
            }
        }
        self.catch_all.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultguard_core::FaultKind;

    fn timeout() -> GuardError<&'static str> {
        GuardError::Timeout {
            description: "x".to_string(),
        }
    }

    #[test]
    fn first_matching_candidate_wins() {
        let mut candidates: FallbackCandidates<&'static str, u32> = FallbackCandidates::new();
        candidates
            .add_typed(FaultMatcher::kind(FaultKind::Timeout), 1)
            .unwrap();
        candidates
            .add_typed(FaultMatcher::predicate(|f| f.is_timeout()), 2)
            .unwrap();

        assert_eq!(candidates.resolve(&timeout(), false), Some(&1));
    }

    #[test]
    fn catch_all_handles_unmatched_faults() {
        let mut candidates: FallbackCandidates<&'static str, u32> = FallbackCandidates::new();
        candidates
            .add_typed(FaultMatcher::kind(FaultKind::Timeout), 1)
            .unwrap();
        candidates.set_catch_all(9).unwrap();

        assert_eq!(
            candidates.resolve(&GuardError::RateLimited, false),
            Some(&9)
        );
    }

    #[test]
    fn no_candidate_means_no_handler() {
        let mut candidates: FallbackCandidates<&'static str, u32> = FallbackCandidates::new();
        candidates
            .add_typed(FaultMatcher::kind(FaultKind::Timeout), 1)
            .unwrap();

        assert_eq!(candidates.resolve(&GuardError::RateLimited, false), None);
    }

    #[test]
    fn duplicate_kind_registration_is_rejected() {
        let mut candidates: FallbackCandidates<&'static str, u32> = FallbackCandidates::new();
        candidates
            .add_typed(FaultMatcher::kind(FaultKind::Timeout), 1)
            .unwrap();
        assert!(matches!(
            candidates.add_typed(FaultMatcher::kind(FaultKind::Timeout), 2),
            Err(DefinitionError::DuplicateFallbackHandler(_))
        ));
    }

    #[test]
    fn duplicate_catch_all_is_rejected() {
        let mut candidates: FallbackCandidates<&'static str, u32> = FallbackCandidates::new();
        candidates.set_catch_all(1).unwrap();
        assert!(candidates.set_catch_all(2).is_err());
    }
}
