//! Fault classification: which errors a strategy reacts to.
//!
//! Retry (`retry_on` / `abort_on`), circuit breakers (`fail_on` /
//! `skip_on`) and fallback (`apply_on` / `skip_on`) all decide whether a
//! given [`GuardError`] is "theirs" using the same machinery: two sets of
//! [`FaultMatcher`]s, with the skip set always taking priority, and an
//! optional second pass over the application error's source chain.

use std::any::TypeId;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::error::{FaultKind, GuardError};

type FaultPredicate<E> = Arc<dyn Fn(&GuardError<E>) -> bool + Send + Sync>;
type SourcePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Matches a subset of [`GuardError`] values.
pub struct FaultMatcher<E> {
    kind: MatcherKind<E>,
}

enum MatcherKind<E> {
    /// Matches every fault.
    Any,
    /// Matches faults of one [`FaultKind`].
    Kind(FaultKind),
    /// Matches faults satisfying a predicate.
    Predicate(FaultPredicate<E>),
    /// Matches application faults whose error is (or, in a cause-chain
    /// pass, contains) a specific concrete type.
    SourceType {
        type_name: &'static str,
        type_id: TypeId,
        shallow: SourcePredicate<E>,
        deep: SourcePredicate<E>,
    },
}

impl<E> Clone for FaultMatcher<E> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            MatcherKind::Any => MatcherKind::Any,
            MatcherKind::Kind(k) => MatcherKind::Kind(*k),
            MatcherKind::Predicate(p) => MatcherKind::Predicate(Arc::clone(p)),
            MatcherKind::SourceType {
                type_name,
                type_id,
                shallow,
                deep,
            } => MatcherKind::SourceType {
                type_name,
                type_id: *type_id,
                shallow: Arc::clone(shallow),
                deep: Arc::clone(deep),
            },
        };
        Self { kind }
    }
}

impl<E> std::fmt::Debug for FaultMatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MatcherKind::Any => f.write_str("FaultMatcher::any"),
            MatcherKind::Kind(k) => write!(f, "FaultMatcher::kind({:?})", k),
            MatcherKind::Predicate(_) => f.write_str("FaultMatcher::predicate"),
            MatcherKind::SourceType { type_name, .. } => {
                write!(f, "FaultMatcher::source_type({})", type_name)
            }
        }
    }
}

impl<E> FaultMatcher<E> {
    /// Matches every fault.
    pub fn any() -> Self {
        Self {
            kind: MatcherKind::Any,
        }
    }

    /// Matches faults of the given kind.
    pub fn kind(kind: FaultKind) -> Self {
        Self {
            kind: MatcherKind::Kind(kind),
        }
    }

    /// Matches faults satisfying the predicate.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&GuardError<E>) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: MatcherKind::Predicate(Arc::new(predicate)),
        }
    }

    /// Matches application faults whose error is of type `S`.
    ///
    /// During a cause-chain pass the matcher also inspects the error's
    /// [`source`](StdError::source) chain, nearest cause first.
    pub fn source_type<S>() -> Self
    where
        S: StdError + 'static,
        E: StdError + 'static,
    {
        let shallow: SourcePredicate<E> =
            Arc::new(|error: &E| (error as &(dyn StdError + 'static)).is::<S>());
        let deep: SourcePredicate<E> = Arc::new(|error: &E| {
            let mut current: Option<&(dyn StdError + 'static)> = Some(error);
            while let Some(e) = current {
                if e.is::<S>() {
                    return true;
                }
                current = e.source();
            }
            false
        });
        Self {
            kind: MatcherKind::SourceType {
                type_name: std::any::type_name::<S>(),
                type_id: TypeId::of::<S>(),
                shallow,
                deep,
            },
        }
    }

    /// The name of the matched shape, for diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            MatcherKind::Any => "any fault".to_string(),
            MatcherKind::Kind(k) => format!("{} faults", k),
            MatcherKind::Predicate(_) => "predicate-matched faults".to_string(),
            MatcherKind::SourceType { type_name, .. } => format!("errors of type {}", type_name),
        }
    }

    /// A key identifying type- and kind-based matchers, used to reject
    /// duplicate fallback handler registrations.
    pub fn identity(&self) -> Option<MatcherIdentity> {
        match &self.kind {
            MatcherKind::Kind(k) => Some(MatcherIdentity::Kind(*k)),
            MatcherKind::SourceType { type_id, .. } => Some(MatcherIdentity::SourceType(*type_id)),
            _ => None,
        }
    }

    /// Whether the matcher matches the fault itself.
    pub fn matches(&self, fault: &GuardError<E>) -> bool {
        match &self.kind {
            MatcherKind::Any => true,
            MatcherKind::Kind(k) => fault.kind() == *k,
            MatcherKind::Predicate(p) => p(fault),
            MatcherKind::SourceType { shallow, .. } => match fault {
                GuardError::Application(e) => shallow(e),
                _ => false,
            },
        }
    }

    /// Whether the matcher matches the fault or, for application faults,
    /// any error in the source chain.
    pub fn matches_with_causes(&self, fault: &GuardError<E>) -> bool {
        match &self.kind {
            MatcherKind::SourceType { deep, .. } => match fault {
                GuardError::Application(e) => deep(e),
                _ => false,
            },
            _ => self.matches(fault),
        }
    }
}

/// Stable identity of a kind- or type-based matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherIdentity {
    /// Matches one strategy fault kind.
    Kind(FaultKind),
    /// Matches one concrete application error type.
    SourceType(TypeId),
}

/// Two matcher sets deciding whether a fault "applies" to a strategy.
///
/// The skip set always beats the apply set. When cause-chain inspection is
/// enabled, a fault matched by neither set directly is re-examined against
/// the application error's source chain — skip over the whole chain still
/// beats apply over the whole chain. A fault matched by nothing does not
/// apply.
pub struct FaultClassifier<E> {
    apply_on: Vec<FaultMatcher<E>>,
    skip_on: Vec<FaultMatcher<E>>,
    inspect_cause_chain: bool,
}

impl<E> Clone for FaultClassifier<E> {
    fn clone(&self) -> Self {
        Self {
            apply_on: self.apply_on.clone(),
            skip_on: self.skip_on.clone(),
            inspect_cause_chain: self.inspect_cause_chain,
        }
    }
}

impl<E> std::fmt::Debug for FaultClassifier<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultClassifier")
            .field("apply_on", &self.apply_on)
            .field("skip_on", &self.skip_on)
            .field("inspect_cause_chain", &self.inspect_cause_chain)
            .finish()
    }
}

impl<E> FaultClassifier<E> {
    /// Creates a classifier from its matcher sets.
    pub fn new(
        apply_on: Vec<FaultMatcher<E>>,
        skip_on: Vec<FaultMatcher<E>>,
        inspect_cause_chain: bool,
    ) -> Self {
        Self {
            apply_on,
            skip_on,
            inspect_cause_chain,
        }
    }

    /// A classifier applying to every fault.
    pub fn apply_to_all() -> Self {
        Self::new(vec![FaultMatcher::any()], Vec::new(), false)
    }

    /// Whether the fault applies to the owning strategy.
    pub fn applies_to(&self, fault: &GuardError<E>) -> bool {
        if Self::matched_by(&self.skip_on, fault, false) {
            return false;
        }
        if Self::matched_by(&self.apply_on, fault, false) {
            return true;
        }
        if self.inspect_cause_chain {
            if Self::matched_by(&self.skip_on, fault, true) {
                return false;
            }
            if Self::matched_by(&self.apply_on, fault, true) {
                return true;
            }
        }
        false
    }

    fn matched_by(matchers: &[FaultMatcher<E>], fault: &GuardError<E>, with_causes: bool) -> bool {
        matchers.iter().any(|m| {
            if with_causes {
                m.matches_with_causes(fault)
            } else {
                m.matches(fault)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer {
        cause: Inner,
    }

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "inner")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.cause)
        }
    }

    impl StdError for Inner {}

    #[derive(Debug)]
    enum AppError {
        Wrapped(Outer),
        Flat,
    }

    impl fmt::Display for AppError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                AppError::Wrapped(_) => write!(f, "wrapped"),
                AppError::Flat => write!(f, "flat"),
            }
        }
    }

    impl StdError for AppError {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            match self {
                AppError::Wrapped(outer) => Some(outer),
                AppError::Flat => None,
            }
        }
    }

    fn wrapped() -> GuardError<AppError> {
        GuardError::Application(AppError::Wrapped(Outer { cause: Inner }))
    }

    #[test]
    fn kind_matcher_selects_strategy_faults() {
        let matcher: FaultMatcher<AppError> = FaultMatcher::kind(FaultKind::Timeout);
        assert!(matcher.matches(&GuardError::Timeout {
            description: "x".to_string()
        }));
        assert!(!matcher.matches(&GuardError::RateLimited));
        assert!(!matcher.matches(&wrapped()));
    }

    #[test]
    fn source_type_matcher_is_shallow_by_default() {
        let matcher: FaultMatcher<AppError> = FaultMatcher::source_type::<Inner>();
        assert!(!matcher.matches(&wrapped()));
        assert!(matcher.matches_with_causes(&wrapped()));

        let direct: FaultMatcher<AppError> = FaultMatcher::source_type::<AppError>();
        assert!(direct.matches(&wrapped()));
    }

    #[test]
    fn skip_beats_apply() {
        let classifier = FaultClassifier::new(
            vec![FaultMatcher::any()],
            vec![FaultMatcher::kind(FaultKind::Timeout)],
            false,
        );
        assert!(!classifier.applies_to(&GuardError::<AppError>::Timeout {
            description: "x".to_string()
        }));
        assert!(classifier.applies_to(&GuardError::<AppError>::RateLimited));
    }

    #[test]
    fn cause_chain_pass_is_opt_in() {
        let strict: FaultClassifier<AppError> = FaultClassifier::new(
            vec![FaultMatcher::source_type::<Inner>()],
            Vec::new(),
            false,
        );
        assert!(!strict.applies_to(&wrapped()));

        let deep: FaultClassifier<AppError> = FaultClassifier::new(
            vec![FaultMatcher::source_type::<Inner>()],
            Vec::new(),
            true,
        );
        assert!(deep.applies_to(&wrapped()));
    }

    #[test]
    fn skip_anywhere_in_chain_beats_apply_anywhere() {
        // Apply matches the outer cause, skip matches the inner one; the
        // skip set wins over the whole chain.
        let classifier: FaultClassifier<AppError> = FaultClassifier::new(
            vec![FaultMatcher::source_type::<Outer>()],
            vec![FaultMatcher::source_type::<Inner>()],
            true,
        );
        assert!(!classifier.applies_to(&wrapped()));
    }

    #[test]
    fn unmatched_fault_does_not_apply() {
        let classifier: FaultClassifier<AppError> = FaultClassifier::new(
            vec![FaultMatcher::kind(FaultKind::Timeout)],
            Vec::new(),
            true,
        );
        assert!(!classifier.applies_to(&GuardError::Application(AppError::Flat)));
    }
}
