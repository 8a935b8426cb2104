use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{PolicyError, PolicyResult};

// ---------------------------------------------------------------------------
// Strategy — the decision mechanism attached to a policy entry
// ---------------------------------------------------------------------------

/// A dynamic decision predicate: `(role, class, method, data) -> verdict`.
///
/// The `data` argument is the request's contextual payload, passed through
/// opaquely (`Value::Null` when the caller supplied none). Predicates are
/// invoked synchronously; a panic inside a predicate unwinds to the caller
/// unchanged.
pub type StrategyFn = Arc<dyn Fn(&str, &str, &str, &Value) -> bool + Send + Sync>;

/// The decision mechanism attached to a policy entry.
///
/// `Literal` verdicts are fixed at policy construction. `Predicate` carries
/// a caller-supplied function. `Reference` names a strategy to be looked up
/// in the controller's [`StrategyRegistry`] at evaluation time.
#[derive(Clone)]
pub enum Strategy {
    Literal(bool),
    Predicate(StrategyFn),
    Reference(String),
}

impl Strategy {
    /// Wrap a closure as a dynamic predicate strategy.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str, &str, &str, &Value) -> bool + Send + Sync + 'static,
    {
        Strategy::Predicate(Arc::new(predicate))
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Strategy::Predicate(_) => f.write_str("Predicate(<fn>)"),
            Strategy::Reference(reference) => {
                f.debug_tuple("Reference").field(reference).finish()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StrategyRegistry — reference resolution at evaluation time
// ---------------------------------------------------------------------------

/// A value a registry can yield for a strategy reference.
///
/// `Opaque` carries whatever non-decision value a host stored under the
/// reference; interrogation surfaces it as
/// [`PolicyError::StrategyNotCallable`] rather than guessing a verdict.
#[derive(Clone)]
pub enum ResolvedStrategy {
    Literal(bool),
    Predicate(StrategyFn),
    Opaque(Value),
}

impl fmt::Debug for ResolvedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedStrategy::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ResolvedStrategy::Predicate(_) => f.write_str("Predicate(<fn>)"),
            ResolvedStrategy::Opaque(value) => f.debug_tuple("Opaque").field(value).finish(),
        }
    }
}

/// Lookup of reference strategies by name.
///
/// Injected into the controller so the host decides how references resolve
/// (static map, plugin loader, remote catalog). Resolution happens on every
/// evaluation that reaches a `Reference` entry; registries that resolve
/// expensively should cache internally.
pub trait StrategyRegistry: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<ResolvedStrategy>;
}

/// Map-backed registry.
///
/// The standard registry for programmatic setup and tests. Registration
/// happens before the registry is handed to a controller; the map is
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct InMemoryStrategyRegistry {
    strategies: HashMap<String, ResolvedStrategy>,
}

impl InMemoryStrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_predicate<F>(&mut self, reference: impl Into<String>, predicate: F)
    where
        F: Fn(&str, &str, &str, &Value) -> bool + Send + Sync + 'static,
    {
        self.strategies
            .insert(reference.into(), ResolvedStrategy::Predicate(Arc::new(predicate)));
    }

    pub fn register_literal(&mut self, reference: impl Into<String>, value: bool) {
        self.strategies
            .insert(reference.into(), ResolvedStrategy::Literal(value));
    }

    pub fn register_opaque(&mut self, reference: impl Into<String>, value: Value) {
        self.strategies
            .insert(reference.into(), ResolvedStrategy::Opaque(value));
    }
}

impl StrategyRegistry for InMemoryStrategyRegistry {
    fn resolve(&self, reference: &str) -> Option<ResolvedStrategy> {
        self.strategies.get(reference).cloned()
    }
}

/// Resolve a reference strategy and produce its verdict for one
/// (role, class, method, data) coordinate.
///
/// A resolved boolean is a constant verdict; a resolved predicate is
/// invoked. An unresolvable reference is [`PolicyError::StrategyResolution`]
/// and a non-decision value is [`PolicyError::StrategyNotCallable`].
pub fn reference_verdict(
    registry: &dyn StrategyRegistry,
    reference: &str,
    role: &str,
    class: &str,
    method: &str,
    data: &Value,
) -> PolicyResult<bool> {
    match registry.resolve(reference) {
        None => Err(PolicyError::StrategyResolution {
            reference: reference.to_string(),
        }),
        Some(ResolvedStrategy::Literal(value)) => Ok(value),
        Some(ResolvedStrategy::Predicate(predicate)) => {
            Ok(predicate(role, class, method, data))
        }
        Some(ResolvedStrategy::Opaque(_)) => Err(PolicyError::StrategyNotCallable {
            reference: reference.to_string(),
        }),
    }
}
