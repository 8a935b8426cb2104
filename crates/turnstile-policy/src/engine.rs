use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use turnstile_core::{ClassName, MethodName, RoleName};

use crate::error::PolicyResult;
use crate::strategy::{reference_verdict, InMemoryStrategyRegistry, Strategy, StrategyRegistry};
use crate::types::{AccessRequest, SecurityPolicy};

// ---------------------------------------------------------------------------
// Controller — the decision engine
// ---------------------------------------------------------------------------

/// Method-level access-control decision engine.
///
/// Owns an immutable [`SecurityPolicy`] and a [`StrategyRegistry`] for
/// resolving reference strategies at evaluation time. Evaluation is
/// synchronous and lock-free; a controller is safe to share across threads
/// as long as the supplied predicates are.
///
/// The controller only computes decisions. Enforcement (raising, blocking)
/// belongs to the caller.
pub struct Controller {
    policy: SecurityPolicy,
    registry: Arc<dyn StrategyRegistry>,
}

impl Controller {
    /// Controller over the shared allow-all default policy.
    pub fn new() -> Self {
        Self::with_policy(SecurityPolicy::allow_all())
    }

    /// Controller over a custom policy, with an empty registry: any
    /// reference strategy the policy reaches will fail to resolve.
    pub fn with_policy(policy: SecurityPolicy) -> Self {
        Self::with_registry(policy, Arc::new(InMemoryStrategyRegistry::new()))
    }

    /// Controller over a custom policy and an injected registry.
    pub fn with_registry(policy: SecurityPolicy, registry: Arc<dyn StrategyRegistry>) -> Self {
        Self { policy, registry }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Whether the request is granted.
    ///
    /// Deny overrides grant: `denies` is computed first and any explicit
    /// deny on any role refuses the whole request. Otherwise the request is
    /// granted iff at least one role reaches a decisive permitting entry.
    /// An empty role sequence is never granted.
    pub fn permits(&self, request: &AccessRequest) -> PolicyResult<bool> {
        if self.denies(request)? {
            debug!(
                class = %request.class,
                method = %request.method,
                "permit refused: explicit deny matched"
            );
            return Ok(false);
        }

        for role in request.roles.iter() {
            if self.interrogate(role, &request.class, &request.method, &request.data, true)? {
                debug!(
                    role = %role,
                    class = %request.class,
                    method = %request.method,
                    "permit granted"
                );
                return Ok(true);
            }
        }

        debug!(
            class = %request.class,
            method = %request.method,
            "permit refused: no decisive grant"
        );
        Ok(false)
    }

    /// Whether any role in the request is explicitly denied.
    ///
    /// Logical OR across roles; an empty role sequence denies nothing.
    pub fn denies(&self, request: &AccessRequest) -> PolicyResult<bool> {
        for role in request.roles.iter() {
            if self.interrogate(role, &request.class, &request.method, &request.data, false)? {
                debug!(
                    role = %role,
                    class = %request.class,
                    method = %request.method,
                    "explicit deny matched"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Former name of [`Controller::permits`]; identical behavior.
    #[deprecated(note = "renamed to `permits`")]
    pub fn grants(&self, request: &AccessRequest) -> PolicyResult<bool> {
        self.permits(request)
    }

    /// Interrogate the matching entries for one role, in policy order.
    ///
    /// One loop serves both modes, parameterized by `want_permit`:
    /// - A literal strategy is decisive only when it equals `want_permit`;
    ///   the opposite literal is skipped.
    /// - A dynamic strategy's verdict is decisive for permit only on `true`.
    ///   In deny mode a `false` verdict terminates interrogation with
    ///   `Ok(false)` and a `true` verdict is skipped.
    /// - No decisive entry: `Ok(false)` in both modes (default deny).
    ///
    /// Resolution failures propagate; predicate panics are not caught.
    fn interrogate(
        &self,
        role: &RoleName,
        class: &ClassName,
        method: &MethodName,
        data: &Value,
        want_permit: bool,
    ) -> PolicyResult<bool> {
        for entry in self.policy.matching_entries(role, class, method) {
            let verdict = match entry.strategy() {
                Strategy::Literal(value) => {
                    if *value == want_permit {
                        return Ok(true);
                    }
                    continue;
                }
                Strategy::Predicate(predicate) => {
                    predicate(role.as_str(), class.as_str(), method.as_str(), data)
                }
                Strategy::Reference(reference) => reference_verdict(
                    self.registry.as_ref(),
                    reference,
                    role.as_str(),
                    class.as_str(),
                    method.as_str(),
                    data,
                )?,
            };

            trace!(role = %role, want_permit, verdict, "dynamic strategy interrogated");
            if want_permit && verdict {
                return Ok(true);
            }
            if !want_permit && !verdict {
                return Ok(false);
            }
        }
        Ok(false)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
