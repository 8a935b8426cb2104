//! Turnstile core vocabulary.
//!
//! Typed identifiers for the three coordinates of an access request (role,
//! class, method) plus the [`Roles`] one-or-many role set. Kept separate
//! from the policy engine so enforcement layers (interceptors, decorators,
//! service middlewares) can speak the same types without pulling in the
//! evaluation machinery.

pub mod types;

pub use types::*;
