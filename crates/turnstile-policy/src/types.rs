use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use turnstile_core::{ClassName, MethodName, RoleName, Roles};

use crate::error::{PolicyError, PolicyResult};
use crate::pattern::{AnchoredPattern, NameMatcher};
use crate::strategy::Strategy;

/// Maximum number of entries per policy (algorithmic DoS bound).
pub const MAX_ENTRIES_PER_POLICY: usize = 1024;

/// Maximum length for a single pattern string (algorithmic DoS bound).
pub const MAX_PATTERN_LENGTH: usize = 512;

/// Maximum accepted size of an external policy document.
pub const MAX_POLICY_BYTES: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// PolicyEntry — three matchers and a strategy
// ---------------------------------------------------------------------------

/// One policy entry: matchers over the role, class and method coordinates
/// plus the strategy interrogated when all three match.
///
/// Entries are immutable once part of a policy; the fields are private and
/// there are no mutators.
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    roles: Arc<dyn NameMatcher>,
    classes: Arc<dyn NameMatcher>,
    methods: Arc<dyn NameMatcher>,
    strategy: Strategy,
}

impl PolicyEntry {
    /// Build an entry from three anchored regex patterns.
    pub fn new(
        roles: &str,
        classes: &str,
        methods: &str,
        strategy: Strategy,
    ) -> PolicyResult<Self> {
        Ok(Self {
            roles: Arc::new(AnchoredPattern::compile(roles)?),
            classes: Arc::new(AnchoredPattern::compile(classes)?),
            methods: Arc::new(AnchoredPattern::compile(methods)?),
            strategy,
        })
    }

    /// Build an entry from substituted matcher implementations.
    pub fn with_matchers(
        roles: Arc<dyn NameMatcher>,
        classes: Arc<dyn NameMatcher>,
        methods: Arc<dyn NameMatcher>,
        strategy: Strategy,
    ) -> Self {
        Self {
            roles,
            classes,
            methods,
            strategy,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Whether all three matchers accept the request coordinates.
    pub fn applies_to(&self, role: &RoleName, class: &ClassName, method: &MethodName) -> bool {
        self.roles.matches(role.as_str())
            && self.classes.matches(class.as_str())
            && self.methods.matches(method.as_str())
    }
}

// ---------------------------------------------------------------------------
// SecurityPolicy — ordered entry list
// ---------------------------------------------------------------------------

/// An ordered sequence of policy entries. Order is interrogation order:
/// evaluation stops at the first decisive entry per mode.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    entries: Vec<PolicyEntry>,
}

static ALLOW_ALL: LazyLock<SecurityPolicy> = LazyLock::new(|| {
    let entry = PolicyEntry::new(".*", ".*", ".*", Strategy::Literal(true))
        .expect("allow-all patterns are valid");
    SecurityPolicy::new(vec![entry])
});

impl SecurityPolicy {
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// The shared allow-all policy: a single entry matching every role,
    /// class and method with a static grant. Built once per process.
    pub fn allow_all() -> Self {
        ALLOW_ALL.clone()
    }

    /// The entries whose matchers all accept the request coordinates, in
    /// policy order. An empty result is a valid outcome, not an error.
    pub fn matching_entries<'a>(
        &'a self,
        role: &'a RoleName,
        class: &'a ClassName,
        method: &'a MethodName,
    ) -> impl Iterator<Item = &'a PolicyEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.applies_to(role, class, method))
    }

    /// Compile an external policy representation, validating first.
    pub fn from_defs(defs: Vec<PolicyEntryDef>) -> PolicyResult<Self> {
        if let Err(errors) = validate_defs(&defs) {
            return Err(PolicyError::Validation(errors.join("; ")));
        }

        let mut entries = Vec::with_capacity(defs.len());
        for def in &defs {
            entries.push(PolicyEntry::new(
                &def.roles,
                &def.classes,
                &def.methods,
                Strategy::from(def.strategy.clone()),
            )?);
        }
        Ok(Self::new(entries))
    }

    /// Parse a JSON array of entry definitions.
    pub fn from_json(policy_data: &[u8]) -> PolicyResult<Self> {
        if policy_data.is_empty() {
            return Err(PolicyError::Load("policy data is empty".to_string()));
        }
        if policy_data.len() > MAX_POLICY_BYTES {
            return Err(PolicyError::Load(
                "policy data exceeds 10MB size limit".to_string(),
            ));
        }

        let json_str = std::str::from_utf8(policy_data)
            .map_err(|_| PolicyError::Load("policy data is not valid UTF-8".to_string()))?;

        let defs: Vec<PolicyEntryDef> = serde_json::from_str(json_str)
            .map_err(|e| PolicyError::Deserialization(format!("JSON parse error: {}", e)))?;

        Self::from_defs(defs)
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

// ---------------------------------------------------------------------------
// External representation — pattern strings and static/reference strategies
// ---------------------------------------------------------------------------

/// External form of a policy entry, as loaded from configuration.
///
/// Patterns are regex source strings, compiled to anchored matchers. A
/// strategy is a boolean (static verdict) or a string (registry reference);
/// predicate strategies have no external form and are attached
/// programmatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntryDef {
    pub roles: String,
    pub classes: String,
    pub methods: String,
    pub strategy: StrategyDef,
}

/// External form of a strategy: `true`/`false`, or a reference name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyDef {
    Literal(bool),
    Reference(String),
}

impl From<StrategyDef> for Strategy {
    fn from(def: StrategyDef) -> Self {
        match def {
            StrategyDef::Literal(value) => Strategy::Literal(value),
            StrategyDef::Reference(reference) => Strategy::Reference(reference),
        }
    }
}

/// Validate an external policy representation for structural integrity.
///
/// Checks:
/// - At most `MAX_ENTRIES_PER_POLICY` entries
/// - All three patterns non-empty and within `MAX_PATTERN_LENGTH`
/// - Reference strategies are non-empty strings
pub fn validate_defs(defs: &[PolicyEntryDef]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if defs.len() > MAX_ENTRIES_PER_POLICY {
        errors.push(format!(
            "policy has {} entries (maximum is {})",
            defs.len(),
            MAX_ENTRIES_PER_POLICY
        ));
    }

    for (index, def) in defs.iter().enumerate() {
        for (field, pattern) in [
            ("roles", &def.roles),
            ("classes", &def.classes),
            ("methods", &def.methods),
        ] {
            if pattern.is_empty() {
                errors.push(format!("entry {}: {} pattern must not be empty", index, field));
            } else if pattern.len() > MAX_PATTERN_LENGTH {
                errors.push(format!(
                    "entry {}: {} pattern exceeds {} bytes",
                    index, field, MAX_PATTERN_LENGTH
                ));
            }
        }

        if let StrategyDef::Reference(reference) = &def.strategy {
            if reference.is_empty() {
                errors.push(format!("entry {}: strategy reference must not be empty", index));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ---------------------------------------------------------------------------
// AccessRequest — per-call request descriptor
// ---------------------------------------------------------------------------

/// One access request: who (one or many roles) wants to invoke what method
/// on what class, with an opaque contextual payload for dynamic strategies.
///
/// Ephemeral: constructed per call and consumed by `permits`/`denies`.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub roles: Roles,
    pub class: ClassName,
    pub method: MethodName,
    pub data: Value,
}

impl AccessRequest {
    pub fn new(
        roles: impl Into<Roles>,
        class: impl Into<ClassName>,
        method: impl Into<MethodName>,
    ) -> Self {
        Self {
            roles: roles.into(),
            class: class.into(),
            method: method.into(),
            data: Value::Null,
        }
    }

    /// Attach a contextual payload passed opaquely to dynamic strategies.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn make_def(roles: &str, classes: &str, methods: &str, strategy: StrategyDef) -> PolicyEntryDef {
        PolicyEntryDef {
            roles: roles.to_string(),
            classes: classes.to_string(),
            methods: methods.to_string(),
            strategy,
        }
    }

    #[test]
    fn test_entry_applies_to_all_three_coordinates() {
        let entry =
            PolicyEntry::new("Teller", "Foo", "bar", Strategy::Literal(true)).unwrap();
        assert!(entry.applies_to(
            &RoleName::new("Teller"),
            &ClassName::new("Foo"),
            &MethodName::new("bar")
        ));
        assert!(!entry.applies_to(
            &RoleName::new("Teller"),
            &ClassName::new("Foo"),
            &MethodName::new("baz")
        ));
        assert!(!entry.applies_to(
            &RoleName::new("Manager"),
            &ClassName::new("Foo"),
            &MethodName::new("bar")
        ));
    }

    #[test]
    fn test_entry_rejects_invalid_pattern() {
        let result = PolicyEntry::new("Teller", "(", "bar", Strategy::Literal(true));
        assert!(matches!(
            result.unwrap_err(),
            PolicyError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_matching_entries_preserve_policy_order() {
        let policy = SecurityPolicy::new(vec![
            PolicyEntry::new("Teller", "Foo", "bar", Strategy::Literal(true)).unwrap(),
            PolicyEntry::new("Manager", ".*", ".*", Strategy::Literal(true)).unwrap(),
            PolicyEntry::new(".*", "Foo", "bar", Strategy::Literal(false)).unwrap(),
        ]);
        let role = RoleName::new("Teller");
        let class = ClassName::new("Foo");
        let method = MethodName::new("bar");

        let matched: Vec<_> = policy.matching_entries(&role, &class, &method).collect();
        // Entries 0 and 2 match the Teller request, in policy order.
        assert_eq!(matched.len(), 2);
        assert!(matches!(matched[0].strategy(), Strategy::Literal(true)));
        assert!(matches!(matched[1].strategy(), Strategy::Literal(false)));
    }

    #[test]
    fn test_matching_entries_empty_is_not_an_error() {
        let policy = SecurityPolicy::new(vec![PolicyEntry::new(
            "Manager",
            ".*",
            ".*",
            Strategy::Literal(true),
        )
        .unwrap()]);
        let role = RoleName::new("Cowboy");
        let class = ClassName::new("Foo");
        let method = MethodName::new("bar");
        assert_eq!(policy.matching_entries(&role, &class, &method).count(), 0);
    }

    #[test]
    fn test_allow_all_policy_shape() {
        let policy = SecurityPolicy::allow_all();
        assert_eq!(policy.entries().len(), 1);
        let role = RoleName::new("anything");
        let class = ClassName::new("Any");
        let method = MethodName::new("any");
        assert_eq!(policy.matching_entries(&role, &class, &method).count(), 1);
    }

    #[test]
    fn test_default_is_allow_all() {
        let policy = SecurityPolicy::default();
        assert_eq!(policy.entries().len(), 1);
    }

    #[test]
    fn test_custom_matcher_substitution() {
        // A case-insensitive exact matcher standing in for the regex one.
        #[derive(Debug)]
        struct CaseInsensitive(String);

        impl NameMatcher for CaseInsensitive {
            fn matches(&self, name: &str) -> bool {
                self.0.eq_ignore_ascii_case(name)
            }
        }

        let entry = PolicyEntry::with_matchers(
            Arc::new(CaseInsensitive("manager".to_string())),
            Arc::new(AnchoredPattern::compile(".*").unwrap()),
            Arc::new(AnchoredPattern::compile(".*").unwrap()),
            Strategy::Literal(true),
        );
        assert!(entry.applies_to(
            &RoleName::new("MANAGER"),
            &ClassName::new("Foo"),
            &MethodName::new("bar")
        ));
        assert!(!entry.applies_to(
            &RoleName::new("Teller"),
            &ClassName::new("Foo"),
            &MethodName::new("bar")
        ));
    }

    #[test]
    fn test_from_defs_compiles_entries() {
        let policy = SecurityPolicy::from_defs(vec![
            make_def("Teller", "Foo", "bar", StrategyDef::Literal(true)),
            make_def("Manager", ".*", ".*", StrategyDef::Reference("acl::x".into())),
        ])
        .unwrap();
        assert_eq!(policy.entries().len(), 2);
        assert!(matches!(
            policy.entries()[1].strategy(),
            Strategy::Reference(r) if r == "acl::x"
        ));
    }

    #[test]
    fn test_validate_defs_rejects_empty_pattern() {
        let defs = vec![make_def("", "Foo", "bar", StrategyDef::Literal(true))];
        let errors = validate_defs(&defs).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("roles pattern")));
    }

    #[test]
    fn test_validate_defs_rejects_overlong_pattern() {
        let long = "x".repeat(MAX_PATTERN_LENGTH + 1);
        let defs = vec![make_def("Teller", &long, "bar", StrategyDef::Literal(true))];
        let errors = validate_defs(&defs).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("classes pattern")));
    }

    #[test]
    fn test_validate_defs_rejects_too_many_entries() {
        let defs: Vec<_> = (0..=MAX_ENTRIES_PER_POLICY)
            .map(|_| make_def(".*", ".*", ".*", StrategyDef::Literal(true)))
            .collect();
        let errors = validate_defs(&defs).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("maximum")));
    }

    #[test]
    fn test_validate_defs_rejects_empty_reference() {
        let defs = vec![make_def(".*", ".*", ".*", StrategyDef::Reference(String::new()))];
        let errors = validate_defs(&defs).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("strategy reference")));
    }

    #[test]
    fn test_from_defs_surfaces_validation_error() {
        let result =
            SecurityPolicy::from_defs(vec![make_def("", "Foo", "bar", StrategyDef::Literal(true))]);
        assert!(matches!(result.unwrap_err(), PolicyError::Validation(_)));
    }

    #[test]
    fn test_from_json_valid_document() {
        let json = br#"[
            {"roles": "Teller|Manager", "classes": "Account", "methods": "withdraw", "strategy": true},
            {"roles": "Intern", "classes": ".*", "methods": "set .*", "strategy": false},
            {"roles": "Auditor", "classes": ".*", "methods": "get .*", "strategy": "acl::audit_window"}
        ]"#;
        let policy = SecurityPolicy::from_json(json).unwrap();
        assert_eq!(policy.entries().len(), 3);
    }

    #[test]
    fn test_from_json_empty_input() {
        let result = SecurityPolicy::from_json(&[]);
        assert!(matches!(result.unwrap_err(), PolicyError::Load(_)));
    }

    #[test]
    fn test_from_json_invalid_utf8() {
        let result = SecurityPolicy::from_json(&[0xFF, 0xFE]);
        assert!(matches!(result.unwrap_err(), PolicyError::Load(_)));
    }

    #[test]
    fn test_from_json_malformed_json() {
        let result = SecurityPolicy::from_json(b"not json");
        assert!(matches!(
            result.unwrap_err(),
            PolicyError::Deserialization(_)
        ));
    }

    #[test]
    fn test_strategy_def_untagged_serde() {
        let defs: Vec<StrategyDef> =
            serde_json::from_str(r#"[true, false, "acl::weekdays"]"#).unwrap();
        assert_eq!(
            defs,
            vec![
                StrategyDef::Literal(true),
                StrategyDef::Literal(false),
                StrategyDef::Reference("acl::weekdays".to_string()),
            ]
        );
    }

    #[test]
    fn test_access_request_defaults_to_null_data() {
        let request = AccessRequest::new("Teller", "Foo", "bar");
        assert_eq!(request.data, Value::Null);
        assert_eq!(request.roles.len(), 1);
    }

    #[test]
    fn test_access_request_with_data() {
        let request =
            AccessRequest::new(vec!["Teller", "Manager"], "Account", "withdraw")
                .with_data(json!({"dayOfMonth": 2}));
        assert_eq!(request.data["dayOfMonth"], 2);
        assert_eq!(request.roles.len(), 2);
    }
}
