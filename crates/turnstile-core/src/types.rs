use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Typed identifiers — prevent stringly-typed confusion
// ---------------------------------------------------------------------------

macro_rules! define_name {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_name!(RoleName, "A principal identifier attempting an action.");
define_name!(
    ClassName,
    "The named class-like resource whose method is being protected."
);
define_name!(MethodName, "The named operation being authorized.");

impl MethodName {
    /// Property-read accessor under the `"get <name>"` convention.
    pub fn getter(property: &str) -> Self {
        Self(format!("get {property}"))
    }

    /// Property-write accessor under the `"set <name>"` convention.
    pub fn setter(property: &str) -> Self {
        Self(format!("set {property}"))
    }
}

// ---------------------------------------------------------------------------
// Roles — one role or an ordered sequence of roles
// ---------------------------------------------------------------------------

/// The role coordinate of an access request: a single role or an ordered
/// sequence of roles acting together.
///
/// An empty sequence is legal: it denies nothing and grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Roles {
    One(RoleName),
    Many(Vec<RoleName>),
}

impl Roles {
    pub fn iter(&self) -> impl Iterator<Item = &RoleName> {
        match self {
            Roles::One(role) => std::slice::from_ref(role).iter(),
            Roles::Many(roles) => roles.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Roles::One(_) => 1,
            Roles::Many(roles) => roles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RoleName> for Roles {
    fn from(role: RoleName) -> Self {
        Roles::One(role)
    }
}

impl From<&str> for Roles {
    fn from(role: &str) -> Self {
        Roles::One(RoleName::from(role))
    }
}

impl From<String> for Roles {
    fn from(role: String) -> Self {
        Roles::One(RoleName::from(role))
    }
}

impl From<Vec<RoleName>> for Roles {
    fn from(roles: Vec<RoleName>) -> Self {
        Roles::Many(roles)
    }
}

impl From<Vec<&str>> for Roles {
    fn from(roles: Vec<&str>) -> Self {
        Roles::Many(roles.into_iter().map(RoleName::from).collect())
    }
}

impl From<&[&str]> for Roles {
    fn from(roles: &[&str]) -> Self {
        Roles::Many(roles.iter().copied().map(RoleName::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_name_display() {
        let role = RoleName::new("Manager");
        assert_eq!(format!("{}", role), "Manager");
        assert_eq!(role.as_str(), "Manager");
    }

    #[test]
    fn test_name_from_conversions() {
        let a = ClassName::from("Foo");
        let b = ClassName::from("Foo".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_method_name_accessors() {
        assert_eq!(MethodName::getter("balance").as_str(), "get balance");
        assert_eq!(MethodName::setter("balance").as_str(), "set balance");
    }

    #[test]
    fn test_roles_one_iterates_once() {
        let roles = Roles::from("Teller");
        let collected: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        assert_eq!(collected, vec!["Teller"]);
        assert_eq!(roles.len(), 1);
        assert!(!roles.is_empty());
    }

    #[test]
    fn test_roles_many_preserves_order() {
        let roles = Roles::from(vec!["Teller", "Manager", "Auditor"]);
        let collected: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        assert_eq!(collected, vec!["Teller", "Manager", "Auditor"]);
    }

    #[test]
    fn test_roles_empty() {
        let roles = Roles::Many(Vec::new());
        assert!(roles.is_empty());
        assert_eq!(roles.iter().count(), 0);
    }

    #[test]
    fn test_roles_serde_untagged() {
        let one: Roles = serde_json::from_str("\"Teller\"").unwrap();
        assert_eq!(one, Roles::One(RoleName::new("Teller")));

        let many: Roles = serde_json::from_str("[\"Teller\", \"Manager\"]").unwrap();
        assert_eq!(many.len(), 2);
    }
}
