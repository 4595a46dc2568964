//! Tag kinds and roles.
//!
//! A *kind* is a parser-defined category for a tag: function, struct, class,
//! macro, and so on. Each kind carries a single-letter shorthand for the
//! compact output formats and a long name for the extended ones. A *role*
//! describes a non-definition use of an identifier (imported, included,
//! referenced); role index 0 is always the definition itself and has no
//! `Role` record.
//!
//! Kinds are owned by the language catalog that declares them and shared
//! into tag entries via `Arc`, so corked copies of an entry stay cheap.

use std::sync::Arc;

/// Role index that marks a definition. Always valid for every kind.
pub const ROLE_DEFINITION: usize = 0;

/// A non-definition use of an identifier, owned by its parent [`Kind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

impl Role {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            enabled: true,
        }
    }
}

/// A category of tag (function, struct, macro, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kind {
    /// Single-letter shorthand used by the `k` field and kind specs.
    pub letter: char,
    /// Long name used by the `K` field and scope columns. Kinds without a
    /// long name render through their letter.
    pub name: Option<String>,
    pub description: String,
    pub enabled: bool,
    /// Kind that only ever appears on reference tags, never definitions.
    pub reference_only: bool,
    /// Roles reachable through role indices 1..; index 0 is the definition.
    pub roles: Vec<Role>,
}

impl Kind {
    pub fn new(letter: char, name: &str, description: &str) -> Self {
        Self {
            letter,
            name: Some(name.to_string()),
            description: description.to_string(),
            enabled: true,
            reference_only: false,
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    pub fn reference_only(mut self) -> Self {
        self.reference_only = true;
        self
    }

    /// Look up the role for a non-definition role index.
    ///
    /// Index 0 is the definition and has no record; indices 1.. map onto
    /// `roles` in declaration order.
    pub fn role(&self, role_index: usize) -> Option<&Role> {
        if role_index == ROLE_DEFINITION {
            None
        } else {
            self.roles.get(role_index - 1)
        }
    }

    /// Shared handle for storing into tag entries.
    pub fn shared(self) -> Arc<Kind> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_lookup() {
        let kind = Kind::new('h', "header", "included header files").with_roles(vec![
            Role::new("system", "system header"),
            Role::new("local", "local header"),
        ]);

        assert!(kind.role(ROLE_DEFINITION).is_none());
        assert_eq!(kind.role(1).unwrap().name, "system");
        assert_eq!(kind.role(2).unwrap().name, "local");
        assert!(kind.role(3).is_none());
    }

    #[test]
    fn test_kind_defaults() {
        let kind = Kind::new('f', "function", "function definitions");
        assert!(kind.enabled);
        assert!(!kind.reference_only);
        assert_eq!(kind.letter, 'f');
        assert_eq!(kind.name.as_deref(), Some("function"));
    }
}
