//! Namespaces scope lower-case identifiers so independently written source
//! fragments can reuse names. Each compiler owns its own registry.

use std::collections::HashMap;

/// Scope separator in AWK source, e.g. `lib::counter`.
pub const SEPARATOR: &str = "::";

/// Name of the namespace every program starts in.
pub const DEFAULT_NAMESPACE: &str = "awk";

/// Namespace reserved for translator-provided variables and functions.
pub const AWKPY_NAMESPACE: &str = "awkpy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    /// Prefix of the emitted Python attribute, e.g. `self.lib__`.
    pub target_prefix: String,
    /// Prefix added to source identifiers before symbol lookup, e.g. `lib::`.
    pub decoration: String,
}

impl Namespace {
    fn new(name: &str) -> Self {
        if name == DEFAULT_NAMESPACE {
            Self {
                name: name.to_string(),
                target_prefix: "self.".to_string(),
                decoration: String::new(),
            }
        } else {
            Self {
                name: name.to_string(),
                target_prefix: format!("self.{}__", name),
                decoration: format!("{}{}", name, SEPARATOR),
            }
        }
    }

    /// Symbol-table key for `identifier` declared in this namespace.
    pub fn decorate(&self, identifier: &str) -> String {
        format!("{}{}", self.decoration, identifier)
    }

    pub fn is_default(&self) -> bool {
        self.decoration.is_empty()
    }
}

/// Interns namespaces by name and tracks the one currently active.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    spaces: Vec<Namespace>,
    by_name: HashMap<String, NamespaceId>,
    current: NamespaceId,
    default: NamespaceId,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            spaces: Vec::new(),
            by_name: HashMap::new(),
            current: NamespaceId(0),
            default: NamespaceId(0),
        };
        registry.get(AWKPY_NAMESPACE);
        registry.default = registry.get(DEFAULT_NAMESPACE);
        registry.current = registry.default;
        registry
    }

    /// Look up a namespace, creating it on first use.
    pub fn get(&mut self, name: &str) -> NamespaceId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = NamespaceId(self.spaces.len());
        self.spaces.push(Namespace::new(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.spaces[id.0]
    }

    pub fn current(&self) -> NamespaceId {
        self.current
    }

    pub fn default_namespace(&self) -> NamespaceId {
        self.default
    }

    /// Make `id` current, returning the namespace it replaced.
    pub fn set_current(&mut self, id: NamespaceId) -> NamespaceId {
        std::mem::replace(&mut self.current, id)
    }

    pub fn set_current_named(&mut self, name: &str) -> NamespaceId {
        let id = self.get(name);
        self.set_current(id)
    }

    /// Which namespace an identifier as written belongs to.
    pub fn find_namespace_for(&mut self, identifier: &str) -> NamespaceId {
        if let Some((scope, _)) = split_qualified(identifier) {
            return self.get(scope);
        }
        if is_all_upper(identifier) {
            return self.default;
        }
        self.current
    }

    /// Symbol-table key and namespace for an identifier, honouring explicit
    /// qualification and the upper-case rule.
    pub fn resolve(&mut self, identifier: &str) -> (String, NamespaceId) {
        match split_qualified(identifier) {
            Some((scope, name)) => {
                let id = if is_all_upper(name) {
                    self.default
                } else {
                    self.get(scope)
                };
                (self.namespace(id).decorate(name), id)
            }
            None => {
                let id = self.find_namespace_for(identifier);
                (self.namespace(id).decorate(identifier), id)
            }
        }
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `scope::name`; `None` unless both halves are valid identifiers.
pub fn split_qualified(text: &str) -> Option<(&str, &str)> {
    let (scope, name) = text.split_once(SEPARATOR)?;
    (is_identifier(scope) && is_identifier(name)).then_some((scope, name))
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// At least one letter and no lower-case letters, e.g. `NR`, `MY_VAR2`.
pub fn is_all_upper(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic()) && !text.chars().any(|c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace_is_undecorated() {
        let reg = NamespaceRegistry::new();
        let awk = reg.namespace(reg.default_namespace());
        assert_eq!(awk.name, "awk");
        assert_eq!(awk.target_prefix, "self.");
        assert_eq!(awk.decoration, "");
        assert!(awk.is_default());
        assert_eq!(reg.current(), reg.default_namespace());
    }

    #[test]
    fn test_named_namespace_prefixes() {
        let mut reg = NamespaceRegistry::new();
        let id = reg.get("smurf");
        let ns = reg.namespace(id);
        assert_eq!(ns.target_prefix, "self.smurf__");
        assert_eq!(ns.decoration, "smurf::");
        assert_eq!(ns.decorate("x"), "smurf::x");
    }

    #[test]
    fn test_same_name_same_namespace() {
        let mut reg = NamespaceRegistry::new();
        let a = reg.get("smurf");
        let b = reg.get("smurf");
        assert_eq!(a, b);
        assert_ne!(a, reg.get("other"));
    }

    #[test]
    fn test_set_current_returns_previous() {
        let mut reg = NamespaceRegistry::new();
        let awk = reg.default_namespace();
        let previous = reg.set_current_named("smurf");
        assert_eq!(previous, awk);
        let smurf = reg.get("smurf");
        assert_eq!(reg.current(), smurf);
        assert_eq!(reg.set_current(previous), smurf);
        assert_eq!(reg.current(), awk);
    }

    #[test]
    fn test_find_namespace_for() {
        let mut reg = NamespaceRegistry::new();
        reg.set_current_named("smurf");
        let smurf = reg.get("smurf");
        let lib = reg.get("lib");
        assert_eq!(reg.find_namespace_for("lib::x"), lib);
        assert_eq!(reg.find_namespace_for("NR"), reg.default_namespace());
        assert_eq!(reg.find_namespace_for("x"), smurf);
    }

    #[test]
    fn test_resolve_decorates() {
        let mut reg = NamespaceRegistry::new();
        assert_eq!(reg.resolve("x").0, "x");
        reg.set_current_named("smurf");
        assert_eq!(reg.resolve("x").0, "smurf::x");
        assert_eq!(reg.resolve("FS").0, "FS");
        assert_eq!(reg.resolve("awk::x").0, "x");
        assert_eq!(reg.resolve("lib::y").0, "lib::y");
        assert_eq!(reg.resolve("lib::MAX").0, "MAX");
    }

    #[test]
    fn test_malformed_qualified_names() {
        assert_eq!(split_qualified("a::b"), Some(("a", "b")));
        assert_eq!(split_qualified("a::"), None);
        assert_eq!(split_qualified("::b"), None);
        assert_eq!(split_qualified("1a::b"), None);
        assert_eq!(split_qualified("plain"), None);
    }

    #[test]
    fn test_all_upper() {
        assert!(is_all_upper("NR"));
        assert!(is_all_upper("MY_VAR2"));
        assert!(!is_all_upper("Nr"));
        assert!(!is_all_upper("__"));
    }
}
