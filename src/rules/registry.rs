//! The rule registry: maps `(rule_code, rule_set?)` to an implementation
//! function, built fresh per [`crate::rules::engine::Validator`] (§4.G,
//! §9 — deliberately not a process-wide `static`).

use std::collections::BTreeMap;
use std::collections::HashMap;

use super::context::ValidationContext;
use super::finding::RuleSet;

/// A rule implementation's raw output: zero or more `(location, context_dict)`
/// pairs. The engine renders each into a [`super::finding::Finding`] using the
/// catalog's message template for the rule's code.
pub type RuleOutput = Vec<(Option<String>, BTreeMap<String, String>)>;

/// A rule implementation function.
pub type RuleFn = fn(&ValidationContext<'_>) -> RuleOutput;

/// The `(code, rule_set?)` → implementation table.
///
/// `rule_set = None` means "the same implementation runs for both formats";
/// a `Some(format)` entry takes priority over a `None` entry for the same
/// code when both are registered (format-specific overrides generic).
#[derive(Default)]
pub struct RuleRegistry {
    table: HashMap<(String, Option<RuleSet>), RuleFn>,
}

impl RuleRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an implementation for `code`, optionally scoped to one
    /// `rule_set`. Re-registering the same `(code, rule_set)` pair is a
    /// logic error in this codebase (a duplicate registration at startup,
    /// matching the source's duplicate-decorator failure) — it is asserted,
    /// not silently overwritten.
    ///
    /// # Panics
    ///
    /// Panics if `(code, rule_set)` was already registered.
    pub fn register(&mut self, code: &str, rule_set: Option<RuleSet>, f: RuleFn) {
        let key = (code.to_string(), rule_set);
        assert!(
            self.table.insert(key, f).is_none(),
            "duplicate rule registration for {code} ({rule_set:?})"
        );
    }

    /// Looks up the implementation for `code` under `rule_set`, falling back
    /// to the format-agnostic registration when no format-specific one exists.
    #[must_use]
    pub fn lookup(&self, code: &str, rule_set: RuleSet) -> Option<RuleFn> {
        self.table
            .get(&(code.to_string(), Some(rule_set)))
            .or_else(|| self.table.get(&(code.to_string(), None)))
            .copied()
    }

    /// Builds the registry with every built-in rule implementation registered,
    /// in catalog order, via an explicit call sequence (§9).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::rules::xml::wellformedness::register(&mut registry);
        crate::rules::xml::root_element::register(&mut registry);
        crate::rules::xml::schema_ref::register(&mut registry);
        crate::rules::xml::filing_indicators::register(&mut registry);
        crate::rules::xml::context::register(&mut registry);
        crate::rules::xml::facts::register(&mut registry);
        crate::rules::xml::units::register(&mut registry);
        crate::rules::xml::document::register(&mut registry);
        crate::rules::xml::taxonomy::register(&mut registry);
        crate::rules::eba::currency::register(&mut registry);
        crate::rules::eba::decimals::register(&mut registry);
        crate::rules::eba::entity::register(&mut registry);
        crate::rules::eba::units::register(&mut registry);
        crate::rules::eba::guidance::register(&mut registry);
        crate::rules::eba::additional::register(&mut registry);
        crate::rules::eba::naming::register(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &ValidationContext<'_>) -> RuleOutput {
        Vec::new()
    }

    #[test]
    fn format_specific_registration_overrides_generic() {
        let mut registry = RuleRegistry::new();
        registry.register("X-1", None, noop);
        registry.register("X-1", Some(RuleSet::Xml), noop);
        assert!(registry.lookup("X-1", RuleSet::Xml).is_some());
        assert!(registry.lookup("X-1", RuleSet::Csv).is_some());
    }

    #[test]
    #[should_panic(expected = "duplicate rule registration")]
    fn duplicate_registration_panics() {
        let mut registry = RuleRegistry::new();
        registry.register("X-1", None, noop);
        registry.register("X-1", None, noop);
    }

    #[test]
    fn with_defaults_registers_every_catalog_rule() {
        let registry = RuleRegistry::with_defaults();
        let catalog = crate::rules::catalog::RuleCatalog::embedded();
        for def in &catalog.definitions {
            let rule_set = if def.xml { RuleSet::Xml } else { RuleSet::Csv };
            assert!(
                registry.lookup(&def.code, rule_set).is_some(),
                "no implementation registered for {}",
                def.code
            );
        }
    }
}
