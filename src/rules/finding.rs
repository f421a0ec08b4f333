//! Finding types emitted by rule implementations.

use std::fmt;

/// Severity of a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational only — includes synthetic findings the engine emits
    /// when a rule implementation itself panics.
    Info,
    /// A warning: the document is still usable.
    Warning,
    /// An error: the document fails validation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Which artefact a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSet {
    /// An XBRL-XML instance document.
    Xml,
    /// An XBRL-CSV package.
    Csv,
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xml => "xml",
            Self::Csv => "csv",
        })
    }
}

/// A single rendered finding produced by the validation engine.
#[derive(Debug, Clone)]
pub struct Finding {
    /// The rule code that produced this finding (e.g. `"XML-030"`).
    pub rule_code: String,
    /// The finding's rendered message.
    pub message: String,
    /// The finding's severity.
    pub severity: Severity,
    /// A human-readable location hint (e.g. a context id or fact QName),
    /// when the rule implementation provided one.
    pub location: Option<String>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {} ({location}): {}", self.severity, self.rule_code, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.rule_code, self.message),
        }
    }
}

/// A collection of findings, with convenience predicates used by callers
/// deciding whether validation passed.
#[derive(Debug, Clone, Default)]
pub struct FindingCollection {
    /// Findings in rule-execution order.
    pub findings: Vec<Finding>,
}

impl FindingCollection {
    /// True iff no finding has [`Severity::Error`].
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Returns every finding at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity >= severity)
    }
}
