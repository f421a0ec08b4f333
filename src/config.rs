//! Configuration for xbridge-rs operations.
//!
//! This module provides [`Config`], a single configuration struct controlling
//! filing-indicator strictness and validation mode, plus named presets for the
//! two operating modes the CLI exposes.

/// Main configuration for conversion and validation operations.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether an orphaned fact (reported by no `true` filing indicator) fails
    /// the conversion (`true`) or is only reported as a warning (`false`).
    pub strict_filing_indicators: bool,

    /// Whether to use the `headers` architecture for tables that support both,
    /// instead of the default `datapoints` enumeration.
    pub headers_as_datapoints: bool,

    /// Whether the validator should include `eba`-flagged rules.
    pub eba_mode: bool,

    /// Whether the validator should only run rules flagged `post_conversion`
    /// when validating a CSV package (i.e. skip pre-conversion-only checks).
    pub post_conversion: bool,

    /// Verbosity level for diagnostics and logging.
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_filing_indicators: true,
            headers_as_datapoints: false,
            eba_mode: false,
            post_conversion: false,
            verbosity: Verbosity::Warn,
        }
    }
}

impl Config {
    /// Creates a new configuration with default (strict) settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A preset for strict conversion: orphaned facts are fatal.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// A preset for permissive conversion: orphaned facts are warnings.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            strict_filing_indicators: false,
            ..Self::default()
        }
    }

    /// A preset for full EBA-mode, post-conversion CSV-package validation.
    #[must_use]
    pub fn eba_post_conversion() -> Self {
        Self {
            eba_mode: true,
            post_conversion: true,
            ..Self::default()
        }
    }

    /// Sets strict filing-indicator mode.
    #[must_use]
    pub fn with_strict_filing_indicators(mut self, strict: bool) -> Self {
        self.strict_filing_indicators = strict;
        self
    }

    /// Sets whether `headers`-capable tables should be emitted as datapoints.
    #[must_use]
    pub fn with_headers_as_datapoints(mut self, headers_as_datapoints: bool) -> Self {
        self.headers_as_datapoints = headers_as_datapoints;
        self
    }

    /// Sets EBA mode.
    #[must_use]
    pub fn with_eba_mode(mut self, eba_mode: bool) -> Self {
        self.eba_mode = eba_mode;
        self
    }

    /// Sets post-conversion mode.
    #[must_use]
    pub fn with_post_conversion(mut self, post_conversion: bool) -> Self {
        self.post_conversion = post_conversion;
        self
    }

    /// Sets the verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Verbosity level for diagnostics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Verbosity {
    /// No output.
    None,
    /// Informational messages only.
    Info,
    /// Warnings and above (default).
    #[default]
    Warn,
    /// Errors only.
    Error,
}

impl Verbosity {
    /// The `tracing` level this verbosity corresponds to, for subscriber
    /// initialisation. [`Self::None`] maps to [`tracing::Level::ERROR`] too —
    /// `tracing-subscriber`'s `fmt` layer has no "off" level, so the CLI
    /// additionally gates all logging on this check before installing the
    /// subscriber; see `src/bin/xbridge.rs`.
    #[must_use]
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::None | Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict() {
        let config = Config::default();
        assert!(config.strict_filing_indicators);
        assert!(!config.eba_mode);
    }

    #[test]
    fn permissive_relaxes_filing_indicators_only() {
        let config = Config::permissive();
        assert!(!config.strict_filing_indicators);
        assert!(!config.eba_mode);
    }

    #[test]
    fn verbosity_maps_to_tracing_level() {
        assert_eq!(Verbosity::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(Verbosity::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(Verbosity::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(Verbosity::None.to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn builder_chain() {
        let config = Config::new()
            .with_strict_filing_indicators(false)
            .with_eba_mode(true)
            .with_post_conversion(true);
        assert!(!config.strict_filing_indicators);
        assert!(config.eba_mode);
        assert!(config.post_conversion);
    }
}
