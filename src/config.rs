//! Checker configuration surface (spec.md §6; SPEC_FULL.md §10.3).
//!
//! `CheckerConfig` is the entire configuration surface: there is no
//! annotation processor or CLI binary. Build one with
//! [`CheckerConfig::builder`], or, with the `config-file` feature enabled,
//! load one from TOML.

use crate::error::{Error, InfraError};
use crate::observability::LogLevel;

/// Full configuration for a checker run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    /// Number of iterations to run before giving up on finding a failure.
    pub iterations: u32,
    /// Invocations of the generated scenario per iteration.
    pub invocations_per_iteration: u32,
    /// Number of parallel threads per scenario.
    pub threads: u32,
    /// Actors drawn into each parallel thread.
    pub actors_per_thread: u32,
    /// Actors placed in the scenario's init (pre-parallel) part.
    pub actors_before: u32,
    /// Actors placed in the scenario's post (after-parallel) part.
    pub actors_after: u32,
    /// Per-invocation timeout, in milliseconds, before it is treated as a
    /// hang (spec.md §4.4/§4.6 hang detection).
    pub timeout_ms: u64,
    /// Whether a failing scenario is greedily minimized before reporting.
    pub minimize_failed_scenario: bool,
    /// Whether the managed strategy additionally checks obstruction freedom.
    pub check_obstruction_freedom: bool,
    /// Number of consecutive non-progressing switch points before the
    /// managed strategy declares a livelock.
    pub hanging_detection_threshold: u32,
    /// Scenarios supplied directly by the caller instead of (or in addition
    /// to) randomly generated ones.
    pub custom_scenarios: Vec<crate::model::scenario::Scenario>,
    /// Minimum level emitted through the `tracing` integration.
    pub log_level: LogLevel,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            invocations_per_iteration: 5_000,
            threads: 2,
            actors_per_thread: 4,
            actors_before: 0,
            actors_after: 0,
            timeout_ms: 10_000,
            minimize_failed_scenario: true,
            check_obstruction_freedom: false,
            hanging_detection_threshold: 10_000,
            custom_scenarios: Vec::new(),
            log_level: LogLevel::Warn,
        }
    }
}

impl CheckerConfig {
    /// Starts building a configuration from defaults.
    #[must_use]
    pub fn builder() -> CheckerConfigBuilder {
        CheckerConfigBuilder::default()
    }

    /// Parses a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `text` is not valid TOML or does not
    /// match the shape of [`CheckerConfig`].
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        #[derive(serde::Deserialize)]
        #[serde(default)]
        struct Raw {
            iterations: u32,
            invocations_per_iteration: u32,
            threads: u32,
            actors_per_thread: u32,
            actors_before: u32,
            actors_after: u32,
            timeout_ms: u64,
            minimize_failed_scenario: bool,
            check_obstruction_freedom: bool,
            hanging_detection_threshold: u32,
            log_level: LogLevel,
        }

        impl Default for Raw {
            fn default() -> Self {
                let d = CheckerConfig::default();
                Self {
                    iterations: d.iterations,
                    invocations_per_iteration: d.invocations_per_iteration,
                    threads: d.threads,
                    actors_per_thread: d.actors_per_thread,
                    actors_before: d.actors_before,
                    actors_after: d.actors_after,
                    timeout_ms: d.timeout_ms,
                    minimize_failed_scenario: d.minimize_failed_scenario,
                    check_obstruction_freedom: d.check_obstruction_freedom,
                    hanging_detection_threshold: d.hanging_detection_threshold,
                    log_level: d.log_level,
                }
            }
        }

        let raw: Raw = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            iterations: raw.iterations,
            invocations_per_iteration: raw.invocations_per_iteration,
            threads: raw.threads,
            actors_per_thread: raw.actors_per_thread,
            actors_before: raw.actors_before,
            actors_after: raw.actors_after,
            timeout_ms: raw.timeout_ms,
            minimize_failed_scenario: raw.minimize_failed_scenario,
            check_obstruction_freedom: raw.check_obstruction_freedom,
            hanging_detection_threshold: raw.hanging_detection_threshold,
            custom_scenarios: Vec::new(),
            log_level: raw.log_level,
        })
    }

    /// Loads and parses a configuration file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Infra`] if the file cannot be read, or
    /// [`Error::Config`] if its contents do not parse.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Infra(InfraError::ConfigLoad(format!(
                "reading {}: {e}",
                path.as_ref().display()
            )))
        })?;
        Self::from_toml_str(&text)
    }
}

/// Builder for [`CheckerConfig`], chained setter style.
#[derive(Debug, Clone, Default)]
pub struct CheckerConfigBuilder {
    config: CheckerConfig,
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        /// Overrides the corresponding `CheckerConfig` field.
        #[must_use]
        pub fn $name(mut self, value: $ty) -> Self {
            self.config.$name = value;
            self
        }
    };
}

impl CheckerConfigBuilder {
    setter!(iterations, u32);
    setter!(invocations_per_iteration, u32);
    setter!(threads, u32);
    setter!(actors_per_thread, u32);
    setter!(actors_before, u32);
    setter!(actors_after, u32);
    setter!(timeout_ms, u64);
    setter!(minimize_failed_scenario, bool);
    setter!(check_obstruction_freedom, bool);
    setter!(hanging_detection_threshold, u32);
    setter!(log_level, LogLevel);

    /// Appends a caller-supplied scenario to the list run in addition to
    /// (or instead of, if `iterations` generated scenarios are never
    /// reached) randomly generated ones.
    #[must_use]
    pub fn custom_scenario(mut self, scenario: crate::model::scenario::Scenario) -> Self {
        self.config.custom_scenarios.push(scenario);
        self
    }

    /// Finalizes the configuration.
    #[must_use]
    pub fn build(self) -> CheckerConfig {
        self.config
    }
}
