//! Property-test run profile parsing for CI and local overrides.
//!
//! Suites call [`ProptestRunProfile::load`] with their own defaults; the
//! environment can raise the case count for soak runs or enable forking to
//! isolate aborting cases.

use std::env;

use thiserror::Error;

/// Environment variable controlling proptest case counts.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable controlling proptest process forking.
pub const BUNRUI_PBT_FORK_ENV_KEY: &str = "BUNRUI_PBT_FORK";

/// Reasons an override was ignored.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProfileOverrideError {
    /// The case count did not parse as an unsigned integer.
    #[error("case count `{raw}` is not an unsigned integer")]
    NotANumber {
        /// The rejected text.
        raw: String,
    },
    /// A case count of zero would skip the property entirely.
    #[error("case count must be greater than zero")]
    ZeroCases,
    /// The fork flag was not a recognised boolean spelling.
    #[error("`{raw}` is not one of true/false/1/0/yes/no/on/off")]
    NotABool {
        /// The rejected text.
        raw: String,
    },
}

/// Runtime profile for property-test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Load a profile from environment variables with provided defaults.
    ///
    /// Invalid overrides are reported with `warn!` and replaced by the
    /// defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use bunrui_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(64, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: override_or(PROGTEST_CASES_ENV_KEY, default_cases, parse_cases),
            fork: override_or(BUNRUI_PBT_FORK_ENV_KEY, default_fork, parse_bool),
        }
    }

    /// Number of cases to run per property.
    #[must_use]
    #[rustfmt::skip]
    pub fn cases(&self) -> u32 { self.cases }

    /// Whether to run proptest cases in forked subprocesses.
    #[must_use]
    #[rustfmt::skip]
    pub fn fork(&self) -> bool { self.fork }
}

fn override_or<T, F>(key: &'static str, default: T, parser: F) -> T
where
    F: Fn(&str) -> Result<T, ProfileOverrideError>,
{
    let Ok(raw) = env::var(key) else {
        return default;
    };
    parser(&raw).unwrap_or_else(|error| {
        tracing::warn!(
            env = key,
            raw = %raw,
            reason = %error,
            "invalid property-test profile override; using default",
        );
        default
    })
}

/// Parses a positive case count.
///
/// # Errors
/// Returns [`ProfileOverrideError::NotANumber`] or
/// [`ProfileOverrideError::ZeroCases`].
pub fn parse_cases(raw: &str) -> Result<u32, ProfileOverrideError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ProfileOverrideError::ZeroCases),
        Ok(cases) => Ok(cases),
        Err(_) => Err(ProfileOverrideError::NotANumber {
            raw: raw.to_owned(),
        }),
    }
}

/// Parses a boolean flag.
///
/// # Errors
/// Returns [`ProfileOverrideError::NotABool`] for unknown spellings.
pub fn parse_bool(raw: &str) -> Result<bool, ProfileOverrideError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProfileOverrideError::NotABool {
            raw: raw.to_owned(),
        }),
    }
}
