//! Typed access to environment configuration

use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Variable is set but cannot be parsed
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Load a `.env` file from the working directory if present.
///
/// Returns the path that was loaded, if any. Variables already present in the
/// process environment are not overridden.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}

/// Read a variable, treating blank values as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable or fall back to `default`.
pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Read and parse a variable, falling back to `default` when unset.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| EnvError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}

/// Read a comma separated list. Blank items are dropped.
pub fn env_list(key: &str) -> Vec<String> {
    env_opt(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_and_defaults() {
        // SAFETY: each test uses its own variable names
        unsafe {
            std::env::set_var("NINJA_UTILS_TEST_PORT", "8080");
            std::env::set_var("NINJA_UTILS_TEST_BAD", "eighty");
            std::env::set_var("NINJA_UTILS_TEST_BLANK", "   ");
        }

        assert_eq!(env_parse("NINJA_UTILS_TEST_PORT", 1u16), Ok(8080));
        assert_eq!(env_parse("NINJA_UTILS_TEST_UNSET", 1u16), Ok(1));
        assert!(matches!(
            env_parse("NINJA_UTILS_TEST_BAD", 1u16),
            Err(EnvError::Invalid { .. })
        ));
        assert_eq!(env_opt("NINJA_UTILS_TEST_BLANK"), None);
        assert_eq!(env_or("NINJA_UTILS_TEST_BLANK", "x"), "x");

        unsafe {
            std::env::remove_var("NINJA_UTILS_TEST_PORT");
            std::env::remove_var("NINJA_UTILS_TEST_BAD");
            std::env::remove_var("NINJA_UTILS_TEST_BLANK");
        }
    }

    #[test]
    fn test_env_list() {
        unsafe {
            std::env::set_var("NINJA_UTILS_TEST_LIST", " AAPL, TSLA ,,nvda ");
        }
        assert_eq!(env_list("NINJA_UTILS_TEST_LIST"), vec!["AAPL", "TSLA", "nvda"]);
        assert!(env_list("NINJA_UTILS_TEST_LIST_UNSET").is_empty());
        unsafe {
            std::env::remove_var("NINJA_UTILS_TEST_LIST");
        }
    }
}
