//! Environment variable resolution for configuration values.
//!
//! Gas station bearer tokens are secrets and should not live in configuration files.
//! The [`LiteralOrEnv`] wrapper lets a configuration value be written either literally
//! or as a reference to an environment variable:
//!
//! ```json
//! {
//!   "url": "https://gas.example.org",   // Literal value
//!   "token": "$GAS_STATION_TOKEN",      // Simple env var
//!   "fallback": "${GAS_STATION_2_URL}"  // Braced env var
//! }
//! ```
//!
//! The reference is resolved once, during deserialization.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;

/// A configuration value that is either a literal or resolved from an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Returns the variable name for `$VAR` or `${VAR}` syntax, `None` for literals.
fn env_var_name(s: &str) -> Option<&str> {
    if let Some(braced) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        return Some(braced);
    }
    let name = s.strip_prefix('$')?;
    let is_identifier = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    is_identifier.then_some(name)
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value = match env_var_name(&raw) {
            Some(name) => std::env::var(name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "environment variable '{name}' not found (referenced as '{raw}')"
                ))
            })?,
            None => raw,
        };
        value
            .parse::<T>()
            .map(LiteralOrEnv)
            .map_err(|e| serde::de::Error::custom(format!("failed to parse value: {e}")))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name_syntax() {
        assert_eq!(env_var_name("$TOKEN"), Some("TOKEN"));
        assert_eq!(env_var_name("${GAS_STATION_URL}"), Some("GAS_STATION_URL"));
        assert_eq!(env_var_name("$"), None);
        assert_eq!(env_var_name("$not-a-var"), None);
        assert_eq!(env_var_name("https://gas.example.org"), None);
    }

    #[test]
    fn test_literal_value_is_parsed() {
        let value: LiteralOrEnv<u64> = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(*value, 42);
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let result: Result<LiteralOrEnv<String>, _> =
            serde_json::from_str("\"$GAS_SPONSOR_TYPES_SURELY_UNSET_VARIABLE\"");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("GAS_SPONSOR_TYPES_SURELY_UNSET_VARIABLE"));
    }

    #[test]
    fn test_env_var_is_resolved() {
        // PATH is set in every test environment.
        let expected = std::env::var("PATH").unwrap();
        let value: LiteralOrEnv<String> = serde_json::from_str("\"${PATH}\"").unwrap();
        assert_eq!(value.into_inner(), expected);
    }
}
