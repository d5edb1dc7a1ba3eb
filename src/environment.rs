//! Environment registry
//!
//! The closed set of deployment environments and their state namespaces.
//! Every entry point that accepts an environment identifier goes through
//! [`Environment::validate`] before touching any store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// A deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// All environments, in promotion order
    pub fn all() -> &'static [Environment] {
        &[
            Environment::Development,
            Environment::Staging,
            Environment::Production,
        ]
    }

    /// Validate an identifier against the closed set (case-sensitive)
    pub fn validate(identifier: &str) -> StateResult<Environment> {
        match identifier {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(StateError::InvalidEnvironment(other.to_string())),
        }
    }

    /// The identifier string
    pub fn identifier(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// State namespace: `<app>/<environment>`
    pub fn namespace(&self, app: &str) -> String {
        format!("{}/{}", app, self.identifier())
    }

    /// Prefix shared by every backup key of this environment: `<app>-<environment>-`
    pub fn key_prefix(&self, app: &str) -> String {
        format!("{}-{}-", app, self.identifier())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Environment {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::validate(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_known_identifiers() {
        for env in Environment::all() {
            let validated = Environment::validate(env.identifier()).unwrap();
            assert_eq!(validated, *env);
            assert_eq!(validated.identifier(), env.identifier());
        }
    }

    #[test]
    fn test_validate_is_case_sensitive() {
        for bad in ["Production", "STAGING", "prod", "dev", "", " staging", "staging "] {
            let err = Environment::validate(bad).unwrap_err();
            assert!(matches!(err, StateError::InvalidEnvironment(ref s) if s == bad));
        }
    }

    #[test]
    fn test_namespace_format() {
        assert_eq!(Environment::Staging.namespace("shop"), "shop/staging");
        assert_eq!(
            Environment::Production.namespace("shop-api"),
            "shop-api/production"
        );
    }

    #[test]
    fn test_key_prefix() {
        assert_eq!(Environment::Development.key_prefix("shop"), "shop-development-");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Environment::Production).unwrap();
        assert_eq!(json, "\"production\"");
    }
}
