//! Deployment environment selection
//!
//! The environment is an enumerated deployment context chosen once at process
//! start and immutable afterwards. It drives the registration gate: only the
//! implementation designated for the current environment takes effect.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Environment variables probed by [Environment::detect], in order.
const ENV_VAR_FALLBACKS: [&str; 3] = ["IKEBANA_ENV", "APP_ENV", "DEPLOY_ENV"];

static DETECTED: OnceCell<Environment> = OnceCell::new();

/// Deployment context selected once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Developer machine, typically wired with fake implementations
    #[default]
    Local,
    /// Shared development deployment
    Development,
    /// Production deployment
    Production,
}

impl Environment {
    /// Pick the environment from an ordered fallback list of process
    /// environment variables.
    ///
    /// The first variable holding a recognized value wins. Variables that are
    /// unset or hold an unrecognized value are skipped (the latter with a
    /// logged warning). Falls back to [Environment::Local] when the whole
    /// list is exhausted.
    pub fn from_env_vars(names: &[&str]) -> Self {
        for name in names {
            if let Ok(value) = std::env::var(name) {
                match value.parse() {
                    Ok(env) => return env,
                    Err(UnknownEnvironment(_)) => {
                        tracing::warn!(
                            variable = *name,
                            value = %value,
                            "unrecognized environment value, trying next variable"
                        );
                    }
                }
            }
        }
        Environment::Local
    }

    /// Detect the process environment, caching the result for the process
    /// lifetime.
    ///
    /// Probes `IKEBANA_ENV`, `APP_ENV` and `DEPLOY_ENV` in order and defaults
    /// to [Environment::Local]. Later calls return the cached value even if
    /// the process environment has changed in the meantime. Embedders that
    /// need a fresh read (e.g. test harnesses) should use
    /// [Environment::from_env_vars] instead.
    pub fn detect() -> Self {
        *DETECTED.get_or_init(|| Self::from_env_vars(&ENV_VAR_FALLBACKS))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Local => write!(f, "Local"),
            Environment::Development => write!(f, "Development"),
            Environment::Production => write!(f, "Production"),
        }
    }
}

/// Raised when parsing an environment name that matches no known deployment
/// context.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unrecognized environment '{0}'")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}
