//! Environment profiles gating which registration is active
//!
//! A profile maps a service key to the implementation name designated for
//! each environment. Call sites may then declare every environment-specific
//! implementation unconditionally: the registration gate silently drops the
//! ones the profile does not designate for the current environment.

use std::collections::HashMap;

use crate::environment::Environment;

/// Designated implementation names per service key and environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentProfile {
    designations: HashMap<String, HashMap<Environment, String>>,
}

impl EnvironmentProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate `implementation` as the active one for `key` in
    /// `environment`, replacing any previous designation for that pair.
    pub fn designate(mut self, key: &str, environment: Environment, implementation: &str) -> Self {
        self.designations
            .entry(key.to_string())
            .or_default()
            .insert(environment, implementation.to_string());
        self
    }

    /// The implementation name the profile designates for `key` in
    /// `environment`, if any.
    pub fn expected(&self, key: &str, environment: Environment) -> Option<&str> {
        self.designations
            .get(key)
            .and_then(|per_env| per_env.get(&environment))
            .map(String::as_str)
    }

    /// Whether a registration of `implementation` for `key` passes the gate
    /// in `environment`.
    ///
    /// A key without any profile entry is unconditionally enabled. A key with
    /// an entry enables exactly the designated implementation; every other
    /// implementation is gated out, as is everything when the current
    /// environment has no designation at all.
    pub fn is_enabled(&self, key: &str, implementation: &str, environment: Environment) -> bool {
        match self.designations.get(key) {
            None => true,
            Some(per_env) => per_env
                .get(&environment)
                .map_or(false, |designated| designated == implementation),
        }
    }
}
