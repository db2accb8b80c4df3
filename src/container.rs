//! Keyed service container with environment-gated registration
//!
//! The container maps string service keys to registrations, each pairing a
//! zero-argument factory with a lifetime. Registration happens exactly once,
//! inside the callback passed to [Container::initialize]; afterwards the
//! container is sealed and only resolution is permitted.
//!
//! All mutation happens either during the single initialization phase or
//! lazily on first resolution of a singleton. Factories run outside the
//! container lock, so a factory may resolve other services from the same
//! container; a construction-in-progress marker keeps singleton factories
//! at-most-once per key and turns a resolution cycle into an error instead
//! of a deadlock.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::environment::Environment;
use crate::profile::EnvironmentProfile;

/// Instance caching behaviour of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One shared instance per container, constructed on first resolution
    Singleton,
    /// A fresh instance on every resolution
    Transient,
}

/// Type-erased service instance handed out by [Container::resolve].
type Service = Arc<dyn Any + Send + Sync>;

/// Type-erased zero-argument constructor. Shared so it can be invoked
/// outside the container lock.
type Factory = Arc<dyn Fn() -> Service + Send + Sync>;

/// Errors raised by the container.
///
/// All of these are deterministic startup or wiring bugs, surfaced
/// synchronously and never retried: sequencing errors ([Sealed],
/// [NotInitialized], [CyclicResolution]), configuration errors ([Conflict])
/// and lookup errors ([NotRegistered], [TypeMismatch]).
///
/// [Sealed]: ContainerError::Sealed
/// [NotInitialized]: ContainerError::NotInitialized
/// [CyclicResolution]: ContainerError::CyclicResolution
/// [Conflict]: ContainerError::Conflict
/// [NotRegistered]: ContainerError::NotRegistered
/// [TypeMismatch]: ContainerError::TypeMismatch
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("container not initialized: resolve is only permitted after initialize completes")]
    NotInitialized,

    #[error(
        "container sealed: register('{key}', '{implementation}') is only permitted \
         inside the initialize callback"
    )]
    Sealed { key: String, implementation: String },

    #[error(
        "service conflict for '{key}' in {environment}: attempted '{attempted}' but \
         '{existing}' is already registered; attempts: {attempts:?}, \
         profile expects: {expected:?}"
    )]
    Conflict {
        key: String,
        environment: Environment,
        attempted: String,
        existing: String,
        attempts: Vec<String>,
        expected: Option<String>,
    },

    #[error(
        "service '{key}' not registered in {environment}; attempts: {attempts:?}, \
         profile expects: {expected:?}"
    )]
    NotRegistered {
        key: String,
        environment: Environment,
        attempts: Vec<String>,
        expected: Option<String>,
    },

    #[error("service '{key}' ('{implementation}') does not have the requested type")]
    TypeMismatch { key: String, implementation: String },

    #[error("cyclic resolution of service '{key}': its factory resolves the same key")]
    CyclicResolution { key: String },
}

/// Active registration for a key: factory, lifetime and a diagnostic label.
///
/// Created at registration time, immutable afterwards.
struct Registration {
    factory: Factory,
    lifetime: Lifetime,
    implementation: String,
}

/// Diagnostic view of an active registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub implementation: String,
    pub lifetime: Lifetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Uninitialized,
    Initializing,
    Sealed,
}

#[derive(Default)]
struct Inner {
    state: State,
    environment: Option<Environment>,
    profile: EnvironmentProfile,
    registrations: HashMap<String, Registration>,
    attempts: HashMap<String, Vec<String>>,
    singletons: HashMap<String, Service>,
    /// Singleton keys whose factory is currently running
    resolving: HashSet<String>,
}

/// Keyed service container.
///
/// Created once at process start and passed by reference to whatever needs
/// it. Consumers depend on it only through [Container::resolve]; service
/// implementations are supplied purely as zero-argument factories and are
/// otherwise opaque to the container.
#[derive(Default)]
pub struct Container {
    inner: Mutex<Inner>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the registration phase and seal the container.
    ///
    /// Invokes `wire`, during which [Container::register] may be called any
    /// number of times. Once `wire` returns successfully the container is
    /// sealed and resolution becomes available. If `wire` fails, the partial
    /// wiring is discarded and the container returns to its uninitialized
    /// state.
    ///
    /// A second call is a no-op apart from a logged warning: the
    /// registrations established by the first call stand.
    pub fn initialize<F>(
        &self,
        environment: Environment,
        profile: EnvironmentProfile,
        wire: F,
    ) -> Result<(), ContainerError>
    where
        F: FnOnce(&Self) -> Result<(), ContainerError>,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != State::Uninitialized {
                tracing::warn!(
                    %environment,
                    "initialize called more than once, keeping existing registrations"
                );
                return Ok(());
            }
            inner.state = State::Initializing;
            inner.environment = Some(environment);
            inner.profile = profile;
        }
        // A registration failure is a fatal wiring bug: the partial wiring
        // is discarded and the container returns to Uninitialized, so
        // stray registrations stay rejected and a fresh initialize can
        // re-wire from scratch.
        if let Err(err) = wire(self) {
            *self.inner.lock().unwrap() = Inner::default();
            return Err(err);
        }
        self.inner.lock().unwrap().state = State::Sealed;
        Ok(())
    }

    /// Record a candidate implementation for `key`.
    ///
    /// Only permitted inside the [Container::initialize] callback. The
    /// attempt is first checked against the environment profile: if the
    /// profile designates a different implementation for the current
    /// environment, the call is a silent no-op. This permits declaring all
    /// environment-specific implementations unconditionally at the call
    /// site.
    ///
    /// Two attempts passing the gate for the same key is a fatal
    /// configuration error ([ContainerError::Conflict]).
    pub fn register<T, F>(
        &self,
        key: &str,
        factory: F,
        lifetime: Lifetime,
        implementation: &str,
    ) -> Result<(), ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Initializing {
            return Err(ContainerError::Sealed {
                key: key.to_string(),
                implementation: implementation.to_string(),
            });
        }
        // Initializing implies an environment has been set.
        let environment = inner.environment.unwrap_or_default();

        // Every attempt is recorded, including gated-out ones: the history is
        // the primary debugging aid reported by resolution failures.
        inner
            .attempts
            .entry(key.to_string())
            .or_default()
            .push(implementation.to_string());

        if !inner.profile.is_enabled(key, implementation, environment) {
            tracing::debug!(
                key = %key,
                implementation = %implementation,
                %environment,
                "registration skipped: not designated for this environment"
            );
            return Ok(());
        }

        if let Some(existing) = inner.registrations.get(key) {
            return Err(ContainerError::Conflict {
                key: key.to_string(),
                environment,
                attempted: implementation.to_string(),
                existing: existing.implementation.clone(),
                attempts: inner.attempts.get(key).cloned().unwrap_or_default(),
                expected: inner.profile.expected(key, environment).map(String::from),
            });
        }

        tracing::debug!(
            key = %key,
            implementation = %implementation,
            ?lifetime,
            "service registered"
        );
        inner.registrations.insert(
            key.to_string(),
            Registration {
                factory: Arc::new(move || Arc::new(factory()) as Service),
                lifetime,
                implementation: implementation.to_string(),
            },
        );
        Ok(())
    }

    /// Resolve a service instance for `key`.
    ///
    /// Singleton registrations hand out the same `Arc` on every call,
    /// invoking the factory at most once. Transient registrations invoke the
    /// factory on every call.
    ///
    /// The factory itself runs outside the container lock and may resolve
    /// other services from this container; a factory whose resolution chain
    /// comes back to its own key fails with
    /// [ContainerError::CyclicResolution].
    pub fn resolve<T>(&self, key: &str) -> Result<Arc<T>, ContainerError>
    where
        T: Send + Sync + 'static,
    {
        let (factory, lifetime, implementation) = {
            let mut guard = self.inner.lock().unwrap();
            let inner = &mut *guard;
            if inner.state != State::Sealed {
                return Err(ContainerError::NotInitialized);
            }
            let environment = inner.environment.unwrap_or_default();

            let Some(registration) = inner.registrations.get(key) else {
                return Err(ContainerError::NotRegistered {
                    key: key.to_string(),
                    environment,
                    attempts: inner.attempts.get(key).cloned().unwrap_or_default(),
                    expected: inner.profile.expected(key, environment).map(String::from),
                });
            };

            if registration.lifetime == Lifetime::Singleton {
                if let Some(cached) = inner.singletons.get(key) {
                    return Arc::clone(cached).downcast::<T>().map_err(|_| {
                        ContainerError::TypeMismatch {
                            key: key.to_string(),
                            implementation: registration.implementation.clone(),
                        }
                    });
                }
                // Mark the slot before releasing the lock: the marker keeps
                // construction at-most-once and catches resolution cycles.
                if !inner.resolving.insert(key.to_string()) {
                    return Err(ContainerError::CyclicResolution {
                        key: key.to_string(),
                    });
                }
            }

            (
                Arc::clone(&registration.factory),
                registration.lifetime,
                registration.implementation.clone(),
            )
        };

        let constructed = (factory)();

        if lifetime == Lifetime::Singleton {
            let mut inner = self.inner.lock().unwrap();
            inner.resolving.remove(key);
            inner
                .singletons
                .insert(key.to_string(), Arc::clone(&constructed));
        }

        constructed
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                key: key.to_string(),
                implementation,
            })
    }

    /// The environment the container was initialized with.
    pub fn environment(&self) -> Option<Environment> {
        self.inner.lock().unwrap().environment
    }

    /// Active registrations: implementation name and lifetime per key.
    pub fn registration_info(&self) -> HashMap<String, RegistrationInfo> {
        self.inner
            .lock()
            .unwrap()
            .registrations
            .iter()
            .map(|(key, registration)| {
                (
                    key.clone(),
                    RegistrationInfo {
                        implementation: registration.implementation.clone(),
                        lifetime: registration.lifetime,
                    },
                )
            })
            .collect()
    }

    /// Full history of attempted implementation names per key, including
    /// attempts the environment gate filtered out.
    pub fn registration_attempts(&self) -> HashMap<String, Vec<String>> {
        self.inner.lock().unwrap().attempts.clone()
    }

    /// Forcibly return the container to its uninitialized state, discarding
    /// all registrations and cached singletons.
    ///
    /// There is no reset transition in production use; this exists for test
    /// isolation.
    pub fn reset(&self) {
        *self.inner.lock().unwrap() = Inner::default();
    }
}
