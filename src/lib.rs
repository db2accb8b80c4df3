//! Keyed service container with environment-gated registration and
//! singleton/transient lifetimes.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use ikebana::*;
//! // Define a service contract and its implementations
//! trait Api: Send + Sync {
//!     fn fetch(&self) -> String;
//! }
//!
//! struct FakeApi;
//! impl Api for FakeApi {
//!     fn fetch(&self) -> String {
//!         "canned data".to_string()
//!     }
//! }
//!
//! struct RealApi;
//! impl Api for RealApi {
//!     fn fetch(&self) -> String {
//!         "live data".to_string()
//!     }
//! }
//!
//! # fn main() -> Result<(), ContainerError> {
//! // Designate which implementation is active per environment
//! let profile = EnvironmentProfile::new()
//!     .designate("api", Environment::Local, "FakeApi")
//!     .designate("api", Environment::Production, "RealApi");
//!
//! // Declare every implementation unconditionally; the gate keeps one
//! let container = Container::new();
//! container.initialize(Environment::Production, profile, |c| {
//!     c.register("api", || Box::new(FakeApi) as Box<dyn Api>, Lifetime::Singleton, "FakeApi")?;
//!     c.register("api", || Box::new(RealApi) as Box<dyn Api>, Lifetime::Singleton, "RealApi")?;
//!     Ok(())
//! })?;
//!
//! let api: Arc<Box<dyn Api>> = container.resolve("api")?;
//! assert_eq!(api.fetch(), "live data");
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! The container maps opaque string keys to registrations, each pairing a
//! zero-argument factory with a [Lifetime]. The lifecycle is a one-way state
//! machine: registration is only accepted inside the callback passed to
//! [Container::initialize], after which the container is sealed and serves
//! resolutions only.
//!
//! * An [EnvironmentProfile] designates, per key and [Environment], which
//!   implementation is active. Registrations the profile does not designate
//!   for the current environment are silently dropped, so every
//!   environment-specific implementation can be declared unconditionally at
//!   the call site.
//! * Two registrations passing the gate for the same key indicate a broken
//!   deployment profile and fail at startup with a
//!   [ContainerError::Conflict] naming both implementations.
//! * Resolution failures report the environment, the full registration
//!   attempt history for the key and the implementation the profile
//!   expected, which is what a developer needs when an environment mapping
//!   is missing.
//!
//! Instances are handed out as `Arc<T>` via `Any` downcasting; [Lifetime]
//! controls whether the factory runs once per container or once per
//! resolution.

mod container;
mod environment;
mod profile;

pub use container::{Container, ContainerError, Lifetime, RegistrationInfo};
pub use environment::{Environment, UnknownEnvironment};
pub use profile::EnvironmentProfile;
