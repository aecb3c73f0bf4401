//! Application layer: configuration, environment, and model services.

/// Explicit model environment.
pub mod env;
/// Typed configuration.
pub mod options;
/// Model services.
pub mod services;

pub use env::ModelEnv;
pub use options::CoreOptions;
