//! cordview - the live message view core of a Discord desktop client.
//!
//! This crate maintains an ordered, windowed, mutable model of messages for
//! a single channel, reconciles it against gateway events and local user
//! actions, and drives attached observers with fine-grained change
//! notifications. It also provides the composer state machine, the
//! autocomplete engine, and the channel tree model. It contains no GUI and
//! no network transport; those are reached through the `domain::ports`
//! boundaries.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the model components and their environment.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Runtime layer containing the scheduler and the event bus.
pub mod runtime;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "cordview";
