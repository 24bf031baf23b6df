//! Entity definitions, configuration schema, and identity primitives shared
//! across the Yggdrasil workspace.
//!
//! This crate is the foundation every other crate builds on: it owns no
//! behavior, only the vocabulary (types, ids, invariant-carrying enums) that
//! the Assignment, Conductor, Persistence, and Gateway crates all speak.
//!
//! ## Identity
//!
//! - [`ID`] — type-safe UUIDv7 wrapper over a marker type
//! - [`Unique`] — trait for entities that expose their own [`ID`]
//!
//! ## Data Model
//!
//! - [`Show`] — the authoritative, versioned show state
//! - [`User`], [`Faction`], [`RowState`], [`Vote`], [`PersonalTree`] — entities
//! - [`ShowPhase`], [`RowPhase`] — lifecycle enums
//!
//! ## Configuration
//!
//! - [`ShowConfig`] — immutable-after-creation show configuration
//! - [`CoupConfig`], [`TimingConfig`], [`VotePolicy`] — configuration sections
//!
//! ## Exact Coherence Arithmetic
//!
//! - [`Rational`] — exact fraction comparison, used so that tie detection
//!   between factions never depends on floating point epsilon
#![allow(dead_code)]

mod config;
mod entities;
mod ids;
mod rational;

pub use config::*;
pub use entities::*;
pub use ids::*;
pub use rational::*;
