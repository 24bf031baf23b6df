//! Pure state-machine core: the Conductor reducer, vote Tally, and
//! per-role Projection.
//!
//! ## Command & Reducer
//!
//! - [`Command`] — the full command catalog
//! - [`Conductor`] — `reduce(state, command) -> Outcome`, pure, no I/O
//! - [`Effect`] — outbound intents the reducer asks the caller to perform
//! - [`ConductorError`] — validation error kinds
//!
//! ## Tally
//!
//! - [`tally::Tally`] — per-row coherence computation and winner selection
//! - [`tally::TieBreaker`] — injectable randomness for tie resolution
//!
//! ## Projection
//!
//! - [`projection::Projection`] — derives `AudienceView`/`ProjectorView`/`ControllerView`
#![allow(dead_code)]

mod command;
mod conductor;
mod effect;
mod error;
pub mod projection;
pub mod tally;

pub use command::Command;
pub use command::Mode;
pub use conductor::Conductor;
pub use conductor::Outcome;
pub use effect::BroadcastScope;
pub use effect::Effect;
pub use error::ConductorError;
