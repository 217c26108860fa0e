//! XML Reader Module
//!
//! - Events: owned event payload types for pull parsing
//! - Pull: the bidirectional pull-protocol reader

pub mod events;
pub mod pull;
