//! Agent domain

mod entity;

pub use entity::{Agent, AgentChanges};
