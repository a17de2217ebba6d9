//! Agent infrastructure

mod service;

pub use service::AgentService;
