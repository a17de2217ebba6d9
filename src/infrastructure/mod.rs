//! Infrastructure layer - Backends and services behind the actions

pub mod agent;
pub mod cache;
pub mod logging;
pub mod storage;
pub mod user;
