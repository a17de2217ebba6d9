//! Cache domain - TTL key-value abstraction backing the session store

mod repository;

pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
