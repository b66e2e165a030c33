//! Redis implementation of the impacted-id set store.

mod id_set;

pub use id_set::RedisIdSetStore;
