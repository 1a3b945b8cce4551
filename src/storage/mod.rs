//! Local Storage Module
//!
//! The node-local slice of the distributed key-value map. The overlay engine
//! only ever talks to the [`memory::KvStore`] contract; which node a key
//! lands on is decided by the router, not by the store.

pub mod memory;
