//! Ring Identifier Module
//!
//! Implements the circular identifier space the overlay is organized around.
//! Nodes and keys are placed on a ring of size 2^1024 by hashing; each node
//! owns the arc between its predecessor and itself.
//!
//! ## Core Mechanisms
//! - **ID algebra**: fixed-width big-endian integers with total order,
//!   modular addition by powers of two, and clockwise arc membership.
//!   All comparisons are byte-order-stable so that every node on the ring
//!   agrees on placement.
//! - **Finger table**: a fixed sequence of routing shortcuts, entry `i`
//!   targeting `self + 2^(i+1)`, enabling O(log N) lookups.

pub mod hasher;
pub mod types;
