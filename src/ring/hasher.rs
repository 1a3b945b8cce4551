use blake2::{Blake2b512, Digest};

use super::types::{NodeId, ID_BYTES};

/// Pluggable ring digest.
///
/// Produces uniformly distributed identifiers of a fixed width. All members
/// of a ring must agree on the hasher; mixing widths breaks placement.
pub trait Hasher: Send + Sync {
    /// Digests `data` into a ring identifier.
    fn hash(&self, data: &[u8]) -> NodeId;
    /// Digest width in bytes. Also the number of finger-table slots.
    fn size(&self) -> usize;
}

/// Blake2b-based 1024-bit ring digest.
///
/// The full width is assembled from two chained Blake2b-512 blocks: the
/// second block digests the first, so the result stays deterministic and
/// uniform across the whole identifier.
pub struct Blake2bHasher;

impl Hasher for Blake2bHasher {
    fn hash(&self, data: &[u8]) -> NodeId {
        let first = Blake2b512::digest(data);
        let second = Blake2b512::digest(first);
        let mut out = [0u8; ID_BYTES];
        out[..64].copy_from_slice(&first);
        out[64..].copy_from_slice(&second);
        NodeId(out)
    }

    fn size(&self) -> usize {
        ID_BYTES
    }
}
