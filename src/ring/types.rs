use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;

/// Width of a ring identifier in bytes. The identifier space is 2^1024.
pub const ID_BYTES: usize = 128;

/// A position on the identifier circle.
///
/// Stored big-endian, so the derived lexicographic ordering is the numeric
/// ordering of the underlying unsigned integer. Every node on the ring must
/// use the same width for placement to agree.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(#[serde(with = "BigArray")] pub [u8; ID_BYTES]);

impl NodeId {
    /// The identifier at position zero.
    pub fn zero() -> Self {
        NodeId([0u8; ID_BYTES])
    }

    /// Computes `(self + 2^exp) mod 2^1024`.
    pub fn add_pow2(&self, exp: u32) -> NodeId {
        let mut out = self.0;
        if exp as usize >= ID_BYTES * 8 {
            // 2^exp is a multiple of the ring size; adding it is a no-op.
            return NodeId(out);
        }
        let mut idx = ID_BYTES - 1 - (exp as usize / 8);
        let mut sum = out[idx] as u16 + (1u16 << (exp % 8));
        out[idx] = sum as u8;
        while sum > 0xff && idx > 0 {
            idx -= 1;
            sum = out[idx] as u16 + 1;
            out[idx] = sum as u8;
        }
        // Carry past the top byte wraps around the ring.
        NodeId(out)
    }

    /// Clockwise arc membership: `x` lies in `(lo, hi]` modulo the ring size.
    ///
    /// With `lo = hi` the arc spans the entire circle.
    pub fn in_arc(lo: &NodeId, hi: &NodeId, x: &NodeId) -> bool {
        if lo < hi {
            lo < x && x <= hi
        } else if lo > hi {
            x > lo || x <= hi
        } else {
            true
        }
    }

    /// Clockwise arc membership with both endpoints excluded: `x ∈ (lo, hi)`.
    pub fn in_open_arc(lo: &NodeId, hi: &NodeId, x: &NodeId) -> bool {
        x != hi && Self::in_arc(lo, hi, x)
    }

    /// Full hex rendering of the identifier.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..6] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..")
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

/// Network descriptor of a ring member.
///
/// Host and port are advisory routing metadata; identity is the id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Ring position, derived from hashing `host:port`.
    pub id: NodeId,
    /// Reachable host name or address.
    pub host: String,
    /// Reachable TCP port.
    pub port: u16,
}

impl Node {
    /// The `host:port` form used for dialing and for hashing.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

/// A single routing shortcut.
///
/// The `id` field is fixed at construction (`origin + 2^(index+1)`); only
/// the believed owner `node` is refreshed over time.
#[derive(Debug, Clone)]
pub struct Finger {
    /// Slot position in the table.
    pub index: usize,
    /// Ring position this shortcut targets.
    pub id: NodeId,
    /// Currently believed successor of `id`.
    pub node: Node,
}

/// The ordered sequence of routing shortcuts for one node.
#[derive(Debug, Clone)]
pub struct FingerTable {
    fingers: Vec<Finger>,
}

impl FingerTable {
    /// Builds the table for `origin` with `slots` entries, every entry
    /// initially pointing back at `origin`.
    pub fn new(origin: &Node, slots: usize) -> Self {
        let fingers = (0..slots)
            .map(|index| Finger {
                index,
                id: origin.id.add_pow2(index as u32 + 1),
                node: origin.clone(),
            })
            .collect();
        Self { fingers }
    }

    pub fn len(&self) -> usize {
        self.fingers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingers.is_empty()
    }

    /// Read access to the full table, in slot order.
    pub fn entries(&self) -> &[Finger] {
        &self.fingers
    }

    /// Replaces the believed owner of slot `index`.
    pub fn set_node(&mut self, index: usize, node: Node) {
        if let Some(finger) = self.fingers.get_mut(index) {
            finger.node = node;
        }
    }
}
