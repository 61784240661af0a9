//! Compact serialization of [`Layout`] trees.
//!
//! Resolved layouts are cached between evaluations, so the packed form
//! favors density: one two byte count, then a fixed four byte record per
//! node. Nodes are ordered breadth first; entry zero is the root and is its
//! own parent, and every other entry's parent index is strictly smaller than
//! its own. All integers are big endian.
//!
//! ```text
//! ┌───────────┬──────────┬──────────┬─────
//! │ count u16 │  node 0  │  node 1  │ ...
//! └───────────┴──────────┴──────────┴─────
//!
//! each node:
//! ┌────────────┬─────────────────────┬─────────────┐
//! │ parent u16 │ tag u8              │ leading u8  │
//! │            │  bits 7..1: kind    │             │
//! │            │  bit  0:    inlined │             │
//! └────────────┴─────────────────────┴─────────────┘
//! ```
//!
//! [`unpack`] is the exact inverse of [`pack`]; layouts the packed form
//! cannot represent and malformed buffers are rejected rather than handled
//! partially.

use std::collections::VecDeque;

use crate::{Encoding, Layout, WardenTopologyError};

const HEADER_SIZE: usize = 2;
const NODE_SIZE: usize = 4;

fn kind_tag(encoding: Encoding) -> u8 {
    match encoding {
        Encoding::Static => 0,
        Encoding::Dynamic => 1,
        Encoding::Tuple => 2,
        Encoding::Array => 3,
        Encoding::Calldata => 4,
        Encoding::AbiEncoded => 5,
        Encoding::EtherValue => 6,
        // Never present in a resolved layout; reserved in the packed form.
        Encoding::None => 7,
    }
}

fn kind_from_tag(tag: u8) -> Option<Encoding> {
    match tag {
        0 => Some(Encoding::Static),
        1 => Some(Encoding::Dynamic),
        2 => Some(Encoding::Tuple),
        3 => Some(Encoding::Array),
        4 => Some(Encoding::Calldata),
        5 => Some(Encoding::AbiEncoded),
        6 => Some(Encoding::EtherValue),
        _ => None,
    }
}

/// Serializes a layout tree into its packed byte form.
///
/// Fails when the layout exceeds what the packed form can represent: more
/// than `u16::MAX` nodes, or a leading byte count over 32. The resolver
/// never emits out-of-range leading bytes, but node counts are bounded only
/// by the condition tree, so callers packing resolved layouts still see
/// this error for enormous trees.
pub fn pack(layout: &Layout) -> Result<Vec<u8>, WardenTopologyError> {
    let count = layout.node_count();
    if count > usize::from(u16::MAX) {
        return Err(WardenTopologyError::OversizedLayout { nodes: count });
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + count * NODE_SIZE);
    bytes.extend((count as u16).to_be_bytes());

    let mut queue = VecDeque::from([(layout, 0u16)]);
    let mut next_index = 0u16;
    while let Some((node, parent)) = queue.pop_front() {
        let index = next_index;
        next_index += 1;

        if node.leading_bytes > 32 {
            return Err(WardenTopologyError::LeadingBytesOutOfRange {
                declared: node.leading_bytes,
            });
        }
        bytes.extend(parent.to_be_bytes());
        bytes.push(kind_tag(node.encoding) << 1 | u8::from(node.inlined));
        bytes.push(node.leading_bytes as u8);

        for child in &node.children {
            queue.push_back((child, index));
        }
    }
    Ok(bytes)
}

/// Deserializes a packed layout, reconstructing parent/child associations
/// purely from the buffer.
pub fn unpack(bytes: &[u8]) -> Result<Layout, WardenTopologyError> {
    if bytes.len() < HEADER_SIZE {
        return Err(malformed("buffer shorter than its header"));
    }
    let count = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
    if count == 0 {
        return Err(malformed("zero node count"));
    }
    if bytes.len() != HEADER_SIZE + count * NODE_SIZE {
        return Err(malformed("buffer length does not match node count"));
    }

    let mut nodes = Vec::with_capacity(count);
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for index in 0..count {
        let at = HEADER_SIZE + index * NODE_SIZE;
        let parent = usize::from(u16::from_be_bytes([bytes[at], bytes[at + 1]]));
        let tag = bytes[at + 2];
        let leading_bytes = usize::from(bytes[at + 3]);

        if index == 0 {
            if parent != 0 {
                return Err(malformed("root is not its own parent"));
            }
        } else if parent >= index {
            return Err(malformed(format!(
                "entry {index} references parent {parent} out of order"
            )));
        }

        let encoding = kind_from_tag(tag >> 1)
            .ok_or_else(|| malformed(format!("unknown encoding tag {}", tag >> 1)))?;
        let inlined = tag & 1 == 1;

        match encoding {
            Encoding::Static | Encoding::EtherValue if !inlined => {
                return Err(malformed("fixed-size node without its inlined flag"));
            }
            Encoding::Dynamic | Encoding::Array | Encoding::Calldata | Encoding::AbiEncoded
                if inlined =>
            {
                return Err(malformed("offset-addressed node marked inlined"));
            }
            _ => {}
        }
        if leading_bytes > 32 {
            return Err(malformed("leading byte count exceeds 32"));
        }
        if leading_bytes != 0 && !matches!(encoding, Encoding::Calldata | Encoding::AbiEncoded) {
            return Err(malformed("leading bytes on a non-embedded node"));
        }

        nodes.push((encoding, inlined, leading_bytes));
        if index > 0 {
            children[parent].push(index);
        }
    }

    // Children sit after their parents in breadth-first order, so a reverse
    // sweep sees every child before the tuple that contains it.
    for index in (0..count).rev() {
        let (encoding, inlined, _) = nodes[index];
        if encoding == Encoding::Tuple {
            let expected = children[index].iter().all(|&child| nodes[child].1);
            if inlined != expected {
                return Err(malformed("tuple inlined flag contradicts its members"));
            }
        }
    }

    Ok(build(&nodes, &children, 0))
}

fn build(nodes: &[(Encoding, bool, usize)], children: &[Vec<usize>], index: usize) -> Layout {
    let (encoding, inlined, leading_bytes) = nodes[index];
    Layout {
        encoding,
        inlined,
        leading_bytes,
        children: children[index]
            .iter()
            .map(|&child| build(nodes, children, child))
            .collect(),
    }
}

fn malformed(reason: impl Into<String>) -> WardenTopologyError {
    WardenTopologyError::MalformedPackedLayout(reason.into())
}
