use serde::{Deserialize, Serialize};

use crate::Encoding;

/// The decode-ready skeleton derived from a condition tree.
///
/// A layout records only what is needed to locate values inside an encoded
/// call: the encoding kind at each position, whether the value sits inline in
/// its parent frame's head region, how many leading bytes precede an embedded
/// parameter frame, and the child layouts. Comparison values and operators do
/// not appear; two conditions that check different things over the same shape
/// resolve to the same layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// The encoding kind at this position.
    pub encoding: Encoding,
    /// True when the value occupies a fixed-size slot in its parent frame's
    /// head region with no offset indirection.
    pub inlined: bool,
    /// Bytes to skip before an embedded parameter frame begins; nonzero only
    /// for [`Encoding::Calldata`] and [`Encoding::AbiEncoded`].
    pub leading_bytes: usize,
    /// Child layouts. For arrays, a single child is the element template and
    /// several children declare one element position each.
    pub children: Vec<Layout>,
}

impl Layout {
    /// A single 32 byte word.
    pub fn word() -> Self {
        Layout {
            encoding: Encoding::Static,
            inlined: true,
            leading_bytes: 0,
            children: vec![],
        }
    }

    /// A length-prefixed byte string.
    pub fn bytes() -> Self {
        Layout {
            encoding: Encoding::Dynamic,
            inlined: false,
            leading_bytes: 0,
            children: vec![],
        }
    }

    /// The call's attached native-token amount; occupies no call-data bytes.
    pub fn ether_value() -> Self {
        Layout {
            encoding: Encoding::EtherValue,
            inlined: true,
            leading_bytes: 0,
            children: vec![],
        }
    }

    /// A group of values, inlined only when every member is.
    pub fn tuple(children: Vec<Layout>) -> Self {
        let inlined = children.iter().all(|child| child.inlined);
        Layout {
            encoding: Encoding::Tuple,
            inlined,
            leading_bytes: 0,
            children,
        }
    }

    /// An array carrying one template child, or one child per declared
    /// element position when the positions differ in shape.
    pub fn array(children: Vec<Layout>) -> Self {
        Layout {
            encoding: Encoding::Array,
            inlined: false,
            leading_bytes: 0,
            children,
        }
    }

    /// An embedded call: four selector bytes, then a parameter frame.
    pub fn calldata(children: Vec<Layout>) -> Self {
        Layout {
            encoding: Encoding::Calldata,
            inlined: false,
            leading_bytes: 4,
            children,
        }
    }

    /// A re-encoded payload with `leading_bytes` skipped before its frame.
    pub fn abi_encoded(leading_bytes: usize, children: Vec<Layout>) -> Self {
        Layout {
            encoding: Encoding::AbiEncoded,
            inlined: false,
            leading_bytes,
            children,
        }
    }

    /// A variant position whose branches could not be unified into one
    /// shape. Branches keep their declaration order.
    pub fn variant(children: Vec<Layout>) -> Self {
        Layout {
            encoding: Encoding::Dynamic,
            inlined: false,
            leading_bytes: 0,
            children,
        }
    }

    /// True for the synthetic wrapper produced when sibling branches resolve
    /// to distinct shapes.
    pub fn is_variant(&self) -> bool {
        self.encoding == Encoding::Dynamic && !self.children.is_empty()
    }

    /// The number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Layout::node_count).sum::<usize>()
    }
}
