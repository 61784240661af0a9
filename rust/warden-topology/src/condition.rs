use serde::{Deserialize, Serialize};

use crate::{Encoding, Operator};

/// One node of a permission policy.
///
/// A condition pairs the [`Encoding`] of the parameter it guards with the
/// [`Operator`] applied at that position. `comp_value` carries the
/// operator-specific configuration: an expected value for comparisons, a
/// mask header for `Bitmask`/`Bytemask`/`Slice`, a 32 byte allowance key for
/// the allowance operators, or a leading-byte override for
/// [`Encoding::AbiEncoded`] nodes.
///
/// Condition trees are immutable inputs; resolution and evaluation never
/// mutate them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// How the guarded parameter is represented in the encoded call.
    pub encoding: Encoding,
    /// The check applied at this position.
    pub operator: Operator,
    /// Operator-specific configuration bytes.
    #[serde(default)]
    pub comp_value: Vec<u8>,
    /// Ordered child conditions.
    #[serde(default)]
    pub children: Vec<Condition>,
}

impl Condition {
    /// Creates a condition node.
    pub fn new(
        encoding: Encoding,
        operator: Operator,
        comp_value: Vec<u8>,
        children: Vec<Condition>,
    ) -> Self {
        Condition {
            encoding,
            operator,
            comp_value,
            children,
        }
    }

    /// A childless condition with no comparison value.
    pub fn leaf(encoding: Encoding, operator: Operator) -> Self {
        Condition::new(encoding, operator, vec![], vec![])
    }

    /// A childless condition carrying a comparison value.
    pub fn with_value(encoding: Encoding, operator: Operator, comp_value: Vec<u8>) -> Self {
        Condition::new(encoding, operator, comp_value, vec![])
    }

    /// The number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Condition::node_count)
            .sum::<usize>()
    }
}
