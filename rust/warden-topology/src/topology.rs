//! Derivation of [`Layout`]s from condition trees.
//!
//! Resolution runs bottom up: children resolve first, logical connectives
//! collapse into their children, and nodes without a call-data footprint are
//! filtered out. The result is the minimal skeleton the decoder needs, which
//! also serves as the identity for layout caching (see
//! [`fingerprint`](crate::fingerprint)).

use crate::{Condition, Encoding, Layout, Operator, WardenTopologyError};

/// Resolves a condition tree into its decode-ready [`Layout`].
///
/// Fails with [`WardenTopologyError::UnsuitableChildCount`] when the tree has
/// no structural content at all, and with
/// [`WardenTopologyError::UnsuitableChildTypeTree`] when sibling branches
/// cannot share one position in the encoding. Both are policy-configuration
/// errors; evaluation never proceeds past them.
pub fn resolve(condition: &Condition) -> Result<Layout, WardenTopologyError> {
    resolve_structural(condition)?.ok_or(WardenTopologyError::UnsuitableChildCount)
}

/// Resolves one condition node, yielding `None` for nodes that occupy no
/// position in the encoded call.
///
/// Non-structural nodes are: allowance checks that read call metadata
/// (`EtherWithinAllowance`, `CallWithinAllowance`), `None`-encoding nodes
/// that are not connectives, and connectives whose children are all
/// non-structural. `WithinAllowance` reads an actual parameter and keeps its
/// `Static` footprint.
pub fn resolve_structural(condition: &Condition) -> Result<Option<Layout>, WardenTopologyError> {
    if matches!(
        condition.operator,
        Operator::EtherWithinAllowance | Operator::CallWithinAllowance
    ) {
        return Ok(None);
    }

    match condition.encoding {
        Encoding::None => {
            if !condition.operator.is_connective() {
                return Ok(None);
            }
            let mut children = resolve_children(&condition.children)?;
            match children.len() {
                0 => Ok(None),
                1 => Ok(children.pop()),
                _ => unify(children).map(Some),
            }
        }
        Encoding::Static => Ok(Some(Layout::word())),
        Encoding::Dynamic => Ok(Some(Layout::bytes())),
        Encoding::EtherValue => Ok(Some(Layout::ether_value())),
        Encoding::Tuple => {
            let children = resolve_children(&condition.children)?;
            if children.is_empty() {
                return Err(WardenTopologyError::UnsuitableChildCount);
            }
            Ok(Some(Layout::tuple(children)))
        }
        Encoding::Array => resolve_array(condition).map(Some),
        Encoding::Calldata => {
            let children = resolve_children(&condition.children)?;
            Ok(Some(Layout::calldata(children)))
        }
        Encoding::AbiEncoded => {
            let children = resolve_children(&condition.children)?;
            let leading_bytes = leading_bytes(&condition.comp_value)?;
            Ok(Some(Layout::abi_encoded(leading_bytes, children)))
        }
    }
}

fn resolve_children(children: &[Condition]) -> Result<Vec<Layout>, WardenTopologyError> {
    let mut resolved = Vec::with_capacity(children.len());
    for child in children {
        if let Some(layout) = resolve_structural(child)? {
            resolved.push(layout);
        }
    }
    Ok(resolved)
}

fn resolve_array(condition: &Condition) -> Result<Layout, WardenTopologyError> {
    let children = resolve_children(&condition.children)?;
    match condition.operator {
        // Quantified operators apply one template condition per element.
        Operator::ArraySome | Operator::ArrayEvery => {
            if children.len() != 1 {
                return Err(WardenTopologyError::UnsuitableChildCount);
            }
            Ok(Layout::array(children))
        }
        // Subset pairing only makes sense over one shared element shape.
        Operator::ArraySubset => {
            if children.is_empty() {
                return Err(WardenTopologyError::UnsuitableChildCount);
            }
            if !homogeneous(&children) {
                return Err(WardenTopologyError::UnsuitableChildTypeTree);
            }
            Ok(Layout::array(vec![children[0].clone()]))
        }
        _ => match children.len() {
            0 => Err(WardenTopologyError::UnsuitableChildCount),
            1 => Ok(Layout::array(children)),
            _ => {
                if homogeneous(&children) {
                    Ok(Layout::array(vec![children[0].clone()]))
                } else {
                    // Heterogeneous positions stay one child per element,
                    // never deduplicated: element N pairs with child N.
                    compatible(&children)?;
                    Ok(Layout::array(children))
                }
            }
        },
    }
}

/// Collapses sibling branch layouts into one position: identical branches
/// share their common layout, distinct branches of one shape class become a
/// variant wrapper, anything else cannot be decoded consistently.
fn unify(children: Vec<Layout>) -> Result<Layout, WardenTopologyError> {
    if homogeneous(&children) {
        children
            .into_iter()
            .next()
            .ok_or(WardenTopologyError::UnsuitableChildCount)
    } else {
        compatible(&children)?;
        Ok(Layout::variant(children))
    }
}

fn homogeneous(children: &[Layout]) -> bool {
    children.iter().all(|child| child == &children[0])
}

/// Coarse shape classes for deciding whether sibling layouts can share a
/// position. Byte-string shapes are mutually equivalent regardless of what
/// their content re-decodes to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Word,
    Bytes,
    Group,
    Sequence,
    Ether,
}

fn shape(layout: &Layout) -> Result<Shape, WardenTopologyError> {
    match layout.encoding {
        Encoding::Static => Ok(Shape::Word),
        Encoding::Dynamic | Encoding::Calldata | Encoding::AbiEncoded => Ok(Shape::Bytes),
        Encoding::Tuple => Ok(Shape::Group),
        Encoding::Array => Ok(Shape::Sequence),
        Encoding::EtherValue => Ok(Shape::Ether),
        Encoding::None => Err(WardenTopologyError::UnsuitableChildTypeTree),
    }
}

fn compatible(children: &[Layout]) -> Result<(), WardenTopologyError> {
    let first = shape(&children[0])?;
    for child in &children[1..] {
        if shape(child)? != first {
            return Err(WardenTopologyError::UnsuitableChildTypeTree);
        }
    }
    Ok(())
}

/// Leading byte counts are declared as a big-endian two byte value; an empty
/// declaration selects the conventional four byte selector. Comparison
/// values of any other length belong to the node's operator and leave the
/// default in place.
fn leading_bytes(comp_value: &[u8]) -> Result<usize, WardenTopologyError> {
    match comp_value {
        [hi, lo] => {
            let declared = usize::from(u16::from_be_bytes([*hi, *lo]));
            if declared > 32 {
                return Err(WardenTopologyError::LeadingBytesOutOfRange { declared });
            }
            Ok(declared)
        }
        _ => Ok(4),
    }
}
