use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Condition, Encoding, Operator, WardenTopologyError};

/// One entry of a flattened condition tree.
///
/// The flattened form carries the same information as [`Condition`] with
/// parent links instead of child lists: entries are ordered breadth first and
/// each names the index of its parent. The root sits at index zero and is its
/// own parent. This is the interchange form used by policy storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCondition {
    /// Index of this entry's parent; the root entry points at itself.
    pub parent: usize,
    /// How the guarded parameter is represented in the encoded call.
    pub encoding: Encoding,
    /// The check applied at this position.
    pub operator: Operator,
    /// Operator-specific configuration bytes.
    #[serde(default)]
    pub comp_value: Vec<u8>,
}

/// Flattens a condition tree into breadth-first entries with parent links.
pub fn flatten(root: &Condition) -> Vec<FlatCondition> {
    let mut entries = Vec::with_capacity(root.node_count());
    let mut queue = VecDeque::from([(root, 0usize)]);
    while let Some((node, parent)) = queue.pop_front() {
        let index = entries.len();
        entries.push(FlatCondition {
            parent,
            encoding: node.encoding,
            operator: node.operator,
            comp_value: node.comp_value.clone(),
        });
        for child in &node.children {
            queue.push_back((child, index));
        }
    }
    entries
}

/// Rebuilds a condition tree from its flattened form.
///
/// Entries must be breadth-first ordered: every entry's parent index must be
/// strictly smaller than its own, except the root which points at itself.
pub fn unflatten(entries: &[FlatCondition]) -> Result<Condition, WardenTopologyError> {
    if entries.is_empty() {
        return Err(WardenTopologyError::EmptyConditionTree);
    }
    if entries[0].parent != 0 {
        return Err(WardenTopologyError::InvalidParentIndex {
            index: 0,
            parent: entries[0].parent,
        });
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    for (index, entry) in entries.iter().enumerate().skip(1) {
        if entry.parent >= index {
            return Err(WardenTopologyError::InvalidParentIndex {
                index,
                parent: entry.parent,
            });
        }
        children[entry.parent].push(index);
    }

    Ok(build(entries, &children, 0))
}

fn build(entries: &[FlatCondition], children: &[Vec<usize>], index: usize) -> Condition {
    let entry = &entries[index];
    Condition {
        encoding: entry.encoding,
        operator: entry.operator,
        comp_value: entry.comp_value.clone(),
        children: children[index]
            .iter()
            .map(|&child| build(entries, children, child))
            .collect(),
    }
}
