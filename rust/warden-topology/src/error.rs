use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WardenTopologyError {
    /// A structural container resolved to zero usable children, or the whole
    /// tree carries no structural content.
    #[error("Structural node has no usable children")]
    UnsuitableChildCount,

    /// Sibling branches resolved to shapes that cannot share one position in
    /// the encoding.
    #[error("Sibling branches cannot be reconciled into one decodable shape")]
    UnsuitableChildTypeTree,

    /// An embedded payload declared more leading bytes than one word can
    /// address.
    #[error("Declared leading byte count {declared} exceeds 32")]
    LeadingBytesOutOfRange {
        /// The declared leading byte count.
        declared: usize,
    },

    /// A layout carries more nodes than the packed form can index.
    #[error("Layout with {nodes} nodes exceeds the packed form's capacity")]
    OversizedLayout {
        /// The layout's node count.
        nodes: usize,
    },

    /// A flattened condition tree had no entries.
    #[error("Flattened condition tree is empty")]
    EmptyConditionTree,

    /// A flattened entry referenced a parent at or after its own position.
    #[error("Entry {index} references invalid parent {parent}")]
    InvalidParentIndex {
        /// Position of the offending entry.
        index: usize,
        /// The parent index it declared.
        parent: usize,
    },

    /// A packed layout buffer could not be decoded.
    #[error("Malformed packed layout: {0}")]
    MalformedPackedLayout(String),
}
