use thiserror::Error;
use warden_topology::WardenTopologyError;

/// Policy-configuration errors: the condition tree itself is unusable.
///
/// These are surfaced to whoever authored the policy and are distinct from
/// rejections — evaluation never proceeds past them, and they never mean
/// anything about the call under evaluation. `at` is the pre-order index of
/// the offending condition node.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WardenEngineError {
    /// The condition tree could not be resolved into a decodable layout.
    #[error("Unresolvable condition tree: {0}")]
    Topology(#[from] WardenTopologyError),

    /// The condition tree's root does not describe a whole encoded call.
    #[error("Root condition cannot describe an encoded call")]
    UnsuitableRoot,

    /// A bitmask comparison value does not parse as shift, mask and
    /// expected halves.
    #[error("Malformed bitmask comparison value at node {at}")]
    MalformedBitmask {
        /// Pre-order index of the offending node.
        at: usize,
    },

    /// A bytemask comparison value's header contradicts its length.
    #[error("Malformed bytemask comparison value at node {at}")]
    MalformedBytemask {
        /// Pre-order index of the offending node.
        at: usize,
    },

    /// A slice comparison value's header contradicts its length.
    #[error("Malformed slice comparison value at node {at}")]
    MalformedSlice {
        /// Pre-order index of the offending node.
        at: usize,
    },

    /// An allowance operator's comparison value is not a 32 byte key.
    #[error("Malformed allowance key at node {at}")]
    MalformedAllowanceKey {
        /// Pre-order index of the offending node.
        at: usize,
    },

    /// A word comparison's expected value is not exactly 32 bytes.
    #[error("Malformed comparison value at node {at}")]
    MalformedComparisonValue {
        /// Pre-order index of the offending node.
        at: usize,
    },

    /// An operator was declared on an encoding it cannot apply to.
    #[error("Operator cannot apply to the declared encoding at node {at}")]
    UnsuitableOperator {
        /// Pre-order index of the offending node.
        at: usize,
    },
}
