use serde::{Deserialize, Serialize};

/// The check a condition applies to the parameter it guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Accept unconditionally.
    Pass,
    /// Accept when every child accepts.
    And,
    /// Accept when at least one child accepts.
    Or,
    /// Accept when no child accepts.
    Nor,
    /// Recurse into a structured parameter, matching children positionally.
    Matches,
    /// Accept when at least one array element satisfies the child condition.
    ArraySome,
    /// Accept when every array element satisfies the child condition.
    ArrayEvery,
    /// Accept when each array element satisfies a distinct child condition.
    ArraySubset,
    /// Byte-for-byte equality against the comparison value.
    EqualTo,
    /// Unsigned 256 bit strictly-greater-than against the comparison value.
    GreaterThan,
    /// Unsigned 256 bit strictly-less-than against the comparison value.
    LessThan,
    /// Masked comparison of the value bytes at a configured byte shift.
    Bitmask,
    /// Masked comparison of an explicit byte range within the value.
    Bytemask,
    /// Plain equality over an explicit byte range within the value.
    Slice,
    /// Debit the parameter's numeric value from a rate-limited allowance.
    WithinAllowance,
    /// Debit the call's attached native-token amount from an allowance.
    EtherWithinAllowance,
    /// Debit one unit per call from an allowance.
    CallWithinAllowance,
}

impl Operator {
    /// Logical connectives combine child verdicts and are transparent to the
    /// structural layout of the call.
    pub fn is_connective(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Nor)
    }
}
