use warden_decoder::WardenDecoderError;

use crate::AllowanceKey;

/// Why a well-formed call was rejected by the policy.
///
/// Every variant carries enough context to present a meaningful rejection:
/// the pre-order index of the condition node that rejected, or the allowance
/// key that ran dry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// An equality, membership, slice or `Nor` check failed.
    ParameterNotAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// A `LessThan` parameter was too large.
    ParameterGreaterThanAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// A `GreaterThan` parameter was too small.
    ParameterLessThanAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// A structural match failed: wrong arity or an unmatched variant
    /// branch.
    ParameterNotAMatch {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// No array element satisfied the child condition.
    ParameterNotOneOfAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// Some array element failed the child condition.
    NotEveryArrayElementPasses {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// Array elements could not be paired with distinct allowed entries.
    ParameterNotSubsetOfAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// Every branch of a disjunction failed.
    OrViolation {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// A masked word comparison failed.
    BitmaskNotAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// The configured bitmask range extends past the value.
    BitmaskOverflow {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// A masked byte-range comparison failed.
    BytemaskNotAllowed {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// The configured bytemask range extends past the value.
    BytemaskOverflow {
        /// Pre-order index of the rejecting node.
        at: usize,
    },
    /// A spend exceeded the available allowance balance, cumulatively
    /// within this evaluation.
    AllowanceExceeded {
        /// The allowance that ran dry.
        key: AllowanceKey,
    },
    /// More calls than the allowance permits.
    CallAllowanceExceeded {
        /// The allowance that ran dry.
        key: AllowanceKey,
    },
}

/// Why a call was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The raw bytes do not fit the shape the policy declares.
    Decode(WardenDecoderError),
    /// The call is well formed but the policy disallows it.
    Violation(Violation),
}

/// The outcome of evaluating a call against a policy.
///
/// The host aborts the forwarded call entirely on any rejection; there is no
/// partial execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The call satisfies the policy. Allowance debits were committed.
    Accept,
    /// The call was rejected. The ledger is untouched.
    Reject(Rejection),
}
