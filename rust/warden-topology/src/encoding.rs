use serde::{Deserialize, Serialize};

/// How a condition's parameter is represented inside an encoded call.
///
/// The set is closed: each decodable kind maps to exactly one traversal rule
/// in the decoder, and the resolver's inlining rules are fixed per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// The node carries no parameter of its own. Used by logical connectives
    /// and by checks that read call metadata instead of call data.
    None,
    /// A fixed-width value occupying exactly one 32 byte word.
    Static,
    /// A length-prefixed byte string reached through offset indirection.
    Dynamic,
    /// An ordered, fixed-arity group of values.
    Tuple,
    /// A length-prefixed sequence of uniformly shaped elements.
    Array,
    /// A complete embedded call: a four byte selector followed by an encoded
    /// parameter frame.
    Calldata,
    /// A re-encoded payload with a configurable number of leading bytes
    /// before its parameter frame begins.
    AbiEncoded,
    /// The native-token amount attached to the call rather than a value in
    /// the call data itself. Occupies no call-data bytes.
    EtherValue,
}
