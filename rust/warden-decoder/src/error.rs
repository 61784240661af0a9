use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WardenDecoderError {
    /// A read would extend past the end of the addressable region.
    #[error("Read of {size} bytes at {location} exceeds length {length}")]
    OutOfBounds {
        /// Absolute byte offset of the attempted read.
        location: usize,
        /// Number of bytes demanded.
        size: usize,
        /// Length of the addressable region.
        length: usize,
    },

    /// An offset or length word is too large to address any buffer.
    #[error("Word at {location} does not fit an addressable range")]
    WordOverflow {
        /// Absolute byte offset of the offending word.
        location: usize,
    },

    /// An array with declared element positions carried a different element
    /// count at runtime.
    #[error("Array carries {actual} elements but {declared} positions are declared")]
    ElementCountMismatch {
        /// Number of declared element positions.
        declared: usize,
        /// Element count read from the buffer.
        actual: usize,
    },

    /// None of a variant position's branches fit the bytes found there.
    #[error("No declared branch matches the bytes at {location}")]
    NoMatchingBranch {
        /// Absolute byte offset of the variant region.
        location: usize,
    },

    /// The root layout kind cannot describe a whole call-data buffer.
    #[error("Root layout must describe an encoded call")]
    UnsupportedRoot,

    /// The layout's inlining flags are inconsistent with its kinds. Layouts
    /// produced by the resolver or the unpacker never trip this.
    #[error("Layout inlining flags are inconsistent")]
    InconsistentLayout,
}
