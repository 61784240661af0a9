#![warn(missing_docs)]

//! Locates values inside raw encoded call data.
//!
//! The decoder never materializes typed values. Given a resolved
//! [`Layout`](warden_topology::Layout) and a raw buffer, [`inspect`] walks
//! the head/tail encoding convention and computes, for every structural
//! node, the absolute byte range its value occupies. [`pluck`] then extracts
//! literal byte slices from those ranges:
//!
//! ```rust
//! use warden_decoder::inspect;
//! use warden_topology::Layout;
//!
//! // selector ++ one word
//! let mut data = vec![0xde, 0xad, 0xbe, 0xef];
//! data.extend([0u8; 31]);
//! data.push(123);
//!
//! let layout = Layout::calldata(vec![Layout::word()]);
//! let payload = inspect(&data, &layout)?;
//! let word = payload.children[0].pluck(&data)?;
//! assert_eq!(word[31], 123);
//! # Ok::<(), warden_decoder::WardenDecoderError>(())
//! ```
//!
//! Failures are terminal: a buffer that is too short for a demanded word, an
//! unaddressable offset, or a variant position no declared branch fits all
//! abort the decode. There is no partial payload and no silent truncation.

mod decode;
pub use decode::*;

mod payload;
pub use payload::*;

mod error;
pub use error::*;
