#![warn(missing_docs)]

//! Structural analysis of declarative call-permission conditions.
//!
//! A permission policy is expressed as a [`Condition`] tree: every node pairs
//! an [`Encoding`] (how the parameter it guards is represented inside raw
//! call data) with an [`Operator`] (the check applied to that parameter).
//! Before any raw bytes can be checked, the condition tree is *resolved* into
//! a [`Layout`]: a normalized skeleton recording only what a decoder needs to
//! locate values inside an encoded call. Resolution collapses logical
//! connectives, filters nodes that have no footprint in the encoding, and
//! detects variant positions whose branches cannot be unified into one shape.
//!
//! Resolved layouts can be serialized with [`pack`] into a compact byte form
//! suitable for caching, restored with [`unpack`], and identified by a
//! structural [`Fingerprint`] for cache keying:
//!
//! ```rust
//! use warden_topology::{Condition, Encoding, Operator, pack, resolve, unpack};
//!
//! let condition = Condition::new(
//!     Encoding::Calldata,
//!     Operator::Matches,
//!     vec![],
//!     vec![Condition::leaf(Encoding::Static, Operator::Pass)],
//! );
//!
//! let layout = resolve(&condition)?;
//! assert!(layout.children[0].inlined);
//! assert_eq!(unpack(&pack(&layout)?)?, layout);
//! # Ok::<(), warden_topology::WardenTopologyError>(())
//! ```

mod condition;
pub use condition::*;

mod encoding;
pub use encoding::*;

mod operator;
pub use operator::*;

mod flat;
pub use flat::*;

mod layout;
pub use layout::*;

mod topology;
pub use topology::*;

mod packed;
pub use packed::*;

mod fingerprint;
pub use fingerprint::*;

mod error;
pub use error::*;
