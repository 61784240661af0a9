#![warn(missing_docs)]

//! Policy evaluation over decoded call data.
//!
//! This crate ties the other two together: a call's raw bytes are decoded
//! against the layout its condition tree resolves to, then the tree is
//! walked over the resulting payloads. Comparison nodes check plucked
//! bytes, connectives combine their branches, and allowance nodes debit a
//! ledger through a staged overlay that only commits when the whole call
//! is accepted.
//!
//! ```
//! use warden_engine::{Call, MemoryLedger, Verdict, evaluate};
//! use warden_topology::{Condition, Encoding, Operator};
//!
//! let condition = Condition::new(
//!     Encoding::Calldata,
//!     Operator::Matches,
//!     vec![],
//!     vec![Condition::with_value(
//!         Encoding::Static,
//!         Operator::EqualTo,
//!         vec![0; 32],
//!     )],
//! );
//!
//! let mut data = vec![0xca, 0x11, 0xab, 0x1e];
//! data.extend([0u8; 32]);
//!
//! let call = Call {
//!     data: &data,
//!     value: 0,
//!     timestamp: 0,
//! };
//! let mut ledger = MemoryLedger::default();
//! assert_eq!(evaluate(&condition, &call, &mut ledger)?, Verdict::Accept);
//! # Ok::<(), warden_engine::WardenEngineError>(())
//! ```

mod allowance;
mod compare;
mod error;
mod evaluate;
mod ledger;
mod verdict;

pub use allowance::*;
pub use error::*;
pub use evaluate::*;
pub use ledger::{AllowanceKey, AllowanceLedger, MemoryLedger};
pub use verdict::*;

pub(crate) use ledger::LedgerStage;
