use std::collections::HashMap;

use crate::Allowance;

/// Identifies one allowance record in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllowanceKey([u8; 32]);

impl AllowanceKey {
    /// The raw key bytes.
    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for AllowanceKey {
    fn from(value: [u8; 32]) -> Self {
        AllowanceKey(value)
    }
}

/// Small-integer keys, right-aligned into the 32 byte form.
impl From<u64> for AllowanceKey {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        AllowanceKey(bytes)
    }
}

/// Read and write access to allowance records.
///
/// The engine never writes to a ledger while a tree walk is in progress:
/// debits accumulate in a staged overlay and are written back only when the
/// whole evaluation accepts.
pub trait AllowanceLedger {
    /// The record stored under `key`, if any.
    fn allowance(&self, key: &AllowanceKey) -> Option<Allowance>;

    /// Stores `record` under `key`.
    fn set_allowance(&mut self, key: AllowanceKey, record: Allowance);
}

/// An in-memory ledger, suitable for tests and embedding hosts.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    records: HashMap<AllowanceKey, Allowance>,
}

impl AllowanceLedger for MemoryLedger {
    fn allowance(&self, key: &AllowanceKey) -> Option<Allowance> {
        self.records.get(key).copied()
    }

    fn set_allowance(&mut self, key: AllowanceKey, record: Allowance) {
        self.records.insert(key, record);
    }
}

/// Debits staged during one evaluation, checked against a frozen view of the
/// underlying ledger. Repeated references to one key within an evaluation
/// see the progressively debited copy, so cumulative overspend fails even
/// though nothing has been written back yet.
pub(crate) struct LedgerStage<'a, L: AllowanceLedger> {
    base: &'a L,
    staged: HashMap<AllowanceKey, Allowance>,
}

impl<'a, L: AllowanceLedger> LedgerStage<'a, L> {
    pub(crate) fn new(base: &'a L) -> Self {
        LedgerStage {
            base,
            staged: HashMap::new(),
        }
    }

    /// Debits `spend` under `key`, returning false when the available
    /// balance does not cover it. A key with no record has nothing to spend.
    pub(crate) fn debit(&mut self, key: AllowanceKey, spend: u128, now: u64) -> bool {
        let current = self
            .staged
            .get(&key)
            .copied()
            .or_else(|| self.base.allowance(&key))
            .unwrap_or_default();
        match current.debit(spend, now) {
            Some(updated) => {
                self.staged.insert(key, updated);
                true
            }
            None => false,
        }
    }

    /// A snapshot of the staged records, for speculative branch walks.
    pub(crate) fn snapshot(&self) -> HashMap<AllowanceKey, Allowance> {
        self.staged.clone()
    }

    /// Restores a previously taken snapshot, discarding newer debits.
    pub(crate) fn restore(&mut self, snapshot: HashMap<AllowanceKey, Allowance>) {
        self.staged = snapshot;
    }

    /// The staged records, ready to be written back on acceptance.
    pub(crate) fn into_records(self) -> HashMap<AllowanceKey, Allowance> {
        self.staged
    }
}
