//! The top-level policy evaluation walk.
//!
//! Evaluation pairs the condition tree with the payload tree the decoder
//! computed for the call: structural children of a frame consume payload
//! slots in order, non-structural children (allowance checks over call
//! metadata, placeholder nodes) ride along with their parent's payload.
//! Connective children whose structural layouts all agree share the
//! collapsed payload; when they differ, each branch is re-decoded at the
//! variant's location. Speculative walks snapshot the staged ledger so a
//! failed branch leaves no debits behind.

use warden_decoder::{Payload, WardenDecoderError, decode_at, inspect};
use warden_topology::{Condition, Encoding, Operator, resolve, resolve_structural};

use crate::{
    AllowanceKey, AllowanceLedger, LedgerStage, Rejection, Verdict, Violation, WardenEngineError,
    compare,
};

/// Everything known about the call under evaluation.
#[derive(Clone, Copy, Debug)]
pub struct Call<'a> {
    /// The raw encoded call data, selector included.
    pub data: &'a [u8],
    /// The native-token amount attached to the call.
    pub value: u128,
    /// Evaluation time in seconds, used for allowance refill.
    pub timestamp: u64,
}

impl Call<'_> {
    fn value_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&self.value.to_be_bytes());
        word
    }
}

/// Evaluates `call` against `condition`, committing allowance debits to
/// `ledger` only when the call is accepted.
///
/// The error type covers configuration problems only: an unusable condition
/// tree is the policy author's bug, never a statement about this call. A
/// call the policy disallows — or whose bytes do not fit the declared shape
/// — comes back as [`Verdict::Reject`] with the ledger untouched, so
/// re-evaluating with unchanged inputs always yields the same verdict.
pub fn evaluate<L: AllowanceLedger>(
    condition: &Condition,
    call: &Call<'_>,
    ledger: &mut L,
) -> Result<Verdict, WardenEngineError> {
    let layout = resolve(condition)?;
    tracing::trace!(nodes = condition.node_count(), "evaluating call");

    let payload = match inspect(call.data, &layout) {
        Ok(payload) => payload,
        // A root that cannot describe a call is the policy's bug, not a
        // statement about this call's bytes.
        Err(WardenDecoderError::UnsupportedRoot) => {
            return Err(WardenEngineError::UnsuitableRoot);
        }
        Err(error) => return Ok(Verdict::Reject(Rejection::Decode(error))),
    };

    let mut stage = LedgerStage::new(&*ledger);
    match check(call, &mut stage, condition, &payload, 0) {
        Ok(()) => {
            for (key, record) in stage.into_records() {
                ledger.set_allowance(key, record);
            }
            tracing::debug!("call accepted");
            Ok(Verdict::Accept)
        }
        Err(Failure::Violation(violation)) => {
            tracing::debug!(?violation, "call rejected");
            Ok(Verdict::Reject(Rejection::Violation(violation)))
        }
        Err(Failure::Decode(error)) => Ok(Verdict::Reject(Rejection::Decode(error))),
        Err(Failure::Config(error)) => Err(error),
    }
}

enum Failure {
    Config(WardenEngineError),
    Decode(WardenDecoderError),
    Violation(Violation),
}

impl From<Violation> for Failure {
    fn from(value: Violation) -> Self {
        Failure::Violation(value)
    }
}

impl From<WardenEngineError> for Failure {
    fn from(value: WardenEngineError) -> Self {
        Failure::Config(value)
    }
}

/// The payload one connective branch is checked against.
enum BranchPayload {
    /// The branch shares its parent's payload (non-structural branches and
    /// collapsed homogeneous branches).
    Parent,
    /// A variant branch re-decoded at the parent's location.
    Own(Payload),
    /// A variant branch whose layout does not fit the bytes.
    Unmatched,
}

fn check<L: AllowanceLedger>(
    call: &Call<'_>,
    stage: &mut LedgerStage<'_, L>,
    condition: &Condition,
    payload: &Payload,
    at: usize,
) -> Result<(), Failure> {
    match condition.operator {
        Operator::Pass => Ok(()),
        Operator::And => {
            for (branch_at, branch, slot) in branches(call, condition, payload, at)? {
                match slot {
                    BranchPayload::Parent => check(call, stage, branch, payload, branch_at)?,
                    BranchPayload::Own(own) => check(call, stage, branch, &own, branch_at)?,
                    BranchPayload::Unmatched => {
                        return Err(Violation::ParameterNotAMatch { at: branch_at }.into());
                    }
                }
            }
            Ok(())
        }
        Operator::Or => {
            let snapshot = stage.snapshot();
            for (branch_at, branch, slot) in branches(call, condition, payload, at)? {
                let result = match slot {
                    BranchPayload::Parent => check(call, stage, branch, payload, branch_at),
                    BranchPayload::Own(own) => check(call, stage, branch, &own, branch_at),
                    BranchPayload::Unmatched => {
                        Err(Violation::ParameterNotAMatch { at: branch_at }.into())
                    }
                };
                match result {
                    Ok(()) => return Ok(()),
                    Err(Failure::Violation(_)) => stage.restore(snapshot.clone()),
                    Err(other) => return Err(other),
                }
            }
            Err(Violation::OrViolation { at }.into())
        }
        Operator::Nor => {
            for (branch_at, branch, slot) in branches(call, condition, payload, at)? {
                let snapshot = stage.snapshot();
                let result = match slot {
                    BranchPayload::Parent => check(call, stage, branch, payload, branch_at),
                    BranchPayload::Own(own) => check(call, stage, branch, &own, branch_at),
                    BranchPayload::Unmatched => {
                        Err(Violation::ParameterNotAMatch { at: branch_at }.into())
                    }
                };
                stage.restore(snapshot);
                match result {
                    Ok(()) => return Err(Violation::ParameterNotAllowed { at }.into()),
                    Err(Failure::Violation(_)) => {}
                    Err(other) => return Err(other),
                }
            }
            Ok(())
        }
        Operator::Matches => check_matches(call, stage, condition, payload, at),
        Operator::ArraySome => {
            let (branch_at, branch) = template(condition, at)?;
            let snapshot = stage.snapshot();
            for element in &payload.children {
                match check(call, stage, branch, element, branch_at) {
                    Ok(()) => return Ok(()),
                    Err(Failure::Violation(_)) => stage.restore(snapshot.clone()),
                    Err(other) => return Err(other),
                }
            }
            Err(Violation::ParameterNotOneOfAllowed { at }.into())
        }
        Operator::ArrayEvery => {
            let (branch_at, branch) = template(condition, at)?;
            for element in &payload.children {
                match check(call, stage, branch, element, branch_at) {
                    Ok(()) => {}
                    Err(Failure::Violation(_)) => {
                        return Err(Violation::NotEveryArrayElementPasses { at }.into());
                    }
                    Err(other) => return Err(other),
                }
            }
            Ok(())
        }
        Operator::ArraySubset => {
            if condition.encoding != Encoding::Array {
                return Err(config_unsuitable(at));
            }
            let mut used = vec![false; condition.children.len()];
            for element in &payload.children {
                let mut matched = false;
                for (index, (branch_at, branch)) in indexed(condition, at).enumerate() {
                    if used[index] {
                        continue;
                    }
                    let snapshot = stage.snapshot();
                    match check(call, stage, branch, element, branch_at) {
                        Ok(()) => {
                            used[index] = true;
                            matched = true;
                            break;
                        }
                        Err(Failure::Violation(_)) => stage.restore(snapshot),
                        Err(other) => return Err(other),
                    }
                }
                if !matched {
                    return Err(Violation::ParameterNotSubsetOfAllowed { at }.into());
                }
            }
            Ok(())
        }
        Operator::EqualTo => {
            let word;
            let operand: &[u8] = if condition.encoding == Encoding::EtherValue {
                word = call.value_word();
                &word
            } else {
                payload.pluck(call.data).map_err(Failure::Decode)?
            };
            if operand == condition.comp_value.as_slice() {
                Ok(())
            } else {
                Err(Violation::ParameterNotAllowed { at }.into())
            }
        }
        Operator::GreaterThan => {
            let (operand, expected) = word_operands(call, condition, payload, at)?;
            if operand.as_slice() > expected {
                Ok(())
            } else {
                Err(Violation::ParameterLessThanAllowed { at }.into())
            }
        }
        Operator::LessThan => {
            let (operand, expected) = word_operands(call, condition, payload, at)?;
            if operand.as_slice() < expected {
                Ok(())
            } else {
                Err(Violation::ParameterGreaterThanAllowed { at }.into())
            }
        }
        Operator::Bitmask => {
            let value = value_bytes(call, condition, payload, at)?;
            match compare::bitmask(&condition.comp_value, &value) {
                None => Err(WardenEngineError::MalformedBitmask { at }.into()),
                Some(compare::Masked::Allowed) => Ok(()),
                Some(compare::Masked::NotAllowed) => {
                    Err(Violation::BitmaskNotAllowed { at }.into())
                }
                Some(compare::Masked::Overflow) => Err(Violation::BitmaskOverflow { at }.into()),
            }
        }
        Operator::Bytemask => {
            let value = value_bytes(call, condition, payload, at)?;
            match compare::bytemask(&condition.comp_value, &value) {
                None => Err(WardenEngineError::MalformedBytemask { at }.into()),
                Some(compare::Masked::Allowed) => Ok(()),
                Some(compare::Masked::NotAllowed) => {
                    Err(Violation::BytemaskNotAllowed { at }.into())
                }
                Some(compare::Masked::Overflow) => Err(Violation::BytemaskOverflow { at }.into()),
            }
        }
        Operator::Slice => {
            let value = value_bytes(call, condition, payload, at)?;
            match compare::slice(&condition.comp_value, &value) {
                None => Err(WardenEngineError::MalformedSlice { at }.into()),
                Some(true) => Ok(()),
                Some(false) => Err(Violation::ParameterNotAllowed { at }.into()),
            }
        }
        Operator::WithinAllowance => {
            if condition.encoding != Encoding::Static {
                return Err(config_unsuitable(at));
            }
            let key = allowance_key(condition, at)?;
            let word = payload.pluck(call.data).map_err(Failure::Decode)?;
            // Spends beyond the ledger's precision exceed any allowance.
            if word[..16].iter().any(|&byte| byte != 0) {
                return Err(Violation::AllowanceExceeded { key }.into());
            }
            let mut spend = [0u8; 16];
            spend.copy_from_slice(&word[16..]);
            debit(stage, key, u128::from_be_bytes(spend), call.timestamp, false)
        }
        Operator::EtherWithinAllowance => {
            let key = allowance_key(condition, at)?;
            debit(stage, key, call.value, call.timestamp, false)
        }
        Operator::CallWithinAllowance => {
            let key = allowance_key(condition, at)?;
            debit(stage, key, 1, call.timestamp, true)
        }
    }
}

fn check_matches<L: AllowanceLedger>(
    call: &Call<'_>,
    stage: &mut LedgerStage<'_, L>,
    condition: &Condition,
    payload: &Payload,
    at: usize,
) -> Result<(), Failure> {
    match condition.encoding {
        Encoding::Tuple | Encoding::Calldata | Encoding::AbiEncoded => {
            let mut slots = payload.children.iter();
            for (branch_at, branch) in indexed(condition, at) {
                let slot = if is_structural(branch)? {
                    slots
                        .next()
                        .ok_or(Violation::ParameterNotAMatch { at })?
                } else {
                    payload
                };
                check(call, stage, branch, slot, branch_at)?;
            }
            Ok(())
        }
        Encoding::Array => {
            let mut elements = payload.children.iter();
            for (branch_at, branch) in indexed(condition, at) {
                let slot = if is_structural(branch)? {
                    elements
                        .next()
                        .ok_or(Violation::ParameterNotAMatch { at })?
                } else {
                    payload
                };
                check(call, stage, branch, slot, branch_at)?;
            }
            // A positional match covers the whole array, no more elements.
            if elements.next().is_some() {
                return Err(Violation::ParameterNotAMatch { at }.into());
            }
            Ok(())
        }
        _ => Err(config_unsuitable(at)),
    }
}

/// Pairs every child of a connective with the payload it is checked
/// against. When all structural branches share one layout the parent's
/// payload already is that collapsed shape; otherwise each structural
/// branch is re-decoded at the variant's location.
fn branches<'c>(
    call: &Call<'_>,
    condition: &'c Condition,
    payload: &Payload,
    at: usize,
) -> Result<Vec<(usize, &'c Condition, BranchPayload)>, Failure> {
    let mut layouts = Vec::with_capacity(condition.children.len());
    for branch in &condition.children {
        layouts.push(resolve_structural(branch).map_err(topology)?);
    }
    let structural: Vec<_> = layouts.iter().flatten().collect();
    let shared = structural.windows(2).all(|pair| pair[0] == pair[1]);

    let mut paired = Vec::with_capacity(condition.children.len());
    for ((branch_at, branch), layout) in indexed(condition, at).zip(&layouts) {
        let slot = match layout {
            None => BranchPayload::Parent,
            Some(_) if shared => BranchPayload::Parent,
            Some(layout) => {
                // A variant branch at the top level is a whole-buffer
                // decode, not a length-prefixed tail.
                let decoded = if payload.location == 0
                    && payload.size == call.data.len()
                    && matches!(layout.encoding, Encoding::Calldata | Encoding::AbiEncoded)
                {
                    inspect(call.data, layout)
                } else {
                    decode_at(call.data, layout, payload.location)
                };
                match decoded {
                    Ok(own) => BranchPayload::Own(own),
                    Err(_) => BranchPayload::Unmatched,
                }
            }
        };
        paired.push((branch_at, branch, slot));
    }
    Ok(paired)
}

/// Iterates children together with their pre-order indices.
fn indexed<'c>(
    condition: &'c Condition,
    at: usize,
) -> impl Iterator<Item = (usize, &'c Condition)> {
    let mut branch_at = at + 1;
    condition.children.iter().map(move |child| {
        let current = branch_at;
        branch_at += child.node_count();
        (current, child)
    })
}

fn template<'c>(condition: &'c Condition, at: usize) -> Result<(usize, &'c Condition), Failure> {
    if condition.encoding != Encoding::Array || condition.children.len() != 1 {
        return Err(config_unsuitable(at));
    }
    Ok((at + 1, &condition.children[0]))
}

fn is_structural(condition: &Condition) -> Result<bool, Failure> {
    Ok(resolve_structural(condition).map_err(topology)?.is_some())
}

/// The raw bytes a masked or sliced comparison applies to: the word itself
/// for fixed-width values, the unpadded content for byte strings, the value
/// word for the attached amount.
fn value_bytes(
    call: &Call<'_>,
    condition: &Condition,
    payload: &Payload,
    at: usize,
) -> Result<Vec<u8>, Failure> {
    if condition.encoding == Encoding::EtherValue {
        return Ok(call.value_word().to_vec());
    }
    match payload.encoding {
        Encoding::Static => {
            let plucked = payload.pluck(call.data).map_err(Failure::Decode)?;
            Ok(plucked.to_vec())
        }
        Encoding::Dynamic | Encoding::Calldata | Encoding::AbiEncoded => {
            // Length-prefixed: strip the length word and the padding.
            let plucked = payload.pluck(call.data).map_err(Failure::Decode)?;
            let mut length = [0u8; 8];
            length.copy_from_slice(&plucked[24..32]);
            let length = u64::from_be_bytes(length) as usize;
            Ok(plucked[32..32 + length].to_vec())
        }
        _ => Err(config_unsuitable(at)),
    }
}

fn word_operands<'c>(
    call: &Call<'_>,
    condition: &'c Condition,
    payload: &Payload,
    at: usize,
) -> Result<([u8; 32], &'c [u8]), Failure> {
    if condition.comp_value.len() != 32 {
        return Err(WardenEngineError::MalformedComparisonValue { at }.into());
    }
    let operand = match condition.encoding {
        Encoding::EtherValue => call.value_word(),
        Encoding::Static => {
            let plucked = payload.pluck(call.data).map_err(Failure::Decode)?;
            let mut word = [0u8; 32];
            word.copy_from_slice(plucked);
            word
        }
        _ => return Err(config_unsuitable(at)),
    };
    Ok((operand, condition.comp_value.as_slice()))
}

fn allowance_key(condition: &Condition, at: usize) -> Result<AllowanceKey, Failure> {
    let bytes: [u8; 32] = condition
        .comp_value
        .as_slice()
        .try_into()
        .map_err(|_| WardenEngineError::MalformedAllowanceKey { at })?;
    Ok(AllowanceKey::from(bytes))
}

fn debit<L: AllowanceLedger>(
    stage: &mut LedgerStage<'_, L>,
    key: AllowanceKey,
    spend: u128,
    now: u64,
    per_call: bool,
) -> Result<(), Failure> {
    if stage.debit(key, spend, now) {
        Ok(())
    } else if per_call {
        Err(Violation::CallAllowanceExceeded { key }.into())
    } else {
        Err(Violation::AllowanceExceeded { key }.into())
    }
}

fn config_unsuitable(at: usize) -> Failure {
    Failure::Config(WardenEngineError::UnsuitableOperator { at })
}

fn topology(error: warden_topology::WardenTopologyError) -> Failure {
    Failure::Config(WardenEngineError::Topology(error))
}
