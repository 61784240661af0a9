use anyhow::Result;
use pretty_assertions::assert_eq;
use warden_decoder::WardenDecoderError;
use warden_engine::{
    Allowance, AllowanceKey, AllowanceLedger, Call, MemoryLedger, Rejection, Verdict, Violation,
    WardenEngineError, evaluate,
};
use warden_topology::{Condition, Encoding, Operator, WardenTopologyError};

const SELECTOR: [u8; 4] = [0xca, 0x11, 0xab, 0x1e];

fn word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn static_call(words: &[[u8; 32]]) -> Vec<u8> {
    let mut data = SELECTOR.to_vec();
    for word in words {
        data.extend(word);
    }
    data
}

/// A call with one dynamic argument: offset word, then the length-prefixed
/// padded content.
fn dynamic_call(content: &[u8]) -> Vec<u8> {
    let mut data = SELECTOR.to_vec();
    data.extend(word(32));
    data.extend(word(content.len() as u64));
    data.extend(content);
    data.resize(SELECTOR.len() + 64 + content.len().next_multiple_of(32), 0);
    data
}

/// A call with one `uint[]` argument.
fn array_call(elements: &[u64]) -> Vec<u8> {
    let mut data = SELECTOR.to_vec();
    data.extend(word(32));
    data.extend(word(elements.len() as u64));
    for element in elements {
        data.extend(word(*element));
    }
    data
}

fn matches_one(child: Condition) -> Condition {
    Condition::new(Encoding::Calldata, Operator::Matches, vec![], vec![child])
}

fn connective(operator: Operator, children: Vec<Condition>) -> Condition {
    Condition::new(Encoding::None, operator, vec![], children)
}

fn equal_to(value: u64) -> Condition {
    Condition::with_value(Encoding::Static, Operator::EqualTo, word(value).to_vec())
}

fn check(condition: &Condition, data: &[u8], ledger: &mut MemoryLedger) -> Result<Verdict> {
    let call = Call {
        data,
        value: 0,
        timestamp: 0,
    };
    Ok(evaluate(condition, &call, ledger)?)
}

fn violation(violation: Violation) -> Verdict {
    Verdict::Reject(Rejection::Violation(violation))
}

#[test]
fn accepts_a_matching_static_equality() -> Result<()> {
    let condition = matches_one(equal_to(7));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(7)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &static_call(&[word(8)]), &mut ledger)?,
        violation(Violation::ParameterNotAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn equality_over_dynamic_bytes_covers_the_length_prefixed_form() -> Result<()> {
    let mut expected = word(5).to_vec();
    expected.extend(b"hello");
    expected.resize(64, 0);
    let condition = matches_one(Condition::with_value(
        Encoding::Dynamic,
        Operator::EqualTo,
        expected,
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &dynamic_call(b"hello"), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &dynamic_call(b"jello"), &mut ledger)?,
        violation(Violation::ParameterNotAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn a_disjunction_accepts_any_passing_branch() -> Result<()> {
    let condition = matches_one(connective(Operator::Or, vec![equal_to(1), equal_to(2)]));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(2)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &static_call(&[word(3)]), &mut ledger)?,
        violation(Violation::OrViolation { at: 1 })
    );
    Ok(())
}

#[test]
fn a_negated_disjunction_rejects_any_passing_branch() -> Result<()> {
    let condition = matches_one(connective(Operator::Nor, vec![equal_to(5)]));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(6)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &static_call(&[word(5)]), &mut ledger)?,
        violation(Violation::ParameterNotAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn ordered_comparisons_report_which_side_failed() -> Result<()> {
    let greater = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::GreaterThan,
        word(10).to_vec(),
    ));
    let less = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::LessThan,
        word(10).to_vec(),
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&greater, &static_call(&[word(11)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&greater, &static_call(&[word(10)]), &mut ledger)?,
        violation(Violation::ParameterLessThanAllowed { at: 1 })
    );
    assert_eq!(
        check(&less, &static_call(&[word(9)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&less, &static_call(&[word(10)]), &mut ledger)?,
        violation(Violation::ParameterGreaterThanAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn an_ordered_comparison_needs_a_full_word() {
    let condition = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::GreaterThan,
        vec![10],
    ));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(11)]), &mut ledger)
            .unwrap_err()
            .downcast::<WardenEngineError>()
            .unwrap(),
        WardenEngineError::MalformedComparisonValue { at: 1 }
    );
}

#[test]
fn bitmask_checks_bits_within_the_word() -> Result<()> {
    // shift 0, mask 0xff over the first byte, expecting 0x12
    let condition = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::Bitmask,
        vec![0, 0, 0xff, 0x12],
    ));

    let mut masked = [0u8; 32];
    masked[0] = 0x12;

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[masked]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &static_call(&[word(0x12)]), &mut ledger)?,
        violation(Violation::BitmaskNotAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn bitmask_past_the_word_is_an_overflow_violation() -> Result<()> {
    // shift 31, two mask bytes: the range reaches byte 33 of a 32 byte word.
    let condition = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::Bitmask,
        vec![0, 31, 0xff, 0xff, 0, 0],
    ));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(0)]), &mut ledger)?,
        violation(Violation::BitmaskOverflow { at: 1 })
    );
    Ok(())
}

#[test]
fn bytemask_applies_to_unpadded_dynamic_content() -> Result<()> {
    // bytes 0..2 of the content must read "hi", any trailing bytes free.
    let condition = matches_one(Condition::with_value(
        Encoding::Dynamic,
        Operator::Bytemask,
        vec![0, 2, 0xff, 0xff, b'h', b'i'],
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &dynamic_call(b"hi there"), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &dynamic_call(b"ho there"), &mut ledger)?,
        violation(Violation::BytemaskNotAllowed { at: 1 })
    );
    // The mask ranges over the actual content, not its padding.
    assert_eq!(
        check(&condition, &dynamic_call(b"h"), &mut ledger)?,
        violation(Violation::BytemaskOverflow { at: 1 })
    );
    Ok(())
}

#[test]
fn slice_compares_an_exact_content_range() -> Result<()> {
    let condition = matches_one(Condition::with_value(
        Encoding::Dynamic,
        Operator::Slice,
        vec![1, 3, b'e', b'l'],
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &dynamic_call(b"hello"), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &dynamic_call(b"hollo"), &mut ledger)?,
        violation(Violation::ParameterNotAllowed { at: 1 })
    );
    assert_eq!(
        check(&condition, &dynamic_call(b"he"), &mut ledger)?,
        violation(Violation::ParameterNotAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn a_positional_array_match_covers_every_element() -> Result<()> {
    let condition = matches_one(Condition::new(
        Encoding::Array,
        Operator::Matches,
        vec![],
        vec![equal_to(1), equal_to(2)],
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &array_call(&[1, 2]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &array_call(&[1, 3]), &mut ledger)?,
        violation(Violation::ParameterNotAllowed { at: 3 })
    );
    // Extra elements beyond the declared positions do not match.
    assert_eq!(
        check(&condition, &array_call(&[1, 2, 2]), &mut ledger)?,
        violation(Violation::ParameterNotAMatch { at: 1 })
    );
    Ok(())
}

#[test]
fn array_some_needs_one_passing_element() -> Result<()> {
    let condition = matches_one(Condition::new(
        Encoding::Array,
        Operator::ArraySome,
        vec![],
        vec![equal_to(9)],
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &array_call(&[7, 8, 9]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &array_call(&[7, 8]), &mut ledger)?,
        violation(Violation::ParameterNotOneOfAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn array_every_needs_all_elements_to_pass() -> Result<()> {
    let condition = matches_one(Condition::new(
        Encoding::Array,
        Operator::ArrayEvery,
        vec![],
        vec![equal_to(9)],
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &array_call(&[9, 9]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &array_call(&[]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &array_call(&[9, 8]), &mut ledger)?,
        violation(Violation::NotEveryArrayElementPasses { at: 1 })
    );
    Ok(())
}

#[test]
fn array_subset_pairs_elements_with_distinct_entries() -> Result<()> {
    let condition = matches_one(Condition::new(
        Encoding::Array,
        Operator::ArraySubset,
        vec![],
        vec![equal_to(1), equal_to(2)],
    ));

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &array_call(&[2, 1]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &array_call(&[]), &mut ledger)?,
        Verdict::Accept
    );
    // Each entry may be consumed once.
    assert_eq!(
        check(&condition, &array_call(&[1, 1]), &mut ledger)?,
        violation(Violation::ParameterNotSubsetOfAllowed { at: 1 })
    );
    assert_eq!(
        check(&condition, &array_call(&[3]), &mut ledger)?,
        violation(Violation::ParameterNotSubsetOfAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn ether_value_nodes_compare_the_attached_amount() -> Result<()> {
    let condition = matches_one(Condition::with_value(
        Encoding::EtherValue,
        Operator::LessThan,
        word(1_000).to_vec(),
    ));

    let mut ledger = MemoryLedger::default();
    let data = SELECTOR.to_vec();
    let under = Call {
        data: &data,
        value: 999,
        timestamp: 0,
    };
    let over = Call {
        data: &data,
        value: 1_000,
        timestamp: 0,
    };
    assert_eq!(evaluate(&condition, &under, &mut ledger)?, Verdict::Accept);
    assert_eq!(
        evaluate(&condition, &over, &mut ledger)?,
        violation(Violation::ParameterGreaterThanAllowed { at: 1 })
    );
    Ok(())
}

#[test]
fn allowances_refill_then_debit_on_acceptance() -> Result<()> {
    let key = AllowanceKey::from(1u64);
    let condition = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::WithinAllowance,
        key.bytes().to_vec(),
    ));

    let mut ledger = MemoryLedger::default();
    ledger.set_allowance(
        key,
        Allowance {
            balance: 250,
            max_balance: u128::MAX,
            refill_amount: 100,
            refill_interval: 500,
            refill_timestamp: 1_000,
        },
    );

    // One whole interval elapsed by 1750: 350 available.
    let over = Call {
        data: &static_call(&[word(351)]),
        value: 0,
        timestamp: 1_750,
    };
    assert_eq!(
        evaluate(&condition, &over, &mut ledger)?,
        violation(Violation::AllowanceExceeded { key })
    );
    assert_eq!(ledger.allowance(&key).unwrap().balance, 250);

    let exact = Call {
        data: &static_call(&[word(350)]),
        value: 0,
        timestamp: 1_750,
    };
    assert_eq!(evaluate(&condition, &exact, &mut ledger)?, Verdict::Accept);
    let settled = ledger.allowance(&key).unwrap();
    assert_eq!(settled.balance, 0);
    assert_eq!(settled.refill_timestamp, 1_750);
    Ok(())
}

#[test]
fn cumulative_spends_against_one_allowance_cannot_overdraw() -> Result<()> {
    let key = AllowanceKey::from(2u64);
    // Two parameters both draw from the same allowance.
    let condition = Condition::new(
        Encoding::Calldata,
        Operator::Matches,
        vec![],
        vec![
            Condition::with_value(
                Encoding::Static,
                Operator::WithinAllowance,
                key.bytes().to_vec(),
            ),
            Condition::with_value(
                Encoding::Static,
                Operator::WithinAllowance,
                key.bytes().to_vec(),
            ),
        ],
    );

    let mut ledger = MemoryLedger::default();
    let record = Allowance {
        balance: 3_000,
        max_balance: 3_000,
        ..Allowance::default()
    };
    ledger.set_allowance(key, record);

    // 2000 + 1001 exceeds the balance even though each fits alone.
    let call = Call {
        data: &static_call(&[word(2_000), word(1_001)]),
        value: 0,
        timestamp: 0,
    };
    assert_eq!(
        evaluate(&condition, &call, &mut ledger)?,
        violation(Violation::AllowanceExceeded { key })
    );
    assert_eq!(ledger.allowance(&key), Some(record));

    // Rejection is idempotent: nothing was consumed.
    assert_eq!(
        evaluate(&condition, &call, &mut ledger)?,
        violation(Violation::AllowanceExceeded { key })
    );

    let fits = Call {
        data: &static_call(&[word(2_000), word(1_000)]),
        value: 0,
        timestamp: 0,
    };
    assert_eq!(evaluate(&condition, &fits, &mut ledger)?, Verdict::Accept);
    assert_eq!(ledger.allowance(&key).unwrap().balance, 0);
    Ok(())
}

#[test]
fn a_failed_branch_leaves_no_debits_behind() -> Result<()> {
    let key = AllowanceKey::from(3u64);
    // First branch debits the parameter, then fails an equality; the second
    // branch accepts without touching the allowance.
    let condition = matches_one(connective(
        Operator::Or,
        vec![
            connective(
                Operator::And,
                vec![
                    Condition::with_value(
                        Encoding::Static,
                        Operator::WithinAllowance,
                        key.bytes().to_vec(),
                    ),
                    equal_to(999),
                ],
            ),
            equal_to(5),
        ],
    ));

    let mut ledger = MemoryLedger::default();
    let record = Allowance {
        balance: 1_000,
        max_balance: 1_000,
        ..Allowance::default()
    };
    ledger.set_allowance(key, record);

    assert_eq!(
        check(&condition, &static_call(&[word(5)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(ledger.allowance(&key), Some(record));
    Ok(())
}

#[test]
fn ether_allowances_draw_from_the_attached_amount() -> Result<()> {
    let key = AllowanceKey::from(4u64);
    let condition = Condition::new(
        Encoding::Calldata,
        Operator::Matches,
        vec![],
        vec![
            equal_to(7),
            Condition::with_value(
                Encoding::None,
                Operator::EtherWithinAllowance,
                key.bytes().to_vec(),
            ),
        ],
    );

    let mut ledger = MemoryLedger::default();
    ledger.set_allowance(
        key,
        Allowance {
            balance: 150,
            max_balance: 150,
            ..Allowance::default()
        },
    );

    let data = static_call(&[word(7)]);
    let over = Call {
        data: &data,
        value: 200,
        timestamp: 0,
    };
    assert_eq!(
        evaluate(&condition, &over, &mut ledger)?,
        violation(Violation::AllowanceExceeded { key })
    );

    let under = Call {
        data: &data,
        value: 100,
        timestamp: 0,
    };
    assert_eq!(evaluate(&condition, &under, &mut ledger)?, Verdict::Accept);
    assert_eq!(ledger.allowance(&key).unwrap().balance, 50);
    Ok(())
}

#[test]
fn call_allowances_spend_one_unit_per_call() -> Result<()> {
    let key = AllowanceKey::from(5u64);
    let condition = Condition::new(
        Encoding::Calldata,
        Operator::Matches,
        vec![],
        vec![
            equal_to(7),
            Condition::with_value(
                Encoding::None,
                Operator::CallWithinAllowance,
                key.bytes().to_vec(),
            ),
        ],
    );

    let mut ledger = MemoryLedger::default();
    ledger.set_allowance(
        key,
        Allowance {
            balance: 1,
            max_balance: 1,
            ..Allowance::default()
        },
    );

    let data = static_call(&[word(7)]);
    assert_eq!(check(&condition, &data, &mut ledger)?, Verdict::Accept);
    assert_eq!(
        check(&condition, &data, &mut ledger)?,
        violation(Violation::CallAllowanceExceeded { key })
    );
    Ok(())
}

#[test]
fn an_allowance_key_must_be_thirty_two_bytes() {
    let condition = matches_one(Condition::with_value(
        Encoding::Static,
        Operator::WithinAllowance,
        vec![1, 2, 3],
    ));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(1)]), &mut ledger)
            .unwrap_err()
            .downcast::<WardenEngineError>()
            .unwrap(),
        WardenEngineError::MalformedAllowanceKey { at: 1 }
    );
}

#[test]
fn undersized_call_data_rejects_without_evaluating() -> Result<()> {
    let condition = matches_one(equal_to(7));
    let mut ledger = MemoryLedger::default();
    let mut data = SELECTOR.to_vec();
    data.extend([0u8; 10]);
    assert!(matches!(
        check(&condition, &data, &mut ledger)?,
        Verdict::Reject(Rejection::Decode(WardenDecoderError::OutOfBounds { .. }))
    ));
    Ok(())
}

#[test]
fn incompatible_branch_shapes_are_a_configuration_error() {
    let condition = matches_one(connective(
        Operator::Or,
        vec![
            equal_to(1),
            Condition::new(
                Encoding::Tuple,
                Operator::Matches,
                vec![],
                vec![equal_to(2)],
            ),
        ],
    ));
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(1)]), &mut ledger)
            .unwrap_err()
            .downcast::<WardenEngineError>()
            .unwrap(),
        WardenEngineError::Topology(WardenTopologyError::UnsuitableChildTypeTree)
    );
}

#[test]
fn a_root_that_is_not_a_call_shape_is_a_configuration_error() {
    // A bare static root can never describe a whole call.
    let condition = equal_to(7);
    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(7)]), &mut ledger)
            .unwrap_err()
            .downcast::<WardenEngineError>()
            .unwrap(),
        WardenEngineError::UnsuitableRoot
    );
}

#[test]
fn top_level_variants_pick_the_branch_that_fits() -> Result<()> {
    // Two whole-call shapes under one disjunction: a single static argument,
    // or a single dynamic one.
    let condition = connective(
        Operator::Or,
        vec![
            matches_one(equal_to(7)),
            matches_one(Condition::with_value(
                Encoding::Dynamic,
                Operator::Slice,
                vec![0, 2, b'o', b'k'],
            )),
        ],
    );

    let mut ledger = MemoryLedger::default();
    assert_eq!(
        check(&condition, &static_call(&[word(7)]), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &dynamic_call(b"ok then"), &mut ledger)?,
        Verdict::Accept
    );
    assert_eq!(
        check(&condition, &static_call(&[word(8)]), &mut ledger)?,
        violation(Violation::OrViolation { at: 0 })
    );
    Ok(())
}
