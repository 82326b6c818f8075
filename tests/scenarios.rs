//! End-to-end rule-pipeline scenarios (spec.md §8).
//!
//! Each test builds a hand-constructed transaction and state, runs it
//! through the full `apply_tx`/`validate_tx` pipeline, and checks the
//! expected accept/reject outcome against the concrete worked examples the
//! spec calls out by name.

use std::collections::BTreeMap;

use conway_ledger_rules::numeric::Coin;
use conway_ledger_rules::params::{Environment, ExUnitPrices, ExUnits, Network, ParamRatio, ProtocolParams};
use conway_ledger_rules::rules::RuleError;
use conway_ledger_rules::state::{CertState, UTxOState};
use conway_ledger_rules::tx::{
    Address, OutputDatum, PaymentPart, Redeemer, RedeemerKey, RedeemerTag, Script, Transaction, TransactionBody,
    TransactionInput, TransactionOutput, WitnessSet,
};
use conway_ledger_rules::value::{MultiAsset, Value};
use conway_ledger_rules::vm::AlwaysSucceeds;
use conway_ledger_rules::{apply_tx, validate_tx};

/// The same historical preprod-derived parameter fixture the crate's own
/// unit tests use (`params::test_support::sample_params`), duplicated here
/// since that helper is `#[cfg(test)]`-gated inside the library and so isn't
/// linked into this external integration-test binary.
fn sample_params() -> ProtocolParams {
    ProtocolParams {
        min_fee_a: 44,
        min_fee_b: 155_381,
        max_tx_size: 16_384,
        max_value_size: 5_000,
        max_block_ex_units: ExUnits { mem: 62_000_000, steps: 40_000_000_000 },
        max_tx_execution_units: ExUnits { mem: 14_000_000, steps: 10_000_000_000 },
        ex_unit_prices: ExUnitPrices {
            mem_price: ParamRatio { numerator: 577, denominator: 10_000 },
            step_price: ParamRatio { numerator: 721, denominator: 10_000_000 },
        },
        coins_per_utxo_byte: 4_310,
        stake_address_deposit: Coin::from_u64(2_000_000),
        pool_deposit: Coin::from_u64(500_000_000),
        drep_deposit: Coin::from_u64(500_000_000),
        gov_action_deposit: Coin::from_u64(100_000_000_000),
        collateral_percentage: 150,
        max_collateral_inputs: 3,
        min_fee_ref_script_cost_per_byte: 15,
        cost_models: Default::default(),
        protocol_major_version: 10,
        protocol_minor_version: 0,
    }
}

fn key_addr(tag: u8) -> Address {
    Address {
        network: Network::Mainnet,
        payment: PaymentPart::Key([tag; 28].into()),
        stake: None,
    }
}

fn env(params: &ProtocolParams) -> Environment<'_> {
    Environment { slot: 1_000, network: Network::Mainnet, params }
}

fn output(address: Address, value: Value) -> TransactionOutput {
    TransactionOutput { address, value, datum: OutputDatum::None, script_ref: None }
}

/// Scenario A (spec.md §8): a pure ada transfer with a fee above the
/// minimum should apply cleanly and leave the spent input gone and the new
/// output present.
#[test]
fn scenario_a_pure_ada_transfer_accepts() {
    let params = sample_params();
    let e = env(&params);

    let txin = TransactionInput { transaction_id: [0xA; 32].into(), index: 0 };
    let mut utxo_state = UTxOState::default();
    utxo_state.utxos.insert(txin, output(key_addr(1), Value::coin_only(Coin::from_u64(10_000_000))));

    let body = TransactionBody {
        inputs: vec![txin],
        outputs: vec![output(key_addr(2), Value::coin_only(Coin::from_u64(9_800_000)))],
        fee: 200_000,
        ..Default::default()
    };
    let mut witness_set = WitnessSet::default();
    witness_set.vkey_witnesses.push([1; 28].into());
    let tx = Transaction::new([0xB; 32].into(), body, witness_set, true, None, None);

    let mut cert_state = CertState::default();
    apply_tx(&tx, &mut utxo_state, &mut cert_state, &e, &AlwaysSucceeds).unwrap();

    assert!(!utxo_state.utxos.contains_key(&txin));
    assert_eq!(utxo_state.fees, Coin::from_u64(200_000));
    let new_key = TransactionInput { transaction_id: tx.id(), index: 0 };
    assert!(utxo_state.utxos.contains_key(&new_key));
}

/// Scenario B (spec.md §8): spending the whole input with zero fee leaves
/// nothing to cover `min_fee`, so it's rejected by `FeesOk`.
#[test]
fn scenario_b_zero_fee_is_rejected() {
    let params = sample_params();
    let e = env(&params);

    let txin = TransactionInput { transaction_id: [0xA; 32].into(), index: 0 };
    let mut utxo_state = UTxOState::default();
    utxo_state.utxos.insert(txin, output(key_addr(1), Value::coin_only(Coin::from_u64(10_000_000))));

    let body = TransactionBody {
        inputs: vec![txin],
        outputs: vec![output(key_addr(2), Value::coin_only(Coin::from_u64(10_000_000)))],
        fee: 0,
        ..Default::default()
    };
    let mut witness_set = WitnessSet::default();
    witness_set.vkey_witnesses.push([1; 28].into());
    let tx = Transaction::new([0xB; 32].into(), body, witness_set, true, None, None);

    let cert_state = CertState::default();
    let err = validate_tx(&tx, &utxo_state, &cert_state, &e, &AlwaysSucceeds).unwrap_err();

    let is_fees_or_conservation = |err: &RuleError| {
        matches!(err, RuleError::FeeTooSmallUTxO { .. } | RuleError::ValueNotConservedUTxO { .. })
    };
    match &err {
        RuleError::Multiple(errs) => assert!(errs.iter().any(is_fees_or_conservation)),
        other => assert!(is_fees_or_conservation(other)),
    }
}

/// Scenario C (spec.md §8): mint-with-burn-free token creation conserves
/// value once the native script authorizing the mint is in the witness set.
#[test]
fn scenario_c_mint_with_matching_script_witness_accepts() {
    let params = sample_params();
    let e = env(&params);

    let txin = TransactionInput { transaction_id: [0xA; 32].into(), index: 0 };
    let mut utxo_state = UTxOState::default();
    utxo_state.utxos.insert(txin, output(key_addr(1), Value::coin_only(Coin::from_u64(5_000_000))));

    let policy_script = Script::NativeScript(vec![0xAA; 28]);
    let policy = {
        let mut buf = [0u8; 28];
        buf.copy_from_slice(&[0xAA; 28]);
        buf
    };

    let mut mint = BTreeMap::new();
    let mut inner = BTreeMap::new();
    inner.insert(b"tokenN".to_vec(), 10i128);
    mint.insert(policy, inner);

    let mut out_assets = BTreeMap::new();
    out_assets.insert(policy, {
        let mut m = BTreeMap::new();
        m.insert(b"tokenN".to_vec(), 10i128);
        m
    });

    let body = TransactionBody {
        inputs: vec![txin],
        outputs: vec![output(
            key_addr(2),
            Value { coin: Coin::from_u64(4_800_000), assets: MultiAsset::from_map(out_assets) },
        )],
        fee: 200_000,
        mint: Some(MultiAsset::from_map(mint)),
        ..Default::default()
    };
    let mut witness_set = WitnessSet::default();
    witness_set.vkey_witnesses.push([1; 28].into());
    witness_set.native_scripts.push(policy_script);
    let tx = Transaction::new([0xB; 32].into(), body, witness_set, true, None, None);

    let balance = conway_ledger_rules::balance::compute_balance(&tx, &utxo_state.utxos, &CertState::default(), &params)
        .unwrap();
    assert!(balance.is_conserved());
}

/// Scenario D (spec.md §8): a script spend with insufficient collateral
/// against `collateral_percentage = 150` is rejected.
#[test]
fn scenario_d_insufficient_collateral_is_rejected() {
    let params = sample_params();
    let e = env(&params);

    let script_input = TransactionInput { transaction_id: [0xA; 32].into(), index: 0 };
    let collateral_input = TransactionInput { transaction_id: [0xC; 32].into(), index: 0 };

    let mut utxo_state = UTxOState::default();
    utxo_state.utxos.insert(
        script_input,
        TransactionOutput {
            address: Address { network: Network::Mainnet, payment: PaymentPart::Script([0xEE; 28].into()), stake: None },
            value: Value::coin_only(Coin::from_u64(10_000_000)),
            datum: OutputDatum::None,
            script_ref: None,
        },
    );
    utxo_state.utxos.insert(collateral_input, output(key_addr(1), Value::coin_only(Coin::from_u64(1_200_000))));

    let body = TransactionBody {
        inputs: vec![script_input],
        outputs: vec![output(key_addr(2), Value::coin_only(Coin::from_u64(9_000_000)))],
        fee: 1_000_000,
        collateral_inputs: vec![collateral_input],
        script_data_hash: Some([0x11; 32]),
        ..Default::default()
    };
    let mut witness_set = WitnessSet::default();
    witness_set.vkey_witnesses.push([1; 28].into());
    witness_set.plutus_scripts.push(Script::PlutusV2(vec![0xEE; 28]));
    witness_set.redeemers.push(Redeemer {
        key: RedeemerKey { tag: RedeemerTag::Spend, index: 0 },
        data: vec![],
        ex_units: ExUnits { mem: 100_000, steps: 50_000_000 },
    });
    let tx = Transaction::new([0xB; 32].into(), body, witness_set, true, None, None);

    let cert_state = CertState::default();
    let err = validate_tx(&tx, &utxo_state, &cert_state, &e, &AlwaysSucceeds).unwrap_err();

    let is_insufficient_collateral = |e: &RuleError| {
        matches!(
            e,
            RuleError::Collateral(conway_ledger_rules::collateral::CollateralError::InsufficientCollateral { .. })
        )
    };
    match &err {
        RuleError::Multiple(errs) => assert!(errs.iter().any(is_insufficient_collateral)),
        other => assert!(is_insufficient_collateral(other)),
    }
}

/// Scenario E (spec.md §8): a transaction with redeemers must carry a
/// script-data hash; omitting it while scripts run is rejected.
#[test]
fn scenario_e_missing_script_data_hash_is_rejected() {
    let params = sample_params();
    let e = env(&params);

    let script_input = TransactionInput { transaction_id: [0xA; 32].into(), index: 0 };
    let collateral_input = TransactionInput { transaction_id: [0xC; 32].into(), index: 0 };

    let mut utxo_state = UTxOState::default();
    utxo_state.utxos.insert(
        script_input,
        TransactionOutput {
            address: Address { network: Network::Mainnet, payment: PaymentPart::Script([0xEE; 28].into()), stake: None },
            value: Value::coin_only(Coin::from_u64(10_000_000)),
            datum: OutputDatum::None,
            script_ref: None,
        },
    );
    utxo_state.utxos.insert(collateral_input, output(key_addr(1), Value::coin_only(Coin::from_u64(3_000_000))));

    let body = TransactionBody {
        inputs: vec![script_input],
        outputs: vec![output(key_addr(2), Value::coin_only(Coin::from_u64(9_000_000)))],
        fee: 1_000_000,
        collateral_inputs: vec![collateral_input],
        script_data_hash: None,
        ..Default::default()
    };
    let mut witness_set = WitnessSet::default();
    witness_set.vkey_witnesses.push([1; 28].into());
    witness_set.plutus_scripts.push(Script::PlutusV2(vec![0xEE; 28]));
    witness_set.redeemers.push(Redeemer {
        key: RedeemerKey { tag: RedeemerTag::Spend, index: 0 },
        data: vec![],
        ex_units: ExUnits { mem: 100, steps: 100 },
    });
    let tx = Transaction::new([0xB; 32].into(), body, witness_set, true, None, None);

    let cert_state = CertState::default();
    let err = validate_tx(&tx, &utxo_state, &cert_state, &e, &AlwaysSucceeds).unwrap_err();

    let is_hash_mismatch = |e: &RuleError| matches!(e, RuleError::PpViewHashesDontMatch);
    match &err {
        RuleError::Multiple(errs) => assert!(errs.iter().any(is_hash_mismatch)),
        other => assert!(is_hash_mismatch(other)),
    }
}

/// Scenario F (spec.md §8): the tiered reference-script fee's worked
/// example — 30,000 bytes at `p0 = 15`, stride 25,600 — contributes exactly
/// 463,200 lovelace to `min_fee`.
#[test]
fn scenario_f_tiered_ref_script_fee_matches_worked_example() {
    let mut params = sample_params();
    params.min_fee_ref_script_cost_per_byte = 15;

    let fee = conway_ledger_rules::fees::ref_script_tiered_fee(30_000, &params);
    assert_eq!(fee.to_u64(), 463_200);
}
