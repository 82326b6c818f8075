//! Minimum-fee calculator (spec.md §4.5): size fee + execution-unit fee +
//! tiered reference-script fee, plus the fixed-point `ensure_min_fee` that
//! re-derives the fee field until it's large enough to pay for its own
//! encoded size.

use num_bigint::BigInt;
use num_rational::Ratio;

use crate::numeric::{BigRatio, Coin, CoinFractional};
use crate::params::ProtocolParams;
use crate::state::Utxos;
use crate::tx::{Script, Transaction};

fn script_len(script: &Script) -> u64 {
    let bytes = match script {
        Script::NativeScript(b) | Script::PlutusV1(b) | Script::PlutusV2(b) | Script::PlutusV3(b) => b,
    };
    bytes.len() as u64
}

/// Total bytes of every reference script attached via this transaction's
/// reference inputs (spec.md §4.5: the tiered fee component's input `n`).
pub fn total_ref_script_bytes(tx: &Transaction, utxos: &Utxos) -> u64 {
    tx.body
        .reference_inputs
        .iter()
        .filter_map(|input| utxos.get(input))
        .filter_map(|output| output.script_ref.as_ref())
        .map(script_len)
        .sum()
}

/// Walk the tiered reference-script fee (spec.md §4.5): stride `S =
/// 25_600`, starting price `p0 = params.min_fee_ref_script_cost_per_byte`,
/// multiplier `1.2` per tier, performed over rationals and floored once at
/// the end to avoid rounding drift between tiers.
pub fn ref_script_tiered_fee(total_bytes: u64, params: &ProtocolParams) -> Coin {
    let stride = ProtocolParams::REF_SCRIPT_FEE_STRIDE;
    let multiplier = ProtocolParams::ref_script_fee_multiplier();

    let mut fee = CoinFractional::zero();
    let mut price: BigRatio = Ratio::from_integer(BigInt::from(params.min_fee_ref_script_cost_per_byte));
    let mut remaining = total_bytes;

    while remaining >= stride {
        fee = fee + CoinFractional::from_ratio(price.clone() * Ratio::from_integer(BigInt::from(stride)));
        price = price * multiplier.clone();
        remaining -= stride;
    }

    fee = fee + CoinFractional::from_ratio(price * Ratio::from_integer(BigInt::from(remaining)));

    Coin::new(fee.floor().to_string().parse().expect("fee fits i128")).expect("ref script fee fits u64")
}

/// `price_mem * total_mem + price_steps * total_steps`, zero if there are no
/// redeemers (spec.md §4.5).
pub fn exec_units_fee(tx: &Transaction, params: &ProtocolParams) -> Coin {
    let totals = tx.witness_set.total_ex_units();

    let mem_cost = Ratio::from_integer(BigInt::from(totals.mem)) * params.ex_unit_prices.mem_price.as_big_ratio();
    let step_cost =
        Ratio::from_integer(BigInt::from(totals.steps)) * params.ex_unit_prices.step_price.as_big_ratio();

    let total = CoinFractional::from_ratio(mem_cost + step_cost);
    Coin::new(total.floor().to_string().parse().unwrap_or(0)).unwrap_or(Coin::ZERO)
}

/// `min_fee(tx, utxo, params) = fixed + per_byte * size(tx) + exec_units_fee
/// + ref_scripts_fee` (spec.md §4.5).
pub fn min_fee(tx: &Transaction, utxos: &Utxos, params: &ProtocolParams) -> Coin {
    let size_fee = params.min_fee_b + params.min_fee_a * tx.size() as u64;
    let exec_fee = exec_units_fee(tx, params);
    let ref_fee = ref_script_tiered_fee(total_ref_script_bytes(tx, utxos), params);

    Coin::from_u64(size_fee)
        .checked_add(exec_fee)
        .and_then(|c| c.checked_add(ref_fee))
        .expect("min fee components do not overflow u64 for well-formed transactions")
}

/// Fixed-point variant (spec.md §4.5): because `fee` is encoded inside the
/// transaction, raising it can change its CBOR size and thus the fee
/// itself. `rebuild` re-creates the transaction with the candidate fee
/// written into its body; we re-measure and re-derive until the candidate
/// is large enough to cover the min-fee of its own encoding. Terminates
/// because raising the fee only ever widens its CBOR integer encoding at a
/// few fixed thresholds, and `min_fee` is monotonic non-decreasing in that
/// encoded width — in practice this converges in one or two iterations.
pub fn ensure_min_fee(
    mut fee: u64,
    utxos: &Utxos,
    params: &ProtocolParams,
    rebuild: impl Fn(u64) -> Transaction,
) -> u64 {
    for _ in 0..8 {
        let tx = rebuild(fee);
        let required = min_fee(&tx, utxos, params).to_u64();
        if fee >= required {
            return fee;
        }
        fee = required;
    }
    fee
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_support::sample_params;
    use crate::state::Utxos;
    use crate::tx::{Address, OutputDatum, PaymentPart, TransactionBody, TransactionInput, TransactionOutput, WitnessSet};
    use crate::params::Network;
    use crate::value::Value;

    fn addr() -> Address {
        Address { network: Network::Mainnet, payment: PaymentPart::Key([1; 28].into()), stake: None }
    }

    fn sample_tx(fee: u64) -> Transaction {
        let body = TransactionBody {
            inputs: vec![TransactionInput { transaction_id: [9; 32].into(), index: 0 }],
            outputs: vec![TransactionOutput {
                address: addr(),
                value: Value::coin_only(Coin::from_u64(9_000_000)),
                datum: OutputDatum::None,
                script_ref: None,
            }],
            fee,
            ..Default::default()
        };
        Transaction::new([1; 32].into(), body, WitnessSet::default(), true, None, None)
    }

    #[test]
    fn ref_script_tiered_fee_matches_worked_example() {
        // spec.md §8 Scenario F: 30_000 bytes, p0 = 15, stride 25_600.
        let mut params = sample_params();
        params.min_fee_ref_script_cost_per_byte = 15;
        let fee = ref_script_tiered_fee(30_000, &params);
        assert_eq!(fee.to_u64(), 463_200);
    }

    #[test]
    fn min_fee_covers_fixed_and_size_components() {
        let params = sample_params();
        let tx = sample_tx(200_000);
        let fee = min_fee(&tx, &Utxos::new(), &params);
        assert!(fee.to_u64() >= params.min_fee_b);
    }

    #[test]
    fn ensure_min_fee_converges_and_is_self_covering() {
        let params = sample_params();
        let utxos = Utxos::new();

        let converged = ensure_min_fee(0, &utxos, &params, sample_tx);

        let final_tx = sample_tx(converged);
        assert!(converged >= min_fee(&final_tx, &utxos, &params).to_u64());
    }
}
