//! Minimum-ADA-per-output calculator (spec.md §4.8).
//!
//! An output's minimum lovelace requirement is proportional to its encoded
//! size, priced by `coins_per_utxo_byte`, plus a constant overhead that
//! covers the fields the ledger charges for regardless of the value carried
//! (the UTxO entry itself, not just the output CBOR).

use crate::numeric::Coin;
use crate::params::ProtocolParams;
use crate::tx::TransactionOutput;

/// `min_ada(output, params) = coins_per_utxo_byte * (size(output) +
/// constant_overhead)` (spec.md §4.8).
pub fn min_ada(output: &TransactionOutput, params: &ProtocolParams) -> Coin {
    let size = crate::cbor_size::encoded_len(output) as u64;
    let total_bytes = size + ProtocolParams::min_ada_constant_overhead();
    Coin::from_u64(params.coins_per_utxo_byte * total_bytes)
}

/// Fixed-point variant (spec.md §4.8): raising `output.value.coin` to meet
/// `min_ada` can grow the coin field's CBOR width, which raises `min_ada`
/// again. `rebuild` re-creates the output carrying the candidate coin
/// amount; iterate until it's self-covering. Converges in one or two steps
/// for the same reason `ensure_min_fee` does: coin width only grows at a
/// handful of fixed encoding thresholds.
pub fn ensure_min_ada(
    mut coin: u64,
    params: &ProtocolParams,
    rebuild: impl Fn(u64) -> TransactionOutput,
) -> u64 {
    for _ in 0..8 {
        let output = rebuild(coin);
        let required = min_ada(&output, params).to_u64();
        if coin >= required {
            return coin;
        }
        coin = required;
    }
    coin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_support::sample_params;
    use crate::params::Network;
    use crate::tx::{Address, OutputDatum, PaymentPart};
    use crate::value::Value;

    fn addr() -> Address {
        Address {
            network: Network::Mainnet,
            payment: PaymentPart::Key([3; 28].into()),
            stake: None,
        }
    }

    fn output(coin: u64) -> TransactionOutput {
        TransactionOutput {
            address: addr(),
            value: Value::coin_only(Coin::from_u64(coin)),
            datum: OutputDatum::None,
            script_ref: None,
        }
    }

    #[test]
    fn min_ada_scales_with_coins_per_byte() {
        let params = sample_params();
        let small = min_ada(&output(1), &params);
        assert!(small.to_u64() > 0);
        assert_eq!(
            small.to_u64(),
            params.coins_per_utxo_byte * (crate::cbor_size::encoded_len(&output(1)) as u64 + 160)
        );
    }

    #[test]
    fn ensure_min_ada_converges_and_is_self_covering() {
        let params = sample_params();
        let coin = ensure_min_ada(0, &params, output);
        let final_output = output(coin);
        assert!(coin >= min_ada(&final_output, &params).to_u64());
    }
}
