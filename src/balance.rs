//! The `consumed`/`produced` value balance of a transaction (spec.md §4.4).

use thiserror::Error;

use crate::numeric::Coin;
use crate::state::{CertState, Utxos};
use crate::tx::{Transaction, TransactionId};
use crate::value::Value;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("input not found in utxo set: tx {0}")]
    BadInputs(TransactionId),
    #[error("arithmetic error computing tx balance")]
    Arith(#[from] crate::numeric::ArithError),
}

#[derive(Debug, Clone)]
pub struct TxBalance {
    pub consumed: Value,
    pub produced: Value,
}

impl TxBalance {
    pub fn is_conserved(&self) -> bool {
        self.consumed.eq_conserved(&self.produced)
    }
}

/// Compute `consumed` and `produced` for `tx` against `utxos` and
/// `cert_state` (spec.md §4.4):
///
/// ```text
/// consumed = Σ spent outputs + withdrawals + cert refunds + minted (positive)
/// produced = Σ new outputs + fee + cert/proposal deposits + burned (negative, re-signed) + donation
/// ```
pub fn compute_balance(
    tx: &Transaction,
    utxos: &Utxos,
    cert_state: &CertState,
    params: &crate::params::ProtocolParams,
) -> Result<TxBalance, BalanceError> {
    let body = &tx.body;

    let mut consumed = Value::zero();
    for input in &body.inputs {
        let output = utxos
            .get(input)
            .ok_or(BalanceError::BadInputs(tx.id()))?;
        consumed = consumed.checked_add(&output.value)?;
    }

    let withdrawals_total: u64 = body.withdrawals.values().sum();
    consumed = consumed.checked_add(&Value::coin_only(Coin::from_u64(withdrawals_total)))?;

    let deposit_totals = crate::deposits::compute_deposit_totals(body, cert_state, params);
    consumed = consumed.checked_add(&Value::coin_only(deposit_totals.refunds))?;

    let (minted, burned) = body.mint_assets().split_mint();
    consumed = Value {
        coin: consumed.coin,
        assets: consumed.assets.checked_add(&minted),
    };

    let mut produced = Value::zero();
    for output in &body.outputs {
        produced = produced.checked_add(&output.value)?;
    }

    produced = produced.checked_add(&Value::coin_only(Coin::from_u64(body.fee)))?;
    produced = produced.checked_add(&Value::coin_only(deposit_totals.new_deposits))?;

    produced = Value {
        coin: produced.coin,
        assets: produced.assets.checked_add(&burned),
    };

    if let Some(donation) = body.donation {
        produced = produced.checked_add(&Value::coin_only(Coin::from_u64(donation)))?;
    }

    Ok(TxBalance { consumed, produced })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_support::sample_params;
    use crate::tx::{Address, PaymentPart, TransactionBody, TransactionInput, TransactionOutput, WitnessSet};
    use crate::params::Network;

    fn addr(tag: u8) -> Address {
        Address {
            network: Network::Mainnet,
            payment: PaymentPart::Key([tag; 28].into()),
            stake: None,
        }
    }

    fn make_tx(id: [u8; 32], body: TransactionBody) -> Transaction {
        Transaction::new(id.into(), body, WitnessSet::default(), true, None, None)
    }

    fn output(coin: u64) -> TransactionOutput {
        TransactionOutput {
            address: addr(1),
            value: Value::coin_only(Coin::from_u64(coin)),
            datum: crate::tx::OutputDatum::None,
            script_ref: None,
        }
    }

    #[test]
    fn pure_ada_transfer_conserves() {
        let txin = TransactionInput { transaction_id: [9; 32].into(), index: 0 };
        let mut utxos = Utxos::new();
        utxos.insert(txin, output(10_000_000));

        let body = TransactionBody {
            inputs: vec![txin],
            outputs: vec![output(9_800_000)],
            fee: 200_000,
            ..Default::default()
        };

        let tx = make_tx([1; 32], body);

        let balance = compute_balance(&tx, &utxos, &CertState::default(), &sample_params()).unwrap();
        assert!(balance.is_conserved());
    }

    #[test]
    fn missing_input_is_bad_inputs() {
        let txin = TransactionInput { transaction_id: [9; 32].into(), index: 0 };
        let body = TransactionBody {
            inputs: vec![txin],
            outputs: vec![output(1)],
            ..Default::default()
        };
        let tx = make_tx([1; 32], body);
        let err = compute_balance(&tx, &Utxos::new(), &CertState::default(), &sample_params()).unwrap_err();
        assert!(matches!(err, BalanceError::BadInputs(_)));
    }
}
