//! Collateral resolution and the `FeesOK` percentage-sufficiency check
//! (spec.md §4.6.1).
//!
//! Collateral inputs must resolve to outputs locked by a key (never a
//! script, since a failing Plutus script can't be trusted to authorize its
//! own penalty), and must carry only ADA (or a collateral return output
//! must make the difference pure ADA). The total collateral committed must
//! be at least `collateral_percentage / 100` of the fee, rounded up.

use thiserror::Error;

use crate::numeric::Coin;
use crate::params::ProtocolParams;
use crate::state::Utxos;
use crate::tx::{Transaction, TransactionInput, TransactionOutput};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollateralError {
    #[error("collateral input not found in utxo set: {0:?}")]
    UnresolvedInput(TransactionInput),
    #[error("collateral input is locked by a script, not a key")]
    ScriptLockedCollateral,
    #[error("collateral inputs carry native assets without a balancing collateral return")]
    NonAdaCollateral,
    #[error("more than {max} collateral inputs")]
    TooManyCollateralInputs { max: u64 },
    #[error("total collateral {declared} does not match the sum of collateral inputs minus the return output")]
    TotalCollateralMismatch { declared: u64, computed: i128 },
    #[error("transaction carries redeemers with non-zero ex-units but no collateral input")]
    NoCollateralInputs,
    #[error("collateral of {provided} lovelace is less than {required} required ({percentage}% of fee {fee})")]
    InsufficientCollateral {
        provided: u64,
        required: u64,
        percentage: u64,
        fee: u64,
    },
}

/// Resolve every collateral input against `utxos`, rejecting script-locked
/// inputs outright (spec.md §4.6.1 FeesOK detail).
pub fn resolve_collateral_inputs<'a>(
    tx: &'a Transaction,
    utxos: &'a Utxos,
) -> Result<Vec<&'a TransactionOutput>, CollateralError> {
    let mut resolved = Vec::with_capacity(tx.body.collateral_inputs.len());
    for input in &tx.body.collateral_inputs {
        let output = utxos
            .get(input)
            .ok_or(CollateralError::UnresolvedInput(*input))?;
        if output.address.is_script_locked() {
            return Err(CollateralError::ScriptLockedCollateral);
        }
        resolved.push(output);
    }
    Ok(resolved)
}

/// `total_collateral = Σ collateral input coin - collateral_return coin`,
/// validated against `max_collateral_inputs`, non-ADA collateral, and an
/// explicit `total_collateral` field when the transaction declares one.
pub fn compute_total_collateral(
    tx: &Transaction,
    utxos: &Utxos,
    params: &ProtocolParams,
) -> Result<Coin, CollateralError> {
    if tx.body.collateral_inputs.len() as u64 > params.max_collateral_inputs {
        return Err(CollateralError::TooManyCollateralInputs {
            max: params.max_collateral_inputs,
        });
    }

    let resolved = resolve_collateral_inputs(tx, utxos)?;

    let has_assets = resolved.iter().any(|o| !o.value.assets.is_empty())
        || tx
            .body
            .collateral_return
            .as_ref()
            .is_some_and(|o| !o.value.assets.is_empty());
    if has_assets && tx.body.collateral_return.is_none() {
        return Err(CollateralError::NonAdaCollateral);
    }

    let input_total: i128 = resolved.iter().map(|o| o.value.coin.to_u64() as i128).sum();
    let return_total = tx
        .body
        .collateral_return
        .as_ref()
        .map(|o| o.value.coin.to_u64() as i128)
        .unwrap_or(0);
    let computed = input_total - return_total;

    if let Some(declared) = tx.body.total_collateral {
        if declared as i128 != computed {
            return Err(CollateralError::TotalCollateralMismatch { declared, computed });
        }
    }

    Coin::new(computed).map_err(|_| CollateralError::TotalCollateralMismatch {
        declared: tx.body.total_collateral.unwrap_or(0),
        computed,
    })
}

/// `total_collateral * 100 >= fee * collateral_percentage`, i.e. collateral
/// is at least `collateral_percentage`% of the fee, computed without
/// rounding by cross-multiplying (spec.md §4.6.1).
pub fn check_collateral_sufficiency(
    tx: &Transaction,
    utxos: &Utxos,
    params: &ProtocolParams,
) -> Result<(), CollateralError> {
    if tx.body.collateral_inputs.is_empty() {
        return Err(CollateralError::NoCollateralInputs);
    }

    let total = compute_total_collateral(tx, utxos, params)?;

    let provided = total.to_u64() as u128 * 100;
    let required = tx.body.fee as u128 * params.collateral_percentage as u128;

    if provided < required {
        // Round the displayed `required` share up, matching the ledger's
        // own requirement that collateral can never be a whit short.
        let required_coin = (tx.body.fee as u128 * params.collateral_percentage as u128).div_ceil(100);
        return Err(CollateralError::InsufficientCollateral {
            provided: total.to_u64(),
            required: required_coin as u64,
            percentage: params.collateral_percentage,
            fee: tx.body.fee,
        });
    }

    Ok(())
}
