//! Concrete mutators (spec.md §4.7): applying a transaction already known
//! to be valid onto `UTxOState`/`CertState`.

use crate::params::ProtocolParams;
use crate::state::{CertState, PoolRegistrationState, UTxOState};
use crate::tx::{Certificate, Transaction};

use super::{Mutator, RuleError};

pub struct MutationContext<'a> {
    pub tx: &'a Transaction,
    pub utxo_state: &'a mut UTxOState,
    pub cert_state: &'a mut CertState,
    pub params: &'a ProtocolParams,
}

/// Consume spent inputs, produce new outputs (spec.md §4.7). An
/// `is_valid == false` transaction (phase-2 script failure) instead
/// consumes only its collateral inputs and produces only its collateral
/// return, per the Alonzo+ "collateral-only" UTxO update path.
pub struct ApplyUtxoUpdate;

impl Mutator for ApplyUtxoUpdate {
    fn mutate(&self, ctx: &mut MutationContext<'_>) -> Result<(), RuleError> {
        if ctx.tx.is_valid {
            for input in &ctx.tx.body.inputs {
                ctx.utxo_state.utxos.remove(input);
            }
            for (index, output) in ctx.tx.body.outputs.iter().enumerate() {
                let txin = crate::tx::TransactionInput {
                    transaction_id: ctx.tx.id(),
                    index: index as u32,
                };
                ctx.utxo_state.utxos.insert(txin, output.clone());
            }
        } else {
            for input in &ctx.tx.body.collateral_inputs {
                ctx.utxo_state.utxos.remove(input);
            }
            if let Some(return_output) = &ctx.tx.body.collateral_return {
                let txin = crate::tx::TransactionInput {
                    transaction_id: ctx.tx.id(),
                    // The collateral return output is always the last
                    // output index in the body's implicit numbering.
                    index: ctx.tx.body.outputs.len() as u32,
                };
                ctx.utxo_state.utxos.insert(txin, return_output.clone());
            }
        }
        Ok(())
    }
}

/// Move what the ledger actually collects into `UTxOState.fees`, and any
/// treasury donation into `UTxOState.donation` (spec.md §4.7). A valid
/// transaction pays its declared `fee`; a phase-2-invalid one pays nothing
/// of the sort — the ledger instead keeps its collateral, computed the same
/// way `collateral::check_collateral_sufficiency` validated it up front.
pub struct ApplyFeesAndDonation;

impl Mutator for ApplyFeesAndDonation {
    fn mutate(&self, ctx: &mut MutationContext<'_>) -> Result<(), RuleError> {
        let collected = if ctx.tx.is_valid {
            crate::numeric::Coin::from_u64(ctx.tx.body.fee)
        } else {
            crate::collateral::compute_total_collateral(ctx.tx, &ctx.utxo_state.utxos, ctx.params)?
        };

        ctx.utxo_state.fees = ctx.utxo_state.fees.checked_add(collected)?;

        if let Some(donation) = ctx.tx.body.donation {
            ctx.utxo_state.donation = ctx
                .utxo_state
                .donation
                .checked_add(crate::numeric::Coin::from_u64(donation))?;
        }

        Ok(())
    }
}

/// Update `UTxOState.deposited` by the net of this transaction's
/// certificate/proposal deposits and refunds (spec.md §4.3, §4.7).
pub struct ApplyDeposits;

impl Mutator for ApplyDeposits {
    fn mutate(&self, ctx: &mut MutationContext<'_>) -> Result<(), RuleError> {
        let totals = crate::deposits::compute_deposit_totals(&ctx.tx.body, ctx.cert_state, ctx.params);

        let net = totals
            .new_deposits
            .checked_add(ctx.utxo_state.deposited)?
            .checked_sub(totals.refunds)?;

        ctx.utxo_state.deposited = net;
        Ok(())
    }
}

/// Apply every certificate's effect on `CertState` in body order (spec.md
/// §3/§4.7): registrations record a deposit, deregistrations release it,
/// delegations update the relevant map.
pub struct ApplyCertificates;

impl Mutator for ApplyCertificates {
    fn mutate(&self, ctx: &mut MutationContext<'_>) -> Result<(), RuleError> {
        for cert in &ctx.tx.body.certificates {
            match cert {
                Certificate::StakeRegistration { credential, deposit } => {
                    let amount = deposit
                        .map(crate::numeric::Coin::from_u64)
                        .unwrap_or(ctx.params.stake_address_deposit);
                    ctx.cert_state.delegation.deposits.insert(*credential, amount);
                }
                Certificate::StakeDeregistration { credential, .. } => {
                    ctx.cert_state.delegation.deposits.remove(credential);
                    ctx.cert_state.delegation.pool_delegations.remove(credential);
                }
                Certificate::StakeDelegation { credential, pool } => {
                    ctx.cert_state.delegation.pool_delegations.insert(*credential, *pool);
                }
                Certificate::PoolRegistration { params } => {
                    ctx.cert_state.pools.registered.insert(
                        params.operator,
                        PoolRegistrationState {
                            pledge: params.pledge,
                            cost: params.cost,
                        },
                    );
                    ctx.cert_state.pools.retiring.remove(&params.operator);
                }
                Certificate::PoolRetirement { pool, epoch } => {
                    ctx.cert_state.pools.retiring.insert(*pool, *epoch);
                }
                Certificate::VoteDelegation { credential, drep } => {
                    ctx.cert_state.voting.drep_delegations.insert(*credential, *drep);
                }
                Certificate::StakeVoteDelegation { credential, pool, drep } => {
                    ctx.cert_state.delegation.pool_delegations.insert(*credential, *pool);
                    ctx.cert_state.voting.drep_delegations.insert(*credential, *drep);
                }
                Certificate::RegDRepCert { drep_credential, deposit } => {
                    ctx.cert_state
                        .voting
                        .drep_deposits
                        .insert(*drep_credential, crate::numeric::Coin::from_u64(*deposit));
                }
                Certificate::UnRegDRepCert { drep_credential, .. } => {
                    ctx.cert_state.voting.drep_deposits.remove(drep_credential);
                    ctx.cert_state.voting.drep_delegations.remove(drep_credential);
                }
                Certificate::AuthCommitteeHot { cold_credential, hot_credential } => {
                    ctx.cert_state
                        .voting
                        .committee_hot_keys
                        .insert(*cold_credential, *hot_credential);
                }
                Certificate::ResignCommitteeCold { cold_credential } => {
                    ctx.cert_state.voting.committee_hot_keys.remove(cold_credential);
                }
                Certificate::UpdateDRepCert { .. } | Certificate::GenesisDelegation => {}
            }
        }
        Ok(())
    }
}

/// The fixed mutator order (spec.md §4.7): fees/donation first, while
/// collateral inputs an invalid transaction needs to price are still in the
/// UTxO set, then the UTxO update itself, then deposits, then certificate
/// effects.
pub fn ordered_mutators() -> Vec<Box<dyn Mutator>> {
    vec![
        Box::new(ApplyFeesAndDonation),
        Box::new(ApplyUtxoUpdate),
        Box::new(ApplyDeposits),
        Box::new(ApplyCertificates),
    ]
}
