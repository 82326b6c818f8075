//! Deposit/refund accounting (spec.md §4.3).
//!
//! Totals the deposits a transaction's certificates and proposal procedures
//! add to `UTxOState.deposited`, and the refunds they release back. Refunds
//! are read from `CertState`'s recorded deposit, never from current
//! protocol params, so a deposit-parameter change between registration and
//! deregistration never changes what's refunded.
//!
//! A deregistration of a credential with no recorded deposit contributes no
//! refund here; it is not this module's job to reject it. spec.md §4.3
//! assigns that to the witness/cert-validation stage (§4.6), which is where
//! `rules::validators::certificates_well_formed` raises
//! `RuleError::DeregistrationNotRegistered` for the same certificate.

use crate::numeric::Coin;
use crate::params::ProtocolParams;
use crate::state::CertState;
use crate::tx::{Certificate, ProposalProcedure, TransactionBody};

#[derive(Debug, Clone, Copy, Default)]
pub struct DepositTotals {
    pub new_deposits: Coin,
    pub refunds: Coin,
}

/// Walk a transaction's certificates (in order) plus its proposal
/// procedures and total what gets deposited and what gets refunded,
/// against the certificate state *as it stood before this transaction*.
///
/// Certificates are folded left to right so a registration followed later
/// in the same transaction by a deregistration of the same credential sees
/// the deposit it just recorded (spec.md §9 Open Question — resolved in
/// DESIGN.md: certificates apply strictly in body order, each one observing
/// the effects of every earlier one in the same transaction).
pub fn compute_deposit_totals(
    body: &TransactionBody,
    cert_state: &CertState,
    params: &ProtocolParams,
) -> DepositTotals {
    let mut deposits = CoinAcc::default();
    let mut refunds = CoinAcc::default();

    // Local view of live deposits, updated as we fold so later certs in the
    // same tx observe earlier ones.
    let mut stake_deposits = cert_state.delegation.deposits.clone();
    let mut drep_deposits = cert_state.voting.drep_deposits.clone();
    let mut registered_pools = cert_state.pools.registered.clone();

    for cert in &body.certificates {
        match cert {
            Certificate::StakeRegistration { credential, deposit } => {
                let amount = deposit
                    .map(Coin::from_u64)
                    .unwrap_or(params.stake_address_deposit);
                deposits.add(amount);
                stake_deposits.insert(*credential, amount);
            }
            Certificate::StakeDeregistration { credential, .. } => {
                let amount = stake_deposits.remove(credential).unwrap_or(Coin::ZERO);
                refunds.add(amount);
            }
            Certificate::PoolRegistration { params: pool_params } => {
                if !registered_pools.contains_key(&pool_params.operator) {
                    deposits.add(params.pool_deposit);
                    registered_pools.insert(
                        pool_params.operator,
                        crate::state::PoolRegistrationState {
                            pledge: pool_params.pledge,
                            cost: pool_params.cost,
                        },
                    );
                }
            }
            Certificate::RegDRepCert { drep_credential, deposit } => {
                let amount = Coin::from_u64(*deposit);
                deposits.add(amount);
                drep_deposits.insert(*drep_credential, amount);
            }
            Certificate::UnRegDRepCert { drep_credential, .. } => {
                let amount = drep_deposits.remove(drep_credential).unwrap_or(Coin::ZERO);
                refunds.add(amount);
            }
            _ => {}
        }
    }

    for proposal in &body.proposal_procedures {
        let _ = proposal as &ProposalProcedure;
        deposits.add(params.gov_action_deposit);
    }

    DepositTotals {
        new_deposits: deposits.total(),
        refunds: refunds.total(),
    }
}

/// Tiny saturating accumulator: deposit/refund totals are always
/// non-negative sums of non-negative `Coin`s, so overflow (not underflow)
/// is the only concern, and it indicates a malformed transaction the caller
/// should reject earlier (max tx size / max proposal count bound this in
/// practice).
#[derive(Default)]
struct CoinAcc(u128);

impl CoinAcc {
    fn add(&mut self, coin: Coin) {
        self.0 += coin.to_u64() as u128;
    }

    fn total(&self) -> Coin {
        Coin::new(self.0 as i128).unwrap_or(Coin::from_u64(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::StakeCredential;

    fn params() -> ProtocolParams {
        crate::params::test_support::sample_params()
    }

    #[test]
    fn deregistration_without_registration_refunds_nothing() {
        let body = TransactionBody {
            certificates: vec![Certificate::StakeDeregistration {
                credential: StakeCredential::AddrKeyhash([1; 28].into()),
                refund: None,
            }],
            ..Default::default()
        };
        let totals = compute_deposit_totals(&body, &CertState::default(), &params());
        assert_eq!(totals.refunds, Coin::ZERO);
    }

    #[test]
    fn registration_then_deregistration_in_same_tx_refunds_paid_deposit() {
        let cred = StakeCredential::AddrKeyhash([2; 28].into());
        let body = TransactionBody {
            certificates: vec![
                Certificate::StakeRegistration { credential: cred, deposit: None },
                Certificate::StakeDeregistration { credential: cred, refund: None },
            ],
            ..Default::default()
        };
        let totals = compute_deposit_totals(&body, &CertState::default(), &params());
        assert_eq!(totals.new_deposits, params().stake_address_deposit);
        assert_eq!(totals.refunds, params().stake_address_deposit);
    }
}
