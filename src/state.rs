//! Ledger state: the UTxO set, certificate state, and the aggregate
//! `UTxOState`/`CertState` the STS pipeline reads and rewrites.

use std::collections::{BTreeMap, HashMap};

use crate::numeric::Coin;
use crate::tx::{PoolKeyhash, StakeCredential, TransactionInput, TransactionOutput};

pub type Utxos = HashMap<TransactionInput, TransactionOutput>;

#[derive(Debug, Clone, Default)]
pub struct PoolRegistrationState {
    pub pledge: u64,
    pub cost: u64,
}

/// Live/pending/retiring pool bookkeeping (spec.md §3 `CertState.pools_state`).
#[derive(Debug, Clone, Default)]
pub struct PoolsState {
    pub registered: BTreeMap<PoolKeyhash, PoolRegistrationState>,
    pub retiring: BTreeMap<PoolKeyhash, u64>,
}

impl PoolsState {
    pub fn is_registered(&self, pool: &PoolKeyhash) -> bool {
        self.registered.contains_key(pool)
    }
}

/// Stake-credential bookkeeping: live deposits, pool delegation, DRep
/// delegation. `deposits[cred]` is present iff `cred` has a live
/// registration, and records the exact amount paid at registration time
/// (spec.md §3 invariant) so a later deregistration refunds that amount,
/// not whatever `params.stake_address_deposit` currently is.
#[derive(Debug, Clone, Default)]
pub struct DelegationState {
    pub deposits: BTreeMap<StakeCredential, Coin>,
    pub pool_delegations: BTreeMap<StakeCredential, PoolKeyhash>,
}

impl DelegationState {
    pub fn is_registered(&self, cred: &StakeCredential) -> bool {
        self.deposits.contains_key(cred)
    }
}

/// DRep bookkeeping: live DReps and their recorded deposit.
#[derive(Debug, Clone, Default)]
pub struct VotingState {
    pub drep_deposits: BTreeMap<StakeCredential, Coin>,
    pub drep_delegations: BTreeMap<StakeCredential, crate::tx::DRep>,
    pub committee_hot_keys: BTreeMap<StakeCredential, StakeCredential>,
}

impl VotingState {
    pub fn is_registered(&self, drep: &StakeCredential) -> bool {
        self.drep_deposits.contains_key(drep)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CertState {
    pub delegation: DelegationState,
    pub pools: PoolsState,
    pub voting: VotingState,
}

/// The full UTxO-side ledger state (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct UTxOState {
    pub utxos: Utxos,
    pub deposited: Coin,
    pub fees: Coin,
    pub donation: Coin,
}
