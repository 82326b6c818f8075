//! The STS-style rule pipeline (spec.md §4.6/§4.7): an ordered list of
//! validators that inspect a transaction against ledger state without
//! changing it, followed by mutators that apply its effects.
//!
//! Validators are split into two groups per spec.md §4.6: a short-circuiting
//! prefix of structural checks that later rules depend on (missing inputs,
//! before anything tries to resolve them), and an accumulating suffix where
//! independent failures are all worth reporting together (a transaction
//! failing both `FeesOk` and `OutputTooSmall` should say so).

pub mod mutators;
pub mod validators;

use thiserror::Error;

use crate::balance::BalanceError;
use crate::collateral::CollateralError;
use crate::tx::{AddrKeyhash, PoolKeyhash, RedeemerKey, ScriptHash, StakeCredential, TransactionInput};

/// The full rule-failure taxonomy (spec.md §4.6 table), grounded in the
/// same per-rule naming the Shelley/Conway ledger specs use (`UtxoFailure`,
/// `UtxowFailure`, ...), flattened into one enum since this crate runs every
/// era's worth of rules through a single Conway-shaped pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("transaction has no inputs")]
    InputSetEmpty,
    #[error("input not found in utxo set: {0:?}")]
    BadInputsUTxO(TransactionInput),
    #[error("collateral input not found in utxo set: {0:?}")]
    BadCollateralInputsUTxO(TransactionInput),
    #[error("reference input not found in utxo set: {0:?}")]
    BadReferenceInputsUTxO(TransactionInput),
    #[error("transaction is outside its validity interval at slot {slot}")]
    OutsideValidityInterval { slot: u64 },
    #[error("transaction network id does not match the validating network")]
    WrongNetwork,
    #[error("output {index} carries only {actual} lovelace, below the minimum of {required}")]
    OutputTooSmallUTxO { index: usize, actual: u64, required: u64 },
    #[error("output {index} value exceeds the maximum encoded size of {max} bytes")]
    OutputTooBigUTxO { index: usize, max: u64 },
    #[error("transaction size {actual} exceeds the maximum of {max} bytes")]
    MaxTxSizeUTxO { actual: usize, max: u64 },
    #[error("output {index} carries a non-positive asset quantity")]
    NonPositiveOutputValue { index: usize },
    #[error("consumed value {consumed:?} does not equal produced value {produced:?}")]
    ValueNotConservedUTxO { consumed: String, produced: String },
    #[error(transparent)]
    BalanceComputation(#[from] BalanceError),
    #[error("fee {supplied} is smaller than the required minimum {required}")]
    FeeTooSmallUTxO { supplied: u64, required: u64 },
    #[error(transparent)]
    Collateral(#[from] CollateralError),
    #[error("missing vkey witness for required signer {0:?}")]
    MissingVKeyWitnesses(AddrKeyhash),
    #[error("witness set carries a vkey witness for {0:?} that nothing in the transaction needs")]
    ExtraneousVKeyWitnesses(AddrKeyhash),
    #[error("witness set carries a script witness for {0:?} that nothing in the transaction needs")]
    ExtraneousScriptWitnesses(ScriptHash),
    #[error("no script witness provided for script hash {0:?} required by the transaction")]
    MissingScriptWitnesses(ScriptHash),
    #[error("no datum provided for the hash required by spent output {0:?}")]
    MissingRequiredDatums(TransactionInput),
    #[error("script integrity hash does not match the redeemers, datums and cost models actually used")]
    PpViewHashesDontMatch,
    #[error("redeemer {0:?} requests more ex-units than the transaction's execution budget allows")]
    ExUnitsTooBigUTxO(RedeemerKey),
    #[error("script {0:?} did not validate")]
    ScriptsNotPassing(ScriptHash),
    #[error("required signer {0:?} has no vkey witness")]
    RequiredSignerMissing(AddrKeyhash),
    #[error("more than one independent rule failed")]
    Multiple(Vec<RuleError>),
    #[error(transparent)]
    Arithmetic(#[from] crate::numeric::ArithError),
    #[error("certificate delegates {0:?} to a pool that is not registered")]
    DelegationToUnregisteredPool(PoolKeyhash),
    #[error("certificate references stake credential {0:?} that has no live registration")]
    CertificateNotWellFormed(StakeCredential),
    #[error("certificate deregisters credential {0:?} that was never registered")]
    DeregistrationNotRegistered(StakeCredential),
}

/// A read-only check against a transaction and the ledger state it would
/// apply to. Validators never see `&mut` state; ordering and
/// short-circuiting is the orchestrator's job, not any one validator's.
pub trait Validator {
    fn validate(&self, ctx: &validators::ValidationContext<'_>) -> Result<(), RuleError>;
}

/// An effect a transaction has on ledger state once it's known to be valid
/// (spec.md §4.7). Mutators run in a fixed order after every validator has
/// passed.
pub trait Mutator {
    fn mutate(&self, ctx: &mut mutators::MutationContext<'_>) -> Result<(), RuleError>;
}
