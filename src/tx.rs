//! The transaction data model (spec.md §3).
//!
//! These are owned, validation-domain types: thin enough to construct by
//! hand in tests, rich enough to carry everything the rule pipeline reads.
//! Bit-exact CBOR decoding into these types lives in [`crate::decode`]; this
//! module only defines the shapes.

use std::collections::BTreeMap;

use pallas::crypto::hash::Hash;

use crate::params::{ExUnits, Network};
use crate::value::{PolicyId, Value};

pub type TransactionId = Hash<32>;
pub type AddrKeyhash = Hash<28>;
pub type ScriptHash = Hash<28>;
pub type DatumHash = Hash<32>;
pub type PoolKeyhash = Hash<28>;
pub type VrfKeyhash = Hash<32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionInput {
    pub transaction_id: TransactionId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StakeCredential {
    AddrKeyhash(AddrKeyhash),
    ScriptHash(ScriptHash),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentPart {
    Key(AddrKeyhash),
    Script(ScriptHash),
}

/// A simplified address: enough structure for the rules that inspect it
/// (network tag, whether it resolves to a key or a script, the staking
/// credential for withdrawals/delegation) without modelling every Byron/
/// pointer-address legacy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub network: Network,
    pub payment: PaymentPart,
    pub stake: Option<StakeCredential>,
}

impl Address {
    pub fn is_script_locked(&self) -> bool {
        matches!(self.payment, PaymentPart::Script(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputDatum {
    None,
    Hash(DatumHash),
    Inline(DatumHash),
}

#[derive(Debug, Clone)]
pub enum Script {
    NativeScript(Vec<u8>),
    PlutusV1(Vec<u8>),
    PlutusV2(Vec<u8>),
    PlutusV3(Vec<u8>),
}

impl Script {
    pub fn hash(&self) -> ScriptHash {
        // Placeholder hashing: real bit-exact script hashing (with the
        // per-language tag byte prepended per the ledger spec) lives behind
        // the CBOR-decode boundary (spec.md §1); this crate only needs the
        // hash to already be attached to scripts it resolves, so the
        // pallas-backed decoder in `decode` is what populates these.
        unimplemented!("script hashing is performed by the CBOR decode adapter")
    }
}

#[derive(Debug, Clone)]
pub struct TransactionOutput {
    pub address: Address,
    pub value: Value,
    pub datum: OutputDatum,
    pub script_ref: Option<Script>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityInterval {
    pub invalid_before: Option<u64>,
    pub invalid_hereafter: Option<u64>,
}

impl ValidityInterval {
    pub fn contains(&self, slot: u64) -> bool {
        let after_start = self.invalid_before.map(|b| slot >= b).unwrap_or(true);
        let before_end = self.invalid_hereafter.map(|h| slot < h).unwrap_or(true);
        after_start && before_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub operator: PoolKeyhash,
    pub vrf_keyhash: VrfKeyhash,
    pub pledge: u64,
    pub cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DRep {
    Key(AddrKeyhash),
    Script(ScriptHash),
    Abstain,
    NoConfidence,
}

/// The full Conway certificate set (spec.md §4.7, expanded in SPEC_FULL.md
/// §4). `deposit`/`refund` carry the coin amount named *in the certificate
/// itself* where the wire format includes it (Conway onwards); `None` means
/// the amount must be looked up from protocol params or from
/// `CertState`'s recorded deposit, per spec.md §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Certificate {
    StakeRegistration {
        credential: StakeCredential,
        deposit: Option<u64>,
    },
    StakeDeregistration {
        credential: StakeCredential,
        refund: Option<u64>,
    },
    StakeDelegation {
        credential: StakeCredential,
        pool: PoolKeyhash,
    },
    PoolRegistration {
        params: PoolParams,
    },
    PoolRetirement {
        pool: PoolKeyhash,
        epoch: u64,
    },
    VoteDelegation {
        credential: StakeCredential,
        drep: DRep,
    },
    StakeVoteDelegation {
        credential: StakeCredential,
        pool: PoolKeyhash,
        drep: DRep,
    },
    RegDRepCert {
        drep_credential: StakeCredential,
        deposit: u64,
    },
    UnRegDRepCert {
        drep_credential: StakeCredential,
        refund: u64,
    },
    UpdateDRepCert {
        drep_credential: StakeCredential,
    },
    AuthCommitteeHot {
        cold_credential: StakeCredential,
        hot_credential: StakeCredential,
    },
    ResignCommitteeCold {
        cold_credential: StakeCredential,
    },
    /// Byron-era genesis delegation, carried for wire compatibility. Has no
    /// effect under the rules this crate implements (epoch-boundary
    /// consensus concern, out of scope).
    GenesisDelegation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovActionId {
    pub transaction_id: TransactionId,
    pub action_index: u16,
}

#[derive(Debug, Clone)]
pub struct ProposalProcedure {
    pub deposit: u64,
    pub reward_account_network: Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voter {
    ConstitutionalCommitteeKey(AddrKeyhash),
    ConstitutionalCommitteeScript(ScriptHash),
    DRepKey(AddrKeyhash),
    DRepScript(ScriptHash),
    StakePoolKey(PoolKeyhash),
}

#[derive(Debug, Clone)]
pub struct VotingProcedure {
    pub voter: Voter,
    pub action: GovActionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
    Voting,
    Proposing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemerKey {
    pub tag: RedeemerTag,
    pub index: u32,
}

#[derive(Debug, Clone)]
pub struct Redeemer {
    pub key: RedeemerKey,
    pub data: Vec<u8>,
    pub ex_units: ExUnits,
}

#[derive(Debug, Clone, Default)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<AddrKeyhash>,
    pub bootstrap_witnesses: Vec<AddrKeyhash>,
    pub native_scripts: Vec<Script>,
    pub plutus_scripts: Vec<Script>,
    pub plutus_data: Vec<(DatumHash, Vec<u8>)>,
    pub redeemers: Vec<Redeemer>,
}

impl WitnessSet {
    pub fn total_ex_units(&self) -> ExUnits {
        self.redeemers.iter().fold(ExUnits::ZERO, |acc, r| {
            acc.checked_add(r.ex_units).unwrap_or(ExUnits {
                mem: u64::MAX,
                steps: u64::MAX,
            })
        })
    }

    pub fn provided_scripts(&self) -> impl Iterator<Item = &Script> {
        self.native_scripts.iter().chain(self.plutus_scripts.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionBody {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: u64,
    pub validity_interval: ValidityInterval,
    pub certificates: Vec<Certificate>,
    pub withdrawals: BTreeMap<StakeCredential, u64>,
    pub mint: Option<crate::value::MultiAsset>,
    pub script_data_hash: Option<[u8; 32]>,
    pub collateral_inputs: Vec<TransactionInput>,
    pub required_signers: Vec<AddrKeyhash>,
    pub network: Option<Network>,
    pub collateral_return: Option<TransactionOutput>,
    pub total_collateral: Option<u64>,
    pub reference_inputs: Vec<TransactionInput>,
    pub proposal_procedures: Vec<ProposalProcedure>,
    pub voting_procedures: Vec<VotingProcedure>,
    pub current_treasury_value: Option<u64>,
    pub donation: Option<u64>,
}

impl TransactionBody {
    pub fn mint_assets(&self) -> crate::value::MultiAsset {
        self.mint.clone().unwrap_or_else(crate::value::MultiAsset::empty)
    }

    pub fn minted_policies(&self) -> impl Iterator<Item = PolicyId> + '_ {
        self.mint
            .iter()
            .flat_map(|m| m.policies().copied())
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub body: TransactionBody,
    pub witness_set: WitnessSet,
    pub is_valid: bool,
    pub auxiliary_data_hash: Option<[u8; 32]>,

    /// The original wire bytes, when this transaction came from a CBOR
    /// decode. Several rules (max-tx-size, min-fee) need the canonical
    /// encoded length; reusing these bytes instead of re-encoding avoids
    /// recomputing the same serialization the teacher's code was flagged
    /// for recomputing more than once (spec.md §9).
    pub raw_cbor: Option<Vec<u8>>,

    size_cache: std::cell::Cell<Option<usize>>,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        body: TransactionBody,
        witness_set: WitnessSet,
        is_valid: bool,
        auxiliary_data_hash: Option<[u8; 32]>,
        raw_cbor: Option<Vec<u8>>,
    ) -> Self {
        Transaction {
            id,
            body,
            witness_set,
            is_valid,
            auxiliary_data_hash,
            raw_cbor,
            size_cache: std::cell::Cell::new(None),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Canonical CBOR byte length, as used by the min-fee size component and
    /// the max-tx-size check (spec.md §4.5, §4.6). Memoized: the first call
    /// either reads `raw_cbor.len()` or runs a byte-counting re-encode
    /// (never both, and never more than once).
    pub fn size(&self) -> usize {
        if let Some(cached) = self.size_cache.get() {
            return cached;
        }

        let size = match &self.raw_cbor {
            Some(bytes) => bytes.len(),
            None => crate::cbor_size::encoded_len(&self.body),
        };

        self.size_cache.set(Some(size));
        size
    }
}
