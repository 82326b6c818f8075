//! CBOR decode adapters (spec.md §6): converting already-parsed wire
//! structures into this crate's domain types.
//!
//! Bit-exact Conway CBOR parsing is `pallas`'s job — the external
//! collaborator named in spec.md §1. This module is the seam: it walks
//! `pallas::ledger::traverse`'s typed, era-aware view of a transaction and
//! builds the owned [`crate::tx::Transaction`] the rule pipeline actually
//! reads, and separately implements the handful of wire-format quirks the
//! spec calls out by name (the dual pool-registration shape, `StrictMaybe`,
//! CBOR-tag-258 sets) directly over `minicbor`, since those are this
//! crate's own concern rather than something `pallas` abstracts away.

use std::collections::BTreeMap;

use pallas::codec::minicbor::decode::{Decode, Decoder, Error as DecodeErrorInner};
use pallas::ledger::addresses::{Address as PallasAddress, ShelleyDelegationPart, ShelleyPaymentPart};
use pallas::ledger::primitives::conway::DatumOption;
use pallas::ledger::traverse::{Era, MultiEraInput, MultiEraOutput, MultiEraTx};
use thiserror::Error;

use crate::params::{Network, ProtocolParams};
use crate::tx::{
    Address, OutputDatum, PaymentPart, PoolKeyhash, PoolParams, StakeCredential, Transaction,
    TransactionBody, TransactionInput, TransactionOutput, VrfKeyhash, WitnessSet,
};
use crate::value::{MultiAsset, PolicyId, Value};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("pallas failed to parse the transaction CBOR: {0}")]
    Traverse(#[from] pallas::ledger::traverse::Error),
    #[error("malformed CBOR: {0}")]
    Cbor(String),
    #[error("protocol params array is missing required field at index {0}")]
    MissingParamField(usize),
}

/// Decode one transaction's wire bytes for `era` into this crate's domain
/// model. The original bytes are kept as [`Transaction::raw_cbor`] so every
/// size-dependent rule measures the real encoding rather than re-deriving
/// it (spec.md §9).
///
/// Resolved through `pallas`'s typed accessors: `id`, `is_valid`, `fee`,
/// `inputs`, `reference_inputs`, `outputs` (address, value, datum; a
/// reference script carried on an output is not decoded, see
/// [`decode_output`]), and `mint`. Everything else on [`TransactionBody`]
/// (`certificates`, `withdrawals`, `collateral_inputs`, `collateral_return`,
/// `total_collateral`, `required_signers`, `script_data_hash`, `network`,
/// `proposal_procedures`, `voting_procedures`, `donation`) and the whole of
/// [`WitnessSet`] are left at their defaults — this crate's own certificate
/// and witness shapes don't yet have a grounded `pallas` conversion here. A
/// caller whose rules read those fields extends this function rather than
/// trusting it silently.
pub fn decode_transaction(era: Era, bytes: &[u8]) -> Result<Transaction, DecodeError> {
    let parsed = MultiEraTx::decode_for_era(era, bytes)?;

    let id = parsed.hash();
    let is_valid = parsed.is_valid();

    let inputs = parsed.inputs().iter().map(decode_txin).collect();
    let reference_inputs = parsed.reference_inputs().iter().map(decode_txin).collect();

    let outputs = parsed
        .produces()
        .iter()
        .map(|(_, output)| decode_output(output))
        .collect::<Result<Vec<_>, _>>()?;

    let mint = decode_mint(&parsed);

    let body = TransactionBody {
        inputs,
        outputs,
        fee: parsed.fee().unwrap_or(0),
        reference_inputs,
        mint,
        ..Default::default()
    };

    Ok(Transaction::new(
        id,
        body,
        WitnessSet::default(),
        is_valid,
        None,
        Some(bytes.to_vec()),
    ))
}

fn decode_txin(input: &MultiEraInput<'_>) -> TransactionInput {
    TransactionInput {
        transaction_id: *input.hash(),
        index: input.index() as u32,
    }
}

/// Convert one output's address, value and datum (spec.md §3). Only
/// Shelley-era address shapes are modelled by [`crate::tx::Address`]; a
/// Byron bootstrap address or anything else `pallas` might return is
/// rejected rather than silently coerced.
///
/// `script_ref` is always decoded as `None`: pulling the referenced
/// script's raw bytes back out of `pallas`'s `ScriptRef` variants (and
/// hashing each script kind correctly) isn't something this crate's
/// simplified [`crate::tx::Script`] model does yet, so a reference script
/// carried on an output is dropped here rather than guessed at.
fn decode_output(output: &MultiEraOutput<'_>) -> Result<TransactionOutput, DecodeError> {
    let pallas_address = output
        .address()
        .map_err(|e| DecodeError::Cbor(e.to_string()))?;

    let shelley = match &pallas_address {
        PallasAddress::Shelley(shelley) => shelley,
        other => {
            return Err(DecodeError::Cbor(format!(
                "unsupported output address kind: {other:?}"
            )))
        }
    };

    let network = match shelley.network() {
        pallas::ledger::addresses::Network::Mainnet => Network::Mainnet,
        _ => Network::Testnet,
    };

    let payment = match shelley.payment() {
        ShelleyPaymentPart::Key(hash) => PaymentPart::Key(*hash),
        ShelleyPaymentPart::Script(hash) => PaymentPart::Script(*hash),
    };

    let stake = match shelley.delegation() {
        ShelleyDelegationPart::Key(hash) => Some(StakeCredential::AddrKeyhash(*hash)),
        ShelleyDelegationPart::Script(hash) => Some(StakeCredential::ScriptHash(*hash)),
        ShelleyDelegationPart::Pointer(_) | ShelleyDelegationPart::Null => None,
    };

    let address = Address { network, payment, stake };

    let value = Value {
        coin: crate::numeric::Coin::from_u64(output.value().coin()),
        assets: decode_value_assets(&output.value()),
    };

    let datum = match output.datum() {
        None => OutputDatum::None,
        Some(DatumOption::Hash(hash)) => OutputDatum::Hash(hash),
        Some(DatumOption::Data(data)) => {
            use pallas::ledger::traverse::OriginalHash;
            OutputDatum::Inline(data.original_hash())
        }
    };

    Ok(TransactionOutput { address, value, datum, script_ref: None })
}

fn decode_value_assets(value: &pallas::ledger::traverse::MultiEraValue<'_>) -> MultiAsset {
    let mut raw: BTreeMap<PolicyId, BTreeMap<Vec<u8>, i128>> = BTreeMap::new();
    for policy_assets in value.assets() {
        let entry = raw.entry(policy_id(policy_assets.policy())).or_default();
        for asset in policy_assets.assets() {
            let qty = asset.output_coin().unwrap_or_default() as i128;
            entry.insert(asset.name().to_vec(), qty);
        }
    }
    MultiAsset::from_map(raw)
}

fn decode_mint(parsed: &MultiEraTx<'_>) -> Option<MultiAsset> {
    let mut raw: BTreeMap<PolicyId, BTreeMap<Vec<u8>, i128>> = BTreeMap::new();
    for policy_assets in parsed.mints() {
        let entry = raw.entry(policy_id(policy_assets.policy())).or_default();
        for asset in policy_assets.assets() {
            let qty = asset.mint_coin().unwrap_or_default() as i128;
            entry.insert(asset.name().to_vec(), qty);
        }
    }
    if raw.is_empty() {
        None
    } else {
        Some(MultiAsset::from_map(raw))
    }
}

fn policy_id(hash: &pallas::crypto::hash::Hash<28>) -> PolicyId {
    let mut out = [0u8; 28];
    out.copy_from_slice(hash.as_ref());
    out
}

/// `StrictMaybe` (spec.md §6): encoded as a zero-length array for
/// `SNothing`, or a one-element array `[x]` for `SJust(x)`. Ledger CBOR
/// uses this instead of CBOR's own `null`/optional-key conventions in a
/// handful of Conway-era fields (e.g. `PoolParams.relays`' individual
/// optional sub-fields).
pub fn decode_strict_maybe<'b, T, C>(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Option<T>, DecodeErrorInner>
where
    T: Decode<'b, C>,
{
    let len = d.array()?.unwrap_or(0);
    match len {
        0 => Ok(None),
        1 => Ok(Some(T::decode(d, ctx)?)),
        other => Err(DecodeErrorInner::message(format!(
            "StrictMaybe array must have 0 or 1 elements, got {other}"
        ))),
    }
}

/// CBOR tag 258 (spec.md §6): the "finite set" wire representation used
/// for `required_signers`, `reference_inputs` and similar ledger sets.
/// Older blocks on the chain encode the same logical set as a plain array
/// without the tag; this accepts both.
pub fn decode_tagged_set<'b, T, C>(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Vec<T>, DecodeErrorInner>
where
    T: Decode<'b, C>,
{
    if d.datatype()? == pallas::codec::minicbor::data::Type::Tag {
        let tag = d.tag()?;
        if tag.as_u64() != 258 {
            return Err(DecodeErrorInner::message(format!(
                "expected set tag 258, got {}",
                tag.as_u64()
            )));
        }
    }

    let len = d.array()?;
    let mut out = Vec::with_capacity(len.unwrap_or(0) as usize);
    match len {
        Some(len) => {
            for _ in 0..len {
                out.push(T::decode(d, ctx)?);
            }
        }
        None => {
            while d.datatype()? != pallas::codec::minicbor::data::Type::Break {
                out.push(T::decode(d, ctx)?);
            }
            d.skip()?;
        }
    }
    Ok(out)
}

/// Pool registration certificates exist in two wire shapes (spec.md §6):
/// a 9-field Shelley-era shape and an 8-field Conway shape that dropped one
/// legacy field. Both start with `(operator: bytes[28], vrf_keyhash:
/// bytes[32], pledge: uint, cost: uint, margin: rational, ...)`, so the
/// shapes are distinguished by the certificate's declared array length,
/// not by guessing at byte-string widths.
pub fn decode_pool_params(
    d: &mut Decoder<'_>,
    field_count: u64,
) -> Result<PoolParams, DecodeErrorInner> {
    if field_count != 8 && field_count != 9 {
        return Err(DecodeErrorInner::message(format!(
            "pool registration certificate has {field_count} fields, expected 8 or 9"
        )));
    }

    let operator: PoolKeyhash = decode_hash28(d)?;
    let vrf_keyhash: VrfKeyhash = decode_hash32(d)?;
    let pledge = d.u64()?;
    let cost = d.u64()?;

    // margin (rational), reward account, owners set, relays, metadata: not
    // modelled by this crate's simplified `PoolParams` (spec.md §3), so
    // they're skipped rather than decoded into fields nothing reads.
    let remaining = if field_count == 9 { 5 } else { 4 };
    for _ in 0..remaining {
        d.skip()?;
    }

    Ok(PoolParams { operator, vrf_keyhash, pledge, cost })
}

fn decode_hash28(d: &mut Decoder<'_>) -> Result<PoolKeyhash, DecodeErrorInner> {
    let bytes = d.bytes()?;
    <[u8; 28]>::try_from(bytes)
        .map(Into::into)
        .map_err(|_| DecodeErrorInner::message("expected a 28-byte hash"))
}

fn decode_hash32(d: &mut Decoder<'_>) -> Result<VrfKeyhash, DecodeErrorInner> {
    let bytes = d.bytes()?;
    <[u8; 32]>::try_from(bytes)
        .map(Into::into)
        .map_err(|_| DecodeErrorInner::message("expected a 32-byte hash"))
}

/// Decode a Conway-era protocol-param update/bundle encoded as a CBOR
/// array (spec.md §6): at least 31 positional fields, trailing fields
/// beyond what this crate recognizes tolerated rather than rejected, so a
/// future protocol version adding a 32nd field doesn't break parsing of
/// the 31 this crate actually uses.
pub fn decode_protocol_params(d: &mut Decoder<'_>) -> Result<ProtocolParams, DecodeError> {
    let len = d.array().map_err(|e| DecodeError::Cbor(e.to_string()))?.unwrap_or(0);
    if len < 31 {
        return Err(DecodeError::MissingParamField(len as usize));
    }

    let mut fields_read: u64 = 0;
    fn next_u64(d: &mut Decoder<'_>, fields_read: &mut u64) -> Result<u64, DecodeError> {
        *fields_read += 1;
        d.u64().map_err(|e| DecodeError::Cbor(e.to_string()))
    }

    let min_fee_a = next_u64(d, &mut fields_read)?;
    let min_fee_b = next_u64(d, &mut fields_read)?;
    let max_tx_size = next_u64(d, &mut fields_read)?;

    // max_block_body_size, max_block_header_size: read and discarded, not
    // part of this crate's transaction-level rule set (spec.md §1
    // Non-goals: block-level rules).
    next_u64(d, &mut fields_read)?;
    next_u64(d, &mut fields_read)?;

    let stake_address_deposit = crate::numeric::Coin::from_u64(next_u64(d, &mut fields_read)?);
    let pool_deposit = crate::numeric::Coin::from_u64(next_u64(d, &mut fields_read)?);

    // maximum_epoch, desired_number_of_stake_pools, pool_pledge_influence,
    // expansion_rate, treasury_growth_rate: stake-pool-reward-cycle
    // parameters outside this crate's scope (spec.md §1 Non-goals).
    for _ in 0..5 {
        d.skip().map_err(|e| DecodeError::Cbor(e.to_string()))?;
        fields_read += 1;
    }

    // protocol_version (major/minor as a 2-array).
    let (protocol_major_version, protocol_minor_version) = {
        let plen = d.array().map_err(|e| DecodeError::Cbor(e.to_string()))?.unwrap_or(2);
        let major = d.u64().map_err(|e| DecodeError::Cbor(e.to_string()))?;
        let minor = d.u64().map_err(|e| DecodeError::Cbor(e.to_string()))?;
        for _ in 2..plen {
            d.skip().map_err(|e| DecodeError::Cbor(e.to_string()))?;
        }
        fields_read += 1;
        (major, minor)
    };

    // min_pool_cost: skipped (reward-distribution parameter).
    d.skip().map_err(|e| DecodeError::Cbor(e.to_string()))?;
    fields_read += 1;

    let coins_per_utxo_byte = next_u64(d, &mut fields_read)?;

    // cost_models: a map from language id to a flat array of integers.
    let cost_models = {
        let map_len = d.map().map_err(|e| DecodeError::Cbor(e.to_string()))?.unwrap_or(0);
        let mut models = std::collections::BTreeMap::new();
        for _ in 0..map_len {
            let lang = d.u8().map_err(|e| DecodeError::Cbor(e.to_string()))?;
            let arr_len = d.array().map_err(|e| DecodeError::Cbor(e.to_string()))?.unwrap_or(0);
            let mut costs = Vec::with_capacity(arr_len as usize);
            for _ in 0..arr_len {
                costs.push(d.i64().map_err(|e| DecodeError::Cbor(e.to_string()))?);
            }
            models.insert(lang, costs);
        }
        fields_read += 1;
        models
    };

    let mem_num = next_u64(d, &mut fields_read)?;
    let mem_den = next_u64(d, &mut fields_read)?;
    let step_num = next_u64(d, &mut fields_read)?;
    let step_den = next_u64(d, &mut fields_read)?;

    let max_tx_execution_units = crate::params::ExUnits {
        mem: next_u64(d, &mut fields_read)?,
        steps: next_u64(d, &mut fields_read)?,
    };
    let max_block_ex_units = crate::params::ExUnits {
        mem: next_u64(d, &mut fields_read)?,
        steps: next_u64(d, &mut fields_read)?,
    };

    let max_value_size = next_u64(d, &mut fields_read)?;
    let collateral_percentage = next_u64(d, &mut fields_read)?;
    let max_collateral_inputs = next_u64(d, &mut fields_read)?;

    // Remaining Conway-only fields (pool/drep/gov-action voting
    // thresholds, committee sizing, gov-action lifetime): read in whatever
    // order the real CDDL defines, but this crate only keeps the two
    // deposit amounts and the per-byte reference-script fee price named in
    // spec.md §4.5/§4.3.
    let drep_deposit = crate::numeric::Coin::from_u64(next_u64(d, &mut fields_read)?);
    let gov_action_deposit = crate::numeric::Coin::from_u64(next_u64(d, &mut fields_read)?);

    // Index 30 (spec.md §6): present from Conway onwards. Tolerate its
    // absence on a pre-Conway params snapshot decoded through this path.
    let min_fee_ref_script_cost_per_byte = if fields_read < len {
        next_u64(d, &mut fields_read)?
    } else {
        0
    };

    for _ in fields_read..len {
        d.skip().map_err(|e| DecodeError::Cbor(e.to_string()))?;
    }

    Ok(ProtocolParams {
        min_fee_a,
        min_fee_b,
        max_tx_size,
        max_value_size,
        max_block_ex_units,
        max_tx_execution_units,
        ex_unit_prices: crate::params::ExUnitPrices {
            mem_price: crate::params::ParamRatio { numerator: mem_num, denominator: mem_den },
            step_price: crate::params::ParamRatio { numerator: step_num, denominator: step_den },
        },
        coins_per_utxo_byte,
        stake_address_deposit,
        pool_deposit,
        drep_deposit,
        gov_action_deposit,
        collateral_percentage,
        max_collateral_inputs,
        min_fee_ref_script_cost_per_byte,
        cost_models,
        protocol_major_version,
        protocol_minor_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallas::codec::minicbor::Encoder;

    #[test]
    fn strict_maybe_nothing_is_empty_array() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).array(0).unwrap();
        let mut d = Decoder::new(&buf);
        let value: Option<u64> = decode_strict_maybe(&mut d, &mut ()).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn strict_maybe_just_is_one_element_array() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).array(1).unwrap().u64(42).unwrap();
        let mut d = Decoder::new(&buf);
        let value: Option<u64> = decode_strict_maybe(&mut d, &mut ()).unwrap();
        assert_eq!(value, Some(42));
    }

    #[test]
    fn tagged_set_accepts_plain_array_without_tag() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).array(2).unwrap().u64(1).unwrap().u64(2).unwrap();
        let mut d = Decoder::new(&buf);
        let values: Vec<u64> = decode_tagged_set(&mut d, &mut ()).unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn tagged_set_accepts_tag_258_wrapped_array() {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.tag(pallas::codec::minicbor::data::Tag::new(258)).unwrap();
        e.array(1).unwrap().u64(7).unwrap();
        let mut d = Decoder::new(&buf);
        let values: Vec<u64> = decode_tagged_set(&mut d, &mut ()).unwrap();
        assert_eq!(values, vec![7]);
    }

    fn encode_pool_fields(e: &mut Encoder<&mut Vec<u8>>, trailing: u64) {
        e.bytes(&[0x11; 28]).unwrap();
        e.bytes(&[0x22; 32]).unwrap();
        e.u64(1_000_000_000).unwrap();
        e.u64(340_000_000).unwrap();
        for _ in 0..trailing {
            e.array(0).unwrap();
        }
    }

    /// Property 8: the 9-field Shelley-shaped and 8-field Conway-shaped
    /// pool registrations decode to the same `PoolParams`, modulo the
    /// trailing fields (margin, reward account, owners, relays, metadata)
    /// this crate's simplified model doesn't carry.
    #[test]
    fn pool_registration_dual_format_decodes_equal() {
        let mut nine_field = Vec::new();
        encode_pool_fields(&mut Encoder::new(&mut nine_field), 5);
        let mut d9 = Decoder::new(&nine_field);
        let from_nine = decode_pool_params(&mut d9, 9).unwrap();

        let mut eight_field = Vec::new();
        encode_pool_fields(&mut Encoder::new(&mut eight_field), 4);
        let mut d8 = Decoder::new(&eight_field);
        let from_eight = decode_pool_params(&mut d8, 8).unwrap();

        assert_eq!(from_nine, from_eight);
    }

    #[test]
    fn pool_registration_rejects_unexpected_field_count() {
        let mut buf = Vec::new();
        encode_pool_fields(&mut Encoder::new(&mut buf), 4);
        let mut d = Decoder::new(&buf);
        assert!(decode_pool_params(&mut d, 7).is_err());
    }
}
