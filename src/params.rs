//! Protocol parameters and the read-only validation environment.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_rational::Ratio;
use serde::{Deserialize, Serialize};

use crate::numeric::{BigRatio, Coin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub const ZERO: ExUnits = ExUnits { mem: 0, steps: 0 };

    pub fn is_zero(&self) -> bool {
        self.mem == 0 && self.steps == 0
    }

    pub fn checked_add(self, other: ExUnits) -> Option<ExUnits> {
        Some(ExUnits {
            mem: self.mem.checked_add(other.mem)?,
            steps: self.steps.checked_add(other.steps)?,
        })
    }

    pub fn le(&self, other: &ExUnits) -> bool {
        self.mem <= other.mem && self.steps <= other.steps
    }
}

/// `Ratio` as stored in protocol params, serialized the way the spec's CBOR
/// wire format tags rationals (`Tagged(30, [numerator, denominator])`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRatio {
    pub numerator: u64,
    pub denominator: u64,
}

impl ParamRatio {
    pub fn as_big_ratio(&self) -> BigRatio {
        Ratio::new(BigInt::from(self.numerator), BigInt::from(self.denominator))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExUnitPrices {
    pub mem_price: ParamRatio,
    pub step_price: ParamRatio,
}

/// Protocol parameters as of the Conway era. Field set per spec.md §3/§6;
/// trailing fields beyond what a decoder recognizes are tolerated by the
/// CBOR adapter in [`crate::decode`], not by this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub min_fee_a: u64,
    pub min_fee_b: u64,

    pub max_tx_size: u64,
    pub max_value_size: u64,
    pub max_block_ex_units: ExUnits,
    pub max_tx_execution_units: ExUnits,
    pub ex_unit_prices: ExUnitPrices,

    pub coins_per_utxo_byte: u64,

    pub stake_address_deposit: Coin,
    pub pool_deposit: Coin,
    pub drep_deposit: Coin,
    pub gov_action_deposit: Coin,

    pub collateral_percentage: u64,
    pub max_collateral_inputs: u64,

    pub min_fee_ref_script_cost_per_byte: u64,

    pub cost_models: BTreeMap<u8, Vec<i64>>,

    pub protocol_major_version: u64,
    pub protocol_minor_version: u64,
}

impl ProtocolParams {
    /// The constant tiering parameters for the reference-script fee walk
    /// (spec.md §4.5): stride of 25,600 bytes, multiplier 1.2 per tier.
    pub const REF_SCRIPT_FEE_STRIDE: u64 = 25_600;

    pub fn ref_script_fee_multiplier() -> BigRatio {
        Ratio::new(BigInt::from(6), BigInt::from(5))
    }

    pub fn min_ada_constant_overhead() -> u64 {
        160
    }
}

/// Read-only context threaded through every validator and mutator.
#[derive(Debug, Clone)]
pub struct Environment<'a> {
    pub slot: u64,
    pub network: Network,
    pub params: &'a ProtocolParams,
}

/// Shared fixture used across the crate's own unit tests, grounded on the
/// historical preprod parameter values (`min_fee_a = 44`, `min_fee_b =
/// 155_381`, `collateral_percentage = 150`).
#[cfg(test)]
pub mod test_support {
    use super::*;

    pub fn sample_params() -> ProtocolParams {
        ProtocolParams {
            min_fee_a: 44,
            min_fee_b: 155_381,
            max_tx_size: 16_384,
            max_value_size: 5_000,
            max_block_ex_units: ExUnits { mem: 62_000_000, steps: 40_000_000_000 },
            max_tx_execution_units: ExUnits { mem: 14_000_000, steps: 10_000_000_000 },
            ex_unit_prices: ExUnitPrices {
                mem_price: ParamRatio { numerator: 577, denominator: 10_000 },
                step_price: ParamRatio { numerator: 721, denominator: 10_000_000 },
            },
            coins_per_utxo_byte: 4_310,
            stake_address_deposit: Coin::from_u64(2_000_000),
            pool_deposit: Coin::from_u64(500_000_000),
            drep_deposit: Coin::from_u64(500_000_000),
            gov_action_deposit: Coin::from_u64(100_000_000_000),
            collateral_percentage: 150,
            max_collateral_inputs: 3,
            min_fee_ref_script_cost_per_byte: 15,
            cost_models: Default::default(),
            protocol_major_version: 10,
            protocol_minor_version: 0,
        }
    }
}
