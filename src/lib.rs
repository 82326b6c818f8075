//! Conway-era Cardano transaction-validation rules: an STS-style rule
//! pipeline, a tx-balance calculator, and min-fee/min-ada calculators.
//!
//! This crate doesn't decode raw block bytes or run the Plutus VM itself —
//! see [`decode`] and [`vm`] for the seams where those external
//! collaborators plug in. What it owns is the pure ledger-rule logic: given
//! an already-parsed transaction and the UTxO/certificate state it would
//! apply against, decide whether it's valid and, if so, what it does to
//! that state.

pub mod balance;
pub mod cbor_size;
pub mod collateral;
pub mod decode;
pub mod deposits;
pub mod encode_impl;
pub mod fees;
pub mod min_ada;
pub mod numeric;
pub mod orchestrator;
pub mod params;
pub mod rules;
pub mod state;
pub mod tx;
pub mod value;
pub mod vm;

pub use orchestrator::{apply_tx, validate_tx};
pub use rules::RuleError;
