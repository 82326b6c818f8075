//! The top-level entry point (spec.md §2/§5): run every validator against
//! a transaction, and if it passes, apply every mutator.

use tracing::{debug, warn};

use crate::params::Environment;
use crate::rules::mutators::{self, MutationContext};
use crate::rules::validators::{self, ValidationContext};
use crate::rules::{Mutator, RuleError, Validator};
use crate::state::{CertState, UTxOState};
use crate::tx::Transaction;
use crate::vm::ScriptEvaluator;

/// Validate `tx` against `utxo_state`/`cert_state` under `env`, and if
/// every rule passes, apply its effects in place.
///
/// Validation runs the short-circuiting prefix first (stopping at the
/// first failure — later rules assume the transaction has resolvable
/// inputs and a valid slot window), then the accumulating suffix (running
/// every remaining rule and collecting every failure, per spec.md §4.6).
pub fn apply_tx(
    tx: &Transaction,
    utxo_state: &mut UTxOState,
    cert_state: &mut CertState,
    env: &Environment<'_>,
    evaluator: &dyn ScriptEvaluator,
) -> Result<(), RuleError> {
    validate_tx(tx, utxo_state, cert_state, env, evaluator)?;

    let mut mutation_ctx = MutationContext {
        tx,
        utxo_state,
        cert_state,
        params: env.params,
    };

    for mutator in mutators::ordered_mutators() {
        mutator.mutate(&mut mutation_ctx)?;
    }

    debug!(tx = %hex::encode(tx.id()), "applied transaction");
    Ok(())
}

/// Run the full validator list without applying any mutation — useful for
/// mempool-style admission checks that don't own the ledger state.
pub fn validate_tx(
    tx: &Transaction,
    utxo_state: &UTxOState,
    cert_state: &CertState,
    env: &Environment<'_>,
    evaluator: &dyn ScriptEvaluator,
) -> Result<(), RuleError> {
    let ctx = ValidationContext {
        tx,
        utxo_state,
        cert_state,
        env,
        evaluator,
    };

    for validator in validators::short_circuit_prefix() {
        if let Err(err) = validator.validate(&ctx) {
            warn!(tx = %hex::encode(tx.id()), %err, "transaction failed structural validation");
            return Err(err);
        }
    }

    let failures: Vec<RuleError> = validators::accumulating_suffix()
        .into_iter()
        .filter_map(|validator| validator.validate(&ctx).err())
        .collect();

    match failures.len() {
        0 => Ok(()),
        1 => {
            let err = failures.into_iter().next().expect("len checked above");
            warn!(tx = %hex::encode(tx.id()), %err, "transaction failed validation");
            Err(err)
        }
        _ => {
            warn!(tx = %hex::encode(tx.id()), count = failures.len(), "transaction failed multiple validation rules");
            Err(RuleError::Multiple(failures))
        }
    }
}
