//! The Plutus script-evaluation interface (spec.md §6).
//!
//! Running the actual Plutus VM (parsing UPLC, applying cost models, phase-2
//! evaluation) is the external collaborator named in spec.md §1 — this
//! module only specifies the boundary: what a script needs to run, and what
//! the rules need back from it. A production caller plugs in a real
//! evaluator (e.g. `uplc`); tests use [`ScriptEvaluator`] stubs.

use thiserror::Error;

use crate::params::ExUnits;
use crate::tx::{RedeemerKey, Script, ScriptHash};

/// Everything a script needs to be evaluated for one redeemer: its compiled
/// form, the datum it closes over (if spending a datum-locked UTxO), the
/// redeemer argument, and the script context CBOR built by the caller from
/// the surrounding transaction and resolved inputs.
#[derive(Debug, Clone)]
pub struct ScriptInvocation<'a> {
    pub script_hash: ScriptHash,
    pub script: &'a Script,
    pub redeemer_key: RedeemerKey,
    pub redeemer_data: &'a [u8],
    pub datum: Option<&'a [u8]>,
    pub script_context: Vec<u8>,
    pub budget: ExUnits,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("script {0} failed to evaluate")]
    ScriptFailure(ScriptHash),
    #[error("script {0} exceeded its ex-units budget")]
    BudgetExceeded(ScriptHash),
    #[error("script {0} uses a cost model the protocol parameters don't carry")]
    MissingCostModel(ScriptHash),
}

/// The measured outcome of evaluating one redeemer: whether the script
/// accepted, and the ex-units it actually consumed (always `<=` the
/// redeemer's declared budget when `Ok`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalResult {
    pub consumed: ExUnits,
}

/// The boundary the rule pipeline calls through for script evaluation
/// (spec.md §4.6 "scripts execute OK", §6). Implementors own everything
/// about actually running Plutus: parsing, cost-model application, builtin
/// semantics.
pub trait ScriptEvaluator {
    fn evaluate(&self, invocation: &ScriptInvocation<'_>) -> Result<EvalResult, EvalError>;
}

/// An evaluator that accepts every invocation and reports the declared
/// budget as fully consumed. Useful for exercising the rule pipeline's
/// control flow in tests without a real Plutus VM.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSucceeds;

impl ScriptEvaluator for AlwaysSucceeds {
    fn evaluate(&self, invocation: &ScriptInvocation<'_>) -> Result<EvalResult, EvalError> {
        Ok(EvalResult {
            consumed: invocation.budget,
        })
    }
}

/// An evaluator that rejects every invocation, for exercising the
/// script-failure path.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysFails;

impl ScriptEvaluator for AlwaysFails {
    fn evaluate(&self, invocation: &ScriptInvocation<'_>) -> Result<EvalResult, EvalError> {
        Err(EvalError::ScriptFailure(invocation.script_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(budget: ExUnits) -> ScriptInvocation<'static> {
        static SCRIPT: Script = Script::PlutusV2(Vec::new());
        ScriptInvocation {
            script_hash: [7; 28].into(),
            script: &SCRIPT,
            redeemer_key: RedeemerKey {
                tag: crate::tx::RedeemerTag::Spend,
                index: 0,
            },
            redeemer_data: &[],
            datum: None,
            script_context: Vec::new(),
            budget,
        }
    }

    #[test]
    fn always_succeeds_reports_full_budget_consumed() {
        let budget = ExUnits { mem: 100, steps: 200 };
        let result = AlwaysSucceeds.evaluate(&invocation(budget)).unwrap();
        assert_eq!(result.consumed, budget);
    }

    #[test]
    fn always_fails_reports_script_failure() {
        let err = AlwaysFails.evaluate(&invocation(ExUnits::ZERO)).unwrap_err();
        assert!(matches!(err, EvalError::ScriptFailure(_)));
    }
}
