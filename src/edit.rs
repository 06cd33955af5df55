//! Structural edits over an `AnalysisResult`.
//!
//! Edits are applied to a private copy; the caller's result is left untouched so a rejected
//! edit never disturbs the last good analysis. After the edits every derived field is
//! recomputed, and when more than one output remains the last one is treated as change and
//! rebalanced at the hour-confirmation fee rate.

use std::str::FromStr;

use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::{
    analyzer::{
        AnalysisResult, ChangeOutput, EnrichedInput, EnrichedOutput, FeeAssessment, fee_rate,
        record_assessment, settle_fee, signed_difference, sum_amounts, summary::script_summary,
    },
    fees::{FeeEstimator, FeeRates},
    script::{ClassifiedScript, ScriptType},
    selection::DUST_THRESHOLD,
    size::{estimate_input_vbytes, estimate_tx_vsize, output_vbytes_for_script_len},
};

pub const ASSUMED_CHANGE_REASON: &str = "Assumed last output as change after edit";
pub const INSUFFICIENT_FUNDS_SUGGESTION: &str = "Invalid: insufficient funds for outputs and fee";

/// Address shown for inputs and outputs created from a type tag rather than a script.
pub const UNRESOLVED_ADDRESS: &str = "N/A";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    AddInput { amount: u64, script_type: ScriptType },
    RemoveInput { index: usize },
    AddOutput { amount: u64, script_type: ScriptType },
    RemoveOutput { index: usize },
    SetOutputAmount { index: usize, amount: u64 },
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Input index {index} out of range ({len} inputs)")]
    InputIndexOutOfRange { index: usize, len: usize },
    #[error("Output index {index} out of range ({len} outputs)")]
    OutputIndexOutOfRange { index: usize, len: usize },
    #[error("Amount {amount} sat exceeds the 21M BTC supply")]
    AmountOutOfRange { amount: u64 },
    #[error("Invalid edit '{edit}': {reason}")]
    Parse { edit: String, reason: String },
}

impl FromStr for Edit {
    type Err = EditError;

    /// Parses `add-input <amount> <script_type>`, `remove-input <index>`,
    /// `add-output <amount> <script_type>`, `remove-output <index>` and
    /// `set-output-amount <index> <amount>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: &str| EditError::Parse {
            edit: s.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = s.split_whitespace().collect();
        let index = |i: usize| -> Result<usize, EditError> {
            parts
                .get(i)
                .ok_or_else(|| parse_error("missing argument"))?
                .parse::<usize>()
                .map_err(|e| parse_error(&e.to_string()))
        };
        let amount = |i: usize| -> Result<u64, EditError> {
            parts
                .get(i)
                .ok_or_else(|| parse_error("missing argument"))?
                .parse::<u64>()
                .map_err(|e| parse_error(&e.to_string()))
                .and_then(check_amount)
        };
        let script_type = |i: usize| -> Result<ScriptType, EditError> {
            parts
                .get(i)
                .ok_or_else(|| parse_error("missing script type"))?
                .parse::<ScriptType>()
                .map_err(|_| parse_error("unknown script type"))
        };
        let expect_args = |n: usize| -> Result<(), EditError> {
            if parts.len() == n + 1 {
                Ok(())
            } else {
                Err(parse_error(&format!("expected {} argument(s)", n)))
            }
        };
        let edit = match parts.first().copied() {
            Some("add-input") => {
                expect_args(2)?;
                Edit::AddInput {
                    amount: amount(1)?,
                    script_type: script_type(2)?,
                }
            }
            Some("remove-input") => {
                expect_args(1)?;
                Edit::RemoveInput {
                    index: index(1)?,
                }
            }
            Some("add-output") => {
                expect_args(2)?;
                Edit::AddOutput {
                    amount: amount(1)?,
                    script_type: script_type(2)?,
                }
            }
            Some("remove-output") => {
                expect_args(1)?;
                Edit::RemoveOutput {
                    index: index(1)?,
                }
            }
            Some("set-output-amount") => {
                expect_args(2)?;
                Edit::SetOutputAmount {
                    index: index(1)?,
                    amount: amount(2)?,
                }
            }
            Some(_) => return Err(parse_error("unknown operation")),
            None => return Err(parse_error("empty edit")),
        };
        Ok(edit)
    }
}

fn classified_from_type(script_type: ScriptType) -> ClassifiedScript {
    match script_type {
        ScriptType::Unknown => ClassifiedScript::non_standard(script_type),
        _ => ClassifiedScript {
            script_type,
            address: UNRESOLVED_ADDRESS.to_string(),
            address_type: script_type.address_type().to_string(),
        },
    }
}

fn check_amount(amount: u64) -> Result<u64, EditError> {
    if Amount::from_sat(amount) > Amount::MAX_MONEY {
        Err(EditError::AmountOutOfRange { amount })
    } else {
        Ok(amount)
    }
}

fn check_index(index: usize, len: usize, input: bool) -> Result<(), EditError> {
    match (index < len, input) {
        (true, _) => Ok(()),
        (false, true) => Err(EditError::InputIndexOutOfRange { index, len }),
        (false, false) => Err(EditError::OutputIndexOutOfRange { index, len }),
    }
}

fn apply(result: &mut AnalysisResult, edit: &Edit) -> Result<(), EditError> {
    match *edit {
        Edit::AddInput {
            amount,
            script_type,
        } => result.inputs.push(EnrichedInput::new(
            check_amount(amount)?,
            classified_from_type(script_type),
            estimate_input_vbytes(script_type),
        )),
        Edit::RemoveInput { index } => {
            check_index(index, result.inputs.len(), true)?;
            result.inputs.remove(index);
        }
        Edit::AddOutput {
            amount,
            script_type,
        } => result.outputs.push(EnrichedOutput::new(
            check_amount(amount)?,
            classified_from_type(script_type),
            output_vbytes_for_script_len(script_type.standard_script_len()),
        )),
        Edit::RemoveOutput { index } => {
            check_index(index, result.outputs.len(), false)?;
            result.outputs.remove(index);
        }
        Edit::SetOutputAmount { index, amount } => {
            check_index(index, result.outputs.len(), false)?;
            result.outputs[index].amount = check_amount(amount)?;
        }
    }
    Ok(())
}

pub async fn apply_edits<F: FeeEstimator>(
    analysis: &AnalysisResult,
    edits: &[Edit],
    fees: &F,
) -> Result<AnalysisResult, EditError> {
    let mut result = analysis.clone();
    for edit in edits {
        apply(&mut result, edit)?;
    }
    recompute(&mut result, fees).await;
    Ok(result)
}

async fn recompute<F: FeeEstimator>(result: &mut AnalysisResult, fees: &F) {
    result.total_input_value = sum_amounts(result.inputs.iter().map(|i| i.amount));
    result.total_output_value = sum_amounts(result.outputs.iter().map(|o| o.amount));
    result.script_summary = script_summary(
        result
            .inputs
            .iter()
            .map(|i| i.script_type)
            .chain(result.outputs.iter().map(|o| o.script_type)),
    );
    result.change_output = None;
    if result.outputs.len() <= 1 {
        settle_fee(result, fees).await;
        return;
    }
    let recommended = fees.recommended_fees().await;
    rebalance_change(result, recommended);
}

/// Resizes the assumed change output at the hour rate. The summed totals are left as they
/// were; only the change amount, the output list and the fee fields move.
fn rebalance_change(result: &mut AnalysisResult, recommended: FeeRates) {
    let vsize = estimate_tx_vsize(
        result.inputs.len(),
        result.outputs.len(),
        &result.input_vbytes(),
        &result.output_vbytes(),
    );
    let change_index = result.outputs.len() - 1;
    let change_vbytes = result.outputs[change_index].estimated_output_vbytes;
    let target = sum_amounts(result.outputs[..change_index].iter().map(|o| o.amount));
    let total_input = result.total_input_value;

    let fee = vsize.saturating_mul(recommended.hour_fee);
    let required = target
        .checked_add(fee)
        .and_then(|v| v.checked_add(DUST_THRESHOLD));
    if required.is_some_and(|required| total_input >= required) {
        result.outputs[change_index].amount = total_input - target - fee;
        result.change_output = Some(ChangeOutput {
            index: change_index,
            reason: ASSUMED_CHANGE_REASON.to_string(),
        });
        set_fee(result, signed_difference(fee, 0), vsize, recommended);
        return;
    }

    let output_count = result.outputs.len() as u64;
    let mut vsize_without_change = vsize - change_vbytes;
    // Dropping the 253rd output narrows the output-count varint from 3 bytes to 1.
    if output_count - 1 < 253 && output_count >= 253 {
        vsize_without_change -= 2;
    }
    let fee_without_change = vsize_without_change.saturating_mul(recommended.hour_fee);
    if target
        .checked_add(fee_without_change)
        .is_some_and(|required| total_input >= required)
    {
        info!("Change would be dust, dropping output {}", change_index);
        result.outputs.truncate(change_index);
        set_fee(
            result,
            signed_difference(total_input, target),
            vsize_without_change,
            recommended,
        );
        return;
    }

    warn!(
        "Inputs ({}) cannot cover outputs ({}) plus fee ({})",
        total_input, target, fee_without_change
    );
    result.estimated_vsize = vsize;
    result.inferred_fee = signed_difference(total_input, target);
    result.inferred_fee_rate = 0.0;
    result.fee_invalid = true;
    result.fee_assessment = FeeAssessment::Invalid;
    result.fee_reasonableness_suggestion = INSUFFICIENT_FUNDS_SUGGESTION.to_string();
    result.recommended_fees = Some(recommended);
}

fn set_fee(result: &mut AnalysisResult, fee: i64, vsize: u64, recommended: FeeRates) {
    result.estimated_vsize = vsize;
    result.inferred_fee = fee;
    result.inferred_fee_rate = fee_rate(fee, vsize);
    result.fee_invalid = false;
    record_assessment(result, recommended);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::NON_STANDARD;

    #[test]
    fn test_parse_edits() {
        assert_eq!(
            "add-input 5000 witness_v0_keyhash".parse::<Edit>().unwrap(),
            Edit::AddInput {
                amount: 5000,
                script_type: ScriptType::WitnessV0KeyHash
            }
        );
        assert_eq!(
            "remove-input 2".parse::<Edit>().unwrap(),
            Edit::RemoveInput { index: 2 }
        );
        assert_eq!(
            "add-output 20000 pubkeyhash".parse::<Edit>().unwrap(),
            Edit::AddOutput {
                amount: 20000,
                script_type: ScriptType::PubkeyHash
            }
        );
        assert_eq!(
            "  remove-output   1 ".parse::<Edit>().unwrap(),
            Edit::RemoveOutput { index: 1 }
        );
        assert_eq!(
            "set-output-amount 0 15000".parse::<Edit>().unwrap(),
            Edit::SetOutputAmount {
                index: 0,
                amount: 15000
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_edits() {
        for bad in [
            "",
            "add-input",
            "add-input 5000",
            "add-input five witness_v0_keyhash",
            "add-input 5000 p2wpkh",
            "remove-input 1 2",
            "swap-output 1",
        ] {
            assert!(
                matches!(bad.parse::<Edit>(), Err(EditError::Parse { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_parse_bounds_amounts_by_supply() {
        let max = Amount::MAX_MONEY.to_sat();
        assert_eq!(
            format!("add-output {} pubkeyhash", max).parse::<Edit>(),
            Ok(Edit::AddOutput {
                amount: max,
                script_type: ScriptType::PubkeyHash
            })
        );
        assert_eq!(
            format!("add-input {} pubkeyhash", max + 1).parse::<Edit>(),
            Err(EditError::AmountOutOfRange { amount: max + 1 })
        );
    }

    #[test]
    fn test_added_entries_keep_address_triple_consistent() {
        let known = classified_from_type(ScriptType::WitnessV1Taproot);
        assert_eq!(known.address, UNRESOLVED_ADDRESS);
        assert_eq!(known.address_type, "p2tr");
        let unknown = classified_from_type(ScriptType::Unknown);
        assert_eq!(unknown.address, NON_STANDARD);
        assert_eq!(unknown.address_type, NON_STANDARD);
    }
}
