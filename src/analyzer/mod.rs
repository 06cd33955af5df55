//! Fee and change analysis of a decoded PSBT.
//!
//! Inputs without resolvable UTXO data are skipped and listed in
//! `AnalysisResult::unanalyzable_inputs`. A transaction whose outputs exceed its inputs is
//! reported with a zero fee, zero rate and `fee_invalid` set rather than as an error.

use bitcoin::Network;
use tracing::{debug, info};

pub mod change;
pub mod summary;
mod types;

pub use types::{AnalysisResult, ChangeOutput, EnrichedInput, EnrichedOutput, FeeAssessment};

use crate::{
    fees::{FeeEstimator, FeeRates},
    psbt::{self, DecodeError, PsbtDocument},
    script::classify,
    size::{estimate_input_vbytes, estimate_output_vbytes, estimate_tx_vsize},
};

pub const NEGATIVE_FEE_SUGGESTION: &str = "Invalid: negative fee";

pub async fn analyze<F: FeeEstimator>(
    document: &PsbtDocument,
    network: Network,
    fees: &F,
) -> AnalysisResult {
    let mut inputs = vec![];
    let mut unanalyzable_inputs = vec![];
    for (index, input) in document.inputs.iter().enumerate() {
        match input.spent_output() {
            Some(txout) => {
                let classified = classify(&txout.script_pubkey, network);
                let vbytes = estimate_input_vbytes(classified.script_type);
                inputs.push(EnrichedInput::new(txout.value.to_sat(), classified, vbytes));
            }
            None => unanalyzable_inputs.push(index),
        }
    }

    let mut outputs = vec![];
    let mut ownership = vec![];
    for output in &document.outputs {
        let script_pubkey = &output.txout.script_pubkey;
        outputs.push(EnrichedOutput::new(
            output.txout.value.to_sat(),
            classify(script_pubkey, network),
            estimate_output_vbytes(script_pubkey),
        ));
        ownership.push(output.metadata.indicates_ownership());
    }

    let change_output = change::detect_change(&inputs, &outputs, &ownership);
    if let Some(change) = &change_output {
        info!("Output {} looks like change: {}", change.index, change.reason);
    }

    let mut result = AnalysisResult {
        version: document.version,
        tx_version: document.tx_version,
        total_input_value: sum_amounts(inputs.iter().map(|i| i.amount)),
        total_output_value: sum_amounts(outputs.iter().map(|o| o.amount)),
        script_summary: summary::script_summary(
            inputs
                .iter()
                .map(|i| i.script_type)
                .chain(outputs.iter().map(|o| o.script_type)),
        ),
        inputs,
        outputs,
        unanalyzable_inputs,
        inferred_fee: 0,
        inferred_fee_rate: 0.0,
        estimated_vsize: 0,
        fee_invalid: false,
        change_output,
        recommended_fees: None,
        fee_assessment: FeeAssessment::Reasonable,
        fee_reasonableness_suggestion: String::new(),
    };
    settle_fee(&mut result, fees).await;
    result
}

/// Decodes and analyzes in one step, for callers holding the base64 text.
pub async fn analyze_base64<F: FeeEstimator>(
    encoded: &str,
    network: Network,
    fees: &F,
) -> Result<AnalysisResult, DecodeError> {
    let document = psbt::decode(encoded)?;
    Ok(analyze(&document, network, fees).await)
}

/// Fills the fee, vsize, rate and reasonableness fields from the current totals.
pub(crate) async fn settle_fee<F: FeeEstimator>(result: &mut AnalysisResult, fees: &F) {
    debug!("  total_inputs:  {}", result.total_input_value);
    debug!("- total_outputs: {}", result.total_output_value);
    let fee = signed_difference(result.total_input_value, result.total_output_value);
    if fee < 0 {
        mark_invalid(result, NEGATIVE_FEE_SUGGESTION);
        return;
    }
    result.estimated_vsize = estimate_tx_vsize(
        result.inputs.len(),
        result.outputs.len(),
        &result.input_vbytes(),
        &result.output_vbytes(),
    );
    result.inferred_fee = fee;
    result.inferred_fee_rate = fee_rate(fee, result.estimated_vsize);
    result.fee_invalid = false;
    let recommended = fees.recommended_fees().await;
    record_assessment(result, recommended);
}

pub(crate) fn mark_invalid(result: &mut AnalysisResult, suggestion: &str) {
    result.inferred_fee = 0;
    result.inferred_fee_rate = 0.0;
    result.estimated_vsize = 0;
    result.fee_invalid = true;
    result.fee_assessment = FeeAssessment::Invalid;
    result.fee_reasonableness_suggestion = suggestion.to_string();
    result.recommended_fees = None;
}

pub(crate) fn record_assessment(result: &mut AnalysisResult, recommended: FeeRates) {
    let assessment = assess_fee_rate(result.inferred_fee_rate, &recommended);
    result.fee_assessment = assessment;
    result.fee_reasonableness_suggestion =
        assessment.suggestion(result.inferred_fee_rate, &recommended);
    result.recommended_fees = Some(recommended);
}

/// Saturates at `u64::MAX` instead of overflowing.
pub fn sum_amounts(amounts: impl IntoIterator<Item = u64>) -> u64 {
    amounts.into_iter().fold(0, u64::saturating_add)
}

/// `a - b` clamped to the `i64` range.
pub fn signed_difference(a: u64, b: u64) -> i64 {
    let difference = a as i128 - b as i128;
    difference.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

pub fn fee_rate(fee: i64, vsize: u64) -> f64 {
    if vsize == 0 {
        0.0
    } else {
        fee as f64 / vsize as f64
    }
}

pub fn assess_fee_rate(rate: f64, recommended: &FeeRates) -> FeeAssessment {
    if rate < recommended.half_hour_fee as f64 {
        FeeAssessment::Low
    } else if rate > recommended.fastest_fee as f64 {
        FeeAssessment::VeryHigh
    } else {
        FeeAssessment::Reasonable
    }
}

impl FeeAssessment {
    pub fn suggestion(&self, rate: f64, recommended: &FeeRates) -> String {
        match self {
            FeeAssessment::Low => format!(
                "Fee rate {:.2} sat/vB is low, may exceed 30 minutes to confirm (half-hour rate: {} sat/vB)",
                rate, recommended.half_hour_fee
            ),
            FeeAssessment::VeryHigh => format!(
                "Fee rate {:.2} sat/vB is very high, likely overpaying (fastest rate: {} sat/vB)",
                rate, recommended.fastest_fee
            ),
            FeeAssessment::Reasonable => format!(
                "Fee rate {:.2} sat/vB is reasonable for fast confirmation",
                rate
            ),
            FeeAssessment::Invalid => NEGATIVE_FEE_SUGGESTION.to_string(),
        }
    }
}
