use serde::Serialize;
use strum::Display;

use crate::fees::FeeRates;
use crate::script::{ClassifiedScript, ScriptType};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedInput {
    pub amount: u64,
    pub script_type: ScriptType,
    pub address: String,
    pub address_type: String,
    pub estimated_input_vbytes: u64,
}

impl EnrichedInput {
    pub fn new(amount: u64, classified: ClassifiedScript, estimated_input_vbytes: u64) -> Self {
        Self {
            amount,
            script_type: classified.script_type,
            address: classified.address,
            address_type: classified.address_type,
            estimated_input_vbytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedOutput {
    pub amount: u64,
    pub script_type: ScriptType,
    pub address: String,
    pub address_type: String,
    pub estimated_output_vbytes: u64,
}

impl EnrichedOutput {
    pub fn new(amount: u64, classified: ClassifiedScript, estimated_output_vbytes: u64) -> Self {
        Self {
            amount,
            script_type: classified.script_type,
            address: classified.address,
            address_type: classified.address_type,
            estimated_output_vbytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeOutput {
    /// Position in `AnalysisResult::outputs`.
    pub index: usize,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeeAssessment {
    Low,
    Reasonable,
    VeryHigh,
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub version: u32,
    pub tx_version: i32,
    pub inputs: Vec<EnrichedInput>,
    pub outputs: Vec<EnrichedOutput>,
    /// Indices (in the decoded document) of inputs excluded for missing UTXO data.
    pub unanalyzable_inputs: Vec<usize>,
    pub total_input_value: u64,
    pub total_output_value: u64,
    pub inferred_fee: i64,
    pub inferred_fee_rate: f64,
    pub estimated_vsize: u64,
    pub fee_invalid: bool,
    pub change_output: Option<ChangeOutput>,
    pub recommended_fees: Option<FeeRates>,
    pub fee_assessment: FeeAssessment,
    pub fee_reasonableness_suggestion: String,
    pub script_summary: String,
}

impl AnalysisResult {
    pub fn change(&self) -> Option<(&EnrichedOutput, &str)> {
        self.change_output.as_ref().and_then(|change| {
            self.outputs
                .get(change.index)
                .map(|output| (output, change.reason.as_str()))
        })
    }

    /// Value paid to outputs other than the change output.
    pub fn payment_value(&self) -> u64 {
        let change = self.change().map(|(output, _)| output.amount).unwrap_or(0);
        self.total_output_value.saturating_sub(change)
    }

    pub fn input_vbytes(&self) -> Vec<u64> {
        self.inputs.iter().map(|i| i.estimated_input_vbytes).collect()
    }

    pub fn output_vbytes(&self) -> Vec<u64> {
        self.outputs.iter().map(|o| o.estimated_output_vbytes).collect()
    }
}
