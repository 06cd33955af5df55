//! Greedy coin selection simulation.
//!
//! Each strategy orders the same UTXO multiset differently and accumulates coins until the
//! selection pays the target plus the fee for the resulting transaction size. Running out of
//! coins is an ordinary outcome reported per strategy.

use indexmap::IndexMap;
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::{
    analyzer::AnalysisResult,
    script::ScriptType,
    size::{estimate_tx_vsize, output_vbytes_for_script_len},
};

/// Change at or below this is uneconomical to create.
pub const DUST_THRESHOLD: u64 = 546;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    LargestFirst,
    SmallestFirst,
    Random,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::LargestFirst,
        Strategy::SmallestFirst,
        Strategy::Random,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Utxo {
    pub amount: u64,
    pub vbytes: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionParams {
    pub target: u64,
    /// sat/vB
    pub fee_rate: f64,
    pub recipient_output_vbytes: Vec<u64>,
    pub change_output_vbytes: u64,
    pub force_no_change: bool,
}

impl SelectionParams {
    /// One P2WPKH-sized recipient output and a P2WPKH-sized change output.
    pub fn new(target: u64, fee_rate: f64) -> Self {
        let p2wpkh =
            output_vbytes_for_script_len(ScriptType::WitnessV0KeyHash.standard_script_len());
        Self {
            target,
            fee_rate,
            recipient_output_vbytes: vec![p2wpkh],
            change_output_vbytes: p2wpkh,
            force_no_change: false,
        }
    }

    pub fn with_recipient_outputs(mut self, recipient_output_vbytes: Vec<u64>) -> Self {
        self.recipient_output_vbytes = recipient_output_vbytes;
        self
    }

    pub fn with_change_output_vbytes(mut self, change_output_vbytes: u64) -> Self {
        self.change_output_vbytes = change_output_vbytes;
        self
    }

    pub fn with_force_no_change(mut self, force_no_change: bool) -> Self {
        self.force_no_change = force_no_change;
        self
    }

    /// Re-runs the payment described by an analysis: its inputs become the UTXO pool, the
    /// non-change outputs the recipients, and change is only allowed if the analysis found one.
    pub fn from_analysis(analysis: &AnalysisResult, fee_rate: f64) -> (Vec<Utxo>, Self) {
        let utxos = analysis
            .inputs
            .iter()
            .map(|input| Utxo {
                amount: input.amount,
                vbytes: input.estimated_input_vbytes,
            })
            .collect();
        let change_index = analysis.change_output.as_ref().map(|c| c.index);
        let recipients = analysis
            .outputs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != change_index)
            .map(|(_, output)| output.estimated_output_vbytes)
            .collect();
        let mut params = Self::new(analysis.payment_value(), fee_rate)
            .with_recipient_outputs(recipients)
            .with_force_no_change(change_index.is_none());
        if let Some((change, _)) = analysis.change() {
            params = params.with_change_output_vbytes(change.estimated_output_vbytes);
        }
        (utxos, params)
    }

    fn vsize(&self, selected: &[Utxo], with_change: bool) -> u64 {
        let mut outputs = self.recipient_output_vbytes.clone();
        if with_change {
            outputs.push(self.change_output_vbytes);
        }
        let inputs: Vec<u64> = selected.iter().map(|u| u.vbytes).collect();
        estimate_tx_vsize(inputs.len(), outputs.len(), &inputs, &outputs)
    }

    fn fee_for(&self, vsize: u64) -> u64 {
        (vsize as f64 * self.fee_rate).floor() as u64
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoinSelection {
    pub selected_amounts: Vec<u64>,
    pub total_input: u64,
    pub fee: u64,
    pub change: u64,
    pub vsize: u64,
    pub effective_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionOutcome {
    Selected(CoinSelection),
    InsufficientFunds { available: u64, target: u64 },
}

impl SelectionOutcome {
    pub fn selection(&self) -> Option<&CoinSelection> {
        match self {
            SelectionOutcome::Selected(selection) => Some(selection),
            SelectionOutcome::InsufficientFunds { .. } => None,
        }
    }
}

pub type SimulationReport = IndexMap<Strategy, SelectionOutcome>;

pub fn simulate(utxos: &[Utxo], params: &SelectionParams) -> SimulationReport {
    simulate_with_rng(utxos, params, &mut rand::rng())
}

pub fn simulate_with_rng<R: Rng + ?Sized>(
    utxos: &[Utxo],
    params: &SelectionParams,
    rng: &mut R,
) -> SimulationReport {
    Strategy::ALL
        .into_iter()
        .map(|strategy| {
            let mut ordered = utxos.to_vec();
            match strategy {
                Strategy::LargestFirst => ordered.sort_by(|a, b| b.amount.cmp(&a.amount)),
                Strategy::SmallestFirst => ordered.sort_by(|a, b| a.amount.cmp(&b.amount)),
                Strategy::Random => ordered.shuffle(rng),
            }
            let outcome = select(&ordered, params);
            debug!("{} -> {:?}", strategy, outcome);
            (strategy, outcome)
        })
        .collect()
}

/// Accumulates `ordered` front to back until the selection covers target and fee.
pub fn select(ordered: &[Utxo], params: &SelectionParams) -> SelectionOutcome {
    let target = params.target;
    let mut selected = vec![];
    let mut total = 0u64;
    for utxo in ordered {
        selected.push(*utxo);
        total = total.saturating_add(utxo.amount);

        if !params.force_no_change {
            let vsize = params.vsize(&selected, true);
            let fee = params.fee_for(vsize);
            if covers(total, target, fee) {
                let change = total - target - fee;
                if change > DUST_THRESHOLD {
                    return selected_outcome(&selected, total, fee, change, vsize);
                }
                // Dust change: try the same coins without a change output.
                if let Some(outcome) = settle_without_change(&selected, total, params) {
                    return outcome;
                }
            }
        } else if let Some(outcome) = settle_without_change(&selected, total, params) {
            return outcome;
        }
    }
    SelectionOutcome::InsufficientFunds {
        available: total,
        target,
    }
}

/// Succeeds when the coins cover target plus the no-change fee; any excess goes to the fee.
fn settle_without_change(
    selected: &[Utxo],
    total: u64,
    params: &SelectionParams,
) -> Option<SelectionOutcome> {
    let vsize = params.vsize(selected, false);
    let required_fee = params.fee_for(vsize);
    if covers(total, params.target, required_fee) {
        let fee = total - params.target;
        Some(selected_outcome(selected, total, fee, 0, vsize))
    } else {
        None
    }
}

fn covers(total: u64, target: u64, fee: u64) -> bool {
    target.checked_add(fee).is_some_and(|needed| total >= needed)
}

fn selected_outcome(
    selected: &[Utxo],
    total: u64,
    fee: u64,
    change: u64,
    vsize: u64,
) -> SelectionOutcome {
    SelectionOutcome::Selected(CoinSelection {
        selected_amounts: selected.iter().map(|u| u.amount).collect(),
        total_input: total,
        fee,
        change,
        vsize,
        effective_rate: fee as f64 / vsize as f64,
    })
}
