use std::io::{self, Write};

use crate::{
    analyzer::AnalysisResult,
    selection::{SelectionOutcome, SimulationReport},
};

const SATS_PER_BTC: f64 = 100_000_000.0;

pub fn format_sats_to_btc(sats: i64) -> String {
    format!("{:.8} BTC", sats as f64 / SATS_PER_BTC)
}

fn row(out: &mut impl Write, metric: &str, value: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "  {:<20} {}", metric, value)
}

pub fn render_analysis(analysis: &AnalysisResult, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "PSBT Analysis Summary")?;
    row(out, "PSBT Version", analysis.version)?;
    row(out, "Tx Version", analysis.tx_version)?;
    row(
        out,
        "Total Inputs",
        format_sats_to_btc(analysis.total_input_value as i64),
    )?;
    row(
        out,
        "Total Outputs",
        format_sats_to_btc(analysis.total_output_value as i64),
    )?;
    row(out, "Inferred Fee", format_sats_to_btc(analysis.inferred_fee))?;
    row(
        out,
        "Inferred Fee Rate",
        format!("{:.2} sats/vB", analysis.inferred_fee_rate),
    )?;
    row(
        out,
        "Estimated Size",
        format!("{} vB", analysis.estimated_vsize),
    )?;

    writeln!(out, "\nFee Reasonableness")?;
    writeln!(out, "  {}", analysis.fee_reasonableness_suggestion)?;

    writeln!(out, "\nScript Type Summary")?;
    writeln!(out, "  {}", analysis.script_summary)?;

    writeln!(out, "\nChange Output Detection")?;
    match analysis.change() {
        Some((output, reason)) => {
            row(out, "Value", format_sats_to_btc(output.amount as i64))?;
            row(out, "Script Type", output.script_type)?;
            row(out, "Address", &output.address)?;
            row(out, "Reason", reason)?;
        }
        None => writeln!(out, "  No change output detected.")?,
    }

    writeln!(out, "\nInputs")?;
    for (i, input) in analysis.inputs.iter().enumerate() {
        writeln!(
            out,
            "  #{:<3} {:>20} {:<22} {} ({} vB)",
            i,
            format_sats_to_btc(input.amount as i64),
            input.script_type,
            input.address,
            input.estimated_input_vbytes
        )?;
    }
    for index in &analysis.unanalyzable_inputs {
        writeln!(out, "  input {} skipped: missing UTXO information", index)?;
    }

    writeln!(out, "\nOutputs")?;
    for (i, output) in analysis.outputs.iter().enumerate() {
        writeln!(
            out,
            "  #{:<3} {:>20} {:<22} {} ({} vB)",
            i,
            format_sats_to_btc(output.amount as i64),
            output.script_type,
            output.address,
            output.estimated_output_vbytes
        )?;
    }
    Ok(())
}

pub fn render_simulation(report: &SimulationReport, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Coin Selection Simulation")?;
    for (strategy, outcome) in report {
        match outcome {
            SelectionOutcome::Selected(selection) => writeln!(
                out,
                "  {:<15} inputs {:?} total {} fee {} change {} vsize {} rate {:.2} sats/vB",
                strategy.to_string(),
                selection.selected_amounts,
                selection.total_input,
                selection.fee,
                selection.change,
                selection.vsize,
                selection.effective_rate
            )?,
            SelectionOutcome::InsufficientFunds { available, target } => writeln!(
                out,
                "  {:<15} insufficient funds (available {}, target {})",
                strategy.to_string(),
                available,
                target
            )?,
        }
    }
    Ok(())
}
