use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use psbt_analyzer::{
    analyzer::{self, AnalysisResult},
    config::Config,
    display,
    edit::{self, Edit},
    fees::{self, FeeEstimator, FeeRates, FixedFees},
    logging,
    psbt::{self, PSBT_MAGIC},
    selection::{self, SelectionParams, SimulationReport},
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(about = "Inspect a PSBT: fees, change, script types and coin selection")]
struct Cli {
    #[clap(flatten)]
    config: Config,

    #[clap(
        long,
        help = "Base64-encoded PSBT",
        conflicts_with = "file",
        required_unless_present = "file"
    )]
    psbt: Option<String>,

    #[clap(long, help = "File holding a binary or base64-encoded PSBT")]
    file: Option<PathBuf>,

    #[clap(
        long = "edit",
        help = "Edit applied after analysis, e.g. 'add-input 5000 witness_v0_keyhash' (repeatable)"
    )]
    edits: Vec<Edit>,

    #[clap(long, help = "Simulate coin selection over the PSBT inputs")]
    simulate: bool,

    #[clap(
        long,
        help = "Fee rate in sat/vB for the simulation (defaults to the inferred rate)"
    )]
    fee_rate: Option<f64>,

    #[clap(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    analysis: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    edited: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<SimulationReport>,
}

fn load_document(cli: &Cli) -> Result<psbt::PsbtDocument> {
    if let Some(encoded) = &cli.psbt {
        return Ok(psbt::decode(encoded)?);
    }
    let path = cli.file.as_ref().context("Either --psbt or --file is required")?;
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read PSBT file {}", path.display()))?;
    let document = if bytes.starts_with(&PSBT_MAGIC) {
        psbt::decode_bytes(&bytes)?
    } else {
        let text = String::from_utf8(bytes).context("PSBT file is neither binary nor text")?;
        psbt::decode(&text)?
    };
    Ok(document)
}

async fn run<F: FeeEstimator>(cli: &Cli, fees: &F) -> Result<()> {
    let document = load_document(cli)?;
    let analysis = analyzer::analyze(&document, cli.config.network, fees).await;

    let edited = if cli.edits.is_empty() {
        None
    } else {
        info!("Applying {} edit(s)", cli.edits.len());
        Some(edit::apply_edits(&analysis, &cli.edits, fees).await?)
    };

    let simulation = if cli.simulate {
        let current = edited.as_ref().unwrap_or(&analysis);
        let fee_rate = match cli.fee_rate {
            Some(rate) => rate,
            None if current.inferred_fee_rate > 0.0 => current.inferred_fee_rate,
            None => fees.recommended_fees().await.hour_fee as f64,
        };
        let (utxos, params) = SelectionParams::from_analysis(current, fee_rate);
        Some(selection::simulate(&utxos, &params))
    } else {
        None
    };

    let report = Report {
        analysis,
        edited,
        simulation,
    };
    let mut stdout = io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
        return Ok(());
    }
    display::render_analysis(&report.analysis, &mut stdout)?;
    if let Some(edited) = &report.edited {
        writeln!(stdout, "\nAfter edits")?;
        display::render_analysis(edited, &mut stdout)?;
    }
    if let Some(simulation) = &report.simulation {
        writeln!(stdout)?;
        display::render_simulation(simulation, &mut stdout)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup(cli.config.log_format);
    if cli.config.offline {
        info!("Offline, using fallback fee rates");
        return run(&cli, &FixedFees(FeeRates::FALLBACK)).await;
    }
    match fees::Client::new_from_config(&cli.config) {
        Ok(client) => run(&cli, &client).await,
        Err(e) => {
            warn!("Fee API unavailable ({}), using fallback fee rates", e);
            run(&cli, &FixedFees(FeeRates::FALLBACK)).await
        }
    }
}
