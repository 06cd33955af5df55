use base64::prelude::*;
use bitcoin::{Amount, TxIn, TxOut, psbt};
use tracing::{debug, warn};

mod error;
mod types;

pub use error::{DecodeError, UnanalyzableInput};
pub use types::{
    InputUtxo, KeyOrigin, PsbtDocument, PsbtInput, PsbtOutput, ScriptMetadata,
};

/// `psbt` followed by the 0xff separator.
pub const PSBT_MAGIC: [u8; 5] = [0x70, 0x73, 0x62, 0x74, 0xff];

pub fn decode(encoded: &str) -> Result<PsbtDocument, DecodeError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = BASE64_STANDARD.decode(encoded)?;
    decode_bytes(&bytes)
}

pub fn decode_bytes(bytes: &[u8]) -> Result<PsbtDocument, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let psbt = psbt::Psbt::deserialize(bytes)?;
    let document = PsbtDocument::from(&psbt);
    check_amounts(&document)?;
    for (index, reason) in document.unanalyzable_inputs() {
        warn!("Input {} skipped: {}", index, reason);
    }
    debug!(
        "Decoded PSBT v{} with {} inputs and {} outputs",
        document.version,
        document.inputs.len(),
        document.outputs.len()
    );
    Ok(document)
}

fn out_of_range(kind: &'static str, index: usize, txout: &TxOut) -> Option<DecodeError> {
    (txout.value > Amount::MAX_MONEY).then(|| DecodeError::AmountOutOfRange {
        kind,
        index,
        amount: txout.value.to_sat(),
    })
}

/// Every amount the analysis sums must fit the money supply.
fn check_amounts(document: &PsbtDocument) -> Result<(), DecodeError> {
    let spent = document
        .inputs
        .iter()
        .enumerate()
        .filter_map(|(i, input)| out_of_range("input", i, input.spent_output()?));
    let created = document
        .outputs
        .iter()
        .enumerate()
        .filter_map(|(i, output)| out_of_range("output", i, &output.txout));
    match spent.chain(created).next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn resolve_utxo(txin: &TxIn, input: &psbt::Input) -> InputUtxo {
    match (&input.witness_utxo, &input.non_witness_utxo) {
        (Some(txout), _) => InputUtxo::Witness(txout.clone()),
        (None, Some(tx)) => {
            let txid = tx.compute_txid();
            if txid != txin.previous_output.txid {
                return InputUtxo::Unanalyzable(UnanalyzableInput::TxidMismatch);
            }
            let index = txin.previous_output.vout;
            match tx.output.get(index as usize) {
                Some(output) => InputUtxo::NonWitness {
                    txid,
                    output: output.clone(),
                },
                None => InputUtxo::Unanalyzable(UnanalyzableInput::IndexOutOfBounds {
                    index,
                    output_count: tx.output.len(),
                }),
            }
        }
        (None, None) => InputUtxo::Unanalyzable(UnanalyzableInput::MissingUtxo),
    }
}

impl From<&psbt::Input> for ScriptMetadata {
    fn from(input: &psbt::Input) -> Self {
        let ecdsa = input.bip32_derivation.values();
        let taproot = input.tap_key_origins.values().map(|(_, source)| source);
        Self {
            bip32_derivation: ecdsa.chain(taproot).map(KeyOrigin::from).collect(),
            redeem_script: input.redeem_script.clone(),
            witness_script: input.witness_script.clone(),
        }
    }
}

impl From<&psbt::Output> for ScriptMetadata {
    fn from(output: &psbt::Output) -> Self {
        let ecdsa = output.bip32_derivation.values();
        let taproot = output.tap_key_origins.values().map(|(_, source)| source);
        Self {
            bip32_derivation: ecdsa.chain(taproot).map(KeyOrigin::from).collect(),
            redeem_script: output.redeem_script.clone(),
            witness_script: output.witness_script.clone(),
        }
    }
}

impl From<&bitcoin::bip32::KeySource> for KeyOrigin {
    fn from((fingerprint, path): &bitcoin::bip32::KeySource) -> Self {
        Self {
            fingerprint: *fingerprint,
            path: path.clone(),
        }
    }
}

impl From<&psbt::Psbt> for PsbtDocument {
    fn from(psbt: &psbt::Psbt) -> Self {
        let tx = &psbt.unsigned_tx;
        let inputs = tx
            .input
            .iter()
            .zip(&psbt.inputs)
            .map(|(txin, input)| PsbtInput {
                previous_output: txin.previous_output,
                utxo: resolve_utxo(txin, input),
                metadata: ScriptMetadata::from(input),
            })
            .collect();
        let outputs = tx
            .output
            .iter()
            .zip(&psbt.outputs)
            .map(|(txout, output)| PsbtOutput {
                txout: txout.clone(),
                metadata: ScriptMetadata::from(output),
            })
            .collect();
        Self {
            version: psbt.version,
            tx_version: tx.version.0,
            lock_time: tx.lock_time.to_consensus_u32(),
            inputs,
            outputs,
        }
    }
}
