use bitcoin::{
    OutPoint, ScriptBuf, TxOut, Txid,
    bip32::{DerivationPath, Fingerprint},
};
use serde::Serialize;

use super::error::UnanalyzableInput;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PsbtDocument {
    /// PSBT format version from the global map (0 when absent).
    pub version: u32,
    pub tx_version: i32,
    pub lock_time: u32,
    pub inputs: Vec<PsbtInput>,
    pub outputs: Vec<PsbtOutput>,
}

impl PsbtDocument {
    pub fn unanalyzable_inputs(&self) -> impl Iterator<Item = (usize, &UnanalyzableInput)> {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(i, input)| match &input.utxo {
                InputUtxo::Unanalyzable(reason) => Some((i, reason)),
                _ => None,
            })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PsbtInput {
    pub previous_output: OutPoint,
    pub utxo: InputUtxo,
    pub metadata: ScriptMetadata,
}

impl PsbtInput {
    pub fn spent_output(&self) -> Option<&TxOut> {
        self.utxo.spent_output()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum InputUtxo {
    Witness(TxOut),
    NonWitness { txid: Txid, output: TxOut },
    Unanalyzable(UnanalyzableInput),
}

impl InputUtxo {
    pub fn spent_output(&self) -> Option<&TxOut> {
        match self {
            InputUtxo::Witness(output) | InputUtxo::NonWitness { output, .. } => Some(output),
            InputUtxo::Unanalyzable(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PsbtOutput {
    pub txout: TxOut,
    pub metadata: ScriptMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyOrigin {
    pub fingerprint: Fingerprint,
    pub path: DerivationPath,
}

/// Signer-facing metadata shared by inputs and outputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScriptMetadata {
    /// ECDSA and taproot key origins.
    pub bip32_derivation: Vec<KeyOrigin>,
    pub redeem_script: Option<ScriptBuf>,
    pub witness_script: Option<ScriptBuf>,
}

impl ScriptMetadata {
    /// Wallets only attach these to scripts they control.
    pub fn indicates_ownership(&self) -> bool {
        !self.bip32_derivation.is_empty()
            || self.redeem_script.is_some()
            || self.witness_script.is_some()
    }
}
