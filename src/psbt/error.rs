use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum DecodeError {
    #[error("PSBT input is empty")]
    Empty,
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Malformed PSBT: {0}")]
    Psbt(#[from] bitcoin::psbt::Error),
    #[error("{kind} {index} amount {amount} sat exceeds the 21M BTC supply")]
    AmountOutOfRange {
        kind: &'static str,
        index: usize,
        amount: u64,
    },
}

/// Why an input's spent output could not be resolved. Carried on the input, never fatal.
#[derive(ThisError, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnanalyzableInput {
    #[error("missing UTXO information")]
    MissingUtxo,
    #[error("index {index} out of bounds (number of outputs: {output_count})")]
    IndexOutOfBounds { index: u32, output_count: usize },
    #[error("previous transaction ID doesn't match the one spent by the input")]
    TxidMismatch,
}
