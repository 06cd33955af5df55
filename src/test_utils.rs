use std::str::FromStr;

use base64::prelude::*;
use bitcoin::{
    Amount, OutPoint, ScriptBuf, Transaction, TxIn, TxOut, Txid,
    absolute::LockTime,
    bip32::{DerivationPath, Fingerprint},
    hashes::Hash,
    psbt::Psbt,
    secp256k1::PublicKey,
    transaction::Version,
};

pub fn p2pkh_script(seed: u8) -> ScriptBuf {
    let mut bytes = vec![0x76, 0xa9, 0x14];
    bytes.extend_from_slice(&[seed; 20]);
    bytes.extend_from_slice(&[0x88, 0xac]);
    ScriptBuf::from_bytes(bytes)
}

pub fn p2sh_script(seed: u8) -> ScriptBuf {
    let mut bytes = vec![0xa9, 0x14];
    bytes.extend_from_slice(&[seed; 20]);
    bytes.push(0x87);
    ScriptBuf::from_bytes(bytes)
}

pub fn p2wpkh_script(seed: u8) -> ScriptBuf {
    let mut bytes = vec![0x00, 0x14];
    bytes.extend_from_slice(&[seed; 20]);
    ScriptBuf::from_bytes(bytes)
}

pub fn p2wsh_script(seed: u8) -> ScriptBuf {
    let mut bytes = vec![0x00, 0x20];
    bytes.extend_from_slice(&[seed; 32]);
    ScriptBuf::from_bytes(bytes)
}

pub fn p2tr_script(seed: u8) -> ScriptBuf {
    let mut bytes = vec![0x51, 0x20];
    bytes.extend_from_slice(&[seed; 32]);
    ScriptBuf::from_bytes(bytes)
}

pub fn op_return_script(data: &[u8]) -> ScriptBuf {
    let mut bytes = vec![0x6a, data.len() as u8];
    bytes.extend_from_slice(data);
    ScriptBuf::from_bytes(bytes)
}

pub fn txout(value: u64, script_pubkey: ScriptBuf) -> TxOut {
    TxOut {
        value: Amount::from_sat(value),
        script_pubkey,
    }
}

pub fn mock_txid(n: u32) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[0..4].copy_from_slice(&n.to_le_bytes());
    Txid::from_byte_array(bytes)
}

pub fn previous_transaction(outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: mock_txid(u32::MAX),
                vout: 0,
            },
            ..Default::default()
        }],
        output: outputs,
    }
}

#[derive(Clone, Debug)]
pub enum UtxoSpec {
    Witness(TxOut),
    NonWitness {
        previous_tx: Transaction,
        vout: u32,
    },
    Missing,
}

impl UtxoSpec {
    pub fn witness(value: u64, script_pubkey: ScriptBuf) -> Self {
        UtxoSpec::Witness(txout(value, script_pubkey))
    }
}

/// Builds an unsigned PSBT spending `inputs` into `outputs`, attaching the requested UTXO data to
/// each input.
pub fn build_psbt(inputs: Vec<UtxoSpec>, outputs: Vec<TxOut>) -> Psbt {
    let tx_inputs = inputs
        .iter()
        .enumerate()
        .map(|(i, utxo)| {
            let previous_output = match utxo {
                UtxoSpec::NonWitness { previous_tx, vout } => OutPoint {
                    txid: previous_tx.compute_txid(),
                    vout: *vout,
                },
                _ => OutPoint {
                    txid: mock_txid(i as u32),
                    vout: 0,
                },
            };
            TxIn {
                previous_output,
                ..Default::default()
            }
        })
        .collect();
    let unsigned_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_inputs,
        output: outputs,
    };
    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).unwrap();
    for (psbt_input, utxo) in psbt.inputs.iter_mut().zip(inputs) {
        match utxo {
            UtxoSpec::Witness(txout) => psbt_input.witness_utxo = Some(txout),
            UtxoSpec::NonWitness { previous_tx, .. } => {
                psbt_input.non_witness_utxo = Some(previous_tx)
            }
            UtxoSpec::Missing => {}
        }
    }
    psbt
}

pub fn test_pubkey() -> PublicKey {
    PublicKey::from_str("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
        .unwrap()
}

/// Marks an output as wallet-owned the way a signer would, with a BIP32 derivation entry.
pub fn add_output_derivation(psbt: &mut Psbt, index: usize) {
    psbt.outputs[index].bip32_derivation.insert(
        test_pubkey(),
        (
            Fingerprint::from([0xde, 0xad, 0xbe, 0xef]),
            DerivationPath::from_str("m/84'/0'/0'/1/0").unwrap(),
        ),
    );
}

pub fn to_base64(psbt: &Psbt) -> String {
    BASE64_STANDARD.encode(psbt.serialize())
}
