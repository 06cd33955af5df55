//! Virtual size estimates.
//!
//! These figures deliberately skip the segwit witness discount: every input and output is
//! counted at a fixed per-type vbyte cost and the transaction overhead is
//! `10 + varint(inputs) + varint(outputs)`.

use bitcoin::Script;

use crate::script::ScriptType;

/// Version plus locktime.
pub const BASE_TX_VBYTES: u64 = 10;

/// Output value field.
pub const OUTPUT_VALUE_VBYTES: u64 = 8;

/// Width of a compact-size prefix as counted by the estimator.
pub fn varint_len(n: u64) -> u64 {
    if n < 253 { 1 } else { 3 }
}

pub fn estimate_input_vbytes(script_type: ScriptType) -> u64 {
    match script_type {
        ScriptType::PubkeyHash | ScriptType::ScriptHash => 148,
        ScriptType::WitnessV0KeyHash => 68,
        ScriptType::WitnessV0ScriptHash => 100,
        ScriptType::WitnessV1Taproot => 58,
        ScriptType::Unknown => 148,
    }
}

pub fn estimate_output_vbytes(script_pubkey: &Script) -> u64 {
    output_vbytes_for_script_len(script_pubkey.len())
}

pub fn output_vbytes_for_script_len(script_len: usize) -> u64 {
    let script_len = script_len as u64;
    OUTPUT_VALUE_VBYTES + varint_len(script_len) + script_len
}

pub fn estimate_tx_vsize(
    num_inputs: usize,
    num_outputs: usize,
    input_vbytes: &[u64],
    output_vbytes: &[u64],
) -> u64 {
    BASE_TX_VBYTES
        + varint_len(num_inputs as u64)
        + varint_len(num_outputs as u64)
        + input_vbytes.iter().sum::<u64>()
        + output_vbytes.iter().sum::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{op_return_script, p2pkh_script, p2tr_script, p2wpkh_script};

    #[test]
    fn test_input_table() {
        assert_eq!(estimate_input_vbytes(ScriptType::PubkeyHash), 148);
        assert_eq!(estimate_input_vbytes(ScriptType::ScriptHash), 148);
        assert_eq!(estimate_input_vbytes(ScriptType::WitnessV0KeyHash), 68);
        assert_eq!(estimate_input_vbytes(ScriptType::WitnessV0ScriptHash), 100);
        assert_eq!(estimate_input_vbytes(ScriptType::WitnessV1Taproot), 58);
        assert_eq!(estimate_input_vbytes(ScriptType::Unknown), 148);
    }

    #[test]
    fn test_output_sizes() {
        assert_eq!(estimate_output_vbytes(&p2wpkh_script(1)), 31);
        assert_eq!(estimate_output_vbytes(&p2pkh_script(1)), 34);
        assert_eq!(estimate_output_vbytes(&p2tr_script(1)), 43);
        // OP_RETURN + push(5) + 5 bytes
        assert_eq!(estimate_output_vbytes(&op_return_script(b"hello")), 8 + 1 + 7);
        assert_eq!(output_vbytes_for_script_len(252), 8 + 1 + 252);
        assert_eq!(output_vbytes_for_script_len(253), 8 + 3 + 253);
    }

    #[test]
    fn test_varint_boundary() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(252), 1);
        assert_eq!(varint_len(253), 3);
        assert_eq!(varint_len(10_000), 3);
    }

    #[test]
    fn test_tx_vsize_one_in_two_out() {
        assert_eq!(estimate_tx_vsize(1, 2, &[68], &[31, 31]), 142);
    }

    #[test]
    fn test_tx_vsize_monotonic() {
        let inputs = vec![68u64; 300];
        let outputs = vec![31u64; 300];
        let mut last = 0;
        for n in 0..300 {
            let vsize = estimate_tx_vsize(n, 1, &inputs[..n], &outputs[..1]);
            assert!(vsize >= last);
            last = vsize;
        }
        let mut last = 0;
        for n in 0..300 {
            let vsize = estimate_tx_vsize(1, n, &inputs[..1], &outputs[..n]);
            assert!(vsize >= last);
            last = vsize;
        }
        assert!(estimate_tx_vsize(1, 1, &[69], &[31]) > estimate_tx_vsize(1, 1, &[68], &[31]));
    }
}
