use bitcoin::{Address, Network, Script};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Address and address type reported for scripts without an address encoding.
pub const NON_STANDARD: &str = "Non-standard";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum ScriptType {
    #[serde(rename = "pubkeyhash")]
    #[strum(serialize = "pubkeyhash")]
    PubkeyHash,
    #[serde(rename = "scripthash")]
    #[strum(serialize = "scripthash")]
    ScriptHash,
    #[serde(rename = "witness_v0_keyhash")]
    #[strum(serialize = "witness_v0_keyhash")]
    WitnessV0KeyHash,
    #[serde(rename = "witness_v0_scripthash")]
    #[strum(serialize = "witness_v0_scripthash")]
    WitnessV0ScriptHash,
    #[serde(rename = "witness_v1_taproot")]
    #[strum(serialize = "witness_v1_taproot")]
    WitnessV1Taproot,
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl ScriptType {
    pub fn is_legacy(&self) -> bool {
        matches!(self, ScriptType::PubkeyHash | ScriptType::ScriptHash)
    }

    pub fn is_segwit_v0(&self) -> bool {
        matches!(
            self,
            ScriptType::WitnessV0KeyHash | ScriptType::WitnessV0ScriptHash
        )
    }

    pub fn is_taproot(&self) -> bool {
        matches!(self, ScriptType::WitnessV1Taproot)
    }

    /// Length of a scriptPubKey of this type, used when an output is created from a
    /// type tag alone. Unknown scripts are sized like a 32-byte witness program.
    pub fn standard_script_len(&self) -> usize {
        match self {
            ScriptType::PubkeyHash => 25,
            ScriptType::ScriptHash => 23,
            ScriptType::WitnessV0KeyHash => 22,
            ScriptType::WitnessV0ScriptHash => 34,
            ScriptType::WitnessV1Taproot => 34,
            ScriptType::Unknown => 34,
        }
    }

    /// Address type tag matching what `classify` reports for a script of this type.
    pub fn address_type(&self) -> &'static str {
        match self {
            ScriptType::PubkeyHash => "p2pkh",
            ScriptType::ScriptHash => "p2sh",
            ScriptType::WitnessV0KeyHash => "p2wpkh",
            ScriptType::WitnessV0ScriptHash => "p2wsh",
            ScriptType::WitnessV1Taproot => "p2tr",
            ScriptType::Unknown => NON_STANDARD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedScript {
    pub script_type: ScriptType,
    pub address: String,
    pub address_type: String,
}

impl ClassifiedScript {
    pub fn non_standard(script_type: ScriptType) -> Self {
        Self {
            script_type,
            address: NON_STANDARD.to_string(),
            address_type: NON_STANDARD.to_string(),
        }
    }

    pub fn is_non_standard(&self) -> bool {
        self.address_type == NON_STANDARD
    }
}

/// First match wins: P2PKH, P2SH, P2WPKH, P2WSH, P2TR.
pub fn script_type(script: &Script) -> ScriptType {
    if script.is_p2pkh() {
        ScriptType::PubkeyHash
    } else if script.is_p2sh() {
        ScriptType::ScriptHash
    } else if script.is_p2wpkh() {
        ScriptType::WitnessV0KeyHash
    } else if script.is_p2wsh() {
        ScriptType::WitnessV0ScriptHash
    } else if script.is_p2tr() {
        ScriptType::WitnessV1Taproot
    } else {
        ScriptType::Unknown
    }
}

pub fn classify(script: &Script, network: Network) -> ClassifiedScript {
    let script_type = script_type(script);
    match Address::from_script(script, network) {
        Ok(address) => match address.address_type() {
            Some(address_type) => ClassifiedScript {
                script_type,
                address: address.to_string(),
                address_type: address_type.to_string(),
            },
            None => ClassifiedScript::non_standard(script_type),
        },
        Err(_) => ClassifiedScript::non_standard(script_type),
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::ScriptBuf;

    use super::*;
    use crate::test_utils::{
        op_return_script, p2pkh_script, p2sh_script, p2tr_script, p2wpkh_script, p2wsh_script,
    };

    #[test]
    fn test_classify_known_patterns() {
        let cases = [
            (p2pkh_script(1), ScriptType::PubkeyHash, "p2pkh"),
            (p2sh_script(2), ScriptType::ScriptHash, "p2sh"),
            (p2wpkh_script(3), ScriptType::WitnessV0KeyHash, "p2wpkh"),
            (p2wsh_script(4), ScriptType::WitnessV0ScriptHash, "p2wsh"),
            (p2tr_script(5), ScriptType::WitnessV1Taproot, "p2tr"),
        ];
        for (script, expected_type, expected_address_type) in cases {
            let classified = classify(&script, Network::Bitcoin);
            assert_eq!(classified.script_type, expected_type);
            assert_eq!(classified.address_type, expected_address_type);
            assert_ne!(classified.address, NON_STANDARD);
            assert_eq!(expected_type.address_type(), expected_address_type);
        }
    }

    #[test]
    fn test_classify_mainnet_address_prefixes() {
        let p2wpkh = classify(&p2wpkh_script(7), Network::Bitcoin);
        assert!(p2wpkh.address.starts_with("bc1q"));
        let p2tr = classify(&p2tr_script(7), Network::Bitcoin);
        assert!(p2tr.address.starts_with("bc1p"));
        let p2pkh = classify(&p2pkh_script(7), Network::Bitcoin);
        assert!(p2pkh.address.starts_with('1'));
        let testnet = classify(&p2wpkh_script(7), Network::Testnet);
        assert!(testnet.address.starts_with("tb1q"));
    }

    #[test]
    fn test_classify_op_return_is_non_standard() {
        let classified = classify(&op_return_script(b"hello"), Network::Bitcoin);
        assert_eq!(classified.script_type, ScriptType::Unknown);
        assert_eq!(classified.address, NON_STANDARD);
        assert_eq!(classified.address_type, NON_STANDARD);
        assert!(classified.is_non_standard());
    }

    #[test]
    fn test_classify_garbage_never_panics() {
        for bytes in [vec![], vec![0xff], vec![0x00, 0x14], vec![0x51, 0x20, 0x01]] {
            let classified = classify(&ScriptBuf::from_bytes(bytes), Network::Bitcoin);
            assert_eq!(classified.script_type, ScriptType::Unknown);
        }
    }

    #[test]
    fn test_script_type_round_trips_through_strings() {
        for script_type in [
            ScriptType::PubkeyHash,
            ScriptType::ScriptHash,
            ScriptType::WitnessV0KeyHash,
            ScriptType::WitnessV0ScriptHash,
            ScriptType::WitnessV1Taproot,
            ScriptType::Unknown,
        ] {
            let parsed: ScriptType = script_type.to_string().parse().unwrap();
            assert_eq!(parsed, script_type);
        }
        assert_eq!(
            ScriptType::WitnessV0KeyHash.to_string(),
            "witness_v0_keyhash"
        );
    }
}
