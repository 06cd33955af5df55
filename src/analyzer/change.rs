use std::collections::HashSet;

use super::types::{ChangeOutput, EnrichedInput, EnrichedOutput};
use crate::script::NON_STANDARD;

/// Payments are usually whole multiples of this; change rarely is.
pub const ROUND_AMOUNT_SATS: u64 = 100_000;

pub const OWNED_METADATA_REASON: &str = "Has BIP32 derivation or script metadata";
pub const FRESH_ADDRESS_REASON: &str = "Has fresh address of matching type, non-round amount";

#[derive(Debug, Default)]
pub struct SeenInputs<'a> {
    address_types: HashSet<&'a str>,
    addresses: HashSet<&'a str>,
}

impl<'a> SeenInputs<'a> {
    pub fn new(inputs: &'a [EnrichedInput]) -> Self {
        let mut seen = Self::default();
        for input in inputs {
            seen.address_types.insert(&input.address_type);
            seen.addresses.insert(&input.address);
        }
        seen
    }

    fn is_fresh_matching(&self, output: &EnrichedOutput) -> bool {
        self.address_types.contains(output.address_type.as_str())
            && !self.addresses.contains(output.address.as_str())
            && output.address_type != NON_STANDARD
            && output.amount % ROUND_AMOUNT_SATS != 0
    }
}

pub fn change_reason(
    output: &EnrichedOutput,
    owned: bool,
    seen: &SeenInputs,
) -> Option<&'static str> {
    if owned {
        Some(OWNED_METADATA_REASON)
    } else if seen.is_fresh_matching(output) {
        Some(FRESH_ADDRESS_REASON)
    } else {
        None
    }
}

/// Every output is tested; when several qualify the last one is reported.
pub fn detect_change(
    inputs: &[EnrichedInput],
    outputs: &[EnrichedOutput],
    ownership: &[bool],
) -> Option<ChangeOutput> {
    let seen = SeenInputs::new(inputs);
    let mut change = None;
    for (index, (output, owned)) in outputs.iter().zip(ownership).enumerate() {
        if let Some(reason) = change_reason(output, *owned, &seen) {
            change = Some(ChangeOutput {
                index,
                reason: reason.to_string(),
            });
        }
    }
    change
}
