use std::collections::BTreeSet;

use crate::script::ScriptType;

pub const TAPROOT_NOTE: &str =
    "Taproot scripts detected: smallest input footprint and improved privacy.";
pub const SEGWIT_V0_NOTE: &str =
    "SegWit v0 scripts detected: witness data keeps these spends space-efficient.";
pub const LEGACY_NOTE: &str =
    "Legacy scripts detected: these carry higher weight and cost more to spend.";

/// One sentence per category present, always in taproot, segwit v0, legacy order.
pub fn script_summary(script_types: impl IntoIterator<Item = ScriptType>) -> String {
    let present: BTreeSet<ScriptType> = script_types.into_iter().collect();
    let mut sentences = vec![];
    if present.iter().any(ScriptType::is_taproot) {
        sentences.push(TAPROOT_NOTE);
    }
    if present.iter().any(ScriptType::is_segwit_v0) {
        sentences.push(SEGWIT_V0_NOTE);
    }
    if present.iter().any(ScriptType::is_legacy) {
        sentences.push(LEGACY_NOTE);
    }
    sentences.join(" ")
}
