use serde::{Deserialize, Serialize};

/// Recommended fee rates in sat/vB, as published by mempool.space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRates {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

impl FeeRates {
    pub const FALLBACK: FeeRates = FeeRates {
        fastest_fee: 100,
        half_hour_fee: 50,
        hour_fee: 20,
        economy_fee: 5,
        minimum_fee: 1,
    };
}

impl Default for FeeRates {
    fn default() -> Self {
        Self::FALLBACK
    }
}
