mod client;
mod error;
mod types;

pub use client::{Client, read_api_key};
pub use error::Error;
pub use types::FeeRates;

/// Source of recommended fee rates. Implementations absorb their own failures and
/// always produce a usable table.
pub trait FeeEstimator: Send + Sync {
    fn recommended_fees(&self) -> impl std::future::Future<Output = FeeRates> + Send;
}

/// Serves a fixed table without touching the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedFees(pub FeeRates);

impl FeeEstimator for FixedFees {
    async fn recommended_fees(&self) -> FeeRates {
        self.0
    }
}
