pub mod analyzer;
pub mod config;
pub mod display;
pub mod edit;
pub mod fees;
pub mod logging;
pub mod psbt;
pub mod retry;
pub mod script;
pub mod selection;
pub mod size;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
