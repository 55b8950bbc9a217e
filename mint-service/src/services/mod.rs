pub mod deriver;
pub mod metrics;
pub mod minting;
pub mod providers;
pub mod renderer;
pub mod retry;
pub mod storage;

pub use deriver::TraitDeriver;
pub use metrics::LatencyGauge;
pub use minting::{MintOutcome, Minter};
pub use retry::ImageRetry;
