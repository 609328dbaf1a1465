pub mod cache;
pub mod client;
pub mod error;
pub mod gate;
pub mod parse;
pub mod request;
pub mod stats;

pub use client::{AlphaVantageClient, ClientSettings, RawPayload};
pub use error::FetchError;
pub use request::RequestKey;
pub use stats::GatewayStatsSnapshot;
