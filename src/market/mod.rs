pub mod range;
pub mod service;

pub use service::MarketDataService;
