// Exchange clients

pub mod exchange;
pub mod paper;
pub mod retrying;

// Re-export client types
pub use exchange::ExchangeClient;
pub use paper::PaperExchange;
pub use retrying::RetryingExchange;
