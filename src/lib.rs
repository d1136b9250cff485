//! Coin Analyzer library
//!
//! Sends coin photographs to an Azure OpenAI vision deployment and turns the
//! free-form reply into a fixed [`CoinRecord`](schemas::coin::CoinRecord).

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod normalizer;
pub mod schemas;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use normalizer::Normalizer;
pub use schemas::coin::CoinRecord;
pub use server::App;
