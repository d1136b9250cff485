//! Schema definitions
//!
//! Wire types for the Azure OpenAI API and the coin analysis response.

pub mod azure;
pub mod coin;
