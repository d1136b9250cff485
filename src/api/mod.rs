//! API endpoint handlers module
//!
//! Contains all HTTP endpoint handler implementations.

pub mod analyze;
pub mod debug;
pub mod health;
