//! Utility modules

pub mod string;

pub use string::{preview, truncate_str};
