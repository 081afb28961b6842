//! MunLink Core - Shared error handling and logging for the MunLink client
//!
//! This crate carries the ambient concerns every other workspace member leans on

pub mod error;
pub mod logging;

pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
