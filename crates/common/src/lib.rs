//! Common types, protocol definitions, and errors shared across `bookmark-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
