//! Utility types.
//!
//! - [`b64`] - Base64 encoding of transaction bytes for the gas station wire format

pub mod b64;

pub use b64::*;
