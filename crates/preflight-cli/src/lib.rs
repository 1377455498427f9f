//! Library components of the `preflight` binary.

pub mod env;
pub mod logging;
