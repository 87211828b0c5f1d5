// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod logging;
pub mod server;
pub mod types;

pub use logging::*;
pub use server::*;
pub use types::*;

pub use crate::query::QueryConfig;
