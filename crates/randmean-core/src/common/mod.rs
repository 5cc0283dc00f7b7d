pub mod error;
pub mod rpc;
pub mod stats;
pub mod types;

pub use error::{Error, Result, UPSTREAM_ERROR_PREFIX};
