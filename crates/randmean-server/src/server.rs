pub mod config;
pub mod fanout;
pub mod service;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;
