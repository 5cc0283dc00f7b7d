//! Concurrent fan-out of upstream fetches.
//!
//! - [`orchestrator`] - launches one task per requested set and fans the
//!   results back in, index-ordered, failing fast on the first error.

pub mod orchestrator;
