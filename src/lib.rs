//! Load testing harness for the transaction management API.
//!
//! A scheduler ramps a pool of virtual users along configured stages; each
//! worker repeatedly runs the transaction scenario (create, get, update,
//! list) and reports outcomes to a shared metrics collector. At run end the
//! configured thresholds decide overall pass/fail.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod scenario;
