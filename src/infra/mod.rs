//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod feed;
pub mod http;
pub mod telemetry;
