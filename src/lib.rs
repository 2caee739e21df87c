//! Floe: a live, queryable, in-memory mirror of cluster resource state.
//!
//! A watch feed delivers add/update/delete notifications per resource kind;
//! per-kind adapters write serialized state into a bounded store and fan the
//! changed keys out to live subscribers. Request handlers read the mirror
//! through typed accessors. State is rebuilt from a full re-list on every
//! start; nothing persists across restarts.

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod mirror;
