//! treeskip - skip CI jobs whose inputs already passed
//!
//! Computes a fingerprint of a set of watched paths at the current commit
//! and looks for a previous successful job with the same fingerprint, either
//! in the GitLab job history or in a history file kept in the CI cache.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod gitlab;
pub mod ledger;
pub mod marker;
pub mod revision;
pub mod ui;

pub use error::{TreeskipError, TreeskipResult};
