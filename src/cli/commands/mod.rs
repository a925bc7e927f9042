//! CLI command implementations

pub mod check;
pub mod config;
pub mod fingerprint;

pub use check::execute as check;
pub use config::execute as config;
pub use fingerprint::execute as fingerprint;
