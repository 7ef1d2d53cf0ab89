//! VPO Core - policy evaluation and phase execution for media files
//!
//! A policy is a versioned set of named phases, each a list of typed
//! operations (track filters, ordering, default flags, conditional rules,
//! audio synthesis, transcoding, language detection). This crate validates
//! policies, decides what each operation should do for a given file, and
//! runs the phases atomically through injected tool, introspection and
//! backup collaborators. It has no UI and spawns no processes itself.

pub mod actions;
pub mod conditions;
pub mod config;
pub mod disposition;
pub mod language;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod synthesis;
pub mod transcode;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
