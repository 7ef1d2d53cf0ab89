//! Policy model: a validated, immutable set of phases and global settings.
//!
//! A [`PolicyDocument`] is what a loader produces; [`Policy::from_document`]
//! checks it completely and either accepts it as a whole or returns every
//! problem as a [`SchemaValidationError`].

mod errors;
mod operations;
mod types;
mod validation;

pub use errors::{FieldError, IncompatibleTrack, PolicyError, PolicyResult, SchemaValidationError};
pub use operations::{
    DefaultFlagsConfig, Operation, OperationKind, TrackCategory, TrackOrderConfig,
    TranscriptionConfig,
};
pub use types::{
    GlobalConfig, OnError, Phase, PhaseDocument, PhaseSkipCondition, Policy, PolicyDocument,
    RESERVED_PHASE_NAMES, SCHEMA_VERSION,
};
