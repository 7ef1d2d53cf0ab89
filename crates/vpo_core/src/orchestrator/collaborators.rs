//! External capabilities the phase executor is built with.
//!
//! The executor never probes files, runs tools or copies bytes itself; it
//! talks to these traits. Implementations must be shareable across the
//! worker threads of a batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::language::{AudioSample, TranscriptionPlugin};
use crate::models::{ContainerFormat, FileInfo};
use crate::synthesis::SynthesisOperation;
use crate::transcode::{AudioDecision, VideoTranscodeRequest};

use super::errors::{BackupError, IntrospectionError, ToolExecutionError};
use super::projection::TrackEdit;

/// Describes the tracks of a file.
pub trait Introspector: Send + Sync {
    fn get_file_info(&self, path: &Path) -> Result<FileInfo, IntrospectionError>;
}

/// Rewrite a file's container or track layout without re-encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemuxRequest {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_container: Option<ContainerFormat>,
    pub edits: Vec<TrackEdit>,
}

impl RemuxRequest {
    pub fn new(path: &Path, edits: Vec<TrackEdit>) -> Self {
        Self {
            path: path.to_path_buf(),
            target_container: None,
            edits,
        }
    }

    pub fn describe(&self) -> String {
        let edits: Vec<String> = self.edits.iter().map(TrackEdit::describe).collect();
        match self.target_container {
            Some(target) => format!("remux to {} [{}]", target, edits.join("; ")),
            None => format!("remux [{}]", edits.join("; ")),
        }
    }
}

/// Encode tracks: transcodes of existing tracks and synthesized new ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscodeRequest {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoTranscodeRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audio: Vec<AudioDecision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub synthesis: Vec<SynthesisOperation>,
}

impl TranscodeRequest {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            video: None,
            audio: Vec::new(),
            synthesis: Vec::new(),
        }
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(video) = &self.video {
            parts.push(format!(
                "video track {} {} -> {}",
                video.track_index, video.source_codec, video.target_codec
            ));
        }
        parts.extend(
            self.audio
                .iter()
                .map(|a| format!("audio track {} {}", a.track_index, a.source_codec)),
        );
        parts.extend(self.synthesis.iter().map(|s| {
            format!(
                "synthesize {} {}ch from track {}",
                s.codec, s.channels, s.source_track_index
            )
        }));
        format!("transcode [{}]", parts.join("; "))
    }
}

/// Extract a short excerpt of one audio track for language detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractRequest {
    pub path: PathBuf,
    pub track_index: usize,
    pub start_time: f64,
    pub duration: f64,
}

/// Runs the external tools that actually touch the file.
///
/// Calls block until the tool finishes.
pub trait ToolRunner: Send + Sync {
    fn remux(&self, request: &RemuxRequest) -> Result<(), ToolExecutionError>;

    fn transcode(&self, request: &TranscodeRequest) -> Result<(), ToolExecutionError>;

    fn extract(&self, request: &ExtractRequest) -> Result<AudioSample, ToolExecutionError>;
}

/// Handle to the saved bytes of a file before a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePoint {
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// Saves and restores file bytes around a phase.
pub trait BackupStore: Send + Sync {
    fn create(&self, path: &Path) -> Result<RestorePoint, BackupError>;

    /// Put the saved bytes back over the original.
    fn restore(&self, point: &RestorePoint) -> Result<(), BackupError>;

    /// Drop the saved bytes once the phase is settled.
    fn discard(&self, point: &RestorePoint) -> Result<(), BackupError>;
}

/// Copies the file beside itself with a suffix.
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    suffix: String,
}

impl FileBackupStore {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(&self.suffix);
        PathBuf::from(name)
    }
}

impl Default for FileBackupStore {
    fn default() -> Self {
        Self::new(".vpo-backup")
    }
}

impl BackupStore for FileBackupStore {
    fn create(&self, path: &Path) -> Result<RestorePoint, BackupError> {
        let backup = self.backup_path(path);
        fs::copy(path, &backup).map_err(|e| BackupError::io("back up", path, e))?;
        debug!(original = %path.display(), backup = %backup.display(), "Created restore point");
        Ok(RestorePoint {
            original: path.to_path_buf(),
            backup,
        })
    }

    fn restore(&self, point: &RestorePoint) -> Result<(), BackupError> {
        if !point.backup.exists() {
            return Err(BackupError::Missing(point.original.clone()));
        }
        fs::copy(&point.backup, &point.original)
            .map_err(|e| BackupError::io("restore", &point.original, e))?;
        Ok(())
    }

    fn discard(&self, point: &RestorePoint) -> Result<(), BackupError> {
        if point.backup.exists() {
            fs::remove_file(&point.backup)
                .map_err(|e| BackupError::io("remove", &point.backup, e))?;
        }
        Ok(())
    }
}

/// The capabilities injected into a [`PhaseExecutor`](super::PhaseExecutor).
#[derive(Clone)]
pub struct Collaborators {
    pub introspector: Arc<dyn Introspector>,
    pub tools: Arc<dyn ToolRunner>,
    pub backups: Arc<dyn BackupStore>,
    /// Optional language detection backend.
    pub transcriber: Option<Arc<dyn TranscriptionPlugin>>,
}

impl Collaborators {
    pub fn new(
        introspector: Arc<dyn Introspector>,
        tools: Arc<dyn ToolRunner>,
        backups: Arc<dyn BackupStore>,
    ) -> Self {
        Self {
            introspector,
            tools,
            backups,
            transcriber: None,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn TranscriptionPlugin>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_backup_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        fs::write(&path, b"original").unwrap();

        let store = FileBackupStore::new(".bak");
        let point = store.create(&path).unwrap();
        assert_eq!(point.backup, dir.path().join("movie.mkv.bak"));

        fs::write(&path, b"mutated").unwrap();
        store.restore(&point).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"original");

        store.discard(&point).unwrap();
        assert!(!point.backup.exists());
        assert!(matches!(store.restore(&point), Err(BackupError::Missing(_))));
    }

    #[test]
    fn create_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let store = FileBackupStore::default();
        let err = store.create(&dir.path().join("nope.mkv")).unwrap_err();
        assert!(err.to_string().contains("back up"));
    }

    #[test]
    fn remux_request_describes_edits() {
        let request = RemuxRequest {
            path: PathBuf::from("/m/a.mkv"),
            target_container: Some(ContainerFormat::Mp4),
            edits: vec![TrackEdit::Remove { track_index: 3 }],
        };
        assert_eq!(request.describe(), "remux to mp4 [remove track 3]");
    }
}
