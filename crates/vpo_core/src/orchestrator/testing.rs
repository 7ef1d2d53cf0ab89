//! In-memory collaborators for executor and batch tests.
//!
//! `FakeMedia` keeps a `FileInfo` per path as the "disk"; tools edit it,
//! backups copy it and the introspector reads it back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::language::{
    AudioSample, PluginFeature, SampleDetection, TranscriptionError, TranscriptionPlugin,
};
use crate::models::FileInfo;
use crate::transcode::AudioAction;

use super::collaborators::{
    BackupStore, Collaborators, ExtractRequest, Introspector, RemuxRequest, RestorePoint,
    ToolRunner, TranscodeRequest,
};
use super::errors::{BackupError, IntrospectionError, ToolExecutionError};
use super::operations::synthesized_track;
use super::projection::{project, TrackEdit};
use super::types::ExecutionState;

#[derive(Default)]
pub(crate) struct FakeMedia {
    disk: Mutex<HashMap<PathBuf, FileInfo>>,
    backups: Mutex<HashMap<PathBuf, FileInfo>>,
    pub remuxes: Mutex<Vec<RemuxRequest>>,
    pub transcodes: Mutex<Vec<TranscodeRequest>>,
    pub extracts: Mutex<Vec<ExtractRequest>>,
    pub restores: Mutex<usize>,
    failing_tool: Mutex<Option<&'static str>>,
    fail_restore: Mutex<bool>,
}

impl FakeMedia {
    pub fn with_file(path: &str, info: FileInfo) -> Arc<Self> {
        let media = Arc::new(Self::default());
        media.add_file(path, info);
        media
    }

    pub fn add_file(&self, path: &str, info: FileInfo) {
        self.disk.lock().insert(PathBuf::from(path), info);
    }

    pub fn file(&self, path: &str) -> FileInfo {
        self.disk.lock()[Path::new(path)].clone()
    }

    /// Make every call of `tool` ("remux", "transcode", "extract") fail.
    pub fn fail_tool(&self, tool: &'static str) {
        *self.failing_tool.lock() = Some(tool);
    }

    pub fn fail_restore(&self) {
        *self.fail_restore.lock() = true;
    }

    pub fn live_backups(&self) -> usize {
        self.backups.lock().len()
    }

    fn check(&self, tool: &'static str) -> Result<(), ToolExecutionError> {
        if *self.failing_tool.lock() == Some(tool) {
            return Err(ToolExecutionError::new(tool, 1, format!("{} exploded", tool)));
        }
        Ok(())
    }

    fn edit(&self, path: &Path, edits: &[TrackEdit]) {
        let mut disk = self.disk.lock();
        if let Some(info) = disk.get_mut(path) {
            let mut state = ExecutionState::new(info.clone());
            project(&mut state, edits);
            *info = state.file_info;
        }
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::new(self.clone(), self.clone(), self.clone())
    }
}

impl Introspector for FakeMedia {
    fn get_file_info(&self, path: &Path) -> Result<FileInfo, IntrospectionError> {
        self.disk
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| IntrospectionError::NotFound(path.to_path_buf()))
    }
}

impl ToolRunner for FakeMedia {
    fn remux(&self, request: &RemuxRequest) -> Result<(), ToolExecutionError> {
        self.check("remux")?;
        self.remuxes.lock().push(request.clone());
        self.edit(&request.path, &request.edits);
        if let Some(target) = request.target_container {
            if let Some(info) = self.disk.lock().get_mut(&request.path) {
                info.container_format = target.as_str().to_string();
            }
        }
        Ok(())
    }

    fn transcode(&self, request: &TranscodeRequest) -> Result<(), ToolExecutionError> {
        self.check("transcode")?;
        self.transcodes.lock().push(request.clone());

        let mut edits = Vec::new();
        if let Some(video) = &request.video {
            edits.push(TrackEdit::ConvertCodec {
                track_index: video.track_index,
                codec: video.target_codec.as_str().to_string(),
            });
        }
        for audio in &request.audio {
            if let AudioAction::Transcode { codec, .. } = &audio.action {
                edits.push(TrackEdit::ConvertCodec {
                    track_index: audio.track_index,
                    codec: codec.clone(),
                });
            }
        }
        edits.extend(request.synthesis.iter().map(|op| TrackEdit::Insert {
            audio_position: op.audio_position,
            track: synthesized_track(op),
        }));
        self.edit(&request.path, &edits);
        Ok(())
    }

    fn extract(&self, request: &ExtractRequest) -> Result<AudioSample, ToolExecutionError> {
        self.check("extract")?;
        self.extracts.lock().push(request.clone());
        Ok(AudioSample {
            track_index: request.track_index,
            start_time: request.start_time,
            duration: request.duration,
            path: PathBuf::from(format!("/tmp/sample-{}.wav", request.track_index)),
        })
    }
}

impl BackupStore for FakeMedia {
    fn create(&self, path: &Path) -> Result<RestorePoint, BackupError> {
        let info = self
            .disk
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| BackupError::Missing(path.to_path_buf()))?;
        let mut backup = path.as_os_str().to_owned();
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        self.backups.lock().insert(backup.clone(), info);
        Ok(RestorePoint {
            original: path.to_path_buf(),
            backup,
        })
    }

    fn restore(&self, point: &RestorePoint) -> Result<(), BackupError> {
        if *self.fail_restore.lock() {
            return Err(BackupError::io(
                "restore",
                &point.original,
                std::io::Error::other("disk full"),
            ));
        }
        let saved = self
            .backups
            .lock()
            .get(&point.backup)
            .cloned()
            .ok_or_else(|| BackupError::Missing(point.original.clone()))?;
        self.disk.lock().insert(point.original.clone(), saved);
        *self.restores.lock() += 1;
        Ok(())
    }

    fn discard(&self, point: &RestorePoint) -> Result<(), BackupError> {
        self.backups.lock().remove(&point.backup);
        Ok(())
    }
}

/// Detects one fixed language per track index.
pub(crate) struct FixedLanguagePlugin {
    pub languages: HashMap<usize, &'static str>,
}

impl TranscriptionPlugin for FixedLanguagePlugin {
    fn name(&self) -> &str {
        "fixed"
    }

    fn supports(&self, feature: PluginFeature) -> bool {
        feature == PluginFeature::LanguageDetection
    }

    fn detect_language(&self, sample: &AudioSample) -> Result<SampleDetection, TranscriptionError> {
        Ok(SampleDetection {
            language: self.languages.get(&sample.track_index).map(|l| l.to_string()),
            confidence: 0.95,
            has_speech: true,
        })
    }
}

/// Answers samples of a track in turn from a script of (language, confidence).
pub(crate) struct ScriptedLanguagePlugin {
    pub answers: HashMap<usize, Vec<(&'static str, f64)>>,
    asked: Mutex<HashMap<usize, usize>>,
}

impl ScriptedLanguagePlugin {
    pub fn new(answers: HashMap<usize, Vec<(&'static str, f64)>>) -> Self {
        Self {
            answers,
            asked: Mutex::new(HashMap::new()),
        }
    }
}

impl TranscriptionPlugin for ScriptedLanguagePlugin {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports(&self, feature: PluginFeature) -> bool {
        feature == PluginFeature::LanguageDetection
    }

    fn detect_language(&self, sample: &AudioSample) -> Result<SampleDetection, TranscriptionError> {
        let mut asked = self.asked.lock();
        let turn = asked.entry(sample.track_index).or_insert(0);
        let answer = self
            .answers
            .get(&sample.track_index)
            .filter(|script| !script.is_empty())
            .map(|script| script[*turn % script.len()]);
        *turn += 1;
        Ok(SampleDetection {
            language: answer.map(|(language, _)| language.to_string()),
            confidence: answer.map_or(0.0, |(_, confidence)| confidence),
            has_speech: answer.is_some(),
        })
    }
}
