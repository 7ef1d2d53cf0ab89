//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table and can be rewritten on its own.

use serde::{Deserialize, Serialize};

use crate::language::MultiSampleConfig;
use crate::logging::{LogConfig, LogLevel};
use crate::orchestrator::FileBackupStore;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Batch execution.
    #[serde(default)]
    pub execution: ExecutionSettings,

    /// Audio language detection sampling.
    #[serde(default)]
    pub language: LanguageSettings,
}

impl Settings {
    /// Per-file run log configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level,
            compact: self.logging.compact,
            error_tail: self.logging.error_tail as usize,
            show_timestamps: self.logging.show_timestamps,
        }
    }

    pub fn multi_sample_config(&self) -> MultiSampleConfig {
        let language = &self.language;
        MultiSampleConfig {
            max_samples: language.max_samples as usize,
            sample_duration: language.sample_duration,
            min_sample_position: language.min_sample_position,
            confidence_threshold: language.confidence_threshold,
            incumbent_bonus: language.incumbent_bonus,
        }
    }

    /// Backup store writing restore points beside the processed file.
    pub fn backup_store(&self) -> FileBackupStore {
        FileBackupStore::new(&self.paths.backup_suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for per-file run logs.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Appended to a file's name for its restore point copy.
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_backup_suffix() -> String {
    ".vpo-backup".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
            backup_suffix: default_backup_suffix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to run logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep tool output out of the log body; it still reaches the tail.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of lines to show in the tail after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Write one log file per processed file.
    #[serde(default = "default_true")]
    pub file_logs: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
            file_logs: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Files processed in parallel. 0 uses one worker per core.
    #[serde(default)]
    pub max_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSettings {
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,

    /// Seconds per sample.
    #[serde(default = "default_sample_duration")]
    pub sample_duration: f64,

    /// Earliest sample start in seconds.
    #[serde(default)]
    pub min_sample_position: f64,

    /// Stop sampling once a language reaches this confidence.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Confidence bonus for the language the track is already tagged with.
    #[serde(default = "default_incumbent_bonus")]
    pub incumbent_bonus: f64,
}

fn default_max_samples() -> u32 {
    3
}

fn default_sample_duration() -> f64 {
    30.0
}

fn default_confidence_threshold() -> f64 {
    0.85
}

fn default_incumbent_bonus() -> f64 {
    0.15
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
            sample_duration: default_sample_duration(),
            min_sample_position: 0.0,
            confidence_threshold: default_confidence_threshold(),
            incumbent_bonus: default_incumbent_bonus(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Execution,
    Language,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Execution,
        ConfigSection::Language,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Execution => "execution",
            ConfigSection::Language => "language",
        }
    }

    /// Comment written above the table.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Log and backup locations",
            ConfigSection::Logging => "Run log configuration",
            ConfigSection::Execution => "Batch execution",
            ConfigSection::Language => "Audio language detection sampling",
        }
    }
}
