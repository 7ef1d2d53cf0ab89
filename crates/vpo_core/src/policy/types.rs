//! Policy document and its validated, immutable form.

use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_COMMENTARY_PATTERNS;

use super::errors::SchemaValidationError;
use super::operations::{Operation, OperationKind};
use super::validation;

/// The only schema version this engine accepts.
pub const SCHEMA_VERSION: u32 = 12;

/// Phase names that collide with top-level policy keys.
pub const RESERVED_PHASE_NAMES: &[&str] = &["config", "schema_version", "phases"];

/// What happens to a file after a phase fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Stop this file and mark it FAILURE.
    #[default]
    Fail,
    /// Stop this file, mark it PARTIAL_FAILURE, go on with the next file.
    Continue,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string(), "und".to_string()]
}

fn default_commentary_patterns() -> Vec<String> {
    DEFAULT_COMMENTARY_PATTERNS.iter().map(|p| p.to_string()).collect()
}

/// Settings shared by every phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Preferred audio languages, most preferred first.
    #[serde(default = "default_languages")]
    pub audio_languages: Vec<String>,
    #[serde(default = "default_languages")]
    pub subtitle_languages: Vec<String>,
    #[serde(default = "default_commentary_patterns")]
    pub commentary_patterns: Vec<String>,
    #[serde(default)]
    pub on_error: OnError,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            audio_languages: default_languages(),
            subtitle_languages: default_languages(),
            commentary_patterns: default_commentary_patterns(),
            on_error: OnError::default(),
        }
    }
}

/// File facts that skip a whole phase. Any condition that matches skips it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSkipCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec_exists: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_language_exists: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Vec<String>>,
    /// Exact resolution preset, e.g. "1080p".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_under: Option<String>,
}

impl PhaseSkipCondition {
    pub fn is_empty(&self) -> bool {
        self.video_codec.is_none()
            && self.audio_codec_exists.is_none()
            && self.subtitle_language_exists.is_none()
            && self.container.is_none()
            && self.resolution.is_none()
            && self.resolution_under.is_none()
    }
}

/// A phase as written, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDocument {
    pub name: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_when: Option<PhaseSkipCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// A policy as written, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub schema_version: u32,
    #[serde(default)]
    pub config: GlobalConfig,
    #[serde(default)]
    pub phases: Vec<PhaseDocument>,
}

/// A validated phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    name: String,
    operations: Vec<Operation>,
    skip_when: Option<PhaseSkipCondition>,
    depends_on: Vec<String>,
}

impl Phase {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operations in declared order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operations in canonical execution order.
    pub fn canonical_operations(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.operations.iter().collect();
        ops.sort_by_key(|op| op.kind().rank());
        ops
    }

    pub fn has_operation(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn skip_when(&self) -> Option<&PhaseSkipCondition> {
        self.skip_when.as_ref()
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

/// A validated policy. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    schema_version: u32,
    config: GlobalConfig,
    phases: Vec<Phase>,
}

impl Policy {
    /// Validate a document. Either every check passes or nothing is accepted.
    pub fn from_document(document: PolicyDocument) -> Result<Self, SchemaValidationError> {
        validation::validate(&document)?;
        let PolicyDocument {
            schema_version,
            config,
            phases,
        } = document;
        Ok(Self {
            schema_version,
            config,
            phases: phases
                .into_iter()
                .map(|p| Phase {
                    name: p.name,
                    operations: p.operations,
                    skip_when: p.skip_when,
                    depends_on: p.depends_on,
                })
                .collect(),
        })
    }

    /// Parse and validate a JSON policy.
    pub fn from_json(json: &str) -> Result<Self, SchemaValidationError> {
        let document: PolicyDocument = serde_json::from_str(json)
            .map_err(|e| SchemaValidationError::single("$", e.to_string()))?;
        Self::from_document(document)
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    pub fn phase_names(&self) -> Vec<String> {
        self.phases.iter().map(|p| p.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_ignores_declaration_order() {
        let json = r#"{
            "schema_version": 12,
            "phases": [{
                "name": "normalize",
                "operations": [
                    {"transcode": {"audio": {}}},
                    {"conditional": [{
                        "name": "r", "when": {"exists": {"track_type": "video"}}, "then": []
                    }]},
                    {"audio_filter": {"languages": ["eng"]}},
                    {"container": {"target": "mkv"}}
                ]
            }]
        }"#;
        let policy = Policy::from_json(json).unwrap();
        let phase = &policy.phases()[0];
        let kinds: Vec<OperationKind> = phase
            .canonical_operations()
            .iter()
            .map(|op| op.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::Container,
                OperationKind::AudioFilter,
                OperationKind::Conditional,
                OperationKind::Transcode
            ]
        );
        assert_eq!(phase.operations()[0].kind(), OperationKind::Transcode);
    }

    #[test]
    fn global_defaults_apply() {
        let policy =
            Policy::from_json(r#"{"schema_version": 12, "phases": [{"name": "empty"}]}"#).unwrap();
        assert_eq!(policy.config().on_error, OnError::Fail);
        assert_eq!(policy.config().audio_languages, vec!["eng", "und"]);
        assert!(policy.phase("empty").unwrap().is_empty());
        assert!(policy.phase("missing").is_none());
    }

    #[test]
    fn malformed_json_is_a_schema_error() {
        let err = Policy::from_json("{\"schema_version\": \"twelve\"}").unwrap_err();
        assert!(err.has_error_at("$"));
    }
}
