//! Environment-specific configuration for the pipeline.
//!
//! This module defines the [`ConfigProvider`] trait for resolving the
//! inputs that vary between deployments: formatting presets, student
//! profiles, and the voice-mapping resource. Two backends exist: a
//! local-filesystem reader and a remote HTTP-backed reader.

mod local;
mod remote;

pub use local::{LocalConfigOptions, LocalConfigProvider};
pub use remote::RemoteConfigProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::Result;

/// A named formatting preset.
///
/// The orchestrator treats the settings as opaque; only the colorizer
/// interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetDefinition {
    /// Human-readable description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Formatter-specific settings.
    #[serde(flatten)]
    pub settings: serde_json::Map<String, JsonValue>,
}

/// One student or class profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    /// Display name of the student or class.
    pub name: String,

    /// Target database the student's assignments publish into, when the
    /// profile overrides the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

/// Resolves environment-specific pipeline inputs.
///
/// Implementations are selected once at pipeline construction and
/// injected; they are never re-resolved per call.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Loads the formatting presets by name.
    async fn load_presets(&self) -> Result<HashMap<String, PresetDefinition>>;

    /// Loads the student profiles.
    async fn load_student_profiles(&self) -> Result<Vec<StudentProfile>>;

    /// Resolves the voice-mapping resource to a local filesystem path.
    ///
    /// Downstream synthesis expects a path, not a byte stream, so remote
    /// implementations materialize the resource to a temporary file.
    async fn resolve_voices_path(&self) -> Result<Option<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_definition_flattens_settings() {
        let json = r##"{"description":"color by part of speech","nouns":"#ff0000","verbs":"#0000ff"}"##;
        let preset: PresetDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(preset.description.as_deref(), Some("color by part of speech"));
        assert_eq!(preset.settings.len(), 2);
        assert_eq!(
            preset.settings.get("nouns").and_then(JsonValue::as_str),
            Some("#ff0000")
        );
    }

    #[test]
    fn test_preset_map_parses() {
        let json = r##"{"rainbow":{"nouns":"#f00"},"plain":{}}"##;
        let presets: HashMap<String, PresetDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(presets.len(), 2);
        assert!(presets.contains_key("rainbow"));
    }

    #[test]
    fn test_student_profile_database_id_optional() {
        let profile: StudentProfile = serde_json::from_str(r#"{"name":"B2 group"}"#).unwrap();
        assert_eq!(profile.name, "B2 group");
        assert!(profile.database_id.is_none());

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("databaseId"));
    }

    #[test]
    fn test_student_profile_with_database_id() {
        let profile: StudentProfile =
            serde_json::from_str(r#"{"name":"Anna","databaseId":"db-7"}"#).unwrap();
        assert_eq!(profile.database_id.as_deref(), Some("db-7"));
    }
}
