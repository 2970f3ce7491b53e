//! Project configuration records.
//!
//! Configuration is supplied entirely by the host application. [`FirebaseOptions`] uses the
//! camelCase keys of the web config object so it can be deserialized straight from the JSON a
//! console hands out.

use serde::{Deserialize, Serialize};

use crate::error::{FirebaseError, FirebaseResult};

/// The name used when no project name is given.
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// Connection and credential parameters for one backend project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    #[serde(default, rename = "databaseURL", skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

impl FirebaseOptions {
    /// Parses options from a web config JSON object.
    pub fn from_json(json: &str) -> FirebaseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the fields every backend needs to create an instance.
    pub fn validate(&self) -> FirebaseResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(FirebaseError::InvalidConfig("apiKey is empty".into()));
        }
        if self.project_id.trim().is_empty() {
            return Err(FirebaseError::InvalidConfig("projectId is empty".into()));
        }
        if self.app_id.trim().is_empty() {
            return Err(FirebaseError::InvalidConfig("appId is empty".into()));
        }

        Ok(())
    }
}

/// Cache size limit for the document store's local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheSize {
    /// Never evict cached documents.
    #[default]
    Unlimited,
    /// Evict least recently used documents above this many bytes.
    Bytes(u64),
}

/// Settings applied to a project's document store right after the project is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirestoreSettings {
    pub persistence: bool,
    pub cache_size: CacheSize,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            persistence: true,
            cache_size: CacheSize::Unlimited,
        }
    }
}

/// A named backend project as handed to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(rename = "config")]
    pub options: FirebaseOptions,
    #[serde(default)]
    pub settings: FirestoreSettings,
}

impl ProjectConfig {
    /// Creates a project config with default document store settings.
    pub fn new(name: impl Into<String>, options: FirebaseOptions) -> Self {
        Self {
            name: name.into(),
            options,
            settings: FirestoreSettings::default(),
        }
    }

    /// Replaces the document store settings.
    pub fn with_settings(mut self, settings: FirestoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn validate(&self) -> FirebaseResult<()> {
        if self.name.trim().is_empty() {
            return Err(FirebaseError::InvalidConfig("project name is empty".into()));
        }

        self.options.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB_CONFIG: &str = r#"{
        "apiKey": "key",
        "authDomain": "demo.firebaseapp.com",
        "projectId": "demo",
        "storageBucket": "demo.appspot.com",
        "messagingSenderId": "1234",
        "appId": "1:1234:web:abcd",
        "databaseURL": "https://demo.firebaseio.com"
    }"#;

    #[test]
    fn parses_web_config_keys() {
        let options = FirebaseOptions::from_json(WEB_CONFIG).unwrap();

        assert_eq!(options.project_id, "demo");
        assert_eq!(options.database_url.as_deref(), Some("https://demo.firebaseio.com"));
        assert_eq!(options.measurement_id, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn project_config_defaults_settings() {
        let json = format!(r#"{{ "name": "p1", "config": {WEB_CONFIG} }}"#);
        let config: ProjectConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.name, "p1");
        assert!(config.settings.persistence);
        assert_eq!(config.settings.cache_size, CacheSize::Unlimited);
    }

    #[test]
    fn rejects_blank_fields() {
        let mut options = FirebaseOptions::from_json(WEB_CONFIG).unwrap();
        options.api_key = " ".into();
        assert!(matches!(options.validate(), Err(FirebaseError::InvalidConfig(_))));

        let config = ProjectConfig::new("", FirebaseOptions::from_json(WEB_CONFIG).unwrap());
        assert!(matches!(config.validate(), Err(FirebaseError::InvalidConfig(_))));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            FirebaseOptions::from_json("{ not json"),
            Err(FirebaseError::Serialization(_))
        ));
    }
}
