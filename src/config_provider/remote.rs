//! HTTP-backed config provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use super::{ConfigProvider, PresetDefinition, StudentProfile};
use crate::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`ConfigProvider`] fetching presets, students, and voices over HTTP
/// with bearer-token auth.
///
/// The voices resource is downloaded to a temporary file because
/// downstream synthesis code expects a filesystem path, not a byte
/// stream. That temp-file hop is an adapter boundary specific to this
/// provider, not a general capability.
#[derive(Debug, Clone)]
pub struct RemoteConfigProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RemoteConfigProvider {
    /// Creates a provider against the given base URL.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url = base_url.into();
        let base_url = base_url.strip_suffix('/').unwrap_or(&base_url).to_string();

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    async fn fetch(&self, resource: &str) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }
}

#[async_trait]
impl ConfigProvider for RemoteConfigProvider {
    async fn load_presets(&self) -> Result<HashMap<String, PresetDefinition>> {
        Ok(self.fetch("presets").await?.json().await?)
    }

    async fn load_student_profiles(&self) -> Result<Vec<StudentProfile>> {
        Ok(self.fetch("students").await?.json().await?)
    }

    async fn resolve_voices_path(&self) -> Result<Option<PathBuf>> {
        let bytes = self.fetch("voices").await?.bytes().await?;

        let path = std::env::temp_dir().join(format!("mimeo-voices-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let provider =
            RemoteConfigProvider::new("https://config.example/v1/", "token").unwrap();
        assert_eq!(provider.base_url, "https://config.example/v1");
    }

    #[test]
    fn test_new_keeps_bare_base_url() {
        let provider = RemoteConfigProvider::new("https://config.example", "token").unwrap();
        assert_eq!(provider.base_url, "https://config.example");
    }
}
