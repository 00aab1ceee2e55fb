use reqwest::Client;
use serde::Deserialize;

use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::download;
use crate::version::BuildNumber;

/// `maven-metadata.xml`; only the versioning block matters here.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MavenMetadata {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub versioning: Option<Versioning>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub versions: Option<Versions>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Versions {
    #[serde(default, rename = "version")]
    pub items: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> ResolverResult<Self> {
        quick_xml::de::from_str(xml)
            .map_err(|e| ResolverError::xml("maven-metadata.xml", e.to_string()))
    }

    /// Most recently published version.
    pub fn latest_version(&self) -> Option<&str> {
        self.versioning.as_ref()?.latest.as_deref()
    }

    /// Greatest published version that is not above `target`. Versions that
    /// do not parse as build numbers are skipped.
    pub fn closest_below(&self, target: &BuildNumber) -> Option<String> {
        self.versioning
            .as_ref()?
            .versions
            .as_ref()?
            .items
            .iter()
            .filter_map(|raw| BuildNumber::parse(raw).ok().map(|parsed| (raw, parsed)))
            .filter(|(_, parsed)| parsed <= target)
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(raw, _)| raw.clone())
    }
}

/// Fetches and parses a `maven-metadata.xml` document.
pub async fn fetch_metadata(client: &Client, url: &str) -> ResolverResult<MavenMetadata> {
    let bytes = download::download_to_bytes(client, url).await?;
    let text = String::from_utf8_lossy(&bytes);
    MavenMetadata::parse(&text)
}
