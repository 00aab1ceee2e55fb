use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::core::constants::locations;
use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::{archive, download, HttpClient, Platform};
use crate::version::IdeVersionSpec;

/// `product-info.json` found in the root of an IDE installation.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub version_suffix: Option<String>,
    #[serde(default)]
    pub build_number: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub launch: Vec<Launch>,
    #[serde(default)]
    pub bundled_plugins: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub launcher_path: Option<String>,
    #[serde(default)]
    pub java_executable_path: Option<String>,
}

impl ProductInfo {
    /// Launch record matching `platform`, if any.
    pub fn launch_for(&self, platform: &Platform) -> Option<&Launch> {
        let wanted = match platform.os.as_str() {
            "windows" => "Windows",
            "macos" => "macOS",
            _ => "Linux",
        };
        self.launch.iter().find(|l| l.os.as_deref() == Some(wanted))
    }
}

/// Reads `product-info.json` from an IDE installation root, also looking
/// under `Resources/` where macOS bundles keep it.
pub fn product_info(ide_dir: &Path) -> Option<ProductInfo> {
    for relative in ["product-info.json", "Resources/product-info.json"] {
        let path = ide_dir.join(relative);
        if let Ok(raw) = fs::read_to_string(&path) {
            match serde_json::from_str(&raw) {
                Ok(info) => return Some(info),
                Err(err) => debug!(path = %path.display(), %err, "cannot parse product-info.json"),
            }
        }
    }
    None
}

/// Build number of an installation: `product-info.json` first, `build.txt`
/// as the fallback used by distributions that lack the JSON descriptor.
pub fn ide_build_number(ide_dir: &Path) -> Option<String> {
    if let Some(info) = product_info(ide_dir) {
        if let Some(build) = info.build_number {
            return Some(build);
        }
    }
    fs::read_to_string(ide_dir.join("build.txt"))
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// Parses a Java `key=value` properties file; `#`-prefixed lines and lines
/// without a separator are skipped.
pub fn read_properties(path: &Path) -> ResolverResult<HashMap<String, String>> {
    let raw = fs::read_to_string(path)?;
    let mut properties = HashMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(properties)
}

/// Runtime build declared by the IDE in `dependencies.txt`, preferring
/// `runtimeBuild` over the older `jdkBuild` key.
pub fn declared_runtime_build(ide_dir: &Path) -> Option<String> {
    let path = ide_dir.join("dependencies.txt");
    if !path.exists() {
        return None;
    }
    match read_properties(&path) {
        Ok(properties) => properties
            .get("runtimeBuild")
            .or_else(|| properties.get("jdkBuild"))
            .cloned(),
        Err(err) => {
            debug!(path = %path.display(), %err, "cannot read dependencies.txt");
            None
        }
    }
}

/// Resolves an IDE distribution to a local installation directory.
pub struct IdeResolver {
    http: HttpClient,
    cache_root: PathBuf,
    platform: Platform,
}

impl IdeResolver {
    pub fn new(http: HttpClient, cache_root: PathBuf, platform: Platform) -> Self {
        Self {
            http,
            cache_root,
            platform,
        }
    }

    fn client(&self) -> &Client {
        self.http.inner()
    }

    /// Resolves `spec` ("IC-2021.3.2", "2021.3", "213.1234.56") to an
    /// extracted installation directory. A `local_path` bypasses download
    /// entirely; an already-populated cache directory is returned as-is.
    /// Otherwise every release channel is tried in order and the first
    /// downloadable archive wins.
    pub async fn resolve(
        &self,
        spec: &str,
        local_path: Option<&Path>,
        progress: impl Fn(u64, u64),
    ) -> ResolverResult<PathBuf> {
        if let Some(local) = local_path {
            if !local.exists() {
                return Err(ResolverError::config(format!(
                    "local IDE path does not exist: {}",
                    local.display()
                )));
            }
            debug!(path = %local.display(), "using local IDE installation");
            return Ok(local.to_path_buf());
        }

        let spec = IdeVersionSpec::parse(spec)?;
        let ide_dir = self.cache_root.join("ides").join(spec.directory_name());
        if ide_dir.exists() {
            debug!(ide = %spec, path = %ide_dir.display(), "IDE already available");
            return Ok(ide_dir);
        }

        let build_types: &[&str] = if spec.is_android_studio() {
            &[""]
        } else {
            &["release", "rc", "eap", "beta"]
        };

        let mut attempted = Vec::new();
        for build_type in build_types {
            debug!(ide = %spec, channel = %build_type, "trying download channel");
            match self.download_and_extract(&spec, build_type, &ide_dir, &progress).await {
                Ok(path) => {
                    info!(ide = %spec, path = %path.display(), "resolved IDE");
                    return Ok(path);
                }
                Err(err) => {
                    debug!(ide = %spec, channel = %build_type, %err, "channel failed, trying next");
                    attempted.push(match *build_type {
                        "" => "direct download".to_string(),
                        channel => format!("channel '{channel}'"),
                    });
                }
            }
        }

        Err(ResolverError::not_found(
            format!("IDE '{spec}'"),
            attempted,
        ))
    }

    async fn download_and_extract(
        &self,
        spec: &IdeVersionSpec,
        build_type: &str,
        ide_dir: &Path,
        progress: impl Fn(u64, u64),
    ) -> ResolverResult<PathBuf> {
        let url = self.resolve_ide_url(spec, build_type).await?;
        let archive_name = format!(
            "{}.{}",
            spec.directory_name(),
            self.platform.archive_ext()
        );
        let archive_path = self.cache_root.join("downloads").join(archive_name);
        download::download_to_file(self.client(), &url, &archive_path, progress).await?;
        archive::extract(&archive_path, ide_dir)
    }

    /// Computes the direct download URL for one channel attempt. The download
    /// service answers with a redirect to the real host; that target is
    /// rewritten through the cache redirector. Android Studio ships from a
    /// fixed location with no service in front.
    async fn resolve_ide_url(
        &self,
        spec: &IdeVersionSpec,
        build_type: &str,
    ) -> ResolverResult<String> {
        if spec.is_android_studio() {
            let suffix = match self.platform.os.as_str() {
                "windows" => "windows.zip",
                "macos" => "mac.zip",
                _ => "linux.tar.gz",
            };
            return Ok(format!(
                "{}/{}/android-studio-{}-{}",
                locations::ANDROID_STUDIO_DOWNLOAD_URL,
                spec.version,
                spec.version,
                suffix
            ));
        }

        let service_platform = match self.platform.os.as_str() {
            "windows" => "windows",
            "macos" => "mac",
            _ => "linux",
        };
        let url = format!(
            "{}?code={}&platform={}&type={}&{}={}",
            locations::IDEA_DOWNLOAD_URL,
            urlencoding::encode(&spec.platform_type),
            service_platform,
            build_type,
            spec.version_parameter(),
            urlencoding::encode(&spec.version),
        );
        debug!(url, "resolving direct IDE download URL");

        if let Some(location) = self.http.capture_redirect(&url).await? {
            let redirect = Url::parse(&location)
                .map_err(|e| ResolverError::network(format!("bad redirect target '{location}': {e}")))?;
            let host = redirect
                .host_str()
                .ok_or_else(|| ResolverError::network(format!("redirect target has no host: {location}")))?;
            let mut file = redirect.path().to_string();
            if let Some(query) = redirect.query() {
                file.push('?');
                file.push_str(query);
            }
            return Ok(format!("{}/{host}{file}", locations::CACHE_REDIRECTOR));
        }
        Ok(url)
    }
}
