use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;

use crate::core::constants::artifacts;
use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::config::{PluginRepositoryConfig, PluginRepositoryKind};
use crate::infrastructure::{archive, download, Config};
use crate::resolver::ide;
use crate::resolver::maven;
use crate::version::BuildNumber;

/// Compact plugin dependency notation: `id[:version][@channel]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDependencyNotation {
    pub id: String,
    pub version: Option<String>,
    pub channel: Option<String>,
}

impl PluginDependencyNotation {
    pub fn parse(input: &str) -> ResolverResult<Self> {
        let (main, channel) = match input.split_once('@') {
            Some((main, channel)) => (main, Some(channel)),
            None => (input, None),
        };
        let (id, version) = match main.split_once(':') {
            Some((id, version)) => (id, Some(version)),
            None => (main, None),
        };
        let id = id.trim();
        if id.is_empty() {
            return Err(ResolverError::parse(input, "empty plugin id"));
        }
        Ok(Self {
            id: id.to_string(),
            version: version.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string),
            channel: channel.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
        })
    }
}

impl FromStr for PluginDependencyNotation {
    type Err = ResolverError;

    fn from_str(s: &str) -> ResolverResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PluginDependencyNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        if let Some(channel) = &self.channel {
            write!(f, "@{channel}")?;
        }
        Ok(())
    }
}

/// A resolved plugin dependency.
#[derive(Debug, Clone)]
pub struct PluginDependency {
    pub id: String,
    pub version: String,
    pub channel: Option<String>,
    /// Extracted plugin directory (or the in-place directory for builtins).
    pub artifact: PathBuf,
    /// Shipped inside the target IDE rather than fetched externally.
    pub builtin: bool,
}

// Descriptor read from META-INF/plugin.xml.

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PluginDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "idea-version")]
    pub idea_version: Option<IdeaVersion>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct IdeaVersion {
    #[serde(default, rename = "@since-build")]
    pub since_build: Option<String>,
    #[serde(default, rename = "@until-build")]
    pub until_build: Option<String>,
}

impl PluginDescriptor {
    pub fn parse(xml: &str) -> ResolverResult<Self> {
        quick_xml::de::from_str(xml).map_err(|e| ResolverError::xml("plugin.xml", e.to_string()))
    }

    /// Effective plugin id: the `<id>` element, or `<name>` as the platform's
    /// historical fallback.
    pub fn effective_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }
}

/// Reads the descriptor of an unpacked plugin: `META-INF/plugin.xml` either
/// on disk or inside one of the `lib/*.jar` archives.
pub fn plugin_descriptor(plugin_dir: &Path) -> Option<PluginDescriptor> {
    for entry in WalkDir::new(plugin_dir)
        .max_depth(3)
        .into_iter()
        .filter_map(Result::ok)
    {
        if entry.file_type().is_file()
            && entry.file_name() == "plugin.xml"
            && entry.path().parent().map(|p| p.ends_with("META-INF")) == Some(true)
        {
            if let Ok(raw) = fs::read_to_string(entry.path()) {
                if let Ok(descriptor) = PluginDescriptor::parse(&raw) {
                    return Some(descriptor);
                }
            }
        }
    }

    for entry in WalkDir::new(plugin_dir)
        .max_depth(3)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("jar")
        {
            if let Some(descriptor) = descriptor_from_jar(path) {
                return Some(descriptor);
            }
        }
    }
    None
}

fn descriptor_from_jar(jar: &Path) -> Option<PluginDescriptor> {
    let file = fs::File::open(jar).ok()?;
    let mut archive = zip::ZipArchive::new(file).ok()?;
    let mut entry = archive.by_name("META-INF/plugin.xml").ok()?;
    let mut raw = String::new();
    std::io::Read::read_to_string(&mut entry, &mut raw).ok()?;
    PluginDescriptor::parse(&raw).ok()
}

// Custom repository feed, categorized schema: <plugin-repository><category>…

#[derive(Debug, Deserialize, Default)]
struct PluginRepositoryDoc {
    #[serde(default, rename = "category")]
    categories: Vec<CategoryDoc>,
}

#[derive(Debug, Deserialize, Default)]
struct CategoryDoc {
    #[serde(default, rename = "idea-plugin")]
    plugins: Vec<CategorizedPluginDoc>,
}

#[derive(Debug, Deserialize, Default)]
struct CategorizedPluginDoc {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "download-url")]
    download_url: Option<String>,
}

// Custom repository feed, flat schema: <plugins><plugin id= version= url=/>…

#[derive(Debug, Deserialize, Default)]
struct PluginsDoc {
    #[serde(default, rename = "plugin")]
    plugins: Vec<FlatPluginDoc>,
}

#[derive(Debug, Deserialize, Default)]
struct FlatPluginDoc {
    #[serde(default, rename = "@id")]
    id: Option<String>,
    #[serde(default, rename = "@version")]
    version: Option<String>,
    #[serde(default, rename = "@url")]
    url: Option<String>,
}

/// Match found in a repository listing: where to download and which version
/// the listing declared.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocatedPlugin {
    download_url: String,
    version: Option<String>,
}

/// Looks a notation up in a custom repository document. The categorized
/// `<plugin-repository>` schema is attempted first; when it does not match,
/// structurally or because it listed no categories at all, the flat
/// `<plugins>` schema is tried. Both schemas are legitimate in the wild.
fn find_in_custom_document(
    xml: &str,
    notation: &PluginDependencyNotation,
) -> ResolverResult<Option<LocatedPlugin>> {
    let categorized: Result<PluginRepositoryDoc, _> = quick_xml::de::from_str(xml);
    let categorized_parsed = match &categorized {
        Ok(doc) if !doc.categories.is_empty() => {
            let found = doc
                .categories
                .iter()
                .flat_map(|category| &category.plugins)
                .find(|plugin| {
                    matches_notation(plugin.id.as_deref().or(plugin.name.as_deref()), plugin.version.as_deref(), notation)
                });
            if let Some(plugin) = found {
                if let Some(url) = &plugin.download_url {
                    return Ok(Some(LocatedPlugin {
                        download_url: url.clone(),
                        version: plugin.version.clone(),
                    }));
                }
            }
            true
        }
        _ => false,
    };

    let flat: Result<PluginsDoc, _> = quick_xml::de::from_str(xml);
    match flat {
        Ok(doc) => {
            let found = doc.plugins.iter().find(|plugin| {
                matches_notation(plugin.id.as_deref(), plugin.version.as_deref(), notation)
            });
            Ok(found.and_then(|plugin| {
                plugin.url.as_ref().map(|url| LocatedPlugin {
                    download_url: url.clone(),
                    version: plugin.version.clone(),
                })
            }))
        }
        Err(err) if !categorized_parsed => {
            Err(ResolverError::xml("custom plugin repository", err.to_string()))
        }
        Err(_) => Ok(None),
    }
}

fn matches_notation(
    id: Option<&str>,
    version: Option<&str>,
    notation: &PluginDependencyNotation,
) -> bool {
    let id_matches = id.map_or(false, |id| id.eq_ignore_ascii_case(&notation.id));
    let version_matches = match (&notation.version, version) {
        (None, _) => true,
        (Some(wanted), Some(listed)) => wanted.eq_ignore_ascii_case(listed),
        (Some(_), None) => false,
    };
    id_matches && version_matches
}

/// Marketplace download URL for a notation. An explicit version goes through
/// the direct download endpoint; otherwise the plugin manager endpoint picks
/// the newest version compatible with the target build.
fn marketplace_download_url(
    host: &str,
    notation: &PluginDependencyNotation,
    target_build: &BuildNumber,
) -> String {
    let channel = notation.channel.as_deref().unwrap_or("");
    match &notation.version {
        Some(version) => format!(
            "{host}/plugin/download?pluginId={}&version={}&channel={}",
            urlencoding::encode(&notation.id),
            urlencoding::encode(version),
            urlencoding::encode(channel),
        ),
        None => format!(
            "{host}/pluginManager?action=download&id={}&build={}&channel={}",
            urlencoding::encode(&notation.id),
            urlencoding::encode(&target_build.to_string()),
            urlencoding::encode(channel),
        ),
    }
}

/// Resolves a relative listing URL against the repository base.
fn absolutize(base: &str, candidate: &str) -> ResolverResult<String> {
    if Url::parse(candidate).is_ok() {
        return Ok(candidate.to_string());
    }
    let base_url = Url::parse(&format!("{}/", base.trim_end_matches('/')))
        .map_err(|e| ResolverError::config(format!("bad repository URL '{base}': {e}")))?;
    Ok(base_url
        .join(candidate)
        .map_err(|e| ResolverError::config(format!("bad download URL '{candidate}': {e}")))?
        .to_string())
}

/// One plugin source in the configured order.
#[async_trait]
trait PluginSource: Send + Sync {
    fn describe(&self) -> String;

    /// Finds the notation in this source. `Ok(None)` means "not listed
    /// here" and resolution moves on to the next source.
    async fn locate(
        &self,
        notation: &PluginDependencyNotation,
        target_build: &BuildNumber,
    ) -> ResolverResult<Option<LocatedPlugin>>;
}

struct MarketplaceSource {
    host: String,
}

#[async_trait]
impl PluginSource for MarketplaceSource {
    fn describe(&self) -> String {
        format!("marketplace {}", self.host)
    }

    async fn locate(
        &self,
        notation: &PluginDependencyNotation,
        target_build: &BuildNumber,
    ) -> ResolverResult<Option<LocatedPlugin>> {
        Ok(Some(LocatedPlugin {
            download_url: marketplace_download_url(&self.host, notation, target_build),
            version: notation.version.clone(),
        }))
    }
}

struct CustomXmlSource {
    client: Client,
    repository_url: String,
    plugins_xml_url: String,
}

impl CustomXmlSource {
    fn new(client: Client, url: &str) -> Self {
        let trimmed = url.trim_end_matches('/');
        if trimmed.ends_with(".xml") {
            let base = match trimmed.rfind('/') {
                Some(idx) => trimmed[..idx].to_string(),
                None => trimmed.to_string(),
            };
            Self {
                client,
                repository_url: base,
                plugins_xml_url: trimmed.to_string(),
            }
        } else {
            Self {
                client,
                repository_url: trimmed.to_string(),
                plugins_xml_url: format!("{trimmed}/updatePlugins.xml"),
            }
        }
    }
}

#[async_trait]
impl PluginSource for CustomXmlSource {
    fn describe(&self) -> String {
        format!("custom repository {}", self.plugins_xml_url)
    }

    async fn locate(
        &self,
        notation: &PluginDependencyNotation,
        _target_build: &BuildNumber,
    ) -> ResolverResult<Option<LocatedPlugin>> {
        debug!(url = %self.plugins_xml_url, "loading plugin list");
        let bytes = download::download_to_bytes(&self.client, &self.plugins_xml_url).await?;
        let xml = String::from_utf8_lossy(&bytes);
        let located = find_in_custom_document(&xml, notation)?;
        located
            .map(|found| {
                Ok(LocatedPlugin {
                    download_url: absolutize(&self.repository_url, &found.download_url)?,
                    version: found.version,
                })
            })
            .transpose()
    }
}

struct MavenSource {
    client: Client,
    url: String,
}

#[async_trait]
impl PluginSource for MavenSource {
    fn describe(&self) -> String {
        format!("maven repository {}", self.url)
    }

    async fn locate(
        &self,
        notation: &PluginDependencyNotation,
        _target_build: &BuildNumber,
    ) -> ResolverResult<Option<LocatedPlugin>> {
        let group_path = artifacts::PLUGIN_GROUP.replace('.', "/");
        let version = match &notation.version {
            Some(version) => version.clone(),
            None => {
                let metadata_url = format!(
                    "{}/{}/{}/maven-metadata.xml",
                    self.url.trim_end_matches('/'),
                    group_path,
                    notation.id
                );
                let metadata = maven::fetch_metadata(&self.client, &metadata_url).await?;
                match metadata.latest_version() {
                    Some(latest) => latest.to_string(),
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(LocatedPlugin {
            download_url: format!(
                "{}/{}/{}/{}/{}-{}.zip",
                self.url.trim_end_matches('/'),
                group_path,
                notation.id,
                version,
                notation.id,
                version
            ),
            version: Some(version),
        }))
    }
}

/// Resolves plugin dependency notations against the target IDE and the
/// configured repositories.
pub struct PluginDependencyResolver {
    client: Client,
    cache_root: PathBuf,
    sources: Vec<Box<dyn PluginSource>>,
}

impl PluginDependencyResolver {
    pub fn new(client: Client, config: &Config) -> Self {
        let sources = config
            .repositories
            .plugins
            .iter()
            .map(|entry| build_source(client.clone(), entry))
            .collect();
        Self {
            client,
            cache_root: config.cache_root(),
            sources,
        }
    }

    /// Resolves `notation` for `target_build`. Builtin plugins of the IDE
    /// installation short-circuit without any download; otherwise the
    /// configured sources are tried strictly in order and the downloaded
    /// plugin must declare a compatibility range containing `target_build`.
    pub async fn resolve(
        &self,
        notation: &PluginDependencyNotation,
        ide_dir: Option<&Path>,
        target_build: &BuildNumber,
    ) -> ResolverResult<PluginDependency> {
        if let Some(ide_dir) = ide_dir {
            if let Some(builtin) = find_builtin(ide_dir, &notation.id) {
                debug!(id = %notation.id, path = %builtin.directory.display(), "resolved builtin plugin");
                return Ok(PluginDependency {
                    id: notation.id.clone(),
                    version: builtin.version,
                    channel: notation.channel.clone(),
                    artifact: builtin.directory,
                    builtin: true,
                });
            }
        }

        let mut attempted = Vec::new();
        for source in &self.sources {
            let described = source.describe();
            match source.locate(notation, target_build).await {
                Ok(Some(located)) => {
                    match self
                        .fetch_and_verify(notation, &located, target_build)
                        .await
                    {
                        Ok(dependency) => return Ok(dependency),
                        Err(err @ ResolverError::IncompatibleVersion { .. }) => return Err(err),
                        Err(err) => {
                            warn!(source = %described, %err, "source failed, trying next");
                            attempted.push(described);
                        }
                    }
                }
                Ok(None) => {
                    debug!(source = %described, id = %notation.id, "plugin not listed");
                    attempted.push(described);
                }
                Err(err) => {
                    warn!(source = %described, %err, "source failed, trying next");
                    attempted.push(described);
                }
            }
        }

        Err(ResolverError::not_found(
            format!("plugin '{notation}' compatible with {target_build}"),
            attempted,
        ))
    }

    async fn fetch_and_verify(
        &self,
        notation: &PluginDependencyNotation,
        located: &LocatedPlugin,
        target_build: &BuildNumber,
    ) -> ResolverResult<PluginDependency> {
        let version_label = located
            .version
            .clone()
            .unwrap_or_else(|| format!("latest-{target_build}"));
        let repo_key = download::url_hash(&located.download_url);
        let archive_path = self
            .cache_root
            .join("plugins")
            .join(&repo_key)
            .join(format!("{}-{}.zip", notation.id, version_label));
        download::download_to_file(&self.client, &located.download_url, &archive_path, |_, _| {})
            .await?;

        let extracted = archive_path.with_extension("");
        let plugin_dir = archive::extract(&archive_path, &extracted)?;

        let descriptor = plugin_descriptor(&plugin_dir);
        if let Some(descriptor) = &descriptor {
            check_compatibility(&notation.id, descriptor, target_build)?;
        } else {
            debug!(id = %notation.id, "no plugin descriptor found, skipping compatibility check");
        }

        let version = descriptor
            .as_ref()
            .and_then(|d| d.version.clone())
            .unwrap_or(version_label);
        Ok(PluginDependency {
            id: notation.id.clone(),
            version,
            channel: notation.channel.clone(),
            artifact: plugin_dir,
            builtin: false,
        })
    }
}

fn build_source(client: Client, entry: &PluginRepositoryConfig) -> Box<dyn PluginSource> {
    match entry.kind {
        PluginRepositoryKind::Marketplace => Box::new(MarketplaceSource {
            host: entry.url.trim_end_matches('/').to_string(),
        }),
        PluginRepositoryKind::Custom => Box::new(CustomXmlSource::new(client, &entry.url)),
        PluginRepositoryKind::Maven => Box::new(MavenSource {
            client,
            url: entry.url.clone(),
        }),
    }
}

struct BuiltinPlugin {
    directory: PathBuf,
    version: String,
}

/// Scans the IDE's plugin registry for a bundled plugin with the given id:
/// first by directory name, then by reading each plugin's descriptor. The
/// `bundledPlugins` list of `product-info.json` is consulted as a shortcut.
fn find_builtin(ide_dir: &Path, id: &str) -> Option<BuiltinPlugin> {
    let plugins_dir = ide_dir.join("plugins");
    if !plugins_dir.is_dir() {
        return None;
    }

    let listed = ide::product_info(ide_dir)
        .map(|info| {
            info.bundled_plugins
                .iter()
                .any(|bundled| bundled.eq_ignore_ascii_case(id))
        })
        .unwrap_or(false);

    let last_segment = id.rsplit('.').next().unwrap_or(id);
    let mut directories = Vec::new();
    if let Ok(entries) = fs::read_dir(&plugins_dir) {
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.eq_ignore_ascii_case(id) || name.eq_ignore_ascii_case(last_segment) {
                let version = plugin_descriptor(&path)
                    .and_then(|d| d.version)
                    .unwrap_or_else(|| "builtin".to_string());
                return Some(BuiltinPlugin {
                    directory: path,
                    version,
                });
            }
            directories.push(path);
        }
    }

    for path in directories {
        if let Some(descriptor) = plugin_descriptor(&path) {
            if descriptor
                .effective_id()
                .map_or(false, |found| found.eq_ignore_ascii_case(id))
            {
                let version = descriptor.version.unwrap_or_else(|| "builtin".to_string());
                return Some(BuiltinPlugin {
                    directory: path,
                    version,
                });
            }
        }
    }

    if listed {
        debug!(id, "plugin listed as bundled but no plugin directory matched");
    }
    None
}

/// Verifies the plugin's declared since/until range against the target
/// build; a mismatch is fatal and names both sides.
fn check_compatibility(
    id: &str,
    descriptor: &PluginDescriptor,
    target_build: &BuildNumber,
) -> ResolverResult<()> {
    let Some(idea_version) = &descriptor.idea_version else {
        return Ok(());
    };
    let since = idea_version
        .since_build
        .as_deref()
        .and_then(|raw| BuildNumber::parse(raw).ok());
    let until = idea_version
        .until_build
        .as_deref()
        .and_then(|raw| BuildNumber::parse(raw).ok());
    if target_build.is_within(since.as_ref(), until.as_ref()) {
        return Ok(());
    }
    Err(ResolverError::IncompatibleVersion {
        subject: id.to_string(),
        required: format!(
            "since {}, until {}",
            idea_version.since_build.as_deref().unwrap_or("*"),
            idea_version.until_build.as_deref().unwrap_or("*"),
        ),
        actual: target_build.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn notation_parses_all_forms() {
        let full = PluginDependencyNotation::parse("com.example.plugin:1.2.3@eap").unwrap();
        assert_eq!(full.id, "com.example.plugin");
        assert_eq!(full.version.as_deref(), Some("1.2.3"));
        assert_eq!(full.channel.as_deref(), Some("eap"));

        let bare = PluginDependencyNotation::parse("org.rust.lang").unwrap();
        assert_eq!(bare.id, "org.rust.lang");
        assert_eq!(bare.version, None);
        assert_eq!(bare.channel, None);

        let channel_only = PluginDependencyNotation::parse("org.rust.lang@nightly").unwrap();
        assert_eq!(channel_only.version, None);
        assert_eq!(channel_only.channel.as_deref(), Some("nightly"));
    }

    #[test]
    fn empty_id_is_fatal() {
        assert!(PluginDependencyNotation::parse("").is_err());
        assert!(PluginDependencyNotation::parse(":1.0@eap").is_err());
    }

    const CATEGORIZED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plugin-repository>
  <category name="Tools">
    <idea-plugin>
      <id>com.example.plugin</id>
      <name>Example</name>
      <version>1.2.3</version>
      <download-url>example/plugin-1.2.3.zip</download-url>
    </idea-plugin>
  </category>
</plugin-repository>"#;

    const FLAT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plugins>
  <plugin id="com.example.plugin" version="1.2.3" url="https://downloads.example.com/plugin-1.2.3.zip"/>
  <plugin id="org.other.plugin" version="0.9" url="relative/other-0.9.zip"/>
</plugins>"#;

    fn notation(s: &str) -> PluginDependencyNotation {
        PluginDependencyNotation::parse(s).unwrap()
    }

    #[test]
    fn categorized_schema_is_found_first() {
        let located = find_in_custom_document(CATEGORIZED_XML, &notation("com.example.plugin:1.2.3"))
            .unwrap()
            .unwrap();
        assert_eq!(located.download_url, "example/plugin-1.2.3.zip");
        assert_eq!(located.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn flat_schema_is_the_fallback() {
        let located = find_in_custom_document(FLAT_XML, &notation("com.example.plugin"))
            .unwrap()
            .unwrap();
        assert_eq!(
            located.download_url,
            "https://downloads.example.com/plugin-1.2.3.zip"
        );
    }

    #[test]
    fn version_mismatch_is_not_a_match() {
        assert!(find_in_custom_document(FLAT_XML, &notation("com.example.plugin:9.9"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn id_match_is_case_insensitive() {
        assert!(find_in_custom_document(FLAT_XML, &notation("COM.Example.Plugin"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn garbage_document_is_an_error() {
        assert!(find_in_custom_document("not xml at all", &notation("a.b")).is_err());
    }

    #[test]
    fn absolutize_keeps_absolute_and_joins_relative() {
        assert_eq!(
            absolutize("https://repo.example.com/plugins", "https://cdn.example.com/p.zip").unwrap(),
            "https://cdn.example.com/p.zip"
        );
        assert_eq!(
            absolutize("https://repo.example.com/plugins", "example/p.zip").unwrap(),
            "https://repo.example.com/plugins/example/p.zip"
        );
    }

    #[test]
    fn marketplace_url_shapes() {
        let build = BuildNumber::parse("IC-213.6777").unwrap();
        assert_eq!(
            marketplace_download_url(
                "https://plugins.jetbrains.com",
                &notation("com.example.plugin:1.2.3@eap"),
                &build
            ),
            "https://plugins.jetbrains.com/plugin/download?pluginId=com.example.plugin&version=1.2.3&channel=eap"
        );
        assert_eq!(
            marketplace_download_url(
                "https://plugins.jetbrains.com",
                &notation("com.example.plugin"),
                &build
            ),
            "https://plugins.jetbrains.com/pluginManager?action=download&id=com.example.plugin&build=IC-213.6777&channel="
        );
    }

    const PLUGIN_XML: &str = r#"<idea-plugin>
  <id>com.example.plugin</id>
  <name>Example</name>
  <version>1.2.3</version>
  <idea-version since-build="211.0" until-build="213.*"/>
</idea-plugin>"#;

    #[test]
    fn descriptor_from_unpacked_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("META-INF");
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join("plugin.xml"), PLUGIN_XML).unwrap();

        let descriptor = plugin_descriptor(dir.path()).unwrap();
        assert_eq!(descriptor.effective_id(), Some("com.example.plugin"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn descriptor_from_jar_inside_lib() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        fs::create_dir_all(&lib).unwrap();
        let jar = lib.join("example.jar");
        let file = fs::File::create(&jar).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("META-INF/plugin.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(PLUGIN_XML.as_bytes()).unwrap();
        writer.finish().unwrap();

        let descriptor = plugin_descriptor(dir.path()).unwrap();
        assert_eq!(descriptor.effective_id(), Some("com.example.plugin"));
    }

    #[test]
    fn compatibility_check_names_both_ranges() {
        let descriptor = PluginDescriptor::parse(PLUGIN_XML).unwrap();
        let inside = BuildNumber::parse("212.5712.43").unwrap();
        assert!(check_compatibility("com.example.plugin", &descriptor, &inside).is_ok());

        let outside = BuildNumber::parse("221.1").unwrap();
        let err = check_compatibility("com.example.plugin", &descriptor, &outside).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("211.0"));
        assert!(message.contains("213.*"));
        assert!(message.contains("221.1"));
    }

    #[tokio::test]
    async fn builtin_plugin_short_circuits_repositories() {
        let ide = tempfile::tempdir().unwrap();
        let plugin_dir = ide.path().join("plugins").join("example");
        let meta = plugin_dir.join("META-INF");
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join("plugin.xml"), PLUGIN_XML).unwrap();

        let resolver = PluginDependencyResolver::new(Client::new(), &Config::default());
        let target = BuildNumber::parse("212.5712").unwrap();
        let dependency = resolver
            .resolve(&notation("com.example.plugin"), Some(ide.path()), &target)
            .await
            .unwrap();
        assert!(dependency.builtin);
        assert_eq!(dependency.artifact, plugin_dir);
        assert_eq!(dependency.version, "1.2.3");
    }
}
