use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::constants::{defaults, locations};
use crate::error::{ResolverError, ResolverResult};

/// Resolver configuration, loaded once per top-level operation and passed
/// around as a plain struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cache root override; defaults to `~/.idefetch/cache`.
    #[serde(default)]
    pub cache_dir: Option<String>,
    /// Product code assumed for bare build numbers.
    #[serde(default = "default_product_code")]
    pub default_product: String,
    #[serde(default)]
    pub repositories: Repositories,
    /// Release feed URLs queried by the release catalog, in order.
    #[serde(default = "default_release_feeds")]
    pub release_feeds: Vec<String>,
    /// Project-level Java toolchain, when the build declares one.
    #[serde(default)]
    pub toolchain: Option<ToolchainConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repositories {
    /// IntelliJ artifact repository root (release type is appended).
    #[serde(default = "default_intellij_repository")]
    pub intellij: String,
    /// Runtime archive repository.
    #[serde(default = "default_jbr_repository")]
    pub jbr: String,
    /// Shared dependencies repository.
    #[serde(default = "default_dependencies_repository")]
    pub dependencies: String,
    /// Plugin repositories, tried strictly in order.
    #[serde(default = "default_plugin_repositories")]
    pub plugins: Vec<PluginRepositoryConfig>,
}

/// One plugin repository entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRepositoryConfig {
    pub kind: PluginRepositoryKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginRepositoryKind {
    Marketplace,
    Custom,
    Maven,
}

/// Declared Java toolchain: accepted by the runtime fallback chain only when
/// the vendor matches the runtime vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    pub vendor: String,
    pub home: String,
}

fn default_product_code() -> String {
    defaults::DEFAULT_PRODUCT_CODE.to_string()
}

fn default_intellij_repository() -> String {
    locations::DEFAULT_INTELLIJ_REPOSITORY.to_string()
}

fn default_jbr_repository() -> String {
    locations::DEFAULT_JBR_REPOSITORY.to_string()
}

fn default_dependencies_repository() -> String {
    locations::INTELLIJ_DEPENDENCIES.to_string()
}

fn default_plugin_repositories() -> Vec<PluginRepositoryConfig> {
    vec![PluginRepositoryConfig {
        kind: PluginRepositoryKind::Marketplace,
        url: locations::MARKETPLACE_HOST.to_string(),
    }]
}

fn default_release_feeds() -> Vec<String> {
    vec![
        locations::IDEA_PRODUCTS_RELEASES_URL.to_string(),
        locations::ANDROID_STUDIO_PRODUCTS_RELEASES_URL.to_string(),
    ]
}

impl Default for Repositories {
    fn default() -> Self {
        Repositories {
            intellij: default_intellij_repository(),
            jbr: default_jbr_repository(),
            dependencies: default_dependencies_repository(),
            plugins: default_plugin_repositories(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_dir: None,
            default_product: default_product_code(),
            repositories: Repositories::default(),
            release_feeds: default_release_feeds(),
            toolchain: None,
        }
    }
}

impl Config {
    /// Loads the configuration file, falling back to defaults when absent.
    ///
    /// Lookup order: `IDEFETCH_CONFIG` environment variable, then
    /// `~/.idefetch/config.toml`.
    pub fn load() -> ResolverResult<Self> {
        let path = match env::var("IDEFETCH_CONFIG") {
            Ok(explicit) => PathBuf::from(explicit),
            Err(_) => match dirs::home_dir() {
                Some(home) => home.join(defaults::DEFAULT_CONFIG_DIR).join("config.toml"),
                None => return Ok(Config::default()),
            },
        };

        if !path.exists() {
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| {
            ResolverError::config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Effective cache root directory.
    pub fn cache_root(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return PathBuf::from(dir);
        }
        match dirs::home_dir() {
            Some(home) => home.join(defaults::DEFAULT_CACHE_DIR),
            None => PathBuf::from(defaults::DEFAULT_CACHE_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_repository() {
        let config = Config::default();
        assert!(config.repositories.intellij.contains("intellij-repository"));
        assert!(config.repositories.jbr.contains("intellij-jbr"));
        assert_eq!(config.repositories.plugins.len(), 1);
        assert_eq!(
            config.repositories.plugins[0].kind,
            PluginRepositoryKind::Marketplace
        );
        assert_eq!(config.release_feeds.len(), 2);
        assert_eq!(config.default_product, "IC");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            default_product = "IU"

            [[repositories.plugins]]
            kind = "custom"
            url = "https://plugins.example.com/updatePlugins.xml"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_product, "IU");
        assert_eq!(config.repositories.plugins.len(), 1);
        assert_eq!(config.repositories.plugins[0].kind, PluginRepositoryKind::Custom);
        assert!(config.repositories.intellij.contains("intellij-repository"));
    }
}
