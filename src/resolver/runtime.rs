use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::constants::{artifacts, defaults};
use crate::error::ResolverResult;
use crate::infrastructure::config::ToolchainConfig;
use crate::infrastructure::{archive, Config, Platform};
use crate::resolver::artifact::{ArtifactCoordinate, MirroredDownloader, RepositoryCandidate};
use crate::resolver::ide;
use crate::version::BuildNumber;

/// Canonical runtime artifact name plus the repository serving it.
///
/// The name format is a key contract with the download mirror and is
/// reproduced exactly, including the legacy `jbrex` scheme used for Java 8
/// builds below 1483.24.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JbrArtifact {
    pub name: String,
    pub repository_url: String,
}

impl JbrArtifact {
    pub fn from_version(
        version: &str,
        variant: Option<&str>,
        arch: Option<&str>,
        platform: &Platform,
        repository_url: &str,
    ) -> Self {
        // Java 8 update versions were published as `u202b1483.37`.
        let version = if version.starts_with('u') {
            format!("8{version}")
        } else {
            version.to_string()
        };

        let mut prefix = jbr_prefix(&version, variant);
        let after_dash = version.rfind('-').map(|i| i + 1).unwrap_or(0);
        let (major, build_str) = match version.rfind('b') {
            Some(b) if b >= after_dash => (&version[after_dash..b], &version[b + 1..]),
            _ => (&version[after_dash..], ""),
        };
        let build = lenient_version(build_str);
        let is_java8 = major.starts_with('8');
        let is_java17 = major.starts_with("17");

        let old_format =
            prefix == "jbrex" || (is_java8 && build < BuildNumber::from_components(vec![1483, 24]));
        if old_format {
            return Self {
                name: format!(
                    "jbrex{major}b{build_str}_{}_{}",
                    platform.jbr_platform(),
                    platform.jbr_arch(false)
                ),
                repository_url: repository_url.to_string(),
            };
        }

        let arch = arch
            .map(str::to_string)
            .unwrap_or_else(|| platform.jbr_arch(is_java8));
        if prefix.is_empty() {
            prefix = if is_java17 {
                "jbr_jcef-"
            } else if is_java8 {
                "jbrx-"
            } else if platform.is_macos() && arch == "aarch64" {
                "jbr_jcef-"
            } else if build < BuildNumber::from_components(vec![1319, 6]) {
                "jbr-"
            } else {
                "jbr_jcef-"
            }
            .to_string();
        }

        Self {
            name: format!(
                "{prefix}{major}-{}-{arch}-b{build_str}",
                platform.jbr_platform()
            ),
            repository_url: repository_url.to_string(),
        }
    }
}

/// Artifact name prefix: explicit variant first, then a prefix embedded in
/// the version string itself, else empty (inferred later).
fn jbr_prefix(version: &str, variant: Option<&str>) -> String {
    if let Some(variant) = variant.filter(|v| !v.is_empty()) {
        return if variant == "sdk" {
            "jbrsdk-".to_string()
        } else {
            format!("jbr_{variant}-")
        };
    }
    for known in [
        "jbrsdk-", "jbr_jcef-", "jbr_dcevm-", "jbr_fd-", "jbr_nomod-", "jbr-", "jbrx-",
    ] {
        if version.starts_with(known) {
            return known.to_string();
        }
    }
    if version.starts_with("jbrex8") {
        return "jbrex".to_string();
    }
    String::new()
}

/// Parses the leading dotted-numeric prefix of a version fragment, defaulting
/// to `0`; runtime build fragments are not always full build numbers.
fn lenient_version(fragment: &str) -> BuildNumber {
    let components: Vec<u32> = fragment
        .split('.')
        .map_while(|part| part.parse::<u32>().ok())
        .collect();
    BuildNumber::from_components(components)
}

/// Inputs to a runtime resolution request.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Explicit runtime installation directory; wins over everything else.
    pub runtime_dir: Option<PathBuf>,
    /// Named runtime version, e.g. `17.0.2b469.1`.
    pub version: Option<String>,
    /// Runtime variant: `sdk`, `jcef`, `fd`, `dcevm`, `nomod`.
    pub variant: Option<String>,
    /// Architecture override for the artifact name.
    pub arch: Option<String>,
    /// IDE installation to take a bundled or declared runtime from.
    pub ide_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    ExplicitDir,
    NamedVersion,
    Toolchain,
    IdeBundled,
    IdeDeclared,
    CurrentJvm,
}

/// Ordered fallback chain; the first candidate that exists and passes the
/// caller's validation wins.
const CHAIN: [Strategy; 6] = [
    Strategy::ExplicitDir,
    Strategy::NamedVersion,
    Strategy::Toolchain,
    Strategy::IdeBundled,
    Strategy::IdeDeclared,
    Strategy::CurrentJvm,
];

/// Resolves a usable Java runtime via the ordered strategy chain.
///
/// Every strategy swallows its own failures: a miss is logged at debug level
/// and the next strategy runs. Only exhausting the whole chain yields `None`;
/// deciding whether that is fatal is the caller's business.
pub struct RuntimeResolver<'a> {
    downloader: &'a MirroredDownloader,
    platform: Platform,
    jbr_repository: String,
    toolchain: Option<ToolchainConfig>,
    cache_root: PathBuf,
}

impl<'a> RuntimeResolver<'a> {
    pub fn new(downloader: &'a MirroredDownloader, platform: Platform, config: &Config) -> Self {
        Self {
            downloader,
            platform,
            jbr_repository: config.repositories.jbr.clone(),
            toolchain: config.toolchain.clone(),
            cache_root: config.cache_root(),
        }
    }

    /// Resolves the java executable, or `None` when no strategy applies.
    pub async fn resolve_runtime(
        &self,
        options: &RuntimeOptions,
        validate: impl Fn(&Path) -> bool,
    ) -> Option<PathBuf> {
        self.resolve(options, true, validate).await
    }

    /// Resolves the runtime home directory instead of the executable.
    pub async fn resolve_runtime_dir(
        &self,
        options: &RuntimeOptions,
        validate: impl Fn(&Path) -> bool,
    ) -> Option<PathBuf> {
        self.resolve(options, false, validate).await
    }

    async fn resolve(
        &self,
        options: &RuntimeOptions,
        resolve_executable: bool,
        validate: impl Fn(&Path) -> bool,
    ) -> Option<PathBuf> {
        debug!(?options, "resolving runtime");
        for strategy in CHAIN {
            let candidate = match strategy {
                Strategy::ExplicitDir => self.from_explicit_dir(options, resolve_executable),
                Strategy::NamedVersion => {
                    match &options.version {
                        Some(version) => {
                            self.from_named_version(version, options, resolve_executable).await
                        }
                        None => None,
                    }
                }
                Strategy::Toolchain => self.from_toolchain(resolve_executable),
                Strategy::IdeBundled => self.from_ide_bundled(options, resolve_executable),
                Strategy::IdeDeclared => self.from_ide_declared(options, resolve_executable).await,
                Strategy::CurrentJvm => self.from_current_jvm(resolve_executable),
            };
            match candidate {
                Some(path) if validate(&path) => {
                    info!(?strategy, path = %path.display(), "resolved runtime");
                    return Some(path);
                }
                Some(path) => {
                    debug!(?strategy, path = %path.display(), "candidate rejected by validation");
                }
                None => debug!(?strategy, "no runtime from this strategy"),
            }
        }
        None
    }

    fn from_explicit_dir(
        &self,
        options: &RuntimeOptions,
        resolve_executable: bool,
    ) -> Option<PathBuf> {
        let dir = options.runtime_dir.as_ref()?;
        let root = self.jbr_root(dir);
        let executable = root.join("bin").join(self.platform.java_executable_name());
        if !executable.exists() {
            debug!(dir = %dir.display(), "no java executable under explicit runtime dir");
            return None;
        }
        Some(if resolve_executable { executable } else { root })
    }

    async fn from_named_version(
        &self,
        version: &str,
        options: &RuntimeOptions,
        resolve_executable: bool,
    ) -> Option<PathBuf> {
        match self
            .fetch_named(version, options.variant.as_deref(), options.arch.as_deref())
            .await
        {
            Ok(home) => {
                let executable = self.find_java_executable(&home)?;
                Some(if resolve_executable {
                    executable
                } else {
                    self.jbr_root(&home)
                })
            }
            Err(err) => {
                debug!(version, %err, "cannot resolve named runtime");
                None
            }
        }
    }

    /// Downloads and extracts the named runtime, returning its home directory.
    async fn fetch_named(
        &self,
        version: &str,
        variant: Option<&str>,
        arch: Option<&str>,
    ) -> ResolverResult<PathBuf> {
        let artifact =
            JbrArtifact::from_version(version, variant, arch, &self.platform, &self.jbr_repository);
        let coordinate = ArtifactCoordinate::new(
            artifacts::JBR_GROUP,
            artifacts::JBR_NAME,
            artifact.name.clone(),
            "tar.gz",
        );
        let repositories = vec![RepositoryCandidate::pattern(
            "jbr",
            artifact.repository_url.clone(),
            "[revision].tar.gz",
        )];
        let archive_path = self
            .downloader
            .resolve(&coordinate, &repositories, |_, _| {})
            .await?;
        let target = self.cache_root.join("jbr").join(&artifact.name).join("extracted");
        archive::extract(&archive_path, &target)
    }

    fn from_toolchain(&self, resolve_executable: bool) -> Option<PathBuf> {
        let toolchain = self.toolchain.as_ref()?;
        if !toolchain
            .vendor
            .eq_ignore_ascii_case(defaults::RUNTIME_TOOLCHAIN_VENDOR)
        {
            debug!(vendor = %toolchain.vendor, "toolchain vendor not accepted for runtime");
            return None;
        }
        let root = self.jbr_root(Path::new(&toolchain.home));
        let executable = root.join("bin").join(self.platform.java_executable_name());
        if !executable.exists() {
            return None;
        }
        Some(if resolve_executable { executable } else { root })
    }

    fn from_ide_bundled(
        &self,
        options: &RuntimeOptions,
        resolve_executable: bool,
    ) -> Option<PathBuf> {
        let ide_dir = options.ide_dir.as_ref()?;
        let root = self.jbr_root(ide_dir);
        let executable = root.join("bin").join(self.platform.java_executable_name());
        if !executable.exists() {
            return None;
        }
        Some(if resolve_executable { executable } else { root })
    }

    async fn from_ide_declared(
        &self,
        options: &RuntimeOptions,
        resolve_executable: bool,
    ) -> Option<PathBuf> {
        let ide_dir = options.ide_dir.as_ref()?;
        let version = ide::declared_runtime_build(ide_dir)?;
        debug!(ide = %ide_dir.display(), version = %version, "IDE declares a runtime build");
        self.from_named_version(&version, options, resolve_executable).await
    }

    fn from_current_jvm(&self, resolve_executable: bool) -> Option<PathBuf> {
        if let Ok(home) = env::var("JAVA_HOME") {
            let home = PathBuf::from(home);
            let executable = home.join("bin").join(self.platform.java_executable_name());
            if executable.exists() {
                return Some(if resolve_executable { executable } else { home });
            }
        }
        let executable = which::which(self.platform.java_executable_name()).ok()?;
        if resolve_executable {
            Some(executable)
        } else {
            // <home>/bin/java
            executable.parent()?.parent().map(Path::to_path_buf)
        }
    }

    /// Locates the actual runtime root inside `java_home`: a `jbr*`-prefixed
    /// child when present, with the macOS bundle layout (`Contents/Home`)
    /// applied on top.
    fn jbr_root(&self, java_home: &Path) -> PathBuf {
        let jbr_child = fs::read_dir(java_home)
            .ok()
            .and_then(|entries| {
                entries
                    .filter_map(Result::ok)
                    .find(|entry| {
                        entry.path().is_dir()
                            && entry.file_name().to_string_lossy().starts_with("jbr")
                    })
                    .map(|entry| entry.path())
            });
        if self.platform.is_macos() {
            if java_home.ends_with("Contents/Home") {
                java_home.to_path_buf()
            } else if let Some(jbr) = jbr_child {
                jbr.join("Contents/Home")
            } else {
                java_home.join("jdk/Contents/Home")
            }
        } else {
            jbr_child.unwrap_or_else(|| java_home.to_path_buf())
        }
    }

    /// Executable inside a runtime home, preferring a `jre` subdirectory.
    fn find_java_executable(&self, java_home: &Path) -> Option<PathBuf> {
        let root = self.jbr_root(java_home);
        let jre = root.join("jre");
        let base = if jre.exists() { jre } else { root };
        let executable = base.join("bin").join(self.platform.java_executable_name());
        if executable.exists() {
            Some(executable)
        } else {
            debug!(home = %java_home.display(), "cannot find java executable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn linux_x64() -> Platform {
        Platform {
            os: "linux".to_string(),
            arch: "x64".to_string(),
        }
    }

    fn macos_arm() -> Platform {
        Platform {
            os: "macos".to_string(),
            arch: "aarch64".to_string(),
        }
    }

    const REPO: &str = "https://cache-redirector.jetbrains.com/intellij-jbr";

    fn name(version: &str, variant: Option<&str>, arch: Option<&str>, platform: &Platform) -> String {
        JbrArtifact::from_version(version, variant, arch, platform, REPO).name
    }

    #[test]
    fn java_17_infers_jcef_prefix() {
        assert_eq!(
            name("17.0.2b469.1", None, None, &linux_x64()),
            "jbr_jcef-17.0.2-linux-x64-b469.1"
        );
    }

    #[test]
    fn explicit_variant_overrides_inference() {
        assert_eq!(
            name("17.0.2b469.1", Some("sdk"), None, &linux_x64()),
            "jbrsdk-17.0.2-linux-x64-b469.1"
        );
        assert_eq!(
            name("11.0.13b1751.25", Some("fd"), None, &linux_x64()),
            "jbr_fd-11.0.13-linux-x64-b1751.25"
        );
    }

    #[test]
    fn prefix_embedded_in_version_is_kept() {
        assert_eq!(
            name("jbrsdk-17.0.2b469.1", None, None, &linux_x64()),
            "jbrsdk-17.0.2-linux-x64-b469.1"
        );
    }

    #[test]
    fn old_builds_use_the_legacy_scheme() {
        // Java 8 below build 1483.24 keeps the historical underscore format.
        assert_eq!(
            name("8u112b752.4", None, None, &linux_x64()),
            "jbrex8u112b752.4_linux_x86"
        );
        // The u-prefix shorthand resolves to the same artifact.
        assert_eq!(
            name("u112b752.4", None, None, &linux_x64()),
            "jbrex8u112b752.4_linux_x86"
        );
    }

    #[test]
    fn modern_java_8_uses_jbrx() {
        assert_eq!(
            name("8u202b1483.37", None, None, &linux_x64()),
            "jbrx-8u202-linux-x64-b1483.37"
        );
    }

    #[test]
    fn low_build_numbers_get_plain_jbr_prefix() {
        assert_eq!(
            name("11_0_2b159", None, None, &linux_x64()),
            "jbr-11_0_2-linux-x64-b159"
        );
    }

    #[test]
    fn apple_silicon_infers_jcef() {
        assert_eq!(
            name("11.0.13b1751.25", None, None, &macos_arm()),
            "jbr_jcef-11.0.13-osx-aarch64-b1751.25"
        );
    }

    #[test]
    fn arch_override_is_respected() {
        assert_eq!(
            name("17.0.2b469.1", None, Some("aarch64"), &linux_x64()),
            "jbr_jcef-17.0.2-linux-aarch64-b469.1"
        );
    }

    fn touch_executable(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"#!/bin/sh\n").unwrap();
    }

    fn test_resolver<'a>(downloader: &'a MirroredDownloader) -> RuntimeResolver<'a> {
        let mut config = Config::default();
        config.cache_dir = Some(std::env::temp_dir().display().to_string());
        RuntimeResolver::new(downloader, linux_x64(), &config)
    }

    #[tokio::test]
    async fn bundled_runtime_is_used_when_only_ide_dir_is_given() {
        let downloader = MirroredDownloader::new(Client::new(), std::env::temp_dir());
        let resolver = test_resolver(&downloader);

        let ide = tempfile::tempdir().unwrap();
        let bundled = ide.path().join("jbr").join("bin").join("java");
        touch_executable(&bundled);

        let options = RuntimeOptions {
            ide_dir: Some(ide.path().to_path_buf()),
            ..Default::default()
        };
        let resolved = resolver.resolve_runtime(&options, |_| true).await.unwrap();
        assert_eq!(resolved, bundled);
    }

    #[tokio::test]
    async fn explicit_override_wins_over_bundled_runtime() {
        let downloader = MirroredDownloader::new(Client::new(), std::env::temp_dir());
        let resolver = test_resolver(&downloader);

        let ide = tempfile::tempdir().unwrap();
        touch_executable(&ide.path().join("jbr").join("bin").join("java"));
        let override_dir = tempfile::tempdir().unwrap();
        let override_java = override_dir.path().join("bin").join("java");
        touch_executable(&override_java);

        let options = RuntimeOptions {
            runtime_dir: Some(override_dir.path().to_path_buf()),
            ide_dir: Some(ide.path().to_path_buf()),
            ..Default::default()
        };
        let resolved = resolver.resolve_runtime(&options, |_| true).await.unwrap();
        assert_eq!(resolved, override_java);
    }

    #[tokio::test]
    async fn rejecting_validation_exhausts_the_chain() {
        let downloader = MirroredDownloader::new(Client::new(), std::env::temp_dir());
        let resolver = test_resolver(&downloader);

        let ide = tempfile::tempdir().unwrap();
        touch_executable(&ide.path().join("jbr").join("bin").join("java"));

        let options = RuntimeOptions {
            ide_dir: Some(ide.path().to_path_buf()),
            ..Default::default()
        };
        assert!(resolver.resolve_runtime(&options, |_| false).await.is_none());
    }

    #[tokio::test]
    async fn runtime_dir_resolution_returns_the_root() {
        let downloader = MirroredDownloader::new(Client::new(), std::env::temp_dir());
        let resolver = test_resolver(&downloader);

        let ide = tempfile::tempdir().unwrap();
        touch_executable(&ide.path().join("jbr").join("bin").join("java"));

        let options = RuntimeOptions {
            ide_dir: Some(ide.path().to_path_buf()),
            ..Default::default()
        };
        let resolved = resolver.resolve_runtime_dir(&options, |_| true).await.unwrap();
        assert_eq!(resolved, ide.path().join("jbr"));
    }

    #[test]
    fn jre_subdirectory_is_preferred() {
        let downloader = MirroredDownloader::new(Client::new(), std::env::temp_dir());
        let resolver = test_resolver(&downloader);

        let home = tempfile::tempdir().unwrap();
        touch_executable(&home.path().join("bin").join("java"));
        let jre_java = home.path().join("jre").join("bin").join("java");
        touch_executable(&jre_java);

        assert_eq!(resolver.find_java_executable(home.path()).unwrap(), jre_java);
    }
}
