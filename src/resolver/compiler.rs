use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::core::constants::{artifacts, locations, suffixes};
use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::Config;
use crate::resolver::artifact::{ArtifactCoordinate, MirroredDownloader, RepositoryCandidate};
use crate::resolver::maven;
use crate::version::BuildNumber;

/// First build that published the compiler artifact to Maven (2018.3).
const MINIMAL_SUPPORTED_BUILD: &str = "183.3795.13";

/// Dynamic version asking for whatever was published last.
const VERSION_LATEST_EAP: &str = "LATEST-EAP-SNAPSHOT";

/// Repository subdirectory serving a given version, by its suffix.
pub fn release_type(version: &str) -> &'static str {
    if version.ends_with(suffixes::RELEASE_SUFFIX_EAP)
        || version.ends_with(suffixes::RELEASE_SUFFIX_EAP_CANDIDATE)
        || version.ends_with(suffixes::RELEASE_SUFFIX_CUSTOM_SNAPSHOT)
    {
        "snapshots"
    } else if version.ends_with(suffixes::RELEASE_SUFFIX_SNAPSHOT) {
        "nightly"
    } else {
        "releases"
    }
}

/// Compiler version matching an IDE build.
///
/// Components past the third are stripped before the lookup: some products
/// append extra build metadata that does not exist as a published compiler
/// version. EAP products get the EAP snapshot suffix.
pub fn compiler_version_for(build: &BuildNumber, version_suffix: Option<&str>) -> String {
    let base = build.strip_excess_components().as_string_without_product_code();
    match version_suffix {
        Some("EAP") => format!("{base}{}", suffixes::RELEASE_SUFFIX_EAP),
        _ => base,
    }
}

/// Numeric part of a compiler version, without any snapshot suffix.
fn base_build(version: &str) -> ResolverResult<BuildNumber> {
    let base = version.split('-').next().unwrap_or(version);
    BuildNumber::parse(base)
}

/// Resolves the ahead-of-time Java compiler companion artifact.
///
/// This artifact has historically been fragile: not every EAP build publishes
/// a matching snapshot, so resolution walks three tiers: the exact version,
/// the version with the EAP suffix stripped, and finally the greatest
/// published version at or below the requested one.
pub struct CompilerResolver<'a> {
    downloader: &'a MirroredDownloader,
    client: &'a Client,
    intellij_repository: String,
    dependencies_repository: String,
}

impl<'a> CompilerResolver<'a> {
    pub fn new(downloader: &'a MirroredDownloader, client: &'a Client, config: &Config) -> Self {
        Self {
            downloader,
            client,
            intellij_repository: config.repositories.intellij.clone(),
            dependencies_repository: config.repositories.dependencies.clone(),
        }
    }

    pub async fn resolve(
        &self,
        compiler_version: &str,
        progress: impl Fn(u64, u64),
    ) -> ResolverResult<PathBuf> {
        let requested = if compiler_version == VERSION_LATEST_EAP {
            let metadata = maven::fetch_metadata(
                self.client,
                locations::JAVA_COMPILER_ANT_TASKS_MAVEN_METADATA,
            )
            .await?;
            metadata
                .latest_version()
                .map(str::to_string)
                .ok_or_else(|| {
                    ResolverError::not_found(
                        "latest java-compiler-ant-tasks version",
                        vec![locations::JAVA_COMPILER_ANT_TASKS_MAVEN_METADATA.to_string()],
                    )
                })?
        } else {
            compiler_version.to_string()
        };

        let build = base_build(&requested)?;
        let minimum = BuildNumber::parse(MINIMAL_SUPPORTED_BUILD)?;
        if build < minimum {
            return Err(ResolverError::IncompatibleVersion {
                subject: artifacts::JAVA_COMPILER_NAME.to_string(),
                required: format!("{MINIMAL_SUPPORTED_BUILD} (2018.3) or newer"),
                actual: requested,
            });
        }

        let mut attempted = Vec::new();
        for candidate in candidate_versions(&requested) {
            match self.download(&candidate, &progress).await {
                Ok(path) => {
                    if candidate != requested {
                        warn!(requested = %requested, resolved = %candidate, "resolved fallback compiler version");
                    }
                    return Ok(path);
                }
                Err(err) => {
                    warn!(version = %candidate, %err, "cannot resolve compiler version");
                    attempted.push(candidate);
                }
            }
        }

        // Last tier: ask the version index for the closest lower version.
        match self.closest_published(&build).await {
            Ok(Some(closest)) => match self.download(&closest, &progress).await {
                Ok(path) => {
                    warn!(requested = %requested, resolved = %closest, "resolved closest lower compiler version");
                    return Ok(path);
                }
                Err(err) => {
                    warn!(version = %closest, %err, "cannot resolve compiler version");
                    attempted.push(closest);
                }
            },
            Ok(None) => warn!(requested = %requested, "no published compiler version at or below the requested one"),
            Err(err) => warn!(%err, "cannot resolve compiler version index"),
        }

        Err(ResolverError::not_found(
            format!("{}:{}", artifacts::JAVA_COMPILER_GROUP, artifacts::JAVA_COMPILER_NAME),
            attempted,
        ))
    }

    async fn download(
        &self,
        version: &str,
        progress: impl Fn(u64, u64),
    ) -> ResolverResult<PathBuf> {
        let coordinate = ArtifactCoordinate::new(
            artifacts::JAVA_COMPILER_GROUP,
            artifacts::JAVA_COMPILER_NAME,
            version,
            "jar",
        );
        let repositories = self.repositories_for(version);
        debug!(version, "downloading compiler artifact");
        self.downloader.resolve(&coordinate, &repositories, progress).await
    }

    async fn closest_published(&self, build: &BuildNumber) -> ResolverResult<Option<String>> {
        let metadata = maven::fetch_metadata(
            self.client,
            locations::JAVA_COMPILER_ANT_TASKS_MAVEN_METADATA,
        )
        .await?;
        Ok(metadata.closest_below(build))
    }

    fn repositories_for(&self, version: &str) -> Vec<RepositoryCandidate> {
        vec![
            RepositoryCandidate::maven(
                format!("intellij-{}", release_type(version)),
                format!("{}/{}", self.intellij_repository, release_type(version)),
            ),
            RepositoryCandidate::maven(
                "intellij-releases",
                format!("{}/releases", self.intellij_repository),
            ),
            RepositoryCandidate::maven("intellij-dependencies", self.dependencies_repository.clone()),
        ]
    }
}

/// Versions to attempt before consulting the index: the exact version, then
/// the EAP suffix stripped when present, since not every EAP build has a
/// matching snapshot published.
fn candidate_versions(version: &str) -> Vec<String> {
    let mut candidates = vec![version.to_string()];
    if version.ends_with(suffixes::RELEASE_SUFFIX_EAP) {
        candidates.push(version.replace(suffixes::RELEASE_SUFFIX_EAP, ""));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_type_by_suffix() {
        assert_eq!(release_type("213.1234-EAP-SNAPSHOT"), "snapshots");
        assert_eq!(release_type("213.1234-EAP-CANDIDATE-SNAPSHOT"), "snapshots");
        assert_eq!(release_type("213.1234-CUSTOM-SNAPSHOT"), "snapshots");
        assert_eq!(release_type("213.1234-SNAPSHOT"), "nightly");
        assert_eq!(release_type("213.1234.56"), "releases");
    }

    #[test]
    fn compiler_version_strips_excess_components() {
        let build = BuildNumber::parse("AI-203.7717.56.2031.7935034").unwrap();
        assert_eq!(compiler_version_for(&build, None), "203.7717.56");
        assert_eq!(
            compiler_version_for(&build, Some("EAP")),
            "203.7717.56-EAP-SNAPSHOT"
        );
    }

    #[test]
    fn eap_version_gets_a_stripped_fallback() {
        assert_eq!(
            candidate_versions("213.1234-EAP-SNAPSHOT"),
            vec!["213.1234-EAP-SNAPSHOT".to_string(), "213.1234".to_string()]
        );
        assert_eq!(candidate_versions("213.1234.56"), vec!["213.1234.56".to_string()]);
    }

    #[test]
    fn base_build_ignores_snapshot_suffix() {
        let build = base_build("213.1234-EAP-SNAPSHOT").unwrap();
        assert_eq!(build.components(), &[213, 1234]);
    }

    #[tokio::test]
    async fn versions_below_the_minimum_are_rejected() {
        let downloader = MirroredDownloader::new(Client::new(), std::env::temp_dir());
        let client = Client::new();
        let config = Config::default();
        let resolver = CompilerResolver::new(&downloader, &client, &config);
        let err = resolver.resolve("173.4548.28", |_, _| {}).await.unwrap_err();
        assert!(matches!(err, ResolverError::IncompatibleVersion { .. }));
    }
}
