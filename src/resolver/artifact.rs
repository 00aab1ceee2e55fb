use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::download;

/// Identifies a downloadable unit independent of the repository serving it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinate {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactCoordinate {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            classifier: None,
            extension: extension.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// `name-version[-classifier].extension`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => {
                format!("{}-{}-{}.{}", self.name, self.version, classifier, self.extension)
            }
            None => format!("{}-{}.{}", self.name, self.version, self.extension),
        }
    }

    /// Repository-relative path in the Maven directory layout.
    pub fn maven_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.name,
            self.version,
            self.file_name()
        )
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, "@{}", self.extension)
    }
}

/// How a repository lays out artifact paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLayout {
    /// Standard `group/name/version/name-version.ext` tree.
    Maven,
    /// Ivy-style pattern with `[revision]`, `[artifact]` and `[ext]`
    /// placeholders, e.g. `[revision].tar.gz` for the runtime repository.
    Pattern(String),
}

/// One source to try for a coordinate. Candidates are tried strictly in list
/// order; the first success wins and partial results are never merged.
#[derive(Debug, Clone)]
pub struct RepositoryCandidate {
    pub name: String,
    pub url: String,
    pub layout: RepositoryLayout,
}

impl RepositoryCandidate {
    pub fn maven(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: trim_trailing_slash(url.into()),
            layout: RepositoryLayout::Maven,
        }
    }

    pub fn pattern(
        name: impl Into<String>,
        url: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: trim_trailing_slash(url.into()),
            layout: RepositoryLayout::Pattern(pattern.into()),
        }
    }

    /// Full download URL for `coordinate` in this repository.
    pub fn artifact_url(&self, coordinate: &ArtifactCoordinate) -> String {
        match &self.layout {
            RepositoryLayout::Maven => format!("{}/{}", self.url, coordinate.maven_path()),
            RepositoryLayout::Pattern(pattern) => {
                let relative = pattern
                    .replace("[revision]", &coordinate.version)
                    .replace("[artifact]", &coordinate.name)
                    .replace("[ext]", &coordinate.extension);
                format!("{}/{}", self.url, relative)
            }
        }
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// Downloads artifacts by trying an ordered list of repositories, caching the
/// result under a coordinate-keyed path.
pub struct MirroredDownloader {
    client: Client,
    cache_root: PathBuf,
}

impl MirroredDownloader {
    pub fn new(client: Client, cache_root: PathBuf) -> Self {
        Self { client, cache_root }
    }

    /// Local cache location for `coordinate`; stable across runs.
    pub fn cached_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.cache_root
            .join("artifacts")
            .join(&coordinate.group)
            .join(&coordinate.name)
            .join(&coordinate.version)
            .join(coordinate.file_name())
    }

    /// Resolves `coordinate` against `repositories` in order. Any failure on
    /// one candidate (network error, 404, malformed response) is logged and
    /// the next candidate is tried; the same repository is never retried.
    /// Exhausting the list is a terminal error naming every attempted source.
    pub async fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RepositoryCandidate],
        progress: impl Fn(u64, u64),
    ) -> ResolverResult<PathBuf> {
        let target = self.cached_path(coordinate);
        if target.exists() {
            debug!(artifact = %coordinate, path = %target.display(), "artifact already cached");
            return Ok(target);
        }

        let mut attempted = Vec::new();
        for repository in repositories {
            let url = repository.artifact_url(coordinate);
            debug!(artifact = %coordinate, repository = %repository.name, url = %url, "trying repository");
            match download::download_to_file(&self.client, &url, &target, &progress).await {
                Ok(()) => {
                    debug!(artifact = %coordinate, repository = %repository.name, "resolved");
                    return Ok(target);
                }
                Err(err) => {
                    warn!(
                        artifact = %coordinate,
                        repository = %repository.name,
                        %err,
                        "repository failed, trying next"
                    );
                    attempted.push(url);
                }
            }
        }

        Err(ResolverError::not_found(coordinate.to_string(), attempted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;

    #[test]
    fn coordinate_file_name_and_maven_path() {
        let coordinate =
            ArtifactCoordinate::new("com.jetbrains.intellij.java", "java-compiler-ant-tasks", "213.1234", "jar");
        assert_eq!(coordinate.file_name(), "java-compiler-ant-tasks-213.1234.jar");
        assert_eq!(
            coordinate.maven_path(),
            "com/jetbrains/intellij/java/java-compiler-ant-tasks/213.1234/java-compiler-ant-tasks-213.1234.jar"
        );

        let classified = ArtifactCoordinate::new("g", "n", "1.0", "zip").with_classifier("sources");
        assert_eq!(classified.file_name(), "n-1.0-sources.zip");
    }

    #[test]
    fn pattern_layout_substitutes_revision() {
        let repo = RepositoryCandidate::pattern("jbr", "https://example.com/jbr/", "[revision].tar.gz");
        let coordinate = ArtifactCoordinate::new("com.jetbrains", "jbre", "jbr_jcef-17-linux-x64-b469.1", "tar.gz");
        assert_eq!(
            repo.artifact_url(&coordinate),
            "https://example.com/jbr/jbr_jcef-17-linux-x64-b469.1.tar.gz"
        );
    }

    /// Serves a single canned HTTP response, then exits.
    fn one_shot_server(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(body);
            }
        });
        format!("http://{addr}")
    }

    fn dead_endpoint() -> String {
        // Bind then immediately drop to get a port that refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn falls_back_to_next_repository_on_failure() {
        let cache = tempfile::tempdir().unwrap();
        let downloader = MirroredDownloader::new(Client::new(), cache.path().to_path_buf());
        let coordinate = ArtifactCoordinate::new("g", "artifact", "1.0", "jar");

        let repositories = vec![
            RepositoryCandidate::maven("dead", dead_endpoint()),
            RepositoryCandidate::maven("live", one_shot_server(b"payload")),
        ];

        let path = downloader
            .resolve(&coordinate, &repositories, |_, _| {})
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn exhausting_all_repositories_names_each_source() {
        let cache = tempfile::tempdir().unwrap();
        let downloader = MirroredDownloader::new(Client::new(), cache.path().to_path_buf());
        let coordinate = ArtifactCoordinate::new("g", "artifact", "1.0", "jar");

        let first = dead_endpoint();
        let second = dead_endpoint();
        let repositories = vec![
            RepositoryCandidate::maven("one", first.clone()),
            RepositoryCandidate::maven("two", second.clone()),
        ];

        let err = downloader
            .resolve(&coordinate, &repositories, |_, _| {})
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains(&first));
        assert!(message.contains(&second));
    }

    #[tokio::test]
    async fn cached_artifact_short_circuits_repositories() {
        let cache = tempfile::tempdir().unwrap();
        let downloader = MirroredDownloader::new(Client::new(), cache.path().to_path_buf());
        let coordinate = ArtifactCoordinate::new("g", "artifact", "1.0", "jar");

        let target = downloader.cached_path(&coordinate);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"cached").unwrap();

        // Only dead candidates: resolution must still succeed from cache.
        let repositories = vec![RepositoryCandidate::maven("dead", dead_endpoint())];
        let path = downloader
            .resolve(&coordinate, &repositories, |_, _| {})
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }
}
