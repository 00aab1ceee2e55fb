use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ResolverError, ResolverResult};

/// Streams `url` into `dest`, writing through a `.downloading` temp file that
/// is renamed into place only after the body is fully received. An existing
/// `dest` short-circuits without touching the network. No retries: callers
/// fall back across candidate sources instead.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: impl Fn(u64, u64),
) -> ResolverResult<()> {
    if dest.exists() {
        debug!(dest = %dest.display(), "already downloaded");
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ResolverError::network(format!(
            "server returned {status} (URL: {url})"
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    let temp_path = dest.with_extension("downloading");
    let mut file = tokio::fs::File::create(&temp_path).await?;

    let written = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total_size);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<(), ResolverError>(())
    }
    .await;

    drop(file);
    if let Err(err) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err);
    }

    match tokio::fs::rename(&temp_path, dest).await {
        Ok(()) => Ok(()),
        // A concurrent process may have placed the file first; their copy is
        // as good as ours.
        Err(_) if dest.exists() => {
            let _ = tokio::fs::remove_file(&temp_path).await;
            Ok(())
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&temp_path).await;
            Err(err.into())
        }
    }
}

/// Fetches a small document (feed, metadata file) fully into memory.
pub async fn download_to_bytes(client: &Client, url: &str) -> ResolverResult<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ResolverError::network(format!(
            "server returned {status} (URL: {url})"
        )));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Stable hex digest of a URL, used to key per-repository cache directories.
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
