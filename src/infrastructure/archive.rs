use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{ResolverError, ResolverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    TarGz,
    Plain,
}

/// Extracts `archive` into `target_dir` exactly once.
///
/// A non-empty `target_dir` is returned as-is without inspecting its
/// content: the presence of the directory is the freshness signal. The
/// archive is unpacked into a temp directory next to the target and renamed
/// into place, so concurrent extractions of the same artifact converge on one
/// complete directory and a failed extraction leaves nothing behind.
pub fn extract(archive: &Path, target_dir: &Path) -> ResolverResult<PathBuf> {
    if dir_non_empty(target_dir) {
        debug!(target = %target_dir.display(), "already extracted");
        return Ok(target_dir.to_path_buf());
    }

    let parent = target_dir
        .parent()
        .ok_or_else(|| ResolverError::extraction(archive, "target directory has no parent"))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)
        .map_err(|e| ResolverError::extraction(archive, format!("cannot create staging dir: {e}")))?;

    match detect_format(archive)? {
        ArchiveFormat::Zip => extract_zip(archive, staging.path())?,
        ArchiveFormat::TarGz => extract_tar_gz(archive, staging.path())?,
        ArchiveFormat::Plain => {
            let file_name = archive
                .file_name()
                .ok_or_else(|| ResolverError::extraction(archive, "archive has no file name"))?;
            fs::copy(archive, staging.path().join(file_name))?;
        }
    }

    let staging_path = staging.into_path();
    match fs::rename(&staging_path, target_dir) {
        Ok(()) => {
            debug!(archive = %archive.display(), target = %target_dir.display(), "extracted");
            Ok(target_dir.to_path_buf())
        }
        // Lost the race against another extractor; its result is complete
        // because the rename is the last step on every path.
        Err(_) if dir_non_empty(target_dir) => {
            let _ = fs::remove_dir_all(&staging_path);
            Ok(target_dir.to_path_buf())
        }
        Err(err) => {
            let _ = fs::remove_dir_all(&staging_path);
            Err(ResolverError::extraction(
                archive,
                format!("cannot move staged output into place: {err}"),
            ))
        }
    }
}

fn dir_non_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Detects the archive format from the file extension, falling back to the
/// leading magic bytes for extension-less downloads.
fn detect_format(archive: &Path) -> ResolverResult<ArchiveFormat> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if name.ends_with(".zip") || name.ends_with(".jar") {
        return Ok(ArchiveFormat::Zip);
    }
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        return Ok(ArchiveFormat::TarGz);
    }

    let mut magic = [0u8; 4];
    let mut file = fs::File::open(archive)?;
    let read = file.read(&mut magic)?;
    if read >= 4 && magic == [b'P', b'K', 0x03, 0x04] {
        return Ok(ArchiveFormat::Zip);
    }
    if read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(ArchiveFormat::TarGz);
    }
    Ok(ArchiveFormat::Plain)
}

fn extract_zip(zip_path: &Path, dest_dir: &Path) -> ResolverResult<()> {
    let file = fs::File::open(zip_path)
        .map_err(|e| ResolverError::extraction(zip_path, format!("cannot open archive: {e}")))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ResolverError::extraction(zip_path, format!("cannot read zip: {e}")))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ResolverError::extraction(zip_path, format!("cannot read zip entry: {e}")))?;
        let outpath = dest_dir.join(entry.mangled_name());
        if entry.name().ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut outfile = fs::File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;
            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}

fn extract_tar_gz(tar_path: &Path, dest_dir: &Path) -> ResolverResult<()> {
    let tar_arg = tar_path
        .to_str()
        .ok_or_else(|| ResolverError::extraction(tar_path, "non-UTF-8 archive path"))?;
    let dest_arg = dest_dir
        .to_str()
        .ok_or_else(|| ResolverError::extraction(tar_path, "non-UTF-8 destination path"))?;
    let output = Command::new("tar")
        .args(["-xzf", tar_arg, "-C", dest_arg])
        .output()
        .map_err(|e| ResolverError::extraction(tar_path, format!("cannot run tar: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ResolverError::extraction(
            tar_path,
            format!("tar failed: {stderr}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_zip_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("plugin.zip");
        write_zip(&zip_path, &[("plugin/lib/a.txt", "alpha"), ("plugin/b.txt", "beta")]);

        let target = dir.path().join("extracted");
        let result = extract(&zip_path, &target).unwrap();
        assert_eq!(result, target);
        assert_eq!(fs::read_to_string(target.join("plugin/lib/a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(target.join("plugin/b.txt")).unwrap(), "beta");
    }

    #[test]
    fn second_extract_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("plugin.zip");
        write_zip(&zip_path, &[("a.txt", "alpha")]);

        let target = dir.path().join("extracted");
        extract(&zip_path, &target).unwrap();
        // Replace the archive with garbage; the cached directory must win.
        fs::write(&zip_path, b"not a zip").unwrap();
        let result = extract(&zip_path, &target).unwrap();
        assert_eq!(result, target);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "alpha");
    }

    #[test]
    fn corrupt_archive_leaves_no_partial_target() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.zip");
        fs::write(&bad, b"PK\x03\x04 truncated").unwrap();

        let target = dir.path().join("extracted");
        assert!(extract(&bad, &target).is_err());
        assert!(!target.exists());
        // No staging leftovers either.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".extract-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn bare_file_is_copied_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("notes.txt");
        fs::write(&plain, "plain payload").unwrap();

        let target = dir.path().join("extracted");
        extract(&plain, &target).unwrap();
        assert_eq!(fs::read_to_string(target.join("notes.txt")).unwrap(), "plain payload");
    }
}
