//! Package extraction.
//!
//! A `.nupkg` is a zip archive. It is unpacked into a sibling temp directory
//! and renamed into place, so an interrupted extraction never leaves a
//! half-populated package directory behind.

use msdo_core::{Error, Result};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extract a package archive into `dest`.
///
/// `dest` must not exist yet. Returns the destination path.
///
/// # Errors
///
/// Returns a registry error for a corrupt archive and an I/O error if the
/// package cannot be written.
pub fn extract_package(data: &[u8], dest: &Path) -> Result<PathBuf> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| Error::registry(format!("Failed to open package archive: {e}")))?;

    let temp_dir = dest.with_file_name(format!(
        ".{}.tmp",
        dest.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("extract")
    ));

    // Clean up any previous failed extraction
    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).map_err(|e| Error::io(e, &temp_dir, "remove"))?;
    }
    std::fs::create_dir_all(&temp_dir).map_err(|e| Error::io(e, &temp_dir, "create"))?;

    let extract_result = extract_entries(&mut archive, &temp_dir);

    if let Err(e) = extract_result {
        let _ = std::fs::remove_dir_all(&temp_dir);
        return Err(e);
    }

    // Packages built on Windows carry no unix modes
    #[cfg(unix)]
    {
        let tool = temp_dir
            .join("tools")
            .join(msdo_core::environment::TOOL_NAME);
        if tool.is_file() {
            set_mode(&tool, 0o755)?;
        }
    }

    std::fs::rename(&temp_dir, dest).map_err(|e| Error::io(e, dest, "rename"))?;
    debug!(?dest, entries = archive.len(), "Extracted package");
    Ok(dest.to_path_buf())
}

fn extract_entries<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    temp_dir: &Path,
) -> Result<()> {
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::registry(format!("Failed to read package entry: {e}")))?;

        let Some(outpath) = file.enclosed_name().map(|p| temp_dir.join(p)) else {
            continue;
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| Error::io(e, &outpath, "create"))?;
            continue;
        }

        if let Some(p) = outpath.parent() {
            std::fs::create_dir_all(p).map_err(|e| Error::io(e, p, "create"))?;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| Error::registry(format!("Failed to read package entry: {e}")))?;
        std::fs::write(&outpath, &content).map_err(|e| Error::io(e, &outpath, "write"))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            set_mode(&outpath, mode)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .map_err(|e| Error::io(e, path, "stat"))?
        .permissions();
    perms.set_mode(mode);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(e, path, "chmod"))
}
