use std::path::{Path, PathBuf};

use crate::app::{AppError, AppResult};

/// Copies `file` (resolved absolute source path) to `destination_root`
/// joined with `relative_target` (the rendered path template), creating
/// parent directories as needed.
///
/// Copy-only, never move: the source tree is read-only input per spec.md's
/// scope (the run never mutates or deletes what it found). If the
/// destination path is already occupied, a numeric suffix is appended to
/// the stem until a free name is found, rather than overwriting.
pub fn place_file(source: &Path, destination_root: &Path, relative_target: &Path) -> AppResult<PathBuf> {
    let target = destination_root.join(relative_target);
    let target = first_free_path(&target);

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Transfer { src: source.to_path_buf(), dst: target.clone(), source: e })?;
    }

    std::fs::copy(source, &target)
        .map_err(|e| AppError::Transfer { src: source.to_path_buf(), dst: target.clone(), source: e })?;

    Ok(target)
}

fn first_free_path(candidate: &Path) -> PathBuf {
    if !candidate.exists() {
        return candidate.to_path_buf();
    }

    let stem = candidate.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let ext = candidate.extension().map(|e| e.to_string_lossy().to_string());
    let parent = candidate.parent().unwrap_or_else(|| Path::new(""));

    for suffix in 1u32.. {
        let name = match &ext {
            Some(ext) => format!("{stem}_{suffix}.{ext}"),
            None => format!("{stem}_{suffix}"),
        };
        let attempt = parent.join(name);
        if !attempt.exists() {
            return attempt;
        }
    }
    unreachable!("u32 suffix space exhausted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_file_under_a_fresh_relative_target() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let src_file = src_dir.path().join("photo.jpg");
        std::fs::write(&src_file, b"data").unwrap();

        let placed = place_file(&src_file, dst_dir.path(), Path::new("2023/07/photo/photo.jpg")).unwrap();
        assert!(placed.exists());
        assert_eq!(std::fs::read(&placed).unwrap(), b"data");
        assert!(src_file.exists(), "copy must not remove the source");
    }

    #[test]
    fn avoids_overwriting_an_existing_destination() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let src_file = src_dir.path().join("a.jpg");
        std::fs::write(&src_file, b"first").unwrap();
        std::fs::create_dir_all(dst_dir.path().join("out")).unwrap();
        std::fs::write(dst_dir.path().join("out/a.jpg"), b"existing").unwrap();

        let placed = place_file(&src_file, dst_dir.path(), Path::new("out/a.jpg")).unwrap();
        assert_eq!(placed, dst_dir.path().join("out/a_1.jpg"));
        assert_eq!(std::fs::read(dst_dir.path().join("out/a.jpg")).unwrap(), b"existing");
    }
}
