use std::ffi::OsString;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Enumerates files under `source`, skipping any whose extension (matched
/// case-insensitively) is in `exclude_extensions`. A simplified,
/// single-source specialization of the teacher's
/// `video_hash_filesystem_cache::file_projection::FileProjection`, which
/// supports multiple include/exclude roots for a feature set this spec
/// doesn't need.
pub fn gather_files(source: &Path, exclude_extensions: &[String]) -> Vec<PathBuf> {
    let excl: Vec<OsString> = exclude_extensions.iter().map(OsString::from).collect();

    WalkDir::new(source)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| !has_excluded_extension(path, &excl))
        .collect()
}

fn has_excluded_extension(path: &Path, excl: &[OsString]) -> bool {
    excl.iter().any(|ext| path.extension().unwrap_or_default().eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_matching_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("b.TXT"), b"x").unwrap();
        std::fs::write(dir.path().join("c.mov"), b"x").unwrap();

        let found = gather_files(dir.path(), &["txt".to_string()]);
        let names: Vec<_> =
            found.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();

        assert!(names.contains(&"a.jpg".to_string()));
        assert!(names.contains(&"c.mov".to_string()));
        assert!(!names.contains(&"b.TXT".to_string()));
    }

    #[test]
    fn descends_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("d.jpg"), b"x").unwrap();

        let found = gather_files(dir.path(), &[]);
        assert_eq!(found.len(), 1);
    }
}
