//! Deterministic directory walking and metadata-preserving copies.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["__pycache__", ".git"];

/// Entries of `dir`, sorted by file name.
pub(crate) fn sorted_entries(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Every regular file under `dir` (recursively) accepted by `keep`, in
/// sorted depth-first order.
pub(crate) fn collect_files(dir: &Path, keep: &dyn Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    collect_into(dir, keep, SKIPPED_DIRS, &mut out)?;
    Ok(out)
}

/// Every file under `dir`, including cache directories. This is exactly the
/// set [`copy_tree`] copies and a module replace removes.
pub(crate) fn collect_all(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    collect_into(dir, &|_| true, &[], &mut out)?;
    Ok(out)
}

fn collect_into(
    dir: &Path,
    keep: &dyn Fn(&Path) -> bool,
    skipped: &[&str],
    out: &mut Vec<PathBuf>,
) -> io::Result<()> {
    for entry in sorted_entries(dir)? {
        let path = entry.path();
        // Follows symlinks, like copy_tree.
        if path.is_dir() {
            let name = entry.file_name();
            if skipped.iter().any(|s| name == *s) {
                continue;
            }
            collect_into(&path, keep, skipped, out)?;
        } else if keep(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Write `bytes` to `dest` via a sibling `.agentsync.tmp` file and rename,
/// carrying over the permissions and timestamps of `source`.
pub(crate) fn write_preserving(source: &Path, bytes: &[u8], dest: &Path) -> io::Result<()> {
    let meta = fs::metadata(source)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = PathBuf::from(format!("{}.agentsync.tmp", dest.display()));
    let staged = fs::write(&tmp, bytes)
        .and_then(|_| fs::set_permissions(&tmp, meta.permissions()))
        .and_then(|_| {
            filetime::set_file_times(
                &tmp,
                FileTime::from_last_access_time(&meta),
                FileTime::from_last_modification_time(&meta),
            )
        })
        .and_then(|_| fs::rename(&tmp, dest));

    if let Err(e) = staged {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Copy the tree at `src` to `dest` (which must not exist), preserving file
/// metadata. Returns the number of files copied.
pub(crate) fn copy_tree(src: &Path, dest: &Path) -> io::Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;
    for entry in sorted_entries(src)? {
        let from = entry.path();
        let to = dest.join(entry.file_name());
        // A symlinked directory is copied as a directory.
        if from.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            let bytes = fs::read(&from)?;
            write_preserving(&from, &bytes, &to)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collect_files_is_sorted_and_skips_pycache() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("z.py"), "").unwrap();
        fs::write(root.join("a.py"), "").unwrap();
        fs::write(root.join("b").join("c.py"), "").unwrap();
        fs::write(root.join("b").join("notes.txt"), "").unwrap();
        fs::write(root.join("__pycache__").join("a.cpython-311.py"), "").unwrap();

        let files = collect_files(root, &|p| p.extension().is_some_and(|e| e == "py")).unwrap();
        let rel: Vec<_> = files.iter().map(|p| p.strip_prefix(root).unwrap().to_path_buf()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("a.py"), PathBuf::from("b/c.py"), PathBuf::from("z.py")]
        );
    }

    #[test]
    fn collect_all_includes_cache_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("__pycache__").join("x.cpython-311.pyc"), "").unwrap();
        fs::write(root.join("a.py"), "").unwrap();

        let rel: Vec<_> = collect_all(root)
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("__pycache__/x.cpython-311.pyc"), PathBuf::from("a.py")]
        );
    }

    #[test]
    fn write_preserving_keeps_mtime_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.py");
        fs::write(&src, "print(1)\n").unwrap();
        let old = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, old).unwrap();

        let dest = tmp.path().join("out").join("dest.py");
        write_preserving(&src, b"print(1)\n", &dest).unwrap();

        let meta = fs::metadata(&dest).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), old);
        assert!(!PathBuf::from(format!("{}.agentsync.tmp", dest.display())).exists());
    }

    #[test]
    fn copy_tree_counts_nested_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("mod");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("__init__.py"), "").unwrap();
        fs::write(src.join("sub").join("core.py"), "x = 1\n").unwrap();

        let dest = tmp.path().join("copy");
        assert_eq!(copy_tree(&src, &dest).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.join("sub").join("core.py")).unwrap(), "x = 1\n");
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_follows_symlinked_dirs() {
        let tmp = TempDir::new().unwrap();
        let shared = tmp.path().join("shared");
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("util.py"), "y = 2\n").unwrap();
        let src = tmp.path().join("mod");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("__init__.py"), "").unwrap();
        std::os::unix::fs::symlink(&shared, src.join("lib")).unwrap();

        let dest = tmp.path().join("copy");
        assert_eq!(copy_tree(&src, &dest).unwrap(), 2);
        assert!(dest.join("lib").is_dir());
        assert_eq!(fs::read_to_string(dest.join("lib").join("util.py")).unwrap(), "y = 2\n");
    }
}
