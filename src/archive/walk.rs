use log::trace;
use std::fs;
use std::path::{Path, PathBuf};

/// Collects every regular file under `source_dir`, returned in
/// deterministic lexicographic order by path so archives over identical
/// trees are byte-comparable modulo timestamps. Symlinks, devices, and
/// directories are never returned; the caller treats their absence as a
/// silent skip, matching the source walker this is grounded on.
pub fn collect_regular_files(source_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(source_dir, &mut files)?;
    files.sort();
    Ok(files)
}

/// Sums the on-disk length of every regular file under `source_dir`, used
/// to size the progress bar before the archiver starts.
pub fn total_size_bytes(source_dir: &Path) -> anyhow::Result<u64> {
    let mut total = 0u64;
    for path in collect_regular_files(source_dir)? {
        total += fs::metadata(&path)?.len();
    }
    Ok(total)
}

fn walk_into(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    children.sort();

    for path in children {
        let metadata = fs::symlink_metadata(&path)?;
        if metadata.is_dir() {
            walk_into(&path, out)?;
        } else if metadata.is_file() {
            out.push(path);
        } else {
            trace!("skipping non-regular path: {}", path.display());
        }
    }
    Ok(())
}
